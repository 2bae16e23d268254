//! Post-placement slide toward the container origin along x.

use std::cmp::Ordering;

use crate::geometry::overlaps;
use crate::model::Placement;

/// Slides placements toward `x = 0` without introducing overlaps.
///
/// Placements are visited in ascending `x`. For each one, candidates from
/// `max(0, x - window)` up to `x` are scanned in `step` increments and the
/// lowest candidate that overlaps no other live placement wins. Only `x` is
/// changed and the vector order is kept. Locked placements stay put.
///
/// Returns the number of placements that moved.
pub fn compact(placements: &mut [Placement], window: f64, step: f64) -> usize {
    if step <= 0.0 || !step.is_finite() {
        return 0;
    }

    let mut order: Vec<usize> = (0..placements.len()).collect();
    order.sort_by(|&a, &b| {
        placements[a]
            .pos
            .x
            .partial_cmp(&placements[b].pos.x)
            .unwrap_or(Ordering::Equal)
    });

    let mut moved = 0;
    for idx in order {
        if placements[idx].locked {
            continue;
        }
        let current_x = placements[idx].pos.x;
        let mut nx = (current_x - window).max(0.0);
        while nx <= current_x {
            let candidate = placements[idx].with_x(nx);
            let free = placements
                .iter()
                .enumerate()
                .all(|(j, q)| j == idx || !overlaps(q, &candidate));
            if free {
                if nx < current_x {
                    log::trace!(
                        "compaction: {} x {} -> {}",
                        candidate.instance_id,
                        current_x,
                        nx
                    );
                    placements[idx].pos.x = nx;
                    moved += 1;
                }
                break;
            }
            nx += step;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Orientation, Vec3};

    fn placed(id: &str, pos: (f64, f64, f64), dims: Orientation) -> Placement {
        Placement {
            instance_id: id.to_string(),
            sku_id: "sku".to_string(),
            name: "Box".to_string(),
            pos: Vec3::from_tuple(pos),
            dims,
            weight: 1.0,
            locked: false,
        }
    }

    #[test]
    fn slides_into_gap_left_by_clearance() {
        let mut placements = vec![
            placed("a", (0.0, 0.0, 0.0), (100.0, 100.0, 100.0)),
            placed("b", (120.0, 0.0, 0.0), (100.0, 100.0, 100.0)),
        ];
        let moved = compact(&mut placements, 50.0, 5.0);
        assert_eq!(moved, 1);
        assert_eq!(placements[0].pos.x, 0.0);
        assert_eq!(placements[1].pos.x, 100.0);
    }

    #[test]
    fn lowest_free_candidate_wins() {
        let mut placements = vec![placed("a", (40.0, 0.0, 0.0), (10.0, 10.0, 10.0))];
        compact(&mut placements, 50.0, 5.0);
        assert_eq!(placements[0].pos.x, 0.0);
    }

    #[test]
    fn scan_is_limited_to_window() {
        let mut placements = vec![placed("a", (200.0, 0.0, 0.0), (10.0, 10.0, 10.0))];
        compact(&mut placements, 50.0, 5.0);
        assert_eq!(placements[0].pos.x, 150.0);
    }

    #[test]
    fn y_and_z_stay_untouched_and_order_is_kept() {
        let mut placements = vec![
            placed("far", (300.0, 20.0, 30.0), (10.0, 10.0, 10.0)),
            placed("near", (12.0, 0.0, 0.0), (10.0, 10.0, 10.0)),
        ];
        compact(&mut placements, 50.0, 5.0);
        assert_eq!(placements[0].instance_id, "far");
        assert_eq!(placements[0].pos, Vec3::new(250.0, 20.0, 30.0));
        assert_eq!(placements[1].pos, Vec3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn blocked_placement_does_not_move() {
        let mut placements = vec![
            placed("a", (0.0, 0.0, 0.0), (100.0, 100.0, 100.0)),
            placed("b", (100.0, 0.0, 0.0), (100.0, 100.0, 100.0)),
        ];
        assert_eq!(compact(&mut placements, 50.0, 5.0), 0);
        assert_eq!(placements[1].pos.x, 100.0);
    }

    #[test]
    fn locked_placements_are_skipped() {
        let mut placements = vec![placed("a", (40.0, 0.0, 0.0), (10.0, 10.0, 10.0))];
        placements[0].locked = true;
        assert_eq!(compact(&mut placements, 50.0, 5.0), 0);
        assert_eq!(placements[0].pos.x, 40.0);
    }

    #[test]
    fn non_positive_step_is_a_no_op() {
        let mut placements = vec![placed("a", (40.0, 0.0, 0.0), (10.0, 10.0, 10.0))];
        assert_eq!(compact(&mut placements, 50.0, 0.0), 0);
        assert_eq!(placements[0].pos.x, 40.0);
    }
}
