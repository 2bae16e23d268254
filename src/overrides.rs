//! Manual placement overrides coming from an interactive viewer.
//!
//! An override is only checked against the container bounds and the other
//! placements; nothing is re-planned.

use crate::geometry::{inside_container, overlaps};
use crate::model::{Container, Placement, Solution};

/// Checks whether `candidate` may replace the placement with the same instance id.
///
/// The candidate must lie fully inside the container and must not overlap any
/// placement of a different instance.
pub fn validate_override(
    candidate: &Placement,
    placements: &[Placement],
    container: &Container,
) -> bool {
    inside_container(candidate, container)
        && placements
            .iter()
            .filter(|p| p.instance_id != candidate.instance_id)
            .all(|p| !overlaps(p, candidate))
}

impl Solution {
    /// Applies a manual move if it is valid.
    ///
    /// On acceptance the placement with the candidate's instance id is replaced
    /// in place, marked as locked, and the metrics are recomputed. Unknown
    /// instances and invalid moves leave the solution untouched.
    ///
    /// # Examples
    /// ```
    /// use cubemaster::model::{Container, Sku};
    /// use cubemaster::optimizer::solve;
    ///
    /// let container = Container::new((30.0, 10.0, 10.0), 100.0);
    /// let mut solution = solve(&container, &[Sku::new("a", "A", (10.0, 10.0, 10.0), 1.0, 1)]);
    ///
    /// let moved = solution.placements[0].with_x(20.0);
    /// assert!(solution.apply_override(moved, &container));
    /// assert_eq!(solution.placements[0].pos.x, 20.0);
    /// assert!(solution.placements[0].locked);
    /// ```
    pub fn apply_override(&mut self, candidate: Placement, container: &Container) -> bool {
        let Some(idx) = self
            .placements
            .iter()
            .position(|p| p.instance_id == candidate.instance_id)
        else {
            log::debug!("Override for unknown instance {} ignored", candidate.instance_id);
            return false;
        };

        if !validate_override(&candidate, &self.placements, container) {
            log::debug!("Override for {} rejected", candidate.instance_id);
            return false;
        }

        let mut accepted = candidate;
        accepted.locked = true;
        self.placements[idx] = accepted;
        self.recompute_metrics(container);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sku;
    use crate::optimizer::solve;
    use crate::types::{EPSILON_GENERAL, Vec3};

    fn two_cubes() -> (Container, Solution) {
        let container = Container::new((30.0, 10.0, 10.0), 100.0);
        let skus = vec![
            Sku::new("light", "Light", (10.0, 10.0, 10.0), 10.0, 1),
            Sku::new("heavy", "Heavy", (10.0, 10.0, 10.0), 20.0, 1),
        ];
        let solution = solve(&container, &skus);
        assert_eq!(solution.placements.len(), 2);
        (container, solution)
    }

    #[test]
    fn own_previous_position_is_ignored() {
        let (container, solution) = two_cubes();
        let nudged = solution.placements[0].clone();
        assert!(validate_override(&nudged, &solution.placements, &container));
    }

    #[test]
    fn overlapping_candidate_is_rejected_without_mutation() {
        let (container, mut solution) = two_cubes();
        let before = solution.clone();

        let onto_neighbour = solution.placements[0].with_x(5.0);
        assert!(!validate_override(&onto_neighbour, &solution.placements, &container));
        assert!(!solution.apply_override(onto_neighbour, &container));
        assert_eq!(solution, before);
    }

    #[test]
    fn out_of_bounds_candidate_is_rejected() {
        let (container, solution) = two_cubes();
        let outside = solution.placements[1].with_x(25.0);
        assert!(!validate_override(&outside, &solution.placements, &container));

        let mut below = solution.placements[1].clone();
        below.pos = Vec3::new(20.0, 0.0, -1.0);
        assert!(!validate_override(&below, &solution.placements, &container));
    }

    #[test]
    fn accepted_override_locks_and_refreshes_metrics() {
        let (container, mut solution) = two_cubes();
        assert_eq!(solution.placements[1].sku_id, "heavy");
        assert_eq!(solution.placements[1].pos.x, 10.0);

        let moved = solution.placements[1].with_x(20.0);
        assert!(solution.apply_override(moved, &container));
        assert!(solution.placements[1].locked);
        assert!(!solution.placements[0].locked);
        assert_eq!(solution.placements[1].pos.x, 20.0);

        // Centroids at x = 5 (10 kg) and x = 25 (20 kg).
        let cog = solution.center_of_gravity.unwrap();
        assert!((cog.x - (5.0 * 10.0 + 25.0 * 20.0) / 30.0).abs() < EPSILON_GENERAL);
        assert!((solution.total_weight - 30.0).abs() < EPSILON_GENERAL);
    }

    #[test]
    fn unknown_instance_is_rejected() {
        let (container, mut solution) = two_cubes();
        let mut stranger = solution.placements[0].with_x(20.0);
        stranger.instance_id = "ghost-1".to_string();
        assert!(!solution.apply_override(stranger, &container));
        assert!(solution.placements.iter().all(|p| !p.locked));
    }
}
