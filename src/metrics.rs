//! Summary figures over a placement set.
//!
//! All functions are pure and can be called without running a solve, e.g. by
//! an export layer that received a stored solution.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{Container, Placement};
use crate::types::{CenterOfMassCalculator, Dimensional, Vec3, Weighted};

/// The four derived metrics of a solution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolutionMetrics {
    pub utilization: f64,
    pub weight_utilization: f64,
    #[schema(nullable = true)]
    pub center_of_gravity: Option<Vec3>,
    pub total_weight: f64,
}

/// Occupied volume as a percentage of the container volume.
///
/// Returns 0 for a container without volume.
pub fn volume_utilization(container: &Container, placements: &[Placement]) -> f64 {
    let container_volume = container.total_volume();
    if container_volume == 0.0 {
        return 0.0;
    }
    let used: f64 = placements.iter().map(|p| p.volume()).sum();
    used / container_volume * 100.0
}

/// Sum of all placement weights.
pub fn total_weight(placements: &[Placement]) -> f64 {
    placements.iter().map(|p| p.weight()).sum()
}

/// `current` as a percentage of `max_weight`; 0 when no limit is set.
pub fn weight_utilization(max_weight: f64, current: f64) -> f64 {
    if max_weight == 0.0 {
        return 0.0;
    }
    current / max_weight * 100.0
}

/// Weight-weighted mean of the box centroids.
///
/// `None` when the placements carry no weight at all.
pub fn center_of_gravity(placements: &[Placement]) -> Option<Vec3> {
    let mut calc = CenterOfMassCalculator::new();
    for p in placements {
        calc.add_point(p.center(), p.weight());
    }
    calc.compute()
}

/// Computes all metrics in one go.
pub fn summarize(container: &Container, placements: &[Placement]) -> SolutionMetrics {
    let total = total_weight(placements);
    SolutionMetrics {
        utilization: volume_utilization(container, placements),
        weight_utilization: weight_utilization(container.max_weight, total),
        center_of_gravity: center_of_gravity(placements),
        total_weight: total,
    }
}
