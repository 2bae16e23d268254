//! Common types and traits for 3D geometry.
//!
//! Positions, extents and axis-aligned boxes shared by the placement engine,
//! the metrics and the override validation.

use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Numerical tolerance used by tests and metric comparisons.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// An oriented extent triple `(dx, dy, dz)` along the container's x, y and z axes.
///
/// Serialized as a JSON array `[dx, dy, dz]`.
pub type Orientation = (f64, f64, f64);

/// Represents a 3D vector or point in space.
///
/// Used for positions and centroids in container coordinates.
///
/// # Examples
/// ```
/// use cubemaster::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let dimensions = Vec3::new(10.0, 20.0, 30.0);
/// let center = position + dimensions * 0.5;
/// assert_eq!(center, Vec3::new(6.0, 12.0, 18.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (length axis)
    /// * `y` - Y component (width axis)
    /// * `z` - Z component (height axis)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Calculates the volume (product of all components).
    ///
    /// Useful for dimension vectors.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// # Parameters
    /// * `space` - The outer vector (e.g., container dimensions)
    /// * `tolerance` - Numerical tolerance for the comparison
    #[inline]
    pub fn fits_within(&self, space: &Self, tolerance: f64) -> bool {
        self.x <= space.x + tolerance && self.y <= space.y + tolerance && self.z <= space.z + tolerance
    }

    /// Returns the midpoint between the origin and this point.
    #[inline]
    pub fn center(&self) -> Self {
        Self::new(self.x / 2.0, self.y / 2.0, self.z / 2.0)
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// Trait for objects with 3D dimensions.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Vec3;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Trait for objects with a position in 3D space.
pub trait Positioned {
    /// Returns the position (minimum corner).
    fn position(&self) -> Vec3;
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight in kg.
    fn weight(&self) -> f64;
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + dimensions)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a bounding box from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Checks if two bounding boxes intersect.
    ///
    /// Implements the Separating Axis Theorem (SAT) for AABBs. Boxes that only
    /// share a face are separated.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max.x <= other.min.x
            || other.max.x <= self.min.x
            || self.max.y <= other.min.y
            || other.max.y <= self.min.y
            || self.max.z <= other.min.z
            || other.max.z <= self.min.z)
    }

    /// Checks if this box lies completely inside `outer` (faces may coincide).
    #[inline]
    pub fn is_within(&self, outer: &Self) -> bool {
        self.min.x >= outer.min.x
            && self.min.y >= outer.min.y
            && self.min.z >= outer.min.z
            && self.max.x <= outer.max.x
            && self.max.y <= outer.max.y
            && self.max.z <= outer.max.z
    }
}

/// Center of mass calculation helper.
///
/// Accumulates weighted positions for center of mass calculation.
#[derive(Clone, Debug, Default)]
pub struct CenterOfMassCalculator {
    weighted: (f64, f64, f64),
    total_weight: f64,
}

impl CenterOfMassCalculator {
    /// Creates a new calculator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a weighted point.
    pub fn add_point(&mut self, point: Vec3, weight: f64) {
        self.weighted.0 += point.x * weight;
        self.weighted.1 += point.y * weight;
        self.weighted.2 += point.z * weight;
        self.total_weight += weight;
    }

    /// Calculates the center of mass.
    ///
    /// # Returns
    /// `Some(point)` for a valid center of mass, `None` if no weight is present
    pub fn compute(&self) -> Option<Vec3> {
        if self.total_weight == 0.0 {
            None
        } else {
            Some(Vec3::new(
                self.weighted.0 / self.total_weight,
                self.weighted.1 / self.total_weight,
                self.weighted.2 / self.total_weight,
            ))
        }
    }
}
