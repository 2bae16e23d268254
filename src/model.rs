//! Data models for container loading.
//!
//! This module defines the data exchanged with callers of the planner:
//! - `Container`: the load space with size, weight limit and clearance
//! - `Sku`: an item type with quantity and placement constraints
//! - `ItemInstance`: one physical unit expanded from a SKU
//! - `Placement`: a sited instance with position and chosen orientation
//! - `Solution`: placements, unplaced residue and summary metrics
//!
//! The serde field names form the persisted/exported contract (`L`, `W`, `H`
//! verbatim, everything else camelCase).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::metrics;
use crate::types::{BoundingBox, Dimensional, Orientation, Positioned, Vec3, Weighted};

/// Validation error for request data.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidDimension(String),
    InvalidWeight(String),
    InvalidConfiguration(String),
    DuplicateSku(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDimension(msg) => write!(f, "Invalid dimension: {}", msg),
            ValidationError::InvalidWeight(msg) => write!(f, "Invalid weight: {}", msg),
            ValidationError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            ValidationError::DuplicateSku(id) => write!(f, "Duplicate SKU id: {}", id),
        }
    }
}

impl std::error::Error for ValidationError {}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value < 0.0 || value.is_nan() || value.is_infinite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must not be negative, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// The load space of a single solve call.
///
/// # Fields
/// * `length`, `width`, `height` - Extents along x, y and z
/// * `max_weight` - Weight limit in kg (only used for utilization reporting)
/// * `clearance` - Gap reserved between neighbouring items
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"L": 1200.0, "W": 1000.0, "H": 1200.0, "maxWeight": 1000.0, "clearance": 5.0}))]
pub struct Container {
    #[serde(rename = "L")]
    pub length: f64,
    #[serde(rename = "W")]
    pub width: f64,
    #[serde(rename = "H")]
    pub height: f64,
    pub max_weight: f64,
    #[serde(default)]
    pub clearance: f64,
}

impl Container {
    /// Creates a container without clearance.
    pub fn new(dims: (f64, f64, f64), max_weight: f64) -> Self {
        Self {
            length: dims.0,
            width: dims.1,
            height: dims.2,
            max_weight,
            clearance: 0.0,
        }
    }

    /// Sets the clearance kept between items (Builder pattern light).
    pub fn with_clearance(mut self, clearance: f64) -> Self {
        self.clearance = clearance;
        self
    }

    /// Raw extents as an orientation triple.
    #[inline]
    pub fn dims(&self) -> Orientation {
        (self.length, self.width, self.height)
    }

    /// Calculates the total volume of the container.
    pub fn total_volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    /// The box spanned by `[0, L] x [0, W] x [0, H]`.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(Vec3::zero(), self.dimensions())
    }

    /// Checks extents, weight limit and clearance.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimension(self.length, "Container length")?;
        validate_dimension(self.width, "Container width")?;
        validate_dimension(self.height, "Container height")?;
        validate_weight_value(self.max_weight, "Container max weight")?;
        if self.clearance < 0.0 || !self.clearance.is_finite() {
            return Err(ValidationError::InvalidConfiguration(format!(
                "Clearance must not be negative, got: {}",
                self.clearance
            )));
        }
        Ok(())
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims())
    }
}

/// An item type with quantity and placement constraints.
///
/// `stack_limit` is carried through serialization but not consulted by the
/// placement engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"id": "box-a", "name": "Box A", "L": 400.0, "W": 300.0, "H": 300.0, "weight": 10.0, "qty": 4}))]
pub struct Sku {
    pub id: String,
    pub name: String,
    #[serde(rename = "L")]
    pub length: f64,
    #[serde(rename = "W")]
    pub width: f64,
    #[serde(rename = "H")]
    pub height: f64,
    pub weight: f64,
    pub qty: u32,
    #[serde(default)]
    pub upright_only: bool,
    #[serde(default)]
    pub fragile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_limit: Option<u32>,
}

impl Sku {
    /// Creates a SKU without orientation or ordering constraints.
    ///
    /// # Examples
    /// ```
    /// use cubemaster::model::Sku;
    ///
    /// let sku = Sku::new("a", "Box A", (400.0, 300.0, 300.0), 10.0, 4).mark_fragile();
    /// assert!(sku.fragile);
    /// assert!(!sku.upright_only);
    /// ```
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dims: (f64, f64, f64),
        weight: f64,
        qty: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            length: dims.0,
            width: dims.1,
            height: dims.2,
            weight,
            qty,
            upright_only: false,
            fragile: false,
            stack_limit: None,
        }
    }

    /// Restricts the SKU to its native orientation.
    pub fn keep_upright(mut self) -> Self {
        self.upright_only = true;
        self
    }

    /// Marks the SKU as fragile so it is loaded after everything else.
    pub fn mark_fragile(mut self) -> Self {
        self.fragile = true;
        self
    }

    /// Native `(L, W, H)` triple.
    #[inline]
    pub fn dims(&self) -> Orientation {
        (self.length, self.width, self.height)
    }

    /// Checks dimensions and weight of a single SKU.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_dimension(self.length, &format!("Length of SKU '{}'", self.id))?;
        validate_dimension(self.width, &format!("Width of SKU '{}'", self.id))?;
        validate_dimension(self.height, &format!("Height of SKU '{}'", self.id))?;
        validate_weight_value(self.weight, &format!("Weight of SKU '{}'", self.id))?;
        Ok(())
    }

    /// Validates a SKU list, including uniqueness of ids.
    pub fn validate_all(skus: &[Sku]) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for sku in skus {
            sku.validate()?;
            if !seen.insert(sku.id.as_str()) {
                return Err(ValidationError::DuplicateSku(sku.id.clone()));
            }
        }
        Ok(())
    }
}

impl Dimensional for Sku {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims())
    }
}

/// One physical unit of a SKU, tracked through a single solve call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemInstance {
    pub instance_id: String,
    #[serde(flatten)]
    pub sku: Sku,
}

impl ItemInstance {
    /// Expands a SKU into `qty` instances with ids `<sku id>-1 .. <sku id>-<qty>`.
    pub fn expand(sku: &Sku) -> impl Iterator<Item = ItemInstance> + '_ {
        (1..=sku.qty).map(move |n| ItemInstance {
            instance_id: format!("{}-{}", sku.id, n),
            sku: sku.clone(),
        })
    }
}

impl Dimensional for ItemInstance {
    fn dimensions(&self) -> Vec3 {
        self.sku.dimensions()
    }
}

/// A sited item instance.
///
/// # Fields
/// * `pos` - Minimum corner of the box in the container
/// * `dims` - Chosen orientation, without clearance
/// * `locked` - Set by an accepted manual override
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub instance_id: String,
    pub sku_id: String,
    pub name: String,
    pub pos: Vec3,
    #[schema(value_type = [f64; 3], example = json!([400.0, 300.0, 300.0]))]
    pub dims: Orientation,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub locked: bool,
}

impl Placement {
    /// Sites `item` at `pos` using the oriented `dims`.
    pub fn new(item: &ItemInstance, pos: Vec3, dims: Orientation) -> Self {
        Self {
            instance_id: item.instance_id.clone(),
            sku_id: item.sku.id.clone(),
            name: item.sku.name.clone(),
            pos,
            dims,
            weight: item.sku.weight,
            locked: false,
        }
    }

    /// Same placement moved to another x coordinate.
    pub fn with_x(&self, x: f64) -> Self {
        let mut moved = self.clone();
        moved.pos.x = x;
        moved
    }

    /// Calculates the bounding box of the placed item.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(self.position(), self.dimensions())
    }

    /// Centroid of the placed box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.pos + self.dimensions().center()
    }
}

impl Positioned for Placement {
    fn position(&self) -> Vec3 {
        self.pos
    }
}

impl Dimensional for Placement {
    fn dimensions(&self) -> Vec3 {
        Vec3::from_tuple(self.dims)
    }
}

impl Weighted for Placement {
    fn weight(&self) -> f64 {
        self.weight
    }
}

/// Result of a solve call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub placements: Vec<Placement>,
    pub unplaced: Vec<ItemInstance>,
    /// Volume utilization in percent.
    pub utilization: f64,
    /// Weight utilization in percent.
    pub weight_utilization: f64,
    #[schema(nullable = true)]
    pub center_of_gravity: Option<Vec3>,
    pub total_weight: f64,
}

impl Solution {
    /// Combines placements and unplaced residue with freshly computed metrics.
    pub fn assemble(
        container: &Container,
        placements: Vec<Placement>,
        unplaced: Vec<ItemInstance>,
    ) -> Self {
        let mut solution = Self {
            placements,
            unplaced,
            utilization: 0.0,
            weight_utilization: 0.0,
            center_of_gravity: None,
            total_weight: 0.0,
        };
        solution.recompute_metrics(container);
        solution
    }

    /// Refreshes all derived metrics from the current placements.
    pub fn recompute_metrics(&mut self, container: &Container) {
        let summary = metrics::summarize(container, &self.placements);
        self.utilization = summary.utilization;
        self.weight_utilization = summary.weight_utilization;
        self.center_of_gravity = summary.center_of_gravity;
        self.total_weight = summary.total_weight;
    }

    /// The derived metrics as carried by this solution.
    pub fn metrics(&self) -> metrics::SolutionMetrics {
        metrics::SolutionMetrics {
            utilization: self.utilization,
            weight_utilization: self.weight_utilization,
            center_of_gravity: self.center_of_gravity,
            total_weight: self.total_weight,
        }
    }

    /// Indicates whether every instance was placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced.is_empty()
    }

    /// Number of item instances the solve call handled.
    pub fn item_count(&self) -> usize {
        self.placements.len() + self.unplaced.len()
    }
}
