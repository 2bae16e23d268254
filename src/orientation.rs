//! Axis-aligned rotations of an item.

use crate::types::Orientation;

/// Legal orientations for an item with native extents `(l, w, h)`.
///
/// Upright-only items keep their native axis order. All other items get the
/// six permutations in a fixed order; equal edges produce duplicate entries,
/// which the placement loop simply tries again.
///
/// # Examples
/// ```
/// use cubemaster::orientation::allowed_orientations;
///
/// assert_eq!(allowed_orientations((3.0, 2.0, 1.0), true), vec![(3.0, 2.0, 1.0)]);
/// assert_eq!(allowed_orientations((3.0, 2.0, 1.0), false).len(), 6);
/// ```
pub fn allowed_orientations(dims: Orientation, upright_only: bool) -> Vec<Orientation> {
    let (l, w, h) = dims;
    if upright_only {
        return vec![(l, w, h)];
    }
    vec![
        (l, w, h),
        (l, h, w),
        (w, l, h),
        (w, h, l),
        (h, l, w),
        (h, w, l),
    ]
}
