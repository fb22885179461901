//! Selection and transform controller: direct-manipulation gestures mapped
//! onto element attributes.
//!
//! Resizes never leave a scale multiplier behind. The factor a handle drag
//! produces is absorbed straight into the element's own size attributes,
//! interpreted per kind, so repeated resizes compose instead of compounding
//! hidden state.

use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementKind};
use crate::error::TransformError;
use crate::scaling::{scale_points, ScaleFactors};

/// Rotation applied by the toolbar rotate action, in degrees.
pub const ROTATION_STEP: f64 = 90.0;

/// Resize handle on an element's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Handle {
    /// Top-left corner.
    TopLeft,
    /// Top edge.
    Top,
    /// Top-right corner.
    TopRight,
    /// Right edge.
    Right,
    /// Bottom-right corner.
    BottomRight,
    /// Bottom edge.
    Bottom,
    /// Bottom-left corner.
    BottomLeft,
    /// Left edge.
    Left,
}

/// Which side of a box an axis is dragged from.
#[derive(Clone, Copy)]
enum Side {
    Start,
    End,
    Fixed,
}

impl Side {
    /// Signed growth of the box for a drag along this axis.
    fn growth(self, delta: f64) -> f64 {
        match self {
            Self::Start => -delta,
            Self::End => delta,
            Self::Fixed => 0.0,
        }
    }

    /// Relative position of the point that stays put.
    fn anchor_fraction(self) -> f64 {
        match self {
            Self::Start => 1.0,
            Self::End => 0.0,
            Self::Fixed => 0.5,
        }
    }
}

impl Handle {
    fn sides(self) -> (Side, Side) {
        match self {
            Self::TopLeft => (Side::Start, Side::Start),
            Self::Top => (Side::Fixed, Side::Start),
            Self::TopRight => (Side::End, Side::Start),
            Self::Right => (Side::End, Side::Fixed),
            Self::BottomRight => (Side::End, Side::End),
            Self::Bottom => (Side::Fixed, Side::End),
            Self::BottomLeft => (Side::Start, Side::End),
            Self::Left => (Side::Start, Side::Fixed),
        }
    }

    /// Check whether this is a corner handle.
    #[must_use]
    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Self::TopLeft | Self::TopRight | Self::BottomRight | Self::BottomLeft
        )
    }
}

/// A resize-handle drag in workspace pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResizeGesture {
    /// Handle being dragged.
    pub handle: Handle,
    /// Horizontal pointer travel.
    pub dx: f64,
    /// Vertical pointer travel.
    pub dy: f64,
    /// Corner drags scale both axes by the same factor.
    pub keep_ratio: bool,
}

/// Mirror axis for [`flip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    /// Mirror left-right.
    Horizontal,
    /// Mirror top-bottom.
    Vertical,
}

fn ensure_unlocked(element: &Element) -> Result<(), TransformError> {
    if element.locked {
        Err(TransformError::Locked(element.id.clone()))
    } else {
        Ok(())
    }
}

fn validate(factors: ScaleFactors) -> Result<(), TransformError> {
    let ScaleFactors { sx, sy } = factors;
    if sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0 {
        Ok(())
    } else {
        Err(TransformError::InvalidScale(sx, sy))
    }
}

/// Fold a transform multiplier into an element's own size attributes.
///
/// Text grows its font with the vertical factor and its wrapping box with
/// the horizontal one. Circles, stars and polygons take the larger factor.
/// Boxes and point lists follow each axis. Outline widths are left alone.
pub fn absorb_scale(element: &mut Element, sx: f64, sy: f64) {
    let larger = sx.max(sy);
    match &mut element.kind {
        ElementKind::Text(text) => {
            text.font_size *= sy;
            if let Some(width) = text.width.as_mut() {
                *width *= sx;
            }
        }
        ElementKind::Rectangle { width, height, .. } => {
            *width *= sx;
            *height *= sy;
        }
        ElementKind::Image(image) => {
            image.width *= sx;
            image.height *= sy;
        }
        ElementKind::Circle { radius } | ElementKind::Polygon { radius, .. } => *radius *= larger,
        ElementKind::Star {
            inner_radius,
            outer_radius,
            ..
        } => {
            *inner_radius *= larger;
            *outer_radius *= larger;
        }
        ElementKind::Arrow { points, .. } | ElementKind::Line { points, .. } => {
            scale_points(points, sx, sy);
        }
    }
}

/// Translate an element by a drag delta.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements.
pub fn move_by(element: &mut Element, dx: f64, dy: f64) -> Result<(), TransformError> {
    ensure_unlocked(element)?;
    element.x += dx;
    element.y += dy;
    Ok(())
}

/// Place an element's origin at an absolute position.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements.
pub fn move_to(element: &mut Element, x: f64, y: f64) -> Result<(), TransformError> {
    ensure_unlocked(element)?;
    element.x = x;
    element.y = y;
    Ok(())
}

/// Resize an element about its origin by explicit factors.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements and
/// [`TransformError::InvalidScale`] for non-positive or non-finite factors.
pub fn resize(element: &mut Element, factors: ScaleFactors) -> Result<(), TransformError> {
    ensure_unlocked(element)?;
    validate(factors)?;
    absorb_scale(element, factors.sx, factors.sy);
    Ok(())
}

/// Interpret a resize-handle drag.
///
/// The drag is measured in the element's rotated frame, the opposite
/// handle stays fixed on the workspace, and the resulting factors are
/// absorbed into the element's size attributes. Returns the factors applied.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements and
/// [`TransformError::InvalidScale`] when the drag collapses or inverts the box.
pub fn resize_with_handle(
    element: &mut Element,
    gesture: &ResizeGesture,
) -> Result<ScaleFactors, TransformError> {
    ensure_unlocked(element)?;
    let before = element.local_bounds();
    let (sin, cos) = element.rotation.to_radians().sin_cos();
    let local_dx = gesture.dx * cos + gesture.dy * sin;
    let local_dy = -gesture.dx * sin + gesture.dy * cos;

    let (side_x, side_y) = gesture.handle.sides();
    let axis_factor = |extent: f64, growth: f64| {
        if extent > 0.0 {
            (extent + growth) / extent
        } else {
            1.0
        }
    };
    let mut factors = ScaleFactors::new(
        axis_factor(before.width, side_x.growth(local_dx)),
        axis_factor(before.height, side_y.growth(local_dy)),
    );
    if gesture.keep_ratio && gesture.handle.is_corner() {
        let k = if (factors.sx - 1.0).abs() >= (factors.sy - 1.0).abs() {
            factors.sx
        } else {
            factors.sy
        };
        factors = ScaleFactors::new(k, k);
    }
    validate(factors)?;

    let (fx, fy) = (side_x.anchor_fraction(), side_y.anchor_fraction());
    let anchor_world = element.to_world(
        before.x + fx * before.width,
        before.y + fy * before.height,
    );

    absorb_scale(element, factors.sx, factors.sy);

    let after = element.local_bounds();
    let (ax, ay) = (after.x + fx * after.width, after.y + fy * after.height);
    element.x = anchor_world.0 - (ax * cos - ay * sin);
    element.y = anchor_world.1 - (ax * sin + ay * cos);
    Ok(factors)
}

/// Normalize an angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Set rotation, pivoting about the element's visual centre.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements.
pub fn rotate_to(element: &mut Element, degrees: f64) -> Result<(), TransformError> {
    ensure_unlocked(element)?;
    let (cx, cy) = element.center();
    element.rotation = normalize_degrees(degrees);
    let (lcx, lcy) = element.local_bounds().center();
    let (sin, cos) = element.rotation.to_radians().sin_cos();
    element.x = cx - (lcx * cos - lcy * sin);
    element.y = cy - (lcx * sin + lcy * cos);
    Ok(())
}

/// Rotate by the fixed toolbar step.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements.
pub fn rotate_step(element: &mut Element) -> Result<(), TransformError> {
    let target = element.rotation + ROTATION_STEP;
    rotate_to(element, target)
}

/// Rotate so the rotation handle (above the box) points at the pointer.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements.
pub fn rotate_toward(element: &mut Element, pointer_x: f64, pointer_y: f64) -> Result<(), TransformError> {
    let (cx, cy) = element.center();
    let degrees = (pointer_y - cy).atan2(pointer_x - cx).to_degrees() + 90.0;
    rotate_to(element, degrees)
}

/// Toggle the mirror flag on one axis. Rotation is unaffected.
///
/// # Errors
///
/// Returns [`TransformError::Locked`] for locked elements.
pub fn flip(element: &mut Element, axis: FlipAxis) -> Result<(), TransformError> {
    ensure_unlocked(element)?;
    match axis {
        FlipAxis::Horizontal => element.flip_x = !element.flip_x,
        FlipAxis::Vertical => element.flip_y = !element.flip_y,
    }
    Ok(())
}
