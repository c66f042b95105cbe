//! Rectangles passed to and returned from the runtime by value.

use crate::error::PayloadFault;

/// Largest width or height accepted for a window or view.
pub const MAX_EXTENT: f64 = 16384.0;

/// Origin and size of a window or view, in points.
///
/// Laid out as four consecutive `f64`s, identical to `NSRect` / `CGRect`, so
/// it can be passed and returned by value through `objc_msgSend`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Geometry {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle at the origin.
    #[must_use]
    pub const fn sized(width: f64, height: f64) -> Self {
        Geometry::new(0.0, 0.0, width, height)
    }

    /// Rejects degenerate or absurd sizes before they reach the toolkit.
    ///
    /// Width and height must lie in `0..=MAX_EXTENT`; NaN fails.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadFault::GeometryOutOfRange`].
    pub fn validate(&self) -> Result<(), PayloadFault> {
        let range = 0.0..=MAX_EXTENT;
        if range.contains(&self.width) && range.contains(&self.height) {
            Ok(())
        } else {
            Err(PayloadFault::GeometryOutOfRange {
                width: self.width,
                height: self.height,
            })
        }
    }
}
