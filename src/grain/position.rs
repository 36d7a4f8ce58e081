use std::ops::Add;

// -------------------------------------------------------------------------------------------------

/// Fractional read positions of a grain in sample frames, one per stereo channel.
///
/// Left and right positions move in lockstep but start at independently jittered offsets,
/// which decorrelates the stereo image of a grain cloud.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GrainPosition {
    pub left: f64,
    pub right: f64,
}

impl GrainPosition {
    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Position with the same offset on both channels.
    pub const fn splat(position: f64) -> Self {
        Self::new(position, position)
    }

    /// Wrap both channel positions into range `[0, length)`.
    #[must_use]
    pub fn wrapped(self, length: usize) -> Self {
        Self {
            left: wrap_position(self.left, length),
            right: wrap_position(self.right, length),
        }
    }

    /// Positions relative to the given length, in range `[0, 1)`.
    pub fn relative(&self, length: usize) -> (f32, f32) {
        if length == 0 {
            (0.0, 0.0)
        } else {
            (
                (self.left / length as f64) as f32,
                (self.right / length as f64) as f32,
            )
        }
    }
}

impl Add<f64> for GrainPosition {
    type Output = Self;

    fn add(self, rhs: f64) -> Self::Output {
        Self::new(self.left + rhs, self.right + rhs)
    }
}

// -------------------------------------------------------------------------------------------------

/// Wrap a single frame position into range `[0, length)`. Non finite positions map to 0.
#[inline]
pub(crate) fn wrap_position(position: f64, length: usize) -> f64 {
    if length == 0 || !position.is_finite() {
        return 0.0;
    }
    let length = length as f64;
    let wrapped = position.rem_euclid(length);
    // rem_euclid may round up to length for tiny negative inputs
    if wrapped >= length {
        0.0
    } else {
        wrapped
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping() {
        let length = 100;
        assert_eq!(wrap_position(12.5, length), 12.5);
        assert_eq!(wrap_position(112.5, length), 12.5);
        assert_eq!(wrap_position(-12.5, length), 87.5);
        assert_eq!(wrap_position(-212.5, length), 87.5);
        assert_eq!(wrap_position(100.0, length), 0.0);
        assert_eq!(wrap_position(-1e-18, length), 0.0);
        assert_eq!(wrap_position(f64::NAN, length), 0.0);
        assert_eq!(wrap_position(10.0, 0), 0.0);

        let position = GrainPosition::new(-1.0, 250.0).wrapped(length);
        assert_eq!(position, GrainPosition::new(99.0, 50.0));
        assert_eq!(position.relative(length), (0.99, 0.5));
    }
}
