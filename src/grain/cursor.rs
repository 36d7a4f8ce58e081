use assume::assume;

use super::position::{wrap_position, GrainPosition};
use crate::Sample;

// -------------------------------------------------------------------------------------------------

/// Walks a fractional, wrapping read position through a [`Sample`] at a fixed pitch ratio and
/// produces linearly interpolated stereo frames.
///
/// Mono samples feed both output channels from the same buffer, each with its own position.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrainCursor {
    position: GrainPosition,
    pitch_ratio: f64,
}

impl GrainCursor {
    pub const fn new() -> Self {
        Self {
            position: GrainPosition::splat(0.0),
            pitch_ratio: 1.0,
        }
    }

    /// Restart the cursor at the given position, wrapped into `[0, length)`.
    pub fn init(&mut self, position: GrainPosition, pitch_ratio: f64, length: usize) {
        debug_assert!(pitch_ratio >= 0.0, "Negative pitch ratios are not supported");
        self.position = position.wrapped(length);
        self.pitch_ratio = pitch_ratio;
    }

    /// Current read position.
    pub fn position(&self) -> GrainPosition {
        self.position
    }

    /// Position increment per output frame.
    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    /// Produce one interpolated frame, then advance and wrap the read position.
    #[inline]
    pub fn next_sample(&mut self, sample: &Sample) -> (f32, f32) {
        let length = sample.len();
        if length == 0 {
            return (0.0, 0.0);
        }
        let left = Self::interpolate(sample.channel(0), self.position.left, length);
        let right = Self::interpolate(sample.channel(1), self.position.right, length);

        self.position.left = wrap_position(self.position.left + self.pitch_ratio, length);
        self.position.right = wrap_position(self.position.right + self.pitch_ratio, length);

        (left, right)
    }

    #[inline]
    fn interpolate(buffer: &[f32], position: f64, length: usize) -> f32 {
        debug_assert!((0.0..length as f64).contains(&position));
        let index = (position as usize).min(length - 1);
        let alpha = (position - index as f64) as f32;

        assume!(unsafe: index + 1 < buffer.len(), "Sample buffers contain guard frames");
        buffer[index] * (1.0 - alpha) + buffer[index + 1] * alpha
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn ramp_sample(length: usize) -> Result<Sample, Error> {
        let data = (0..length).map(|v| v as f32).collect::<Vec<_>>();
        Sample::from_planar("ramp", &[data], 44100.0, 60, 10.0)
    }

    #[test]
    fn interpolates_linearly() -> Result<(), Box<Error>> {
        let sample = ramp_sample(16)?;
        let mut cursor = GrainCursor::new();
        cursor.init(GrainPosition::new(2.25, 5.5), 0.5, sample.len());
        assert_eq!(cursor.next_sample(&sample), (2.25, 5.5));
        assert_eq!(cursor.next_sample(&sample), (2.75, 6.0));
        assert_eq!(cursor.next_sample(&sample), (3.25, 6.5));
        Ok(())
    }

    #[test]
    fn wraps_into_sample_bounds() -> Result<(), Box<Error>> {
        let sample = ramp_sample(100)?;
        let length = sample.len();
        for pitch_ratio in [0.5, 1.0, 1.5, 3.75, 250.25] {
            for start in [-30.0, 0.0, 42.5, 99.75, 180.0] {
                let mut cursor = GrainCursor::new();
                cursor.init(GrainPosition::new(start, start + 10.0), pitch_ratio, length);
                for n in 1..=500usize {
                    cursor.next_sample(&sample);
                    let position = cursor.position();
                    let expected = (start + n as f64 * pitch_ratio).rem_euclid(length as f64);
                    assert!((0.0..length as f64).contains(&position.left));
                    assert!((0.0..length as f64).contains(&position.right));
                    assert!(
                        (position.left - expected).abs() < 1e-6
                            || (position.left - expected).abs() > length as f64 - 1e-6,
                        "pitch {pitch_ratio}, start {start}, n {n}: {} != {expected}",
                        position.left
                    );
                }
            }
        }
        Ok(())
    }

    #[test]
    fn interpolates_into_guard_frames() -> Result<(), Box<Error>> {
        let sample = ramp_sample(4)?;
        let mut cursor = GrainCursor::new();
        cursor.init(GrainPosition::splat(3.5), 1.0, sample.len());
        // frame 4 is a zeroed guard frame
        assert_eq!(cursor.next_sample(&sample), (1.5, 1.5));
        // then wrapped to the start
        assert_eq!(cursor.position(), GrainPosition::splat(0.5));
        Ok(())
    }

    #[test]
    fn empty_sample_is_silent() -> Result<(), Box<Error>> {
        let sample = Sample::from_planar("empty", &[[1.0f32; 8]], 0.0, 60, 10.0)?;
        let mut cursor = GrainCursor::new();
        cursor.init(GrainPosition::splat(2.0), 1.0, sample.len());
        assert_eq!(cursor.next_sample(&sample), (0.0, 0.0));
        Ok(())
    }
}
