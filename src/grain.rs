//! Single grains: a windowed, pitched excerpt of a [`Sample`].

mod cursor;
mod envelope;
mod position;

pub use cursor::GrainCursor;
pub use envelope::{GrainEnvelope, GrainWindowShape};
pub use position::GrainPosition;
pub(crate) use position::wrap_position;

use crate::Sample;

// -------------------------------------------------------------------------------------------------

/// Read-only view of a grain's state, e.g. for visualization.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GrainSnapshot {
    /// True while the grain is playing.
    pub active: bool,
    /// Left and right read positions, relative to the sample length (0..1).
    pub position: (f32, f32),
    /// Current window amplitude.
    pub amplitude: f32,
}

// -------------------------------------------------------------------------------------------------

/// A pool slot which plays one finite, enveloped burst of a sample.
///
/// Grains are created once and then get reactivated for every grain onset. An active grain
/// always has remaining samples. It deactivates itself with its last sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct Grain {
    active: bool,
    samples_remaining: usize,
    cursor: GrainCursor,
    envelope: GrainEnvelope,
}

impl Grain {
    /// Create a new inactive grain.
    pub const fn new() -> Self {
        Self {
            active: false,
            samples_remaining: 0,
            cursor: GrainCursor::new(),
            envelope: GrainEnvelope::new(),
        }
    }

    /// Check if this grain is currently active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of samples left until the grain deactivates itself.
    #[inline]
    pub fn samples_remaining(&self) -> usize {
        self.samples_remaining
    }

    /// (Re)start the grain at the given position in a sample with `sample_length` frames.
    pub fn activate(
        &mut self,
        duration_samples: usize,
        position: GrainPosition,
        pitch_ratio: f64,
        amplitude: f32,
        shape: GrainWindowShape,
        sample_length: usize,
    ) {
        debug_assert!(duration_samples > 0, "Invalid grain duration");
        self.samples_remaining = duration_samples.max(1);
        self.cursor.init(position, pitch_ratio, sample_length);
        self.envelope.init(duration_samples, amplitude, shape);
        self.active = true;
    }

    /// Deactivate this grain immediately.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.samples_remaining = 0;
    }

    /// Produce the next enveloped stereo frame. Inactive grains return silence.
    #[inline]
    pub fn next_sample(&mut self, sample: &Sample) -> (f32, f32) {
        if !self.active {
            return (0.0, 0.0);
        }
        let (left, right) = self.cursor.next_sample(sample);
        let envelope = self.envelope.next_sample();

        self.samples_remaining -= 1;
        if self.samples_remaining == 0 {
            self.active = false;
        }

        (left * envelope, right * envelope)
    }

    /// Create a snapshot of the grain's state.
    pub fn snapshot(&self, sample_length: usize) -> GrainSnapshot {
        GrainSnapshot {
            active: self.active,
            position: self.cursor.position().relative(sample_length),
            amplitude: if self.active {
                self.envelope.amplitude()
            } else {
                0.0
            },
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn lifecycle() -> Result<(), Box<Error>> {
        let sample = Sample::from_planar("dc", &[vec![1.0f32; 1000]], 44100.0, 60, 10.0)?;
        let mut grain = Grain::new();
        assert!(!grain.is_active());
        assert_eq!(grain.next_sample(&sample), (0.0, 0.0));

        for duration in [2, 3, 64, 101] {
            grain.activate(
                duration,
                GrainPosition::new(10.0, 500.0),
                1.0,
                1.0,
                GrainWindowShape::Triangle,
                sample.len(),
            );
            for n in 0..duration {
                assert!(grain.is_active());
                assert_eq!(grain.samples_remaining(), duration - n);
                let (left, right) = grain.next_sample(&sample);
                if n > 0 && n < duration - 1 {
                    assert!(left > 0.0 && right > 0.0, "sample {n} of {duration} is silent");
                }
            }
            assert!(!grain.is_active());
            assert_eq!(grain.samples_remaining(), 0);
            for _ in 0..10 {
                assert_eq!(grain.next_sample(&sample), (0.0, 0.0));
            }
        }
        Ok(())
    }

    #[test]
    fn reactivation_and_snapshots() -> Result<(), Box<Error>> {
        let sample = Sample::from_planar("dc", &[vec![0.5f32; 100]], 44100.0, 60, 10.0)?;
        let mut grain = Grain::new();
        grain.activate(
            10,
            GrainPosition::new(25.0, -25.0),
            2.0,
            1.0,
            GrainWindowShape::Triangle,
            sample.len(),
        );
        let snapshot = grain.snapshot(sample.len());
        assert!(snapshot.active);
        assert_eq!(snapshot.position, (0.25, 0.75));
        assert_eq!(snapshot.amplitude, 0.0);

        grain.next_sample(&sample);
        grain.next_sample(&sample);
        let snapshot = grain.snapshot(sample.len());
        assert!((snapshot.position.0 - 0.29).abs() < 1e-6);
        assert!((snapshot.position.1 - 0.79).abs() < 1e-6);
        assert!((snapshot.amplitude - 0.4).abs() < 1e-6);

        // reactivating a playing grain restarts it
        grain.activate(
            4,
            GrainPosition::splat(0.0),
            1.0,
            1.0,
            GrainWindowShape::Triangle,
            sample.len(),
        );
        assert_eq!(grain.samples_remaining(), 4);
        assert_eq!(grain.snapshot(sample.len()).amplitude, 0.0);

        grain.deactivate();
        assert_eq!(
            grain.snapshot(sample.len()),
            GrainSnapshot {
                active: false,
                position: (0.0, 0.0),
                amplitude: 0.0
            }
        );
        Ok(())
    }
}
