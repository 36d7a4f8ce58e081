//! Lock free grain state publishing for visualizations.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use atomic_float::AtomicF32;

use crate::grain::GrainSnapshot;

// -------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GrainSlotMonitor {
    active: AtomicBool,
    left: AtomicF32,
    right: AtomicF32,
    amplitude: AtomicF32,
}

// -------------------------------------------------------------------------------------------------

/// Published state of a voice's grain pool.
///
/// The audio thread writes the state once per rendered block, any other thread may read it
/// at any time. Values of different grains may come from different blocks.
#[derive(Debug)]
pub struct GrainPoolMonitor<const N: usize> {
    note: AtomicI32,
    slots: [GrainSlotMonitor; N],
}

impl<const N: usize> GrainPoolMonitor<N> {
    pub fn new() -> Self {
        Self {
            note: AtomicI32::new(-1),
            slots: std::array::from_fn(|_| GrainSlotMonitor::default()),
        }
    }

    /// Currently playing note of the monitored voice, if any.
    pub fn note(&self) -> Option<u8> {
        u8::try_from(self.note.load(Ordering::Acquire)).ok()
    }

    /// Publish new grain states. Called by the audio thread.
    pub fn publish(&self, note: Option<u8>, grains: impl IntoIterator<Item = GrainSnapshot>) {
        for (slot, grain) in self.slots.iter().zip(grains) {
            slot.left.store(grain.position.0, Ordering::Relaxed);
            slot.right.store(grain.position.1, Ordering::Relaxed);
            slot.amplitude.store(grain.amplitude, Ordering::Relaxed);
            slot.active.store(grain.active, Ordering::Relaxed);
        }
        self.note
            .store(note.map_or(-1, i32::from), Ordering::Release);
    }

    /// Read the last published grain states.
    pub fn snapshot(&self) -> [GrainSnapshot; N] {
        // pairs with the release store in publish
        let _ = self.note.load(Ordering::Acquire);
        std::array::from_fn(|index| {
            let slot = &self.slots[index];
            GrainSnapshot {
                active: slot.active.load(Ordering::Relaxed),
                position: (
                    slot.left.load(Ordering::Relaxed),
                    slot.right.load(Ordering::Relaxed),
                ),
                amplitude: slot.amplitude.load(Ordering::Relaxed),
            }
        })
    }
}

impl<const N: usize> Default for GrainPoolMonitor<N> {
    fn default() -> Self {
        Self::new()
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn publish_and_read() {
        let monitor = Arc::new(GrainPoolMonitor::<4>::new());
        assert_eq!(monitor.note(), None);
        assert!(monitor.snapshot().iter().all(|grain| !grain.active));

        let writer = thread::spawn({
            let monitor = Arc::clone(&monitor);
            move || {
                let grain = GrainSnapshot {
                    active: true,
                    position: (0.25, 0.5),
                    amplitude: 0.75,
                };
                monitor.publish(Some(64), [grain, GrainSnapshot::default()]);
            }
        });
        writer.join().expect("monitor writer thread panicked");

        assert_eq!(monitor.note(), Some(64));
        let snapshot = monitor.snapshot();
        assert_eq!(
            snapshot[0],
            GrainSnapshot {
                active: true,
                position: (0.25, 0.5),
                amplitude: 0.75
            }
        );
        assert!(!snapshot[1].active);
        assert!(!snapshot[3].active);

        monitor.publish(None, []);
        assert_eq!(monitor.note(), None);
        // unpublished slots keep their last state
        assert!(monitor.snapshot()[0].active);
    }
}
