//! Interleaved audio buffer helpers.

// -------------------------------------------------------------------------------------------------

/// Fill the given buffer with silence.
#[inline]
pub fn clear_buffer(buffer: &mut [f32]) {
    buffer.fill(0.0);
}

/// Apply a linear gain to all samples in the given buffer.
pub fn scale_buffer(buffer: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    if gain == 0.0 {
        clear_buffer(buffer);
        return;
    }
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
}

/// Add a stereo frame to an interleaved output frame with any channel layout.
///
/// Mono frames receive the average of both channels. With two or more channels, only the
/// first two channels get written.
#[inline]
pub fn add_stereo_frame(frame: &mut [f32], left: f32, right: f32) {
    match frame {
        [] => (),
        [mono] => *mono += (left + right) * 0.5,
        [l, r, ..] => {
            *l += left;
            *r += right;
        }
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_and_clear() {
        let mut buffer = vec![1.0, -0.5, 0.25, 2.0];
        scale_buffer(&mut buffer, 1.0);
        assert_eq!(buffer, vec![1.0, -0.5, 0.25, 2.0]);
        scale_buffer(&mut buffer, 0.5);
        assert_eq!(buffer, vec![0.5, -0.25, 0.125, 1.0]);
        scale_buffer(&mut buffer, 0.0);
        assert_eq!(buffer, vec![0.0; 4]);

        let mut buffer = vec![f32::NAN; 3];
        clear_buffer(&mut buffer);
        assert_eq!(buffer, vec![0.0; 3]);
    }

    #[test]
    fn stereo_frames() {
        let mut mono = [1.0];
        add_stereo_frame(&mut mono, 0.5, 0.25);
        assert_eq!(mono, [1.375]);

        let mut stereo = [0.0, 0.0];
        add_stereo_frame(&mut stereo, 0.5, 0.25);
        add_stereo_frame(&mut stereo, 0.5, 0.25);
        assert_eq!(stereo, [1.0, 0.5]);

        let mut surround = [0.0; 6];
        add_stereo_frame(&mut surround, 1.0, -1.0);
        assert_eq!(surround, [1.0, -1.0, 0.0, 0.0, 0.0, 0.0]);

        add_stereo_frame(&mut [], 1.0, 1.0);
    }
}
