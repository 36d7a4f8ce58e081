//! Renders a short chord progression with the granular synth into a wav file.

use std::{
    f32::consts::TAU,
    path::{Path, PathBuf},
    sync::Arc,
};

use multigrain::{
    parameter::Parameter, Sample, SynthConfig, SynthEngine, SynthEvent, SynthParameters,
    TimedSynthEvent,
};

// -------------------------------------------------------------------------------------------------

// Common demo code
#[path = "./common/arguments.rs"]
mod arguments;

// -------------------------------------------------------------------------------------------------

#[cfg(all(debug_assertions, feature = "assert-allocs"))]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

// -------------------------------------------------------------------------------------------------

const SAMPLE_RATE: u32 = 44100;
const CHANNEL_COUNT: usize = 2;
const BLOCK_SIZE: usize = 512;

// Note envelope
const ATTACK_MS: f32 = 300.0;
const DECAY_MS: f32 = 500.0;
const SUSTAIN_PERCENT: f32 = 70.0;
const RELEASE_MS: f32 = 1500.0;

// Grain parameters (tweak as needed!)
const NUM_GRAINS: f32 = 6.0; // 1 - 8
const GRAIN_DURATION: f32 = 40.0; // multiple of the note's period
const POSITION: f32 = 0.2; // 0.0 = start, 1.0 = end
const POSITION_RANDOM: f32 = 0.05; // 0.0 = no jitter, 1.0 = whole sample
const GRAIN_SPEED: f32 = 0.25; // spawn position drift
const MASTER_GAIN: f32 = 0.25;

// Chords: (start in seconds, duration in seconds, notes)
const CHORDS: [(f32, f32, [u8; 3]); 4] = [
    (0.0, 1.8, [48, 55, 64]),
    (2.0, 1.8, [45, 52, 60]),
    (4.0, 1.8, [41, 48, 57]),
    (6.0, 3.0, [43, 50, 59]),
];
const TAIL_SECS: f32 = 2.0;

// -------------------------------------------------------------------------------------------------

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = arguments::parse()?;

    let sample = match &args.input_path {
        Some(path) => load_sample(path)?,
        None => generate_sample()?,
    };

    let config = SynthConfig::default()
        .sample_rate(SAMPLE_RATE)
        .voice_count(12);
    let engine = SynthEngine::new(config)?;
    engine.load_sample(sample)?;
    apply_parameters(engine.parameters())?;

    // schedule all note events
    let mut events = Vec::new();
    for (start, duration, notes) in CHORDS {
        let start_frame = (start * SAMPLE_RATE as f32) as usize;
        let end_frame = ((start + duration) * SAMPLE_RATE as f32) as usize;
        for note in notes {
            events.push(TimedSynthEvent::new(
                start_frame,
                SynthEvent::NoteOn {
                    channel: 1,
                    note,
                    velocity: 1.0,
                },
            ));
            events.push(TimedSynthEvent::new(
                end_frame,
                SynthEvent::NoteOff {
                    channel: 1,
                    note,
                    velocity: 0.0,
                    allow_tail_off: true,
                },
            ));
        }
    }
    events.sort_by_key(|event| event.sample_offset);
    let total_frames = events.last().map_or(0, |event| event.sample_offset)
        + (TAIL_SECS * SAMPLE_RATE as f32) as usize;

    let output_path = args
        .output_path
        .unwrap_or_else(|| PathBuf::from("grains.wav"));
    let spec = hound::WavSpec {
        channels: CHANNEL_COUNT as u16,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&output_path, spec)?;

    // render in blocks, passing events with block relative offsets
    let mut output = vec![0.0f32; BLOCK_SIZE * CHANNEL_COUNT];
    let mut block_events = Vec::with_capacity(events.len());
    let mut next_event = 0;
    let mut frame = 0;
    while frame < total_frames {
        block_events.clear();
        while let Some(event) = events.get(next_event) {
            if event.sample_offset >= frame + BLOCK_SIZE {
                break;
            }
            block_events.push(TimedSynthEvent::new(
                event.sample_offset - frame,
                event.event,
            ));
            next_event += 1;
        }
        engine.process_with_events(&mut output, CHANNEL_COUNT, &block_events);
        for value in &output {
            writer.write_sample(*value)?;
        }
        frame += BLOCK_SIZE;

        if frame % (SAMPLE_RATE as usize / BLOCK_SIZE * BLOCK_SIZE) == 0 {
            let monitors = engine.grain_monitors()?;
            let active_grains = monitors
                .iter()
                .flat_map(|monitor| monitor.snapshot())
                .filter(|grain| grain.active)
                .count();
            log::debug!(
                "{:.1}s: {} voices, {} grains",
                frame as f32 / SAMPLE_RATE as f32,
                engine.active_voice_count(),
                active_grains
            );
        }
    }
    writer.finalize()?;

    log::info!("Rendered {} frames into {}", frame, output_path.display());
    Ok(())
}

// -------------------------------------------------------------------------------------------------

fn apply_parameters(parameters: &Arc<SynthParameters>) -> Result<(), multigrain::Error> {
    parameters.set_value(SynthParameters::ATTACK.id(), ATTACK_MS)?;
    parameters.set_value(SynthParameters::DECAY.id(), DECAY_MS)?;
    parameters.set_value(SynthParameters::SUSTAIN.id(), SUSTAIN_PERCENT)?;
    parameters.set_value(SynthParameters::RELEASE.id(), RELEASE_MS)?;
    parameters.set_value(SynthParameters::NUM_GRAINS.id(), NUM_GRAINS)?;
    parameters.set_value(SynthParameters::GRAIN_DURATION.id(), GRAIN_DURATION)?;
    parameters.set_value(SynthParameters::POSITION.id(), POSITION)?;
    parameters.set_value(SynthParameters::POSITION_RANDOM.id(), POSITION_RANDOM)?;
    parameters.set_value(SynthParameters::GRAIN_SPEED.id(), GRAIN_SPEED)?;
    parameters.set_value(SynthParameters::MASTER_GAIN.id(), MASTER_GAIN)?;
    for descriptor in SynthParameters::descriptors() {
        let value = parameters.value(descriptor.id())?;
        log::info!(
            "{}: {}",
            descriptor.name(),
            descriptor.raw_value_to_string(value, true)
        );
    }
    Ok(())
}

fn load_sample(path: &Path) -> Result<Sample, Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let data = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|value| value.map(|v| v as f32 * scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(Sample::from_interleaved(
        &name,
        &data,
        spec.channels as usize,
        spec.sample_rate as f64,
        60,
        Sample::DEFAULT_MAX_LENGTH_SECS,
    )?)
}

fn generate_sample() -> Result<Sample, multigrain::Error> {
    // two seconds of slightly detuned, decaying harmonics at C4
    let frequency = 261.6256;
    let length = 2 * SAMPLE_RATE as usize;
    let mut left = Vec::with_capacity(length);
    let mut right = Vec::with_capacity(length);
    for frame in 0..length {
        let time = frame as f32 / SAMPLE_RATE as f32;
        let (mut l, mut r) = (0.0, 0.0);
        for harmonic in 1..=6 {
            let amplitude = 0.5 / harmonic as f32 * (-time * harmonic as f32 * 0.4).exp();
            l += amplitude * (TAU * frequency * harmonic as f32 * time).sin();
            r += amplitude * (TAU * frequency * 1.003 * harmonic as f32 * time).sin();
        }
        left.push(l);
        right.push(r);
    }
    Sample::from_planar("harmonics", &[left, right], SAMPLE_RATE as f64, 60, 10.0)
}
