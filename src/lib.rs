#![doc = include_str!("../README.md")]

// private mods (will be partly re-exported)
mod config;
mod engine;
mod error;
mod monitor;
mod parameters;
mod sample;
mod voice;

// public, flat re-exports
pub use config::SynthConfig;
pub use engine::SynthEngine;
pub use error::Error;
pub use monitor::GrainPoolMonitor;
pub use parameters::SynthParameters;
pub use sample::Sample;
pub use synth::{
    GranularSynth, SynthEvent, SynthSound, SynthVoice, Synthesizer, TimedSynthEvent, VoiceState,
};
pub use voice::{GranularVoice, GRAIN_POOL_SIZE};

// public mods
pub mod grain;
pub mod parameter;
pub mod synth;
pub mod utils;
