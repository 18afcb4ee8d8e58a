//! Prepare a MIDI track for playback on a player piano.
//!
//! A player piano cannot strike a key that has not finished lifting, and
//! very short notes may never sound at all. `pianola` rewrites one track of
//! a Standard MIDI File so that repeated notes leave time for the key to
//! lift, notes are long enough to sound, redundant presses and releases are
//! resolved, and sustain pedal presses land after the notes they catch.
//!
//! Start with [`prepare_file()`] or [`prepare_bytes()`]; use
//! [`normalize_track()`] to work on tracks parsed elsewhere.

pub mod api;
pub mod error;
pub mod normalize;
pub mod settings;
pub mod tempo;
pub mod timing;

pub use api::{
    describe_tracks, output_path, prepare_bytes, prepare_file, prepare_smf, ticks_per_beat, Summary,
    TrackInfo,
};
pub use error::*;
pub use normalize::{normalize_track, OutOfRangeNote, Prepared};
pub use settings::{note_name, Instrument, OutOfRangePolicy, RawSettings, Settings};
pub use tempo::{TempoChange, TempoMap, DEFAULT_MICROS_PER_BEAT};
pub use timing::{Clock, Direction};
