//! # Normalize Module
//!
//! Rewrite one track so a player piano can actually play it.
//!
//! ## Purpose
//! A player piano needs time to lift a key before striking it again, needs
//! every note held long enough for the hammer to reach the string, and
//! benefits from catching the sustain pedal a moment after the notes it is
//! meant to hold. This module rewrites one track so that:
//! 1. **Repeated notes** leave the key up for at least the minimum delay
//! 2. **Short notes** last at least the minimum note length
//! 3. **Redundant events** (press after press, release after release) are resolved
//! 4. **Pedal presses** move later by the pedal offset
//!
//! All thresholds are in milliseconds and are converted to ticks at the
//! point on the timeline where they apply, through the file's [`TempoMap`].
//!
//! ## Sub-modules
//! - `types` - Event, Queues, Prepared type definitions
//! - `classify` - Splitting a track into per-key, pedal and pass-through queues
//! - `notes` - Per-key press/release state machine
//! - `pedal` - Sustain pedal shift
//! - `merge` - Reassembling the queues into a delta-timed track
//!
//! ## Entry Point
//! [`normalize_track()`] - Rewrite one track of an already parsed file
//!
//! ## Example
//! ```rust
//! use midly::num::{u28, u4, u7};
//! use midly::{MidiMessage, TrackEvent, TrackEventKind};
//! use pianola::{normalize_track, Settings};
//!
//! let note = |delta: u32, vel: u8| TrackEvent {
//!     delta: u28::new(delta),
//!     kind: TrackEventKind::Midi {
//!         channel: u4::new(0),
//!         message: MidiMessage::NoteOn { key: u7::new(60), vel: u7::new(vel) },
//!     },
//! };
//! // The key is released 10 ticks before it is struck again
//! let tracks = vec![vec![note(0, 80), note(100, 0), note(10, 80), note(100, 0)]];
//! let settings = Settings { min_delay_ms: 50, ..Settings::default() };
//!
//! let prepared = normalize_track(480, &tracks, 0, &settings).unwrap();
//!
//! assert_eq!(prepared.modifications, 1);
//! assert_eq!(prepared.events[1].delta.as_int(), 62); // 50 ms before the next press
//! ```
//!
//! ## Ordering
//!
//! Queues are normalized independently and only merged at the end, so an
//! event's position in its queue is its original stream order, not its
//! tick order. Ticks stay fractional until the merge rounds them.

mod classify;
mod merge;
mod notes;
mod pedal;
mod types;


pub use classify::classify;
pub use merge::merge;
pub use notes::NoteNormalizer;
pub use pedal::PedalNormalizer;
pub use types::{is_pressed, nearest, Event, OutOfRangeNote, Prepared, Queues};

use midly::Track;
use tracing::{info, warn};

use crate::error::PrepError;
use crate::settings::Settings;
use crate::tempo::{TempoMap, DEFAULT_MICROS_PER_BEAT};
use crate::timing::Clock;

/// Rewrite track `target` of a parsed file.
///
/// `tracks` is every track of the file, since tempo changes anywhere in the
/// file govern the target track's timing. Nothing is modified; the caller
/// swaps [`Prepared::events`] in for the original track.
///
/// # Errors
/// - [`PrepError::InvalidParameter`] if `target` is not a track of the file
///   or `settings` describe an impossible instrument
/// - [`PrepError::InputUnreadable`] if `ticks_per_beat` is zero or a tempo
///   change is zero
/// - [`PrepError::PitchOutOfRange`] for a note the instrument cannot play,
///   unless the out-of-range policy passes such notes through
pub fn normalize_track<'a>(
    ticks_per_beat: u16,
    tracks: &[Track<'a>],
    target: usize,
    settings: &Settings,
) -> Result<Prepared<'a>, PrepError> {
    settings.validate()?;
    if ticks_per_beat == 0 {
        return Err(PrepError::InputUnreadable(
            "ticks per beat must be positive".to_string(),
        ));
    }
    let Some(track) = tracks.get(target) else {
        return Err(PrepError::invalid(
            "track",
            format!("index {} is out of range, the file has {} track(s)", target, tracks.len()),
        ));
    };

    let tempo_map = TempoMap::build(tracks, target)?;
    match tempo_map.first_tick() {
        None => warn!(
            micros_per_beat = DEFAULT_MICROS_PER_BEAT,
            "no tempo declared, using the default tempo throughout"
        ),
        Some(tick) if tick > 0 => warn!(
            micros_per_beat = DEFAULT_MICROS_PER_BEAT,
            first_tempo_tick = tick,
            "no tempo declared at the start, using the default tempo until the first change"
        ),
        Some(_) => {}
    }

    let mut queues = classify(track, settings)?;
    let clock = Clock::new(&tempo_map, ticks_per_beat);

    let notes = NoteNormalizer::new(clock, settings);
    let modifications: usize = queues.pitches.iter_mut().map(|queue| notes.normalize(queue)).sum();
    let pedal_shifts = PedalNormalizer::new(clock, settings).shift(&mut queues.pedal);

    let out_of_range = std::mem::take(&mut queues.out_of_range);
    let events = merge(queues, &tempo_map)?;

    info!(
        track = target,
        events_in = track.len(),
        events_out = events.len(),
        modifications,
        pedal_shifts,
        "track normalized"
    );

    Ok(Prepared {
        events,
        modifications,
        pedal_shifts,
        out_of_range,
    })
}
