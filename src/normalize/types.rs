//! Working types for the normalization pipeline
//!
//! This module defines the events that move between queues while a track is
//! rewritten, and the result handed back to the caller.

use midly::num::u7;
use midly::{MidiMessage, TrackEvent, TrackEventKind};
use serde::Serialize;

use crate::timing::Direction;

/// Velocity written on releases the normalizer has to create
const SYNTHETIC_RELEASE_VELOCITY: u8 = 64;

/// A message positioned at an absolute tick.
///
/// The tick is fractional while the track is being rewritten and is only
/// rounded when the track is merged back into delta-timed events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event<'a> {
    pub kind: TrackEventKind<'a>,
    pub tick: f64,
}

impl<'a> Event<'a> {
    pub fn new(kind: TrackEventKind<'a>, tick: f64) -> Self {
        Event { kind, tick }
    }

    pub fn is_pressed(&self) -> bool {
        is_pressed(&self.kind)
    }

    /// MIDI key of a note event.
    pub fn key(&self) -> Option<u8> {
        match self.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. },
                ..
            } => Some(key.as_int()),
            _ => None,
        }
    }

    /// A note-off for the same channel and key as this event, placed at `tick`.
    pub(crate) fn release_at(&self, tick: f64) -> Event<'a> {
        let kind = match self.kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. },
            } => TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(SYNTHETIC_RELEASE_VELOCITY),
                },
            },
            other => other,
        };
        Event::new(kind, tick)
    }
}

/// Whether a message leaves a key or the pedal held down.
///
/// A note-on with velocity 0 is a release, as is a controller value of 0.
pub fn is_pressed(kind: &TrackEventKind<'_>) -> bool {
    match kind {
        TrackEventKind::Midi {
            message: MidiMessage::NoteOn { vel, .. },
            ..
        } => vel.as_int() > 0,
        TrackEventKind::Midi {
            message: MidiMessage::Controller { value, .. },
            ..
        } => value.as_int() > 0,
        _ => false,
    }
}

/// Index of the closest event in the given press state, searching outward from
/// `from` (exclusive) in `direction`.
pub fn nearest(queue: &[Event<'_>], from: usize, direction: Direction, pressed: bool) -> Option<usize> {
    match direction {
        Direction::Backward => queue
            .get(..from)?
            .iter()
            .rposition(|e| e.is_pressed() == pressed),
        Direction::Forward => queue
            .get(from + 1..)?
            .iter()
            .position(|e| e.is_pressed() == pressed)
            .map(|offset| from + 1 + offset),
    }
}

/// Whether `a` lands on an earlier whole tick than `b` once written out.
pub(crate) fn lands_before(a: f64, b: f64) -> bool {
    a.round() < b.round()
}

/// Whether moving an event from `old` to `new` changes its written tick.
pub(crate) fn moves(old: f64, new: f64) -> bool {
    old.round() != new.round()
}

/// A track split into the queues the normalizers work on.
#[derive(Debug, Default)]
pub struct Queues<'a> {
    /// One queue per instrument key, lowest key first
    pub pitches: Vec<Vec<Event<'a>>>,
    pub pedal: Vec<Event<'a>>,
    /// Everything that is neither a note, a sustain change, nor a tempo change
    pub other: Vec<Event<'a>>,
    pub end_of_track: Option<Event<'a>>,
    pub out_of_range: Vec<OutOfRangeNote>,
}

impl<'a> Queues<'a> {
    pub fn new(key_count: usize) -> Self {
        Queues {
            pitches: vec![Vec::new(); key_count],
            ..Default::default()
        }
    }
}

/// A note left untouched because the instrument has no key for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutOfRangeNote {
    pub key: u8,
    pub tick: u64,
}

/// The rewritten track and what it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared<'a> {
    /// Replacement events for the track, with fresh delta times
    pub events: Vec<TrackEvent<'a>>,
    /// Note events moved, inserted, or deleted
    pub modifications: usize,
    /// Pedal presses moved
    pub pedal_shifts: usize,
    pub out_of_range: Vec<OutOfRangeNote>,
}
