//! Stream merger
//!
//! Puts the queues back together as one delta-timed track.

use midly::num::{u24, u28};
use midly::{MetaMessage, TrackEvent, TrackEventKind};

use super::types::{Event, Queues};
use crate::error::PrepError;
use crate::tempo::TempoMap;

/// Largest delta a track event can carry
const MAX_DELTA: u64 = (1 << 28) - 1;

/// Merge the queues into tick order and convert back to delta times.
///
/// Events landing on the same whole tick keep the queue order: pass-through
/// events, then the track's own tempo changes, then the pedal, then notes
/// from the lowest key up. End-of-track always comes last.
pub fn merge<'a>(queues: Queues<'a>, tempo_map: &TempoMap) -> Result<Vec<TrackEvent<'a>>, PrepError> {
    let Queues {
        pitches,
        pedal,
        other,
        end_of_track,
        ..
    } = queues;

    let mut events = other;
    events.extend(tempo_map.target_track_changes().map(|change| {
        Event::new(
            TrackEventKind::Meta(MetaMessage::Tempo(u24::new(change.micros_per_beat))),
            change.tick as f64,
        )
    }));
    events.extend(pedal);
    events.extend(pitches.into_iter().flatten());
    events.sort_by(|a, b| a.tick.round().total_cmp(&b.tick.round()));

    let mut track = Vec::with_capacity(events.len() + 1);
    let mut previous = 0u64;

    for event in events {
        let tick = whole_tick(event.tick);
        track.push(TrackEvent {
            delta: delta(previous, tick)?,
            kind: event.kind,
        });
        previous = tick;
    }

    if let Some(end) = end_of_track {
        let tick = whole_tick(end.tick).max(previous);
        track.push(TrackEvent {
            delta: delta(previous, tick)?,
            kind: end.kind,
        });
    }

    Ok(track)
}

fn whole_tick(tick: f64) -> u64 {
    tick.round().max(0.0) as u64
}

fn delta(previous: u64, tick: u64) -> Result<u28, PrepError> {
    let gap = tick.saturating_sub(previous);
    if gap > MAX_DELTA {
        return Err(PrepError::InputUnreadable(format!(
            "gap of {} ticks before tick {} does not fit in a track event",
            gap, tick
        )));
    }
    Ok(u28::new(gap as u32))
}
