//! # Tempo Map
//!
//! Every tempo change in the file, from every track, sorted by absolute tick.
//!
//! Tempo applies to the whole file even though each change lives in one
//! track, so the map is built from all tracks. Each change remembers whether
//! it came from the track being prepared; only those are written back into
//! that track.
//!
//! ## Segments
//! The map divides the timeline into segments, each running from one tempo
//! change to the next. Ticks before the first change (or every tick, when the
//! file declares no tempo at all) fall into a leading segment that plays at
//! [`DEFAULT_MICROS_PER_BEAT`], the Standard MIDI File default of 120 BPM.
//!
//! ```text
//! tick:    0 ........ 480 ........ 960 .........
//! segment: |    0     |     1      |     2  ...
//! tempo:   | default  | changes[0] | changes[1]
//! ```

use midly::{MetaMessage, Track, TrackEventKind};

use crate::error::PrepError;

/// Tempo assumed where the file has not declared one (120 BPM)
pub const DEFAULT_MICROS_PER_BEAT: u32 = 500_000;

/// One tempo change at an absolute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: u64,
    pub micros_per_beat: u32,
    /// Whether the change was read from the track being prepared
    pub in_target_track: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TempoMap {
    changes: Vec<TempoChange>,
}

impl TempoMap {
    /// Collect the tempo changes of every track, tagging those in `target`.
    pub fn build(tracks: &[Track<'_>], target: usize) -> Result<TempoMap, PrepError> {
        let mut changes = Vec::new();

        for (index, track) in tracks.iter().enumerate() {
            let mut tick = 0u64;
            for event in track {
                tick += u64::from(event.delta.as_int());
                if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                    changes.push(TempoChange {
                        tick,
                        micros_per_beat: tempo.as_int(),
                        in_target_track: index == target,
                    });
                }
            }
        }

        TempoMap::from_changes(changes)
    }

    /// Build a map from changes in any order. Changes sharing a tick keep
    /// their relative order, so the last one listed wins.
    pub fn from_changes(mut changes: Vec<TempoChange>) -> Result<TempoMap, PrepError> {
        if let Some(change) = changes.iter().find(|c| c.micros_per_beat == 0) {
            return Err(PrepError::InputUnreadable(format!(
                "tempo change at tick {} declares zero microseconds per beat",
                change.tick
            )));
        }
        changes.sort_by_key(|c| c.tick);
        Ok(TempoMap { changes })
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Tick of the first declared tempo, if any.
    pub fn first_tick(&self) -> Option<u64> {
        self.changes.first().map(|c| c.tick)
    }

    /// Changes that belong to the track being prepared, in tick order.
    pub fn target_track_changes(&self) -> impl Iterator<Item = &TempoChange> + '_ {
        self.changes.iter().filter(|c| c.in_target_track)
    }

    /// Index of the last change at or before `tick`.
    ///
    /// Returns `None` when `tick` comes before every change; such ticks play
    /// at [`DEFAULT_MICROS_PER_BEAT`].
    pub fn segment_index_for(&self, tick: f64) -> Option<usize> {
        self.segment_at(tick).checked_sub(1)
    }

    /// Tempo in effect at `tick`, falling back to the default before the first change.
    pub fn micros_per_beat_at(&self, tick: f64) -> u32 {
        match self.segment_index_for(tick) {
            Some(index) => self.changes[index].micros_per_beat,
            None => DEFAULT_MICROS_PER_BEAT,
        }
    }

    /// Number of segments, counting the leading default-tempo segment.
    pub(crate) fn segment_count(&self) -> usize {
        self.changes.len() + 1
    }

    /// Segment containing `tick`; segment 0 is the leading default-tempo one.
    pub(crate) fn segment_at(&self, tick: f64) -> usize {
        self.changes.partition_point(|c| c.tick as f64 <= tick)
    }

    pub(crate) fn segment_start(&self, segment: usize) -> f64 {
        match segment {
            0 => 0.0,
            n => self.changes[n - 1].tick as f64,
        }
    }

    pub(crate) fn segment_tempo(&self, segment: usize) -> f64 {
        match segment {
            0 => f64::from(DEFAULT_MICROS_PER_BEAT),
            n => f64::from(self.changes[n - 1].micros_per_beat),
        }
    }
}
