//! # Time Conversion
//!
//! Converts between tick positions and real time in milliseconds, walking
//! across every tempo segment in between.
//!
//! Within one segment, `ms = ticks * micros_per_beat / ticks_per_beat / 1000`,
//! so the inverse is exact: `ticks = ms * 1000 * ticks_per_beat / micros_per_beat`.
//! The same number of milliseconds therefore covers a different number of
//! ticks depending on where on the timeline it is measured.
//!
//! Ticks are `f64` here. They are only rounded to whole ticks when the track
//! is written back out.
//!
//! ## Example
//! ```rust
//! use pianola::{Clock, Direction, TempoChange, TempoMap};
//!
//! // 120 BPM for the first beat, then twice as fast
//! let map = TempoMap::from_changes(vec![
//!     TempoChange { tick: 0, micros_per_beat: 500_000, in_target_track: true },
//!     TempoChange { tick: 480, micros_per_beat: 250_000, in_target_track: true },
//! ]).unwrap();
//! let clock = Clock::new(&map, 480);
//!
//! assert_eq!(clock.duration_ms(0.0, 960.0), 750.0);
//! assert_eq!(clock.tick_at_offset(0.0, 750.0, Direction::Forward), 960.0);
//! ```

use crate::tempo::TempoMap;

/// Which way along the timeline to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Tick/millisecond conversion against one file's tempo map.
#[derive(Debug, Clone, Copy)]
pub struct Clock<'m> {
    tempo_map: &'m TempoMap,
    ticks_per_beat: f64,
}

impl<'m> Clock<'m> {
    pub fn new(tempo_map: &'m TempoMap, ticks_per_beat: u16) -> Self {
        Clock {
            tempo_map,
            ticks_per_beat: f64::from(ticks_per_beat),
        }
    }

    /// Milliseconds covered by `[start, end]` inside a single segment.
    fn segment_ms(&self, start: f64, end: f64, segment: usize) -> f64 {
        (end - start) * self.tempo_map.segment_tempo(segment) / self.ticks_per_beat / 1000.0
    }

    /// Ticks covered by `ms` inside a single segment.
    fn segment_ticks(&self, ms: f64, segment: usize) -> f64 {
        ms * 1000.0 * self.ticks_per_beat / self.tempo_map.segment_tempo(segment)
    }

    /// Real time between two ticks. `start` must not be after `end`.
    pub fn duration_ms(&self, start: f64, end: f64) -> f64 {
        let last = self.tempo_map.segment_at(end);
        let mut segment = self.tempo_map.segment_at(start);
        let mut from = start;
        let mut total = 0.0;

        while segment < last {
            let boundary = self.tempo_map.segment_start(segment + 1);
            total += self.segment_ms(from, boundary, segment);
            from = boundary;
            segment += 1;
        }

        total + self.segment_ms(from, end, last)
    }

    /// The tick `ms` milliseconds away from `start`.
    ///
    /// Walking backward never goes past tick 0.
    pub fn tick_at_offset(&self, start: f64, ms: f64, direction: Direction) -> f64 {
        let mut segment = self.tempo_map.segment_at(start);
        let mut from = start;
        let mut remaining = ms;

        match direction {
            Direction::Forward => {
                while segment + 1 < self.tempo_map.segment_count() {
                    let boundary = self.tempo_map.segment_start(segment + 1);
                    let span = self.segment_ms(from, boundary, segment);
                    if span > remaining {
                        break;
                    }
                    from = boundary;
                    remaining -= span;
                    segment += 1;
                }
                from + self.segment_ticks(remaining, segment)
            }
            Direction::Backward => {
                while segment > 0 {
                    let boundary = self.tempo_map.segment_start(segment);
                    let span = self.segment_ms(boundary, from, segment);
                    if span > remaining {
                        break;
                    }
                    from = boundary;
                    remaining -= span;
                    segment -= 1;
                }
                (from - self.segment_ticks(remaining, segment)).max(0.0)
            }
        }
    }
}
