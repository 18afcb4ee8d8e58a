//! Pedal normalizer
//!
//! Moves each sustain press later by the configured offset. A press that
//! would end up at or past its own release is placed the minimum pedal
//! length before that release instead. Releases never move.

use tracing::debug;

use super::types::{lands_before, moves, nearest, Event};
use crate::settings::Settings;
use crate::timing::{Clock, Direction};

pub struct PedalNormalizer<'m> {
    clock: Clock<'m>,
    offset_ms: f64,
    min_length_ms: f64,
}

impl<'m> PedalNormalizer<'m> {
    pub fn new(clock: Clock<'m>, settings: &Settings) -> Self {
        PedalNormalizer {
            clock,
            offset_ms: f64::from(settings.pedal_offset_ms),
            min_length_ms: f64::from(settings.min_pedal_length_ms),
        }
    }

    /// Shift every press in `queue` and return how many landed on a new tick.
    pub fn shift(&self, queue: &mut [Event<'_>]) -> usize {
        let mut shifts = 0;

        for idx in 0..queue.len() {
            if !queue[idx].is_pressed() {
                continue;
            }
            // A press that is never lifted stays where it is
            let Some(release) = nearest(queue, idx, Direction::Forward, false) else {
                continue;
            };

            let tick = queue[idx].tick;
            let release_tick = queue[release].tick;
            let candidate = self.clock.tick_at_offset(tick, self.offset_ms, Direction::Forward);
            let shifted = if lands_before(release_tick, candidate) {
                self.clock
                    .tick_at_offset(release_tick, self.min_length_ms, Direction::Backward)
            } else {
                candidate
            };

            if moves(tick, shifted) {
                queue[idx].tick = shifted;
                shifts += 1;
                debug!(from = tick, to = shifted, release = release_tick, "pedal press shifted");
            }
        }

        shifts
    }
}
