//! Note normalizer
//!
//! Walks one key's queue with a two-state machine (key up / key down) and
//! rewrites it so that every release leaves the key up long enough before
//! the next press, every note lasts long enough, and no state is repeated.

use tracing::debug;

use super::types::{lands_before, moves, nearest, Event};
use crate::settings::{note_name, Settings};
use crate::timing::{Clock, Direction};

pub struct NoteNormalizer<'m> {
    clock: Clock<'m>,
    min_delay_ms: f64,
    min_note_length_ms: f64,
}

impl<'m> NoteNormalizer<'m> {
    pub fn new(clock: Clock<'m>, settings: &Settings) -> Self {
        NoteNormalizer {
            clock,
            min_delay_ms: f64::from(settings.min_delay_ms),
            min_note_length_ms: f64::from(settings.min_note_length_ms),
        }
    }

    /// Rewrite one key's queue in place and return how many events were
    /// moved, inserted, or deleted.
    pub fn normalize(&self, queue: &mut Vec<Event<'_>>) -> usize {
        let mut modifications = 0;
        let mut pressed = false;
        let mut idx = 0;

        while idx < queue.len() {
            let current = queue[idx];

            match (pressed, current.is_pressed()) {
                (false, true) => {
                    pressed = true;
                    if self.open_gap(queue, idx) {
                        modifications += 1;
                    }
                    idx += 1;
                }
                (false, false) => {
                    // Two releases in a row: the earlier one does nothing
                    if let Some(prev_off) = nearest(queue, idx, Direction::Backward, false) {
                        let removed = queue.remove(prev_off);
                        modifications += 1;
                        debug!(tick = removed.tick, note = %label(&removed), "consecutive note off removed");
                        // The surviving release now ends the note and may be too early
                        if self.lengthen(queue, idx - 1) {
                            modifications += 1;
                        }
                        continue;
                    }
                    idx += 1;
                }
                (true, true) => {
                    let Some(prev_on) = nearest(queue, idx, Direction::Backward, true) else {
                        idx += 1;
                        continue;
                    };
                    let on_tick = queue[prev_on].tick;
                    modifications += 1;

                    if !moves(on_tick, current.tick) {
                        queue.remove(idx);
                        debug!(tick = current.tick, note = %label(&current), "duplicate note on removed");
                    } else {
                        let release = current.release_at(self.place_release(on_tick, current.tick));
                        debug!(
                            tick = current.tick,
                            release = release.tick,
                            note = %label(&current),
                            "consecutive note on, release inserted"
                        );
                        queue.insert(idx, release);
                        idx += 2;
                    }
                }
                (true, false) => {
                    pressed = false;
                    if self.lengthen(queue, idx) {
                        modifications += 1;
                    }
                    idx += 1;
                }
            }
        }

        modifications
    }

    /// Pull the release before the press at `idx` earlier when it leaves the
    /// key up for less than the minimum delay.
    fn open_gap(&self, queue: &mut [Event<'_>], idx: usize) -> bool {
        let Some(prev_off) = nearest(queue, idx, Direction::Backward, false) else {
            return false;
        };
        // First note on this key
        let Some(prev_on) = nearest(queue, prev_off, Direction::Backward, true) else {
            return false;
        };

        let press_tick = queue[idx].tick;
        let off_tick = queue[prev_off].tick;
        let candidate = self
            .clock
            .tick_at_offset(press_tick, self.min_delay_ms, Direction::Backward);
        if !lands_before(candidate, off_tick) {
            return false;
        }

        let tick = self.place_release(queue[prev_on].tick, press_tick);
        if !moves(off_tick, tick) {
            return false;
        }
        queue[prev_off].tick = tick;
        debug!(from = off_tick, to = tick, note = %label(&queue[prev_off]), "note off moved to open the gap before the next press");
        true
    }

    /// Push the release at `idx` later when its note is shorter than the
    /// minimum length, stopping one tick short of the next press.
    fn lengthen(&self, queue: &mut [Event<'_>], idx: usize) -> bool {
        let Some(prev_on) = nearest(queue, idx, Direction::Backward, true) else {
            return false;
        };

        let on_tick = queue[prev_on].tick;
        let off_tick = queue[idx].tick;
        let shortest = self
            .clock
            .tick_at_offset(on_tick, self.min_note_length_ms, Direction::Forward);
        if !lands_before(off_tick, shortest) {
            return false;
        }

        let tick = match nearest(queue, idx, Direction::Forward, true) {
            Some(next_on) if !lands_before(shortest, queue[next_on].tick) => (queue[next_on].tick - 1.0).max(on_tick),
            _ => shortest,
        };
        if !moves(off_tick, tick) {
            return false;
        }
        queue[idx].tick = tick;
        debug!(from = off_tick, to = tick, note = %label(&queue[idx]), "short note lengthened");
        true
    }

    /// Where to put the release of a note pressed at `on_tick` that must end
    /// before the press at `press_tick`.
    ///
    /// Aims for the minimum delay before the press, unless that would make
    /// the note shorter than the minimum length. The result always lies
    /// within `[on_tick, press_tick - 1]`.
    fn place_release(&self, on_tick: f64, press_tick: f64) -> f64 {
        let candidate = self
            .clock
            .tick_at_offset(press_tick, self.min_delay_ms, Direction::Backward);
        let shortest = self
            .clock
            .tick_at_offset(on_tick, self.min_note_length_ms, Direction::Forward);
        let tick = if lands_before(candidate, shortest) {
            shortest
        } else {
            candidate
        };
        tick.min(press_tick - 1.0).max(on_tick)
    }
}

fn label(event: &Event<'_>) -> String {
    event.key().map(note_name).unwrap_or_default()
}
