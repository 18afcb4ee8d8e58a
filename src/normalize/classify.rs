//! Event classification
//!
//! Splits one track into per-key note queues, the sustain pedal queue, and a
//! pass-through queue, stamping each event with its absolute tick.

use midly::{MetaMessage, MidiMessage, TrackEvent, TrackEventKind};
use tracing::warn;

use super::types::{Event, OutOfRangeNote, Queues};
use crate::error::PrepError;
use crate::settings::{note_name, OutOfRangePolicy, Settings};

/// Route every event of `track` to the queue that handles it.
///
/// Tempo changes are dropped here; the tempo map already holds them and the
/// merger writes back the ones that came from this track.
pub fn classify<'a>(track: &[TrackEvent<'a>], settings: &Settings) -> Result<Queues<'a>, PrepError> {
    let instrument = settings.instrument;
    let mut queues = Queues::new(usize::from(instrument.key_count));
    let mut tick = 0u64;

    for event in track {
        tick += u64::from(event.delta.as_int());
        let routed = Event::new(event.kind, tick as f64);

        match event.kind {
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. },
                ..
            } => {
                let key = key.as_int();
                match instrument.key_index(key) {
                    Some(index) => queues.pitches[index].push(routed),
                    None => match settings.out_of_range {
                        OutOfRangePolicy::Abort => {
                            return Err(PrepError::PitchOutOfRange {
                                key,
                                tick,
                                lowest: instrument.lowest_key,
                                highest: instrument.highest_key(),
                            });
                        }
                        OutOfRangePolicy::PassThrough => {
                            warn!(key, note = %note_name(key), tick, "note outside the instrument range left untouched");
                            queues.out_of_range.push(OutOfRangeNote { key, tick });
                            queues.other.push(routed);
                        }
                    },
                }
            }
            TrackEventKind::Midi {
                message: MidiMessage::Controller { controller, .. },
                ..
            } if controller.as_int() == settings.sustain_controller => queues.pedal.push(routed),
            TrackEventKind::Meta(MetaMessage::Tempo(_)) => {}
            TrackEventKind::Meta(MetaMessage::EndOfTrack) => {
                // Only the last end-of-track marker closes the track
                if let Some(earlier) = queues.end_of_track.replace(routed) {
                    queues.other.push(earlier);
                }
            }
            _ => queues.other.push(routed),
        }
    }

    Ok(queues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::num::{u24, u28, u4, u7};

    fn note_on(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(90),
                },
            },
        }
    }

    fn controller(delta: u32, controller: u8, value: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::Controller {
                    controller: u7::new(controller),
                    value: u7::new(value),
                },
            },
        }
    }

    #[test]
    fn test_routes_by_kind() {
        let track = vec![
            note_on(0, 60),
            controller(10, 64, 127),
            controller(0, 7, 100),
            TrackEvent {
                delta: u28::new(5),
                kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(500_000))),
            },
            note_on(5, 21),
            TrackEvent {
                delta: u28::new(20),
                kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
            },
        ];
        let queues = classify(&track, &Settings::default()).unwrap();

        assert_eq!(queues.pitches.len(), 88);
        assert_eq!(queues.pitches[60 - 21].len(), 1);
        assert_eq!(queues.pitches[0][0].tick, 20.0);
        assert_eq!(queues.pedal.len(), 1);
        assert_eq!(queues.pedal[0].tick, 10.0);
        // Volume change passes through, tempo change is dropped
        assert_eq!(queues.other.len(), 1);
        assert_eq!(queues.end_of_track.map(|e| e.tick), Some(40.0));
    }

    #[test]
    fn test_out_of_range_aborts() {
        let track = vec![note_on(0, 60), note_on(30, 110)];
        let result = classify(&track, &Settings::default());
        match result {
            Err(PrepError::PitchOutOfRange { key, tick, lowest, highest }) => {
                assert_eq!((key, tick, lowest, highest), (110, 30, 21, 108));
            }
            other => panic!("Expected PitchOutOfRange but got: {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_passes_through() {
        let settings = Settings {
            out_of_range: OutOfRangePolicy::PassThrough,
            ..Settings::default()
        };
        let track = vec![note_on(0, 12), note_on(30, 60)];
        let queues = classify(&track, &settings).unwrap();

        assert_eq!(queues.out_of_range, vec![OutOfRangeNote { key: 12, tick: 0 }]);
        assert_eq!(queues.other.len(), 1);
        assert_eq!(queues.pitches[60 - 21].len(), 1);
    }
}
