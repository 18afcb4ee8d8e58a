//! # Public API
//!
//! Entry points that take a Standard MIDI File, prepare one of its tracks,
//! and hand the file back.
//!
//! ## Functions
//!
//! - [`prepare_file()`] - Read a file from disk, prepare a track, write the result
//! - [`prepare_bytes()`] - Same, on an in-memory file
//! - [`prepare_smf()`] - Same, on a file already parsed with `midly`
//! - [`output_path()`] - Where the prepared copy of a file goes by default
//! - [`describe_tracks()`] - What each track holds, to help pick one
//!
//! ## Typical Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use pianola::{output_path, prepare_file, Settings};
//!
//! let settings = Settings::from_yaml("min-delay: 50\nmin-note-length: 20")?;
//! let input = Path::new("nocturne.mid");
//!
//! let summary = prepare_file(input, &output_path(input), 1, &settings)?;
//! println!("{} events changed", summary.modifications);
//! # Ok::<(), pianola::PrepError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use midly::{Header, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::Serialize;
use tracing::info;

use crate::error::PrepError;
use crate::normalize::{is_pressed, normalize_track, OutOfRangeNote};
use crate::settings::Settings;

/// Suffix added to the file stem of a prepared copy
pub const OUTPUT_SUFFIX: &str = "_modified";

/// What a run did to a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Summary {
    pub track: usize,
    pub events_in: usize,
    pub events_out: usize,
    /// Note events moved, inserted, or deleted
    pub modifications: usize,
    pub pedal_shifts: usize,
    pub out_of_range_notes: Vec<OutOfRangeNote>,
}

/// Overview of one track of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackInfo {
    pub index: usize,
    pub name: Option<String>,
    pub events: usize,
    /// Note presses, not counting zero-velocity note-ons
    pub notes: usize,
    pub tempo_changes: usize,
}

/// Ticks per beat of a metrical file.
///
/// # Errors
/// Returns [`PrepError::InputUnreadable`] for SMPTE timecode files, which have
/// no beats to convert against.
pub fn ticks_per_beat(header: &Header) -> Result<u16, PrepError> {
    match header.timing {
        Timing::Metrical(ticks) => Ok(ticks.as_int()),
        Timing::Timecode(fps, subframes) => Err(PrepError::InputUnreadable(format!(
            "SMPTE timecode timing ({} fps, {} subframes) is not supported",
            fps.as_int(),
            subframes
        ))),
    }
}

/// Prepare track `track` of a parsed file, replacing it in place.
///
/// On error the file is left untouched.
pub fn prepare_smf(smf: &mut Smf<'_>, track: usize, settings: &Settings) -> Result<Summary, PrepError> {
    let ticks_per_beat = ticks_per_beat(&smf.header)?;
    let prepared = normalize_track(ticks_per_beat, &smf.tracks, track, settings)?;

    let summary = Summary {
        track,
        events_in: smf.tracks.get(track).map_or(0, Vec::len),
        events_out: prepared.events.len(),
        modifications: prepared.modifications,
        pedal_shifts: prepared.pedal_shifts,
        out_of_range_notes: prepared.out_of_range,
    };
    if let Some(slot) = smf.tracks.get_mut(track) {
        *slot = prepared.events;
    }
    Ok(summary)
}

/// Prepare track `track` of an in-memory Standard MIDI File.
///
/// # Example
/// ```rust
/// use midly::num::{u15, u28, u4, u7};
/// use midly::{Format, Header, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
/// use pianola::{prepare_bytes, Settings};
///
/// let key = |delta: u32, vel: u8| TrackEvent {
///     delta: u28::new(delta),
///     kind: TrackEventKind::Midi {
///         channel: u4::new(0),
///         message: MidiMessage::NoteOn { key: u7::new(64), vel: u7::new(vel) },
///     },
/// };
/// let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(u15::new(480))));
/// smf.tracks.push(vec![key(0, 90), key(5, 0)]);
/// let mut bytes = Vec::new();
/// smf.write_std(&mut bytes).unwrap();
///
/// let settings = Settings { min_note_length_ms: 100, ..Settings::default() };
/// let (_, summary) = prepare_bytes(&bytes, 0, &settings)?;
/// assert_eq!(summary.modifications, 1);
/// # Ok::<(), pianola::PrepError>(())
/// ```
///
/// # Errors
/// Returns [`PrepError::InputUnreadable`] if `bytes` is not a Standard MIDI
/// File, plus anything [`prepare_smf()`] can return.
pub fn prepare_bytes(bytes: &[u8], track: usize, settings: &Settings) -> Result<(Vec<u8>, Summary), PrepError> {
    let mut smf = Smf::parse(bytes).map_err(|e| PrepError::InputUnreadable(e.to_string()))?;
    let summary = prepare_smf(&mut smf, track, settings)?;

    let mut out = Vec::with_capacity(bytes.len());
    smf.write_std(&mut out)
        .map_err(|e| PrepError::Encode(e.to_string()))?;
    Ok((out, summary))
}

/// Read `input`, prepare track `track`, and write the whole file to `output`.
pub fn prepare_file(input: &Path, output: &Path, track: usize, settings: &Settings) -> Result<Summary, PrepError> {
    let bytes = fs::read(input).map_err(|source| PrepError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let (prepared, summary) = prepare_bytes(&bytes, track, settings)?;
    fs::write(output, prepared).map_err(|source| PrepError::Io {
        path: output.to_path_buf(),
        source,
    })?;

    info!(input = %input.display(), output = %output.display(), "wrote prepared file");
    Ok(summary)
}

/// Default location of the prepared copy: `<stem>_modified.mid` next to `input`.
pub fn output_path(input: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(OUTPUT_SUFFIX);
    name.push(".mid");
    input.with_file_name(name)
}

/// Per-track overview of a parsed file.
pub fn describe_tracks(smf: &Smf<'_>) -> Vec<TrackInfo> {
    smf.tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let mut info = TrackInfo {
                index,
                name: None,
                events: track.len(),
                notes: 0,
                tempo_changes: 0,
            };
            for event in track {
                match event.kind {
                    TrackEventKind::Meta(MetaMessage::TrackName(name)) if info.name.is_none() => {
                        info.name = Some(String::from_utf8_lossy(name).into_owned());
                    }
                    TrackEventKind::Meta(MetaMessage::Tempo(_)) => info.tempo_changes += 1,
                    TrackEventKind::Midi {
                        message: MidiMessage::NoteOn { .. },
                        ..
                    } if is_pressed(&event.kind) => info.notes += 1,
                    _ => {}
                }
            }
            info
        })
        .collect()
}
