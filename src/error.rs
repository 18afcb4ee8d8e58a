//! # Error Types
//!
//! This module defines all error types for preparing a track.
//!
//! Errors are raised before any event is modified: a run either produces a
//! complete replacement track or nothing at all.
//!
//! ## Error Types
//! - `InputUnreadable` - The MIDI bytes could not be parsed, or use a timing mode we cannot handle
//! - `InvalidParameter` - A threshold, track index, or instrument setting is out of range
//! - `PitchOutOfRange` - A note lies outside the instrument's keys (under the abort policy)
//! - `Settings` - The YAML settings file could not be read
//! - `Encode` - The prepared file could not be encoded
//! - `Io` - Reading or writing a file failed
//!
//! ## Usage
//! ```rust,no_run
//! use pianola::{prepare_file, PrepError, Settings};
//!
//! match prepare_file("song.mid".as_ref(), "song_modified.mid".as_ref(), 0, &Settings::default()) {
//!     Ok(summary) => println!("{} events changed", summary.modifications),
//!     Err(PrepError::PitchOutOfRange { key, tick, .. }) => {
//!         eprintln!("Key {} at tick {} cannot be played", key, tick);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    /// The input could not be turned into tracks of timestamped messages.
    ///
    /// # Example
    /// ```
    /// # use pianola::PrepError;
    /// let err = PrepError::InputUnreadable("SMPTE timecode timing is not supported".to_string());
    /// assert_eq!(err.to_string(), "Unreadable MIDI input: SMPTE timecode timing is not supported");
    /// ```
    #[error("Unreadable MIDI input: {0}")]
    InputUnreadable(String),

    /// A parameter was rejected before any event was touched.
    ///
    /// # Example
    /// ```
    /// # use pianola::PrepError;
    /// let err = PrepError::InvalidParameter {
    ///     name: "min-delay".to_string(),
    ///     message: "must be a non-negative whole number of milliseconds, got -5".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Invalid parameter min-delay: must be a non-negative whole number of milliseconds, got -5"
    /// );
    /// ```
    #[error("Invalid parameter {name}: {message}")]
    InvalidParameter { name: String, message: String },

    /// A note the instrument has no key for.
    ///
    /// # Example
    /// ```
    /// # use pianola::PrepError;
    /// let err = PrepError::PitchOutOfRange { key: 12, tick: 960, lowest: 21, highest: 108 };
    /// assert_eq!(err.to_string(), "Note 12 at tick 960 is outside the instrument range 21..=108");
    /// ```
    #[error("Note {key} at tick {tick} is outside the instrument range {lowest}..={highest}")]
    PitchOutOfRange {
        key: u8,
        tick: u64,
        lowest: u8,
        highest: u8,
    },

    #[error("Invalid settings: {0}")]
    Settings(String),

    /// The prepared file could not be written out as a Standard MIDI File.
    #[error("Cannot encode MIDI output: {0}")]
    Encode(String),

    #[error("Cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PrepError {
    pub(crate) fn invalid(name: &str, message: impl Into<String>) -> Self {
        PrepError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
