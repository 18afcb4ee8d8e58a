//! # Settings
//!
//! Parameters for one run: the four millisecond thresholds, the instrument's
//! playable range, the sustain controller number, and what to do with notes
//! the instrument cannot play.
//!
//! ## Sources
//! Settings come from three layers, later layers winning:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A YAML settings file
//! 3. Command-line flags
//!
//! Layers 2 and 3 are both expressed as [`RawSettings`] and combined with
//! [`RawSettings::overlay`] before being validated by [`RawSettings::resolve`].
//!
//! ## Example
//! ```rust
//! use pianola::Settings;
//!
//! let settings = Settings::from_yaml(r#"
//! min-delay: 50
//! min-note-length: 20
//! pedal-offset: 100
//! min-pedal-length: 40
//! "#).unwrap();
//!
//! assert_eq!(settings.min_delay_ms, 50);
//! assert_eq!(settings.instrument.lowest_key, 21); // A0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

/// MIDI key of A0, the lowest key on a standard piano
pub const PIANO_LOWEST_KEY: u8 = 21;
pub const PIANO_KEY_COUNT: u8 = 88;
/// Damper (sustain) pedal controller number
pub const SUSTAIN_CONTROLLER: u8 = 64;

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#/Db", "D", "D#/Eb", "E", "F", "F#/Gb", "G", "G#/Ab", "A", "A#/Bb", "B",
];

/// Human-readable name of a MIDI key, e.g. `A0`, `C4`, `F#/Gb5`.
pub fn note_name(key: u8) -> String {
    let octave = i32::from(key) / 12 - 1;
    format!("{}{}", PITCH_CLASSES[usize::from(key % 12)], octave)
}

/// The contiguous block of keys an instrument can physically play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub lowest_key: u8,
    pub key_count: u8,
}

impl Instrument {
    pub const PIANO: Instrument = Instrument {
        lowest_key: PIANO_LOWEST_KEY,
        key_count: PIANO_KEY_COUNT,
    };

    pub fn new(lowest_key: u8, key_count: u8) -> Result<Self, PrepError> {
        let instrument = Instrument {
            lowest_key,
            key_count,
        };
        instrument.validate()?;
        Ok(instrument)
    }

    fn validate(&self) -> Result<(), PrepError> {
        if self.key_count == 0 {
            return Err(PrepError::invalid("key-count", "an instrument needs at least one key"));
        }
        if u16::from(self.lowest_key) + u16::from(self.key_count) > 128 {
            return Err(PrepError::invalid(
                "key-count",
                format!(
                    "{} keys starting at key {} run past the highest MIDI key (127)",
                    self.key_count, self.lowest_key
                ),
            ));
        }
        Ok(())
    }

    pub fn highest_key(&self) -> u8 {
        self.lowest_key + (self.key_count - 1)
    }

    /// Queue index of a key, or `None` if the instrument has no such key.
    pub fn key_index(&self, key: u8) -> Option<usize> {
        key.checked_sub(self.lowest_key)
            .map(usize::from)
            .filter(|&index| index < usize::from(self.key_count))
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Instrument::PIANO
    }
}

/// What to do with a note outside the instrument's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutOfRangePolicy {
    /// Reject the whole track before anything is modified
    #[default]
    Abort,
    /// Leave the note untouched, report it, and carry on
    PassThrough,
}

/// Validated parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Shortest allowed gap between a release and the next press of the same key
    pub min_delay_ms: u32,
    /// Shortest allowed note
    pub min_note_length_ms: u32,
    /// How far pedal presses are moved later
    pub pedal_offset_ms: u32,
    /// Shortest pedal press left when a shifted press would overrun its release
    pub min_pedal_length_ms: u32,
    pub instrument: Instrument,
    pub sustain_controller: u8,
    pub out_of_range: OutOfRangePolicy,
}

impl Settings {
    /// Parse and validate a YAML settings document.
    pub fn from_yaml(content: &str) -> Result<Settings, PrepError> {
        RawSettings::from_yaml(content)?.resolve()
    }

    /// Re-check the fields that cannot be enforced by their types alone.
    pub(crate) fn validate(&self) -> Result<(), PrepError> {
        self.instrument.validate()?;
        if self.sustain_controller > 127 {
            return Err(PrepError::invalid(
                "sustain-controller",
                format!("controller numbers run from 0 to 127, got {}", self.sustain_controller),
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            min_delay_ms: 0,
            min_note_length_ms: 0,
            pedal_offset_ms: 0,
            min_pedal_length_ms: 0,
            instrument: Instrument::PIANO,
            sustain_controller: SUSTAIN_CONTROLLER,
            out_of_range: OutOfRangePolicy::Abort,
        }
    }
}

/// Raw settings for YAML deserialization and command-line overrides.
///
/// Thresholds are read as plain numbers so that negative or fractional
/// values can be reported by name instead of failing deep inside serde.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawSettings {
    pub min_delay: Option<f64>,
    pub min_note_length: Option<f64>,
    pub pedal_offset: Option<f64>,
    pub min_pedal_length: Option<f64>,
    pub lowest_key: Option<u8>,
    pub key_count: Option<u8>,
    pub sustain_controller: Option<u8>,
    pub out_of_range: Option<OutOfRangePolicy>,
}

impl RawSettings {
    pub fn from_yaml(content: &str) -> Result<RawSettings, PrepError> {
        if content.trim().is_empty() {
            return Ok(RawSettings::default());
        }
        serde_yaml::from_str(content).map_err(|e| PrepError::Settings(e.to_string()))
    }

    /// Values set in `over` replace the ones in `self`.
    pub fn overlay(self, over: RawSettings) -> RawSettings {
        RawSettings {
            min_delay: over.min_delay.or(self.min_delay),
            min_note_length: over.min_note_length.or(self.min_note_length),
            pedal_offset: over.pedal_offset.or(self.pedal_offset),
            min_pedal_length: over.min_pedal_length.or(self.min_pedal_length),
            lowest_key: over.lowest_key.or(self.lowest_key),
            key_count: over.key_count.or(self.key_count),
            sustain_controller: over.sustain_controller.or(self.sustain_controller),
            out_of_range: over.out_of_range.or(self.out_of_range),
        }
    }

    pub fn resolve(&self) -> Result<Settings, PrepError> {
        let defaults = Settings::default();

        let instrument = Instrument::new(
            self.lowest_key.unwrap_or(defaults.instrument.lowest_key),
            self.key_count.unwrap_or(defaults.instrument.key_count),
        )?;

        let settings = Settings {
            min_delay_ms: parse_millis("min-delay", self.min_delay)?,
            min_note_length_ms: parse_millis("min-note-length", self.min_note_length)?,
            pedal_offset_ms: parse_millis("pedal-offset", self.pedal_offset)?,
            min_pedal_length_ms: parse_millis("min-pedal-length", self.min_pedal_length)?,
            instrument,
            sustain_controller: self.sustain_controller.unwrap_or(defaults.sustain_controller),
            out_of_range: self.out_of_range.unwrap_or_default(),
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn parse_millis(name: &str, value: Option<f64>) -> Result<u32, PrepError> {
    let Some(value) = value else {
        return Ok(0);
    };
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(PrepError::invalid(
            name,
            format!("must be a non-negative whole number of milliseconds, got {}", value),
        ));
    }
    Ok(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(21), "A0");
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(66), "F#/Gb4");
        assert_eq!(note_name(108), "C8");
    }

    #[test]
    fn test_piano_range() {
        let piano = Instrument::PIANO;
        assert_eq!(piano.highest_key(), 108);
        assert_eq!(piano.key_index(21), Some(0));
        assert_eq!(piano.key_index(108), Some(87));
        assert_eq!(piano.key_index(20), None);
        assert_eq!(piano.key_index(109), None);
    }

    #[test]
    fn test_instrument_past_key_127() {
        let result = Instrument::new(100, 40);
        assert!(matches!(result, Err(PrepError::InvalidParameter { ref name, .. }) if name == "key-count"));
        assert!(Instrument::new(0, 128).is_ok());
        assert!(Instrument::new(60, 0).is_err());
    }

    #[test]
    fn test_yaml_settings() {
        let settings = Settings::from_yaml(
            "min-delay: 50\nmin-note-length: 20\npedal-offset: 120\nmin-pedal-length: 40\nlowest-key: 19\nout-of-range: pass-through\n",
        )
        .unwrap();
        assert_eq!(settings.min_delay_ms, 50);
        assert_eq!(settings.min_note_length_ms, 20);
        assert_eq!(settings.pedal_offset_ms, 120);
        assert_eq!(settings.min_pedal_length_ms, 40);
        assert_eq!(settings.instrument, Instrument { lowest_key: 19, key_count: 88 });
        assert_eq!(settings.sustain_controller, 64);
        assert_eq!(settings.out_of_range, OutOfRangePolicy::PassThrough);
    }

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let settings = Settings::from_yaml("").unwrap();
        assert_eq!(settings.min_delay_ms, 0);
        assert_eq!(settings.instrument, Instrument::PIANO);
        assert_eq!(settings.sustain_controller, SUSTAIN_CONTROLLER);
        assert_eq!(settings.out_of_range, OutOfRangePolicy::Abort);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let result = Settings::from_yaml("min-delay: -5");
        match result {
            Err(PrepError::InvalidParameter { name, message }) => {
                assert_eq!(name, "min-delay");
                assert!(message.contains("-5"), "unexpected message: {}", message);
            }
            other => panic!("Expected InvalidParameter but got: {:?}", other),
        }
    }

    #[test]
    fn test_fractional_threshold_rejected() {
        let result = Settings::from_yaml("min-note-length: 12.5");
        assert!(matches!(result, Err(PrepError::InvalidParameter { ref name, .. }) if name == "min-note-length"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Settings::from_yaml("min-delays: 5");
        assert!(matches!(result, Err(PrepError::Settings(_))));
    }

    #[test]
    fn test_overlay_prefers_later_layer() {
        let file = RawSettings {
            min_delay: Some(50.0),
            pedal_offset: Some(100.0),
            ..Default::default()
        };
        let flags = RawSettings {
            min_delay: Some(30.0),
            ..Default::default()
        };
        let settings = file.overlay(flags).resolve().unwrap();
        assert_eq!(settings.min_delay_ms, 30);
        assert_eq!(settings.pedal_offset_ms, 100);
    }
}
