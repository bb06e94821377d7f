//! Conversion options.
//!
//! [`Options`] is passed to every `encode`/`decode` call. It deserializes with
//! all fields optional, so it can be loaded from any serde source.
//!
//! # Example
//! ```rust
//! use dictcodec::Options;
//!
//! let options = Options::new()
//!     .with_raw_bytes(true)
//!     .with_omit_null_fields(true);
//! assert!(!options.raw_enum);
//! ```

use serde::{Deserialize, Serialize};

/// Per-call conversion options. Every option defaults to `false`.
///
/// # Fields
///
/// * `raw_bytes` - Keep byte strings as bytes instead of base64 text.
///
/// * `raw_enum` - Keep enum members instead of emitting their values.
///
/// * `raw_datetime` - Keep datetime, date, time and duration values instead of
///   their ISO-8601 text or seconds.
///
/// * `omit_null_fields` - Drop encoded entries whose value is null. Passed to
///   the post-encode hook, which applies it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Keep byte strings raw (default: false)
    pub raw_bytes: bool,
    /// Keep enum members raw (default: false)
    pub raw_enum: bool,
    /// Keep temporal values raw (default: false)
    pub raw_datetime: bool,
    /// Drop null entries from encoded maps (default: false)
    pub omit_null_fields: bool,
}

impl Options {
    /// Create options with every flag off.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw_bytes(mut self, enabled: bool) -> Self {
        self.raw_bytes = enabled;
        self
    }

    pub fn with_raw_enum(mut self, enabled: bool) -> Self {
        self.raw_enum = enabled;
        self
    }

    pub fn with_raw_datetime(mut self, enabled: bool) -> Self {
        self.raw_datetime = enabled;
        self
    }

    pub fn with_omit_null_fields(mut self, enabled: bool) -> Self {
        self.omit_null_fields = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert!(!options.raw_bytes);
        assert!(!options.raw_enum);
        assert!(!options.raw_datetime);
        assert!(!options.omit_null_fields);
    }

    #[test]
    fn test_options_builder() {
        let options = Options::new()
            .with_raw_enum(true)
            .with_raw_datetime(true);
        assert!(options.raw_enum);
        assert!(options.raw_datetime);
        assert!(!options.raw_bytes);
    }

    #[test]
    fn test_partial_deserialization() {
        let options: Options = serde_json::from_str(r#"{"omit_null_fields": true}"#).unwrap();
        assert_eq!(options, Options::new().with_omit_null_fields(true));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let options = Options::new().with_raw_bytes(true);
        let json = serde_json::to_string(&options).unwrap();
        let parsed: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(options, parsed);
    }
}
