/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Converter-wide configuration.
//!
//! Options can be built in code or loaded from a configuration document:
//!
//! ```yaml
//! omit-empty: true
//! timestamp-format:
//!   custom: "%Y-%m-%d"
//! duration-format: milliseconds
//! ```

use serde::Deserialize;

use crate::error::Result;

/// How timestamps are rendered by the built-in converter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampFormat {
    /// RFC 3339 with second precision, `Z` for UTC: `2024-01-02T03:04:05Z`.
    #[default]
    Rfc3339,

    /// A `strftime`-style pattern as understood by chrono.
    Custom(String),
}

/// How durations are rendered by the built-in converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationFormat {
    /// Number of seconds, fractional.
    Seconds,

    /// Whole milliseconds.
    Milliseconds,

    /// Whole nanoseconds.
    Nanoseconds,

    /// Human readable text: `1h2m3.5s`, `250ms`.
    #[default]
    String,
}

/// Options for struct conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConverterOptions {
    /// Treat every field as if it were tagged `omitempty`.
    pub omit_empty: bool,

    pub timestamp_format: TimestampFormat,

    pub duration_format: DurationFormat,
}

impl ConverterOptions {
    pub fn from_yaml(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}
