/*
 * builtin.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Converters registered by default.
//!
//! - Timestamps (`chrono::DateTime<Utc | FixedOffset | Local>`,
//!   `NaiveDateTime`, `SystemTime`) render per [`TimestampFormat`].
//! - Durations (`std::time::Duration`, `chrono::TimeDelta`) render per
//!   [`DurationFormat`].
//! - `url::Url` renders its serialized form.
//!
//! Each is also registered for `Option<T>`, where `None` renders as an empty
//! string.

use std::any::Any;
use std::fmt::Write;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use url::Url;

use crate::error::ConversionError;
use crate::options::{ConverterOptions, DurationFormat, TimestampFormat};
use crate::reflect::Reflect;
use crate::registry::{Converter, ConverterRegistry, TypeDescriptor};
use crate::variable::Variable;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Register the built-in converters on `registry`.
pub fn register_builtins(registry: &ConverterRegistry, options: &ConverterOptions) {
    register_timestamp::<DateTime<Utc>>(registry, &options.timestamp_format);
    register_timestamp::<DateTime<FixedOffset>>(registry, &options.timestamp_format);
    register_timestamp::<DateTime<Local>>(registry, &options.timestamp_format);
    register_timestamp::<NaiveDateTime>(registry, &options.timestamp_format);
    register_timestamp::<SystemTime>(registry, &options.timestamp_format);

    register_duration::<Duration>(registry, options.duration_format);
    register_duration::<TimeDelta>(registry, options.duration_format);

    register_with_optional::<Url>(registry, Arc::new(UrlConverter));
}

fn register_with_optional<T: Any>(registry: &ConverterRegistry, converter: Arc<dyn Converter>) {
    registry.register_arc(TypeDescriptor::of::<T>(), converter.clone());
    registry.register_arc(TypeDescriptor::of::<Option<T>>(), converter);
}

fn register_timestamp<T: Timestamp>(registry: &ConverterRegistry, format: &TimestampFormat) {
    let converter = TimestampConverter::<T> {
        format: format.clone(),
        _marker: PhantomData,
    };
    register_with_optional::<T>(registry, Arc::new(converter));
}

fn register_duration<T: DurationLike>(registry: &ConverterRegistry, format: DurationFormat) {
    let converter = DurationConverter::<T> {
        format,
        _marker: PhantomData,
    };
    register_with_optional::<T>(registry, Arc::new(converter));
}

/// Downcast `value` to `T` or `Option<T>` and render it; `None` renders as
/// an empty string.
fn convert_with<T: Any>(
    value: &dyn Reflect,
    render: impl FnOnce(&T) -> Result<Variable, ConversionError>,
) -> Result<Variable, ConversionError> {
    let any = value.as_any();
    if let Some(inner) = any.downcast_ref::<T>() {
        return render(inner);
    }
    match any.downcast_ref::<Option<T>>() {
        Some(Some(inner)) => render(inner),
        Some(None) => Ok(Variable::default()),
        None => Err(ConversionError::new(
            value.type_name(),
            format!("expected {}", std::any::type_name::<T>()),
        )),
    }
}

trait Timestamp: Any {
    fn to_fixed(&self) -> DateTime<FixedOffset>;
}

impl Timestamp for DateTime<Utc> {
    fn to_fixed(&self) -> DateTime<FixedOffset> {
        self.fixed_offset()
    }
}

impl Timestamp for DateTime<FixedOffset> {
    fn to_fixed(&self) -> DateTime<FixedOffset> {
        *self
    }
}

impl Timestamp for DateTime<Local> {
    fn to_fixed(&self) -> DateTime<FixedOffset> {
        self.fixed_offset()
    }
}

impl Timestamp for NaiveDateTime {
    /// Naive timestamps are taken to be UTC.
    fn to_fixed(&self) -> DateTime<FixedOffset> {
        self.and_utc().fixed_offset()
    }
}

impl Timestamp for SystemTime {
    fn to_fixed(&self) -> DateTime<FixedOffset> {
        DateTime::<Utc>::from(*self).fixed_offset()
    }
}

struct TimestampConverter<T> {
    format: TimestampFormat,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Timestamp> TimestampConverter<T> {
    fn render(&self, timestamp: &T) -> Result<Variable, ConversionError> {
        let timestamp = timestamp.to_fixed();
        match &self.format {
            TimestampFormat::Rfc3339 => Ok(Variable::String(
                timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            )),
            TimestampFormat::Custom(pattern) => {
                // chrono reports a bad pattern as a formatting error.
                let mut out = String::new();
                write!(out, "{}", timestamp.format(pattern)).map_err(|_| {
                    ConversionError::new(
                        std::any::type_name::<T>(),
                        format!("invalid timestamp format '{}'", pattern),
                    )
                })?;
                Ok(Variable::String(out))
            }
        }
    }
}

impl<T: Timestamp> Converter for TimestampConverter<T> {
    fn convert(&self, value: &dyn Reflect) -> Result<Variable, ConversionError> {
        convert_with::<T>(value, |timestamp| self.render(timestamp))
    }
}

trait DurationLike: Any {
    /// Signed length in nanoseconds.
    fn total_nanos(&self) -> i128;
}

impl DurationLike for Duration {
    fn total_nanos(&self) -> i128 {
        self.as_nanos() as i128
    }
}

impl DurationLike for TimeDelta {
    fn total_nanos(&self) -> i128 {
        self.num_seconds() as i128 * NANOS_PER_SEC as i128 + self.subsec_nanos() as i128
    }
}

struct DurationConverter<T> {
    format: DurationFormat,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DurationLike> Converter for DurationConverter<T> {
    fn convert(&self, value: &dyn Reflect) -> Result<Variable, ConversionError> {
        convert_with::<T>(value, |duration| {
            let nanos = duration.total_nanos();
            Ok(match self.format {
                DurationFormat::Seconds => Variable::Number(nanos as f64 / NANOS_PER_SEC as f64),
                DurationFormat::Milliseconds => {
                    Variable::Number((nanos / NANOS_PER_MILLI as i128) as f64)
                }
                DurationFormat::Nanoseconds => Variable::Number(nanos as f64),
                DurationFormat::String => Variable::String(format_duration(nanos)),
            })
        })
    }
}

/// Human readable duration: `1h2m3.5s`, `1m0s`, `1.5ms`, `250ns`, `0s`.
pub fn format_duration(nanos: i128) -> String {
    if nanos == 0 {
        return "0s".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let n = nanos.unsigned_abs();

    if n < NANOS_PER_SEC {
        let (scale, unit) = if n < NANOS_PER_MICRO {
            (1, "ns")
        } else if n < NANOS_PER_MILLI {
            (NANOS_PER_MICRO, "µs")
        } else {
            (NANOS_PER_MILLI, "ms")
        };
        return format!("{}{}{}", sign, decimal(n, scale), unit);
    }

    let total_secs = n / NANOS_PER_SEC;
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let secs = n % (60 * NANOS_PER_SEC);

    let mut out = sign.to_string();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&decimal(secs, NANOS_PER_SEC));
    out.push('s');
    out
}

/// `value / scale` with trailing zeros of the fraction removed.
fn decimal(value: u128, scale: u128) -> String {
    let whole = value / scale;
    let fraction = value % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let digits = format!("{:0width$}", fraction, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

struct UrlConverter;

impl Converter for UrlConverter {
    fn convert(&self, value: &dyn Reflect) -> Result<Variable, ConversionError> {
        convert_with::<Url>(value, |url| Ok(Variable::String(url.as_str().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn registry(options: &ConverterOptions) -> ConverterRegistry {
        ConverterRegistry::with_builtins(options)
    }

    fn convert(registry: &ConverterRegistry, value: &dyn Reflect) -> Variable {
        registry.get(value).unwrap().convert(value).unwrap()
    }

    #[test]
    fn test_registers_plain_and_optional_variants() {
        let registry = registry(&ConverterOptions::default());
        assert_eq!(registry.count(), 16);
        assert!(registry.has(&TypeDescriptor::of::<Option<Url>>()));
        assert!(registry.has(&TypeDescriptor::of::<Option<Duration>>()));
    }

    #[test]
    fn test_timestamp_rfc3339() {
        let registry = registry(&ConverterOptions::default());
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(convert(&registry, &ts), Variable::from("2024-01-02T03:04:05Z"));

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(convert(&registry, &ts), Variable::from("2024-01-02T03:04:05+02:00"));
    }

    #[test]
    fn test_timestamp_custom_format() {
        let options = ConverterOptions {
            timestamp_format: TimestampFormat::Custom("%d/%m/%Y".to_string()),
            ..ConverterOptions::default()
        };
        let registry = registry(&options);
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(convert(&registry, &ts), Variable::from("02/01/2024"));
    }

    #[test]
    fn test_timestamp_invalid_format_is_conversion_error() {
        let options = ConverterOptions {
            timestamp_format: TimestampFormat::Custom("%Q".to_string()),
            ..ConverterOptions::default()
        };
        let registry = registry(&options);
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert!(registry.get(&ts).unwrap().convert(&ts).is_err());
    }

    #[test]
    fn test_optional_values() {
        let registry = registry(&ConverterOptions::default());
        let none: Option<DateTime<Utc>> = None;
        assert_eq!(convert(&registry, &none), Variable::from(""));
        let some = Some(Url::parse("https://quarto.org/docs").unwrap());
        assert_eq!(convert(&registry, &some), Variable::from("https://quarto.org/docs"));
    }

    #[test]
    fn test_duration_formats() {
        let d = Duration::from_millis(1500);
        for (format, expected) in [
            (DurationFormat::Seconds, Variable::from(1.5)),
            (DurationFormat::Milliseconds, Variable::from(1500)),
            (DurationFormat::Nanoseconds, Variable::from(1_500_000_000u64)),
            (DurationFormat::String, Variable::from("1.5s")),
        ] {
            let options = ConverterOptions {
                duration_format: format,
                ..ConverterOptions::default()
            };
            assert_eq!(convert(&registry(&options), &d), expected, "{:?}", format);
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(250), "250ns");
        assert_eq!(format_duration(1_500), "1.5µs");
        assert_eq!(format_duration(1_500_000), "1.5ms");
        assert_eq!(format_duration(60 * 1_000_000_000), "1m0s");
        assert_eq!(format_duration(3_723_500_000_000), "1h2m3.5s");
        assert_eq!(format_duration(-2_000_000_000), "-2s");
    }

    #[test]
    fn test_time_delta() {
        let registry = registry(&ConverterOptions::default());
        assert_eq!(
            convert(&registry, &TimeDelta::milliseconds(-1500)),
            Variable::from("-1.5s")
        );
    }

    #[test]
    fn test_wrong_type_is_conversion_error() {
        let err = UrlConverter.convert(&5i32).unwrap_err();
        assert_eq!(err.type_name, "i32");
    }
}
