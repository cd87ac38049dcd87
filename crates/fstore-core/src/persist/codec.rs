//! Typed encoding onto [`PreferenceValue`] kinds.
//!
//! The codec is chosen at compile time by the value type:
//!
//! | Type | Stored kind | Text format |
//! |------|-------------|-------------|
//! | `String` | text | raw |
//! | `bool`, `i32`, `i64`, `f32`, `f64` | native | |
//! | [`Decimal`] | text | invariant decimal, scale preserved |
//! | [`NaiveDateTime`] | text | `%Y-%m-%d %H:%M:%S%.6f` |
//! | [`TimeDelta`] | text | `[-]d:hh:mm:ss.fffffff` |
//! | [`Uuid`] | text | 32 lower-case hex digits |
//! | [`Json<T>`] / [`json_codec!`](crate::json_codec) types | text | JSON |
//!
//! Decoding is strict about kinds: a value stored as `long` does not decode
//! as `i32`. Text formats round-trip at their own resolution (microseconds
//! for date-times, 100 ns ticks for durations).

use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::backend::PreferenceValue;
use crate::error::CodecError;

/// `strftime` pattern for date-times: `yyyy-MM-dd HH:mm:ss.ffffff`.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const TICK_NANOS: i64 = 100;
const TICKS_PER_SECOND_DIGITS: usize = 7;
const SECONDS_PER_DAY: i64 = 86_400;

pub trait PreferenceCodec: Sized {
    fn encode(&self) -> Result<PreferenceValue, CodecError>;
    fn decode(stored: PreferenceValue) -> Result<Self, CodecError>;
}

fn mismatch(expected: &'static str, stored: &PreferenceValue) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: stored.kind(),
    }
}

fn expect_text(expected: &'static str, stored: PreferenceValue) -> Result<String, CodecError> {
    match stored {
        PreferenceValue::Text(text) => Ok(text),
        other => Err(mismatch(expected, &other)),
    }
}

macro_rules! native_codec {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl PreferenceCodec for $ty {
            fn encode(&self) -> Result<PreferenceValue, CodecError> {
                Ok(PreferenceValue::$variant(self.clone()))
            }

            fn decode(stored: PreferenceValue) -> Result<Self, CodecError> {
                match stored {
                    PreferenceValue::$variant(value) => Ok(value),
                    other => Err(mismatch($kind, &other)),
                }
            }
        }
    };
}

native_codec!(String, Text, "text");
native_codec!(bool, Bool, "bool");
native_codec!(i32, Int, "int");
native_codec!(i64, Long, "long");
native_codec!(f32, Float, "float");
native_codec!(f64, Double, "double");

impl PreferenceCodec for Decimal {
    fn encode(&self) -> Result<PreferenceValue, CodecError> {
        Ok(PreferenceValue::Text(self.to_string()))
    }

    fn decode(stored: PreferenceValue) -> Result<Self, CodecError> {
        let text = expect_text("decimal", stored)?;
        Decimal::from_str(&text).map_err(|err| CodecError::parse("decimal", text, err))
    }
}

impl PreferenceCodec for NaiveDateTime {
    fn encode(&self) -> Result<PreferenceValue, CodecError> {
        Ok(PreferenceValue::Text(
            self.format(DATE_TIME_FORMAT).to_string(),
        ))
    }

    fn decode(stored: PreferenceValue) -> Result<Self, CodecError> {
        let text = expect_text("date-time", stored)?;
        NaiveDateTime::parse_from_str(&text, DATE_TIME_FORMAT)
            .map_err(|err| CodecError::parse("date-time", text, err))
    }
}

impl PreferenceCodec for TimeDelta {
    fn encode(&self) -> Result<PreferenceValue, CodecError> {
        Ok(PreferenceValue::Text(format_duration(*self)))
    }

    fn decode(stored: PreferenceValue) -> Result<Self, CodecError> {
        let text = expect_text("duration", stored)?;
        match parse_duration(&text) {
            Ok(delta) => Ok(delta),
            Err(reason) => Err(CodecError::parse("duration", text, reason)),
        }
    }
}

impl PreferenceCodec for Uuid {
    fn encode(&self) -> Result<PreferenceValue, CodecError> {
        Ok(PreferenceValue::Text(self.simple().to_string()))
    }

    fn decode(stored: PreferenceValue) -> Result<Self, CodecError> {
        let text = expect_text("uuid", stored)?;
        Uuid::try_parse(&text).map_err(|err| CodecError::parse("uuid", text, err))
    }
}

/// Format a duration in the general long form `[-]d:hh:mm:ss.fffffff`.
///
/// Sub-tick nanoseconds are truncated.
#[must_use]
pub fn format_duration(delta: TimeDelta) -> String {
    let sign = if delta < TimeDelta::zero() { "-" } else { "" };
    let magnitude = delta.abs();
    let total_seconds = magnitude.num_seconds();
    let ticks = i64::from(magnitude.subsec_nanos()) / TICK_NANOS;

    let days = total_seconds / SECONDS_PER_DAY;
    let hours = total_seconds % SECONDS_PER_DAY / 3600;
    let minutes = total_seconds % 3600 / 60;
    let seconds = total_seconds % 60;
    format!("{sign}{days}:{hours:02}:{minutes:02}:{seconds:02}.{ticks:07}")
}

/// Parse the output of [`format_duration`].
pub fn parse_duration(input: &str) -> Result<TimeDelta, String> {
    let (negative, body) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let parts: Vec<&str> = body.split(':').collect();
    let [days, hours, minutes, rest] = parts.as_slice() else {
        return Err("expected d:hh:mm:ss.fffffff".to_string());
    };
    let (seconds, fraction) = rest
        .split_once('.')
        .ok_or_else(|| "missing fractional seconds".to_string())?;

    let field = |name: &str, text: &str| -> Result<i64, String> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid {name} field {text:?}"));
        }
        text.parse::<i64>().map_err(|err| format!("{name}: {err}"))
    };

    let days = field("days", days)?;
    let hours = field("hours", hours)?;
    let minutes = field("minutes", minutes)?;
    let seconds = field("seconds", seconds)?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err("time-of-day field out of range".to_string());
    }
    if fraction.len() > TICKS_PER_SECOND_DIGITS {
        return Err(format!("more than {TICKS_PER_SECOND_DIGITS} fractional digits"));
    }
    let ticks = field("fraction", fraction)?
        * 10_i64.pow((TICKS_PER_SECOND_DIGITS - fraction.len()) as u32);

    let whole = days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|s| s.checked_add(hours * 3600 + minutes * 60 + seconds))
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| "duration out of range".to_string())?;
    let delta = whole
        .checked_add(&TimeDelta::nanoseconds(ticks * TICK_NANOS))
        .ok_or_else(|| "duration out of range".to_string())?;

    Ok(if negative { -delta } else { delta })
}

// ─── JSON fallback ───────────────────────────────────────────────────────────

/// Stores any serde type as JSON text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> PreferenceCodec for Json<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self) -> Result<PreferenceValue, CodecError> {
        encode_json(&self.0)
    }

    fn decode(stored: PreferenceValue) -> Result<Self, CodecError> {
        decode_json(stored).map(Json)
    }
}

/// Encode `value` as JSON text. Used by [`Json`] and [`json_codec!`](crate::json_codec).
pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<PreferenceValue, CodecError> {
    Ok(PreferenceValue::Text(serde_json::to_string(value)?))
}

/// Decode JSON text written by [`encode_json`].
pub fn decode_json<T: DeserializeOwned>(stored: PreferenceValue) -> Result<T, CodecError> {
    let text = expect_text("json", stored)?;
    Ok(serde_json::from_str(&text)?)
}

/// Give serde types a JSON [`PreferenceCodec`] without the [`Json`] wrapper.
///
/// ```
/// use fstore_core::json_codec;
/// use fstore_core::persist::{PreferenceCodec, PreferenceValue};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct Window {
///     width: u32,
///     height: u32,
/// }
/// json_codec!(Window);
///
/// let stored = Window { width: 80, height: 24 }.encode().unwrap();
/// assert_eq!(stored, PreferenceValue::Text(r#"{"width":80,"height":24}"#.into()));
/// assert_eq!(Window::decode(stored).unwrap(), Window { width: 80, height: 24 });
/// ```
#[macro_export]
macro_rules! json_codec {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::persist::PreferenceCodec for $ty {
                fn encode(
                    &self,
                ) -> ::std::result::Result<$crate::persist::PreferenceValue, $crate::error::CodecError>
                {
                    $crate::persist::codec::encode_json(self)
                }

                fn decode(
                    stored: $crate::persist::PreferenceValue,
                ) -> ::std::result::Result<Self, $crate::error::CodecError> {
                    $crate::persist::codec::decode_json(stored)
                }
            }
        )+
    };
}
