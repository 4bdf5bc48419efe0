//! Range tokens shared by plots in a group
//!
//! A group stores its range as an opaque [`RangeToken`]. Plots interpret
//! it: either a relative duration such as `"1d"` or `"3 hours"`, or an
//! absolute `{"start":..,"end":..}` pair produced by zooming and panning.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::core::TimeRange;

pub const SECOND_MS: u64 = 1_000;
pub const MINUTE_MS: u64 = 60 * SECOND_MS;
pub const HOUR_MS: u64 = 60 * MINUTE_MS;
pub const DAY_MS: u64 = 24 * HOUR_MS;
pub const WEEK_MS: u64 = 7 * DAY_MS;
pub const MONTH_MS: u64 = 31 * DAY_MS;

/// Range used when a token cannot be interpreted
pub const FALLBACK_RANGE_MS: u64 = DAY_MS;

/// Parse a duration token into milliseconds.
///
/// Accepts a bare integer (milliseconds) or a count followed by a unit,
/// with or without a space: `90s`, `3h`, `1 day`, `2 weeks`, `1M`.
/// Returns `None` for anything else.
pub fn parse_duration(token: &str) -> Option<u64> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    let split = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let (count, unit) = token.split_at(split);
    let count: u64 = count.parse().ok()?;
    let unit = unit.trim();

    if unit.is_empty() {
        return Some(count);
    }

    let scale = match unit {
        "ms" | "msec" | "millisecond" | "milliseconds" => 1,
        "s" | "sec" | "secs" | "second" | "seconds" => SECOND_MS,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE_MS,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR_MS,
        "d" | "day" | "days" => DAY_MS,
        "w" | "week" | "weeks" => WEEK_MS,
        "M" | "mo" | "month" | "months" => MONTH_MS,
        _ => return None,
    };
    count.checked_mul(scale)
}

/// Opaque range value carried by a group
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeToken(String);

impl RangeToken {
    /// A relative token such as `"1d"`, stored verbatim
    pub fn relative(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn from_millis(ms: u64) -> Self {
        Self(ms.to_string())
    }

    /// Encode an explicit window as `{"start":S,"end":E}`
    pub fn absolute(window: TimeRange) -> Self {
        // TimeRange only holds two integers, serialization cannot fail
        let json = serde_json::to_string(&window)
            .unwrap_or_else(|_| format!("{{\"start\":{},\"end\":{}}}", window.start, window.end));
        Self(json)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn interpret(&self) -> Range {
        let text = self.0.trim();

        if text.starts_with('{') {
            return match serde_json::from_str::<TimeRange>(text) {
                Ok(window) => Range::Absolute(window),
                Err(_) => Range::Custom(self.0.clone()),
            };
        }

        if let Some((start, end)) = text.split_once(':')
            && let (Ok(start), Ok(end)) = (start.trim().parse(), end.trim().parse())
        {
            return Range::Absolute(TimeRange::new(start, end));
        }

        match parse_duration(text) {
            Some(ms) => Range::Relative(ms),
            None => Range::Custom(self.0.clone()),
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self.interpret(), Range::Relative(_))
    }
}

impl Default for RangeToken {
    fn default() -> Self {
        Self::relative("1d")
    }
}

impl fmt::Display for RangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RangeToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RangeToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<TimeRange> for RangeToken {
    fn from(window: TimeRange) -> Self {
        Self::absolute(window)
    }
}

/// Interpreted range token
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Range {
    /// Trailing window of this many milliseconds, ending now
    Relative(u64),
    Absolute(TimeRange),
    /// Unrecognised token, kept for display
    Custom(String),
}

impl Range {
    /// Concrete window at instant `now` (epoch milliseconds)
    pub fn window(&self, now: i64) -> TimeRange {
        match self {
            Range::Relative(ms) => TimeRange::ending_at(now, *ms),
            Range::Absolute(window) => *window,
            Range::Custom(_) => TimeRange::ending_at(now, FALLBACK_RANGE_MS),
        }
    }
}

/// Zoom presets offered by the range controller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePreset {
    Hour,
    ThreeHours,
    SixHours,
    TwelveHours,
    Day,
    Week,
    Month,
    Custom,
}

impl RangePreset {
    pub const ZOOMS: [RangePreset; 7] = [
        RangePreset::Hour,
        RangePreset::ThreeHours,
        RangePreset::SixHours,
        RangePreset::TwelveHours,
        RangePreset::Day,
        RangePreset::Week,
        RangePreset::Month,
    ];

    pub fn millis(&self) -> Option<u64> {
        match self {
            RangePreset::Hour => Some(HOUR_MS),
            RangePreset::ThreeHours => Some(3 * HOUR_MS),
            RangePreset::SixHours => Some(6 * HOUR_MS),
            RangePreset::TwelveHours => Some(12 * HOUR_MS),
            RangePreset::Day => Some(DAY_MS),
            RangePreset::Week => Some(WEEK_MS),
            RangePreset::Month => Some(MONTH_MS),
            RangePreset::Custom => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RangePreset::Hour => "hour",
            RangePreset::ThreeHours => "3 hour",
            RangePreset::SixHours => "6 hour",
            RangePreset::TwelveHours => "12 hour",
            RangePreset::Day => "day",
            RangePreset::Week => "week",
            RangePreset::Month => "month",
            RangePreset::Custom => "custom",
        }
    }

    /// Token written to the group when the preset is picked
    pub fn token(&self) -> Option<RangeToken> {
        let token = match self {
            RangePreset::Hour => "1h",
            RangePreset::ThreeHours => "3h",
            RangePreset::SixHours => "6h",
            RangePreset::TwelveHours => "12h",
            RangePreset::Day => "1d",
            RangePreset::Week => "1w",
            RangePreset::Month => "1M",
            RangePreset::Custom => return None,
        };
        Some(RangeToken::relative(token))
    }

    /// Classify a token; absolute windows and unknown text are `Custom`
    pub fn classify(token: &RangeToken) -> Self {
        match token.interpret() {
            Range::Relative(ms) => Self::ZOOMS
                .into_iter()
                .find(|preset| preset.millis() == Some(ms))
                .unwrap_or(RangePreset::Custom),
            Range::Absolute(_) | Range::Custom(_) => RangePreset::Custom,
        }
    }
}

impl TimeRange {
    /// Human readable `start – end`, in UTC or the local timezone
    pub fn describe(&self, use_utc: bool) -> String {
        let (Some(start), Some(end)) = (
            DateTime::<Utc>::from_timestamp_millis(self.start),
            DateTime::<Utc>::from_timestamp_millis(self.end),
        ) else {
            return format!("{} – {}", self.start, self.end);
        };

        const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
        if use_utc {
            format!(
                "{} – {} UTC",
                start.format(FORMAT),
                end.format(FORMAT)
            )
        } else {
            format!(
                "{} – {}",
                start.with_timezone(&Local).format(FORMAT),
                end.with_timezone(&Local).format(FORMAT)
            )
        }
    }
}

/// Current instant in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
