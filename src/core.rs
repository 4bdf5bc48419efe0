use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use error_stack::Report;
use serde::{Deserialize, Serialize};

use crate::TrendingError;

/// Identity of a plot widget within the page session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlotId(pub u64);

impl Default for PlotId {
    fn default() -> Self {
        static CTR: AtomicU64 = AtomicU64::new(1);
        Self(CTR.fetch_add(1, Ordering::Relaxed))
    }
}

impl PlotId {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plot-{}", self.0)
    }
}

/// How uncertainty is requested from the data source and drawn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorBars {
    #[default]
    None,
    MinMax,
    Rms,
}

impl ErrorBars {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorBars::None => "NONE",
            ErrorBars::MinMax => "MINMAX",
            ErrorBars::Rms => "RMS",
        }
    }

    /// The chart draws custom (min/max) bars rather than sigma bars
    pub fn custom_bars(&self) -> bool {
        matches!(self, ErrorBars::MinMax)
    }

    pub fn sigma_bars(&self) -> bool {
        matches!(self, ErrorBars::Rms)
    }
}

impl fmt::Display for ErrorBars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorBars {
    type Err = Report<TrendingError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(ErrorBars::None),
            "MINMAX" => Ok(ErrorBars::MinMax),
            "RMS" => Ok(ErrorBars::Rms),
            _ => Err(Report::new(TrendingError::UnknownErrorBars(s.to_string()))),
        }
    }
}

/// Y axis a series is drawn against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    Y1,
    Y2,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Y1 => "y1",
            Axis::Y2 => "y2",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = Report<TrendingError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "y1" | "Y1" => Ok(Axis::Y1),
            "y2" | "Y2" => Ok(Axis::Y2),
            _ => Err(Report::new(TrendingError::UnknownAxis(s.to_string()))),
        }
    }
}

/// Absolute time window in epoch milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Window of `span_ms` ending at `end`
    pub fn ending_at(end: i64, span_ms: u64) -> Self {
        let span = i64::try_from(span_ms).unwrap_or(i64::MAX);
        Self {
            start: end.saturating_sub(span),
            end,
        }
    }

    pub fn validated(self) -> crate::Result<Self> {
        if self.start > self.end {
            return Err(Report::new(TrendingError::InvalidWindow {
                start: self.start,
                end: self.end,
            }));
        }
        Ok(self)
    }

    pub fn duration_ms(&self) -> u64 {
        self.end.saturating_sub(self.start).max(0) as u64
    }
}

/// One plotted series: data channel key, axis and display name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub key: String,
    #[serde(default)]
    pub axis: Axis,
    pub name: String,
}

impl SeriesSpec {
    pub fn new(key: impl Into<String>, axis: Axis, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            axis,
            name: name.into(),
        }
    }
}
