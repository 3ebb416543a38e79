//! Selecting features by their validity interval.
//!
//! Validity bounds are `YYYY-MM-DD` strings and are compared as strings. For
//! fixed-width, zero-padded dates lexicographic order is chronological order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

pub const VALID_FROM_FIELD: &str = "fra";
pub const VALID_TO_FIELD: &str = "til";

/// Names of the two attributes bounding a feature's validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityFields {
    pub from: String,
    pub to: String,
}

impl Default for ValidityFields {
    fn default() -> Self {
        Self {
            from: VALID_FROM_FIELD.to_string(),
            to: VALID_TO_FIELD.to_string(),
        }
    }
}

impl ValidityFields {
    /// `from <= instant <= to`. A missing or non-string bound makes the
    /// feature invalid at every instant.
    pub fn is_valid_at(&self, attributes: &Map<String, Value>, instant: &str) -> bool {
        let (Some(from), Some(to)) = (
            attributes.get(&self.from).and_then(Value::as_str),
            attributes.get(&self.to).and_then(Value::as_str),
        ) else {
            return false;
        };
        from <= instant && to >= instant
    }
}

/// Years `start, start + step, ...` up to and including `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct YearWindows {
    pub start: i32,
    pub end: i32,
    pub step: u32,
}

impl YearWindows {
    pub fn new(start: i32, end: i32, step: u32) -> Self {
        Self { start, end, step }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        let step = self.step.max(1) as usize;
        (self.start..=self.end).step_by(step)
    }

    pub fn instants(&self) -> impl Iterator<Item = String> {
        self.years().map(window_instant)
    }
}

impl FromStr for YearWindows {
    type Err = String;

    /// `START:END:STEP`, e.g. `1670:1970:50`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split(':').map(str::trim).collect();
        let [start, end, step] = parts.as_slice() else {
            return Err(format!("expected START:END:STEP, got: {value}"));
        };
        let start = start
            .parse()
            .map_err(|_| format!("invalid start year: {start}"))?;
        let end = end.parse().map_err(|_| format!("invalid end year: {end}"))?;
        let step: u32 = step.parse().map_err(|_| format!("invalid step: {step}"))?;
        Ok(Self { start, end, step })
    }
}

/// January 1st of `year`, zero-padded so string order matches date order.
pub fn window_instant(year: i32) -> String {
    format!("{year:04}-01-01")
}
