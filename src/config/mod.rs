use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::temporal::YearWindows;

pub const DEFAULT_TOLERANCE: f64 = 0.001;
pub const DEFAULT_DIGITS: u32 = 3;

/// Optional settings file. Every key may be omitted; command-line flags
/// override whatever is set here.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub digits: Option<u32>,
    #[serde(default)]
    pub windows: Option<YearWindows>,
    #[serde(default)]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    pub valid_from_field: Option<String>,
    #[serde(default)]
    pub valid_to_field: Option<String>,
    #[serde(default)]
    pub renames: Vec<RecordSetRenames>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// What to do when a single feature cannot be processed.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the feature and continue with the next one.
    #[default]
    Skip,
    /// Abort the conversion on the first failing feature.
    FailFast,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('-', "_").as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "fail_fast" => Ok(FailurePolicy::FailFast),
            _ => Err(format!("invalid failure_policy: {value}")),
        }
    }
}

/// Column renames for one record set, as written in the settings file.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordSetRenames {
    pub record_set: String,
    pub columns: Vec<ColumnRename>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRenames(Vec<ColumnRename>);

impl ColumnRenames {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renames present columns; absent ones are left alone.
    pub fn apply(&self, attributes: &mut Map<String, Value>) {
        for rename in &self.0 {
            if let Some(value) = attributes.remove(&rename.from) {
                attributes.insert(rename.to.clone(), value);
            }
        }
    }
}

/// Record-set identifier (case-insensitive) to column renames.
#[derive(Debug, Clone, Default)]
pub struct RenameTable {
    sets: HashMap<String, ColumnRenames>,
}

const LEGACY_RECORD_SETS: [&str; 4] = ["stift_sjl", "stift_jyl", "overret_sjl", "overret_jyl"];

const LEGACY_COLUMNS: [(&str, &str); 7] = [
    ("NAVN", "navn"),
    ("OBJECTID", "objectid"),
    ("ENHEDID", "enhedid"),
    ("FRA", "fra"),
    ("TIL", "til"),
    ("SHAPE_AREA", "SHAPE_Area"),
    ("SHAPE_LENG", "SHAPE_Leng"),
];

impl RenameTable {
    /// The upper-case column layout shipped with the diocese and high-court
    /// record sets, mapped onto the layout the other record sets use.
    pub fn legacy() -> Self {
        let columns = ColumnRenames(
            LEGACY_COLUMNS
                .iter()
                .map(|(from, to)| ColumnRename {
                    from: from.to_string(),
                    to: to.to_string(),
                })
                .collect(),
        );
        let sets = LEGACY_RECORD_SETS
            .iter()
            .map(|name| (name.to_string(), columns.clone()))
            .collect();
        Self { sets }
    }

    /// Entries from the settings file replace built-in ones for the same record set.
    pub fn extend(&mut self, overrides: &[RecordSetRenames]) {
        for entry in overrides {
            self.sets.insert(
                entry.record_set.to_lowercase(),
                ColumnRenames(entry.columns.clone()),
            );
        }
    }

    pub fn for_record_set(&self, name: &str) -> Option<&ColumnRenames> {
        self.sets.get(&name.to_lowercase())
    }
}
