//! Fitted label tables mapping categorical values to integers.
//!
//! Each table is the `classes_` list of a fitted label encoder: a value's
//! code is its index in the list. The tables are persisted together as a
//! JSON object keyed by the training column name.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use strum_macros::{AsRefStr, Display};

use crate::ArtifactError;

/// Key of the table that decodes classifier output.
pub const CRIME_CATEGORY_KEY: &str = "CRIME_CATEGORY";

/// Categorical inputs that go through a label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CategoricalField {
    Weekday,
    CompletionStatus,
    CrimeClass,
    Borough,
    Premise,
    Occurrence,
    JurisdictionDescription,
    SuspectAgeGroup,
    SuspectRace,
    SuspectSex,
    VictimAgeGroup,
    VictimRace,
    VictimSex,
    Season,
}

impl CategoricalField {
    /// Column name the table was fitted under.
    #[must_use]
    pub const fn table_key(self) -> &'static str {
        match self {
            Self::Weekday => "weekday",
            Self::CompletionStatus => "COMPLETED",
            Self::CrimeClass => "CRIME_CLASS",
            Self::Borough => "BORO_NM",
            Self::Premise => "PREM_TYP_DESC",
            Self::Occurrence => "OCCURENCE",
            Self::JurisdictionDescription => "JURIS_DESC",
            Self::SuspectAgeGroup => "SUSP_AGE_GROUP",
            Self::SuspectRace => "SUSP_RACE",
            Self::SuspectSex => "SUSP_SEX",
            Self::VictimAgeGroup => "VIC_AGE_GROUP",
            Self::VictimRace => "VIC_RACE",
            Self::VictimSex => "VIC_SEX",
            Self::Season => "season",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Weekday,
            Self::CompletionStatus,
            Self::CrimeClass,
            Self::Borough,
            Self::Premise,
            Self::Occurrence,
            Self::JurisdictionDescription,
            Self::SuspectAgeGroup,
            Self::SuspectRace,
            Self::SuspectSex,
            Self::VictimAgeGroup,
            Self::VictimRace,
            Self::VictimSex,
            Self::Season,
        ]
    }
}

/// One fitted label table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: BTreeMap<String, usize>,
}

impl LabelEncoder {
    /// Builds a table from its ordered class list.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Invalid`] if a class appears twice.
    pub fn from_classes(classes: Vec<String>) -> Result<Self, ArtifactError> {
        let mut codes = BTreeMap::new();
        for (idx, class) in classes.iter().enumerate() {
            if codes.insert(class.clone(), idx).is_some() {
                return Err(ArtifactError::Invalid {
                    message: format!("duplicate class {class:?} in label table"),
                });
            }
        }
        Ok(Self { classes, codes })
    }

    /// Code for `label`, or `None` if the table never saw it.
    #[must_use]
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.codes.get(label).copied()
    }

    /// Label for `code`, or `None` if out of range.
    #[must_use]
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Classes in code order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the table has no classes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// All fitted label tables, keyed by training column name.
#[derive(Debug, Clone, Default)]
pub struct LabelEncoders {
    tables: BTreeMap<String, LabelEncoder>,
}

impl LabelEncoders {
    /// Parses the persisted JSON object of `column -> classes`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if the JSON is malformed or a table has
    /// duplicate classes.
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct Raw(BTreeMap<String, Vec<String>>);

        let Raw(raw) = serde_json::from_str(json)?;
        let mut tables = BTreeMap::new();
        for (key, classes) in raw {
            let table = LabelEncoder::from_classes(classes).map_err(|e| ArtifactError::Invalid {
                message: format!("label table {key}: {e}"),
            })?;
            tables.insert(key, table);
        }

        for field in CategoricalField::all() {
            if *field != CategoricalField::JurisdictionDescription
                && !tables.contains_key(field.table_key())
            {
                log::warn!(
                    "No label table for {field} ({}); its values will encode as 0",
                    field.table_key()
                );
            }
        }

        Ok(Self { tables })
    }

    /// Reads and parses a label table file.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if the file can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Adds or replaces a table.
    pub fn insert(&mut self, key: impl Into<String>, table: LabelEncoder) {
        self.tables.insert(key.into(), table);
    }

    /// Table fitted under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LabelEncoder> {
        self.tables.get(key)
    }

    /// Table for a categorical input field.
    #[must_use]
    pub fn for_field(&self, field: CategoricalField) -> Option<&LabelEncoder> {
        self.get(field.table_key())
    }
}
