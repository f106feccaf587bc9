use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use serde::Deserialize;

use super::error::ClassifierError;

/// Compact code a label can be re-expressed as. Codes are non-negative; `-1`
/// marks padding in dense outputs.
pub type LabelCode = i16;

/// Code used to pad short rows in [`BatchResult::to_arrays`](crate::BatchResult::to_arrays)
pub const PADDING_CODE: LabelCode = -1;

/// The ordered labels known to a loaded model.
///
/// Indices follow the model's native order and never change for the lifetime
/// of the model; everything downstream addresses labels by this index.
#[derive(Debug, Clone)]
pub struct LabelSet {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelSet {
    /// Builds the dictionary from the labels reported by a loader, rejecting duplicates.
    pub fn new(labels: Vec<String>) -> Result<Self, ClassifierError> {
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if let Some(first) = index.insert(label.clone(), i) {
                return Err(ClassifierError::InvalidArgument(format!(
                    "Duplicate label '{}' at indices {} and {}",
                    label, first, i
                )));
            }
        }
        Ok(Self { labels, index })
    }

    /// All labels in native index order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns the label stored at `index`.
    ///
    /// # Errors
    /// `IndexError` when `index >= len()`.
    pub fn label_at(&self, index: usize) -> Result<&str, ClassifierError> {
        self.labels
            .get(index)
            .map(String::as_str)
            .ok_or(ClassifierError::IndexError { index, len: self.labels.len() })
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterates `(index, label)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().enumerate().map(|(i, l)| (i, l.as_str()))
    }
}

/// A fixed, injective mapping from labels to compact codes.
///
/// Deserializes from a JSON object such as `{"__label__en": 0, "__label__zh": 1}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, LabelCode>")]
pub struct LabelCodes {
    by_label: BTreeMap<String, LabelCode>,
    by_code: BTreeMap<LabelCode, String>,
}

impl LabelCodes {
    /// Creates a code table.
    ///
    /// # Errors
    /// `InvalidArgument` if a code is negative or two labels share a code.
    pub fn new<I, S>(entries: I) -> Result<Self, ClassifierError>
    where
        I: IntoIterator<Item = (S, LabelCode)>,
        S: Into<String>,
    {
        let mut by_label = BTreeMap::new();
        let mut by_code = BTreeMap::new();
        for (label, code) in entries {
            let label = label.into();
            if code < 0 {
                return Err(ClassifierError::InvalidArgument(format!(
                    "Label '{}' has negative code {}",
                    label, code
                )));
            }
            if let Some(other) = by_code.get(&code) {
                if other != &label {
                    return Err(ClassifierError::InvalidArgument(format!(
                        "Code {} is shared by labels '{}' and '{}'",
                        code, other, label
                    )));
                }
            }
            if let Some(previous) = by_label.insert(label.clone(), code) {
                by_code.remove(&previous);
            }
            by_code.insert(code, label);
        }
        Ok(Self { by_label, by_code })
    }

    /// Reads a code table from a JSON object
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, ClassifierError> {
        serde_json::from_reader(reader)
            .map_err(|e| ClassifierError::InvalidArgument(format!("Invalid label code table: {}", e)))
    }

    /// Reads a code table from a JSON file on disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ClassifierError::InvalidArgument(format!("Cannot open label code table {:?}: {}", path, e))
        })?;
        let codes = Self::from_json_reader(BufReader::new(file))?;
        debug!("Read {} label codes from {:?}", codes.len(), path);
        Ok(codes)
    }

    pub fn code_for(&self, label: &str) -> Option<LabelCode> {
        self.by_label.get(label).copied()
    }

    /// Reverse lookup of a code
    pub fn label_for(&self, code: LabelCode) -> Option<&str> {
        self.by_code.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }

    /// Checks that every label of the model has a code.
    pub(crate) fn validate_coverage(&self, labels: &LabelSet) -> Result<(), ClassifierError> {
        match labels.iter().find(|(_, label)| !self.by_label.contains_key(*label)) {
            Some((_, label)) => Err(ClassifierError::UnmappedLabel { label: label.to_string() }),
            None => Ok(()),
        }
    }
}

impl TryFrom<BTreeMap<String, LabelCode>> for LabelCodes {
    type Error = ClassifierError;

    fn try_from(map: BTreeMap<String, LabelCode>) -> Result<Self, Self::Error> {
        Self::new(map)
    }
}

/// Translates native labels into their compact codes.
#[derive(Debug, Clone)]
pub struct LabelRemapper {
    codes: Arc<LabelCodes>,
}

impl LabelRemapper {
    pub fn new(codes: LabelCodes) -> Self {
        Self { codes: Arc::new(codes) }
    }

    /// # Errors
    /// `UnmappedLabel` naming `label` when the table has no entry for it.
    pub fn remap(&self, label: &str) -> Result<LabelCode, ClassifierError> {
        self.codes
            .code_for(label)
            .ok_or_else(|| ClassifierError::UnmappedLabel { label: label.to_string() })
    }

    pub fn codes(&self) -> &LabelCodes {
        &self.codes
    }
}

/// How labels are emitted, fixed when the model is loaded.
#[derive(Debug, Clone)]
pub enum LabelMode {
    /// Labels pass through as the model's native strings
    Native,
    /// Labels are re-expressed as codes
    Remapped(LabelRemapper),
}

impl LabelMode {
    pub(crate) fn emit(&self, label: &str) -> Result<PredictedLabel, ClassifierError> {
        match self {
            Self::Native => Ok(PredictedLabel::Native(label.to_string())),
            Self::Remapped(remapper) => remapper.remap(label).map(PredictedLabel::Code),
        }
    }

    pub fn is_remapped(&self) -> bool {
        matches!(self, Self::Remapped(_))
    }
}

/// A label as it appears in a ranked result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredictedLabel {
    Native(String),
    Code(LabelCode),
}

impl PredictedLabel {
    pub fn as_code(&self) -> Option<LabelCode> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Native(_) => None,
        }
    }

    pub fn as_native(&self) -> Option<&str> {
        match self {
            Self::Native(label) => Some(label),
            Self::Code(_) => None,
        }
    }
}

impl fmt::Display for PredictedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(label) => f.write_str(label),
            Self::Code(code) => write!(f, "{}", code),
        }
    }
}
