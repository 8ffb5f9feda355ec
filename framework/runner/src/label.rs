use std::fmt;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Format of generated labels, sortable with second resolution.
pub const RUN_LABEL_FORMAT: &str = "%Y%m%d_%H%M%S";

const DISAMBIGUATOR_LEN: usize = 6;
const DISAMBIGUATOR_ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

/// Names one run and prefixes every artifact it writes.
///
/// Two runs with different labels never share an artifact path. Two runs started in the same
/// second with [`RunLabel::now`] and the same output directory get the same label, and the files
/// of whichever engine writes last win. Use [`RunLabel::now_disambiguated`] when runs may overlap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunLabel(String);

impl RunLabel {
    /// Use a caller-chosen label, e.g. to make a run reproducible in tests.
    pub fn new(label: impl Into<String>) -> OrchestratorResult<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(OrchestratorError::invalid("run_label", "must not be empty"));
        }
        if label.contains(['/', '\\']) || label == "." || label == ".." {
            return Err(OrchestratorError::invalid(
                "run_label",
                format!("'{label}' must be a plain file name prefix"),
            ));
        }

        Ok(Self(label))
    }

    /// Label from the current local time, e.g. `20240101_120000`.
    pub fn now() -> Self {
        Self(chrono::Local::now().format(RUN_LABEL_FORMAT).to_string())
    }

    /// Label from the current local time with a random suffix, e.g. `20240101_120000_k3v9qa`.
    pub fn now_disambiguated() -> Self {
        let alphabet = DISAMBIGUATOR_ALPHABET.chars().collect::<Vec<_>>();
        let suffix = nanoid::nanoid!(DISAMBIGUATOR_LEN, &alphabet);
        Self(format!("{}_{suffix}", Self::now().0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
