// Attempt data model
//
// An attempt is one unit of work pairing input parameters with a
// transformation strategy. Completed attempts are persisted as single
// JSONL checkpoint entries, so both types round-trip through serde.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scorer::Verdict;

/// Parameters describing one unit of work.
///
/// An open record: a fixed `input` plus whatever extra fields the strategy
/// generated alongside it (e.g. a target persona, a suffix seed). The
/// dedup key defaults to the original input value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptParams {
    /// The original input under attack
    pub input: String,

    /// Strategy-specific extra fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl AttemptParams {
    /// Create params for a single input
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Attach an extra field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Key used to de-duplicate attempts across retries and resumes
    pub fn dedup_key(&self) -> &str {
        &self.input
    }
}

/// One completed attempt, as recorded in the checkpoint file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    /// The input as originally supplied
    pub original_input: String,

    /// The transformed input actually sent to the model
    pub transformed_input: String,

    /// The produced output
    pub output: String,

    /// Scorer name -> verdict. Insertion order is irrelevant.
    #[serde(default)]
    pub verdicts: HashMap<String, Verdict>,

    /// Free-form extra metadata (e.g. refined responses)
    #[serde(default)]
    pub extra: serde_json::Map<String, Value>,
}

impl AttemptResult {
    /// Create a result with empty verdicts and metadata
    pub fn new(
        original_input: impl Into<String>,
        transformed_input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            original_input: original_input.into(),
            transformed_input: transformed_input.into(),
            output: output.into(),
            verdicts: HashMap::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Key used to de-duplicate results; matches `AttemptParams::dedup_key`
    pub fn dedup_key(&self) -> &str {
        &self.original_input
    }
}
