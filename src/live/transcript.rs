//! Accumulates partial transcript fragments and commits finalized turns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Model,
}

/// One committed half of an exchange; immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,
    pub text: String,
}

/// Holds the two in-progress accumulators between turn boundaries.
///
/// A committed turn's text is exactly the concatenation of the fragments
/// received since the previous commit (or session start); nothing is
/// dropped or duplicated.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    input_partial: String,
    output_partial: String,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_input(&mut self, fragment: &str) {
        self.input_partial.push_str(fragment);
    }

    pub fn push_output(&mut self, fragment: &str) {
        self.output_partial.push_str(fragment);
    }

    /// Turn boundary: emit the (user, model) pair in that fixed order,
    /// trimmed, and reset both accumulators.
    pub fn commit(&mut self) -> (TranscriptTurn, TranscriptTurn) {
        let user = TranscriptTurn {
            speaker: Speaker::User,
            text: std::mem::take(&mut self.input_partial).trim().to_string(),
        };
        let model = TranscriptTurn {
            speaker: Speaker::Model,
            text: std::mem::take(&mut self.output_partial).trim().to_string(),
        };
        (user, model)
    }

    pub fn is_empty(&self) -> bool {
        self.input_partial.is_empty() && self.output_partial.is_empty()
    }
}
