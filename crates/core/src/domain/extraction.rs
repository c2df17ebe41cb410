//! What one pass over a caller utterance yields.

use serde::{Deserialize, Serialize};

use crate::domain::session::{CallIntent, ReservationSlots};
use crate::languages::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    #[default]
    Neutral,
    Positive,
    Frustrated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Normal,
    High,
}

/// Which strategy produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    Analyzer,
    Deterministic,
}

impl ExtractionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionSource::Analyzer => "analyzer",
            ExtractionSource::Deterministic => "deterministic",
        }
    }
}

/// Everything understood from a single caller utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotExtractionResult {
    pub intent: CallIntent,
    pub language: Option<Language>,
    pub slots: ReservationSlots,
    pub sentiment: Sentiment,
    pub urgency: Urgency,
    pub needs_clarification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_question: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_items: Vec<String>,
    pub source: ExtractionSource,
}

impl SlotExtractionResult {
    /// A result that understood nothing.
    pub fn empty(source: ExtractionSource) -> Self {
        Self {
            intent: CallIntent::Clarify,
            language: None,
            slots: ReservationSlots::default(),
            sentiment: Sentiment::Neutral,
            urgency: Urgency::Normal,
            needs_clarification: true,
            clarification_question: None,
            order_items: Vec::new(),
            source,
        }
    }

    pub fn has_any_slot(&self) -> bool {
        let s = &self.slots;
        s.party_size.is_some()
            || s.date.is_some()
            || s.time.is_some()
            || s.customer_name.is_some()
            || s.phone.is_some()
    }
}
