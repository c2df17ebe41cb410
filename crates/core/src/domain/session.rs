//! Per-call conversation state.
//!
//! A [`CallSession`] is everything the agent knows about one phone call. It is
//! loaded at the start of each webhook turn and saved back at the end, so the
//! process itself stays stateless between turns.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dialogue::states::DialogueStep;
use crate::domain::reservation::ReservationId;
use crate::errors::DomainError;
use crate::languages::Language;

/// Turns of history kept per session. Older entries are dropped from the
/// front.
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// How many recent history entries are replayed to the analyzer as context.
pub const EXTRACTION_CONTEXT_TURNS: usize = 6;

/// Minimum digits for a string to count as a phone number.
pub const MIN_PHONE_DIGITS: usize = 9;

/// Extraction confidence for a slot value.
///
/// Values at [`Credibility::Low`] or better are trusted enough to populate the
/// session; [`Credibility::None`] means the analyzer was guessing and the
/// value must not overwrite anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Credibility {
    #[default]
    None,
    Low,
    High,
}

impl Credibility {
    /// Parses the analyzer's percentage labels ("0%", "50%", "100%").
    pub fn from_percent_label(label: &str) -> Self {
        match label.trim().trim_end_matches('%') {
            "100" => Credibility::High,
            "50" => Credibility::Low,
            _ => Credibility::None,
        }
    }

    pub fn as_percent_label(&self) -> &'static str {
        match self {
            Credibility::None => "0%",
            Credibility::Low => "50%",
            Credibility::High => "100%",
        }
    }

    /// Whether a value at this confidence may fill or overwrite a slot.
    pub fn auto_populates(&self) -> bool {
        *self >= Credibility::Low
    }
}

/// Policy outcome attached to a slot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotValidity {
    Valid,
    Invalid,
    #[default]
    Unknown,
}

/// One extracted value plus its confidence and validation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot<T> {
    pub value: T,
    pub credibility: Credibility,
    #[serde(default)]
    pub validity: SlotValidity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Slot<T> {
    pub fn new(value: T, credibility: Credibility) -> Self {
        Self { value, credibility, validity: SlotValidity::Unknown, error: None }
    }

    pub fn with_error(value: T, credibility: Credibility, error: impl Into<String>) -> Self {
        Self { value, credibility, validity: SlotValidity::Invalid, error: Some(error.into()) }
    }

    pub fn mark_valid(&mut self) {
        self.validity = SlotValidity::Valid;
        self.error = None;
    }

    pub fn mark_invalid(&mut self, error: impl Into<String>) {
        self.validity = SlotValidity::Invalid;
        self.error = Some(error.into());
    }

    pub fn is_invalid(&self) -> bool {
        self.validity == SlotValidity::Invalid
    }
}

/// The five things a reservation needs, in the order they are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotField {
    PartySize,
    Date,
    Time,
    CustomerName,
    Phone,
}

impl SlotField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotField::PartySize => "party_size",
            SlotField::Date => "date",
            SlotField::Time => "time",
            SlotField::CustomerName => "customer_name",
            SlotField::Phone => "phone",
        }
    }
}

impl fmt::Display for SlotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical slot-filling order.
pub const SLOT_ORDER: [SlotField; 5] = [
    SlotField::PartySize,
    SlotField::Date,
    SlotField::Time,
    SlotField::CustomerName,
    SlotField::Phone,
];

/// The slot set for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReservationSlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_size: Option<Slot<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<Slot<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Slot<NaiveTime>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<Slot<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Slot<String>>,
}

impl ReservationSlots {
    /// Merges freshly extracted slots into the stored set.
    ///
    /// A new value replaces the stored one only when its credibility is at
    /// least [`Credibility::Low`]; absent or zero-credibility values leave the
    /// stored slot untouched. Returns the fields that changed.
    pub fn merge(&mut self, incoming: &ReservationSlots) -> Vec<SlotField> {
        let mut changed = Vec::new();
        if let Some(slot) = &incoming.party_size {
            if slot.credibility.auto_populates() {
                self.party_size = Some(slot.clone());
                changed.push(SlotField::PartySize);
            }
        }
        if let Some(slot) = &incoming.date {
            if slot.credibility.auto_populates() {
                self.date = Some(slot.clone());
                changed.push(SlotField::Date);
            }
        }
        if let Some(slot) = &incoming.time {
            if slot.credibility.auto_populates() {
                self.time = Some(slot.clone());
                changed.push(SlotField::Time);
            }
        }
        if let Some(slot) = &incoming.customer_name {
            if slot.credibility.auto_populates() {
                self.customer_name = Some(slot.clone());
                changed.push(SlotField::CustomerName);
            }
        }
        if let Some(slot) = &incoming.phone {
            if slot.credibility.auto_populates() {
                self.phone = Some(slot.clone());
                changed.push(SlotField::Phone);
            }
        }
        changed
    }

    /// A field is satisfied when it holds a value that has not failed
    /// validation.
    pub fn is_satisfied(&self, field: SlotField) -> bool {
        match field {
            SlotField::PartySize => self.party_size.as_ref().is_some_and(|s| !s.is_invalid()),
            SlotField::Date => self.date.as_ref().is_some_and(|s| !s.is_invalid()),
            SlotField::Time => self.time.as_ref().is_some_and(|s| !s.is_invalid()),
            SlotField::CustomerName => {
                self.customer_name.as_ref().is_some_and(|s| !s.is_invalid())
            }
            SlotField::Phone => self.phone.as_ref().is_some_and(|s| !s.is_invalid()),
        }
    }

    /// First field still missing or invalid, in canonical order.
    pub fn first_unsatisfied(&self) -> Option<SlotField> {
        SLOT_ORDER.into_iter().find(|field| !self.is_satisfied(*field))
    }

    pub fn is_complete(&self) -> bool {
        self.first_unsatisfied().is_none()
    }

    /// Combined date and time, when both are present.
    pub fn reserved_at(&self) -> Option<NaiveDateTime> {
        let date = self.date.as_ref()?.value;
        let time = self.time.as_ref()?.value;
        Some(date.and_time(time))
    }
}

/// What the caller is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallIntent {
    #[default]
    Reservation,
    Modify,
    Cancel,
    Order,
    Clarify,
}

impl CallIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallIntent::Reservation => "reservation",
            CallIntent::Modify => "modify",
            CallIntent::Cancel => "cancel",
            CallIntent::Order => "order",
            CallIntent::Clarify => "clarify",
        }
    }

    /// Maps the analyzer's Spanish intent labels.
    pub fn from_analyzer_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "reserva" | "reservation" => CallIntent::Reservation,
            "modificacion" | "modificación" | "modify" => CallIntent::Modify,
            "cancelacion" | "cancelación" | "cancel" => CallIntent::Cancel,
            "pedido" | "order" => CallIntent::Order,
            _ => CallIntent::Clarify,
        }
    }
}

impl FromStr for CallIntent {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reservation" => Ok(CallIntent::Reservation),
            "modify" => Ok(CallIntent::Modify),
            "cancel" => Ok(CallIntent::Cancel),
            "order" => Ok(CallIntent::Order),
            "clarify" => Ok(CallIntent::Clarify),
            other => Err(DomainError::UnknownIntent { value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Caller,
    Agent,
}

/// One utterance in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// A reservation offered to the caller during the cancellation flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelCandidate {
    pub reservation_id: ReservationId,
    pub reserved_at: NaiveDateTime,
    pub party_size: u32,
}

/// Full state of one phone call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub call_sid: String,
    pub step: DialogueStep,
    pub language: Language,
    pub intent: CallIntent,
    pub slots: ReservationSlots,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub retry_count: u8,
    #[serde(default)]
    pub cancel_matches: Vec<CancelCandidate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallSession {
    /// Starts a session for a new call.
    ///
    /// When telephony hands us a plausible caller id, the phone slot is
    /// prefilled at full credibility so the agent can offer it instead of
    /// asking the caller to dictate their own number.
    pub fn fresh(
        call_sid: impl Into<String>,
        language: Language,
        caller_phone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut slots = ReservationSlots::default();
        if let Some(digits) = caller_phone.and_then(normalize_phone) {
            slots.phone = Some(Slot::new(digits, Credibility::High));
        }
        Self {
            call_sid: call_sid.into(),
            step: DialogueStep::Greeting,
            language,
            intent: CallIntent::Reservation,
            slots,
            history: Vec::new(),
            retry_count: 0,
            cancel_matches: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.step.is_terminal()
    }

    pub fn record_caller(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.push_history(Speaker::Caller, text.into(), now);
    }

    pub fn record_agent(&mut self, text: impl Into<String>, now: DateTime<Utc>) {
        self.push_history(Speaker::Agent, text.into(), now);
    }

    fn push_history(&mut self, speaker: Speaker, text: String, now: DateTime<Utc>) {
        self.history.push(HistoryEntry { speaker, text, at: now });
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let overflow = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(..overflow);
        }
    }

    /// Recent turns formatted for the analyzer prompt.
    pub fn context_tail(&self) -> String {
        let skip = self.history.len().saturating_sub(EXTRACTION_CONTEXT_TURNS);
        self.history[skip..]
            .iter()
            .map(|entry| {
                let who = match entry.speaker {
                    Speaker::Caller => "caller",
                    Speaker::Agent => "agent",
                };
                format!("{who}: {}", entry.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Strips formatting from a dialed or spoken number.
///
/// Returns the bare digit string, or `None` when there are too few digits to
/// be a real phone number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= MIN_PHONE_DIGITS {
        Some(digits)
    } else {
        None
    }
}
