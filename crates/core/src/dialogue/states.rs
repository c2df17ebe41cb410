//! Steps, events and actions of the call flow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::session::SlotField;
use crate::errors::DomainError;

/// Where the conversation stands.
///
/// Asking for clarification is deliberately not a step: a clarifying reply
/// leaves the session wherever it was, so the next caller turn is interpreted
/// against the same question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueStep {
    #[default]
    Greeting,
    AskPeople,
    AskDate,
    AskTime,
    AskName,
    AskPhone,
    Confirm,
    Complete,
    AwaitPhoneForLookup,
    PresentMatches,
    AwaitCancelConfirmation,
    Cancelled,
}

impl DialogueStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueStep::Greeting => "greeting",
            DialogueStep::AskPeople => "ask_people",
            DialogueStep::AskDate => "ask_date",
            DialogueStep::AskTime => "ask_time",
            DialogueStep::AskName => "ask_name",
            DialogueStep::AskPhone => "ask_phone",
            DialogueStep::Confirm => "confirm",
            DialogueStep::Complete => "complete",
            DialogueStep::AwaitPhoneForLookup => "await_phone_for_lookup",
            DialogueStep::PresentMatches => "present_matches",
            DialogueStep::AwaitCancelConfirmation => "await_cancel_confirmation",
            DialogueStep::Cancelled => "cancelled",
        }
    }

    /// Terminal steps answer every further turn with a summary and never
    /// transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DialogueStep::Complete | DialogueStep::Cancelled)
    }

    pub fn in_cancel_flow(&self) -> bool {
        matches!(
            self,
            DialogueStep::AwaitPhoneForLookup
                | DialogueStep::PresentMatches
                | DialogueStep::AwaitCancelConfirmation
        )
    }

    /// The slot a question step is waiting on.
    pub fn asked_slot(&self) -> Option<SlotField> {
        match self {
            DialogueStep::AskPeople => Some(SlotField::PartySize),
            DialogueStep::AskDate => Some(SlotField::Date),
            DialogueStep::AskTime => Some(SlotField::Time),
            DialogueStep::AskName => Some(SlotField::CustomerName),
            DialogueStep::AskPhone => Some(SlotField::Phone),
            _ => None,
        }
    }

    /// The question step for a slot field.
    pub fn asking_for(field: SlotField) -> DialogueStep {
        match field {
            SlotField::PartySize => DialogueStep::AskPeople,
            SlotField::Date => DialogueStep::AskDate,
            SlotField::Time => DialogueStep::AskTime,
            SlotField::CustomerName => DialogueStep::AskName,
            SlotField::Phone => DialogueStep::AskPhone,
        }
    }
}

impl fmt::Display for DialogueStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialogueStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greeting" => Ok(DialogueStep::Greeting),
            "ask_people" => Ok(DialogueStep::AskPeople),
            "ask_date" => Ok(DialogueStep::AskDate),
            "ask_time" => Ok(DialogueStep::AskTime),
            "ask_name" => Ok(DialogueStep::AskName),
            "ask_phone" => Ok(DialogueStep::AskPhone),
            "confirm" => Ok(DialogueStep::Confirm),
            "complete" => Ok(DialogueStep::Complete),
            "await_phone_for_lookup" => Ok(DialogueStep::AwaitPhoneForLookup),
            "present_matches" => Ok(DialogueStep::PresentMatches),
            "await_cancel_confirmation" => Ok(DialogueStep::AwaitCancelConfirmation),
            "cancelled" => Ok(DialogueStep::Cancelled),
            other => Err(DomainError::UnknownStep { value: other.to_string() }),
        }
    }
}

/// What one caller turn amounted to, after extraction and event derivation.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Caller wants to cancel an existing reservation.
    CancelIntent,
    /// Caller sounds frustrated; reassure before repeating the question.
    Frustration,
    /// Caller did not understand the agent.
    Confusion,
    /// Caller is asking for food, which this line does not handle.
    OrderIntent,
    /// Extraction changed at least one slot.
    SlotsMerged { changed: Vec<SlotField> },
    /// Plain yes at a yes/no step.
    Affirmation,
    /// Plain no at a yes/no step.
    Negation,
    /// A phone number surfaced while we were waiting for one.
    PhoneProvided(String),
    /// Lookup by phone found reservations to present.
    MatchesFound { count: usize },
    /// Lookup by phone found nothing active.
    NoMatches,
    /// Nothing usable in the turn.
    Silence,
}

impl TurnEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TurnEvent::CancelIntent => "cancel_intent",
            TurnEvent::Frustration => "frustration",
            TurnEvent::Confusion => "confusion",
            TurnEvent::OrderIntent => "order_intent",
            TurnEvent::SlotsMerged { .. } => "slots_merged",
            TurnEvent::Affirmation => "affirmation",
            TurnEvent::Negation => "negation",
            TurnEvent::PhoneProvided(_) => "phone_provided",
            TurnEvent::MatchesFound { .. } => "matches_found",
            TurnEvent::NoMatches => "no_matches",
            TurnEvent::Silence => "silence",
        }
    }
}

/// Side effects the runtime must perform for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueAction {
    Greet,
    AskCurrentSlot,
    ReadBackConfirmation,
    CommitReservation,
    AskWhatToChange,
    RepeatQuestion,
    EmpatheticReassure,
    RedirectOrder,
    IncrementRetry,
    ResetRetry,
    AskPhoneForLookup,
    LookupReservations,
    PresentMatch,
    AdvanceMatch,
    ReportNoMatch,
    AskCancelConfirmation,
    ExecuteCancellation,
    KeepReservationFarewell,
    RepeatTerminalSummary,
}

/// A resolved transition: where we came from, where we go, what to do.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub from: DialogueStep,
    pub to: DialogueStep,
    pub event_name: &'static str,
    pub actions: Vec<DialogueAction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_round_trip_through_str() {
        let all = [
            DialogueStep::Greeting,
            DialogueStep::AskPeople,
            DialogueStep::AskDate,
            DialogueStep::AskTime,
            DialogueStep::AskName,
            DialogueStep::AskPhone,
            DialogueStep::Confirm,
            DialogueStep::Complete,
            DialogueStep::AwaitPhoneForLookup,
            DialogueStep::PresentMatches,
            DialogueStep::AwaitCancelConfirmation,
            DialogueStep::Cancelled,
        ];
        for step in all {
            assert_eq!(step.as_str().parse::<DialogueStep>().unwrap(), step);
        }
        assert!("limbo".parse::<DialogueStep>().is_err());
    }

    #[test]
    fn only_complete_and_cancelled_are_terminal() {
        assert!(DialogueStep::Complete.is_terminal());
        assert!(DialogueStep::Cancelled.is_terminal());
        assert!(!DialogueStep::Confirm.is_terminal());
        assert!(!DialogueStep::AwaitCancelConfirmation.is_terminal());
    }

    #[test]
    fn question_steps_map_to_their_slot_and_back() {
        for field in crate::domain::session::SLOT_ORDER {
            let step = DialogueStep::asking_for(field);
            assert_eq!(step.asked_slot(), Some(field));
        }
        assert_eq!(DialogueStep::Confirm.asked_slot(), None);
    }
}
