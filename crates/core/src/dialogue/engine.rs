//! Transition table for the call flow.

use thiserror::Error;

use crate::dialogue::states::{DialogueAction, DialogueStep, TransitionOutcome, TurnEvent};
use crate::domain::session::{CallSession, ReservationSlots};

/// Unproductive turns tolerated before the call is ended. The turn that
/// pushes the count past this bound gets the handoff farewell.
pub const MAX_CLARIFY_TURNS: u8 = 3;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueError {
    #[error("no transition from step '{step}' on event '{event}'")]
    InvalidTransition { step: DialogueStep, event: &'static str },
}

/// Pure dialogue logic. Storage, extraction and policy live elsewhere; the
/// engine only decides the next step and the side effects to run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialogueEngine;

impl DialogueEngine {
    pub fn new() -> Self {
        Self
    }

    /// The step the conversation should move to once slots changed: the
    /// question for the first missing or invalid slot, or confirmation when
    /// everything is filled.
    pub fn next_step(&self, slots: &ReservationSlots) -> DialogueStep {
        match slots.first_unsatisfied() {
            Some(field) => DialogueStep::asking_for(field),
            None => DialogueStep::Confirm,
        }
    }

    pub fn transition(
        &self,
        session: &CallSession,
        event: &TurnEvent,
    ) -> Result<TransitionOutcome, DialogueError> {
        let from = session.step;
        if from.is_terminal() {
            return Ok(outcome(from, from, event, vec![DialogueAction::RepeatTerminalSummary]));
        }

        // Global intercepts run before per-step handling. A cancel request is
        // only an intercept outside the cancel flow; repeating it inside the
        // flow just re-asks the pending question.
        match event {
            TurnEvent::CancelIntent if !from.in_cancel_flow() => {
                return Ok(outcome(
                    from,
                    DialogueStep::AwaitPhoneForLookup,
                    event,
                    vec![DialogueAction::ResetRetry, DialogueAction::AskPhoneForLookup],
                ));
            }
            TurnEvent::CancelIntent => {
                return Ok(outcome(from, from, event, vec![DialogueAction::RepeatQuestion]));
            }
            TurnEvent::Frustration => {
                return Ok(outcome(
                    from,
                    from,
                    event,
                    vec![DialogueAction::EmpatheticReassure, DialogueAction::RepeatQuestion],
                ));
            }
            TurnEvent::Confusion => {
                return Ok(outcome(
                    from,
                    from,
                    event,
                    vec![DialogueAction::IncrementRetry, DialogueAction::RepeatQuestion],
                ));
            }
            TurnEvent::OrderIntent => {
                return Ok(outcome(
                    from,
                    from,
                    event,
                    vec![DialogueAction::IncrementRetry, DialogueAction::RedirectOrder],
                ));
            }
            _ => {}
        }

        let next = self.next_step(&session.slots);
        let ask_or_confirm = if next == DialogueStep::Confirm {
            DialogueAction::ReadBackConfirmation
        } else {
            DialogueAction::AskCurrentSlot
        };

        let resolved = match (from, event) {
            // The first turn always opens with the greeting, whatever the
            // caller led with.
            (DialogueStep::Greeting, _) => outcome(
                from,
                next,
                event,
                vec![DialogueAction::Greet, DialogueAction::ResetRetry, ask_or_confirm],
            ),

            (
                DialogueStep::AskPeople
                | DialogueStep::AskDate
                | DialogueStep::AskTime
                | DialogueStep::AskName
                | DialogueStep::AskPhone,
                TurnEvent::SlotsMerged { .. },
            ) => outcome(from, next, event, vec![DialogueAction::ResetRetry, ask_or_confirm]),
            (
                DialogueStep::AskPeople
                | DialogueStep::AskDate
                | DialogueStep::AskTime
                | DialogueStep::AskName
                | DialogueStep::AskPhone,
                TurnEvent::Silence | TurnEvent::Affirmation | TurnEvent::Negation,
            ) => outcome(
                from,
                from,
                event,
                vec![DialogueAction::IncrementRetry, DialogueAction::RepeatQuestion],
            ),

            (DialogueStep::Confirm, TurnEvent::Affirmation) => {
                outcome(from, from, event, vec![DialogueAction::CommitReservation])
            }
            (DialogueStep::Confirm, TurnEvent::Negation) => outcome(
                from,
                from,
                event,
                vec![DialogueAction::IncrementRetry, DialogueAction::AskWhatToChange],
            ),
            // A correction at the read-back re-enters slot filling; the
            // changed value may route straight back to confirmation.
            (DialogueStep::Confirm, TurnEvent::SlotsMerged { .. }) => {
                outcome(from, next, event, vec![DialogueAction::ResetRetry, ask_or_confirm])
            }
            (DialogueStep::Confirm, TurnEvent::Silence) => outcome(
                from,
                from,
                event,
                vec![DialogueAction::IncrementRetry, DialogueAction::RepeatQuestion],
            ),

            (DialogueStep::AwaitPhoneForLookup, TurnEvent::PhoneProvided(_)) => outcome(
                from,
                from,
                event,
                vec![DialogueAction::ResetRetry, DialogueAction::LookupReservations],
            ),
            (DialogueStep::AwaitPhoneForLookup, TurnEvent::MatchesFound { .. }) => outcome(
                from,
                DialogueStep::PresentMatches,
                event,
                vec![DialogueAction::PresentMatch],
            ),
            (DialogueStep::AwaitPhoneForLookup, TurnEvent::NoMatches) => outcome(
                from,
                from,
                event,
                vec![DialogueAction::IncrementRetry, DialogueAction::ReportNoMatch],
            ),
            (
                DialogueStep::AwaitPhoneForLookup,
                TurnEvent::Silence | TurnEvent::Negation | TurnEvent::SlotsMerged { .. },
            ) => outcome(
                from,
                from,
                event,
                vec![DialogueAction::IncrementRetry, DialogueAction::AskPhoneForLookup],
            ),

            (DialogueStep::PresentMatches, TurnEvent::Affirmation) => outcome(
                from,
                DialogueStep::AwaitCancelConfirmation,
                event,
                vec![DialogueAction::ResetRetry, DialogueAction::AskCancelConfirmation],
            ),
            (DialogueStep::PresentMatches, TurnEvent::Negation) => {
                outcome(from, from, event, vec![DialogueAction::AdvanceMatch])
            }
            (DialogueStep::PresentMatches, TurnEvent::Silence | TurnEvent::SlotsMerged { .. }) => {
                outcome(
                    from,
                    from,
                    event,
                    vec![DialogueAction::IncrementRetry, DialogueAction::PresentMatch],
                )
            }

            (DialogueStep::AwaitCancelConfirmation, TurnEvent::Affirmation) => {
                outcome(from, from, event, vec![DialogueAction::ExecuteCancellation])
            }
            (DialogueStep::AwaitCancelConfirmation, TurnEvent::Negation) => {
                outcome(from, from, event, vec![DialogueAction::KeepReservationFarewell])
            }
            (
                DialogueStep::AwaitCancelConfirmation,
                TurnEvent::Silence | TurnEvent::SlotsMerged { .. },
            ) => outcome(
                from,
                from,
                event,
                vec![DialogueAction::IncrementRetry, DialogueAction::AskCancelConfirmation],
            ),

            (step, event) => {
                return Err(DialogueError::InvalidTransition { step, event: event.name() })
            }
        };
        Ok(resolved)
    }
}

fn outcome(
    from: DialogueStep,
    to: DialogueStep,
    event: &TurnEvent,
    actions: Vec<DialogueAction>,
) -> TransitionOutcome {
    TransitionOutcome { from, to, event_name: event.name(), actions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::{Credibility, Slot, SlotField};
    use crate::languages::Language;
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-25T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn session_at(step: DialogueStep) -> CallSession {
        let mut session = CallSession::fresh("CA1", Language::Es, None, now());
        session.step = step;
        session
    }

    fn full_slots() -> ReservationSlots {
        ReservationSlots {
            party_size: Some(Slot::new(4, Credibility::High)),
            date: Some(Slot::new(
                NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
                Credibility::High,
            )),
            time: Some(Slot::new(NaiveTime::from_hms_opt(20, 0, 0).unwrap(), Credibility::High)),
            customer_name: Some(Slot::new("Ana".to_string(), Credibility::High)),
            phone: Some(Slot::new("600111222".to_string(), Credibility::High)),
        }
    }

    #[test]
    fn next_step_asks_first_missing_slot_in_order() {
        let engine = DialogueEngine::new();
        let mut slots = ReservationSlots::default();
        assert_eq!(engine.next_step(&slots), DialogueStep::AskPeople);
        slots.party_size = Some(Slot::new(4, Credibility::High));
        assert_eq!(engine.next_step(&slots), DialogueStep::AskDate);
        assert_eq!(engine.next_step(&full_slots()), DialogueStep::Confirm);
    }

    #[test]
    fn next_step_reasks_invalid_slot() {
        let engine = DialogueEngine::new();
        let mut slots = full_slots();
        slots.time.as_mut().unwrap().mark_invalid("fuera_horario");
        assert_eq!(engine.next_step(&slots), DialogueStep::AskTime);
    }

    #[test]
    fn greeting_turn_greets_then_asks() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::Greeting);
        let out = engine.transition(&session, &TurnEvent::Silence).unwrap();
        assert_eq!(out.to, DialogueStep::AskPeople);
        assert!(out.actions.contains(&DialogueAction::Greet));
        assert!(out.actions.contains(&DialogueAction::AskCurrentSlot));
    }

    #[test]
    fn one_shot_utterance_jumps_to_confirmation() {
        let engine = DialogueEngine::new();
        let mut session = session_at(DialogueStep::Greeting);
        session.slots = full_slots();
        let out = engine
            .transition(&session, &TurnEvent::SlotsMerged { changed: vec![SlotField::PartySize] })
            .unwrap();
        assert_eq!(out.to, DialogueStep::Confirm);
        assert!(out.actions.contains(&DialogueAction::ReadBackConfirmation));
    }

    #[test]
    fn cancel_intercept_fires_from_any_reservation_step() {
        let engine = DialogueEngine::new();
        for step in [DialogueStep::Greeting, DialogueStep::AskDate, DialogueStep::Confirm] {
            let session = session_at(step);
            let out = engine.transition(&session, &TurnEvent::CancelIntent).unwrap();
            assert_eq!(out.to, DialogueStep::AwaitPhoneForLookup, "from {step}");
            assert!(out.actions.contains(&DialogueAction::AskPhoneForLookup));
        }
    }

    #[test]
    fn cancel_intercept_is_inert_inside_cancel_flow() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::PresentMatches);
        let out = engine.transition(&session, &TurnEvent::CancelIntent).unwrap();
        assert_eq!(out.to, DialogueStep::PresentMatches);
    }

    #[test]
    fn frustration_reassures_without_burning_a_retry() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::AskTime);
        let out = engine.transition(&session, &TurnEvent::Frustration).unwrap();
        assert_eq!(out.to, DialogueStep::AskTime);
        assert!(out.actions.contains(&DialogueAction::EmpatheticReassure));
        assert!(!out.actions.contains(&DialogueAction::IncrementRetry));
    }

    #[test]
    fn confusion_and_silence_burn_a_retry() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::AskDate);
        for event in [TurnEvent::Confusion, TurnEvent::Silence] {
            let out = engine.transition(&session, &event).unwrap();
            assert_eq!(out.to, DialogueStep::AskDate);
            assert!(out.actions.contains(&DialogueAction::IncrementRetry));
        }
    }

    #[test]
    fn order_request_redirects_and_burns_a_retry() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::AskPeople);
        let out = engine.transition(&session, &TurnEvent::OrderIntent).unwrap();
        assert!(out.actions.contains(&DialogueAction::RedirectOrder));
        assert!(out.actions.contains(&DialogueAction::IncrementRetry));
    }

    #[test]
    fn confirmation_yes_commits() {
        let engine = DialogueEngine::new();
        let mut session = session_at(DialogueStep::Confirm);
        session.slots = full_slots();
        let out = engine.transition(&session, &TurnEvent::Affirmation).unwrap();
        assert_eq!(out.actions, vec![DialogueAction::CommitReservation]);
    }

    #[test]
    fn confirmation_no_asks_what_to_change() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::Confirm);
        let out = engine.transition(&session, &TurnEvent::Negation).unwrap();
        assert!(out.actions.contains(&DialogueAction::AskWhatToChange));
    }

    #[test]
    fn confirmation_correction_routes_back_through_slot_filling() {
        let engine = DialogueEngine::new();
        let mut session = session_at(DialogueStep::Confirm);
        session.slots = full_slots();
        session.slots.date = None;
        let out = engine
            .transition(&session, &TurnEvent::SlotsMerged { changed: vec![SlotField::PartySize] })
            .unwrap();
        assert_eq!(out.to, DialogueStep::AskDate);
    }

    #[test]
    fn terminal_steps_only_repeat_their_summary() {
        let engine = DialogueEngine::new();
        for step in [DialogueStep::Complete, DialogueStep::Cancelled] {
            let session = session_at(step);
            let out = engine.transition(&session, &TurnEvent::CancelIntent).unwrap();
            assert_eq!(out.to, step);
            assert_eq!(out.actions, vec![DialogueAction::RepeatTerminalSummary]);
        }
    }

    #[test]
    fn cancel_flow_walks_phone_matches_confirmation() {
        let engine = DialogueEngine::new();

        let session = session_at(DialogueStep::AwaitPhoneForLookup);
        let out = engine
            .transition(&session, &TurnEvent::PhoneProvided("600111222".into()))
            .unwrap();
        assert!(out.actions.contains(&DialogueAction::LookupReservations));

        let out = engine.transition(&session, &TurnEvent::MatchesFound { count: 2 }).unwrap();
        assert_eq!(out.to, DialogueStep::PresentMatches);

        let session = session_at(DialogueStep::PresentMatches);
        let out = engine.transition(&session, &TurnEvent::Affirmation).unwrap();
        assert_eq!(out.to, DialogueStep::AwaitCancelConfirmation);

        let session = session_at(DialogueStep::AwaitCancelConfirmation);
        let out = engine.transition(&session, &TurnEvent::Affirmation).unwrap();
        assert_eq!(out.actions, vec![DialogueAction::ExecuteCancellation]);
    }

    #[test]
    fn lookup_miss_reasks_for_the_number() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::AwaitPhoneForLookup);
        let out = engine.transition(&session, &TurnEvent::NoMatches).unwrap();
        assert_eq!(out.to, DialogueStep::AwaitPhoneForLookup);
        assert!(out.actions.contains(&DialogueAction::ReportNoMatch));
        assert!(out.actions.contains(&DialogueAction::IncrementRetry));
    }

    #[test]
    fn rejecting_presented_match_advances_to_the_next() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::PresentMatches);
        let out = engine.transition(&session, &TurnEvent::Negation).unwrap();
        assert_eq!(out.actions, vec![DialogueAction::AdvanceMatch]);
    }

    #[test]
    fn declining_final_confirmation_keeps_the_reservation() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::AwaitCancelConfirmation);
        let out = engine.transition(&session, &TurnEvent::Negation).unwrap();
        assert_eq!(out.actions, vec![DialogueAction::KeepReservationFarewell]);
    }

    #[test]
    fn lookup_events_outside_their_step_are_rejected() {
        let engine = DialogueEngine::new();
        let session = session_at(DialogueStep::AskDate);
        let err = engine.transition(&session, &TurnEvent::MatchesFound { count: 1 }).unwrap_err();
        assert!(matches!(err, DialogueError::InvalidTransition { .. }));
    }
}
