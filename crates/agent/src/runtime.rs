//! One webhook turn, end to end.
//!
//! `TurnRuntime` is the only piece that sees every layer at once: it loads
//! the session, runs extraction, asks the dialogue engine for a transition,
//! executes the actions the engine ordered, and persists the result. The
//! reply is always natural language in the caller's language; failures along
//! the way degrade to an apology rather than an error the caller would hear
//! as silence.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use reserva_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use reserva_core::config::AppConfig;
use reserva_core::dialogue::{
    DialogueAction, DialogueEngine, DialogueStep, TransitionOutcome, TurnEvent, MAX_CLARIFY_TURNS,
};
use reserva_core::domain::extraction::{Sentiment, SlotExtractionResult};
use reserva_core::domain::session::{
    normalize_phone, CallIntent, CallSession, CancelCandidate, Credibility, ReservationSlots,
    Slot, SlotField,
};
use reserva_core::languages::messages::{self, ReservationSummary, ViolationContext};
use reserva_core::languages::{self, keywords, Language};
use reserva_core::policy::{OccupancyLookup, ReservationPolicy};
use reserva_db::repositories::{CallSessionRepository, ReservationRepository};

use crate::executor::{ExecutorError, ReservationExecutor};
use crate::extractor::{truncate_utterance, ExtractionContext, SlotExtractor};

const AUDIT_ACTOR: &str = "turn_runtime";

/// What the channel layer speaks back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub text: String,
    /// The call should end after this reply is spoken.
    pub terminal: bool,
    pub language: Language,
}

/// Everything the effects of one transition produced.
struct TurnEffects {
    parts: Vec<String>,
    terminal: bool,
    drop_session: bool,
}

impl TurnEffects {
    fn empty() -> Self {
        Self { parts: Vec::new(), terminal: false, drop_session: false }
    }
}

pub struct TurnRuntime {
    config: AppConfig,
    engine: DialogueEngine,
    extractor: SlotExtractor,
    policy: ReservationPolicy,
    executor: ReservationExecutor,
    sessions: Arc<dyn CallSessionRepository>,
    reservations: Arc<dyn ReservationRepository>,
    occupancy: Arc<dyn OccupancyLookup>,
    audit: Arc<dyn AuditSink>,
}

impl TurnRuntime {
    pub fn new(
        config: AppConfig,
        extractor: SlotExtractor,
        sessions: Arc<dyn CallSessionRepository>,
        reservations: Arc<dyn ReservationRepository>,
        occupancy: Arc<dyn OccupancyLookup>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let policy = ReservationPolicy::new(config.restaurant.clone());
        let executor = ReservationExecutor::new(reservations.clone());
        Self {
            config,
            engine: DialogueEngine::new(),
            extractor,
            policy,
            executor,
            sessions,
            reservations,
            occupancy,
            audit,
        }
    }

    /// Processes one caller utterance and returns what to say back.
    pub async fn handle_turn(
        &self,
        call_sid: &str,
        utterance: &str,
        caller_phone_hint: Option<&str>,
    ) -> TurnReply {
        self.handle_turn_at(call_sid, utterance, caller_phone_hint, Utc::now()).await
    }

    /// Same as [`handle_turn`](Self::handle_turn) with an explicit clock, so
    /// date resolution and advance-notice checks are reproducible.
    pub async fn handle_turn_at(
        &self,
        call_sid: &str,
        utterance: &str,
        caller_phone_hint: Option<&str>,
        now: DateTime<Utc>,
    ) -> TurnReply {
        let correlation_id = Uuid::new_v4().to_string();
        let utterance = truncate_utterance(utterance);
        let default_lang = self.config.restaurant.default_language;

        let mut session = match self.sessions.find_by_call_sid(call_sid).await {
            Ok(Some(session)) => session,
            Ok(None) => CallSession::fresh(call_sid, default_lang, caller_phone_hint, now),
            Err(error) => {
                // Without the real session any answer we gave would desync
                // the conversation, so the turn ends here.
                tracing::error!(call_sid, %error, "session load failed");
                self.audit(call_sid, &correlation_id, "session_load", AuditCategory::Persistence)
                    .outcome(AuditOutcome::Failed)
                    .meta("error", error.to_string())
                    .emit();
                return TurnReply {
                    text: messages::store_trouble(default_lang),
                    terminal: true,
                    language: default_lang,
                };
            }
        };

        // A finished call stays finished. Duplicate webhooks for the closing
        // turn get the same summary again instead of a second commit.
        if session.is_terminal() {
            return TurnReply {
                text: self.question_for(&session, caller_phone_hint),
                terminal: true,
                language: session.language,
            };
        }

        let extraction = {
            let ctx = ExtractionContext {
                session: &session,
                restaurant: &self.config.restaurant,
                now,
            };
            self.extractor.extract(utterance, &ctx).await
        };
        if let Some(lang) = extraction.language {
            session.language = lang;
        }
        if matches!(
            extraction.intent,
            CallIntent::Reservation | CallIntent::Modify | CallIntent::Cancel
        ) {
            session.intent = extraction.intent;
        }
        self.audit(call_sid, &correlation_id, "slot_extraction", AuditCategory::Extraction)
            .meta("source", extraction.source.as_str())
            .meta("intent", extraction.intent.as_str())
            .meta("sentiment", format!("{:?}", extraction.sentiment))
            .emit();

        session.record_caller(utterance, now);

        let normalized = languages::normalize(utterance);
        let hinted = caller_phone_hint.and_then(normalize_phone);

        // Intercepted turns skip slot processing: "dos pizzas" in an order
        // request must not overwrite the party size. Mid-cancellation the
        // digits are a lookup key, not a new booking, so nothing merges
        // there either.
        let intercepted = extraction.intent == CallIntent::Cancel
            || extraction.intent == CallIntent::Order
            || extraction.sentiment == Sentiment::Frustrated;
        let mut changed = Vec::new();
        if !session.step.in_cancel_flow() && !intercepted {
            changed = session.slots.merge(&extraction.slots);
            if session.step == DialogueStep::AskPhone
                && !session.slots.is_satisfied(SlotField::Phone)
                && keywords::is_affirmation(session.language, &normalized)
            {
                // The agent offered the caller id; a yes adopts it.
                if let Some(digits) = hinted.clone() {
                    session.slots.phone = Some(Slot::new(digits, Credibility::High));
                    changed.push(SlotField::Phone);
                }
            }
        }

        let mut violation_text = None;
        if !changed.is_empty() {
            violation_text =
                self.apply_policy(&mut session, now, call_sid, &correlation_id).await;
        }

        let event = derive_event(&session, &extraction, &normalized, changed, hinted);

        let effects = match self.engine.transition(&session, &event) {
            Ok(outcome) => {
                tracing::debug!(
                    call_sid,
                    from = outcome.from.as_str(),
                    to = outcome.to.as_str(),
                    event = outcome.event_name,
                    "dialogue transition"
                );
                self.audit(call_sid, &correlation_id, "dialogue_transition", AuditCategory::Dialogue)
                    .meta("from", outcome.from.as_str())
                    .meta("to", outcome.to.as_str())
                    .meta("event", outcome.event_name)
                    .emit();
                session.step = outcome.to;
                self.apply_actions(
                    &outcome,
                    &mut session,
                    &event,
                    violation_text,
                    caller_phone_hint,
                    now,
                    call_sid,
                    &correlation_id,
                )
                .await
            }
            Err(error) => {
                tracing::error!(call_sid, %error, "dialogue transition rejected");
                session.retry_count = session.retry_count.saturating_add(1);
                let mut effects = TurnEffects::empty();
                effects.parts.push(messages::did_not_catch(session.language));
                effects.parts.push(self.question_for(&session, caller_phone_hint));
                effects
            }
        };

        let TurnEffects { parts, mut terminal, mut drop_session } = effects;
        let mut text = parts.join(" ");
        if text.is_empty() {
            text = self.question_for(&session, caller_phone_hint);
        }

        // Bounded clarification: after the third unproductive turn in a row
        // the agent gives up instead of looping.
        if !terminal && session.retry_count > MAX_CLARIFY_TURNS {
            text = messages::retry_exhausted(session.language);
            terminal = true;
            drop_session = true;
            self.audit(call_sid, &correlation_id, "retry_exhausted", AuditCategory::Dialogue)
                .outcome(AuditOutcome::Rejected)
                .meta("retries", session.retry_count.to_string())
                .emit();
        }

        session.record_agent(text.as_str(), now);
        session.touch(now);

        if drop_session {
            if let Err(error) = self.sessions.delete(call_sid).await {
                tracing::warn!(call_sid, %error, "session delete failed");
            }
        } else if let Err(error) = self.sessions.upsert(&session).await {
            tracing::error!(call_sid, %error, "session save failed");
            self.audit(call_sid, &correlation_id, "session_save", AuditCategory::Persistence)
                .outcome(AuditOutcome::Failed)
                .meta("error", error.to_string())
                .emit();
            return TurnReply {
                text: messages::store_trouble(session.language),
                terminal: true,
                language: session.language,
            };
        }

        TurnReply { text, terminal, language: session.language }
    }

    /// Runs the policy over the merged slots and marks the offenders.
    ///
    /// The verdict owns slot validity: slots the analyzer flagged in advisory
    /// form are re-checked here, so a stale advisory cannot wedge a slot in
    /// the invalid state after the configuration says it is fine.
    async fn apply_policy(
        &self,
        session: &mut CallSession,
        now: DateTime<Utc>,
        call_sid: &str,
        correlation_id: &str,
    ) -> Option<String> {
        let verdict = self.policy.validate(&session.slots, self.occupancy.as_ref(), now).await;

        if let Some(reason) = &verdict.degraded {
            tracing::warn!(call_sid, reason, "capacity check degraded, accepting unchecked");
            self.audit(call_sid, correlation_id, "policy_degraded", AuditCategory::Policy)
                .meta("reason", reason.clone())
                .emit();
        }

        mark_all_valid(&mut session.slots);
        if verdict.ok {
            return None;
        }

        for violation in &verdict.violations {
            let code = violation.code.as_str();
            match violation.field {
                SlotField::PartySize => mark_invalid(&mut session.slots.party_size, code),
                SlotField::Date => mark_invalid(&mut session.slots.date, code),
                SlotField::Time => mark_invalid(&mut session.slots.time, code),
                SlotField::CustomerName => {
                    mark_invalid(&mut session.slots.customer_name, code);
                }
                SlotField::Phone => mark_invalid(&mut session.slots.phone, code),
            }
        }

        let codes = verdict
            .violations
            .iter()
            .map(|violation| violation.code.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.audit(call_sid, correlation_id, "policy_rejected", AuditCategory::Policy)
            .outcome(AuditOutcome::Rejected)
            .meta("codes", codes)
            .emit();

        let first = verdict.violations.first()?;
        let restaurant = self.policy.config();
        let ctx = ViolationContext {
            min_party: restaurant.min_party_size,
            max_party: restaurant.max_party_size,
            min_advance_hours: restaurant.min_advance_hours,
            windows: &restaurant.service_windows,
            alternatives: &verdict.alternatives,
        };
        Some(messages::violation(session.language, first.code, &ctx))
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_actions(
        &self,
        outcome: &TransitionOutcome,
        session: &mut CallSession,
        event: &TurnEvent,
        violation_text: Option<String>,
        caller_phone_hint: Option<&str>,
        now: DateTime<Utc>,
        call_sid: &str,
        correlation_id: &str,
    ) -> TurnEffects {
        let mut effects = TurnEffects::empty();
        let mut violation_text = violation_text;

        for action in &outcome.actions {
            let lang = session.language;
            match action {
                DialogueAction::Greet => {
                    effects.parts.push(messages::greeting(lang, &self.config.restaurant.name));
                }
                DialogueAction::AskCurrentSlot => {
                    let text = violation_text
                        .take()
                        .unwrap_or_else(|| self.question_for(session, caller_phone_hint));
                    effects.parts.push(text);
                }
                DialogueAction::ReadBackConfirmation => {
                    let text = violation_text.take().unwrap_or_else(|| {
                        match summary_of(&session.slots) {
                            Some(summary) => messages::confirm_summary(lang, &summary),
                            None => messages::did_not_catch(lang),
                        }
                    });
                    effects.parts.push(text);
                }
                DialogueAction::CommitReservation => {
                    self.commit(session, &mut effects, now, call_sid, correlation_id).await;
                }
                DialogueAction::AskWhatToChange => {
                    effects.parts.push(messages::what_to_change(lang));
                }
                DialogueAction::RepeatQuestion => {
                    if matches!(event, TurnEvent::Silence) {
                        effects.parts.push(messages::did_not_catch(lang));
                    }
                    effects.parts.push(self.question_for(session, caller_phone_hint));
                }
                DialogueAction::EmpatheticReassure => {
                    effects.parts.push(messages::empathetic(lang));
                }
                DialogueAction::RedirectOrder => {
                    effects.parts.push(messages::order_redirect(lang));
                }
                DialogueAction::IncrementRetry => {
                    session.retry_count = session.retry_count.saturating_add(1);
                }
                DialogueAction::ResetRetry => {
                    session.retry_count = 0;
                }
                DialogueAction::AskPhoneForLookup => {
                    effects.parts.push(messages::cancel_ask_phone(lang));
                }
                DialogueAction::LookupReservations => {
                    self.lookup_matches(session, event, &mut effects, call_sid, correlation_id)
                        .await;
                }
                DialogueAction::PresentMatch => match session.cancel_matches.first() {
                    Some(candidate) => effects.parts.push(messages::cancel_presented(
                        lang,
                        candidate.reserved_at,
                        candidate.party_size,
                    )),
                    None => effects.parts.push(messages::cancel_none_found(lang)),
                },
                DialogueAction::AdvanceMatch => {
                    if !session.cancel_matches.is_empty() {
                        session.cancel_matches.remove(0);
                    }
                    match session.cancel_matches.first() {
                        Some(next) => effects.parts.push(messages::cancel_presented(
                            lang,
                            next.reserved_at,
                            next.party_size,
                        )),
                        None => {
                            session.step = DialogueStep::AwaitPhoneForLookup;
                            effects.parts.push(messages::cancel_none_found(lang));
                        }
                    }
                }
                DialogueAction::ReportNoMatch => {
                    effects.parts.push(messages::cancel_none_found(lang));
                }
                DialogueAction::AskCancelConfirmation => {
                    effects.parts.push(messages::cancel_confirm(lang));
                }
                DialogueAction::ExecuteCancellation => {
                    self.execute_cancellation(session, &mut effects, call_sid, correlation_id)
                        .await;
                }
                DialogueAction::KeepReservationFarewell => {
                    effects.parts.push(messages::reservation_kept(lang));
                    effects.terminal = true;
                    effects.drop_session = true;
                }
                DialogueAction::RepeatTerminalSummary => {
                    effects.parts.push(self.question_for(session, caller_phone_hint));
                    effects.terminal = true;
                }
            }
        }

        effects
    }

    /// Books the table once the caller has confirmed the read-back.
    async fn commit(
        &self,
        session: &mut CallSession,
        effects: &mut TurnEffects,
        now: DateTime<Utc>,
        call_sid: &str,
        correlation_id: &str,
    ) {
        // Re-validate right before writing: advance notice decays while the
        // caller talks, and another call may have taken the seats.
        if let Some(text) = self.apply_policy(session, now, call_sid, correlation_id).await {
            session.step = self.engine.next_step(&session.slots);
            effects.parts.push(text);
            return;
        }

        let lang = session.language;
        let committed = match session.intent {
            CallIntent::Modify => match self.executor.modify(session, now).await {
                // Nothing on file to move; book it as a new table.
                Err(ExecutorError::NotFound) => self.executor.create(session, now).await,
                other => other,
            },
            _ => self.executor.create(session, now).await,
        };

        match committed {
            Ok(record) => {
                session.step = DialogueStep::Complete;
                effects.terminal = true;
                let summary = ReservationSummary {
                    party_size: record.party_size,
                    date: record.reserved_at.date(),
                    time: record.reserved_at.time(),
                    customer_name: &record.customer_name,
                    phone: &record.phone,
                };
                effects.parts.push(messages::reservation_confirmed(lang, &summary));
                self.audit(call_sid, correlation_id, "reservation_committed", AuditCategory::Persistence)
                    .meta("reservation_id", record.id.0.clone())
                    .meta("party_size", record.party_size.to_string())
                    .emit();
            }
            Err(ExecutorError::MissingSlot(field)) => {
                session.step = DialogueStep::asking_for(field);
                effects.parts.push(messages::ask_slot(lang, field));
            }
            Err(error) => {
                tracing::error!(call_sid, %error, "reservation commit failed");
                self.audit(call_sid, correlation_id, "reservation_commit", AuditCategory::Persistence)
                    .outcome(AuditOutcome::Failed)
                    .meta("error", error.to_string())
                    .emit();
                effects.parts.push(messages::store_trouble(lang));
            }
        }
    }

    /// Looks up active bookings for the number the caller gave and feeds the
    /// result back through the engine as a second transition.
    async fn lookup_matches(
        &self,
        session: &mut CallSession,
        event: &TurnEvent,
        effects: &mut TurnEffects,
        call_sid: &str,
        correlation_id: &str,
    ) {
        let lang = session.language;
        let phone = match event {
            TurnEvent::PhoneProvided(phone) => phone.clone(),
            _ => return,
        };

        let records = match self.reservations.find_active_by_phone(&phone).await {
            Ok(records) => records,
            Err(error) => {
                tracing::error!(call_sid, %error, "reservation lookup failed");
                self.audit(call_sid, correlation_id, "reservation_lookup", AuditCategory::Persistence)
                    .outcome(AuditOutcome::Failed)
                    .meta("error", error.to_string())
                    .emit();
                effects.parts.push(messages::store_trouble(lang));
                return;
            }
        };

        session.slots.phone = Some(Slot::new(phone, Credibility::High));
        session.cancel_matches = records
            .iter()
            .map(|record| CancelCandidate {
                reservation_id: record.id.clone(),
                reserved_at: record.reserved_at,
                party_size: record.party_size,
            })
            .collect();

        let follow = if session.cancel_matches.is_empty() {
            TurnEvent::NoMatches
        } else {
            TurnEvent::MatchesFound { count: session.cancel_matches.len() }
        };
        match self.engine.transition(session, &follow) {
            Ok(outcome) => {
                self.audit(call_sid, correlation_id, "dialogue_transition", AuditCategory::Dialogue)
                    .meta("from", outcome.from.as_str())
                    .meta("to", outcome.to.as_str())
                    .meta("event", outcome.event_name)
                    .emit();
                session.step = outcome.to;
                for action in &outcome.actions {
                    match action {
                        DialogueAction::IncrementRetry => {
                            session.retry_count = session.retry_count.saturating_add(1);
                        }
                        DialogueAction::ResetRetry => session.retry_count = 0,
                        DialogueAction::PresentMatch => match session.cancel_matches.first() {
                            Some(candidate) => effects.parts.push(messages::cancel_presented(
                                lang,
                                candidate.reserved_at,
                                candidate.party_size,
                            )),
                            None => effects.parts.push(messages::cancel_none_found(lang)),
                        },
                        DialogueAction::ReportNoMatch => {
                            effects.parts.push(messages::cancel_none_found(lang));
                        }
                        _ => {}
                    }
                }
            }
            Err(error) => {
                tracing::error!(call_sid, %error, "lookup follow-up transition rejected");
                effects.parts.push(messages::cancel_ask_phone(lang));
            }
        }
    }

    async fn execute_cancellation(
        &self,
        session: &mut CallSession,
        effects: &mut TurnEffects,
        call_sid: &str,
        correlation_id: &str,
    ) {
        let lang = session.language;
        let candidate = session.cancel_matches.first().cloned();
        let phone = session.slots.phone.as_ref().map(|slot| slot.value.clone());

        let (candidate, phone) = match (candidate, phone) {
            (Some(candidate), Some(phone)) => (candidate, phone),
            _ => {
                session.step = DialogueStep::AwaitPhoneForLookup;
                effects.parts.push(messages::cancel_ask_phone(lang));
                return;
            }
        };

        match self.executor.cancel(&candidate.reservation_id, &phone).await {
            Ok(()) => {
                session.step = DialogueStep::Cancelled;
                effects.terminal = true;
                effects.parts.push(messages::cancelled_done(lang));
                self.audit(call_sid, correlation_id, "reservation_cancelled", AuditCategory::Persistence)
                    .meta("reservation_id", candidate.reservation_id.0.clone())
                    .emit();
            }
            Err(ExecutorError::NotFound) => {
                // Raced with another cancellation; start the lookup over.
                session.cancel_matches.clear();
                session.step = DialogueStep::AwaitPhoneForLookup;
                effects.parts.push(messages::cancel_none_found(lang));
            }
            Err(error) => {
                tracing::error!(call_sid, %error, "cancellation failed");
                self.audit(call_sid, correlation_id, "reservation_cancel", AuditCategory::Persistence)
                    .outcome(AuditOutcome::Failed)
                    .meta("error", error.to_string())
                    .emit();
                effects.parts.push(messages::store_trouble(lang));
            }
        }
    }

    /// The question the current step is waiting on.
    fn question_for(&self, session: &CallSession, caller_phone_hint: Option<&str>) -> String {
        let lang = session.language;
        match session.step {
            DialogueStep::Greeting => messages::greeting(lang, &self.config.restaurant.name),
            DialogueStep::AskPhone => match caller_phone_hint.and_then(normalize_phone) {
                Some(digits) => messages::offer_caller_phone(lang, &digits),
                None => messages::ask_slot(lang, SlotField::Phone),
            },
            DialogueStep::AskPeople
            | DialogueStep::AskDate
            | DialogueStep::AskTime
            | DialogueStep::AskName => match session.step.asked_slot() {
                Some(field) => messages::ask_slot(lang, field),
                None => messages::did_not_catch(lang),
            },
            DialogueStep::Confirm => match summary_of(&session.slots) {
                Some(summary) => messages::confirm_summary(lang, &summary),
                None => messages::did_not_catch(lang),
            },
            DialogueStep::AwaitPhoneForLookup => messages::cancel_ask_phone(lang),
            DialogueStep::PresentMatches => match session.cancel_matches.first() {
                Some(candidate) => {
                    messages::cancel_presented(lang, candidate.reserved_at, candidate.party_size)
                }
                None => messages::cancel_none_found(lang),
            },
            DialogueStep::AwaitCancelConfirmation => messages::cancel_confirm(lang),
            DialogueStep::Complete => messages::already_confirmed(lang),
            DialogueStep::Cancelled => messages::cancelled_done(lang),
        }
    }

    fn audit(
        &self,
        call_sid: &str,
        correlation_id: &str,
        event_type: &str,
        category: AuditCategory,
    ) -> AuditEventBuilder<'_> {
        AuditEventBuilder {
            sink: self.audit.as_ref(),
            event: AuditEvent::new(
                Some(call_sid.to_string()),
                correlation_id,
                event_type,
                category,
                AUDIT_ACTOR,
                AuditOutcome::Success,
            ),
        }
    }
}

struct AuditEventBuilder<'a> {
    sink: &'a dyn AuditSink,
    event: AuditEvent,
}

impl AuditEventBuilder<'_> {
    fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.event.outcome = outcome;
        self
    }

    fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.event = self.event.with_metadata(key, value);
        self
    }

    fn emit(self) {
        self.sink.emit(self.event);
    }
}

/// Picks the single event this utterance means to the state machine.
///
/// Intercepts come first. Within the cancellation flow the caller's words are
/// read as lookup input or yes/no answers. Everywhere else fresh slot data
/// outranks a literal yes/no, so "no, mejor a las nueve" corrects the time
/// instead of reading as a refusal.
fn derive_event(
    session: &CallSession,
    extraction: &SlotExtractionResult,
    normalized: &str,
    changed: Vec<SlotField>,
    hinted_phone: Option<String>,
) -> TurnEvent {
    let lang = session.language;
    let affirmed = keywords::is_affirmation(lang, normalized);
    let denied = keywords::is_negation(lang, normalized);

    if extraction.intent == CallIntent::Cancel && !session.step.in_cancel_flow() {
        return TurnEvent::CancelIntent;
    }
    if extraction.sentiment == Sentiment::Frustrated {
        return TurnEvent::Frustration;
    }
    if extraction.intent == CallIntent::Order {
        return TurnEvent::OrderIntent;
    }

    if session.step == DialogueStep::AwaitPhoneForLookup {
        let provided = extraction
            .slots
            .phone
            .as_ref()
            .map(|slot| slot.value.clone())
            .or(if affirmed { hinted_phone } else { None });
        if let Some(phone) = provided {
            return TurnEvent::PhoneProvided(phone);
        }
        if denied {
            return TurnEvent::Negation;
        }
        return TurnEvent::Silence;
    }
    if session.step.in_cancel_flow() {
        if affirmed {
            return TurnEvent::Affirmation;
        }
        if denied {
            return TurnEvent::Negation;
        }
        return TurnEvent::Silence;
    }

    if !changed.is_empty() {
        return TurnEvent::SlotsMerged { changed };
    }
    if affirmed {
        return TurnEvent::Affirmation;
    }
    if denied {
        return TurnEvent::Negation;
    }
    if extraction.needs_clarification {
        return TurnEvent::Confusion;
    }
    TurnEvent::Silence
}

fn summary_of(slots: &ReservationSlots) -> Option<ReservationSummary<'_>> {
    let party = slots.party_size.as_ref()?;
    let date = slots.date.as_ref()?;
    let time = slots.time.as_ref()?;
    let name = slots.customer_name.as_ref()?;
    let phone = slots.phone.as_ref()?;
    Some(ReservationSummary {
        party_size: party.value,
        date: date.value,
        time: time.value,
        customer_name: &name.value,
        phone: &phone.value,
    })
}

fn mark_all_valid(slots: &mut ReservationSlots) {
    if let Some(slot) = slots.party_size.as_mut() {
        slot.mark_valid();
    }
    if let Some(slot) = slots.date.as_mut() {
        slot.mark_valid();
    }
    if let Some(slot) = slots.time.as_mut() {
        slot.mark_valid();
    }
    if let Some(slot) = slots.customer_name.as_mut() {
        slot.mark_valid();
    }
    if let Some(slot) = slots.phone.as_mut() {
        slot.mark_valid();
    }
}

fn mark_invalid<T>(slot: &mut Option<Slot<T>>, code: &str) {
    if let Some(slot) = slot.as_mut() {
        slot.mark_invalid(code);
    }
}
