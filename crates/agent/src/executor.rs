//! Commits dialogue outcomes to the reservation store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use reserva_core::domain::reservation::{ReservationId, ReservationRecord, ReservationStatus};
use reserva_core::domain::session::{CallSession, Slot, SlotField, Speaker};
use reserva_db::repositories::{RepositoryError, ReservationRepository};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("cannot commit a reservation without a valid {0}")]
    MissingSlot(SlotField),
    #[error("no active reservation found for that phone")]
    NotFound,
    #[error("reservation store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("replacement failed after cancelling {cancelled_id}: {source}")]
    PartialModify { cancelled_id: ReservationId, source: Box<ExecutorError> },
}

impl From<RepositoryError> for ExecutorError {
    fn from(error: RepositoryError) -> Self {
        ExecutorError::StoreUnavailable(error.to_string())
    }
}

/// The one component allowed to write reservations. The dialogue engine
/// decides *that* a commit happens; this type decides *what* gets written.
pub struct ReservationExecutor {
    reservations: Arc<dyn ReservationRepository>,
}

impl ReservationExecutor {
    pub fn new(reservations: Arc<dyn ReservationRepository>) -> Self {
        Self { reservations }
    }

    /// Builds a confirmed record from the session's validated slots and
    /// stores it.
    pub async fn create(
        &self,
        session: &CallSession,
        now: DateTime<Utc>,
    ) -> Result<ReservationRecord, ExecutorError> {
        let record = build_record(session, now)?;
        self.reservations.insert(&record).await?;
        tracing::info!(
            reservation_id = %record.id,
            party_size = record.party_size,
            reserved_at = %record.reserved_at,
            "reservation committed"
        );
        Ok(record)
    }

    /// Cancels by id, guarded by the phone the booking was made with. Zero
    /// affected rows reads as not-found; whether the id exists under someone
    /// else's phone is never revealed.
    pub async fn cancel(&self, id: &ReservationId, phone: &str) -> Result<(), ExecutorError> {
        if self.reservations.cancel(id, phone).await? {
            tracing::info!(reservation_id = %id, "reservation cancelled");
            Ok(())
        } else {
            Err(ExecutorError::NotFound)
        }
    }

    /// Replaces the caller's soonest active reservation with the session's
    /// new details.
    ///
    /// Two store writes with no transaction across them. The new record is
    /// built first so slot problems surface before anything is cancelled; an
    /// insert failure after the cancel is reported as a partial modify, not
    /// rolled back.
    pub async fn modify(
        &self,
        session: &CallSession,
        now: DateTime<Utc>,
    ) -> Result<ReservationRecord, ExecutorError> {
        let record = build_record(session, now)?;
        let existing = self.reservations.find_active_by_phone(&record.phone).await?;
        let Some(current) = existing.first() else {
            return Err(ExecutorError::NotFound);
        };
        if !self.reservations.cancel(&current.id, &record.phone).await? {
            return Err(ExecutorError::NotFound);
        }
        match self.reservations.insert(&record).await {
            Ok(()) => {
                tracing::info!(
                    old_id = %current.id,
                    new_id = %record.id,
                    "reservation modified"
                );
                Ok(record)
            }
            Err(error) => Err(ExecutorError::PartialModify {
                cancelled_id: current.id.clone(),
                source: Box::new(ExecutorError::from(error)),
            }),
        }
    }
}

fn build_record(
    session: &CallSession,
    now: DateTime<Utc>,
) -> Result<ReservationRecord, ExecutorError> {
    let slots = &session.slots;
    let party_size = usable(slots.party_size.as_ref(), SlotField::PartySize)?.value;
    let date = usable(slots.date.as_ref(), SlotField::Date)?.value;
    let time = usable(slots.time.as_ref(), SlotField::Time)?.value;
    let customer_name = usable(slots.customer_name.as_ref(), SlotField::CustomerName)?.value.clone();
    let phone = usable(slots.phone.as_ref(), SlotField::Phone)?.value.clone();

    Ok(ReservationRecord {
        id: ReservationId::generate(),
        customer_name,
        phone,
        reserved_at: date.and_time(time),
        party_size,
        status: ReservationStatus::Confirmed,
        notes: None,
        transcript: transcript(session),
        created_at: now,
    })
}

fn usable<T>(slot: Option<&Slot<T>>, field: SlotField) -> Result<&Slot<T>, ExecutorError> {
    match slot {
        Some(slot) if !slot.is_invalid() => Ok(slot),
        _ => Err(ExecutorError::MissingSlot(field)),
    }
}

/// Full conversation transcript, stored with the booking for later review.
fn transcript(session: &CallSession) -> Option<String> {
    if session.history.is_empty() {
        return None;
    }
    let lines: Vec<String> = session
        .history
        .iter()
        .map(|entry| {
            let who = match entry.speaker {
                Speaker::Caller => "caller",
                Speaker::Agent => "agent",
            };
            format!("{who}: {}", entry.text)
        })
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use reserva_core::domain::session::Credibility;
    use reserva_core::languages::Language;
    use reserva_db::repositories::InMemoryReservationRepository;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    fn booked_session() -> CallSession {
        let mut session = CallSession::fresh("CA300", Language::Es, Some("+34 600 111 222"), now());
        session.slots.party_size = Some(Slot::new(4, Credibility::High));
        session.slots.date =
            Some(Slot::new(NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(), Credibility::High));
        session.slots.time =
            Some(Slot::new(NaiveTime::from_hms_opt(21, 0, 0).unwrap(), Credibility::High));
        session.slots.customer_name = Some(Slot::new("Ana García".to_string(), Credibility::High));
        session.record_caller("mesa para cuatro", now());
        session.record_agent("¿A qué hora?", now());
        session
    }

    fn executor_with_store() -> (ReservationExecutor, Arc<InMemoryReservationRepository>) {
        let store = Arc::new(InMemoryReservationRepository::default());
        (ReservationExecutor::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_commits_the_record() {
        let (executor, store) = executor_with_store();
        let session = booked_session();

        let record = executor.create(&session, now()).await.unwrap();

        assert_eq!(record.party_size, 4);
        assert_eq!(record.phone, "34600111222");
        assert_eq!(record.customer_name, "Ana García");
        assert_eq!(record.status, ReservationStatus::Confirmed);
        assert_eq!(
            record.reserved_at,
            NaiveDate::from_ymd_opt(2025, 6, 12).unwrap().and_hms_opt(21, 0, 0).unwrap()
        );
        let transcript = record.transcript.as_deref().unwrap();
        assert!(transcript.contains("caller: mesa para cuatro"));
        assert!(transcript.contains("agent: ¿A qué hora?"));

        let stored = store.find_active_by_phone("34600111222").await.unwrap();
        assert_eq!(stored, vec![record]);
    }

    #[tokio::test]
    async fn create_requires_every_slot() {
        let (executor, _) = executor_with_store();
        let mut session = booked_session();
        session.slots.customer_name = None;

        let error = executor.create(&session, now()).await.unwrap_err();
        assert!(matches!(error, ExecutorError::MissingSlot(SlotField::CustomerName)));
    }

    #[tokio::test]
    async fn create_rejects_slots_that_failed_validation() {
        let (executor, _) = executor_with_store();
        let mut session = booked_session();
        if let Some(slot) = session.slots.party_size.as_mut() {
            slot.mark_invalid("max_exceeded");
        }

        let error = executor.create(&session, now()).await.unwrap_err();
        assert!(matches!(error, ExecutorError::MissingSlot(SlotField::PartySize)));
    }

    #[tokio::test]
    async fn cancel_maps_zero_rows_to_not_found() {
        let (executor, store) = executor_with_store();
        let session = booked_session();
        let record = executor.create(&session, now()).await.unwrap();

        let missing = ReservationId("no-such-id".to_string());
        assert!(matches!(
            executor.cancel(&missing, &record.phone).await,
            Err(ExecutorError::NotFound)
        ));
        // wrong phone is indistinguishable from a missing booking
        assert!(matches!(
            executor.cancel(&record.id, "999999999").await,
            Err(ExecutorError::NotFound)
        ));

        executor.cancel(&record.id, &record.phone).await.unwrap();
        assert!(store.find_active_by_phone(&record.phone).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn modify_replaces_the_soonest_booking() {
        let (executor, store) = executor_with_store();
        let session = booked_session();
        let original = executor.create(&session, now()).await.unwrap();

        let mut updated = session.clone();
        updated.slots.time =
            Some(Slot::new(NaiveTime::from_hms_opt(13, 30, 0).unwrap(), Credibility::High));

        let replacement = executor.modify(&updated, now()).await.unwrap();

        let active = store.find_active_by_phone(&original.phone).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, replacement.id);
        assert_eq!(
            active[0].reserved_at,
            NaiveDate::from_ymd_opt(2025, 6, 12).unwrap().and_hms_opt(13, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn modify_without_an_existing_booking_is_not_found() {
        let (executor, _) = executor_with_store();
        let session = booked_session();

        let error = executor.modify(&session, now()).await.unwrap_err();
        assert!(matches!(error, ExecutorError::NotFound));
    }
}
