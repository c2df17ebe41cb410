use std::collections::HashMap;

use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use reserva_core::domain::reservation::{ReservationId, ReservationRecord, ReservationStatus};
use reserva_core::domain::session::CallSession;
use reserva_core::policy::{OccupancyError, OccupancyLookup};

use super::{CallSessionRepository, RepositoryError, ReservationRepository};

#[derive(Default)]
pub struct InMemoryCallSessionRepository {
    sessions: RwLock<HashMap<String, CallSession>>,
}

#[async_trait::async_trait]
impl CallSessionRepository for InMemoryCallSessionRepository {
    async fn find_by_call_sid(
        &self,
        call_sid: &str,
    ) -> Result<Option<CallSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(call_sid).cloned())
    }

    async fn upsert(&self, session: &CallSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.call_sid.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, call_sid: &str) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(call_sid);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: RwLock<Vec<ReservationRecord>>,
}

#[async_trait::async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert(&self, record: &ReservationRecord) -> Result<(), RepositoryError> {
        let mut reservations = self.reservations.write().await;
        reservations.push(record.clone());
        Ok(())
    }

    async fn find_active_by_phone(
        &self,
        phone: &str,
    ) -> Result<Vec<ReservationRecord>, RepositoryError> {
        let reservations = self.reservations.read().await;
        let mut found: Vec<ReservationRecord> = reservations
            .iter()
            .filter(|r| r.phone == phone && r.status.is_active())
            .cloned()
            .collect();
        found.sort_by_key(|r| r.reserved_at);
        Ok(found)
    }

    async fn cancel(&self, id: &ReservationId, phone: &str) -> Result<bool, RepositoryError> {
        let mut reservations = self.reservations.write().await;
        for record in reservations.iter_mut() {
            if record.id == *id && record.phone == phone && record.status.is_active() {
                record.status = ReservationStatus::Cancelled;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait::async_trait]
impl OccupancyLookup for InMemoryReservationRepository {
    async fn occupancy_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<u32, OccupancyError> {
        let reservations = self.reservations.read().await;
        Ok(reservations
            .iter()
            .filter(|r| r.status.is_active() && r.reserved_at >= from && r.reserved_at <= to)
            .map(|r| r.party_size)
            .sum())
    }
}
