use chrono::{DateTime, Utc};
use sqlx::Row;

use reserva_core::dialogue::DialogueStep;
use reserva_core::domain::session::{CallIntent, CallSession, CancelCandidate, HistoryEntry, ReservationSlots};
use reserva_core::languages::Language;

use super::{CallSessionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCallSessionRepository {
    pool: DbPool,
}

impl SqlCallSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T, E: std::fmt::Display>(result: Result<T, E>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    decode(DateTime::parse_from_rfc3339(raw)).map(|dt| dt.with_timezone(&Utc))
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<CallSession, RepositoryError> {
    let call_sid: String = row.try_get("call_sid")?;
    let step_str: String = row.try_get("step")?;
    let language_str: String = row.try_get("language")?;
    let intent_str: String = row.try_get("intent")?;
    let slots_json: String = row.try_get("slots")?;
    let history_json: String = row.try_get("history")?;
    let retry_count: i64 = row.try_get("retry_count")?;
    let cancel_matches_json: String = row.try_get("cancel_matches")?;
    let created_at_str: String = row.try_get("created_at")?;
    let updated_at_str: String = row.try_get("updated_at")?;

    let step: DialogueStep = decode(step_str.parse())?;
    let language: Language = decode(language_str.parse())?;
    let intent: CallIntent = decode(intent_str.parse())?;
    let slots: ReservationSlots = decode(serde_json::from_str(&slots_json))?;
    let history: Vec<HistoryEntry> = decode(serde_json::from_str(&history_json))?;
    let cancel_matches: Vec<CancelCandidate> = decode(serde_json::from_str(&cancel_matches_json))?;
    let retry_count: u8 = decode(u8::try_from(retry_count))?;

    Ok(CallSession {
        call_sid,
        step,
        language,
        intent,
        slots,
        history,
        retry_count,
        cancel_matches,
        created_at: parse_timestamp(&created_at_str)?,
        updated_at: parse_timestamp(&updated_at_str)?,
    })
}

#[async_trait::async_trait]
impl CallSessionRepository for SqlCallSessionRepository {
    async fn find_by_call_sid(
        &self,
        call_sid: &str,
    ) -> Result<Option<CallSession>, RepositoryError> {
        let row = sqlx::query(
            "SELECT call_sid, step, language, intent, slots, history, retry_count,
                    cancel_matches, created_at, updated_at
             FROM call_session WHERE call_sid = ?",
        )
        .bind(call_sid)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_session(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, session: &CallSession) -> Result<(), RepositoryError> {
        let slots_json = decode(serde_json::to_string(&session.slots))?;
        let history_json = decode(serde_json::to_string(&session.history))?;
        let cancel_matches_json = decode(serde_json::to_string(&session.cancel_matches))?;

        sqlx::query(
            "INSERT INTO call_session (call_sid, step, language, intent, slots, history,
                                       retry_count, cancel_matches, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(call_sid) DO UPDATE SET
                 step = excluded.step,
                 language = excluded.language,
                 intent = excluded.intent,
                 slots = excluded.slots,
                 history = excluded.history,
                 retry_count = excluded.retry_count,
                 cancel_matches = excluded.cancel_matches,
                 updated_at = excluded.updated_at",
        )
        .bind(&session.call_sid)
        .bind(session.step.as_str())
        .bind(session.language.as_str())
        .bind(session.intent.as_str())
        .bind(&slots_json)
        .bind(&history_json)
        .bind(i64::from(session.retry_count))
        .bind(&cancel_matches_json)
        .bind(session.created_at.to_rfc3339())
        .bind(session.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, call_sid: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM call_session WHERE call_sid = ?")
            .bind(call_sid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use reserva_core::dialogue::DialogueStep;
    use reserva_core::domain::session::{CallSession, Credibility, Slot};
    use reserva_core::languages::Language;

    use super::SqlCallSessionRepository;
    use crate::repositories::CallSessionRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn sample_session(call_sid: &str) -> CallSession {
        let mut session = CallSession::fresh(call_sid, Language::Es, Some("+34600111222"), Utc::now());
        session.slots.party_size = Some(Slot::new(4, Credibility::High));
        session.record_caller("quiero reservar para cuatro", Utc::now());
        session.record_agent("¿Para qué fecha desea la reserva?", Utc::now());
        session
    }

    #[tokio::test]
    async fn upsert_and_find_round_trip() {
        let pool = setup().await;
        let repo = SqlCallSessionRepository::new(pool);

        let session = sample_session("CA-001");
        repo.upsert(&session).await.expect("insert");

        let found = repo.find_by_call_sid("CA-001").await.expect("find").expect("should exist");
        assert_eq!(found, session);
    }

    #[tokio::test]
    async fn upsert_replaces_state_for_same_call() {
        let pool = setup().await;
        let repo = SqlCallSessionRepository::new(pool);

        let mut session = sample_session("CA-002");
        repo.upsert(&session).await.expect("insert");

        session.step = DialogueStep::AskDate;
        session.retry_count = 2;
        session.touch(Utc::now());
        repo.upsert(&session).await.expect("upsert");

        let found = repo.find_by_call_sid("CA-002").await.expect("find").expect("should exist");
        assert_eq!(found.step, DialogueStep::AskDate);
        assert_eq!(found.retry_count, 2);
        assert_eq!(found.created_at, session.created_at);
    }

    #[tokio::test]
    async fn delete_removes_the_session() {
        let pool = setup().await;
        let repo = SqlCallSessionRepository::new(pool);

        repo.upsert(&sample_session("CA-003")).await.expect("insert");
        repo.delete("CA-003").await.expect("delete");

        let found = repo.find_by_call_sid("CA-003").await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn missing_session_is_none() {
        let pool = setup().await;
        let repo = SqlCallSessionRepository::new(pool);
        assert!(repo.find_by_call_sid("CA-404").await.expect("find").is_none());
    }
}
