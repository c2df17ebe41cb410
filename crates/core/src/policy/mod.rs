//! Restaurant booking rules.
//!
//! Validation is evaluated against the session's slot set every time slots
//! change, before the dialogue advances. The occupancy check degrades open:
//! when the reservation store cannot be queried the verdict passes with a
//! note, because losing a booking to a transient outage costs the restaurant
//! more than a rare over-booking.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::config::RestaurantConfig;
use crate::domain::session::{ReservationSlots, SlotField};

/// Offsets tried (in minutes) when proposing alternative times.
pub const ALTERNATIVE_OFFSETS_MINUTES: [i64; 5] = [-60, -30, 30, 60, 120];

/// At most this many alternatives are spoken to the caller.
pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Error)]
#[error("occupancy lookup failed: {0}")]
pub struct OccupancyError(pub String);

/// Seats already committed around a moment in time.
#[async_trait]
pub trait OccupancyLookup: Send + Sync {
    /// Sum of party sizes of active reservations within `[from, to]`.
    async fn occupancy_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<u32, OccupancyError>;
}

/// Stable rejection codes, also used as slot error markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyCode {
    MaxExceeded,
    MinNotMet,
    FueraHorario,
    AdvanceNoticeInsufficient,
    CapacityExceeded,
}

impl PolicyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyCode::MaxExceeded => "max_exceeded",
            PolicyCode::MinNotMet => "min_not_met",
            PolicyCode::FueraHorario => "fuera_horario",
            PolicyCode::AdvanceNoticeInsufficient => "advance_notice_insufficient",
            PolicyCode::CapacityExceeded => "capacity_exceeded",
        }
    }
}

/// One broken rule, tied to the slot that must be re-asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyViolation {
    pub field: SlotField,
    pub code: PolicyCode,
}

/// Result of validating the current slot set.
#[derive(Debug, Clone, Default)]
pub struct PolicyVerdict {
    pub ok: bool,
    pub violations: Vec<PolicyViolation>,
    pub alternatives: Vec<NaiveDateTime>,
    /// Set when the occupancy check could not run and the verdict passed
    /// without it.
    pub degraded: Option<String>,
}

impl PolicyVerdict {
    fn pass() -> Self {
        Self { ok: true, ..Default::default() }
    }
}

/// Validates slots against party, schedule and capacity rules.
#[derive(Debug, Clone)]
pub struct ReservationPolicy {
    config: RestaurantConfig,
}

impl ReservationPolicy {
    pub fn new(config: RestaurantConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RestaurantConfig {
        &self.config
    }

    /// Checks every rule that the currently known slots allow.
    ///
    /// Rules fire independently per slot, but the capacity check only runs
    /// once party, date and time are all present and individually valid;
    /// counting seats for a slot that is already rejected would waste a
    /// store query.
    pub async fn validate(
        &self,
        slots: &ReservationSlots,
        occupancy: &dyn OccupancyLookup,
        now: DateTime<Utc>,
    ) -> PolicyVerdict {
        let mut verdict = PolicyVerdict::pass();

        let party = slots.party_size.as_ref().map(|s| s.value);
        if let Some(size) = party {
            if size > self.config.max_party_size {
                verdict.violations.push(PolicyViolation {
                    field: SlotField::PartySize,
                    code: PolicyCode::MaxExceeded,
                });
            } else if size < self.config.min_party_size {
                verdict.violations.push(PolicyViolation {
                    field: SlotField::PartySize,
                    code: PolicyCode::MinNotMet,
                });
            }
        }

        if let Some(time) = slots.time.as_ref().map(|s| s.value) {
            if !self.within_service_window(time) {
                verdict.violations.push(PolicyViolation {
                    field: SlotField::Time,
                    code: PolicyCode::FueraHorario,
                });
            }
        }

        let mut schedule_ok = true;
        if let Some(reserved_at) = slots.reserved_at() {
            if verdict.violations.iter().any(|v| v.field == SlotField::Time) {
                schedule_ok = false;
            } else if !self.meets_advance_notice(reserved_at, now) {
                verdict.violations.push(PolicyViolation {
                    field: SlotField::Time,
                    code: PolicyCode::AdvanceNoticeInsufficient,
                });
                schedule_ok = false;
            }
        } else {
            schedule_ok = false;
        }

        let party_ok = party.is_some() && !verdict
            .violations
            .iter()
            .any(|v| v.field == SlotField::PartySize);
        if party_ok && schedule_ok {
            if let (Some(size), Some(reserved_at)) = (party, slots.reserved_at()) {
                match self.fits_capacity(size, reserved_at, occupancy).await {
                    Ok(true) => {}
                    Ok(false) => {
                        verdict.violations.push(PolicyViolation {
                            field: SlotField::Time,
                            code: PolicyCode::CapacityExceeded,
                        });
                        verdict.alternatives =
                            self.alternative_slots(size, reserved_at, occupancy, now).await;
                    }
                    Err(err) => {
                        verdict.degraded = Some(err.to_string());
                    }
                }
            }
        }

        verdict.ok = verdict.violations.is_empty();
        if verdict.ok {
            verdict.alternatives.clear();
        }
        verdict
    }

    /// Service windows are half-open: a table at closing time is rejected.
    pub fn within_service_window(&self, time: NaiveTime) -> bool {
        self.config
            .service_windows
            .iter()
            .any(|window| window.opens <= time && time < window.closes)
    }

    fn meets_advance_notice(&self, reserved_at: NaiveDateTime, now: DateTime<Utc>) -> bool {
        let earliest = now.naive_utc() + Duration::hours(i64::from(self.config.min_advance_hours));
        reserved_at >= earliest
    }

    /// Seats available after subtracting the safety buffer.
    pub fn effective_capacity(&self) -> u32 {
        let buffer = self.config.max_capacity * self.config.capacity_buffer_percent / 100;
        self.config.max_capacity.saturating_sub(buffer)
    }

    /// Overlap window around a start time: any reservation whose own span
    /// could intersect ours counts against capacity.
    fn occupancy_window(&self, reserved_at: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let span = Duration::minutes(i64::from(
            self.config.overlap_window_minutes + self.config.reservation_duration_minutes,
        ));
        (reserved_at - span, reserved_at + span)
    }

    async fn fits_capacity(
        &self,
        party: u32,
        reserved_at: NaiveDateTime,
        occupancy: &dyn OccupancyLookup,
    ) -> Result<bool, OccupancyError> {
        let (from, to) = self.occupancy_window(reserved_at);
        let seated = occupancy.occupancy_between(from, to).await?;
        Ok(seated + party <= self.effective_capacity())
    }

    /// Nearby times that pass both the schedule and capacity checks.
    ///
    /// Offsets are tried in fixed order; a failing occupancy lookup does not
    /// disqualify a slot here, consistent with the fail-open verdict.
    pub async fn alternative_slots(
        &self,
        party: u32,
        reserved_at: NaiveDateTime,
        occupancy: &dyn OccupancyLookup,
        now: DateTime<Utc>,
    ) -> Vec<NaiveDateTime> {
        let mut found = Vec::new();
        for offset in ALTERNATIVE_OFFSETS_MINUTES {
            if found.len() >= MAX_ALTERNATIVES {
                break;
            }
            let candidate = reserved_at + Duration::minutes(offset);
            if !self.within_service_window(candidate.time()) {
                continue;
            }
            if !self.meets_advance_notice(candidate, now) {
                continue;
            }
            match self.fits_capacity(party, candidate, occupancy).await {
                Ok(true) | Err(_) => found.push(candidate),
                Ok(false) => {}
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceWindow;
    use crate::domain::session::{Credibility, Slot};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedOccupancy(u32);

    #[async_trait]
    impl OccupancyLookup for FixedOccupancy {
        async fn occupancy_between(
            &self,
            _from: NaiveDateTime,
            _to: NaiveDateTime,
        ) -> Result<u32, OccupancyError> {
            Ok(self.0)
        }
    }

    struct FailingOccupancy;

    #[async_trait]
    impl OccupancyLookup for FailingOccupancy {
        async fn occupancy_between(
            &self,
            _from: NaiveDateTime,
            _to: NaiveDateTime,
        ) -> Result<u32, OccupancyError> {
            Err(OccupancyError("database is locked".into()))
        }
    }

    struct CountingOccupancy {
        calls: AtomicU32,
    }

    #[async_trait]
    impl OccupancyLookup for CountingOccupancy {
        async fn occupancy_between(
            &self,
            _from: NaiveDateTime,
            _to: NaiveDateTime,
        ) -> Result<u32, OccupancyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    fn config() -> RestaurantConfig {
        RestaurantConfig {
            name: "La Plaza".into(),
            default_language: crate::languages::Language::Es,
            min_party_size: 1,
            max_party_size: 20,
            max_capacity: 100,
            capacity_buffer_percent: 10,
            reservation_duration_minutes: 120,
            overlap_window_minutes: 30,
            min_advance_hours: 2,
            service_windows: vec![
                ServiceWindow {
                    label: "lunch".into(),
                    opens: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
                    closes: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
                },
                ServiceWindow {
                    label: "dinner".into(),
                    opens: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                    closes: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                },
            ],
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-08-25T10:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn slots(party: u32, hour: u32) -> ReservationSlots {
        ReservationSlots {
            party_size: Some(Slot::new(party, Credibility::High)),
            date: Some(Slot::new(
                NaiveDate::from_ymd_opt(2026, 8, 26).unwrap(),
                Credibility::High,
            )),
            time: Some(Slot::new(
                NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                Credibility::High,
            )),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn well_formed_request_passes() {
        let policy = ReservationPolicy::new(config());
        let verdict = policy.validate(&slots(4, 20), &FixedOccupancy(0), now()).await;
        assert!(verdict.ok);
        assert!(verdict.violations.is_empty());
        assert!(verdict.degraded.is_none());
    }

    #[tokio::test]
    async fn oversized_party_is_rejected() {
        let policy = ReservationPolicy::new(config());
        let verdict = policy.validate(&slots(25, 20), &FixedOccupancy(0), now()).await;
        assert!(!verdict.ok);
        assert_eq!(verdict.violations[0].field, SlotField::PartySize);
        assert_eq!(verdict.violations[0].code, PolicyCode::MaxExceeded);
    }

    #[tokio::test]
    async fn party_below_minimum_is_rejected() {
        let policy = ReservationPolicy::new(config());
        let verdict = policy.validate(&slots(0, 20), &FixedOccupancy(0), now()).await;
        assert_eq!(verdict.violations[0].code, PolicyCode::MinNotMet);
    }

    #[tokio::test]
    async fn time_between_services_is_fuera_horario() {
        let policy = ReservationPolicy::new(config());
        let verdict = policy.validate(&slots(4, 16), &FixedOccupancy(0), now()).await;
        assert!(!verdict.ok);
        assert_eq!(verdict.violations[0].field, SlotField::Time);
        assert_eq!(verdict.violations[0].code, PolicyCode::FueraHorario);
    }

    #[tokio::test]
    async fn closing_time_itself_is_outside_the_window() {
        let policy = ReservationPolicy::new(config());
        assert!(policy.within_service_window(NaiveTime::from_hms_opt(19, 0, 0).unwrap()));
        assert!(policy.within_service_window(NaiveTime::from_hms_opt(22, 59, 0).unwrap()));
        assert!(!policy.within_service_window(NaiveTime::from_hms_opt(23, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn too_little_notice_is_rejected() {
        let policy = ReservationPolicy::new(config());
        let mut request = slots(4, 13);
        request.date = Some(Slot::new(
            NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(),
            Credibility::High,
        ));
        // 13:00 today with "now" at 11:30 leaves 90 minutes, under the 2h floor.
        let late_now =
            DateTime::parse_from_rfc3339("2026-08-25T11:30:00Z").unwrap().with_timezone(&Utc);
        let verdict = policy.validate(&request, &FixedOccupancy(0), late_now).await;
        assert_eq!(verdict.violations[0].code, PolicyCode::AdvanceNoticeInsufficient);
    }

    #[tokio::test]
    async fn capacity_counts_the_buffer() {
        let policy = ReservationPolicy::new(config());
        assert_eq!(policy.effective_capacity(), 90);
        // 87 seated + 4 asked = 91 > 90.
        let verdict = policy.validate(&slots(4, 20), &FixedOccupancy(87), now()).await;
        assert!(!verdict.ok);
        assert!(verdict.violations.iter().any(|v| v.code == PolicyCode::CapacityExceeded));
        // 86 seated + 4 asked = 90, exactly at the limit.
        let verdict = policy.validate(&slots(4, 20), &FixedOccupancy(86), now()).await;
        assert!(verdict.ok);
    }

    #[tokio::test]
    async fn occupancy_outage_fails_open() {
        let policy = ReservationPolicy::new(config());
        let verdict = policy.validate(&slots(4, 20), &FailingOccupancy, now()).await;
        assert!(verdict.ok);
        assert!(verdict.degraded.is_some());
    }

    #[tokio::test]
    async fn capacity_is_not_checked_when_another_rule_already_failed() {
        let policy = ReservationPolicy::new(config());
        let counter = CountingOccupancy { calls: AtomicU32::new(0) };
        let _ = policy.validate(&slots(25, 20), &counter, now()).await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn full_house_offers_nearby_alternatives() {
        let policy = ReservationPolicy::new(config());
        let reserved_at = NaiveDate::from_ymd_opt(2026, 8, 26)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(22, 0, 0).unwrap());
        let alts = policy.alternative_slots(4, reserved_at, &FixedOccupancy(0), now()).await;
        // +60 (23:00) and +120 fall outside the dinner window.
        assert_eq!(
            alts.iter().map(|dt| dt.time().format("%H:%M").to_string()).collect::<Vec<_>>(),
            vec!["21:00", "21:30", "22:30"]
        );
    }

    #[tokio::test]
    async fn alternatives_cap_at_three() {
        let policy = ReservationPolicy::new(config());
        let reserved_at = NaiveDate::from_ymd_opt(2026, 8, 26)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(20, 30, 0).unwrap());
        let alts = policy.alternative_slots(4, reserved_at, &FixedOccupancy(0), now()).await;
        assert_eq!(alts.len(), MAX_ALTERNATIVES);
    }
}
