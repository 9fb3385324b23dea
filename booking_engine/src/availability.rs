// booking_engine/src/availability.rs
//! Read side of the calendar: which declared slots are still open on a
//! given date. The ledger re-checks everything at booking time, so this
//! view is advisory and can go stale the moment it is returned.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

use models::errors::BookingResult;
use models::schedule::DayOfWeek;
use models::{Provider, ProviderId};

use crate::ledger::AppointmentLedger;
use crate::registry::ProviderRegistry;

/// Declared slots minus the ones held by live appointments.
/// Unverified providers expose no slots at all.
pub(crate) fn open_slots(
    provider: &Provider,
    date: NaiveDate,
    held: &BTreeSet<NaiveTime>,
) -> Vec<NaiveTime> {
    if !provider.is_verified() {
        return Vec::new();
    }
    let day = DayOfWeek::from_date(date);
    provider
        .weekly_schedule
        .slots_for(day)
        .filter(|slot| !held.contains(slot))
        .collect()
}

pub struct AvailabilityEngine {
    registry: Arc<ProviderRegistry>,
    ledger: Arc<AppointmentLedger>,
}

impl AvailabilityEngine {
    pub fn new(registry: Arc<ProviderRegistry>, ledger: Arc<AppointmentLedger>) -> Self {
        AvailabilityEngine { registry, ledger }
    }

    /// Slots of `provider` still bookable on `date`, ascending.
    pub async fn bookable_slots(
        &self,
        provider_id: &ProviderId,
        date: NaiveDate,
    ) -> BookingResult<Vec<NaiveTime>> {
        let provider = self.registry.get(provider_id).await?;
        let held = self.ledger.active_slots(provider_id, date).await;
        Ok(open_slots(&provider, date, &held))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Actor, PatientId, ServiceMode};
    use std::str::FromStr;
    use storage::MemoryStore;

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 4).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    async fn engine() -> (Arc<AppointmentLedger>, AvailabilityEngine) {
        let store = Arc::new(MemoryStore::new());
        let registry = ProviderRegistry::open(store.clone(), "test", true)
            .await
            .unwrap();
        let ledger = AppointmentLedger::open(store, "test", registry.clone())
            .await
            .unwrap();
        (ledger.clone(), AvailabilityEngine::new(registry, ledger))
    }

    #[tokio::test]
    async fn should_list_all_declared_slots_when_nothing_is_booked() {
        let (_, availability) = engine().await;
        let id = ProviderId::from_str("md-cortes").unwrap();
        let slots = availability.bookable_slots(&id, friday()).await.unwrap();
        assert_eq!(slots, vec![at(9, 0), at(9, 45), at(11, 30), at(16, 15)]);
    }

    #[tokio::test]
    async fn should_hide_booked_slots_and_restore_them_after_cancellation() {
        let (ledger, availability) = engine().await;
        let id = ProviderId::from_str("md-cortes").unwrap();
        let appt = ledger
            .book(
                id.clone(),
                PatientId::from_str("pat-1").unwrap(),
                friday(),
                at(9, 45),
                ServiceMode::InPerson,
            )
            .await
            .unwrap();

        let slots = availability.bookable_slots(&id, friday()).await.unwrap();
        assert_eq!(slots, vec![at(9, 0), at(11, 30), at(16, 15)]);

        ledger.cancel(appt.id, Actor::Patient).await.unwrap();
        let slots = availability.bookable_slots(&id, friday()).await.unwrap();
        assert_eq!(slots.len(), 4);
    }

    #[tokio::test]
    async fn should_return_nothing_for_days_off_the_calendar() {
        let (_, availability) = engine().await;
        let id = ProviderId::from_str("md-cortes").unwrap();
        // 2026-09-06 is a Sunday; the demo calendar covers weekdays only.
        let sunday = NaiveDate::from_ymd_opt(2026, 9, 6).unwrap();
        let slots = availability.bookable_slots(&id, sunday).await.unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn should_expose_no_slots_for_unverified_providers() {
        let mut fixtures = crate::seed::demo_providers();
        let mut provider = fixtures.remove(0);
        provider.verification_status = models::VerificationStatus::Pending;
        assert!(open_slots(&provider, friday(), &BTreeSet::new()).is_empty());
    }

    #[tokio::test]
    async fn should_expose_saturday_home_visits() {
        let (_, availability) = engine().await;
        let id = ProviderId::from_str("md-salvatierra").unwrap();
        let saturday = NaiveDate::from_ymd_opt(2026, 9, 5).unwrap();
        let slots = availability.bookable_slots(&id, saturday).await.unwrap();
        assert_eq!(slots, vec![at(8, 15), at(13, 30)]);
    }
}
