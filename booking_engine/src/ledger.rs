// booking_engine/src/ledger.rs
//! Appointment ledger. Owns every appointment record, enforces the
//! lifecycle state machine and the one-holder-per-slot rule.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as TokioMutex, RwLock};

use models::errors::{BookingError, BookingResult, SlotDenial, ValidationError};
use models::schedule::DayOfWeek;
use models::{Actor, Appointment, AppointmentId, AppointmentStatus, PatientId, ProviderId, ServiceMode};
use storage::KeyValueStore;

use crate::registry::ProviderRegistry;

#[derive(Debug, Serialize, Deserialize)]
struct LedgerState {
    appointments: BTreeMap<AppointmentId, Appointment>,
    next_id: u64,
}

impl LedgerState {
    fn issue_id(&mut self) -> AppointmentId {
        let id = AppointmentId::new(self.next_id);
        self.next_id += 1;
        id
    }
}

pub struct AppointmentLedger {
    state: RwLock<LedgerState>,
    /// One gate per (provider, date). Booking claims the gate before it
    /// validates and inserts, so two requests for the same slot can
    /// never both pass the uniqueness check.
    slot_gates: TokioMutex<HashMap<(ProviderId, NaiveDate), Arc<TokioMutex<()>>>>,
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn KeyValueStore>,
    checkpoint_key: String,
}

impl AppointmentLedger {
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        namespace: &str,
        registry: Arc<ProviderRegistry>,
    ) -> BookingResult<Arc<Self>> {
        let checkpoint_key = format!("{}/appointments", namespace);
        let state: LedgerState = match store.get(&checkpoint_key).await? {
            Some(value) => {
                let restored: LedgerState = serde_json::from_value(value)?;
                info!(
                    "appointment ledger restored {} appointments (next id {})",
                    restored.appointments.len(),
                    restored.next_id
                );
                restored
            }
            None => {
                info!("appointment ledger starting empty");
                LedgerState {
                    appointments: BTreeMap::new(),
                    next_id: 1,
                }
            }
        };

        Ok(Arc::new(AppointmentLedger {
            state: RwLock::new(state),
            slot_gates: TokioMutex::new(HashMap::new()),
            registry,
            store,
            checkpoint_key,
        }))
    }

    async fn checkpoint(&self, state: &LedgerState) {
        let value = match serde_json::to_value(state) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to serialize appointment ledger: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.checkpoint_key, value).await {
            error!("failed to checkpoint appointment ledger: {}", e);
        }
    }

    async fn slot_gate(&self, provider: &ProviderId, date: NaiveDate) -> Arc<TokioMutex<()>> {
        let mut gates = self.slot_gates.lock().await;
        gates
            .entry((provider.clone(), date))
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    /// Books a slot for a patient. Runs entirely inside the
    /// (provider, date) critical section: provider lookup, verification
    /// and calendar checks, and the uniqueness check against live
    /// appointments all happen under the same gate.
    pub async fn book(
        &self,
        provider_id: ProviderId,
        patient_id: PatientId,
        date: NaiveDate,
        slot: NaiveTime,
        service_mode: ServiceMode,
    ) -> BookingResult<Appointment> {
        let gate = self.slot_gate(&provider_id, date).await;
        let _claimed = gate.lock().await;

        let provider = self.registry.get(&provider_id).await?;
        if !provider.is_verified() {
            return Err(BookingError::SlotUnavailable {
                provider: provider_id,
                date,
                slot,
                reason: SlotDenial::UnverifiedProvider,
            });
        }
        let day = DayOfWeek::from_date(date);
        if !provider.weekly_schedule.is_declared(day, slot) {
            return Err(BookingError::SlotUnavailable {
                provider: provider_id,
                date,
                slot,
                reason: SlotDenial::NotDeclared,
            });
        }
        if !provider.service_modes.contains(&service_mode) {
            return Err(BookingError::Validation(
                ValidationError::UnsupportedServiceMode(service_mode.to_string()),
            ));
        }

        let mut state = self.state.write().await;
        let taken = state.appointments.values().any(|a| {
            a.provider_id == provider_id && a.date == date && a.slot == slot && a.holds_slot()
        });
        if taken {
            return Err(BookingError::SlotUnavailable {
                provider: provider_id,
                date,
                slot,
                reason: SlotDenial::AlreadyHeld,
            });
        }

        let id = state.issue_id();
        let appointment = Appointment::new(
            id,
            provider_id,
            patient_id,
            date,
            slot,
            service_mode,
            provider.price,
            Utc::now(),
        );
        state.appointments.insert(id, appointment.clone());
        self.checkpoint(&state).await;
        info!(
            "booked {} with {} on {} at {} for {}",
            id, appointment.provider_id, date, slot, appointment.price
        );
        Ok(appointment)
    }

    pub async fn get(&self, id: AppointmentId) -> BookingResult<Appointment> {
        let state = self.state.read().await;
        state
            .appointments
            .get(&id)
            .cloned()
            .ok_or(BookingError::AppointmentNotFound(id))
    }

    /// Shared body of the simple lifecycle moves: check the operation's
    /// allowed source states, record the transition, checkpoint.
    async fn apply_transition(
        &self,
        id: AppointmentId,
        operation: &str,
        allowed: &[AppointmentStatus],
        next: AppointmentStatus,
        actor: Option<Actor>,
    ) -> BookingResult<Appointment> {
        let mut state = self.state.write().await;
        let appointment = state
            .appointments
            .get_mut(&id)
            .ok_or(BookingError::AppointmentNotFound(id))?;
        if !allowed.contains(&appointment.status) {
            return Err(BookingError::InvalidTransition {
                from: appointment.status.to_string(),
                operation: operation.to_string(),
            });
        }
        appointment.record_transition(next, actor, Utc::now());
        let snapshot = appointment.clone();
        self.checkpoint(&state).await;
        info!("appointment {} moved to {} ({})", id, next, operation);
        Ok(snapshot)
    }

    /// Manual booking flow: staff took the request offline and the
    /// patient now has to accept the proposed slot.
    pub async fn mark_pending_acceptance(&self, id: AppointmentId) -> BookingResult<Appointment> {
        self.apply_transition(
            id,
            "mark pending acceptance",
            &[AppointmentStatus::PendingPayment],
            AppointmentStatus::PendingAcceptance,
            Some(Actor::Provider),
        )
        .await
    }

    /// Patient accepts a proposed or rescheduled appointment.
    pub async fn accept(&self, id: AppointmentId) -> BookingResult<Appointment> {
        self.apply_transition(
            id,
            "accept",
            &[AppointmentStatus::PendingAcceptance],
            AppointmentStatus::Confirmed,
            Some(Actor::Patient),
        )
        .await
    }

    /// Settlement finished. Only a payment still pending can confirm
    /// this way; a cancellation that slipped in first wins.
    pub async fn confirm_payment(&self, id: AppointmentId) -> BookingResult<Appointment> {
        self.apply_transition(
            id,
            "confirm payment",
            &[AppointmentStatus::PendingPayment],
            AppointmentStatus::Confirmed,
            None,
        )
        .await
    }

    /// Provider asks the patient to move. Allowed out of `Confirmed`
    /// and re-allowed while a previous request is still unanswered.
    pub async fn request_reschedule(
        &self,
        id: AppointmentId,
        note: &str,
    ) -> BookingResult<Appointment> {
        let mut state = self.state.write().await;
        let appointment = state
            .appointments
            .get_mut(&id)
            .ok_or(BookingError::AppointmentNotFound(id))?;
        let allowed = [
            AppointmentStatus::Confirmed,
            AppointmentStatus::PendingAcceptance,
        ];
        if !allowed.contains(&appointment.status) {
            return Err(BookingError::InvalidTransition {
                from: appointment.status.to_string(),
                operation: "request reschedule".to_string(),
            });
        }
        appointment.record_transition(
            AppointmentStatus::PendingAcceptance,
            Some(Actor::Provider),
            Utc::now(),
        );
        appointment.append_note(note);
        let snapshot = appointment.clone();
        self.checkpoint(&state).await;
        info!("appointment {} reschedule requested", id);
        Ok(snapshot)
    }

    /// Cancels from any live state and frees the slot. Cancelling an
    /// already-cancelled appointment is a no-op, not an error.
    pub async fn cancel(&self, id: AppointmentId, actor: Actor) -> BookingResult<Appointment> {
        let mut state = self.state.write().await;
        let appointment = state
            .appointments
            .get_mut(&id)
            .ok_or(BookingError::AppointmentNotFound(id))?;
        if appointment.status == AppointmentStatus::Cancelled {
            debug!("appointment {} already cancelled", id);
            return Ok(appointment.clone());
        }
        appointment.record_transition(AppointmentStatus::Cancelled, Some(actor), Utc::now());
        appointment.cancelled_by = Some(actor);
        let snapshot = appointment.clone();
        self.checkpoint(&state).await;
        warn!("appointment {} cancelled by {}", id, actor);
        Ok(snapshot)
    }

    pub async fn list_for_patient(&self, patient: &PatientId) -> Vec<Appointment> {
        let state = self.state.read().await;
        state
            .appointments
            .values()
            .filter(|a| &a.patient_id == patient)
            .cloned()
            .collect()
    }

    pub async fn list_for_provider(&self, provider: &ProviderId) -> Vec<Appointment> {
        let state = self.state.read().await;
        state
            .appointments
            .values()
            .filter(|a| &a.provider_id == provider)
            .cloned()
            .collect()
    }

    pub async fn list_by_status(&self, status: AppointmentStatus) -> Vec<Appointment> {
        let state = self.state.read().await;
        state
            .appointments
            .values()
            .filter(|a| a.status == status)
            .cloned()
            .collect()
    }

    /// Slots on `date` still held by live appointments of `provider`.
    pub async fn active_slots(
        &self,
        provider: &ProviderId,
        date: NaiveDate,
    ) -> BTreeSet<NaiveTime> {
        let state = self.state.read().await;
        state
            .appointments
            .values()
            .filter(|a| &a.provider_id == provider && a.date == date && a.holds_slot())
            .map(|a| a.slot)
            .collect()
    }
}
