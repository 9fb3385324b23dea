
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{AppointmentId, PatientId, ProviderId};
use crate::money::Money;
use crate::provider::ServiceMode;

/// Lifecycle states of an appointment.
///
/// `Cancelled` is terminal. Everything else still holds its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    PendingPayment,
    PendingAcceptance,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    /// States this one may legally move to.
    ///
    /// The self-loop on `PendingAcceptance` covers a reschedule request
    /// raised while the previous request is still awaiting the patient.
    pub fn valid_next(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::PendingPayment => &[
                AppointmentStatus::PendingAcceptance,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::PendingAcceptance => &[
                AppointmentStatus::PendingAcceptance,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => &[
                AppointmentStatus::PendingAcceptance,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.valid_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::PendingPayment => write!(f, "pending-payment"),
            AppointmentStatus::PendingAcceptance => write!(f, "pending-acceptance"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Who initiated a lifecycle action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actor {
    Patient,
    Provider,
    Admin,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Patient => write!(f, "patient"),
            Actor::Provider => write!(f, "provider"),
            Actor::Admin => write!(f, "admin"),
        }
    }
}

/// One entry in an appointment's audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub at: DateTime<Utc>,
    /// `None` marks the creation entry.
    pub from: Option<AppointmentStatus>,
    pub to: AppointmentStatus,
    pub actor: Option<Actor>,
}

/// A booked consultation slot and everything that happened to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub provider_id: ProviderId,
    pub patient_id: PatientId,
    pub date: NaiveDate,
    pub slot: NaiveTime,
    pub service_mode: ServiceMode,
    /// Consultation price captured at booking time. Later profile edits
    /// never change what this appointment settles for.
    pub price: Money,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub cancelled_by: Option<Actor>,
    pub booked_at: DateTime<Utc>,
    pub history: Vec<TransitionRecord>,
}

impl Appointment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AppointmentId,
        provider_id: ProviderId,
        patient_id: PatientId,
        date: NaiveDate,
        slot: NaiveTime,
        service_mode: ServiceMode,
        price: Money,
        booked_at: DateTime<Utc>,
    ) -> Self {
        Appointment {
            id,
            provider_id,
            patient_id,
            date,
            slot,
            service_mode,
            price,
            status: AppointmentStatus::PendingPayment,
            notes: None,
            cancelled_by: None,
            booked_at,
            history: vec![TransitionRecord {
                at: booked_at,
                from: None,
                to: AppointmentStatus::PendingPayment,
                actor: Some(Actor::Patient),
            }],
        }
    }

    /// Whether this appointment still occupies its (provider, date, slot).
    pub fn holds_slot(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Moves to `next` and appends the audit record. The caller is
    /// responsible for having checked legality first.
    pub fn record_transition(
        &mut self,
        next: AppointmentStatus,
        actor: Option<Actor>,
        at: DateTime<Utc>,
    ) {
        self.history.push(TransitionRecord {
            at,
            from: Some(self.status),
            to: next,
            actor,
        });
        self.status = next;
    }

    pub fn append_note(&mut self, note: &str) {
        match &mut self.notes {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(note);
            }
            None => self.notes = Some(note.to_string()),
        }
    }
}
