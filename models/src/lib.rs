// models/src/lib.rs

// Declare all top-level modules within the 'models' crate
pub mod appointment;
pub mod errors;
pub mod identifiers;
pub mod money;
pub mod provider;
pub mod schedule;
pub mod subscription;

// Re-export the core types so service crates can use 'models::*'
pub use appointment::{Actor, Appointment, AppointmentStatus, TransitionRecord};
pub use errors::{BookingError, BookingResult, SlotDenial, ValidationError, ValidationResult};
pub use identifiers::{AppointmentId, PatientId, ProviderId};
pub use money::{split_commission, CommissionSplit, Money};
pub use provider::{
    DocumentKind, DocumentSet, DocumentUpload, Provider, ProviderProfile, ServiceMode,
    VerificationDecision, VerificationStatus,
};
pub use schedule::{DayOfWeek, WeeklySchedule};
pub use subscription::{Subscription, SubscriptionPlan, SubscriptionStatus};
