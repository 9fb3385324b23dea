use std::io;
pub use thiserror::Error;
use serde::{Serialize, Deserialize};
use serde_json::Error as SerdeJsonError;
use chrono::{NaiveDate, NaiveTime};
use crate::identifiers::{AppointmentId, ProviderId};

#[derive(Debug, Serialize, Deserialize, Error, Clone, PartialEq)]
pub enum BookingError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    StorageError(String), // General checkpoint store error
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("An internal error occurred: {0}")]
    InternalError(String),
    #[error("provider {0} was not found")]
    ProviderNotFound(ProviderId),
    #[error("appointment {0} was not found")]
    AppointmentNotFound(AppointmentId),
    #[error("provider {0} has no subscription on record")]
    SubscriptionNotFound(ProviderId),
    #[error("slot {slot} on {date} for provider {provider} is unavailable: {reason}")]
    SlotUnavailable {
        provider: ProviderId,
        date: NaiveDate,
        slot: NaiveTime,
        reason: SlotDenial,
    },
    #[error("cannot {operation} from state {from}")]
    InvalidTransition { from: String, operation: String },
    #[error("no payable appointment: {0}")]
    NoActiveAppointment(String),
    #[error("Validation error: {0}")]
    Validation(ValidationError),
}

/// Reason a slot was withheld from booking or listing.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SlotDenial {
    UnverifiedProvider,
    NotDeclared,
    AlreadyHeld,
}

impl std::fmt::Display for SlotDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotDenial::UnverifiedProvider => write!(f, "the provider is not verified"),
            SlotDenial::NotDeclared => write!(f, "the slot is not on the weekly calendar"),
            SlotDenial::AlreadyHeld => write!(f, "the slot is already held"),
        }
    }
}

// Implement From for serde_json::Error
impl From<SerdeJsonError> for BookingError {
    fn from(err: SerdeJsonError) -> Self {
        BookingError::SerializationError(format!("JSON serialization error: {}", err))
    }
}

// Implement From for io::Error
impl From<io::Error> for BookingError {
    fn from(err: io::Error) -> Self {
        BookingError::Io(format!("IO error: {}", err))
    }
}

// Implement From for ValidationError
impl From<ValidationError> for BookingError {
    fn from(err: ValidationError) -> Self {
        BookingError::Validation(err)
    }
}

#[derive(Debug, Serialize, Deserialize, Error, PartialEq, Clone)]
pub enum ValidationError {
    #[error("identifier has invalid length")]
    InvalidIdentifierLength,
    #[error("identifier '{0}' is invalid")]
    InvalidIdentifier(String),
    #[error("{0} must not be blank")]
    BlankField(String),
    #[error("consultation price must be positive")]
    NonPositivePrice,
    #[error("rating must fall within 0.0..=5.0")]
    RatingOutOfRange,
    #[error("service mode {0} is not offered by this provider")]
    UnsupportedServiceMode(String),
    #[error("mandatory documents missing: {0}")]
    MissingDocuments(String),
}

/// A type alias for a `Result` that returns a `BookingError` on failure.
pub type BookingResult<T> = Result<T, BookingError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
