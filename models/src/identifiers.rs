
use core::ops::Deref;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// Upper bound on the length of external identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

fn validate_identifier(value: &str) -> ValidationResult<()> {
    if value.is_empty() || value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::InvalidIdentifierLength);
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidIdentifier(value.to_string()));
    }
    Ok(())
}

/// Stable handle for a care provider, e.g. `md-cortes` or a generated `prv-` slug.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub fn new(value: String) -> ValidationResult<Self> {
        validate_identifier(&value)?;
        Ok(Self(value))
    }

    /// Mints a fresh identifier for a provider registered at runtime.
    pub fn generate() -> Self {
        Self(format!("prv-{}", Uuid::new_v4()))
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ProviderId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;
    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s.to_string())
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for the patient requesting care.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(value: String) -> ValidationResult<Self> {
        validate_identifier(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for PatientId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for PatientId {
    type Err = ValidationError;
    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s.to_string())
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// Monotonic appointment handle issued by the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub u64);

impl AppointmentId {
    pub fn new(id: u64) -> Self {
        AppointmentId(id)
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "appt-{:06}", self.0)
    }
}
