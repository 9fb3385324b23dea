
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::ProviderId;
use crate::money::Money;
use crate::schedule::WeeklySchedule;

/// How a consultation can be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceMode {
    InPerson,
    HomeVisit,
    Virtual,
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceMode::InPerson => write!(f, "in-person"),
            ServiceMode::HomeVisit => write!(f, "home visit"),
            ServiceMode::Virtual => write!(f, "virtual"),
        }
    }
}

/// Where a provider stands in the verification workflow.
///
/// `Rejected` is terminal. A rejected provider must register again to be
/// considered for the marketplace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationStatus::Verified)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Pending => write!(f, "pending"),
            VerificationStatus::Verified => write!(f, "verified"),
            VerificationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Reviewer ruling on a pending provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationDecision {
    Approve,
    Reject,
}

impl VerificationDecision {
    pub fn target(&self) -> VerificationStatus {
        match self {
            VerificationDecision::Approve => VerificationStatus::Verified,
            VerificationDecision::Reject => VerificationStatus::Rejected,
        }
    }
}

/// Credential categories collected during onboarding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DocumentKind {
    AcademicTitle,
    Identity,
    HealthCertificate,
    SpecializationCertificate,
}

impl DocumentKind {
    /// Documents a reviewer must see before approving a provider.
    /// The specialization certificate stays optional.
    pub const MANDATORY: [DocumentKind; 3] = [
        DocumentKind::AcademicTitle,
        DocumentKind::Identity,
        DocumentKind::HealthCertificate,
    ];
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::AcademicTitle => write!(f, "academic title"),
            DocumentKind::Identity => write!(f, "identity document"),
            DocumentKind::HealthCertificate => write!(f, "health certificate"),
            DocumentKind::SpecializationCertificate => write!(f, "specialization certificate"),
        }
    }
}

/// A credential slot: either still empty or filled with an opaque upload.
///
/// The core never opens the file behind `uri`. It only tracks presence and
/// the metadata needed to show the upload back to a reviewer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentUpload {
    #[default]
    NotUploaded,
    Uploaded {
        uri: String,
        name: String,
        mime_type: String,
        size: u64,
    },
}

impl DocumentUpload {
    pub fn uploaded(uri: &str, name: &str, mime_type: &str, size: u64) -> Self {
        DocumentUpload::Uploaded {
            uri: uri.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        matches!(self, DocumentUpload::Uploaded { .. })
    }
}

/// Every credential slot for one provider, keyed by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSet {
    uploads: BTreeMap<DocumentKind, DocumentUpload>,
}

impl DocumentSet {
    const MISSING: DocumentUpload = DocumentUpload::NotUploaded;

    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by fixtures and tests.
    pub fn with(mut self, kind: DocumentKind, upload: DocumentUpload) -> Self {
        self.attach(kind, upload);
        self
    }

    /// Stores an upload for a slot, replacing any previous one.
    pub fn attach(&mut self, kind: DocumentKind, upload: DocumentUpload) {
        self.uploads.insert(kind, upload);
    }

    pub fn get(&self, kind: DocumentKind) -> &DocumentUpload {
        self.uploads.get(&kind).unwrap_or(&Self::MISSING)
    }

    pub fn is_uploaded(&self, kind: DocumentKind) -> bool {
        self.get(kind).is_uploaded()
    }

    /// Mandatory slots that are still empty, in a stable order.
    pub fn missing_mandatory(&self) -> Vec<DocumentKind> {
        DocumentKind::MANDATORY
            .into_iter()
            .filter(|kind| !self.is_uploaded(*kind))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_mandatory().is_empty()
    }
}

/// Editable part of a provider record, as submitted at registration
/// or through a later profile update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub name: String,
    pub specialty: String,
    pub academic_title: String,
    pub workplace: String,
    pub price: Money,
    pub rating: f32,
    pub tags: BTreeSet<String>,
    pub service_modes: BTreeSet<ServiceMode>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ProviderProfile {
    pub fn validate(&self) -> ValidationResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("specialty", &self.specialty),
            ("academic_title", &self.academic_title),
            ("workplace", &self.workplace),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::BlankField(field.to_string()));
            }
        }
        if !self.price.is_positive() {
            return Err(ValidationError::NonPositivePrice);
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange);
        }
        Ok(())
    }
}

/// A care provider as the marketplace sees them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub specialty: String,
    pub academic_title: String,
    pub workplace: String,
    pub price: Money,
    pub rating: f32,
    pub tags: BTreeSet<String>,
    pub service_modes: BTreeSet<ServiceMode>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub weekly_schedule: WeeklySchedule,
    pub verification_status: VerificationStatus,
    pub documents: DocumentSet,
    pub registered_at: DateTime<Utc>,
}

impl Provider {
    /// Materializes a provider from a registration submission.
    /// New providers always start unverified with an empty calendar.
    pub fn from_profile(
        id: ProviderId,
        profile: ProviderProfile,
        documents: DocumentSet,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Provider {
            id,
            name: profile.name,
            specialty: profile.specialty,
            academic_title: profile.academic_title,
            workplace: profile.workplace,
            price: profile.price,
            rating: profile.rating,
            tags: profile.tags,
            service_modes: profile.service_modes,
            bio: profile.bio,
            email: profile.email,
            phone: profile.phone,
            weekly_schedule: WeeklySchedule::new(),
            verification_status: VerificationStatus::Pending,
            documents,
            registered_at,
        }
    }

    /// Overwrites the editable fields while keeping the calendar,
    /// verification status and documents untouched.
    pub fn apply_profile(&mut self, profile: ProviderProfile) {
        self.name = profile.name;
        self.specialty = profile.specialty;
        self.academic_title = profile.academic_title;
        self.workplace = profile.workplace;
        self.price = profile.price;
        self.rating = profile.rating;
        self.tags = profile.tags;
        self.service_modes = profile.service_modes;
        self.bio = profile.bio;
        self.email = profile.email;
        self.phone = profile.phone;
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status.is_verified()
    }
}
