// booking_engine/src/verification.rs
//! Reviewer-facing side of provider onboarding: submissions, rulings
//! and the batch scan over submitted paperwork.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use models::errors::{BookingError, BookingResult, ValidationError};
use models::{
    DocumentSet, Provider, ProviderId, ProviderProfile, VerificationDecision, VerificationStatus,
};

use crate::registry::ProviderRegistry;

/// Counters produced by one pass over a batch of provider ids.
/// The scan never mutates anything; it only reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchScanReport {
    pub requested: usize,
    pub scanned: usize,
    pub pending: usize,
    pub missing_documents: usize,
    pub unknown: usize,
}

pub struct VerificationWorkflow {
    registry: Arc<ProviderRegistry>,
}

impl VerificationWorkflow {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        VerificationWorkflow { registry }
    }

    /// Files a registration for review. Paperwork may still be
    /// incomplete at this point; approval is where completeness bites.
    pub async fn submit(
        &self,
        profile: ProviderProfile,
        documents: DocumentSet,
    ) -> BookingResult<Provider> {
        self.registry.register(profile, documents).await
    }

    /// Approves a pending provider, but only with complete mandatory
    /// paperwork on file. Approving an already-verified provider is a
    /// no-op; approving a rejected one stays illegal.
    pub async fn approve(&self, id: &ProviderId) -> BookingResult<Provider> {
        let provider = self.registry.get(id).await?;
        if provider.verification_status == VerificationStatus::Pending {
            let missing = provider.documents.missing_mandatory();
            if !missing.is_empty() {
                let listed = missing
                    .iter()
                    .map(|kind| kind.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(BookingError::Validation(ValidationError::MissingDocuments(
                    listed,
                )));
            }
        }
        self.registry
            .update_verification(id, VerificationDecision::Approve)
            .await
    }

    /// Rejects a pending provider. Terminal: the ruling cannot be
    /// lifted later, not even by a second reviewer.
    pub async fn reject(&self, id: &ProviderId) -> BookingResult<Provider> {
        self.registry
            .update_verification(id, VerificationDecision::Reject)
            .await
    }

    /// Walks a batch of provider ids and tallies review state. Unknown
    /// ids are counted rather than failing the whole scan.
    pub async fn scan_pending_batch(&self, ids: &[ProviderId]) -> BatchScanReport {
        let mut report = BatchScanReport {
            requested: ids.len(),
            ..BatchScanReport::default()
        };
        for id in ids {
            match self.registry.get(id).await {
                Ok(provider) => {
                    report.scanned += 1;
                    if provider.verification_status == VerificationStatus::Pending {
                        report.pending += 1;
                        if !provider.documents.is_complete() {
                            report.missing_documents += 1;
                        }
                    }
                }
                Err(_) => report.unknown += 1,
            }
        }
        info!(
            "verification batch scan: {} scanned, {} pending, {} with missing documents, {} unknown",
            report.scanned, report.pending, report.missing_documents, report.unknown
        );
        report
    }
}
