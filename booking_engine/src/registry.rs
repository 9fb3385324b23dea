// booking_engine/src/registry.rs
//! Registry of care providers: registration, profile edits, calendar
//! updates and verification rulings, checkpointed after every change.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::RwLock;

use models::errors::{BookingError, BookingResult};
use models::{
    DocumentKind, DocumentSet, DocumentUpload, Provider, ProviderId, ProviderProfile,
    VerificationDecision, VerificationStatus, WeeklySchedule,
};
use storage::KeyValueStore;

use crate::seed;

pub struct ProviderRegistry {
    providers: RwLock<BTreeMap<ProviderId, Provider>>,
    store: Arc<dyn KeyValueStore>,
    checkpoint_key: String,
}

impl ProviderRegistry {
    /// Restores the registry from its checkpoint. An empty store is a
    /// cold start: the demo catalog is seeded when `seed_when_empty`
    /// is set, otherwise the registry starts empty.
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        namespace: &str,
        seed_when_empty: bool,
    ) -> BookingResult<Arc<Self>> {
        let checkpoint_key = format!("{}/providers", namespace);
        let providers: BTreeMap<ProviderId, Provider> = match store.get(&checkpoint_key).await? {
            Some(value) => {
                let restored: BTreeMap<ProviderId, Provider> = serde_json::from_value(value)?;
                info!("provider registry restored {} providers", restored.len());
                restored
            }
            None if seed_when_empty => {
                let seeded: BTreeMap<ProviderId, Provider> = seed::demo_providers()
                    .into_iter()
                    .map(|p| (p.id.clone(), p))
                    .collect();
                info!("provider registry seeded {} demo providers", seeded.len());
                seeded
            }
            None => {
                info!("provider registry starting empty");
                BTreeMap::new()
            }
        };

        let registry = Arc::new(ProviderRegistry {
            providers: RwLock::new(providers),
            store,
            checkpoint_key,
        });
        {
            let guard = registry.providers.read().await;
            if !guard.is_empty() {
                registry.checkpoint(&guard).await;
            }
        }
        Ok(registry)
    }

    /// Serializes the full provider map under the registry's key.
    /// The in-memory map stays authoritative if the store misbehaves.
    async fn checkpoint(&self, providers: &BTreeMap<ProviderId, Provider>) {
        let value = match serde_json::to_value(providers) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to serialize provider registry: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.checkpoint_key, value).await {
            error!("failed to checkpoint provider registry: {}", e);
        }
    }

    /// Registers a new provider. The record starts unverified with an
    /// empty calendar regardless of what the paperwork looks like.
    pub async fn register(
        &self,
        profile: ProviderProfile,
        documents: DocumentSet,
    ) -> BookingResult<Provider> {
        profile.validate()?;
        let missing = documents.missing_mandatory();
        let provider = Provider::from_profile(ProviderId::generate(), profile, documents, Utc::now());
        if !missing.is_empty() {
            warn!(
                "provider {} registered with incomplete paperwork ({} mandatory documents missing)",
                provider.id,
                missing.len()
            );
        }

        let mut providers = self.providers.write().await;
        providers.insert(provider.id.clone(), provider.clone());
        self.checkpoint(&providers).await;
        info!("registered provider {} ({})", provider.id, provider.specialty);
        Ok(provider)
    }

    pub async fn get(&self, id: &ProviderId) -> BookingResult<Provider> {
        let providers = self.providers.read().await;
        providers
            .get(id)
            .cloned()
            .ok_or_else(|| BookingError::ProviderNotFound(id.clone()))
    }

    /// All providers in stable id order, optionally narrowed by a
    /// case-insensitive substring match against specialty and tags.
    pub async fn list(&self, specialty: Option<&str>) -> Vec<Provider> {
        let providers = self.providers.read().await;
        match specialty {
            Some(filter) => {
                let needle = filter.to_lowercase();
                providers
                    .values()
                    .filter(|p| {
                        p.specialty.to_lowercase().contains(&needle)
                            || p.tags.iter().any(|t| t.to_lowercase().contains(&needle))
                    })
                    .cloned()
                    .collect()
            }
            None => providers.values().cloned().collect(),
        }
    }

    /// Applies a reviewer ruling. Re-applying the same ruling is a
    /// no-op; any other move off `Pending` is rejected, so a rejected
    /// provider stays rejected.
    pub async fn update_verification(
        &self,
        id: &ProviderId,
        decision: VerificationDecision,
    ) -> BookingResult<Provider> {
        let operation = match decision {
            VerificationDecision::Approve => "approve provider",
            VerificationDecision::Reject => "reject provider",
        };
        let target = decision.target();

        let mut providers = self.providers.write().await;
        let provider = providers
            .get_mut(id)
            .ok_or_else(|| BookingError::ProviderNotFound(id.clone()))?;

        if provider.verification_status == target {
            info!("provider {} already {}", id, target);
            return Ok(provider.clone());
        }
        if provider.verification_status != VerificationStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: provider.verification_status.to_string(),
                operation: operation.to_string(),
            });
        }

        provider.verification_status = target;
        let snapshot = provider.clone();
        self.checkpoint(&providers).await;
        info!("provider {} is now {}", id, target);
        Ok(snapshot)
    }

    /// Replaces the weekly calendar wholesale.
    pub async fn update_schedule(
        &self,
        id: &ProviderId,
        schedule: WeeklySchedule,
    ) -> BookingResult<Provider> {
        let mut providers = self.providers.write().await;
        let provider = providers
            .get_mut(id)
            .ok_or_else(|| BookingError::ProviderNotFound(id.clone()))?;
        provider.weekly_schedule = schedule;
        let snapshot = provider.clone();
        self.checkpoint(&providers).await;
        info!(
            "provider {} calendar updated ({} weekly slots)",
            id,
            snapshot.weekly_schedule.total_slots()
        );
        Ok(snapshot)
    }

    /// Overwrites the editable profile fields. Verification status,
    /// calendar and paperwork are not touched by profile edits.
    pub async fn update_profile(
        &self,
        id: &ProviderId,
        profile: ProviderProfile,
    ) -> BookingResult<Provider> {
        profile.validate()?;
        let mut providers = self.providers.write().await;
        let provider = providers
            .get_mut(id)
            .ok_or_else(|| BookingError::ProviderNotFound(id.clone()))?;
        provider.apply_profile(profile);
        let snapshot = provider.clone();
        self.checkpoint(&providers).await;
        info!("provider {} profile updated", id);
        Ok(snapshot)
    }

    /// Attaches (or replaces) one credential upload.
    pub async fn attach_document(
        &self,
        id: &ProviderId,
        kind: DocumentKind,
        upload: DocumentUpload,
    ) -> BookingResult<Provider> {
        let mut providers = self.providers.write().await;
        let provider = providers
            .get_mut(id)
            .ok_or_else(|| BookingError::ProviderNotFound(id.clone()))?;
        provider.documents.attach(kind, upload);
        let snapshot = provider.clone();
        self.checkpoint(&providers).await;
        info!("provider {} uploaded {}", id, kind);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{DayOfWeek, DocumentKind, DocumentUpload, Money, ServiceMode, ValidationError};
    use std::collections::BTreeSet;
    use storage::MemoryStore;

    fn profile(name: &str, specialty: &str) -> ProviderProfile {
        ProviderProfile {
            name: name.to_string(),
            specialty: specialty.to_string(),
            academic_title: "MD".to_string(),
            workplace: "Test Clinic".to_string(),
            price: Money::from_major(50),
            rating: 4.5,
            tags: BTreeSet::new(),
            service_modes: BTreeSet::from([ServiceMode::Virtual]),
            bio: None,
            email: None,
            phone: None,
        }
    }

    async fn open_seeded() -> Arc<ProviderRegistry> {
        let store = Arc::new(MemoryStore::new());
        ProviderRegistry::open(store, "test", true).await.unwrap()
    }

    #[tokio::test]
    async fn should_seed_demo_catalog_on_cold_start() {
        let registry = open_seeded().await;
        let providers = registry.list(None).await;
        assert_eq!(providers.len(), 3);
        assert!(providers.iter().all(|p| p.is_verified()));
    }

    #[tokio::test]
    async fn should_not_reseed_over_an_existing_checkpoint() {
        let store = Arc::new(MemoryStore::new());
        let registry = ProviderRegistry::open(store.clone(), "test", true)
            .await
            .unwrap();
        registry
            .register(profile("Dr. New", "Neurology"), DocumentSet::new())
            .await
            .unwrap();

        let reopened = ProviderRegistry::open(store, "test", true).await.unwrap();
        assert_eq!(reopened.list(None).await.len(), 4);
    }

    #[tokio::test]
    async fn should_start_empty_when_seeding_is_disabled() {
        let store = Arc::new(MemoryStore::new());
        let registry = ProviderRegistry::open(store, "test", false).await.unwrap();
        assert!(registry.list(None).await.is_empty());
    }

    #[tokio::test]
    async fn should_register_new_providers_as_pending() {
        let registry = open_seeded().await;
        let provider = registry
            .register(profile("Dr. New", "Neurology"), DocumentSet::new())
            .await
            .unwrap();
        assert_eq!(provider.verification_status, VerificationStatus::Pending);
        assert!(provider.weekly_schedule.is_empty());
        assert!(provider.id.starts_with("prv-"));
    }

    #[tokio::test]
    async fn should_reject_invalid_registration_input() {
        let registry = open_seeded().await;
        let mut bad = profile("", "Neurology");
        bad.name = "   ".to_string();
        let err = registry.register(bad, DocumentSet::new()).await.unwrap_err();
        assert_eq!(
            err,
            BookingError::Validation(ValidationError::BlankField("name".to_string()))
        );
    }

    #[tokio::test]
    async fn should_filter_listing_by_specialty_and_tags() {
        let registry = open_seeded().await;
        let cardio = registry.list(Some("cardio")).await;
        assert_eq!(cardio.len(), 1);
        assert_eq!(cardio[0].id.as_ref(), "md-cortes");

        // "telemedicine" is a tag on the cardiology seed, not a specialty.
        let tele = registry.list(Some("Telemedicine")).await;
        assert_eq!(tele.len(), 1);
        assert_eq!(tele[0].id.as_ref(), "md-cortes");

        assert!(registry.list(Some("podiatry")).await.is_empty());
    }

    #[tokio::test]
    async fn should_keep_rejection_terminal() {
        let registry = open_seeded().await;
        let provider = registry
            .register(profile("Dr. New", "Neurology"), DocumentSet::new())
            .await
            .unwrap();

        registry
            .update_verification(&provider.id, VerificationDecision::Reject)
            .await
            .unwrap();
        let err = registry
            .update_verification(&provider.id, VerificationDecision::Approve)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            BookingError::InvalidTransition {
                from: "rejected".to_string(),
                operation: "approve provider".to_string(),
            }
        );

        // Re-applying the same ruling stays a no-op.
        let again = registry
            .update_verification(&provider.id, VerificationDecision::Reject)
            .await
            .unwrap();
        assert_eq!(again.verification_status, VerificationStatus::Rejected);
    }

    #[tokio::test]
    async fn should_replace_calendar_without_touching_status() {
        let registry = open_seeded().await;
        let id = ProviderId::new("md-jurado".to_string()).unwrap();
        let schedule = WeeklySchedule::new().with(
            DayOfWeek::Monday,
            &[chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap()],
        );
        let updated = registry.update_schedule(&id, schedule).await.unwrap();
        assert_eq!(updated.weekly_schedule.total_slots(), 1);
        assert!(updated.is_verified());
    }

    #[tokio::test]
    async fn should_attach_documents_to_existing_providers() {
        let registry = open_seeded().await;
        let provider = registry
            .register(profile("Dr. New", "Neurology"), DocumentSet::new())
            .await
            .unwrap();
        let updated = registry
            .attach_document(
                &provider.id,
                DocumentKind::Identity,
                DocumentUpload::uploaded("stored://id.pdf", "id.pdf", "application/pdf", 512),
            )
            .await
            .unwrap();
        assert!(updated.documents.is_uploaded(DocumentKind::Identity));
    }

    #[tokio::test]
    async fn should_report_unknown_providers() {
        let registry = open_seeded().await;
        let ghost = ProviderId::new("md-ghost".to_string()).unwrap();
        assert_eq!(
            registry.get(&ghost).await.unwrap_err(),
            BookingError::ProviderNotFound(ghost)
        );
    }
}
