// booking_engine/src/marketplace.rs
//! Composition root. Opens every service against one checkpoint store
//! and hands out shared handles. There is no global state: two
//! marketplaces over different stores are fully independent.

use std::sync::Arc;

use log::info;

use models::errors::BookingResult;
use models::{DocumentSet, Provider, ProviderProfile, SubscriptionPlan};
use storage::KeyValueStore;

use crate::availability::AvailabilityEngine;
use crate::config::EngineConfig;
use crate::ledger::AppointmentLedger;
use crate::registry::ProviderRegistry;
use crate::settlement::PaymentOrchestrator;
use crate::subscriptions::SubscriptionService;
use crate::verification::VerificationWorkflow;

pub struct Marketplace {
    registry: Arc<ProviderRegistry>,
    ledger: Arc<AppointmentLedger>,
    availability: Arc<AvailabilityEngine>,
    settlement: Arc<PaymentOrchestrator>,
    verification: Arc<VerificationWorkflow>,
    subscriptions: Arc<SubscriptionService>,
}

impl Marketplace {
    /// Restores (or cold-starts) the whole booking core from `store`.
    pub async fn open(store: Arc<dyn KeyValueStore>, config: EngineConfig) -> BookingResult<Self> {
        let namespace = config.checkpoint_namespace.as_str();
        let registry =
            ProviderRegistry::open(store.clone(), namespace, config.seed_demo_providers).await?;
        let ledger = AppointmentLedger::open(store.clone(), namespace, registry.clone()).await?;
        let subscriptions = SubscriptionService::open(store, namespace).await?;
        let availability = Arc::new(AvailabilityEngine::new(registry.clone(), ledger.clone()));
        let settlement = PaymentOrchestrator::new(
            ledger.clone(),
            subscriptions.clone(),
            config.settlement.clone(),
        );
        let verification = Arc::new(VerificationWorkflow::new(registry.clone()));

        info!(
            "marketplace core ready ({} providers on the books)",
            registry.list(None).await.len()
        );
        Ok(Marketplace {
            registry,
            ledger,
            availability,
            settlement,
            verification,
            subscriptions,
        })
    }

    /// Registration plus membership enrollment in one step, the way
    /// onboarding drives it.
    pub async fn register_provider(
        &self,
        profile: ProviderProfile,
        documents: DocumentSet,
    ) -> BookingResult<Provider> {
        let provider = self.registry.register(profile, documents).await?;
        self.subscriptions
            .enroll(provider.id.clone(), SubscriptionPlan::Pro)
            .await;
        Ok(provider)
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &Arc<AppointmentLedger> {
        &self.ledger
    }

    pub fn availability(&self) -> &Arc<AvailabilityEngine> {
        &self.availability
    }

    pub fn settlement(&self) -> &Arc<PaymentOrchestrator> {
        &self.settlement
    }

    pub fn verification(&self) -> &Arc<VerificationWorkflow> {
        &self.verification
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionService> {
        &self.subscriptions
    }
}
