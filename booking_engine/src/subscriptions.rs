// booking_engine/src/subscriptions.rs
//! Provider membership billing: enrolled at registration, activated by
//! the first settled consultation, renewed on demand.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, error, info};
use tokio::sync::RwLock;

use models::errors::{BookingError, BookingResult};
use models::{ProviderId, Subscription, SubscriptionPlan, SubscriptionStatus};
use storage::KeyValueStore;

/// Length of one billing period.
const PERIOD_DAYS: i64 = 30;

pub struct SubscriptionService {
    subscriptions: RwLock<BTreeMap<ProviderId, Subscription>>,
    store: Arc<dyn KeyValueStore>,
    checkpoint_key: String,
}

impl SubscriptionService {
    pub async fn open(store: Arc<dyn KeyValueStore>, namespace: &str) -> BookingResult<Arc<Self>> {
        let checkpoint_key = format!("{}/subscriptions", namespace);
        let subscriptions: BTreeMap<ProviderId, Subscription> =
            match store.get(&checkpoint_key).await? {
                Some(value) => {
                    let restored = serde_json::from_value(value)?;
                    info!("subscription service restored from checkpoint");
                    restored
                }
                None => BTreeMap::new(),
            };
        Ok(Arc::new(SubscriptionService {
            subscriptions: RwLock::new(subscriptions),
            store,
            checkpoint_key,
        }))
    }

    async fn checkpoint(&self, subscriptions: &BTreeMap<ProviderId, Subscription>) {
        let value = match serde_json::to_value(subscriptions) {
            Ok(value) => value,
            Err(e) => {
                error!("failed to serialize subscriptions: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.checkpoint_key, value).await {
            error!("failed to checkpoint subscriptions: {}", e);
        }
    }

    /// Enrolls a provider. Enrolling twice keeps the existing record.
    pub async fn enroll(&self, provider_id: ProviderId, plan: SubscriptionPlan) -> Subscription {
        let mut subscriptions = self.subscriptions.write().await;
        if let Some(existing) = subscriptions.get(&provider_id) {
            debug!("provider {} already enrolled", provider_id);
            return existing.clone();
        }
        let now = Utc::now();
        let subscription = Subscription {
            provider_id: provider_id.clone(),
            plan,
            status: SubscriptionStatus::Pending,
            renews_at: now.date_naive() + Duration::days(PERIOD_DAYS),
            enrolled_at: now,
        };
        subscriptions.insert(provider_id.clone(), subscription.clone());
        self.checkpoint(&subscriptions).await;
        info!("provider {} enrolled on the {} plan", provider_id, subscription.plan);
        subscription
    }

    /// First settled consultation turns a pending membership active.
    /// Providers without a record (or already past pending) are left alone.
    pub async fn activate(&self, provider_id: &ProviderId) -> Option<Subscription> {
        let mut subscriptions = self.subscriptions.write().await;
        let subscription = subscriptions.get_mut(provider_id)?;
        if subscription.status != SubscriptionStatus::Pending {
            return Some(subscription.clone());
        }
        subscription.status = SubscriptionStatus::Active;
        let snapshot = subscription.clone();
        self.checkpoint(&subscriptions).await;
        info!("provider {} subscription activated", provider_id);
        Some(snapshot)
    }

    /// Renews the membership and pushes the renewal date a full period out.
    pub async fn renew(&self, provider_id: &ProviderId) -> BookingResult<Subscription> {
        let mut subscriptions = self.subscriptions.write().await;
        let subscription = subscriptions
            .get_mut(provider_id)
            .ok_or_else(|| BookingError::SubscriptionNotFound(provider_id.clone()))?;
        subscription.status = SubscriptionStatus::Renewed;
        subscription.renews_at = Utc::now().date_naive() + Duration::days(PERIOD_DAYS);
        let snapshot = subscription.clone();
        self.checkpoint(&subscriptions).await;
        info!(
            "provider {} subscription renewed until {}",
            provider_id, snapshot.renews_at
        );
        Ok(snapshot)
    }

    pub async fn get(&self, provider_id: &ProviderId) -> Option<Subscription> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions.get(provider_id).cloned()
    }
}
