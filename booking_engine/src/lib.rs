// booking_engine/src/lib.rs

pub mod availability;
pub mod config;
pub mod ledger;
pub mod marketplace;
pub mod registry;
pub mod seed;
pub mod settlement;
pub mod subscriptions;
pub mod verification;

pub use availability::AvailabilityEngine;
pub use config::{EngineConfig, SettlementConfig};
pub use ledger::AppointmentLedger;
pub use marketplace::Marketplace;
pub use registry::ProviderRegistry;
pub use settlement::{
    PaymentOrchestrator, PayoutSummary, SettlementOutcome, SettlementRun, SettlementStage,
    StageReport, StageState,
};
pub use subscriptions::SubscriptionService;
pub use verification::{BatchScanReport, VerificationWorkflow};
