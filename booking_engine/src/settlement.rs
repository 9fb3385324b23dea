// booking_engine/src/settlement.rs
//! Payment settlement pipeline. Runs the three stages of a consultation
//! payment as supervised tasks, lets cancellation win any race, and
//! splits the settled amount between provider and platform.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as TokioMutex;
use tokio::time::timeout;

use models::errors::{BookingError, BookingResult};
use models::{
    split_commission, AppointmentId, AppointmentStatus, CommissionSplit, Money,
};

use crate::config::SettlementConfig;
use crate::ledger::AppointmentLedger;
use crate::subscriptions::SubscriptionService;

/// Legs of a settlement, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStage {
    Tokenization,
    Authorization,
    CommissionDistribution,
}

impl SettlementStage {
    pub const ALL: [SettlementStage; 3] = [
        SettlementStage::Tokenization,
        SettlementStage::Authorization,
        SettlementStage::CommissionDistribution,
    ];
}

impl std::fmt::Display for SettlementStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementStage::Tokenization => write!(f, "tokenization"),
            SettlementStage::Authorization => write!(f, "authorization"),
            SettlementStage::CommissionDistribution => write!(f, "commission distribution"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageState {
    Pending,
    InProgress,
    Done,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: SettlementStage,
    pub state: StageState,
    pub detail: Option<String>,
}

/// How one settlement invocation ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// All stages ran and the appointment is now confirmed.
    Confirmed { split: CommissionSplit },
    /// The appointment was already confirmed; nothing ran.
    AlreadySettled,
    /// A cancellation landed while the pipeline was running.
    AbortedByCancellation,
    /// A stage overran its timeout. The appointment stays payable.
    Stalled { stage: SettlementStage },
}

/// Report of one `run_settlement` invocation. Stage states describe
/// this invocation only, not the appointment's full payment history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRun {
    pub appointment_id: AppointmentId,
    pub stages: Vec<StageReport>,
    pub outcome: SettlementOutcome,
}

impl SettlementRun {
    fn new(appointment_id: AppointmentId, outcome: SettlementOutcome) -> Self {
        SettlementRun {
            appointment_id,
            stages: SettlementStage::ALL
                .into_iter()
                .map(|stage| StageReport {
                    stage,
                    state: StageState::Pending,
                    detail: None,
                })
                .collect(),
            outcome,
        }
    }
}

/// Aggregate owed across all confirmed appointments, summed from the
/// per-appointment splits so rounding matches what each one settled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSummary {
    pub confirmed_appointments: usize,
    pub gross: Money,
    pub provider_share: Money,
    pub platform_share: Money,
}

pub struct PaymentOrchestrator {
    ledger: Arc<AppointmentLedger>,
    subscriptions: Arc<SubscriptionService>,
    config: SettlementConfig,
    /// One gate per appointment so concurrent settlement calls for the
    /// same appointment run one after another.
    run_gates: TokioMutex<HashMap<AppointmentId, Arc<TokioMutex<()>>>>,
}

impl PaymentOrchestrator {
    pub fn new(
        ledger: Arc<AppointmentLedger>,
        subscriptions: Arc<SubscriptionService>,
        config: SettlementConfig,
    ) -> Arc<Self> {
        Arc::new(PaymentOrchestrator {
            ledger,
            subscriptions,
            config,
            run_gates: TokioMutex::new(HashMap::new()),
        })
    }

    pub fn compute_commission_split(&self, amount: Money) -> CommissionSplit {
        split_commission(amount)
    }

    async fn run_gate(&self, id: AppointmentId) -> Arc<TokioMutex<()>> {
        let mut gates = self.run_gates.lock().await;
        gates
            .entry(id)
            .or_insert_with(|| Arc::new(TokioMutex::new(())))
            .clone()
    }

    /// Drives the full pipeline for one appointment.
    ///
    /// Re-invoking on a confirmed appointment reports `AlreadySettled`
    /// without re-running any stage, so retries are safe. Appointments
    /// that are not payable (awaiting acceptance, cancelled, unknown)
    /// are errors rather than runs.
    pub async fn run_settlement(&self, id: AppointmentId) -> BookingResult<SettlementRun> {
        let gate = self.run_gate(id).await;
        let _running = gate.lock().await;

        let appointment = match self.ledger.get(id).await {
            Ok(appointment) => appointment,
            Err(BookingError::AppointmentNotFound(_)) => {
                return Err(BookingError::NoActiveAppointment(format!(
                    "appointment {} was not found",
                    id
                )));
            }
            Err(other) => return Err(other),
        };
        match appointment.status {
            AppointmentStatus::PendingPayment => {}
            AppointmentStatus::Confirmed => {
                debug!("appointment {} already settled", id);
                return Ok(SettlementRun::new(id, SettlementOutcome::AlreadySettled));
            }
            status => {
                return Err(BookingError::NoActiveAppointment(format!(
                    "appointment {} is {}",
                    id, status
                )));
            }
        }

        let mut run = SettlementRun::new(id, SettlementOutcome::AlreadySettled);
        for (index, stage) in SettlementStage::ALL.into_iter().enumerate() {
            // Cancellation between stages wins immediately.
            if self.ledger.get(id).await?.status == AppointmentStatus::Cancelled {
                warn!("settlement of {} aborted before {}: cancelled", id, stage);
                run.outcome = SettlementOutcome::AbortedByCancellation;
                return Ok(run);
            }

            run.stages[index].state = StageState::InProgress;
            let mut worker = tokio::spawn(simulate_stage(self.config.stage_delay()));
            match timeout(self.config.stage_timeout(), &mut worker).await {
                Err(_elapsed) => {
                    worker.abort();
                    run.stages[index].state = StageState::Error;
                    run.stages[index].detail = Some(format!(
                        "stalled after {}ms",
                        self.config.stage_timeout_ms
                    ));
                    warn!(
                        "settlement of {} stalled in {} after {}ms",
                        id, stage, self.config.stage_timeout_ms
                    );
                    run.outcome = SettlementOutcome::Stalled { stage };
                    return Ok(run);
                }
                Ok(Err(join_error)) => {
                    return Err(BookingError::InternalError(format!(
                        "settlement stage {} failed to join: {}",
                        stage, join_error
                    )));
                }
                Ok(Ok(())) => {
                    run.stages[index].state = StageState::Done;
                    debug!("settlement of {}: {} done", id, stage);
                }
            }
        }

        // Final hand-off. A cancellation that landed during the last
        // stage shows up here as an illegal transition and wins.
        match self.ledger.confirm_payment(id).await {
            Ok(confirmed) => {
                let split = self.compute_commission_split(confirmed.price);
                self.subscriptions.activate(&confirmed.provider_id).await;
                info!(
                    "settled {}: {} to provider {}, {} to platform",
                    id, split.provider_share, confirmed.provider_id, split.platform_share
                );
                run.outcome = SettlementOutcome::Confirmed { split };
                Ok(run)
            }
            Err(BookingError::InvalidTransition { .. }) => {
                match self.ledger.get(id).await?.status {
                    AppointmentStatus::Cancelled => {
                        warn!("settlement of {} aborted at hand-off: cancelled", id);
                        run.outcome = SettlementOutcome::AbortedByCancellation;
                        Ok(run)
                    }
                    AppointmentStatus::Confirmed => {
                        run.outcome = SettlementOutcome::AlreadySettled;
                        Ok(run)
                    }
                    status => Err(BookingError::InternalError(format!(
                        "appointment {} reached {} during settlement",
                        id, status
                    ))),
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Totals owed across every confirmed appointment.
    pub async fn payout_summary(&self) -> PayoutSummary {
        let confirmed = self
            .ledger
            .list_by_status(AppointmentStatus::Confirmed)
            .await;
        let mut summary = PayoutSummary {
            confirmed_appointments: confirmed.len(),
            gross: Money::ZERO,
            provider_share: Money::ZERO,
            platform_share: Money::ZERO,
        };
        for appointment in &confirmed {
            let split = split_commission(appointment.price);
            summary.gross += appointment.price;
            summary.provider_share += split.provider_share;
            summary.platform_share += split.platform_share;
        }
        summary
    }
}

/// Stand-in for one payment-gateway leg.
async fn simulate_stage(delay: std::time::Duration) {
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use models::{Actor, PatientId, ProviderId, ServiceMode, SubscriptionPlan, SubscriptionStatus};
    use std::str::FromStr;
    use storage::MemoryStore;

    use crate::registry::ProviderRegistry;

    fn fast_config() -> SettlementConfig {
        SettlementConfig {
            stage_delay_ms: 5,
            stage_timeout_ms: 1_000,
        }
    }

    fn friday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, 4).unwrap()
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    struct Fixture {
        ledger: Arc<AppointmentLedger>,
        subscriptions: Arc<SubscriptionService>,
        orchestrator: Arc<PaymentOrchestrator>,
    }

    async fn fixture(config: SettlementConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let registry = ProviderRegistry::open(store.clone(), "test", true)
            .await
            .unwrap();
        let ledger = AppointmentLedger::open(store.clone(), "test", registry)
            .await
            .unwrap();
        let subscriptions = SubscriptionService::open(store, "test").await.unwrap();
        let orchestrator =
            PaymentOrchestrator::new(ledger.clone(), subscriptions.clone(), config);
        Fixture {
            ledger,
            subscriptions,
            orchestrator,
        }
    }

    async fn booked(fix: &Fixture) -> AppointmentId {
        fix.ledger
            .book(
                ProviderId::from_str("md-cortes").unwrap(),
                PatientId::from_str("pat-1").unwrap(),
                friday(),
                at(9, 45),
                ServiceMode::InPerson,
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn should_settle_and_split_eighty_twenty() {
        let fix = fixture(fast_config()).await;
        let id = booked(&fix).await;

        let run = fix.orchestrator.run_settlement(id).await.unwrap();
        assert!(run.stages.iter().all(|s| s.state == StageState::Done));
        assert_eq!(
            run.outcome,
            SettlementOutcome::Confirmed {
                split: CommissionSplit {
                    provider_share: Money::from_cents(5_200),
                    platform_share: Money::from_cents(1_300),
                }
            }
        );
        let settled = fix.ledger.get(id).await.unwrap();
        assert_eq!(settled.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn should_activate_the_subscription_on_first_settlement() {
        let fix = fixture(fast_config()).await;
        let provider = ProviderId::from_str("md-cortes").unwrap();
        fix.subscriptions
            .enroll(provider.clone(), SubscriptionPlan::Pro)
            .await;

        let id = booked(&fix).await;
        fix.orchestrator.run_settlement(id).await.unwrap();

        let subscription = fix.subscriptions.get(&provider).await.unwrap();
        assert_eq!(subscription.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn should_report_already_settled_without_rerunning() {
        let fix = fixture(fast_config()).await;
        let id = booked(&fix).await;
        fix.orchestrator.run_settlement(id).await.unwrap();

        let rerun = fix.orchestrator.run_settlement(id).await.unwrap();
        assert_eq!(rerun.outcome, SettlementOutcome::AlreadySettled);
        assert!(rerun.stages.iter().all(|s| s.state == StageState::Pending));
    }

    #[tokio::test]
    async fn should_refuse_unpayable_appointments() {
        let fix = fixture(fast_config()).await;
        let id = booked(&fix).await;
        fix.ledger.mark_pending_acceptance(id).await.unwrap();

        let err = fix.orchestrator.run_settlement(id).await.unwrap_err();
        assert!(matches!(err, BookingError::NoActiveAppointment(_)));
    }

    #[tokio::test]
    async fn should_refuse_cancelled_appointments_outright() {
        let fix = fixture(fast_config()).await;
        let id = booked(&fix).await;
        fix.ledger.cancel(id, Actor::Patient).await.unwrap();

        let err = fix.orchestrator.run_settlement(id).await.unwrap_err();
        assert!(matches!(err, BookingError::NoActiveAppointment(_)));
    }

    #[tokio::test]
    async fn should_treat_unknown_appointments_as_not_payable() {
        let fix = fixture(fast_config()).await;

        let err = fix
            .orchestrator
            .run_settlement(AppointmentId::new(404))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NoActiveAppointment(_)));
    }

    #[tokio::test]
    async fn should_let_a_cancellation_win_mid_flight() {
        let fix = fixture(SettlementConfig {
            stage_delay_ms: 100,
            stage_timeout_ms: 5_000,
        })
        .await;
        let id = booked(&fix).await;

        let run_task = {
            let orchestrator = fix.orchestrator.clone();
            tokio::spawn(async move { orchestrator.run_settlement(id).await })
        };
        // Land the cancellation while the first stage is still sleeping.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        fix.ledger.cancel(id, Actor::Patient).await.unwrap();

        let run = run_task.await.unwrap().unwrap();
        assert_eq!(run.outcome, SettlementOutcome::AbortedByCancellation);
        let appointment = fix.ledger.get(id).await.unwrap();
        assert_eq!(appointment.status, AppointmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn should_report_a_stalled_stage_and_stay_retryable() {
        let fix = fixture(SettlementConfig {
            stage_delay_ms: 200,
            stage_timeout_ms: 10,
        })
        .await;
        let id = booked(&fix).await;

        let run = fix.orchestrator.run_settlement(id).await.unwrap();
        assert_eq!(
            run.outcome,
            SettlementOutcome::Stalled {
                stage: SettlementStage::Tokenization
            }
        );
        assert_eq!(run.stages[0].state, StageState::Error);
        assert!(run.stages[0].detail.as_deref().unwrap().contains("10ms"));

        // The appointment is still payable; a healthy retry settles it.
        let appointment = fix.ledger.get(id).await.unwrap();
        assert_eq!(appointment.status, AppointmentStatus::PendingPayment);

        let retry = PaymentOrchestrator::new(
            fix.ledger.clone(),
            fix.subscriptions.clone(),
            fast_config(),
        );
        let run = retry.run_settlement(id).await.unwrap();
        assert!(matches!(run.outcome, SettlementOutcome::Confirmed { .. }));
    }

    #[tokio::test]
    async fn should_sum_payouts_across_confirmed_appointments() {
        let fix = fixture(fast_config()).await;
        let first = booked(&fix).await;
        fix.orchestrator.run_settlement(first).await.unwrap();

        let second = fix
            .ledger
            .book(
                ProviderId::from_str("md-jurado").unwrap(),
                PatientId::from_str("pat-2").unwrap(),
                friday(),
                at(12, 30),
                ServiceMode::Virtual,
            )
            .await
            .unwrap()
            .id;
        fix.orchestrator.run_settlement(second).await.unwrap();

        // One more booking left unsettled must not count.
        fix.ledger
            .book(
                ProviderId::from_str("md-cortes").unwrap(),
                PatientId::from_str("pat-3").unwrap(),
                friday(),
                at(16, 15),
                ServiceMode::InPerson,
            )
            .await
            .unwrap();

        let summary = fix.orchestrator.payout_summary().await;
        assert_eq!(summary.confirmed_appointments, 2);
        assert_eq!(summary.gross, Money::from_cents(10_700));
        assert_eq!(summary.provider_share, Money::from_cents(8_560));
        assert_eq!(summary.platform_share, Money::from_cents(2_140));
    }
}
