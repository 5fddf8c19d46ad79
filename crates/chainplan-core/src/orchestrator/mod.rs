//! Resumable deployment orchestrator.
//!
//! `Orchestrator::run` walks a validated plan strictly in order: units in
//! execution order, then wiring steps. Every unit or step already completed
//! in the record is skipped, so re-running after any interruption continues
//! with exactly the first incomplete item. The record is persisted after
//! each external call and before the next one starts.

pub mod progress;

pub use progress::{progress, ItemKind, ProgressItem};

use crate::client::ChainClient;
use crate::error::DeployError;
use crate::plan::{execution_order, validate, DeployableUnit, DeploymentPlan};
use crate::record::{DeploymentRecord, RecordStore, StepStatus, UnitStatus};
use crate::types::{Arg, MethodSig, Token};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Orchestrator<C, S> {
    client: C,
    store: S,
    cancel: CancellationToken,
}

impl<C: ChainClient, S: RecordStore> Orchestrator<C, S> {
    pub fn new(client: C, store: S) -> Self {
        Self {
            client,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop before the next external call once `token` is cancelled.
    /// An in-flight transaction is always awaited to completion.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (C, S) {
        (self.client, self.store)
    }

    /// Drive `plan` to completion starting from `record`.
    ///
    /// `Failed` entries are re-attempted like `Pending` ones; deciding
    /// whether that is safe is up to the caller.
    pub async fn run(
        &mut self,
        plan: &DeploymentPlan,
        mut record: DeploymentRecord,
    ) -> Result<DeploymentRecord, DeployError> {
        validate(plan)?;
        let order = execution_order(plan)?;
        check_consistency(plan, &order, &record)?;

        let mut position = 0;

        for unit in order {
            if record.unit_status(&unit.name) == UnitStatus::Deployed {
                position += 1;
                continue;
            }
            self.checkpoint(position)?;

            let args = resolve(&unit.args, &record, &format!("unit '{}'", unit.name))?;
            info!(unit = %unit.name, contract = %unit.contract, "deploying");

            match self.client.deploy(&unit.contract, &args).await {
                Ok(deployment) => {
                    record.mark_deployed(
                        &unit.name,
                        &unit.contract,
                        deployment.address,
                        deployment.tx_hash,
                        position,
                    );
                    if let Err(e) = self.store.save(&record) {
                        error!(
                            unit = %unit.name,
                            address = %deployment.address,
                            "deployed but the record could not be saved; keep this address"
                        );
                        return Err(DeployError::Persist(e));
                    }
                    info!(unit = %unit.name, address = %deployment.address, "deployed");
                }
                Err(cause) => {
                    warn!(unit = %unit.name, error = %cause, "deploy failed");
                    record.mark_unit_failed(&unit.name, &unit.contract, cause.to_string());
                    self.store.save(&record).map_err(DeployError::Persist)?;
                    return Err(DeployError::UnitFailed {
                        unit: unit.name.clone(),
                        cause,
                    });
                }
            }
            position += 1;
        }

        for (index, step) in plan.wiring.iter().enumerate() {
            if record.step_status(index) == StepStatus::Applied {
                position += 1;
                continue;
            }
            self.checkpoint(position)?;

            let label = step.label();
            let context = format!("wiring step {index} ({label})");
            let target = record.address_of(&step.target).ok_or_else(|| {
                DeployError::RecordMismatch(format!(
                    "{context}: target '{}' has no deployed address",
                    step.target
                ))
            })?;
            let args = resolve(&step.args, &record, &context)?;
            let method = MethodSig::resolve(&step.method, &step.args).map_err(|reason| {
                crate::error::PlanError::InvalidMethod {
                    context: context.clone(),
                    method: step.method.clone(),
                    reason,
                }
            })?;
            info!(step = index, target = %step.target, method = %method, "applying");

            match self.client.call(target, &method, &args).await {
                Ok(receipt) => {
                    record.mark_applied(index, label, receipt.tx_hash, position);
                    self.store.save(&record).map_err(DeployError::Persist)?;
                    info!(step = index, "applied");
                }
                Err(cause) => {
                    warn!(step = index, error = %cause, "wiring call failed");
                    record.mark_step_failed(index, label.clone(), cause.to_string());
                    self.store.save(&record).map_err(DeployError::Persist)?;
                    return Err(DeployError::WiringFailed {
                        index,
                        label,
                        cause,
                    });
                }
            }
            position += 1;
        }

        Ok(record)
    }

    fn checkpoint(&self, completed: usize) -> Result<(), DeployError> {
        if self.cancel.is_cancelled() {
            info!(completed, "cancellation requested, stopping before next step");
            return Err(DeployError::Cancelled { completed });
        }
        Ok(())
    }
}

/// One-shot form of [`Orchestrator::run`] without cancellation.
pub async fn run<C: ChainClient, S: RecordStore>(
    client: C,
    store: S,
    plan: &DeploymentPlan,
    record: DeploymentRecord,
) -> Result<DeploymentRecord, DeployError> {
    Orchestrator::new(client, store).run(plan, record).await
}

/// Substitute recorded addresses for unit references.
fn resolve(args: &[Arg], record: &DeploymentRecord, context: &str) -> Result<Vec<Token>, DeployError> {
    args.iter()
        .map(|arg| match arg {
            Arg::Literal(token) => Ok(*token),
            Arg::Ref(name) => record.address_of(name).map(Token::Address).ok_or_else(|| {
                DeployError::RecordMismatch(format!(
                    "{context}: referenced unit '{name}' has no deployed address"
                ))
            }),
        })
        .collect()
}

/// A record written for a different plan would make the run skip work that
/// was never done, so refuse it before touching the chain.
fn check_consistency(
    plan: &DeploymentPlan,
    order: &[&DeployableUnit],
    record: &DeploymentRecord,
) -> Result<(), DeployError> {
    for unit in order {
        if let Some(entry) = record.units.get(&unit.name) {
            if entry.contract != unit.contract {
                return Err(DeployError::RecordMismatch(format!(
                    "unit '{}' was recorded as {}, plan says {}",
                    unit.name, entry.contract, unit.contract
                )));
            }
            if entry.status == UnitStatus::Deployed && entry.address.is_none() {
                return Err(DeployError::RecordMismatch(format!(
                    "unit '{}' is marked deployed without an address",
                    unit.name
                )));
            }
        }
    }

    for name in record.units.keys() {
        if plan.unit(name).is_none() {
            warn!(unit = %name, "record has a unit the plan no longer declares");
        }
    }

    if record.steps.len() > plan.wiring.len() {
        return Err(DeployError::RecordMismatch(format!(
            "record has {} wiring step(s), plan has {}",
            record.steps.len(),
            plan.wiring.len()
        )));
    }
    for (index, (entry, step)) in record.steps.iter().zip(&plan.wiring).enumerate() {
        let label = step.label();
        if entry.label != label {
            return Err(DeployError::RecordMismatch(format!(
                "wiring step {index} was recorded as '{}', plan says '{label}'",
                entry.label
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
