use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use chainplan_core::{
    config::{Config, NetworkConfig},
    paths,
    record::{self, StepStatus, UnitStatus},
    ChainClient, DeploymentPlan, DeploymentRecord, FileRecordStore, Orchestrator,
};
use evm_client::{ArtifactStore, EvmClient, RpcOptions, SimulatedChain};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub fn run(
    root: &Path,
    network: &str,
    plan: Option<&Path>,
    retry_failed: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let net = config.network(network)?.clone();
    for warning in config.validate(root) {
        warn!("config: {}", warning.message);
    }

    let (plan_path, plan) = super::load_plan(root, &config, plan)?;
    plan.validate()
        .with_context(|| format!("{} is invalid", plan_path.display()))?;

    let store = FileRecordStore::for_network(root, network);
    let record_path = store.path().to_path_buf();
    let record = record::load_or_new(&store, network)
        .with_context(|| format!("failed to read {}", record_path.display()))?;

    if record.has_failures() {
        let failed = record.failures().join(", ");
        if !retry_failed {
            bail!(
                "the last run on '{network}' failed at: {failed}\n\
                 check whether that transaction had any on-chain effect, then re-run with --retry-failed"
            );
        }
        warn!(%failed, "retrying failed entries");
    }

    let remaining = remaining_steps(&plan, &record);
    let artifacts = ArtifactStore::new(paths::plan_path(root, &config.artifacts_dir));

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let record = rt
        .block_on(async {
            let cancel = CancellationToken::new();
            let token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted; stopping after the current step");
                    token.cancel();
                }
            });

            match &net {
                NetworkConfig::Simulated { from } => {
                    let mut chain = SimulatedChain::new(*from);
                    if artifacts.dir().is_dir() {
                        chain = chain.with_artifacts(artifacts);
                    }
                    let chain = chain.resume_from(&record);
                    drive(chain, store, &plan, record, cancel).await
                }
                NetworkConfig::JsonRpc {
                    url,
                    from,
                    chain_id,
                    confirmations,
                    gas,
                    ..
                } => {
                    let opts = RpcOptions {
                        chain_id: *chain_id,
                        confirmations: *confirmations,
                        poll_interval: net.poll_interval(),
                        receipt_timeout: net.receipt_timeout(),
                        request_timeout: net.request_timeout(),
                        gas: *gas,
                    };
                    let client = EvmClient::connect(url.clone(), *from, artifacts, opts)
                        .await
                        .with_context(|| format!("failed to connect to {url}"))?;
                    drive(client, store, &plan, record, cancel).await
                }
            }
        })
        .with_context(|| {
            format!(
                "run on '{network}' stopped; progress is saved in {}",
                record_path.display()
            )
        })?;

    if json {
        return print_json(&record);
    }

    if remaining == 0 {
        println!("{network}: already complete, nothing to do");
    } else {
        println!(
            "{network}: {remaining} step(s) completed, record saved to {}",
            record_path.display()
        );
    }
    let rows: Vec<Vec<String>> = record
        .units
        .iter()
        .map(|(name, entry)| {
            vec![
                name.clone(),
                entry.contract.to_string(),
                entry.address.map(|a| a.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    println!();
    print_table(&["UNIT", "CONTRACT", "ADDRESS"], &rows);
    Ok(())
}

async fn drive<C: ChainClient>(
    client: C,
    store: FileRecordStore,
    plan: &DeploymentPlan,
    record: DeploymentRecord,
    cancel: CancellationToken,
) -> anyhow::Result<DeploymentRecord> {
    let record = Orchestrator::new(client, store)
        .with_cancellation(cancel)
        .run(plan, record)
        .await?;
    Ok(record)
}

/// Units and wiring steps a run would still have to execute.
fn remaining_steps(plan: &DeploymentPlan, record: &DeploymentRecord) -> usize {
    let units = plan
        .units
        .iter()
        .filter(|u| record.unit_status(&u.name) != UnitStatus::Deployed)
        .count();
    let steps = (0..plan.wiring.len())
        .filter(|&i| record.step_status(i) != StepStatus::Applied)
        .count();
    units + steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use chainplan_core::{Arg, DeployableUnit, WiringStep};

    #[test]
    fn remaining_counts_incomplete_units_and_steps() {
        let plan = DeploymentPlan::new(
            vec![
                DeployableUnit::new("a", "A", vec![]),
                DeployableUnit::new("b", "B", vec![Arg::unit("a")]),
            ],
            vec![WiringStep::new("a", "setB", vec![Arg::unit("b")])],
        );
        let mut record = DeploymentRecord::new("development");
        assert_eq!(remaining_steps(&plan, &record), 3);

        let a = &plan.units[0];
        record.mark_deployed("a", &a.contract, Address::repeat_byte(1), None, 0);
        assert_eq!(remaining_steps(&plan, &record), 2);
    }
}
