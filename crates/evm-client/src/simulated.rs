use std::collections::HashSet;
use std::sync::Mutex;

use alloy_primitives::{keccak256, Address, B256};
use chainplan_core::record::{DeploymentRecord, StepStatus, UnitStatus};
use chainplan_core::{
    CallReceipt, ChainClient, ClientError, ContractType, Deployment, MethodSig, Token,
};
use tracing::info;

use crate::abi;
use crate::artifacts::ArtifactStore;
use crate::EvmError;

// ─── SimulatedChain ───────────────────────────────────────────────────────

/// In-process chain for rehearsing a plan.
///
/// Contract addresses follow the CREATE rule (sender + nonce), every
/// transaction consumes one nonce, and calls are only accepted on addresses
/// this chain created. With an [`ArtifactStore`] attached, deploys also fail
/// when the artifact is missing, which catches typos before a real run.
pub struct SimulatedChain {
    from: Address,
    artifacts: Option<ArtifactStore>,
    state: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    nonce: u64,
    contracts: HashSet<Address>,
}

impl SimulatedChain {
    pub fn new(from: Address) -> Self {
        Self {
            from,
            artifacts: None,
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Continue where a previous rehearsal stopped: one nonce per completed
    /// unit or step, and every recorded address counts as deployed.
    pub fn resume_from(self, record: &DeploymentRecord) -> Self {
        {
            let mut state = self.lock();
            let deployed = record
                .units
                .values()
                .filter(|e| e.status == UnitStatus::Deployed);
            for entry in deployed {
                state.nonce += 1;
                state.contracts.extend(entry.address);
            }
            state.nonce += record
                .steps
                .iter()
                .filter(|e| e.status == StepStatus::Applied)
                .count() as u64;
        }
        self
    }

    pub fn nonce(&self) -> u64 {
        self.lock().nonce
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // state is plain data; a panic mid-update cannot leave it torn
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tx_hash(&self, nonce: u64, data: &[u8]) -> B256 {
        let mut preimage = self.from.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(data);
        keccak256(preimage)
    }

    fn deploy_inner(&self, contract: &ContractType, args: &[Token]) -> crate::Result<Deployment> {
        let bytecode = match &self.artifacts {
            Some(store) => store.bytecode(contract)?,
            None => contract.as_str().as_bytes().to_vec(),
        };
        let data = abi::encode_constructor(&bytecode, args);

        let mut state = self.lock();
        let nonce = state.nonce;
        let address = self.from.create(nonce);
        state.nonce += 1;
        state.contracts.insert(address);
        drop(state);

        info!(%contract, %address, nonce, "simulated deploy");
        Ok(Deployment {
            address,
            tx_hash: Some(self.tx_hash(nonce, &data)),
        })
    }

    fn call_inner(
        &self,
        target: Address,
        method: &MethodSig,
        args: &[Token],
    ) -> crate::Result<CallReceipt> {
        let data = abi::encode_call(method, args)?;

        let mut state = self.lock();
        if !state.contracts.contains(&target) {
            return Err(EvmError::Simulated(format!("no contract at {target}")));
        }
        let nonce = state.nonce;
        state.nonce += 1;
        drop(state);

        info!(%target, %method, nonce, "simulated call");
        Ok(CallReceipt {
            tx_hash: Some(self.tx_hash(nonce, &data)),
        })
    }
}

impl ChainClient for SimulatedChain {
    async fn deploy(
        &self,
        contract: &ContractType,
        args: &[Token],
    ) -> Result<Deployment, ClientError> {
        Ok(self.deploy_inner(contract, args)?)
    }

    async fn call(
        &self,
        target: Address,
        method: &MethodSig,
        args: &[Token],
    ) -> Result<CallReceipt, ClientError> {
        Ok(self.call_inner(target, method, args)?)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use chainplan_core::record::MemoryRecordStore;
    use chainplan_core::{Arg, DeployableUnit, DeploymentPlan, Orchestrator, WiringStep};
    use tempfile::TempDir;

    const FROM: Address = address!("90f8bf6a479f320ead074411a4b0e7944ea8c9c1");

    #[tokio::test]
    async fn addresses_follow_create_rule() {
        let chain = SimulatedChain::new(FROM);
        let first = chain.deploy(&ContractType::new("A"), &[]).await.unwrap();
        let second = chain.deploy(&ContractType::new("B"), &[]).await.unwrap();
        // first contract of the well-known ganache account
        assert_eq!(
            first.address,
            address!("e78a0f7e598cc8b0bb87894b0f60dd2a88d6a8ab")
        );
        assert_eq!(second.address, FROM.create(1));
        assert_eq!(chain.nonce(), 2);
    }

    #[tokio::test]
    async fn call_on_unknown_address_fails() {
        let chain = SimulatedChain::new(FROM);
        let method = MethodSig::resolve("setManager(address)", &[]).unwrap();
        let err = chain
            .call(Address::ZERO, &method, &[Token::Address(FROM)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no contract at"));
    }

    #[tokio::test]
    async fn missing_artifact_fails_deploy() {
        let dir = TempDir::new().unwrap();
        let chain = SimulatedChain::new(FROM).with_artifacts(ArtifactStore::new(dir.path()));
        let err = chain
            .deploy(&ContractType::new("VaultManager"), &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("VaultManager"));
        assert_eq!(chain.nonce(), 0);
    }

    #[tokio::test]
    async fn resumed_chain_continues_nonce_sequence() {
        let plan = DeploymentPlan::new(
            vec![
                DeployableUnit::new("controller", "VaultController", vec![]),
                DeployableUnit::new("strategy", "VaultStrategy", vec![Arg::unit("controller")]),
            ],
            vec![WiringStep::new(
                "controller",
                "setStrategy",
                vec![Arg::unit("strategy")],
            )],
        );

        let full = Orchestrator::new(SimulatedChain::new(FROM), MemoryRecordStore::new())
            .run(&plan, DeploymentRecord::new("development"))
            .await
            .unwrap();

        // a record that stopped after the first unit
        let mut partial = DeploymentRecord::new("development");
        let controller = &full.units["controller"];
        partial.mark_deployed(
            "controller",
            &controller.contract,
            controller.address.unwrap(),
            None,
            0,
        );

        let chain = SimulatedChain::new(FROM).resume_from(&partial);
        assert_eq!(chain.nonce(), 1);
        let resumed = Orchestrator::new(&chain, MemoryRecordStore::new())
            .run(&plan, partial)
            .await
            .unwrap();
        assert_eq!(resumed.address_of("strategy"), full.address_of("strategy"));
        assert_eq!(chain.nonce(), 3);
    }
}
