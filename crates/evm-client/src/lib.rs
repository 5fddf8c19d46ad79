//! `evm-client`: chain drivers for the chainplan orchestrator.
//!
//! Two implementations of [`chainplan_core::ChainClient`]:
//!
//! ```text
//! EvmClient        ← JSON-RPC over HTTP: eth_sendTransaction, then polls
//!                    eth_getTransactionReceipt until final
//! SimulatedChain   ← in-process, deterministic CREATE addresses; for
//!                    rehearsing a plan without a node
//! ```
//!
//! Both encode arguments with the static ABI encoder in [`abi`] and read
//! creation bytecode through [`ArtifactStore`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use chainplan_core::{DeploymentPlan, DeploymentRecord, FileRecordStore, Orchestrator};
//! use evm_client::{ArtifactStore, EvmClient, RpcOptions};
//!
//! let client = EvmClient::connect(url, from, ArtifactStore::new("build/contracts"), RpcOptions::default()).await?;
//! let store = FileRecordStore::for_network(root, "bsc_testnet");
//! let record = Orchestrator::new(client, store).run(&plan, DeploymentRecord::new("bsc_testnet")).await?;
//! ```

pub mod abi;
pub mod artifacts;
pub mod error;
pub mod rpc;
pub mod simulated;

pub use artifacts::ArtifactStore;
pub use error::EvmError;
pub use rpc::{EvmClient, RpcOptions};
pub use simulated::SimulatedChain;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, EvmError>;
