pub mod client;
pub mod config;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod plan;
pub mod record;
pub mod types;

pub use client::{CallReceipt, ChainClient, Deployment};
pub use error::{ChainplanError, ClientError, DeployError, PlanError, Result};
pub use orchestrator::Orchestrator;
pub use plan::{DeployableUnit, DeploymentPlan, WiringStep};
pub use record::{DeploymentRecord, FileRecordStore, MemoryRecordStore, RecordStore};
pub use types::{Arg, ContractType, MethodSig, ParamType, Token};
