//! The seam between the orchestrator and a chain.

use crate::error::ClientError;
use crate::types::{ContractType, MethodSig, Token};
use alloy_primitives::{Address, B256};
use std::future::Future;

/// Outcome of a confirmed contract creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub tx_hash: Option<B256>,
}

/// Outcome of a confirmed method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallReceipt {
    pub tx_hash: Option<B256>,
}

/// Submits transactions and waits for them to be final.
///
/// Both operations resolve only once the transaction is confirmed. The
/// orchestrator treats every error as opaque and never retries on its own.
pub trait ChainClient {
    fn deploy(
        &self,
        contract: &ContractType,
        args: &[Token],
    ) -> impl Future<Output = Result<Deployment, ClientError>> + Send;

    fn call(
        &self,
        target: Address,
        method: &MethodSig,
        args: &[Token],
    ) -> impl Future<Output = Result<CallReceipt, ClientError>> + Send;
}

impl<C: ChainClient> ChainClient for &C {
    fn deploy(
        &self,
        contract: &ContractType,
        args: &[Token],
    ) -> impl Future<Output = Result<Deployment, ClientError>> + Send {
        (**self).deploy(contract, args)
    }

    fn call(
        &self,
        target: Address,
        method: &MethodSig,
        args: &[Token],
    ) -> impl Future<Output = Result<CallReceipt, ClientError>> + Send {
        (**self).call(target, method, args)
    }
}
