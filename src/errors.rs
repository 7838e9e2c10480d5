//! Error types for the graph node SDK
//!
//! Callers can tell a misconfigured client, a schema problem (unresolvable
//! property), bad input and a chain failure apart by variant.

use crate::value_objects::{ChecksumAddress, NodeTypeId};
use thiserror::Error;

/// Result type for SDK operations
pub type GraphNodeResult<T> = Result<T, GraphNodeError>;

/// Result type for chain client calls
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors surfaced by the graph node client and its builders
#[derive(Debug, Error)]
pub enum GraphNodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Property '{key}' is not declared for node type {node_type_id}")]
    UnresolvedProperty { node_type_id: NodeTypeId, key: String },

    #[error("Invalid address: {0}")]
    Address(#[from] AddressError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

/// A client was used without the collaborator an operation needs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Wallet not initialized")]
    WalletNotInitialized,

    #[error("Contract not initialized")]
    ContractNotInitialized,

    #[error("Registry not initialized")]
    RegistryNotInitialized,

    #[error("No contract deployed at {0}")]
    ContractNotDeployed(ChecksumAddress),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Failures reported by the chain client, passed through unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Contract reverted in {method}: {reason}")]
    Reverted { method: String, reason: String },

    #[error("Could not decode result of {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl ChainError {
    pub(crate) fn decode(method: &str, reason: impl Into<String>) -> Self {
        ChainError::Decode {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

/// Input that cannot be normalized to a checksummed address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("{input:?} has {length} hex digits, expected 40")]
    InvalidLength { input: String, length: usize },

    #[error("{input:?} is not hexadecimal")]
    InvalidHex { input: String },
}
