//! Chain client boundary
//!
//! The SDK never talks to an RPC endpoint itself. Everything that leaves the
//! process goes through a [`ChainClient`], which invokes ABI methods by name and
//! hands back decoded values. Each call either applies fully on-chain or fails.

pub mod memory;

pub use memory::{CallRecord, InMemoryChain};

use crate::errors::{ChainError, ChainResult, ConfigError, GraphNodeResult};
use crate::value_objects::ChecksumAddress;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Whether a contract method ran as a read or as a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Call,
    Send,
}

/// Transport to a chain node
///
/// Retries, timeouts and signing are the implementor's concern.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Endpoint this client talks to
    fn rpc_url(&self) -> &str;

    /// Load a signing identity from a private key and return its address
    async fn import_account(&self, private_key: &str) -> ChainResult<ChecksumAddress>;

    /// True when contract code is deployed at `address`
    async fn has_code(&self, address: &ChecksumAddress) -> ChainResult<bool>;

    /// Read-only method call against current chain state
    async fn call(
        &self,
        contract: &ChecksumAddress,
        method: &str,
        args: Vec<Value>,
    ) -> ChainResult<Value>;

    /// Submit a transaction from `from` and return the method's decoded result
    async fn send(
        &self,
        contract: &ChecksumAddress,
        from: &ChecksumAddress,
        method: &str,
        args: Vec<Value>,
    ) -> ChainResult<Value>;
}

/// A contract address bound to the chain client that reaches it
#[derive(Clone)]
pub struct ContractHandle {
    address: ChecksumAddress,
    chain: Arc<dyn ChainClient>,
}

impl ContractHandle {
    /// Bind to `address`, failing when no contract is deployed there
    pub async fn bind(chain: Arc<dyn ChainClient>, address: ChecksumAddress) -> GraphNodeResult<Self> {
        if !chain.has_code(&address).await? {
            return Err(ConfigError::ContractNotDeployed(address).into());
        }
        Ok(Self { address, chain })
    }

    pub fn address(&self) -> &ChecksumAddress {
        &self.address
    }

    pub async fn call(&self, method: &str, args: Vec<Value>) -> ChainResult<Value> {
        tracing::debug!(contract = %self.address, method, kind = "call", "Chain call");
        self.chain.call(&self.address, method, args).await
    }

    pub async fn send(
        &self,
        from: &ChecksumAddress,
        method: &str,
        args: Vec<Value>,
    ) -> ChainResult<Value> {
        tracing::debug!(contract = %self.address, %from, method, kind = "send", "Chain transaction");
        self.chain.send(&self.address, from, method, args).await
    }
}

impl fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("address", &self.address)
            .field("rpc_url", &self.chain.rpc_url())
            .finish()
    }
}

/// Positional decoding helpers for ABI tuples returned as JSON arrays
pub(crate) mod decode {
    use super::*;

    pub fn string(method: &str, value: &Value) -> ChainResult<String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(ChainError::decode(method, format!("expected string, got {other}"))),
        }
    }

    pub fn boolean(method: &str, value: &Value) -> ChainResult<bool> {
        value
            .as_bool()
            .ok_or_else(|| ChainError::decode(method, format!("expected bool, got {value}")))
    }

    pub fn small_uint(method: &str, value: &Value) -> ChainResult<u8> {
        value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| ChainError::decode(method, format!("expected uint8, got {value}")))
    }

    pub fn address(method: &str, value: &Value) -> ChainResult<ChecksumAddress> {
        let raw = string(method, value)?;
        ChecksumAddress::parse(&raw).map_err(|e| ChainError::decode(method, e.to_string()))
    }

    pub fn tuple<'a>(method: &str, value: &'a Value, min_len: usize) -> ChainResult<&'a [Value]> {
        match value.as_array() {
            Some(items) if items.len() >= min_len => Ok(items),
            _ => Err(ChainError::decode(
                method,
                format!("expected tuple of at least {min_len} fields, got {value}"),
            )),
        }
    }

    pub fn list<'a>(method: &str, value: &'a Value) -> ChainResult<&'a [Value]> {
        value
            .as_array()
            .map(|items| items.as_slice())
            .ok_or_else(|| ChainError::decode(method, format!("expected array, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bind_requires_deployed_code() {
        let chain = Arc::new(InMemoryChain::new());
        let empty = ChecksumAddress::from_bytes([0x11; 20]);

        let result = ContractHandle::bind(chain.clone(), empty.clone()).await;
        match result {
            Err(crate::GraphNodeError::Config(ConfigError::ContractNotDeployed(address))) => {
                assert_eq!(address, empty);
            }
            other => panic!("Expected ContractNotDeployed, got {other:?}"),
        }

        let registry = chain.deploy_registry();
        let handle = ContractHandle::bind(chain, registry.clone()).await.unwrap();
        assert_eq!(handle.address(), &registry);
    }

    #[test]
    fn test_decode_helpers() {
        assert_eq!(decode::string("m", &json!("abc")).unwrap(), "abc");
        assert_eq!(decode::string("m", &json!(7)).unwrap(), "7");
        assert!(decode::boolean("m", &json!("yes")).is_err());
        assert_eq!(decode::small_uint("m", &json!(3)).unwrap(), 3);
        assert!(decode::small_uint("m", &json!(300)).is_err());
        assert!(decode::tuple("m", &json!([1]), 2).is_err());
        assert_eq!(decode::tuple("m", &json!([1, 2, 3]), 2).unwrap().len(), 3);
    }
}
