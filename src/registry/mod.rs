//! Node type registry client
//!
//! Read-only lookups against the shared NodeTypeRegistry contract. Every call is a
//! fresh read of chain state; nothing is cached between calls.

use crate::chain::{decode, ChainClient, ContractHandle};
use crate::errors::{GraphNodeError, GraphNodeResult};
use crate::value_objects::{ChecksumAddress, EdgeTypeId, NodeTypeId, PropertyId};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Node type lookup result
///
/// `exists == false` means the id is not registered, which is different from
/// the lookup failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeInfo {
    pub node_type_id: NodeTypeId,
    pub exists: bool,
}

/// Edge type lookup result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTypeInfo {
    pub edge_id: EdgeTypeId,
    pub exists: bool,
}

/// Handle to a deployed NodeTypeRegistry
#[derive(Debug, Clone)]
pub struct NodeTypeRegistryClient {
    contract: ContractHandle,
    debug: bool,
}

impl NodeTypeRegistryClient {
    /// Bind to the registry at `address`
    ///
    /// Fails when the address is malformed or has no contract behind it.
    pub async fn connect(
        chain: Arc<dyn ChainClient>,
        address: &str,
        debug: bool,
    ) -> GraphNodeResult<Self> {
        let address = ChecksumAddress::parse(address)?;
        let contract = ContractHandle::bind(chain, address).await?;
        if debug {
            tracing::info!(registry = %contract.address(), "Connected to node type registry");
        }
        Ok(Self { contract, debug })
    }

    pub fn address(&self) -> &ChecksumAddress {
        self.contract.address()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Registry id of `property_key` for `node_type_id`
    ///
    /// A zero id means the key is not declared for that type and comes back as
    /// [`GraphNodeError::UnresolvedProperty`].
    pub async fn resolve_property_id(
        &self,
        node_type_id: &NodeTypeId,
        property_key: &str,
    ) -> GraphNodeResult<PropertyId> {
        const METHOD: &str = "propertyId";
        let raw = self
            .contract
            .call(METHOD, vec![json!(node_type_id), json!(property_key)])
            .await?;
        let property_id = PropertyId::new(decode::string(METHOD, &raw)?);

        if property_id.is_unset() {
            return Err(GraphNodeError::UnresolvedProperty {
                node_type_id: node_type_id.clone(),
                key: property_key.to_string(),
            });
        }

        tracing::debug!(%node_type_id, property_key, %property_id, "Resolved property id");
        Ok(property_id)
    }

    pub async fn get_edge_type_by_id(&self, edge_type_id: &EdgeTypeId) -> GraphNodeResult<EdgeTypeInfo> {
        const METHOD: &str = "getEdgeById";
        let raw = self.contract.call(METHOD, vec![json!(edge_type_id)]).await?;
        let fields = decode::tuple(METHOD, &raw, 2)?;
        Ok(EdgeTypeInfo {
            edge_id: EdgeTypeId::new(decode::string(METHOD, &fields[0])?),
            exists: decode::boolean(METHOD, &fields[1])?,
        })
    }

    pub async fn get_node_type(&self, node_type_id: &NodeTypeId) -> GraphNodeResult<NodeTypeInfo> {
        const METHOD: &str = "getNodeType";
        let raw = self.contract.call(METHOD, vec![json!(node_type_id)]).await?;
        let fields = decode::tuple(METHOD, &raw, 2)?;
        Ok(NodeTypeInfo {
            node_type_id: NodeTypeId::new(decode::string(METHOD, &fields[0])?),
            exists: decode::boolean(METHOD, &fields[1])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemoryChain;
    use crate::errors::{ChainError, ConfigError};

    async fn registry_with_person() -> (Arc<InMemoryChain>, NodeTypeRegistryClient, NodeTypeId) {
        let chain = Arc::new(InMemoryChain::new());
        let address = chain.deploy_registry();
        let node_type_id = chain
            .register_node_type(&address, "Person", &["name"])
            .unwrap();
        let client = NodeTypeRegistryClient::connect(chain.clone(), address.as_str(), false)
            .await
            .unwrap();
        (chain, client, node_type_id)
    }

    #[tokio::test]
    async fn test_connect_rejects_missing_contract() {
        let chain = Arc::new(InMemoryChain::new());
        let result = NodeTypeRegistryClient::connect(
            chain,
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            false,
        )
        .await;

        assert!(matches!(
            result,
            Err(GraphNodeError::Config(ConfigError::ContractNotDeployed(_)))
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_address() {
        let chain = Arc::new(InMemoryChain::new());
        let result = NodeTypeRegistryClient::connect(chain, "not-an-address", false).await;
        assert!(matches!(result, Err(GraphNodeError::Address(_))));
    }

    #[tokio::test]
    async fn test_resolve_declared_property() {
        let (_chain, client, node_type_id) = registry_with_person().await;
        let id = client.resolve_property_id(&node_type_id, "name").await.unwrap();
        assert!(!id.is_unset());
    }

    #[tokio::test]
    async fn test_undeclared_property_is_a_resolution_miss() {
        let (_chain, client, node_type_id) = registry_with_person().await;
        let result = client.resolve_property_id(&node_type_id, "email").await;

        match result {
            Err(GraphNodeError::UnresolvedProperty { key, node_type_id: id }) => {
                assert_eq!(key, "email");
                assert_eq!(id, node_type_id);
            }
            other => panic!("Expected UnresolvedProperty, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_a_resolution_miss() {
        let (chain, client, node_type_id) = registry_with_person().await;
        chain.fail_method("propertyId", ChainError::Transport("timeout".into()));

        let result = client.resolve_property_id(&node_type_id, "name").await;
        assert!(matches!(result, Err(GraphNodeError::Chain(ChainError::Transport(_)))));
    }

    #[tokio::test]
    async fn test_type_existence_lookups() {
        let chain = Arc::new(InMemoryChain::new());
        let address = chain.deploy_registry();
        let node_type_id = chain.register_node_type(&address, "Org", &[]).unwrap();
        let edge_type_id = chain.register_edge_type(&address, "member_of").unwrap();
        let client = NodeTypeRegistryClient::connect(chain, address.as_str(), true)
            .await
            .unwrap();

        let node_type = client.get_node_type(&node_type_id).await.unwrap();
        assert!(node_type.exists);
        assert_eq!(node_type.node_type_id, node_type_id);

        let missing = client.get_node_type(&NodeTypeId::new("0x99")).await.unwrap();
        assert!(!missing.exists);

        let edge_type = client.get_edge_type_by_id(&edge_type_id).await.unwrap();
        assert!(edge_type.exists);

        let missing = client.get_edge_type_by_id(&EdgeTypeId::new("0x98")).await.unwrap();
        assert!(!missing.exists);
    }
}
