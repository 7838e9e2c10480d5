//! Graph node client
//!
//! The only component that mutates on-chain graph state. A client is bound to one
//! GraphNode contract and the registry that types it, and tracks which node the
//! current session has registered.
//!
//! Session state is not guarded against interleaving: two builders sharing one
//! client must not commit concurrently.

use crate::builders::{EdgeBuilder, NodeBuilder};
use crate::chain::{decode, ChainClient, ContractHandle};
use crate::config::GraphNodeConfig;
use crate::errors::{ConfigError, GraphNodeError, GraphNodeResult};
use crate::registry::NodeTypeRegistryClient;
use crate::value_objects::{
    ChecksumAddress, DocumentId, EdgeId, EdgeStatus, NodeId, NodeTypeId, Property, PropertyId,
    PropertyType,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// The node a session is working against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeBinding {
    pub node_id: NodeId,
    pub node_type_id: NodeTypeId,
    pub graph_node_name: String,
}

/// Stored edge as returned by `getEdge`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub from: ChecksumAddress,
    pub to: ChecksumAddress,
    pub descriptor: String,
    pub status: EdgeStatus,
    pub edge_id: Option<EdgeId>,
    pub edge_name: Option<String>,
}

impl EdgeRecord {
    fn decode(method: &str, raw: &Value) -> GraphNodeResult<Self> {
        let fields = decode::tuple(method, raw, 4)?;
        let status = EdgeStatus::try_from(decode::small_uint(method, &fields[3])?)
            .map_err(|reason| crate::errors::ChainError::decode(method, reason))?;

        Ok(Self {
            from: decode::address(method, &fields[0])?,
            to: decode::address(method, &fields[1])?,
            descriptor: decode::string(method, &fields[2])?,
            status,
            edge_id: fields
                .get(4)
                .map(|v| decode::string(method, v).map(EdgeId::new))
                .transpose()?,
            edge_name: fields.get(5).map(|v| decode::string(method, v)).transpose()?,
        })
    }
}

/// Session handle to one GraphNode contract
pub struct GraphNodeClient {
    chain: Arc<dyn ChainClient>,
    account: Option<ChecksumAddress>,
    contract: Option<ContractHandle>,
    registry: Option<NodeTypeRegistryClient>,
    session: RwLock<Option<NodeBinding>>,
    debug: bool,
}

impl GraphNodeClient {
    /// Resolve `config` against `chain` and build a client
    ///
    /// Anything the config leaves out stays unbound and is reported as a
    /// configuration error by the operations that need it. A node address needs
    /// a private key to go with it.
    pub async fn connect(config: GraphNodeConfig, chain: Arc<dyn ChainClient>) -> GraphNodeResult<Self> {
        let account = match &config.private_key {
            Some(key) => Some(chain.import_account(key).await?),
            None => None,
        };

        let contract = match &config.node_address {
            Some(raw) => {
                if account.is_none() {
                    return Err(ConfigError::WalletNotInitialized.into());
                }
                let address = ChecksumAddress::parse(raw)?;
                Some(ContractHandle::bind(chain.clone(), address).await?)
            }
            None => None,
        };

        let registry = match &config.node_type_registry_address {
            Some(raw) => Some(NodeTypeRegistryClient::connect(chain.clone(), raw, config.debug).await?),
            None => None,
        };

        if config.debug {
            tracing::info!(
                rpc_url = chain.rpc_url(),
                network = config.network.rpc_url(),
                account = ?account,
                node = ?contract.as_ref().map(|c| c.address().to_string()),
                registry = ?registry.as_ref().map(|r| r.address().to_string()),
                "Graph node client connected"
            );
        }

        Ok(Self {
            chain,
            account,
            contract,
            registry,
            session: RwLock::new(None),
            debug: config.debug,
        })
    }

    /// Start assembling a node of type `name`
    pub fn node(&self, name: impl Into<String>) -> NodeBuilder<'_> {
        NodeBuilder::new(name, self)
    }

    /// Start assembling an edge
    pub fn edge(&self, edge_name: impl Into<String>, descriptor: impl Into<String>) -> EdgeBuilder<'_> {
        EdgeBuilder::new(edge_name, descriptor, self)
    }

    pub fn account(&self) -> Option<&ChecksumAddress> {
        self.account.as_ref()
    }

    pub fn node_address(&self) -> Option<&ChecksumAddress> {
        self.contract.as_ref().map(|c| c.address())
    }

    pub fn registry(&self) -> Option<&NodeTypeRegistryClient> {
        self.registry.as_ref()
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Snapshot of the node this session registered, if any
    pub fn session(&self) -> Option<NodeBinding> {
        self.session.read().clone()
    }

    fn require_wallet(&self) -> GraphNodeResult<&ChecksumAddress> {
        self.account
            .as_ref()
            .ok_or_else(|| ConfigError::WalletNotInitialized.into())
    }

    fn require_contract(&self) -> GraphNodeResult<&ContractHandle> {
        self.contract
            .as_ref()
            .ok_or_else(|| ConfigError::ContractNotInitialized.into())
    }

    pub(crate) fn require_registry(&self) -> GraphNodeResult<&NodeTypeRegistryClient> {
        self.registry
            .as_ref()
            .ok_or_else(|| ConfigError::RegistryNotInitialized.into())
    }

    /// Preconditions for any state-changing call, checked before touching the chain
    fn require_writable(&self) -> GraphNodeResult<(&ContractHandle, &ChecksumAddress)> {
        let contract = self.require_contract()?;
        self.require_registry()?;
        let account = self.require_wallet()?;
        Ok((contract, account))
    }

    async fn transact(&self, method: &str, args: Vec<Value>) -> GraphNodeResult<Value> {
        let (contract, account) = self.require_writable()?;
        Ok(contract.send(account, method, args).await?)
    }

    /// Register the node for this session, or return the one already registered
    ///
    /// A node already present on the contract is adopted instead of added again.
    pub async fn ensure_node_exists(&self, node_type_name: &str) -> GraphNodeResult<NodeBinding> {
        let (contract, _) = self.require_writable()?;

        if let Some(binding) = self.session() {
            return Self::matching(binding, node_type_name);
        }

        const GET_NODE: &str = "getNode";
        let existing = contract.call(GET_NODE, Vec::new()).await?;
        let binding = if existing.is_null() {
            const ADD_NODE: &str = "addNode";
            let created = self.transact(ADD_NODE, vec![json!(node_type_name)]).await?;
            let fields = decode::tuple(ADD_NODE, &created, 2)?;
            let binding = NodeBinding {
                node_id: NodeId::new(decode::string(ADD_NODE, &fields[0])?),
                node_type_id: NodeTypeId::new(decode::string(ADD_NODE, &fields[1])?),
                graph_node_name: node_type_name.to_string(),
            };
            tracing::debug!(node_id = %binding.node_id, node_type = node_type_name, "Registered node");
            binding
        } else {
            let fields = decode::tuple(GET_NODE, &existing, 3)?;
            let binding = NodeBinding {
                node_id: NodeId::new(decode::string(GET_NODE, &fields[0])?),
                node_type_id: NodeTypeId::new(decode::string(GET_NODE, &fields[1])?),
                graph_node_name: decode::string(GET_NODE, &fields[2])?,
            };
            tracing::debug!(node_id = %binding.node_id, "Adopted node already on contract");
            Self::matching(binding, node_type_name)?
        };

        *self.session.write() = Some(binding.clone());
        Ok(binding)
    }

    fn matching(binding: NodeBinding, node_type_name: &str) -> GraphNodeResult<NodeBinding> {
        if binding.graph_node_name == node_type_name {
            Ok(binding)
        } else {
            Err(GraphNodeError::Validation(format!(
                "graph node is already bound to node type {}, not {node_type_name}",
                binding.graph_node_name
            )))
        }
    }

    /// Submit resolved properties for `node_id` as one transaction
    pub async fn add_properties(&self, node_id: &NodeId, properties: &[Property]) -> GraphNodeResult<()> {
        self.require_writable()?;
        let items = properties
            .iter()
            .map(|p| {
                p.to_resolved_arg().ok_or_else(|| {
                    GraphNodeError::Validation(format!("property '{}' has no resolved id", p.key))
                })
            })
            .collect::<GraphNodeResult<Vec<_>>>()?;

        self.transact("addProperties", vec![json!(node_id), Value::Array(items)])
            .await?;
        Ok(())
    }

    /// All properties stored for `node_id`, ids included
    pub async fn get_properties(&self, node_id: &NodeId) -> GraphNodeResult<Vec<Property>> {
        const METHOD: &str = "getProperties";
        let raw = self.require_contract()?.call(METHOD, vec![json!(node_id)]).await?;

        decode::list(METHOD, &raw)?
            .iter()
            .map(|item| -> GraphNodeResult<Property> {
                let fields = decode::tuple(METHOD, item, 4)?;
                let declared_type = PropertyType::try_from(decode::small_uint(METHOD, &fields[3])?)
                    .map_err(|reason| crate::errors::ChainError::decode(METHOD, reason))?;
                Ok(Property {
                    key: decode::string(METHOD, &fields[1])?,
                    value: fields[2].clone(),
                    declared_type,
                    property_id: Some(PropertyId::new(decode::string(METHOD, &fields[0])?)),
                })
            })
            .collect()
    }

    /// Value of the property named `key` on this node, if set
    pub async fn get_property(&self, key: &str) -> GraphNodeResult<Option<Value>> {
        let raw = self.require_contract()?.call("getProperty", vec![json!(key)]).await?;
        Ok((!raw.is_null()).then_some(raw))
    }

    /// Create a pending edge from this node to `to`
    pub async fn add_edge(
        &self,
        edge_name: &str,
        to: &ChecksumAddress,
        descriptor: &str,
    ) -> GraphNodeResult<EdgeId> {
        const METHOD: &str = "addEdge";
        let raw = self
            .transact(METHOD, vec![json!(edge_name), json!(to), json!(descriptor)])
            .await?;
        let edge_id = EdgeId::new(decode::string(METHOD, &raw)?);
        tracing::debug!(%edge_id, edge_name, %to, descriptor, "Created edge");
        Ok(edge_id)
    }

    /// Attach properties to an edge, keyed by name rather than registry id
    pub async fn set_edge_properties(
        &self,
        edge_id: &EdgeId,
        edge_name: &str,
        properties: &[Property],
    ) -> GraphNodeResult<()> {
        let items: Vec<Value> = properties.iter().map(Property::to_keyed_arg).collect();
        self.transact(
            "setEdgeProperties",
            vec![json!(edge_id), json!(edge_name), Value::Array(items)],
        )
        .await?;
        Ok(())
    }

    /// Answer an edge addressed to `to`
    ///
    /// Whether the edge is still pending is checked by the contract.
    pub async fn answer_edge(
        &self,
        to: &ChecksumAddress,
        edge_id: &EdgeId,
        status: EdgeStatus,
    ) -> GraphNodeResult<()> {
        self.transact(
            "answerEdge",
            vec![json!(to), json!(edge_id), json!(u8::from(status))],
        )
        .await?;
        tracing::debug!(%edge_id, %status, "Answered edge");
        Ok(())
    }

    /// Look up an edge; `None` when no record matches
    pub async fn get_edge(
        &self,
        edge_name: &str,
        to: &ChecksumAddress,
        descriptor: &str,
    ) -> GraphNodeResult<Option<EdgeRecord>> {
        const METHOD: &str = "getEdge";
        let raw = self
            .require_contract()?
            .call(METHOD, vec![json!(edge_name), json!(to), json!(descriptor)])
            .await?;

        if raw.is_null() {
            return Ok(None);
        }
        EdgeRecord::decode(METHOD, &raw).map(Some)
    }

    /// Attach a document URL to a node or edge
    pub async fn add_document(&self, entity_id: &str, url: &str) -> GraphNodeResult<DocumentId> {
        const METHOD: &str = "addDocument";
        let raw = self.transact(METHOD, vec![json!(entity_id), json!(url)]).await?;
        Ok(DocumentId::new(decode::string(METHOD, &raw)?))
    }

    pub async fn remove_document(&self, url: &str) -> GraphNodeResult<()> {
        self.transact("removeDocument", vec![json!(url)]).await?;
        Ok(())
    }

    /// URLs of every document on this graph node
    pub async fn get_documents(&self) -> GraphNodeResult<Vec<String>> {
        const METHOD: &str = "getDocuments";
        let raw = self.require_contract()?.call(METHOD, Vec::new()).await?;
        decode::list(METHOD, &raw)?
            .iter()
            .map(|v| decode::string(METHOD, v).map_err(Into::into))
            .collect()
    }

    /// Contract deployment is left to external tooling
    pub async fn deploy(&self, node_type_id: &NodeTypeId) -> GraphNodeResult<ChecksumAddress> {
        self.require_wallet()?;
        tracing::warn!(%node_type_id, "GraphNode deployment requested but not supported");
        Err(GraphNodeError::Unsupported("deploy"))
    }
}

impl std::fmt::Debug for GraphNodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNodeClient")
            .field("rpc_url", &self.chain.rpc_url())
            .field("account", &self.account)
            .field("contract", &self.contract)
            .field("registry", &self.registry)
            .field("session", &*self.session.read())
            .field("debug", &self.debug)
            .finish()
    }
}
