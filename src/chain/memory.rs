//! In-memory chain
//!
//! Emulates the GraphNode and NodeTypeRegistry contracts inside the process so the
//! commit protocol can be driven and inspected without a network. Every method
//! invocation is appended to a call log, and failures can be injected per method.

use super::{CallKind, ChainClient};
use crate::errors::{ChainError, ChainResult};
use crate::value_objects::{
    ChecksumAddress, DocumentId, EdgeId, EdgeStatus, EdgeTypeId, NodeId, NodeTypeId, PropertyId,
};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, HashSet};

const RPC_URL: &str = "memory://local";

/// One method invocation as seen by the chain
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub contract: ChecksumAddress,
    pub kind: CallKind,
    pub method: String,
    pub args: Vec<Value>,
}

struct InjectedFailure {
    remaining_successes: usize,
    error: ChainError,
}

#[derive(Default)]
struct NodeTypeEntry {
    id: NodeTypeId,
    properties: IndexMap<String, PropertyId>,
}

#[derive(Default)]
struct RegistryState {
    node_types: IndexMap<String, NodeTypeEntry>,
    edge_types: IndexMap<EdgeTypeId, String>,
}

struct StoredProperty {
    key: String,
    value: Value,
    declared_type: Value,
}

struct NodeEntry {
    id: NodeId,
    node_type_id: NodeTypeId,
    name: String,
    properties: IndexMap<PropertyId, StoredProperty>,
}

struct EdgeEntry {
    name: String,
    to: ChecksumAddress,
    descriptor: String,
    status: EdgeStatus,
    properties: Vec<Value>,
}

struct GraphNodeState {
    registry: ChecksumAddress,
    node: Option<NodeEntry>,
    edges: IndexMap<EdgeId, EdgeEntry>,
    documents: IndexMap<DocumentId, (String, String)>,
}

#[derive(Default)]
struct ChainState {
    registries: HashMap<ChecksumAddress, RegistryState>,
    graph_nodes: HashMap<ChecksumAddress, GraphNodeState>,
    accounts: HashSet<ChecksumAddress>,
    calls: Vec<CallRecord>,
    failures: HashMap<String, InjectedFailure>,
    next_contract: u64,
    next_id: u64,
}

impl ChainState {
    fn next_contract_address(&mut self) -> ChecksumAddress {
        self.next_contract += 1;
        let mut bytes = [0u8; 20];
        bytes[0] = 0xc0;
        bytes[12..].copy_from_slice(&self.next_contract.to_be_bytes());
        ChecksumAddress::from_bytes(bytes)
    }

    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("0x{:064x}", self.next_id)
    }

    fn take_failure(&mut self, method: &str) -> Option<ChainError> {
        let failure = self.failures.get_mut(method)?;
        if failure.remaining_successes > 0 {
            failure.remaining_successes -= 1;
            None
        } else {
            Some(failure.error.clone())
        }
    }
}

/// Contract emulator implementing [`ChainClient`]
#[derive(Default)]
pub struct InMemoryChain {
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy an empty NodeTypeRegistry
    pub fn deploy_registry(&self) -> ChecksumAddress {
        let mut state = self.state.lock();
        let address = state.next_contract_address();
        state.registries.insert(address.clone(), RegistryState::default());
        address
    }

    /// Deploy a GraphNode contract wired to `registry`
    pub fn deploy_graph_node(&self, registry: &ChecksumAddress) -> ChecksumAddress {
        let mut state = self.state.lock();
        let address = state.next_contract_address();
        state.graph_nodes.insert(
            address.clone(),
            GraphNodeState {
                registry: registry.clone(),
                node: None,
                edges: IndexMap::new(),
                documents: IndexMap::new(),
            },
        );
        address
    }

    /// Register a node type and its property keys, returning the type id
    ///
    /// Returns `None` when `registry` is not a deployed registry.
    pub fn register_node_type(
        &self,
        registry: &ChecksumAddress,
        name: &str,
        property_keys: &[&str],
    ) -> Option<NodeTypeId> {
        let mut state = self.state.lock();
        let id = NodeTypeId::new(state.next_id());
        let property_ids: Vec<PropertyId> =
            property_keys.iter().map(|_| PropertyId::new(state.next_id())).collect();

        let entry = NodeTypeEntry {
            id: id.clone(),
            properties: property_keys
                .iter()
                .map(|k| k.to_string())
                .zip(property_ids)
                .collect(),
        };
        state.registries.get_mut(registry)?.node_types.insert(name.to_string(), entry);
        Some(id)
    }

    /// Register an edge type, returning its id
    pub fn register_edge_type(&self, registry: &ChecksumAddress, name: &str) -> Option<EdgeTypeId> {
        let mut state = self.state.lock();
        let id = EdgeTypeId::new(state.next_id());
        state
            .registries
            .get_mut(registry)?
            .edge_types
            .insert(id.clone(), name.to_string());
        Some(id)
    }

    /// Fail every future invocation of `method` with `error`
    pub fn fail_method(&self, method: &str, error: ChainError) {
        self.fail_method_after(method, 0, error);
    }

    /// Let `successes` invocations of `method` through, then fail the rest
    pub fn fail_method_after(&self, method: &str, successes: usize, error: ChainError) {
        self.state.lock().failures.insert(
            method.to_string(),
            InjectedFailure {
                remaining_successes: successes,
                error,
            },
        );
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Every invocation so far, in order
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().calls.clone()
    }

    /// Method names of every invocation so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.state.lock().calls.iter().map(|c| c.method.clone()).collect()
    }

    /// Method names of transactions only
    pub fn sent_methods(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind == CallKind::Send)
            .map(|c| c.method.clone())
            .collect()
    }

    /// Forget the call log
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Current status of an edge, `Invalid` when it does not exist
    pub fn edge_status(&self, graph_node: &ChecksumAddress, edge_id: &EdgeId) -> EdgeStatus {
        let state = self.state.lock();
        state
            .graph_nodes
            .get(graph_node)
            .and_then(|n| n.edges.get(edge_id))
            .map(|e| e.status)
            .unwrap_or_default()
    }

    /// Properties recorded against an edge
    pub fn edge_properties(&self, graph_node: &ChecksumAddress, edge_id: &EdgeId) -> Vec<Value> {
        let state = self.state.lock();
        state
            .graph_nodes
            .get(graph_node)
            .and_then(|n| n.edges.get(edge_id))
            .map(|e| e.properties.clone())
            .unwrap_or_default()
    }

    fn record(&self, contract: &ChecksumAddress, kind: CallKind, method: &str, args: &[Value]) {
        self.state.lock().calls.push(CallRecord {
            contract: contract.clone(),
            kind,
            method: method.to_string(),
            args: args.to_vec(),
        });
    }

    fn dispatch(
        &self,
        contract: &ChecksumAddress,
        from: Option<&ChecksumAddress>,
        method: &str,
        args: &[Value],
    ) -> ChainResult<Value> {
        let mut state = self.state.lock();

        if let Some(error) = state.take_failure(method) {
            return Err(error);
        }

        if let Some(sender) = from {
            if !state.accounts.contains(sender) {
                return Err(revert(method, format!("unknown sender {sender}")));
            }
        }

        if state.registries.contains_key(contract) {
            let registry = &state.registries[contract];
            return registry_method(registry, method, args);
        }

        let ChainState {
            registries,
            graph_nodes,
            next_id,
            ..
        } = &mut *state;

        let node_state = graph_nodes
            .get_mut(contract)
            .ok_or_else(|| ChainError::Transport(format!("no contract at {contract}")))?;
        let registry = registries
            .get(&node_state.registry)
            .ok_or_else(|| revert(method, "registry missing"))?;

        let mut fresh_id = || {
            *next_id += 1;
            format!("0x{:064x}", *next_id)
        };

        match (method, from.is_some()) {
            ("getNode", _) => Ok(match &node_state.node {
                Some(node) => json!([node.id, node.node_type_id, node.name]),
                None => Value::Null,
            }),
            ("addNode", true) => {
                if node_state.node.is_some() {
                    return Err(revert(method, "node already exists"));
                }
                let name = arg_str(method, args, 0)?;
                let node_type = registry
                    .node_types
                    .get(&name)
                    .ok_or_else(|| revert(method, format!("unknown node type {name}")))?;
                let node = NodeEntry {
                    id: NodeId::new(fresh_id()),
                    node_type_id: node_type.id.clone(),
                    name,
                    properties: IndexMap::new(),
                };
                let result = json!([node.id, node.node_type_id]);
                node_state.node = Some(node);
                Ok(result)
            }
            ("addProperties", true) => {
                let node_id = NodeId::new(arg_str(method, args, 0)?);
                let items = arg_list(method, args, 1)?;
                let node = node_state
                    .node
                    .as_mut()
                    .filter(|n| n.id == node_id)
                    .ok_or_else(|| revert(method, format!("unknown node {node_id}")))?;
                let declared = &registry
                    .node_types
                    .get(&node.name)
                    .ok_or_else(|| revert(method, "node type vanished"))?
                    .properties;

                // validate the whole batch before applying any of it
                let mut batch = Vec::with_capacity(items.len());
                for item in items {
                    let tuple = item
                        .as_array()
                        .filter(|t| t.len() == 3)
                        .ok_or_else(|| revert(method, "expected [propertyId, value, type]"))?;
                    let property_id = PropertyId::new(value_str(&tuple[0]));
                    let key = declared
                        .iter()
                        .find(|(_, id)| **id == property_id)
                        .map(|(key, _)| key.clone())
                        .ok_or_else(|| revert(method, format!("undeclared property {property_id}")))?;
                    batch.push((
                        property_id,
                        StoredProperty {
                            key,
                            value: tuple[1].clone(),
                            declared_type: tuple[2].clone(),
                        },
                    ));
                }
                node.properties.extend(batch);
                Ok(Value::Null)
            }
            ("getProperties", _) => {
                let node_id = NodeId::new(arg_str(method, args, 0)?);
                let node = node_state
                    .node
                    .as_ref()
                    .filter(|n| n.id == node_id)
                    .ok_or_else(|| revert(method, format!("unknown node {node_id}")))?;
                Ok(Value::Array(
                    node.properties
                        .iter()
                        .map(|(id, p)| json!([id, p.key, p.value, p.declared_type]))
                        .collect(),
                ))
            }
            ("getProperty", _) => {
                let key = arg_str(method, args, 0)?;
                Ok(node_state
                    .node
                    .as_ref()
                    .and_then(|n| n.properties.values().find(|p| p.key == key))
                    .map(|p| p.value.clone())
                    .unwrap_or(Value::Null))
            }
            ("addEdge", true) => {
                let name = arg_str(method, args, 0)?;
                let to = arg_address(method, args, 1)?;
                let descriptor = arg_str(method, args, 2)?;
                if node_state.node.is_none() {
                    return Err(revert(method, "node not registered"));
                }
                let edge_id = EdgeId::new(fresh_id());
                node_state.edges.insert(
                    edge_id.clone(),
                    EdgeEntry {
                        name,
                        to,
                        descriptor,
                        status: EdgeStatus::Pending,
                        properties: Vec::new(),
                    },
                );
                Ok(json!(edge_id))
            }
            ("setEdgeProperties", true) => {
                let edge_id = EdgeId::new(arg_str(method, args, 0)?);
                let name = arg_str(method, args, 1)?;
                let items = arg_list(method, args, 2)?.to_vec();
                let edge = node_state
                    .edges
                    .get_mut(&edge_id)
                    .filter(|e| e.name == name)
                    .ok_or_else(|| revert(method, format!("unknown edge {edge_id}")))?;
                edge.properties.extend(items);
                Ok(Value::Null)
            }
            ("answerEdge", true) => {
                let to = arg_address(method, args, 0)?;
                let edge_id = EdgeId::new(arg_str(method, args, 1)?);
                let status = EdgeStatus::try_from(arg_u8(method, args, 2)?)
                    .map_err(|e| revert(method, e))?;
                let edge = node_state
                    .edges
                    .get_mut(&edge_id)
                    .filter(|e| e.to == to)
                    .ok_or_else(|| revert(method, format!("unknown edge {edge_id}")))?;
                if edge.status != EdgeStatus::Pending {
                    return Err(revert(method, format!("edge already {}", edge.status)));
                }
                if !status.is_terminal() {
                    return Err(revert(method, format!("cannot answer with {status}")));
                }
                edge.status = status;
                Ok(Value::Null)
            }
            ("getEdge", _) => {
                let name = arg_str(method, args, 0)?;
                let to = arg_address(method, args, 1)?;
                let descriptor = arg_str(method, args, 2)?;
                Ok(node_state
                    .edges
                    .iter()
                    .rev()
                    .find(|(_, e)| e.name == name && e.to == to && e.descriptor == descriptor)
                    .map(|(id, e)| {
                        json!([contract, e.to, e.descriptor, u8::from(e.status), id, e.name])
                    })
                    .unwrap_or(Value::Null))
            }
            ("addDocument", true) => {
                let entity_id = arg_str(method, args, 0)?;
                let url = arg_str(method, args, 1)?;
                let document_id = DocumentId::new(fresh_id());
                node_state
                    .documents
                    .insert(document_id.clone(), (entity_id, url));
                Ok(json!(document_id))
            }
            ("removeDocument", true) => {
                let url = arg_str(method, args, 0)?;
                let before = node_state.documents.len();
                node_state.documents.retain(|_, (_, u)| *u != url);
                if node_state.documents.len() == before {
                    return Err(revert(method, format!("unknown document {url}")));
                }
                Ok(Value::Null)
            }
            ("getDocuments", _) => Ok(Value::Array(
                node_state
                    .documents
                    .values()
                    .map(|(_, url)| json!(url))
                    .collect(),
            )),
            (_, false) if is_mutating(method) => {
                Err(revert(method, "state-changing method invoked as a call"))
            }
            _ => Err(revert(method, "unknown method")),
        }
    }
}

fn registry_method(registry: &RegistryState, method: &str, args: &[Value]) -> ChainResult<Value> {
    match method {
        "propertyId" => {
            let node_type_id = NodeTypeId::new(arg_str(method, args, 0)?);
            let key = arg_str(method, args, 1)?;
            let id = registry
                .node_types
                .values()
                .find(|t| t.id == node_type_id)
                .and_then(|t| t.properties.get(&key))
                .map(|id| id.to_string())
                .unwrap_or_else(|| format!("0x{:064x}", 0));
            Ok(json!(id))
        }
        "getNodeType" => {
            let node_type_id = NodeTypeId::new(arg_str(method, args, 0)?);
            let exists = registry.node_types.values().any(|t| t.id == node_type_id);
            Ok(json!([node_type_id, exists]))
        }
        "getEdgeById" => {
            let edge_type_id = EdgeTypeId::new(arg_str(method, args, 0)?);
            let exists = registry.edge_types.contains_key(&edge_type_id);
            Ok(json!([edge_type_id, exists]))
        }
        _ => Err(revert(method, "unknown method")),
    }
}

fn is_mutating(method: &str) -> bool {
    matches!(
        method,
        "addNode"
            | "addProperties"
            | "addEdge"
            | "setEdgeProperties"
            | "answerEdge"
            | "addDocument"
            | "removeDocument"
    )
}

fn revert(method: &str, reason: impl Into<String>) -> ChainError {
    ChainError::Reverted {
        method: method.to_string(),
        reason: reason.into(),
    }
}

fn value_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn arg<'a>(method: &str, args: &'a [Value], index: usize) -> ChainResult<&'a Value> {
    args.get(index)
        .ok_or_else(|| revert(method, format!("missing argument {index}")))
}

fn arg_str(method: &str, args: &[Value], index: usize) -> ChainResult<String> {
    match arg(method, args, index)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(revert(method, format!("argument {index} must be a string, got {other}"))),
    }
}

fn arg_list<'a>(method: &str, args: &'a [Value], index: usize) -> ChainResult<&'a [Value]> {
    arg(method, args, index)?
        .as_array()
        .map(|items| items.as_slice())
        .ok_or_else(|| revert(method, format!("argument {index} must be an array")))
}

fn arg_u8(method: &str, args: &[Value], index: usize) -> ChainResult<u8> {
    arg(method, args, index)?
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| revert(method, format!("argument {index} must be a uint8")))
}

fn arg_address(method: &str, args: &[Value], index: usize) -> ChainResult<ChecksumAddress> {
    let raw = arg_str(method, args, index)?;
    ChecksumAddress::parse(&raw).map_err(|e| revert(method, e.to_string()))
}

#[async_trait]
impl ChainClient for InMemoryChain {
    fn rpc_url(&self) -> &str {
        RPC_URL
    }

    async fn import_account(&self, private_key: &str) -> ChainResult<ChecksumAddress> {
        let key = private_key.trim().trim_start_matches("0x");
        if key.is_empty() {
            return Err(ChainError::Transport("empty private key".to_string()));
        }
        // stand-in for secp256k1 derivation: stable, unique per key
        let hash = Keccak256::digest(key.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[12..]);
        let address = ChecksumAddress::from_bytes(bytes);
        self.state.lock().accounts.insert(address.clone());
        Ok(address)
    }

    async fn has_code(&self, address: &ChecksumAddress) -> ChainResult<bool> {
        let state = self.state.lock();
        Ok(state.registries.contains_key(address) || state.graph_nodes.contains_key(address))
    }

    async fn call(
        &self,
        contract: &ChecksumAddress,
        method: &str,
        args: Vec<Value>,
    ) -> ChainResult<Value> {
        self.record(contract, CallKind::Call, method, &args);
        self.dispatch(contract, None, method, &args)
    }

    async fn send(
        &self,
        contract: &ChecksumAddress,
        from: &ChecksumAddress,
        method: &str,
        args: Vec<Value>,
    ) -> ChainResult<Value> {
        self.record(contract, CallKind::Send, method, &args);
        self.dispatch(contract, Some(from), method, &args)
    }
}
