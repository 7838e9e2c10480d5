//! Client SDK for on-chain context graphs
//!
//! Nodes, typed properties, documents and directed edges live in two contracts:
//! a per-node GraphNode contract and a shared NodeTypeRegistry. This crate drives
//! them through fluent builders that commit a whole node or edge with one call.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use context_graph_sdk::{GraphNodeClient, GraphNodeConfig, InMemoryChain};
//! # async fn run() -> context_graph_sdk::GraphNodeResult<()> {
//! let chain = Arc::new(InMemoryChain::new());
//! let client = GraphNodeClient::connect(GraphNodeConfig::from_env()?, chain).await?;
//!
//! let _node_id = client
//!     .node("Person")
//!     .with_property("name", "alice")
//!     .with_document("ipfs://cv")
//!     .save()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod builders;
pub mod chain;
pub mod config;
pub mod errors;
pub mod graph_node;
pub mod registry;
pub mod value_objects;

// Re-export main types
pub use builders::{EdgeBuilder, NodeBuilder};
pub use chain::{CallKind, ChainClient, ContractHandle, InMemoryChain};
pub use config::{GraphNodeConfig, Network};
pub use errors::{AddressError, ChainError, ConfigError, GraphNodeError, GraphNodeResult};
pub use graph_node::{EdgeRecord, GraphNodeClient, NodeBinding};
pub use registry::{EdgeTypeInfo, NodeTypeInfo, NodeTypeRegistryClient};

// Re-export value objects
pub use value_objects::{
    ChecksumAddress, DocumentId, EdgeId, EdgeStatus, EdgeTypeId, NodeId, NodeTypeId, Property,
    PropertyId, PropertyType,
};
