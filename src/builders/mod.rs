//! Fluent builders for nodes and edges
//!
//! A builder accumulates properties and documents in insertion order and commits
//! them through its [`GraphNodeClient`](crate::GraphNodeClient) with a single call.
//! Committing consumes the builder. A failed commit may have applied its earlier
//! steps on-chain; query current state before building again.

mod edge_builder;
mod node_builder;

pub use edge_builder::EdgeBuilder;
pub use node_builder::NodeBuilder;
