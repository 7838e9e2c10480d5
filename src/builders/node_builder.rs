//! Node builder
//!
//! Collects a node's properties and documents and commits them in order.

use crate::errors::GraphNodeResult;
use crate::graph_node::GraphNodeClient;
use crate::value_objects::{NodeId, Property, PropertyType};

/// Assembles the properties and documents of a node
#[derive(Debug)]
pub struct NodeBuilder<'a> {
    graph_node_name: String,
    client: &'a GraphNodeClient,
    properties: Vec<Property>,
    documents: Vec<String>,
}

impl<'a> NodeBuilder<'a> {
    pub(crate) fn new(graph_node_name: impl Into<String>, client: &'a GraphNodeClient) -> Self {
        Self {
            graph_node_name: graph_node_name.into(),
            client,
            properties: Vec::new(),
            documents: Vec::new(),
        }
    }

    /// Add a property whose type the registry decides
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.push(Property::new(key, value));
        self
    }

    /// Add a property with a declared type
    pub fn with_typed_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
        declared_type: PropertyType,
    ) -> Self {
        self.properties.push(Property::typed(key, value, declared_type));
        self
    }

    /// Attach a document URL
    pub fn with_document(mut self, url: impl Into<String>) -> Self {
        self.documents.push(url.into());
        self
    }

    pub fn graph_node_name(&self) -> &str {
        &self.graph_node_name
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Commit the node
    ///
    /// Registers the node (once per session), resolves every property key against
    /// the registry, submits the properties as one batch and then each document
    /// on its own. Property resolution happens before anything but the node
    /// itself is written. Documents are not rolled back when a later one fails.
    pub async fn save(mut self) -> GraphNodeResult<NodeId> {
        let client = self.client;
        if client.debug() {
            tracing::info!(node_type = %self.graph_node_name, "Saving GraphNode");
        }

        let binding = client.ensure_node_exists(&self.graph_node_name).await?;

        let registry = client.require_registry()?;
        for property in &mut self.properties {
            let property_id = registry
                .resolve_property_id(&binding.node_type_id, &property.key)
                .await?;
            property.property_id = Some(property_id);
        }

        if !self.properties.is_empty() {
            client
                .add_properties(&binding.node_id, &self.properties)
                .await
                .inspect_err(|error| {
                    tracing::warn!(
                        node_id = %binding.node_id,
                        %error,
                        "Property batch failed after the node was registered"
                    );
                })?;
        }

        for (committed, url) in self.documents.iter().enumerate() {
            client
                .add_document(binding.node_id.as_str(), url)
                .await
                .inspect_err(|error| {
                    tracing::warn!(
                        node_id = %binding.node_id,
                        url = %url,
                        committed,
                        %error,
                        "Document submission failed, earlier documents stay on-chain"
                    );
                })?;
        }

        if client.debug() {
            tracing::info!(
                node_id = %binding.node_id,
                properties = self.properties.len(),
                documents = self.documents.len(),
                "GraphNode saved"
            );
        }

        Ok(binding.node_id)
    }
}
