//! Edge builder
//!
//! Proposes, accepts and inspects a directed edge to another node.

use crate::errors::{GraphNodeError, GraphNodeResult};
use crate::graph_node::GraphNodeClient;
use crate::value_objects::{ChecksumAddress, EdgeId, EdgeStatus, Property, PropertyType};

/// Assembles a directed edge from the client's node to a target node
///
/// `descriptor` tells apart edges that share the same name.
#[derive(Debug)]
pub struct EdgeBuilder<'a> {
    edge_name: String,
    descriptor: String,
    client: &'a GraphNodeClient,
    properties: Vec<Property>,
    documents: Vec<String>,
    from_address: Option<ChecksumAddress>,
    to_address: Option<ChecksumAddress>,
}

impl<'a> EdgeBuilder<'a> {
    pub(crate) fn new(
        edge_name: impl Into<String>,
        descriptor: impl Into<String>,
        client: &'a GraphNodeClient,
    ) -> Self {
        Self {
            edge_name: edge_name.into(),
            descriptor: descriptor.into(),
            client,
            properties: Vec::new(),
            documents: Vec::new(),
            from_address: None,
            to_address: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.push(Property::new(key, value));
        self
    }

    pub fn with_typed_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
        declared_type: PropertyType,
    ) -> Self {
        self.properties.push(Property::typed(key, value, declared_type));
        self
    }

    pub fn with_document(mut self, url: impl Into<String>) -> Self {
        self.documents.push(url.into());
        self
    }

    /// Set the source node, normalized to checksum form
    pub fn from_node(mut self, address: &str) -> GraphNodeResult<Self> {
        self.from_address = Some(ChecksumAddress::parse(address)?);
        Ok(self)
    }

    /// Set the target node, normalized to checksum form
    pub fn to_node(mut self, address: &str) -> GraphNodeResult<Self> {
        self.to_address = Some(ChecksumAddress::parse(address)?);
        Ok(self)
    }

    pub fn edge_name(&self) -> &str {
        &self.edge_name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn from_address(&self) -> Option<&ChecksumAddress> {
        self.from_address.as_ref()
    }

    pub fn to_address(&self) -> Option<&ChecksumAddress> {
        self.to_address.as_ref()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    fn target(&self) -> GraphNodeResult<&ChecksumAddress> {
        self.to_address
            .as_ref()
            .ok_or_else(|| GraphNodeError::Validation("Target node address must be set".to_string()))
    }

    /// Propose the edge
    ///
    /// Creates the edge, then submits accumulated properties as one batch and
    /// documents one by one. The edge starts out pending.
    pub async fn save(self) -> GraphNodeResult<EdgeId> {
        let to = self.target()?;
        let client = self.client;
        if client.debug() {
            tracing::info!(
                edge = %self.edge_name,
                descriptor = %self.descriptor,
                from = ?self.from_address,
                %to,
                "Saving edge"
            );
        }

        let edge_id = client.add_edge(&self.edge_name, to, &self.descriptor).await?;

        if !self.properties.is_empty() {
            client
                .set_edge_properties(&edge_id, &self.edge_name, &self.properties)
                .await
                .inspect_err(|error| {
                    tracing::warn!(%edge_id, %error, "Edge properties failed after the edge was created");
                })?;
        }

        for (committed, url) in self.documents.iter().enumerate() {
            client
                .add_document(edge_id.as_str(), url)
                .await
                .inspect_err(|error| {
                    tracing::warn!(
                        %edge_id,
                        url = %url,
                        committed,
                        %error,
                        "Document submission failed, earlier documents stay on-chain"
                    );
                })?;
        }

        Ok(edge_id)
    }

    /// Propose the edge and accept it straight away
    ///
    /// Only the edge itself is written: accumulated properties and documents are
    /// not submitted on this path.
    pub async fn accept(self) -> GraphNodeResult<EdgeId> {
        let to = self.target()?;
        let client = self.client;
        if !self.properties.is_empty() || !self.documents.is_empty() {
            tracing::debug!(
                edge = %self.edge_name,
                properties = self.properties.len(),
                documents = self.documents.len(),
                "accept() does not submit properties or documents"
            );
        }

        let edge_id = client.add_edge(&self.edge_name, to, &self.descriptor).await?;
        client
            .answer_edge(to, &edge_id, EdgeStatus::Accepted)
            .await
            .inspect_err(|error| {
                tracing::warn!(%edge_id, %error, "Edge created but could not be accepted");
            })?;
        Ok(edge_id)
    }

    /// Current status of the edge, `Invalid` when none is recorded
    pub async fn status(&self) -> GraphNodeResult<EdgeStatus> {
        let to = self.target()?;
        let record = self
            .client
            .get_edge(&self.edge_name, to, &self.descriptor)
            .await?;
        Ok(record.map(|r| r.status).unwrap_or(EdgeStatus::Invalid))
    }
}

#[cfg(test)]
mod tests {
    use crate::chain::InMemoryChain;
    use crate::config::GraphNodeConfig;
    use crate::errors::{ChainError, GraphNodeError};
    use crate::graph_node::GraphNodeClient;
    use crate::value_objects::EdgeStatus;
    use std::sync::Arc;

    const TARGET: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    async fn client_with_node(chain: &Arc<InMemoryChain>) -> GraphNodeClient {
        let registry = chain.deploy_registry();
        chain.register_node_type(&registry, "Person", &["name"]).unwrap();
        let node = chain.deploy_graph_node(&registry);
        let config = GraphNodeConfig::default()
            .with_private_key("0xcafe")
            .with_node_address(node.to_string())
            .with_registry_address(registry.to_string());
        let client = GraphNodeClient::connect(config, chain.clone()).await.unwrap();
        client.node("Person").save().await.unwrap();
        chain.clear_calls();
        client
    }

    #[tokio::test]
    async fn test_to_node_normalizes_address() {
        let chain = Arc::new(InMemoryChain::new());
        let client = client_with_node(&chain).await;

        let builder = client
            .edge("knows", "friend")
            .from_node(&TARGET.to_uppercase().replacen("0X", "0x", 1))
            .unwrap()
            .to_node(TARGET)
            .unwrap();

        assert_eq!(builder.from_address(), builder.to_address());
        assert_eq!(
            builder.to_address().unwrap().as_str(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[tokio::test]
    async fn test_bad_address_fails_immediately() {
        let chain = Arc::new(InMemoryChain::new());
        let client = client_with_node(&chain).await;

        let result = client.edge("knows", "friend").to_node("0xnothex");
        assert!(matches!(result, Err(GraphNodeError::Address(_))));
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_save_with_properties_and_documents() {
        let chain = Arc::new(InMemoryChain::new());
        let client = client_with_node(&chain).await;

        let edge_id = client
            .edge("knows", "friend")
            .to_node(TARGET)
            .unwrap()
            .with_property("since", 2019)
            .with_document("ipfs://photo")
            .save()
            .await
            .unwrap();

        assert_eq!(
            chain.methods(),
            vec!["addEdge", "setEdgeProperties", "addDocument"]
        );
        let node = client.node_address().unwrap();
        assert_eq!(chain.edge_status(node, &edge_id), EdgeStatus::Pending);
        assert_eq!(chain.edge_properties(node, &edge_id).len(), 1);
    }

    #[tokio::test]
    async fn test_status_before_and_after_accept() {
        let chain = Arc::new(InMemoryChain::new());
        let client = client_with_node(&chain).await;

        let lookup = client.edge("knows", "colleague").to_node(TARGET).unwrap();
        assert_eq!(lookup.status().await.unwrap(), EdgeStatus::Invalid);

        client
            .edge("knows", "colleague")
            .to_node(TARGET)
            .unwrap()
            .accept()
            .await
            .unwrap();
        assert_eq!(lookup.status().await.unwrap(), EdgeStatus::Accepted);

        let other_descriptor = client.edge("knows", "friend").to_node(TARGET).unwrap();
        assert_eq!(other_descriptor.status().await.unwrap(), EdgeStatus::Invalid);
    }

    #[tokio::test]
    async fn test_status_requires_target() {
        let chain = Arc::new(InMemoryChain::new());
        let client = client_with_node(&chain).await;

        let result = client.edge("knows", "friend").status().await;
        assert!(matches!(result, Err(GraphNodeError::Validation(_))));
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_document_failure_leaves_pending_edge() {
        let chain = Arc::new(InMemoryChain::new());
        let client = client_with_node(&chain).await;
        chain.fail_method_after("addDocument", 1, ChainError::Transport("dropped".into()));

        let result = client
            .edge("knows", "friend")
            .to_node(TARGET)
            .unwrap()
            .with_document("ipfs://first")
            .with_document("ipfs://second")
            .with_document("ipfs://third")
            .save()
            .await;

        assert!(matches!(result, Err(GraphNodeError::Chain(ChainError::Transport(_)))));
        chain.clear_failures();
        assert_eq!(client.get_documents().await.unwrap(), vec!["ipfs://first"]);

        let attempts = chain.methods().iter().filter(|m| *m == "addDocument").count();
        assert_eq!(attempts, 2);

        let edge = client.edge("knows", "friend").to_node(TARGET).unwrap();
        assert_eq!(edge.status().await.unwrap(), EdgeStatus::Pending);
    }

    #[tokio::test]
    async fn test_accept_failure_leaves_edge_pending() {
        let chain = Arc::new(InMemoryChain::new());
        let client = client_with_node(&chain).await;
        chain.fail_method("answerEdge", ChainError::Transport("dropped".into()));

        let result = client
            .edge("knows", "colleague")
            .to_node(TARGET)
            .unwrap()
            .accept()
            .await;

        assert!(matches!(result, Err(GraphNodeError::Chain(ChainError::Transport(_)))));
        assert_eq!(chain.sent_methods(), vec!["addEdge", "answerEdge"]);

        chain.clear_failures();
        let edge = client.edge("knows", "colleague").to_node(TARGET).unwrap();
        assert_eq!(edge.status().await.unwrap(), EdgeStatus::Pending);
    }
}
