//! Walk through a full node and edge commit
//!
//! Runs against the in-memory chain, so it needs no network or keys. Prints every
//! contract call the builders made so the commit order can be inspected.

use anyhow::Context;
use context_graph_sdk::{CallKind, GraphNodeClient, GraphNodeConfig, InMemoryChain, PropertyType};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Deploying contracts to the in-memory chain...");

    let chain = Arc::new(InMemoryChain::new());
    let registry = chain.deploy_registry();
    chain
        .register_node_type(&registry, "Person", &["name", "age"])
        .context("registry not deployed")?;
    chain
        .register_edge_type(&registry, "knows")
        .context("registry not deployed")?;
    let alice = chain.deploy_graph_node(&registry);
    let bob = chain.deploy_graph_node(&registry);

    println!("  registry:   {registry}");
    println!("  alice node: {alice}");
    println!("  bob node:   {bob}");

    let config = GraphNodeConfig::default()
        .with_private_key("0xa11ce")
        .with_node_address(alice.to_string())
        .with_registry_address(registry.to_string())
        .with_debug(true);
    let client = GraphNodeClient::connect(config, chain.clone()).await?;

    let node_id = client
        .node("Person")
        .with_property("name", "alice")
        .with_typed_property("age", 34, PropertyType::Number)
        .with_document("ipfs://alice/profile.json")
        .save()
        .await?;
    println!("\nSaved node {node_id}");

    let bob_address = bob.to_string().to_lowercase();
    let edge_id = client
        .edge("knows", "friend")
        .to_node(&bob_address)?
        .with_property("since", 2019)
        .with_document("ipfs://alice/bob-photo.png")
        .save()
        .await?;
    println!("Proposed edge {edge_id}");

    let endorsement_id = client
        .edge("knows", "self")
        .to_node(alice.as_str())?
        .accept()
        .await?;
    println!("Accepted edge {endorsement_id}");

    println!("\nEdge statuses:");
    for (descriptor, target) in [("friend", bob_address.as_str()), ("self", alice.as_str()), ("rival", bob_address.as_str())] {
        let status = client
            .edge("knows", descriptor)
            .to_node(target)?
            .status()
            .await?;
        println!("  knows/{descriptor:<6} -> {target}: {status}");
    }

    println!("\nContract calls in order:");
    for call in chain.calls() {
        let kind = match call.kind {
            CallKind::Call => "call",
            CallKind::Send => "send",
        };
        println!("  [{kind}] {}.{}", call.contract, call.method);
    }

    Ok(())
}
