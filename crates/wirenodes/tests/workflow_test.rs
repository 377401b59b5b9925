use wirecore::{Graph, NodeSpec, NodeType, Value};
use wirenodes::builtin_registry;
use wireruntime::{connect, RunOutcome, RuntimeConfig, WireRuntime};

async fn final_prop(rt: &WireRuntime, node: uuid::Uuid, key: &str) -> Option<Value> {
    rt.graph().read().await.prop(node, key).cloned()
}

#[tokio::test]
async fn prompt_output_lands_in_the_text_node() {
    let mut g = Graph::new();
    let registry = builtin_registry();

    let t = g.add_node(NodeSpec::new(NodeType::Trigger));
    let p = g.add_node(NodeSpec::new(NodeType::Prompt).with_prop("text", "hello world"));
    let x = g.add_node(NodeSpec::new(NodeType::Text));
    connect(&mut g, &registry, t, p).unwrap();
    connect(&mut g, &registry, p, x).unwrap();

    let rt = WireRuntime::new(g, builtin_registry(), RuntimeConfig::default()).unwrap();
    let report = rt.run_workflow(t).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed.len(), 3);
    // The text node wrote its input back into the live graph.
    assert_eq!(final_prop(&rt, x, "text").await, Some(Value::from("hello world")));
}

#[tokio::test]
async fn prompt_splices_piped_text_into_its_placeholder() {
    let mut g = Graph::new();
    let registry = builtin_registry();

    let p1 = g.add_node(NodeSpec::new(NodeType::Prompt).with_prop("text", "alpha"));
    let p2 = g.add_node(NodeSpec::new(NodeType::Prompt).with_prop("text", "[{{text}}]"));
    let x = g.add_node(NodeSpec::new(NodeType::Text));
    connect(&mut g, &registry, p1, p2).unwrap();
    connect(&mut g, &registry, p2, x).unwrap();

    let rt = WireRuntime::new(g, builtin_registry(), RuntimeConfig::default()).unwrap();
    let report = rt.run_workflow(p1).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(final_prop(&rt, x, "text").await, Some(Value::from("[alpha]")));
}

#[tokio::test]
async fn aggregator_renders_its_template_from_both_parents() {
    let mut g = Graph::new();
    let registry = builtin_registry();

    let t = g.add_node(NodeSpec::new(NodeType::Trigger));
    let p1 = g.add_node(NodeSpec::new(NodeType::Prompt).with_prop("text", "sun"));
    let p2 = g.add_node(NodeSpec::new(NodeType::Prompt).with_prop("text", "moon"));
    let a = g.add_node(
        NodeSpec::new(NodeType::Aggregator).with_prop("template", "{{input-1}} and {{input-2}}"),
    );
    let x = g.add_node(NodeSpec::new(NodeType::Text));
    connect(&mut g, &registry, t, p1).unwrap();
    connect(&mut g, &registry, t, p2).unwrap();
    connect(&mut g, &registry, p1, a).unwrap();
    connect(&mut g, &registry, p2, a).unwrap();
    connect(&mut g, &registry, a, x).unwrap();

    let rt = WireRuntime::new(g, builtin_registry(), RuntimeConfig::default()).unwrap();
    let report = rt.run_workflow(t).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.completed.len(), 5);
    assert_eq!(final_prop(&rt, x, "text").await, Some(Value::from("sun and moon")));
}

#[tokio::test]
async fn aggregator_without_template_concatenates_in_slot_order() {
    let mut g = Graph::new();
    let registry = builtin_registry();

    let p1 = g.add_node(NodeSpec::new(NodeType::Prompt).with_prop("text", "first"));
    let p2 = g.add_node(NodeSpec::new(NodeType::Prompt).with_prop("text", "second"));
    let t = g.add_node(NodeSpec::new(NodeType::Trigger));
    let a = g.add_node(NodeSpec::new(NodeType::Aggregator));
    let x = g.add_node(NodeSpec::new(NodeType::Text));
    connect(&mut g, &registry, t, p1).unwrap();
    connect(&mut g, &registry, t, p2).unwrap();
    connect(&mut g, &registry, p1, a).unwrap();
    connect(&mut g, &registry, p2, a).unwrap();
    connect(&mut g, &registry, a, x).unwrap();

    let rt = WireRuntime::new(g, builtin_registry(), RuntimeConfig::default()).unwrap();
    let report = rt.run_workflow(t).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(final_prop(&rt, x, "text").await, Some(Value::from("first\nsecond")));
}

#[tokio::test]
async fn text_node_without_inbound_text_fails_validation() {
    let mut g = Graph::new();

    // A trigger wired straight into a text node delivers no text.
    let registry = builtin_registry();
    let t = g.add_node(NodeSpec::new(NodeType::Trigger));
    let x = g.add_node(NodeSpec::new(NodeType::Text));
    connect(&mut g, &registry, t, x).unwrap();

    let rt = WireRuntime::new(g, builtin_registry(), RuntimeConfig::default()).unwrap();
    let report = rt.run_workflow(t).await.unwrap();

    match report.outcome {
        RunOutcome::Failed { node, reason } => {
            assert_eq!(node, x);
            assert!(reason.contains("missing required slot"), "reason was: {reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
