use uuid::Uuid;
use wirecore::{Edge, Graph, GraphError, NodeSpec, NodeType};
use wireruntime::Snapshot;

fn node(graph: &mut Graph, node_type: NodeType) -> Uuid {
    graph.add_node(NodeSpec::new(node_type))
}

fn wire(graph: &mut Graph, source: Uuid, target: Uuid, slot: &str) {
    let e = graph.add_edge();
    graph.bind_start(e, source).unwrap();
    graph.bind_end(e, target, slot).unwrap();
}

/// trigger -> prompt -> text
fn chain() -> (Graph, Uuid, Uuid, Uuid) {
    let mut g = Graph::new();
    let t = node(&mut g, NodeType::Trigger);
    let p = node(&mut g, NodeType::Prompt);
    let x = node(&mut g, NodeType::Text);
    wire(&mut g, t, p, "text");
    wire(&mut g, p, x, "text");
    (g, t, p, x)
}

/// trigger fans out to two prompts converging on an aggregator
fn diamond() -> (Graph, Uuid, Uuid, Uuid, Uuid) {
    let mut g = Graph::new();
    let t = node(&mut g, NodeType::Trigger);
    let p1 = node(&mut g, NodeType::Prompt);
    let p2 = node(&mut g, NodeType::Prompt);
    let a = node(&mut g, NodeType::Aggregator);
    wire(&mut g, t, p1, "text");
    wire(&mut g, t, p2, "text");
    wire(&mut g, p1, a, "input-1");
    wire(&mut g, p2, a, "input-2");
    (g, t, p1, p2, a)
}

#[test]
fn chain_visits_each_reachable_node_once() {
    let (g, t, p, x) = chain();
    let snapshot = Snapshot::build(&g, t).unwrap();

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.start(), t);
    assert_eq!(snapshot.children(t), &[(p, "text".to_string())]);
    assert_eq!(snapshot.children(p), &[(x, "text".to_string())]);
    assert!(snapshot.children(x).is_empty());
}

#[test]
fn required_counts_equal_inbound_end_bindings() {
    let (g, t, p1, p2, a) = diamond();
    let snapshot = Snapshot::build(&g, t).unwrap();

    assert_eq!(snapshot.required_inputs(t), 0);
    assert_eq!(snapshot.required_inputs(p1), 1);
    assert_eq!(snapshot.required_inputs(p2), 1);
    assert_eq!(snapshot.required_inputs(a), 2);
}

#[test]
fn only_the_start_node_has_zero_required_inputs() {
    let (g, t, _, _, _) = diamond();
    let snapshot = Snapshot::build(&g, t).unwrap();

    for n in snapshot.nodes() {
        if n != snapshot.start() {
            assert!(snapshot.required_inputs(n) > 0, "non-start node with no inbound edges");
        }
    }
}

#[test]
fn building_twice_from_unchanged_graph_is_identical() {
    let (g, t, _, _, _) = diamond();
    let first = Snapshot::build(&g, t).unwrap();
    let second = Snapshot::build(&g, t).unwrap();
    assert_eq!(first, second);
}

#[test]
fn unreachable_nodes_are_excluded() {
    let (mut g, t, _, _) = chain();
    let orphan = node(&mut g, NodeType::Prompt);

    let snapshot = Snapshot::build(&g, t).unwrap();
    assert!(!snapshot.contains(orphan));
    assert_eq!(snapshot.len(), 3);
}

#[test]
fn run_from_mid_graph_scopes_the_plan() {
    let (g, _, p, x) = chain();
    let snapshot = Snapshot::build(&g, p).unwrap();

    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.contains(p));
    assert!(snapshot.contains(x));
    // The inbound edge from the trigger still counts at build time.
    assert_eq!(snapshot.required_inputs(p), 1);
}

#[test]
fn dangling_edges_contribute_no_children() {
    let (mut g, t, p, _) = chain();
    let e = g.add_edge();
    g.bind_start(e, t).unwrap();

    let snapshot = Snapshot::build(&g, t).unwrap();
    assert_eq!(snapshot.children(t), &[(p, "text".to_string())]);
}

#[test]
fn missing_start_node_is_rejected() {
    let g = Graph::new();
    let err = Snapshot::build(&g, Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, GraphError::MissingNode(_)));
}

#[test]
fn cycles_are_rejected_at_build_time() {
    let mut g = Graph::new();
    let a = node(&mut g, NodeType::Prompt);
    let b = node(&mut g, NodeType::Text);
    wire(&mut g, a, b, "text");
    wire(&mut g, b, a, "text");

    let err = Snapshot::build(&g, a).unwrap_err();
    assert!(matches!(err, GraphError::CyclicGraph { start } if start == a));
}

#[test]
fn duplicate_slot_bindings_are_rejected() {
    let mut g = Graph::new();
    let t = node(&mut g, NodeType::Trigger);
    let p1 = node(&mut g, NodeType::Prompt);
    let p2 = node(&mut g, NodeType::Prompt);
    let x = node(&mut g, NodeType::Text);
    wire(&mut g, t, p1, "text");
    wire(&mut g, t, p2, "text");
    wire(&mut g, p1, x, "text");
    wire(&mut g, p2, x, "text");

    let err = Snapshot::build(&g, t).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateSlotBinding { node, slot } if node == x && slot == "text"));
}

#[test]
fn end_binding_without_slot_is_rejected() {
    let (mut g, t, p, _) = chain();
    // The store contract always assigns a slot with an end binding;
    // forge an edge that skipped it.
    g.edges.push(Edge {
        id: Uuid::new_v4(),
        source: Some(t),
        target: Some(p),
        slot: None,
    });

    let err = Snapshot::build(&g, t).unwrap_err();
    assert!(matches!(err, GraphError::InvalidConnection(_)));
}
