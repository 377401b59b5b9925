use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::{HashMap, HashSet};
use wirecore::{Graph, GraphError, NodeId};

/// Immutable execution plan rooted at a start node.
///
/// Frozen before the run begins so that graph edits made by executors
/// mid-run cannot corrupt the join-barrier accounting.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    start: NodeId,
    /// For every reachable node, its `(child, input slot)` fan-out.
    children: HashMap<NodeId, Vec<(NodeId, String)>>,
    /// Inbound edges each node must receive before it may fire.
    required_inputs: HashMap<NodeId, usize>,
}

impl Snapshot {
    /// Traverse the graph from `start` and freeze the plan.
    ///
    /// Depth-first with a visited set; an edge contributes a child only
    /// when its `end` role is bound and its slot resolved. Cyclic
    /// reachable subgraphs and duplicate slot bindings are build-time
    /// errors, not runtime surprises.
    pub fn build(graph: &Graph, start: NodeId) -> Result<Snapshot, GraphError> {
        if !graph.contains_node(start) {
            return Err(GraphError::MissingNode(start));
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut children: HashMap<NodeId, Vec<(NodeId, String)>> = HashMap::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            if !graph.contains_node(node) {
                return Err(GraphError::MissingNode(node));
            }

            let fan_out: Vec<(NodeId, String)> = graph
                .outgoing_edges(node)
                .filter_map(|e| match (e.target, e.slot.clone()) {
                    // Unassigned edges contribute no dependency.
                    (Some(target), Some(slot)) => Some((target, slot)),
                    _ => None,
                })
                .collect();

            for (child, _) in &fan_out {
                if !visited.contains(child) {
                    stack.push(*child);
                }
            }
            children.insert(node, fan_out);
        }

        Self::reject_cycles(start, &children)?;

        let mut required_inputs = HashMap::new();
        for &node in &visited {
            let mut seen_slots: HashSet<&str> = HashSet::new();
            let mut count = 0usize;
            for edge in graph.incoming_edges(node) {
                count += 1;
                let slot = edge.slot.as_deref().ok_or_else(|| {
                    GraphError::InvalidConnection(format!(
                        "edge {} into {} has no assigned input slot",
                        edge.id, node
                    ))
                })?;
                if edge.source.is_none() {
                    return Err(GraphError::InvalidConnection(format!(
                        "edge {} into {} has no source",
                        edge.id, node
                    )));
                }
                if !seen_slots.insert(slot) {
                    return Err(GraphError::DuplicateSlotBinding {
                        node,
                        slot: slot.to_string(),
                    });
                }
            }
            required_inputs.insert(node, count);
        }

        Ok(Snapshot {
            start,
            children,
            required_inputs,
        })
    }

    fn reject_cycles(
        start: NodeId,
        children: &HashMap<NodeId, Vec<(NodeId, String)>>,
    ) -> Result<(), GraphError> {
        let mut dag: DiGraph<NodeId, ()> = DiGraph::new();
        let mut index = HashMap::new();
        for &node in children.keys() {
            index.insert(node, dag.add_node(node));
        }
        for (node, fan_out) in children {
            for (child, _) in fan_out {
                if let (Some(&a), Some(&b)) = (index.get(node), index.get(child)) {
                    dag.add_edge(a, b, ());
                }
            }
        }
        if toposort(&dag, None).is_err() {
            return Err(GraphError::CyclicGraph { start });
        }
        Ok(())
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    /// Every node reachable by this plan.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.keys().copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.children.contains_key(&node)
    }

    pub fn children(&self, node: NodeId) -> &[(NodeId, String)] {
        self.children.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn required_inputs(&self, node: NodeId) -> usize {
        self.required_inputs.get(&node).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
