use crate::{GraphError, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

pub type NodeId = Uuid;
pub type EdgeId = Uuid;

/// Closed set of node kinds known to the engine.
///
/// Graph files carry the string tag; unknown tags are rejected when the
/// graph is loaded, not when a node fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeType {
    Prompt,
    Text,
    Aggregator,
    Trigger,
}

impl NodeType {
    pub const ALL: [NodeType; 4] = [
        NodeType::Prompt,
        NodeType::Text,
        NodeType::Aggregator,
        NodeType::Trigger,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            NodeType::Prompt => "prompt",
            NodeType::Text => "text",
            NodeType::Aggregator => "aggregator",
            NodeType::Trigger => "trigger",
        }
    }
}

impl FromStr for NodeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == s)
            .ok_or_else(|| GraphError::UnregisteredNodeType(s.to_string()))
    }
}

impl TryFrom<String> for NodeType {
    type Error = GraphError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeType> for String {
    fn from(t: NodeType) -> Self {
        t.tag().to_string()
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Node placement on the page, used to answer point-containment queries
/// when an edge's free end is dropped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.w && y >= self.y && y <= self.y + self.h
    }
}

/// A typed unit of computation placed in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub node_type: NodeType,
    /// Display state owned by the graph; executors may read and update it.
    pub props: HashMap<String, Value>,
    pub bounds: Option<Bounds>,
}

impl NodeSpec {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type,
            props: HashMap::new(),
            bounds: None,
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn with_bounds(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.bounds = Some(Bounds { x, y, w, h });
        self
    }
}

/// Directed connection between nodes.
///
/// The `source`/`target` fields encode the `start`/`end` binding roles;
/// either may be absent while an edge is being drawn. `slot` names the
/// target input the source's output will populate and stays unresolved
/// until assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: Option<NodeId>,
    pub target: Option<NodeId>,
    pub slot: Option<String>,
}

impl Edge {
    pub fn is_dangling(&self) -> bool {
        self.target.is_none()
    }
}

/// The live, user-editable graph.
///
/// Read queries over it form the engine's Graph Accessor; executors may
/// mutate node props mid-run, which is visible to the next snapshot build
/// but never to the plan already executing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeSpec) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeSpec> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn node_type(&self, id: NodeId) -> Result<NodeType, GraphError> {
        self.node(id)
            .map(|n| n.node_type)
            .ok_or(GraphError::MissingNode(id))
    }

    pub fn prop(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.node(id).and_then(|n| n.props.get(key))
    }

    pub fn set_prop(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(id).ok_or(GraphError::MissingNode(id))?;
        node.props.insert(key.into(), value.into());
        Ok(())
    }

    /// Topmost node whose bounds contain the page point, if any.
    /// Later-added nodes win, matching visual stacking order.
    pub fn node_at(&self, x: f32, y: f32) -> Option<NodeId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.bounds.is_some_and(|b| b.contains(x, y)))
            .map(|n| n.id)
    }

    /// Create a new edge with no bindings yet.
    pub fn add_edge(&mut self) -> EdgeId {
        let id = Uuid::new_v4();
        self.edges.push(Edge {
            id,
            source: None,
            target: None,
            slot: None,
        });
        id
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge, GraphError> {
        self.edges
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(GraphError::MissingEdge(id))
    }

    /// Bind the edge's `start` role to a source node.
    pub fn bind_start(&mut self, edge: EdgeId, source: NodeId) -> Result<(), GraphError> {
        if !self.contains_node(source) {
            return Err(GraphError::MissingNode(source));
        }
        self.edge_mut(edge)?.source = Some(source);
        Ok(())
    }

    /// Bind the edge's `end` role to a target node, assigning the input
    /// slot the delivered value will occupy.
    pub fn bind_end(
        &mut self,
        edge: EdgeId,
        target: NodeId,
        slot: impl Into<String>,
    ) -> Result<(), GraphError> {
        if !self.contains_node(target) {
            return Err(GraphError::MissingNode(target));
        }
        let e = self.edge_mut(edge)?;
        e.target = Some(target);
        e.slot = Some(slot.into());
        Ok(())
    }

    /// Remove the edge's `end` binding, leaving it dangling.
    pub fn unbind_end(&mut self, edge: EdgeId) -> Result<(), GraphError> {
        let e = self.edge_mut(edge)?;
        e.target = None;
        e.slot = None;
        Ok(())
    }

    pub fn remove_edge(&mut self, edge: EdgeId) {
        self.edges.retain(|e| e.id != edge);
    }

    /// Edges whose `start` role is bound to this node.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == Some(node))
    }

    /// Edges whose `end` role is bound to this node.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.target == Some(node))
    }

    pub fn resolved_input_slot(&self, edge: EdgeId) -> Option<&str> {
        self.edge(edge).and_then(|e| e.slot.as_deref())
    }

    /// Input slot names already occupied by inbound edges of this node.
    pub fn occupied_input_slots(&self, node: NodeId) -> Vec<String> {
        self.incoming_edges(node)
            .filter_map(|e| e.slot.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_round_trips_through_tags() {
        for t in NodeType::ALL {
            assert_eq!(t.tag().parse::<NodeType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_tag_is_rejected_at_parse_time() {
        let err = "llm-magic".parse::<NodeType>().unwrap_err();
        assert!(matches!(err, GraphError::UnregisteredNodeType(t) if t == "llm-magic"));
    }

    #[test]
    fn bindings_encode_start_and_end_roles() {
        let mut g = Graph::new();
        let a = g.add_node(NodeSpec::new(NodeType::Prompt));
        let b = g.add_node(NodeSpec::new(NodeType::Text));

        let e = g.add_edge();
        g.bind_start(e, a).unwrap();
        assert!(g.edge(e).unwrap().is_dangling());
        assert_eq!(g.incoming_edges(b).count(), 0);

        g.bind_end(e, b, "text").unwrap();
        assert_eq!(g.outgoing_edges(a).count(), 1);
        assert_eq!(g.incoming_edges(b).count(), 1);
        assert_eq!(g.resolved_input_slot(e), Some("text"));
        assert_eq!(g.occupied_input_slots(b), vec!["text".to_string()]);

        g.unbind_end(e).unwrap();
        assert!(g.edge(e).unwrap().is_dangling());
        assert_eq!(g.resolved_input_slot(e), None);
    }

    #[test]
    fn node_at_prefers_topmost_node() {
        let mut g = Graph::new();
        let below = g.add_node(NodeSpec::new(NodeType::Prompt).with_bounds(0.0, 0.0, 100.0, 100.0));
        let above = g.add_node(NodeSpec::new(NodeType::Text).with_bounds(50.0, 50.0, 100.0, 100.0));

        assert_eq!(g.node_at(10.0, 10.0), Some(below));
        assert_eq!(g.node_at(75.0, 75.0), Some(above));
        assert_eq!(g.node_at(500.0, 500.0), None);
    }
}
