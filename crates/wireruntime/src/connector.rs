use crate::Registry;
use wirecore::{EdgeId, Graph, GraphError, InputContract, NodeId};

/// Connection-time slot assignment.
///
/// Used when the editor drops an edge's free end on a node, before any
/// snapshot is built. Decides which named input of the target a new
/// edge may occupy and whether a source/target pair can connect at all.
pub struct Connector<'a> {
    graph: &'a Graph,
    registry: &'a Registry,
}

impl<'a> Connector<'a> {
    pub fn new(graph: &'a Graph, registry: &'a Registry) -> Self {
        Self { graph, registry }
    }

    /// Input slots of `target` not yet occupied by an inbound edge.
    ///
    /// For a variadic target the only available slot is the next
    /// numbered one, `input-N+1`, where N is the highest index already
    /// bound (0 when none are).
    pub fn available_input_slots(&self, target: NodeId) -> Result<Vec<String>, GraphError> {
        let contract = &self.lookup(target)?.inputs;
        let occupied = self.graph.occupied_input_slots(target);

        match contract {
            InputContract::Variadic => {
                let highest = occupied
                    .iter()
                    .filter_map(|slot| slot.strip_prefix("input-")?.parse::<u64>().ok())
                    .max()
                    .unwrap_or(0);
                Ok(vec![format!("input-{}", highest + 1)])
            }
            InputContract::Fixed { slots } => Ok(slots
                .iter()
                .map(|s| s.name.clone())
                .filter(|name| !occupied.contains(name))
                .collect()),
        }
    }

    /// Available slots of `target` that the output of `source` may
    /// occupy: every available slot when the target is variadic or the
    /// source declares no output, otherwise the slots whose declared
    /// type equals the source's output type.
    pub fn matching_input_slots(
        &self,
        source: NodeId,
        target: NodeId,
    ) -> Result<Vec<String>, GraphError> {
        let available = self.available_input_slots(target)?;
        let target_contract = &self.lookup(target)?.inputs;
        let source_output = self.lookup(source)?.output;

        if target_contract.is_variadic() {
            return Ok(available);
        }
        let source_output = match source_output {
            None => return Ok(available),
            Some(t) => t,
        };

        Ok(available
            .into_iter()
            .filter(|name| {
                target_contract
                    .slot(name)
                    .is_some_and(|s| s.value_type == source_output)
            })
            .collect())
    }

    /// Whether a new edge from `source` to `target` is admissible.
    pub fn can_connect(&self, source: NodeId, target: NodeId) -> Result<bool, GraphError> {
        if source == target {
            return Ok(false);
        }
        Ok(!self.matching_input_slots(source, target)?.is_empty())
    }

    /// Slot a newly drawn edge would be assigned, if any.
    pub fn slot_for_new_connection(
        &self,
        source: NodeId,
        target: NodeId,
    ) -> Result<Option<String>, GraphError> {
        if source == target {
            return Ok(None);
        }
        Ok(self.matching_input_slots(source, target)?.into_iter().next())
    }

    fn lookup(&self, node: NodeId) -> Result<&crate::Registration, GraphError> {
        let node_type = self.graph.node_type(node)?;
        self.registry.lookup(node_type)
    }
}

/// Create an edge from `source` to `target`, binding both roles and
/// assigning the first matching input slot.
pub fn connect(
    graph: &mut Graph,
    registry: &Registry,
    source: NodeId,
    target: NodeId,
) -> Result<EdgeId, GraphError> {
    let slot = Connector::new(graph, registry)
        .slot_for_new_connection(source, target)?
        .ok_or_else(|| {
            GraphError::InvalidConnection(format!("no matching input slot on {} for {}", target, source))
        })?;

    let edge = graph.add_edge();
    graph.bind_start(edge, source)?;
    graph.bind_end(edge, target, slot)?;
    Ok(edge)
}
