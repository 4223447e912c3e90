//! Discovers the chains a reversal could run along.
//!
//! Tracing walks *against* the flow: from a driven number back through the
//! operator that drives it and the wires feeding that operator, until it
//! reaches operator inputs with no wires at all. Each such input is a free
//! node that could become the solved value. Tracing never mutates the graph.
use super::error::{GraphError, GraphResult};
use super::reversal;
use crate::store::{EntityId, Registry};

/// A free node together with the path leading to it, start first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalCandidate {
    pub free_node: EntityId,
    pub path: Vec<EntityId>,
}

/// How the walk arrived at an entity. Numbers behave differently depending
/// on which side they were entered from.
#[derive(Debug, Clone, Copy)]
enum Arrival {
    /// An independent slot entered from its operator.
    FromOperator(EntityId),
    /// A number entered along a wire, or the start of the trace.
    FromWire { number: EntityId, via: Option<EntityId> },
    Operator(EntityId),
    Wire(EntityId),
}

struct Branch {
    arrival: Arrival,
    /// Includes the id of the entity being arrived at.
    path: Vec<EntityId>,
}

impl Branch {
    fn extend(&self, arrival: Arrival, id: EntityId) -> Option<Branch> {
        // Cycle guard: a branch never revisits an id.
        if self.path.contains(&id) {
            return None;
        }
        let mut path = self.path.clone();
        path.push(id);
        Some(Branch { arrival, path })
    }
}

/// Whether `start` may begin a trace: it must be driven, either as the
/// dependent slot of its operator or as the end of a wire chain. A naked
/// number that still feeds a wire is a relay, not an end.
pub fn check_start(registry: &Registry, start: EntityId) -> GraphResult<()> {
    let node = registry.number(start).ok_or(GraphError::UnknownEntity(start))?;
    let bound = match node.owner {
        Some(op_id) => registry.operator(op_id).map_or(false, |op| op.dependent() == start),
        None => {
            registry.inbound_wire(start).is_some() && registry.outbound_wire(start).is_none()
        }
    };
    if bound {
        Ok(())
    } else {
        Err(GraphError::NotBound(start))
    }
}

/// Returns every free node reachable from `start`, in depth-first order.
/// Every returned path passes `reversal::validate_path`.
pub fn trace_free_nodes(
    registry: &Registry,
    start: EntityId,
) -> GraphResult<Vec<ReversalCandidate>> {
    check_start(registry, start)?;

    let mut candidates = Vec::new();
    let mut stack = vec![Branch {
        arrival: Arrival::FromWire { number: start, via: None },
        path: vec![start],
    }];

    while let Some(branch) = stack.pop() {
        match branch.arrival {
            Arrival::FromOperator(number) => {
                if registry.wires_of(number).is_empty() {
                    candidates.push(ReversalCandidate { free_node: number, path: branch.path });
                } else if registry.outbound_wire(number).is_none() {
                    // An outbound wire here would end up beside the flipped inbound one.
                    if let Some(wire) = registry.inbound_wire(number) {
                        stack.extend(branch.extend(Arrival::Wire(wire), wire));
                    }
                }
            }
            Arrival::FromWire { number, via } => {
                let Some(node) = registry.number(number) else { continue };
                match node.owner {
                    Some(op_id) => {
                        let drives = registry
                            .operator(op_id)
                            .map_or(false, |op| op.dependent() == number);
                        if drives {
                            stack.extend(branch.extend(Arrival::Operator(op_id), op_id));
                        }
                    }
                    None => {
                        let inbound = registry.inbound_wire(number).filter(|w| Some(*w) != via);
                        if let Some(wire) = inbound {
                            stack.extend(branch.extend(Arrival::Wire(wire), wire));
                        }
                    }
                }
            }
            Arrival::Operator(op_id) => {
                let Some(op) = registry.operator(op_id) else { continue };
                // Pushed in reverse so the first independent slot is explored first.
                for slot in op.independents().into_iter().rev() {
                    stack.extend(branch.extend(Arrival::FromOperator(slot), slot));
                }
            }
            Arrival::Wire(wire_id) => {
                let origin = registry.wire(wire_id).and_then(|w| w.effective_origin());
                let Some(origin) = origin else { continue };
                let arrival = Arrival::FromWire { number: origin, via: Some(wire_id) };
                stack.extend(branch.extend(arrival, origin));
            }
        }
    }

    // Drops chains that were already inconsistent before the trace, such as a
    // dependent slot that also has an inbound wire.
    candidates.retain(|c| reversal::validate_path(registry, &c.path).is_ok());
    Ok(candidates)
}
