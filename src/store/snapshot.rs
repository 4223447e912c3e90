//! snapshot.rs
//! Plain serializable image of a registry. Connectivity flags, owners and
//! indexes are derived again on restore, so only the primary fields are kept.

use super::registry::Registry;
use super::types::*;
use super::value::Value;
use crate::analysis::integrity::{self, IntegrityError, IntegrityErrorType};
use crate::graph::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberRecord {
    pub id: EntityId,
    pub role: NumberRole,
    pub value: Value,
    #[serde(default)]
    pub reversed: bool,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub id: EntityId,
    pub kind: OperatorKind,
    #[serde(default)]
    pub mode: OperatorMode,
    pub input1: EntityId,
    pub input2: EntityId,
    pub output: EntityId,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    pub id: EntityId,
    pub origin: EntityId,
    pub target: EntityId,
    #[serde(default)]
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub next_id: u32,
    pub numbers: Vec<NumberRecord>,
    pub operators: Vec<OperatorRecord>,
    pub wires: Vec<WireRecord>,
    #[serde(default)]
    pub selected: Vec<EntityId>,
}

impl Snapshot {
    /// Captures every number, operator and finalized wire. Pending wires are dropped.
    pub fn capture(registry: &Registry) -> Self {
        let numbers = registry
            .numbers
            .values()
            .map(|n| NumberRecord {
                id: n.id,
                role: n.role,
                value: n.value,
                reversed: n.reversed,
                position: n.position,
            })
            .collect();

        let operators = registry
            .operators
            .values()
            .map(|op| OperatorRecord {
                id: op.id,
                kind: op.kind,
                mode: op.mode,
                input1: op.input1,
                input2: op.input2,
                output: op.output,
                position: op.position,
            })
            .collect();

        let wires = registry
            .wires
            .values()
            .filter_map(|w| {
                Some(WireRecord {
                    id: w.id,
                    origin: w.origin,
                    target: w.target?,
                    reversed: w.reversed,
                })
            })
            .collect();

        let selected = registry.selected.iter().copied().filter(|id| {
            registry.wires.get(id).map_or(true, Wire::is_connected)
        }).collect();

        Self { next_id: registry.next_id().0, numbers, operators, wires, selected }
    }

    /// Rebuilds a registry and checks it. Nothing is returned unless every check passes.
    pub fn into_registry(&self) -> GraphResult<Registry> {
        let mut registry = Registry::new();
        let mut collisions = Vec::new();
        let mut seen = BTreeSet::new();
        let ids = self
            .numbers
            .iter()
            .map(|n| n.id)
            .chain(self.operators.iter().map(|o| o.id))
            .chain(self.wires.iter().map(|w| w.id));
        for id in ids {
            if !seen.insert(id) {
                collisions.push(IntegrityError {
                    entity: id,
                    error_type: IntegrityErrorType::IdCollision,
                    message: format!("id {} appears more than once in the snapshot", id),
                });
            }
            if id.0 == u32::MAX {
                collisions.push(IntegrityError {
                    entity: id,
                    error_type: IntegrityErrorType::IdCollision,
                    message: format!("id {} leaves no room for the allocator", id),
                });
            }
        }
        if self.next_id == u32::MAX {
            collisions.push(IntegrityError {
                entity: EntityId(self.next_id),
                error_type: IntegrityErrorType::IdCollision,
                message: "allocator is exhausted".to_string(),
            });
        }
        if !collisions.is_empty() {
            return Err(GraphError::Integrity(collisions));
        }

        for record in &self.numbers {
            let mut node = NumberNode::new(record.id, record.role, record.value);
            node.reversed = record.reversed;
            node.position = record.position;
            registry.insert_number(node);
        }

        for record in &self.operators {
            for member in [record.input1, record.input2, record.output] {
                // A member naming another operator's number is caught by the checker.
                if let Some(node) = registry.number_mut(member) {
                    if node.owner.is_none() {
                        node.owner = Some(record.id);
                    }
                }
            }
            registry.insert_operator(OperatorNode {
                id: record.id,
                kind: record.kind,
                mode: record.mode,
                input1: record.input1,
                input2: record.input2,
                output: record.output,
                position: record.position,
            });
        }

        for record in &self.wires {
            registry.insert_wire(Wire {
                id: record.id,
                origin: record.origin,
                target: Some(record.target),
                reversed: record.reversed,
            });
        }

        registry.selected.extend(self.selected.iter().copied());
        registry.advance_allocator(self.next_id);

        integrity::validate(&registry).map_err(GraphError::Integrity)?;
        Ok(registry)
    }

    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string(self).map_err(|e| GraphError::Encoding(e.to_string()))
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::Encoding(e.to_string()))
    }
}
