//! circuit.rs
//! The command surface of the editor engine. Every command either succeeds
//! completely (cascades included) or returns an error and changes nothing.

use super::error::{GraphError, GraphResult};
use super::reversal;
use super::trace::{self, ReversalCandidate};
use crate::analysis::integrity::{self, IntegrityError};
use crate::analysis::telemetry::ResidualReport;
use crate::analysis::topology;
use crate::compute::{Engine, TickReport};
use crate::config::EngineConfig;
use crate::display;
use crate::store::*;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Ids of a freshly created operator and its three numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorHandle {
    pub operator: EntityId,
    pub input1: EntityId,
    pub input2: EntityId,
    pub output: EntityId,
}

/// Candidates from the last trace, waiting for the user to pick one.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReversal {
    pub start: EntityId,
    pub candidates: Vec<ReversalCandidate>,
}

#[derive(Debug, Clone, Default)]
pub struct CircuitGraph {
    registry: Registry,
    config: EngineConfig,
    pending: Option<PendingReversal>,
}

impl CircuitGraph {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: EngineConfig) -> GraphResult<Self> {
        config.validate()?;
        Ok(Self { config, ..Self::default() })
    }

    /// Builds a graph directly from a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot, config: EngineConfig) -> GraphResult<Self> {
        let mut graph = Self::with_config(config)?;
        graph.restore(snapshot)?;
        Ok(graph)
    }

    // --- Accessors ---

    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn number(&self, id: EntityId) -> Option<&NumberNode> { self.registry.number(id) }
    pub fn operator(&self, id: EntityId) -> Option<&OperatorNode> { self.registry.operator(id) }
    pub fn wire(&self, id: EntityId) -> Option<&Wire> { self.registry.wire(id) }

    #[inline(always)]
    pub fn value(&self, id: EntityId) -> Option<Value> { self.registry.number(id).map(|n| n.value) }

    pub fn numbers(&self) -> impl Iterator<Item = &NumberNode> { self.registry.numbers.values() }
    pub fn operators(&self) -> impl Iterator<Item = &OperatorNode> {
        self.registry.operators.values()
    }
    pub fn wires(&self) -> impl Iterator<Item = &Wire> { self.registry.wires.values() }
    pub fn selected(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.registry.selected.iter().copied()
    }
    pub fn pending_reversal(&self) -> Option<&PendingReversal> { self.pending.as_ref() }

    fn expect_number(&self, id: EntityId) -> GraphResult<&NumberNode> {
        match self.registry.number(id) {
            Some(node) => Ok(node),
            None if self.registry.contains(id) => {
                Err(GraphError::WrongKind { id, expected: "number" })
            }
            None => Err(GraphError::UnknownEntity(id)),
        }
    }

    fn expect_wire(&self, id: EntityId) -> GraphResult<&Wire> {
        match self.registry.wire(id) {
            Some(wire) => Ok(wire),
            None if self.registry.contains(id) => {
                Err(GraphError::WrongKind { id, expected: "wire" })
            }
            None => Err(GraphError::UnknownEntity(id)),
        }
    }

    /// Structural edits make a traced path meaningless.
    fn invalidate_trace(&mut self) {
        if self.pending.take().is_some() {
            debug!("pending reversal discarded by structural edit");
        }
    }

    // --- Creation ---

    /// Creates a naked number at the origin. Operator-owned roles are rejected.
    pub fn create_number(&mut self, role: NumberRole) -> GraphResult<EntityId> {
        if role != NumberRole::Naked {
            return Err(GraphError::RoleRequiresOperator(role));
        }
        Ok(self.create_number_at(Value::ZERO, Position::default()))
    }

    pub fn create_number_at(&mut self, value: Value, position: Position) -> EntityId {
        self.invalidate_trace();
        let id = self.registry.add_number(NumberRole::Naked, value, position, None);
        debug!(number = %id, value = %value, "number created");
        id
    }

    pub fn create_operator(&mut self, kind: OperatorKind) -> OperatorHandle {
        self.create_operator_at(kind, Position::default())
    }

    /// Creates an operator with its three numbers and evaluates it once.
    pub fn create_operator_at(&mut self, kind: OperatorKind, position: Position) -> OperatorHandle {
        self.invalidate_trace();
        let [operator, input1, input2, output] = self.registry.add_operator(kind, position);
        Engine::evaluate_forward(&mut self.registry, operator);
        debug!(operator = %operator, kind = kind.symbol(), "operator created");
        OperatorHandle { operator, input1, input2, output }
    }

    // --- Wiring ---

    /// Starts a wire from `origin`. The wire is pending until connected or cancelled.
    pub fn begin_wire(&mut self, origin: EntityId) -> GraphResult<EntityId> {
        let node = self.expect_number(origin)?;
        if !node.emits_outbound() {
            return Err(GraphError::IncompatiblePort { id: origin, side: "outbound" });
        }
        if self.registry.outbound_wire(origin).is_some() {
            return Err(GraphError::PortOccupied { id: origin, side: "outbound" });
        }
        let wire = self.registry.add_pending_wire(origin);
        debug!(wire = %wire, origin = %origin, "wire started");
        Ok(wire)
    }

    /// Finalizes a pending wire onto `target` and copies the origin value across.
    pub fn connect_wire(&mut self, wire_id: EntityId, target: EntityId) -> GraphResult<()> {
        let wire = self.expect_wire(wire_id)?;
        if wire.is_connected() {
            return Err(GraphError::WireAlreadyConnected(wire_id));
        }
        let origin = wire.origin;
        if origin == target {
            return Err(GraphError::SelfConnection { wire: wire_id, number: target });
        }

        let node = self.expect_number(target)?;
        if !node.accepts_inbound() {
            return Err(GraphError::IncompatiblePort { id: target, side: "inbound" });
        }
        if self.registry.inbound_wire(target).is_some() {
            return Err(GraphError::PortOccupied { id: target, side: "inbound" });
        }
        // Another pending wire from the same origin may have been connected first.
        if self.registry.outbound_wire(origin).is_some() {
            return Err(GraphError::PortOccupied { id: origin, side: "outbound" });
        }

        self.invalidate_trace();
        self.registry.attach_wire(wire_id, target);
        if let Some(wire) = self.registry.wire(wire_id).cloned() {
            Engine::propagate(&wire, &mut self.registry.numbers);
        }
        debug!(wire = %wire_id, origin = %origin, target = %target, "wire connected");
        Ok(())
    }

    /// Drops a wire that was never connected.
    pub fn cancel_wire(&mut self, wire_id: EntityId) -> GraphResult<()> {
        if self.expect_wire(wire_id)?.is_connected() {
            return Err(GraphError::WireAlreadyConnected(wire_id));
        }
        self.registry.remove_wire(wire_id);
        debug!(wire = %wire_id, "wire cancelled");
        Ok(())
    }

    // --- Removal ---

    /// Removes an entity with its cascade. Returns every removed id.
    pub fn remove_entity(&mut self, id: EntityId) -> GraphResult<Vec<EntityId>> {
        let removed = if let Some(node) = self.registry.number(id) {
            if let Some(operator) = node.owner {
                return Err(GraphError::OwnedByOperator { number: id, operator });
            }
            self.registry.remove_number(id)
        } else if self.registry.operators.contains_key(&id) {
            self.registry.remove_operator(id)
        } else if self.registry.wires.contains_key(&id) {
            self.registry.remove_wire(id).map(|w| vec![w.id]).unwrap_or_default()
        } else {
            return Err(GraphError::UnknownEntity(id));
        };

        self.invalidate_trace();
        debug!(entity = %id, cascade = removed.len(), "entity removed");
        Ok(removed)
    }

    /// Removes everything selected. Owned numbers go with their operator.
    pub fn remove_selected(&mut self) -> Vec<EntityId> {
        let selected: Vec<EntityId> = self.registry.selected.iter().copied().collect();
        let mut removed = Vec::new();

        // Operators first, so their members are gone before the loose entities.
        let (operators, rest): (Vec<_>, Vec<_>) =
            selected.into_iter().partition(|id| self.registry.operators.contains_key(id));
        for id in operators.into_iter().chain(rest) {
            if !self.registry.contains(id) {
                continue;
            }
            match self.remove_entity(id) {
                Ok(ids) => removed.extend(ids),
                // An owned number whose operator stays.
                Err(_) => {
                    self.registry.selected.remove(&id);
                }
            }
        }
        removed
    }

    // --- Selection ---

    /// Selecting an operator also selects its three numbers.
    pub fn select(&mut self, id: EntityId, selected: bool) -> GraphResult<()> {
        if !self.registry.contains(id) {
            return Err(GraphError::UnknownEntity(id));
        }
        let mut ids = vec![id];
        if let Some(op) = self.registry.operator(id) {
            ids.extend(op.members());
        }
        for id in ids {
            if selected {
                self.registry.selected.insert(id);
            } else {
                self.registry.selected.remove(&id);
            }
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) { self.registry.selected.clear(); }

    /// Moves every selected number and operator. Wires follow their ends.
    pub fn move_selected(&mut self, dx: f64, dy: f64) {
        let Registry { numbers, operators, selected, .. } = &mut self.registry;
        for id in selected.iter() {
            if let Some(node) = numbers.get_mut(id) {
                node.position.x += dx;
                node.position.y += dy;
            } else if let Some(op) = operators.get_mut(id) {
                op.position.x += dx;
                op.position.y += dy;
            }
        }
    }

    // --- Values ---

    /// User edit of a number. A driven number is overwritten again on the next tick.
    pub fn set_value(&mut self, number: EntityId, value: Value) -> GraphResult<()> {
        self.expect_number(number)?;
        if let Some(node) = self.registry.number_mut(number) {
            node.set_value(value);
        }
        Ok(())
    }

    // --- Reversal ---

    /// Traces the free nodes behind `start` and keeps them as the pending reversal.
    pub fn begin_reversal_trace(&mut self, start: EntityId) -> GraphResult<Vec<ReversalCandidate>> {
        let candidates = trace::trace_free_nodes(&self.registry, start)?;
        debug!(
            start = %start,
            candidates = candidates.len(),
            "{}",
            display::format_candidates(&self.registry, start, &candidates)
        );
        self.pending = Some(PendingReversal { start, candidates: candidates.clone() });
        Ok(candidates)
    }

    /// Reverses `path`. The path must run against the current flow from a driven
    /// number to an unwired one, as a trace produces it, or be such a path already
    /// applied. Anything else is `MalformedPath` and leaves the graph unchanged.
    pub fn apply_reversal(&mut self, path: &[EntityId]) -> GraphResult<()> {
        reversal::apply(&mut self.registry, path)?;
        self.pending = None;
        debug!(path = %display::format_path(&self.registry, path), "reversal applied");
        Ok(())
    }

    /// Applies the pending candidate that ends at `free_node`.
    pub fn choose_reversal(&mut self, free_node: EntityId) -> GraphResult<()> {
        let path = self
            .pending
            .as_ref()
            .and_then(|p| p.candidates.iter().rev().find(|c| c.free_node == free_node))
            .map(|c| c.path.clone())
            .ok_or(GraphError::NoSuchCandidate(free_node))?;
        self.apply_reversal(&path)
    }

    pub fn cancel_reversal(&mut self) { self.pending = None; }

    // --- Evaluation ---

    pub fn tick(&mut self) -> TickReport { Engine::run(&mut self.registry, &self.config) }

    pub fn residuals(&self) -> ResidualReport { ResidualReport::analyze(&self.registry) }

    pub fn validate(&self) -> Result<(), Vec<IntegrityError>> {
        integrity::validate(&self.registry)
    }

    pub fn feedback_loops(&self) -> Vec<Vec<EntityId>> { topology::feedback_loops(&self.registry) }

    /// Numbers whose values depend on `number`.
    pub fn downstream_from(&self, number: EntityId) -> BTreeSet<EntityId> {
        topology::downstream_from(&self.registry, number)
    }

    // --- Persistence ---

    pub fn snapshot(&self) -> Snapshot { Snapshot::capture(&self.registry) }

    /// Replaces the whole graph. On failure the current graph is kept.
    pub fn restore(&mut self, snapshot: &Snapshot) -> GraphResult<()> {
        match snapshot.into_registry() {
            Ok(registry) => {
                self.registry = registry;
                self.pending = None;
                debug!(entities = self.registry.count(), "snapshot restored");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "snapshot rejected");
                Err(err)
            }
        }
    }
}
