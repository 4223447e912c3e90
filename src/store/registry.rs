//! registry.rs
//! Arena of numbers, operators and wires keyed by `EntityId`, plus the
//! indexes needed for cascading deletes and connectivity queries.

use super::types::*;
use super::value::Value;
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet};

/// Wire ids touching one number. A well-formed number has at most two.
pub type WireList = SmallVec<[EntityId; 2]>;

/// Horizontal distance from an operator's centre to each input.
const INPUT_X_OFFSET: f64 = 150.0;
/// Vertical distance from an operator's centre to its inputs and output.
const SLOT_Y_OFFSET: f64 = 190.0;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Ordered maps keep ticks and snapshots deterministic.
    pub numbers: BTreeMap<EntityId, NumberNode>,
    pub operators: BTreeMap<EntityId, OperatorNode>,
    pub wires: BTreeMap<EntityId, Wire>,

    // Indexes
    pub operator_members: BTreeMap<EntityId, [EntityId; 3]>,
    /// Finalized wires only; pending wires are found by scanning `wires`.
    pub number_wires: BTreeMap<EntityId, WireList>,

    pub selected: BTreeSet<EntityId>,

    next_id: u32,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn count(&self) -> usize { self.numbers.len() + self.operators.len() + self.wires.len() }

    pub fn next_id(&self) -> EntityId { EntityId(self.next_id) }

    pub fn contains(&self, id: EntityId) -> bool {
        self.numbers.contains_key(&id)
            || self.operators.contains_key(&id)
            || self.wires.contains_key(&id)
    }

    /// Ids are never reused. The counter stops at `u32::MAX`, which restore refuses.
    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    /// Moves the allocator forward so it never hands out `next` or anything below.
    pub(crate) fn advance_allocator(&mut self, next: u32) {
        self.next_id = self.next_id.max(next);
    }

    fn advance_past(&mut self, id: EntityId) {
        if let Some(next) = id.0.checked_add(1) {
            self.advance_allocator(next);
        }
    }

    // --- Accessors ---

    pub fn number(&self, id: EntityId) -> Option<&NumberNode> { self.numbers.get(&id) }
    pub fn number_mut(&mut self, id: EntityId) -> Option<&mut NumberNode> {
        self.numbers.get_mut(&id)
    }
    pub fn operator(&self, id: EntityId) -> Option<&OperatorNode> { self.operators.get(&id) }
    pub fn operator_mut(&mut self, id: EntityId) -> Option<&mut OperatorNode> {
        self.operators.get_mut(&id)
    }
    pub fn wire(&self, id: EntityId) -> Option<&Wire> { self.wires.get(&id) }
    pub fn wire_mut(&mut self, id: EntityId) -> Option<&mut Wire> { self.wires.get_mut(&id) }

    /// The operator owning `number`, if any.
    pub fn owner_of(&self, number: EntityId) -> Option<&OperatorNode> {
        self.numbers.get(&number)?.owner.and_then(|op| self.operators.get(&op))
    }

    #[inline(always)]
    pub fn wires_of(&self, number: EntityId) -> &[EntityId] {
        self.number_wires.get(&number).map(|w| w.as_slice()).unwrap_or(&[])
    }

    /// The finalized wire whose effective target is `number`.
    pub fn inbound_wire(&self, number: EntityId) -> Option<EntityId> {
        self.wires_of(number)
            .iter()
            .copied()
            .find(|w| self.wires.get(w).and_then(Wire::effective_target) == Some(number))
    }

    /// The finalized wire whose effective origin is `number`.
    pub fn outbound_wire(&self, number: EntityId) -> Option<EntityId> {
        self.wires_of(number)
            .iter()
            .copied()
            .find(|w| self.wires.get(w).and_then(Wire::effective_origin) == Some(number))
    }

    // --- Construction ---

    pub fn add_number(
        &mut self,
        role: NumberRole,
        value: Value,
        position: Position,
        owner: Option<EntityId>,
    ) -> EntityId {
        let id = self.allocate();
        let mut node = NumberNode::new(id, role, value);
        node.position = position;
        node.owner = owner;
        self.numbers.insert(id, node);
        id
    }

    /// Creates an operator and its three numbers. Returns `[operator, input1, input2, output]`.
    pub fn add_operator(&mut self, kind: OperatorKind, position: Position) -> [EntityId; 4] {
        let id = self.allocate();
        let default = kind.input_default();

        let input1 = self.add_number(
            NumberRole::Input,
            default,
            Position::new(position.x - INPUT_X_OFFSET, position.y - SLOT_Y_OFFSET),
            Some(id),
        );
        let input2 = self.add_number(
            NumberRole::Input,
            default,
            Position::new(position.x + INPUT_X_OFFSET, position.y - SLOT_Y_OFFSET),
            Some(id),
        );
        let output = self.add_number(
            NumberRole::Output,
            Value::ZERO,
            Position::new(position.x, position.y + SLOT_Y_OFFSET),
            Some(id),
        );

        self.operators.insert(id, OperatorNode {
            id,
            kind,
            mode: OperatorMode::Forward,
            input1,
            input2,
            output,
            position,
        });
        self.operator_members.insert(id, [input1, input2, output]);

        [id, input1, input2, output]
    }

    pub fn add_pending_wire(&mut self, origin: EntityId) -> EntityId {
        let id = self.allocate();
        self.wires.insert(id, Wire::pending(id, origin));
        id
    }

    /// Finalizes a pending wire. The caller has checked both ends.
    pub fn attach_wire(&mut self, wire_id: EntityId, target: EntityId) {
        let Some(wire) = self.wires.get_mut(&wire_id) else { return };
        wire.target = Some(target);
        let origin = wire.origin;
        self.index_wire(wire_id, origin, target);
    }

    fn index_wire(&mut self, wire_id: EntityId, origin: EntityId, target: EntityId) {
        for end in [origin, target] {
            let list = self.number_wires.entry(end).or_default();
            if !list.contains(&wire_id) {
                list.push(wire_id);
            }
        }
        self.refresh_flags(origin);
        self.refresh_flags(target);
    }

    // --- Restore ---

    pub(crate) fn insert_number(&mut self, node: NumberNode) {
        self.advance_past(node.id);
        self.numbers.insert(node.id, node);
    }

    pub(crate) fn insert_operator(&mut self, op: OperatorNode) {
        self.advance_past(op.id);
        self.operator_members.insert(op.id, op.members());
        self.operators.insert(op.id, op);
    }

    pub(crate) fn insert_wire(&mut self, wire: Wire) {
        self.advance_past(wire.id);
        let (id, origin, target) = (wire.id, wire.origin, wire.target);
        self.wires.insert(id, wire);
        if let Some(target) = target {
            self.index_wire(id, origin, target);
        }
    }

    // --- Connectivity flags ---

    /// Recomputes `connected`, `origin` and `target` from the wires still attached.
    pub fn refresh_flags(&mut self, number: EntityId) {
        let mut connected = false;
        let mut origin = false;
        let mut target = false;
        for wire in self.wires_of(number).iter().filter_map(|w| self.wires.get(w)) {
            if let Some((src, dst)) = wire.effective_ends() {
                connected = true;
                origin |= src == number;
                target |= dst == number;
            }
        }
        if let Some(node) = self.numbers.get_mut(&number) {
            node.connected = connected;
            node.origin = origin;
            node.target = target;
        }
    }

    // --- Removal ---

    /// Removes a wire and recomputes the flags of the ends it leaves behind.
    pub fn remove_wire(&mut self, wire_id: EntityId) -> Option<Wire> {
        let wire = self.wires.remove(&wire_id)?;
        self.selected.remove(&wire_id);
        let ends = [Some(wire.origin), wire.target];
        for end in ends.into_iter().flatten() {
            if let Some(list) = self.number_wires.get_mut(&end) {
                list.retain(|w| *w != wire_id);
                if list.is_empty() {
                    self.number_wires.remove(&end);
                }
            }
            self.refresh_flags(end);
        }
        Some(wire)
    }

    /// Removes a number and every wire touching it, pending wires included.
    /// Returns the removed ids, wires first.
    pub fn remove_number(&mut self, number: EntityId) -> Vec<EntityId> {
        let mut removed = Vec::new();
        if !self.numbers.contains_key(&number) {
            return removed;
        }

        let mut doomed: Vec<EntityId> = self.wires_of(number).to_vec();
        doomed.extend(
            self.wires
                .values()
                .filter(|w| !w.is_connected() && w.origin == number)
                .map(|w| w.id),
        );
        for wire_id in doomed {
            if self.remove_wire(wire_id).is_some() {
                removed.push(wire_id);
            }
        }

        self.numbers.remove(&number);
        self.number_wires.remove(&number);
        self.selected.remove(&number);
        removed.push(number);
        removed
    }

    /// Removes an operator, its three numbers and their wires.
    pub fn remove_operator(&mut self, op_id: EntityId) -> Vec<EntityId> {
        let mut removed = Vec::new();
        let Some(members) = self.operator_members.remove(&op_id) else {
            return removed;
        };
        for member in members {
            removed.extend(self.remove_number(member));
        }
        self.operators.remove(&op_id);
        self.selected.remove(&op_id);
        removed.push(op_id);
        removed
    }
}
