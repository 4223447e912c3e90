//! Structural checks over a `Registry`.
//!
//! Commands keep these properties by construction. The checker exists for
//! graphs that arrive from outside, mainly restored snapshots, and for tests.
use crate::store::{EntityId, NumberRole, Registry};
use std::collections::BTreeSet;

/// The category of an integrity problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityErrorType {
    /// Two entities share an id, or an id is not below the allocator.
    IdCollision,
    /// A reference points at an entity that does not exist.
    DanglingReference,
    /// Operator membership and number ownership disagree.
    Ownership,
    /// A number has more than one inbound or more than one outbound wire.
    PortOverload,
    /// Stored connectivity flags differ from the ones the wires imply.
    FlagDrift,
    /// Anything else: self-loops, role mismatches, stale index entries.
    Structural,
}

/// One problem found by the checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityError {
    /// The entity the problem was detected on.
    pub entity: EntityId,
    pub error_type: IntegrityErrorType,
    pub message: String,
}

impl IntegrityError {
    fn new(entity: EntityId, error_type: IntegrityErrorType, message: impl Into<String>) -> Self {
        Self { entity, error_type, message: message.into() }
    }
}

pub struct IntegrityChecker<'a> {
    registry: &'a Registry,
    errors: Vec<IntegrityError>,
}

impl<'a> IntegrityChecker<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry, errors: Vec::new() }
    }

    /// Runs every check and collects all problems rather than stopping at the first.
    pub fn validate(mut self) -> Result<(), Vec<IntegrityError>> {
        self.check_ids();
        self.check_operators();
        self.check_numbers();
        self.check_wires();
        self.check_index();
        self.check_selection();

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn report(&mut self, entity: EntityId, error_type: IntegrityErrorType, message: String) {
        self.errors.push(IntegrityError::new(entity, error_type, message));
    }

    fn check_ids(&mut self) {
        let reg = self.registry;
        let next = reg.next_id();
        let mut seen = BTreeSet::new();
        let all = reg.numbers.keys().chain(reg.operators.keys()).chain(reg.wires.keys());
        for &id in all {
            if !seen.insert(id) {
                self.report(
                    id,
                    IntegrityErrorType::IdCollision,
                    format!("id {} is used by more than one entity", id),
                );
            }
            if id >= next {
                self.report(
                    id,
                    IntegrityErrorType::IdCollision,
                    format!("id {} is not below the allocator ({})", id, next),
                );
            }
        }

        for (key, node) in &reg.numbers {
            if *key != node.id {
                self.report(
                    *key,
                    IntegrityErrorType::Structural,
                    format!("number stored under {} claims id {}", key, node.id),
                );
            }
        }
        for (key, op) in &reg.operators {
            if *key != op.id {
                self.report(
                    *key,
                    IntegrityErrorType::Structural,
                    format!("operator stored under {} claims id {}", key, op.id),
                );
            }
        }
        for (key, wire) in &reg.wires {
            if *key != wire.id {
                self.report(
                    *key,
                    IntegrityErrorType::Structural,
                    format!("wire stored under {} claims id {}", key, wire.id),
                );
            }
        }
    }

    fn check_operators(&mut self) {
        let reg = self.registry;
        for (&op_id, op) in &reg.operators {
            let expected = [NumberRole::Input, NumberRole::Input, NumberRole::Output];
            for (member, role) in op.members().into_iter().zip(expected) {
                let Some(node) = reg.numbers.get(&member) else {
                    self.report(
                        op_id,
                        IntegrityErrorType::DanglingReference,
                        format!("member {} does not exist", member),
                    );
                    continue;
                };
                if node.owner != Some(op_id) {
                    self.report(
                        member,
                        IntegrityErrorType::Ownership,
                        format!("member of {} but owned by {:?}", op_id, node.owner),
                    );
                }
                if node.role != role {
                    self.report(
                        member,
                        IntegrityErrorType::Structural,
                        format!("expected role {:?}, found {:?}", role, node.role),
                    );
                }
            }

            let distinct: BTreeSet<_> = op.members().into_iter().collect();
            if distinct.len() != 3 {
                self.report(
                    op_id,
                    IntegrityErrorType::Structural,
                    "operator slots must be three distinct numbers".to_string(),
                );
            }

            match reg.operator_members.get(&op_id) {
                Some(members) if *members == op.members() => {}
                _ => self.report(
                    op_id,
                    IntegrityErrorType::Structural,
                    "membership index is out of date".to_string(),
                ),
            }
        }

        for &op_id in reg.operator_members.keys() {
            if !reg.operators.contains_key(&op_id) {
                self.report(
                    op_id,
                    IntegrityErrorType::DanglingReference,
                    "membership index names a missing operator".to_string(),
                );
            }
        }
    }

    fn check_numbers(&mut self) {
        let reg = self.registry;
        for (&id, node) in &reg.numbers {
            match (node.role, node.owner) {
                (NumberRole::Naked, Some(owner)) => {
                    self.report(
                        id,
                        IntegrityErrorType::Ownership,
                        format!("naked number owned by {}", owner),
                    );
                }
                (NumberRole::Input | NumberRole::Output, None) => {
                    self.report(
                        id,
                        IntegrityErrorType::Ownership,
                        format!("{:?} number has no operator", node.role),
                    );
                }
                (_, Some(owner)) => match reg.operators.get(&owner) {
                    None => self.report(
                        id,
                        IntegrityErrorType::DanglingReference,
                        format!("owner {} does not exist", owner),
                    ),
                    Some(op) if op.slot_of(id).is_none() => {
                        self.report(
                            id,
                            IntegrityErrorType::Ownership,
                            format!("owner {} does not list this number", owner),
                        );
                    }
                    Some(_) => {}
                },
                (NumberRole::Naked, None) => {}
            }

            let mut inbound = 0;
            let mut outbound = 0;
            let mut connected = false;
            for wire in reg.wires_of(id).iter().filter_map(|w| reg.wires.get(w)) {
                if let Some((src, dst)) = wire.effective_ends() {
                    connected = true;
                    inbound += usize::from(dst == id);
                    outbound += usize::from(src == id);
                }
            }
            if inbound > 1 || outbound > 1 {
                self.report(
                    id,
                    IntegrityErrorType::PortOverload,
                    format!("{} inbound and {} outbound wires", inbound, outbound),
                );
            }
            let implied = (connected, outbound > 0, inbound > 0);
            let stored = (node.connected, node.origin, node.target);
            if implied != stored {
                self.report(
                    id,
                    IntegrityErrorType::FlagDrift,
                    format!(
                        "flags (connected, origin, target) are {:?}, wires imply {:?}",
                        stored,
                        implied,
                    ),
                );
            }
        }
    }

    fn check_wires(&mut self) {
        let reg = self.registry;
        for (&id, wire) in &reg.wires {
            if !reg.numbers.contains_key(&wire.origin) {
                self.report(
                    id,
                    IntegrityErrorType::DanglingReference,
                    format!("origin {} does not exist", wire.origin),
                );
            }
            let Some(target) = wire.target else { continue };
            if !reg.numbers.contains_key(&target) {
                self.report(
                    id,
                    IntegrityErrorType::DanglingReference,
                    format!("target {} does not exist", target),
                );
            }
            if target == wire.origin {
                self.report(
                    id,
                    IntegrityErrorType::Structural,
                    format!("wire loops on {}", target),
                );
            }
            for end in [wire.origin, target] {
                if !reg.wires_of(end).contains(&id) {
                    self.report(
                        id,
                        IntegrityErrorType::Structural,
                        format!("wire missing from the index of {}", end),
                    );
                }
            }
        }
    }

    fn check_index(&mut self) {
        let reg = self.registry;
        for (&number, list) in &reg.number_wires {
            if !reg.numbers.contains_key(&number) {
                self.report(
                    number,
                    IntegrityErrorType::DanglingReference,
                    "wire index names a missing number".to_string(),
                );
            }
            for wire_id in list {
                match reg.wires.get(wire_id) {
                    Some(wire) if wire.is_connected() && wire.touches(number) => {}
                    Some(_) => self.report(
                        number,
                        IntegrityErrorType::Structural,
                        format!("indexed wire {} does not connect to this number", wire_id),
                    ),
                    None => self.report(
                        number,
                        IntegrityErrorType::DanglingReference,
                        format!("indexed wire {} does not exist", wire_id),
                    ),
                }
            }
        }
    }

    fn check_selection(&mut self) {
        let reg = self.registry;
        for &id in &reg.selected {
            if !reg.contains(id) {
                self.report(
                    id,
                    IntegrityErrorType::DanglingReference,
                    "selected entity does not exist".to_string(),
                );
            }
        }
    }
}

/// Shorthand for `IntegrityChecker::new(registry).validate()`.
pub fn validate(registry: &Registry) -> Result<(), Vec<IntegrityError>> {
    IntegrityChecker::new(registry).validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{OperatorKind, Position, Value};

    fn naked(reg: &mut Registry) -> EntityId {
        reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None)
    }

    fn connect(reg: &mut Registry, from: EntityId, to: EntityId) -> EntityId {
        let w = reg.add_pending_wire(from);
        reg.attach_wire(w, to);
        w
    }

    fn kinds(errors: &[IntegrityError]) -> Vec<IntegrityErrorType> {
        errors.iter().map(|e| e.error_type).collect()
    }

    #[test]
    fn test_well_formed_registry_passes() {
        let mut reg = Registry::new();
        let a = naked(&mut reg);
        let [_, in1, _, out] = reg.add_operator(OperatorKind::Adder, Position::default());
        let b = naked(&mut reg);
        connect(&mut reg, a, in1);
        connect(&mut reg, out, b);
        reg.add_pending_wire(b);
        reg.selected.insert(a);
        assert_eq!(validate(&reg), Ok(()));
    }

    #[test]
    fn test_detects_flag_drift() {
        let mut reg = Registry::new();
        let a = naked(&mut reg);
        let b = naked(&mut reg);
        connect(&mut reg, a, b);
        reg.number_mut(b).unwrap().target = false;

        let errors = validate(&reg).unwrap_err();
        assert_eq!(kinds(&errors), vec![IntegrityErrorType::FlagDrift]);
        assert_eq!(errors[0].entity, b);
    }

    #[test]
    fn test_detects_two_inbound_wires() {
        let mut reg = Registry::new();
        let a = naked(&mut reg);
        let b = naked(&mut reg);
        let c = naked(&mut reg);
        connect(&mut reg, a, c);
        connect(&mut reg, b, c);

        let errors = validate(&reg).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.entity == c && e.error_type == IntegrityErrorType::PortOverload));
    }

    #[test]
    fn test_detects_broken_ownership() {
        let mut reg = Registry::new();
        let [op, in1, _, _] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        reg.number_mut(in1).unwrap().owner = None;
        reg.operators.remove(&op);

        let errors = validate(&reg).unwrap_err();
        let found = kinds(&errors);
        assert!(found.contains(&IntegrityErrorType::Ownership));
        assert!(found.contains(&IntegrityErrorType::DanglingReference));
    }

    #[test]
    fn test_detects_dangling_wire_and_selection() {
        let mut reg = Registry::new();
        let a = naked(&mut reg);
        let b = naked(&mut reg);
        let w = connect(&mut reg, a, b);
        reg.numbers.remove(&b);
        reg.selected.insert(EntityId(99));

        let errors = validate(&reg).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.entity == w && e.error_type == IntegrityErrorType::DanglingReference));
        assert!(errors.iter().any(|e| e.entity == EntityId(99)));
    }
}
