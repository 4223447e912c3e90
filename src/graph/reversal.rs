//! Flips the direction of a traced path.
//!
//! Every number and wire on the path toggles `reversed`, and every operator
//! on it hands the dependent role from one path neighbour to the other. The
//! transform is its own inverse: applying the same path twice restores all
//! directions and modes.
use super::error::{GraphError, GraphResult};
use crate::store::{EntityId, OperatorMode, Registry};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Number,
    Operator,
    Wire,
}

fn step_kind(registry: &Registry, id: EntityId) -> GraphResult<Step> {
    if registry.numbers.contains_key(&id) {
        Ok(Step::Number)
    } else if registry.operators.contains_key(&id) {
        Ok(Step::Operator)
    } else if registry.wires.contains_key(&id) {
        Ok(Step::Wire)
    } else {
        Err(GraphError::StalePath(id))
    }
}

fn malformed(message: String) -> GraphError {
    GraphError::MalformedPath(message)
}

/// Which way a path walks relative to value flow. A freshly traced path walks
/// against it; the same path after it has been applied walks with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    AgainstFlow,
    WithFlow,
}

/// Checks that `path` could have come from a trace of the current graph, or is
/// such a path already applied, and that reversing it keeps every number at one
/// inbound and one outbound wire at most.
pub fn validate_path(registry: &Registry, path: &[EntityId]) -> GraphResult<()> {
    if path.len() < 3 {
        return Err(malformed(format!("expected at least 3 entries, got {}", path.len())));
    }
    let kinds = path
        .iter()
        .map(|&id| step_kind(registry, id))
        .collect::<GraphResult<Vec<_>>>()?;

    let mut seen = BTreeSet::new();
    if let Some(dup) = path.iter().find(|id| !seen.insert(**id)) {
        return Err(malformed(format!("{} appears twice", dup)));
    }
    if kinds.first() != Some(&Step::Number) || kinds.last() != Some(&Step::Number) {
        return Err(malformed("path must start and end with numbers".to_string()));
    }

    let mut orientation = None;
    for (i, (&id, &kind)) in path.iter().zip(&kinds).enumerate().skip(1) {
        let prev = path[i - 1];
        let step = match (kinds[i - 1], kind) {
            (Step::Number, Step::Operator) | (Step::Operator, Step::Number) => {
                let (number, op) = if kind == Step::Operator { (prev, id) } else { (id, prev) };
                if registry.number(number).and_then(|n| n.owner) != Some(op) {
                    return Err(malformed(format!("{} and {} are not adjacent", prev, id)));
                }
                None
            }
            (Step::Number, Step::Wire) => Some(wire_step(registry, id, prev, true)?),
            (Step::Wire, Step::Number) => Some(wire_step(registry, prev, id, false)?),
            _ => return Err(malformed(format!("{} and {} are not adjacent", prev, id))),
        };
        // Ends are numbers, so every operator has both neighbours.
        let step = match registry.operator(id) {
            Some(op) if op.dependent() == prev => Some(Orientation::AgainstFlow),
            Some(op) if op.dependent() == path[i + 1] => Some(Orientation::WithFlow),
            Some(_) => {
                return Err(malformed(format!("operator {} is not driven along the path", id)));
            }
            None => step,
        };
        match (orientation, step) {
            (Some(a), Some(b)) if a != b => {
                return Err(malformed(format!("path changes direction at {}", id)));
            }
            (None, Some(_)) => orientation = step,
            _ => {}
        }
    }

    if let Some(free) = path.last().filter(|free| !registry.wires_of(**free).is_empty()) {
        return Err(malformed(format!("{} is wired and cannot be solved for", free)));
    }

    check_ports_after(registry, path)
}

/// Orientation of the step between a number and a wire it touches.
/// `entering` is true when the path goes from the number onto the wire.
fn wire_step(
    registry: &Registry,
    wire_id: EntityId,
    number: EntityId,
    entering: bool,
) -> GraphResult<Orientation> {
    let ends = registry
        .wire(wire_id)
        .and_then(|w| w.effective_ends())
        .filter(|&(src, dst)| src == number || dst == number);
    let Some((src, dst)) = ends else {
        return Err(malformed(format!("{} and {} are not adjacent", number, wire_id)));
    };
    // Walking against the flow enters a wire at its target and leaves at its origin.
    let against = if entering { dst == number } else { src == number };
    Ok(if against { Orientation::AgainstFlow } else { Orientation::WithFlow })
}

/// Counts the wires each path number would have once the path's wires are flipped.
fn check_ports_after(registry: &Registry, path: &[EntityId]) -> GraphResult<()> {
    let flipped: BTreeSet<EntityId> =
        path.iter().copied().filter(|id| registry.wires.contains_key(id)).collect();

    for &id in path.iter().filter(|id| registry.numbers.contains_key(id)) {
        let mut inbound = 0;
        let mut outbound = 0;
        for wire in registry.wires_of(id).iter().filter_map(|w| registry.wire(*w)) {
            let Some((src, dst)) = wire.effective_ends() else { continue };
            let (src, dst) = if flipped.contains(&wire.id) { (dst, src) } else { (src, dst) };
            inbound += usize::from(dst == id);
            outbound += usize::from(src == id);
        }
        if inbound > 1 || outbound > 1 {
            return Err(malformed(format!(
                "reversing would leave {} with {} inbound and {} outbound wires",
                id, inbound, outbound
            )));
        }
    }
    Ok(())
}

/// Validates `path`, then reverses it. On error nothing has changed.
pub fn apply(registry: &mut Registry, path: &[EntityId]) -> GraphResult<()> {
    validate_path(registry, path)?;

    for (i, &id) in path.iter().enumerate() {
        if let Some(node) = registry.number_mut(id) {
            node.reversed = !node.reversed;
        } else if let Some(wire) = registry.wire_mut(id) {
            wire.reversed = !wire.reversed;
        } else if let Some(op) = registry.operator_mut(id) {
            let (prev, next) = (path[i - 1], path[i + 1]);
            let incoming = if op.dependent() == prev { next } else { prev };
            if let Some(slot) = op.slot_of(incoming) {
                op.set_mode(OperatorMode::solving(slot));
            }
        }
    }

    for &id in path {
        if registry.numbers.contains_key(&id) {
            registry.refresh_flags(id);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::trace::trace_free_nodes;
    use crate::store::{NumberRole, OperatorKind, Position, Value};

    fn connect(reg: &mut Registry, from: EntityId, to: EntityId) -> EntityId {
        let w = reg.add_pending_wire(from);
        reg.attach_wire(w, to);
        w
    }

    fn directions(reg: &Registry) -> (Vec<bool>, Vec<bool>, Vec<OperatorMode>) {
        (
            reg.numbers.values().map(|n| n.reversed).collect(),
            reg.wires.values().map(|w| w.reversed).collect(),
            reg.operators.values().map(|o| o.mode).collect(),
        )
    }

    #[test]
    fn test_reversal_moves_dependent_to_free_end() {
        let mut reg = Registry::new();
        let [a, a_in1, _, a_out] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        let [b, b_in1, _, b_out] = reg.add_operator(OperatorKind::Adder, Position::default());
        let w = connect(&mut reg, a_out, b_in1);

        let path = trace_free_nodes(&reg, b_out).unwrap()[0].path.clone();
        assert_eq!(path, vec![b_out, b, b_in1, w, a_out, a, a_in1]);
        apply(&mut reg, &path).unwrap();

        assert_eq!(reg.operator(b).unwrap().mode, OperatorMode::SolveInput1);
        assert_eq!(reg.operator(a).unwrap().mode, OperatorMode::SolveInput1);
        assert!(reg.wire(w).unwrap().reversed);
        assert_eq!(reg.wire(w).unwrap().effective_ends(), Some((b_in1, a_out)));

        // Flags follow the new wire direction.
        let n = reg.number(b_in1).unwrap();
        assert!(n.origin && !n.target && n.reversed);
        let n = reg.number(a_out).unwrap();
        assert!(n.target && !n.origin && n.reversed);
    }

    #[test]
    fn test_reversal_is_an_involution() {
        let mut reg = Registry::new();
        let [_, _, _, a_out] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        let [_, b_in1, _, b_out] = reg.add_operator(
            OperatorKind::Exponentiator,
            Position::default(),
        );
        connect(&mut reg, a_out, b_in1);
        let sink = reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None);
        connect(&mut reg, b_out, sink);

        let before = directions(&reg);
        let flags_before: Vec<_> =
            reg.numbers.values().map(|n| (n.connected, n.origin, n.target)).collect();
        for candidate in trace_free_nodes(&reg, sink).unwrap() {
            apply(&mut reg, &candidate.path).unwrap();
            assert_ne!(directions(&reg), before);
            apply(&mut reg, &candidate.path).unwrap();
            assert_eq!(directions(&reg), before);
        }
        let flags_after: Vec<_> =
            reg.numbers.values().map(|n| (n.connected, n.origin, n.target)).collect();
        assert_eq!(flags_after, flags_before);
    }

    #[test]
    fn test_invalid_paths_change_nothing() {
        let mut reg = Registry::new();
        let [op, in1, in2, out] = reg.add_operator(OperatorKind::Adder, Position::default());
        let [other, o_in1, _, _] = reg.add_operator(OperatorKind::Adder, Position::default());
        let before = directions(&reg);

        assert!(matches!(apply(&mut reg, &[out, op]), Err(GraphError::MalformedPath(_))));
        assert!(matches!(apply(&mut reg, &[out, op, out]), Err(GraphError::MalformedPath(_))));
        assert!(matches!(apply(&mut reg, &[out, other, o_in1]), Err(GraphError::MalformedPath(_))));
        // Neither neighbour is the dependent slot.
        assert!(matches!(apply(&mut reg, &[in1, op, in2]), Err(GraphError::MalformedPath(_))));
        assert_eq!(
            apply(&mut reg, &[out, op, EntityId(999)]),
            Err(GraphError::StalePath(EntityId(999))),
        );

        assert_eq!(directions(&reg), before);
    }

    fn assert_malformed(reg: &mut Registry, path: &[EntityId]) {
        let before = directions(reg);
        let result = apply(reg, path);
        assert!(matches!(result, Err(GraphError::MalformedPath(_))), "{:?}", result);
        assert_eq!(directions(reg), before);
    }

    #[test]
    fn test_wired_end_cannot_be_solved_for() {
        let mut reg = Registry::new();
        let [op, in1, _, out] = reg.add_operator(OperatorKind::Adder, Position::default());
        let x = reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None);
        let a = reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None);
        connect(&mut reg, x, a);
        let w = connect(&mut reg, a, in1);

        assert_malformed(&mut reg, &[out, op, in1, w, a]);
    }

    #[test]
    fn test_path_must_keep_one_direction() {
        let mut reg = Registry::new();
        let [a, a_in1, _, a_out] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        let [b, b_in1, _, b_out] = reg.add_operator(OperatorKind::Adder, Position::default());
        let w = connect(&mut reg, a_out, b_in1);
        // The wire now runs b_in1 -> a_out while b still drives b_out.
        reg.wire_mut(w).unwrap().reversed = true;
        reg.refresh_flags(a_out);
        reg.refresh_flags(b_in1);

        assert_malformed(&mut reg, &[b_out, b, b_in1, w, a_out, a, a_in1]);
    }

    #[test]
    fn test_reversal_cannot_overload_a_relay() {
        // relay already feeds sink, so flipping w1 would give it two outbound wires.
        let mut reg = Registry::new();
        let [op, in1, _, out] = reg.add_operator(OperatorKind::Adder, Position::default());
        let relay = reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None);
        let sink = reg.add_number(NumberRole::Naked, Value::ZERO, Position::default(), None);
        let w1 = connect(&mut reg, out, relay);
        connect(&mut reg, relay, sink);

        assert_malformed(&mut reg, &[relay, w1, out, op, in1]);
        assert_eq!(reg.wires_of(relay).len(), 2);
    }
}
