use crate::compute::kernel::{self, SlotValues};
use crate::config::EngineConfig;
use crate::solver::Relaxation;
use crate::store::{EntityId, NumberNode, OperatorMode, Registry, Value, Wire};
use std::collections::BTreeMap;
use tracing::trace;

/// Counters for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub wires_propagated: usize,
    pub operators_forward: usize,
    pub operators_reversed: usize,
    /// Relaxation steps that moved at least one axis.
    pub moving_steps: usize,
}

pub struct Engine;

impl Engine {
    /// One frame: every finalized wire copies its value, then every operator
    /// runs its evaluation `iterations_per_tick` times. Both passes go in id order.
    pub fn run(registry: &mut Registry, config: &EngineConfig) -> TickReport {
        let mut report = TickReport {
            wires_propagated: Self::propagate_wires(registry),
            ..TickReport::default()
        };

        let solver = Relaxation::new(config.search_step);
        let operator_ids: Vec<EntityId> = registry.operators.keys().copied().collect();
        for op_id in operator_ids {
            let Some(mode) = registry.operator(op_id).map(|op| op.mode) else { continue };
            let moved = Self::iterate(registry, op_id, &solver, config.iterations_per_tick);
            if mode == OperatorMode::Forward {
                report.operators_forward += 1;
            } else {
                report.operators_reversed += 1;
                report.moving_steps += moved;
            }
        }

        trace!(
            wires = report.wires_propagated,
            forward = report.operators_forward,
            reversed = report.operators_reversed,
            moving_steps = report.moving_steps,
            "tick"
        );
        report
    }

    pub fn propagate_wires(registry: &mut Registry) -> usize {
        let Registry { wires, numbers, .. } = registry;
        wires.values().filter(|wire| Self::propagate(wire, numbers)).count()
    }

    /// Copies the effective origin's value onto the effective target.
    pub fn propagate(wire: &Wire, numbers: &mut BTreeMap<EntityId, NumberNode>) -> bool {
        let Some((src, dst)) = wire.effective_ends() else { return false };
        let Some(value) = numbers.get(&src).map(|n| n.value) else { return false };
        match numbers.get_mut(&dst) {
            Some(node) => {
                node.set_value(value);
                true
            }
            None => false,
        }
    }

    /// Runs `steps` evaluations of one operator. Returns how many reversed steps moved.
    pub fn iterate(
        registry: &mut Registry,
        op_id: EntityId,
        solver: &Relaxation,
        steps: usize,
    ) -> usize {
        let forward = registry.operator(op_id).map(|op| op.mode == OperatorMode::Forward);
        match forward {
            None => 0,
            // Exact, so repeating it changes nothing.
            Some(true) => {
                Self::evaluate_forward(registry, op_id);
                0
            }
            Some(false) => (0..steps)
                .filter(|_| {
                    let moved = Self::evaluate_reversed(registry, op_id, solver);
                    matches!(moved, Some(d) if d != (0.0, 0.0))
                })
                .count(),
        }
    }

    /// `output = f(input1, input2)`. Returns the new output value.
    pub fn evaluate_forward(registry: &mut Registry, op_id: EntityId) -> Option<Value> {
        let (kind, output) = registry.operator(op_id).map(|op| (op.kind, op.output))?;
        let slots = Self::slot_values(registry, op_id)?;
        let value = kernel::forward(kind, slots.input1, slots.input2);
        registry.number_mut(output)?.set_value(value);
        Some(value)
    }

    /// One relaxation step on the dependent slot. Returns the applied shift.
    pub fn evaluate_reversed(
        registry: &mut Registry,
        op_id: EntityId,
        solver: &Relaxation,
    ) -> Option<(f64, f64)> {
        let (kind, slot, dependent) = registry
            .operator(op_id)
            .map(|op| (op.kind, op.mode.dependent_slot(), op.dependent()))?;
        let slots = Self::slot_values(registry, op_id)?;
        let (d_re, d_im) = solver.step(kind, slot, &slots);
        registry.number_mut(dependent)?.shift(d_re, d_im);
        Some((d_re, d_im))
    }

    fn slot_values(registry: &Registry, op_id: EntityId) -> Option<SlotValues> {
        let op = registry.operator(op_id)?;
        let value = |id: EntityId| registry.number(id).map(|n| n.value);
        Some(SlotValues::new(value(op.input1)?, value(op.input2)?, value(op.output)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NumberRole, OperatorKind, Position};

    fn naked(reg: &mut Registry, value: Value) -> EntityId {
        reg.add_number(NumberRole::Naked, value, Position::default(), None)
    }

    fn connect(reg: &mut Registry, from: EntityId, to: EntityId) -> EntityId {
        let w = reg.add_pending_wire(from);
        reg.attach_wire(w, to);
        w
    }

    #[test]
    fn test_wires_copy_in_effective_direction() {
        let mut reg = Registry::new();
        let a = naked(&mut reg, Value::new(1.0, 2.0));
        let b = naked(&mut reg, Value::ZERO);
        let w = connect(&mut reg, a, b);

        assert_eq!(Engine::propagate_wires(&mut reg), 1);
        assert_eq!(reg.number(b).unwrap().value, Value::new(1.0, 2.0));

        reg.wire_mut(w).unwrap().reversed = true;
        reg.number_mut(b).unwrap().set_value(Value::real(7.0));
        Engine::propagate_wires(&mut reg);
        assert_eq!(reg.number(a).unwrap().value, Value::real(7.0));
    }

    #[test]
    fn test_pending_wires_do_not_propagate() {
        let mut reg = Registry::new();
        let a = naked(&mut reg, Value::ONE);
        reg.add_pending_wire(a);
        assert_eq!(Engine::propagate_wires(&mut reg), 0);
    }

    #[test]
    fn test_adder_forward_tick() {
        let mut reg = Registry::new();
        let [op, in1, in2, out] = reg.add_operator(OperatorKind::Adder, Position::default());
        reg.number_mut(in1).unwrap().set_value(Value::new(2.0, 3.0));
        reg.number_mut(in2).unwrap().set_value(Value::new(4.0, -1.0));

        let report = Engine::run(&mut reg, &EngineConfig::default());
        assert_eq!(reg.number(out).unwrap().value, Value::new(6.0, 2.0));
        assert_eq!(report.operators_forward, 1);
        assert_eq!(report.moving_steps, 0);
        assert!(reg.operator(op).is_some());
    }

    #[test]
    fn test_reversed_operator_moves_dependent_slot() {
        let mut reg = Registry::new();
        let [op, in1, in2, out] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        reg.operator_mut(op).unwrap().set_mode(OperatorMode::SolveInput1);
        reg.number_mut(in2).unwrap().set_value(Value::new(4.0, -1.0));
        reg.number_mut(out).unwrap().set_value(Value::new(11.0, 10.0));

        let config = EngineConfig::default();
        let first = Engine::run(&mut reg, &config);
        assert_eq!(first.operators_reversed, 1);
        assert_eq!(first.moving_steps, 25);

        for _ in 0..20 {
            Engine::run(&mut reg, &config);
        }
        let solved = reg.number(in1).unwrap().value;
        assert!(
            (solved - Value::new(2.0, 3.0)).norm() < 2.0 * config.search_step,
            "got {}",
            solved,
        );
        // Independent slots are never written by the solver.
        assert_eq!(reg.number(out).unwrap().value, Value::new(11.0, 10.0));
    }

    #[test]
    fn test_chain_settles_through_wire() {
        let mut reg = Registry::new();
        let [_, in1, in2, out] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        let src = naked(&mut reg, Value::real(3.0));
        let sink = naked(&mut reg, Value::ZERO);
        connect(&mut reg, src, in1);
        connect(&mut reg, out, sink);
        reg.number_mut(in2).unwrap().set_value(Value::real(2.0));

        Engine::run(&mut reg, &EngineConfig::default());
        // The sink lags one tick behind the operator.
        assert_eq!(reg.number(out).unwrap().value, Value::real(6.0));
        assert_eq!(reg.number(sink).unwrap().value, Value::ZERO);
        Engine::run(&mut reg, &EngineConfig::default());
        assert_eq!(reg.number(sink).unwrap().value, Value::real(6.0));
    }
}
