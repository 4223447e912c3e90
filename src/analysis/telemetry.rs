use crate::compute::kernel::{self, SlotValues};
use crate::store::{EntityId, OperatorKind, OperatorMode, Registry};

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorResidual {
    pub operator: EntityId,
    pub kind: OperatorKind,
    pub mode: OperatorMode,
    /// `|f(input1, input2) - output|`. Zero for a satisfied equation.
    pub residual: f64,
}

/// How far each operator is from satisfying its equation.
#[derive(Debug, Clone, Default)]
pub struct ResidualReport {
    pub operators: Vec<OperatorResidual>,
    /// Largest finite residual. Non-finite ones are counted in `non_finite`.
    pub max_residual: f64,
    pub non_finite: usize,
}

impl ResidualReport {
    pub fn analyze(registry: &Registry) -> Self {
        let mut report = Self::default();

        for op in registry.operators.values() {
            let value = |id: EntityId| registry.number(id).map(|n| n.value);
            let (Some(a), Some(b), Some(out)) =
                (value(op.input1), value(op.input2), value(op.output))
            else {
                continue;
            };
            let residual = kernel::residual(op.kind, &SlotValues::new(a, b, out)).norm();

            if residual.is_finite() {
                report.max_residual = report.max_residual.max(residual);
            } else {
                report.non_finite += 1;
            }
            report.operators.push(OperatorResidual {
                operator: op.id,
                kind: op.kind,
                mode: op.mode,
                residual,
            });
        }

        report
    }

    pub fn get(&self, operator: EntityId) -> Option<&OperatorResidual> {
        self.operators.iter().find(|r| r.operator == operator)
    }

    /// Whether every operator is within `tolerance` of its equation.
    pub fn settled(&self, tolerance: f64) -> bool {
        self.non_finite == 0 && self.max_residual <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Position, Value};

    #[test]
    fn test_reports_residual_per_operator() {
        let mut reg = Registry::new();
        let [add, _, _, _] = reg.add_operator(OperatorKind::Adder, Position::default());
        let [mul, in1, _, out] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        reg.number_mut(out).unwrap().set_value(Value::real(1.0));
        reg.number_mut(in1).unwrap().set_value(Value::real(4.0));

        let report = ResidualReport::analyze(&reg);
        assert_eq!(report.operators.len(), 2);
        assert_eq!(report.get(add).unwrap().residual, 0.0);
        // 4 * 1 - 1
        assert_eq!(report.get(mul).unwrap().residual, 3.0);
        assert_eq!(report.max_residual, 3.0);
        assert!(!report.settled(0.5));
        assert!(report.settled(3.0));
    }

    #[test]
    fn test_counts_non_finite() {
        let mut reg = Registry::new();
        let [op, in1, in2, _] = reg.add_operator(OperatorKind::Multiplier, Position::default());
        reg.number_mut(in1).unwrap().set_value(Value::new(f64::NAN, 0.0));
        reg.number_mut(in2).unwrap().set_value(Value::ONE);

        let report = ResidualReport::analyze(&reg);
        assert_eq!(report.non_finite, 1);
        assert!(report.get(op).unwrap().residual.is_nan());
        assert!(!report.settled(1.0));
    }
}
