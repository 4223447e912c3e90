//! Direction-only local search standing in for closed-form operator inverses.
//!
//! Each step tries the dependent slot `±ε` along the real axis and along the
//! imaginary axis, and moves whichever way shrinks `|f(input1, input2) - output|`.
//! Any operator that has a forward formula can be run backwards this way.
//! There is no convergence test: callers run a fixed budget every tick and the
//! value settles within about one `ε` of a solution, oscillating there.
use crate::compute::kernel::{residual, SlotValues};
use crate::store::{OperatorKind, Slot, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Relaxation {
    step: f64,
}

impl Relaxation {
    pub fn new(step: f64) -> Self { Self { step } }

    pub fn step_size(&self) -> f64 { self.step }

    /// Computes one move `(d_re, d_im)` for the `dependent` slot. Each component
    /// is `-ε`, `0` or `+ε`. Both axes are tried from the same starting point.
    pub fn step(&self, kind: OperatorKind, dependent: Slot, slots: &SlotValues) -> (f64, f64) {
        let current = slots.get(dependent);
        let error = |candidate: Value| residual(kind, &slots.with(dependent, candidate)).norm();

        let d_re = self.compare_shifts(
            error(current.shifted(-self.step, 0.0)),
            error(current.shifted(self.step, 0.0)),
        );
        let d_im = self.compare_shifts(
            error(current.shifted(0.0, -self.step)),
            error(current.shifted(0.0, self.step)),
        );
        (d_re, d_im)
    }

    /// Ties, including two NaN trials at a singular point, do not move.
    #[inline(always)]
    fn compare_shifts(&self, below: f64, above: f64) -> f64 {
        if below < above {
            -self.step
        } else if below > above {
            self.step
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 0.01;

    fn run(kind: OperatorKind, dependent: Slot, mut slots: SlotValues, steps: usize) -> SlotValues {
        let solver = Relaxation::new(EPS);
        for _ in 0..steps {
            let (d_re, d_im) = solver.step(kind, dependent, &slots);
            slots = slots.with(dependent, slots.get(dependent).shifted(d_re, d_im));
        }
        slots
    }

    #[test]
    fn test_multiplier_reverse_error_never_grows() {
        let solver = Relaxation::new(EPS);
        let target = Value::new(2.0, 3.0);
        let mut slots = SlotValues::new(Value::ONE, Value::new(4.0, -1.0), Value::new(11.0, 10.0));

        let mut prev = (slots.input1.re - target.re).abs();
        let mut prev_im = (slots.input1.im - target.im).abs();
        for _ in 0..400 {
            let (d_re, d_im) = solver.step(OperatorKind::Multiplier, Slot::Input1, &slots);
            slots.input1.shift(d_re, d_im);

            let err_re = (slots.input1.re - target.re).abs();
            let err_im = (slots.input1.im - target.im).abs();
            assert!(
                err_re <= prev + 1e-9 || err_re <= EPS + 1e-9,
                "real error grew: {} -> {}",
                prev,
                err_re,
            );
            assert!(
                err_im <= prev_im + 1e-9 || err_im <= EPS + 1e-9,
                "imag error grew: {} -> {}",
                prev_im,
                err_im,
            );
            prev = err_re;
            prev_im = err_im;
        }
        assert!(prev <= EPS + 1e-9 && prev_im <= EPS + 1e-9);
    }

    #[test]
    fn test_exact_solution_does_not_move() {
        // A step that is exact in binary keeps both trial moves symmetric.
        let solver = Relaxation::new(0.5);
        let slots = SlotValues::new(
            Value::new(2.0, 3.0),
            Value::new(4.0, -1.0),
            Value::new(6.0, 2.0),
        );
        assert_eq!(solver.step(OperatorKind::Adder, Slot::Input1, &slots), (0.0, 0.0));
    }

    #[test]
    fn test_singular_multiplier_is_stuck() {
        // input2 = 0: every trial move of input1 gives the same residual.
        let solver = Relaxation::new(EPS);
        let slots = SlotValues::new(Value::real(5.0), Value::ZERO, Value::real(3.0));
        assert_eq!(solver.step(OperatorKind::Multiplier, Slot::Input1, &slots), (0.0, 0.0));
    }

    #[test]
    fn test_adder_reverse_settles() {
        let slots = SlotValues::new(Value::ZERO, Value::new(1.0, 1.0), Value::new(1.5, -0.5));
        let settled = run(OperatorKind::Adder, Slot::Input2, slots, 300);
        assert!((settled.input2 - Value::new(1.5, -0.5)).norm() < 2.0 * EPS);
    }

    #[test]
    fn test_exponentiator_reverse_reduces_residual() {
        // 2 ^ b = 8 has b = 3 as the nearest solution to b = 1.
        let slots = SlotValues::new(Value::real(2.0), Value::ONE, Value::real(8.0));
        let before = residual(OperatorKind::Exponentiator, &slots).norm();
        let settled = run(OperatorKind::Exponentiator, Slot::Input2, slots, 400);
        let after = residual(OperatorKind::Exponentiator, &settled).norm();
        assert!(after < before);
        assert!((settled.input2.re - 3.0).abs() < 0.05, "got {}", settled.input2);
    }
}
