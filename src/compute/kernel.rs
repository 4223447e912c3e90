use crate::store::{OperatorKind, Slot, Value};

/// The three values an operator equation is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlotValues {
    pub input1: Value,
    pub input2: Value,
    pub output: Value,
}

impl SlotValues {
    pub fn new(input1: Value, input2: Value, output: Value) -> Self {
        Self { input1, input2, output }
    }

    #[inline(always)]
    pub fn get(&self, slot: Slot) -> Value {
        match slot {
            Slot::Input1 => self.input1,
            Slot::Input2 => self.input2,
            Slot::Output => self.output,
        }
    }

    /// Copy with `slot` replaced by `value`.
    #[inline(always)]
    pub fn with(mut self, slot: Slot, value: Value) -> Self {
        match slot {
            Slot::Input1 => self.input1 = value,
            Slot::Input2 => self.input2 = value,
            Slot::Output => self.output = value,
        }
        self
    }
}

/// Closed-form forward rule `output = f(input1, input2)`.
#[inline(always)]
pub fn forward(kind: OperatorKind, a: Value, b: Value) -> Value {
    match kind {
        OperatorKind::Adder => a + b,
        OperatorKind::Multiplier => a * b,
        OperatorKind::Exponentiator => a.powc(b),
    }
}

/// `f(input1, input2) - output`. Zero when the equation holds.
#[inline(always)]
pub fn residual(kind: OperatorKind, slots: &SlotValues) -> Value {
    forward(kind, slots.input1, slots.input2) - slots.output
}
