use super::value::Value;
use serde::{Serialize, Deserialize};
use std::fmt;

/// Identifier shared by numbers, operators and wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberRole {
    /// Standalone number placed directly on the canvas.
    Naked,
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    Adder,
    Multiplier,
    Exponentiator,
}

impl OperatorKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            OperatorKind::Adder => "+",
            OperatorKind::Multiplier => "x",
            OperatorKind::Exponentiator => "^",
        }
    }

    /// Value given to both inputs when an operator is created.
    pub fn input_default(&self) -> Value {
        match self {
            OperatorKind::Adder => Value::ZERO,
            OperatorKind::Multiplier | OperatorKind::Exponentiator => Value::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Input1,
    Input2,
    Output,
}

/// Selects which slot of an operator is dependent (solved from the other two).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperatorMode {
    #[default]
    Forward,
    SolveInput1,
    SolveInput2,
}

impl OperatorMode {
    pub fn dependent_slot(self) -> Slot {
        match self {
            OperatorMode::Forward => Slot::Output,
            OperatorMode::SolveInput1 => Slot::Input1,
            OperatorMode::SolveInput2 => Slot::Input2,
        }
    }

    pub fn solving(slot: Slot) -> Self {
        match slot {
            Slot::Output => OperatorMode::Forward,
            Slot::Input1 => OperatorMode::SolveInput1,
            Slot::Input2 => OperatorMode::SolveInput2,
        }
    }

    /// The two driving slots, in the order tracing visits them.
    pub fn independent_slots(self) -> [Slot; 2] {
        match self {
            OperatorMode::Forward => [Slot::Input1, Slot::Input2],
            OperatorMode::SolveInput1 => [Slot::Output, Slot::Input2],
            OperatorMode::SolveInput2 => [Slot::Input1, Slot::Output],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberNode {
    pub id: EntityId,
    pub role: NumberRole,
    pub value: Value,
    /// Any finalized wire touches this node.
    pub connected: bool,
    /// Effective origin of some finalized wire.
    pub origin: bool,
    /// Effective target of some finalized wire.
    pub target: bool,
    pub reversed: bool,
    pub position: Position,
    /// Operator this number belongs to. `None` for naked numbers.
    pub owner: Option<EntityId>,
}

impl NumberNode {
    pub fn new(id: EntityId, role: NumberRole, value: Value) -> Self {
        Self {
            id,
            role,
            value,
            connected: false,
            origin: false,
            target: false,
            reversed: false,
            position: Position::default(),
            owner: None,
        }
    }

    pub fn set_value(&mut self, value: Value) { self.value = value; }

    pub fn shift(&mut self, d_re: f64, d_im: f64) { self.value.shift(d_re, d_im); }

    pub fn is_free(&self) -> bool { !self.connected }

    /// Whether a new wire may end here, given the role and local direction.
    pub fn accepts_inbound(&self) -> bool {
        match self.role {
            NumberRole::Naked => true,
            NumberRole::Input => !self.reversed,
            NumberRole::Output => self.reversed,
        }
    }

    /// Whether a new wire may start here, given the role and local direction.
    pub fn emits_outbound(&self) -> bool {
        match self.role {
            NumberRole::Naked => true,
            NumberRole::Input => self.reversed,
            NumberRole::Output => !self.reversed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorNode {
    pub id: EntityId,
    pub kind: OperatorKind,
    pub mode: OperatorMode,
    pub input1: EntityId,
    pub input2: EntityId,
    pub output: EntityId,
    pub position: Position,
}

impl OperatorNode {
    pub fn slot_id(&self, slot: Slot) -> EntityId {
        match slot {
            Slot::Input1 => self.input1,
            Slot::Input2 => self.input2,
            Slot::Output => self.output,
        }
    }

    pub fn slot_of(&self, id: EntityId) -> Option<Slot> {
        if id == self.input1 {
            Some(Slot::Input1)
        } else if id == self.input2 {
            Some(Slot::Input2)
        } else if id == self.output {
            Some(Slot::Output)
        } else {
            None
        }
    }

    pub fn members(&self) -> [EntityId; 3] { [self.input1, self.input2, self.output] }

    pub fn dependent(&self) -> EntityId { self.slot_id(self.mode.dependent_slot()) }

    pub fn independents(&self) -> [EntityId; 2] {
        self.mode.independent_slots().map(|slot| self.slot_id(slot))
    }

    /// Only the reversal transform changes direction.
    pub(crate) fn set_mode(&mut self, mode: OperatorMode) { self.mode = mode; }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub id: EntityId,
    pub origin: EntityId,
    /// `None` while the wire is still being pulled.
    pub target: Option<EntityId>,
    /// Swaps the flow direction without touching the stored ends.
    pub reversed: bool,
}

impl Wire {
    pub fn pending(id: EntityId, origin: EntityId) -> Self {
        Self { id, origin, target: None, reversed: false }
    }

    pub fn is_connected(&self) -> bool { self.target.is_some() }

    /// `(source, sink)` after applying the wire's direction. `None` while pending.
    pub fn effective_ends(&self) -> Option<(EntityId, EntityId)> {
        let target = self.target?;
        if self.reversed { Some((target, self.origin)) } else { Some((self.origin, target)) }
    }

    pub fn effective_origin(&self) -> Option<EntityId> { self.effective_ends().map(|(src, _)| src) }

    pub fn effective_target(&self) -> Option<EntityId> { self.effective_ends().map(|(_, dst)| dst) }

    pub fn touches(&self, id: EntityId) -> bool { self.origin == id || self.target == Some(id) }

    pub fn other_end(&self, id: EntityId) -> Option<EntityId> {
        let target = self.target?;
        if id == self.origin {
            Some(target)
        } else if id == target {
            Some(self.origin)
        } else {
            None
        }
    }
}
