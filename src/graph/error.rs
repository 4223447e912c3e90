//! Defines the error type returned by every graph command.
use crate::analysis::integrity::IntegrityError;
use crate::config::ConfigError;
use crate::store::{EntityId, NumberRole};
use thiserror::Error;

/// Why a command was rejected. A rejected command leaves the graph untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("Entity {id} is not a {expected}")]
    WrongKind { id: EntityId, expected: &'static str },
    #[error("Numbers with role {0:?} are created together with their operator")]
    RoleRequiresOperator(NumberRole),
    #[error("Number {number} belongs to operator {operator} and is removed with it")]
    OwnedByOperator { number: EntityId, operator: EntityId },
    #[error("Number {id} already has an {side} wire")]
    PortOccupied { id: EntityId, side: &'static str },
    #[error("Number {id} cannot take an {side} wire in its current direction")]
    IncompatiblePort { id: EntityId, side: &'static str },
    #[error("Wire {0} is already connected")]
    WireAlreadyConnected(EntityId),
    #[error("Wire {0} is still pending")]
    WirePending(EntityId),
    #[error("Wire {wire} cannot connect number {number} to itself")]
    SelfConnection { wire: EntityId, number: EntityId },
    #[error("Number {0} is not driven and cannot start a reversal")]
    NotBound(EntityId),
    #[error("Reversal path is malformed: {0}")]
    MalformedPath(String),
    #[error("Reversal path references missing entity {0}")]
    StalePath(EntityId),
    #[error("No pending reversal candidate ends at {0}")]
    NoSuchCandidate(EntityId),
    #[error("Snapshot failed integrity checks ({} problems)", .0.len())]
    Integrity(Vec<IntegrityError>),
    #[error("Snapshot encoding error: {0}")]
    Encoding(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type GraphResult<T> = Result<T, GraphError>;
