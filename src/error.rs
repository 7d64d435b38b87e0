use itertools::Itertools;
use thiserror::Error;

use crate::action::{ActionError, Index};
use crate::model::entity::Id;
use crate::tuning::TuningError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("too few participants: N = {0} (minimum 2)")]
    TooFewParticipants(usize),
    #[error("too few tables: X = {0} (minimum 1)")]
    TooFewTables(usize),
    #[error("table capacity too small: x = {0} (minimum 2, a table must allow a meeting)")]
    CapacityTooSmall(usize),
    #[error("too few rounds: S = {0} (minimum 1)")]
    TooFewRounds(usize),
    #[error("insufficient capacity: {tables} tables x {capacity} seats < {participants} participants")]
    InsufficientCapacity { tables: usize, capacity: usize, participants: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("group '{name}' needs at least 2 members, got {size}")]
    GroupTooSmall { name: String, size: usize },
    #[error("group '{name}' names participant {participant} outside 0..{participants}")]
    UnknownParticipant { name: String, participant: Id, participants: usize },
    #[error("group '{name}' is filed under the wrong kind")]
    Misfiled { name: String },
    #[error("together group '{name}' ({size} members) exceeds table capacity {capacity}")]
    Oversized { name: String, size: usize, capacity: usize },
    #[error("participants {} belong to more than one together group ('{name}')", .participants.iter().join(", "))]
    Overlapping { name: String, participants: Vec<Id> },
    #[error(
        "participants {} must sit together ('{together}') and apart ('{separate}')",
        .participants.iter().join(", ")
    )]
    Contradiction { together: String, separate: String, participants: Vec<Id> },
}

/// Structural defects of a plan, reported by [`crate::model::group::Plan::check_partition`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("expected {expected} rounds, found {found}")]
    RoundCount { expected: usize, found: usize },
    #[error("round at position {position} carries index {found}")]
    RoundIndex { position: Index, found: Index },
    #[error("round {round}: expected {expected} tables, found {found}")]
    TableCount { round: Index, expected: usize, found: usize },
    #[error("round {round}: table id {table} is out of range or listed twice")]
    TableId { round: Index, table: Index },
    #[error("round {round}: table {table} seats {size}, capacity is {capacity}")]
    OverCapacity { round: Index, table: Index, size: usize, capacity: usize },
    #[error("round {round}: participant {participant} is not part of the event")]
    UnknownParticipant { round: Index, participant: Id },
    #[error("round {round}: participant {participant} is seated twice")]
    Duplicate { round: Index, participant: Id },
    #[error("round {round}: participant {participant} is not seated")]
    Missing { round: Index, participant: Id },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid constraints: {}", .0.iter().join("; "))]
    Constraints(Vec<ConstraintError>),
    #[error(transparent)]
    Input(#[from] ActionError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Tuning(#[from] TuningError),
    #[error("roster entry {participant} is outside 0..{participants}")]
    UnknownRosterEntry { participant: Id, participants: usize },
    #[error("roster lists participant {0} twice")]
    DuplicateRosterEntry(Id),
    #[error("plan document has no metadata block")]
    MissingMetadata,
    #[error("malformed plan document: {0}")]
    Document(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
