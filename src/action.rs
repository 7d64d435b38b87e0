use thiserror::Error;

use crate::model::entity::Id;

pub type Index = usize;

/// A participant at a given table within one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seat {
    pub table: Index,
    pub participant: Id,
}

impl Seat {
    pub fn new(table: Index, participant: Id) -> Seat {
        Seat { table, participant }
    }
}

/// A proposed change to one round's seating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move<'a> {
    /// Two participants at different tables trade places.
    Swap(Seat, Seat),
    /// A unit of participants sits down at a table.
    Add { table: Index, members: &'a [Id] },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("round {0} does not exist")]
    UnknownRound(Index),
    #[error("table {table} does not exist in round {round}")]
    UnknownTable { round: Index, table: Index },
    #[error("participant {participant} is not seated at table {table} in round {round}")]
    NotSeated { round: Index, table: Index, participant: Id },
    #[error("cannot swap within table {table} of round {round}")]
    SameTable { round: Index, table: Index },
}
