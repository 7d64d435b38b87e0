use std::collections::HashSet;

use crate::action::{ActionError, Index};
use crate::cache::{pair, Pair, PairCounts};
use crate::model::entity::Id;
use crate::model::group::{Plan, Round};

/// Answers whether two participants count as having already met.
pub trait MetPairs {
    fn has_met(&self, a: Id, b: Id) -> bool;
}

impl MetPairs for HashSet<Pair> {
    fn has_met(&self, a: Id, b: Id) -> bool {
        self.contains(&pair(a, b))
    }
}

impl MetPairs for PairCounts {
    fn has_met(&self, a: Id, b: Id) -> bool {
        PairCounts::has_met(self, a, b)
    }
}

/// Change in already-met pairs at the two tables if `participant_a` (at
/// `table_a`) and `participant_b` (at `table_b`) traded places in round
/// `round_id`. Negative means fewer repeats. The plan is not touched.
pub fn evaluate_swap(
    plan: &Plan,
    round_id: Index,
    table_a: Index,
    participant_a: Id,
    table_b: Index,
    participant_b: Id,
    met_pairs: &impl MetPairs,
) -> Result<i64, ActionError> {
    let round = plan.round(round_id).ok_or(ActionError::UnknownRound(round_id))?;
    evaluate_round_swap(round, table_a, participant_a, table_b, participant_b, met_pairs)
}

pub fn evaluate_round_swap(
    round: &Round,
    table_a: Index,
    participant_a: Id,
    table_b: Index,
    participant_b: Id,
    met_pairs: &impl MetPairs,
) -> Result<i64, ActionError> {
    for (table, participant) in [(table_a, participant_a), (table_b, participant_b)] {
        let seated = round
            .tables
            .get(table)
            .ok_or(ActionError::UnknownTable { round: round.index, table })?;
        if !seated.contains(participant) {
            return Err(ActionError::NotSeated { round: round.index, table, participant });
        }
    }
    if table_a == table_b {
        return Err(ActionError::SameTable { round: round.index, table: table_a });
    }
    Ok(repeat_delta(round, table_a, participant_a, table_b, participant_b, met_pairs))
}

/// Only pairs involving the two movers change, so the rest of each table
/// cancels out of before/after.
pub(crate) fn repeat_delta(
    round: &Round,
    table_a: Index,
    participant_a: Id,
    table_b: Index,
    participant_b: Id,
    met_pairs: &impl MetPairs,
) -> i64 {
    let met_at = |table: Index, mover: Id, leaving: Id| -> i64 {
        round.tables[table]
            .iter()
            .filter(|&other| other != leaving && met_pairs.has_met(mover, other))
            .count() as i64
    };
    let before = met_at(table_a, participant_a, participant_a) + met_at(table_b, participant_b, participant_b);
    let after = met_at(table_a, participant_b, participant_a) + met_at(table_b, participant_a, participant_b);
    after - before
}
