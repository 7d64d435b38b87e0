//! Deterministic rotation that seats every round before any optimisation.

use std::cmp::Reverse;

use crate::action::{Index, Move};
use crate::error::{Error, Result};
use crate::model::condition::ConstraintSet;
use crate::model::config::Config;
use crate::model::entity::Id;
use crate::model::group::{Plan, PlacementWarning, Round, Table, WarningKind};
use crate::validate::{validate, would_violate};

/// Rotation multiplier; 17 spreads adjacency patterns across rounds.
const ROTATION_STEP: usize = 17;

/// Participants placed as one block: a whole Together group, or a single person.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Unit {
    members: Vec<Id>,
    separated: bool,
}

/// Builds the starting plan.
///
/// Together groups are collapsed into single units so cohesion never depends
/// on later swaps. Round `r` rotates the unit list by `(17r + 1) mod units`
/// and deals units round-robin onto tables, skipping tables that would seat
/// two members of a Separate group. `seed` is accepted for reproducibility of
/// the whole run; the rotation itself does not consume randomness.
pub fn generate(config: &Config, constraints: Option<&ConstraintSet>, seed: u64) -> Result<Plan> {
    config.validate()?;
    let empty = ConstraintSet::new();
    let constraints = constraints.unwrap_or(&empty);
    let errors = validate(constraints, config);
    if !errors.is_empty() {
        return Err(Error::Constraints(errors));
    }

    let units = units(config.participants, constraints);
    let targets = target_sizes(config);
    tracing::debug!(seed, units = units.len(), together = constraints.together.len(), "generating baseline");

    let mut rounds = Vec::with_capacity(config.rounds);
    let mut warnings = Vec::new();
    for index in 0..config.rounds {
        let mut rotated = units.clone();
        rotated.rotate_left(rotation_stride(index, units.len()));
        rounds.push(seat_round(index, &rotated, config, &targets, constraints, &mut warnings));
    }

    tracing::info!(
        participants = config.participants,
        tables = config.tables,
        rounds = config.rounds,
        warnings = warnings.len(),
        "baseline generated"
    );
    Ok(Plan { config: *config, rounds, warnings })
}

fn rotation_stride(round: Index, units: usize) -> usize {
    if units > 1 { (round * ROTATION_STEP + 1) % units } else { 0 }
}

/// Together groups first, in declaration order, then everyone else by id.
fn units(participants: usize, constraints: &ConstraintSet) -> Vec<Unit> {
    let grouped = constraints.together.iter().map(|group| group.members.iter().copied().collect::<Vec<Id>>());
    let single = (0..participants).filter(|&id| constraints.together_group_of(id).is_none()).map(|id| vec![id]);
    grouped
        .chain(single)
        .map(|members| Unit { separated: members.iter().any(|&id| constraints.is_separated(id)), members })
        .collect()
}

/// Seats per table: `N / X` each, one extra for the first `N mod X` tables.
fn target_sizes(config: &Config) -> Vec<usize> {
    let base = config.participants / config.tables;
    let extra = config.participants % config.tables;
    (0..config.tables).map(|table| base + usize::from(table < extra)).collect()
}

fn seat_round(
    index: Index,
    rotated: &[Unit],
    config: &Config,
    targets: &[usize],
    constraints: &ConstraintSet,
    warnings: &mut Vec<PlacementWarning>,
) -> Round {
    let mut round = Round::new(index, vec![Table::new(); config.tables]);

    // Larger and constrained units go first so they still find room; each
    // keeps the start table its rotated position assigns it.
    let mut order: Vec<(usize, &Unit)> = rotated.iter().enumerate().collect();
    order.sort_by_key(|(_, unit)| (Reverse(unit.members.len()), !unit.separated));

    for (position, unit) in order {
        let (table, forced) =
            choose_table(&round, position % config.tables, unit, targets, config.capacity, constraints);
        if let Some(kind) = forced {
            tracing::warn!(round = index, table, members = ?unit.members, ?kind, "forced placement");
            warnings.push(PlacementWarning { round: index, table, members: unit.members.clone(), kind });
        }
        round.tables[table].extend(unit.members.iter().copied());
    }

    tracing::debug!(round = index, seated = round.seated(), "round seated");
    round
}

/// Cohesion and capacity win over exclusivity: a Separate clash is only
/// accepted once no table can take the unit cleanly.
fn choose_table(
    round: &Round,
    start: Index,
    unit: &Unit,
    targets: &[usize],
    capacity: usize,
    constraints: &ConstraintSet,
) -> (Index, Option<WarningKind>) {
    let tables = round.tables.len();
    let candidates = || (0..tables).map(move |offset| (start + offset) % tables);
    let fits = |table: Index, limit: usize| round.tables[table].len() + unit.members.len() <= limit;
    let clean = |table: Index| !would_violate(round, &Move::Add { table, members: &unit.members }, constraints);

    if let Some(table) = candidates().find(|&t| fits(t, targets[t]) && clean(t)) {
        return (table, None);
    }
    if let Some(table) = candidates().find(|&t| fits(t, capacity) && clean(t)) {
        return (table, None);
    }
    let forced = candidates()
        .find(|&t| fits(t, targets[t]))
        .or_else(|| candidates().find(|&t| fits(t, capacity)));
    if let Some(table) = forced {
        return (table, Some(WarningKind::SeparateForced));
    }
    let emptiest = candidates().min_by_key(|&t| round.tables[t].len()).unwrap_or(start);
    (emptiest, Some(WarningKind::CapacityExceeded))
}
