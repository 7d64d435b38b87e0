//! Targeted swaps between the most and least exposed participants until
//! everyone's unique-meeting count lies within one of everyone else's.
//!
//! Reaching a gap of one is best effort. Oscillation, exhaustion of the
//! iteration budget or the absence of any improving swap end the loop quietly
//! and hand back the most equitable plan seen, which is never less equitable
//! than the input.

use std::collections::{BTreeSet, VecDeque};

use rand::prelude::SliceRandom;
use rand::rngs::SmallRng;

use crate::action::{Move, Seat};
use crate::cache::PairCounts;
use crate::model::condition::ConstraintSet;
use crate::model::entity::{Id, Participant};
use crate::model::group::Plan;
use crate::tuning::{TieBreak, Tuning};
use crate::validate::would_violate;

/// Under-exposed candidates matched against over-exposed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tier {
    label: &'static str,
    under: Vec<Id>,
    over: Vec<Id>,
}

pub fn enforce(
    plan: Plan,
    constraints: Option<&ConstraintSet>,
    participants: Option<&[Participant]>,
    tuning: &Tuning,
    rng: &mut SmallRng,
) -> Plan {
    let mut current = plan;
    let mut counts = PairCounts::from_plan(&current);
    let mut best = current.clone();
    let mut best_gap = counts.equity_gap();
    let mut recent: VecDeque<usize> = VecDeque::with_capacity(tuning.oscillation_window + 1);

    tracing::info!(equity_gap = best_gap, "equity enforcement started");

    for iteration in 0..tuning.equity_max_iterations {
        let gap = counts.equity_gap();
        if gap <= 1 {
            tracing::info!(iteration, equity_gap = gap, "equity reached");
            return current;
        }
        if gap < best_gap {
            best_gap = gap;
            best = current.clone();
        }

        recent.push_back(gap);
        if recent.len() > tuning.oscillation_window {
            recent.pop_front();
        }
        if recent.len() >= tuning.oscillation_window && oscillating(&recent, tuning.oscillation_repeats) {
            tracing::warn!(iteration, equity_gap = gap, window = ?recent, "equity gap oscillating, stopping");
            return better_of(current, gap, best, best_gap);
        }

        let mut tiers = tiers(counts.unique(), participants, tuning.vip_max_advantage);
        if tuning.tie_break == TieBreak::Seeded {
            for tier in tiers.iter_mut() {
                tier.under.shuffle(rng);
                tier.over.shuffle(rng);
            }
        }
        tracing::debug!(iteration, equity_gap = gap, tiers = tiers.len(), "equity iteration");

        let applied = tiers.iter().any(|tier| {
            tier.under.iter().any(|&under| {
                tier.over
                    .iter()
                    .any(|&over| try_swap(&mut current, &mut counts, over, under, constraints, tier.label))
            })
        });
        if !applied {
            tracing::warn!(iteration, equity_gap = gap, "no equity-improving swap left");
            return better_of(current, gap, best, best_gap);
        }
    }

    let gap = counts.equity_gap();
    tracing::warn!(
        max_iterations = tuning.equity_max_iterations,
        equity_gap = gap,
        "equity iteration budget exhausted"
    );
    better_of(current, gap, best, best_gap)
}

fn better_of(current: Plan, current_gap: usize, best: Plan, best_gap: usize) -> Plan {
    if current_gap <= best_gap { current } else { best }
}

/// At most two distinct values, and the oldest one seen `repeats` times.
fn oscillating(recent: &VecDeque<usize>, repeats: usize) -> bool {
    let Some(&first) = recent.front() else {
        return false;
    };
    let distinct: BTreeSet<usize> = recent.iter().copied().collect();
    distinct.len() <= 2 && recent.iter().filter(|&&gap| gap == first).count() >= repeats
}

/// Matching order for one iteration. With a VIP roster whose least served VIP
/// is not yet `max_advantage` ahead of the least served regular participant,
/// under-exposed VIPs are matched first.
fn tiers(unique: &[usize], participants: Option<&[Participant]>, max_advantage: i64) -> Vec<Tier> {
    let (Some(&min), Some(&max)) = (unique.iter().min(), unique.iter().max()) else {
        return Vec::new();
    };
    let under: Vec<Id> = (0..unique.len()).filter(|&id| unique[id] == min).collect();
    let over: Vec<Id> = (0..unique.len()).filter(|&id| unique[id] == max).collect();
    let standard = || vec![Tier { label: "standard", under: under.clone(), over: over.clone() }];

    let Some(roster) = participants else {
        return standard();
    };
    let vips: BTreeSet<Id> = roster.iter().filter(|p| p.is_vip).map(|p| p.id).collect();
    let least = |vip: bool| {
        roster
            .iter()
            .filter(|p| p.is_vip == vip)
            .filter_map(|p| unique.get(p.id).copied())
            .min()
    };
    let below_cap = match (least(true), least(false)) {
        (Some(vip), Some(regular)) => (vip as i64 - regular as i64) < max_advantage,
        _ => true,
    };

    let (under_vip, under_regular): (Vec<Id>, Vec<Id>) = under.iter().copied().partition(|id| vips.contains(id));
    if !below_cap || under_vip.is_empty() {
        return standard();
    }
    let (over_vip, over_regular): (Vec<Id>, Vec<Id>) = over.iter().copied().partition(|id| vips.contains(id));
    vec![
        Tier { label: "vip under, regular over", under: under_vip.clone(), over: over_regular },
        Tier { label: "vip under, vip over", under: under_vip, over: over_vip },
        Tier { label: "regular under", under: under_regular, over },
    ]
}

/// Applies the first round's swap of `over` and `under` that raises the
/// under-exposed participant's unique count relative to the over-exposed one's.
fn try_swap(
    plan: &mut Plan,
    counts: &mut PairCounts,
    over: Id,
    under: Id,
    constraints: Option<&ConstraintSet>,
    label: &str,
) -> bool {
    for round in plan.rounds.iter_mut() {
        let (Some(table_over), Some(table_under)) = (round.table_of(over), round.table_of(under)) else {
            continue;
        };
        if table_over == table_under {
            continue;
        }

        let (seats_over, seats_under) = (&round.tables[table_over], &round.tables[table_under]);
        let score = exposure_change(counts, seats_over.iter(), seats_under.iter(), under, over)
            - exposure_change(counts, seats_under.iter(), seats_over.iter(), over, under);
        if score <= 0 {
            continue;
        }
        let candidate = Move::Swap(Seat::new(table_over, over), Seat::new(table_under, under));
        if constraints.is_some_and(|set| would_violate(round, &candidate, set)) {
            tracing::debug!(round = round.index, over, under, "equity swap rejected by constraints");
            continue;
        }

        counts.record_swap(&round.tables[table_over], over, &round.tables[table_under], under);
        round.swap(table_over, over, table_under, under);
        tracing::debug!(round = round.index, over, under, score, tier = label, "equity swap applied");
        return true;
    }
    false
}

/// Unique meetings `mover` gains minus those it loses when it leaves its
/// table for the one `partner` occupies.
fn exposure_change(
    counts: &PairCounts,
    arriving: impl Iterator<Item = Id>,
    leaving: impl Iterator<Item = Id>,
    mover: Id,
    partner: Id,
) -> i64 {
    let gained = arriving.filter(|&other| other != partner && counts.get(mover, other) == 0).count();
    let lost = leaving.filter(|&other| other != mover && counts.get(mover, other) == 1).count();
    gained as i64 - lost as i64
}
