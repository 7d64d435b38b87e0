//! Greedy first-improvement local search over two-participant swaps.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::action::{Move, Seat};
use crate::cache::PairCounts;
use crate::model::condition::ConstraintSet;
use crate::model::entity::Id;
use crate::model::group::{Plan, Round};
use crate::swap::{repeat_delta, MetPairs};
use crate::tuning::Tuning;
use crate::validate::would_violate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    pub max_iterations: usize,
    pub plateau_threshold: usize,
}

impl Params {
    pub fn from_tuning(tuning: &Tuning) -> Params {
        Params { max_iterations: tuning.improve_max_iterations, plateau_threshold: tuning.plateau_threshold }
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> Params {
        Params { max_iterations, ..self }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::from_tuning(&Tuning::default())
    }
}

/// Meetings that happen in some round other than `round`.
struct MetElsewhere<'a> {
    counts: &'a PairCounts,
    round: &'a Round,
}

impl MetPairs for MetElsewhere<'_> {
    fn has_met(&self, a: Id, b: Id) -> bool {
        let here = match self.round.table_of(a) {
            Some(table) => self.round.tables[table].contains(b),
            None => false,
        };
        self.counts.get(a, b) > u32::from(here)
    }
}

#[derive(Debug, Default)]
struct Sweep {
    applied: usize,
    rejected: usize,
}

/// Reduces repeated pairings. Returns `plan` itself, untouched, if the
/// optimised copy ends with a wider equity gap than the input had.
///
/// A swap is scored against meetings from the other rounds, and the counts
/// are updated as soon as it is applied, so every accepted swap strictly
/// lowers the number of surplus meetings.
pub fn improve(plan: Plan, params: &Params, constraints: Option<&ConstraintSet>) -> Plan {
    let mut counts = PairCounts::from_plan(&plan);
    let initial_gap = counts.equity_gap();
    let mut optimized = plan.clone();
    let mut plateau = 0;
    let mut iterations = 0;

    tracing::info!(
        max_iterations = params.max_iterations,
        plateau_threshold = params.plateau_threshold,
        "local search started"
    );

    for iteration in 1..=params.max_iterations {
        iterations = iteration;
        let mut sweep = Sweep::default();
        for round in optimized.rounds.iter_mut() {
            improve_round(round, &mut counts, constraints, &mut sweep);
        }

        if sweep.applied > 0 {
            tracing::debug!(iteration, applied = sweep.applied, rejected = sweep.rejected, "beneficial swaps applied");
            plateau = 0;
        } else {
            plateau += 1;
            tracing::debug!(iteration, plateau, "no improving swap");
        }
        if plateau >= params.plateau_threshold {
            tracing::info!(iteration, "plateau reached, stopping early");
            break;
        }
    }

    let final_gap = counts.equity_gap();
    if final_gap > initial_gap {
        tracing::warn!(initial_gap, final_gap, "local search widened the equity gap, keeping input plan");
        return plan;
    }
    tracing::info!(iterations, equity_gap = final_gap, "local search finished");
    optimized
}

/// One pass over every table pair of `round`, applying each strictly
/// improving swap as soon as it is found. A participant moved during a
/// table pair's pass is not considered again in that pass.
fn improve_round(round: &mut Round, counts: &mut PairCounts, constraints: Option<&ConstraintSet>, sweep: &mut Sweep) {
    for (table_a, table_b) in (0..round.tables.len()).tuple_combinations() {
        let left: Vec<Id> = round.tables[table_a].iter().collect();
        let right: Vec<Id> = round.tables[table_b].iter().collect();
        let mut moved: BTreeSet<Id> = BTreeSet::new();

        for &a in &left {
            for &b in &right {
                if moved.contains(&a) || moved.contains(&b) {
                    continue;
                }
                let candidate = Move::Swap(Seat::new(table_a, a), Seat::new(table_b, b));
                if constraints.is_some_and(|set| would_violate(round, &candidate, set)) {
                    sweep.rejected += 1;
                    continue;
                }
                let met = MetElsewhere { counts: &*counts, round: &*round };
                let delta = repeat_delta(round, table_a, a, table_b, b, &met);
                if delta < 0 {
                    counts.record_swap(&round.tables[table_a], a, &round.tables[table_b], b);
                    round.swap(table_a, a, table_b, b);
                    moved.insert(a);
                    moved.insert(b);
                    sweep.applied += 1;
                    tracing::debug!(round = round.index, a, table_a, b, table_b, delta, "swap applied");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::generate;
    use crate::model::condition::GroupConstraint;
    use crate::model::config::Config;
    use crate::validate::plan_breaches;

    fn repeated(participants: usize, tables: &[&[Id]], rounds: usize) -> Plan {
        let config = Config::new(participants, tables.len(), tables[0].len(), rounds).unwrap();
        let rounds = (0..rounds)
            .map(|index| Round::new(index, tables.iter().map(|t| t.iter().copied().collect()).collect()))
            .collect();
        Plan::new(config, rounds)
    }

    #[test]
    fn breaks_up_a_repeated_round() {
        let plan = repeated(4, &[&[0, 1], &[2, 3]], 2);
        let improved = improve(plan, &Params::default(), None);
        // 0 and 2 trade places in the first round; the second round is then already fresh.
        assert_eq!(improved.rounds[0].tables, vec![[1, 2].into_iter().collect(), [0, 3].into_iter().collect()]);
        assert_eq!(improved.rounds[1].tables, vec![[0, 1].into_iter().collect(), [2, 3].into_iter().collect()]);
        let counts = PairCounts::from_plan(&improved);
        assert_eq!(counts.repeat_pairs(), 0);
        assert_eq!(counts.equity_gap(), 0);
    }

    #[test]
    fn rolls_back_when_gap_widens() {
        // Splitting either table unevenly leaves someone with one more acquaintance than the rest.
        let plan = repeated(6, &[&[0, 1, 2], &[3, 4, 5]], 2);
        let improved = improve(plan.clone(), &Params::default(), None);
        assert_eq!(improved, plan);
    }

    #[test]
    fn never_widens_equity_gap() {
        for (n, x, cap, s) in [(12, 3, 4, 4), (10, 3, 4, 3), (15, 4, 4, 5), (9, 2, 5, 3), (30, 5, 6, 6)] {
            let config = Config::new(n, x, cap, s).unwrap();
            let baseline = generate(&config, None, 42).unwrap();
            let gap = PairCounts::from_plan(&baseline).equity_gap();
            let improved = improve(baseline.clone(), &Params::default().with_max_iterations(20), None);
            assert!(PairCounts::from_plan(&improved).equity_gap() <= gap, "{config:?}");
            assert_eq!(improved.check_partition(), Ok(()));
        }
    }

    #[test]
    fn zero_budget_returns_copy() {
        let plan = repeated(4, &[&[0, 1], &[2, 3]], 2);
        let improved = improve(plan.clone(), &Params::default().with_max_iterations(0), None);
        assert_eq!(improved, plan);
    }

    #[test]
    fn respects_constraints() {
        let set = ConstraintSet::new()
            .with(GroupConstraint::together("couple", [0, 1]).unwrap())
            .with(GroupConstraint::separate("rivals", [3, 7]).unwrap());
        let config = Config::new(12, 3, 4, 4).unwrap();
        let baseline = generate(&config, Some(&set), 42).unwrap();
        let improved = improve(baseline, &Params::default(), Some(&set));
        assert!(plan_breaches(&improved, &set).is_empty());
        assert_eq!(improved.check_partition(), Ok(()));
    }

    #[test]
    fn deterministic() {
        let config = Config::new(14, 3, 5, 4).unwrap();
        let baseline = generate(&config, None, 7).unwrap();
        let first = improve(baseline.clone(), &Params::default(), None);
        let second = improve(baseline, &Params::default(), None);
        assert_eq!(first, second);
    }
}
