//! End-to-end generation: baseline, local search, equity, metrics.

use std::collections::BTreeSet;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::baseline;
use crate::equity;
use crate::error::{Error, Result};
use crate::history::{compute_metrics, Metrics};
use crate::improve::{self, Params};
use crate::model::condition::ConstraintSet;
use crate::model::config::Config;
use crate::model::entity::Participant;
use crate::model::group::Plan;
use crate::tuning::Tuning;
use crate::validate::validate;

/// Runs the pipeline with a fixed set of tuning knobs.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    tuning: Tuning,
}

impl Planner {
    pub fn new(tuning: Tuning) -> Planner {
        Planner { tuning }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// All input is checked before any seat is assigned. Each phase takes
    /// ownership of the previous phase's plan.
    pub fn generate(
        &self,
        config: &Config,
        seed: u64,
        constraints: Option<&ConstraintSet>,
        participants: Option<&[Participant]>,
    ) -> Result<(Plan, Metrics)> {
        config.validate()?;
        if let Some(set) = constraints {
            let errors = validate(set, config);
            if !errors.is_empty() {
                return Err(Error::Constraints(errors));
            }
        }
        if let Some(roster) = participants {
            check_roster(roster, config)?;
        }

        let mut rng = SmallRng::seed_from_u64(seed);
        tracing::info!(
            participants = config.participants,
            tables = config.tables,
            capacity = config.capacity,
            rounds = config.rounds,
            seed,
            "plan generation started"
        );

        let plan = baseline::generate(config, constraints, seed)?;

        let plan = match self.tuning.local_search_budget(config.participants) {
            Some(max_iterations) => {
                let params = Params::from_tuning(&self.tuning).with_max_iterations(max_iterations);
                improve::improve(plan, &params, constraints)
            }
            None => {
                tracing::info!(participants = config.participants, "local search skipped for large event");
                plan
            }
        };

        let plan = equity::enforce(plan, constraints, participants, &self.tuning, &mut rng);
        let metrics = compute_metrics(&plan, participants);
        tracing::info!(
            unique_pairs = metrics.total_unique_pairs,
            repeat_pairs = metrics.total_repeat_pairs,
            equity_gap = metrics.equity_gap,
            "plan generation finished"
        );
        Ok((plan, metrics))
    }
}

/// [`Planner::generate`] with default tuning.
pub fn generate_optimized_plan(
    config: &Config,
    seed: u64,
    constraints: Option<&ConstraintSet>,
    participants: Option<&[Participant]>,
) -> Result<(Plan, Metrics)> {
    Planner::default().generate(config, seed, constraints, participants)
}

fn check_roster(roster: &[Participant], config: &Config) -> Result<()> {
    let mut seen = BTreeSet::new();
    for participant in roster {
        if participant.id >= config.participants {
            return Err(Error::UnknownRosterEntry { participant: participant.id, participants: config.participants });
        }
        if !seen.insert(participant.id) {
            return Err(Error::DuplicateRosterEntry(participant.id));
        }
    }
    Ok(())
}
