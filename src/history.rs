//! Who met whom, and the quality figures derived from it.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::cache::{Pair, PairCounts};
use crate::model::entity::Participant;
use crate::model::group::Plan;

/// Every pair that shared a table at least once, normalized `(smaller, larger)`.
pub fn meeting_history(plan: &Plan) -> HashSet<Pair> {
    let met: HashSet<Pair> = plan
        .rounds
        .iter()
        .flat_map(|round| round.tables.iter())
        .flat_map(|table| table.pairs())
        .collect();
    tracing::debug!(pairs = met.len(), "meeting history computed");
    met
}

/// Min/max/mean of unique-meeting counts over a set of participants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spread {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub gap: usize,
}

impl Spread {
    pub fn of(values: &[usize]) -> Spread {
        let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
            return Spread::default();
        };
        Spread {
            count: values.len(),
            min,
            max,
            mean: values.iter().sum::<usize>() as f64 / values.len() as f64,
            gap: max - min,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VipMetrics {
    pub vip: Spread,
    pub regular: Spread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub unique_per_participant: Vec<usize>,
    pub total_unique_pairs: usize,
    pub total_repeat_pairs: usize,
    pub min_unique: usize,
    pub max_unique: usize,
    pub mean_unique: f64,
    pub equity_gap: usize,
    pub vip: Option<VipMetrics>,
}

impl Metrics {
    pub fn from_counts(counts: &PairCounts, participants: Option<&[Participant]>) -> Metrics {
        let unique = counts.unique().to_vec();
        let overall = Spread::of(&unique);
        let vip = participants.and_then(|roster| vip_metrics(&unique, roster));
        Metrics {
            total_unique_pairs: counts.unique_pairs(),
            total_repeat_pairs: counts.repeat_pairs(),
            min_unique: overall.min,
            max_unique: overall.max,
            mean_unique: overall.mean,
            equity_gap: overall.gap,
            unique_per_participant: unique,
            vip,
        }
    }
}

/// Figures are computed fresh from `plan` on every call.
pub fn compute_metrics(plan: &Plan, participants: Option<&[Participant]>) -> Metrics {
    let metrics = Metrics::from_counts(&PairCounts::from_plan(plan), participants);
    tracing::debug!(
        unique_pairs = metrics.total_unique_pairs,
        repeat_pairs = metrics.total_repeat_pairs,
        equity_gap = metrics.equity_gap,
        "metrics computed"
    );
    metrics
}

fn vip_metrics(unique: &[usize], roster: &[Participant]) -> Option<VipMetrics> {
    let vip_ids: BTreeSet<_> = roster.iter().filter(|p| p.is_vip).map(|p| p.id).collect();
    if vip_ids.is_empty() {
        return None;
    }
    let collect = |vip: bool| -> Vec<usize> {
        roster
            .iter()
            .filter(|p| p.is_vip == vip)
            .filter_map(|p| unique.get(p.id).copied())
            .collect()
    };
    Some(VipMetrics { vip: Spread::of(&collect(true)), regular: Spread::of(&collect(false)) })
}
