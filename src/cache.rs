use std::collections::HashMap;

use crate::model::entity::Id;
use crate::model::group::{Plan, Table};

/// Unordered participant pair, stored as `(smaller, larger)`.
pub type Pair = (Id, Id);

pub fn pair(a: Id, b: Id) -> Pair {
    if a < b { (a, b) } else { (b, a) }
}

/// Meeting counts per pair plus the per-participant and repeat tallies derived
/// from them, kept in step when a swap is applied.
///
/// Only ids in `0..participants` are tracked. A seat holding any other id
/// takes part in no pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCounts {
    counts: HashMap<Pair, u32>,
    unique: Vec<usize>,
    repeats: usize,
}

impl PairCounts {
    pub fn new(participants: usize) -> PairCounts {
        PairCounts { counts: HashMap::new(), unique: vec![0; participants], repeats: 0 }
    }

    pub fn from_plan(plan: &Plan) -> PairCounts {
        let participants = plan.config.participants;
        let outside = plan
            .rounds
            .iter()
            .flat_map(|round| round.tables.iter())
            .flat_map(|table| table.iter())
            .filter(|&id| id >= participants)
            .count();
        if outside > 0 {
            tracing::warn!(outside, participants, "seats outside the event are left out of pair counts");
        }

        let mut cache = PairCounts::new(participants);
        for table in plan.rounds.iter().flat_map(|round| round.tables.iter()) {
            for (a, b) in table.pairs() {
                cache.add(a, b);
            }
        }
        cache
    }

    pub fn get(&self, a: Id, b: Id) -> u32 {
        self.counts.get(&pair(a, b)).copied().unwrap_or(0)
    }

    pub fn has_met(&self, a: Id, b: Id) -> bool {
        self.counts.contains_key(&pair(a, b))
    }

    /// Distinct co-attendees per participant, indexed by id.
    pub fn unique(&self) -> &[usize] {
        &self.unique
    }

    pub fn unique_pairs(&self) -> usize {
        self.counts.len()
    }

    pub fn repeat_pairs(&self) -> usize {
        self.repeats
    }

    pub fn equity_gap(&self) -> usize {
        let min = self.unique.iter().min().copied().unwrap_or(0);
        let max = self.unique.iter().max().copied().unwrap_or(0);
        max - min
    }

    /// Every pair that met, with its count, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Pair, u32)> + '_ {
        self.counts.iter().map(|(pair, count)| (*pair, *count))
    }

    fn tracks(&self, a: Id, b: Id) -> bool {
        a < self.unique.len() && b < self.unique.len()
    }

    fn add(&mut self, a: Id, b: Id) {
        if !self.tracks(a, b) {
            return;
        }
        let count = self.counts.entry(pair(a, b)).or_insert(0);
        *count += 1;
        match *count {
            1 => {
                self.unique[a] += 1;
                self.unique[b] += 1;
            }
            2 => self.repeats += 1,
            _ => {}
        }
    }

    fn remove(&mut self, a: Id, b: Id) {
        if !self.tracks(a, b) {
            return;
        }
        let key = pair(a, b);
        let Some(count) = self.counts.get_mut(&key) else {
            return;
        };
        *count -= 1;
        match *count {
            0 => {
                self.counts.remove(&key);
                self.unique[a] -= 1;
                self.unique[b] -= 1;
            }
            1 => self.repeats -= 1,
            _ => {}
        }
    }

    /// Accounts for `a` (at `table_a`) and `b` (at `table_b`) trading places.
    /// Both tables are given as they were before the swap.
    pub fn record_swap(&mut self, table_a: &Table, a: Id, table_b: &Table, b: Id) {
        for other in table_a.iter().filter(|&id| id != a) {
            self.remove(a, other);
            self.add(b, other);
        }
        for other in table_b.iter().filter(|&id| id != b) {
            self.remove(b, other);
            self.add(a, other);
        }
    }
}
