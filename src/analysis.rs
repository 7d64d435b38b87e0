//! Post-hoc reporting: pair meeting matrix, coverage figures and a 0-100
//! quality score.

use serde::{Deserialize, Serialize};

use crate::cache::PairCounts;
use crate::history::{compute_metrics, Metrics};
use crate::model::entity::Id;
use crate::model::group::Plan;

/// Symmetric N×N count of shared tables; the diagonal stays zero. Seats
/// holding an id outside `0..N` are left out, as in [`PairCounts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingsMatrix {
    cells: Vec<Vec<u32>>,
}

impl MeetingsMatrix {
    pub fn of(plan: &Plan) -> MeetingsMatrix {
        let size = plan.config.participants;
        let mut cells = vec![vec![0; size]; size];
        for ((a, b), count) in PairCounts::from_plan(plan).iter() {
            cells[a][b] = count;
            cells[b][a] = count;
        }
        tracing::debug!(size, "meetings matrix computed");
        MeetingsMatrix { cells }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, a: Id, b: Id) -> u32 {
        self.cells.get(a).and_then(|row| row.get(b)).copied().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.cells
    }

    /// Upper triangle, one entry per unordered pair.
    fn pairs(&self) -> impl Iterator<Item = u32> + '_ {
        self.cells.iter().enumerate().flat_map(|(a, row)| row[a + 1..].iter().copied())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixStats {
    pub total_pairs_met: usize,
    pub total_possible_pairs: usize,
    /// Percentage of possible pairs that met at least once.
    pub coverage_rate: f64,
    pub repeat_pairs: usize,
    pub max_meetings: u32,
}

impl MatrixStats {
    pub fn of(matrix: &MeetingsMatrix) -> MatrixStats {
        let size = matrix.size();
        let total_possible_pairs = size * size.saturating_sub(1) / 2;
        let total_pairs_met = matrix.pairs().filter(|&count| count >= 1).count();
        let repeat_pairs = matrix.pairs().filter(|&count| count >= 2).count();
        let max_meetings = matrix.pairs().max().unwrap_or(0);
        let coverage_rate = if total_possible_pairs > 0 {
            100.0 * total_pairs_met as f64 / total_possible_pairs as f64
        } else {
            0.0
        };
        MatrixStats { total_pairs_met, total_possible_pairs, coverage_rate, repeat_pairs, max_meetings }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    NeedsWork,
}

impl Grade {
    pub fn from_score(score: u32) -> Grade {
        match score {
            90.. => Grade::Excellent,
            70..=89 => Grade::Good,
            _ => Grade::NeedsWork,
        }
    }
}

/// Equity is worth 40 points, coverage and repeats 30 each.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    pub score: u32,
    pub grade: Grade,
    pub equity_points: f64,
    pub coverage_points: f64,
    pub repeat_points: f64,
}

impl Quality {
    pub fn of(metrics: &Metrics, stats: &MatrixStats) -> Quality {
        let equity_points = match metrics.equity_gap {
            0 | 1 => 40.0,
            2 => 25.0,
            3 => 10.0,
            _ => 0.0,
        };
        let coverage_points = 30.0 * stats.coverage_rate / 100.0;
        let repeat_rate = if stats.total_possible_pairs > 0 {
            100.0 * stats.repeat_pairs as f64 / stats.total_possible_pairs as f64
        } else {
            0.0
        };
        let repeat_points = if repeat_rate == 0.0 {
            30.0
        } else if repeat_rate < 5.0 {
            25.0
        } else if repeat_rate < 10.0 {
            15.0
        } else {
            (30.0 - repeat_rate).max(0.0)
        };

        let score = (equity_points + coverage_points + repeat_points).round() as u32;
        let grade = Grade::from_score(score);
        tracing::debug!(score, ?grade, equity_points, coverage_points, repeat_points, "quality scored");
        Quality { score, grade, equity_points, coverage_points, repeat_points }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metrics: Metrics,
    pub matrix: MeetingsMatrix,
    pub stats: MatrixStats,
    pub quality: Quality,
}

pub fn analyze(plan: &Plan) -> Report {
    let metrics = compute_metrics(plan, None);
    let matrix = MeetingsMatrix::of(plan);
    let stats = MatrixStats::of(&matrix);
    let quality = Quality::of(&metrics, &stats);
    Report { metrics, matrix, stats, quality }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::Config;
    use crate::model::group::Round;

    fn plan(config: Config, rounds: &[&[&[Id]]]) -> Plan {
        let rounds = rounds
            .iter()
            .enumerate()
            .map(|(index, tables)| Round::new(index, tables.iter().map(|t| t.iter().copied().collect()).collect()))
            .collect();
        Plan::new(config, rounds)
    }

    /// 0 and 2 meet twice, every other pair once.
    fn triangle() -> Plan {
        plan(Config::new(3, 2, 3, 2).unwrap(), &[&[&[0, 1, 2], &[]], &[&[0, 2], &[1]]])
    }

    #[test]
    fn matrix_is_symmetric_with_empty_diagonal() {
        let matrix = MeetingsMatrix::of(&triangle());
        assert_eq!(matrix.rows(), &[vec![0, 1, 2], vec![1, 0, 1], vec![2, 1, 0]]);
        assert_eq!(matrix.get(2, 0), 2);
        assert_eq!(matrix.get(7, 0), 0);
    }

    #[test]
    fn stray_seat_does_not_break_the_matrix() {
        let stray = plan(Config::new(3, 2, 3, 1).unwrap(), &[&[&[0, 1, 5], &[2]]]);
        let matrix = MeetingsMatrix::of(&stray);
        assert_eq!(matrix.rows(), &[vec![0, 1, 0], vec![1, 0, 0], vec![0, 0, 0]]);
        assert_eq!(analyze(&stray).stats.total_pairs_met, 1);
    }

    #[test]
    fn stats_count_upper_triangle() {
        let stats = MatrixStats::of(&MeetingsMatrix::of(&triangle()));
        assert_eq!(stats.total_possible_pairs, 3);
        assert_eq!(stats.total_pairs_met, 3);
        assert_eq!(stats.repeat_pairs, 1);
        assert_eq!(stats.max_meetings, 2);
        assert!((stats.coverage_rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn perfect_plan_scores_full_marks() {
        let report = analyze(&plan(Config::new(4, 1, 4, 1).unwrap(), &[&[&[0, 1, 2, 3]]]));
        assert_eq!(report.quality.score, 100);
        assert_eq!(report.quality.grade, Grade::Excellent);
    }

    #[test]
    fn repeats_cost_points() {
        // Full equity and coverage, but a third of all pairs repeat.
        let report = analyze(&triangle());
        assert_eq!(report.quality.repeat_points, 0.0);
        assert_eq!(report.quality.score, 70);
        assert_eq!(report.quality.grade, Grade::Good);
    }

    #[test]
    fn identical_rounds_need_work() {
        let report = analyze(&plan(Config::new(4, 2, 2, 2).unwrap(), &[&[&[0, 1], &[2, 3]], &[&[0, 1], &[2, 3]]]));
        assert_eq!(report.stats.total_pairs_met, 2);
        assert_eq!(report.quality.score, 50);
        assert_eq!(report.quality.grade, Grade::NeedsWork);
    }

    #[test]
    fn grade_boundaries() {
        assert_eq!(Grade::from_score(90), Grade::Excellent);
        assert_eq!(Grade::from_score(89), Grade::Good);
        assert_eq!(Grade::from_score(70), Grade::Good);
        assert_eq!(Grade::from_score(69), Grade::NeedsWork);
    }
}
