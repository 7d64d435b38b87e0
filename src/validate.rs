//! Hard-rule checks shared by every generative phase.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::action::{Index, Move, Seat};
use crate::error::ConstraintError;
use crate::model::condition::{ConstraintSet, GroupKind};
use crate::model::config::Config;
use crate::model::entity::Id;
use crate::model::group::{Plan, Round};

/// Reports every structural problem of `constraints` against `config`.
/// An empty list means the set can be honoured by construction.
pub fn validate(constraints: &ConstraintSet, config: &Config) -> Vec<ConstraintError> {
    let mut errors = Vec::new();

    let filed = [(GroupKind::Together, &constraints.together), (GroupKind::Separate, &constraints.separate)];
    for (expected, groups) in filed {
        for group in groups {
            if group.kind != expected {
                errors.push(ConstraintError::Misfiled { name: group.name.clone() });
            }
            if group.members.len() < 2 {
                errors.push(ConstraintError::GroupTooSmall { name: group.name.clone(), size: group.members.len() });
            }
            if let Some(&participant) = group.members.iter().find(|&&id| id >= config.participants) {
                errors.push(ConstraintError::UnknownParticipant {
                    name: group.name.clone(),
                    participant,
                    participants: config.participants,
                });
            }
        }
    }

    let mut cohesive: BTreeSet<Id> = BTreeSet::new();
    for group in &constraints.together {
        if group.members.len() > config.capacity {
            errors.push(ConstraintError::Oversized {
                name: group.name.clone(),
                size: group.members.len(),
                capacity: config.capacity,
            });
        }
        let overlap: Vec<Id> = group.members.intersection(&cohesive).copied().collect();
        if !overlap.is_empty() {
            errors.push(ConstraintError::Overlapping { name: group.name.clone(), participants: overlap });
        }
        cohesive.extend(group.members.iter().copied());
    }

    for separate in &constraints.separate {
        for together in &constraints.together {
            let overlap: Vec<Id> = separate.members.intersection(&together.members).copied().collect();
            if overlap.len() >= 2 {
                errors.push(ConstraintError::Contradiction {
                    together: together.name.clone(),
                    separate: separate.name.clone(),
                    participants: overlap,
                });
            }
        }
    }

    errors
}

/// Returns true iff applying `candidate` to `round` would split a Together
/// group or seat two members of one Separate group at the same table.
pub fn would_violate(round: &Round, candidate: &Move, constraints: &ConstraintSet) -> bool {
    match candidate {
        Move::Swap(left, right) => swap_violates(round, *left, *right, constraints),
        Move::Add { table, members } => add_violates(round, *table, members, constraints),
    }
}

fn swap_violates(round: &Round, left: Seat, right: Seat, constraints: &ConstraintSet) -> bool {
    let (Some(table_a), Some(table_b)) = (round.tables.get(left.table), round.tables.get(right.table)) else {
        return true;
    };
    let seated_after = |table: Index, id: Id| -> bool {
        if id == left.participant {
            table == right.table
        } else if id == right.participant {
            table == left.table
        } else {
            round.tables[table].contains(id)
        }
    };

    for group in &constraints.together {
        if group.contains(left.participant) && !group.members.iter().all(|&id| seated_after(right.table, id)) {
            tracing::debug!(
                group = %group.name,
                a = left.participant,
                b = right.participant,
                "swap would split together group"
            );
            return true;
        }
        if group.contains(right.participant) && !group.members.iter().all(|&id| seated_after(left.table, id)) {
            tracing::debug!(
                group = %group.name,
                a = left.participant,
                b = right.participant,
                "swap would split together group"
            );
            return true;
        }
    }

    for group in &constraints.separate {
        for (index, table) in [(left.table, table_a), (right.table, table_b)] {
            let together = table
                .iter()
                .chain([left.participant, right.participant])
                .collect::<BTreeSet<Id>>()
                .into_iter()
                .filter(|&id| group.contains(id) && seated_after(index, id))
                .count();
            if together >= 2 {
                tracing::debug!(group = %group.name, table = index, "swap would seat separate group together");
                return true;
            }
        }
    }

    false
}

fn add_violates(round: &Round, table: Index, members: &[Id], constraints: &ConstraintSet) -> bool {
    let Some(target) = round.tables.get(table) else {
        return true;
    };

    for group in &constraints.separate {
        let arriving = members.iter().any(|&id| group.contains(id));
        if arriving && target.iter().any(|id| group.contains(id) && !members.contains(&id)) {
            tracing::debug!(group = %group.name, table, "placement would seat separate group together");
            return true;
        }
    }

    for group in &constraints.together {
        if !members.iter().any(|&id| group.contains(id)) {
            continue;
        }
        let split = group
            .members
            .iter()
            .filter(|id| !members.contains(id))
            .any(|&id| matches!(round.table_of(id), Some(other) if other != table));
        if split {
            tracing::debug!(group = %group.name, table, "placement would split together group");
            return true;
        }
    }

    false
}

/// A hard rule broken by an existing seating.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Breach {
    #[error("round {round}: together group '{group}' spread over tables {tables:?}")]
    Split { round: Index, group: String, tables: Vec<Index> },
    #[error("round {round}: separate group '{group}' has {members:?} at table {table}")]
    CoSeated { round: Index, table: Index, group: String, members: Vec<Id> },
}

pub fn round_breaches(round: &Round, constraints: &ConstraintSet) -> Vec<Breach> {
    let mut breaches = Vec::new();
    for group in &constraints.together {
        let tables: BTreeSet<Index> = group.members.iter().filter_map(|&id| round.table_of(id)).collect();
        if tables.len() > 1 {
            breaches.push(Breach::Split {
                round: round.index,
                group: group.name.clone(),
                tables: tables.into_iter().collect(),
            });
        }
    }
    for group in &constraints.separate {
        for (table, seated) in round.tables.iter().enumerate() {
            let members: Vec<Id> = seated.iter().filter(|&id| group.contains(id)).collect();
            if members.len() >= 2 {
                breaches.push(Breach::CoSeated { round: round.index, table, group: group.name.clone(), members });
            }
        }
    }
    breaches
}

pub fn plan_breaches(plan: &Plan, constraints: &ConstraintSet) -> Vec<Breach> {
    let breaches: Vec<Breach> = plan.rounds.iter().flat_map(|round| round_breaches(round, constraints)).collect();
    if breaches.is_empty() {
        tracing::debug!(rounds = plan.rounds.len(), "all constraints respected");
    } else {
        tracing::warn!(count = breaches.len(), rounds = plan.rounds.len(), "plan breaks hard constraints");
    }
    breaches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::condition::GroupConstraint;
    use crate::model::group::Table;

    fn round(tables: &[&[Id]]) -> Round {
        Round::new(0, tables.iter().map(|ids| ids.iter().copied().collect::<Table>()).collect())
    }

    fn config() -> Config {
        Config::new(10, 2, 5, 3).unwrap()
    }

    #[test]
    fn empty_set_is_valid() {
        assert!(validate(&ConstraintSet::new(), &config()).is_empty());
    }

    #[test]
    fn oversized_together_group() {
        let set = ConstraintSet::new().with(GroupConstraint::together("big", [0, 1, 2, 3]).unwrap());
        let config = Config::new(12, 4, 3, 2).unwrap();
        assert_eq!(
            validate(&set, &config),
            vec![ConstraintError::Oversized { name: "big".to_string(), size: 4, capacity: 3 }]
        );
    }

    #[test]
    fn participant_in_two_together_groups() {
        let set = ConstraintSet::new()
            .with(GroupConstraint::together("a", [0, 1]).unwrap())
            .with(GroupConstraint::together("b", [1, 2]).unwrap());
        assert_eq!(
            validate(&set, &config()),
            vec![ConstraintError::Overlapping { name: "b".to_string(), participants: vec![1] }]
        );
    }

    #[test]
    fn together_and_separate_contradiction() {
        let set = ConstraintSet::new()
            .with(GroupConstraint::together("couple", [0, 1]).unwrap())
            .with(GroupConstraint::separate("rivals", [0, 1, 7]).unwrap());
        let errors = validate(&set, &config());
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConstraintError::Contradiction { participants, .. } if participants == &vec![0, 1]
        ));
    }

    #[test]
    fn single_shared_member_is_not_a_contradiction() {
        let set = ConstraintSet::new()
            .with(GroupConstraint::together("couple", [0, 1]).unwrap())
            .with(GroupConstraint::separate("rivals", [0, 7]).unwrap());
        assert!(validate(&set, &config()).is_empty());
    }

    #[test]
    fn separate_groups_have_no_size_limit() {
        let set = ConstraintSet::new().with(GroupConstraint::separate("many", 0..8).unwrap());
        assert!(validate(&set, &config()).is_empty());
    }

    #[test]
    fn unknown_and_misfiled_groups() {
        let mut set = ConstraintSet::new();
        set.separate.push(GroupConstraint::together("wrong list", [0, 11]).unwrap());
        let errors = validate(&set, &config());
        assert!(errors.contains(&ConstraintError::Misfiled { name: "wrong list".to_string() }));
        assert!(errors.iter().any(|e| matches!(e, ConstraintError::UnknownParticipant { participant: 11, .. })));
    }

    #[test]
    fn swap_splitting_together_group() {
        let set = ConstraintSet::new().with(GroupConstraint::together("couple", [0, 1]).unwrap());
        let state = round(&[&[0, 1, 2], &[3, 4, 5]]);
        assert!(would_violate(&state, &Move::Swap(Seat::new(0, 0), Seat::new(1, 3)), &set));
        assert!(would_violate(&state, &Move::Swap(Seat::new(1, 4), Seat::new(0, 1)), &set));
        assert!(!would_violate(&state, &Move::Swap(Seat::new(0, 2), Seat::new(1, 3)), &set));
    }

    #[test]
    fn swap_joining_separate_group() {
        let set = ConstraintSet::new().with(GroupConstraint::separate("rivals", [0, 5]).unwrap());
        let state = round(&[&[0, 1, 2], &[3, 4, 5]]);
        assert!(would_violate(&state, &Move::Swap(Seat::new(0, 1), Seat::new(1, 5)), &set));
        assert!(would_violate(&state, &Move::Swap(Seat::new(0, 0), Seat::new(1, 3)), &set));
        // 0 and 5 trade places and stay apart.
        assert!(!would_violate(&state, &Move::Swap(Seat::new(0, 0), Seat::new(1, 5)), &set));
        assert!(!would_violate(&state, &Move::Swap(Seat::new(0, 1), Seat::new(1, 3)), &set));
    }

    #[test]
    fn placement_checks() {
        let set = ConstraintSet::new()
            .with(GroupConstraint::separate("rivals", [0, 5]).unwrap())
            .with(GroupConstraint::together("couple", [7, 8]).unwrap());
        let state = round(&[&[0, 1], &[7]]);
        assert!(would_violate(&state, &Move::Add { table: 0, members: &[5] }, &set));
        assert!(!would_violate(&state, &Move::Add { table: 1, members: &[5] }, &set));
        assert!(would_violate(&state, &Move::Add { table: 0, members: &[8] }, &set));
        assert!(!would_violate(&state, &Move::Add { table: 1, members: &[8] }, &set));
        assert!(would_violate(&state, &Move::Add { table: 4, members: &[9] }, &set));
    }

    #[test]
    fn breaches_are_listed_per_round() {
        let set = ConstraintSet::new()
            .with(GroupConstraint::together("couple", [0, 1]).unwrap())
            .with(GroupConstraint::separate("rivals", [2, 3]).unwrap());
        let state = round(&[&[0, 2, 3], &[1, 4, 5]]);
        let breaches = round_breaches(&state, &set);
        assert_eq!(
            breaches,
            vec![
                Breach::Split { round: 0, group: "couple".to_string(), tables: vec![0, 1] },
                Breach::CoSeated { round: 0, table: 0, group: "rivals".to_string(), members: vec![2, 3] },
            ]
        );
    }
}
