pub mod config {
    use serde::{Deserialize, Serialize};

    use crate::error::ConfigError;

    /// Event dimensions: N participants seated at X tables of capacity x, over S rounds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Config {
        #[serde(alias = "N")]
        pub participants: usize,
        #[serde(alias = "X")]
        pub tables: usize,
        #[serde(alias = "x")]
        pub capacity: usize,
        #[serde(alias = "S")]
        pub rounds: usize,
    }

    impl Config {
        pub fn new(participants: usize, tables: usize, capacity: usize, rounds: usize) -> Result<Config, ConfigError> {
            let config = Config { participants, tables, capacity, rounds };
            config.validate()?;
            Ok(config)
        }

        pub fn total_capacity(&self) -> usize {
            self.tables * self.capacity
        }

        pub fn validate(&self) -> Result<(), ConfigError> {
            if self.participants < 2 {
                return Err(ConfigError::TooFewParticipants(self.participants));
            }
            if self.tables < 1 {
                return Err(ConfigError::TooFewTables(self.tables));
            }
            if self.capacity < 2 {
                return Err(ConfigError::CapacityTooSmall(self.capacity));
            }
            if self.rounds < 1 {
                return Err(ConfigError::TooFewRounds(self.rounds));
            }
            if self.total_capacity() < self.participants {
                return Err(ConfigError::InsufficientCapacity {
                    tables: self.tables,
                    capacity: self.capacity,
                    participants: self.participants,
                });
            }
            tracing::debug!(
                participants = self.participants,
                tables = self.tables,
                capacity = self.capacity,
                rounds = self.rounds,
                "configuration accepted"
            );
            Ok(())
        }
    }
}

pub mod entity {
    use serde::{Deserialize, Serialize};

    pub type Id = usize;

    /// Roster entry. The engine only reads `id` and `is_vip`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Participant {
        pub id: Id,
        pub last_name: String,
        #[serde(default)]
        pub first_name: Option<String>,
        #[serde(default)]
        pub email: Option<String>,
        #[serde(default)]
        pub group: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
        #[serde(default)]
        pub is_vip: bool,
    }

    impl Participant {
        pub fn new(id: Id, last_name: impl Into<String>) -> Participant {
            Participant {
                id,
                last_name: last_name.into(),
                first_name: None,
                email: None,
                group: None,
                tags: Vec::new(),
                is_vip: false,
            }
        }

        pub fn with_first_name(mut self, first_name: impl Into<String>) -> Participant {
            self.first_name = Some(first_name.into());
            self
        }

        pub fn vip(mut self) -> Participant {
            self.is_vip = true;
            self
        }

        pub fn display_name(&self) -> String {
            match &self.first_name {
                Some(first) if !first.is_empty() => format!("{} {}", first, self.last_name),
                _ => self.last_name.clone(),
            }
        }
    }
}

pub mod group {
    use std::collections::BTreeSet;

    use itertools::Itertools;
    use serde::{Deserialize, Serialize};

    use super::config::Config;
    use super::entity::Id;
    use crate::action::Index;
    use crate::error::ShapeError;

    /// Participants seated together for one round. Ordered so every walk over a
    /// table is reproducible.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Table {
        pub members: BTreeSet<Id>,
    }

    impl Table {
        pub fn new() -> Table {
            Table::default()
        }

        pub fn len(&self) -> usize {
            self.members.len()
        }

        pub fn is_empty(&self) -> bool {
            self.members.is_empty()
        }

        pub fn contains(&self, id: Id) -> bool {
            self.members.contains(&id)
        }

        pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
            self.members.iter().copied()
        }

        /// Unordered pairs seated at this table, each as `(smaller, larger)`.
        pub fn pairs(&self) -> impl Iterator<Item = (Id, Id)> + '_ {
            self.members.iter().copied().tuple_combinations()
        }
    }

    impl FromIterator<Id> for Table {
        fn from_iter<I: IntoIterator<Item = Id>>(iter: I) -> Table {
            Table { members: iter.into_iter().collect() }
        }
    }

    impl Extend<Id> for Table {
        fn extend<I: IntoIterator<Item = Id>>(&mut self, iter: I) {
            self.members.extend(iter)
        }
    }

    /// One full re-seating of every participant.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Round {
        pub index: Index,
        pub tables: Vec<Table>,
    }

    impl Round {
        pub fn new(index: Index, tables: Vec<Table>) -> Round {
            Round { index, tables }
        }

        pub fn table_of(&self, id: Id) -> Option<Index> {
            self.tables.iter().position(|table| table.contains(id))
        }

        pub fn seated(&self) -> usize {
            self.tables.iter().map(Table::len).sum()
        }

        pub fn is_balanced(&self) -> bool {
            match self.tables.iter().map(Table::len).minmax().into_option() {
                Some((smallest, largest)) => largest - smallest <= 1,
                None => true,
            }
        }

        /// Exchanges two seated participants. Callers check seating first.
        pub(crate) fn swap(&mut self, table_a: Index, participant_a: Id, table_b: Index, participant_b: Id) {
            let left = &mut self.tables[table_a].members;
            left.remove(&participant_a);
            left.insert(participant_b);
            let right = &mut self.tables[table_b].members;
            right.remove(&participant_b);
            right.insert(participant_a);
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum WarningKind {
        /// Every table held a member of the unit's Separate group.
        SeparateForced,
        /// No table had room left for the unit.
        CapacityExceeded,
    }

    /// Non-fatal record of a baseline placement that had to break a rule.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PlacementWarning {
        pub round: Index,
        pub table: Index,
        pub members: Vec<Id>,
        pub kind: WarningKind,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Plan {
        pub config: Config,
        pub rounds: Vec<Round>,
        #[serde(default)]
        pub warnings: Vec<PlacementWarning>,
    }

    impl Plan {
        pub fn new(config: Config, rounds: Vec<Round>) -> Plan {
            Plan { config, rounds, warnings: Vec::new() }
        }

        pub fn round(&self, index: Index) -> Option<&Round> {
            self.rounds.get(index)
        }

        pub fn is_balanced(&self) -> bool {
            self.rounds.iter().all(Round::is_balanced)
        }

        /// Checks that every round seats each of `0..N` exactly once, on the
        /// configured number of tables, without overfilling any table.
        pub fn check_partition(&self) -> Result<(), ShapeError> {
            let config = &self.config;
            if self.rounds.len() != config.rounds {
                return Err(ShapeError::RoundCount { expected: config.rounds, found: self.rounds.len() });
            }
            for (position, round) in self.rounds.iter().enumerate() {
                if round.index != position {
                    return Err(ShapeError::RoundIndex { position, found: round.index });
                }
                if round.tables.len() != config.tables {
                    return Err(ShapeError::TableCount {
                        round: position,
                        expected: config.tables,
                        found: round.tables.len(),
                    });
                }
                let mut seen = vec![false; config.participants];
                for (table_index, table) in round.tables.iter().enumerate() {
                    if table.len() > config.capacity {
                        return Err(ShapeError::OverCapacity {
                            round: position,
                            table: table_index,
                            size: table.len(),
                            capacity: config.capacity,
                        });
                    }
                    for id in table.iter() {
                        match seen.get_mut(id) {
                            None => return Err(ShapeError::UnknownParticipant { round: position, participant: id }),
                            Some(true) => return Err(ShapeError::Duplicate { round: position, participant: id }),
                            Some(slot) => *slot = true,
                        }
                    }
                }
                if let Some(missing) = seen.iter().position(|seated| !seated) {
                    return Err(ShapeError::Missing { round: position, participant: missing });
                }
            }
            Ok(())
        }
    }
}

pub mod condition {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Serialize};

    use super::entity::Id;
    use crate::error::ConstraintError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum GroupKind {
        /// Members always share a table.
        Together,
        /// No two members ever share a table.
        Separate,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct GroupConstraint {
        pub name: String,
        pub kind: GroupKind,
        pub members: BTreeSet<Id>,
    }

    impl GroupConstraint {
        pub fn new(
            name: impl Into<String>,
            kind: GroupKind,
            members: impl IntoIterator<Item = Id>,
        ) -> Result<GroupConstraint, ConstraintError> {
            let group = GroupConstraint { name: name.into(), kind, members: members.into_iter().collect() };
            if group.members.len() < 2 {
                return Err(ConstraintError::GroupTooSmall { name: group.name, size: group.members.len() });
            }
            Ok(group)
        }

        pub fn together(
            name: impl Into<String>,
            members: impl IntoIterator<Item = Id>,
        ) -> Result<GroupConstraint, ConstraintError> {
            GroupConstraint::new(name, GroupKind::Together, members)
        }

        pub fn separate(
            name: impl Into<String>,
            members: impl IntoIterator<Item = Id>,
        ) -> Result<GroupConstraint, ConstraintError> {
            GroupConstraint::new(name, GroupKind::Separate, members)
        }

        pub fn contains(&self, id: Id) -> bool {
            self.members.contains(&id)
        }
    }

    /// Hard grouping rules. Serialized as a flat list of tagged groups.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(from = "Vec<GroupConstraint>", into = "Vec<GroupConstraint>")]
    pub struct ConstraintSet {
        pub together: Vec<GroupConstraint>,
        pub separate: Vec<GroupConstraint>,
    }

    impl ConstraintSet {
        pub fn new() -> ConstraintSet {
            ConstraintSet::default()
        }

        pub fn push(&mut self, group: GroupConstraint) {
            match group.kind {
                GroupKind::Together => self.together.push(group),
                GroupKind::Separate => self.separate.push(group),
            }
        }

        pub fn with(mut self, group: GroupConstraint) -> ConstraintSet {
            self.push(group);
            self
        }

        pub fn is_empty(&self) -> bool {
            self.together.is_empty() && self.separate.is_empty()
        }

        pub fn groups(&self) -> impl Iterator<Item = &GroupConstraint> {
            self.together.iter().chain(self.separate.iter())
        }

        pub fn together_group_of(&self, id: Id) -> Option<&GroupConstraint> {
            self.together.iter().find(|group| group.contains(id))
        }

        pub fn is_separated(&self, id: Id) -> bool {
            self.separate.iter().any(|group| group.contains(id))
        }
    }

    impl From<Vec<GroupConstraint>> for ConstraintSet {
        fn from(groups: Vec<GroupConstraint>) -> ConstraintSet {
            groups.into_iter().fold(ConstraintSet::new(), ConstraintSet::with)
        }
    }

    impl From<ConstraintSet> for Vec<GroupConstraint> {
        fn from(set: ConstraintSet) -> Vec<GroupConstraint> {
            set.together.into_iter().chain(set.separate).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::condition::{ConstraintSet, GroupConstraint, GroupKind};
    use super::config::Config;
    use super::entity::Participant;
    use super::group::{Plan, Round, Table};
    use crate::error::{ConfigError, ConstraintError, ShapeError};

    #[test]
    fn config_bounds() {
        assert!(Config::new(30, 5, 6, 6).is_ok());
        assert_eq!(Config::new(1, 5, 6, 6), Err(ConfigError::TooFewParticipants(1)));
        assert_eq!(Config::new(4, 0, 6, 6), Err(ConfigError::TooFewTables(0)));
        assert_eq!(Config::new(4, 2, 1, 6), Err(ConfigError::CapacityTooSmall(1)));
        assert_eq!(Config::new(4, 2, 2, 0), Err(ConfigError::TooFewRounds(0)));
        assert_eq!(
            Config::new(50, 5, 8, 3),
            Err(ConfigError::InsufficientCapacity { tables: 5, capacity: 8, participants: 50 })
        );
    }

    #[test]
    fn config_accepts_short_field_names() {
        let config: Config = serde_json::from_str(r#"{"N": 12, "X": 3, "x": 4, "S": 2}"#).unwrap();
        assert_eq!(config, Config { participants: 12, tables: 3, capacity: 4, rounds: 2 });
    }

    #[test]
    fn participant_display_name() {
        assert_eq!(Participant::new(0, "Dupont").with_first_name("Jean").display_name(), "Jean Dupont");
        assert_eq!(Participant::new(1, "Martin").display_name(), "Martin");
    }

    #[test]
    fn group_needs_two_members() {
        assert_eq!(
            GroupConstraint::together("solo", [3]),
            Err(ConstraintError::GroupTooSmall { name: "solo".to_string(), size: 1 })
        );
    }

    #[test]
    fn constraint_set_round_trips_as_flat_list() {
        let set = ConstraintSet::new()
            .with(GroupConstraint::together("couple", [0, 1]).unwrap())
            .with(GroupConstraint::separate("rivals", [5, 12]).unwrap());
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with('['));
        let back: ConstraintSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.separate[0].kind, GroupKind::Separate);
    }

    #[test]
    fn partition_check_reports_missing_and_duplicates() {
        let config = Config::new(4, 2, 2, 1).unwrap();
        let good =
            Plan::new(config, vec![Round::new(0, vec![[0, 1].into_iter().collect(), [2, 3].into_iter().collect()])]);
        assert_eq!(good.check_partition(), Ok(()));
        assert!(good.is_balanced());

        let missing = Plan::new(config, vec![Round::new(0, vec![[0, 1].into_iter().collect(), Table::from_iter([2])])]);
        assert_eq!(missing.check_partition(), Err(ShapeError::Missing { round: 0, participant: 3 }));

        let duplicate =
            Plan::new(config, vec![Round::new(0, vec![[0, 1].into_iter().collect(), [1, 3].into_iter().collect()])]);
        assert_eq!(duplicate.check_partition(), Err(ShapeError::Duplicate { round: 0, participant: 1 }));
    }
}
