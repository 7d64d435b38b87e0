//! Tabular and document renderings of a plan, and reading a document back.

use std::collections::HashMap;
use std::io;

use serde::{Deserialize, Serialize};

use crate::action::Index;
use crate::error::{Error, Result, ShapeError};
use crate::model::config::Config;
use crate::model::entity::{Id, Participant};
use crate::model::group::{Plan, Round, Table};

/// One seat in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatingRow {
    pub session_id: Index,
    pub table_id: Index,
    pub participant_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
}

/// Display names by id. Ids missing from the roster get a generic label.
struct Names<'a> {
    by_id: HashMap<Id, &'a Participant>,
}

impl<'a> Names<'a> {
    fn new(roster: &'a [Participant]) -> Names<'a> {
        Names { by_id: roster.iter().map(|participant| (participant.id, participant)).collect() }
    }

    fn of(&self, id: Id) -> String {
        match self.by_id.get(&id) {
            Some(participant) => participant.display_name(),
            None => format!("Participant #{id}"),
        }
    }
}

/// Rows ordered by round, then table, then participant id. Names are filled
/// in only when a non-empty roster is given.
pub fn rows(plan: &Plan, roster: Option<&[Participant]>) -> Vec<SeatingRow> {
    let names = roster.filter(|roster| !roster.is_empty()).map(Names::new);
    plan.rounds
        .iter()
        .flat_map(|round| {
            round.tables.iter().enumerate().flat_map(move |(table_id, table)| {
                table.iter().map(move |participant_id| (round.index, table_id, participant_id))
            })
        })
        .map(|(session_id, table_id, participant_id)| SeatingRow {
            session_id,
            table_id,
            participant_id,
            participant_name: names.as_ref().map(|names| names.of(participant_id)),
        })
        .collect()
}

/// CSV layout switches. The default writes plain UTF-8 without a byte order
/// mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CsvOptions {
    /// Start the output with U+FEFF so spreadsheet tools detect UTF-8.
    pub byte_order_mark: bool,
}

impl CsvOptions {
    pub fn spreadsheet() -> CsvOptions {
        CsvOptions { byte_order_mark: true }
    }
}

pub fn to_csv(plan: &Plan, roster: Option<&[Participant]>, options: CsvOptions) -> String {
    let rows = rows(plan, roster);
    let named = rows.first().is_some_and(|row| row.participant_name.is_some());
    let mut csv = String::new();
    if options.byte_order_mark {
        csv.push('\u{feff}');
    }
    csv.push_str(if named {
        "session_id,table_id,participant_id,participant_name\n"
    } else {
        "session_id,table_id,participant_id\n"
    });
    for row in &rows {
        let line = match &row.participant_name {
            Some(name) => {
                format!("{},{},{},{}\n", row.session_id, row.table_id, row.participant_id, csv_field(name))
            }
            None => format!("{},{},{}\n", row.session_id, row.table_id, row.participant_id),
        };
        csv.push_str(&line);
    }
    tracing::debug!(rows = rows.len(), named, bom = options.byte_order_mark, "csv rendered");
    csv
}

pub fn write_csv<W: io::Write>(
    plan: &Plan,
    roster: Option<&[Participant]>,
    options: CsvOptions,
    mut out: W,
) -> io::Result<()> {
    out.write_all(to_csv(plan, roster, options).as_bytes())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Seat in a document: a bare id, or an id with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeatEntry {
    Id(Id),
    Named { id: Id, name: String },
}

impl SeatEntry {
    pub fn id(&self) -> Id {
        match self {
            SeatEntry::Id(id) | SeatEntry::Named { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub table_id: Index,
    pub participants: Vec<SeatEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub session_id: Index,
    pub tables: Vec<TableEntry>,
}

/// Event dimensions under their short names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(rename = "N")]
    pub participants: usize,
    #[serde(rename = "X")]
    pub tables: usize,
    #[serde(rename = "x")]
    pub capacity: usize,
    #[serde(rename = "S")]
    pub rounds: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub config: Dimensions,
    pub total_participants: usize,
    pub total_sessions: usize,
}

impl From<&Config> for Metadata {
    fn from(config: &Config) -> Metadata {
        Metadata {
            config: Dimensions {
                participants: config.participants,
                tables: config.tables,
                capacity: config.capacity,
                rounds: config.rounds,
            },
            total_participants: config.participants,
            total_sessions: config.rounds,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub sessions: Vec<SessionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl PlanDocument {
    pub fn from_plan(plan: &Plan, roster: Option<&[Participant]>, include_metadata: bool) -> PlanDocument {
        let names = roster.filter(|roster| !roster.is_empty()).map(Names::new);
        let seat = |id: Id| match &names {
            Some(names) => SeatEntry::Named { id, name: names.of(id) },
            None => SeatEntry::Id(id),
        };
        let sessions = plan
            .rounds
            .iter()
            .map(|round| SessionEntry {
                session_id: round.index,
                tables: round
                    .tables
                    .iter()
                    .enumerate()
                    .map(|(table_id, table)| TableEntry { table_id, participants: table.iter().map(&seat).collect() })
                    .collect(),
            })
            .collect();
        PlanDocument { sessions, metadata: include_metadata.then(|| Metadata::from(&plan.config)) }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(source: &str) -> Result<PlanDocument> {
        Ok(serde_json::from_str(source)?)
    }

    /// Rebuilds the plan. The metadata block supplies the dimensions, and the
    /// result must seat every participant exactly once per round.
    pub fn into_plan(self) -> Result<Plan> {
        let dimensions = self.metadata.ok_or(Error::MissingMetadata)?.config;
        let config = Config::new(dimensions.participants, dimensions.tables, dimensions.capacity, dimensions.rounds)?;

        let mut sessions = self.sessions;
        sessions.sort_by_key(|session| session.session_id);
        let rounds = sessions
            .into_iter()
            .map(|session| round_from_entry(session, &config))
            .collect::<Result<Vec<Round>>>()?;

        let plan = Plan::new(config, rounds);
        plan.check_partition()?;
        tracing::debug!(rounds = plan.rounds.len(), "plan document loaded");
        Ok(plan)
    }
}

fn round_from_entry(session: SessionEntry, config: &Config) -> Result<Round> {
    let round = session.session_id;
    if session.tables.len() != config.tables {
        return Err(ShapeError::TableCount { round, expected: config.tables, found: session.tables.len() }.into());
    }
    let mut tables: Vec<Option<Table>> = vec![None; config.tables];
    for entry in session.tables {
        let table = entry.table_id;
        let slot = tables
            .get_mut(table)
            .filter(|slot| slot.is_none())
            .ok_or(ShapeError::TableId { round, table })?;
        *slot = Some(entry.participants.iter().map(SeatEntry::id).collect());
    }
    Ok(Round::new(round, tables.into_iter().flatten().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        let config = Config::new(4, 2, 2, 2).unwrap();
        let rounds = vec![
            Round::new(0, vec![Table::from_iter([1, 0]), Table::from_iter([2, 3])]),
            Round::new(1, vec![Table::from_iter([0, 2]), Table::from_iter([1, 3])]),
        ];
        Plan::new(config, rounds)
    }

    fn roster() -> Vec<Participant> {
        vec![
            Participant::new(0, "Dupont").with_first_name("Jean"),
            Participant::new(1, "Martin"),
            Participant::new(2, "O'Brien, Jr.").vip(),
        ]
    }

    #[test]
    fn rows_follow_round_table_id_order() {
        let rows = rows(&plan(), None);
        assert_eq!(rows.len(), 8);
        let ids: Vec<(Index, Index, Id)> = rows.iter().map(|r| (r.session_id, r.table_id, r.participant_id)).collect();
        assert_eq!(ids[..4], [(0, 0, 0), (0, 0, 1), (0, 1, 2), (0, 1, 3)]);
        assert!(rows.iter().all(|row| row.participant_name.is_none()));
    }

    #[test]
    fn csv_without_names() {
        let csv = to_csv(&plan(), None, CsvOptions::default());
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("session_id,table_id,participant_id"));
        assert_eq!(lines.next(), Some("0,0,0"));
        assert_eq!(csv.lines().count(), 9);
    }

    #[test]
    fn csv_with_names_quotes_when_needed() {
        let roster = roster();
        let csv = to_csv(&plan(), Some(&roster), CsvOptions::default());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "session_id,table_id,participant_id,participant_name");
        assert_eq!(lines[1], "0,0,0,Jean Dupont");
        assert_eq!(lines[2], "0,0,1,Martin");
        assert_eq!(lines[3], "0,1,2,\"O'Brien, Jr.\"");
        assert_eq!(lines[4], "0,1,3,Participant #3");
    }

    #[test]
    fn byte_order_mark_is_opt_in() {
        let plain = to_csv(&plan(), None, CsvOptions::default());
        assert!(plain.starts_with("session_id"));

        let marked = to_csv(&plan(), None, CsvOptions::spreadsheet());
        assert_eq!(marked.as_bytes()[..3], [0xEF_u8, 0xBB, 0xBF]);
        assert_eq!(marked.strip_prefix('\u{feff}'), Some(plain.as_str()));
    }

    #[test]
    fn written_bytes_match_rendered_text() {
        let roster = roster();
        let mut out = Vec::new();
        write_csv(&plan(), Some(&roster), CsvOptions::spreadsheet(), &mut out).unwrap();
        assert_eq!(out, to_csv(&plan(), Some(&roster), CsvOptions::spreadsheet()).into_bytes());
    }

    #[test]
    fn json_document_shape() {
        let document = PlanDocument::from_plan(&plan(), None, true);
        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert_eq!(value["sessions"][1]["tables"][0]["participants"], serde_json::json!([0, 2]));
        assert_eq!(value["metadata"]["config"], serde_json::json!({"N": 4, "X": 2, "x": 2, "S": 2}));
        assert_eq!(value["metadata"]["total_sessions"], 2);

        let bare = PlanDocument::from_plan(&plan(), None, false);
        assert!(!bare.to_json().unwrap().contains("metadata"));
    }

    #[test]
    fn json_names_are_objects() {
        let roster = roster();
        let document = PlanDocument::from_plan(&plan(), Some(&roster), false);
        assert_eq!(
            document.sessions[0].tables[0].participants,
            vec![
                SeatEntry::Named { id: 0, name: "Jean Dupont".into() },
                SeatEntry::Named { id: 1, name: "Martin".into() },
            ]
        );
    }

    #[test]
    fn document_reads_back_into_plan() {
        let roster = roster();
        let json = PlanDocument::from_plan(&plan(), Some(&roster), true).to_json().unwrap();
        let restored = PlanDocument::from_json(&json).unwrap().into_plan().unwrap();
        assert_eq!(restored, plan());
    }

    #[test]
    fn reading_back_needs_metadata_and_a_valid_partition() {
        let bare = PlanDocument::from_plan(&plan(), None, false);
        assert!(matches!(bare.into_plan(), Err(Error::MissingMetadata)));

        let mut broken = PlanDocument::from_plan(&plan(), None, true);
        broken.sessions[1].tables[1].participants = vec![SeatEntry::Id(1), SeatEntry::Id(0)];
        assert!(matches!(broken.into_plan(), Err(Error::Shape(ShapeError::Duplicate { round: 1, participant: 0 }))));

        let mut misnumbered = PlanDocument::from_plan(&plan(), None, true);
        misnumbered.sessions[0].tables[1].table_id = 0;
        assert!(matches!(misnumbered.into_plan(), Err(Error::Shape(ShapeError::TableId { round: 0, table: 0 }))));

        assert!(matches!(PlanDocument::from_json("{\"sessions\": 3}"), Err(Error::Document(_))));
    }
}
