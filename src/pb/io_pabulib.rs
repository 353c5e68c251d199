// Reading instances in the PaBuLib format.

use std::collections::{HashMap, HashSet};
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use equal_shares::builder::Builder;

use crate::pb::*;

const SECTIONS: [&str; 5] = ["meta", "projects", "votes", "groups", "group_votes"];
const REQUIRED_SECTIONS: [&str; 3] = ["meta", "projects", "votes"];

/// Reads a PaBuLib file. Also returns whether the file declares groups.
pub fn read_pabulib(path: &str) -> PbResult<(Instance, bool)> {
    let rdr = reader_builder().from_path(path).context(CsvOpenSnafu { path })?;
    read_records(rdr)
}

pub fn read_pabulib_str(text: &str) -> PbResult<(Instance, bool)> {
    read_records(reader_builder().from_reader(text.as_bytes()))
}

fn reader_builder() -> ReaderBuilder {
    let mut b = ReaderBuilder::new();
    b.delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All);
    b
}

struct Header {
    section: String,
    columns: HashMap<String, usize>,
}

impl Header {
    fn index(&self, column: &str, lineno: u64) -> PbResult<usize> {
        self.columns
            .get(column)
            .cloned()
            .context(MissingColumnSnafu {
                lineno,
                section: self.section.clone(),
                column,
            })
    }

    fn has(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> &'a str {
    record.get(idx).unwrap_or("")
}

fn id_field(record: &StringRecord, idx: usize, column: &str, lineno: u64) -> PbResult<String> {
    let s = field(record, idx);
    ensure!(!s.is_empty(), EmptyIdSnafu { lineno, column });
    Ok(s.to_string())
}

fn number_field(record: &StringRecord, idx: usize, column: &str, lineno: u64) -> PbResult<f64> {
    let s = field(record, idx);
    s.parse::<f64>().ok().context(NotNumericSnafu {
        lineno,
        column,
        value: s,
    })
}

fn read_records<R: Read>(rdr: csv::Reader<R>) -> PbResult<(Instance, bool)> {
    let mut meta: HashMap<String, String> = HashMap::new();
    let mut builder = Builder::new(0.0);
    let mut encountered: HashSet<String> = HashSet::new();
    let mut section: Option<String> = None;
    let mut header: Option<Header> = None;
    let mut lineno: u64 = 0;

    for record_r in rdr.into_records() {
        let record = match record_r {
            Ok(r) => r,
            Err(e) => {
                let at = e.position().map(|p| p.line()).unwrap_or(lineno + 1);
                return Err(e).context(CsvLineParseSnafu { lineno: at });
            }
        };
        lineno = record.position().map(|p| p.line()).unwrap_or(lineno + 1);
        if record.iter().all(|s| s.is_empty()) {
            continue;
        }

        let first = field(&record, 0).to_lowercase();
        if SECTIONS.contains(&first.as_str()) {
            debug!("read_records: line {}: section {}", lineno, first);
            encountered.insert(first.clone());
            section = Some(first);
            header = None;
            continue;
        }

        let current = section.clone().context(OutsideSectionSnafu { lineno })?;
        let h = match header.as_ref() {
            None => {
                let h = Header {
                    section: current.clone(),
                    columns: record
                        .iter()
                        .enumerate()
                        .map(|(idx, c)| (c.to_string(), idx))
                        .collect(),
                };
                check_header(&h, lineno)?;
                header = Some(h);
                continue;
            }
            Some(h) => h,
        };

        match current.as_str() {
            "meta" => {
                let k = field(&record, 0);
                let v = field(&record, 1);
                ensure!(!k.is_empty() && !v.is_empty(), InvalidMetaSnafu { lineno });
                meta.insert(k.to_string(), v.to_string());
            }
            "projects" => {
                let id = id_field(&record, h.index("project_id", lineno)?, "project_id", lineno)?;
                let cost = number_field(&record, h.index("cost", lineno)?, "cost", lineno)?;
                let name = if h.has("name") {
                    Some(field(&record, h.index("name", lineno)?).to_string()).filter(|s| !s.is_empty())
                } else {
                    None
                };
                builder
                    .add_project(&Project { id, cost, name })
                    .context(InvalidLineSnafu { lineno })?;
            }
            "votes" => {
                let voter = id_field(&record, h.index("voter_id", lineno)?, "voter_id", lineno)?;
                if h.has("project_id") {
                    let project =
                        id_field(&record, h.index("project_id", lineno)?, "project_id", lineno)?;
                    let score = number_field(&record, h.index("score", lineno)?, "score", lineno)?;
                    builder
                        .add_vote(&voter, &project, score)
                        .context(InvalidLineSnafu { lineno })?;
                } else {
                    let approved = field(&record, h.index("vote", lineno)?);
                    for project in approved.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
                        builder
                            .add_vote(&voter, project, 1.0)
                            .context(InvalidLineSnafu { lineno })?;
                    }
                }
            }
            "groups" => {
                let id = id_field(&record, h.index("group_id", lineno)?, "group_id", lineno)?;
                let weight = number_field(&record, h.index("weight", lineno)?, "weight", lineno)?;
                builder.group(&id, weight).context(InvalidLineSnafu { lineno })?;
            }
            "group_votes" => {
                let group = id_field(&record, h.index("group_id", lineno)?, "group_id", lineno)?;
                let project =
                    id_field(&record, h.index("project_id", lineno)?, "project_id", lineno)?;
                let score = number_field(&record, h.index("score", lineno)?, "score", lineno)?;
                builder
                    .add_group_vote(&group, &project, score)
                    .context(InvalidLineSnafu { lineno })?;
            }
            x => whatever!("Line {}: unexpected section {}", lineno, x),
        }
    }

    for s in REQUIRED_SECTIONS {
        ensure!(encountered.contains(s), MissingSectionSnafu { section: s });
    }
    let budget_str = meta.get("budget").cloned();
    let budget = match budget_str.as_deref().map(|s| s.parse::<f64>()) {
        Some(Ok(b)) if b.is_finite() => b,
        _ => return InvalidBudgetSnafu { value: budget_str }.fail(),
    };
    match meta.get("vote_type").map(|s| s.as_str()) {
        Some("approval") => {}
        Some(x) => warn!("vote_type {:?}: the scores are read as approvals", x),
        None => warn!("vote_type is missing from the meta section, assuming approval"),
    }

    let has_groups = builder.has_groups();
    let mut instance = builder.build();
    instance.budget = budget;
    instance.description = meta.get("description").cloned();
    Ok((instance, has_groups))
}

fn check_header(h: &Header, lineno: u64) -> PbResult<()> {
    let required: &[&str] = match h.section.as_str() {
        "projects" => &["project_id", "cost"],
        "votes" if h.has("project_id") => &["voter_id", "score"],
        "votes" => &["voter_id", "vote"],
        "groups" => &["group_id", "weight"],
        "group_votes" => &["group_id", "project_id", "score"],
        _ => &[],
    };
    for c in required {
        h.index(c, lineno)?;
    }
    Ok(())
}
