use log::{debug, info, warn};

use equal_shares::session::Session;
use equal_shares::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::pb::config_reader::*;
use crate::pb::io_pabulib::read_pabulib;

pub mod config_reader;
pub mod io_pabulib;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PbError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening the input {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Line {lineno}: cannot read the line"))]
    CsvLineParse { source: csv::Error, lineno: u64 },

    #[snafu(display("Line {lineno}: line found outside any recognized section."))]
    OutsideSection { lineno: u64 },
    #[snafu(display("Line {lineno}: Invalid meta line - needs \"key;value\"."))]
    InvalidMeta { lineno: u64 },
    #[snafu(display("Line {lineno}: missing column '{column}' in section {section}"))]
    MissingColumn {
        lineno: u64,
        section: String,
        column: String,
    },
    #[snafu(display("Line {lineno}: '{column}' is not numeric: '{value}'"))]
    NotNumeric {
        lineno: u64,
        column: String,
        value: String,
    },
    #[snafu(display("Line {lineno}: empty '{column}'"))]
    EmptyId { lineno: u64, column: String },
    #[snafu(display("Line {lineno}: {source}"))]
    InvalidLine {
        source: AllocationErrors,
        lineno: u64,
    },
    #[snafu(display("Missing required '{section}' section in file."))]
    MissingSection { section: String },
    #[snafu(display("The 'budget' in meta section is not numeric: {value:?}"))]
    InvalidBudget { value: Option<String> },

    #[snafu(display("Invalid parameter {key}={value}"))]
    InvalidOverride { key: String, value: String },
    #[snafu(display("Invalid parameters: {source}"))]
    InvalidParams { source: AllocationErrors },
    #[snafu(display("Allocation error: {source}"))]
    Allocation { source: AllocationErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PbResult<T> = Result<T, PbError>;

fn stats_to_json(stats: &OutcomeStatistics) -> JSValue {
    let mut distribution: JSMap<String, JSValue> = JSMap::new();
    for (utility, count) in stats.utility_distribution.iter().enumerate() {
        distribution.insert(utility.to_string(), json!(count));
    }
    json!({
        "totalCost": stats.total_cost,
        "avgApprovedProjects": stats.avg_approved_projects,
        "avgCostOfWinningApprovedProjects": stats.avg_cost_of_winning_approved_projects,
        "utilityDistribution": distribution,
    })
}

fn amounts_to_json(amounts: &[(String, f64)]) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (name, x) in amounts.iter() {
        m.insert(name.clone(), json!(x));
    }
    JSValue::Object(m)
}

fn nested_amounts_to_json(amounts: &[(String, Vec<(String, f64)>)]) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (name, xs) in amounts.iter() {
        m.insert(name.clone(), amounts_to_json(xs));
    }
    JSValue::Object(m)
}

fn traces_to_json(traces: &[(String, Vec<f64>)]) -> JSValue {
    let mut m: JSMap<String, JSValue> = JSMap::new();
    for (name, xs) in traces.iter() {
        m.insert(name.clone(), json!(xs));
    }
    JSValue::Object(m)
}

fn notes_to_json(notes: &Notes) -> JSValue {
    match notes {
        Notes::Weighted(r) => {
            let s = &r.spend_summary;
            json!({
                "leftoverGroup": amounts_to_json(&r.leftover_group),
                "leftoverInd": amounts_to_json(&r.leftover_individual),
                "initialGroup": amounts_to_json(&r.initial_group),
                "initialInd": amounts_to_json(&r.initial_individual),
                "spentByGroupOnProject": nested_amounts_to_json(&r.spent_by_group_on_project),
                "spentByIndividualOnProject": nested_amounts_to_json(&r.spent_by_individual_on_project),
                "spentByAllIndividualsOnProject": amounts_to_json(&r.spent_by_all_individuals_on_project),
                "allIndividualsScore": amounts_to_json(&r.all_individuals_score),
                "totalSpentPerProject": amounts_to_json(&r.total_spent_per_project),
                "stats": stats_to_json(&r.stats),
                "spendSummary": {
                    "groupInitial": s.group_initial,
                    "groupSpent": s.group_spent,
                    "groupLeftover": s.group_leftover,
                    "individualInitial": s.individual_initial,
                    "individualSpent": s.individual_spent,
                    "individualLeftover": s.individual_leftover,
                },
            })
        }
        Notes::Standard(r) => {
            let mut js = json!({
                "endowment": r.endowment,
                "moneyBehindCandidate": traces_to_json(&r.money_behind_candidate),
                "effectiveVoteCount": traces_to_json(&r.effective_vote_count),
                "addedByUtilitarianCompletion": r.added_by_utilitarian_completion,
                "stats": stats_to_json(&r.stats),
                "greedyStats": stats_to_json(&r.greedy_stats),
            });
            if let Some(c) = &r.comparison {
                js["comparison"] = json!(c);
            }
            js
        }
    }
}

pub fn result_to_json(result: &AllocationResult) -> JSValue {
    json!({
        "type": "result",
        "winners": result.winners,
        "notes": notes_to_json(&result.notes),
    })
}

pub fn read_reference(path: &str) -> PbResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Checks the computed result against a reference, printing the differences.
pub fn check_reference(result_js: &JSValue, reference_path: &str) -> PbResult<()> {
    let reference = read_reference(reference_path)?;
    let pretty_reference = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    let pretty_result = serde_json::to_string_pretty(result_js).context(ParsingJsonSnafu {})?;
    if pretty_reference != pretty_result {
        warn!("Found differences with the reference string");
        print_diff(pretty_reference.as_str(), pretty_result.as_str(), "\n");
        whatever!("Difference detected between computed result and reference result")
    }
    Ok(())
}

fn write_output(out: &Option<String>, pretty: &str) -> PbResult<()> {
    match out.as_deref() {
        None | Some("") | Some("stdout") => {
            println!("{}", pretty);
        }
        Some(path) => {
            info!("Writing result to {:?}", path);
            fs::write(path, pretty).context(WritingFileSnafu { path })?;
        }
    }
    Ok(())
}

/// Reads the instance and the parameters, runs the allocation and reports it.
pub fn run_allocation(args: &Args) -> PbResult<()> {
    let (instance, has_groups) = read_pabulib(&args.input)?;
    info!(
        "Read {:?}: {} projects, {} voters, {} groups",
        args.input,
        instance.projects.len(),
        instance.voters.len(),
        instance.groups.len()
    );

    let mut raw_params = match &args.config {
        Some(path) => read_params(path)?,
        None => PbParams::default(),
    };
    for (key, value) in args.overrides() {
        raw_params.set(&key, &value)?;
    }
    let params = validate_params(&raw_params, has_groups)?;
    debug!("run_allocation: params: {:?}", params);

    let mut session = Session::new();
    session.submit(instance, params);
    let mut log_progress = |text: &str| info!("progress: {}", text);
    let (result, elapsed) = session
        .wait(&mut log_progress)
        .context(AllocationSnafu {})?;
    info!(
        "Computed {} winners in {:.1}s",
        result.winners.len(),
        elapsed.as_secs_f64()
    );

    let result_js = result_to_json(&result);
    let pretty = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_output(&args.out, &pretty)?;

    if let Some(reference_path) = &args.reference {
        check_reference(&result_js, reference_path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use equal_shares::builder::Builder;

    fn standard_result() -> AllocationResult {
        let mut b = Builder::new(30.0);
        b.project("a", 10.0).unwrap();
        b.project("b", 25.0).unwrap();
        b.approve("v1", &["a"]).unwrap();
        b.approve("v2", &["a", "b"]).unwrap();
        let p = AllocationParams {
            completion: Completion::None,
            ..AllocationParams::default()
        };
        run_equal_shares(&b.build(), &p, &mut NoProgress).unwrap()
    }

    #[test]
    fn standard_json() {
        let js = result_to_json(&standard_result());
        assert_eq!(js["type"], json!("result"));
        assert_eq!(js["winners"], json!(["a"]));
        assert_eq!(js["notes"]["endowment"], json!(15.0));
        assert_eq!(js["notes"]["moneyBehindCandidate"]["b"], json!([15.0]));
        assert_eq!(js["notes"]["effectiveVoteCount"]["b"], json!([0.0]));
        assert_eq!(js["notes"]["stats"]["utilityDistribution"], json!({"0": 0, "1": 2}));
        assert!(js["notes"].get("comparison").is_none());
    }

    #[test]
    fn weighted_json() {
        let mut b = Builder::new(100.0);
        b.project("a", 50.0).unwrap();
        b.group("g", 1.0).unwrap();
        b.add_group_vote("g", "a", 1.0).unwrap();
        b.approve("v", &["a"]).unwrap();
        let p = AllocationParams {
            method: Method::WeightedGroups,
            ..AllocationParams::default()
        };
        let res = run_equal_shares(&b.build(), &p, &mut NoProgress).unwrap();
        let js = result_to_json(&res);
        assert_eq!(js["winners"], json!(["a"]));
        assert_eq!(js["notes"]["initialGroup"], json!({"g": 50.0}));
        assert_eq!(js["notes"]["spentByGroupOnProject"]["a"]["g"], json!(25.0));
        assert_eq!(js["notes"]["spentByIndividualOnProject"]["a"]["v"], json!(25.0));
        assert_eq!(js["notes"]["spendSummary"]["groupSpent"], json!(25.0));
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("eqshares_reference_test.json");
        let js = result_to_json(&standard_result());
        fs::write(&path, serde_json::to_string(&js).unwrap()).unwrap();
        let p = path.to_str().unwrap();
        assert!(check_reference(&js, p).is_ok());
        let other = json!({"type": "result", "winners": []});
        assert!(check_reference(&other, p).is_err());
        assert!(check_reference(&js, "/nonexistent/eqshares.json").is_err());
    }
}
