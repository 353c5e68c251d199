use crate::pb::*;

use serde::{Deserialize, Serialize};

/// An entry of the tie-breaking list: a rule name or a list of project ids.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TieBreakEntry {
    Rule(String),
    Priority(Vec<String>),
}

/// The parameters as written in the configuration file.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PbParams {
    #[serde(rename = "totalBudget")]
    pub total_budget: Option<f64>,
    #[serde(rename = "groupIndiRatio")]
    pub group_indi_ratio: Option<f64>,
    pub method: Option<String>,
    pub completion: Option<String>,
    #[serde(rename = "add1options")]
    pub add1_options: Option<Vec<String>>,
    pub comparison: Option<String>,
    pub accuracy: Option<String>,
    #[serde(rename = "tieBreaking")]
    pub tie_breaking: Option<Vec<TieBreakEntry>>,
    #[serde(rename = "weightedTieBreak")]
    pub weighted_tie_break: Option<String>,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_number(key: &str, value: &str) -> PbResult<f64> {
    value.trim().parse::<f64>().ok().context(InvalidOverrideSnafu { key, value })
}

impl PbParams {
    /// Overrides one field from a `key=value` setting of the command line.
    pub fn set(&mut self, key: &str, value: &str) -> PbResult<()> {
        match key {
            "totalBudget" => self.total_budget = Some(parse_number(key, value)?),
            "groupIndiRatio" => self.group_indi_ratio = Some(parse_number(key, value)?),
            "method" => self.method = Some(value.to_string()),
            "completion" => self.completion = Some(value.to_string()),
            "add1options" => self.add1_options = Some(split_list(value)),
            "comparison" => self.comparison = Some(value.to_string()),
            "accuracy" => self.accuracy = Some(value.to_string()),
            "tieBreaking" => {
                let entries = split_list(value)
                    .iter()
                    .map(|s| {
                        if s.contains('|') {
                            TieBreakEntry::Priority(
                                s.split('|').map(|p| p.trim().to_string()).collect(),
                            )
                        } else {
                            TieBreakEntry::Rule(s.clone())
                        }
                    })
                    .collect();
                self.tie_breaking = Some(entries);
            }
            "weightedTieBreak" => self.weighted_tie_break = Some(value.to_string()),
            _ => return InvalidOverrideSnafu { key, value }.fail(),
        }
        Ok(())
    }
}

pub fn read_params(path: &str) -> PbResult<PbParams> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let params: PbParams = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    info!("params: {:?}", params);
    Ok(params)
}

/// Checks all the tokens and fills in the defaults.
///
/// When no method is given, the weighted method is used for instances with
/// groups.
pub fn validate_params(params: &PbParams, has_groups: bool) -> PbResult<AllocationParams> {
    let defaults = AllocationParams::DEFAULT_PARAMS;
    let method = match params.method.as_deref() {
        None if has_groups => Method::WeightedGroups,
        None => Method::Standard,
        Some(s) => s.parse().context(InvalidParamsSnafu {})?,
    };
    let completion: Completion = match params.completion.as_deref() {
        None => defaults.completion,
        Some(s) => s.parse().context(InvalidParamsSnafu {})?,
    };
    let add1_options = match &params.add1_options {
        None => defaults.add1_options,
        Some(tokens) => Add1Options::from_tokens(tokens.as_slice()).context(InvalidParamsSnafu {})?,
    };
    let comparison: Comparison = match params.comparison.as_deref() {
        None => defaults.comparison,
        Some(s) => s.parse().context(InvalidParamsSnafu {})?,
    };
    let accuracy: Accuracy = match params.accuracy.as_deref() {
        None => defaults.accuracy,
        Some(s) => s.parse().context(InvalidParamsSnafu {})?,
    };
    let mut tie_breaking: Vec<TieBreakRule> = Vec::new();
    for entry in params.tie_breaking.iter().flatten() {
        let rule = match entry {
            TieBreakEntry::Rule(s) => s.parse().context(InvalidParamsSnafu {})?,
            TieBreakEntry::Priority(ids) => TieBreakRule::Priority(ids.clone()),
        };
        tie_breaking.push(rule);
    }
    let weighted_tie_break: WeightedTieBreak = match params.weighted_tie_break.as_deref() {
        None => defaults.weighted_tie_break,
        Some(s) => s.parse().context(InvalidParamsSnafu {})?,
    };

    Ok(AllocationParams {
        total_budget: params.total_budget.unwrap_or(defaults.total_budget),
        group_indi_ratio: params.group_indi_ratio.unwrap_or(defaults.group_indi_ratio),
        method,
        completion,
        add1_options,
        comparison,
        accuracy,
        tie_breaking,
        weighted_tie_break,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_json_params() {
        let params: PbParams = serde_json::from_str(
            r#"{"completion": "add1e", "tieBreaking": ["maxVotes", ["p2", "p1"]], "add1options": ["integral"]}"#,
        )
        .unwrap();
        let p = validate_params(&params, false).unwrap();
        assert_eq!(p.completion, Completion::Add1E);
        assert_eq!(
            p.tie_breaking,
            vec![
                TieBreakRule::MaxVotes,
                TieBreakRule::Priority(vec!["p2".to_string(), "p1".to_string()])
            ]
        );
        assert!(p.add1_options.integral && !p.add1_options.exhaustive);
        assert_eq!(p.accuracy, Accuracy::Floats);
    }

    #[test]
    fn defaults() {
        let p = validate_params(&PbParams::default(), false).unwrap();
        assert_eq!(p, AllocationParams::DEFAULT_PARAMS);
        let p = validate_params(&PbParams::default(), true).unwrap();
        assert_eq!(p.method, Method::WeightedGroups);
        let explicit = PbParams {
            method: Some("standard".to_string()),
            ..PbParams::default()
        };
        assert_eq!(validate_params(&explicit, true).unwrap().method, Method::Standard);
    }

    #[test]
    fn command_line_overrides() {
        let mut params = PbParams::default();
        params.set("tieBreaking", "minCost, p3|p1").unwrap();
        params.set("totalBudget", "1200").unwrap();
        params.set("add1options", "exhaustive").unwrap();
        let p = validate_params(&params, false).unwrap();
        assert_eq!(p.total_budget, 1200.0);
        assert_eq!(
            p.tie_breaking,
            vec![
                TieBreakRule::MinCost,
                TieBreakRule::Priority(vec!["p3".to_string(), "p1".to_string()])
            ]
        );
        assert!(params.set("totalBudget", "lots").is_err());
        assert!(params.set("colour", "blue").is_err());
    }

    #[test]
    fn unknown_tokens_are_errors() {
        for (k, v) in [
            ("completion", "add2"),
            ("accuracy", "doubles"),
            ("comparison", "vibes"),
            ("method", "lottery"),
            ("tieBreaking", "coinFlip"),
            ("add1options", "fast"),
            ("weightedTieBreak", "random"),
        ] {
            let mut params = PbParams::default();
            params.set(k, v).unwrap();
            assert!(validate_params(&params, false).is_err(), "{}={}", k, v);
        }
    }
}
