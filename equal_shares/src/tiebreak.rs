use log::debug;
use snafu::prelude::*;

use crate::config::*;
use crate::{CandidateId, Election};

/// Narrows a set of tied candidates by applying the rules in order.
///
/// Each rule keeps at most the first candidate reaching its best value, a
/// priority list keeps its first listed candidate present in the tie. The
/// resolution stops as soon as a single candidate is left. The returned list
/// is never empty; its first element is the one to pick.
pub(crate) fn break_ties(
    election: &Election,
    rules: &[TieBreakRule],
    choices: &[CandidateId],
) -> Result<Vec<CandidateId>, AllocationErrors> {
    let mut remaining: Vec<CandidateId> = choices.to_vec();
    for rule in rules {
        remaining = match rule {
            TieBreakRule::MaxVotes => {
                let best = remaining
                    .iter()
                    .map(|cid| election.approvers(*cid).len())
                    .max();
                first_matching(&remaining, |cid| {
                    Some(election.approvers(cid).len()) == best
                })
            }
            TieBreakRule::MinCost => {
                let best = remaining
                    .iter()
                    .map(|cid| election.cost(*cid))
                    .fold(f64::INFINITY, f64::min);
                first_matching(&remaining, |cid| election.cost(cid) == best)
            }
            TieBreakRule::MaxCost => {
                let best = remaining
                    .iter()
                    .map(|cid| election.cost(*cid))
                    .fold(f64::NEG_INFINITY, f64::max);
                first_matching(&remaining, |cid| election.cost(cid) == best)
            }
            TieBreakRule::Priority(order) => {
                let first_match = order
                    .iter()
                    .filter_map(|name| election.find(name))
                    .find(|cid| remaining.contains(cid));
                match first_match {
                    Some(cid) => vec![cid],
                    None => remaining,
                }
            }
        };
        debug!("break_ties: after {:?}: {:?}", rule, remaining);
        if remaining.len() <= 1 {
            break;
        }
    }
    ensure!(
        !remaining.is_empty(),
        TieBreakExhaustedSnafu {
            candidates: election.names(choices)
        }
    );
    Ok(remaining)
}

fn first_matching<F: Fn(CandidateId) -> bool>(
    remaining: &[CandidateId],
    is_best: F,
) -> Vec<CandidateId> {
    remaining
        .iter()
        .find(|cid| is_best(**cid))
        .map(|cid| vec![*cid])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    fn election_abc() -> Election {
        // a: cheap with one vote, b: expensive with two votes, c: cheap with two votes.
        election(&approval_instance(
            100.0,
            &[("a", 10.0), ("b", 30.0), ("c", 10.0)],
            &[("v1", &["a", "b", "c"]), ("v2", &["b", "c"])],
        ))
    }

    fn names(e: &Election, cids: &[CandidateId]) -> Vec<String> {
        e.names(cids)
    }

    #[test]
    fn no_rules_keeps_the_tie() {
        let e = election_abc();
        let all: Vec<CandidateId> = e.all_candidates().collect();
        let res = break_ties(&e, &[], &all).unwrap();
        assert_eq!(res, all);
    }

    #[test]
    fn max_votes_takes_the_first_best() {
        let e = election_abc();
        let all: Vec<CandidateId> = e.all_candidates().collect();
        let res = break_ties(&e, &[TieBreakRule::MaxVotes], &all).unwrap();
        assert_eq!(names(&e, &res), vec!["b".to_string()]);
    }

    #[test]
    fn cost_rules() {
        let e = election_abc();
        let all: Vec<CandidateId> = e.all_candidates().collect();
        let res = break_ties(&e, &[TieBreakRule::MinCost], &all).unwrap();
        assert_eq!(names(&e, &res), vec!["a".to_string()]);
        let res = break_ties(&e, &[TieBreakRule::MaxCost], &all).unwrap();
        assert_eq!(names(&e, &res), vec!["b".to_string()]);
    }

    #[test]
    fn priority_list() {
        let e = election_abc();
        let all: Vec<CandidateId> = e.all_candidates().collect();
        let rules = vec![TieBreakRule::Priority(vec![
            "zz".to_string(),
            "c".to_string(),
            "a".to_string(),
        ])];
        let res = break_ties(&e, &rules, &all).unwrap();
        assert_eq!(names(&e, &res), vec!["c".to_string()]);
    }

    #[test]
    fn priority_without_match_falls_through() {
        let e = election_abc();
        let ac = vec![CandidateId(0), CandidateId(2)];
        let rules = vec![
            TieBreakRule::Priority(vec!["b".to_string()]),
            TieBreakRule::MaxVotes,
        ];
        let res = break_ties(&e, &rules, &ac).unwrap();
        assert_eq!(names(&e, &res), vec!["c".to_string()]);
    }

    #[test]
    fn empty_tie_is_an_error() {
        let e = election_abc();
        assert!(matches!(
            break_ties(&e, &[TieBreakRule::MaxVotes], &[]),
            Err(AllocationErrors::TieBreakExhausted { .. })
        ));
    }
}
