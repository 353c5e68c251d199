use log::debug;

use std::collections::HashSet;

use crate::config::*;
use crate::{CandidateId, Election, VoterId};

/// Adds projects by decreasing number of approvers while they fit in the
/// budget.
///
/// Returns the completed list of winners and the projects that were added.
pub(crate) fn utilitarian_completion(
    election: &Election,
    budget: f64,
    already_winners: &[CandidateId],
) -> (Vec<CandidateId>, Vec<CandidateId>) {
    let mut winners: Vec<CandidateId> = already_winners.to_vec();
    let mut cost_so_far = election.total_cost(&winners);
    let mut added: Vec<CandidateId> = Vec::new();

    let mut sorted: Vec<CandidateId> = election.all_candidates().collect();
    sorted.sort_by_key(|cid| std::cmp::Reverse(election.approvers(*cid).len()));

    for cid in sorted {
        if winners.contains(&cid) || cost_so_far + election.cost(cid) > budget {
            continue;
        }
        winners.push(cid);
        added.push(cid);
        cost_so_far += election.cost(cid);
    }
    debug!(
        "utilitarian_completion: added {:?}, total cost {:?}",
        election.names(&added),
        cost_so_far
    );
    (winners, added)
}

fn satisfaction(election: &Election, winners: &[CandidateId]) -> Vec<u64> {
    let mut counts = vec![0u64; election.num_voters()];
    for cid in winners {
        for vid in election.approvers(*cid) {
            counts[vid.idx()] += 1;
        }
    }
    counts
}

fn covered(election: &Election, winners: &[CandidateId]) -> HashSet<VoterId> {
    winners
        .iter()
        .flat_map(|cid| election.approvers(*cid).iter().cloned())
        .collect()
}

/// Counts the voters that prefer each outcome.
///
/// With `Comparison::None` nobody has a preference and the allocation is kept.
pub(crate) fn compare(
    election: &Election,
    greedy: &[CandidateId],
    winners: &[CandidateId],
    comparison: Comparison,
) -> ComparisonOutcome {
    let mut prefers_allocator = 0;
    let mut prefers_greedy = 0;
    match comparison {
        Comparison::None => {}
        Comparison::Satisfaction => {
            let ours = satisfaction(election, winners);
            let theirs = satisfaction(election, greedy);
            for (a, g) in ours.iter().zip(theirs.iter()) {
                if a > g {
                    prefers_allocator += 1;
                } else if g > a {
                    prefers_greedy += 1;
                }
            }
        }
        Comparison::ExclusionRatio => {
            let ours = covered(election, winners);
            let theirs = covered(election, greedy);
            prefers_allocator = ours.difference(&theirs).count() as u64;
            prefers_greedy = theirs.difference(&ours).count() as u64;
        }
    }
    ComparisonOutcome {
        stick_to_allocator: prefers_greedy <= prefers_allocator,
        prefers_allocator,
        prefers_greedy,
    }
}
