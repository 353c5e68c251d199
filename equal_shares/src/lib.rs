mod add_one;
pub mod builder;
mod completion;
mod config;
mod fixed_budget;
pub mod manual;
pub mod session;
mod stats;
mod tiebreak;
mod weighted;

use log::{debug, info};

use std::collections::{BTreeMap, HashMap};

pub use crate::config::*;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) struct CandidateId(u32);

impl CandidateId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) struct VoterId(u32);

impl VoterId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// The instance, indexed for the algorithms.
///
/// Candidates and voters are numbered in the order of the instance.
#[derive(PartialEq, Debug, Clone)]
pub(crate) struct Election {
    pub(crate) candidates: Vec<String>,
    pub(crate) costs: Vec<f64>,
    // Voters with a positive score, in order of the voters.
    pub(crate) approvers: Vec<Vec<VoterId>>,
    pub(crate) voters: Vec<String>,
    // Ordered by candidate: score sums must not depend on the map.
    pub(crate) voter_scores: Vec<BTreeMap<CandidateId, f64>>,
    pub(crate) groups: Vec<String>,
    pub(crate) group_weights: Vec<f64>,
    pub(crate) group_scores: Vec<BTreeMap<CandidateId, f64>>,
}

impl Election {
    pub(crate) fn all_candidates(&self) -> impl Iterator<Item = CandidateId> {
        (0..self.candidates.len()).map(|idx| CandidateId(idx as u32))
    }

    pub(crate) fn cost(&self, cid: CandidateId) -> f64 {
        self.costs[cid.idx()]
    }

    pub(crate) fn name(&self, cid: CandidateId) -> &str {
        self.candidates[cid.idx()].as_str()
    }

    pub(crate) fn approvers(&self, cid: CandidateId) -> &[VoterId] {
        &self.approvers[cid.idx()]
    }

    /// The candidates that some budget could fund: a positive cost and at
    /// least one approver.
    pub(crate) fn fundable(&self) -> Vec<CandidateId> {
        self.all_candidates()
            .filter(|cid| self.cost(*cid) > 0.0 && !self.approvers(*cid).is_empty())
            .collect()
    }

    pub(crate) fn num_voters(&self) -> usize {
        self.voters.len()
    }

    pub(crate) fn total_cost(&self, cids: &[CandidateId]) -> f64 {
        cids.iter().map(|cid| self.cost(*cid)).sum()
    }

    pub(crate) fn names(&self, cids: &[CandidateId]) -> Vec<String> {
        cids.iter().map(|cid| self.name(*cid).to_string()).collect()
    }

    pub(crate) fn find(&self, name: &str) -> Option<CandidateId> {
        self.candidates
            .iter()
            .position(|n| n == name)
            .map(|idx| CandidateId(idx as u32))
    }
}

/// Receives the progress messages of a computation.
pub trait ProgressListener {
    fn progress(&mut self, text: &str);
}

/// Ignores all the progress messages.
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn progress(&mut self, _text: &str) {}
}

impl<F: FnMut(&str)> ProgressListener for F {
    fn progress(&mut self, text: &str) {
        self(text)
    }
}

/// Percentage of the budget consumed, rounded down.
pub(crate) fn percent_text(spent: f64, budget: f64) -> String {
    if budget > 0.0 {
        format!("{}%", (100.0 * spent / budget).floor())
    } else {
        "0%".to_string()
    }
}

/// Runs the method of equal shares on the given instance.
///
/// Arguments:
/// * `instance` the projects, votes and groups
/// * `params` the parameters of the computation
/// * `progress` receives the progress messages while the computation runs
///
/// The returned notes are `Notes::Weighted` if the weighted groups method was
/// requested and `Notes::Standard` otherwise.
pub fn run_equal_shares(
    instance: &Instance,
    params: &AllocationParams,
    progress: &mut dyn ProgressListener,
) -> Result<AllocationResult, AllocationErrors> {
    info!(
        "Processing {:?} projects, {:?} voters, {:?} groups, params: {:?}",
        instance.projects.len(),
        instance.voters.len(),
        instance.groups.len(),
        params
    );
    let election = checks(instance);

    let budget = if params.total_budget > 0.0 {
        params.total_budget
    } else {
        instance.budget
    };
    let ratio = if params.group_indi_ratio.is_nan()
        || params.group_indi_ratio < 0.0
        || params.group_indi_ratio > 1.0
    {
        0.5
    } else {
        params.group_indi_ratio
    };
    debug!("run_equal_shares: budget: {:?} ratio: {:?}", budget, ratio);

    match params.method {
        Method::WeightedGroups => {
            let (winners, report) = weighted::run_weighted(&election, budget, ratio, params)?;
            Ok(AllocationResult {
                winners: election.names(&winners),
                notes: Notes::Weighted(report),
            })
        }
        Method::Standard => run_standard(&election, budget, params, progress),
    }
}

fn run_standard(
    election: &Election,
    budget: f64,
    params: &AllocationParams,
    progress: &mut dyn ProgressListener,
) -> Result<AllocationResult, AllocationErrors> {
    let outcome = if !params.completion.uses_add1() {
        fixed_budget::run_fixed_budget(election, budget, params, true, Some(progress))?
    } else {
        match complete_single_run(election, budget, params)? {
            Some(outcome) => outcome,
            None => add_one::run_add_one(election, budget, params, progress)?,
        }
    };

    let mut winners = outcome.winners;
    let mut added_by_utilitarian_completion: Vec<CandidateId> = Vec::new();
    if params.completion.uses_utilitarian() {
        let (completed, added) = completion::utilitarian_completion(election, budget, &winners);
        debug!("run_standard: utilitarian completion added {:?}", added);
        winners = completed;
        added_by_utilitarian_completion = added;
    }

    let (greedy, _) = completion::utilitarian_completion(election, budget, &[]);
    let mut comparison: Option<String> = None;
    if params.comparison != Comparison::None {
        let c = completion::compare(election, &greedy, &winners, params.comparison);
        info!("run_standard: comparison with greedy: {:?}", c);
        if !c.stick_to_allocator {
            winners = greedy.clone();
            comparison = Some(format!(
                "Greedy is preferred by {} vs MES's {}.",
                c.prefers_greedy, c.prefers_allocator
            ));
        }
    }

    let report = StandardReport {
        endowment: outcome.report.endowment,
        money_behind_candidate: election
            .all_candidates()
            .map(|cid| {
                (
                    election.name(cid).to_string(),
                    outcome.report.money_behind_candidate[cid.idx()].clone(),
                )
            })
            .collect(),
        effective_vote_count: election
            .all_candidates()
            .map(|cid| {
                (
                    election.name(cid).to_string(),
                    outcome.report.effective_vote_count[cid.idx()].clone(),
                )
            })
            .collect(),
        added_by_utilitarian_completion: election.names(&added_by_utilitarian_completion),
        comparison,
        stats: stats::outcome_statistics(election, &winners),
        greedy_stats: stats::outcome_statistics(election, &greedy),
    };
    Ok(AllocationResult {
        winners: election.names(&winners),
        notes: Notes::Standard(report),
    })
}

// The plain run, if the budget covers the fundable projects and the run funds
// all of them.
fn complete_single_run(
    election: &Election,
    budget: f64,
    params: &AllocationParams,
) -> Result<Option<fixed_budget::FixedBudgetOutcome>, AllocationErrors> {
    let fundable = election.fundable();
    if election.total_cost(&fundable) > budget {
        return Ok(None);
    }
    let outcome = fixed_budget::run_fixed_budget(election, budget, params, true, None)?;
    if fundable.iter().all(|cid| outcome.winners.contains(cid)) {
        debug!("complete_single_run: all the fundable projects are funded");
        Ok(Some(outcome))
    } else {
        Ok(None)
    }
}

// Candidates and voters are returned in the same order as the instance.
// The instance is expected to come from the builder: unknown references are skipped.
fn checks(instance: &Instance) -> Election {
    let candidate_ids: HashMap<&str, CandidateId> = instance
        .projects
        .iter()
        .enumerate()
        .map(|(idx, p)| (p.id.as_str(), CandidateId(idx as u32)))
        .collect();
    let voter_ids: HashMap<&str, VoterId> = instance
        .voters
        .iter()
        .enumerate()
        .map(|(idx, v)| (v.as_str(), VoterId(idx as u32)))
        .collect();
    let group_ids: HashMap<&str, usize> = instance
        .groups
        .iter()
        .enumerate()
        .map(|(idx, g)| (g.id.as_str(), idx))
        .collect();

    let mut approvers: Vec<Vec<VoterId>> = vec![Vec::new(); instance.projects.len()];
    let mut voter_scores: Vec<BTreeMap<CandidateId, f64>> =
        vec![BTreeMap::new(); instance.voters.len()];
    for s in instance.votes.iter() {
        match (
            voter_ids.get(s.supporter.as_str()),
            candidate_ids.get(s.project.as_str()),
        ) {
            (Some(vid), Some(cid)) => {
                voter_scores[vid.idx()].insert(*cid, s.score);
            }
            _ => {
                debug!("checks: skipping vote {:?}", s);
            }
        }
    }
    // Approvers are listed in voter order.
    for (vidx, scores) in voter_scores.iter().enumerate() {
        for (cid, score) in scores.iter() {
            if *score > 0.0 {
                approvers[cid.idx()].push(VoterId(vidx as u32));
            }
        }
    }

    let mut group_scores: Vec<BTreeMap<CandidateId, f64>> =
        vec![BTreeMap::new(); instance.groups.len()];
    for s in instance.group_votes.iter() {
        match (
            group_ids.get(s.supporter.as_str()),
            candidate_ids.get(s.project.as_str()),
        ) {
            (Some(gidx), Some(cid)) => {
                group_scores[*gidx].insert(*cid, s.score);
            }
            _ => {
                debug!("checks: skipping group vote {:?}", s);
            }
        }
    }

    Election {
        candidates: instance.projects.iter().map(|p| p.id.clone()).collect(),
        costs: instance.projects.iter().map(|p| p.cost).collect(),
        approvers,
        voters: instance.voters.clone(),
        voter_scores,
        groups: instance.groups.iter().map(|g| g.id.clone()).collect(),
        group_weights: instance.groups.iter().map(|g| g.weight).collect(),
        group_scores,
    }
}
