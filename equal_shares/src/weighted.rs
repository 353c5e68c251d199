use log::{debug, info};

use std::collections::BTreeMap;

use crate::config::*;
use crate::stats::{outcome_statistics, spend_summary};
use crate::tiebreak::break_ties;
use crate::{CandidateId, Election};

const SCORE_EPSILON: f64 = 1e-12;
const TIE_EPSILON: f64 = 1e-9;
// Share of the cost that the proportional contributions must cover.
const AFFORDABILITY_SLACK: f64 = 0.95;

/// The money of a set of supporters (the groups or the individuals).
struct Pool<'a> {
    names: &'a [String],
    initial: Vec<f64>,
    leftover: Vec<f64>,
    scores: &'a [BTreeMap<CandidateId, f64>],
    score_sums: Vec<f64>,
}

impl<'a> Pool<'a> {
    fn new(names: &'a [String], shares: Vec<f64>, scores: &'a [BTreeMap<CandidateId, f64>]) -> Pool<'a> {
        Pool {
            names,
            leftover: shares.clone(),
            initial: shares,
            scores,
            score_sums: scores.iter().map(|s| s.values().sum()).collect(),
        }
    }

    fn score(&self, idx: usize, cid: CandidateId) -> f64 {
        self.scores[idx].get(&cid).cloned().unwrap_or(0.0)
    }

    /// The part of the leftover of a supporter that goes to the candidate.
    fn contribution(&self, idx: usize, cid: CandidateId) -> f64 {
        if self.score_sums[idx] <= SCORE_EPSILON {
            return 0.0;
        }
        let c = self.leftover[idx] * (self.score(idx, cid) / self.score_sums[idx]);
        if c.is_nan() || c <= 0.0 {
            0.0
        } else {
            c
        }
    }

    fn support(&self, cid: CandidateId) -> f64 {
        (0..self.leftover.len())
            .map(|idx| self.contribution(idx, cid))
            .sum()
    }

    /// All the money of the supporters with a positive score.
    fn theoretical_support(&self, cid: CandidateId) -> f64 {
        (0..self.leftover.len())
            .filter(|idx| self.score(*idx, cid) > 0.0)
            .map(|idx| self.leftover[idx])
            .sum()
    }

    /// Charges every contributor its share of the cost. Returns the non-zero
    /// deductions.
    ///
    /// A project funded below its full cost makes the deductions larger than
    /// the contributions. The leftover stops at zero but the returned amount
    /// is the full deduction, so the reported spend can exceed what the
    /// ledger lost.
    fn pay(&mut self, cid: CandidateId, support: f64, cost: f64) -> Vec<(String, f64)> {
        let mut paid: Vec<(String, f64)> = Vec::new();
        for idx in 0..self.leftover.len() {
            let frac = self.contribution(idx, cid) / support;
            if frac > 0.0 {
                let deduction = frac * cost;
                self.leftover[idx] = (self.leftover[idx] - deduction).max(0.0);
                paid.push((self.names[idx].clone(), deduction));
            }
        }
        paid
    }

    fn named(&self, values: &[f64]) -> Vec<(String, f64)> {
        self.names.iter().cloned().zip(values.iter().cloned()).collect()
    }
}

/// The weighted groups + individuals allocation.
///
/// The budget is split between the groups (`ratio`) and the individuals. A
/// supporter spreads its money over the projects in proportion of its scores,
/// and the project with the largest support is funded at each round by all
/// its supporters, in proportion of their contributions.
pub(crate) fn run_weighted(
    election: &Election,
    total_budget: f64,
    ratio: f64,
    params: &AllocationParams,
) -> Result<(Vec<CandidateId>, WeightedReport), AllocationErrors> {
    let group_budget = total_budget * ratio;
    let individual_budget = total_budget * (1.0 - ratio);

    let weights: Vec<f64> = election.group_weights.iter().map(|w| w.max(0.0)).collect();
    let total_weight: f64 = weights.iter().sum();
    let group_shares: Vec<f64> = if total_weight > SCORE_EPSILON {
        weights.iter().map(|w| w / total_weight * group_budget).collect()
    } else {
        vec![0.0; weights.len()]
    };
    let num_voters = election.num_voters();
    let individual_shares: Vec<f64> = vec![individual_budget / num_voters.max(1) as f64; num_voters];

    let mut groups = Pool::new(&election.groups, group_shares, &election.group_scores);
    let mut individuals = Pool::new(&election.voters, individual_shares, &election.voter_scores);

    let mut spent_by_group_on_project: Vec<(String, Vec<(String, f64)>)> = Vec::new();
    let mut spent_by_individual_on_project: Vec<(String, Vec<(String, f64)>)> = Vec::new();
    let mut spent_by_individuals: Vec<f64> = vec![0.0; election.candidates.len()];
    let mut total_spent_per_project: Vec<(String, f64)> = Vec::new();

    let mut remaining: Vec<CandidateId> = election.all_candidates().collect();
    let mut winners: Vec<CandidateId> = Vec::new();
    let mut total_spent = 0.0;

    loop {
        let mut best_support = 0.0;
        let mut ties: Vec<CandidateId> = Vec::new();
        for cid in remaining.iter() {
            let support = groups.support(*cid) + individuals.support(*cid);
            if support <= 0.0 {
                continue;
            }
            if support > best_support {
                best_support = support;
                ties = vec![*cid];
            } else if (support - best_support).abs() < TIE_EPSILON {
                ties.push(*cid);
            }
        }
        if ties.is_empty() {
            break;
        }
        let chosen = match params.weighted_tie_break {
            WeightedTieBreak::FirstFound => ties[0],
            WeightedTieBreak::Resolver => break_ties(election, &params.tie_breaking, &ties)?[0],
        };
        remaining.retain(|cid| *cid != chosen);

        let cost = election.cost(chosen);
        let theoretical = groups.theoretical_support(chosen) + individuals.theoretical_support(chosen);
        if theoretical < cost {
            debug!(
                "run_weighted: {:?} discarded: theoretical support {:?} below cost {:?}",
                election.name(chosen),
                theoretical,
                cost
            );
            continue;
        }
        let support = groups.support(chosen) + individuals.support(chosen);
        if support < SCORE_EPSILON || support < cost * AFFORDABILITY_SLACK {
            debug!(
                "run_weighted: {:?} discarded: support {:?} for cost {:?}",
                election.name(chosen),
                support,
                cost
            );
            continue;
        }

        let paid_by_groups = groups.pay(chosen, support, cost);
        let paid_by_individuals = individuals.pay(chosen, support, cost);
        let spent: f64 = paid_by_groups
            .iter()
            .chain(paid_by_individuals.iter())
            .map(|(_, x)| x)
            .sum();
        spent_by_individuals[chosen.idx()] = paid_by_individuals.iter().map(|(_, x)| x).sum();
        debug!(
            "run_weighted: funded {:?} with support {:?}, spent {:?}",
            election.name(chosen),
            support,
            spent
        );
        let name = election.name(chosen).to_string();
        spent_by_group_on_project.push((name.clone(), paid_by_groups));
        spent_by_individual_on_project.push((name.clone(), paid_by_individuals));
        total_spent_per_project.push((name, spent));
        total_spent += spent;
        winners.push(chosen);
    }

    info!(
        "run_weighted: budget {:?}, spent {:?}, cost of winners {:?}, {:?} winners",
        total_budget,
        total_spent,
        election.total_cost(&winners),
        winners.len()
    );

    let all_individuals_score: Vec<(String, f64)> = election
        .all_candidates()
        .map(|cid| {
            let score: f64 = (0..num_voters).map(|idx| individuals.score(idx, cid)).sum();
            (election.name(cid).to_string(), score)
        })
        .collect();
    let report = WeightedReport {
        initial_group: groups.named(&groups.initial),
        leftover_group: groups.named(&groups.leftover),
        initial_individual: individuals.named(&individuals.initial),
        leftover_individual: individuals.named(&individuals.leftover),
        spent_by_group_on_project,
        spent_by_individual_on_project,
        spent_by_all_individuals_on_project: election
            .candidates
            .iter()
            .cloned()
            .zip(spent_by_individuals)
            .collect(),
        all_individuals_score,
        total_spent_per_project,
        stats: outcome_statistics(election, &winners),
        spend_summary: spend_summary(
            &groups.initial,
            &groups.leftover,
            &individuals.initial,
            &individuals.leftover,
        ),
    };
    Ok((winners, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::test_util::*;

    fn weighted_params() -> AllocationParams {
        AllocationParams {
            method: Method::WeightedGroups,
            ..AllocationParams::DEFAULT_PARAMS
        }
    }

    // Two groups and three voters over four projects.
    fn instance(weight_a: f64, weight_b: f64) -> Election {
        let mut b = Builder::new(100.0);
        b.project("park", 40.0).unwrap();
        b.project("school", 30.0).unwrap();
        b.project("road", 20.0).unwrap();
        b.project("pool", 90.0).unwrap();
        b.group("ga", weight_a).unwrap();
        b.group("gb", weight_b).unwrap();
        b.add_group_vote("ga", "park", 2.0).unwrap();
        b.add_group_vote("ga", "school", 1.0).unwrap();
        b.add_group_vote("gb", "road", 1.0).unwrap();
        b.approve("v1", &["park", "road"]).unwrap();
        b.approve("v2", &["school"]).unwrap();
        b.approve("v3", &["pool", "park"]).unwrap();
        election(&b.build())
    }

    fn total(xs: &[(String, f64)]) -> f64 {
        xs.iter().map(|(_, x)| x).sum()
    }

    #[test]
    fn budget_is_split_by_ratio_and_weight() {
        init_logs();
        let e = instance(3.0, 1.0);
        let (_, report) = run_weighted(&e, 100.0, 0.4, &weighted_params()).unwrap();
        assert_eq!(report.initial_group[0].0, "ga");
        assert!((report.initial_group[0].1 - 30.0).abs() < 1e-9);
        assert!((report.initial_group[1].1 - 10.0).abs() < 1e-9);
        assert_eq!(report.initial_individual.len(), 3);
        assert!((report.initial_individual[0].1 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn zero_group_weights_give_no_group_money() {
        let e = instance(0.0, -2.0);
        let (_, report) = run_weighted(&e, 100.0, 0.5, &weighted_params()).unwrap();
        assert_eq!(total(&report.initial_group), 0.0);
        for (_, paid) in report.spent_by_group_on_project.iter() {
            assert!(paid.is_empty());
        }
        assert_eq!(report.spend_summary.group_spent, 0.0);
    }

    #[test]
    fn full_ratio_leaves_nothing_to_individuals() {
        let e = instance(1.0, 1.0);
        let (winners, report) = run_weighted(&e, 100.0, 1.0, &weighted_params()).unwrap();
        assert_eq!(total(&report.initial_individual), 0.0);
        for (_, paid) in report.spent_by_individual_on_project.iter() {
            assert!(paid.is_empty());
        }
        // Only group supported projects can be funded.
        assert!(!e.names(&winners).contains(&"pool".to_string()));
    }

    #[test]
    fn deductions_cover_the_cost_and_leftovers_stay_positive() {
        let e = instance(1.0, 1.0);
        let (winners, report) = run_weighted(&e, 100.0, 0.5, &weighted_params()).unwrap();
        assert!(!winners.is_empty());
        assert!(e.total_cost(&winners) <= 100.0 + 1e-6);
        for (p, spent) in report.total_spent_per_project.iter() {
            let cid = e.find(p).unwrap();
            assert!((spent - e.cost(cid)).abs() < 1e-6);
        }
        assert!(report.leftover_group.iter().all(|(_, x)| *x >= 0.0));
        assert!(report.leftover_individual.iter().all(|(_, x)| *x >= 0.0));
        let s = &report.spend_summary;
        assert!((s.group_initial + s.individual_initial - 100.0).abs() < 1e-9);
    }

    #[test]
    fn strongest_support_is_funded_first() {
        // ga puts 2/3 of its 33.3 on the park, v1 and v3 half of their 16.7 each.
        let e = instance(2.0, 1.0);
        let (winners, report) = run_weighted(&e, 100.0, 0.5, &weighted_params()).unwrap();
        assert_eq!(e.name(winners[0]), "park");
        assert_eq!(report.spent_by_group_on_project[0].1.len(), 1);
        assert_eq!(report.spent_by_individual_on_project[0].1.len(), 2);
        assert_eq!(report.all_individuals_score[0], ("park".to_string(), 2.0));
    }

    #[test]
    fn nothing_funded_without_scores() {
        let e = election(&approval_instance(50.0, &[("a", 10.0)], &[]));
        let (winners, report) = run_weighted(&e, 50.0, 0.5, &weighted_params()).unwrap();
        assert!(winners.is_empty());
        assert!(report.initial_individual.is_empty());
        assert_eq!(report.stats.utility_distribution, vec![0]);
    }

    #[test]
    fn resolver_applies_the_rules_to_ties() {
        let mut b = Builder::new(20.0);
        b.project("a", 10.0).unwrap();
        b.project("b", 10.0).unwrap();
        b.approve("v1", &["a", "b"]).unwrap();
        b.approve("v2", &["a", "b"]).unwrap();
        let e = election(&b.build());
        let first = run_weighted(&e, 20.0, 0.0, &weighted_params()).unwrap().0;
        assert_eq!(e.name(first[0]), "a");
        let p = AllocationParams {
            weighted_tie_break: WeightedTieBreak::Resolver,
            tie_breaking: vec![TieBreakRule::Priority(vec!["b".to_string()])],
            ..weighted_params()
        };
        let resolved = run_weighted(&e, 20.0, 0.0, &p).unwrap().0;
        assert_eq!(e.name(resolved[0]), "b");
    }
}
