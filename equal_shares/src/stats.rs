use crate::config::*;
use crate::{CandidateId, Election};

/// Statistics of an outcome from the point of view of the voters.
pub(crate) fn outcome_statistics(election: &Election, winners: &[CandidateId]) -> OutcomeStatistics {
    let num_voters = election.num_voters();
    let mut utility: Vec<usize> = vec![0; num_voters];
    for cid in winners {
        for vid in election.approvers(*cid) {
            utility[vid.idx()] += 1;
        }
    }
    let mut utility_distribution: Vec<u64> = vec![0; winners.len() + 1];
    for u in utility {
        utility_distribution[u] += 1;
    }

    let per_voter = |x: f64| {
        if num_voters > 0 {
            x / num_voters as f64
        } else {
            0.0
        }
    };
    let approvals: usize = winners.iter().map(|cid| election.approvers(*cid).len()).sum();
    let approved_cost: f64 = winners
        .iter()
        .map(|cid| election.approvers(*cid).len() as f64 * election.cost(*cid))
        .sum();

    OutcomeStatistics {
        total_cost: election.total_cost(winners),
        avg_approved_projects: per_voter(approvals as f64),
        avg_cost_of_winning_approved_projects: per_voter(approved_cost),
        utility_distribution,
    }
}

/// Totals of the group and individual ledgers.
pub(crate) fn spend_summary(
    initial_group: &[f64],
    leftover_group: &[f64],
    initial_individual: &[f64],
    leftover_individual: &[f64],
) -> SpendSummary {
    let group_initial: f64 = initial_group.iter().sum();
    let group_leftover: f64 = leftover_group.iter().sum();
    let individual_initial: f64 = initial_individual.iter().sum();
    let individual_leftover: f64 = leftover_individual.iter().sum();
    SpendSummary {
        group_initial,
        group_spent: group_initial - group_leftover,
        group_leftover,
        individual_initial,
        individual_spent: individual_initial - individual_leftover,
        individual_leftover,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn statistics_of_an_outcome() {
        let e = election(&approval_instance(
            100.0,
            &[("a", 10.0), ("b", 30.0), ("c", 50.0)],
            &[("v1", &["a", "b"]), ("v2", &["b"]), ("v3", &["c"]), ("v4", &["a"])],
        ));
        let winners: Vec<CandidateId> = ["a", "b"].iter().filter_map(|n| e.find(n)).collect();
        let s = outcome_statistics(&e, &winners);
        assert_eq!(s.total_cost, 40.0);
        // 4 approvals of winners over 4 voters.
        assert_eq!(s.avg_approved_projects, 1.0);
        // (2 * 10 + 2 * 30) / 4
        assert_eq!(s.avg_cost_of_winning_approved_projects, 20.0);
        // v3: 0, v2 and v4: 1, v1: 2.
        assert_eq!(s.utility_distribution, vec![1, 2, 1]);
    }

    #[test]
    fn no_voters() {
        let e = election(&approval_instance(10.0, &[("a", 10.0)], &[]));
        let s = outcome_statistics(&e, &[]);
        assert_eq!(s.avg_approved_projects, 0.0);
        assert_eq!(s.avg_cost_of_winning_approved_projects, 0.0);
        assert_eq!(s.utility_distribution, vec![0]);
    }

    #[test]
    fn summary_totals() {
        let s = spend_summary(&[30.0, 10.0], &[5.0, 10.0], &[20.0, 20.0], &[0.0, 4.0]);
        assert_eq!(s.group_initial, 40.0);
        assert_eq!(s.group_spent, 25.0);
        assert_eq!(s.individual_spent, 36.0);
        assert_eq!(s.individual_leftover, 4.0);
    }
}
