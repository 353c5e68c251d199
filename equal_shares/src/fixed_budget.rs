use log::{debug, info};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};
use snafu::prelude::*;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::ops::{Add, Div, Sub};

use crate::config::*;
use crate::tiebreak::break_ties;
use crate::{percent_text, CandidateId, Election, ProgressListener};

/// The arithmetic of the allocator.
///
/// Comparisons are exact for both implementations: floats are compared without
/// any tolerance.
pub(crate) trait Amount:
    Clone + Debug + PartialOrd + Zero + Add<Output = Self> + Sub<Output = Self> + Div<Output = Self>
{
    fn from_f64(x: f64) -> Self;
    fn from_count(n: usize) -> Self;
    fn as_f64(&self) -> f64;
}

impl Amount for f64 {
    fn from_f64(x: f64) -> Self {
        x
    }

    fn from_count(n: usize) -> Self {
        n as f64
    }

    fn as_f64(&self) -> f64 {
        *self
    }
}

impl Amount for BigRational {
    // Floats are converted exactly. Non finite values should not happen.
    fn from_f64(x: f64) -> Self {
        BigRational::from_float(x).unwrap_or_else(BigRational::zero)
    }

    fn from_count(n: usize) -> Self {
        BigRational::from_integer(BigInt::from(n))
    }

    fn as_f64(&self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }
}

/// The diagnostics of one run of the allocator, indexed by candidate.
#[derive(PartialEq, Debug, Clone)]
pub(crate) struct FixedBudgetReport {
    pub(crate) endowment: f64,
    pub(crate) money_behind_candidate: Vec<Vec<f64>>,
    pub(crate) effective_vote_count: Vec<Vec<f64>>,
}

#[derive(PartialEq, Debug, Clone)]
pub(crate) struct FixedBudgetOutcome {
    pub(crate) winners: Vec<CandidateId>,
    pub(crate) report: FixedBudgetReport,
}

/// Runs the allocator with the arithmetic requested in the parameters.
///
/// `report_details` disables the pruning of the candidates, so that every
/// candidate is evaluated at every round.
pub(crate) fn run_fixed_budget(
    election: &Election,
    budget: f64,
    params: &AllocationParams,
    report_details: bool,
    progress: Option<&mut dyn ProgressListener>,
) -> Result<FixedBudgetOutcome, AllocationErrors> {
    match params.accuracy {
        Accuracy::Floats => {
            fixed_budget::<f64>(election, budget, &params.tie_breaking, report_details, progress)
        }
        Accuracy::Fractions => fixed_budget::<BigRational>(
            election,
            budget,
            &params.tie_breaking,
            report_details,
            progress,
        ),
    }
}

fn fixed_budget<A: Amount>(
    election: &Election,
    total_budget: f64,
    rules: &[TieBreakRule],
    report_details: bool,
    mut progress: Option<&mut dyn ProgressListener>,
) -> Result<FixedBudgetOutcome, AllocationErrors> {
    let num_voters = election.num_voters();
    let endowment: A = if num_voters > 0 {
        A::from_f64(total_budget) / A::from_count(num_voters)
    } else {
        A::zero()
    };
    let mut budget: Vec<A> = vec![endowment.clone(); num_voters];
    let costs: Vec<A> = election.costs.iter().map(|c| A::from_f64(*c)).collect();

    let num_candidates = election.candidates.len();
    let mut report = FixedBudgetReport {
        endowment: endowment.as_f64(),
        money_behind_candidate: vec![Vec::new(); num_candidates],
        effective_vote_count: vec![Vec::new(); num_candidates],
    };

    // The current upper bound of the effective vote count of each candidate
    // still in consideration.
    let mut remaining: BTreeMap<CandidateId, A> = election
        .all_candidates()
        .filter(|cid| election.cost(*cid) > 0.0 && !election.approvers(*cid).is_empty())
        .map(|cid| (cid, A::from_count(election.approvers(cid).len())))
        .collect();
    let mut winners: Vec<CandidateId> = Vec::new();

    loop {
        let mut best: Vec<CandidateId> = Vec::new();
        let mut best_eff_vote_count: A = A::zero();

        // Ties on the estimate keep the order of the instance.
        let mut remaining_sorted: Vec<CandidateId> = remaining.keys().cloned().collect();
        remaining_sorted.sort_by(|a, b| {
            remaining[b]
                .partial_cmp(&remaining[a])
                .unwrap_or(Ordering::Equal)
        });

        for cid in remaining_sorted {
            let previous_eff = remaining[&cid].clone();
            if previous_eff < best_eff_vote_count && !report_details {
                break;
            }
            let cost = costs[cid.idx()].clone();
            let approvers = election.approvers(cid);
            let money_behind_now = approvers
                .iter()
                .fold(A::zero(), |acc, vid| acc + budget[vid.idx()].clone());
            report.money_behind_candidate[cid.idx()].push(money_behind_now.as_f64());

            if money_behind_now < cost {
                remaining.remove(&cid);
                report.effective_vote_count[cid.idx()].push(0.0);
                continue;
            }

            if let Some(eff_vote_count) = effective_vote_count(&cost, approvers, &budget) {
                report.effective_vote_count[cid.idx()].push(eff_vote_count.as_f64());
                if eff_vote_count > best_eff_vote_count {
                    best_eff_vote_count = eff_vote_count.clone();
                    best = vec![cid];
                } else if eff_vote_count == best_eff_vote_count {
                    best.push(cid);
                }
                remaining.insert(cid, eff_vote_count);
            }
        }

        if best.is_empty() {
            ensure!(
                remaining.is_empty(),
                AllocatorStalledSnafu {
                    remaining: election.names(&remaining.keys().cloned().collect::<Vec<_>>())
                }
            );
            break;
        }

        let resolved = break_ties(election, rules, &best)?;
        let chosen = resolved[0];
        debug!(
            "fixed_budget: chosen {:?} among {:?} with effective vote count {:?}",
            election.name(chosen),
            election.names(&best),
            best_eff_vote_count
        );
        winners.push(chosen);

        if let Some(p) = progress.as_mut() {
            p.progress(&percent_text(election.total_cost(&winners), total_budget));
        }

        let best_max_payment = costs[chosen.idx()].clone() / best_eff_vote_count;
        for vid in election.approvers(chosen) {
            let b = &mut budget[vid.idx()];
            if *b > best_max_payment {
                *b = b.clone() - best_max_payment.clone();
            } else {
                *b = A::zero();
            }
        }
        remaining.remove(&chosen);
    }

    info!(
        "fixed_budget: budget {:?}: {:?} winners costing {:?}",
        total_budget,
        winners.len(),
        election.total_cost(&winners)
    );
    Ok(FixedBudgetOutcome { winners, report })
}

/// The cost divided by the largest equal payment that covers it.
///
/// The approvers that cannot afford the payment give all their money and the
/// payment of the others is raised. Returns `None` if no payment was found.
fn effective_vote_count<A: Amount>(
    cost: &A,
    approvers: &[crate::VoterId],
    budget: &[A],
) -> Option<A> {
    let mut sorted_budgets: Vec<A> = approvers.iter().map(|vid| budget[vid.idx()].clone()).collect();
    sorted_budgets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut paid_so_far = A::zero();
    let mut denominator = sorted_budgets.len();
    for b in sorted_budgets {
        let max_payment = (cost.clone() - paid_so_far.clone()) / A::from_count(denominator);
        if max_payment > b {
            paid_so_far = paid_so_far + b;
            denominator -= 1;
        } else {
            if max_payment <= A::zero() {
                return None;
            }
            return Some(cost.clone() / max_payment);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    fn params(accuracy: Accuracy, tie_breaking: Vec<TieBreakRule>) -> AllocationParams {
        AllocationParams {
            accuracy,
            tie_breaking,
            ..AllocationParams::DEFAULT_PARAMS
        }
    }

    #[test]
    fn effective_vote_count_water_filling() {
        // Cost 30 between budgets 5, 20, 20: the poorest pays 5, the others 12.5 each.
        let budgets: Vec<f64> = vec![20.0, 5.0, 20.0];
        let approvers: Vec<crate::VoterId> = (0..3).map(|i| crate::VoterId(i)).collect();
        let eff = effective_vote_count(&30.0, &approvers, &budgets).unwrap();
        assert_eq!(eff, 30.0 / 12.5);

        let budgets_q: Vec<BigRational> = budgets.iter().map(|b| BigRational::from_f64(*b)).collect();
        let eff_q = effective_vote_count(&BigRational::from_count(30), &approvers, &budgets_q).unwrap();
        assert_eq!(eff_q, BigRational::new(BigInt::from(12), BigInt::from(5)));
    }

    #[test]
    fn rational_conversion_is_exact() {
        let x = <BigRational as Amount>::from_f64(0.5);
        assert_eq!(x, BigRational::new(BigInt::from(1), BigInt::from(2)));
        assert_eq!(x.as_f64(), 0.5);
    }

    #[test]
    fn unaffordable_candidates_are_dropped() {
        init_logs();
        let e = election(&approval_instance(
            10.0,
            &[("a", 6.0), ("b", 8.0)],
            &[("v1", &["a"]), ("v2", &["b"])],
        ));
        for accuracy in [Accuracy::Floats, Accuracy::Fractions] {
            let res = run_fixed_budget(&e, 10.0, &params(accuracy, vec![]), true, None).unwrap();
            assert!(res.winners.is_empty());
            assert_eq!(res.report.effective_vote_count[0], vec![0.0]);
            assert_eq!(res.report.money_behind_candidate[1], vec![5.0]);
            assert_eq!(res.report.endowment, 5.0);
        }
    }

    #[test]
    fn leftover_budgets_never_go_negative() {
        let e = election(&approval_instance(
            9.0,
            &[("a", 3.0), ("b", 3.0), ("c", 3.0)],
            &[("v1", &["a", "b"]), ("v2", &["a", "c"]), ("v3", &["b", "c"])],
        ));
        let res = run_fixed_budget(&e, 9.0, &params(Accuracy::Floats, vec![]), true, None).unwrap();
        assert_eq!(res.winners.len(), 3);
        for moneys in res.report.money_behind_candidate.iter() {
            assert!(moneys.iter().all(|m| *m >= 0.0));
        }
    }

    #[test]
    fn zero_cost_and_unsupported_projects_are_ignored() {
        let e = election(&approval_instance(
            10.0,
            &[("free", 0.0), ("lonely", 1.0), ("a", 2.0)],
            &[("v1", &["free", "a"])],
        ));
        let res = run_fixed_budget(&e, 10.0, &params(Accuracy::Floats, vec![]), true, None).unwrap();
        assert_eq!(e.names(&res.winners), vec!["a".to_string()]);
        assert!(res.report.money_behind_candidate[0].is_empty());
        assert!(res.report.money_behind_candidate[1].is_empty());
    }

    #[test]
    fn best_support_is_picked_first() {
        // b is supported by more voters and wins first even though it is listed last.
        let e = election(&approval_instance(
            60.0,
            &[("a", 10.0), ("b", 10.0)],
            &[("v1", &["a", "b"]), ("v2", &["b"]), ("v3", &["b"])],
        ));
        for accuracy in [Accuracy::Floats, Accuracy::Fractions] {
            let res = run_fixed_budget(&e, 60.0, &params(accuracy, vec![]), false, None).unwrap();
            assert_eq!(e.names(&res.winners), vec!["b".to_string(), "a".to_string()]);
        }
    }

    #[test]
    fn ties_use_the_rules() {
        let e = election(&approval_instance(
            20.0,
            &[("a", 10.0), ("b", 5.0)],
            &[("v1", &["a", "b"]), ("v2", &["a", "b"])],
        ));
        // Both have an effective vote count of 2.
        let res = run_fixed_budget(
            &e,
            20.0,
            &params(Accuracy::Fractions, vec![TieBreakRule::MinCost]),
            true,
            None,
        )
        .unwrap();
        assert_eq!(e.names(&res.winners), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn progress_after_each_selection() {
        let e = election(&approval_instance(
            20.0,
            &[("a", 10.0), ("b", 5.0)],
            &[("v1", &["a", "b"]), ("v2", &["a", "b"])],
        ));
        let mut messages: Vec<String> = Vec::new();
        let mut listener = |s: &str| messages.push(s.to_string());
        run_fixed_budget(
            &e,
            20.0,
            &params(Accuracy::Floats, vec![]),
            true,
            Some(&mut listener),
        )
        .unwrap();
        assert_eq!(messages, vec!["50%".to_string(), "75%".to_string()]);
    }
}
