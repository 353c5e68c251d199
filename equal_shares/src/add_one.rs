use log::{debug, info};

use crate::config::*;
use crate::fixed_budget::{run_fixed_budget, FixedBudgetOutcome};
use crate::{percent_text, Election, ProgressListener};

/// Raises the virtual budget by one unit per voter for as long as the
/// selected projects still fit in the real budget.
///
/// The returned outcome is the one of the last accepted budget, recomputed
/// with full diagnostics.
pub(crate) fn run_add_one(
    election: &Election,
    total_budget: f64,
    params: &AllocationParams,
    progress: &mut dyn ProgressListener,
) -> Result<FixedBudgetOutcome, AllocationErrors> {
    let num_voters = election.num_voters();
    let exhaustive = params.add1_options.exhaustive || params.completion.implies_exhaustive();

    let start_budget = if params.add1_options.integral && num_voters > 0 {
        (total_budget / num_voters as f64).floor() * num_voters as f64
    } else {
        total_budget
    };
    let mut winners =
        run_fixed_budget(election, start_budget, params, false, Some(&mut *progress))?.winners;
    let mut current_cost = election.total_cost(&winners);
    progress.progress(&percent_text(current_cost, total_budget));

    let fundable = election.fundable();

    let mut budget = start_budget;
    let mut probes = 0;
    while num_voters > 0 && fundable.iter().any(|cid| !winners.contains(cid)) {
        if exhaustive
            && !election
                .all_candidates()
                .any(|cid| !winners.contains(&cid) && current_cost + election.cost(cid) <= total_budget)
        {
            debug!("run_add_one: no other project fits in the budget");
            break;
        }
        let next_budget = budget + num_voters as f64;
        let next_winners = run_fixed_budget(election, next_budget, params, false, None)?.winners;
        let next_cost = election.total_cost(&next_winners);
        probes += 1;
        debug!(
            "run_add_one: probe {:?}: budget {:?} cost {:?}",
            probes, next_budget, next_cost
        );
        if next_cost > total_budget {
            break;
        }
        progress.progress(&percent_text(next_cost, total_budget));
        budget = next_budget;
        winners = next_winners;
        current_cost = next_cost;
    }

    progress.progress("Finishing");
    info!(
        "run_add_one: settled on budget {:?} after {:?} probes (start {:?}, real {:?})",
        budget, probes, start_budget, total_budget
    );
    run_fixed_budget(election, budget, params, true, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use crate::NoProgress;

    fn params(completion: Completion, add1_options: Add1Options) -> AllocationParams {
        AllocationParams {
            completion,
            add1_options,
            ..AllocationParams::DEFAULT_PARAMS
        }
    }

    fn instance() -> Election {
        election(&approval_instance(
            30.0,
            &[("big", 20.0), ("small", 6.0), ("other", 20.0)],
            &[("v1", &["big", "small"]), ("v2", &["big", "other"])],
        ))
    }

    #[test]
    fn raises_the_budget_until_no_project_fits() {
        init_logs();
        let e = instance();
        let mut messages: Vec<String> = Vec::new();
        let mut listener = |s: &str| messages.push(s.to_string());
        let options = Add1Options {
            exhaustive: true,
            integral: true,
        };
        let res = run_add_one(&e, 30.0, &params(Completion::Add1, options), &mut listener).unwrap();
        assert_eq!(e.names(&res.winners), vec!["big".to_string(), "small".to_string()]);
        // The final budget is 32: 16 per voter.
        assert_eq!(res.report.endowment, 16.0);
        assert_eq!(
            messages,
            vec![
                "66%".to_string(),
                "66%".to_string(),
                "86%".to_string(),
                "Finishing".to_string()
            ]
        );
    }

    #[test]
    fn stops_before_exceeding_the_budget() {
        let e = instance();
        for completion in [Completion::Add1, Completion::Add1E] {
            let res = run_add_one(
                &e,
                30.0,
                &params(completion, Add1Options::default()),
                &mut NoProgress,
            )
            .unwrap();
            assert!(e.total_cost(&res.winners) <= 30.0);
            assert_eq!(e.names(&res.winners), vec!["big".to_string(), "small".to_string()]);
        }
    }

    #[test]
    fn never_worse_than_the_plain_run() {
        let e = election(&approval_instance(
            100.0,
            &[("a", 40.0), ("b", 35.0), ("c", 30.0), ("d", 12.0)],
            &[
                ("v1", &["a", "b"]),
                ("v2", &["a", "c"]),
                ("v3", &["b", "d"]),
                ("v4", &["c"]),
            ],
        ));
        let p = params(Completion::Add1, Add1Options::default());
        let plain = run_fixed_budget(&e, 100.0, &p, false, None).unwrap();
        let res = run_add_one(&e, 100.0, &p, &mut NoProgress).unwrap();
        let cost = e.total_cost(&res.winners);
        assert!(cost <= 100.0);
        assert!(cost >= e.total_cost(&plain.winners));
    }

    #[test]
    fn no_voters_keeps_the_start() {
        let e = election(&approval_instance(10.0, &[("a", 5.0)], &[]));
        let res = run_add_one(
            &e,
            10.0,
            &params(Completion::Add1, Add1Options::default()),
            &mut NoProgress,
        )
        .unwrap();
        assert!(res.winners.is_empty());
        assert_eq!(res.report.endowment, 0.0);
    }

    #[test]
    fn everything_funded_ends_the_search() {
        // Without the exhaustive option the search ends once all the fundable projects are in.
        let e = election(&approval_instance(
            100.0,
            &[("a", 10.0), ("b", 10.0)],
            &[("v1", &["a"]), ("v2", &["b"])],
        ));
        let res = run_add_one(
            &e,
            100.0,
            &params(Completion::Add1, Add1Options::default()),
            &mut NoProgress,
        )
        .unwrap();
        assert_eq!(res.winners.len(), 2);
    }
}
