// ********* Input data structures ***********

use snafu::prelude::*;
use std::str::FromStr;

/// A project that can be funded.
#[derive(PartialEq, Debug, Clone)]
pub struct Project {
    pub id: String,
    pub cost: f64,
    /// Human-readable name, when the input provides one.
    pub name: Option<String>,
}

/// A group of voters voting as one block. Its weight controls the share of the
/// group budget it receives.
#[derive(PartialEq, Debug, Clone)]
pub struct Group {
    pub id: String,
    pub weight: f64,
}

/// A score given by a voter (or a group) to a project.
#[derive(PartialEq, Debug, Clone)]
pub struct Score {
    pub supporter: String,
    pub project: String,
    pub score: f64,
}

/// A complete voting instance.
///
/// It is usually assembled with the [`crate::builder::Builder`], which checks
/// that all the references are valid.
#[derive(PartialEq, Debug, Clone)]
pub struct Instance {
    /// The budget declared by the instance itself.
    pub budget: f64,
    pub description: Option<String>,
    pub projects: Vec<Project>,
    /// The voters, in order of first appearance.
    pub voters: Vec<String>,
    pub votes: Vec<Score>,
    pub groups: Vec<Group>,
    pub group_votes: Vec<Score>,
}

// ******** Output data structures *********

/// Aggregate metrics about a set of winners.
#[derive(PartialEq, Debug, Clone)]
pub struct OutcomeStatistics {
    pub total_cost: f64,
    /// Average number of winning projects approved by a voter.
    pub avg_approved_projects: f64,
    pub avg_cost_of_winning_approved_projects: f64,
    /// Number of voters (value) that approve exactly `index` winning projects.
    pub utility_distribution: Vec<u64>,
}

/// Totals of the group and individual ledgers in weighted mode.
#[derive(PartialEq, Debug, Clone)]
pub struct SpendSummary {
    pub group_initial: f64,
    pub group_spent: f64,
    pub group_leftover: f64,
    pub individual_initial: f64,
    pub individual_spent: f64,
    pub individual_leftover: f64,
}

/// The report of the weighted groups + individuals mode.
///
/// All the per-supporter lists follow the order of the instance.
#[derive(PartialEq, Debug, Clone)]
pub struct WeightedReport {
    pub initial_group: Vec<(String, f64)>,
    pub leftover_group: Vec<(String, f64)>,
    pub initial_individual: Vec<(String, f64)>,
    pub leftover_individual: Vec<(String, f64)>,
    /// For every winner, the non-zero amounts paid by each group.
    pub spent_by_group_on_project: Vec<(String, Vec<(String, f64)>)>,
    /// For every winner, the non-zero amounts paid by each individual.
    pub spent_by_individual_on_project: Vec<(String, Vec<(String, f64)>)>,
    /// For every project, the sum paid by all the individuals.
    pub spent_by_all_individuals_on_project: Vec<(String, f64)>,
    /// For every project, the sum of the individual raw scores.
    pub all_individuals_score: Vec<(String, f64)>,
    /// For every winner, the sum of all the deductions.
    pub total_spent_per_project: Vec<(String, f64)>,
    pub stats: OutcomeStatistics,
    pub spend_summary: SpendSummary,
}

/// The report of the standard (fixed budget) mode.
#[derive(PartialEq, Debug, Clone)]
pub struct StandardReport {
    /// The initial budget of every voter for the final run.
    pub endowment: f64,
    /// For every project, the money held by its approvers each time it was evaluated.
    pub money_behind_candidate: Vec<(String, Vec<f64>)>,
    /// For every project, its effective vote count each time it was evaluated.
    pub effective_vote_count: Vec<(String, Vec<f64>)>,
    pub added_by_utilitarian_completion: Vec<String>,
    /// Set when the greedy outcome replaced the proportional one.
    pub comparison: Option<String>,
    pub stats: OutcomeStatistics,
    pub greedy_stats: OutcomeStatistics,
}

#[derive(PartialEq, Debug, Clone)]
pub enum Notes {
    Weighted(WeightedReport),
    Standard(StandardReport),
}

#[derive(PartialEq, Debug, Clone)]
pub struct AllocationResult {
    /// The funded projects, in order of selection.
    pub winners: Vec<String>,
    pub notes: Notes,
}

/// The outcome of comparing the allocation with the plain greedy method.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ComparisonOutcome {
    pub stick_to_allocator: bool,
    pub prefers_allocator: u64,
    pub prefers_greedy: u64,
}

/// Errors that prevent the computation from completing successfully.
#[derive(PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AllocationErrors {
    #[snafu(display("Unknown completion rule: {token}"))]
    UnknownCompletion { token: String },
    #[snafu(display("Unknown accuracy parameter: {token}"))]
    UnknownAccuracy { token: String },
    #[snafu(display("Unknown comparison: {token}"))]
    UnknownComparison { token: String },
    #[snafu(display("Unknown method: {token}"))]
    UnknownMethod { token: String },
    #[snafu(display("Unknown tie-breaking method: {token}"))]
    UnknownTieBreakRule { token: String },
    #[snafu(display("Unknown add1 option: {token}"))]
    UnknownAdd1Option { token: String },

    #[snafu(display("Duplicate project_id '{id}'"))]
    DuplicateProject { id: String },
    #[snafu(display("Unknown project '{id}'"))]
    UnknownProject { id: String },
    #[snafu(display("Duplicate group_id '{id}'"))]
    DuplicateGroup { id: String },
    #[snafu(display("group_id '{id}' not found"))]
    UnknownGroup { id: String },
    #[snafu(display("Invalid cost {cost} for project '{id}'"))]
    InvalidCost { id: String, cost: f64 },

    #[snafu(display("Tie-breaking failed in a way that shouldn't happen: {candidates:?}"))]
    TieBreakExhausted { candidates: Vec<String> },
    #[snafu(display("No candidate found but some remain: {remaining:?}"))]
    AllocatorStalled { remaining: Vec<String> },
    #[snafu(display("The computation ended without sending a result"))]
    WorkerDisconnected {},
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Method {
    /// The method of equal shares with a fixed budget per voter.
    Standard,
    /// The budget is split between groups and individuals.
    WeightedGroups,
}

/// How to complete the outcome of the standard method.
///
/// The `e` variants imply the `exhaustive` add1 option, the `u` variants apply
/// the utilitarian completion after the budget search.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Completion {
    None,
    Utilitarian,
    Add1,
    Add1E,
    Add1U,
    Add1EU,
}

impl Completion {
    pub fn uses_add1(&self) -> bool {
        matches!(
            self,
            Completion::Add1 | Completion::Add1E | Completion::Add1U | Completion::Add1EU
        )
    }

    pub fn uses_utilitarian(&self) -> bool {
        matches!(
            self,
            Completion::Utilitarian | Completion::Add1U | Completion::Add1EU
        )
    }

    pub fn implies_exhaustive(&self) -> bool {
        matches!(self, Completion::Add1E | Completion::Add1EU)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct Add1Options {
    /// Stop the search as soon as no other project fits in the budget.
    pub exhaustive: bool,
    /// Start from a budget that is a multiple of the number of voters.
    pub integral: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Comparison {
    None,
    Satisfaction,
    ExclusionRatio,
}

/// The arithmetic used by the fixed budget allocator.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Accuracy {
    Floats,
    Fractions,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TieBreakRule {
    /// Prefer the project with the most approvers.
    MaxVotes,
    MinCost,
    MaxCost,
    /// Prefer the first listed project.
    Priority(Vec<String>),
}

/// How ties are handled in the weighted groups mode.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum WeightedTieBreak {
    /// Take the first tied project in order of discovery, ignoring the rules.
    FirstFound,
    /// Apply the configured tie-breaking rules.
    Resolver,
}

#[derive(PartialEq, Debug, Clone)]
pub struct AllocationParams {
    /// The total budget. Zero (or less) means using the budget of the instance.
    pub total_budget: f64,
    /// The share of the budget given to groups, between 0 and 1.
    pub group_indi_ratio: f64,
    pub method: Method,
    pub completion: Completion,
    pub add1_options: Add1Options,
    pub comparison: Comparison,
    pub accuracy: Accuracy,
    pub tie_breaking: Vec<TieBreakRule>,
    pub weighted_tie_break: WeightedTieBreak,
}

impl AllocationParams {
    pub const DEFAULT_PARAMS: AllocationParams = AllocationParams {
        total_budget: 0.0,
        group_indi_ratio: 0.5,
        method: Method::Standard,
        completion: Completion::Add1U,
        add1_options: Add1Options {
            exhaustive: true,
            integral: true,
        },
        comparison: Comparison::None,
        accuracy: Accuracy::Floats,
        tie_breaking: Vec::new(),
        weighted_tie_break: WeightedTieBreak::FirstFound,
    };
}

impl Default for AllocationParams {
    fn default() -> Self {
        AllocationParams::DEFAULT_PARAMS
    }
}

impl FromStr for Method {
    type Err = AllocationErrors;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weightedGroups" => Ok(Method::WeightedGroups),
            "standard" | "" => Ok(Method::Standard),
            _ => UnknownMethodSnafu { token: s }.fail(),
        }
    }
}

impl FromStr for Completion {
    type Err = AllocationErrors;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Completion::None),
            "utilitarian" => Ok(Completion::Utilitarian),
            "add1" => Ok(Completion::Add1),
            "add1e" => Ok(Completion::Add1E),
            "add1u" => Ok(Completion::Add1U),
            "add1eu" => Ok(Completion::Add1EU),
            _ => UnknownCompletionSnafu { token: s }.fail(),
        }
    }
}

impl FromStr for Comparison {
    type Err = AllocationErrors;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Comparison::None),
            "satisfaction" => Ok(Comparison::Satisfaction),
            "exclusionRatio" => Ok(Comparison::ExclusionRatio),
            _ => UnknownComparisonSnafu { token: s }.fail(),
        }
    }
}

impl FromStr for Accuracy {
    type Err = AllocationErrors;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "floats" => Ok(Accuracy::Floats),
            "fractions" => Ok(Accuracy::Fractions),
            _ => UnknownAccuracySnafu { token: s }.fail(),
        }
    }
}

impl FromStr for TieBreakRule {
    type Err = AllocationErrors;
    /// Parses one of the named rules. Priority lists are built directly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "maxVotes" => Ok(TieBreakRule::MaxVotes),
            "minCost" => Ok(TieBreakRule::MinCost),
            "maxCost" => Ok(TieBreakRule::MaxCost),
            _ => UnknownTieBreakRuleSnafu { token: s }.fail(),
        }
    }
}

impl FromStr for WeightedTieBreak {
    type Err = AllocationErrors;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firstFound" => Ok(WeightedTieBreak::FirstFound),
            "resolver" => Ok(WeightedTieBreak::Resolver),
            _ => UnknownTieBreakRuleSnafu { token: s }.fail(),
        }
    }
}

impl Add1Options {
    /// Reads a list of option names such as `["exhaustive", "integral"]`.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Add1Options, AllocationErrors> {
        let mut res = Add1Options::default();
        for t in tokens {
            match t.as_ref().trim() {
                "exhaustive" => res.exhaustive = true,
                "integral" => res.integral = true,
                "" => {}
                x => return UnknownAdd1OptionSnafu { token: x }.fail(),
            }
        }
        Ok(res)
    }
}
