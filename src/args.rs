use clap::Parser;

/// This is a participatory budgeting program using the method of equal shares.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The instance to allocate, in the PaBuLib format (sections META, PROJECTS, VOTES
    /// and optionally GROUPS and GROUP_VOTES).
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path, optional) A JSON file with the parameters of the computation. All the fields
    /// are optional, see the manual for the list.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the outcome in JSON format. If provided, eqshares will
    /// check that the computed output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the result will be written in JSON format to the given
    /// location. By default, it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (key=value, repeated) Overrides a parameter, for example `--set completion=add1e`. Lists are
    /// separated by commas, and the project ids of a priority list by '|'.
    #[clap(long, value_parser)]
    pub set: Vec<String>,

    /// (number) Shortcut for `--set totalBudget=...`.
    #[clap(long, value_parser)]
    pub budget: Option<f64>,

    /// (standard or weightedGroups) Shortcut for `--set method=...`.
    #[clap(long, value_parser)]
    pub method: Option<String>,

    /// (none, utilitarian, add1, add1e, add1u, add1eu) Shortcut for `--set completion=...`.
    #[clap(long, value_parser)]
    pub completion: Option<String>,

    /// (floats or fractions) Shortcut for `--set accuracy=...`.
    #[clap(long, value_parser)]
    pub accuracy: Option<String>,

    /// (none, satisfaction or exclusionRatio) Shortcut for `--set comparison=...`.
    #[clap(long, value_parser)]
    pub comparison: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

impl Args {
    /// All the overrides, the shortcuts coming after the `--set` ones.
    pub fn overrides(&self) -> Vec<(String, String)> {
        let mut res: Vec<(String, String)> = Vec::new();
        for s in self.set.iter() {
            match s.split_once('=') {
                Some((k, v)) => res.push((k.trim().to_string(), v.trim().to_string())),
                None => res.push((s.trim().to_string(), String::new())),
            }
        }
        let shortcuts = [
            ("totalBudget", self.budget.map(|b| b.to_string())),
            ("method", self.method.clone()),
            ("completion", self.completion.clone()),
            ("accuracy", self.accuracy.clone()),
            ("comparison", self.comparison.clone()),
        ];
        for (k, v) in shortcuts {
            if let Some(x) = v {
                res.push((k.to_string(), x));
            }
        }
        res
    }
}
