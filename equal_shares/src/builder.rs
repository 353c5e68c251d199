pub use crate::config::*;

use snafu::prelude::*;
use std::collections::{HashMap, HashSet};

/// A builder for assembling a voting instance.
///
/// All the references are checked as they are added: votes must point to
/// declared projects, group votes to declared groups and projects.
///
/// ```
/// pub use equal_shares::builder::Builder;
/// # use equal_shares::AllocationErrors;
///
/// let mut builder = Builder::new(100.0);
/// builder.project("park", 60.0)?;
/// builder.project("library", 50.0)?;
///
/// builder.approve("alice", &["park"])?;
/// builder.add_vote("bob", "library", 1.0)?;
///
/// assert!(builder.add_vote("bob", "pool", 1.0).is_err());
///
/// let instance = builder.build();
/// assert_eq!(instance.voters, vec!["alice".to_string(), "bob".to_string()]);
///
/// # Ok::<(), AllocationErrors>(())
/// ```
pub struct Builder {
    pub(crate) _budget: f64,
    pub(crate) _description: Option<String>,
    pub(crate) _projects: Vec<Project>,
    pub(crate) _voters: Vec<String>,
    pub(crate) _votes: Vec<Score>,
    pub(crate) _groups: Vec<Group>,
    pub(crate) _group_votes: Vec<Score>,
    project_ids: HashSet<String>,
    group_ids: HashSet<String>,
    voter_ids: HashSet<String>,
    // (voter, project) -> position in _votes
    vote_positions: HashMap<(String, String), usize>,
    group_vote_positions: HashMap<(String, String), usize>,
}

impl Builder {
    pub fn new(budget: f64) -> Builder {
        Builder {
            _budget: budget,
            _description: None,
            _projects: Vec::new(),
            _voters: Vec::new(),
            _votes: Vec::new(),
            _groups: Vec::new(),
            _group_votes: Vec::new(),
            project_ids: HashSet::new(),
            group_ids: HashSet::new(),
            voter_ids: HashSet::new(),
            vote_positions: HashMap::new(),
            group_vote_positions: HashMap::new(),
        }
    }

    pub fn description(mut self, description: &str) -> Builder {
        self._description = Some(description.to_string());
        self
    }

    pub fn project(&mut self, id: &str, cost: f64) -> Result<(), AllocationErrors> {
        self.add_project(&Project {
            id: id.to_string(),
            cost,
            name: None,
        })
    }

    pub fn add_project(&mut self, project: &Project) -> Result<(), AllocationErrors> {
        ensure!(
            project.cost.is_finite() && project.cost >= 0.0,
            InvalidCostSnafu {
                id: project.id.clone(),
                cost: project.cost
            }
        );
        ensure!(
            self.project_ids.insert(project.id.clone()),
            DuplicateProjectSnafu {
                id: project.id.clone()
            }
        );
        self._projects.push(project.clone());
        Ok(())
    }

    /// Adds a score from a voter to a project.
    ///
    /// A voter approves a project if the score is positive. A second score for
    /// the same pair replaces the first one.
    pub fn add_vote(&mut self, voter: &str, project: &str, score: f64) -> Result<(), AllocationErrors> {
        ensure!(
            self.project_ids.contains(project),
            UnknownProjectSnafu { id: project }
        );
        if self.voter_ids.insert(voter.to_string()) {
            self._voters.push(voter.to_string());
        }
        let key = (voter.to_string(), project.to_string());
        if let Some(&pos) = self.vote_positions.get(&key) {
            self._votes[pos].score = score;
        } else {
            self.vote_positions.insert(key, self._votes.len());
            self._votes.push(Score {
                supporter: voter.to_string(),
                project: project.to_string(),
                score,
            });
        }
        Ok(())
    }

    /// Approval ballot: a score of 1 for each of the projects.
    pub fn approve(&mut self, voter: &str, projects: &[&str]) -> Result<(), AllocationErrors> {
        for p in projects {
            self.add_vote(voter, p, 1.0)?;
        }
        Ok(())
    }

    pub fn group(&mut self, id: &str, weight: f64) -> Result<(), AllocationErrors> {
        ensure!(
            self.group_ids.insert(id.to_string()),
            DuplicateGroupSnafu { id }
        );
        self._groups.push(Group {
            id: id.to_string(),
            weight,
        });
        Ok(())
    }

    pub fn add_group_vote(
        &mut self,
        group: &str,
        project: &str,
        score: f64,
    ) -> Result<(), AllocationErrors> {
        ensure!(self.group_ids.contains(group), UnknownGroupSnafu { id: group });
        ensure!(
            self.project_ids.contains(project),
            UnknownProjectSnafu { id: project }
        );
        let key = (group.to_string(), project.to_string());
        if let Some(&pos) = self.group_vote_positions.get(&key) {
            self._group_votes[pos].score = score;
        } else {
            self.group_vote_positions.insert(key, self._group_votes.len());
            self._group_votes.push(Score {
                supporter: group.to_string(),
                project: project.to_string(),
                score,
            });
        }
        Ok(())
    }

    pub fn has_groups(&self) -> bool {
        !self._groups.is_empty()
    }

    pub fn build(self) -> Instance {
        Instance {
            budget: self._budget,
            description: self._description,
            projects: self._projects,
            voters: self._voters,
            votes: self._votes,
            groups: self._groups,
            group_votes: self._group_votes,
        }
    }
}
