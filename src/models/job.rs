use serde::{Deserialize, Serialize};

use crate::models::candidate::Candidate;
use crate::models::stage::{Stage, StageDefinition};

/// A pipeline entry: one job and the candidates moving through its funnel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub client_name: Option<String>,
    pub stages: Vec<StageDefinition>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageColumn<'a> {
    pub stage: Stage,
    pub candidates: Vec<&'a Candidate>,
}

impl Job {
    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    /// Definition for `stage`, falling back to the built-in one when the
    /// pipeline does not list it.
    pub fn stage_definition(&self, stage: Stage) -> StageDefinition {
        self.stages
            .iter()
            .find(|def| def.stage == stage)
            .cloned()
            .unwrap_or_else(|| StageDefinition::new(stage))
    }

    pub fn candidates_in_stage(&self, stage: Stage) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |c| c.current_stage == stage)
    }

    /// Candidates grouped into columns, one per stage, in funnel order.
    pub fn board(&self) -> Vec<StageColumn<'_>> {
        let mut stages: Vec<Stage> = self.stages.iter().map(|def| def.stage).collect();
        for candidate in &self.candidates {
            if !stages.contains(&candidate.current_stage) {
                stages.push(candidate.current_stage);
            }
        }
        stages.sort();
        stages.dedup();

        stages
            .into_iter()
            .map(|stage| StageColumn {
                stage,
                candidates: self.candidates_in_stage(stage).collect(),
            })
            .collect()
    }

    pub fn stage_counts(&self) -> Vec<(Stage, usize)> {
        self.board()
            .into_iter()
            .map(|column| (column.stage, column.candidates.len()))
            .collect()
    }

    /// Case-insensitive match on name, email or location. A blank query returns everyone.
    pub fn search(&self, query: &str) -> Vec<&Candidate> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.candidates.iter().collect();
        }
        self.candidates.iter().filter(|c| c.matches(&needle)).collect()
    }
}
