//! Final ranked vote of an event.

use serde::{Deserialize, Serialize};

use crate::ids::{CriterionId, OptionId};

/// One user's ballot: chosen option plus criteria ranked by importance.
///
/// Always created or replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalVote {
    pub option_id: OptionId,
    pub criterion_order: Vec<CriterionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: OptionId,
    pub vote_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionScore {
    pub criterion_id: CriterionId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalVoteResult {
    #[serde(default)]
    pub option_ranking: Vec<OptionTally>,
    #[serde(default)]
    pub criterion_ranking: Vec<CriterionScore>,
    #[serde(default)]
    pub voter_count: u32,
}
