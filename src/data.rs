use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// Type aliases for clarity
pub type StudentId = String;

/// Retry budget used when only size-based grouping is requested.
pub const BASIC_ATTEMPTS: u32 = 1;
/// Retry budget used when any balancing or separation rule is active.
pub const ADVANCED_ATTEMPTS: u32 = 32;

/// Gender category, used only for balance scoring.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Gender {
    Female,
    Male,
    NonBinary,
    #[default]
    #[serde(other)]
    Unspecified,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::NonBinary => "non-binary",
            Gender::Unspecified => "unspecified",
        };
        f.write_str(label)
    }
}

/// Lightweight projection of a student, as seen by the engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: StudentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub needs_help: bool,
    #[serde(default)]
    pub is_support_partner: bool,
    /// Students this one must not share a group with.
    #[serde(default, rename = "separationIDs", alias = "separationIds")]
    pub separation_ids: BTreeSet<StudentId>,
}

impl StudentRecord {
    pub fn new(id: impl Into<StudentId>, name: impl Into<String>, gender: Gender) -> Self {
        StudentRecord {
            id: id.into(),
            name: name.into(),
            gender,
            needs_help: false,
            is_support_partner: false,
            separation_ids: BTreeSet::new(),
        }
    }

    pub fn needing_help(mut self) -> Self {
        self.needs_help = true;
        self
    }

    pub fn support_partner(mut self) -> Self {
        self.is_support_partner = true;
        self
    }

    pub fn separated_from<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StudentId>,
    {
        self.separation_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// A student flagged both ways counts as needing help.
    pub fn role(&self) -> Role {
        if self.needs_help {
            Role::NeedsHelp
        } else if self.is_support_partner {
            Role::SupportPartner
        } else {
            Role::Regular
        }
    }
}

/// Role of a student with respect to the pairing objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    NeedsHelp,
    SupportPartner,
    Regular,
}

/// Tunable objectives for one generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupingOptions {
    pub balance_gender: bool,
    pub balance_ability: bool,
    pub pair_support_partners: bool,
    pub respect_separations: bool,
    /// Retry budget; `None` picks [`GroupingOptions::recommended_attempts`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// Seed for tie-break randomness.
    pub seed: u64,
}

impl GroupingOptions {
    pub fn has_advanced_rules(&self) -> bool {
        self.balance_gender
            || self.balance_ability
            || self.pair_support_partners
            || self.respect_separations
    }

    pub fn recommended_attempts(&self) -> u32 {
        if self.has_advanced_rules() {
            ADVANCED_ATTEMPTS
        } else {
            BASIC_ATTEMPTS
        }
    }

    /// Attempts the orchestrator will actually run, never below one.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts
            .unwrap_or_else(|| self.recommended_attempts())
            .max(1)
    }
}

/// How much relaxation was needed to produce the returned grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    Strict,
    RelaxedConstraints,
    ForcedPlacement,
    Failed,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Strict => "strict",
            Strategy::RelaxedConstraints => "relaxedConstraints",
            Strategy::ForcedPlacement => "forcedPlacement",
            Strategy::Failed => "failed",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes an objective that was not met in the returned grouping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetObjective {
    pub objective_type: String,
    pub description: String,
}

impl fmt::Display for UnmetObjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.objective_type, self.description)
    }
}

/// The final output of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingResult {
    pub groups: Vec<Vec<StudentId>>,
    pub strategy: Strategy,
    pub separation_conflicts: usize,
    pub unassigned_count: usize,
    pub attempts: u32,
    pub unmet_objectives: Vec<UnmetObjective>,
}

impl GroupingResult {
    pub fn empty() -> Self {
        GroupingResult {
            groups: Vec::new(),
            strategy: Strategy::Strict,
            separation_conflicts: 0,
            unassigned_count: 0,
            attempts: 0,
            unmet_objectives: Vec::new(),
        }
    }

    /// True when the caller should word the outcome as a warning or failure.
    pub fn is_degraded(&self) -> bool {
        match self.strategy {
            Strategy::Strict => false,
            Strategy::RelaxedConstraints => self.separation_conflicts > 0,
            Strategy::ForcedPlacement | Strategy::Failed => true,
        }
    }
}

/// Request body of the generate endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingRequest {
    pub students: Vec<StudentRecord>,
    pub preferred_group_size: usize,
    #[serde(default)]
    pub options: GroupingOptions,
    /// Legacy id -> canonical id.
    #[serde(default)]
    pub aliases: BTreeMap<String, StudentId>,
}
