//! Team roster types for the assignment engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque member identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MemberId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalise a skill token: trimmed and lowercased. Blank tokens are dropped.
pub fn normalize_skill(skill: &str) -> Option<String> {
    let token = skill.trim().to_lowercase();
    if token.is_empty() { None } else { Some(token) }
}

/// A team member as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberSpec {
    pub id: MemberId,
    #[serde(default)]
    pub skills: Vec<String>,
    pub capacity_per_period: f64,
}

impl MemberSpec {
    pub fn new(id: &str, skills: &[&str], capacity_per_period: f64) -> Self {
        Self {
            id: MemberId::from(id),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            capacity_per_period,
        }
    }
}

/// A member during one assignment walk.
///
/// `current_load` is the only mutable accumulator in the engine and is only
/// touched by [`crate::plan::assign::AssignmentEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: MemberId,
    pub skills: BTreeSet<String>,
    pub capacity_per_period: f64,
    pub current_load: f64,
}

impl Member {
    pub fn from_spec(spec: &MemberSpec) -> Self {
        Self {
            id: spec.id.clone(),
            skills: spec
                .skills
                .iter()
                .filter_map(|s| normalize_skill(s))
                .collect(),
            capacity_per_period: spec.capacity_per_period,
            current_load: 0.0,
        }
    }

    /// Capacity left this period, never negative.
    pub fn available_capacity(&self) -> f64 {
        (self.capacity_per_period - self.current_load).max(0.0)
    }

    /// Fraction of `required` this member possesses. Zero when nothing is required.
    pub fn skill_overlap_ratio(&self, required: &BTreeSet<String>) -> f64 {
        if required.is_empty() {
            return 0.0;
        }
        let matched = required.intersection(&self.skills).count();
        matched as f64 / required.len() as f64
    }
}
