//! Task descriptors, dependency edges and the annotated task node.
//!
//! This module provides:
//! - `TaskId`, the opaque identifier supplied by the extraction layer
//! - `Category`, the work category used as an ordering heuristic
//! - `TaskSpec` / `RawEdge`, the raw input shapes
//! - `TaskNode`, the in-graph record annotated by later pipeline stages

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::team::{MemberId, normalize_skill};

/// Opaque task identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Work category of a task.
///
/// Variants are declared in their natural project order; the derived `Ord`
/// is the rank used when breaking ties between equally-ready tasks.
/// Categories the extractor invents that are not listed here deserialize as
/// `Other` and rank last.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Research,
    Analysis,
    Architecture,
    Design,
    #[default]
    Implementation,
    Integration,
    Testing,
    Deployment,
    Operation,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Research => "research",
            Category::Analysis => "analysis",
            Category::Architecture => "architecture",
            Category::Design => "design",
            Category::Implementation => "implementation",
            Category::Integration => "integration",
            Category::Testing => "testing",
            Category::Deployment => "deployment",
            Category::Operation => "operation",
            Category::Other => "other",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "research" => Ok(Category::Research),
            "analysis" => Ok(Category::Analysis),
            "architecture" => Ok(Category::Architecture),
            "design" => Ok(Category::Design),
            "implementation" => Ok(Category::Implementation),
            "integration" => Ok(Category::Integration),
            "testing" => Ok(Category::Testing),
            "deployment" => Ok(Category::Deployment),
            "operation" => Ok(Category::Operation),
            "other" => Ok(Category::Other),
            _ => anyhow::bail!(
                "Invalid category '{}'. Valid values: research, analysis, architecture, design, implementation, integration, testing, deployment, operation, other",
                s
            ),
        }
    }
}

/// A task descriptor as delivered by the extraction layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub id: TaskId,
    /// Estimated effort (hours or days; the unit only has to be consistent)
    pub duration: f64,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub required_skills: Vec<String>,
}

impl TaskSpec {
    pub fn new(id: &str, duration: f64) -> Self {
        Self {
            id: TaskId::from(id),
            duration,
            category: Category::default(),
            required_skills: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.required_skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// One end of a raw dependency edge.
///
/// The extraction layer refers to tasks either by id or by their zero-based
/// position in the task list. Anything else (negative or fractional numbers,
/// objects, null, a missing field) lands in `Invalid` so the builder can drop
/// the edge instead of the whole request failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeEndpoint {
    Index(usize),
    Id(TaskId),
    Invalid(serde_json::Value),
}

impl Default for EdgeEndpoint {
    fn default() -> Self {
        Self::Invalid(serde_json::Value::Null)
    }
}

impl std::fmt::Display for EdgeEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeEndpoint::Index(i) => write!(f, "#{}", i),
            EdgeEndpoint::Id(id) => write!(f, "{}", id),
            EdgeEndpoint::Invalid(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for EdgeEndpoint {
    fn from(s: &str) -> Self {
        Self::Id(TaskId::from(s))
    }
}

impl From<usize> for EdgeEndpoint {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// Default strength for edges that omit it.
pub const DEFAULT_EDGE_STRENGTH: i64 = 5;

fn default_strength() -> i64 {
    DEFAULT_EDGE_STRENGTH
}

/// Accept any JSON number for strength; non-numeric values fall back to the default.
fn lenient_strength<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .unwrap_or(DEFAULT_EDGE_STRENGTH))
}

/// A dependency hint: `from_id` must finish before `to_id` starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    #[serde(default)]
    pub from_id: EdgeEndpoint,
    #[serde(default)]
    pub to_id: EdgeEndpoint,
    /// Informational weight, clamped to 1-10 when the graph is built
    #[serde(default = "default_strength", deserialize_with = "lenient_strength")]
    pub strength: i64,
}

impl RawEdge {
    pub fn new(from: impl Into<EdgeEndpoint>, to: impl Into<EdgeEndpoint>) -> Self {
        Self {
            from_id: from.into(),
            to_id: to.into(),
            strength: DEFAULT_EDGE_STRENGTH,
        }
    }

    pub fn with_strength(mut self, strength: i64) -> Self {
        self.strength = strength;
        self
    }
}

/// A task inside a planning graph.
///
/// Identity, duration, category and skills are fixed at build time. The
/// annotation fields are each written by exactly one stage: `phase` and
/// `due_date` by the phase allocator, `assignee` by the assignment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub duration: f64,
    pub category: Category,
    /// Normalised (trimmed, lowercase) skill tokens
    pub required_skills: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<MemberId>,
}

impl TaskNode {
    pub fn from_spec(spec: &TaskSpec) -> Self {
        Self {
            id: spec.id.clone(),
            duration: spec.duration,
            category: spec.category,
            required_skills: spec
                .required_skills
                .iter()
                .filter_map(|s| normalize_skill(s))
                .collect(),
            phase: None,
            due_date: None,
            assignee: None,
        }
    }
}
