// src/comparison.rs
//
// Normalized comparison result, the shape the review screen renders.

use serde::Serialize;
use std::fmt;

/// Named stage of a technique performance. Declaration order is the
/// canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Preparation,
    SwingAndContact,
    FollowThrough,
}

impl Phase {
    pub const CANONICAL: [Phase; 3] = [
        Phase::Preparation,
        Phase::SwingAndContact,
        Phase::FollowThrough,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparation => "preparation",
            Self::SwingAndContact => "swing-and-contact",
            Self::FollowThrough => "follow-through",
        }
    }

    /// Position in the canonical order; also the index of the sample
    /// point this phase is anchored to.
    pub fn index(&self) -> usize {
        match self {
            Self::Preparation => 0,
            Self::SwingAndContact => 1,
            Self::FollowThrough => 2,
        }
    }

    /// Match a service phase key, ignoring case and separators
    /// (`swing-and-contact`, `swing_and_contact`, `swingAndContact`).
    pub fn from_key(key: &str) -> Option<Self> {
        let folded: String = key
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match folded.as_str() {
            "preparation" => Some(Self::Preparation),
            "swingandcontact" => Some(Self::SwingAndContact),
            "followthrough" => Some(Self::FollowThrough),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorAnalysis {
    pub timestamp_seconds: f64,
    pub analysis: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// 0–10; only the subject is scored against the reference
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseComparison {
    pub phase: Phase,
    pub reference: ActorAnalysis,
    pub subject: ActorAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Drill {
    pub title: String,
    pub description: String,
    pub practice_sets: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub recommendation: String,
    pub drill: Option<Drill>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub summary: String,
    pub overall_score: Option<f64>,
    /// Canonical order, only phases the service reported
    pub phases: Vec<PhaseComparison>,
    pub recommendations: Vec<Recommendation>,
}

impl ComparisonResult {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseComparison> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.phase.as_str()).collect()
    }
}
