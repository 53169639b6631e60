// src/normalizer.rs
//
// Raw service response → ComparisonResult.
//
// Pure: no I/O, no clock. Phases come out in canonical order whatever
// order the service used, optional lists become empty lists, scores are
// clamped to [0, 10]. A phase timestamp the service leaves out falls
// back to the sample point of the same index.

use crate::analysis_client::{RawActorAnalysis, RawComparisonResponse, RawRecommendation};
use crate::comparison::{
    ActorAnalysis, ComparisonResult, Drill, Phase, PhaseComparison, Recommendation,
};
use serde_json::Value;
use tracing::warn;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Absolute seconds sampled from each recording, by sample index.
#[derive(Debug, Clone, Copy)]
pub struct PhaseAnchors<'a> {
    pub reference: &'a [f64],
    pub subject: &'a [f64],
}

pub fn normalize(raw: RawComparisonResponse, anchors: PhaseAnchors<'_>) -> ComparisonResult {
    let mut keys: Vec<&String> = raw.comparison.keys().collect();
    keys.sort();

    for key in &keys {
        if Phase::from_key(key).is_none() {
            warn!("Ignoring unknown phase `{}` in analysis response", key);
        }
    }

    let phases = Phase::CANONICAL
        .iter()
        .filter_map(|&phase| {
            // First matching key in sorted order, so duplicates resolve deterministically
            let entry = keys
                .iter()
                .find(|key| Phase::from_key(key) == Some(phase))
                .map(|key| &raw.comparison[key.as_str()])?;

            let reference_anchor = anchors.reference.get(phase.index()).copied();
            let subject_anchor = anchors.subject.get(phase.index()).copied();

            let mut reference = actor(entry.reference.as_ref(), reference_anchor);
            reference.score = None;
            let subject = actor(entry.subject.as_ref(), subject_anchor);

            Some(PhaseComparison {
                phase,
                reference,
                subject,
            })
        })
        .collect();

    let recommendations = raw
        .recommendations_for_subject
        .unwrap_or_default()
        .into_iter()
        .filter_map(recommendation)
        .collect();

    ComparisonResult {
        summary: raw.summary,
        overall_score: raw.overall_score_for_subject.and_then(clamp_score),
        phases,
        recommendations,
    }
}

pub fn clamp_score(score: f64) -> Option<f64> {
    score.is_finite().then(|| score.clamp(MIN_SCORE, MAX_SCORE))
}

fn actor(raw: Option<&RawActorAnalysis>, anchor: Option<f64>) -> ActorAnalysis {
    let raw = raw.cloned().unwrap_or_default();

    let timestamp_seconds = raw
        .timestamp
        .filter(|t| t.is_finite() && *t >= 0.0)
        .or(anchor)
        .unwrap_or(0.0);

    ActorAnalysis {
        timestamp_seconds,
        analysis: raw.analysis.unwrap_or_default(),
        strengths: raw.strengths.unwrap_or_default(),
        weaknesses: raw.weaknesses.unwrap_or_default(),
        score: raw.score.and_then(clamp_score),
    }
}

fn recommendation(raw: RawRecommendation) -> Option<Recommendation> {
    let drill = raw.drill.map(|d| Drill {
        title: d.title.unwrap_or_default(),
        description: d.description.unwrap_or_default(),
        practice_sets: d.practice_sets.and_then(practice_sets_text),
    });

    let text = raw.recommendation.unwrap_or_default();
    if text.trim().is_empty() && drill.is_none() {
        return None;
    }

    Some(Recommendation {
        recommendation: text,
        drill,
    })
}

fn practice_sets_text(value: Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}
