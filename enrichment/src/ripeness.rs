//! Ripeness: a 0..1 readiness-for-action score built from five weighted
//! factors. Each weight is the upper bound of its factor and the total is
//! capped at 1.

use std::collections::{BTreeMap, HashSet};

use bt_core::{Beat, RipenessBreakdown, ViewStat};
use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Factor weights. Each is the maximum contribution of its factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RipenessWeights {
    pub age: f64,
    pub revisit: f64,
    pub connection: f64,
    pub action: f64,
    pub completeness: f64
}

impl Default for RipenessWeights {
    fn default() -> Self {
        Self {
            age: 0.20,
            revisit: 0.25,
            connection: 0.25,
            action: 0.20,
            completeness: 0.10
        }
    }
}

/// Saturation points for the individual factors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RipenessLimits {
    pub age_days: f64,
    pub views: f64,
    pub connections: f64,
    pub related_beats_cap: usize,
    pub action_matches: f64,
    pub long_content_chars: usize
}

impl Default for RipenessLimits {
    fn default() -> Self {
        Self {
            age_days: 30.0,
            views: 5.0,
            connections: 3.0,
            related_beats_cap: 5,
            action_matches: 3.0,
            long_content_chars: 100
        }
    }
}

pub fn default_action_patterns() -> Vec<String> {
    [
        "should",
        "need to",
        "must",
        "will",
        "plan to",
        "implement",
        "build",
        "create",
        "fix",
        "add",
        "todo",
        "action",
        "next step",
        "follow up",
        "want to",
        "going to",
        "have to",
        "try to"
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

#[derive(Debug, Clone)]
pub struct RipenessScorer {
    weights: RipenessWeights,
    limits: RipenessLimits,
    action_patterns: Vec<String>
}

impl Default for RipenessScorer {
    fn default() -> Self {
        Self::new(
            RipenessWeights::default(),
            RipenessLimits::default(),
            default_action_patterns()
        )
    }
}

impl RipenessScorer {
    pub fn new(
        weights: RipenessWeights,
        limits: RipenessLimits,
        action_patterns: Vec<String>
    ) -> Self {
        Self {
            weights,
            limits,
            action_patterns
        }
    }

    /// Score one beat against the corpus it belongs to.
    ///
    /// The connection factor scans every other beat's entity list; use
    /// [`RipenessScorer::score_all`] when scoring a whole corpus.
    pub fn score(
        &self,
        beat: &Beat,
        all_beats: &[Beat],
        view_stat: &ViewStat,
        now: DateTime<Utc>
    ) -> RipenessBreakdown {
        let corpus = EntityCorpus::new(all_beats);
        self.score_with(beat, &corpus, view_stat, now)
    }

    /// Total score for every beat, keyed by beat id. Missing view stats
    /// count as never viewed.
    pub fn score_all(
        &self,
        beats: &[Beat],
        view_stats: &BTreeMap<String, ViewStat>,
        now: DateTime<Utc>
    ) -> BTreeMap<String, f64> {
        let corpus = EntityCorpus::new(beats);
        let unviewed = ViewStat::default();
        beats
            .iter()
            .map(|beat| {
                let stat = view_stats.get(&beat.id).unwrap_or(&unviewed);
                (beat.id.clone(), self.score_with(beat, &corpus, stat, now).total)
            })
            .collect()
    }

    fn score_with(
        &self,
        beat: &Beat,
        corpus: &EntityCorpus,
        view_stat: &ViewStat,
        now: DateTime<Utc>
    ) -> RipenessBreakdown {
        let age = self.age_factor(beat.created_at, now);
        let revisit = self.revisit_factor(view_stat.view_count);
        let connection = self.connection_factor(beat, corpus);
        let action = self.action_language(&beat.content) * self.weights.action;
        let completeness = self.completeness(beat) * self.weights.completeness;

        let total = (age + revisit + connection + action + completeness).min(1.0);

        RipenessBreakdown {
            total,
            age,
            revisit,
            connection,
            action,
            completeness
        }
    }

    pub fn age_factor(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let days = ((now - created_at).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0);
        (days / self.limits.age_days).min(1.0) * self.weights.age
    }

    pub fn revisit_factor(&self, view_count: u32) -> f64 {
        (f64::from(view_count) / self.limits.views).min(1.0) * self.weights.revisit
    }

    fn connection_factor(&self, beat: &Beat, corpus: &EntityCorpus) -> f64 {
        let related = corpus
            .related_beats(&beat.id)
            .min(self.limits.related_beats_cap);
        let connections = beat.linked_beads.len() + related;
        (connections as f64 / self.limits.connections).min(1.0) * self.weights.connection
    }

    /// Fraction (0..1) of the action saturation point reached by distinct
    /// action phrases in the content.
    pub fn action_language(&self, content: &str) -> f64 {
        let lower = content.to_lowercase();
        let matches = self
            .action_patterns
            .iter()
            .filter(|p| lower.contains(p.as_str()))
            .count();
        (matches as f64 / self.limits.action_matches).min(1.0)
    }

    /// Unweighted completeness in 0..1.
    pub fn completeness(&self, beat: &Beat) -> f64 {
        let mut score = 0.0;
        if !beat.entities.is_empty() {
            score += 0.2;
        }
        if beat.impetus.has_meaningful_label() {
            score += 0.3;
        }
        if !beat.references.is_empty() {
            score += 0.2;
        }
        if !beat.linked_beads.is_empty() {
            score += 0.2;
        }
        if beat.content.chars().count() > self.limits.long_content_chars {
            score += 0.1;
        }
        f64::min(score, 1.0)
    }
}

/// Lowercased explicit entity names per beat, for overlap counting.
struct EntityCorpus {
    beats: Vec<(String, HashSet<String>)>
}

impl EntityCorpus {
    fn new(beats: &[Beat]) -> Self {
        let beats = beats
            .iter()
            .map(|b| {
                let names = b.entities.iter().map(|e| e.to_lowercase()).collect();
                (b.id.clone(), names)
            })
            .collect();
        Self { beats }
    }

    /// Number of other beats sharing at least one entity name with `beat_id`.
    fn related_beats(&self, beat_id: &str) -> usize {
        let Some((_, own)) = self.beats.iter().find(|(id, _)| id == beat_id) else {
            return 0;
        };
        if own.is_empty() {
            return 0;
        }
        self.beats
            .iter()
            .filter(|(id, names)| id != beat_id && !names.is_disjoint(own))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_core::{Impetus, RipenessTier};
    use chrono::Duration;

    fn beat(id: &str, content: &str, created_at: DateTime<Utc>) -> Beat {
        Beat {
            id: id.to_string(),
            created_at,
            updated_at: created_at,
            impetus: Impetus {
                label: "manual entry".to_string(),
                ..Impetus::default()
            },
            content: content.to_string(),
            entities: vec![],
            references: vec![],
            linked_beads: vec![]
        }
    }

    #[test]
    fn test_stale_actionable_beat_is_maturing() {
        let now = Utc::now();
        let b = beat(
            "b1",
            "I should implement the retry logic and fix the timeout bug",
            now - Duration::days(40)
        );
        let scorer = RipenessScorer::default();
        let r = scorer.score(&b, std::slice::from_ref(&b), &ViewStat::default(), now);

        assert!((r.age - 0.20).abs() < 1e-9);
        assert_eq!(r.revisit, 0.0);
        assert_eq!(r.connection, 0.0);
        assert!((r.action - 0.20).abs() < 1e-9);
        assert!(r.completeness < 0.02);
        assert!((r.total - 0.40).abs() < 0.02);
        assert_eq!(r.tier(), RipenessTier::Maturing);
    }

    #[test]
    fn test_age_saturates_at_thirty_days() {
        let scorer = RipenessScorer::default();
        let now = Utc::now();
        let f15 = scorer.age_factor(now - Duration::days(15), now);
        let f30 = scorer.age_factor(now - Duration::days(30), now);
        let f90 = scorer.age_factor(now - Duration::days(90), now);
        assert!((f15 - 0.10).abs() < 1e-9);
        assert!((f30 - 0.20).abs() < 1e-9);
        assert_eq!(f30, f90);
        assert_eq!(scorer.age_factor(now + Duration::days(1), now), 0.0);
    }

    #[test]
    fn test_revisit_saturates_at_five_views() {
        let scorer = RipenessScorer::default();
        assert_eq!(scorer.revisit_factor(0), 0.0);
        assert!((scorer.revisit_factor(5) - 0.25).abs() < 1e-9);
        assert_eq!(scorer.revisit_factor(5), scorer.revisit_factor(50));
    }

    #[test]
    fn test_connection_counts_distinct_related_beats() {
        let now = Utc::now();
        let mut a = beat("a", "", now);
        a.entities = vec!["Rust".to_string(), "Tokio".to_string()];
        let mut b = beat("b", "", now);
        b.entities = vec!["rust".to_string(), "tokio".to_string()];
        let mut c = beat("c", "", now);
        c.entities = vec!["TOKIO".to_string()];
        let d = beat("d", "", now);
        let beats = vec![a.clone(), b, c, d];

        let scorer = RipenessScorer::default();
        let r = scorer.score(&a, &beats, &ViewStat::default(), now);
        // two related beats out of a saturation point of three
        assert!((r.connection - 0.25 * 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_linked_beads_and_completeness() {
        let now = Utc::now();
        let mut b = beat("b", &"x".repeat(120), now);
        b.impetus.label = "GitHub issue".to_string();
        b.linked_beads = vec!["bd-1".to_string(), "bd-2".to_string(), "bd-3".to_string()];
        b.references = vec!["https://example.com".to_string()];
        b.entities = vec!["GitHub".to_string()];

        let scorer = RipenessScorer::default();
        let r = scorer.score(&b, std::slice::from_ref(&b), &ViewStat::default(), now);
        assert!((r.connection - 0.25).abs() < 1e-9);
        assert!((r.completeness - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_score_all_uses_view_stats() {
        let now = Utc::now();
        let beats = vec![beat("a", "", now), beat("b", "", now)];
        let mut stats = BTreeMap::new();
        stats.insert(
            "a".to_string(),
            ViewStat {
                view_count: 5,
                last_viewed_at: Some(now)
            }
        );
        let scores = RipenessScorer::default().score_all(&beats, &stats, now);
        assert!((scores["a"] - 0.25).abs() < 1e-6);
        assert!(scores["b"] < 1e-6);
    }

    #[test]
    fn test_total_is_capped() {
        let now = Utc::now();
        let mut b = beat(
            "b",
            "should need to must will plan to implement build create fix add",
            now - Duration::days(365)
        );
        b.linked_beads = vec!["1".into(), "2".into(), "3".into()];
        b.impetus.label = "Research".to_string();
        let stat = ViewStat {
            view_count: 10,
            last_viewed_at: None
        };
        let r = RipenessScorer::default().score(&b, std::slice::from_ref(&b), &stat, now);
        assert!(r.total <= 1.0);
        assert!(r.age + r.revisit + r.connection + r.action + r.completeness > 0.9);
    }
}
