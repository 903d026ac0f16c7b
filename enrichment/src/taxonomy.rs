//! Keyword-driven taxonomy classification.
//!
//! Channels score +3 per pattern found in the impetus label and +1 per
//! pattern found in the content. Sources prefer an explicit
//! `impetus.meta["channel"]` and otherwise score +2 per label match. Ties go
//! to the entry declared first in the pattern tables.

use std::collections::BTreeMap;

use bt_core::{Beat, Channel, Source, Taxonomy};
use serde::Serialize;

const BASE_CONFIDENCE: f64 = 0.3;
const LABEL_CONFIDENCE: f64 = 0.3;
const CHANNEL_CONFIDENCE: f64 = 0.2;
const SOURCE_CONFIDENCE: f64 = 0.2;

/// Keyword tables used by the classifier. Order matters: it decides ties.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyPatterns {
    pub channels: Vec<(Channel, Vec<String>)>,
    pub sources: Vec<(Source, Vec<String>)>,
    /// Lowercased `meta["channel"]` values mapped straight to a source
    pub meta_channels: BTreeMap<String, Source>
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for TaxonomyPatterns {
    fn default() -> Self {
        let channels = vec![
            (
                Channel::Coaching,
                words(&["coaching", "nick", "mentor", "insight from", "advice", "guidance", "feedback"])
            ),
            (
                Channel::Research,
                words(&["research", "study", "paper", "investigation", "analysis", "exploring", "learned"])
            ),
            (
                Channel::Discovery,
                words(&["discovery", "found", "discovered", "stumbled", "noticed", "came across", "interesting"])
            ),
            (
                Channel::Development,
                words(&[
                    "development",
                    "built",
                    "implemented",
                    "code",
                    "programming",
                    "shipped",
                    "deployed",
                    "refactor"
                ])
            ),
            (
                Channel::Reflection,
                words(&["reflection", "thinking", "realized", "synthesis", "pondering", "contemplating", "insight"])
            ),
            (
                Channel::Reference,
                words(&["reference", "bookmark", "save", "purchase", "reminder", "note to self", "later"])
            ),
            (
                Channel::Milestone,
                words(&["milestone", "complete", "shipped", "published", "finished", "achieved", "launched"])
            ),
        ];

        let sources = vec![
            (
                Source::Conversation,
                words(&["coaching", "call", "chat", "conversation", "meeting", "discussion", "talked"])
            ),
            (Source::Web, words(&["web", "article", "blog", "site", "http", "url", "link"])),
            (Source::Twitter, words(&["twitter", "x discovery", "tweet", "@", "x.com"])),
            (Source::GitHub, words(&["github", "repo", "issue", "pr", "pull request", "commit"])),
            (Source::Book, words(&["book", "reading", "chapter", "author", "page"])),
            (Source::Session, words(&["session", "droid", "factory", "agent", "claude"])),
            (Source::Internal, words(&["thinking", "reflection", "realized", "insight", "idea"])),
        ];

        let meta_channels = [
            ("twitter", Source::Twitter),
            ("x", Source::Twitter),
            ("github", Source::GitHub),
            ("web", Source::Web),
            ("browser", Source::Web),
            ("book", Source::Book),
            ("reading", Source::Book),
            ("session", Source::Session),
            ("agent", Source::Session),
            ("droid", Source::Session),
            ("coaching", Source::Conversation),
            ("call", Source::Conversation),
            ("internal", Source::Internal),
            ("reflection", Source::Internal)
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            channels,
            sources,
            meta_channels
        }
    }
}

/// Pure, deterministic classifier over injected pattern tables.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyClassifier {
    patterns: TaxonomyPatterns
}

impl TaxonomyClassifier {
    pub fn new(patterns: TaxonomyPatterns) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &TaxonomyPatterns {
        &self.patterns
    }

    pub fn classify(&self, beat: &Beat) -> Taxonomy {
        let label = beat.impetus.label.to_lowercase();
        let content = beat.content.to_lowercase();

        let channel = self.detect_channel(&label, &content);
        let source = self.detect_source(&label, beat);
        let confidence = confidence(beat, channel, source);

        Taxonomy {
            channel,
            source,
            confidence
        }
    }

    pub fn classify_all(&self, beats: &[Beat]) -> BTreeMap<String, Taxonomy> {
        beats
            .iter()
            .map(|beat| (beat.id.clone(), self.classify(beat)))
            .collect()
    }

    fn detect_channel(&self, label: &str, content: &str) -> Channel {
        let scored = self.patterns.channels.iter().map(|(channel, patterns)| {
            let score: u32 = patterns
                .iter()
                .map(|p| {
                    let mut s = 0;
                    if label.contains(p.as_str()) {
                        s += 3;
                    }
                    if content.contains(p.as_str()) {
                        s += 1;
                    }
                    s
                })
                .sum();
            (*channel, score)
        });

        first_best(scored).unwrap_or(Channel::Discovery)
    }

    fn detect_source(&self, label: &str, beat: &Beat) -> Source {
        if let Some(source) = beat
            .impetus
            .meta
            .get("channel")
            .and_then(|ch| self.patterns.meta_channels.get(&ch.to_lowercase()))
        {
            return *source;
        }

        let scored = self.patterns.sources.iter().map(|(source, patterns)| {
            let score: u32 = patterns
                .iter()
                .filter(|p| label.contains(p.as_str()))
                .map(|_| 2)
                .sum();
            (*source, score)
        });

        first_best(scored).unwrap_or(Source::Internal)
    }
}

/// Highest strictly-positive score; the earliest entry wins ties.
fn first_best<T: Copy>(scored: impl Iterator<Item = (T, u32)>) -> Option<T> {
    let mut best: Option<(T, u32)> = None;
    for (item, score) in scored {
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((item, score));
        }
    }
    best.map(|(item, _)| item)
}

fn confidence(beat: &Beat, channel: Channel, source: Source) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if beat.impetus.has_meaningful_label() {
        confidence += LABEL_CONFIDENCE;
    }
    if channel != Channel::Unknown {
        confidence += CHANNEL_CONFIDENCE;
    }
    if source != Source::Unknown {
        confidence += SOURCE_CONFIDENCE;
    }
    confidence.min(1.0)
}

/// Channel and source counts over a set of taxonomies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxonomyStats {
    pub total: usize,
    pub by_channel: BTreeMap<Channel, usize>,
    pub by_source: BTreeMap<Source, usize>
}

impl TaxonomyStats {
    pub fn from_taxonomies<'a>(taxonomies: impl IntoIterator<Item = &'a Taxonomy>) -> Self {
        let mut stats = Self::default();
        for taxonomy in taxonomies {
            stats.total += 1;
            *stats.by_channel.entry(taxonomy.channel).or_insert(0) += 1;
            *stats.by_source.entry(taxonomy.source).or_insert(0) += 1;
        }
        stats
    }
}
