use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Impetus labels that carry no information about where a beat came from.
pub const GENERIC_LABELS: &[&str] = &["manual entry"];

/// Why and how a beat was captured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Impetus {
    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>
}

impl Impetus {
    /// True when the label is present and is not a generic placeholder such
    /// as "manual entry".
    pub fn has_meaningful_label(&self) -> bool {
        let label = self.label.trim().to_lowercase();
        !label.is_empty() && !GENERIC_LABELS.contains(&label.as_str())
    }
}

/// A single line of the source log. Beats are immutable once written; the
/// pipeline only reads them and re-derives data from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    pub id: String,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub impetus: Impetus,

    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_beads: Vec<String>
}

impl Beat {
    /// Content truncated to `max_len` characters, with a trailing ellipsis
    /// when truncated.
    pub fn content_preview(&self, max_len: usize) -> String {
        if self.content.chars().count() <= max_len {
            return self.content.clone();
        }
        let keep = max_len.saturating_sub(3);
        let mut preview: String = self.content.chars().take(keep).collect();
        preview.push_str("...");
        preview
    }

    pub fn impetus_label(&self) -> &str {
        if self.impetus.label.is_empty() {
            "unknown"
        } else {
            &self.impetus.label
        }
    }

    /// Whole days elapsed between creation and `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// A directory holding a beats log, as found by project discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub path: std::path::PathBuf,
    pub beat_count: usize
}

/// Primary classification of a beat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
    Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Channel {
    #[default]
    Unknown,
    /// Insights from coaching or mentoring
    Coaching,
    /// Deliberate investigation
    Research,
    /// Serendipitous finding
    Discovery,
    /// Building or coding insight
    Development,
    /// Personal synthesis
    Reflection,
    /// Saved for later use
    Reference,
    /// Achievement or completion
    Milestone
}

impl Channel {
    /// Every assignable channel in declaration order. Classifier ties are
    /// broken by this order.
    pub const ALL: [Channel; 7] = [
        Channel::Coaching,
        Channel::Research,
        Channel::Discovery,
        Channel::Development,
        Channel::Reflection,
        Channel::Reference,
        Channel::Milestone
    ];
}

/// Origin type of a beat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
    Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Source {
    #[default]
    Unknown,
    /// Human dialogue
    Conversation,
    /// Browser discovery
    Web,
    Twitter,
    /// Code, issues, discussions
    GitHub,
    /// Reading
    Book,
    /// Agent session
    Session,
    /// Self-generated
    Internal
}

impl Source {
    pub const ALL: [Source; 7] = [
        Source::Conversation,
        Source::Web,
        Source::Twitter,
        Source::GitHub,
        Source::Book,
        Source::Session,
        Source::Internal
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Taxonomy {
    pub channel: Channel,
    pub source: Source,
    pub confidence: f64
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum EntityType {
    Person,
    Tool,
    Concept,
    Project,
    Organization
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Person,
        EntityType::Tool,
        EntityType::Concept,
        EntityType::Project,
        EntityType::Organization
    ];
}

/// A named thing mentioned in beat content, deduplicated across the corpus
/// by lowercased name and type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,

    #[serde(rename = "type")]
    pub entity_type: EntityType,

    #[serde(default)]
    pub beat_ids: Vec<String>
}

impl Entity {
    /// Merge key: lowercased name plus type.
    pub fn key(&self) -> (String, EntityType) {
        (self.name.to_lowercase(), self.entity_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn beat(content: &str) -> Beat {
        Beat {
            id: "beat-1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            impetus: Impetus::default(),
            content: content.to_string(),
            entities: vec![],
            references: vec![],
            linked_beads: vec![]
        }
    }

    #[test]
    fn test_content_preview_truncates_on_char_boundary() {
        let b = beat("héllo wörld, this is long");
        let preview = b.content_preview(10);
        assert_eq!(preview.chars().count(), 10);
        assert!(preview.ends_with("..."));
        assert_eq!(beat("short").content_preview(10), "short");
    }

    #[test]
    fn test_generic_label_detection() {
        let mut impetus = Impetus::default();
        assert!(!impetus.has_meaningful_label());
        impetus.label = "Manual Entry".to_string();
        assert!(!impetus.has_meaningful_label());
        impetus.label = "Coaching call".to_string();
        assert!(impetus.has_meaningful_label());
    }

    #[test]
    fn test_beat_deserializes_minimal_line() {
        let line = r#"{"id":"b1","created_at":"2025-01-02T03:04:05Z","impetus":{"label":"x"},"content":"c"}"#;
        let b: Beat = serde_json::from_str(line).unwrap();
        assert_eq!(b.id, "b1");
        assert!(b.entities.is_empty());
        assert!(b.impetus.meta.is_empty());
    }

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!(Channel::from_str("research").unwrap(), Channel::Research);
        assert_eq!(Source::from_str("github").unwrap(), Source::GitHub);
        assert_eq!(EntityType::from_str("TOOL").unwrap(), EntityType::Tool);
        assert_eq!(Channel::Milestone.to_string(), "Milestone");
    }
}
