use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use bt_core::{Beat, Impetus};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

pub fn unique_beat_id() -> String {
    unique_id("beat")
}

pub struct BeatBuilder {
    beat: Beat
}

impl BeatBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            beat: Beat {
                id: id.into(),
                created_at: now,
                updated_at: now,
                impetus: Impetus::default(),
                content: String::new(),
                entities: Vec::new(),
                references: Vec::new(),
                linked_beads: Vec::new()
            }
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.beat.content = content.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.beat.impetus.label = label.into();
        self
    }

    pub fn meta(mut self, key: &str, value: &str) -> Self {
        self.beat
            .impetus
            .meta
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.beat.created_at = at;
        self.beat.updated_at = at;
        self
    }

    pub fn days_ago(self, days: i64) -> Self {
        self.created_at(Utc::now() - Duration::days(days))
    }

    pub fn entities(mut self, names: &[&str]) -> Self {
        self.beat.entities = names.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn references(mut self, refs: &[&str]) -> Self {
        self.beat.references = refs.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn linked_beads(mut self, ids: &[&str]) -> Self {
        self.beat.linked_beads = ids.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn build(self) -> Beat {
        self.beat
    }
}

/// A temp project root holding a `.beats` directory.
pub struct BeatsDir {
    root: TempDir,
    dir: PathBuf
}

impl BeatsDir {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create temp root");
        let dir = root.path().join(".beats");
        fs::create_dir_all(&dir).expect("create .beats");
        Self { root, dir }
    }

    pub fn with_beats(beats: &[Beat]) -> Self {
        let fixture = Self::new();
        fixture.write_beats(beats);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// The `.beats` directory itself.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join("beats.jsonl")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join("btv-cache.json")
    }

    pub fn write_beats(&self, beats: &[Beat]) {
        let mut text = String::new();
        for beat in beats {
            text.push_str(&serde_json::to_string(beat).expect("serialize beat"));
            text.push('\n');
        }
        self.write_raw(&text);
    }

    pub fn append_beat(&self, beat: &Beat) {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .expect("open log");
        writeln!(
            file,
            "{}",
            serde_json::to_string(beat).expect("serialize beat")
        )
        .expect("append beat");
    }

    pub fn write_raw(&self, contents: &str) {
        fs::write(self.log_path(), contents).expect("write log");
    }
}

impl Default for BeatsDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Embeds a prompt as one dimension per topic keyword: 1.0 when the
/// lowercased prompt mentions the topic, plus a small constant so no
/// vector has zero norm. Prompts containing `fail_marker` get a 500.
pub struct KeywordEmbedder {
    topics: Vec<String>,
    fail_marker: Option<String>
}

impl KeywordEmbedder {
    pub fn new(topics: &[&str]) -> Self {
        Self {
            topics: topics.iter().map(|t| t.to_lowercase()).collect(),
            fail_marker: None
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_lowercase());
        self
    }

    pub fn embed(&self, prompt: &str) -> Vec<f32> {
        let prompt = prompt.to_lowercase();
        self.topics
            .iter()
            .map(|topic| if prompt.contains(topic) { 1.0 } else { 0.01 })
            .collect()
    }
}

impl Respond for KeywordEmbedder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: BTreeMap<String, serde_json::Value> = match serde_json::from_slice(&request.body)
        {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400)
        };
        let prompt = body
            .get("prompt")
            .and_then(|p| p.as_str())
            .unwrap_or_default()
            .to_string();

        if let Some(marker) = &self.fail_marker {
            if prompt.to_lowercase().contains(marker) {
                return ResponseTemplate::new(500).set_body_string("model crashed");
            }
        }
        ResponseTemplate::new(200).set_body_json(json!({ "embedding": self.embed(&prompt) }))
    }
}

/// A running stand-in for an Ollama server: `/api/tags` answers 200 and
/// `/api/embeddings` responds through `embedder`.
pub async fn mock_ollama(embedder: KeywordEmbedder) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(embedder)
        .mount(&server)
        .await;

    tracing::debug!(uri = %server.uri(), "Mock embedding service started");
    server
}
