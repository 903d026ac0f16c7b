//! Dictionary and proper-noun entity extraction, plus lookup indices over
//! the extracted corpus.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use bt_core::{Beat, Entity, EntityType};
use regex::Regex;
use tracing::debug;

/// Capitalized one- or two-word sequences, treated as person names.
static PROPER_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\b").expect("proper-noun pattern is valid")
});

/// Curated name lists, one per entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDictionaries {
    pub people: Vec<String>,
    pub tools: Vec<String>,
    pub concepts: Vec<String>,
    pub projects: Vec<String>,
    pub organizations: Vec<String>
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

impl Default for EntityDictionaries {
    fn default() -> Self {
        Self {
            people: names(&[
                "DHH",
                "Claude",
                "David",
                "Simon",
                "Paul Graham",
                "Patrick Collison",
                "Sam Altman"
            ]),
            tools: names(&[
                "Supabase",
                "Ollama",
                "GitHub",
                "Cloudflare",
                "Vercel",
                "beads",
                "beats",
                "bv",
                "btv",
                "bd",
                "Factory",
                "Droid",
                "Claude",
                "ChatGPT",
                "GPT",
                "Cursor",
                "VSCode",
                "React",
                "Next.js",
                "TypeScript",
                "Go",
                "Python",
                "Rust",
                "Docker",
                "Kubernetes",
                "AWS",
                "GCP",
                "PostgreSQL",
                "Redis",
                "Notion",
                "Linear",
                "Slack",
                "Discord",
                "Figma",
                "WezTerm",
                "tmux",
                "nvim",
                "vim",
                "git"
            ]),
            concepts: names(&[
                "commitment",
                "identity",
                "narrative substrate",
                "psychoid buffer",
                "agent",
                "agentic",
                "workflow",
                "automation",
                "flywheel",
                "synthesis",
                "pattern",
                "insight",
                "discovery"
            ]),
            projects: names(&["runcible", "modern-minuteman", "modern minuteman"]),
            organizations: names(&[
                "Factory",
                "Anthropic",
                "OpenAI",
                "Google",
                "Meta",
                "Microsoft",
                "Stripe",
                "Vercel",
                "Cloudflare",
                "37signals",
                "Basecamp"
            ])
        }
    }
}

impl EntityDictionaries {
    /// Dictionaries in extraction order.
    pub fn by_type(&self) -> [(EntityType, &[String]); 5] {
        [
            (EntityType::Person, &self.people),
            (EntityType::Tool, &self.tools),
            (EntityType::Concept, &self.concepts),
            (EntityType::Project, &self.projects),
            (EntityType::Organization, &self.organizations)
        ]
    }
}

/// Capitalized words that start sentences or name dates rather than people.
pub fn default_stoplist() -> HashSet<String> {
    [
        "The", "This", "That", "These", "Those", "What", "When", "Where", "Which", "Who", "How",
        "Why", "Some", "Many", "Most", "Such", "Each", "Every", "Both", "All", "Any", "Other",
        "Another", "First", "Last", "New", "Old", "Good", "Great", "Best", "Just", "Only", "Also",
        "Even", "Still", "Now", "Here", "There", "Today", "Tomorrow", "Monday", "Tuesday",
        "Wednesday", "Thursday", "Friday", "Saturday", "Sunday", "January", "February", "March",
        "April", "May", "June", "July", "August", "September", "October", "November", "December"
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Output of a full-corpus extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedEntities {
    /// Deduplicated by lowercased name and type, in first-seen order
    pub entities: Vec<Entity>,
    /// Name as first seen to the ids of beats mentioning it
    pub index: BTreeMap<String, Vec<String>>
}

#[derive(Debug, Clone)]
pub struct EntityExtractor {
    dictionaries: EntityDictionaries,
    stoplist: HashSet<String>
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new(EntityDictionaries::default(), default_stoplist())
    }
}

impl EntityExtractor {
    pub fn new(dictionaries: EntityDictionaries, stoplist: HashSet<String>) -> Self {
        Self {
            dictionaries,
            stoplist
        }
    }

    /// Entity mentions in one beat, at most one per lowercased name and type.
    pub fn extract(&self, beat: &Beat) -> Vec<Entity> {
        let content_lower = beat.content.to_lowercase();
        let mut seen: HashSet<(String, EntityType)> = HashSet::new();
        let mut found = Vec::new();

        let mut push = |name: &str, entity_type: EntityType, found: &mut Vec<Entity>| {
            if seen.insert((name.to_lowercase(), entity_type)) {
                found.push(Entity {
                    name: name.to_string(),
                    entity_type,
                    beat_ids: vec![beat.id.clone()]
                });
            }
        };

        for (entity_type, dictionary) in self.dictionaries.by_type() {
            for name in dictionary {
                if content_lower.contains(&name.to_lowercase()) {
                    push(name, entity_type, &mut found);
                }
            }
        }

        for m in PROPER_NOUN.find_iter(&beat.content) {
            if self.stoplist.contains(m.as_str()) {
                continue;
            }
            push(m.as_str(), EntityType::Person, &mut found);
        }

        found
    }

    /// Extract across the whole corpus, merging mentions by lowercased name
    /// and type and rebuilding the name index from scratch.
    pub fn extract_all(&self, beats: &[Beat]) -> ExtractedEntities {
        let mut entities: Vec<Entity> = Vec::new();
        let mut positions: HashMap<(String, EntityType), usize> = HashMap::new();
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for beat in beats {
            for mention in self.extract(beat) {
                match positions.get(&mention.key()) {
                    Some(&pos) => entities[pos].beat_ids.push(beat.id.clone()),
                    None => {
                        positions.insert(mention.key(), entities.len());
                        entities.push(mention.clone());
                    }
                }

                let ids = index.entry(mention.name).or_default();
                if ids.last() != Some(&beat.id) {
                    ids.push(beat.id.clone());
                }
            }
        }

        debug!(
            beats = beats.len(),
            entities = entities.len(),
            "Extracted entities"
        );
        ExtractedEntities { entities, index }
    }
}

/// Read-side lookups over a cache's entity list and name index.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    entities: Vec<Entity>,
    raw: BTreeMap<String, Vec<String>>,
    by_name: HashMap<String, Vec<usize>>,
    by_type: HashMap<EntityType, Vec<usize>>,
    by_beat: HashMap<String, Vec<usize>>
}

impl EntityIndex {
    pub fn new(entities: Vec<Entity>, raw: BTreeMap<String, Vec<String>>) -> Self {
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_type: HashMap<EntityType, Vec<usize>> = HashMap::new();
        let mut by_beat: HashMap<String, Vec<usize>> = HashMap::new();

        for (pos, entity) in entities.iter().enumerate() {
            by_name
                .entry(entity.name.to_lowercase())
                .or_default()
                .push(pos);
            by_type.entry(entity.entity_type).or_default().push(pos);
            for beat_id in &entity.beat_ids {
                let slot = by_beat.entry(beat_id.clone()).or_default();
                if !slot.contains(&pos) {
                    slot.push(pos);
                }
            }
        }

        Self {
            entities,
            raw,
            by_name,
            by_type,
            by_beat
        }
    }

    pub fn all(&self) -> &[Entity] {
        &self.entities
    }

    /// Every entity with this name regardless of case, one per type.
    pub fn get_by_name(&self, name: &str) -> Vec<&Entity> {
        self.lookup(&self.by_name, &name.to_lowercase())
    }

    pub fn get_by_type(&self, entity_type: EntityType) -> Vec<&Entity> {
        self.lookup(&self.by_type, &entity_type)
    }

    pub fn get_for_beat(&self, beat_id: &str) -> Vec<&Entity> {
        self.lookup(&self.by_beat, beat_id)
    }

    /// Beat ids for a name. Exact index hits first; otherwise the union of
    /// every same-named entity's beats, in first-seen order.
    pub fn beat_ids_for(&self, name: &str) -> Vec<String> {
        if let Some(ids) = self.raw.get(name) {
            return ids.clone();
        }
        let mut ids: Vec<String> = Vec::new();
        for entity in self.get_by_name(name) {
            for id in &entity.beat_ids {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    /// Most-mentioned entities of every type, at most `limit` each.
    pub fn top_by_type(&self, limit: usize) -> BTreeMap<EntityType, Vec<&Entity>> {
        let mut result = BTreeMap::new();
        for entity_type in EntityType::ALL {
            let mut of_type = self.get_by_type(entity_type);
            if of_type.is_empty() {
                continue;
            }
            of_type.sort_by(|a, b| {
                b.beat_ids
                    .len()
                    .cmp(&a.beat_ids.len())
                    .then_with(|| a.name.cmp(&b.name))
            });
            of_type.truncate(limit);
            result.insert(entity_type, of_type);
        }
        result
    }

    fn lookup<K, Q>(&self, map: &HashMap<K, Vec<usize>>, key: &Q) -> Vec<&Entity>
    where
        K: std::borrow::Borrow<Q> + std::hash::Hash + Eq,
        Q: std::hash::Hash + Eq + ?Sized
    {
        map.get(key)
            .map(|positions| positions.iter().map(|&p| &self.entities[p]).collect())
            .unwrap_or_default()
    }
}
