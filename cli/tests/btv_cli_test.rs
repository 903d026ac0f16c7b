use assert_cmd::{Command, cargo_bin_cmd};
use serde_json::Value;
use testing::{BeatBuilder, BeatsDir};

fn btv() -> Command {
    let mut cmd = cargo_bin_cmd!("btv");
    cmd.env_remove("BTV_DIR")
        .env_remove("RUST_LOG")
        .env("BTV_LOG_LEVEL", "error");
    cmd
}

fn sample_dir() -> BeatsDir {
    BeatsDir::with_beats(&[
        BeatBuilder::new("b-research")
            .content("Exploring a research paper on async runtimes with Claude")
            .days_ago(40)
            .build(),
        BeatBuilder::new("b-dev")
            .content("Implemented the retry code and deployed it")
            .days_ago(2)
            .build(),
        BeatBuilder::new("b-note")
            .content("Bookmark this for later: Claude prompt tips")
            .days_ago(1)
            .build()
    ])
}

/// Run `btv <args> --dir <dir> --quiet`, require success and parse stdout.
fn run_json(dir: &BeatsDir, args: &[&str]) -> Value {
    let output = btv()
        .args(args)
        .arg("--dir")
        .arg(dir.path())
        .arg("--quiet")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

/// Same as [`run_json`] but require failure.
fn run_failing_json(dir: &BeatsDir, args: &[&str]) -> Value {
    let output = btv()
        .args(args)
        .arg("--dir")
        .arg(dir.path())
        .arg("--quiet")
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

fn ids(values: &Value) -> Vec<String> {
    values
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect()
}

mod help_and_version {
    use super::*;
    use predicates::prelude::predicate;

    #[test]
    fn test_help_lists_commands() {
        btv()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"))
            .stdout(predicate::str::contains("rebuild"))
            .stdout(predicate::str::contains("similar"));
    }

    #[test]
    fn test_version_flag() {
        btv()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("btv"));
    }

    #[test]
    fn test_no_args_shows_usage() {
        btv()
            .assert()
            .failure()
            .stderr(predicate::str::contains("Usage:"));
    }
}

mod cache_lifecycle {
    use super::*;

    #[test]
    fn test_rebuild_writes_cache() {
        let dir = sample_dir();
        let out = run_json(&dir, &["rebuild"]);

        assert_eq!(out["success"], true);
        assert_eq!(out["beats_count"], 3);
        assert_eq!(out["source_hash"].as_str().unwrap().len(), 16);
        assert!(dir.cache_path().exists());
    }

    #[test]
    fn test_reads_rebuild_after_append() {
        let dir = sample_dir();
        assert_eq!(run_json(&dir, &["list"])["total"], 3);

        dir.append_beat(&BeatBuilder::new("b-new").content("fresh thought").build());
        let out = run_json(&dir, &["list"]);
        assert_eq!(out["total"], 4);
        assert_eq!(out["beats"][0]["id"], "b-new");
    }

    #[test]
    fn test_missing_beats_dir_is_reported_as_json() {
        let root = tempfile::TempDir::new().unwrap();
        let output = btv()
            .current_dir(root.path())
            .args(["list", "--quiet", "--root"])
            .arg(root.path())
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        let body: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(body["error"], "beats directory not found");
    }

    #[test]
    fn test_projects_lists_beats_dirs() {
        let dir = sample_dir();
        let output = btv()
            .arg("projects")
            .arg(dir.root())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let body: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(body["count"], 1);
        assert_eq!(body["projects"][0]["beat_count"], 3);
    }
}

mod reading {
    use super::*;

    #[test]
    fn test_list_filters_and_sorts() {
        let dir = sample_dir();

        let research = run_json(&dir, &["list", "--channel", "research"]);
        assert_eq!(ids(&research["beats"]), vec!["b-research"]);
        assert_eq!(research["beats"][0]["channel"], "Research");

        let newest = run_json(&dir, &["list", "--limit", "1"]);
        assert_eq!(ids(&newest["beats"]), vec!["b-note"]);
        assert_eq!(newest["total"], 3);

        let ripest = run_json(&dir, &["list", "--sort", "ripeness", "--limit", "1"]);
        assert_eq!(ids(&ripest["beats"]), vec!["b-research"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let dir = sample_dir();
        let out = run_json(&dir, &["search", "CLAUDE"]);
        assert_eq!(out["total_matches"], 2);
        assert_eq!(out["query"], "CLAUDE");
    }

    #[test]
    fn test_show_and_unknown_beat() {
        let dir = sample_dir();
        let shown = run_json(&dir, &["show", "b-dev"]);
        assert_eq!(shown["id"], "b-dev");
        assert_eq!(shown["taxonomy"]["channel"], "Development");
        assert_eq!(shown["age_days"], 2);

        let missing = run_failing_json(&dir, &["show", "nope"]);
        assert_eq!(missing["error"], "beat not found");
        assert!(missing["message"].as_str().unwrap().contains("nope"));
    }

    #[test]
    fn test_view_counts_accumulate() {
        let dir = sample_dir();
        run_json(&dir, &["view", "b-dev"]);
        let out = run_json(&dir, &["view", "b-dev"]);
        assert_eq!(out["view_count"], 2);
        assert!(out["last_viewed_at"].is_string());

        let shown = run_json(&dir, &["show", "b-dev"]);
        assert_eq!(shown["view_count"], 2);
    }

    #[test]
    fn test_taxonomy_stats() {
        let dir = sample_dir();
        let out = run_json(&dir, &["taxonomy-stats"]);
        assert_eq!(out["total"], 3);
        assert_eq!(out["channels"]["Development"], 1);
        assert_eq!(out["channels"]["Reference"], 1);
    }
}

mod scoring {
    use super::*;

    #[test]
    fn test_ripeness_breakdown() {
        let dir = sample_dir();
        let out = run_json(&dir, &["ripeness", "b-research"]);
        assert_eq!(out["beat_id"], "b-research");
        let score = out["score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
        for factor in ["age", "revisit", "connection", "action", "completeness"] {
            assert!(out["factors"][factor].is_number(), "missing {factor}");
        }
    }

    #[test]
    fn test_ripe_respects_threshold_and_limit() {
        let dir = sample_dir();
        let all = run_json(&dir, &["ripe"]);
        assert_eq!(all["count"], 3);
        let scores: Vec<f64> = all["beats"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["ripeness"].as_f64().unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        let none = run_json(&dir, &["ripe", "--threshold", "1.01"]);
        assert_eq!(none["count"], 0);

        let one = run_json(&dir, &["ripe", "--limit", "1"]);
        assert_eq!(one["count"], 1);
    }

    #[test]
    fn test_stale_lists_old_unlinked_beats() {
        let dir = sample_dir();
        let out = run_json(&dir, &["stale"]);
        assert_eq!(out["count"], 1);

        let stale = &out["stale_beats"][0];
        assert_eq!(stale["id"], "b-research");
        assert_eq!(stale["age_days"], 40);
        assert_eq!(stale["reasons"][0]["code"], "old");
        assert_eq!(stale["reasons"][1]["code"], "never_viewed");
        assert_eq!(stale["suggested_action"], stale["reasons"][0]["suggestion"]);
    }

    #[test]
    fn test_config_file_in_beats_dir_is_applied() {
        let dir = sample_dir();
        std::fs::write(
            dir.path().join("btv.toml"),
            "[review]\nstale_after_days = 100\n"
        )
        .unwrap();
        assert_eq!(run_json(&dir, &["stale"])["count"], 0);
    }
}

mod configuration {
    use super::*;
    use predicates::prelude::predicate;

    #[test]
    fn test_root_config_file_sets_beats_dir_name() {
        let root = tempfile::TempDir::new().unwrap();
        std::fs::write(
            root.path().join("btv.toml"),
            "[beats]\ndir_name = \"notes\"\n"
        )
        .unwrap();
        let notes = root.path().join("notes");
        std::fs::create_dir(&notes).unwrap();
        let beat = BeatBuilder::new("n-1").content("kept in notes").build();
        std::fs::write(
            notes.join("beats.jsonl"),
            format!("{}\n", serde_json::to_string(&beat).unwrap())
        )
        .unwrap();

        let output = btv()
            .current_dir(root.path())
            .args(["list", "--quiet", "--root"])
            .arg(root.path())
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let body: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(body["total"], 1);
        assert_eq!(body["beats"][0]["id"], "n-1");
    }

    #[test]
    fn test_config_failures_are_logged() {
        let dir = sample_dir();
        let bad = dir.root().join("broken.toml");
        std::fs::write(&bad, "[review\nstale_after_days = ").unwrap();

        btv()
            .args(["list", "--quiet", "--log-level", "debug", "--config"])
            .arg(&bad)
            .arg("--dir")
            .arg(dir.path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("configuration error"))
            .stderr(predicate::str::contains("Command failed"));
    }
}

mod entities_and_time {
    use super::*;

    #[test]
    fn test_entities_group_by_type() {
        let dir = sample_dir();
        let out = run_json(&dir, &["entities"]);
        let tools = out["tools"].as_array().unwrap();
        let claude = tools.iter().find(|t| t["name"] == "Claude").unwrap();
        assert_eq!(claude["beat_count"], 2);

        let only_people = run_json(&dir, &["entities", "--type", "person"]);
        assert!(only_people.get("tools").is_none());
    }

    #[test]
    fn test_entity_beats_any_case() {
        let dir = sample_dir();
        let out = run_json(&dir, &["entity-beats", "claude"]);
        assert_eq!(out["count"], 2);
        let mut found = ids(&out["beats"]);
        found.sort();
        assert_eq!(found, vec!["b-note", "b-research"]);
    }

    #[test]
    fn test_timeline_by_day() {
        let dir = sample_dir();
        let out = run_json(&dir, &["timeline", "--zoom", "day"]);
        assert_eq!(out["zoom_level"], "day");
        let buckets = out["buckets"].as_array().unwrap();
        assert_eq!(buckets.len(), 3);
        let total: u64 = buckets.iter().map(|b| b["count"].as_u64().unwrap()).sum();
        assert_eq!(total, 3);
        assert_eq!(buckets[0]["date"].as_str().unwrap().len(), 10);
    }

    #[test]
    fn test_gaps_over_threshold() {
        let dir = sample_dir();
        let out = run_json(&dir, &["gaps", "--days", "7"]);
        assert_eq!(out["threshold_days"], 7);
        let gaps = out["gaps"].as_array().unwrap();
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0]["days"].as_i64().unwrap() >= 37);
    }
}

mod chains {
    use super::*;

    #[test]
    fn test_chain_lifecycle() {
        let dir = sample_dir();

        let created = run_json(
            &dir,
            &["chain-create", "--name", "Async thread", "b-research", "b-dev"]
        );
        let chain_id = created["chain"]["id"].as_str().unwrap().to_string();
        assert!(chain_id.starts_with("chain-"));

        let added = run_json(&dir, &["chain-add", "Async thread", "b-note"]);
        assert_eq!(added["beat_count"], 3);

        let removed = run_json(&dir, &["chain-remove", &chain_id, "b-dev"]);
        assert_eq!(removed["beat_count"], 2);

        let shown = run_json(&dir, &["show", "b-note"]);
        assert_eq!(shown["chains"][0]["position"], 2);
        assert_eq!(shown["chains"][0]["prev"], "b-research");
        assert!(shown["chains"][0]["next"].is_null());

        let renamed = run_json(&dir, &["chain-rename", &chain_id, "Runtime notes"]);
        assert_eq!(renamed["chain"]["name"], "Runtime notes");

        let listed = run_json(&dir, &["chains"]);
        assert_eq!(listed["count"], 1);
        assert!(listed["chains"][0]["ripeness"].as_f64().unwrap() > 0.0);

        run_json(&dir, &["chain-delete", "Runtime notes"]);
        assert_eq!(run_json(&dir, &["chains"])["count"], 0);
    }

    #[test]
    fn test_chained_beat_is_not_stale() {
        let dir = sample_dir();
        run_json(&dir, &["chain-create", "--name", "keep", "b-research"]);
        assert_eq!(run_json(&dir, &["stale"])["count"], 0);
    }

    #[test]
    fn test_chains_survive_log_changes() {
        let dir = sample_dir();
        run_json(&dir, &["chain-create", "--name", "keep", "b-research"]);
        dir.append_beat(&BeatBuilder::new("b-late").content("late addition").build());
        assert_eq!(run_json(&dir, &["chains"])["count"], 1);
    }

    #[test]
    fn test_chain_errors() {
        let dir = sample_dir();
        let missing = run_failing_json(&dir, &["chain-add", "no-such-chain", "b-dev"]);
        assert_eq!(missing["error"], "chain error");

        let unknown_beat = run_failing_json(&dir, &["chain-create", "--name", "x", "ghost"]);
        assert_eq!(unknown_beat["error"], "beat not found");

        let blank = run_failing_json(&dir, &["chain-create", "--name", "  "]);
        assert_eq!(blank["error"], "chain error");
    }
}

mod clustering {
    use super::*;
    use testing::{KeywordEmbedder, mock_ollama};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Reports the service as up but fails every embedding request.
    async fn broken_embedder() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;
        server
    }

    fn themed_dir() -> BeatsDir {
        BeatsDir::with_beats(&[
            BeatBuilder::new("k1").content("kubernetes pods restarting").build(),
            BeatBuilder::new("k2").content("kubernetes operator design").build(),
            BeatBuilder::new("k3").content("kubernetes ingress notes").build(),
            BeatBuilder::new("s1").content("sourdough bread starter").build(),
            BeatBuilder::new("s2").content("sourdough hydration levels").build()
        ])
    }

    #[test]
    fn test_unavailable_service_reports_install_hint() {
        let dir = themed_dir();
        let body = run_failing_json(
            &dir,
            &["cluster", "--ollama-url", "http://127.0.0.1:9"]
        );
        assert_eq!(body["error"], "embedding service not available");
        assert!(body["message"].as_str().unwrap().contains("ollama pull"));

        let stored = run_json(&dir, &["clusters"]);
        assert_eq!(stored["count"], 0);
        assert_eq!(stored["embeddings_available"], false);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cluster_stores_results() {
        let server = mock_ollama(KeywordEmbedder::new(&["kubernetes", "sourdough"])).await;
        let dir = themed_dir();
        let url = server.uri();

        let generated = run_json(&dir, &["cluster", "--k", "2", "--ollama-url", &url]);
        let count = generated["count"].as_u64().unwrap();
        assert!(count >= 1);
        for cluster in generated["clusters"].as_array().unwrap() {
            assert!(cluster["beat_count"].as_u64().unwrap() >= 2);
            assert!(cluster["id"].as_str().unwrap().starts_with("cluster-"));
        }

        let stored = run_json(&dir, &["clusters"]);
        assert_eq!(stored["count"].as_u64().unwrap(), count);
        assert_eq!(stored["embeddings_available"], true);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_similar_ranks_same_topic_first() {
        let server = mock_ollama(KeywordEmbedder::new(&["kubernetes", "sourdough"])).await;
        let dir = themed_dir();
        let url = server.uri();

        let out = run_json(&dir, &["similar", "k1", "--limit", "2", "--ollama-url", &url]);
        assert_eq!(out["source_beat"], "k1");
        let mut found = ids(&out["similar"]);
        found.sort();
        assert_eq!(found, vec!["k2", "k3"]);
        assert!(out["similar"][0]["similarity"].as_f64().unwrap() > 0.99);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_embeddings_leave_too_little_data() {
        let server = broken_embedder().await;
        let dir = themed_dir();
        let url = server.uri();

        let body = run_failing_json(&dir, &["cluster", "--k", "2", "--ollama-url", &url]);
        assert_eq!(body["error"], "clustering failed");
        assert!(body["message"].as_str().unwrap().contains("Not enough beats"));
        assert_eq!(run_json(&dir, &["clusters"])["count"], 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_similar_fails_when_anchor_cannot_be_embedded() {
        let server = broken_embedder().await;
        let dir = themed_dir();
        let url = server.uri();

        let body = run_failing_json(&dir, &["similar", "k1", "--ollama-url", &url]);
        assert_eq!(body["error"], "clustering failed");
        assert!(body["message"].as_str().unwrap().contains("Failed to embed beat k1"));
    }
}
