use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::server_utils::{sanitize_name, MAX_HIGH_SCORE_LIMIT};
use crate::types::Character;

pub const STORE_VERSION: u8 = 1;
pub const MAX_STORED_ENTRIES: usize = 200;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    pub character: String,
    pub score: u32,
    pub level: u32,
    #[serde(rename = "recordedAt", alias = "recorded_at")]
    pub recorded_at: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct HighScoreResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<HighScoreEntry>,
}

#[derive(Clone, Debug, Serialize)]
struct HighScoreFile<'a> {
    version: u8,
    entries: &'a [HighScoreEntry],
}

#[derive(Clone, Debug, Deserialize)]
struct HighScoreFileRaw {
    version: u8,
    entries: Vec<serde_json::Value>,
}

pub struct HighScoreStore {
    file_path: PathBuf,
    entries: Vec<HighScoreEntry>,
}

impl HighScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let entries = load_entries(&file_path);
        Self { file_path, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn record(&mut self, name: &str, character: Character, score: u32, level: u32) {
        self.record_at(name, character, score, level, Utc::now());
    }

    fn record_at(
        &mut self,
        name: &str,
        character: Character,
        score: u32,
        level: u32,
        at: DateTime<Utc>,
    ) {
        self.entries.push(HighScoreEntry {
            name: sanitize_name(name),
            character: character.as_str().to_string(),
            score,
            level,
            recorded_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        sort_entries(&mut self.entries);
        self.entries.truncate(MAX_STORED_ENTRIES);
        debug!(score, level, total = self.entries.len(), "high score recorded");
        self.save();
    }

    pub fn top(&self, limit: usize) -> Vec<HighScoreEntry> {
        self.entries
            .iter()
            .take(limit.min(MAX_HIGH_SCORE_LIMIT))
            .cloned()
            .collect()
    }

    pub fn build_response(&self, limit: usize) -> HighScoreResponse {
        HighScoreResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.top(limit),
        }
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), %error, "failed to create high score dir");
                return;
            }
        }

        let payload = HighScoreFile {
            version: STORE_VERSION,
            entries: &self.entries,
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    warn!(path = %self.file_path.display(), %error, "failed to write high scores");
                }
            }
            Err(error) => {
                warn!(path = %self.file_path.display(), %error, "failed to serialize high scores");
            }
        }
    }
}

fn sort_entries(entries: &mut [HighScoreEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.level.cmp(&a.level))
            .then_with(|| cmp_recorded(&a.recorded_at, &b.recorded_at))
    });
}

fn cmp_recorded(a: &str, b: &str) -> Ordering {
    match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn load_entries(path: &Path) -> Vec<HighScoreEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), %error, "failed to read high scores");
            }
            return Vec::new();
        }
    };
    let parsed = match serde_json::from_str::<HighScoreFileRaw>(&text) {
        Ok(value) if value.version == STORE_VERSION => value,
        Ok(value) => {
            warn!(version = value.version, path = %path.display(), "unsupported high score version");
            return Vec::new();
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to parse high scores");
            return Vec::new();
        }
    };

    let mut entries: Vec<HighScoreEntry> = parsed
        .entries
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| match serde_json::from_value(raw) {
            Ok(entry) => sanitize_entry(entry),
            Err(error) => {
                warn!(index = idx, path = %path.display(), %error, "skipping malformed high score");
                None
            }
        })
        .collect();
    sort_entries(&mut entries);
    entries.truncate(MAX_STORED_ENTRIES);
    entries
}

fn sanitize_entry(value: HighScoreEntry) -> Option<HighScoreEntry> {
    let recorded_at = DateTime::parse_from_rfc3339(value.recorded_at.trim())
        .ok()?
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    let character = Character::parse(value.character.trim()).unwrap_or(Character::Classic);
    Some(HighScoreEntry {
        name: sanitize_name(&value.name),
        character: character.as_str().to_string(),
        score: value.score,
        level: value.level,
        recorded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            rand::random::<u32>()
        );
        std::env::temp_dir().join(unique).join("high_scores.json")
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn record_orders_by_score_then_level_then_oldest() {
        let path = temp_file("high-scores-order");
        let mut store = HighScoreStore::new(path.clone());
        store.record_at("Late", Character::Classic, 500, 2, at(30));
        store.record_at("Early", Character::Gunner, 500, 2, at(10));
        store.record_at("Deeper", Character::Shield, 500, 3, at(40));
        store.record_at("Top", Character::Classic, 900, 0, at(50));

        let names: Vec<String> = store.top(10).into_iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["Top", "Deeper", "Early", "Late"]);

        let reloaded = HighScoreStore::new(path.clone());
        assert_eq!(reloaded.top(10), store.top(10));

        let _ = fs::remove_dir_all(path.parent().expect("parent exists"));
    }

    #[test]
    fn record_sanitizes_name_and_stamps_rfc3339() {
        let path = temp_file("high-scores-name");
        let mut store = HighScoreStore::new(path.clone());
        store.record("   ", Character::Shield, 10, 0);
        let entry = store.top(1).pop().expect("entry exists");
        assert_eq!(entry.name, "Player");
        assert_eq!(entry.character, "shield");
        assert!(DateTime::parse_from_rfc3339(&entry.recorded_at).is_ok());
        assert!(entry.recorded_at.ends_with('Z'));

        let _ = fs::remove_dir_all(path.parent().expect("parent exists"));
    }

    #[test]
    fn load_skips_invalid_entries_and_wrong_versions() {
        let path = temp_file("high-scores-load");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "entries": [
    { "name": "Alice", "character": "pacman", "score": 120, "level": 1, "recordedAt": "2024-01-02T03:04:05+09:00" },
    { "name": "Broken", "character": "classic", "score": -5, "level": 0, "recordedAt": "2024-01-01T00:00:00Z" },
    { "name": "NoTime", "character": "classic", "score": 5, "level": 0, "recordedAt": "yesterday" }
  ]
}"#;
        fs::write(&path, raw).expect("write file");

        let store = HighScoreStore::new(path.clone());
        assert_eq!(store.len(), 1);
        let entry = &store.top(10)[0];
        assert_eq!(entry.name, "Alice");
        assert_eq!(entry.character, "classic");
        assert_eq!(entry.recorded_at, "2024-01-01T18:04:05.000Z");

        fs::write(&path, r#"{"version": 9, "entries": []}"#).expect("write file");
        assert!(HighScoreStore::new(path.clone()).is_empty());

        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn top_and_storage_are_capped() {
        let path = temp_file("high-scores-cap");
        let mut store = HighScoreStore::new(path.clone());
        for idx in 0..(MAX_STORED_ENTRIES as u32 + 5) {
            store.entries.push(HighScoreEntry {
                name: format!("P{idx}"),
                character: "classic".to_string(),
                score: idx,
                level: 0,
                recorded_at: at(idx as i64).to_rfc3339_opts(SecondsFormat::Millis, true),
            });
        }
        store.record_at("Last", Character::Classic, 1, 0, at(0));
        assert_eq!(store.len(), MAX_STORED_ENTRIES);
        assert_eq!(store.top(3).len(), 3);
        assert_eq!(store.top(0).len(), 0);
        assert_eq!(store.top(10_000).len(), MAX_HIGH_SCORE_LIMIT);
        assert_eq!(store.build_response(1).entries[0].score, MAX_STORED_ENTRIES as u32 + 4);

        let _ = fs::remove_dir_all(path.parent().expect("parent exists"));
    }
}
