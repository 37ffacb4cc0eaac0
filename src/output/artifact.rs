// Persisted score artifacts.
//
// One JSON file per scored source:
//
//   { "binKeys": [[period, year], ...],
//     "output": [ { "scores": [..], "topics": [..] }, ... ] }
//
// Every `scores` array lines up index-for-index with `binKeys`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scoring::cheetah::{LEXICAL_KEY, SENTIMENT_KEY};
use crate::timeline::BinKey;
use crate::timeline::series::gross;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicScores {
    pub scores: Vec<f64>,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreArtifact {
    #[serde(rename = "binKeys")]
    pub bin_keys: Vec<BinKey>,
    pub output: Vec<TopicScores>,
}

impl ScoreArtifact {
    pub fn new(bin_keys: Vec<BinKey>) -> Self {
        Self {
            bin_keys,
            output: Vec::new(),
        }
    }

    pub fn push(&mut self, topics: Vec<String>, scores: Vec<f64>) {
        self.output.push(TopicScores { scores, topics });
    }

    /// `(head topic, total)` per series.
    pub fn gross_totals(&self) -> Vec<(String, f64)> {
        self.output
            .iter()
            .map(|o| {
                let head = o.topics.first().cloned().unwrap_or_default();
                (head, gross(&o.scores))
            })
            .collect()
    }

    /// `<source>_<head topics>_cheetah_netscores.json`, or
    /// `..._cheetah_lex_netscores.json` for single-lexicon scores.
    pub fn file_name(&self, source: &str, score_key: &str) -> String {
        let heads: Vec<&str> = self
            .output
            .iter()
            .filter_map(|o| o.topics.first().map(String::as_str))
            .collect();
        let suffix = if score_key == LEXICAL_KEY {
            LEXICAL_KEY
        } else {
            SENTIMENT_KEY
        };
        let source = source.replace(|c: char| c.is_whitespace() || c == '/', "-");
        format!("{}_{}_{}_netscores.json", source, heads.join("_"), suffix)
    }

    /// Write into `dir` (created if needed) and return the file path.
    pub fn write(&self, dir: &Path, source: &str, score_key: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join(self.file_name(source, score_key));
        let json = serde_json::to_string_pretty(self).context("Failed to serialize scores")?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), series = self.output.len(), bins = self.bin_keys.len(), "Wrote score artifact");
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }
}
