use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::scoring::lexicon::{NEGATIVE_FILE, POSITIVE_FILE};

/// Default number of vectors read from the model file. The common
/// fastText English models order terms by frequency, so the first 100k
/// cover nearly all news vocabulary at a fraction of the memory.
pub const DEFAULT_MODEL_LIMIT: usize = 100_000;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy. Every
/// setting has a default; the `require_*` methods check that the paths the
/// defaults point to actually exist.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root folder for lexica (CHEETAH_LEXICA_DIR)
    pub lexica_dir: PathBuf,
    /// Text-format term-vector model (CHEETAH_MODEL_PATH)
    pub model_path: PathBuf,
    /// Maximum vectors to read from the model (CHEETAH_MODEL_LIMIT)
    pub model_limit: Option<usize>,
    /// Where score artifacts are written (CHEETAH_RESULT_DIR)
    pub result_dir: PathBuf,
    /// Seed for lexicon balancing (CHEETAH_SEED). Unset means a fresh
    /// random seed per run, which is logged.
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let model_limit = match env::var("CHEETAH_MODEL_LIMIT").as_deref() {
            // "0" or "all" read the whole file
            Ok("0") | Ok("all") => None,
            Ok(raw) => Some(raw.parse::<usize>().map_err(|_| {
                anyhow::anyhow!("CHEETAH_MODEL_LIMIT must be a number or 'all', got '{raw}'")
            })?),
            Err(_) => Some(DEFAULT_MODEL_LIMIT),
        };

        let seed = match env::var("CHEETAH_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| anyhow::anyhow!("CHEETAH_SEED must be an unsigned integer, got '{raw}'"))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            lexica_dir: env::var("CHEETAH_LEXICA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./lexica")),
            model_path: env::var("CHEETAH_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models/english/cc.en.300.vec")),
            model_limit,
            result_dir: env::var("CHEETAH_RESULT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./results")),
            seed,
        })
    }

    /// Folder holding `positive.txt` and `negative.txt`.
    pub fn sentiment_dir(&self) -> PathBuf {
        self.lexica_dir.join("sentiment")
    }

    /// Optional stop-word file overriding the bundled English list.
    pub fn stop_words_path(&self) -> PathBuf {
        self.lexica_dir.join("stop").join("stopwords.txt")
    }

    /// The balancing seed: the configured one, or a fresh random seed.
    pub fn seed_or_random(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Check that the vector model file exists.
    /// Call this before any operation that loads the model.
    pub fn require_model(&self) -> Result<()> {
        if !self.model_path.is_file() {
            anyhow::bail!(
                "Vector model not found: {}\n\
                 Set CHEETAH_MODEL_PATH to a text-format (.vec) model file.",
                self.model_path.display()
            );
        }
        Ok(())
    }

    /// Check that the sentiment lexicon folder and both side files exist.
    pub fn require_sentiment_lexicon(&self) -> Result<()> {
        let dir = self.sentiment_dir();
        for name in [POSITIVE_FILE, NEGATIVE_FILE] {
            if !dir.join(name).is_file() {
                anyhow::bail!(
                    "Sentiment lexicon file not found: {}\n\
                     Set CHEETAH_LEXICA_DIR to a folder containing sentiment/{} and sentiment/{}.",
                    dir.join(name).display(),
                    POSITIVE_FILE,
                    NEGATIVE_FILE
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            lexica_dir: dir.join("lexica"),
            model_path: dir.join("model.vec"),
            model_limit: Some(DEFAULT_MODEL_LIMIT),
            result_dir: dir.join("results"),
            seed: Some(1),
        }
    }

    #[test]
    fn test_require_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config_in(tmp.path());
        assert!(config.require_model().is_err());
        assert!(config.require_sentiment_lexicon().is_err());

        std::fs::write(tmp.path().join("model.vec"), "1 1\na 1\n").unwrap();
        let sentiment = tmp.path().join("lexica").join("sentiment");
        std::fs::create_dir_all(&sentiment).unwrap();
        std::fs::write(sentiment.join(POSITIVE_FILE), "good\n").unwrap();
        assert!(config.require_sentiment_lexicon().is_err());
        std::fs::write(sentiment.join(NEGATIVE_FILE), "bad\n").unwrap();

        assert!(config.require_model().is_ok());
        assert!(config.require_sentiment_lexicon().is_ok());
    }

    #[test]
    fn test_configured_seed_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(config_in(tmp.path()).seed_or_random(), 1);
    }
}
