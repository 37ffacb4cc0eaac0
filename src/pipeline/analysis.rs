// Scoring and time-series assembly over filtered collections.
//
// Runs after the filter pipeline: score every headline in every result,
// then bin each result's headlines over the analysis range and aggregate
// one series per topic. The headline list of each result is moved out,
// scored across workers and moved back, so results never share headlines.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::corpus::ResultCollection;
use crate::output::artifact::ScoreArtifact;
use crate::scoring::cheetah::{score_partitioned, CheetahScorer, ScoreStats};
use crate::scoring::TermVectorSource;
use crate::timeline::series::{bin_scores, k_average, SeriesOptions};
use crate::timeline::{bin_headlines, bin_keys, BinGrouping};

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub low: NaiveDate,
    pub high: NaiveDate,
    pub grouping: BinGrouping,
    pub series: SeriesOptions,
    /// Moving-average window applied to each series, if any.
    pub smoothing: Option<usize>,
}

impl AnalysisOptions {
    pub fn new(low: NaiveDate, high: NaiveDate, score_key: &str) -> Self {
        Self {
            low,
            high,
            grouping: BinGrouping::Weekly,
            series: SeriesOptions::new(score_key),
            smoothing: None,
        }
    }
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("  Scoring [{bar:30}] {pos}/{len} ({eta})") {
        pb.set_style(style);
    }
    pb
}

/// Score every headline in every collection, writing scores into each
/// headline's attribute map under `scorer.key()`.
pub async fn score_collections<M>(
    collections: &mut [ResultCollection],
    scorer: Arc<CheetahScorer>,
    model: Arc<M>,
    workers: usize,
    show_progress: bool,
) -> Result<ScoreStats>
where
    M: TermVectorSource + ?Sized + 'static,
{
    let total: usize = collections.iter().map(ResultCollection::headline_count).sum();
    let pb = progress_bar(total, show_progress);
    let mut stats = ScoreStats::default();

    for collection in collections.iter_mut() {
        for result in collection.results_mut() {
            let headlines = std::mem::take(&mut result.headlines);
            let count = headlines.len();
            let (scored, result_stats) =
                score_partitioned(Arc::clone(&scorer), Arc::clone(&model), headlines, workers).await?;
            result.headlines = scored;
            stats.merge(result_stats);
            pb.inc(count as u64);
        }
    }
    pb.finish_and_clear();

    info!(
        key = scorer.key(),
        scored = stats.scored,
        no_signal = stats.no_signal,
        "Scoring complete"
    );
    Ok(stats)
}

/// Bin and aggregate each result of `collection` into one series per topic.
///
/// Fails with `OutOfRange` if any headline lies outside the analysis range,
/// which means the collection was not date-filtered with the same range.
pub fn build_artifact(collection: &ResultCollection, options: &AnalysisOptions) -> Result<ScoreArtifact> {
    let mut artifact = ScoreArtifact::new(bin_keys(options.low, options.high, options.grouping));

    for result in collection.results() {
        let bins = bin_headlines(&result.headlines, options.low, options.high, options.grouping)?;
        let mut scores = bin_scores(&bins, &options.series);
        if let Some(k) = options.smoothing {
            scores = k_average(&scores, k);
        }
        artifact.push(result.topics().to_vec(), scores);
    }
    Ok(artifact)
}
