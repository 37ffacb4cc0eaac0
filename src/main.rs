use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use cheetah::config::Config;
use cheetah::corpus::collection::{self, load_collections, save_collections};
use cheetah::corpus::normalize::TextNormalizer;
use cheetah::corpus::{HeadlineField, ResultCollection};
use cheetah::output::terminal;
use cheetah::pipeline::analysis::{self, AnalysisOptions};
use cheetah::pipeline::filter::{self, FilterOptions};
use cheetah::scoring::bias::net_algebraic_sentiment;
use cheetah::scoring::lexicon::{Lexicon, SentimentLexicon};
use cheetah::scoring::vectors::InMemoryVectors;
use cheetah::scoring::{CheetahScorer, NoSignal, ScorerOptions};
use cheetah::timeline::series::Aggregation;
use cheetah::timeline::BinGrouping;

/// Cheetah: algebraic sentiment bias scoring for news headlines.
///
/// Filters topic-partitioned headline collections, scores every headline
/// against a sentiment lexicon in a term-vector space, and aggregates the
/// scores into per-topic time series.
#[derive(Parser)]
#[command(name = "cheetah", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter, score against the sentiment lexicon, bin and save net scores
    Score {
        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Score with the lexicon sides as loaded, without balancing
        #[arg(long)]
        no_balance: bool,
    },

    /// Like `score`, but measure alignment with a single lexicon file
    Lexical {
        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Line-delimited lexicon file
        #[arg(long)]
        lexicon: PathBuf,
    },

    /// Run only the filter pipeline and save the result
    Filter {
        #[command(flatten)]
        filter: FilterArgs,

        /// Where to write the filtered collections
        #[arg(long, short)]
        output: PathBuf,

        /// Strip web-archive prefixes from links in the output
        #[arg(long)]
        filter_source: bool,
    },

    /// Report how the vector model itself leans on each topic
    Bias {
        /// Topic term lists, comma-separated synonyms (e.g. "trump,donald")
        #[arg(required = true)]
        topics: Vec<String>,

        /// Average each side by its lexicon size
        #[arg(long)]
        average: bool,
    },

    /// Show per-collection, per-topic headline counts and date spans
    Summary {
        /// Saved collections (JSON)
        input: PathBuf,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Saved collections (JSON)
    input: PathBuf,

    /// First day to keep (YYYY-MM-DD); defaults to the earliest headline
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to keep (YYYY-MM-DD); defaults to the latest headline
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Collapse same-day duplicates of this field (e.g. uri)
    #[arg(long)]
    dedup: Option<HeadlineField>,

    /// Drop headlines whose title names another topic
    #[arg(long)]
    cross_filter: bool,

    /// Erase other topics' terms from each headline
    #[arg(long)]
    strip_off_topic: bool,

    /// Remove stop words (lexica/stop/stopwords.txt, else a bundled English list)
    #[arg(long)]
    stop_words: bool,

    /// Delete punctuation instead of replacing it with spaces
    #[arg(long)]
    delete_punctuation: bool,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Bin by week or month
    #[arg(long, default_value = "weekly")]
    bins: BinGrouping,

    /// Average scores per bin instead of summing them
    #[arg(long)]
    mean: bool,

    /// Weight scores by this headline attribute (e.g. share_count)
    #[arg(long)]
    weight: Option<String>,

    /// Smooth each series with a moving window of this width
    #[arg(long)]
    smooth: Option<usize>,

    /// Record headlines with no known tokens as NaN (null) rather than 0
    #[arg(long)]
    nan: bool,

    /// Leave scores of exactly 0 out of each bin
    #[arg(long)]
    skip_zeros: bool,

    /// Number of scoring workers (default: 4)
    #[arg(long, default_value = "4")]
    workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cheetah=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            filter,
            analysis,
            no_balance,
        } => {
            let config = Config::load()?;
            config.require_model()?;
            config.require_sentiment_lexicon()?;

            let (mut collections, options) = load_and_filter(&filter, &config)?;
            let model = Arc::new(InMemoryVectors::load(&config.model_path, config.model_limit)?);

            let lexicon = SentimentLexicon::load(&config.sentiment_dir())?
                .normalized(&options.normalizer)
                .remove_terms(&all_topic_terms(&collections));
            let balance_seed = if no_balance {
                None
            } else {
                let seed = config.seed_or_random();
                info!(seed, "Balancing sentiment lexicon");
                Some(seed)
            };
            let scorer = CheetahScorer::new(
                model.as_ref(),
                &lexicon,
                &ScorerOptions {
                    balance_seed,
                    no_signal: no_signal(&analysis),
                },
            );

            run_analysis(&mut collections, scorer, model, &analysis, &options, &config).await?;
        }

        Commands::Lexical {
            filter,
            analysis,
            lexicon,
        } => {
            let config = Config::load()?;
            config.require_model()?;

            let (mut collections, options) = load_and_filter(&filter, &config)?;
            let model = Arc::new(InMemoryVectors::load(&config.model_path, config.model_limit)?);

            let lexicon = Lexicon::load(&lexicon)?
                .normalized(&options.normalizer)
                .remove_terms(&all_topic_terms(&collections));
            let scorer = CheetahScorer::single(model.as_ref(), &lexicon, no_signal(&analysis));

            run_analysis(&mut collections, scorer, model, &analysis, &options, &config).await?;
        }

        Commands::Filter {
            filter,
            output,
            filter_source,
        } => {
            let config = Config::load()?;
            let (collections, _) = load_and_filter(&filter, &config)?;
            save_collections(&collections, &output, filter_source)?;
            println!(
                "{} {} headlines to {}",
                "Saved".bold(),
                collections.iter().map(ResultCollection::headline_count).sum::<usize>(),
                output.display()
            );
        }

        Commands::Bias { topics, average } => {
            let config = Config::load()?;
            config.require_model()?;
            config.require_sentiment_lexicon()?;

            let normalizer = TextNormalizer::default();
            let model = InMemoryVectors::load(&config.model_path, config.model_limit)?;
            let lexicon = SentimentLexicon::load(&config.sentiment_dir())?.normalized(&normalizer);

            let reports: Vec<_> = topics
                .iter()
                .map(|list| {
                    let terms: Vec<String> = list
                        .split(',')
                        .map(|t| normalizer.normalize(t).replace(' ', ""))
                        .filter(|t| !t.is_empty())
                        .collect();
                    let lexicon = lexicon.remove_terms(&terms);
                    net_algebraic_sentiment(&model, &terms, &lexicon, average)
                })
                .collect();
            terminal::display_bias_reports(&reports);
        }

        Commands::Summary { input } => {
            let (collections, stats) = load_collections(&input)?;
            if stats.dropped > 0 {
                println!(
                    "  {} {} malformed headline records skipped",
                    "Warning:".yellow(),
                    stats.dropped
                );
            }
            terminal::display_collection_summary(&collections);
        }
    }

    Ok(())
}

fn no_signal(args: &AnalysisArgs) -> NoSignal {
    if args.nan {
        NoSignal::Nan
    } else {
        NoSignal::Zero
    }
}

/// Every topic term across all collections, so lexica can exclude them.
fn all_topic_terms(collections: &[ResultCollection]) -> Vec<String> {
    collection::topic_sets(collections)
        .into_iter()
        .flatten()
        .collect()
}

/// Load saved collections, resolve the date range and run the filter pipeline.
fn load_and_filter(args: &FilterArgs, config: &Config) -> Result<(Vec<ResultCollection>, FilterOptions)> {
    let (mut collections, stats) = load_collections(&args.input)?;
    if stats.dropped > 0 {
        warn!(dropped = stats.dropped, "Skipped malformed headline records");
    }

    let span = collection::min_max_dt(&collections);
    let low = args
        .from
        .or(span.map(|(lo, _)| lo.date()))
        .context("No --from date given and the input has no headlines")?;
    let high = args
        .to
        .or(span.map(|(_, hi)| hi.date()))
        .context("No --to date given and the input has no headlines")?;
    if low > high {
        anyhow::bail!("--from ({low}) is after --to ({high})");
    }

    let mut options = FilterOptions::new(low, high);
    options.dedup_field = args.dedup;
    options.topic_cross_filter = args.cross_filter;
    options.remove_off_topic_terms = args.strip_off_topic;
    if args.delete_punctuation {
        options.normalizer.non_alphanumeric = cheetah::corpus::normalize::NonAlphanumeric::Delete;
    }
    if args.stop_words {
        options.stop_words = Some(load_stop_words(&config.stop_words_path())?);
    }

    let report = filter::run(&mut collections, &options);
    terminal::display_filter_report(&report);
    Ok((collections, options))
}

fn load_stop_words(path: &Path) -> Result<Lexicon> {
    if path.is_file() {
        Lexicon::load(path)
    } else {
        info!(path = %path.display(), "No stop-word file, using bundled English list");
        Ok(Lexicon::english_stop_words())
    }
}

/// Score, bin and persist each collection, printing gross totals.
async fn run_analysis(
    collections: &mut [ResultCollection],
    scorer: CheetahScorer,
    model: Arc<InMemoryVectors>,
    args: &AnalysisArgs,
    filter_options: &FilterOptions,
    config: &Config,
) -> Result<()> {
    let scorer = Arc::new(scorer);
    let stats = analysis::score_collections(
        collections,
        Arc::clone(&scorer),
        model,
        args.workers,
        true,
    )
    .await?;
    terminal::display_score_stats(&scorer, &stats);

    let mut options = AnalysisOptions::new(filter_options.low, filter_options.high, scorer.key());
    options.grouping = args.bins;
    options.smoothing = args.smooth;
    options.series.weight_key = args.weight.clone();
    options.series.skip_zeros = args.skip_zeros;
    if args.mean {
        options.series.aggregation = Aggregation::Mean;
    }

    for collection in collections.iter() {
        let artifact = analysis::build_artifact(collection, &options)?;
        let path = artifact.write(&config.result_dir, &collection.name, scorer.key())?;
        terminal::display_gross_scores(&collection.name, &artifact);
        println!("  {} {}", "Saved".dimmed(), path.display());
    }
    Ok(())
}
