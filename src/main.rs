use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use bank_reviews::config::AppConfig;
use bank_reviews::db::establish_connection;
use bank_reviews::loader::load_final_table;
use bank_reviews::logging::{init_logging, OperationTimer};
use bank_reviews::metrics::PipelineMetrics;
use bank_reviews::pipeline::{self, bank_topic_modeler, corpus_topic_model, ReviewPipeline};
use bank_reviews::topics::format_corpus_report;
use bank_reviews::validation::InputValidator;
use bank_reviews::{MatchMode, PipelineError, SentimentBackend};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score sentiment, rank keywords, assign themes and write the final table
    Analyze {
        /// Cleaned reviews CSV (defaults to paths.cleaned_input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Final table CSV (defaults to paths.final_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sentiment backend
        #[arg(short, long, value_enum)]
        backend: Option<SentimentBackend>,

        /// Themes kept per review
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// YAML or JSON theme taxonomy
        #[arg(short, long)]
        taxonomy: Option<PathBuf>,

        /// How triggers are matched
        #[arg(long, value_enum)]
        match_mode: Option<MatchMode>,

        /// Also write the keyword ranking to this CSV
        #[arg(long)]
        keywords_out: Option<PathBuf>,
    },
    /// Rank corpus keywords by mean TF-IDF weight
    Keywords {
        /// Cleaned reviews CSV (defaults to paths.cleaned_input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of keywords printed
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write the full ranking to this CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fit LDA over the whole corpus and print each topic
    Topics {
        /// Cleaned reviews CSV (defaults to paths.cleaned_input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of topics
        #[arg(short, long)]
        num_topics: Option<usize>,

        /// Sampling passes
        #[arg(short, long)]
        passes: Option<usize>,
    },
    /// Fit a separate topic model for every bank
    TopicsByBank {
        /// Cleaned reviews CSV (defaults to paths.cleaned_input)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of topics per bank
        #[arg(short, long)]
        num_topics: Option<usize>,

        /// Ranked words kept per topic
        #[arg(short, long)]
        top_n: Option<usize>,
    },
    /// Create the schema and register banks
    InitDb {
        /// Bank name to register (repeatable)
        #[arg(short, long = "bank")]
        banks: Vec<String>,
    },
    /// Load the final table into the database
    Load {
        /// Final table CSV (defaults to paths.final_output)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print per-bank review counts afterwards
        #[arg(long)]
        stats: bool,
    },
    /// Analyze then load, using the configured paths
    Run,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load()?;
    apply_overrides(&mut config, &cli.command)?;

    // Initialize logging; the guard flushes the log file on exit
    let log_level = config.get_log_level();
    let log_file = config.logging.file_path.as_deref().map(Path::new);
    let _guard = init_logging(Some(log_level.as_str()), log_file, config.logging.format == "json")?;

    info!("Starting bank-reviews");

    match &cli.command {
        Commands::Analyze {
            input,
            output,
            keywords_out,
            ..
        } => {
            let input = resolve(input.as_ref(), &config.paths.cleaned_input);
            let output = resolve(output.as_ref(), &config.paths.final_output);
            let keywords_out = keywords_out
                .clone()
                .or_else(|| config.paths.keywords_output.as_ref().map(PathBuf::from));
            analyze(&config, &input, &output, keywords_out.as_deref())?;
        },
        Commands::Keywords { input, limit, output } => {
            let input = resolve(input.as_ref(), &config.paths.cleaned_input);
            keywords(&config, &input, limit.unwrap_or(config.keywords.report_limit), output.as_deref())?;
        },
        Commands::Topics { input, .. } => {
            let input = resolve(input.as_ref(), &config.paths.cleaned_input);
            topics(&config, &input)?;
        },
        Commands::TopicsByBank { input, .. } => {
            let input = resolve(input.as_ref(), &config.paths.cleaned_input);
            topics_by_bank(&config, &input)?;
        },
        Commands::InitDb { banks } => init_db(&config, banks)?,
        Commands::Load { input, stats } => {
            let input = resolve(input.as_ref(), &config.paths.final_output);
            load(&config, &input, *stats)?;
        },
        Commands::Run => {
            let input = PathBuf::from(&config.paths.cleaned_input);
            let output = PathBuf::from(&config.paths.final_output);
            let keywords_out = config.paths.keywords_output.as_ref().map(PathBuf::from);
            if analyze(&config, &input, &output, keywords_out.as_deref())? {
                load(&config, &output, false)?;
            }
        },
    }

    Ok(())
}

/// Fold command-line flags into the configuration and validate them
fn apply_overrides(config: &mut AppConfig, command: &Commands) -> Result<()> {
    match command {
        Commands::Analyze {
            backend,
            top_k,
            taxonomy,
            match_mode,
            ..
        } => {
            if let Some(backend) = backend {
                config.sentiment.backend = *backend;
            }
            if let Some(top_k) = top_k {
                InputValidator::validate_top_k(*top_k)?;
                config.themes.top_k = *top_k;
            }
            if let Some(path) = taxonomy {
                InputValidator::validate_input_file(path)?;
                config.themes.taxonomy_path = Some(path.to_string_lossy().into_owned());
            }
            if let Some(mode) = match_mode {
                config.themes.match_mode = *mode;
            }
        },
        Commands::Topics { num_topics, passes, .. } => {
            if let Some(num_topics) = num_topics {
                InputValidator::validate_num_topics(*num_topics)?;
                config.topics.num_topics = *num_topics;
            }
            if let Some(passes) = passes {
                InputValidator::validate_passes(*passes)?;
                config.topics.passes = *passes;
            }
        },
        Commands::TopicsByBank { num_topics, top_n, .. } => {
            if let Some(num_topics) = num_topics {
                InputValidator::validate_num_topics(*num_topics)?;
                config.topics.num_topics = *num_topics;
            }
            if let Some(top_n) = top_n {
                config.topics.bank_top_n = *top_n;
            }
        },
        _ => {},
    }

    config.validate()?;
    InputValidator::validate_database_url(&config.get_database_path())?;
    Ok(())
}

fn resolve(flag: Option<&PathBuf>, configured: &str) -> PathBuf {
    flag.cloned().unwrap_or_else(|| PathBuf::from(configured))
}

fn busy_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.database.busy_timeout_secs)
}

/// Log a stage failure. Only invalid configuration ends the process with an error.
fn report_stage_error(stage: &str, err: PipelineError) -> Result<()> {
    match err {
        PipelineError::Taxonomy(_) | PipelineError::InvalidConfig(_) => {
            Err(anyhow::Error::new(err).context(format!("{stage} failed")))
        },
        other => {
            error!("{} failed: {}", stage, other);
            Ok(())
        },
    }
}

/// Analysis stages; returns whether the final table was written
fn analyze(config: &AppConfig, input: &Path, output: &Path, keywords_out: Option<&Path>) -> Result<bool> {
    InputValidator::validate_input_file(input)?;
    InputValidator::validate_file_path(output)?;

    let mut pipeline = match ReviewPipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => return report_stage_error("analyze", e).map(|()| false),
    };

    match pipeline.run_file(input, output, keywords_out) {
        Ok(report) => {
            info!(
                reviews = report.reviews,
                positive = report.sentiment.positive,
                negative = report.sentiment.negative,
                neutral = report.sentiment.neutral,
                "Analysis complete"
            );
            pipeline.metrics().log_summary();
            Ok(true)
        },
        Err(e) => report_stage_error("analyze", e).map(|()| false),
    }
}

fn keywords(config: &AppConfig, input: &Path, limit: usize, output: Option<&Path>) -> Result<()> {
    InputValidator::validate_input_file(input)?;
    let timer = OperationTimer::new("keywords");

    let result = pipeline::read_and_clean(input).and_then(|reviews| {
        let cleaned: Vec<&str> = reviews.iter().map(|r| r.cleaned_review.as_str()).collect();
        pipeline::keyword_ranker(&config.keywords)?.rank(&cleaned)
    });

    let ranked = match result {
        Ok(ranked) => ranked,
        Err(e) => return report_stage_error("keywords", e),
    };

    if let Some(path) = output {
        if let Err(e) = pipeline::write_keywords(path, &ranked) {
            return report_stage_error("keywords", e);
        }
    }

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "Top {} keywords:", limit.min(ranked.len()))?;
    for keyword in ranked.iter().take(limit) {
        writeln!(stdout, "{:<30} {:.4}", keyword.word, keyword.tfidf)?;
    }

    timer.finish();
    Ok(())
}

fn topics(config: &AppConfig, input: &Path) -> Result<()> {
    InputValidator::validate_input_file(input)?;
    let timer = OperationTimer::new("topics");

    let result = pipeline::read_and_clean(input).and_then(|reviews| {
        let cleaned: Vec<&str> = reviews.iter().map(|r| r.cleaned_review.as_str()).collect();
        corpus_topic_model(&config.topics).fit(&cleaned)
    });

    match result {
        Ok(topics) => {
            writeln!(io::stdout().lock(), "{}", format_corpus_report(&topics))?;
        },
        Err(PipelineError::Vectorizer(reason)) => warn!("Topic modeling skipped: {}", reason),
        Err(e) => return report_stage_error("topics", e),
    }

    timer.finish();
    Ok(())
}

fn topics_by_bank(config: &AppConfig, input: &Path) -> Result<()> {
    InputValidator::validate_input_file(input)?;
    let timer = OperationTimer::new("topics-by-bank");

    match pipeline::read_and_clean(input) {
        Ok(reviews) => {
            let report = bank_topic_modeler(&config.topics).run(&reviews);
            writeln!(io::stdout().lock(), "{report}")?;
        },
        Err(e) => return report_stage_error("topics-by-bank", e),
    }

    timer.finish();
    Ok(())
}

fn init_db(config: &AppConfig, banks: &[String]) -> Result<()> {
    for bank in banks {
        InputValidator::validate_bank_name(bank)?;
    }

    let db = match establish_connection(&config.get_database_path(), busy_timeout(config)) {
        Ok(db) => db,
        Err(e) => return report_stage_error("init-db", e),
    };

    for bank in banks {
        let name = InputValidator::sanitize_text(bank);
        match db.ensure_bank(&name) {
            Ok(bank) => info!("Registered bank {} with id {}", bank.bank_name, bank.bank_id),
            Err(e) => return report_stage_error("init-db", e),
        }
    }

    info!("Database initialized at {}", config.get_database_path());
    Ok(())
}

fn load(config: &AppConfig, input: &Path, show_stats: bool) -> Result<()> {
    InputValidator::validate_input_file(input)?;
    let timer = OperationTimer::new("load");
    let database_path = config.get_database_path();

    let mut metrics = PipelineMetrics::new();
    let report = load_final_table(&database_path, busy_timeout(config), input, &mut metrics);
    metrics.log_summary();
    if report.is_none() {
        return Ok(());
    }

    if show_stats {
        let stats = match establish_connection(&database_path, busy_timeout(config)).and_then(|db| db.get_load_stats()) {
            Ok(stats) => stats,
            Err(e) => return report_stage_error("load statistics", e),
        };
        info!("Total reviews in database: {}", stats.total_reviews);
        for (bank, count) in stats.per_bank {
            info!("{:<30} {:>6}", bank, count);
        }
    }

    timer.finish();
    Ok(())
}
