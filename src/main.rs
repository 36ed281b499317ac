use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::future;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use riskfeed::analysis::ArticleAnalyzer;
use riskfeed::environment::Settings;
use riskfeed::logging;
use riskfeed::pipeline::{BatchOutcome, Pipeline};
use riskfeed::report::{filter_by_topic, topics, ALL_TOPICS};
use riskfeed::rss::{FeedCache, FeedFetcher, FeedSource, HttpFeedClient};

#[derive(Parser)]
#[clap(name = "riskfeed", about = "Climate risk and insurance news analysis")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, analyze and report once
    Run {
        /// Only process the named source (repeatable)
        #[clap(short, long)]
        source: Vec<String>,

        /// Only show articles tagged with this key insight
        #[clap(short, long, default_value = ALL_TOPICS)]
        topic: String,

        /// Print the report as JSON
        #[clap(long)]
        json: bool,
    },

    /// Repeat the batch every UPDATE_INTERVAL minutes until Ctrl-C
    Watch {
        /// Print each report as JSON
        #[clap(long)]
        json: bool,
    },

    /// Look up research papers on a topic
    Research {
        #[clap(required = true)]
        topic: String,
    },

    /// List configured feed sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::configure_logging();

    let args = Cli::parse();
    let settings = Settings::from_env()?;

    match args.command {
        Commands::Run { source, topic, json } => {
            let sources = select_sources(&settings, &source)?;
            let pipeline = build_pipeline(&settings, Arc::new(FeedCache::new()))?;
            let outcome = pipeline.run(&sources).await;
            print_outcome(&outcome, &topic, json)?;
        }
        Commands::Watch { json } => watch(&settings, json).await?,
        Commands::Research { topic } => research(&settings, &topic).await?,
        Commands::Sources => {
            for source in &settings.sources {
                let keywords = if source.keywords.is_empty() {
                    "(all items)".dimmed().to_string()
                } else {
                    source.keywords.join(", ")
                };
                println!("{}  {}\n   {}", source.name.bright_white(), source.url.bright_cyan(), keywords);
            }
        }
    }

    Ok(())
}

fn build_pipeline(settings: &Settings, cache: Arc<FeedCache>) -> Result<Pipeline> {
    let fetcher = FeedFetcher::new(Arc::new(HttpFeedClient::new()?), cache)
        .with_freshness(settings.cache_timeout)
        .with_max_items(settings.max_items);
    let analyzer = ArticleAnalyzer::new(Arc::new(settings.llm_params()))
        .with_categories(settings.categories.clone(), &settings.default_category);

    Ok(Pipeline::new(fetcher, analyzer).with_concurrency(settings.analysis_concurrency))
}

fn select_sources(settings: &Settings, names: &[String]) -> Result<Vec<FeedSource>> {
    if names.is_empty() {
        return Ok(settings.sources.clone());
    }

    names
        .iter()
        .map(|name| match settings.source(name) {
            Some(source) => Ok(source.clone()),
            None => bail!("unknown feed source '{}'", name),
        })
        .collect()
}

async fn watch(settings: &Settings, json: bool) -> Result<()> {
    let cache = Arc::new(FeedCache::new());
    let pipeline = build_pipeline(settings, cache)?;

    let shutdown = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", err);
            future::pending::<()>().await;
        }
        info!("Ctrl-C received, stopping.");
    };

    let batches = pipeline
        .run_until(&settings.sources, settings.update_interval, shutdown, |outcome| {
            if let Err(err) = print_outcome(outcome, ALL_TOPICS, json) {
                error!("Failed to print report: {}", err);
            }
            info!(
                "Next update in {} minutes ({} feeds cached)",
                settings.update_interval.as_secs() / 60,
                pipeline.fetcher().cache().len()
            );
        })
        .await;

    info!("Stopped after {} batches", batches);
    Ok(())
}

async fn research(settings: &Settings, topic: &str) -> Result<()> {
    let finder = settings.research_finder()?;
    if !finder.is_enabled() {
        println!("{}", "TAVILY_API_KEY is not set, research lookup is disabled".bright_yellow());
    }

    let papers = finder.find_papers(topic).await;
    if papers.is_empty() {
        println!("No research papers found for {}", topic.bright_white());
        return Ok(());
    }

    for (i, paper) in papers.iter().enumerate() {
        println!(
            "{}. {} ({:.2})\n   {}",
            i + 1,
            paper.title.bright_white(),
            paper.relevance_score,
            paper.url.bright_cyan()
        );
        if !paper.snippet.is_empty() {
            println!("   {}", paper.snippet.dimmed());
        }
    }

    Ok(())
}

fn print_outcome(outcome: &BatchOutcome, topic: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let report = &outcome.report;
    println!("\n{}", "═".repeat(100).bright_blue());
    println!(
        "{}  {}",
        "RISK REPORT".bright_blue(),
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string().bright_yellow()
    );
    println!("{}", "═".repeat(100).bright_blue());

    println!("{}: {}", "Total Articles".bright_blue(), report.total_articles());
    for (category, count) in &report.summary.categories {
        println!("  {}: {}", category.bright_magenta(), count);
    }

    let all_topics = topics(&report.articles);
    if !all_topics.is_empty() {
        println!("{}: {}", "Topics".bright_blue(), all_topics.join(", ").dimmed());
    }

    for article in filter_by_topic(&report.articles, topic) {
        let analysis = &article.analysis;
        println!("\n{}", "─".repeat(80).dimmed());
        println!(
            "{} [{}] {}",
            article.article.title.bright_white(),
            article.category.bright_magenta(),
            format!("relevance {}/10", analysis.relevance_score).bright_green()
        );
        println!(
            "{} | {}",
            article.article.source_name.dimmed(),
            article.article.url.bright_cyan()
        );
        print_list("Key Insights", &analysis.key_insights);
        print_list("Risks", &analysis.risks);
        print_list("Opportunities", &analysis.opportunities);
    }

    if !outcome.failures.is_empty() {
        println!("\n{}", "Failures".bright_red());
        println!("{}", "─".repeat(80).dimmed());
        for (i, failure) in outcome.failures.iter().enumerate() {
            println!("{}. [{}] {}: {}", i + 1, failure.stage, failure.subject, failure.message.bright_red());
        }
    }

    println!("\n{}", "═".repeat(100).bright_blue());
    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("  {}", label.bright_blue());
    for item in items {
        println!("   - {}", item);
    }
}
