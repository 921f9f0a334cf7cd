use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use engine::{ProductRecommendation, RecommendationSource, RecommenderConfig, ReviewRecommender};
use rayon::prelude::*;
use review_loader::io::export_rating_table;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// ReviewRecs - Product Recommendation Engine
#[derive(Parser)]
#[command(name = "review-recs")]
#[command(about = "Product recommendations from review logs using user-based collaborative filtering", long_about = None)]
struct Cli {
    /// Path to the gzip-compressed review log
    #[arg(short, long, default_value = "data/movies.txt.gz")]
    input: PathBuf,

    /// JSON file with recommender settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the neighborhood similarity threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Return nothing for users whose neighborhood yields no candidates
    #[arg(long)]
    no_fallback: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get product recommendations for a user
    Recommend {
        /// External user ID, as it appears in the review log
        #[arg(long)]
        user_id: String,

        /// Number of recommendations to return (config default if omitted)
        #[arg(long)]
        limit: Option<usize>,

        /// Show the user's neighborhood
        #[arg(long)]
        explain: bool,
    },

    /// Show dataset totals
    Stats,

    /// Write the user_index,item_index,score table
    Export {
        /// Destination file
        #[arg(long)]
        output: PathBuf,
    },

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Recommendations per request
        #[arg(long, default_value = "3")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Load the review log (this may take a moment)
    println!("Loading reviews from {}...", cli.input.display());
    let start = Instant::now();
    let recommender = ReviewRecommender::from_path(&cli.input, config)
        .with_context(|| format!("Failed to load review log {}", cli.input.display()))?;
    println!("{} Loaded dataset in {:?}", "✓".green(), start.elapsed());

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            user_id,
            limit,
            explain,
        } => handle_recommend(&recommender, &user_id, limit, explain)?,
        Commands::Stats => handle_stats(&recommender),
        Commands::Export { output } => handle_export(&recommender, &output)?,
        Commands::Benchmark { requests, limit } => handle_benchmark(&recommender, requests, limit)?,
    }

    Ok(())
}

/// Config file first, then flag overrides
fn load_config(cli: &Cli) -> Result<RecommenderConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config {}", path.display()))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => RecommenderConfig::default(),
    };

    if let Some(threshold) = cli.threshold {
        config = config.with_similarity_threshold(threshold);
    }
    if cli.no_fallback {
        config = config.with_cold_start_fallback(false);
    }

    config.validate().context("Invalid recommender settings")?;
    info!(?config, "Using recommender settings");
    Ok(config)
}

/// Handle the 'recommend' command
fn handle_recommend(
    recommender: &ReviewRecommender,
    user_id: &str,
    limit: Option<usize>,
    explain: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(recommender.config().default_limit);
    let recommendations = recommender.recommend(user_id, limit)?;

    print_recommendations(user_id, &recommendations);

    if explain {
        let neighbors = recommender.neighbors_of(user_id)?;
        println!(
            "{}",
            format!("Neighborhood ({} users):", neighbors.len()).bold().blue()
        );
        for (neighbor_id, similarity) in neighbors.iter().take(20) {
            println!("  - {} (similarity {:.3})", neighbor_id, similarity);
        }
        if neighbors.len() > 20 {
            println!("  ... and {} more", neighbors.len() - 20);
        }
    }
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(recommender: &ReviewRecommender) {
    let users = recommender.total_users();
    let products = recommender.total_products();
    let reviews = recommender.total_reviews();

    println!("{}", "Dataset statistics:".bold().blue());
    println!("{}Reviews: {}", "• ".green(), reviews);
    println!("{}Products: {}", "• ".green(), products);
    println!("{}Users: {}", "• ".green(), users);
    if users > 0 {
        println!("{}Reviews per user: {:.2}", "• ".cyan(), reviews as f64 / users as f64);
    }
    if products > 0 {
        println!("{}Reviews per product: {:.2}", "• ".cyan(), reviews as f64 / products as f64);
    }
}

/// Handle the 'export' command
fn handle_export(recommender: &ReviewRecommender, output: &Path) -> Result<()> {
    let rows = export_rating_table(recommender.index().store(), output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("{} Wrote {} rows to {}", "✓".green(), rows, output.display());
    Ok(())
}

/// Handle the 'benchmark' command
fn handle_benchmark(recommender: &ReviewRecommender, requests: usize, limit: usize) -> Result<()> {
    let users = recommender.index().users();
    if users.is_empty() {
        return Err(anyhow!("No users loaded, nothing to benchmark"));
    }

    // Random external user IDs from the loaded log
    let user_ids: Vec<&str> = (0..requests)
        .map(|_| {
            let index = rand::random::<u32>() % users.len() as u32;
            users.external_id_of(index)
        })
        .collect::<std::result::Result<_, _>>()?;

    let start = Instant::now();
    let mut timings: Vec<Duration> = user_ids
        .par_iter()
        .map(|user_id| {
            let request_start = Instant::now();
            recommender.get_recommendations(user_id, limit)?;
            Ok::<_, anyhow::Error>(request_start.elapsed())
        })
        .collect::<Result<_>>()?;
    let wall_time = start.elapsed();

    if timings.is_empty() {
        warn!("No requests made");
        return Ok(());
    }

    let total_latency: Duration = timings.iter().sum();
    let avg_latency = total_latency / timings.len() as u32;
    timings.sort();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];
    let throughput = requests as f64 / wall_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Format and print recommendations
fn print_recommendations(user_id: &str, recommendations: &[ProductRecommendation]) {
    println!(
        "{}",
        format!("Recommendations for {}:", user_id).bold().blue()
    );
    if recommendations.is_empty() {
        println!("  (none)");
        return;
    }

    for (i, rec) in recommendations.iter().enumerate() {
        let label = match rec.source {
            RecommendationSource::Neighborhood => "estimated score",
            RecommendationSource::Popularity => "popularity",
        };
        println!(
            "{}. {} - {}: {:.3}",
            (i + 1).to_string().green(),
            rec.product_id,
            label,
            rec.score
        );
    }
}
