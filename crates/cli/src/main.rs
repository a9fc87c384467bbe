use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use catalog::{Movie, MovieInfo, Review};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::StreamExt;
use server::{MovieAggregator, RetryArgs};
use upstream_client::{FaultKind, UpstreamConfig};

/// movies - Client for the movies service
#[derive(Parser)]
#[command(name = "movies")]
#[command(about = "Query and feed the movies service", long_about = None)]
struct Cli {
    /// Base URL of the movies server
    #[arg(short, long, env = "MOVIES_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    #[command(flatten)]
    retry: RetryArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a movie together with its reviews
    Movie {
        /// Movie info ID
        #[arg(long)]
        id: String,
    },

    /// Follow the live feed of new and updated records
    Watch {
        /// Follow reviews instead of movie infos
        #[arg(long)]
        reviews: bool,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Add a movie info
    AddMovie {
        #[arg(long)]
        name: String,

        #[arg(long)]
        year: i32,

        /// Cast member (repeat for more than one)
        #[arg(long = "cast", required = true)]
        cast: Vec<String>,

        /// Release date as YYYY-MM-DD
        #[arg(long)]
        release_date: Option<NaiveDate>,
    },

    /// Add a review for a movie
    AddReview {
        /// Movie info ID the review belongs to
        #[arg(long)]
        movie_id: String,

        #[arg(long)]
        comment: Option<String>,

        #[arg(long)]
        rating: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let aggregator = connect(&cli).context("Failed to set up upstream clients")?;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Movie { id } => handle_movie(&aggregator, &id).await?,
        Commands::Watch { reviews, limit } => handle_watch(&aggregator, reviews, limit).await?,
        Commands::AddMovie {
            name,
            year,
            cast,
            release_date,
        } => {
            let movie_info = MovieInfo::new(name, year, cast, release_date);
            handle_add_movie(&aggregator, movie_info).await?
        }
        Commands::AddReview {
            movie_id,
            comment,
            rating,
        } => handle_add_review(&aggregator, Review::new(movie_id, comment, rating)).await?,
    }

    Ok(())
}

/// Build the two upstream clients against the server's catalogs
fn connect(cli: &Cli) -> Result<MovieAggregator> {
    let base = cli.server.trim_end_matches('/');
    let upstream = |path: &str| {
        UpstreamConfig::new(format!("{base}{path}"))
            .with_timeout(Duration::from_millis(cli.timeout_ms))
            .with_retry(cli.retry.policy())
    };

    Ok(MovieAggregator::from_config(
        upstream("/v1/movieinfos"),
        upstream("/v1/reviews"),
    )?)
}

/// Handle the 'movie' command
async fn handle_movie(aggregator: &MovieAggregator, id: &str) -> Result<()> {
    let start = Instant::now();
    match aggregator.get_movie(id).await {
        Ok(movie) => {
            print_movie(&movie);
            println!("{}", format!("Fetched in {:?}", start.elapsed()).dimmed());
            Ok(())
        }
        Err(err) if err.kind() == FaultKind::NotFound => {
            println!("{} {}", "✗".red(), err);
            Ok(())
        }
        Err(err) => {
            let leg = err.leg();
            Err(err).with_context(|| format!("Fetching {leg} for movie {id}"))
        }
    }
}

/// Handle the 'watch' command
async fn handle_watch(
    aggregator: &MovieAggregator,
    reviews: bool,
    limit: Option<usize>,
) -> Result<()> {
    let limit = limit.unwrap_or(usize::MAX);
    let feed = if reviews { "reviews" } else { "movie infos" };
    println!("{}", format!("Watching {feed} (Ctrl-C to stop)").bold().blue());

    if reviews {
        let mut stream = aggregator.reviews_client().retrieve_review_stream().take(limit);
        while let Some(review) = stream.next().await {
            print_review(&review.context("Review feed failed")?);
        }
    } else {
        let mut stream = aggregator.movie_info_stream().take(limit);
        while let Some(movie_info) = stream.next().await {
            print_movie_info(&movie_info.context("Movie info feed failed")?);
        }
    }

    println!("{}", "Feed ended".dimmed());
    Ok(())
}

/// Handle the 'add-movie' command
async fn handle_add_movie(aggregator: &MovieAggregator, movie_info: MovieInfo) -> Result<()> {
    let saved = aggregator
        .movie_info_client()
        .add_movie_info(&movie_info)
        .await
        .context("Adding movie info")?;

    println!(
        "{} Added {} with id {}",
        "✓".green(),
        saved.name.bold(),
        saved.movie_info_id.as_deref().unwrap_or("?").cyan()
    );
    Ok(())
}

/// Handle the 'add-review' command
async fn handle_add_review(aggregator: &MovieAggregator, review: Review) -> Result<()> {
    let saved = aggregator
        .reviews_client()
        .add_review(&review)
        .await
        .context("Adding review")?;

    println!(
        "{} Added review {} for movie {}",
        "✓".green(),
        saved.review_id.as_deref().unwrap_or("?").cyan(),
        saved.movie_info_id.as_deref().unwrap_or("?")
    );
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_movie(movie: &Movie) {
    print_movie_info(&movie.movie_info);

    if movie.review_list.is_empty() {
        println!("  {}", "No reviews yet".dimmed());
        return;
    }

    let ratings: Vec<f64> = movie.review_list.iter().filter_map(|r| r.rating).collect();
    if !ratings.is_empty() {
        let average = ratings.iter().sum::<f64>() / ratings.len() as f64;
        println!(
            "  {} {:.1} from {} rating(s)",
            "Average:".bold(),
            average,
            ratings.len()
        );
    }
    println!("  {}", format!("Reviews ({}):", movie.review_list.len()).bold());
    for review in &movie.review_list {
        print_review(review);
    }
}

fn print_movie_info(movie_info: &MovieInfo) {
    let release = movie_info
        .release_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| movie_info.year.to_string());
    println!(
        "{} {} ({}) [{}]",
        "•".green(),
        movie_info.name.bold(),
        release,
        movie_info.movie_info_id.as_deref().unwrap_or("unsaved").cyan()
    );
    println!("  Cast: {}", movie_info.cast.join(", "));
}

fn print_review(review: &Review) {
    let rating = review
        .rating
        .map(|rating| format!("{rating:.1}"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "    {} {} {}",
        rating.yellow(),
        review.comment.as_deref().unwrap_or(""),
        format!("(movie {})", review.movie_info_id.as_deref().unwrap_or("?")).dimmed()
    );
}
