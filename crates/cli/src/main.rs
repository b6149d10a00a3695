use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use domain::{AppConfig, Mood, Role};
use llm_client::OpenAiClient;
use pipeline::{BranchOutcome, PipelineResult};
use server::{ChatSession, DisplayState, RecommendationOrchestrator, RecommendationSession};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::info;

/// Mood Recs - films and music for how you feel
#[derive(Parser)]
#[command(name = "mood-recs")]
#[command(about = "Turns a mood into film and music recommendations via a language model", long_about = None)]
struct Cli {
    /// Number of films (and tracks) to show per request
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Skip the music search
    #[arg(long, global = true)]
    no_music: bool,

    /// Time limit for each upstream call, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get recommendations for a single mood
    Recommend {
        /// How you feel, in any language
        #[arg(long)]
        mood: String,
    },

    /// Read moods line by line; only the latest answer is shown
    Interactive,

    /// Chat with the model (type /clear to start over)
    Chat,
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
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Recommend { mood } => handle_recommend(&config, &mood).await?,
        Commands::Interactive => handle_interactive(&config).await?,
        Commands::Chat => handle_chat(&config).await?,
    }

    Ok(())
}

/// Environment first, then command-line overrides
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().context("Failed to load configuration from the environment")?;

    if let Some(top_k) = cli.top_k {
        config.top_k = top_k;
    }
    if cli.no_music {
        config.music.enabled = false;
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }

    config.validate().context("Invalid command-line override")?;
    Ok(config)
}

/// Handle the 'recommend' command
async fn handle_recommend(config: &AppConfig, text: &str) -> Result<()> {
    let mood = Mood::new(text).context("Mood must not be blank")?;
    let orchestrator = RecommendationOrchestrator::from_config(config);

    let start = Instant::now();
    match orchestrator.run(&mood).await {
        Ok(result) => {
            info!("Recommendation finished in {:?}", start.elapsed());
            if result.is_no_match() {
                print_no_match(result.keyword.as_str());
            } else {
                print_result(&result);
            }
            Ok(())
        }
        Err(error) => {
            println!("{}", error.user_message().red());
            Err(anyhow::Error::new(error).context("Recommendation failed"))
        }
    }
}

/// Handle the 'interactive' command
async fn handle_interactive(config: &AppConfig) -> Result<()> {
    let orchestrator = Arc::new(RecommendationOrchestrator::from_config(config));
    let session = Arc::new(RecommendationSession::new(orchestrator));

    // Render every change of the display slot until the session goes away
    let mut changes = session.subscribe();
    let printer = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let state = changes.borrow_and_update().clone();
            render_state(&state);
        }
    });

    println!("{}", "How do you feel? (one mood per line, Ctrl-D to quit)".bold().blue());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut requests = JoinSet::new();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        reap_finished(&mut requests)?;
        let session = session.clone();
        requests.spawn(async move { session.submit(&line).await });
    }

    while let Some(done) = requests.join_next().await {
        done.context("Request task panicked")?;
    }
    drop(session);
    printer.await.context("Display task panicked")?;

    Ok(())
}

/// Handle the 'chat' command
async fn handle_chat(config: &AppConfig) -> Result<()> {
    let client = Arc::new(OpenAiClient::from_config(&config.completion));
    let mut chat = ChatSession::from_config(client, &config.completion).with_timeout(config.request_timeout);

    println!("{}", "Chat with the model (/clear to start over, Ctrl-D to quit)".bold().blue());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".green());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };

        if line.trim() == "/clear" {
            chat.clear();
            println!("{}", "Conversation cleared.".dimmed());
            continue;
        }

        if let Some(message) = chat.send(&line).await {
            match message.role {
                Role::Assistant => println!("{}", message.content),
                _ => println!("{}", message.content.red()),
            }
        }
    }

    Ok(())
}

/// Drop the handles of requests that already finished, so a long session
/// only holds the ones still in flight
fn reap_finished<T: 'static>(requests: &mut JoinSet<T>) -> Result<usize> {
    let mut reaped = 0;
    while let Some(done) = requests.try_join_next() {
        done.context("Request task panicked")?;
        reaped += 1;
    }
    Ok(reaped)
}

fn render_state(state: &DisplayState) {
    match state {
        DisplayState::Idle => {}
        DisplayState::Loading { request } => {
            println!("{}", format!("[#{}] Looking for recommendations...", request).dimmed());
        }
        DisplayState::Ready { request, result } => {
            println!("{}", format!("[#{}]", request).dimmed());
            print_result(result);
        }
        DisplayState::NoMatch { request, keyword } => {
            println!("{}", format!("[#{}]", request).dimmed());
            print_no_match(keyword.as_str());
        }
        DisplayState::Failed { request, status } => {
            println!("{} {}", format!("[#{}]", request).dimmed(), status.red());
        }
    }
}

fn print_no_match(keyword: &str) {
    println!("No movies or music found for \"{}\". Try describing your mood differently.", keyword);
}

/// Helper function to format and print one recommendation result
fn print_result(result: &PipelineResult) {
    println!("{} {}", "Keyword:".bold(), result.keyword.as_str().yellow());

    println!("{}", "Movies:".bold().blue());
    match &result.films {
        BranchOutcome::Found { items, failed } => {
            for (rank, film) in items.iter().enumerate() {
                println!(
                    "{}. {} ({}) ★ {:.1}",
                    (rank + 1).to_string().green(),
                    film.title.bold(),
                    film.release_date.as_deref().unwrap_or("unknown date"),
                    film.rating
                );
                println!("   Genres: {}", film.genres_line());
                println!("   Cast: {}", film.cast_line());
                if let Some(poster) = &film.poster_url {
                    println!("   Poster: {}", poster.dimmed());
                }
            }
            if !failed.is_empty() {
                println!("   {}", format!("({} more could not be loaded)", failed.len()).dimmed());
            }
        }
        BranchOutcome::NoMatch => println!("   No movies found."),
        BranchOutcome::Failed(error) => println!("   {}", error.user_message().red()),
    }

    let Some(music) = &result.music else {
        return;
    };
    println!("{}", "Music:".bold().blue());
    match music {
        BranchOutcome::Found { items, .. } => {
            for (rank, track) in items.iter().enumerate() {
                println!(
                    "{}. {} - {}",
                    (rank + 1).to_string().green(),
                    track.title.bold(),
                    track.artist
                );
                if let Some(preview) = &track.preview_url {
                    println!("   Preview: {}", preview.dimmed());
                }
            }
        }
        BranchOutcome::NoMatch => println!("   No music found."),
        BranchOutcome::Failed(error) => println!("   {}", error.user_message().red()),
    }
}
