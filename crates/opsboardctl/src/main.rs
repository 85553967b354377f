//! Opsboard Control - CLI for the opsboard rewards engine
//!
//! Scores actions against an on-disk stats directory and shows levels,
//! badges, ranks and weekly challenges.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "opsboardctl")]
#[command(about = "Opsboard rewards - XP, badges and ranks for hotel staff", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/opsboard/rewards.toml, then /etc/opsboard/rewards.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stats directory (overrides store.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one action for a user
    Apply {
        #[arg(long)]
        user: String,

        /// Action as JSON, e.g. '{"kind":"resolve-incident","severity":"critical"}'
        #[arg(long)]
        action: String,
    },

    /// Replay a JSONL file of {"user", "at"?, "action"} events
    Replay {
        file: PathBuf,
    },

    /// Show raw stats for a user
    Stats {
        #[arg(long)]
        user: String,
    },

    /// Show level and progress for a user
    Level {
        #[arg(long)]
        user: String,
    },

    /// Show composite rank for a user
    Rank {
        #[arg(long)]
        user: String,
    },

    /// Show visible badges for a user
    Badges {
        #[arg(long)]
        user: String,
    },

    /// Show this week's challenges for a user
    Challenges {
        #[arg(long)]
        user: String,
    },

    /// Show users ranked by composite points
    Leaderboard {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// List level bands
    Levels,

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context::open(cli.config.as_deref(), cli.data_dir, cli.json)?;

    match cli.command {
        Commands::Apply { user, action } => commands::handle_apply(&ctx, &user, &action),
        Commands::Replay { file } => commands::handle_replay(&ctx, &file),
        Commands::Stats { user } => commands::handle_stats(&ctx, &user),
        Commands::Level { user } => commands::handle_level(&ctx, &user),
        Commands::Rank { user } => commands::handle_rank(&ctx, &user),
        Commands::Badges { user } => commands::handle_badges(&ctx, &user),
        Commands::Challenges { user } => commands::handle_challenges(&ctx, &user),
        Commands::Leaderboard { limit } => commands::handle_leaderboard(&ctx, limit),
        Commands::Levels => commands::handle_levels(&ctx),
        Commands::Config => commands::handle_config(&ctx),
    }
}
