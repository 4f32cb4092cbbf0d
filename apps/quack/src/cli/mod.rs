//! # Quack CLI Module
//!
//! The command-line interface for Quack.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database
//! - `status` - Show network metrics
//! - `compact` - Reclaim free space in the database file
//! - `register`, `login`, `profile`, `bio` - Accounts
//! - `follow`, `followers`, `following` - Follow graph
//! - `post`, `posts`, `caption`, `show` - Pictures
//! - `like`, `comment` - Engagement
//! - `feed`, `explore` - Feeds
//! - `notifications` - Notification log

mod commands;

use crate::config::{BackendKind, Overrides, Settings};
use clap::{Parser, Subcommand};
use quack_core::{QuackError, Role};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Quack - photo sharing for ducks
///
/// Users upload pictures, follow each other, like and comment,
/// and are notified when someone engages with them.
#[derive(Parser, Debug)]
#[command(name = "quack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database file [default: quack.redb]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend [default: redb]
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to [default: 127.0.0.1]
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to [default: 8080]
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Show network status
    Status,

    /// Compact the database file
    Compact,

    /// Register a new user
    Register {
        username: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Profile bio
        #[arg(short, long, default_value = "")]
        bio: String,

        /// Account role (regular, admin)
        #[arg(short, long, default_value = "regular")]
        role: Role,
    },

    /// Check a user's password
    Login {
        username: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Show a user's profile
    Profile { username: String },

    /// Replace a user's bio
    Bio { username: String, bio: String },

    /// Follow a user
    Follow { follower: String, followed: String },

    /// List a user's followers
    Followers { username: String },

    /// List the users someone follows
    Following { username: String },

    /// Upload a picture
    Post {
        owner: String,

        /// Path of the uploaded image
        #[arg(short, long)]
        image: String,

        /// Picture caption
        #[arg(short, long, default_value = "")]
        caption: String,
    },

    /// List a user's pictures, newest first
    Posts { username: String },

    /// Replace a picture's caption
    Caption {
        /// Post id, e.g. alice_1
        post: String,
        caption: String,
    },

    /// Show a picture with its likes and comments
    Show {
        /// Post id, e.g. alice_1
        post: String,
    },

    /// Like a picture, or unlike it if already liked
    Like {
        actor: String,
        /// Post id, e.g. alice_1
        post: String,
    },

    /// Comment on a picture
    Comment {
        actor: String,
        /// Post id, e.g. alice_1
        post: String,
        text: String,
    },

    /// Show a user's home feed
    Feed { username: String },

    /// List every picture, newest first
    Explore {
        /// Mark pictures this user likes
        #[arg(long)]
        viewer: Option<String>,
    },

    /// Show a user's notifications, newest first
    Notifications { username: String },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), QuackError> {
    let json_mode = cli.json_mode;
    let (host, port) = match &cli.command {
        Some(Commands::Server { host, port }) => (host.clone(), *port),
        _ => (None, None),
    };
    let settings = Settings::load(
        cli.config.as_deref(),
        Overrides {
            database: cli.database,
            backend: cli.backend,
            host,
            port,
        },
    )?;

    if cli.verbose {
        tracing::info!(
            database = %settings.database.display(),
            backend = %settings.backend,
            "settings resolved"
        );
    }

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(&settings).await,
        Some(Commands::Init { force }) => cmd_init(&settings, force),
        Some(Commands::Status) | None => cmd_status(&settings, json_mode),
        Some(Commands::Compact) => cmd_compact(&settings, json_mode),
        Some(Commands::Register {
            username,
            password,
            bio,
            role,
        }) => cmd_register(&settings, json_mode, &username, &password, &bio, role),
        Some(Commands::Login { username, password }) => {
            cmd_login(&settings, json_mode, &username, &password)
        }
        Some(Commands::Profile { username }) => cmd_profile(&settings, json_mode, &username),
        Some(Commands::Bio { username, bio }) => cmd_bio(&settings, &username, &bio),
        Some(Commands::Follow { follower, followed }) => {
            cmd_follow(&settings, &follower, &followed)
        }
        Some(Commands::Followers { username }) => {
            cmd_followers(&settings, json_mode, &username)
        }
        Some(Commands::Following { username }) => {
            cmd_following(&settings, json_mode, &username)
        }
        Some(Commands::Post {
            owner,
            image,
            caption,
        }) => cmd_post(&settings, json_mode, &owner, &image, &caption),
        Some(Commands::Posts { username }) => cmd_posts(&settings, json_mode, &username),
        Some(Commands::Caption { post, caption }) => cmd_caption(&settings, &post, &caption),
        Some(Commands::Show { post }) => cmd_show(&settings, json_mode, &post),
        Some(Commands::Like { actor, post }) => cmd_like(&settings, json_mode, &actor, &post),
        Some(Commands::Comment { actor, post, text }) => {
            cmd_comment(&settings, json_mode, &actor, &post, &text)
        }
        Some(Commands::Feed { username }) => cmd_feed(&settings, json_mode, &username),
        Some(Commands::Explore { viewer }) => cmd_explore(&settings, json_mode, viewer.as_deref()),
        Some(Commands::Notifications { username }) => {
            cmd_notifications(&settings, json_mode, &username)
        }
    }
}
