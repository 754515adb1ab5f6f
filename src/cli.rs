//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::{Rating, Role, TargetId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Rateboard - rate people and places, browse the ranking
///
/// Register targets, leave reviews, and see who comes out on top. Serves a
/// two-page web dashboard or works straight from the terminal.
///
/// Examples:
///   rateboard serve --memory
///   rateboard register --name "Bandejão" --role "Lugar/Comida" --department H8
///   rateboard review --target "Bandejão" --rating 2 --comment "Cold again"
///   rateboard ranking --category Professor --format json
///   rateboard show "Bandejão"
///   rateboard init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .rateboard.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Supabase project URL
    #[arg(long, value_name = "URL", env = "SUPABASE_URL", global = true)]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(
        long,
        value_name = "KEY",
        env = "SUPABASE_KEY",
        hide_env_values = true,
        global = true
    )]
    pub supabase_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the web dashboard
    Serve(ServeArgs),

    /// Register a new target
    Register(RegisterArgs),

    /// Submit a review for a target
    Review(ReviewArgs),

    /// List registered targets
    Targets,

    /// Print the ranking
    Ranking(RankingArgs),

    /// Print every review of one target
    Show(ShowArgs),

    /// Generate a default .rateboard.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on (default from config: 127.0.0.1:8501)
    #[arg(long, value_name = "ADDR", env = "RATEBOARD_BIND")]
    pub bind: Option<String>,

    /// Keep data in memory instead of Supabase
    #[arg(long)]
    pub memory: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Name of the person or entity
    #[arg(long)]
    pub name: String,

    /// Category: Professor, Aluno, Funcionário, Lugar/Comida or Outro
    #[arg(long, value_parser = parse_role)]
    pub role: Role,

    /// Department or course (e.g. COMP, H8)
    #[arg(long, default_value = "")]
    pub department: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReviewArgs {
    /// Name of the target to review
    #[arg(
        long,
        value_name = "NAME",
        conflicts_with = "target_id",
        required_unless_present = "target_id"
    )]
    pub target: Option<String>,

    /// Id of the target to review
    #[arg(long, value_name = "ID")]
    pub target_id: Option<TargetId>,

    /// Rating from 1 to 5
    #[arg(long, default_value = "3", value_parser = parse_rating)]
    pub rating: Rating,

    /// Comment (be respectful!)
    #[arg(long, default_value = "")]
    pub comment: String,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RankingArgs {
    /// Restrict the ranking to one category
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ShowArgs {
    /// Name of the target
    pub name: String,

    /// Only consider reviews of targets in this category
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

fn parse_role(s: &str) -> Result<Role, String> {
    s.parse().map_err(|e: crate::models::ValidationError| e.to_string())
}

fn parse_rating(s: &str) -> Result<Rating, String> {
    s.parse().map_err(|e: crate::models::ValidationError| e.to_string())
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.supabase_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Supabase URL must start with 'http://' or 'https://'".to_string());
            }
        }

        match &self.command {
            Command::Register(register) if register.name.trim().is_empty() => {
                Err("Name is required.".to_string())
            }
            Command::Ranking(RankingArgs {
                category: Some(category),
                ..
            })
            | Command::Show(ShowArgs {
                category: Some(category),
                ..
            }) => category
                .parse::<crate::analysis::CategoryFilter>()
                .map(|_| ())
                .map_err(|e| e.to_string()),
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
