//! CLI definition using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use souq_types::OutputFormat;

#[derive(Parser)]
#[command(name = "souq")]
#[command(version)]
#[command(about = "Marketplace engine: vehicle pricing, barter matching and recommendations")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        /// Listen address (overrides SOUQ_BIND and config)
        #[arg(long, short = 'b')]
        bind: Option<String>,
    },

    /// Estimate a vehicle price locally
    Price {
        /// Make (e.g. "Toyota", "Mercedes-Benz")
        #[arg(long)]
        make: String,

        #[arg(long)]
        model: String,

        /// Model year
        #[arg(long)]
        year: i32,

        /// new, like_new, excellent, good, fair, poor
        #[arg(long)]
        condition: String,

        /// Odometer reading in km
        #[arg(long, allow_negative_numbers = true)]
        mileage: i64,

        /// Governorate (e.g. "Cairo", "Port Said")
        #[arg(long)]
        governorate: String,
    },

    /// Run the barter matcher over the store
    Barter {
        /// Only chains involving this user
        #[arg(long, short = 'u')]
        user: Option<String>,

        /// Longest chain to search. Uses config value if not specified.
        #[arg(long)]
        max_len: Option<usize>,

        /// Default value tolerance (0.15 = 15%). Uses config value if not specified.
        #[arg(long)]
        tolerance: Option<f64>,

        /// Maximum chains shown. Uses config value if not specified.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Rank listings for a user
    Recommend {
        #[arg(long, short = 'u')]
        user: String,

        /// Number of listings. Uses config value if not specified.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Load sample data or CSV files into the store
    Seed {
        /// Folder of CSV files (listings.csv, barter_items.csv, ...). Built-in sample if omitted.
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Remove previously seeded rows instead of seeding
        #[arg(long)]
        clean: bool,
    },

    /// Remove duplicate listings and barter items (keeps the oldest)
    Dedupe,

    /// Run the smoke test against a running API
    Smoke {
        /// API base URL (overrides API_URL and config)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Export active listings with estimates to Excel
    Export {
        /// Output Excel file path
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Issue development tokens
    Token {
        /// Issue an access/refresh pair for this user
        #[arg(long, short = 'u', conflicts_with = "refresh", required_unless_present = "refresh")]
        user: Option<String>,

        /// Exchange a refresh token for a new access token
        #[arg(long)]
        refresh: Option<String>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set environment name
        #[arg(long)]
        set_environment: Option<String>,

        /// Set listen address
        #[arg(long)]
        set_bind: Option<String>,

        /// Set store directory
        #[arg(long)]
        set_store_dir: Option<PathBuf>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Set smoke test base URL
        #[arg(long)]
        set_api_url: Option<String>,

        /// Set default barter tolerance
        #[arg(long)]
        set_tolerance: Option<f64>,

        /// Set longest barter chain searched
        #[arg(long)]
        set_max_chain_length: Option<usize>,

        /// Set default recommendation count
        #[arg(long)]
        set_recommendation_limit: Option<usize>,

        /// Set reference price TOML path
        #[arg(long)]
        set_market_data: Option<PathBuf>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_price() {
        let cli = Cli::try_parse_from([
            "souq", "price", "--make", "Toyota", "--model", "Corolla", "--year", "2019",
            "--condition", "good", "--mileage", "90000", "--governorate", "Cairo", "-f", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Price { make, mileage, .. } => {
                assert_eq!(make, "Toyota");
                assert_eq!(mileage, 90000);
            }
            _ => panic!("expected price"),
        }
    }

    #[test]
    fn test_token_requires_user_or_refresh() {
        assert!(Cli::try_parse_from(["souq", "token"]).is_err());
        assert!(Cli::try_parse_from(["souq", "token", "--user", "a", "--refresh", "x"]).is_err());
        assert!(Cli::try_parse_from(["souq", "token", "--refresh", "x"]).is_ok());
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["souq", "dedupe", "-v"]).unwrap();
        assert!(cli.verbose);
    }
}
