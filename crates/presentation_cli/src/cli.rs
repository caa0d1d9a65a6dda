//! Argument definitions

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use domain::{DomainError, GeoLocation, Language};

/// EFA transit query CLI
#[derive(Debug, Parser)]
#[command(name = "efa-cli")]
#[command(author, version, about = "Query the South Tyrol EFA transit backend", long_about = None)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./config.toml when present)
    #[arg(short, long, global = true, env = "EFA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Answer a free-text question (trip, departures or stop lookup)
    ///
    /// Example: efa-cli search "von Bozen nach Meran morgen um 8"
    Search {
        /// Question in German, Italian or English
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Language of the question (detected when omitted)
        #[arg(short, long)]
        language: Option<Language>,

        /// Use the LLM extractor before the rule engine
        #[arg(long)]
        llm: bool,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Departure board for a stop id
    Departures {
        /// Upstream stop id, e.g. 66002000
        stop_id: String,

        /// Maximum number of departures
        #[arg(short = 'n', long)]
        limit: Option<u32>,

        /// Window length in minutes
        #[arg(short, long)]
        duration: Option<u32>,

        /// Skip real-time data
        #[arg(long)]
        no_delays: bool,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Look up stops by name
    Stops {
        /// Place name
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Maximum number of stops
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        #[command(flatten)]
        focus: FocusArgs,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Resolve a question without querying trips or departures
    Resolve {
        /// Question in German, Italian or English
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Language of the question (detected when omitted)
        #[arg(short, long)]
        language: Option<Language>,
    },
}

/// Optional point used to rank and disambiguate stops
#[derive(Debug, Clone, Copy, Args)]
pub struct FocusArgs {
    /// Latitude of the focus point
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude of the focus point
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl FocusArgs {
    /// The focus point, if both coordinates were given
    pub fn location(&self) -> Result<Option<GeoLocation>, DomainError> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => GeoLocation::new(lat, lon).map(Some),
            _ => Ok(None),
        }
    }
}

/// Join positional words back into one string
pub fn join_words(words: &[String]) -> String {
    words.join(" ")
}
