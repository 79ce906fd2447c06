use clap::{Args, Parser, Subcommand};
use prospector_common::{Coordinates, OutputFormat};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "prospector")]
#[command(about = "Find business leads with Gemini and Google Maps grounding")]
#[command(version)]
pub struct Cli {
    /// YAML config file (default: ./prospector.yaml, then the user config dir)
    #[arg(long, global = true, env = "PROSPECTOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Mirror logs to stderr (ignored by the TUI)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive terminal UI (the default)
    Tui(LocationArgs),

    /// Run one search and print the result
    Search(SearchArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct LocationArgs {
    /// Attach the current location
    #[arg(long, conflicts_with = "no_location")]
    pub location: bool,

    /// Never attach a location
    #[arg(long)]
    pub no_location: bool,

    /// Use this latitude instead of looking one up
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Use this longitude instead of looking one up
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl LocationArgs {
    pub fn fixed(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    /// Explicit flags win; coordinates on the command line imply consent;
    /// otherwise the configured default applies.
    pub fn use_location(&self, configured_default: bool) -> bool {
        if self.no_location {
            false
        } else if self.location || self.fixed().is_some() {
            true
        } else {
            configured_default
        }
    }
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// What to look for, e.g. "plumbers open late"
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    #[command(flatten)]
    pub location: LocationArgs,

    /// Output format: text or json
    #[arg(long, value_parser = parse_format, default_value = "text")]
    pub format: OutputFormat,
}

impl SearchArgs {
    pub fn query_text(&self) -> String {
        self.query.join(" ").trim().to_string()
    }
}

fn parse_format(raw: &str) -> Result<OutputFormat, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(format!("unknown format '{other}' (expected text or json)")),
    }
}
