use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use doors_core::{Credentials, DetailCredentials, DetailParams, JobRequest, ListingParams};
use doors_logging::LogDestination;

pub const ENV_LISTING_USER: &str = "DOORS_SF_USER";
pub const ENV_LISTING_PASSWORD: &str = "DOORS_SF_PASSWORD";
pub const ENV_ACCOUNT_USER: &str = "DOORS_CLIC_USER";
pub const ENV_ACCOUNT_PASSWORD: &str = "DOORS_CLIC_PASSWORD";
pub const ENV_OPERATOR_CODE: &str = "DOORS_CSR_CODE";

#[derive(Parser, Debug)]
#[command(name = "doors")]
#[command(
    version,
    about = "Door-to-door prospect listing and account detail scraper",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory exports are written to
    #[arg(long, global = true, default_value = "output")]
    pub dest: PathBuf,

    /// Configuration file (created with defaults when missing)
    #[arg(long, global = true, default_value = "doors.ron")]
    pub config: PathBuf,

    /// Run the browser without a window
    #[arg(long, global = true)]
    pub headless: bool,

    /// WebDriver endpoint, overrides the configuration file
    #[arg(long, global = true)]
    pub webdriver_url: Option<String>,

    /// Where log lines go
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scrape the prospect listing for a city
    Listing(AreaArgs),
    /// Look up account details for a previous listing export
    Details {
        /// Listing export (.json or .csv)
        #[arg(long)]
        input: PathBuf,
    },
    /// Listing, then account details over its export
    Full(AreaArgs),
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct AreaArgs {
    #[arg(long)]
    pub city: String,

    /// Search by street instead of city
    #[arg(long)]
    pub street: Option<String>,

    /// Regional area code filter, e.g. H7N
    #[arg(long)]
    pub rta: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

impl Cli {
    /// Builds the job request, reading credentials through `lookup`.
    pub fn request_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<JobRequest> {
        let var = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("environment variable {name} is not set"))
        };
        let listing = |area: &AreaArgs| -> Result<ListingParams> {
            Ok(ListingParams {
                credentials: Credentials::new(var(ENV_LISTING_USER)?, var(ENV_LISTING_PASSWORD)?),
                city: area.city.clone(),
                street: non_blank(&area.street),
                rta: non_blank(&area.rta),
                dest_dir: self.dest.clone(),
            })
        };
        let details = || -> Result<DetailCredentials> {
            Ok(DetailCredentials {
                account_portal: Credentials::new(
                    var(ENV_ACCOUNT_USER)?,
                    var(ENV_ACCOUNT_PASSWORD)?,
                ),
                operator_code: var(ENV_OPERATOR_CODE)?,
            })
        };

        let request = match &self.command {
            Command::Listing(area) => JobRequest::Listing(listing(area)?),
            Command::Details { input } => JobRequest::Details(DetailParams {
                input: input.clone(),
                dest_dir: self.dest.clone(),
                credentials: details()?,
            }),
            Command::Full(area) => JobRequest::Full {
                listing: listing(area)?,
                details: details()?,
            },
        };
        Ok(request)
    }

    pub fn request_from_env(&self) -> Result<JobRequest> {
        self.request_with(|name| env::var(name).ok())
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
