// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::helpers::telemetry::setup_tracing;
use crate::{check, draw, draws, stats, ticket, tickets, verify};
use anyhow::Result;
use clap::{command, ArgAction, Parser, Subcommand};
use lotto_config::validation::ValidUrl;
use lotto_config::{load_config, AppConfig};
use tracing::{info, instrument, Level};

#[derive(Parser, Debug)]
#[command(name = "lotto")]
#[command(about = "A CLI for the LottoCrypt privacy preserving lottery", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,

    /// Indicate error levels by adding additional `-v` arguments. Eg. `lotto -vvv` will give you
    /// trace level output
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true
    )]
    pub verbose: u8,

    /// Silence all output. This argument cannot be used alongside `-v`
    #[arg(
        short,
        long,
        action = ArgAction::SetTrue,
        conflicts_with = "verbose",
        global = true
    )]
    quiet: bool,

    /// Set the Open Telemetry collector grpc endpoint. Eg. http://localhost:4317
    #[arg(long = "otel", global = true)]
    pub otel: Option<ValidUrl>,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else {
            match self.verbose {
                0 => Level::WARN,  //
                1 => Level::INFO,  // -v
                2 => Level::DEBUG, // -vv
                _ => Level::TRACE, // -vvv
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn execute(self) -> Result<()> {
        let config = self.load_config()?;

        setup_tracing(&config, self.log_level())?;
        info!("Config loaded from: {:?}", config.config_file());

        match self.command {
            Commands::Ticket { numbers } => ticket::execute(&config, numbers).await?,
            Commands::Draw { numbers } => draw::execute(&config, numbers).await?,
            Commands::Verify { id } => verify::execute(&config, &id).await?,
            Commands::Tickets { mine, json } => tickets::execute(&config, mine, json).await?,
            Commands::Draws { json } => draws::execute(&config, json).await?,
            Commands::Stats { json } => stats::execute(&config, json).await?,
            Commands::Check => check::execute(&config).await?,
        }

        Ok(())
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        let config = load_config(self.config.clone(), self.otel.clone().map(Into::into))?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Buy a ticket. Without numbers a quick pick is used
    Ticket {
        /// Six distinct numbers between 1 and 49. Eg. `--numbers 3,17,22,28,35,49`
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        numbers: Option<Vec<u8>>,
    },

    /// Create a draw with encrypted winning numbers
    Draw {
        /// Fix the winning numbers instead of drawing them at random
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        numbers: Option<Vec<u8>>,
    },

    /// Verify a ticket through the decryption proof protocol
    Verify {
        /// The ticket id. Eg. `ticket-1700000000000`
        id: String,
    },

    /// List tickets
    Tickets {
        /// Only show tickets bought by the configured signer
        #[arg(long)]
        mine: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List draws
    Draws {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show ticket, draw and prize totals
    Stats {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the lottery contract responds
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_ticket_numbers() {
        let cli = Cli::parse_from(["lotto", "ticket", "--numbers", "3,17,22,28,35,49"]);
        let Commands::Ticket { numbers } = cli.command else {
            panic!("expected the ticket command");
        };
        assert_eq!(numbers, Some(vec![3, 17, 22, 28, 35, 49]));
    }

    #[test]
    fn test_log_level() {
        assert_eq!(Cli::parse_from(["lotto", "check"]).log_level(), Level::WARN);
        assert_eq!(Cli::parse_from(["lotto", "-vv", "check"]).log_level(), Level::DEBUG);
        assert_eq!(Cli::parse_from(["lotto", "-q", "check"]).log_level(), Level::ERROR);
        assert!(Cli::try_parse_from(["lotto", "-q", "-v", "check"]).is_err());
    }
}
