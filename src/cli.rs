use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::apply::{Action, Mode};

/// openvpn-configure - install and configure an OpenVPN server on this host
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify config file to use
    #[arg(
        short,
        long,
        env = "OPENVPN_CONFIGURE_CONFIG_FILE",
        default_value = "/etc/openvpn-configure/config.toml",
        global = true
    )]
    pub config_file: PathBuf,

    /// OpenVPN operation mode
    #[arg(short, long, value_enum, default_value = "server", global = true)]
    pub mode: Mode,

    /// report what would be done without changing anything
    #[arg(long, global = true)]
    pub check: bool,

    /// format output as json
    #[arg(long, global = true)]
    pub json: bool,

    /// enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Install OpenVPN and Easy-RSA, optionally generate the PKI
    #[command()]
    Install,

    /// Write server configuration, NAT rules and client config files
    #[command()]
    Configure,

    /// Start the OpenVPN service
    #[command()]
    Start,

    /// Stop the OpenVPN service
    #[command()]
    Stop,

    /// Restart the OpenVPN service
    #[command()]
    Restart,

    /// Show the OpenVPN service status
    #[command()]
    Status,
}

impl From<&Command> for Action {
    fn from(command: &Command) -> Self {
        match command {
            Command::Install => Action::Install,
            Command::Configure => Action::Configure,
            Command::Start => Action::Start,
            Command::Stop => Action::Stop,
            Command::Restart => Action::Restart,
            Command::Status => Action::Status,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
