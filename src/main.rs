use anyhow::Context;
use serde::Serialize;
use std::process;
use tracing::Level;

use crate::apply::Action;
use crate::ops::Ops;

mod apply;
mod cli;
mod cmd;
mod config;
mod install;
mod nat;
mod network;
mod ops;
mod ovpn;
mod pki;
mod service;

#[derive(Serialize)]
struct Failure<'a> {
    failed: bool,
    error: &'a apply::Error,
}

fn main() -> anyhow::Result<()> {
    let args = cli::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = config::read(&args.config_file)
        .with_context(|| format!("failed to load configuration from {:?}", args.config_file))?;
    let ops = Ops::from(config);
    let action = Action::from(&args.command);

    match apply::run(&ops, args.mode, action, args.check) {
        Ok(outcome) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", outcome.message);
                if let Some(status) = &outcome.status {
                    println!("{}", status);
                }
            }
            Ok(())
        }
        Err(err) => {
            tracing::error!(?err, %action, "openvpn-configure failed");
            if args.json {
                let failure = Failure {
                    failed: true,
                    error: &err,
                };
                println!("{}", serde_json::to_string_pretty(&failure)?);
            }
            process::exit(1);
        }
    }
}
