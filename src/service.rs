use serde::Serialize;
use std::fmt;
use std::process::Command;

use crate::cmd;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verb {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Start => write!(f, "start"),
            Verb::Stop => write!(f, "stop"),
            Verb::Restart => write!(f, "restart"),
        }
    }
}

pub fn control(unit: &str, verb: Verb) -> Result<(), cmd::Error> {
    cmd::run(Command::new("systemctl").arg(verb.to_string()).arg(unit))?;
    tracing::info!(unit, %verb, "service");
    Ok(())
}

/// Output of `systemctl status`, which exits non zero for inactive units.
pub fn status(unit: &str) -> Result<String, cmd::Error> {
    let (_, output) = cmd::output(Command::new("systemctl").arg("status").arg(unit))?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
