// Setup check: is there a settings file, is a write key configured, and
// does the Hub accept that key.

use crate::hub::HubClient;
use crossterm::style::Stylize;
use std::fmt;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Check {
    Pass(String),
    Warn(String),
    Fail(String),
}

impl Check {
    pub fn is_fail(&self) -> bool {
        matches!(self, Check::Fail(_))
    }

    /// Same text as `Display`, coloured for a terminal.
    pub fn styled(&self) -> String {
        match self {
            Check::Pass(_) => self.to_string().green().to_string(),
            Check::Warn(_) => self.to_string().yellow().to_string(),
            Check::Fail(_) => self.to_string().red().to_string(),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Pass(m) => write!(f, "✓ {}", m),
            Check::Warn(m) => write!(f, "! {}", m),
            Check::Fail(m) => write!(f, "✗ {}", m),
        }
    }
}

pub async fn verify_setup(settings_path: &Path, client: &HubClient) -> Vec<Check> {
    let mut checks = Vec::new();

    if settings_path.exists() {
        checks.push(Check::Pass(format!("Found settings at {}", settings_path.display())));
    } else {
        checks.push(Check::Warn(format!(
            "No settings file at {}, using defaults",
            settings_path.display()
        )));
    }

    let settings = client.settings();
    if !settings.has_write_key() {
        checks.push(Check::Warn("HF write key not set in settings".into()));
        return checks;
    }
    checks.push(Check::Pass("HF write key is set".into()));

    match client.whoami(settings.token()).await {
        Ok(name) => checks.push(Check::Pass(format!("Write key belongs to {}", name))),
        Err(e) => checks.push(Check::Fail(format!("{:#}", e))),
    }
    checks
}
