//! Interactively write the configuration file.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::config::{Board, Config, DashboardSettings, Filter};

/// Path on the Jira server where personal access tokens are managed.
const TOKEN_PAGE: &str = "/plugins/servlet/no.kantega.kerberosauth.kerberosauth-plugin/user/api-tokens";

pub fn run(config_path: &Path) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let config = collect(&mut input, &mut output)?;
    config.save(config_path)?;

    println!(
        "{} A config file has been created at {}",
        "✓".green().bold(),
        config_path.display()
    );
    Ok(())
}

/// Ask for every setting in turn.
fn collect<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Config> {
    let jira_base_url = prompt(input, output, "Jira base url: ")?;
    let cert_path = prompt(input, output, "Server cert path: ")?;
    let user = prompt(input, output, "Jira user: ")?;
    let token = prompt(input, output, "Jira token: ")?;
    writeln!(
        output,
        "A jira access token can be generated at\n    {}{}",
        jira_base_url.trim_end_matches('/'),
        TOKEN_PAGE
    )?;
    let jql = prompt(input, output, "Optional - Default dashboard jql: ")?;

    let config = Config {
        jira_base_url,
        cert_path: Some(cert_path).filter(|p| !p.is_empty()),
        user,
        token,
        board: Board {
            filter: Filter { jql },
        },
        dashboard: DashboardSettings::default(),
    };
    config.validate()?;
    Ok(config)
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<String> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .with_context(|| format!("Failed to read answer to '{}'", label.trim()))?;
    Ok(line.trim().to_string())
}
