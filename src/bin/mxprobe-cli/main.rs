mod args;
mod logging;
mod mx;
mod output;

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use args::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let emails = collect_emails(&cli)?;
    let rows: Vec<_> = emails
        .iter()
        .map(|email| output::make_row(email, &cli))
        .collect();

    output::write_reports(&rows, &cli)?;

    // codes de sortie : 0 OK, 2 non délivrable, 1 fatal
    if output::any_failed(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn collect_emails(cli: &Cli) -> Result<Vec<String>> {
    if cli.stdin {
        let mut emails = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                emails.push(trimmed.to_string());
            }
        }
        return Ok(emails);
    }
    if let Some(email) = &cli.email {
        return Ok(vec![email.trim().to_string()]);
    }
    prompt_email().map(|email| vec![email])
}

fn prompt_email() -> Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "Enter the email address to check: ")?;
    stdout.flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).context("read stdin")?;
    Ok(line.trim().to_string())
}
