use std::time::Duration;

use clap::Parser;
use mxprobe::{CheckOptions, ProbeOptions, smtp::DEFAULT_MAIL_FROM};

#[derive(Parser)]
#[command(name = "mxprobe-cli", version)]
#[command(about = "Vérifie qu'une adresse e-mail est délivrable (format, MX, RCPT TO) sans envoyer de message")]
pub struct Cli {
    /// adresse à vérifier (demandée interactivement si absente)
    pub email: Option<String>,

    /// lit des adresses depuis stdin (une par ligne)
    #[arg(long, conflicts_with = "email")]
    pub stdin: bool,

    /// write report to file (JSON/NDJSON/CSV selon --format)
    #[arg(long)]
    pub out: Option<String>,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// enveloppe MAIL FROM
    #[arg(long = "from", default_value = DEFAULT_MAIL_FROM)]
    pub mail_from: String,

    /// nom utilisé pour HELO (par défaut: nom d'hôte local)
    #[arg(long)]
    pub helo: Option<String>,

    /// port SMTP
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// timeout DNS/connexion/lecture (secondes, 0 = aucun pour SMTP)
    #[arg(long = "timeout", default_value_t = 10)]
    pub timeout_secs: u64,

    /// affiche seulement les enregistrements MX, sans dialogue SMTP
    #[arg(long)]
    pub mx_only: bool,

    /// affiche la transcription SMTP
    #[arg(long)]
    pub transcript: bool,

    /// verbosité des logs (-v info, -vv debug); RUST_LOG prend le pas
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn check_options(&self) -> CheckOptions {
        let timeout = Duration::from_secs(self.timeout_secs);
        CheckOptions {
            // the DNS layer needs a real bound even when SMTP runs without one
            dns_timeout: if timeout.is_zero() {
                mxprobe::mx::DEFAULT_DNS_TIMEOUT
            } else {
                timeout
            },
            probe: ProbeOptions {
                port: self.port,
                timeout,
                helo_name: self.helo.clone(),
                mail_from: self.mail_from.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_map_to_library_defaults() {
        let cli = Cli::try_parse_from(["mxprobe-cli", "user@example.com"]).unwrap();
        assert_eq!(cli.email.as_deref(), Some("user@example.com"));
        assert_eq!(cli.check_options(), CheckOptions::default());
    }

    #[test]
    fn flags_reach_probe_options() {
        let cli = Cli::try_parse_from([
            "mxprobe-cli",
            "--from",
            "bounce@probe.example",
            "--helo",
            "probe.example",
            "--port",
            "2525",
            "--timeout",
            "3",
            "-vv",
            "user@example.com",
        ])
        .unwrap();
        let options = cli.check_options();
        assert_eq!(options.probe.mail_from, "bounce@probe.example");
        assert_eq!(options.probe.helo_name.as_deref(), Some("probe.example"));
        assert_eq!(options.probe.port, 2525);
        assert_eq!(options.probe.timeout, Duration::from_secs(3));
        assert_eq!(options.dns_timeout, Duration::from_secs(3));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn stdin_conflicts_with_positional_email() {
        assert!(Cli::try_parse_from(["mxprobe-cli", "--stdin", "user@example.com"]).is_err());
    }
}
