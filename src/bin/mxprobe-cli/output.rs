#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};

use crate::args::Cli;
use crate::mx::{self, MxSummary};
use mxprobe::{DeliverabilityReport, Verdict, check_email_deliverability_with_options};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct OutputRow {
    pub email: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub report: Option<DeliverabilityReport>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub mx: Option<MxSummary>,
}

impl OutputRow {
    /// Rows count as successful when the address is deliverable, or, in
    /// `--mx-only` mode, when its domain has at least one MX record.
    pub fn ok(&self) -> bool {
        match (&self.report, &self.mx) {
            (Some(report), _) => report.deliverable,
            (None, Some(mx)) => mx.has_records(),
            (None, None) => false,
        }
    }
}

pub fn make_row(email: &str, cli: &Cli) -> OutputRow {
    if cli.mx_only {
        OutputRow {
            email: email.to_string(),
            report: None,
            mx: Some(mx::resolve(email)),
        }
    } else {
        OutputRow {
            email: email.to_string(),
            report: Some(check_email_deliverability_with_options(
                email,
                &cli.check_options(),
            )),
            mx: None,
        }
    }
}

pub fn write_reports(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(rows, cli),
        "json" => write_json(rows, cli),
        "ndjson" => write_ndjson(rows, cli),
        "csv" => write_csv(rows, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn any_failed(rows: &[OutputRow]) -> bool {
    rows.iter().any(|row| !row.ok())
}

fn write_human(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    for row in rows {
        print!("{}", render_human(row, cli.transcript));
    }
    Ok(())
}

fn status_tag(row: &OutputRow) -> &'static str {
    match (&row.report, &row.mx) {
        (Some(report), _) => match report.verdict {
            Verdict::Deliverable => "[DELIVERABLE]",
            Verdict::Rejected => "[REJECTED]",
            Verdict::Undeterminable => "[UNKNOWN]",
        },
        (None, Some(mx)) if mx.has_records() => "[MX]",
        _ => "[NO MX]",
    }
}

fn render_human(row: &OutputRow, transcript: bool) -> String {
    let mut out = format!("{} {}\n", status_tag(row), row.email);
    if let Some(report) = &row.report {
        for line in report.diagnostics() {
            out.push_str(&format!("        {line}\n"));
        }
        if transcript && let Some(probe) = &report.probe {
            for event in probe.transcript() {
                out.push_str(&format!("        | {event}\n"));
            }
        }
    }
    if let Some(mx) = &row.mx {
        out.push_str(&format!("        mx: {}\n", mx.human_summary()));
    }
    out
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=json nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=ndjson nécessite la feature 'with-serde'")
}

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[OutputRow], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[OutputRow], _: &Cli) -> Result<()> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

/// `email, verdict, deliverable, mx_host, code, detail`
#[cfg(feature = "with-csv")]
fn csv_record(row: &OutputRow) -> Vec<String> {
    if let Some(report) = &row.report {
        vec![
            row.email.clone(),
            report.verdict.to_string(),
            report.deliverable.to_string(),
            report.mx_host.clone().unwrap_or_default(),
            report
                .reply_code()
                .map(|code| code.to_string())
                .unwrap_or_default(),
            report
                .failure
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        ]
    } else if let Some(mx) = &row.mx {
        let (status, detail) = mx.csv_fields();
        vec![row.email.clone(), status, detail]
    } else {
        vec![row.email.clone()]
    }
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
