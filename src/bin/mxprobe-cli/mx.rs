use mxprobe::{EmailAddress, MxError, MxStatus, check_mx};

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct MxSummary {
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub status: Option<MxStatus>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub skipped: Option<String>,
}

impl MxSummary {
    pub fn from_status(status: MxStatus) -> Self {
        Self {
            status: Some(status),
            error: None,
            skipped: None,
        }
    }

    pub fn from_error(error: &MxError) -> Self {
        Self {
            status: None,
            error: Some(error.to_string()),
            skipped: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: None,
            error: None,
            skipped: Some(reason.into()),
        }
    }

    pub fn has_records(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|status| !status.records().is_empty())
    }

    pub fn human_summary(&self) -> String {
        if let Some(status) = &self.status {
            match status {
                MxStatus::Records(records) => {
                    format!("records: {}", records_detail(records, ", "))
                }
                MxStatus::NoRecords => "no MX records".to_string(),
            }
        } else if let Some(error) = &self.error {
            format!("error: {error}")
        } else if let Some(reason) = &self.skipped {
            format!("skipped: {reason}")
        } else {
            "unknown".to_string()
        }
    }

    #[cfg(feature = "with-csv")]
    pub fn csv_fields(&self) -> (String, String) {
        if let Some(status) = &self.status {
            match status {
                MxStatus::Records(records) => ("records".to_string(), records_detail(records, ";")),
                MxStatus::NoRecords => ("no_records".to_string(), String::new()),
            }
        } else if let Some(error) = &self.error {
            ("error".to_string(), error.clone())
        } else if let Some(reason) = &self.skipped {
            ("skipped".to_string(), reason.clone())
        } else {
            ("unknown".to_string(), String::new())
        }
    }
}

fn records_detail(records: &[mxprobe::MxRecord], sep: &str) -> String {
    records
        .iter()
        .map(|r| format!("{}:{}", r.preference, r.exchange))
        .collect::<Vec<_>>()
        .join(sep)
}

pub fn resolve(email: &str) -> MxSummary {
    resolve_with(email, check_mx)
}

fn resolve_with<F>(email: &str, lookup: F) -> MxSummary
where
    F: Fn(&str) -> Result<MxStatus, MxError>,
{
    let address = match EmailAddress::parse(email) {
        Ok(address) => address,
        Err(err) => return MxSummary::skipped(err.to_string()),
    };
    match lookup(address.domain()) {
        Ok(status) => MxSummary::from_status(status),
        Err(MxError::EmptyDomain) => MxSummary::skipped("domain missing"),
        Err(err) => MxSummary::from_error(&err),
    }
}
