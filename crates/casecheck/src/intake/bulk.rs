//! Bulk send-link intake: candidate rows from a CSV upload.

use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::checks::CandidateInfo;

pub const TEMPLATE_FILENAME: &str = "bulk_upload_template.csv";

pub const TEMPLATE: &str = "candidateName,fatherName,email,contactNumber,designation\n\
John Doe,Robert Doe,john@example.com,9876543210,Software Engineer\n\
Jane Smith,Michael Smith,jane@example.com,9876543211,Product Manager\n";

#[derive(Debug, thiserror::Error)]
pub enum BulkIntakeError {
    #[error("Please upload a CSV or Excel file")]
    UnsupportedFormat,
    #[error("Excel workbooks cannot be read here. Save the sheet as CSV and upload it again.")]
    ExcelUnsupported,
    #[error("Failed to parse CSV file")]
    Parse(#[source] csv::Error),
    #[error("Failed to parse CSV file")]
    Row(#[source] serde_json::Error),
    #[error("Please upload a file with candidate data")]
    NoCandidates,
    #[error("Please select at least one verification check")]
    NoChecks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeFormat {
    Csv,
    Excel,
}

impl IntakeFormat {
    /// Format from the file extension, case-insensitive.
    pub fn detect(filename: &str) -> Result<Self, BulkIntakeError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(IntakeFormat::Csv),
            "xlsx" | "xls" => Ok(IntakeFormat::Excel),
            _ => Err(BulkIntakeError::UnsupportedFormat),
        }
    }
}

/// Reads candidate rows keyed by the header line. Short rows are padded with
/// empty values and rows with every cell blank are skipped.
pub fn parse_candidates<R: Read>(reader: R) -> Result<Vec<CandidateInfo>, BulkIntakeError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers().map_err(BulkIntakeError::Parse)?.clone();
    let mut candidates = Vec::new();

    for record in csv_reader.records() {
        let record = record.map_err(BulkIntakeError::Parse)?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row: Map<String, Value> = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(index, header)| {
                let cell = record.get(index).unwrap_or_default();
                (header.to_string(), Value::String(cell.to_string()))
            })
            .collect();
        let candidate =
            serde_json::from_value(Value::Object(row)).map_err(BulkIntakeError::Row)?;
        candidates.push(candidate);
    }

    Ok(candidates)
}

/// Parses an uploaded intake file by its name and contents.
pub fn parse_upload(filename: &str, contents: &[u8]) -> Result<Vec<CandidateInfo>, BulkIntakeError> {
    match IntakeFormat::detect(filename)? {
        IntakeFormat::Csv => parse_candidates(contents),
        IntakeFormat::Excel => Err(BulkIntakeError::ExcelUnsupported),
    }
}

/// JSON body of `POST /cases/bulk-create-and-send-links`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSendRequest {
    pub candidates: Vec<CandidateInfo>,
    pub checks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_organization: Option<String>,
}

impl BulkSendRequest {
    pub fn new(
        candidates: Vec<CandidateInfo>,
        checks: &[String],
        client_organization: Option<&str>,
    ) -> Result<Self, BulkIntakeError> {
        if candidates.is_empty() {
            return Err(BulkIntakeError::NoCandidates);
        }
        let checks: Vec<String> = checks
            .iter()
            .map(|check| check.trim().to_string())
            .filter(|check| !check.is_empty())
            .collect();
        if checks.is_empty() {
            return Err(BulkIntakeError::NoChecks);
        }
        Ok(Self {
            candidates,
            checks,
            client_organization: client_organization
                .map(str::trim)
                .filter(|client| !client.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSuccess {
    #[serde(default)]
    pub candidate: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub case_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFailure {
    #[serde(default)]
    pub candidate: String,
    #[serde(default)]
    pub error: String,
}

/// Itemized result of a bulk send; one bad row never hides the others.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
    #[serde(default, alias = "msg")]
    pub message: String,
    #[serde(default)]
    pub successful: Vec<BulkSuccess>,
    #[serde(default)]
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn summary(&self) -> String {
        format!(
            "{} successful, {} failed",
            self.successful.len(),
            self.failed.len()
        )
    }
}
