//! Scrap-report and catalogue records exchanged with the line server.

use serde::{Deserialize, Serialize};

/// One entry of `GET /get_parts/{program}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartEntry {
    pub part_number: String,
}

/// Body of `POST /submit_scrap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapReport {
    pub line: String,
    pub program: String,
    pub part_number: String,
    pub defect_code: String,
    pub defect_description: String,
    #[serde(default)]
    pub comments: String,
}

/// A submitted report as echoed back by the server, stamped with its time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapRecord {
    #[serde(default)]
    pub time: String,
    #[serde(default, deserialize_with = "super::payload::lenient_text")]
    pub line: String,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub part_number: String,
    #[serde(default)]
    pub defect_code: String,
    #[serde(default)]
    pub defect_description: String,
    #[serde(default)]
    pub comments: String,
}

impl ScrapRecord {
    pub fn from_report(report: ScrapReport, time: String) -> Self {
        Self {
            time,
            line: report.line,
            program: report.program,
            part_number: report.part_number,
            defect_code: report.defect_code,
            defect_description: report.defect_description,
            comments: report.comments,
        }
    }
}

/// Reply of `POST /upload_video`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionReply {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReply {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepts_numeric_line() {
        let record: ScrapRecord = serde_json::from_str(
            r#"{"time": "01/02/2025 08:00:00 AM", "line": 2, "program": "P1",
                "part_number": "4410", "defect_code": "D1", "defect_description": "Crack"}"#,
        )
        .unwrap();
        assert_eq!(record.line, "2");
        assert_eq!(record.comments, "");
    }
}
