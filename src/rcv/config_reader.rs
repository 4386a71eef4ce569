use std::fs;

use crate::rcv::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::ResultExt;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_juridiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

impl OutputSettings {
    pub fn new(contest_name: &str) -> OutputSettings {
        OutputSettings {
            contest_name: contest_name.to_string(),
            output_directory: None,
            contest_date: None,
            contest_juridiction: None,
            contest_office: None,
        }
    }
}

/// The contest section of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "idColumnIndex")]
    pub id_column_index: Option<JSValue>,
    #[serde(rename = "countColumnIndex")]
    pub count_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "choices")]
    pub choices: Option<Vec<String>>,
}

impl FileSource {
    /// A source with the default layout for this provider.
    ///
    /// For csv_likert, the first row holds the candidate names.
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        let first_row = if provider == "csv_likert" { 2 } else { 1 };
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_vote_column_index: None,
            _first_vote_row_index: Some(JSValue::from(first_row)),
            id_column_index: None,
            count_column_index: None,
            excel_worksheet_name: None,
            choices: None,
        }
    }

    /// The same layout, for another file.
    pub fn with_file(&self, provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            ..self.clone()
        }
    }

    /// 0-based. The first column if not specified.
    pub fn first_vote_column_index(&self) -> RcvResult<usize> {
        let x = read_js_int(&self._first_vote_column_index)?;
        Ok(x.map(|i| i - 1).unwrap_or(0))
    }

    /// 1-based, as in spreadsheets. The first row if not specified.
    pub fn first_vote_row_index(&self) -> RcvResult<usize> {
        let x = read_js_int(&self._first_vote_row_index)?;
        Ok(x.unwrap_or(1))
    }

    /// 0-based.
    pub fn id_column_index_int(&self) -> RcvResult<Option<usize>> {
        Ok(read_js_int(&self.id_column_index)?.map(|i| i - 1))
    }

    /// 0-based.
    pub fn count_column_index_int(&self) -> RcvResult<Option<usize>> {
        Ok(read_js_int(&self.count_column_index)?.map(|i| i - 1))
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvCandidate {
    pub name: String,
    pub code: Option<String>,
    pub excluded: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvRules {
    #[serde(rename = "unrankedRule")]
    pub unranked_rule: Option<String>,
    pub threads: Option<u32>,
    #[serde(rename = "rulesDescription")]
    pub rules_description: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RcvConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "cvrFileSources")]
    pub cvr_file_sources: Vec<FileSource>,
    #[serde(default)]
    pub candidates: Vec<RcvCandidate>,
    #[serde(default)]
    pub rules: Option<RcvRules>,
}

pub fn read_config(path: &str) -> RcvResult<RcvConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: RcvConfig = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: String) -> BRcvResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Reads a 1-based index: a number, a string of digits, or an Excel column name ("A", "AB").
fn read_js_int(x: &Option<JSValue>) -> RcvResult<Option<usize>> {
    let res = match x {
        None | Some(JSValue::Null) => return Ok(None),
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        // Parsing the Excel-style columns
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            Some(s.to_ascii_lowercase().chars().fold(0, |acc, c| {
                acc * 26 + (c as usize) - ('a' as usize) + 1
            }))
        }
        Some(JSValue::String(s)) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    match res {
        Some(i) if i > 0 => Ok(Some(i)),
        _ => Err(RcvError::ParsingJsonNumber {}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_int_columns() {
        assert_eq!(read_js_int(&None).unwrap(), None);
        assert_eq!(read_js_int(&Some(JSValue::from(3))).unwrap(), Some(3));
        assert_eq!(read_js_int(&Some(JSValue::from("4"))).unwrap(), Some(4));
        assert_eq!(read_js_int(&Some(JSValue::from("A"))).unwrap(), Some(1));
        assert_eq!(read_js_int(&Some(JSValue::from("c"))).unwrap(), Some(3));
        assert_eq!(read_js_int(&Some(JSValue::from("AA"))).unwrap(), Some(27));
        assert!(read_js_int(&Some(JSValue::from(0))).is_err());
        assert!(read_js_int(&Some(JSValue::from("x1"))).is_err());
        assert!(read_js_int(&Some(JSValue::from(true))).is_err());
    }

    #[test]
    fn file_source_defaults() {
        let cfs = FileSource::new("csv", "ballots.csv");
        assert_eq!(cfs.first_vote_column_index().unwrap(), 0);
        assert_eq!(cfs.first_vote_row_index().unwrap(), 1);
        assert_eq!(cfs.id_column_index_int().unwrap(), None);
        assert_eq!(cfs.count_column_index_int().unwrap(), None);
        let likert = FileSource::new("csv_likert", "ballots.csv");
        assert_eq!(likert.first_vote_row_index().unwrap(), 2);
    }

    #[test]
    fn parse_config() {
        let js = r#"{
            "outputSettings": { "contestName": "Board" },
            "cvrFileSources": [ { "provider": "csv", "filePath": "b.csv",
                "firstVoteColumnIndex": 3, "idColumnIndex": "A", "countColumnIndex": 2 } ],
            "candidates": [ { "name": "A" }, { "name": "B", "excluded": true } ]
        }"#;
        let config: RcvConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.rules, None);
        assert_eq!(config.candidates.len(), 2);
        let cfs = &config.cvr_file_sources[0];
        assert_eq!(cfs.first_vote_column_index().unwrap(), 2);
        assert_eq!(cfs.id_column_index_int().unwrap(), Some(0));
        assert_eq!(cfs.count_column_index_int().unwrap(), Some(1));
    }
}
