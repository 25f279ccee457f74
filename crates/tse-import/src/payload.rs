//! Dataset payload parsing.
//!
//! A payload is the XML message the collection service returns for one
//! dataset version:
//!
//! ```text
//! <message>
//!   <header><messageId>70001</messageId>...</header>
//!   <payload><dataset>
//!     <result><resId>0404_000069.0</resId><type>BSE</type>...</result>
//!     <result><resId>0404_000069.1</resId><sampId>S1</sampId>...</result>
//!   </dataset></payload>
//! </message>
//! ```
//!
//! Each child element of `<result>` is one column. Records without a
//! `sampId` are summarized information; records with one are analytical
//! results that also describe their case.

use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::Event;
use tse_model::columns;

use crate::error::{ImportError, Result};

/// Kind of a payload record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    SummarizedInfo,
    AnalyticalResult,
}

/// One `<result>` element of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadRecord {
    values: BTreeMap<String, String>,
}

impl PayloadRecord {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    fn filled(&self, column: &str) -> Option<&str> {
        self.get(column).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn kind(&self) -> RecordKind {
        if self.filled(columns::SAMPLE_ID).is_some() {
            RecordKind::AnalyticalResult
        } else {
            RecordKind::SummarizedInfo
        }
    }

    /// The record's `resId`.
    pub fn res_id(&self) -> Option<&str> {
        self.filled(columns::RES_ID)
    }

    pub fn sample_id(&self) -> Option<&str> {
        self.filled(columns::SAMPLE_ID)
    }

    /// Program id, from `progId` or else from the `resId` prefix.
    ///
    /// `0404_000069.0` belongs to program `0404_000069`.
    pub fn prog_id(&self) -> Option<String> {
        if let Some(prog_id) = self.filled(columns::PROG_ID) {
            return Some(prog_id.to_string());
        }
        let res_id = self.res_id()?;
        let prog_id = res_id.rsplit_once('.').map_or(res_id, |(prefix, _)| prefix);
        Some(prog_id.to_string())
    }

    /// Columns describing the case of a result record.
    pub fn case_values(&self) -> BTreeMap<String, String> {
        columns::CASE_COLUMNS
            .iter()
            .filter_map(|column| {
                self.values
                    .get(*column)
                    .map(|value| ((*column).to_string(), value.clone()))
            })
            .collect()
    }
}

/// A parsed dataset message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPayload {
    /// `messageId` from the message header, if present.
    pub message_id: Option<String>,
    pub records: Vec<PayloadRecord>,
}

impl ParsedPayload {
    pub fn summarized_info(&self) -> impl Iterator<Item = &PayloadRecord> {
        self.records
            .iter()
            .filter(|r| r.kind() == RecordKind::SummarizedInfo)
    }

    pub fn results(&self) -> impl Iterator<Item = &PayloadRecord> {
        self.records
            .iter()
            .filter(|r| r.kind() == RecordKind::AnalyticalResult)
    }
}

const RECORD_TAG: &str = "result";
const HEADER_TAG: &str = "header";
const MESSAGE_ID_TAG: &str = "messageId";

/// Parse the XML payload of `dataset_id`.
///
/// Every record must carry a `resId`.
pub fn parse_payload(dataset_id: &str, xml: &str) -> Result<ParsedPayload> {
    let invalid = |reason: String| ImportError::Payload {
        dataset_id: dataset_id.to_string(),
        reason,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut payload = ParsedPayload::default();
    let mut record: Option<BTreeMap<String, String>> = None;
    let mut record_depth = 0;
    let mut text = String::new();
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                saw_root = true;
                if name == RECORD_TAG && record.is_none() {
                    record = Some(BTreeMap::new());
                    record_depth = stack.len() + 1;
                }
                stack.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                saw_root = true;
                if let Some(values) = record.as_mut()
                    && stack.len() == record_depth
                {
                    values.insert(name, String::new());
                }
            }
            Ok(Event::Text(e)) => {
                let value = e
                    .unescape()
                    .map_err(|err| invalid(format!("bad text content: {err}")))?;
                text.push_str(&value);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(_)) => {
                let Some(name) = stack.pop() else {
                    return Err(invalid("unbalanced closing tag".to_string()));
                };

                if record.is_some() && stack.len() == record_depth {
                    if let Some(values) = record.as_mut() {
                        values.insert(name, std::mem::take(&mut text));
                    }
                } else if record.is_some() && stack.len() + 1 == record_depth {
                    if let Some(values) = record.take() {
                        payload.records.push(finish_record(dataset_id, values)?);
                    }
                } else if name == MESSAGE_ID_TAG && stack.iter().any(|t| t == HEADER_TAG) {
                    let id = std::mem::take(&mut text);
                    if !id.trim().is_empty() {
                        payload.message_id = Some(id.trim().to_string());
                    }
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(invalid(format!(
                    "XML error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(invalid("empty document".to_string()));
    }
    if !stack.is_empty() {
        return Err(invalid(format!("unclosed element <{}>", stack.join("><"))));
    }

    tracing::debug!(
        dataset_id,
        records = payload.records.len(),
        message_id = payload.message_id.as_deref().unwrap_or(""),
        "parsed dataset payload"
    );
    Ok(payload)
}

fn finish_record(dataset_id: &str, values: BTreeMap<String, String>) -> Result<PayloadRecord> {
    let record = PayloadRecord::new(values);
    if record.res_id().is_none() {
        return Err(ImportError::MissingKey {
            dataset_id: dataset_id.to_string(),
            column: columns::RES_ID,
        });
    }
    Ok(record)
}
