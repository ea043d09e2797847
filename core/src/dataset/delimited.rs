// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

use std::io::Read;

use crate::DataError;

use super::{Document, MAX_RELEVANCE};

/// Position of the non-feature columns in a headerless csv file. Negative
/// positions count from the end of the row, so `-1` is the last column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CsvColumns {
    pub qid: i64,
    pub doc: i64,
    pub rel: i64,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            qid: 0,
            doc: 1,
            rel: -1,
        }
    }
}

impl CsvColumns {
    fn resolve(&self, len: usize) -> Option<(usize, usize, usize)> {
        let resolve = |idx: i64| {
            let idx = if idx < 0 { len as i64 + idx } else { idx };
            (0..len as i64).contains(&idx).then_some(idx as usize)
        };

        let (qid, doc, rel) = (resolve(self.qid)?, resolve(self.doc)?, resolve(self.rel)?);

        if qid == doc || qid == rel || doc == rel {
            return None;
        }

        Some((qid, doc, rel))
    }
}

pub fn read<R: Read>(reader: R, columns: &CsvColumns) -> Result<Vec<Document>, DataError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let mut documents = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let line_no = idx + 1;
        let malformed = |reason: String| DataError::Malformed {
            line: line_no,
            reason,
        };

        let record = record.map_err(|err| malformed(err.to_string()))?;

        let (qid, doc, rel) = columns.resolve(record.len()).ok_or_else(|| {
            malformed(format!(
                "columns {columns:?} do not fit a row of {}",
                record.len()
            ))
        })?;

        let relevance = record[rel]
            .parse::<u32>()
            .ok()
            .filter(|relevance| *relevance <= MAX_RELEVANCE)
            .ok_or_else(|| {
                malformed(format!(
                    "relevance {:?} is not an integer between 0 and {MAX_RELEVANCE}",
                    &record[rel]
                ))
            })?;

        let features = record
            .iter()
            .enumerate()
            .filter(|(col, _)| *col != qid && *col != doc && *col != rel)
            .map(|(_, value)| {
                value
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("invalid feature value {value:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        documents.push(Document::new(&record[doc], &record[qid], relevance, features));
    }

    Ok(documents)
}
