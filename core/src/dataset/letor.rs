// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

//! SVMlight style ranking files as used by LETOR and the Yahoo! learning to
//! rank challenge:
//!
//! ```text
//! <relevance> qid:<qid> <feature>:<value> ... [# docid = <id> ...]
//! ```
//!
//! Feature indices start at 1 and features that are not listed are 0.

use std::io::BufRead;

use crate::DataError;

use super::{Document, MAX_RELEVANCE};

/// Largest feature index accepted on a line.
const MAX_FEATURES: usize = 1 << 20;

pub fn read<R: BufRead>(reader: R) -> Result<Vec<Document>, DataError> {
    let mut documents = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;

        if let Some(doc) = parse_line(&line, line_no)? {
            documents.push(doc);
        }
    }

    Ok(documents)
}

fn malformed<S: Into<String>>(line: usize, reason: S) -> DataError {
    DataError::Malformed {
        line,
        reason: reason.into(),
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Option<Document>, DataError> {
    let (data, comment) = match line.split_once('#') {
        Some((data, comment)) => (data, Some(comment)),
        None => (line, None),
    };

    let mut tokens = data.split_whitespace();

    let Some(relevance) = tokens.next() else {
        return Ok(None);
    };

    let relevance = relevance
        .parse::<u32>()
        .ok()
        .filter(|relevance| *relevance <= MAX_RELEVANCE)
        .ok_or_else(|| {
            malformed(
                line_no,
                format!("relevance {relevance:?} is not an integer between 0 and {MAX_RELEVANCE}"),
            )
        })?;

    let qid = tokens
        .next()
        .and_then(|token| token.strip_prefix("qid:"))
        .filter(|qid| !qid.is_empty())
        .ok_or_else(|| malformed(line_no, "missing qid"))?;

    let mut features = Vec::new();

    for token in tokens {
        let (index, value) = token.split_once(':').ok_or_else(|| {
            malformed(line_no, format!("expected <index>:<value>, got {token:?}"))
        })?;

        let index = index
            .parse::<usize>()
            .ok()
            .filter(|index| (1..=MAX_FEATURES).contains(index))
            .ok_or_else(|| {
                malformed(
                    line_no,
                    format!("feature index {index:?} is not between 1 and {MAX_FEATURES}"),
                )
            })?;

        let value = value
            .parse::<f64>()
            .map_err(|_| malformed(line_no, format!("invalid feature value {value:?}")))?;

        if features.len() < index {
            features.resize(index, 0.0);
        }
        features[index - 1] = value;
    }

    let id = comment
        .and_then(docid)
        .unwrap_or_else(|| line_no.to_string());

    Ok(Some(Document::new(id, qid, relevance, features)))
}

/// Extract `X` from a LETOR comment of the form `docid = X inc = ...`.
fn docid(comment: &str) -> Option<String> {
    let mut tokens = comment.split_whitespace();

    while let Some(token) = tokens.next() {
        if let Some(id) = token.strip_prefix("docid=") {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }

        if token == "docid" {
            return match tokens.next() {
                Some("=") => tokens.next().map(str::to_string),
                Some(id) => id.strip_prefix('=').map(str::to_string),
                None => None,
            };
        }
    }

    None
}
