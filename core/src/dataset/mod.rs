// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

//! Documents grouped by query.
//!
//! All documents of a dataset live in one arena; a query group is a list of
//! indices into that arena.

pub mod delimited;
pub mod letor;

use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
    str::FromStr,
};

use tracing::{info, warn};

use crate::{ConfigError, DataError};

pub use delimited::CsvColumns;

/// Highest relevance grade the readers accept. NDCG gains grow as `2^rel`.
pub const MAX_RELEVANCE: u32 = 31;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub qid: String,
    pub relevance: u32,
    pub features: Vec<f64>,
}

impl Document {
    pub fn new<I: Into<String>, Q: Into<String>>(
        id: I,
        qid: Q,
        relevance: u32,
        features: Vec<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            qid: qid.into(),
            relevance,
            features,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct QueryGroup {
    qid: String,
    docs: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    documents: Vec<Document>,
    groups: Vec<QueryGroup>,
    dimensions: usize,
}

impl Dataset {
    /// Group `documents` by query id. Groups keep the order in which their
    /// query id first appears and documents keep their input order. Feature
    /// vectors shorter than the longest one are padded with zeros.
    pub fn from_documents(mut documents: Vec<Document>) -> Result<Self, DataError> {
        if documents.is_empty() {
            return Err(DataError::Empty);
        }

        let dimensions = documents
            .iter()
            .map(|doc| doc.features.len())
            .max()
            .unwrap_or_default();

        for doc in &mut documents {
            doc.features.resize(dimensions, 0.0);
        }

        let mut groups: Vec<QueryGroup> = Vec::new();
        let mut group_idx: HashMap<String, usize> = HashMap::new();

        for (idx, doc) in documents.iter().enumerate() {
            let group = *group_idx.entry(doc.qid.clone()).or_insert_with(|| {
                groups.push(QueryGroup {
                    qid: doc.qid.clone(),
                    docs: Vec::new(),
                });
                groups.len() - 1
            });

            groups[group].docs.push(idx);
        }

        Ok(Self {
            documents,
            groups,
            dimensions,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P, reader: &ReaderKind) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = BufReader::new(File::open(path)?);

        let documents = match reader {
            ReaderKind::Csv(columns) => delimited::read(file, columns)?,
            ReaderKind::Letor | ReaderKind::Yahoo => letor::read(file)?,
        };

        let dataset = Self::from_documents(documents)?;

        info!(
            "read {} documents in {} query groups with {} features from {}",
            dataset.num_documents(),
            dataset.num_groups(),
            dataset.dimensions(),
            path.display()
        );

        Ok(dataset)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn group(&self, idx: usize) -> Group<'_> {
        let group = &self.groups[idx];

        Group {
            qid: &group.qid,
            docs: &group.docs,
            documents: &self.documents,
        }
    }

    pub fn groups(&self) -> impl ExactSizeIterator<Item = Group<'_>> + '_ {
        (0..self.groups.len()).map(move |idx| self.group(idx))
    }

    /// Give every feature vector exactly `dimensions` entries so the dataset
    /// can be scored by a model trained on another dataset.
    pub fn conform(&mut self, dimensions: usize) -> Result<(), DataError> {
        if self.dimensions > dimensions {
            return Err(DataError::DimensionMismatch {
                expected: dimensions,
                found: self.dimensions,
            });
        }

        if self.dimensions < dimensions {
            warn!(
                "padding {} features with zeros to match the {} features of the model",
                self.dimensions, dimensions
            );

            for doc in &mut self.documents {
                doc.features.resize(dimensions, 0.0);
            }

            self.dimensions = dimensions;
        }

        Ok(())
    }
}

/// The documents sharing one query id.
#[derive(Clone, Copy)]
pub struct Group<'a> {
    qid: &'a str,
    docs: &'a [usize],
    documents: &'a [Document],
}

impl<'a> Group<'a> {
    pub fn qid(&self) -> &'a str {
        self.qid
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, idx: usize) -> &'a Document {
        &self.documents[self.docs[idx]]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &'a Document> + 'a {
        let documents = self.documents;
        self.docs.iter().map(move |&idx| &documents[idx])
    }

    /// Whether the group holds at least two different relevance grades.
    pub fn has_relevance_variance(&self) -> bool {
        let mut it = self.iter().map(|doc| doc.relevance);

        match it.next() {
            Some(first) => it.any(|rel| rel != first),
            None => false,
        }
    }
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("qid", &self.qid)
            .field("documents", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    Csv(CsvColumns),
    Letor,
    Yahoo,
}

impl ReaderKind {
    /// Use `columns` when this is the csv reader.
    pub fn with_columns(self, columns: CsvColumns) -> Self {
        match self {
            ReaderKind::Csv(_) => ReaderKind::Csv(columns),
            kind => kind,
        }
    }
}

impl FromStr for ReaderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReaderKind::Csv(CsvColumns::default())),
            "letor" => Ok(ReaderKind::Letor),
            "yahoo" => Ok(ReaderKind::Yahoo),
            _ => Err(ConfigError::UnknownReader(s.to_string())),
        }
    }
}
