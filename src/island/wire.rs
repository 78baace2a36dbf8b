use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Version stamped on every migrant set the coordinator forwards.
pub const MIGRANT_SCHEMA_VERSION: u32 = 1;

/// Answer to an evolve call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolveReport {
    pub status: String,
    /// Best fitness (Sharpe ratio) on the island after advancing.
    #[serde(alias = "current_best_sharpe")]
    pub current_best_fitness: f64,
}

/// Answer to a status call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    #[serde(alias = "sharpe")]
    pub fitness: f64,
}

#[derive(Error, Debug, PartialEq)]
pub enum MigrantSetError {
    #[error("Gene vector {index} has length {found}, expected {expected}")]
    RaggedVectors {
        expected: usize,
        found: usize,
        index: usize,
    },
    #[error("Declared {declared} migrants but carried {actual}")]
    CountMismatch { declared: usize, actual: usize },
    #[error("Declared gene length {declared} but vectors have length {actual}")]
    GeneLengthMismatch { declared: usize, actual: usize },
    #[error("Unsupported migrant schema version {0}")]
    UnsupportedVersion(u32),
}

/// The JSON shape exchanged with islands.
///
/// Older islands send only `genes`; the other fields are checked when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrantEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene_length: Option<usize>,
    pub genes: Vec<Vec<f64>>,
}

/// A validated batch of gene vectors, all of the same length.
///
/// The coordinator never looks inside the vectors; it only checks the shape
/// so that schema drift between island versions is caught at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MigrantEnvelope", into = "MigrantEnvelope")]
pub struct MigrantSet {
    genes: Vec<Vec<f64>>,
}

impl MigrantSet {
    pub fn new(genes: Vec<Vec<f64>>) -> Result<Self, MigrantSetError> {
        if let Some(first) = genes.first() {
            let expected = first.len();
            if let Some((index, vector)) = genes
                .iter()
                .enumerate()
                .find(|(_, vector)| vector.len() != expected)
            {
                return Err(MigrantSetError::RaggedVectors {
                    expected,
                    found: vector.len(),
                    index,
                });
            }
        }
        Ok(MigrantSet { genes })
    }

    pub fn genes(&self) -> &[Vec<f64>] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// `None` for an empty set.
    pub fn gene_length(&self) -> Option<usize> {
        self.genes.first().map(Vec::len)
    }
}

impl TryFrom<MigrantEnvelope> for MigrantSet {
    type Error = MigrantSetError;

    fn try_from(envelope: MigrantEnvelope) -> Result<Self, Self::Error> {
        if let Some(version) = envelope.version {
            if version != MIGRANT_SCHEMA_VERSION {
                return Err(MigrantSetError::UnsupportedVersion(version));
            }
        }
        if let Some(declared) = envelope.count {
            if declared != envelope.genes.len() {
                return Err(MigrantSetError::CountMismatch {
                    declared,
                    actual: envelope.genes.len(),
                });
            }
        }
        let set = MigrantSet::new(envelope.genes)?;
        if let (Some(declared), Some(actual)) = (envelope.gene_length, set.gene_length()) {
            if declared != actual {
                return Err(MigrantSetError::GeneLengthMismatch { declared, actual });
            }
        }
        Ok(set)
    }
}

impl From<MigrantSet> for MigrantEnvelope {
    fn from(set: MigrantSet) -> Self {
        MigrantEnvelope {
            version: Some(MIGRANT_SCHEMA_VERSION),
            count: Some(set.len()),
            gene_length: set.gene_length(),
            genes: set.genes,
        }
    }
}
