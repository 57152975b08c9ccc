//! Pairwise similarity matrix bound to the ranked list it was computed for.
//!
//! Rows and columns are positional: index `i` is the `i`-th docno of the
//! snapshot. The snapshot travels with the values so a matrix can never be
//! applied to a list in a different order.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{RankError, Result};
use crate::rank::RankedEntry;

/// Allowed deviation from a unit diagonal and from symmetry
const TOLERANCE: f64 = 1e-5;

/// Wire form: `{"docnos": [...], "values": [[...], ...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawMatrix {
    docnos: Vec<String>,
    values: Vec<Vec<f64>>,
}

/// N×N symmetric similarity matrix with unit diagonal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix", into = "RawMatrix")]
pub struct SimilarityMatrix {
    docnos: Arc<[String]>,
    /// Row-major, `docnos.len()` squared
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Build a matrix from its docno snapshot and rows
    ///
    /// Rejects ragged or non-square rows, non-finite values, a diagonal that
    /// is not 1.0 and asymmetric entries.
    pub fn new(docnos: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = docnos.len();
        if rows.len() != n {
            return Err(RankError::MalformedMatrix(format!(
                "{} rows for {} docnos",
                rows.len(),
                n
            )));
        }

        let mut values = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(RankError::MalformedMatrix(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            values.extend(row);
        }

        let matrix = Self {
            docnos: docnos.into(),
            values,
        };
        matrix.check_shape()?;
        Ok(matrix)
    }

    fn check_shape(&self) -> Result<()> {
        let n = self.len();
        if let Some(pos) = self.values.iter().position(|v| !v.is_finite()) {
            return Err(RankError::MalformedMatrix(format!(
                "non-finite value at ({}, {})",
                pos / n,
                pos % n
            )));
        }
        for i in 0..n {
            if (self.get(i, i) - 1.0).abs() > TOLERANCE {
                return Err(RankError::MalformedMatrix(format!(
                    "diagonal entry {} is {}, expected 1.0",
                    i,
                    self.get(i, i)
                )));
            }
            for j in (i + 1)..n {
                if (self.get(i, j) - self.get(j, i)).abs() > TOLERANCE {
                    return Err(RankError::MalformedMatrix(format!(
                        "entries ({i}, {j}) and ({j}, {i}) differ"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.docnos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docnos.is_empty()
    }

    /// Docno order the matrix was computed against
    pub fn docnos(&self) -> &[String] {
        &self.docnos
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.len() + col]
    }

    /// Full similarity row of the document at `index`
    pub fn row(&self, index: usize) -> &[f64] {
        let n = self.len();
        &self.values[index * n..(index + 1) * n]
    }

    /// Fail unless `ranked` has exactly this matrix's docno order
    pub fn check_paired(&self, ranked: &[RankedEntry]) -> Result<()> {
        if ranked.len() != self.len() {
            return Err(RankError::DimensionMismatch {
                matrix: self.len(),
                ranked: ranked.len(),
            });
        }
        for (position, (expected, entry)) in self.docnos.iter().zip(ranked).enumerate() {
            if *expected != entry.docno {
                return Err(RankError::SnapshotMismatch {
                    position,
                    expected: expected.clone(),
                    found: entry.docno.clone(),
                });
            }
        }
        Ok(())
    }

    /// Restrict the matrix to `docnos`, in that order
    ///
    /// Returns `None` if any docno is missing from the snapshot.
    pub fn project(&self, docnos: &[String]) -> Option<Self> {
        let indices: Vec<usize> = docnos
            .iter()
            .map(|d| self.docnos.iter().position(|own| own == d))
            .collect::<Option<_>>()?;

        let mut values = Vec::with_capacity(indices.len() * indices.len());
        for &i in &indices {
            for &j in &indices {
                values.push(self.get(i, j));
            }
        }

        Some(Self {
            docnos: docnos.to_vec().into(),
            values,
        })
    }
}

impl TryFrom<RawMatrix> for SimilarityMatrix {
    type Error = RankError;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Self::new(raw.docnos, raw.values)
    }
}

impl From<SimilarityMatrix> for RawMatrix {
    fn from(matrix: SimilarityMatrix) -> Self {
        let n = matrix.len();
        let values = if n == 0 {
            Vec::new()
        } else {
            matrix.values.chunks(n).map(|row| row.to_vec()).collect()
        };
        Self {
            docnos: matrix.docnos.to_vec(),
            values,
        }
    }
}
