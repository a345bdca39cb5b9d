use time::{OffsetDateTime, PrimitiveDateTime};

use crate::ValidationError;

/// Column label as delivered by a provider.
///
/// Some fetch modes label columns on two levels, e.g. `("Close", "AAPL")`;
/// only the primary level carries the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLabel {
    pub primary: String,
    pub secondary: Option<String>,
}

impl ColumnLabel {
    pub fn flat(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: None,
        }
    }

    pub fn nested(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: Some(secondary.into()),
        }
    }
}

/// Row index of a raw frame. Time zone information is a property of the
/// whole index: either every entry carries an offset or none does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawIndex {
    Naive(Vec<PrimitiveDateTime>),
    Aware(Vec<OffsetDateTime>),
}

impl RawIndex {
    pub fn len(&self) -> usize {
        match self {
            Self::Naive(values) => values.len(),
            Self::Aware(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn is_aware(&self) -> bool {
        matches!(self, Self::Aware(_))
    }
}

/// Provider output before normalization: labelled columns, a time index and
/// row-major numeric cells (`None` where the provider sent null).
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    columns: Vec<ColumnLabel>,
    index: RawIndex,
    rows: Vec<Vec<Option<f64>>>,
}

impl RawFrame {
    pub fn new(
        columns: Vec<ColumnLabel>,
        index: RawIndex,
        rows: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, ValidationError> {
        if index.len() != rows.len() {
            return Err(ValidationError::FrameIndexMismatch {
                index_len: index.len(),
                row_count: rows.len(),
            });
        }

        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(ValidationError::FrameRowWidth {
                row,
                actual: cells.len(),
                expected: columns.len(),
            });
        }

        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Frame with no rows, returned for unknown symbols or closed markets.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            index: RawIndex::Aware(Vec::new()),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[ColumnLabel] {
        &self.columns
    }

    pub fn index(&self) -> &RawIndex {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_multi_level(&self) -> bool {
        self.columns.iter().any(|label| label.secondary.is_some())
    }
}
