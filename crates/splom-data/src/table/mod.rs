//! Columnar point table
//!
//! Every column holds one `f64` per row. Each column carries its cached
//! range, an inversion flag and a revision number that is bumped on every
//! mutation so that plots can tell when their derived caches are stale.

mod arrow_import;

use std::sync::Arc;
use parking_lot::RwLock;
use splom_core::DataRange;

use crate::DataError;

/// Table handle shared between a matrix and its plots
pub type SharedTable = Arc<RwLock<PointTable>>;

#[derive(Debug, Clone)]
struct Column {
    name: String,
    values: Vec<f64>,
    range: DataRange,
    inverted: bool,
    revision: u64,
}

/// Named numeric columns of equal length plus a per-row filter
#[derive(Debug, Clone, Default)]
pub struct PointTable {
    columns: Vec<Column>,
    filter: Vec<bool>,
    row_count: usize,
    filter_revision: u64,
    revision_counter: u64,
}

impl PointTable {
    /// Create a table from `(name, values)` pairs. All rows start visible.
    pub fn new(columns: Vec<(String, Vec<f64>)>) -> Result<Self, DataError> {
        let row_count = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut table = Self {
            row_count,
            filter: vec![true; row_count],
            ..Default::default()
        };

        for (name, values) in columns {
            if values.len() != row_count {
                return Err(DataError::ColumnLengthMismatch {
                    column: name,
                    expected: row_count,
                    found: values.len(),
                });
            }
            let revision = table.next_revision();
            table.columns.push(Column {
                range: DataRange::from_values(&values),
                name,
                values,
                inverted: false,
                revision,
            });
        }

        tracing::debug!(
            "Created point table with {} columns and {} rows",
            table.columns.len(),
            table.row_count
        );
        Ok(table)
    }

    /// Wrap the table for sharing with a matrix
    pub fn into_shared(self) -> SharedTable {
        Arc::new(RwLock::new(self))
    }

    fn next_revision(&mut self) -> u64 {
        self.revision_counter += 1;
        self.revision_counter
    }

    fn column(&self, index: usize) -> Result<&Column, DataError> {
        self.columns.get(index).ok_or(DataError::InvalidColumnIndex {
            index,
            count: self.columns.len(),
        })
    }

    fn column_mut(&mut self, index: usize) -> Result<&mut Column, DataError> {
        let count = self.columns.len();
        self.columns
            .get_mut(index)
            .ok_or(DataError::InvalidColumnIndex { index, count })
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn values(&self, column: usize) -> Option<&[f64]> {
        self.columns.get(column).map(|c| c.values.as_slice())
    }

    pub fn value(&self, column: usize, row: usize) -> Option<f64> {
        self.columns.get(column).and_then(|c| c.values.get(row).copied())
    }

    /// Cached `[min, max]` over the finite values of a column
    pub fn range(&self, column: usize) -> Option<DataRange> {
        self.columns.get(column).map(|c| c.range)
    }

    pub fn is_inverted(&self, column: usize) -> bool {
        self.columns.get(column).map(|c| c.inverted).unwrap_or(false)
    }

    /// Revision of a column's data, range and inversion flag
    pub fn column_revision(&self, column: usize) -> Option<u64> {
        self.columns.get(column).map(|c| c.revision)
    }

    /// Revision of the row filter
    pub fn filter_revision(&self) -> u64 {
        self.filter_revision
    }

    /// Whether a row passes the current filter; unknown rows never do
    pub fn matches_filter(&self, row: usize) -> bool {
        self.filter.get(row).copied().unwrap_or(false)
    }

    pub fn filtered_row_count(&self) -> usize {
        self.filter.iter().filter(|&&visible| visible).count()
    }

    /// Flip the drawing direction of a column. Returns whether it changed.
    pub fn set_inverted(&mut self, column: usize, inverted: bool) -> Result<bool, DataError> {
        if self.column(column)?.inverted == inverted {
            return Ok(false);
        }
        let revision = self.next_revision();
        let col = self.column_mut(column)?;
        col.inverted = inverted;
        col.revision = revision;
        Ok(true)
    }

    /// Replace the values of one column, keeping its name and inversion
    pub fn replace_column(&mut self, column: usize, values: Vec<f64>) -> Result<(), DataError> {
        let expected = self.row_count;
        let col = self.column(column)?;
        if values.len() != expected {
            return Err(DataError::ColumnLengthMismatch {
                column: col.name.clone(),
                expected,
                found: values.len(),
            });
        }
        let revision = self.next_revision();
        let col = self.column_mut(column)?;
        col.range = DataRange::from_values(&values);
        col.values = values;
        col.revision = revision;
        tracing::debug!("Replaced values of column '{}'", col.name);
        Ok(())
    }

    pub fn set_row_filter(&mut self, row: usize, visible: bool) -> Result<bool, DataError> {
        let count = self.row_count;
        let slot = self
            .filter
            .get_mut(row)
            .ok_or(DataError::InvalidRowIndex { index: row, count })?;
        if *slot == visible {
            return Ok(false);
        }
        *slot = visible;
        self.filter_revision += 1;
        Ok(true)
    }

    /// Replace the whole filter; `filter[row]` is the row's visibility
    pub fn set_filter(&mut self, filter: Vec<bool>) -> Result<(), DataError> {
        if filter.len() != self.row_count {
            return Err(DataError::FilterLengthMismatch {
                expected: self.row_count,
                found: filter.len(),
            });
        }
        self.filter = filter;
        self.filter_revision += 1;
        Ok(())
    }

    /// Make every row visible again
    pub fn clear_filter(&mut self) {
        self.filter = vec![true; self.row_count];
        self.filter_revision += 1;
    }
}
