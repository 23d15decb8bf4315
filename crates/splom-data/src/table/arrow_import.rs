//! Building point tables from Arrow record batches

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::record_batch::RecordBatch;

use super::PointTable;
use crate::DataError;

impl PointTable {
    /// Build a table from every numeric column of `batch`.
    ///
    /// Non-numeric columns are skipped; nulls become NaN.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self, DataError> {
        let schema = batch.schema();
        let mut columns = Vec::new();

        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            match numeric_values(array.as_ref()) {
                Some(values) => columns.push((field.name().clone(), values)),
                None => tracing::debug!(
                    "Skipping non-numeric column '{}' ({:?})",
                    field.name(),
                    array.data_type()
                ),
            }
        }

        tracing::info!(
            "Imported {} numeric columns, {} rows",
            columns.len(),
            batch.num_rows()
        );
        PointTable::new(columns)
    }
}

fn numeric_values(array: &dyn Array) -> Option<Vec<f64>> {
    macro_rules! collect_as_f64 {
        ($array:expr) => {
            (0..$array.len())
                .map(|i| {
                    if $array.is_null(i) {
                        f64::NAN
                    } else {
                        $array.value(i) as f64
                    }
                })
                .collect()
        };
    }

    if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
        Some(collect_as_f64!(a))
    } else if let Some(a) = array.as_any().downcast_ref::<Float32Array>() {
        Some(collect_as_f64!(a))
    } else if let Some(a) = array.as_any().downcast_ref::<Int64Array>() {
        Some(collect_as_f64!(a))
    } else if let Some(a) = array.as_any().downcast_ref::<Int32Array>() {
        Some(collect_as_f64!(a))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use arrow::array::StringArray;
    use arrow::datatypes::{DataType, Field, Schema};

    fn batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("density", DataType::Float64, true),
            Field::new("label", DataType::Utf8, false),
            Field::new("voxels", DataType::Int32, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from(vec![Some(1.5), None, Some(3.0)])),
                Arc::new(StringArray::from(vec!["a", "b", "c"])),
                Arc::new(Int32Array::from(vec![10, 20, 30])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_import_numeric_columns() {
        let table = PointTable::from_record_batch(&batch()).unwrap();
        assert_eq!(table.column_names(), vec!["density".to_string(), "voxels".to_string()]);
        assert_eq!(table.row_count(), 3);
        assert!(table.value(0, 1).unwrap().is_nan());
        assert_eq!(table.value(1, 2), Some(30.0));
    }
}
