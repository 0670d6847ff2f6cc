//! Decoding of combined result batches into typed rows
//!
//! Backends hand back Arrow record batches. Every column the query promises
//! is checked for presence, type, and nullability here, so a backend returning
//! the wrong shape fails with [`LookupError::Shape`] instead of a panic further
//! down the pipeline.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};

use crate::error::LookupError;
use crate::schemas::{
    COL_ACTOR, COL_ADDRESS, COL_AMOUNT, COL_BLOCK_NUMBER, COL_BLOCK_TIME, COL_QUERY_TYPE,
    COL_TX_HASH,
};
use crate::types::{ActorRow, Source};

/// Decode all batches into rows, preserving batch and row order
pub fn decode_batches(batches: &[RecordBatch]) -> Result<Vec<ActorRow>, LookupError> {
    let total: usize = batches.iter().map(RecordBatch::num_rows).sum();
    let mut rows = Vec::with_capacity(total);
    for batch in batches {
        decode_batch(batch, &mut rows)?;
    }
    Ok(rows)
}

fn decode_batch(batch: &RecordBatch, out: &mut Vec<ActorRow>) -> Result<(), LookupError> {
    // Backends may emit an empty batch with an empty schema for "no rows".
    if batch.num_rows() == 0 {
        return Ok(());
    }

    let query_type = column(batch, COL_QUERY_TYPE)?;
    let address = column(batch, COL_ADDRESS)?;
    let actor = column(batch, COL_ACTOR)?;
    let tx_hash = column(batch, COL_TX_HASH)?;
    let block_number = column(batch, COL_BLOCK_NUMBER)?;
    let block_time = column(batch, COL_BLOCK_TIME)?;
    let amount = column(batch, COL_AMOUNT)?;

    for row in 0..batch.num_rows() {
        let tag = required(string_at(query_type, COL_QUERY_TYPE, row)?, COL_QUERY_TYPE, row)?;
        let source = Source::from_tag(&tag).ok_or_else(|| {
            LookupError::Shape(format!("Unknown {} '{}' at row {}", COL_QUERY_TYPE, tag, row))
        })?;

        out.push(ActorRow {
            source,
            address: required(string_at(address, COL_ADDRESS, row)?, COL_ADDRESS, row)?,
            actor: required(string_at(actor, COL_ACTOR, row)?, COL_ACTOR, row)?,
            transaction_id: required(string_at(tx_hash, COL_TX_HASH, row)?, COL_TX_HASH, row)?,
            block_number: required(
                int_at(block_number, COL_BLOCK_NUMBER, row)?,
                COL_BLOCK_NUMBER,
                row,
            )?,
            block_time: required(time_at(block_time, COL_BLOCK_TIME, row)?, COL_BLOCK_TIME, row)?,
            amount: float_at(amount, COL_AMOUNT, row)?,
        });
    }

    Ok(())
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, LookupError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| LookupError::Shape(format!("Missing column: {}", name)))
}

fn required<T>(value: Option<T>, name: &str, row: usize) -> Result<T, LookupError> {
    value.ok_or_else(|| LookupError::Shape(format!("NULL {} at row {}", name, row)))
}

fn unexpected_type(name: &str, data_type: &DataType, expected: &str) -> LookupError {
    LookupError::Shape(format!(
        "Column {} has type {:?}, expected {}",
        name, data_type, expected
    ))
}

fn string_at(col: &ArrayRef, name: &str, row: usize) -> Result<Option<String>, LookupError> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        DataType::Utf8View => col.as_string_view().value(row).to_string(),
        other => return Err(unexpected_type(name, other, "string")),
    };
    Ok(Some(value))
}

fn int_at(col: &ArrayRef, name: &str, row: usize) -> Result<Option<i64>, LookupError> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row),
        DataType::Int32 => i64::from(col.as_primitive::<Int32Type>().value(row)),
        other => return Err(unexpected_type(name, other, "integer")),
    };
    Ok(Some(value))
}

fn float_at(col: &ArrayRef, name: &str, row: usize) -> Result<Option<f64>, LookupError> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Float64 => col.as_primitive::<Float64Type>().value(row),
        DataType::Float32 => f64::from(col.as_primitive::<Float32Type>().value(row)),
        // All-NULL columns from some backends carry the Null type
        DataType::Null => return Ok(None),
        other => return Err(unexpected_type(name, other, "float")),
    };
    Ok(Some(value))
}

/// Block time arrives as epoch microseconds or as an Arrow timestamp.
fn time_at(col: &ArrayRef, name: &str, row: usize) -> Result<Option<DateTime<Utc>>, LookupError> {
    if col.is_null(row) {
        return Ok(None);
    }
    let micros = match col.data_type() {
        DataType::Int64 => col.as_primitive::<Int64Type>().value(row),
        DataType::Timestamp(TimeUnit::Second, _) => col
            .as_primitive::<TimestampSecondType>()
            .value(row)
            .saturating_mul(1_000_000),
        DataType::Timestamp(TimeUnit::Millisecond, _) => col
            .as_primitive::<TimestampMillisecondType>()
            .value(row)
            .saturating_mul(1_000),
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            col.as_primitive::<TimestampMicrosecondType>().value(row)
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            col.as_primitive::<TimestampNanosecondType>().value(row) / 1_000
        }
        other => return Err(unexpected_type(name, other, "epoch microseconds or timestamp")),
    };

    DateTime::from_timestamp_micros(micros)
        .map(Some)
        .ok_or_else(|| LookupError::Shape(format!("{} out of range at row {}", name, row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::actor_rows_schema;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    fn batch(tags: Vec<&str>, amounts: Vec<Option<f64>>) -> RecordBatch {
        let n = tags.len();
        RecordBatch::try_new(
            actor_rows_schema(),
            vec![
                Arc::new(StringArray::from(tags)),
                Arc::new(StringArray::from(vec!["0xaddr"; n])),
                Arc::new(StringArray::from(vec!["0xactor"; n])),
                Arc::new(StringArray::from(vec!["0xtx"; n])),
                Arc::new(Int64Array::from(vec![100_001; n])),
                Arc::new(Int64Array::from(vec![1_600_000_000_000_000; n])),
                Arc::new(Float64Array::from(amounts)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_decode_rows() {
        let rows = decode_batches(&[batch(
            vec!["deployments", "funding"],
            vec![None, Some(0.5)],
        )])
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source, Source::Deployments);
        assert_eq!(rows[0].amount, None);
        assert_eq!(rows[1].source, Source::Funding);
        assert_eq!(rows[1].amount, Some(0.5));
        assert_eq!(rows[1].block_number, 100_001);
        assert_eq!(rows[1].block_time.timestamp(), 1_600_000_000);
    }

    #[test]
    fn test_empty_batches() {
        assert!(decode_batches(&[]).unwrap().is_empty());
        let empty = RecordBatch::new_empty(Arc::new(Schema::empty()));
        assert!(decode_batches(&[empty]).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_discriminator() {
        let err = decode_batches(&[batch(vec!["minting"], vec![None])]).unwrap_err();
        assert!(matches!(err, LookupError::Shape(_)));
    }

    #[test]
    fn test_missing_column() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            COL_QUERY_TYPE,
            DataType::Utf8,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec!["funding"]))],
        )
        .unwrap();

        let err = decode_batches(&[batch]).unwrap_err();
        assert!(err.to_string().contains("Missing column: address"));
    }

    #[test]
    fn test_wrong_column_type() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(COL_QUERY_TYPE, DataType::Utf8, false),
            Field::new(COL_ADDRESS, DataType::Utf8, false),
            Field::new(COL_ACTOR, DataType::Utf8, false),
            Field::new(COL_TX_HASH, DataType::Utf8, false),
            Field::new(COL_BLOCK_NUMBER, DataType::Utf8, false),
            Field::new(COL_BLOCK_TIME, DataType::Int64, false),
            Field::new(COL_AMOUNT, DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["funding"])),
                Arc::new(StringArray::from(vec!["0xaddr"])),
                Arc::new(StringArray::from(vec!["0xactor"])),
                Arc::new(StringArray::from(vec!["0xtx"])),
                Arc::new(StringArray::from(vec!["100"])),
                Arc::new(Int64Array::from(vec![0])),
                Arc::new(Float64Array::from(vec![Some(1.0)])),
            ],
        )
        .unwrap();

        let err = decode_batches(&[batch]).unwrap_err();
        assert!(matches!(err, LookupError::Shape(_)));
        assert!(err.to_string().contains("block_number"));
    }

    #[test]
    fn test_null_required_field() {
        let schema = Arc::new(Schema::new(
            actor_rows_schema()
                .fields()
                .iter()
                .map(|f| f.as_ref().clone().with_nullable(true))
                .collect::<Vec<_>>(),
        ));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["deployments"])),
                Arc::new(StringArray::from(vec!["0xaddr"])),
                Arc::new(StringArray::from(vec![None::<&str>])),
                Arc::new(StringArray::from(vec!["0xtx"])),
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(Int64Array::from(vec![0])),
                Arc::new(Float64Array::from(vec![None::<f64>])),
            ],
        )
        .unwrap();

        let err = decode_batches(&[batch]).unwrap_err();
        assert!(err.to_string().contains("NULL actor at row 0"));
    }
}
