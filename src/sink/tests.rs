//! Tests for the local table sink

use super::table::*;
use super::{RecordSink, SinkReport};
use crate::types::JsonObject;
use arrow::array::{Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::DataType;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;

fn record(name: &str, date: Option<&str>) -> JsonObject {
    let mut value = json!({
        "ScientificName": name,
        "CommonName": "common name",
        "Class": "Mammalia",
        "BCActStatus": "Vulnerable",
        "EPBCActStatus": serde_json::Value::Null,
    });
    if let Some(date) = date {
        value["SightingDate"] = json!(date);
    }
    value.as_object().unwrap().clone()
}

#[test]
fn test_schema_has_fixed_columns() {
    let schema = species_schema();
    assert_eq!(schema.fields().len(), 6);
    assert_eq!(schema.field(0).name(), "ScientificName");
    assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
    assert!(schema.field(0).is_nullable());
    assert!(matches!(
        schema.field(5).data_type(),
        DataType::Timestamp(_, None)
    ));
}

#[test]
fn test_parse_sighting_date_variants() {
    // with timezone
    assert_eq!(
        parse_sighting_date("2023-05-14T10:30:00+10:00"),
        Some(1_684_024_200_000)
    );
    // without timezone, taken as UTC
    assert_eq!(
        parse_sighting_date("2023-05-14T00:30:00"),
        Some(1_684_024_200_000)
    );
    // bare date
    assert_eq!(parse_sighting_date("2023-05-14"), Some(1_684_022_400_000));
    // junk and blanks map to null
    assert_eq!(parse_sighting_date(""), None);
    assert_eq!(parse_sighting_date("  "), None);
    assert_eq!(parse_sighting_date("not a date"), None);
    assert_eq!(parse_sighting_date("14/05/2023"), None);
}

#[test]
fn test_records_to_batch_maps_missing_to_null() {
    let full = record("Vulpes vulpes", Some("2023-05-14T10:30:00Z"));
    let mut sparse = JsonObject::new();
    sparse.insert("ScientificName".to_string(), json!("Canis lupus"));

    let batch = records_to_batch(&[full, sparse]).unwrap();
    assert_eq!(batch.num_rows(), 2);

    let names = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(names.value(0), "Vulpes vulpes");
    assert_eq!(names.value(1), "Canis lupus");

    let common = batch
        .column(1)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert!(common.is_null(1));

    // explicit JSON null is also a null cell
    let epbc = batch
        .column(4)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert!(epbc.is_null(0));

    let dates = batch
        .column(5)
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .unwrap();
    assert!(!dates.is_null(0));
    assert!(dates.is_null(1));
}

#[test]
fn test_records_to_batch_stringifies_non_string_values() {
    let mut record = JsonObject::new();
    record.insert("ScientificName".to_string(), json!(42));

    let batch = records_to_batch(&[record]).unwrap();
    let names = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(names.value(0), "42");
}

#[test]
fn test_empty_record_set_produces_empty_batch() {
    let batch = records_to_batch(&[]).unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.num_columns(), 6);
}

#[test]
fn test_write_parquet_round_trips_row_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("species.parquet");
    let records = vec![
        record("Vulpes vulpes", Some("2023-05-14")),
        record("Canis lupus", None),
    ];

    let rows = write_parquet(&path, &records).unwrap();
    assert_eq!(rows, 2);

    let file = std::fs::File::open(&path).unwrap();
    let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let total: usize = reader.map(|b| b.unwrap().num_rows()).sum();
    assert_eq!(total, 2);
}

#[test]
fn test_write_csv_includes_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("species.csv");
    let rows = write_csv(&path, &[record("Vulpes vulpes", None)]).unwrap();
    assert_eq!(rows, 1);

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "ScientificName,CommonName,Class,BCActStatus,EPBCActStatus,SightingDate"
    );
    assert!(lines.next().unwrap().starts_with("Vulpes vulpes,"));
}

#[test]
fn test_output_format_from_extension() {
    assert_eq!(
        OutputFormat::from_path(Path::new("out.csv")),
        OutputFormat::Csv
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("out.CSV")),
        OutputFormat::Csv
    );
    assert_eq!(
        OutputFormat::from_path(Path::new("out.parquet")),
        OutputFormat::Parquet
    );
    assert_eq!(OutputFormat::from_path(Path::new("out")), OutputFormat::Parquet);
}

#[tokio::test]
async fn test_table_sink_delivers_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("delivered.csv");
    let sink = TableSink::new(&path);

    let report = sink.deliver(&[record("Vulpes vulpes", None)]).await.unwrap();
    assert_eq!(
        report,
        SinkReport {
            rows_written: 1,
            destination: path.display().to_string(),
        }
    );
    assert!(path.exists());
}
