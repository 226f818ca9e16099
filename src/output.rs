use crate::errors::OutputError;
use crate::record::Record;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// JSON shape of one record in the output file.
#[derive(Serialize)]
struct RecordJson<'a> {
    symbol: &'a str,
    #[serde(rename = "buySellindicator")]
    buy_sell_indicator: String,
    quantity: i32,
    price: i32,
    #[serde(rename = "packetSequence")]
    packet_sequence: i32,
}

/// Serializes `records` as a JSON array, indented with four spaces.
///
/// Symbol and side are written as text. Symbol bytes that are not valid
/// UTF-8 become U+FFFD and the side byte is read as a Latin-1 character
/// (`0xFF` is written as `"ÿ"`), so only ASCII fields survive byte-for-byte.
pub fn write_records<W: Write>(writer: W, records: &[Record]) -> Result<(), OutputError> {
    let symbols: Vec<String> = records.iter().map(|r| r.symbol_str().into_owned()).collect();
    let rows: Vec<RecordJson<'_>> = records
        .iter()
        .zip(&symbols)
        .map(|(r, symbol)| RecordJson {
            symbol,
            buy_sell_indicator: r.side_char().to_string(),
            quantity: r.quantity,
            price: r.price,
            packet_sequence: r.sequence,
        })
        .collect();

    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    rows.serialize(&mut serializer)?;

    let mut writer = serializer.into_inner();
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `records` as JSON to the file at `path`, replacing it if present.
pub fn write_json_file<P: AsRef<Path>>(path: P, records: &[Record]) -> Result<(), OutputError> {
    log::info!(
        "Writing {} records to {:?}",
        records.len(),
        path.as_ref()
    );
    let file = File::create(&path)?;
    write_records(BufWriter::new(file), records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::NamedTempFile;

    #[test]
    fn test_field_names_and_values() {
        let records = vec![
            Record::new("AAPL", b'B', 50, 100, 1),
            Record::new("MSFT", b'S', 30, 95, 2),
        ];
        let mut buf = Vec::new();
        write_records(&mut buf, &records).unwrap();

        let value: Value = serde_json::from_slice(&buf).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["symbol"], "AAPL");
        assert_eq!(rows[0]["buySellindicator"], "B");
        assert_eq!(rows[0]["quantity"], 50);
        assert_eq!(rows[0]["price"], 100);
        assert_eq!(rows[0]["packetSequence"], 1);
        assert_eq!(rows[1]["buySellindicator"], "S");
    }

    #[test]
    fn test_four_space_indent() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[Record::new("AAPL", b'B', 1, 2, 3)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("[\n    {\n        \"symbol\": \"AAPL\""));
        assert!(text.ends_with("]\n"));
    }

    #[test]
    fn test_empty_array() {
        let mut buf = Vec::new();
        write_records(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "[]\n");
    }

    #[test]
    fn test_write_file() {
        let file = NamedTempFile::new().unwrap();
        write_json_file(file.path(), &[Record::new("AMZN", b'S', 7, 8, 9)]).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["symbol"], "AMZN");
    }

    #[test]
    fn test_write_file_bad_path() {
        let result = write_json_file("/nonexistent-dir/out.json", &[]);
        assert!(matches!(result, Err(OutputError::Io(_))));
    }

    #[test]
    fn test_non_ascii_bytes_are_rendered_as_text() {
        let mut record = Record::new("AAPL", 0xFF, 1, 2, 3);
        record.symbol = [b'A', 0xFF, b'P', b'L'];
        let mut buf = Vec::new();
        write_records(&mut buf, &[record]).unwrap();

        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["symbol"], "A\u{FFFD}PL");
        assert_eq!(value[0]["buySellindicator"], "\u{FF}");
    }
}
