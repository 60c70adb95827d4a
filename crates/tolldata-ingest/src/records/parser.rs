//! Pipe-delimited export reader
//!
//! Consumes the header row, discards the configured number of leading data
//! rows (the shipped exports repeat a sub-header line there), then yields
//! one validated record per remaining row. The sequence is lazy and single
//! pass; constructing a new reader re-reads from the start.

use super::model::{coerce_amount, coerce_flag, coerce_year, FacilityType, TollRateRecord};
use crate::config::CsvOptions;
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Column names as they appear in the export header.
mod col {
    pub const STATE_OR_PROVINCE: &str = "State_Or_Province";
    pub const FACILITY_LABEL: &str = "Facility_Label";
    pub const TOLL_OPERATOR: &str = "Toll_Operator";
    pub const FACILITY_TYPE: &str = "Facility_type";
    pub const ROAD_TYPE: &str = "Road_type";
    pub const INTERSTATE: &str = "Interstate";
    pub const FACILITY_OPEN_DATE: &str = "Facility_open_date";
    pub const REVENUE_LANE_MILES: &str = "Revenue_lane_Miles";
    pub const REVENUE: &str = "Revenue";
    pub const LENGTH_MILES: &str = "Length_Miles";
    pub const LANE: &str = "Lane";
    pub const SOURCE_TYPE: &str = "Source_Type";
    pub const REFERENCE: &str = "Reference";
    pub const YEAR: &str = "Year";
}

/// Transport-level reader failures. Field values never error; they coerce.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("cannot open export: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read export row: {0}")]
    Csv(#[from] csv::Error),
}

/// Lazy reader over a delimited toll-rate export.
pub struct RecordReader<R: Read> {
    headers: StringRecord,
    rows: csv::StringRecordsIntoIter<R>,
}

impl RecordReader<File> {
    pub fn from_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self, RecordError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file, options)
    }
}

impl<R: Read> RecordReader<R> {
    pub fn from_reader(reader: R, options: &CsvOptions) -> Result<Self, RecordError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut rows = csv_reader.into_records();

        for _ in 0..options.skip_leading_rows {
            if rows.next().transpose()?.is_none() {
                break;
            }
        }

        Ok(Self { headers, rows })
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<TollRateRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rows.next()? {
            Ok(row) => Some(Ok(validate_row(&self.headers, &row))),
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Map one raw row to a validated record. Total: a missing column reads as
/// empty and coerces to the field default.
fn validate_row(headers: &StringRecord, row: &StringRecord) -> TollRateRecord {
    let field = |name: &str| -> &str {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|i| row.get(i))
            .unwrap_or("")
    };

    TollRateRecord {
        state_or_province: field(col::STATE_OR_PROVINCE).to_string(),
        facility_label: field(col::FACILITY_LABEL).to_string(),
        toll_operator: field(col::TOLL_OPERATOR).to_string(),
        facility_type: FacilityType::from_raw(field(col::FACILITY_TYPE)),
        road_type: field(col::ROAD_TYPE).to_string(),
        interstate: coerce_flag(field(col::INTERSTATE)),
        facility_open_date: field(col::FACILITY_OPEN_DATE).to_string(),
        revenue_lane_miles: coerce_amount(field(col::REVENUE_LANE_MILES)),
        revenue: coerce_amount(field(col::REVENUE)),
        length_miles: coerce_amount(field(col::LENGTH_MILES)),
        lane: coerce_amount(field(col::LANE)),
        source_type: field(col::SOURCE_TYPE).to_string(),
        reference: field(col::REFERENCE).to_string(),
        year: coerce_year(field(col::YEAR)),
    }
}

/// Read a whole export eagerly.
pub fn read_file(
    path: impl AsRef<Path>,
    options: &CsvOptions,
) -> Result<Vec<TollRateRecord>, RecordError> {
    RecordReader::from_path(path, options)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    const HEADER: &str = "State_Or_Province|Facility_Label|Toll_Operator|Facility_type|Road_type|Interstate|Facility_open_date|Revenue_lane_Miles|Revenue|Length_Miles|Lane|Source_Type|Reference|Year";
    const SUB_HEADER: &str = "State|Label|Operator|Type|Road|Interstate|Opened|Rev Lane Miles|Revenue|Miles|Lanes|Source|Reference|Year";

    fn export(rows: &[&str]) -> String {
        let mut lines = vec![HEADER, SUB_HEADER];
        lines.extend_from_slice(rows);
        lines.join("\n")
    }

    fn parse(content: &str, options: &CsvOptions) -> Vec<TollRateRecord> {
        RecordReader::from_reader(Cursor::new(content.to_string()), options)
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_one_record_per_data_row() {
        let content = export(&[
            "Florida|Turnpike|FTE|Road|Highway|Yes|1957|120.5|1,000,000|44.0|4|ACFR|http://example.com/a.pdf|2022",
            "New York|Verrazzano|MTA|Bridge|Crossing|No|1964|0|230,000,000|2.6|12|ACFR|http://example.com/b.pdf|2022",
        ]);
        let records = parse(&content, &CsvOptions::default());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state_or_province, "Florida");
        assert_eq!(records[0].facility_type, FacilityType::Road);
        assert!(records[0].interstate);
        assert_eq!(records[0].revenue, 1_000_000.0);
        assert_eq!(records[1].facility_type, FacilityType::Bridge);
        assert!(!records[1].interstate);
        assert_eq!(records[1].year, 2022);
    }

    #[test]
    fn test_malformed_fields_degrade_to_defaults() {
        let content = export(&[
            "Texas|SH 130|TxDOT|Causeway|Highway|maybe|unknown|n/a|1,000,000|-3.5|four|ACFR|http://example.com/c.pdf|abc",
        ]);
        let records = parse(&content, &CsvOptions::default());

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.facility_type, FacilityType::Other);
        assert!(!r.interstate);
        assert_eq!(r.revenue_lane_miles, 0.0);
        assert_eq!(r.revenue, 1_000_000.0);
        assert_eq!(r.length_miles, 0.0);
        assert_eq!(r.lane, 0.0);
        assert_eq!(r.year, 0);
        // strings pass through verbatim, even when odd
        assert_eq!(r.facility_open_date, "unknown");
    }

    #[test]
    fn test_short_rows_read_missing_columns_as_empty() {
        let content = export(&["Ohio|Turnpike|OTIC"]);
        let records = parse(&content, &CsvOptions::default());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state_or_province, "Ohio");
        assert_eq!(records[0].toll_operator, "OTIC");
        assert_eq!(records[0].reference, "");
        assert_eq!(records[0].year, 0);
    }

    #[test]
    fn test_default_options_skip_exactly_one_leading_row() {
        let content = export(&["Florida|||||||||||||2020"]);
        let records = parse(&content, &CsvOptions::default());

        // the sub-header line is gone, the data row is not
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state_or_province, "Florida");
    }

    #[test]
    fn test_skip_can_be_disabled() {
        let content = export(&["Florida|||||||||||||2020"]);
        let options = CsvOptions {
            skip_leading_rows: 0,
            ..Default::default()
        };
        let records = parse(&content, &options);

        // with no skip, the sub-header line surfaces as a (defaulted) record
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state_or_province, "State");
        assert_eq!(records[1].state_or_province, "Florida");
    }

    #[test]
    fn test_skip_past_end_of_input_is_empty_not_an_error() {
        let records = parse(HEADER, &CsvOptions::default());
        assert!(records.is_empty());
    }

    #[test]
    fn test_parsing_twice_yields_identical_records() {
        let content = export(&[
            "Florida|Turnpike|FTE|Road|Highway|Yes|1957|120.5|1,000,000|44.0|4|ACFR|http://example.com/a.pdf|2022",
        ]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();

        let first = read_file(file.path(), &CsvOptions::default()).unwrap();
        let second = read_file(file.path(), &CsvOptions::default()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_scenario_commas_yes_and_bad_year() {
        let content = export(&["|||||Yes|||1,000,000|||||abc"]);
        let records = parse(&content, &CsvOptions::default());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].revenue, 1_000_000.0);
        assert!(records[0].interstate);
        assert_eq!(records[0].year, 0);
    }
}
