use std::io::{BufRead, BufReader, Cursor};

use axum::body::Bytes;
use csv::{ReaderBuilder, StringRecord, Trim};
use tariff_domain::Reading;
use time::{Date, Time};

use super::layout::{ColumnSpec, CsvLayout, Formats};
use crate::pipeline::{Envelope, ReadingStream, Source, TariffError};

/// Usage readings parsed from an uploaded CSV body.
///
/// A missing required column ends the stream with a [`TariffError::Schema`];
/// bad individual rows are yielded as row-level errors and the stream goes on.
pub struct CsvUploadSource {
    data: Bytes,
    layout: CsvLayout,
}

impl CsvUploadSource {
    pub fn new<B: Into<Bytes>>(data: B, layout: CsvLayout) -> Self {
        Self {
            data: data.into(),
            layout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndex {
    date: usize,
    time: Option<usize>,
    kwh: usize,
}

impl ColumnIndex {
    fn width(&self) -> usize {
        self.date.max(self.kwh).max(self.time.unwrap_or(0)) + 1
    }
}

fn resolve_columns(
    headers: &StringRecord,
    columns: &ColumnSpec,
) -> Result<ColumnIndex, TariffError> {
    let find = |name: &str| -> Result<usize, TariffError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| TariffError::Schema(name.to_string()))
    };

    match columns {
        ColumnSpec::Named { date, kwh, time } => Ok(ColumnIndex {
            date: find(date)?,
            kwh: find(kwh)?,
            time: time.as_deref().map(find).transpose()?,
        }),
        ColumnSpec::Positional { date, kwh, time } => Ok(ColumnIndex {
            date: *date,
            kwh: *kwh,
            time: *time,
        }),
    }
}

/// Positional layouts have no names to check, so the first record must be
/// wide enough to hold every declared column.
fn check_width(record: &StringRecord, index: &ColumnIndex) -> Result<(), TariffError> {
    if record.len() >= index.width() {
        return Ok(());
    }
    let missing = if record.len() <= index.date {
        "date"
    } else if record.len() <= index.kwh {
        "kwh"
    } else {
        "time"
    };
    Err(TariffError::Schema(missing.to_string()))
}

fn field<'r>(
    record: &'r StringRecord,
    idx: usize,
    name: &str,
    row: usize,
) -> Result<&'r str, TariffError> {
    record.get(idx).ok_or_else(|| TariffError::Parse {
        row,
        message: format!("record has no '{name}' field"),
    })
}

fn record_to_reading(
    record: &StringRecord,
    index: &ColumnIndex,
    formats: &Formats,
    row: usize,
) -> Result<Reading, TariffError> {
    let date_str = field(record, index.date, "date", row)?;
    let date = Date::parse(date_str, &formats.date).map_err(|e| TariffError::Parse {
        row,
        message: format!("invalid date '{date_str}': {e}"),
    })?;

    let time = match index.time {
        Some(idx) => {
            let time_str = field(record, idx, "time", row)?;
            let t = Time::parse(time_str, &formats.time).map_err(|e| TariffError::Parse {
                row,
                message: format!("invalid time '{time_str}': {e}"),
            })?;
            Some(t)
        }
        None => None,
    };

    let kwh_str = field(record, index.kwh, "kwh", row)?;
    let kwh: f64 = kwh_str.parse().map_err(|e| TariffError::Coercion {
        row,
        message: format!("invalid kwh '{kwh_str}': {e}"),
    })?;

    Ok(Reading { date, time, kwh })
}

#[async_trait::async_trait]
impl Source<Reading> for CsvUploadSource {
    async fn stream(&self) -> ReadingStream<Reading> {
        // The whole upload is already in memory, so the blocking CSV reader
        // never waits on I/O.
        let data = self.data.clone();
        let layout = self.layout.clone();
        let s = async_stream::stream! {
            let prepared = prepare(&data, &layout);
            let (mut rdr, mut index, formats) = match prepared {
                Ok(p) => p,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut row = 0;
            for result in rdr.records() {
                row += 1;
                let record = match result {
                    Ok(r) => r,
                    Err(e) => {
                        metrics::counter!("csv_upload_parse_errors_total").increment(1);
                        yield Err(TariffError::Parse {
                            row,
                            message: format!("malformed record: {e}"),
                        });
                        continue;
                    }
                };

                if let Some(ix) = index.take_unchecked() {
                    if let Err(e) = check_width(&record, &ix) {
                        yield Err(e);
                        return;
                    }
                }

                match record_to_reading(&record, index.get(), &formats, row) {
                    Ok(reading) => yield Ok(Envelope::new(reading, row)),
                    Err(e) => {
                        metrics::counter!("csv_upload_parse_errors_total").increment(1);
                        yield Err(e);
                    }
                }
            }
        };

        Box::pin(s)
    }
}

/// Column index that may still need a width check against the first record.
struct PendingIndex {
    index: ColumnIndex,
    unchecked: bool,
}

impl PendingIndex {
    fn take_unchecked(&mut self) -> Option<ColumnIndex> {
        std::mem::replace(&mut self.unchecked, false).then_some(self.index)
    }

    fn get(&self) -> &ColumnIndex {
        &self.index
    }
}

type Prepared = (csv::Reader<BufReader<Cursor<Bytes>>>, PendingIndex, Formats);

fn prepare(data: &Bytes, layout: &CsvLayout) -> Result<Prepared, TariffError> {
    let formats = layout.formats()?;
    let delimiter = layout.delimiter_byte()?;

    let mut reader = BufReader::new(Cursor::new(data.clone()));
    // Banner lines are skipped as raw bytes; they need not be UTF-8.
    let mut skipped = Vec::new();
    for _ in 0..layout.skip_lines {
        reader.read_until(b'\n', &mut skipped)?;
        skipped.clear();
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(layout.has_header)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let index = if layout.has_header {
        let headers = rdr
            .headers()
            .map_err(|e| TariffError::Source(format!("failed to read CSV headers: {e}")))?
            .clone();
        let index = resolve_columns(&headers, &layout.columns)?;
        if matches!(layout.columns, ColumnSpec::Positional { .. }) {
            check_width(&headers, &index)?;
        }
        PendingIndex {
            index,
            unchecked: false,
        }
    } else {
        PendingIndex {
            index: resolve_columns(&StringRecord::new(), &layout.columns)?,
            unchecked: true,
        }
    };

    Ok((rdr, index, formats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use time::macros::{date, time};

    use crate::sources::layout::builtin_layouts;

    async fn collect(source: CsvUploadSource) -> Vec<Result<Envelope<Reading>, TariffError>> {
        source.stream().await.collect().await
    }

    fn layout(name: &str) -> CsvLayout {
        builtin_layouts().iter().find(|l| l.name == name).unwrap().clone()
    }

    #[tokio::test]
    async fn named_columns_are_parsed_by_header() {
        let csv = "kwh,date\n10,01/01/2024\n5,15/01/2024\n";
        let items = collect(CsvUploadSource::new(csv, layout("named"))).await;

        assert_eq!(items.len(), 2);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.payload, Reading::new(date!(2024 - 01 - 01), 10.0));
        assert_eq!(first.row, 1);
    }

    #[tokio::test]
    async fn missing_kwh_column_is_a_schema_error() {
        let csv = "date,usage\n01/01/2024,10\n";
        let items = collect(CsvUploadSource::new(csv, layout("named"))).await;

        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(TariffError::Schema(c)) if c == "kwh"));
    }

    #[tokio::test]
    async fn bad_rows_are_reported_and_the_stream_continues() {
        let csv = "date,kwh\n31-02-2024,3\n31/02/2024,3\n01/03/2024,abc\n02/03/2024,4\n";
        let items = collect(CsvUploadSource::new(csv, layout("named"))).await;

        assert_eq!(items.len(), 4);
        assert!(matches!(&items[0], Err(TariffError::Parse { row: 1, .. })));
        assert!(matches!(&items[1], Err(TariffError::Parse { row: 2, .. })));
        assert!(matches!(&items[2], Err(TariffError::Coercion { row: 3, .. })));
        assert_eq!(
            items[3].as_ref().unwrap().payload,
            Reading::new(date!(2024 - 03 - 02), 4.0)
        );
    }

    #[tokio::test]
    async fn positional_layout_skips_banner_and_reads_time() {
        let csv = "Usage export\nGenerated for account 1234\nDay,Hour,Usage\n\
                   01/01/2024,07:30,1.5\n01/01/2024,23:00,2\n";
        let items = collect(CsvUploadSource::new(csv, layout("positional_time"))).await;

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].as_ref().unwrap().payload,
            Reading::at(date!(2024 - 01 - 01), time!(07:30), 1.5)
        );
        assert_eq!(
            items[1].as_ref().unwrap().payload,
            Reading::at(date!(2024 - 01 - 01), time!(23:00), 2.0)
        );
    }

    #[tokio::test]
    async fn latin1_banner_lines_are_skipped() {
        let csv: &'static [u8] = b"Verbrauch f\xfcr Konto 1234\nZeitraum M\xe4rz\n\
                                  Day,Hour,Usage\n01/03/2024,08:15,3\n";
        let items = collect(CsvUploadSource::new(csv, layout("positional_time"))).await;

        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap().payload,
            Reading::at(date!(2024 - 03 - 01), time!(08:15), 3.0)
        );
    }

    #[tokio::test]
    async fn narrow_positional_file_is_a_schema_error() {
        let csv = "a\nb\nDay,Hour\n01/01/2024,07:30\n";
        let items = collect(CsvUploadSource::new(csv, layout("positional_time"))).await;

        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(TariffError::Schema(c)) if c == "kwh"));
    }

    #[tokio::test]
    async fn headerless_positional_layout_checks_first_record() {
        let mut headerless = layout("positional_time");
        headerless.skip_lines = 0;
        headerless.has_header = false;

        let ok = collect(CsvUploadSource::new("01/01/2024,7:05,1\n", headerless.clone())).await;
        assert_eq!(
            ok[0].as_ref().unwrap().payload,
            Reading::at(date!(2024 - 01 - 01), time!(07:05), 1.0)
        );

        let narrow = collect(CsvUploadSource::new("01/01/2024\n", headerless)).await;
        assert!(matches!(&narrow[0], Err(TariffError::Schema(c)) if c == "kwh"));
    }

    #[tokio::test]
    async fn missing_time_value_is_a_row_error() {
        let csv = "date,time,kwh\n01/01/2024,,1\n01/01/2024,12:00,1\n";
        let items = collect(CsvUploadSource::new(csv, layout("named_time"))).await;

        assert!(matches!(&items[0], Err(TariffError::Parse { row: 1, .. })));
        assert!(items[1].is_ok());
    }
}
