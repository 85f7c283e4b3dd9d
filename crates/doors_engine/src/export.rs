use std::path::PathBuf;
use std::sync::Arc;

use doors_core::{
    Reconciliation, Record, ResultSet, FIELD_ACCOUNT, FIELD_CLIENT, FIELD_EMAIL, FIELD_PHONE,
    SENTINEL,
};
use doors_logging::doors_warn;
use serde::Serialize;
use serde_json::json;

use crate::filename::export_filename;
use crate::persist::{AtomicFileWriter, PersistError};

/// Produces the `YYYYMMDD-HHMMSS` stamp embedded in export names.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Columns of the operator template, each with the record label it is read from.
pub const TEMPLATE_COLUMNS: [(&str, &str); 8] = [
    ("ADRESSE", "Résidence"),
    ("CLIENT", FIELD_CLIENT),
    ("NUMÉRO DE TÉLÉPHONE", FIELD_PHONE),
    ("COURRIEL", FIELD_EMAIL),
    ("NUMÉRO DE COMPTE", FIELD_ACCOUNT),
    ("SERVICES ACTUELS", "Services actuels"),
    ("DERNIER STATUT", "Dernier statut"),
    ("SERVICE AVANT DEBRANCHEMENT", "Services avant débranchement"),
];

const LISTING_LEADING: [&str; 3] = ["city", "street", "rta"];

pub fn local_clock() -> Clock {
    Arc::new(|| chrono::Local::now().format(TIMESTAMP_FORMAT).to_string())
}

/// Where exports go and how they are stamped.
#[derive(Clone)]
pub struct ExportSettings {
    pub dest_dir: PathBuf,
    pub clock: Clock,
}

impl ExportSettings {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            clock: local_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn timestamp(&self) -> String {
        (self.clock)()
    }

    fn writer(&self) -> AtomicFileWriter {
        AtomicFileWriter::new(self.dest_dir.clone())
    }
}

impl std::fmt::Debug for ExportSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSettings")
            .field("dest_dir", &self.dest_dir)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(String),
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

/// Filter values a listing was scraped with, repeated on every CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingColumns {
    pub city: String,
    pub street: String,
    pub rta: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingExport {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailExport {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    pub missing_path: Option<PathBuf>,
    pub unmatched_path: Option<PathBuf>,
    pub record_count: usize,
}

/// Writes the listing JSON (always, even empty) and its CSV. An empty set
/// yields a CSV holding only the leading header.
pub fn export_listing(
    settings: &ExportSettings,
    prefix: &str,
    columns: &ListingColumns,
    records: &ResultSet,
) -> Result<ListingExport, ExportError> {
    let ts = settings.timestamp();
    let writer = settings.writer();

    let json_path = write_json(&writer, &export_filename("doors", prefix, &ts, "json"), records)?;

    let labels = records.label_union();
    let header: Vec<&str> = LISTING_LEADING
        .iter()
        .copied()
        .chain(labels.iter().map(String::as_str))
        .collect();
    let rows = records.iter().map(|record| {
        [
            columns.city.as_str(),
            columns.street.as_str(),
            columns.rta.as_str(),
        ]
        .into_iter()
        .chain(labels.iter().map(|label| record.get(label).unwrap_or("")))
        .map(str::to_string)
        .collect::<Vec<_>>()
    });
    let csv_name = export_filename("doors", prefix, &ts, "csv");
    let csv_path = write_csv(&writer, &csv_name, &header, rows)?;

    Ok(ListingExport {
        json_path,
        csv_path,
        record_count: records.len(),
    })
}

/// Writes the reconciled rows (lossless JSON plus the operator template), the
/// missing-field report when any row is missing, and the unmatched report when
/// there is anything to report.
pub fn export_details(
    settings: &ExportSettings,
    prefix: &str,
    reconciliation: &Reconciliation,
) -> Result<DetailExport, ExportError> {
    let ts = settings.timestamp();
    let writer = settings.writer();

    let rows: Vec<&Record> = reconciliation.rows.iter().map(|row| &row.fields).collect();
    let json_name = export_filename("specifics", prefix, &ts, "json");
    let json_path = write_json(&writer, &json_name, &rows)?;
    let csv_name = export_filename("specifics", prefix, &ts, "csv");
    let csv_path = write_template(&writer, &csv_name, rows.iter().copied())?;

    let missing: Vec<&Record> = reconciliation
        .missing_rows()
        .map(|row| &row.fields)
        .collect();
    let missing_path = if missing.is_empty() {
        None
    } else {
        side_report(
            &writer,
            &export_filename("missing_after_merge", "", &ts, "csv"),
            missing.iter().copied(),
        )
    };

    let unmatched_path = if reconciliation.unmatched_secondary.is_empty() {
        None
    } else {
        side_report(
            &writer,
            &export_filename("unmatched_accounts", "", &ts, "csv"),
            reconciliation.unmatched_secondary.iter(),
        )
    };

    Ok(DetailExport {
        json_path,
        csv_path,
        missing_path,
        unmatched_path,
        record_count: rows.len(),
    })
}

/// Export used when reconciliation itself failed: both sets are kept verbatim
/// in the JSON, and the template is filled from the primary rows alone.
pub fn export_details_unreconciled(
    settings: &ExportSettings,
    prefix: &str,
    primary: &ResultSet,
    secondary: &ResultSet,
) -> Result<DetailExport, ExportError> {
    let ts = settings.timestamp();
    let writer = settings.writer();

    let payload = json!({ "primary": primary, "secondary": secondary });
    let json_name = export_filename("specifics", prefix, &ts, "json");
    let json_path = write_json(&writer, &json_name, &payload)?;
    let csv_name = export_filename("specifics", prefix, &ts, "csv");
    let csv_path = write_template(&writer, &csv_name, primary.iter())?;

    Ok(DetailExport {
        json_path,
        csv_path,
        missing_path: None,
        unmatched_path: None,
        record_count: primary.len(),
    })
}

fn write_json<T: Serialize + ?Sized>(
    writer: &AtomicFileWriter,
    filename: &str,
    value: &T,
) -> Result<PathBuf, ExportError> {
    writer.write_with(filename, |out| -> Result<(), ExportError> {
        serde_json::to_writer_pretty(out, value)?;
        Ok(())
    })
}

fn write_template<'a>(
    writer: &AtomicFileWriter,
    filename: &str,
    records: impl Iterator<Item = &'a Record>,
) -> Result<PathBuf, ExportError> {
    let header: Vec<&str> = TEMPLATE_COLUMNS.iter().map(|(column, _)| *column).collect();
    let rows = records.map(|record| {
        TEMPLATE_COLUMNS
            .iter()
            .map(|(_, label)| template_value(record, label).to_string())
            .collect::<Vec<_>>()
    });
    write_csv(writer, filename, &header, rows)
}

fn template_value<'a>(record: &'a Record, label: &str) -> &'a str {
    match record.get(label) {
        Some(value) if !value.trim().is_empty() => value,
        _ => SENTINEL,
    }
}

/// Report written next to the main export. A failure is logged and leaves
/// the main export standing.
fn side_report<'a>(
    writer: &AtomicFileWriter,
    filename: &str,
    records: impl Iterator<Item = &'a Record>,
) -> Option<PathBuf> {
    match write_records_csv(writer, filename, records) {
        Ok(path) => Some(path),
        Err(err) => {
            doors_warn!("could not write {filename}: {err}");
            None
        }
    }
}

/// CSV of whole records over the sorted union of their labels.
fn write_records_csv<'a>(
    writer: &AtomicFileWriter,
    filename: &str,
    records: impl Iterator<Item = &'a Record>,
) -> Result<PathBuf, ExportError> {
    let set: ResultSet = records.cloned().collect();
    let labels = set.label_union();
    let header: Vec<&str> = labels.iter().map(String::as_str).collect();
    let rows = set.iter().map(|record| {
        labels
            .iter()
            .map(|label| record.get(label).unwrap_or("").to_string())
            .collect::<Vec<_>>()
    });
    write_csv(writer, filename, &header, rows)
}

fn write_csv(
    writer: &AtomicFileWriter,
    filename: &str,
    header: &[&str],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<PathBuf, ExportError> {
    writer.write_with(filename, |out| -> Result<(), ExportError> {
        let mut csv = csv::Writer::from_writer(out);
        csv.write_record(header)?;
        for row in rows {
            csv.write_record(&row)?;
        }
        csv.flush().map_err(PersistError::from)?;
        Ok(())
    })
}
