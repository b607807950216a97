//! The hosted workbook file: xlsx read/write, backups and the sample sheet.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Workbook as XlsxWorkbook, XlsxError};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use xlforge_core::{CellValue, Grid, Row, Workbook, WorkbookPayload, XlforgeError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Read(#[from] calamine::Error),

    #[error("{0}")]
    Write(#[from] XlsxError),

    #[error("{0}")]
    Invalid(#[from] XlforgeError),

    #[error("Sheet '{sheet}' is too large for xlsx at row {row}, column {col}")]
    TooLarge { sheet: String, row: usize, col: usize },
}

/// Size and modification time of the workbook file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub file_name: String,
    pub file_size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Owns the workbook file on disk. Writes are serialized.
#[derive(Debug)]
pub struct WorkbookStore {
    data_dir: PathBuf,
    file_name: String,
    max_backups: usize,
    write_lock: Mutex<()>,
}

impl WorkbookStore {
    pub fn new(data_dir: impl Into<PathBuf>, file_name: impl Into<String>, max_backups: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_name: file_name.into(),
            max_backups,
            write_lock: Mutex::new(()),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }

    fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file_name)
    }

    /// Create the data directory, and a sample workbook when no file exists.
    /// Returns true when the sample was written.
    pub fn ensure_exists(&self) -> Result<bool, StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        if self.path().exists() {
            return Ok(false);
        }
        tracing::info!("No Excel file found at {}. Creating sample file...", self.path().display());
        self.write(&sample_workbook())?;
        tracing::info!("Sample file created: {}", self.path().display());
        Ok(true)
    }

    pub fn meta(&self) -> Result<FileMeta, StoreError> {
        let metadata = fs::metadata(self.path())?;
        Ok(FileMeta {
            file_name: self.file_name.clone(),
            file_size: metadata.len(),
            last_modified: metadata.modified()?.into(),
        })
    }

    /// Read every sheet of the workbook file
    pub fn load(&self) -> Result<(WorkbookPayload, FileMeta), StoreError> {
        let mut workbook = open_workbook_auto(self.path())?;
        let sheet_names = workbook.sheet_names().to_vec();

        let mut sheets = HashMap::new();
        for name in &sheet_names {
            let range = workbook.worksheet_range(name)?;
            let (start_row, start_col) = range.start().unwrap_or((0, 0));

            let mut rows: Vec<Row> = vec![Vec::new(); start_row as usize];
            for row in range.rows() {
                let mut cells = vec![CellValue::Empty; start_col as usize];
                cells.extend(row.iter().map(cell_from_data));
                rows.push(cells);
            }
            sheets.insert(name.clone(), Grid::new(rows));
        }

        Ok((WorkbookPayload { sheet_names, sheets }, self.meta()?))
    }

    /// Validate, back up the current file, and write the payload
    pub fn save(&self, payload: WorkbookPayload) -> Result<FileMeta, StoreError> {
        let payload = Workbook::from_payload(payload)?.to_payload();

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.path().exists() {
            self.backup()?;
        }
        self.write(&payload)?;

        let meta = self.meta()?;
        tracing::info!(
            "File saved: {} ({} bytes) at {}",
            self.path().display(),
            meta.file_size,
            meta.last_modified.to_rfc3339()
        );
        Ok(meta)
    }

    fn write(&self, payload: &WorkbookPayload) -> Result<(), StoreError> {
        let mut xlsx = XlsxWorkbook::new();

        for name in &payload.sheet_names {
            let worksheet = xlsx.add_worksheet().set_name(name)?;
            let Some(grid) = payload.sheets.get(name) else {
                continue;
            };

            for (r, row) in grid.rows().iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    if cell.is_empty() {
                        continue;
                    }
                    let (Ok(row32), Ok(col16)) = (u32::try_from(r), u16::try_from(c)) else {
                        return Err(StoreError::TooLarge {
                            sheet: name.clone(),
                            row: r,
                            col: c,
                        });
                    };
                    match cell {
                        CellValue::Number(n) => {
                            worksheet.write_number(row32, col16, *n)?;
                        }
                        CellValue::Text(s) => {
                            worksheet.write_string(row32, col16, s)?;
                        }
                        CellValue::Empty => {}
                    }
                }
            }
        }

        xlsx.save(self.path())?;
        Ok(())
    }

    /// Copy the current file to a timestamped backup and drop old ones
    fn backup(&self) -> Result<PathBuf, StoreError> {
        let backup = self.data_dir.join(format!(
            "{}_backup_{}.xlsx",
            self.stem(),
            Utc::now().timestamp_millis()
        ));
        fs::copy(self.path(), &backup)?;
        self.rotate_backups()?;
        Ok(backup)
    }

    /// Backups of this workbook, oldest first
    pub fn backups(&self) -> Result<Vec<PathBuf>, StoreError> {
        let prefix = format!("{}_backup_", self.stem());
        let mut backups: Vec<PathBuf> = fs::read_dir(&self.data_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".xlsx"))
            })
            .collect();
        backups.sort();
        Ok(backups)
    }

    fn rotate_backups(&self) -> Result<(), StoreError> {
        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.max_backups);
        for old in &backups[..excess] {
            tracing::debug!("Removing old backup {}", old.display());
            fs::remove_file(old)?;
        }
        Ok(())
    }
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        other => CellValue::text(other.to_string()),
    }
}

/// Store table and notes sheet written when the server starts without a file
pub fn sample_workbook() -> WorkbookPayload {
    let stores: [(&str, &str, &str, &str, &str, f64, f64, &str); 10] = [
        ("S001", "Downtown Central", "Alice Johnson", "New York", "East", 150000.0, 142000.0, "Review"),
        ("S002", "West Side Mall", "Bob Martinez", "Los Angeles", "West", 120000.0, 135000.0, "Verified"),
        ("S003", "Northgate Plaza", "Carol White", "Chicago", "Midwest", 100000.0, 98000.0, "Review"),
        ("S004", "Eastfield Centre", "David Lee", "Houston", "South", 110000.0, 115000.0, "Verified"),
        ("S005", "Riverside Market", "Eva Patel", "Phoenix", "West", 90000.0, 87000.0, "Review"),
        ("S006", "Lakeside Store", "Frank Brown", "Philadelphia", "East", 130000.0, 128000.0, "Pending"),
        ("S007", "Summit Square", "Grace Kim", "San Antonio", "South", 95000.0, 101000.0, "Verified"),
        ("S008", "Metro Junction", "Henry Davis", "San Diego", "West", 105000.0, 99000.0, "Pending"),
        ("S009", "Pinewood Corner", "Iris Chen", "Dallas", "South", 115000.0, 120000.0, "Verified"),
        ("S010", "Cedarwood Mall", "James Wilson", "San Jose", "West", 125000.0, 118000.0, "Review"),
    ];

    let header = [
        "Store ID",
        "Store Name",
        "Manager",
        "City",
        "Region",
        "Monthly Target ($)",
        "Actual Sales ($)",
        "Status",
    ];
    let mut rows: Vec<Row> = vec![header.iter().map(|&h| CellValue::text(h)).collect()];
    rows.extend(stores.iter().map(|&(id, name, manager, city, region, target, actual, status)| {
        vec![
            CellValue::text(id),
            CellValue::text(name),
            CellValue::text(manager),
            CellValue::text(city),
            CellValue::text(region),
            CellValue::Number(target),
            CellValue::Number(actual),
            CellValue::text(status),
        ]
    }));

    let updated = format!("Last updated: {}", Utc::now().format("%Y-%m-%d"));
    let notes = Grid::from_strs(&[
        &["Sheet Notes"],
        &[""],
        &["This file is managed via XL-Forge web editor."],
        &["Store managers can verify and update their information through the web UI."],
        &[updated.as_str()],
    ]);

    WorkbookPayload {
        sheet_names: vec!["Stores".to_string(), "Notes".to_string()],
        sheets: HashMap::from([
            ("Stores".to_string(), Grid::new(rows)),
            ("Notes".to_string(), notes),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(max_backups: usize) -> (TempDir, WorkbookStore) {
        let dir = TempDir::new().unwrap();
        let store = WorkbookStore::new(dir.path(), "store-data.xlsx", max_backups);
        (dir, store)
    }

    fn payload(cell: &str) -> WorkbookPayload {
        WorkbookPayload {
            sheet_names: vec!["Data".to_string()],
            sheets: HashMap::from([(
                "Data".to_string(),
                Grid::new(vec![
                    vec![CellValue::text("Name"), CellValue::text("Qty")],
                    vec![CellValue::text(cell), CellValue::Number(2.5)],
                ]),
            )]),
        }
    }

    #[test]
    fn test_sample_created_once() {
        let (_dir, store) = store(5);
        assert!(store.ensure_exists().unwrap());
        assert!(!store.ensure_exists().unwrap());

        let (loaded, meta) = store.load().unwrap();
        assert_eq!(loaded.sheet_names, vec!["Stores", "Notes"]);
        assert_eq!(loaded.sheets["Stores"].shape().rows, 11);
        assert_eq!(loaded.sheets["Stores"].get(1, 5), Some(&CellValue::Number(150000.0)));
        assert_eq!(loaded.sheets["Notes"].get(1, 0), Some(&CellValue::Empty));
        assert_eq!(meta.file_name, "store-data.xlsx");
        assert!(meta.file_size > 0);
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = store(5);
        store.save(payload("bolts")).unwrap();

        let (loaded, _) = store.load().unwrap();
        assert_eq!(loaded.sheet_names, vec!["Data"]);
        assert_eq!(loaded.sheets["Data"], payload("bolts").sheets["Data"]);
        assert!(store.backups().unwrap().is_empty());
    }

    #[test]
    fn test_save_backs_up_previous_file() {
        let (_dir, store) = store(5);
        store.save(payload("first")).unwrap();
        store.save(payload("second")).unwrap();

        let backups = store.backups().unwrap();
        assert_eq!(backups.len(), 1);
        let name = backups[0].file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("store-data_backup_"));
    }

    #[test]
    fn test_backup_rotation() {
        let (dir, store) = store(2);
        for millis in ["1000000000000", "1000000000001", "1000000000002"] {
            fs::write(dir.path().join(format!("store-data_backup_{millis}.xlsx")), b"old").unwrap();
        }
        fs::write(dir.path().join("other_backup_1.xlsx"), b"keep").unwrap();

        store.save(payload("x")).unwrap();
        store.save(payload("y")).unwrap();

        let backups = store.backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert!(!dir.path().join("store-data_backup_1000000000000.xlsx").exists());
        assert!(dir.path().join("other_backup_1.xlsx").exists());
    }

    #[test]
    fn test_invalid_payload_rejected() {
        let (_dir, store) = store(5);
        let empty = WorkbookPayload::default();
        assert!(matches!(store.save(empty), Err(StoreError::Invalid(XlforgeError::EmptyWorkbook))));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_listed_sheet_without_grid_is_written_empty() {
        let (_dir, store) = store(5);
        let mut payload = payload("a");
        payload.sheet_names.push("Blank".to_string());
        store.save(payload).unwrap();

        let (loaded, _) = store.load().unwrap();
        assert_eq!(loaded.sheet_names, vec!["Data", "Blank"]);
        assert!(loaded.sheets["Blank"].is_empty());
    }

    #[test]
    fn test_read_error_for_missing_file() {
        let (_dir, store) = store(5);
        assert!(store.load().is_err());
    }
}
