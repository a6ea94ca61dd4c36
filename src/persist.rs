//! Append-only log of confirmed grasps.
//!
//! One CSV line per grasp, no header:
//!
//! ```text
//! row,label,location,r00,r01,r02,r10,r11,r12,r20,r21,r22,tx,ty,tz
//! ```
//!
//! Rotation values are row-major. Rows are never rewritten; reopening an
//! existing log continues the row numbering.

use crate::grasp::GraspCandidate;
use crate::trace::trace_event;
use crate::util::{GraspError, GraspResult};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Number of fields in one log line.
pub const RECORD_FIELDS: usize = 15;

/// One confirmed grasp as written to the log.
#[derive(Clone, Debug, PartialEq)]
pub struct PersistedGraspRecord {
    pub row_index: u64,
    /// What was grasped, supplied by the caller.
    pub object_label: String,
    /// Operator-supplied placement index.
    pub location: u32,
    /// Row-major rotation.
    pub rotation_flat: [f32; 9],
    pub translation: [f32; 3],
}

impl PersistedGraspRecord {
    pub fn from_grasp(
        row_index: u64,
        object_label: &str,
        location: u32,
        grasp: &GraspCandidate,
    ) -> Self {
        let t = grasp.translation();
        Self {
            row_index,
            object_label: object_label.to_string(),
            location,
            rotation_flat: grasp.rotation_flat(),
            translation: [t.x, t.y, t.z],
        }
    }

    fn to_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(RECORD_FIELDS);
        fields.push(self.row_index.to_string());
        fields.push(self.object_label.clone());
        fields.push(self.location.to_string());
        fields.extend(self.rotation_flat.iter().map(|v| v.to_string()));
        fields.extend(self.translation.iter().map(|v| v.to_string()));
        fields
    }

    fn from_fields(record: &StringRecord, line: usize) -> GraspResult<Self> {
        if record.len() != RECORD_FIELDS {
            return Err(GraspError::MalformedRecord {
                line,
                reason: format!("expected {RECORD_FIELDS} fields, got {}", record.len()),
            });
        }
        let bad = |what: &str, text: &str| GraspError::MalformedRecord {
            line,
            reason: format!("invalid {what} {text:?}"),
        };

        let row_index = record[0]
            .trim()
            .parse()
            .map_err(|_| bad("row index", &record[0]))?;
        let location = record[2]
            .trim()
            .parse()
            .map_err(|_| bad("location", &record[2]))?;
        let mut values = [0.0f32; 12];
        for (slot, text) in values.iter_mut().zip(record.iter().skip(3)) {
            *slot = text.trim().parse().map_err(|_| bad("number", text))?;
        }
        let mut rotation_flat = [0.0f32; 9];
        rotation_flat.copy_from_slice(&values[..9]);
        let mut translation = [0.0f32; 3];
        translation.copy_from_slice(&values[9..]);

        Ok(Self {
            row_index,
            object_label: record[1].to_string(),
            location,
            rotation_flat,
            translation,
        })
    }
}

/// Append-only grasp log backed by a CSV file.
#[derive(Debug)]
pub struct GraspLog {
    path: PathBuf,
    next_row: u64,
}

impl GraspLog {
    /// Opens a log, continuing row numbering from an existing file.
    pub fn open<P: AsRef<Path>>(path: P) -> GraspResult<Self> {
        let path = path.as_ref().to_path_buf();
        let next_row = if path.exists() {
            Self::read_all(&path)?
                .last()
                .map_or(0, |record| record.row_index + 1)
        } else {
            0
        };
        Ok(Self { path, next_row })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Row index the next append will use.
    pub fn next_row(&self) -> u64 {
        self.next_row
    }

    /// Appends one record and flushes it.
    ///
    /// Labels containing line breaks are rejected with
    /// [`GraspError::InvalidInput`] so every record stays on one line. Write
    /// failures are reported as [`GraspError::PersistenceWriteFailure`]. The
    /// row counter only advances on success.
    pub fn append(
        &mut self,
        object_label: &str,
        location: u32,
        grasp: &GraspCandidate,
    ) -> GraspResult<PersistedGraspRecord> {
        if object_label.contains(['\n', '\r']) {
            return Err(GraspError::InvalidInput(
                "object label must not contain line breaks",
            ));
        }
        let record =
            PersistedGraspRecord::from_grasp(self.next_row, object_label, location, grasp);
        let failure = |err: &dyn std::fmt::Display| {
            GraspError::PersistenceWriteFailure(format!("{}: {err}", self.path.display()))
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| failure(&e))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(record.to_fields())
            .map_err(|e| failure(&e))?;
        writer.flush().map_err(|e| failure(&e))?;

        self.next_row += 1;
        trace_event!("grasp_persisted", row = record.row_index, location = location);
        Ok(record)
    }

    /// Parses every record of a log file.
    pub fn read_all<P: AsRef<Path>>(path: P) -> GraspResult<Vec<PersistedGraspRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path.as_ref())
            .map_err(|e| GraspError::Io(e.to_string()))?;

        let mut records = Vec::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row.map_err(|e| GraspError::MalformedRecord {
                line: idx + 1,
                reason: e.to_string(),
            })?;
            records.push(PersistedGraspRecord::from_fields(&row, idx + 1)?);
        }
        Ok(records)
    }
}
