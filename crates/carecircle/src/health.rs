//! Health document metadata and the health summary.
//!
//! Upload transport belongs to the document storage service; this module only
//! keeps the metadata that service expects: id, name, kind, date and size.
//! The summary (vital metrics and recent medical records) is reference data
//! supplied by the care provider and is never written by the user.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Identifier of a health document.
pub type DocumentId = u64;

/// Category of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Report from a doctor or hospital.
    MedicalReport,
    /// Medication prescription.
    Prescription,
    /// Laboratory results.
    LabResults,
}

impl DocumentKind {
    /// All kinds, in display order.
    pub const ALL: [Self; 3] = [Self::MedicalReport, Self::Prescription, Self::LabResults];

    /// Stable snake_case name used in storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MedicalReport => "medical_report",
            Self::Prescription => "prescription",
            Self::LabResults => "lab_results",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::MedicalReport => "Medical Report",
            Self::Prescription => "Prescription",
            Self::LabResults => "Lab Results",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown document kind '{s}'"))
    }
}

/// Metadata for one uploaded health document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDocument {
    /// Unique identifier.
    pub id: DocumentId,
    /// File name shown to the user.
    pub name: String,
    /// Category.
    pub kind: DocumentKind,
    /// Day the document was recorded.
    pub date: NaiveDate,
    /// Size in bytes.
    pub size_bytes: u64,
}

impl HealthDocument {
    /// Human-readable size, e.g. `2.3 MB`.
    #[must_use]
    pub fn display_size(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let bytes = self.size_bytes as f64;
        if bytes >= 1_000_000.0 {
            format!("{:.1} MB", bytes / 1_000_000.0)
        } else if bytes >= 1_000.0 {
            format!("{:.1} KB", bytes / 1_000.0)
        } else {
            format!("{} B", self.size_bytes)
        }
    }
}

/// Default name for a document recorded on `date`.
#[must_use]
pub fn default_document_name(kind: DocumentKind, date: NaiveDate) -> String {
    format!("{}_{}", kind.label(), date.format("%Y-%m-%d"))
}

/// Ledger of uploaded health documents, newest first.
#[derive(Debug, Clone)]
pub struct HealthRecords {
    documents: Vec<HealthDocument>,
    /// `None` once the id space is used up.
    next_id: Option<DocumentId>,
}

impl Default for HealthRecords {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRecords {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            next_id: Some(1),
        }
    }

    /// Rebuild a ledger from documents already in newest-first order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if two documents share an id.
    pub fn from_documents(documents: Vec<HealthDocument>) -> Result<Self> {
        let mut seen = std::collections::HashSet::with_capacity(documents.len());
        for doc in &documents {
            if !seen.insert(doc.id) {
                return Err(Error::duplicate_id("document", doc.id));
            }
        }
        let next_id = documents
            .iter()
            .map(|d| d.id)
            .max()
            .map_or(Some(1), |max| max.checked_add(1));
        Ok(Self { documents, next_id })
    }

    /// Record an uploaded document and return its id.
    ///
    /// When `name` is `None` the document is named after its kind and date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if no document ids are left.
    pub fn record(
        &mut self,
        kind: DocumentKind,
        size_bytes: u64,
        name: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<DocumentId> {
        let id = self
            .next_id
            .ok_or_else(|| Error::conflict("document ids exhausted"))?;
        self.next_id = id.checked_add(1);
        let date = at.date_naive();
        let name = name.unwrap_or_else(|| default_document_name(kind, date));

        info!(id, %kind, size_bytes, "Recorded health document '{name}'");
        self.documents.insert(
            0,
            HealthDocument {
                id,
                name,
                kind,
                date,
                size_bytes,
            },
        );
        Ok(id)
    }

    /// Look up a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent.
    pub fn get(&self, id: DocumentId) -> Result<&HealthDocument> {
        self.documents
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::not_found("document", id))
    }

    /// All documents, newest first.
    #[must_use]
    pub fn list(&self) -> &[HealthDocument] {
        &self.documents
    }

    /// Documents of one kind, newest first.
    #[must_use]
    pub fn list_by_kind(&self, kind: DocumentKind) -> Vec<&HealthDocument> {
        self.documents.iter().filter(|d| d.kind == kind).collect()
    }
}

/// One vital reading shown on the health overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthMetric {
    /// What was measured, e.g. `Heart Rate`.
    pub title: String,
    /// Reading with its unit, e.g. `72 bpm`.
    pub value: String,
    /// Assessment of the reading, e.g. `Normal`.
    pub status: String,
}

/// Category of a medical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Routine examination.
    Checkup,
    /// Laboratory results.
    LabResults,
    /// Prescription issued or refilled.
    Prescription,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Checkup => "Checkup",
            Self::LabResults => "Lab Results",
            Self::Prescription => "Prescription",
        })
    }
}

/// Identifier of a medical record.
pub type MedicalRecordId = u32;

/// A visit or result entered by the care provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalRecord {
    /// Unique identifier.
    pub id: MedicalRecordId,
    /// Short description.
    pub title: String,
    /// Attending doctor.
    pub doctor: String,
    /// Day of the visit or result.
    pub date: NaiveDate,
    /// Category.
    pub kind: RecordKind,
}

/// Vital metrics and recent medical records for the user.
#[derive(Debug, Clone, Default)]
pub struct HealthSummary {
    metrics: Vec<HealthMetric>,
    records: Vec<MedicalRecord>,
}

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => NaiveDate::MIN,
    }
}

fn metric(title: &str, value: &str, status: &str) -> HealthMetric {
    HealthMetric {
        title: title.to_string(),
        value: value.to_string(),
        status: status.to_string(),
    }
}

fn medical_record(
    id: MedicalRecordId,
    title: &str,
    doctor: &str,
    date: NaiveDate,
    kind: RecordKind,
) -> MedicalRecord {
    MedicalRecord {
        id,
        title: title.to_string(),
        doctor: doctor.to_string(),
        date,
        kind,
    }
}

impl HealthSummary {
    /// Build a summary. Records are kept newest first, ties by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if two records share an id.
    pub fn new(metrics: Vec<HealthMetric>, mut records: Vec<MedicalRecord>) -> Result<Self> {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.id) {
                return Err(Error::duplicate_id("medical record", record.id));
            }
        }
        records.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
        Ok(Self { metrics, records })
    }

    /// The built-in summary used until a provider feed is configured.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            metrics: vec![
                metric("Blood Pressure", "120/80", "Normal"),
                metric("Heart Rate", "72 bpm", "Good"),
                metric("Weight", "68 kg", "Stable"),
                metric("Temperature", "98.6°F", "Normal"),
            ],
            records: vec![
                medical_record(
                    1,
                    "Annual Checkup",
                    "Dr. Smith",
                    ymd(2024, 10, 15),
                    RecordKind::Checkup,
                ),
                medical_record(
                    2,
                    "Blood Test Results",
                    "Dr. Johnson",
                    ymd(2024, 10, 10),
                    RecordKind::LabResults,
                ),
                medical_record(
                    3,
                    "Prescription Refill",
                    "Dr. Brown",
                    ymd(2024, 10, 5),
                    RecordKind::Prescription,
                ),
            ],
        }
    }

    /// Vital metrics in display order.
    #[must_use]
    pub fn metrics(&self) -> &[HealthMetric] {
        &self.metrics
    }

    /// Medical records, newest first.
    #[must_use]
    pub fn records(&self) -> &[MedicalRecord] {
        &self.records
    }

    /// Look up a medical record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent.
    pub fn record(&self, id: MedicalRecordId) -> Result<&MedicalRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::not_found("medical record", id))
    }
}
