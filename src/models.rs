use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::roles::RoleSet;

/// Columns every staff (pegawai) record carries, in export order.
/// A restore document must provide all of them.
pub const STAFF_COLUMNS: [&str; 33] = [
    "NAMA",
    "NIP",
    "GELAR DEPAN",
    "GELAR BELAKANG",
    "TEMPAT LAHIR",
    "TANGGAL LAHIR",
    "JENIS KELAMIN",
    "AGAMA",
    "JENIS KAWIN",
    "NIK",
    "NOMOR HP",
    "EMAIL",
    "ALAMAT",
    "NPWP",
    "BPJS",
    "JENIS PEGAWAI",
    "KEDUDUKAN HUKUM",
    "STATUS CPNS PNS",
    "KARTU ASN VIRTUAL",
    "TMT CPNS",
    "TMT PNS",
    "GOL AWAL",
    "GOL AKHIR",
    "TMT GOLONGAN",
    "MK TAHUN",
    "MK BULAN",
    "JENIS JABATAN",
    "NAMA JABATAN",
    "TMT JABATAN",
    "TINGKAT PENDIDIKAN",
    "NAMA PENDIDIKAN",
    "NAMA UNOR",
    "UNOR INDUK",
];

/// Canonical form of a column header: trimmed and uppercased.
pub fn normalize_column(name: &str) -> String {
    name.trim().to_uppercase()
}

/// StaffRecord
///
/// One staff member, keyed by column name in `STAFF_COLUMNS` order. Values are
/// kept as text exactly as they were imported; the portal never interprets them.
pub type StaffRecord = IndexMap<String, String>;

/// BackupDocument
///
/// Full export of the staff data, served by `GET /api/backup`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BackupDocument {
    #[ts(type = "string")]
    pub exported_at: DateTime<Utc>,
    pub columns: Vec<String>,
    pub records: Vec<StaffRecord>,
}

// --- Request Payloads (Input Schemas) ---

/// RestoreRequest
///
/// Input payload for `POST /api/restore`, also built from CSV uploads. A
/// `BackupDocument` is accepted as is; `exported_at` is ignored. Record values
/// may be any JSON scalar so that numeric NIP/NIK values survive a round trip
/// through spreadsheet tools.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RestoreRequest {
    pub columns: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<BTreeMap<String, Value>>,
}

impl RestoreRequest {
    /// Expected columns absent from the document's header, in export order.
    pub fn missing_columns(&self) -> Vec<String> {
        let provided: Vec<String> = self.columns.iter().map(|c| normalize_column(c)).collect();
        STAFF_COLUMNS
            .iter()
            .filter(|expected| !provided.iter().any(|c| c == *expected))
            .map(|expected| expected.to_string())
            .collect()
    }

    /// Converts the payload into canonical records: headers normalised, unknown
    /// columns dropped, absent cells filled with an empty string.
    pub fn into_records(self) -> Vec<StaffRecord> {
        self.records
            .into_iter()
            .map(|raw| {
                let normalized: BTreeMap<String, Value> = raw
                    .into_iter()
                    .map(|(key, value)| (normalize_column(&key), value))
                    .collect();
                STAFF_COLUMNS
                    .iter()
                    .map(|column| {
                        let cell = normalized.get(*column).map(cell_text).unwrap_or_default();
                        (column.to_string(), cell)
                    })
                    .collect()
            })
            .collect()
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// WipeRequest
///
/// Input payload for `POST /api/wipe`. Deleting all staff data cannot be undone,
/// so the caller must confirm explicitly.
#[derive(Debug, Clone, Default, Deserialize, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct WipeRequest {
    #[serde(default)]
    pub confirm: bool,
}

// --- Response Payloads (Output Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RestoreSummary {
    pub restored: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct WipeSummary {
    pub removed: usize,
}

/// MeResponse
///
/// The current actor as resolved from the session ("Login sebagai ...").
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MeResponse {
    pub id: String,
    pub roles: RoleSet,
}
