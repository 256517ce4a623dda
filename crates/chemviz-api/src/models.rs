// Wire models for the equipment REST API.
//
// Field names follow the backend's JSON exactly; anything the server
// may omit is defaulted so a sparse record still decodes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One paginated listing response: `{count, next, previous, results}`.
///
/// `next` / `previous` are absolute URLs (or null). They are opaque --
/// fetch them verbatim, never rebuild them from parts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paginated<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<Url>,
    #[serde(default)]
    pub previous: Option<Url>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// A single piece of process equipment as returned by `/api/equipment/`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EquipmentRecord {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub equipment_type: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub pressure: f64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub flowrate: f64,
    #[serde(default)]
    pub description: Option<String>,
    /// Owning dataset id.
    #[serde(default)]
    pub dataset: Option<u64>,
}

/// A dataset created by one upload, with server-computed aggregates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatasetSummary {
    pub id: u64,
    pub name: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub equipment_count: u64,
    #[serde(default)]
    pub avg_flowrate: f64,
    #[serde(default)]
    pub avg_pressure: f64,
    #[serde(default)]
    pub avg_temperature: f64,
    /// Equipment type -> number of records of that type.
    #[serde(default)]
    pub type_distribution: BTreeMap<String, u64>,
}

/// Reply to `POST /api-token-auth/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Reply to `POST /api/upload/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadResponse {
    /// Number of equipment rows the server created.
    pub created: u64,
    #[serde(default)]
    pub dataset: Option<UploadedDataset>,
}

/// The dataset row created by an upload (aggregates are not computed yet).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadedDataset {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Reply to `GET /api/`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
}

/// Error body shapes the backend produces: `{"detail": ...}` for most
/// errors, `{"non_field_errors": [...]}` for rejected credentials.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub non_field_errors: Vec<String>,
}

impl ErrorBody {
    pub(crate) fn reason(self) -> Option<String> {
        self.detail
            .or_else(|| self.non_field_errors.into_iter().next())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sparse_equipment_record_decodes() {
        let record: EquipmentRecord = serde_json::from_value(json!({
            "id": 1,
            "name": "Pump-1",
            "material": "Steel",
            "pressure": 5.2,
            "temperature": 110
        }))
        .unwrap();
        assert_eq!(record.name, "Pump-1");
        assert!(record.equipment_type.is_empty());
        assert!((record.temperature - 110.0).abs() < f64::EPSILON);
        assert!(record.description.is_none());
    }

    #[test]
    fn page_without_results_is_empty() {
        let page: Paginated<EquipmentRecord> =
            serde_json::from_value(json!({ "next": null, "previous": null })).unwrap();
        assert!(page.results.is_empty());
        assert!(page.next.is_none());
    }

    #[test]
    fn dataset_summary_with_distribution() {
        let ds: DatasetSummary = serde_json::from_value(json!({
            "id": 4,
            "name": "plant.csv",
            "uploaded_at": "2024-06-15T10:30:00.123456Z",
            "equipment_count": 2,
            "avg_pressure": 6.8,
            "type_distribution": { "Pump": 1, "Compressor": 1 }
        }))
        .unwrap();
        assert_eq!(ds.equipment_count, 2);
        assert_eq!(ds.type_distribution.get("Pump"), Some(&1));
        assert!(ds.avg_flowrate.abs() < f64::EPSILON);
    }

    #[test]
    fn error_body_prefers_detail() {
        let body: ErrorBody = serde_json::from_value(json!({
            "detail": "Not found.",
            "non_field_errors": ["other"]
        }))
        .unwrap();
        assert_eq!(body.reason().as_deref(), Some("Not found."));

        let body: ErrorBody = serde_json::from_value(json!({
            "non_field_errors": ["Unable to log in with provided credentials."]
        }))
        .unwrap();
        assert_eq!(
            body.reason().as_deref(),
            Some("Unable to log in with provided credentials.")
        );
    }
}
