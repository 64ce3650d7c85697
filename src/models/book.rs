//! Represents a book listed in the catalog.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single catalog entry describing a book available for exchange or
/// donation.
///
/// Records are immutable once stored: there is no update or delete
/// operation, and ids are never reused. The serialized field names are the
/// wire contract consumed by the mobile clients — do not rename them.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct BookRecord {
    /// Store-assigned identifier; unique and monotonically increasing.
    pub id: i64,

    /// Book title. The only field required to be non-empty.
    pub title: String,

    /// Free-form subject label (e.g. "Matemática"). Absent when the
    /// submitter left it blank.
    pub subject: Option<String>,

    /// Free-form condition label (e.g. "usado").
    pub condition: Option<String>,

    /// Client-supplied distance hint in kilometres; 0 when not given.
    /// Clients recompute real distances locally, this is display-only.
    pub distance: f64,

    /// Path reference to the uploaded cover photo (`/uploads/<name>`),
    /// or `None` when no image was attached.
    pub image: Option<String>,

    /// Latitude of the offer location, if shared.
    pub latitude: Option<f64>,

    /// Longitude of the offer location, if shared.
    pub longitude: Option<f64>,
}

impl BookRecord {
    /// Geographic position of the offer, only when both coordinates are
    /// present. `(0.0, 0.0)` is a real position, not a missing one.
    pub fn coords(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Everything a new catalog entry needs except the store-assigned id and
/// the stored image path. Built by the upload handler from multipart form
/// fields; numeric fields that failed to parse arrive as their defaults.
#[derive(Debug, Clone, Default)]
pub struct BookDraft {
    pub title: String,
    pub subject: Option<String>,
    pub condition: Option<String>,
    pub distance: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
