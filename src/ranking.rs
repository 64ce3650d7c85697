//! Client-side proximity ranking over catalog records.
//!
//! The mobile clients fetch the full book list and rank it locally against
//! the device position: a text filter, optional subject/condition facets,
//! then an ascending great-circle-distance sort. Everything here is a pure
//! function of its inputs and is re-run from scratch whenever the query,
//! the facets, the data, or the observer position change.

use crate::models::book::BookRecord;

/// Mean Earth radius in kilometres, as used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance attached to a record lacking coordinates when ranking against
/// an observer. Pushes the record behind every located offer without
/// dropping it from the results.
pub const MISSING_COORDS_KM: f64 = 9999.0;

/// A geographic position. `(0.0, 0.0)` is a valid point — absence of a
/// coordinate is expressed by not having a `GeoPoint` at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Explicit filter parameters for one ranking pass. Passed anew on every
/// invocation; the ranker keeps no selection state of its own.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    /// Case-insensitive substring match against titles. Empty keeps all.
    pub query: String,
    /// Case-insensitive equality facet on the subject label.
    pub subject: Option<String>,
    /// Case-insensitive equality facet on the condition label.
    pub condition: Option<String>,
}

/// One display-ready row: the record plus the distance computed for the
/// observer this pass ran against. `distance_km` is `None` when no
/// observer position was available.
#[derive(Debug, Clone)]
pub struct RankedBook {
    pub book: BookRecord,
    pub distance_km: Option<f64>,
}

/// Great-circle distance in kilometres between two points, by the
/// haversine formula on a sphere of radius [`EARTH_RADIUS_KM`].
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Filter and order catalog records for display.
///
/// 1. keep titles containing `filter.query`, case-insensitive;
/// 2. apply the subject and condition facets (they compose with AND; a
///    record without the faceted field never matches it);
/// 3. with an observer, attach a distance to each survivor — haversine
///    when the record has both coordinates, [`MISSING_COORDS_KM`]
///    otherwise — and sort ascending; the sort is stable, so equal
///    distances keep their input order;
/// 4. without an observer, keep the input order and attach no distance.
pub fn rank_books(
    books: &[BookRecord],
    filter: &BookFilter,
    observer: Option<GeoPoint>,
) -> Vec<RankedBook> {
    let query = filter.query.to_lowercase();
    let subject = filter.subject.as_deref().map(str::to_lowercase);
    let condition = filter.condition.as_deref().map(str::to_lowercase);

    let survivors = books
        .iter()
        .filter(|book| query.is_empty() || book.title.to_lowercase().contains(&query))
        .filter(|book| matches_facet(subject.as_deref(), book.subject.as_deref()))
        .filter(|book| matches_facet(condition.as_deref(), book.condition.as_deref()))
        .cloned();

    match observer {
        Some(observer) => {
            let mut scored: Vec<(f64, BookRecord)> = survivors
                .map(|book| (distance_to(observer, &book), book))
                .collect();
            scored.sort_by(|a, b| a.0.total_cmp(&b.0));
            scored
                .into_iter()
                .map(|(distance_km, book)| RankedBook {
                    book,
                    distance_km: Some(distance_km),
                })
                .collect()
        }
        None => survivors
            .map(|book| RankedBook {
                book,
                distance_km: None,
            })
            .collect(),
    }
}

/// A facet matches when it is unset, or when the record carries the field
/// with the same value ignoring case. `facet_lower` is already lowercased.
fn matches_facet(facet_lower: Option<&str>, value: Option<&str>) -> bool {
    match (facet_lower, value) {
        (None, _) => true,
        (Some(facet), Some(value)) => value.to_lowercase() == facet,
        (Some(_), None) => false,
    }
}

fn distance_to(observer: GeoPoint, book: &BookRecord) -> f64 {
    match book.coords() {
        Some((latitude, longitude)) => haversine_km(
            observer,
            GeoPoint {
                latitude,
                longitude,
            },
        ),
        None => MISSING_COORDS_KM,
    }
}
