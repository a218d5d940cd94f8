// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Point-of-interest features returned by the spatial index.

use geo::Point;

/// A point feature near the query centre.
#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    /// Feature id, when the index provides one
    pub id: Option<String>,
    /// Display name (often absent for buildings)
    pub name: Option<String>,
    /// `properties.type`, e.g. "Hospital"
    pub kind: String,
    /// Distance from the query centre as reported by the index (metres)
    pub distance: f64,
    /// Feature position (x = longitude, y = latitude)
    pub location: Point<f64>,
}

impl Facility {
    /// Coordinates as `(lon, lat)`.
    pub fn coordinates(&self) -> (f64, f64) {
        (self.location.x(), self.location.y())
    }
}
