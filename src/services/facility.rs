// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nearest facility resolution around the device position.

use crate::error::{AppError, Result};
use crate::models::Facility;
use crate::notify::{Notice, Notifier};
use crate::services::tilequery::{SpatialIndex, TileQuery};
use async_trait::async_trait;
use geo::Point;
use std::sync::Arc;

/// Facility type the resolver looks for.
pub const TARGET_FACILITY_TYPE: &str = "Hospital";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Device location source (foreground permission plus a position fix).
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus>;
    async fn current_position(&self) -> Result<Point<f64>>;
}

/// Location provider pinned to one coordinate (headless runs, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Point<f64>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }

    async fn current_position(&self) -> Result<Point<f64>> {
        Ok(self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Could not determine location: {0}")]
    Location(AppError),

    #[error("Facility query failed: {0}")]
    Query(AppError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Facility),
    NoneNearby,
}

/// Closest feature of type `kind`, by index-reported distance.
///
/// Ties keep the earliest feature.
pub fn nearest_of_type<'a>(features: &'a [Facility], kind: &str) -> Option<&'a Facility> {
    features
        .iter()
        .filter(|f| f.kind == kind)
        .reduce(|best, next| if next.distance < best.distance { next } else { best })
}

/// Resolver state for the hospitals map.
pub struct FacilityResolver {
    index: Arc<dyn SpatialIndex>,
    location: Arc<dyn LocationProvider>,
    notifier: Arc<dyn Notifier>,
    device: Option<Point<f64>>,
    camera: Option<Point<f64>>,
    resolved: Option<Facility>,
}

impl FacilityResolver {
    pub fn new(
        index: Arc<dyn SpatialIndex>,
        location: Arc<dyn LocationProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            index,
            location,
            notifier,
            device: None,
            camera: None,
            resolved: None,
        }
    }

    /// Where the map camera should point.
    pub fn camera(&self) -> Option<Point<f64>> {
        self.camera
    }

    /// The last facility resolved.
    pub fn resolved(&self) -> Option<&Facility> {
        self.resolved.as_ref()
    }

    /// Last known device position.
    pub fn device_position(&self) -> Option<Point<f64>> {
        self.device
    }

    /// Ask for location permission, read the position and centre the camera on it.
    pub async fn locate(&mut self) -> std::result::Result<Point<f64>, ResolveError> {
        let permission = self
            .location
            .request_permission()
            .await
            .map_err(|e| self.location_failed(e))?;
        if permission == PermissionStatus::Denied {
            return Err(self.permission_denied());
        }

        let position = self
            .location
            .current_position()
            .await
            .map_err(|e| self.location_failed(e))?;

        tracing::debug!(lon = position.x(), lat = position.y(), "Device located");
        self.device = Some(position);
        self.camera = Some(position);
        Ok(position)
    }

    /// Resolve the nearest hospital around the last located position.
    pub async fn find_nearest(&mut self) -> std::result::Result<Resolution, ResolveError> {
        let Some(origin) = self.device else {
            return Err(self.permission_denied());
        };
        self.find_nearest_from(origin).await
    }

    /// Resolve the nearest hospital around `origin`.
    pub async fn find_nearest_from(
        &mut self,
        origin: Point<f64>,
    ) -> std::result::Result<Resolution, ResolveError> {
        let features = match self.index.query(&TileQuery::around(origin)).await {
            Ok(features) => features,
            Err(e) => {
                tracing::warn!(error = %e, "Facility query failed");
                self.notifier.notify(Notice::error(
                    "Something Went Wrong",
                    "An unexpected error occurred. Please try again.",
                ));
                return Err(ResolveError::Query(e));
            }
        };

        let Some(nearest) = nearest_of_type(&features, TARGET_FACILITY_TYPE).cloned() else {
            tracing::info!(
                candidates = features.len(),
                "No facility of the target type nearby"
            );
            self.notifier.notify(Notice::error(
                "No Hospitals Nearby",
                "We couldn't find any hospitals in your area.",
            ));
            return Ok(Resolution::NoneNearby);
        };

        tracing::info!(
            id = nearest.id.as_deref().unwrap_or("-"),
            distance = nearest.distance,
            "Nearest facility resolved"
        );
        self.camera = Some(nearest.location);
        self.resolved = Some(nearest.clone());
        Ok(Resolution::Found(nearest))
    }

    fn permission_denied(&self) -> ResolveError {
        self.notifier.notify(Notice::error(
            "Permission Denied",
            "Location access is required to find nearby hospitals.",
        ));
        ResolveError::PermissionDenied
    }

    fn location_failed(&self, err: AppError) -> ResolveError {
        tracing::warn!(error = %err, "Location lookup failed");
        self.notifier.notify(Notice::error(
            "Something Went Wrong",
            "An unexpected error occurred. Please try again.",
        ));
        ResolveError::Location(err)
    }
}
