// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spatial feature index backed by the Mapbox Tilequery API.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Facility;
use async_trait::async_trait;
use geo::Point;
use geojson::{feature::Id, Feature, FeatureCollection};

const TILESET: &str = "mapbox.mapbox-streets-v8";

/// Bounded-radius query around a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileQuery {
    /// Query centre (x = longitude, y = latitude)
    pub center: Point<f64>,
    /// Search radius in metres
    pub radius: u32,
    /// Maximum number of features returned
    pub limit: u32,
    /// Collapse features split across tile boundaries
    pub dedupe: bool,
}

impl TileQuery {
    pub const DEFAULT_RADIUS_METERS: u32 = 1000;
    pub const DEFAULT_LIMIT: u32 = 50;

    /// The standard 1 km / 50 feature deduplicated query around `center`.
    pub fn around(center: Point<f64>) -> Self {
        Self {
            center,
            radius: Self::DEFAULT_RADIUS_METERS,
            limit: Self::DEFAULT_LIMIT,
            dedupe: true,
        }
    }
}

/// Remote index of point features.
#[async_trait]
pub trait SpatialIndex: Send + Sync {
    async fn query(&self, query: &TileQuery) -> Result<Vec<Facility>>;
}

/// Mapbox Tilequery client.
#[derive(Clone)]
pub struct MapboxTilequery {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MapboxTilequery {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: "https://api.mapbox.com/v4".to_string(),
            access_token: config.mapbox_access_token.clone(),
        })
    }

    fn url(&self, query: &TileQuery) -> String {
        format!(
            "{}/{}/tilequery/{},{}.json",
            self.base_url,
            TILESET,
            query.center.x(),
            query.center.y()
        )
    }
}

#[async_trait]
impl SpatialIndex for MapboxTilequery {
    async fn query(&self, query: &TileQuery) -> Result<Vec<Facility>> {
        let mut params = vec![
            ("radius", query.radius.to_string()),
            ("limit", query.limit.to_string()),
            ("geometry", "point".to_string()),
            ("access_token", self.access_token.clone()),
        ];
        if query.dedupe {
            params.push(("dedupe", "true".to_string()));
        }

        let response = self
            .http
            .get(self.url(query))
            .query(&params)
            .send()
            .await
            .map_err(AppError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                tracing::warn!("Mapbox rate limit hit (429)");
            }
            return Err(AppError::Network(format!("Tilequery HTTP {}: {}", status, body)));
        }

        let body = response.text().await.map_err(AppError::from_transport)?;
        let facilities = parse_tilequery(&body)?;
        tracing::debug!(count = facilities.len(), "Tilequery returned features");
        Ok(facilities)
    }
}

/// Parse a Tilequery GeoJSON response into facilities.
///
/// Features without point geometry or a `tilequery.distance` are skipped.
pub fn parse_tilequery(body: &str) -> Result<Vec<Facility>> {
    let collection: FeatureCollection = body
        .parse()
        .map_err(|e: geojson::Error| AppError::Network(format!("Invalid tilequery response: {}", e)))?;

    Ok(collection
        .features
        .into_iter()
        .filter_map(feature_to_facility)
        .collect())
}

fn feature_to_facility(feature: Feature) -> Option<Facility> {
    let kind = feature
        .property("type")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let name = feature
        .property("name")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let Some(distance) = feature
        .property("tilequery")
        .and_then(|t| t.get("distance"))
        .and_then(|d| d.as_f64())
    else {
        tracing::debug!(kind = %kind, "Skipping feature without tilequery distance");
        return None;
    };
    let id = feature.id.as_ref().map(|id| match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    });

    let geometry = feature.geometry?;
    let location: Point<f64> = match geometry.value.try_into() {
        Ok(point) => point,
        Err(_) => {
            tracing::debug!(kind = %kind, "Skipping non-point feature");
            return None;
        }
    };

    Some(Facility {
        id,
        name,
        kind,
        distance,
        location,
    })
}
