// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - remote adapters and derived computations.

pub mod facility;
pub mod gotrue;
pub mod identity;
pub mod tilequery;

pub use facility::{
    FacilityResolver, FixedLocation, LocationProvider, PermissionStatus, Resolution, ResolveError,
};
pub use gotrue::{GoTrueClient, SharedSession};
pub use identity::IdentityProvider;
pub use tilequery::{MapboxTilequery, SpatialIndex, TileQuery};
