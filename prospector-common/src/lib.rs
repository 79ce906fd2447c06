//! Common types and utilities shared across Prospector crates.
//!
//! This crate defines the domain values that flow between the search core,
//! the result fetcher, and the presentation layer, together with the shared
//! error type and observability helpers. It stays dependency-light so every
//! crate in the workspace can depend on it.
//!
//! # Overview
//!
//! - [`Coordinates`]: a latitude/longitude pair in degrees
//! - [`GroundingLink`] and [`BusinessResult`]: the payload returned by a search
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`ProspectorError`] and [`Result`]: shared error handling
//! - [`OutputFormat`]: how one-shot results are printed
//!
//! # Examples
//!
//! ```rust
//! use prospector_common::{BusinessResult, Coordinates, GroundingLink};
//!
//! let here = Coordinates::new(30.2672, -97.7431);
//! assert!(here.is_valid());
//!
//! let result = BusinessResult {
//!     text: "Acme Corp, 555-1234".into(),
//!     links: vec![GroundingLink::new("Acme", "http://acme.example")],
//! };
//! assert_eq!(result.links[0].title, "Acme");
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod observability;

/// A point on the globe in IEEE-754 double precision degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and within [-90, 90] / [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A citation accompanying generated text, pointing at a source the model used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

impl GroundingLink {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

/// Successful search payload: narrative text plus ordered citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessResult {
    pub text: String,
    pub links: Vec<GroundingLink>,
}

/// Preferred output format for one-shot results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Error types used across the Prospector workspace.
#[derive(thiserror::Error, Debug)]
pub enum ProspectorError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A collaborator (HTTP client, terminal, location source) could not be built.
    #[error("Setup error: {0}")]
    Setup(String),

    /// Wrapped lower-level failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`ProspectorError`].
pub type Result<T> = std::result::Result<T, ProspectorError>;
