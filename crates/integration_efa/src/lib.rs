//! EFA transit backend integration
//!
//! Talks to an EFA (Elektronische Fahrplanauskunft) instance in rapidJSON
//! mode, by default the South Tyrol backend at `efa.sta.bz.it`.
//!
//! # Architecture
//!
//! [`EfaRequest`] renders the stop finder, departure monitor and trip
//! requests into normalized parameter maps with a stable fingerprint.
//! [`EfaClient`] executes them, implemented by [`HttpEfaClient`], and
//! returns an [`EfaPayload`] tagged by capability. [`ResponseNormalizer`]
//! turns payloads into the canonical domain records.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_efa::{EfaClient, EfaConfig, EfaPayload, EfaRequest, HttpEfaClient,
//!     ResponseNormalizer, StopFinderRequest};
//!
//! let client = HttpEfaClient::new(&EfaConfig::default())?;
//! let request = EfaRequest::StopFinder(StopFinderRequest {
//!     query: "Meran".to_string(),
//!     language: domain::Language::De,
//! });
//! if let EfaPayload::StopFinder(payload) = client.execute(&request).await? {
//!     let stops = ResponseNormalizer::default().stops(&payload)?;
//! }
//! ```

mod client;
mod config;
mod error;
mod normalize;
mod payload;
mod request;

pub use client::{EfaClient, HttpEfaClient};
pub use config::EfaConfig;
pub use error::EfaError;
pub use normalize::{ResponseNormalizer, mode_from_class, mode_from_name};
pub use payload::{
    DmPayload, EfaPayload, MessageCategory, StopFinderPayload, SystemMessage, TripPayload,
};
pub use request::{DepartureRequest, EfaRequest, RequestKind, StopFinderRequest, TripRequest};
