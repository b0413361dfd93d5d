//! Google Compute Engine provider for Sandboxflow
//!
//! Implements [`sandboxflow_cloud::ComputeApi`] over the Compute Engine v1
//! REST API, authenticated with a service account key file.
//!
//! # Example
//!
//! ```ignore
//! use sandboxflow_cloud::{CloudProviderService, ServiceOptions};
//! use sandboxflow_cloud_gcp::GceClient;
//! use std::sync::Arc;
//!
//! let client = GceClient::from_credentials_file("key.json".as_ref(), None).await?;
//! let service = CloudProviderService::new(Arc::new(client), ServiceOptions::default());
//!
//! let status = service.check_connection().await?;
//! ```

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{COMPUTE_SCOPE, ServiceAccountKey, TokenProvider};
pub use client::{COMPUTE_API_BASE, GceClient};
pub use error::{GcpError, Result};
