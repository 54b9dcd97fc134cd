//! apilevels - Android API availability lookup for static-analysis tools
//!
//! This library answers "at what API level did this class, method, or field
//! become available, get deprecated, or get removed" against the canonical
//! `api-versions.xml` platform description.
//!
//! # Architecture
//!
//! The lookup pipeline consists of:
//! 1. **Discovery** - Locate `api-versions.xml` through an [`ApiClient`]
//! 2. **Parsing** - Stream the XML description into the data model
//! 3. **Caching** - Compile the model into a checksummed binary cache file
//! 4. **Validation** - Classify the cache on load, regenerate on damage
//! 5. **Queries** - Point and bulk lookups with hierarchy resolution

pub mod binary;
pub mod cache;
pub mod client;
pub mod config;
pub mod database;
pub mod model;
pub mod names;
pub mod parser;
pub mod report;

pub use client::{ApiClient, LoggedMessage, RecordingClient, SdkClient, Severity};
pub use config::ApiConfig;
pub use database::ApiDatabase;
pub use model::{Api, ApiClass, ApiLevel, ApiMember, ApiRef, ApiVersions};
pub use parser::{parse_document, parse_file, ParseError};
