//! Generates client SDKs from the API contract files of a Go web service.
//!
//! A project declares its request, response and value types in
//! `api/typespec/<name>type/<name>.go` and binds them to HTTP routes in
//! `api/rest/<name>/<name>.go`. [`SdkGenerator`] parses both with
//! tree-sitter into a [`ResourceModel`], then renders a Go SDK and,
//! optionally, a PHP SDK from it.

pub mod cache;
pub mod config;
pub mod emit;
pub mod error;
pub mod extract;
pub mod file;
pub mod model;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod walker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::GeneratorConfig;
pub use emit::{Dialect, GeneratedFile};
pub use error::SdkGenError;
pub use file::go_file::GoFile;
pub use model::{ResourceModel, SharedModel};
pub use pipeline::{GenerateRequest, GenerateSummary, SdkGenerator};
pub use resolve::DistributionMode;
