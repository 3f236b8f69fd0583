//! Rowvault Common Library
//!
//! Shared ambient concerns for the Rowvault workspace:
//!
//! - **Logging**: tracing subscriber setup (console/file, text/JSON)
//! - **Identifiers**: deterministic upload ids derived from file metadata

pub mod ident;
pub mod logging;

pub use ident::upload_id;
