//! # stax-core
//!
//! Engine of the STAX multi-database shell.
//!
//! This crate holds everything the shell does apart from terminal and
//! network I/O:
//!
//! - **Backends**: SQLite and PostgreSQL behind one async [`Backend`] trait
//! - **Connection Registry**: named connections, aliases, liveness probes
//! - **Script Execution**: comment stripping, statement splitting, and
//!   per-statement error isolation
//! - **Variables and Joins**: named result sets and an equality join over them
//! - **Rendering**: flat, JSON, CSV and table output
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//! use stax_core::{DatabaseSpec, DisplayMode, Session, SharedState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut databases = BTreeMap::new();
//!     databases.insert("local".to_string(), DatabaseSpec::new("sqlite", ":memory:"));
//!
//!     let shared = Arc::new(SharedState::new(databases, None));
//!     shared.connect_all().await;
//!
//!     let session = Session::new(shared, "local", DisplayMode::Default);
//!     let outcome = session.execute("select 1; select 2").await?;
//!     print!("{}", session.render(&outcome.tables));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Database drivers.
pub mod backend;

/// Database entries and connection-string templating.
pub mod config;

/// Error types.
pub mod error;

/// Script execution.
pub mod executor;

/// Equality join.
pub mod join;

/// Driver value normalization.
pub mod normalize;

/// Result records.
pub mod record;

/// Named connections.
pub mod registry;

/// Output rendering.
pub mod render;

/// Shared and per-session shell state.
pub mod session;

/// Script cleaning and splitting.
pub mod sql;

/// Scalar values.
pub mod value;

/// Named result sets.
pub mod variables;

// Re-exports
pub use backend::{Backend, Driver};
pub use config::{interpolate, DatabaseSpec};
pub use error::{BackendError, BackendResult, CoreError, CoreResult};
pub use executor::{QueryExecutor, ScriptOutcome, StatementFailure};
pub use record::{Record, ResultSet, ResultTable};
pub use registry::{ConnectionInfo, ConnectionRegistry, ConnectionStatus};
pub use render::{render, DisplayMode};
pub use session::{Session, SharedState, MAIN_DATABASE};
pub use value::Value;
pub use variables::VariableStore;
