// Gestora - Core Library
// HR records and machinery inventory for a Chilean company.
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod forms;
pub mod lifecycle;
pub mod patente;
pub mod roles;
pub mod rut;
pub mod temporal;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{get_events_for_entity, insert_event, setup_database, Event, ImportSummary};
pub use error::DomainError;
pub use forms::{FieldError, FormValidator};
pub use lifecycle::{ActiveState, SoftDelete};
pub use patente::Patente;
pub use roles::{authorize, Action, Role};
pub use rut::Rut;
pub use temporal::{Diff, Timeline, Version};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
