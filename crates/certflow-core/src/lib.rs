pub mod config;
pub mod error;
pub mod state;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{CertflowError, Result};
pub use state::{MergePolicy, SharedState, StateField, StateUpdate};
pub use traits::Collaborators;
pub use types::*;
