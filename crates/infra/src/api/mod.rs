//! Authenticated HTTP boundary to the remote backend.

pub mod commands;
pub mod errors;
pub mod gateway;

pub use commands::ApiCommands;
pub use errors::ApiError;
pub use gateway::{ApiGateway, PublicOutcome};
