//! Front ends other than the HTTP server.

pub mod cli;

pub use cli::{CliChannel, CliCommand};
