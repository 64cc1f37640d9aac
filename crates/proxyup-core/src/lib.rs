pub mod checkout;
pub mod config;
pub mod error;
pub mod generator;
pub mod git;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod process;
pub mod provision;
pub mod publish;
pub mod schedule;

pub use error::{Result, UpdaterError};
