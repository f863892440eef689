pub mod archive;
pub mod config;
pub mod csv;
pub mod diff;
pub mod download;
pub mod error;
pub mod links;
pub mod notify;
pub mod server;
pub mod sheet;
pub mod status;
pub mod view;
pub mod worker;

pub use error::{Error, Result};

#[cfg(test)]
mod test_support;
