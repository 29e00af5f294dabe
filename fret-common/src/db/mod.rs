//! Database schema and catalog seeding

pub mod catalog_seed;
pub mod init;

pub use init::*;
