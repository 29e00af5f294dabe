//! # Fretwork Common Library
//!
//! Shared code for the Fretwork services:
//! - Error type
//! - Bootstrap and progression configuration
//! - Database initialization and catalog seeding
//! - Event types (TrackerEvent) and the EventBus

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
