//! Command implementations

pub mod revision;
pub mod warden;
