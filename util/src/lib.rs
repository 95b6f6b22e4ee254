//! Utility library for Njord USV Software

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod host;
pub mod logger;
pub mod mission_log;
pub mod module;
pub mod params;
pub mod session;
pub mod time;
