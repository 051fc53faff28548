//! Configuration management for portsweep.
//!
//! Provides XDG-compliant settings that supply per-user defaults for
//! scan options.

mod settings;

pub use settings::{AppSettings, Paths};
