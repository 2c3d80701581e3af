// File: kotori-core/src/lib.rs

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod intervention;
pub mod services;
pub mod tasks;

pub use clock::{Clock, SystemClock};
pub use config::CoreConfig;
pub use error::Error;
