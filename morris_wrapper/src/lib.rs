mod client;
mod config;
mod delay;
mod error;
mod oracle;
mod runner;
pub use client::*;
pub use config::*;
pub use delay::*;
pub use error::*;
pub use oracle::*;
pub use runner::*;
