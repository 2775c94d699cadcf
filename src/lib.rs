//! CylinderOps - operational backbone for bottled-gas delivery
//! Core library module

pub mod clustering;
pub mod common;
pub mod config;
pub mod dataplane;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod import;
pub mod oracle;
pub mod reliability;
pub mod sms;
pub mod sync;
pub mod vrp;

pub use config::AppConfig;
pub use error::{CoreError, Result};
