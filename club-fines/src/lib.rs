//! Remote state of the club fines app: the club's records, typed reads and live lists on top of `treesync`,
//! the backend procedures, and the resumable sign up.

use std::sync::LazyLock;

pub mod callables;
pub mod client;
pub mod config;
pub mod gateway;
pub mod paths;
pub mod records;
pub mod registration;

pub use client::ClubClient;
pub use config::{ClientConfig, ConfigError};
pub use gateway::{CallError, CallGateway, Callable, FunctionCaller, HttpCallGateway};
pub use paths::{ClubPaths, DatabaseLevel};
pub use registration::{RegistrationStatus, SignInCache};

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
static LOGGER: LazyLock<()> = LazyLock::new(|| {
    if let Err(e) = env_logger::Builder::from_default_env().try_init() {
        eprintln!("Logger was already set: {e}");
        return;
    }
    log::info!("Logging initialized");
});

/// Installs the `RUST_LOG` controlled logger. Calling it again does nothing.
pub fn init_logging() {
    LazyLock::force(&LOGGER);
}
