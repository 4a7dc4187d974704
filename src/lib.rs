//! Snappy - screen recording for the browser, without the browser.
//!
//! Core of a screen-recorder extension: stream acquisition, the recorder with
//! container duration repair, and the message relay between the background
//! service and the page. Browser capabilities sit behind traits
//! ([`capture::MediaDevices`], [`recorder::EncoderFactory`],
//! [`messaging::BrowserHost`]) so hosts plug in their own.

pub mod capture;
pub mod config;
pub mod container;
pub mod messaging;
pub mod packaging;
pub mod recorder;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use utils::{AppError, AppResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Calling this twice is harmless.
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
