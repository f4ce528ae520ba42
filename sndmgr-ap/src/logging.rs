//! Tracing setup
//!
//! The subscriber is installed before the configuration is read so config
//! loading is logged. It starts with `RUST_LOG` or an `info` default; once the
//! configuration is known, [`Logging::apply_level`] swaps in the configured
//! level unless `RUST_LOG` was set.

use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Level used until the configuration has been loaded
pub const BOOTSTRAP_LEVEL: &str = "info";

/// Filter directives for this agent's crates at `level`
pub fn directives(level: &str) -> String {
    format!("sndmgr_ap={},sndmgr_common={}", level, level)
}

/// Version plus the build identification captured by `build.rs`
pub fn build_info() -> String {
    format!(
        "{} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    )
}

/// Handle to the installed filter
pub struct Logging {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl Logging {
    /// Reloadable filter layer plus its handle.
    ///
    /// `from_env` pins the filter: [`Logging::apply_level`] leaves it alone.
    pub fn layer(filter: EnvFilter, from_env: bool) -> (reload::Layer<EnvFilter, Registry>, Self) {
        let (layer, handle) = reload::Layer::new(filter);
        (layer, Self { handle, from_env })
    }

    /// Install the global subscriber (registry, reloadable filter, fmt layer)
    pub fn init() -> Self {
        let (filter, from_env) = match EnvFilter::try_from_default_env() {
            Ok(filter) => (filter, true),
            Err(_) => (EnvFilter::new(directives(BOOTSTRAP_LEVEL)), false),
        };
        let (layer, logging) = Self::layer(filter, from_env);

        tracing_subscriber::registry()
            .with(layer)
            .with(tracing_subscriber::fmt::layer())
            .init();
        logging
    }

    /// Switch to the configured level; `RUST_LOG` wins when it was set.
    ///
    /// Returns whether the filter changed.
    pub fn apply_level(&self, level: &str) -> Result<bool, reload::Error> {
        if self.from_env {
            return Ok(false);
        }
        self.handle.reload(EnvFilter::new(directives(level)))?;
        Ok(true)
    }
}
