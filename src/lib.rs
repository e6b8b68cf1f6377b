//! A pixel local storage vector path renderer.
//!
//! The renderer core ([`RenderContext`]) turns path, image and clip draws into logical flushes of GPU
//! records. A [`Backend`] executes them; the `software` feature provides one that runs on the cpu.

pub use plsdraw_core::*;

#[cfg(feature = "software")]
pub use plsdraw_software as software;

use std::sync::Once;

/// How [`init_logging`] sets up `env_logger`.
#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is unset.
    pub default_filter: String,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn".into(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }
}

/// Install `env_logger` as the global logger. Calls after the first are ignored.
pub fn init_logging(config: LogConfig) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.default_filter));
        if !config.timestamps {
            builder.format_timestamp(None);
        }

        if let Err(err) = builder.try_init() {
            eprintln!("plsdraw: logger already installed: {err}");
        }
    });
}
