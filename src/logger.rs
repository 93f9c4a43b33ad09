//! Tracing subscriber setup for binaries and benches.
//!
//! The library only emits events through `tracing` macros; it never installs a
//! subscriber on its own. Call [`init`] once, early, from the binary.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt::time, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};


/// Installs a formatted, uptime-stamped subscriber.
///
/// `level` sets the default for this crate. `RUST_LOG` can add or override
/// directives. Fails if a global subscriber is already installed.
pub fn init(level: LevelFilter) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?
        .add_directive(format!("decs_sim={level}").parse()?);

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_timer(time::uptime()),
        )
        .with(filter)
        .try_init()?;
    Ok(())
}

/// Default level: verbose in debug builds, terse in release.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}
