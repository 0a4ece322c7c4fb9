//! Tracing setup for the binary

use tracing::Subscriber;
use tracing_subscriber::{filter::Directive, prelude::*, registry::LookupSpan, EnvFilter, Layer};

/// A boxed tracing Layer.
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Install a stderr subscriber. `level` is the default directive, e.g.
/// `info` or `poke_decode=debug`; `RUST_LOG` takes precedence. Repeated
/// calls are no-ops.
pub fn init(level: Option<&str>) {
    let directive = parse_directive(level.unwrap_or(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::registry().with(stderr(directive)).try_init();
}

/// Builds a new tracing layer that writes to stderr, keeping stdout for
/// decoded output.
pub fn stderr<S>(directive: impl Into<Directive>) -> BoxedLayer<S>
where
    S: Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    let filter = EnvFilter::builder()
        .with_default_directive(directive.into())
        .from_env_lossy();

    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_filter(filter)
        .boxed()
}

fn parse_directive(level: &str) -> Directive {
    level.parse().unwrap_or_else(|err| {
        eprintln!("invalid log level '{level}' ({err}), using '{DEFAULT_DIRECTIVE}'");
        tracing::Level::WARN.into()
    })
}
