use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{
    fmt::{self, format, time},
    prelude::*,
    EnvFilter,
};

struct Guard {}

impl Drop for Guard {
    fn drop(&mut self) {}
}

/// Install a tracing subscriber reading level filters from `RUST_LOG`.
///
/// Returns a guard which should be kept alive for the life of the process.
pub fn init() -> impl Drop {
    init_result()
        .map_err(|e| e.1)
        .expect("could not set global default tracing subscriber")
}

fn init_result() -> Result<impl Drop, (impl Drop, SetGlobalDefaultError)> {
    let evt_fmt = format().with_timer(time::Uptime::default()).compact();
    let fmt_layer = fmt::layer().event_format(evt_fmt);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::from_default_env())
        .init();

    let guard = Guard {};

    Ok::<_, (Guard, SetGlobalDefaultError)>(guard)
}
