use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_directives(is_production: bool) -> &'static str {
    if is_production {
        "info"
    } else {
        "fetch_proxy_server=debug,fetch_proxy=debug,tower_http=debug"
    }
}

/// Installs the global tracing subscriber.
///
/// With `APP_ENV=production` events are written as JSON, otherwise in the
/// human-readable format. `RUST_LOG` takes precedence over the default filter.
pub fn setup_tracing() {
    let is_production = std::env::var("APP_ENV").as_deref() == Ok("production");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(is_production).into());

    let subscriber = tracing_subscriber::registry().with(filter);

    if is_production {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber.with(fmt::layer()).init();
    };
}
