// [libs/shared/tracing-init/src/lib.rs]
/*!
 * =================================================================
 * APARATO: OBSERVABILITY BOOTSTRAP (ESTRATO L4)
 * RESPONSABILIDAD: TRAZADO ESTRUCTURADO Y CAPTURA DE PANICOS
 *
 * One entry point shared by every Frostwatch binary (`gateway`,
 * `migrator`): a dev-mode compact subscriber, a release-mode JSON
 * subscriber, and a panic hook that logs through the same subscriber
 * before the process unwinds, so a panic in a spawned task (the stream
 * ticker, the escalation scheduler) never vanishes silently.
 * =================================================================
 */

use std::panic;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber for `service_name` and
/// installs the panic hook. Idempotent only in the sense that `tracing`
/// itself is: calling this twice in one process panics, matching
/// `tracing_subscriber`'s own "already initialized" behavior.
///
/// Env filter defaults to `{service_name}=debug` in debug builds and
/// `{service_name}=info` in release, with `tower_http`/`hyper`/`libsql`
/// pinned to `warn`/`error` to keep framework chatter out of the default
/// view; set `RUST_LOG` to override.
pub fn init_tracing(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };
        format!("{service_name}={default_level},tower_http=warn,hyper=warn,libsql=error").into()
    });

    if cfg!(debug_assertions) {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true))
            .init();
    }

    install_panic_hook(service_name);

    tracing::info!(service = service_name, "tracing initialized");
}

fn install_panic_hook(service_name: &str) {
    let service_name = service_name.to_string();

    panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown".to_string());

        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("<non-string panic payload>");

        tracing::error!(
            target: "panic",
            service = %service_name,
            location = %location,
            "thread panicked: {payload}"
        );
    }));
}
