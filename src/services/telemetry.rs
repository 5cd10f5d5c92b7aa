//! Error telemetry via Sentry.

use tracing::{info, warn};

use crate::config::SentryConfig;

/// Returns a guard that must be held for the process lifetime, or `None`
/// when no DSN is configured.
pub fn init_sentry(config: &SentryConfig) -> Option<sentry::ClientInitGuard> {
    let Some(dsn) = config.dsn.as_ref() else {
        warn!("sentry DSN not configured; error reporting disabled");
        return None;
    };

    let dsn = match dsn.expose().parse::<sentry::types::Dsn>() {
        Ok(dsn) => dsn,
        Err(err) => {
            warn!(error = %err, "invalid sentry DSN; error reporting disabled");
            return None;
        }
    };

    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        environment: config.environment.clone().map(Into::into),
        ..Default::default()
    });
    info!(environment = ?config.environment, "sentry enabled");
    Some(guard)
}

/// Forward an error to Sentry. A no-op (nil id) when Sentry is not initialised.
pub fn report<E>(err: &E) -> sentry::types::Uuid
where
    E: std::error::Error + ?Sized,
{
    sentry::capture_error(err)
}
