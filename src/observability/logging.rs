//! # Structured Logging
//!
//! Span macros and startup logging for the issuer. Spans carry a random
//! operation id so every event of one signing or session attempt can be
//! correlated in JSON output.

/// Create a tracing span around one signing attempt.
///
/// ```rust,ignore
/// let span = sign_span!(identity);
/// let span = sign_span!(identity, csr = %path.display());
/// ```
#[macro_export]
macro_rules! sign_span {
    ($issuer:expr) => {
        tracing::info_span!(
            "sign_request",
            issuer = %$issuer,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($issuer:expr, $($field:tt)*) => {
        tracing::info_span!(
            "sign_request",
            issuer = %$issuer,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span around opening a CA session.
#[macro_export]
macro_rules! session_span {
    ($issuer:expr, $host:expr) => {
        tracing::info_span!(
            "ca_session",
            issuer = %$issuer,
            host = %$host,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
}

/// Log issuer settings at startup. Credentials are not part of the
/// settings and never reach this event.
pub fn log_settings_info(settings: &crate::config::IssuerSettings) {
    tracing::info!(
        host = %settings.host,
        service_name = %settings.service_name,
        ca = %settings.ca,
        add_host = settings.add_host,
        add_service = settings.add_service,
        add_principal = settings.add_principal,
        ignore_error = settings.ignore_error,
        insecure = settings.insecure,
        "FreeIPA issuer configuration"
    );
}
