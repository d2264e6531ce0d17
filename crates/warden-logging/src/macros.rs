//! ---
//! warden_section: "03-persistence-logging"
//! warden_subsection: "module"
//! warden_type: "source"
//! warden_scope: "code"
//! warden_description: "Structured access and system event logging."
//! warden_version: "v0.0.0-prealpha"
//! warden_owner: "tbd"
//! ---
//! Context-enriched logging macros.

#[doc(hidden)]
#[macro_export]
macro_rules! __warden_event {
    ($lvl:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $lvl,
            role = ctx.role.unwrap_or(""),
            category = ctx.category.unwrap_or(""),
            key = ctx.key.unwrap_or(""),
            path = ctx.path.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with Warden context.
#[macro_export]
macro_rules! warden_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__warden_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__warden_event!(
            $crate::tracing::Level::INFO,
            $crate::LogContext::default(),
            $($arg)+
        )
    };
}

/// Emit a debug log enriched with Warden context.
#[macro_export]
macro_rules! warden_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__warden_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__warden_event!(
            $crate::tracing::Level::DEBUG,
            $crate::LogContext::default(),
            $($arg)+
        )
    };
}

/// Emit an error log enriched with Warden context.
#[macro_export]
macro_rules! warden_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__warden_event!($crate::tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__warden_event!(
            $crate::tracing::Level::ERROR,
            $crate::LogContext::default(),
            $($arg)+
        )
    };
}
