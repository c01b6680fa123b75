//! Logging helpers with consistent component fields.

/// Log an event tagged with the emitting component.
///
/// ```rust,ignore
/// use client_telemetry::log_component;
///
/// log_component!(info, "coordinator", "Stage advanced", stage = 2);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}
