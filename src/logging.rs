//! Internal logging helpers for structured rowplan events.

/// Single logging target for rowplan.
pub(crate) const LOG_TARGET: &str = "rowplan";

macro_rules! rowplan_log {
    ($level:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!($level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} {}",
                $event,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use rowplan_log;
