//! Component-prefixed logging.
//!
//! Every record has the form `[time LEVEL component] message` and uses the component name as its target,
//! so `RUST_LOG=broker=debug` narrows the output down to a single component.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::Level;
use serde_json::{json, Value};
use serde_type_name::type_name;

use crate::event::Event;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
pub fn level_label(level: Level) -> ColoredString {
    let color = match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::BrightBlack,
    };
    get_colored(&format!("{:<5}", level), color)
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_record {
    ($level:expr, $ctx:expr, $msg:expr) => (
        log::log!(
            target: $ctx.name(),
            $level,
            "[{:.3} {} {}] {}",
            $ctx.time(), $crate::log::level_label($level), $ctx.name(), $msg
        )
    );
    ($level:expr, $ctx:expr, $format:expr, $($arg:tt)+) => (
        log::log!(
            target: $ctx.name(),
            $level,
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::level_label($level), $ctx.name(), $($arg)+
        )
    );
}

/// Logs a component message at the info level.
///
/// Takes the component context followed by a displayable message or `format!`-style arguments,
/// the record is prefixed with the context time and name.
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_record!(log::Level::Info, $ctx, $($arg)+));
}

/// Logs a component message at the debug level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_record!(log::Level::Debug, $ctx, $($arg)+));
}

/// Logs a component message at the warn level, see [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_record!(log::Level::Warn, $ctx, $($arg)+));
}

/// Describes event payload and endpoints as JSON.
pub(crate) fn event_summary(event: &Event) -> Value {
    json!({
        "type": type_name(&event.data).unwrap_or("unknown"),
        "data": event.data,
        "src": event.src,
        "dst": event.dst,
    })
}

/// Logs an event the simulation failed to process.
pub(crate) fn log_event_failure(problem: &str, event: &Event) {
    log::error!(
        target: "simulation",
        "[{:.3} {} simulation] {}: {}",
        event.time,
        level_label(Level::Error),
        problem,
        event_summary(event)
    );
}

#[doc(hidden)]
pub fn log_unhandled_event(event: Event) {
    log_event_failure("no handler arm matches event", &event);
}
