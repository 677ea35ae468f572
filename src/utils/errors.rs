use crate::color::{MaybePaint, DEBUG_INDICATOR, ERROR_INDICATOR, MESSAGE_TEXT, WARNING_INDICATOR};
use nu_ansi_term::Style;
use std::error::Error as StdError;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_EXIT_CODE: i32 = 1;

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub(crate) fn configure_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub(crate) fn verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

fn emit(label: &str, style: Style, text: &str) {
    eprintln!(
        "{} {}",
        style.maybe_paint(format!("{}:", label)),
        MESSAGE_TEXT.maybe_paint(text)
    );
}

pub(crate) fn error_internal(text: &str) {
    emit("error", *ERROR_INDICATOR, text);
}

pub(crate) fn warn_internal(text: &str) {
    emit("warning", *WARNING_INDICATOR, text);
}

pub(crate) fn debug_internal(text: &str) {
    if verbose() {
        emit("debug", *DEBUG_INDICATOR, text);
    }
}

/// Renders an error followed by its chain of sources, one per line:
///
/// ```text
/// model compilation failed
/// Caused by: No such file or directory (os error 2)
/// ```
pub(crate) fn error_details(err: &(dyn StdError + 'static)) -> String {
    let mut details = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let _ = write!(details, "\nCaused by: {}", cause);
        source = cause.source();
    }

    details
}

/// The message for a fatal error: just the error unless `--verbose` is set, in
/// which case the full source chain is included.
pub(crate) fn report(err: &(dyn StdError + 'static)) -> String {
    if verbose() {
        error_details(err)
    } else {
        err.to_string()
    }
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::warn_internal(&formatted);
    })
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
    })
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => ({
        if $crate::utils::errors::verbose() {
            let formatted = format!($($arg)*);
            $crate::utils::errors::debug_internal(&formatted);
        }
    })
}

#[macro_export]
macro_rules! die {
    ($($arg:tt)*) => ({
        let formatted = format!($($arg)*);
        $crate::utils::errors::error_internal(&formatted);
        ::std::process::exit($crate::utils::errors::DEFAULT_EXIT_CODE);
    })
}
