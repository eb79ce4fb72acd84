// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging setup for C hosts.
//!
//! All pinbuf log records use targets under `pinbuf` (`pinbuf::registry`,
//! `pinbuf::export::host`, ...). The level-based entry points apply the
//! requested level to those targets and keep every other target at `warn`
//! or quieter, so a host that embeds other Rust libraries is not flooded.
//!
//! Exactly one logger is installed per process. The first successful call
//! wins; later calls return `PINBUF_OPERATION_FAILED` and
//! [`pinbuf_logging_source`] reports which entry point installed it.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::OnceLock;

use log::LevelFilter;

use super::PinbufError;

/// Environment variable read by `pinbuf_logging_init_env`.
const PINBUF_LOG_ENV: &str = "PINBUF_LOG";

/// Log target prefix shared by every pinbuf crate.
const LOG_TARGET: &str = "pinbuf";

/// Log level for pinbuf targets
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinbufLogLevel {
    PinbufLogOff = 0,
    PinbufLogError = 1,
    PinbufLogWarn = 2,
    PinbufLogInfo = 3,
    PinbufLogDebug = 4,
    PinbufLogTrace = 5,
}

impl From<PinbufLogLevel> for LevelFilter {
    fn from(level: PinbufLogLevel) -> Self {
        match level {
            PinbufLogLevel::PinbufLogOff => LevelFilter::Off,
            PinbufLogLevel::PinbufLogError => LevelFilter::Error,
            PinbufLogLevel::PinbufLogWarn => LevelFilter::Warn,
            PinbufLogLevel::PinbufLogInfo => LevelFilter::Info,
            PinbufLogLevel::PinbufLogDebug => LevelFilter::Debug,
            PinbufLogLevel::PinbufLogTrace => LevelFilter::Trace,
        }
    }
}

/// Which entry point installed the process logger
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinbufLogSource {
    /// No pinbuf entry point has run successfully yet
    PinbufLogSourceNone = 0,
    /// `pinbuf_logging_init`
    PinbufLogSourceLevel = 1,
    /// `pinbuf_logging_init_env`
    PinbufLogSourceEnv = 2,
    /// `pinbuf_logging_init_with_filter`
    PinbufLogSourceFilter = 3,
    /// A logger from outside pinbuf was already installed
    PinbufLogSourceForeign = 4,
}

static SOURCE: OnceLock<PinbufLogSource> = OnceLock::new();

/// Directive string applying `level` to pinbuf and `warn` (at most) elsewhere.
fn scoped_directives(level: LevelFilter) -> String {
    format!("{},{}={}", level.min(LevelFilter::Warn), LOG_TARGET, level)
}

/// Syntax check of an `env_logger` directive list.
///
/// `env_logger` drops malformed directives with a note on stderr, so a C
/// host would otherwise never learn that its filter was ignored.
fn check_filter(filter: &str) -> Result<(), String> {
    let directives = filter.split('/').next().unwrap_or_default();
    for directive in directives.split(',').map(str::trim) {
        if directive.is_empty() {
            continue;
        }
        let mut parts = directive.splitn(2, '=');
        let name = parts.next().unwrap_or_default().trim();
        match parts.next() {
            Some(level) => {
                if name.is_empty() || !is_target(name) {
                    return Err(format!("bad target in {:?}", directive));
                }
                if level.trim().parse::<LevelFilter>().is_err() {
                    return Err(format!("bad level in {:?}", directive));
                }
            }
            None => {
                if name.parse::<LevelFilter>().is_err() && !is_target(name) {
                    return Err(format!("bad directive {:?}", directive));
                }
            }
        }
    }
    Ok(())
}

fn is_target(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '-')
}

fn install(source: PinbufLogSource, mut builder: env_logger::Builder) -> PinbufError {
    let mut won = false;
    SOURCE.get_or_init(|| {
        if builder.format_timestamp_millis().try_init().is_ok() {
            won = true;
            source
        } else {
            PinbufLogSource::PinbufLogSourceForeign
        }
    });
    if won {
        log::debug!("[logging] logger installed ({:?})", source);
        PinbufError::PinbufOk
    } else {
        PinbufError::PinbufOperationFailed
    }
}

/// Initialize logging to stderr, `level` for pinbuf targets
///
/// # Safety
/// Callable from any thread; only the first successful init takes effect.
///
/// # Returns
/// `PINBUF_OK` on success, `PINBUF_OPERATION_FAILED` if a logger is already installed
///
/// # Example (C)
/// ```c
/// pinbuf_logging_init(PINBUF_LOG_DEBUG);
/// ```
#[no_mangle]
pub unsafe extern "C" fn pinbuf_logging_init(level: PinbufLogLevel) -> PinbufError {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&scoped_directives(level.into()));
    install(PinbufLogSource::PinbufLogSourceLevel, builder)
}

/// Initialize logging from `PINBUF_LOG`, falling back to `default_level`
/// for pinbuf targets when the variable is unset
///
/// # Safety
/// Callable from any thread; only the first successful init takes effect.
#[no_mangle]
pub unsafe extern "C" fn pinbuf_logging_init_env(default_level: PinbufLogLevel) -> PinbufError {
    let env = env_logger::Env::new()
        .filter_or(PINBUF_LOG_ENV, scoped_directives(default_level.into()));
    install(
        PinbufLogSource::PinbufLogSourceEnv,
        env_logger::Builder::from_env(env),
    )
}

/// Initialize logging with an explicit `env_logger` filter string
///
/// # Safety
/// - `filter` must be a valid null-terminated C string or NULL.
///
/// # Returns
/// `PINBUF_INVALID_ARGUMENT` for NULL, `PINBUF_INVALID_FILTER` for a
/// malformed directive list (nothing is installed in either case)
///
/// # Example (C)
/// ```c
/// pinbuf_logging_init_with_filter("pinbuf::registry=trace,warn");
/// ```
#[no_mangle]
pub unsafe extern "C" fn pinbuf_logging_init_with_filter(filter: *const c_char) -> PinbufError {
    if filter.is_null() {
        return PinbufError::PinbufInvalidArgument;
    }
    let Ok(filter_str) = CStr::from_ptr(filter).to_str() else {
        return PinbufError::PinbufInvalidFilter;
    };
    if check_filter(filter_str).is_err() {
        return PinbufError::PinbufInvalidFilter;
    }

    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filter_str);
    install(PinbufLogSource::PinbufLogSourceFilter, builder)
}

/// Entry point that installed the process logger.
#[no_mangle]
pub extern "C" fn pinbuf_logging_source() -> PinbufLogSource {
    SOURCE
        .get()
        .copied()
        .unwrap_or(PinbufLogSource::PinbufLogSourceNone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::ptr;

    #[test]
    fn test_level_mapping() {
        assert_eq!(
            LevelFilter::from(PinbufLogLevel::PinbufLogOff),
            LevelFilter::Off
        );
        assert_eq!(
            LevelFilter::from(PinbufLogLevel::PinbufLogTrace),
            LevelFilter::Trace
        );
    }

    #[test]
    fn test_scoped_directives() {
        assert_eq!(scoped_directives(LevelFilter::Trace), "WARN,pinbuf=TRACE");
        assert_eq!(scoped_directives(LevelFilter::Error), "ERROR,pinbuf=ERROR");
        assert_eq!(scoped_directives(LevelFilter::Off), "OFF,pinbuf=OFF");
    }

    #[test]
    fn test_check_filter() {
        for good in [
            "",
            "warn",
            "pinbuf",
            "pinbuf=trace",
            "pinbuf::registry=debug, warn",
            "info,pinbuf_c=off/handle",
        ] {
            assert!(check_filter(good).is_ok(), "rejected {:?}", good);
        }
        for bad in ["pinbuf=loud", "=debug", "pin buf=info", "warn,a=b=c"] {
            assert!(check_filter(bad).is_err(), "accepted {:?}", bad);
        }
    }

    // The only test in this binary that installs a logger.
    #[test]
    fn test_first_install_wins() {
        let bad = CString::new("pinbuf=loud").unwrap();
        let good = CString::new("pinbuf=debug,warn").unwrap();
        unsafe {
            assert_eq!(
                pinbuf_logging_init_with_filter(ptr::null()),
                PinbufError::PinbufInvalidArgument
            );
            assert_eq!(
                pinbuf_logging_init_with_filter(bad.as_ptr()),
                PinbufError::PinbufInvalidFilter
            );
            assert_eq!(pinbuf_logging_source(), PinbufLogSource::PinbufLogSourceNone);

            assert_eq!(
                pinbuf_logging_init_with_filter(good.as_ptr()),
                PinbufError::PinbufOk
            );
            assert_eq!(
                pinbuf_logging_init(PinbufLogLevel::PinbufLogTrace),
                PinbufError::PinbufOperationFailed
            );
            assert_eq!(
                pinbuf_logging_init_env(PinbufLogLevel::PinbufLogInfo),
                PinbufError::PinbufOperationFailed
            );
        }
        assert_eq!(pinbuf_logging_source(), PinbufLogSource::PinbufLogSourceFilter);
    }
}
