//! Error codes and exit status for kardexctl
//!
//! Values follow sysexits(3) where one fits.

use kardex_common::error::TaxonomyError;
use kardex_common::KardexError;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Exit code when a records file is missing, unreadable or malformed (EX_NOINPUT)
pub const EXIT_INPUT_ERROR: i32 = 66;

/// Exit code for taxonomy or config file problems (EX_CONFIG)
pub const EXIT_CONFIG_ERROR: i32 = 78;

/// Pick the exit code for an error by walking its cause chain
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.downcast_ref::<TaxonomyError>().is_some() {
            return EXIT_CONFIG_ERROR;
        }
        if let Some(kardex) = cause.downcast_ref::<KardexError>() {
            return if kardex.is_configuration() {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_INPUT_ERROR
            };
        }
    }
    EXIT_GENERAL_ERROR
}
