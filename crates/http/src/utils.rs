//! Helper macros used across the codecs.

/// Returns early with `$error` unless `$predicate` holds.
///
/// Like `assert!`, but for validation that should surface as an `Err`.
///
/// ```ignore
/// ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
