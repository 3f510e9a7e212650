//! Macros for error handling.
//!
//! Provides convenience macros for creating and returning [`crate::error::DbaError`] instances with
//! reduced boilerplate.

/// Creates a [`crate::error::DbaError`] from error kind and description, with optional detail.
#[macro_export]
macro_rules! dba_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::DbaError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::DbaError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates and returns a [`crate::error::DbaError`] from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::dba_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::dba_error!($kind, $desc, $detail))
    };
}
