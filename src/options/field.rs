//! Option field names and validation failures.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

// == Option Field ==
/// One of the five configuration fields, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionField {
    Validity,
    Evict,
    RefreshCallback,
    WaitForRefresh,
    WaitUntilDone,
}

impl OptionField {
    /// Fixed validation order. The first failing field in this order is the
    /// one reported.
    pub const ORDER: [OptionField; 5] = [
        OptionField::Validity,
        OptionField::Evict,
        OptionField::RefreshCallback,
        OptionField::WaitForRefresh,
        OptionField::WaitUntilDone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionField::Validity => "validity",
            OptionField::Evict => "evict",
            OptionField::RefreshCallback => "refresh_callback",
            OptionField::WaitForRefresh => "wait_for_refresh",
            OptionField::WaitUntilDone => "wait_until_done",
        }
    }
}

impl fmt::Display for OptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Option Error ==
/// Why validation rejected an option set.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionError {
    /// No fallback set exists, i.e. the addressed instance is not registered
    #[error("unknown cache instance")]
    UnknownCache,

    /// A field failed its predicate
    #[error("invalid option: {0}")]
    InvalidField(OptionField),
}
