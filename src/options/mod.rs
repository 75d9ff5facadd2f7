//! Options Module
//!
//! Per-instance and per-call configuration: the five option fields, the
//! caller-supplied option set, its resolved form, and the validator that
//! merges the two.

mod field;
mod validate;


pub use field::{OptionError, OptionField};
pub use validate::validate;

use std::time::Duration;

use crate::refresh::RefreshProvider;

// == Global Fallbacks ==
/// Values used when a field is absent from both the caller options and
/// the instance defaults.
pub mod defaults {
    /// Validity window in milliseconds
    pub const VALIDITY_MS: i64 = 300_000;
    /// Evict window in milliseconds
    pub const EVICT_MS: i64 = 60_000;
    /// Whether a get on a stale entry waits for its refresh
    pub const WAIT_FOR_REFRESH: bool = false;
    /// Whether set and evict wait until the change is applied
    pub const WAIT_UNTIL_DONE: bool = false;
}

// == Proposed Values ==
/// A caller-supplied field as it arrived.
///
/// `Malformed` marks a value of the wrong type, such as a string where a
/// number belongs. It is carried through to the validator so that type
/// errors are reported in field order like any other failed predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proposed<T> {
    Value(T),
    Malformed,
}

// == Refresh Setting ==
/// Caller-side value of the `refresh_callback` field.
///
/// `Disabled` is an explicit "no callback", which differs from leaving the
/// field out: an absent field inherits the instance default, `Disabled`
/// overrides it.
#[derive(Debug, Clone)]
pub enum RefreshSetting {
    Provider(RefreshProvider),
    Disabled,
    Malformed,
}

// == Cache Options ==
/// A proposed option set. Every field is optional; absent fields fall back
/// to the instance defaults during validation.
///
/// Durations are signed milliseconds so that out-of-range values reach the
/// validator instead of being rejected by the type system at the edges.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    pub validity: Option<Proposed<i64>>,
    pub evict: Option<Proposed<i64>>,
    pub refresh_callback: Option<RefreshSetting>,
    pub wait_for_refresh: Option<Proposed<bool>>,
    pub wait_until_done: Option<Proposed<bool>>,
}

impl CacheOptions {
    /// Creates an empty option set (every field inherits).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validity(mut self, ms: i64) -> Self {
        self.validity = Some(Proposed::Value(ms));
        self
    }

    pub fn evict(mut self, ms: i64) -> Self {
        self.evict = Some(Proposed::Value(ms));
        self
    }

    pub fn refresh(mut self, provider: RefreshProvider) -> Self {
        self.refresh_callback = Some(RefreshSetting::Provider(provider));
        self
    }

    /// Explicitly clears the refresh callback for this option set.
    pub fn no_refresh(mut self) -> Self {
        self.refresh_callback = Some(RefreshSetting::Disabled);
        self
    }

    pub fn wait_for_refresh(mut self, wait: bool) -> Self {
        self.wait_for_refresh = Some(Proposed::Value(wait));
        self
    }

    pub fn wait_until_done(mut self, wait: bool) -> Self {
        self.wait_until_done = Some(Proposed::Value(wait));
        self
    }

    /// Marks `field` as present but of the wrong type.
    pub fn malformed(mut self, field: OptionField) -> Self {
        match field {
            OptionField::Validity => self.validity = Some(Proposed::Malformed),
            OptionField::Evict => self.evict = Some(Proposed::Malformed),
            OptionField::RefreshCallback => {
                self.refresh_callback = Some(RefreshSetting::Malformed)
            }
            OptionField::WaitForRefresh => self.wait_for_refresh = Some(Proposed::Malformed),
            OptionField::WaitUntilDone => self.wait_until_done = Some(Proposed::Malformed),
        }
        self
    }
}

// == Resolved Options ==
/// A fully validated option set with every field populated.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub validity: Duration,
    pub evict: Duration,
    pub refresh_callback: Option<RefreshProvider>,
    pub wait_for_refresh: bool,
    pub wait_until_done: bool,
}

impl Default for ResolvedOptions {
    /// The global hard-coded fallbacks.
    fn default() -> Self {
        Self {
            validity: Duration::from_millis(defaults::VALIDITY_MS as u64),
            evict: Duration::from_millis(defaults::EVICT_MS as u64),
            refresh_callback: None,
            wait_for_refresh: defaults::WAIT_FOR_REFRESH,
            wait_until_done: defaults::WAIT_UNTIL_DONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let opts = CacheOptions::new()
            .validity(50)
            .evict(10)
            .wait_for_refresh(true)
            .wait_until_done(false)
            .no_refresh();

        assert_eq!(opts.validity, Some(Proposed::Value(50)));
        assert_eq!(opts.evict, Some(Proposed::Value(10)));
        assert_eq!(opts.wait_for_refresh, Some(Proposed::Value(true)));
        assert_eq!(opts.wait_until_done, Some(Proposed::Value(false)));
        assert!(matches!(opts.refresh_callback, Some(RefreshSetting::Disabled)));
    }

    #[test]
    fn test_malformed_marks_each_field() {
        let opts = OptionField::ORDER
            .iter()
            .fold(CacheOptions::new(), |opts, field| opts.malformed(*field));

        assert_eq!(opts.validity, Some(Proposed::Malformed));
        assert_eq!(opts.evict, Some(Proposed::Malformed));
        assert!(matches!(opts.refresh_callback, Some(RefreshSetting::Malformed)));
        assert_eq!(opts.wait_for_refresh, Some(Proposed::Malformed));
        assert_eq!(opts.wait_until_done, Some(Proposed::Malformed));
    }

    #[test]
    fn test_resolved_default_matches_constants() {
        let resolved = ResolvedOptions::default();
        assert_eq!(resolved.validity, Duration::from_millis(300_000));
        assert_eq!(resolved.evict, Duration::from_millis(60_000));
        assert!(resolved.refresh_callback.is_none());
        assert!(!resolved.wait_for_refresh);
        assert!(!resolved.wait_until_done);
    }
}
