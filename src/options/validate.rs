//! Option Validator
//!
//! Merges a caller option set over a fallback set, checking each field in
//! the fixed order of [`OptionField::ORDER`] and stopping at the first
//! failure.

use std::time::Duration;

use super::{CacheOptions, OptionError, OptionField, Proposed, RefreshSetting, ResolvedOptions};
use crate::refresh::RefreshProvider;

type FieldResult<T> = std::result::Result<T, OptionError>;

// == Validate ==
/// Validates `caller` against `fallback` and returns the merged set.
///
/// A `None` fallback means the addressed instance is not registered; the
/// caller options are not inspected at all in that case.
pub fn validate(
    caller: &CacheOptions,
    fallback: Option<&ResolvedOptions>,
) -> Result<ResolvedOptions, OptionError> {
    let Some(fallback) = fallback else {
        return Err(OptionError::UnknownCache);
    };

    let validity = validity(caller.validity, fallback.validity)?;
    let evict = evict(caller.evict, fallback.evict)?;
    let refresh_callback = refresh_callback(&caller.refresh_callback, &fallback.refresh_callback)?;
    let wait_for_refresh = flag(
        caller.wait_for_refresh,
        fallback.wait_for_refresh,
        OptionField::WaitForRefresh,
    )?;
    let wait_until_done = flag(
        caller.wait_until_done,
        fallback.wait_until_done,
        OptionField::WaitUntilDone,
    )?;

    Ok(ResolvedOptions {
        validity,
        evict,
        refresh_callback,
        wait_for_refresh,
        wait_until_done,
    })
}

// == Field Predicates ==

/// Validity must be a strictly positive integer.
fn validity(proposed: Option<Proposed<i64>>, fallback: Duration) -> FieldResult<Duration> {
    match proposed {
        Some(Proposed::Value(ms)) if ms > 0 => Ok(Duration::from_millis(ms as u64)),
        Some(_) => Err(OptionError::InvalidField(OptionField::Validity)),
        None => Ok(fallback),
    }
}

/// Evict may be zero (hard removal right at validity expiry).
fn evict(proposed: Option<Proposed<i64>>, fallback: Duration) -> FieldResult<Duration> {
    match proposed {
        Some(Proposed::Value(ms)) if ms >= 0 => Ok(Duration::from_millis(ms as u64)),
        Some(_) => Err(OptionError::InvalidField(OptionField::Evict)),
        None => Ok(fallback),
    }
}

fn refresh_callback(
    proposed: &Option<RefreshSetting>,
    fallback: &Option<RefreshProvider>,
) -> FieldResult<Option<RefreshProvider>> {
    match proposed {
        Some(RefreshSetting::Provider(provider)) if provider.is_invocable() => {
            Ok(Some(provider.clone()))
        }
        Some(RefreshSetting::Provider(_)) | Some(RefreshSetting::Malformed) => {
            Err(OptionError::InvalidField(OptionField::RefreshCallback))
        }
        Some(RefreshSetting::Disabled) => Ok(None),
        None => Ok(fallback.clone()),
    }
}

fn flag(proposed: Option<Proposed<bool>>, fallback: bool, field: OptionField) -> FieldResult<bool> {
    match proposed {
        Some(Proposed::Value(flag)) => Ok(flag),
        Some(Proposed::Malformed) => Err(OptionError::InvalidField(field)),
        None => Ok(fallback),
    }
}
