//! Refresh Providers
//!
//! A refresh provider re-computes the value of a stale entry. It is either
//! an inline closure or a deferred call naming a target registered in a
//! [`RefreshTargets`] table together with fixed arguments.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::anyhow;

/// Future produced by a refresh invocation.
pub type RefreshFuture = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send>>;

type InlineFn = dyn Fn(String) -> RefreshFuture + Send + Sync;

/// A named refresh target: receives the key and the descriptor's fixed arguments.
pub type TargetFn = dyn Fn(String, Vec<String>) -> RefreshFuture + Send + Sync;

// == Refresh Provider ==
#[derive(Clone)]
pub enum RefreshProvider {
    /// A closure with captured context
    Inline(Arc<InlineFn>),
    /// A target name resolved at invocation time, plus fixed arguments
    Deferred { target: String, args: Vec<String> },
}

impl RefreshProvider {
    /// Wraps an async closure as an inline provider.
    pub fn inline<F, Fut>(produce: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        RefreshProvider::Inline(Arc::new(move |key: String| -> RefreshFuture {
            Box::pin(produce(key))
        }))
    }

    pub fn deferred(target: impl Into<String>, args: Vec<String>) -> Self {
        RefreshProvider::Deferred {
            target: target.into(),
            args,
        }
    }

    /// Whether this provider names something that can be invoked.
    ///
    /// Inline closures always can. A deferred descriptor needs a non-blank
    /// target without whitespace; whether the target is actually registered
    /// is only known when it runs.
    pub fn is_invocable(&self) -> bool {
        match self {
            RefreshProvider::Inline(_) => true,
            RefreshProvider::Deferred { target, .. } => {
                !target.is_empty() && !target.chars().any(char::is_whitespace)
            }
        }
    }

    /// Produces a fresh value for `key`.
    pub fn produce(&self, key: &str, targets: &RefreshTargets) -> RefreshFuture {
        match self {
            RefreshProvider::Inline(produce) => produce(key.to_string()),
            RefreshProvider::Deferred { target, args } => match targets.resolve(target) {
                Some(produce) => produce(key.to_string(), args.clone()),
                None => {
                    let target = target.clone();
                    Box::pin(async move {
                        Err::<String, _>(anyhow!("unknown refresh target '{}'", target))
                    })
                }
            },
        }
    }
}

impl fmt::Debug for RefreshProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshProvider::Inline(_) => f.write_str("Inline(..)"),
            RefreshProvider::Deferred { target, args } => f
                .debug_struct("Deferred")
                .field("target", target)
                .field("args", args)
                .finish(),
        }
    }
}

// == Refresh Targets ==
/// Table of named refresh targets available to deferred providers.
#[derive(Default)]
pub struct RefreshTargets {
    targets: RwLock<HashMap<String, Arc<TargetFn>>>,
}

impl RefreshTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets the service binary ships with: `constant` yields its first
    /// argument and `timestamp` yields the current UTC time as RFC 3339.
    pub fn with_builtins() -> Self {
        let targets = Self::new();
        targets.register("constant", |key: String, args: Vec<String>| async move {
            args.into_iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("constant target has no value for {key}"))
        });
        targets.register("timestamp", |_key: String, _args: Vec<String>| async move {
            Ok::<_, anyhow::Error>(chrono::Utc::now().to_rfc3339())
        });
        targets
    }

    /// Registers (or replaces) the target `name`.
    pub fn register<F, Fut>(&self, name: impl Into<String>, produce: F)
    where
        F: Fn(String, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        let target: Arc<TargetFn> =
            Arc::new(move |key: String, args: Vec<String>| -> RefreshFuture {
                Box::pin(produce(key, args))
            });
        self.targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), target);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<TargetFn>> {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Registered target names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl fmt::Debug for RefreshTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTargets")
            .field("targets", &self.names())
            .finish()
    }
}
