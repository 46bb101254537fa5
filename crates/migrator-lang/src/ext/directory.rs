//! Account directory lookups: `directory.lookup(account) -> map(string, dyn)`.
//!
//! The library delegates to a [`DirectoryResolver`], so a real directory
//! service can be plugged in by the caller.

use crate::env::{ExpressionLibrary, FunctionDecl, Overload};
use crate::error::EvalError;
use crate::library::string_arg;
use crate::types::Type;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolves an account identifier into a set of attributes.
pub trait DirectoryResolver: Send + Sync {
    /// Look up `account`. `Ok(None)` means no such entry.
    fn lookup(&self, account: &str) -> Result<Option<BTreeMap<String, Value>>, String>;
}

/// In-memory resolver with optional fallback entry for unknown accounts.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: BTreeMap<String, BTreeMap<String, Value>>,
    fallback: Option<BTreeMap<String, Value>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for `account`.
    pub fn entry<I, K, V>(mut self, account: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.entries.insert(
            account.into(),
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Entry returned for any account without an explicit entry.
    pub fn fallback<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.fallback = Some(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }
}

impl DirectoryResolver for StaticDirectory {
    fn lookup(&self, account: &str) -> Result<Option<BTreeMap<String, Value>>, String> {
        Ok(self
            .entries
            .get(account)
            .or(self.fallback.as_ref())
            .cloned())
    }
}

/// Registers `directory.lookup` backed by a resolver.
#[derive(Clone)]
pub struct DirectoryLibrary {
    resolver: Arc<dyn DirectoryResolver>,
}

impl DirectoryLibrary {
    pub fn new(resolver: Arc<dyn DirectoryResolver>) -> Self {
        Self { resolver }
    }
}

impl std::fmt::Debug for DirectoryLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryLibrary").finish_non_exhaustive()
    }
}

impl ExpressionLibrary for DirectoryLibrary {
    fn name(&self) -> &str {
        "directory"
    }

    fn functions(&self) -> Vec<FunctionDecl> {
        let resolver = Arc::clone(&self.resolver);
        vec![FunctionDecl::new("directory.lookup").overload(Overload::global(
            "directory_lookup_string",
            vec![Type::String],
            Type::map(Type::String, Type::Dyn),
            move |args| {
                let account = string_arg("directory.lookup", args, 0)?;
                match resolver.lookup(account) {
                    Ok(Some(attributes)) => Ok(Value::Map(attributes)),
                    Ok(None) => Err(EvalError::function(
                        "directory.lookup",
                        format!("no directory entry for '{}'", account),
                    )),
                    Err(message) => Err(EvalError::function("directory.lookup", message)),
                }
            },
        ))]
    }
}
