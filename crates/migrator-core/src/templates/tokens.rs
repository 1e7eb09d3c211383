//! Turning configured replacement expressions into concrete substitutions

use crate::project::Project;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Anything that can answer build-property lookups
pub trait PropertySource {
    fn property_value(&self, name: &str) -> Option<String>;
}

impl PropertySource for Project {
    fn property_value(&self, name: &str) -> Option<String> {
        Project::property_value(self, name)
    }
}

/// A replacement expression from a template configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement<'a> {
    /// Substituted as written
    Literal(&'a str),
    /// `$(Name)`: substituted with the project's value of property `Name`
    Property(&'a str),
}

impl<'a> Replacement<'a> {
    /// Classify an expression. Only an expression that is entirely
    /// `$(...)` is a property reference.
    pub fn parse(expression: &'a str) -> Self {
        match expression
            .strip_prefix("$(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(name) => Replacement::Property(name),
            None => Replacement::Literal(expression),
        }
    }
}

/// Memoized property lookups for a single resolution pass.
///
/// Misses are cached too. Create one per pass and drop it afterwards;
/// property values may differ between runs.
#[derive(Debug, Default)]
pub struct PropertyCache {
    values: HashMap<String, Option<String>>,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&mut self, name: &str, source: &impl PropertySource) -> Option<String> {
        if let Some(cached) = self.values.get(name) {
            return cached.clone();
        }

        let value = source.property_value(name);
        self.values.insert(name.to_string(), value.clone());
        value
    }
}

/// Resolve token replacements against a project's properties.
///
/// Literal expressions pass through. Property references whose value is
/// missing or blank are left out of the result, so their placeholder stays
/// in the output untouched.
pub fn resolve_replacements(
    replacements: &IndexMap<String, String>,
    source: &impl PropertySource,
) -> IndexMap<String, String> {
    let mut cache = PropertyCache::new();
    let mut resolved = IndexMap::with_capacity(replacements.len());

    for (token, expression) in replacements {
        match Replacement::parse(expression) {
            Replacement::Literal(value) => {
                resolved.insert(token.clone(), value.to_string());
            }
            Replacement::Property(name) => match cache.lookup(name, source) {
                Some(value) if !value.trim().is_empty() => {
                    tracing::debug!("Resolved project property {} to {}", name, value);
                    resolved.insert(token.clone(), value);
                }
                _ => {
                    tracing::warn!(
                        "Could not resolve project property {}; not replacing token {}",
                        name,
                        token
                    );
                }
            },
        }
    }

    resolved
}
