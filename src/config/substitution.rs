//! Placeholder substitution applied to configuration values at load time

use crate::core::{LoggerError, Result};

/// Token → value bindings.
///
/// A bound value may not contain any registered token (its own included),
/// so applying the table twice gives the same result as applying it once.
///
/// ```
/// use structured_log_facade::config::SubstitutionTable;
///
/// let mut table = SubstitutionTable::new();
/// table.bind("{LogName}", "orders").unwrap();
/// assert_eq!(table.apply("logs/{LogName}.log"), "logs/orders.log");
/// assert!(table.bind("{Other}", "{LogName}-x").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionTable {
    bindings: Vec<(String, String)>,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `token` to `value`; rebinding a token replaces its value
    pub fn bind(&mut self, token: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let token = token.into();
        let value = value.into();

        if token.is_empty() {
            return Err(LoggerError::config("substitution", "empty token"));
        }
        if value.contains(&token) {
            return Err(LoggerError::config(
                token.clone(),
                format!("value '{}' refers to its own token", value),
            ));
        }
        if let Some((other, _)) = self
            .bindings
            .iter()
            .find(|(t, _)| t != &token && value.contains(t.as_str()))
        {
            return Err(LoggerError::config(
                token.clone(),
                format!("value '{}' contains registered token '{}'", value, other),
            ));
        }
        if let Some((other, _)) = self
            .bindings
            .iter()
            .find(|(t, v)| t != &token && v.contains(token.as_str()))
        {
            return Err(LoggerError::config(
                token.clone(),
                format!("token already appears in the value bound to '{}'", other),
            ));
        }

        match self.bindings.iter_mut().find(|(t, _)| *t == token) {
            Some(binding) => binding.1 = value,
            None => self.bindings.push((token, value)),
        }
        Ok(())
    }

    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.bind(token, value)?;
        Ok(self)
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Replace every occurrence of every token in `input`
    pub fn apply(&self, input: &str) -> String {
        self.bindings
            .iter()
            .fold(input.to_string(), |acc, (token, value)| {
                if acc.contains(token.as_str()) {
                    acc.replace(token.as_str(), value)
                } else {
                    acc
                }
            })
    }
}
