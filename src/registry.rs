//! Facility shortcut commands.
//!
//! Each configured command name maps to a facility and the operations it
//! supports. The table is built once at startup; invoking a shortcut
//! expands it into ordinary classifier tokens.

use std::collections::HashMap;

use crate::classifier::normalize_token;
use crate::config::FacilityConfig;
use crate::error::{DiningError, Result};

/// What a shortcut invocation asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Menu,
    Hours,
}

impl Operation {
    fn from_scope(token: &str) -> Option<Self> {
        match normalize_token(token).as_str() {
            "menu" | "menus" => Some(Self::Menu),
            "hours" => Some(Self::Hours),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct AliasTarget {
    facility: String,
    unit: String,
    operations: Vec<Operation>,
}

/// A shortcut invocation rewritten for the query layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub facility: String,
    pub operation: Operation,
    /// Facility id followed by the remaining arguments.
    pub tokens: Vec<String>,
}

/// Alias → (facility, operations) table.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    entries: HashMap<String, AliasTarget>,
}

impl AliasRegistry {
    /// Register every facility's `commands`.
    ///
    /// # Errors
    ///
    /// [`DiningError::Config`] when two facilities claim the same command.
    pub fn from_facilities(facilities: &[FacilityConfig]) -> Result<Self> {
        let mut registry = Self::default();
        for facility in facilities {
            let mut operations = vec![Operation::Hours];
            if facility.menu {
                operations.insert(0, Operation::Menu);
            }
            for command in &facility.commands {
                registry.register(command, facility, operations.clone())?;
            }
        }
        Ok(registry)
    }

    fn register(
        &mut self,
        command: &str,
        facility: &FacilityConfig,
        operations: Vec<Operation>,
    ) -> Result<()> {
        let key = normalize_token(command);
        if let Some(existing) = self.entries.get(&key) {
            if existing.facility != facility.id {
                return Err(DiningError::Config(format!(
                    "command {command} is registered for both {} and {}",
                    existing.facility, facility.id
                )));
            }
        }
        self.entries.insert(
            key,
            AliasTarget {
                facility: facility.id.clone(),
                unit: facility.unit.clone(),
                operations,
            },
        );
        Ok(())
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Expand `command args..`. The first argument must be `menu` or `hours`.
    ///
    /// Returns `Ok(None)` when `command` is not registered.
    ///
    /// # Errors
    ///
    /// [`DiningError::MissingScope`] without a scope keyword and
    /// [`DiningError::MenuNotAvailable`] when asking an hours-only
    /// facility for its menu.
    pub fn expand<S: AsRef<str>>(&self, command: &str, args: &[S]) -> Result<Option<Expansion>> {
        let Some(target) = self.entries.get(&normalize_token(command)) else {
            return Ok(None);
        };

        let operation = args
            .first()
            .and_then(|scope| Operation::from_scope(scope.as_ref()))
            .ok_or_else(|| DiningError::MissingScope {
                alias: command.to_owned(),
            })?;

        if !target.operations.contains(&operation) {
            return Err(DiningError::MenuNotAvailable {
                facility: target.unit.clone(),
            });
        }

        let tokens = std::iter::once(target.facility.clone())
            .chain(args[1..].iter().map(|a| a.as_ref().to_owned()))
            .collect();
        Ok(Some(Expansion {
            facility: target.facility.clone(),
            operation,
            tokens,
        }))
    }
}
