//! Normalization of the raw command line
//!
//! The launcher accepts a loosely formatted argument vector: options may be
//! written as `--name value` or `--name=value`, and host-specific options are
//! mixed with options meant for the test framework. Normalization splits
//! `name=value` tokens, then pulls every option known to the
//! [`OptionRegistry`] out of the vector. What remains is forwarded to the
//! framework untouched.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Whether a registered option takes a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Boolean switch, consumes only itself
    Flag,
    /// Consumes itself and the following token
    Value,
}

/// A single option known to the launcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSpec {
    /// Name without the leading `--`
    pub name: String,
    /// Whether the option takes a value
    pub arity: Arity,
    /// One-line description shown in usage output
    pub help: String,
}

/// The set of options the launcher extracts instead of forwarding
#[derive(Debug, Clone, Default)]
pub struct OptionRegistry {
    specs: Vec<OptionSpec>,
}

impl OptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every option the launcher understands
    pub fn standard() -> Self {
        Self::new()
            .option(
                "regex",
                Arity::Value,
                "Only run parser tests that match the given regex.",
            )
            .option("file", Arity::Value, "File describing parser tests.")
            .option("use-filebackend", Arity::Value, "Use filebackend")
            .option("use-bagostuff", Arity::Value, "Use bagostuff")
            .option("use-jobqueue", Arity::Value, "Use jobqueue")
            .option(
                "keep-uploads",
                Arity::Flag,
                "Re-use the same upload directory for each test, don't delete it.",
            )
            .option("use-normal-tables", Arity::Flag, "Use normal DB tables.")
            .option(
                "reuse-db",
                Arity::Flag,
                "Init DB only if tables are missing and keep after finish.",
            )
            .option("wiki", Arity::Value, "Wiki ID to run the tests against.")
            .option(
                crate::WITH_PHPUNITDIR,
                Arity::Value,
                "Directory to include PHPUnit from, for example when using a git \
                 fetchout from upstream. Path will be prepended to the include path.",
            )
            .option(
                crate::DEBUG_TESTS,
                Arity::Flag,
                "Log testing activity to the PHPUnitCommand log channel.",
            )
    }

    /// Register an option, replacing any earlier entry with the same name
    pub fn option(mut self, name: &str, arity: Arity, help: &str) -> Self {
        self.specs.retain(|spec| spec.name != name);
        self.specs.push(OptionSpec {
            name: name.to_string(),
            arity,
            help: help.to_string(),
        });
        self
    }

    /// Find the entry a command-line token refers to
    ///
    /// Only exact `--name` tokens match.
    pub fn lookup(&self, token: &str) -> Option<&OptionSpec> {
        let name = token.strip_prefix("--")?;
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Iterate over registered options in registration order
    pub fn iter(&self) -> impl Iterator<Item = &OptionSpec> {
        self.specs.iter()
    }

    /// Render the registered options as usage text
    pub fn usage(&self) -> String {
        self.specs
            .iter()
            .map(|spec| {
                let flag = match spec.arity {
                    Arity::Flag => format!("--{}", spec.name),
                    Arity::Value => format!("--{} <value>", spec.name),
                };
                format!("  {:<28} {}", flag, spec.help)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Value recorded for an extracted option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// A switch was present
    Flag,
    /// The token that followed the option
    Value(String),
}

impl OptionValue {
    /// The option's value, if it takes one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Flag => None,
            OptionValue::Value(value) => Some(value),
        }
    }
}

/// Options pulled out of the command line, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedOptions {
    values: BTreeMap<String, OptionValue>,
}

impl ExtractedOptions {
    /// Record an option, overwriting an earlier occurrence
    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    /// Look up an option by name (without `--`)
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// The value of a value-taking option
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    /// Whether the option was present at all
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Result of normalizing a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Tokens to hand to the framework, program name first
    pub forwardable: Vec<String>,
    /// Options the launcher consumed
    pub options: ExtractedOptions,
}

/// Placeholder used in diagnostics about the missing program name
pub const PROGRAM_NAME: &str = "<program>";

/// Split every `name=value` token after the program name at its first `=`
///
/// The value keeps any further `=` characters.
pub fn split_assignments(argv: &[String]) -> Vec<String> {
    argv.iter()
        .enumerate()
        .flat_map(|(position, arg)| match arg.split_once('=') {
            Some((name, value)) if position > 0 => vec![name.to_string(), value.to_string()],
            _ => vec![arg.clone()],
        })
        .collect()
}

/// Normalize a raw command line against the registry
///
/// # Errors
/// Returns [`Error::Configuration`] when the vector has no program name or
/// when a value-taking option is the last token.
pub fn normalize(argv: &[String], registry: &OptionRegistry) -> Result<Normalized> {
    let mut tokens = split_assignments(argv).into_iter();
    let Some(program) = tokens.next() else {
        return Err(Error::configuration(
            PROGRAM_NAME,
            "command line has no program name",
        ));
    };
    let mut forwardable = Vec::with_capacity(argv.len());
    forwardable.push(program);
    let mut options = ExtractedOptions::default();

    while let Some(token) = tokens.next() {
        let Some(spec) = registry.lookup(&token) else {
            forwardable.push(token);
            continue;
        };

        let value = match spec.arity {
            Arity::Flag => OptionValue::Flag,
            Arity::Value => match tokens.next() {
                Some(value) => OptionValue::Value(value),
                None => return Err(Error::configuration(token, "option requires a value")),
            },
        };
        options.insert(spec.name.as_str(), value);
    }

    Ok(Normalized {
        forwardable,
        options,
    })
}
