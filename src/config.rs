//! Back-end configuration: which back end to target and
//! the bag of per-back-end flags that drives it.
//!
//! `TranslateOptions` is the typed shape; `OptionBag` is how the CLI's
//! repeated `--opt k=v` flags (and any other untyped caller) get there,
//! the same `serde`/`serde_json` pairing used elsewhere in this crate's
//! project manifest handling.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Native,
    Latex,
    Graph,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Backend::Native),
            "latex" => Ok(Backend::Latex),
            "graph" => Ok(Backend::Graph),
            other => Err(format!("unknown back end '{other}', expected native, latex or graph")),
        }
    }
}

/// The typed option set every back end receives. Back ends
/// that don't use a given flag simply ignore it — `format_code` only
/// matters to `native`, `bond_info`/`bond_distances` only to `native` and
/// `latex`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslateOptions {
    /// Whether the native back end should emit rustfmt-friendly whitespace
    /// (blank lines between items) rather than the tightest legal layout.
    pub format_code: bool,
    /// Emit `BOND_INFO`-gated code (per-bond metadata accessors).
    pub bond_info: bool,
    /// Emit `BOND_DISTANCES`-gated code (pairwise distance accessors).
    pub bond_distances: bool,
    /// Output directory for generated files; `None` means "caller decides".
    pub out_dir: Option<String>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self { format_code: true, bond_info: false, bond_distances: false, out_dir: None }
    }
}

/// An untyped `k=v` bag (the CLI's `--opt k=v ... `) coerced into a
/// `TranslateOptions` by `serde_json`, so the Rust API can also build one up
/// programmatically without a CLI in the loop.
#[derive(Debug, Clone, Default)]
pub struct OptionBag(Map<String, Value>);

impl OptionBag {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Inserts `key=value`, coercing `value` to a bool or number when it
    /// parses as one and falling back to a string otherwise.
    pub fn set(&mut self, key: &str, value: &str) {
        let coerced = if let Ok(b) = value.parse::<bool>() {
            Value::Bool(b)
        } else if let Ok(n) = value.parse::<i64>() {
            Value::Number(n.into())
        } else {
            Value::String(value.to_string())
        };
        self.0.insert(key.to_string(), coerced);
    }

    /// Parses a single `key=value` CLI flag, rejecting anything without an
    /// `=`.
    pub fn from_pair(pair: &str) -> Result<(String, String), String> {
        let (k, v) = pair.split_once('=').ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
        Ok((k.to_string(), v.to_string()))
    }

    pub fn into_translate_options(self) -> Result<TranslateOptions, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0))
    }
}
