use crate::domain::{E2mc2Error, E2mc2Result};
use crate::serialization::write_json_artifact;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use tracing::debug;

/// How an option is rendered on the solver command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Presence-only flag, emitted when true.
    Flag,
    /// Flag followed by the value truncated to an integer.
    Integer,
    /// Flag followed by the value's literal text.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Interprets command-line text: `true`/`false`, `null`/`none`, integers, floats,
    /// anything else as a string.
    pub fn parse_literal(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            "null" | "none" | "" => return Self::Null,
            _ => {}
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Self::Float(value);
        }
        Self::Text(trimmed.to_string())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Null | Self::Bool(false))
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            Self::Text(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|value| value.trunc() as i64),
            Self::Bool(true) => Some(1),
            _ => None,
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SolverOption {
    pub name: &'static str,
    pub kind: OptionKind,
    pub help: &'static str,
}

const fn option(name: &'static str, kind: OptionKind, help: &'static str) -> SolverOption {
    SolverOption { name, kind, help }
}

pub const TABLE_OPTION: &str = "o";
pub const SNAPSHOT_OPTION: &str = "opss";
pub const DEFAULT_TABLE_FILE: &str = "mc.out";

/// Options understood by the Monte Carlo solver.
pub const SOLVER_OPTIONS: [SolverOption; 27] = [
    option("T0", OptionKind::Literal, "initial temperature"),
    option("T1", OptionKind::Literal, "final temperature"),
    option("dT", OptionKind::Literal, "temperature step"),
    option("mu0", OptionKind::Literal, "initial chemical potential"),
    option("mu1", OptionKind::Literal, "final chemical potential"),
    option("dmu", OptionKind::Literal, "chemical potential step"),
    option("x", OptionKind::Literal, "target concentration in canonical mode"),
    option("cm", OptionKind::Flag, "canonical mode"),
    option("gs", OptionKind::Integer, "ground state used as the initial configuration"),
    option("phi0", OptionKind::Literal, "free energy at the initial point"),
    option("er", OptionKind::Literal, "enclosed radius of the simulation cell"),
    option("eq", OptionKind::Integer, "equilibration passes"),
    option("n", OptionKind::Integer, "averaging passes"),
    option("dx", OptionKind::Literal, "target precision of the concentration"),
    option("aq", OptionKind::Flag, "alternate quench"),
    option("tstat", OptionKind::Literal, "phase transition detection threshold"),
    option("abs", OptionKind::Flag, "absolute energies"),
    option("sigdig", OptionKind::Integer, "significant digits in the output table"),
    option("o", OptionKind::Literal, "output table file"),
    option("oss", OptionKind::Literal, "final snapshot file"),
    option("opss", OptionKind::Literal, "periodic snapshot base name"),
    option("is", OptionKind::Literal, "initial structure file"),
    option("k", OptionKind::Literal, "Boltzmann constant"),
    option("keV", OptionKind::Flag, "energies in keV"),
    option("innerT", OptionKind::Integer, "inner temperature loop"),
    option("innermu", OptionKind::Integer, "inner chemical potential loop"),
    option("sd", OptionKind::Integer, "random seed"),
];

pub fn solver_option(name: &str) -> Option<&'static SolverOption> {
    SOLVER_OPTIONS.iter().find(|option| option.name == name)
}

/// Parameter record for one solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunParameters {
    values: BTreeMap<String, ParamValue>,
}

impl Default for RunParameters {
    fn default() -> Self {
        let defaults: [(&str, ParamValue); 27] = [
            ("T0", ParamValue::Float(300.0)),
            ("T1", ParamValue::Float(3000.0)),
            ("dT", ParamValue::Float(100.0)),
            ("mu0", ParamValue::Float(0.0)),
            ("mu1", ParamValue::Null),
            ("dmu", ParamValue::Null),
            ("x", ParamValue::Null),
            ("cm", false.into()),
            ("gs", 0_i64.into()),
            ("phi0", ParamValue::Null),
            ("er", ParamValue::Float(30.0)),
            ("eq", ParamValue::Null),
            ("n", ParamValue::Null),
            ("dx", ParamValue::Float(1.0e-3)),
            ("aq", false.into()),
            ("tstat", ParamValue::Float(3.0)),
            ("abs", false.into()),
            ("sigdig", 6_i64.into()),
            ("o", DEFAULT_TABLE_FILE.into()),
            ("oss", ParamValue::Null),
            ("opss", ParamValue::Null),
            ("is", ParamValue::Null),
            ("k", ParamValue::Null),
            ("keV", false.into()),
            ("innerT", ParamValue::Null),
            ("innermu", ParamValue::Null),
            ("sd", ParamValue::Null),
        ];

        Self {
            values: defaults
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl RunParameters {
    /// Defaults overridden by `overrides`.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let mut parameters = Self::default();
        parameters.update(overrides);
        parameters
    }

    /// A record holding only `values`, without the defaults.
    pub fn from_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    pub fn update<I, K, V>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        for (name, value) in overrides {
            self.set(name, value);
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Table file name written by the solver.
    pub fn table_file(&self) -> String {
        self.get(TABLE_OPTION)
            .filter(|value| !value.is_unset())
            .map(ParamValue::to_string)
            .unwrap_or_else(|| DEFAULT_TABLE_FILE.to_string())
    }

    /// Periodic snapshot base name, when configured.
    pub fn snapshot_base(&self) -> Option<String> {
        self.get(SNAPSHOT_OPTION)
            .filter(|value| !value.is_unset())
            .map(ParamValue::to_string)
            .filter(|base| !base.is_empty())
    }

    /// Builds the solver flag sequence in option-name order.
    pub fn command_args(&self) -> E2mc2Result<Vec<String>> {
        let mut args = Vec::new();
        for (name, value) in &self.values {
            if value.is_unset() {
                continue;
            }
            let flag = format!("-{}", name);
            match option_kind(name, value) {
                OptionKind::Flag => args.push(flag),
                OptionKind::Integer => {
                    let integer = value.as_integer().ok_or_else(|| {
                        E2mc2Error::input_validation(
                            "INPUT.PARAM_INTEGER",
                            format!("option '{}' expects an integer, got '{}'", name, value),
                        )
                    })?;
                    args.push(flag);
                    args.push(integer.to_string());
                }
                OptionKind::Literal => {
                    args.push(flag);
                    args.push(value.to_string());
                }
            }
        }
        Ok(args)
    }

    pub fn load(path: &Path) -> E2mc2Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| {
            E2mc2Error::io_system(
                "IO.PARAMS_READ",
                format!("failed to read parameter record '{}': {}", path.display(), source),
            )
        })?;
        let parameters = serde_json::from_str::<Self>(&content).map_err(|source| {
            E2mc2Error::parse(
                "PARSE.PARAMS_JSON",
                format!("failed to parse parameter record '{}': {}", path.display(), source),
            )
        })?;
        debug!(
            "loaded {} parameters from '{}'",
            parameters.values.len(),
            path.display()
        );
        Ok(parameters)
    }

    pub fn save(&self, path: &Path) -> E2mc2Result<()> {
        write_json_artifact(path, self)
    }
}

/// Kind from the option table; unknown options are flags when boolean, literals otherwise.
fn option_kind(name: &str, value: &ParamValue) -> OptionKind {
    match solver_option(name) {
        Some(option) => option.kind,
        None if matches!(value, ParamValue::Bool(_)) => OptionKind::Flag,
        None => OptionKind::Literal,
    }
}
