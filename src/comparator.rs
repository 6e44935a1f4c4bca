use std::fmt;
use std::str::FromStr;

use crate::error::CheckError;

/// The relation used wherever a value is tested against a threshold.
///
/// The same relation decides threshold hits, bucket changes, which of two bad samples is
/// the worse one, and whether a warning/critical pair is inverted.
///
/// ```rust
/// # use tsdcheck::Comparator;
/// let cmp: Comparator = "ge".parse().unwrap();
/// assert!(cmp.apply(10.0, 10.0));
/// assert!(!cmp.apply(9.5, 10.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Comparator {
    #[default]
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Comparator {
    pub const NAMES: [&'static str; 6] = ["gt", "ge", "lt", "le", "eq", "ne"];

    /// Returns whether `a <relation> b` holds.
    pub fn apply(self, a: f64, b: f64) -> bool {
        match self {
            Comparator::Gt => a > b,
            Comparator::Ge => a >= b,
            Comparator::Lt => a < b,
            Comparator::Le => a <= b,
            Comparator::Eq => a == b,
            Comparator::Ne => a != b,
        }
    }

    /// Looks the relation up by name and applies it in one go.
    pub fn apply_named(name: &str, a: f64, b: f64) -> Result<bool, CheckError> {
        Ok(name.parse::<Comparator>()?.apply(a, b))
    }

    pub fn name(self) -> &'static str {
        match self {
            Comparator::Gt => "gt",
            Comparator::Ge => "ge",
            Comparator::Lt => "lt",
            Comparator::Le => "le",
            Comparator::Eq => "eq",
            Comparator::Ne => "ne",
        }
    }
}

impl FromStr for Comparator {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Comparator::Gt),
            "ge" => Ok(Comparator::Ge),
            "lt" => Ok(Comparator::Lt),
            "le" => Ok(Comparator::Le),
            "eq" => Ok(Comparator::Eq),
            "ne" => Ok(Comparator::Ne),
            other => Err(CheckError::InvalidConfiguration(format!(
                "Comparator \"{other}\" not valid."
            ))),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
