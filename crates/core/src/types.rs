//! Slot types and type unification.
//!
//! Every slot declares a [`Type`]; every supplied or answered value infers
//! one. [`unify`] decides whether the two are compatible. It is a pure
//! function: callers branch on the `Result`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The declared type of a slot, or the inferred type of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Type {
    /// Unifies with everything (the type of a placeholder).
    Any,
    Boolean,
    String,
    Number,
    /// A physical quantity, keyed by its base unit (`ms`, `m`, `kg`, `C`, `byte`).
    Measure(String),
    /// An enumeration. `None` means "some enum, entries unknown".
    Enum(Option<Vec<String>>),
    Date,
    Location,
    PhoneNumber,
    EmailAddress,
    Picture,
    Feed,
    Array(Box<Type>),
}

/// Why two types failed to unify.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("cannot unify {expected} with {found}")]
    Incompatible { expected: Type, found: Type },

    #[error("{entry} is not one of {entries:?}")]
    NotAnEntry { entry: String, entries: Vec<String> },

    #[error("invalid type '{0}'")]
    Invalid(String),
}

/// Unify two types, returning the more specific one.
pub fn unify(t1: &Type, t2: &Type) -> Result<Type, TypeError> {
    match (t1, t2) {
        (Type::Any, other) | (other, Type::Any) => Ok(other.clone()),
        (Type::Measure(a), Type::Measure(b)) => {
            if base_unit(a) == base_unit(b) {
                Ok(t1.clone())
            } else {
                Err(incompatible(t1, t2))
            }
        }
        (Type::Enum(a), Type::Enum(b)) => match (a, b) {
            (None, _) => Ok(t2.clone()),
            (_, None) => Ok(t1.clone()),
            (Some(x), Some(y)) if x == y => Ok(t1.clone()),
            _ => Err(incompatible(t1, t2)),
        },
        (Type::Array(a), Type::Array(b)) => unify(a, b)
            .map(|inner| Type::Array(Box::new(inner)))
            .map_err(|_| incompatible(t1, t2)),
        (a, b) if a == b => Ok(a.clone()),
        _ => Err(incompatible(t1, t2)),
    }
}

fn incompatible(expected: &Type, found: &Type) -> TypeError {
    TypeError::Incompatible {
        expected: expected.clone(),
        found: found.clone(),
    }
}

/// Map a unit to the base unit of its dimension.
///
/// Unknown units are their own base unit, so two unknown units only unify
/// when they are spelled the same.
pub fn base_unit(unit: &str) -> &str {
    match unit {
        "ms" | "s" | "min" | "h" | "day" | "week" | "mon" | "year" => "ms",
        "m" | "km" | "mm" | "cm" | "mi" | "in" | "ft" => "m",
        "mps" | "kmph" | "mph" => "mps",
        "kg" | "g" | "lb" | "oz" => "kg",
        "C" | "F" | "K" => "C",
        "byte" | "KB" | "MB" | "GB" | "TB" => "byte",
        "kcal" | "kJ" => "kcal",
        other => other,
    }
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Number | Type::Measure(_) | Type::Date)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::Boolean => write!(f, "Boolean"),
            Type::String => write!(f, "String"),
            Type::Number => write!(f, "Number"),
            Type::Measure(unit) => write!(f, "Measure({unit})"),
            Type::Enum(None) => write!(f, "Enum"),
            Type::Enum(Some(entries)) => write!(f, "Enum({})", entries.join(",")),
            Type::Date => write!(f, "Date"),
            Type::Location => write!(f, "Location"),
            Type::PhoneNumber => write!(f, "PhoneNumber"),
            Type::EmailAddress => write!(f, "EmailAddress"),
            Type::Picture => write!(f, "Picture"),
            Type::Feed => write!(f, "Feed"),
            Type::Array(inner) => write!(f, "Array({inner})"),
        }
    }
}

impl FromStr for Type {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, arg) = match s.find('(') {
            Some(open) => {
                let inner = s[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| TypeError::Invalid(s.to_string()))?;
                (&s[..open], Some(inner.trim()))
            }
            None => (s, None),
        };

        let ty = match (head, arg) {
            ("Any", None) => Type::Any,
            ("Boolean", None) => Type::Boolean,
            ("String", None) => Type::String,
            ("Number", None) => Type::Number,
            ("Measure", Some(unit)) if !unit.is_empty() => Type::Measure(base_unit(unit).to_string()),
            ("Enum", None) => Type::Enum(None),
            ("Enum", Some(entries)) => Type::Enum(Some(
                entries
                    .split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect(),
            )),
            ("Date", None) => Type::Date,
            ("Location", None) => Type::Location,
            ("PhoneNumber", None) => Type::PhoneNumber,
            ("EmailAddress", None) => Type::EmailAddress,
            ("Picture", None) => Type::Picture,
            ("Feed", None) => Type::Feed,
            ("Array", Some(inner)) => Type::Array(Box::new(inner.parse()?)),
            _ => return Err(TypeError::Invalid(s.to_string())),
        };
        Ok(ty)
    }
}

impl TryFrom<String> for Type {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Type> for String {
    fn from(t: Type) -> Self {
        t.to_string()
    }
}
