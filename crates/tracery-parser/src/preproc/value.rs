use std::{cmp::Ordering, fmt};

/// A preprocessor value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TValue {
    Int(i64),
    Str(String),
}

impl TValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub fn from_bool(value: bool) -> Self {
        Self::Int(i64::from(value))
    }

    /// Non-zero integers and non-empty strings are true.
    pub fn is_true(&self) -> bool {
        match self {
            Self::Int(value) => *value != 0,
            Self::Str(value) => !value.is_empty(),
        }
    }

    /// Integer view of the value: integers as-is, strings when they hold a
    /// decimal number.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Str(value) => value.trim().parse().ok(),
        }
    }

    fn int_operands(&self, other: &Self, op: &str) -> Result<(i64, i64), String> {
        match (self.as_int(), other.as_int()) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(format!(
                "Operator `{op}` needs integers, got \"{self}\" and \"{other}\""
            )),
        }
    }

    /// `+` adds integers and concatenates as soon as one side is a string.
    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => Self::Int(left.wrapping_add(*right)),
            _ => Self::Str(format!("{self}{other}")),
        }
    }

    pub fn sub(&self, other: &Self) -> Result<Self, String> {
        let (left, right) = self.int_operands(other, "-")?;
        Ok(Self::Int(left.wrapping_sub(right)))
    }

    pub fn mul(&self, other: &Self) -> Result<Self, String> {
        let (left, right) = self.int_operands(other, "*")?;
        Ok(Self::Int(left.wrapping_mul(right)))
    }

    pub fn div(&self, other: &Self) -> Result<Self, String> {
        let (left, right) = self.int_operands(other, "/")?;
        if right == 0 {
            return Err("Division by zero".to_string());
        }
        Ok(Self::Int(left.wrapping_div(right)))
    }

    /// Integers compare numerically, everything else as strings.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(left), Self::Int(right)) => left.cmp(right),
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for TValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

impl From<i64> for TValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for TValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}
