//! Golden output for the arithmetic exercise
//!
//! Thirteen lines derived from the declared values `a`, `b` (integers) and
//! `c`, `d` (doubles):
//!
//! ```text
//!  0  a = <a>             7  c = <c:.8>
//!  1  b = <b>             8  d = <d:.8>
//!  2  a + b = <int>       9  c + d = <.8>
//!  3  a - b = <int>      10  c - d = <.8>
//!  4  a * b = <int>      11  c * d = <.8>
//!  5  a / b = <int>      12  c / d = <.8>
//!  6  ==========
//! ```

use crate::variables::VariableMap;
use cgrade_core::VariableKind;

/// Number of lines the model defines
pub const LINE_COUNT: usize = cgrade_core::config::OUTPUT_LINE_COUNT;

/// Separator between the integer and the float block
pub const SEPARATOR: &str = "==========";

/// Index of the separator line
pub const SEPARATOR_INDEX: usize = 6;

/// Variables the model divides by, with the literal grammar they are read with
pub const DIVISORS: [(&str, VariableKind); 2] = [("b", VariableKind::Integer), ("d", VariableKind::Float)];

const LABELS: [&str; LINE_COUNT] = [
    "a", "b", "a + b", "a - b", "a * b", "a / b", SEPARATOR, "c", "d", "c + d", "c - d", "c * d", "c / d",
];

/// What a line holds, which decides how it is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Integer result, compared byte for byte
    Integer,

    /// The separator line
    Separator,

    /// Floating point result, compared by value and by format
    Float,
}

/// Model failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("output line {0} is not part of the expected output (valid lines: 0-12)")]
    IndexOutOfRange(usize),

    #[error("variable '{0}' is required to compute the expected output")]
    MissingVariable(&'static str),

    #[error("division by zero: {0} is 0")]
    DivisionByZero(&'static str),
}

/// Expected output computed from the four declared values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedOutputModel {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

impl ExpectedOutputModel {
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    /// Pick `a`, `b`, `c`, `d` out of an extracted variable map
    pub fn from_variables(vars: &VariableMap) -> Result<Self, ModelError> {
        let get = |name: &'static str| vars.value(name).ok_or(ModelError::MissingVariable(name));
        Ok(Self::new(get("a")?, get("b")?, get("c")?, get("d")?))
    }

    /// Kind of line at `index`
    pub fn line_kind(index: usize) -> Result<LineKind, ModelError> {
        match index {
            0..=5 => Ok(LineKind::Integer),
            SEPARATOR_INDEX => Ok(LineKind::Separator),
            7..=12 => Ok(LineKind::Float),
            _ => Err(ModelError::IndexOutOfRange(index)),
        }
    }

    /// Text left of ` = ` on line `index` (the whole line for the separator)
    pub fn label(index: usize) -> Result<&'static str, ModelError> {
        LABELS.get(index).copied().ok_or(ModelError::IndexOutOfRange(index))
    }

    /// Exact expected text of line `index`, newline included
    pub fn line(&self, index: usize) -> Result<String, ModelError> {
        let label = Self::label(index)?;

        let rendered = match index {
            0..=5 => {
                // C integer semantics: truncate the literal, division rounds toward zero.
                let a = self.a as i64;
                let b = self.b as i64;
                let value = match index {
                    0 => a,
                    1 => b,
                    2 => a.wrapping_add(b),
                    3 => a.wrapping_sub(b),
                    4 => a.wrapping_mul(b),
                    _ => {
                        if b == 0 {
                            return Err(ModelError::DivisionByZero("b"));
                        }
                        a.wrapping_div(b)
                    }
                };
                format!("{} = {}\n", label, value)
            }
            SEPARATOR_INDEX => format!("{}\n", SEPARATOR),
            _ => {
                let value = match index {
                    7 => self.c,
                    8 => self.d,
                    9 => self.c + self.d,
                    10 => self.c - self.d,
                    11 => self.c * self.d,
                    _ => {
                        if self.d == 0.0 {
                            return Err(ModelError::DivisionByZero("d"));
                        }
                        self.c / self.d
                    }
                };
                format!("{} = {:.8}\n", label, value)
            }
        };

        Ok(rendered)
    }

    /// Expected lines for a range of indices
    pub fn lines(&self, indices: impl IntoIterator<Item = usize>) -> Result<Vec<String>, ModelError> {
        indices.into_iter().map(|index| self.line(index)).collect()
    }
}

/// Expected text of one output line for the given variables
pub fn compute_expected_line(vars: &VariableMap, index: usize) -> Result<String, ModelError> {
    ExpectedOutputModel::from_variables(vars)?.line(index)
}
