//! Literal-valued declarations in the student's source
//!
//! Only the first matching declaration of each name counts; later
//! re-declarations are ignored.

use cgrade_core::{Diagnostic, DiagnosticCode, VariableKind, VariableSpec};
use regex::Regex;
use std::collections::BTreeMap;

const INTEGER_LITERAL: &str = r"[+-]?\d+";
const FLOAT_LITERAL: &str = r"[+-]?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][+-]?\d+)?";

/// A declared value read from the source
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedVariable {
    pub name: String,
    pub kind: VariableKind,

    /// Stored as a double regardless of kind; integer truncation happens when formatting
    pub value: f64,

    /// 1-indexed line of the declaration
    pub line: usize,
}

/// Extracted variables by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableMap {
    vars: BTreeMap<String, ExtractedVariable>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map directly from values (line numbers are left at 0)
    pub fn from_values<'a>(values: impl IntoIterator<Item = (&'a str, VariableKind, f64)>) -> Self {
        let mut map = Self::new();
        for (name, kind, value) in values {
            map.insert(ExtractedVariable {
                name: name.to_string(),
                kind,
                value,
                line: 0,
            });
        }
        map
    }

    /// The four arithmetic-exercise values
    pub fn arithmetic(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self::from_values([
            ("a", VariableKind::Integer, a),
            ("b", VariableKind::Integer, b),
            ("c", VariableKind::Float, c),
            ("d", VariableKind::Float, d),
        ])
    }

    /// Insert or replace a variable
    pub fn insert(&mut self, var: ExtractedVariable) {
        self.vars.insert(var.name.clone(), var);
    }

    pub fn get(&self, name: &str) -> Option<&ExtractedVariable> {
        self.vars.get(name)
    }

    /// Value of a variable, if present
    pub fn value(&self, name: &str) -> Option<f64> {
        self.vars.get(name).map(|v| v.value)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedVariable> {
        self.vars.values()
    }
}

/// Extraction failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("missing declaration of '{name}': expected a line like `{example}`")]
    MissingDeclaration { name: String, example: String },

    #[error("declaration of '{name}' on line {line} has an unreadable value '{literal}'")]
    InvalidLiteral { name: String, line: usize, literal: String },

    #[error("invalid declaration pattern for '{name}': {message}")]
    Pattern { name: String, message: String },
}

impl ExtractionError {
    /// Convert to a grading diagnostic
    pub fn to_diagnostic(&self, source_file: &str) -> Diagnostic {
        let diag = Diagnostic::error(DiagnosticCode::MissingDeclaration, self.to_string())
            .with_location(cgrade_core::Location::new(source_file));

        match self {
            Self::MissingDeclaration { example, .. } => diag.with_hint(format!(
                "Declare the variable with a literal value, e.g. `{}`, so the expected output can be computed.",
                example
            )),
            _ => diag,
        }
    }
}

fn example_declaration(spec: &VariableSpec) -> String {
    match spec.kind {
        VariableKind::Integer => format!("{} {} = 10;", spec.type_keyword, spec.name),
        VariableKind::Float => format!("{} {} = 0.5;", spec.type_keyword, spec.name),
    }
}

/// Pattern for `<type_keyword> <name> = <literal>;` on a single line
fn declaration_pattern(spec: &VariableSpec) -> Result<Regex, ExtractionError> {
    let literal = match spec.kind {
        VariableKind::Integer => INTEGER_LITERAL,
        VariableKind::Float => FLOAT_LITERAL,
    };
    let suffix = match spec.kind {
        VariableKind::Integer => "",
        VariableKind::Float => "[A-Za-z]?",
    };

    let pattern = format!(
        r"\b{kw}[ \t]+{name}[ \t]*=[ \t]*({literal}){suffix}[ \t]*;",
        kw = regex::escape(&spec.type_keyword),
        name = regex::escape(&spec.name),
    );

    Regex::new(&pattern).map_err(|e| ExtractionError::Pattern {
        name: spec.name.clone(),
        message: e.to_string(),
    })
}

/// Read every required variable from `source`.
///
/// Fails on the first specification with no matching declaration: without
/// every value the expected output cannot be computed.
pub fn extract_variables(source: &str, specs: &[VariableSpec]) -> Result<VariableMap, ExtractionError> {
    let mut map = VariableMap::new();

    for spec in specs {
        let pattern = declaration_pattern(spec)?;

        let found = source.lines().enumerate().find_map(|(idx, line)| {
            pattern
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| (idx + 1, m.as_str().to_string()))
        });

        let Some((line, literal)) = found else {
            tracing::info!(name = %spec.name, "declaration not found");
            return Err(ExtractionError::MissingDeclaration {
                name: spec.name.clone(),
                example: example_declaration(spec),
            });
        };

        let value: f64 = literal.parse().map_err(|_| ExtractionError::InvalidLiteral {
            name: spec.name.clone(),
            line,
            literal: literal.clone(),
        })?;

        tracing::debug!(name = %spec.name, value, line, "extracted declaration");

        map.insert(ExtractedVariable {
            name: spec.name.clone(),
            kind: spec.kind,
            value,
            line,
        });
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<VariableSpec> {
        VariableSpec::arithmetic_defaults()
    }

    const SOURCE: &str = r#"#include <stdio.h>

int main(void) {
    int a = 10;
    int b = -3;
    double c = 0.5;
    double d = 2e-1;

    printf("a = %d\n", a);
    return 0;
}
"#;

    #[test]
    fn extracts_all_four_values() {
        let vars = extract_variables(SOURCE, &specs()).unwrap();
        assert_eq!(vars.len(), 4);
        assert_eq!(vars.value("a"), Some(10.0));
        assert_eq!(vars.value("b"), Some(-3.0));
        assert_eq!(vars.value("c"), Some(0.5));
        assert_eq!(vars.value("d"), Some(0.2));
        assert_eq!(vars.get("c").unwrap().line, 6);
        assert_eq!(vars.get("a").unwrap().kind, VariableKind::Integer);
    }

    #[test]
    fn first_declaration_wins() {
        let source = "int a = 1;\nint b = 2;\nint a = 99;\ndouble c = 1.0;\ndouble d = 2.0;\n";
        let vars = extract_variables(source, &specs()).unwrap();
        assert_eq!(vars.value("a"), Some(1.0));
        assert_eq!(vars.get("a").unwrap().line, 1);
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        let source = "int a = 1;\nint b = 2;\ndouble c = 1.0;\n";
        let err = extract_variables(source, &specs()).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::MissingDeclaration {
                name: "d".to_string(),
                example: "double d = 0.5;".to_string(),
            }
        );

        let diag = err.to_diagnostic("main.c");
        assert_eq!(diag.code, DiagnosticCode::MissingDeclaration);
        assert!(diag.hint.unwrap().contains("double d = 0.5;"));
    }

    #[test]
    fn type_keyword_must_match() {
        let source = "long a = 1;\nint b = 2;\ndouble c = 1.0;\ndouble d = 2.0;\n";
        let err = extract_variables(source, &specs()).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingDeclaration { ref name, .. } if name == "a"));
    }

    #[test]
    fn similar_names_do_not_match() {
        let source = "int ab = 5;\nint a = 7;\nint b = 2;\ndouble cd = 9.0;\ndouble c = 1.5;\ndouble d = 2.0;\n";
        let vars = extract_variables(source, &specs()).unwrap();
        assert_eq!(vars.value("a"), Some(7.0));
        assert_eq!(vars.value("c"), Some(1.5));
    }

    #[test]
    fn float_literal_forms() {
        let cases = [
            ("double c = 3.25;", 3.25),
            ("double c = .5;", 0.5),
            ("double c = 5.;", 5.0),
            ("double c = 7;", 7.0),
            ("double c = -1.5e3;", -1500.0),
            ("double c = 2.5f;", 2.5),
            ("double c=+4.0L ;", 4.0),
        ];

        let spec = [VariableSpec::new("c", VariableKind::Float, "double", false)];
        for (source, expected) in cases {
            let vars = extract_variables(source, &spec).unwrap();
            assert_eq!(vars.value("c"), Some(expected), "source: {}", source);
        }
    }

    #[test]
    fn integer_grammar_rejects_decimals() {
        let spec = [VariableSpec::new("a", VariableKind::Integer, "int", false)];
        assert!(extract_variables("int a = 1.5;", &spec).is_err());
        assert_eq!(extract_variables("int a = -42;", &spec).unwrap().value("a"), Some(-42.0));
    }

    #[test]
    fn names_are_matched_literally() {
        let spec = [VariableSpec::new("x.y", VariableKind::Integer, "int", false)];
        assert!(extract_variables("int xzy = 3;", &spec).is_err());
    }
}
