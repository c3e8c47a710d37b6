//! Control-flow rules for student functions
//!
//! A checked function must contain at least one `if` anywhere in its body and
//! must not contain `for`, `while`, or `?:`. The walk covers the whole subtree
//! of the named function, nested declarations included, and only classifies
//! nodes spelled in the file under test.

use cgrade_ast::{NodeKind, SyntaxTree};
use cgrade_core::{Diagnostic, DiagnosticCode, Location, StructureConfig};
use serde::{Deserialize, Serialize};

/// A construct the rules forbid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Construct {
    For,
    While,
    Ternary,
}

impl Construct {
    fn from_kind(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::For => Some(Self::For),
            NodeKind::While => Some(Self::While),
            NodeKind::Ternary => Some(Self::Ternary),
            _ => None,
        }
    }
}

impl std::fmt::Display for Construct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::For => write!(f, "for"),
            Self::While => write!(f, "while"),
            Self::Ternary => write!(f, "ternary operator (?:)"),
        }
    }
}

/// A forbidden construct and where it was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructOccurrence {
    pub kind: Construct,
    pub line: u32,
}

/// Outcome of checking one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralVerdict {
    /// Function that was checked
    pub function_name: String,

    /// Whether a definition or declaration was found in the file under test
    pub found: bool,

    /// Line of the first matching declaration
    pub line: Option<u32>,

    /// At least one `if` appears in the function
    pub has_required_branch: bool,

    /// Forbidden constructs in pre-order discovery order
    pub disallowed: Vec<ConstructOccurrence>,
}

impl StructuralVerdict {
    fn empty(function_name: &str) -> Self {
        Self {
            function_name: function_name.to_string(),
            found: false,
            line: None,
            has_required_branch: false,
            disallowed: Vec::new(),
        }
    }

    /// Passing requires a found function with an `if` and no forbidden constructs
    pub fn passed(&self) -> bool {
        self.found && self.has_required_branch && self.disallowed.is_empty()
    }

    /// One diagnostic per violated rule
    pub fn to_diagnostics(&self, source_file: &str) -> Vec<Diagnostic> {
        let name = &self.function_name;

        if !self.found {
            return vec![Diagnostic::error(
                DiagnosticCode::FunctionNotFound,
                format!("Function {} is not defined in {}", name, source_file),
            )
            .with_location(Location::new(source_file))
            .with_hint(format!("Define `{}` in {} as the assignment asks.", name, source_file))];
        }

        let mut diagnostics = Vec::new();

        if !self.has_required_branch {
            let location = match self.line {
                Some(line) => Location::with_line(source_file, line as usize),
                None => Location::new(source_file),
            };
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::MissingRequiredBranch,
                    format!(
                        "Function {} must use if/else statements as per assignment instructions. No if statements found.",
                        name
                    ),
                )
                .with_location(location),
            );
        }

        for occurrence in &self.disallowed {
            diagnostics.push(
                Diagnostic::error(
                    DiagnosticCode::DisallowedConstruct,
                    format!(
                        "Function {} contains disallowed construct: {} at line {}",
                        name, occurrence.kind, occurrence.line
                    ),
                )
                .with_location(Location::with_line(source_file, occurrence.line as usize))
                .with_hint("Use if/else statements instead of loops or ternary operators."),
            );
        }

        diagnostics
    }
}

/// Classify the control flow of the top-level function `function_name`.
///
/// A function that is not found yields a verdict with `found == false`,
/// which never passes.
pub fn check_function(tree: &SyntaxTree, function_name: &str) -> StructuralVerdict {
    tracing::info!(function = function_name, "starting to check function");

    let mut verdict = StructuralVerdict::empty(function_name);

    for decl in tree
        .functions_named(function_name)
        .filter(|decl| tree.in_main_file(decl))
    {
        verdict.found = true;
        verdict.line.get_or_insert(decl.line);

        for node in decl.preorder() {
            if !tree.in_main_file(node) {
                continue;
            }

            if node.kind == NodeKind::If {
                tracing::debug!(function = function_name, line = node.line, "found if statement");
                verdict.has_required_branch = true;
            } else if let Some(kind) = Construct::from_kind(node.kind) {
                tracing::debug!(function = function_name, line = node.line, %kind, "found disallowed construct");
                verdict.disallowed.push(ConstructOccurrence { kind, line: node.line });
            }
        }
    }

    tracing::info!(
        function = function_name,
        found = verdict.found,
        has_if = verdict.has_required_branch,
        disallowed = verdict.disallowed.len(),
        "finished checking function"
    );

    verdict
}

/// Functions defined in the file under test, minus `exclude`, in first-seen order
pub fn discover_functions(tree: &SyntaxTree, exclude: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for node in tree.top_level() {
        if node.kind != NodeKind::FunctionDecl || !tree.in_main_file(node) {
            continue;
        }
        let Some(name) = node.name.as_deref() else {
            continue;
        };
        if exclude.iter().any(|e| e == name) || names.iter().any(|n| n == name) {
            continue;
        }
        names.push(name.to_string());
    }

    names
}

/// Check every configured function, or every discovered one when none are configured
pub fn check_all(tree: &SyntaxTree, config: &StructureConfig) -> Vec<StructuralVerdict> {
    let names = if config.functions.is_empty() {
        discover_functions(tree, &config.exclude)
    } else {
        config.functions.clone()
    };

    names.iter().map(|name| check_function(tree, name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgrade_ast::SyntaxNode;
    use pretty_assertions::assert_eq;

    fn node(kind: NodeKind, line: u32) -> SyntaxNode {
        SyntaxNode::new(kind, line)
    }

    fn func(name: &str, line: u32, body: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::new(NodeKind::FunctionDecl, line)
            .named(name)
            .in_file("main.c")
            .with_children(body)
    }

    fn tree(functions: Vec<SyntaxNode>) -> SyntaxTree {
        SyntaxTree::new("main.c", node(NodeKind::Other, 0).with_children(functions))
    }

    #[test]
    fn if_only_function_passes() {
        let tree = tree(vec![func(
            "get_sign",
            1,
            vec![node(NodeKind::Other, 1).with_children(vec![
                node(NodeKind::If, 2).with_children(vec![node(NodeKind::If, 4)]),
            ])],
        )]);

        let verdict = check_function(&tree, "get_sign");
        assert!(verdict.found);
        assert!(verdict.has_required_branch);
        assert!(verdict.disallowed.is_empty());
        assert!(verdict.passed());
        assert!(verdict.to_diagnostics("main.c").is_empty());
    }

    #[test]
    fn function_without_if_fails() {
        let tree = tree(vec![func("get_sign", 3, vec![node(NodeKind::Other, 4)])]);

        let verdict = check_function(&tree, "get_sign");
        assert!(!verdict.has_required_branch);
        assert!(!verdict.passed());

        let diags = verdict.to_diagnostics("main.c");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::MissingRequiredBranch);
        assert_eq!(diags[0].location, Some(Location::with_line("main.c", 3)));
    }

    #[test]
    fn disallowed_constructs_in_preorder() {
        let tree = tree(vec![func(
            "get_water_state",
            1,
            vec![node(NodeKind::Other, 1).with_children(vec![
                node(NodeKind::While, 5).with_children(vec![
                    node(NodeKind::Ternary, 6),
                    node(NodeKind::For, 7),
                ]),
                node(NodeKind::If, 9),
                node(NodeKind::Ternary, 10),
            ])],
        )]);

        let verdict = check_function(&tree, "get_water_state");
        assert!(verdict.has_required_branch);
        assert_eq!(
            verdict.disallowed,
            vec![
                ConstructOccurrence { kind: Construct::While, line: 5 },
                ConstructOccurrence { kind: Construct::Ternary, line: 6 },
                ConstructOccurrence { kind: Construct::For, line: 7 },
                ConstructOccurrence { kind: Construct::Ternary, line: 10 },
            ]
        );

        let diags = verdict.to_diagnostics("main.c");
        assert_eq!(diags.len(), 4);
        assert!(diags.iter().all(|d| d.code == DiagnosticCode::DisallowedConstruct));
        assert_eq!(
            diags[1].message,
            "Function get_water_state contains disallowed construct: ternary operator (?:) at line 6"
        );
    }

    #[test]
    fn missing_branch_and_constructs_are_both_reported() {
        let tree = tree(vec![func("f", 1, vec![node(NodeKind::For, 2)])]);
        let codes: Vec<_> = check_function(&tree, "f")
            .to_diagnostics("main.c")
            .into_iter()
            .map(|d| d.code)
            .collect();
        assert_eq!(
            codes,
            vec![DiagnosticCode::MissingRequiredBranch, DiagnosticCode::DisallowedConstruct]
        );
    }

    #[test]
    fn missing_function_never_passes() {
        let tree = tree(vec![func("main", 1, vec![node(NodeKind::If, 2)])]);

        let verdict = check_function(&tree, "get_sign");
        assert!(!verdict.found);
        assert!(!verdict.has_required_branch);
        assert!(verdict.disallowed.is_empty());
        assert!(!verdict.passed());

        let diags = verdict.to_diagnostics("main.c");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::FunctionNotFound);
    }

    #[test]
    fn other_functions_are_not_walked() {
        let tree = tree(vec![
            func("helper", 1, vec![node(NodeKind::For, 2)]),
            func("get_sign", 5, vec![node(NodeKind::If, 6)]),
        ]);

        assert!(check_function(&tree, "get_sign").passed());
    }

    #[test]
    fn nested_declarations_are_part_of_the_subtree() {
        // GNU C nested function inside the checked one
        let tree = tree(vec![func(
            "outer",
            1,
            vec![node(NodeKind::Other, 1).with_children(vec![
                func("inner", 2, vec![node(NodeKind::Other, 2).with_children(vec![
                    node(NodeKind::Other, 3).with_children(vec![node(NodeKind::While, 3)]),
                ])]),
                node(NodeKind::If, 6),
            ])],
        )]);

        let verdict = check_function(&tree, "outer");
        assert!(verdict.has_required_branch);
        assert_eq!(
            verdict.disallowed,
            vec![ConstructOccurrence { kind: Construct::While, line: 3 }]
        );
        // nested functions are not top-level, so they cannot be checked on their own
        assert!(!check_function(&tree, "inner").found);
    }

    #[test]
    fn header_nodes_are_not_classified_but_their_children_are() {
        let tree = tree(vec![func(
            "classify",
            1,
            vec![node(NodeKind::Other, 1).with_children(vec![
                node(NodeKind::Ternary, 4)
                    .in_file("/usr/include/ctype.h")
                    .with_children(vec![node(NodeKind::Ternary, 4).in_file("main.c")]),
                node(NodeKind::If, 5).in_file("/usr/include/ctype.h"),
            ])],
        )]);

        let verdict = check_function(&tree, "classify");
        assert!(!verdict.has_required_branch);
        assert_eq!(
            verdict.disallowed,
            vec![ConstructOccurrence { kind: Construct::Ternary, line: 4 }]
        );
    }

    #[test]
    fn header_declarations_are_ignored() {
        let tree = tree(vec![SyntaxNode::new(NodeKind::FunctionDecl, 12)
            .named("abs")
            .in_file("/usr/include/stdlib.h")]);

        assert!(!check_function(&tree, "abs").found);
        assert!(discover_functions(&tree, &[]).is_empty());
    }

    #[test]
    fn prototype_and_definition_are_one_function() {
        let tree = tree(vec![
            func("get_sign", 3, vec![]),
            func("main", 5, vec![node(NodeKind::If, 6)]),
            func("get_sign", 10, vec![node(NodeKind::If, 11)]),
            func("get_water_state", 14, vec![node(NodeKind::If, 15)]),
        ]);

        assert_eq!(
            discover_functions(&tree, &["main".to_string()]),
            vec!["get_sign".to_string(), "get_water_state".to_string()]
        );

        let verdict = check_function(&tree, "get_sign");
        assert_eq!(verdict.line, Some(3));
        assert!(verdict.passed());
    }

    #[test]
    fn check_all_uses_configured_names_first() {
        let tree = tree(vec![
            func("a", 1, vec![node(NodeKind::If, 2)]),
            func("b", 3, vec![node(NodeKind::For, 4)]),
        ]);

        let discovered = check_all(&tree, &StructureConfig::default());
        assert_eq!(discovered.len(), 2);

        let config = StructureConfig {
            functions: vec!["b".to_string(), "missing".to_string()],
            ..StructureConfig::default()
        };
        let verdicts = check_all(&tree, &config);
        assert_eq!(verdicts.len(), 2);
        assert!(!verdicts[0].passed());
        assert!(!verdicts[1].found);
    }

    #[test]
    fn repeated_checks_are_identical() {
        let tree = tree(vec![func(
            "f",
            1,
            vec![node(NodeKind::If, 2), node(NodeKind::While, 3)],
        )]);
        assert_eq!(check_function(&tree, "f"), check_function(&tree, "f"));
    }
}
