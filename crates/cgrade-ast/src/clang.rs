//! clang front-end using the JSON AST dump
//!
//! clang writes locations incrementally: `file` and `line` only appear when
//! they differ from the previously written location, in document order
//! (`loc`, then `range.begin`, then `range.end`, then `inner`). The converter
//! replays that state to recover a full location for every node.
//!
//! Dumps can nest thousands of levels deep (long operator chains, `else if`
//! ladders), so reading and converting never recurse on the call stack.

use crate::frontend::{parse_diagnostics, FrontEnd, ParseFailure};
use crate::tree::{NodeKind, SyntaxNode, SyntaxTree};
use cgrade_exec::{run, RunOptions};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Front-end that shells out to `clang -Xclang -ast-dump=json -fsyntax-only`
#[derive(Debug, Clone)]
pub struct ClangFrontEnd {
    program: String,
    timeout: Duration,
}

impl ClangFrontEnd {
    /// Use the given clang binary with a time limit
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Default for ClangFrontEnd {
    fn default() -> Self {
        Self::new("clang", Duration::from_secs(30))
    }
}

#[async_trait::async_trait]
impl FrontEnd for ClangFrontEnd {
    fn name(&self) -> &'static str {
        "clang"
    }

    async fn parse(&self, source: &Path, language_standard: &str) -> Result<SyntaxTree, ParseFailure> {
        let source_arg = source.to_string_lossy().into_owned();
        let std_flag = format!("-std={}", language_standard);
        let args = [
            "-Xclang",
            "-ast-dump=json",
            "-fsyntax-only",
            std_flag.as_str(),
            source_arg.as_str(),
        ];

        tracing::info!(source = %source.display(), "parsing with clang");
        let output = run(&self.program, args, &RunOptions::with_timeout(self.timeout)).await?;

        let errors: Vec<_> = parse_diagnostics(&output.stderr)
            .into_iter()
            .filter(|d| d.severity.is_error())
            .collect();

        if !errors.is_empty() {
            return Err(ParseFailure::Errors(errors));
        }

        if !output.success() {
            return Err(ParseFailure::InvalidOutput(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                output.stderr.trim()
            )));
        }

        tree_from_clang_json(&output.stdout, &source_arg)
    }
}

/// Convert a `-ast-dump=json` document into a [`SyntaxTree`]
pub fn tree_from_clang_json(json: &str, main_file: &str) -> Result<SyntaxTree, ParseFailure> {
    let value = read_dump(json)
        .map_err(|e| ParseFailure::InvalidOutput(format!("AST dump is not valid JSON: {}", e)))?;

    if value.get("kind").and_then(Value::as_str) != Some("TranslationUnitDecl") {
        return Err(ParseFailure::InvalidOutput(
            "AST dump does not start with a TranslationUnitDecl".to_string(),
        ));
    }

    let mut cursor = LocationCursor::default();
    let root = convert(&value, &mut cursor);

    Ok(SyntaxTree::new(main_file, root))
}

/// Parse without serde_json's nesting limit, growing the stack on the heap as needed
fn read_dump(json: &str) -> Result<Value, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn node_kind(kind: &str) -> NodeKind {
    match kind {
        "FunctionDecl" => NodeKind::FunctionDecl,
        "IfStmt" => NodeKind::If,
        "ForStmt" => NodeKind::For,
        "WhileStmt" => NodeKind::While,
        "ConditionalOperator" | "BinaryConditionalOperator" => NodeKind::Ternary,
        _ => NodeKind::Other,
    }
}

/// Resolved position of a node
#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    file: Option<String>,
    line: u32,
}

/// Last file/line clang wrote
#[derive(Debug, Default)]
struct LocationCursor {
    file: Option<String>,
    line: u32,
}

impl LocationCursor {
    fn bare(&mut self, loc: &Value) -> Option<Position> {
        let obj = loc.as_object()?;
        if obj.is_empty() {
            return None;
        }

        if let Some(file) = obj.get("file").and_then(Value::as_str) {
            self.file = Some(file.to_string());
        }
        if let Some(line) = obj.get("line").and_then(Value::as_u64) {
            self.line = u32::try_from(line).unwrap_or(u32::MAX);
        }

        Some(Position {
            file: self.file.clone(),
            line: self.line,
        })
    }

    /// Macro locations come as a spelling/expansion pair: the file is where the
    /// text was spelled (a header for library macros), the line is where the
    /// student wrote the macro call.
    fn location(&mut self, loc: &Value) -> Option<Position> {
        match loc.get("spellingLoc") {
            Some(spelling) => {
                let spelled = self.bare(spelling);
                let expanded = loc.get("expansionLoc").and_then(|e| self.bare(e));
                match (spelled, expanded) {
                    (Some(s), Some(e)) => Some(Position { file: s.file, line: e.line }),
                    (s, e) => s.or(e),
                }
            }
            None => self.bare(loc),
        }
    }
}

/// A node whose children are still being converted
struct Frame<'a> {
    node: SyntaxNode,
    pending: std::slice::Iter<'a, Value>,
}

impl<'a> Frame<'a> {
    fn enter(value: &'a Value, cursor: &mut LocationCursor) -> Self {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .map(node_kind)
            .unwrap_or(NodeKind::Other);

        // Order matters: every location updates the cursor.
        let loc = value.get("loc").and_then(|l| cursor.location(l));
        let range = value.get("range");
        let begin = range
            .and_then(|r| r.get("begin"))
            .and_then(|b| cursor.location(b));
        let _end = range.and_then(|r| r.get("end")).and_then(|e| cursor.location(e));

        let position = loc.or(begin).unwrap_or(Position { file: None, line: 0 });

        let mut node = SyntaxNode::new(kind, position.line);
        node.file = position.file;
        node.name = value.get("name").and_then(Value::as_str).map(str::to_string);

        if kind != NodeKind::Other {
            tracing::trace!(?kind, line = node.line, file = ?node.file, "converted node");
        }

        let pending = value
            .get("inner")
            .and_then(Value::as_array)
            .map(|inner| inner.iter())
            .unwrap_or_default();

        Self { node, pending }
    }
}

/// Pre-order conversion with an explicit stack of open nodes
fn convert(root: &Value, cursor: &mut LocationCursor) -> SyntaxNode {
    let mut open: Vec<Frame<'_>> = Vec::new();
    let mut current = Frame::enter(root, cursor);

    loop {
        if let Some(child) = current.pending.next() {
            let parent = std::mem::replace(&mut current, Frame::enter(child, cursor));
            open.push(parent);
            continue;
        }

        match open.pop() {
            Some(mut parent) => {
                parent.node.children.push(current.node);
                current = parent;
            }
            None => return current.node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Trimmed dump of:
    ///
    /// ```c
    /// #include <ctype.h>
    /// int get_sign(int x) {
    ///   if (x > 0) return 1;
    ///   for (;;) {}
    ///   return isdigit(x) ? 0 : -1;
    /// }
    /// ```
    const DUMP: &str = r#"{
      "id": "0x1", "kind": "TranslationUnitDecl", "loc": {}, "range": {"begin": {}, "end": {}},
      "inner": [
        {"id": "0x2", "kind": "TypedefDecl", "loc": {}, "range": {"begin": {}, "end": {}},
         "isImplicit": true, "name": "__int128_t"},
        {"id": "0x3", "kind": "FunctionDecl",
         "loc": {"offset": 80, "file": "/usr/include/ctype.h", "line": 40, "col": 12, "tokLen": 7},
         "range": {"begin": {"offset": 70, "col": 1, "tokLen": 6}, "end": {"offset": 95, "col": 30, "tokLen": 1}},
         "name": "isdigit"},
        {"id": "0x4", "kind": "FunctionDecl",
         "loc": {"offset": 24, "file": "main.c", "line": 2, "col": 5, "tokLen": 8},
         "range": {"begin": {"offset": 20, "col": 1, "tokLen": 3}, "end": {"offset": 120, "line": 6, "col": 1, "tokLen": 1}},
         "name": "get_sign",
         "inner": [
           {"id": "0x5", "kind": "ParmVarDecl",
            "loc": {"offset": 37, "line": 2, "col": 18, "tokLen": 1},
            "range": {"begin": {"offset": 33, "col": 14, "tokLen": 3}, "end": {"offset": 37, "col": 18, "tokLen": 1}},
            "name": "x"},
           {"id": "0x6", "kind": "CompoundStmt",
            "range": {"begin": {"offset": 40, "col": 21, "tokLen": 1}, "end": {"offset": 120, "line": 6, "col": 1, "tokLen": 1}},
            "inner": [
              {"id": "0x7", "kind": "IfStmt",
               "range": {"begin": {"offset": 44, "line": 3, "col": 3, "tokLen": 2}, "end": {"offset": 62, "col": 21, "tokLen": 1}}},
              {"id": "0x8", "kind": "ForStmt",
               "range": {"begin": {"offset": 66, "line": 4, "col": 3, "tokLen": 3}, "end": {"offset": 76, "col": 13, "tokLen": 1}}},
              {"id": "0x9", "kind": "ReturnStmt",
               "range": {"begin": {"offset": 80, "line": 5, "col": 3, "tokLen": 6}, "end": {"offset": 105, "col": 28, "tokLen": 2}},
               "inner": [
                 {"id": "0xa", "kind": "ConditionalOperator",
                  "range": {"begin": {"offset": 87, "col": 10, "tokLen": 7}, "end": {"offset": 105, "col": 28, "tokLen": 2}},
                  "inner": [
                    {"id": "0xb", "kind": "ConditionalOperator",
                     "range": {
                       "begin": {
                         "spellingLoc": {"offset": 300, "file": "/usr/include/ctype.h", "line": 90, "col": 20, "tokLen": 1},
                         "expansionLoc": {"offset": 87, "file": "main.c", "line": 5, "col": 10, "tokLen": 7}
                       },
                       "end": {
                         "spellingLoc": {"offset": 320, "file": "/usr/include/ctype.h", "line": 90, "col": 40, "tokLen": 1},
                         "expansionLoc": {"offset": 96, "file": "main.c", "line": 5, "col": 19, "tokLen": 1}
                       }
                     }}
                  ]}
               ]}
            ]}
         ]}
      ]
    }"#;

    fn tree() -> SyntaxTree {
        tree_from_clang_json(DUMP, "main.c").unwrap()
    }

    #[test]
    fn maps_node_kinds() {
        let tree = tree();
        let kinds: Vec<NodeKind> = tree
            .root
            .preorder()
            .map(|n| n.kind)
            .filter(|k| *k != NodeKind::Other)
            .collect();

        assert_eq!(
            kinds,
            vec![
                NodeKind::FunctionDecl,
                NodeKind::FunctionDecl,
                NodeKind::If,
                NodeKind::For,
                NodeKind::Ternary,
                NodeKind::Ternary,
            ]
        );
    }

    #[test]
    fn replays_incremental_locations() {
        let tree = tree();
        let isdigit = tree.functions_named("isdigit").next().unwrap();
        assert_eq!(isdigit.file.as_deref(), Some("/usr/include/ctype.h"));
        assert_eq!(isdigit.line, 40);

        let func = tree.functions_named("get_sign").next().unwrap();
        assert_eq!(func.file.as_deref(), Some("main.c"));
        assert_eq!(func.line, 2);

        let lines: Vec<(NodeKind, u32, Option<&str>)> = func
            .preorder()
            .filter(|n| matches!(n.kind, NodeKind::If | NodeKind::For | NodeKind::Ternary))
            .map(|n| (n.kind, n.line, n.file.as_deref()))
            .collect();

        assert_eq!(
            lines,
            vec![
                (NodeKind::If, 3, Some("main.c")),
                (NodeKind::For, 4, Some("main.c")),
                (NodeKind::Ternary, 5, Some("main.c")),
                (NodeKind::Ternary, 5, Some("/usr/include/ctype.h")),
            ]
        );
    }

    #[test]
    fn keeps_names_and_main_file() {
        let tree = tree();
        assert_eq!(tree.main_file, "main.c");
        let func = tree.functions_named("get_sign").next().unwrap();
        assert_eq!(func.children[0].name.as_deref(), Some("x"));
    }

    #[test]
    fn rejects_non_json() {
        let err = tree_from_clang_json("main.c:1:1: error", "main.c").unwrap_err();
        assert!(matches!(err, ParseFailure::InvalidOutput(_)));
    }

    fn nested_dump(depth: usize) -> String {
        let mut json = String::from(
            r#"{"kind": "TranslationUnitDecl", "inner": [{"kind": "FunctionDecl", "name": "deep",
               "loc": {"file": "main.c", "line": 1}, "inner": ["#,
        );
        for _ in 0..depth {
            json.push_str(r#"{"kind": "ParenExpr", "inner": ["#);
        }
        json.push_str(r#"{"kind": "IfStmt", "range": {"begin": {"line": 7}, "end": {}}}"#);
        for _ in 0..depth {
            json.push_str("]}");
        }
        json.push_str("]}]}");
        json
    }

    #[test]
    fn converts_dumps_deeper_than_the_json_nesting_limit() {
        let tree = tree_from_clang_json(&nested_dump(2_000), "main.c").unwrap();
        let func = tree.functions_named("deep").next().unwrap();

        let found: Vec<(NodeKind, u32, Option<&str>)> = func
            .preorder()
            .filter(|n| n.kind == NodeKind::If)
            .map(|n| (n.kind, n.line, n.file.as_deref()))
            .collect();
        assert_eq!(found, vec![(NodeKind::If, 7, Some("main.c"))]);
        assert_eq!(func.preorder().count(), 2_000 + 2);
    }

    #[test]
    fn rejects_trailing_garbage() {
        let err = tree_from_clang_json(r#"{"kind": "TranslationUnitDecl"} x"#, "main.c").unwrap_err();
        assert!(matches!(err, ParseFailure::InvalidOutput(_)));
    }

    #[test]
    fn rejects_unexpected_root() {
        let err = tree_from_clang_json(r#"{"kind": "FunctionDecl"}"#, "main.c").unwrap_err();
        assert!(matches!(err, ParseFailure::InvalidOutput(_)));
    }
}
