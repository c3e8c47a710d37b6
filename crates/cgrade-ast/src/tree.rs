//! Read-only syntax tree for one translation unit
//!
//! Nodes own their children. The checker only ever borrows a tree, so a walk
//! can never observe a half-built or mutated node.

use serde::{Deserialize, Serialize};

/// Node kinds the structural rules care about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Function declaration or definition
    FunctionDecl,

    /// `if` statement
    If,

    /// `for` loop
    For,

    /// `while` loop
    While,

    /// Conditional operator `?:`
    Ternary,

    /// Anything else
    Other,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FunctionDecl => write!(f, "function"),
            Self::If => write!(f, "if"),
            Self::For => write!(f, "for"),
            Self::While => write!(f, "while"),
            Self::Ternary => write!(f, "ternary operator (?:)"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One node of the syntax tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxNode {
    /// Node kind
    pub kind: NodeKind,

    /// Spelling (function name for declarations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 1-indexed source line, 0 when unknown
    #[serde(default)]
    pub line: u32,

    /// File the node was spelled in, `None` when unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Children in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Create a leaf node
    pub fn new(kind: NodeKind, line: u32) -> Self {
        Self {
            kind,
            name: None,
            line,
            file: None,
            children: Vec::new(),
        }
    }

    /// Set the spelling
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the originating file
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Replace the children
    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    /// Append one child
    pub fn push(&mut self, child: SyntaxNode) {
        self.children.push(child);
    }

    /// Pre-order walk: the node itself, then each child subtree in order
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// Whether this node is a function declaration with the given name
    pub fn is_function_named(&self, name: &str) -> bool {
        self.kind == NodeKind::FunctionDecl && self.name.as_deref() == Some(name)
    }
}

/// Iterative pre-order traversal (no recursion, so depth is bounded only by memory)
pub struct Preorder<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A parsed translation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxTree {
    /// Path of the file under test, as the front-end reports it
    pub main_file: String,

    /// Translation unit root; top-level declarations are its children
    pub root: SyntaxNode,
}

impl SyntaxTree {
    /// Wrap a root node
    pub fn new(main_file: impl Into<String>, root: SyntaxNode) -> Self {
        Self {
            main_file: main_file.into(),
            root,
        }
    }

    /// Load a tree serialized as JSON by an external front-end
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Top-level declarations
    pub fn top_level(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.root.children.iter()
    }

    /// Top-level function declarations with the given name (prototypes included)
    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SyntaxNode> + 'a {
        self.top_level().filter(move |node| node.is_function_named(name))
    }

    /// Whether the node belongs to the file under test.
    ///
    /// Nodes with no recorded file are treated as belonging to it.
    pub fn in_main_file(&self, node: &SyntaxNode) -> bool {
        node.file.as_deref().map_or(true, |file| file == self.main_file)
    }
}
