//! Static view of the consolidated runtime script.
//!
//! The script is parsed into a tagged-variant syntax tree ([`Node`]) whose
//! nodes remember their byte span, so the original source of any node can be
//! recovered. Traversal goes through the [`Visitor`] trait; each node is
//! presented together with the [`Role`] it plays in its parent.
//!
//! ## Example
//!
//! ```
//! use wxcfg_core::script::{walk, Flow, Node, NodeKind, Role, Script, Visitor};
//!
//! struct Objects(usize);
//!
//! impl<'n> Visitor<'n> for Objects {
//!     fn enter(&mut self, node: &'n Node, _role: Role) -> Flow {
//!         if matches!(node.kind, NodeKind::Object(_)) {
//!             self.0 += 1;
//!         }
//!         Flow::Continue
//!     }
//! }
//!
//! let script = Script::parse("var a = {b: {c: 1}};")?;
//! let mut objects = Objects(0);
//! walk(script.root(), Role::Root, &mut objects);
//! assert_eq!(objects.0, 2);
//! # Ok::<(), wxcfg_core::Error>(())
//! ```

mod lexer;
mod parser;

use crate::error::Result;

/// Byte range of a node in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Offset of the first byte
    pub start: usize,
    /// Offset just past the last byte
    pub end: usize,
}

impl Span {
    /// Creates a span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A syntax tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// What the node is, with its children
    pub kind: NodeKind,
    /// Where the node sits in the source
    pub span: Span,
}

/// Node variants
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Whole script
    Program(Vec<Node>),
    /// `{ ... }` statement list
    Block(Vec<Node>),
    /// Expression in statement position
    ExpressionStatement(Box<Node>),
    /// `var` / `let` / `const` with its declarators
    VariableDeclaration(Vec<Node>),
    /// One `binding = init` of a declaration
    Declarator {
        /// Bound name or pattern
        binding: Box<Node>,
        /// Initializer
        init: Option<Box<Node>>,
    },
    /// Function declaration, function expression, method or arrow
    Function {
        /// Declared name
        name: Option<String>,
        /// Parameters
        params: Vec<Node>,
        /// Block body, or expression body of an arrow
        body: Box<Node>,
    },
    /// Class declaration or expression
    Class {
        /// Declared name
        name: Option<String>,
        /// `extends` clause
        superclass: Option<Box<Node>>,
        /// Methods, fields and static blocks
        members: Vec<Node>,
    },
    /// `if` statement
    If {
        /// Condition
        test: Box<Node>,
        /// Taken branch
        consequent: Box<Node>,
        /// `else` branch
        alternate: Option<Box<Node>>,
    },
    /// `for`, `while` or `do ... while`
    Loop {
        /// Whatever sits between the loop's parentheses
        head: Vec<Node>,
        /// Loop body
        body: Box<Node>,
    },
    /// `return` statement
    Return(Option<Box<Node>>),
    /// `throw` statement
    Throw(Box<Node>),
    /// `try` statement
    Try {
        /// Protected block
        block: Box<Node>,
        /// `catch` binding
        param: Option<Box<Node>>,
        /// `catch` block
        handler: Option<Box<Node>>,
        /// `finally` block
        finalizer: Option<Box<Node>>,
    },
    /// `switch` statement
    Switch {
        /// Switched-on value
        discriminant: Box<Node>,
        /// `case` / `default` clauses
        cases: Vec<Node>,
    },
    /// One `case` clause; `default` has no test
    Case {
        /// Matched value
        test: Option<Box<Node>>,
        /// Clause statements
        body: Vec<Node>,
    },
    /// `label: statement`
    Labeled(Box<Node>),
    /// `;`
    Empty,
    /// Statement carrying no sub-expressions (`break`, `import ...`)
    Opaque,
    /// `left op right` where op is `=` or a compound assignment
    Assignment {
        /// Operator text
        operator: String,
        /// Assigned target
        left: Box<Node>,
        /// Assigned value
        right: Box<Node>,
    },
    /// Comma-separated expressions
    Sequence(Vec<Node>),
    /// `test ? consequent : alternate`
    Conditional {
        /// Condition
        test: Box<Node>,
        /// Value when true
        consequent: Box<Node>,
        /// Value when false
        alternate: Box<Node>,
    },
    /// Arithmetic, comparison or logical operation
    Binary {
        /// Operator text
        operator: String,
        /// Left operand
        left: Box<Node>,
        /// Right operand
        right: Box<Node>,
    },
    /// Prefix operator (`!`, `typeof`, `await`, `yield`, ...)
    Unary {
        /// Operator text
        operator: String,
        /// Operand, absent for a bare `yield`
        argument: Option<Box<Node>>,
    },
    /// `++` / `--`
    Update {
        /// Operator text
        operator: String,
        /// Prefix form
        prefix: bool,
        /// Operand
        argument: Box<Node>,
    },
    /// `...argument`
    Spread(Box<Node>),
    /// `new callee(arguments)`
    New {
        /// Constructed value
        callee: Box<Node>,
        /// Constructor arguments
        arguments: Vec<Node>,
    },
    /// `callee(arguments)`, also tagged templates
    Call {
        /// Called value
        callee: Box<Node>,
        /// Call arguments
        arguments: Vec<Node>,
    },
    /// `object.property` or `object[property]`
    Member {
        /// Accessed value
        object: Box<Node>,
        /// Property name or key expression
        property: Box<Node>,
        /// Bracket access
        computed: bool,
    },
    /// Identifier, `this` included
    Identifier(String),
    /// String literal with its cooked value
    StringLiteral(String),
    /// Number, boolean, `null` or regular expression
    Literal,
    /// Template literal
    Template,
    /// `{ ... }` expression
    Object(Vec<Node>),
    /// `key: value` pair of an object literal or class body
    Property {
        /// Property key
        key: Box<Node>,
        /// Value; `None` for shorthand properties
        value: Option<Box<Node>>,
        /// `[key]` form
        computed: bool,
    },
    /// `[ ... ]` expression
    Array(Vec<Node>),
}

/// Position of a node within its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Start of a traversal
    Root,
    /// Element of a statement list
    Statement,
    /// Expression of an expression statement, return or throw
    Expression,
    /// Declarator of a declaration
    Declarator,
    /// Bound name or pattern of a declarator
    Binding,
    /// Initializer of a declarator
    Init,
    /// Function parameter
    Param,
    /// Function, loop, class, label or clause body
    Body,
    /// Superclass expression
    Superclass,
    /// Class member
    Member,
    /// Condition of an `if`, conditional or `case`
    Test,
    /// True branch
    Consequent,
    /// False branch
    Alternate,
    /// Part of a loop head
    Head,
    /// `try` block
    Block,
    /// `catch` binding
    Handler,
    /// `catch` block
    CatchBody,
    /// `finally` block
    Finalizer,
    /// Switched-on value
    Discriminant,
    /// `case` clause
    Case,
    /// Left side of an assignment or binary operation
    Left,
    /// Right side of an assignment or binary operation
    Right,
    /// Element of a sequence
    Item,
    /// Operand of a unary, update or spread
    Argument,
    /// Callee of a call or `new`
    Callee,
    /// Argument of a call or `new`
    CallArgument,
    /// Accessed value of a member expression
    Object,
    /// Property of a member expression
    Property,
    /// Property of an object literal
    Entry,
    /// Key of a property
    Key,
    /// Value of a property
    Value,
    /// Element of an array literal
    Element,
}

impl Node {
    /// Creates a node
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The original source text of this node
    pub fn source<'s>(&self, src: &'s str) -> &'s str {
        src.get(self.span.start..self.span.end).unwrap_or_default()
    }

    /// Identifier name, if this is an identifier
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Cooked string value, if this is a string literal
    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::StringLiteral(value) => Some(value),
            _ => None,
        }
    }

    /// Direct children with their roles, in source order
    pub fn children(&self) -> Vec<(Role, &Node)> {
        fn list(role: Role, nodes: &[Node]) -> impl Iterator<Item = (Role, &Node)> {
            nodes.iter().map(move |n| (role, n))
        }
        fn opt(role: Role, node: &Option<Box<Node>>) -> impl Iterator<Item = (Role, &Node)> {
            node.as_deref().map(|n| (role, n)).into_iter()
        }

        match &self.kind {
            NodeKind::Program(body) | NodeKind::Block(body) => {
                list(Role::Statement, body).collect()
            }
            NodeKind::ExpressionStatement(expr) | NodeKind::Throw(expr) => {
                vec![(Role::Expression, &**expr)]
            }
            NodeKind::Return(expr) => opt(Role::Expression, expr).collect(),
            NodeKind::VariableDeclaration(decls) => list(Role::Declarator, decls).collect(),
            NodeKind::Declarator { binding, init } => std::iter::once((Role::Binding, &**binding))
                .chain(opt(Role::Init, init))
                .collect(),
            NodeKind::Function { params, body, .. } => list(Role::Param, params)
                .chain(std::iter::once((Role::Body, &**body)))
                .collect(),
            NodeKind::Class {
                superclass,
                members,
                ..
            } => opt(Role::Superclass, superclass)
                .chain(list(Role::Member, members))
                .collect(),
            NodeKind::If {
                test,
                consequent,
                alternate,
            } => vec![(Role::Test, &**test), (Role::Consequent, &**consequent)]
                .into_iter()
                .chain(opt(Role::Alternate, alternate))
                .collect(),
            NodeKind::Loop { head, body } => list(Role::Head, head)
                .chain(std::iter::once((Role::Body, &**body)))
                .collect(),
            NodeKind::Try {
                block,
                param,
                handler,
                finalizer,
            } => std::iter::once((Role::Block, &**block))
                .chain(opt(Role::Handler, param))
                .chain(opt(Role::CatchBody, handler))
                .chain(opt(Role::Finalizer, finalizer))
                .collect(),
            NodeKind::Switch {
                discriminant,
                cases,
            } => std::iter::once((Role::Discriminant, &**discriminant))
                .chain(list(Role::Case, cases))
                .collect(),
            NodeKind::Case { test, body } => opt(Role::Test, test)
                .chain(list(Role::Statement, body))
                .collect(),
            NodeKind::Labeled(body) => vec![(Role::Body, &**body)],
            NodeKind::Assignment { left, right, .. } | NodeKind::Binary { left, right, .. } => {
                vec![(Role::Left, &**left), (Role::Right, &**right)]
            }
            NodeKind::Sequence(items) => list(Role::Item, items).collect(),
            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => vec![
                (Role::Test, &**test),
                (Role::Consequent, &**consequent),
                (Role::Alternate, &**alternate),
            ],
            NodeKind::Unary { argument, .. } => opt(Role::Argument, argument).collect(),
            NodeKind::Update { argument, .. } | NodeKind::Spread(argument) => {
                vec![(Role::Argument, &**argument)]
            }
            NodeKind::New { callee, arguments } | NodeKind::Call { callee, arguments } => {
                std::iter::once((Role::Callee, &**callee))
                    .chain(list(Role::CallArgument, arguments))
                    .collect()
            }
            NodeKind::Member {
                object, property, ..
            } => vec![(Role::Object, &**object), (Role::Property, &**property)],
            NodeKind::Object(entries) => list(Role::Entry, entries).collect(),
            NodeKind::Property { key, value, .. } => std::iter::once((Role::Key, &**key))
                .chain(opt(Role::Value, value))
                .collect(),
            NodeKind::Array(elements) => list(Role::Element, elements).collect(),
            NodeKind::Empty
            | NodeKind::Opaque
            | NodeKind::Identifier(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::Literal
            | NodeKind::Template => Vec::new(),
        }
    }
}

/// What to do after entering a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Visit the node's children
    Continue,
    /// Do not descend into this node
    SkipChildren,
}

/// Callback interface for [`walk`].
///
/// `'n` is the lifetime of the tree, so visitors may keep references to the
/// nodes they are shown.
pub trait Visitor<'n> {
    /// Called for every node before its children
    fn enter(&mut self, node: &'n Node, role: Role) -> Flow;
}

/// Depth-first, source-ordered traversal starting at `node`.
///
/// `role` is the role reported for `node` itself.
pub fn walk<'n, V: Visitor<'n> + ?Sized>(node: &'n Node, role: Role, visitor: &mut V) {
    // Explicit stack: long operator chains nest deeper than the call stack allows
    let mut stack = vec![(role, node)];
    while let Some((role, node)) = stack.pop() {
        if visitor.enter(node, role) == Flow::SkipChildren {
            continue;
        }
        stack.extend(node.children().into_iter().rev());
    }
}

/// A parsed script together with its source
#[derive(Debug, Clone)]
pub struct Script {
    source: String,
    root: Node,
}

impl Script {
    /// Parses `source`
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let root = parser::parse(&source)?;
        Ok(Self { source, root })
    }

    /// The `Program` node
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The text the script was parsed from
    pub fn text(&self) -> &str {
        &self.source
    }

    /// Original source text of `node`
    pub fn source_of(&self, node: &Node) -> &str {
        node.source(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder(Vec<(Role, String)>);

    impl<'n> Visitor<'n> for Recorder {
        fn enter(&mut self, node: &'n Node, role: Role) -> Flow {
            let label = match &node.kind {
                NodeKind::Identifier(name) => name.clone(),
                NodeKind::StringLiteral(value) => format!("'{}'", value),
                NodeKind::Object(_) => "{}".to_string(),
                _ => return Flow::Continue,
            };
            self.0.push((role, label));
            Flow::Continue
        }
    }

    #[test]
    fn test_walk_reports_roles_in_order() {
        let script = Script::parse("r['k'] = {a: b};").unwrap();
        let mut recorder = Recorder(Vec::new());
        walk(script.root(), Role::Root, &mut recorder);

        assert_eq!(
            recorder.0,
            vec![
                (Role::Object, "r".to_string()),
                (Role::Property, "'k'".to_string()),
                (Role::Right, "{}".to_string()),
                (Role::Key, "a".to_string()),
                (Role::Value, "b".to_string()),
            ]
        );
    }

    #[test]
    fn test_skip_children() {
        struct Skipper(usize);
        impl<'n> Visitor<'n> for Skipper {
            fn enter(&mut self, node: &'n Node, _role: Role) -> Flow {
                self.0 += 1;
                if matches!(node.kind, NodeKind::Object(_)) {
                    Flow::SkipChildren
                } else {
                    Flow::Continue
                }
            }
        }

        let script = Script::parse("({a: 1, b: 2})").unwrap();
        let mut skipper = Skipper(0);
        walk(script.root(), Role::Root, &mut skipper);
        // Program, ExpressionStatement, Object
        assert_eq!(skipper.0, 3);
    }

    #[test]
    fn test_source_recovery() {
        let src = "x = { \"a\" : [1, 2] } ;";
        let script = Script::parse(src).unwrap();
        let NodeKind::Program(body) = &script.root().kind else {
            panic!("expected program");
        };
        let NodeKind::ExpressionStatement(expr) = &body[0].kind else {
            panic!("expected expression statement");
        };
        let NodeKind::Assignment { right, .. } = &expr.kind else {
            panic!("expected assignment");
        };
        assert_eq!(script.source_of(right), "{ \"a\" : [1, 2] }");
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let src = format!("x = {};", vec!["a"; 2_000].join(" + "));
        let script = Script::parse(src).unwrap();
        let mut recorder = Recorder(Vec::new());
        walk(script.root(), Role::Root, &mut recorder);
        assert_eq!(recorder.0.len(), 2_001);
    }
}
