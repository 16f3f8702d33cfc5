//! AST definitions for Bishop.
//!
//! Expressions and statements form a single tagged union ([`Node`]); top
//! level definitions (functions, structs, errors, methods, externs, imports,
//! usings) are plain structs collected into a [`Program`]. Every node carries
//! its 1-based source line.
//!
//! `MethodCall` and `FieldAccess` nodes additionally carry a parser-assigned
//! [`NodeId`]. The type checker records the inferred receiver type for these
//! nodes in a side table keyed by that id, so the AST itself is never mutated
//! after parsing.

/// Identity of an AST node that receives a checker annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Whether a declaration is visible across module boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// A typed function or method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub type_name: String,
    pub name: String,
}

/// A struct or error field.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub type_name: String,
    pub doc_comment: String,
}

/// Loop flavour of a `for` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForKind {
    /// `for i in a..b { ... }`
    Range,
    /// `for x in expr { ... }`
    Each,
}

/// Handler attached to an or-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum OrHandler {
    /// `or return` / `or return value`
    Return(Option<Box<Node>>),
    /// `or fail <expr>` (string, error literal, `err` re-raise, bare type)
    Fail(Box<Node>),
    /// `or continue`
    Continue,
    /// `or break`
    Break,
    /// `or { statements }`
    Block(Vec<Node>),
    /// `or match err { Type => body, _ => body }`
    Match(Vec<OrMatchArm>),
}

/// One arm of an `or match` handler. The error type `_` marks the default
/// arm; the body is either a value expression or a fail expression.
#[derive(Debug, Clone, PartialEq)]
pub struct OrMatchArm {
    pub error_type: String,
    pub body: Box<Node>,
}

/// One arm of a `select` statement: an optional binding, the channel
/// receive expression, and the arm body.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectArm {
    pub binding: Option<String>,
    pub channel: Box<Node>,
    pub body: Vec<Node>,
    pub line: usize,
}

/// The closed sum of Bishop expression and statement nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // literals
    NumberLiteral {
        value: String,
        line: usize,
    },
    FloatLiteral {
        value: String,
        line: usize,
    },
    StringLiteral {
        value: String,
        line: usize,
    },
    BoolLiteral {
        value: bool,
        line: usize,
    },
    NoneLiteral {
        line: usize,
    },
    ListLiteral {
        elements: Vec<Node>,
        line: usize,
    },
    MapLiteral {
        entries: Vec<(Node, Node)>,
        line: usize,
    },
    SetLiteral {
        elements: Vec<Node>,
        line: usize,
    },

    // references
    VariableRef {
        name: String,
        line: usize,
    },
    FunctionRef {
        name: String,
        line: usize,
    },
    QualifiedRef {
        module: String,
        name: String,
        line: usize,
    },
    FieldAccess {
        id: NodeId,
        object: Box<Node>,
        field: String,
        line: usize,
    },
    FieldAssignment {
        id: NodeId,
        object: Box<Node>,
        field: String,
        value: Box<Node>,
        line: usize,
    },
    AddressOf {
        value: Box<Node>,
        line: usize,
    },

    // calls
    FunctionCall {
        name: String,
        args: Vec<Node>,
        line: usize,
    },
    MethodCall {
        id: NodeId,
        object: Box<Node>,
        method: String,
        args: Vec<Node>,
        line: usize,
    },
    LambdaCall {
        callee: Box<Node>,
        args: Vec<Node>,
        line: usize,
    },

    // arithmetic / logic
    BinaryExpr {
        op: String,
        left: Box<Node>,
        right: Box<Node>,
        line: usize,
    },
    NotExpr {
        value: Box<Node>,
        line: usize,
    },
    NegateExpr {
        value: Box<Node>,
        line: usize,
    },
    ParenExpr {
        value: Box<Node>,
        line: usize,
    },
    IsNone {
        value: Box<Node>,
        line: usize,
    },

    // async / channels
    AwaitExpr {
        value: Box<Node>,
        line: usize,
    },
    ChannelCreate {
        element_type: String,
        capacity: Option<Box<Node>>,
        line: usize,
    },
    GoSpawn {
        call: Box<Node>,
        line: usize,
    },
    SelectStmt {
        arms: Vec<SelectArm>,
        line: usize,
    },

    // containers
    ListCreate {
        element_type: String,
        line: usize,
    },
    PairCreate {
        element_type: String,
        first: Box<Node>,
        second: Box<Node>,
        line: usize,
    },
    TupleCreate {
        element_type: String,
        elements: Vec<Node>,
        line: usize,
    },
    MapCreate {
        key_type: String,
        value_type: String,
        line: usize,
    },
    SetCreate {
        element_type: String,
        line: usize,
    },
    DequeCreate {
        element_type: String,
        line: usize,
    },
    StackCreate {
        element_type: String,
        line: usize,
    },
    QueueCreate {
        element_type: String,
        line: usize,
    },
    PriorityQueueCreate {
        element_type: String,
        is_min_heap: bool,
        line: usize,
    },

    // declarations and control flow
    VariableDecl {
        /// Declared type; empty for `:=` inferred declarations.
        type_name: String,
        name: String,
        value: Box<Node>,
        is_optional: bool,
        is_const: bool,
        line: usize,
    },
    Assignment {
        name: String,
        value: Box<Node>,
        line: usize,
    },
    ReturnStmt {
        value: Option<Box<Node>>,
        line: usize,
    },
    FailStmt {
        value: Box<Node>,
        line: usize,
    },
    IfStmt {
        condition: Box<Node>,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
        line: usize,
    },
    WhileStmt {
        condition: Box<Node>,
        body: Vec<Node>,
        line: usize,
    },
    ForStmt {
        kind: ForKind,
        loop_var: String,
        range_start: Option<Box<Node>>,
        range_end: Option<Box<Node>>,
        iterable: Option<Box<Node>>,
        body: Vec<Node>,
        line: usize,
    },
    BreakStmt {
        line: usize,
    },
    ContinueStmt {
        line: usize,
    },
    WithStmt {
        resource: Box<Node>,
        binding: String,
        body: Vec<Node>,
        line: usize,
    },
    LambdaExpr {
        params: Vec<Param>,
        return_type: String,
        body: Vec<Node>,
        line: usize,
    },

    // error handling
    OrExpr {
        expr: Box<Node>,
        handler: OrHandler,
        line: usize,
    },
    DefaultExpr {
        expr: Box<Node>,
        fallback: Box<Node>,
        line: usize,
    },

    StructLiteral {
        struct_name: String,
        field_values: Vec<(String, Node)>,
        line: usize,
    },
}

impl Node {
    /// The 1-based source line this node starts on.
    pub fn line(&self) -> usize {
        match self {
            Node::NumberLiteral { line, .. }
            | Node::FloatLiteral { line, .. }
            | Node::StringLiteral { line, .. }
            | Node::BoolLiteral { line, .. }
            | Node::NoneLiteral { line }
            | Node::ListLiteral { line, .. }
            | Node::MapLiteral { line, .. }
            | Node::SetLiteral { line, .. }
            | Node::VariableRef { line, .. }
            | Node::FunctionRef { line, .. }
            | Node::QualifiedRef { line, .. }
            | Node::FieldAccess { line, .. }
            | Node::FieldAssignment { line, .. }
            | Node::AddressOf { line, .. }
            | Node::FunctionCall { line, .. }
            | Node::MethodCall { line, .. }
            | Node::LambdaCall { line, .. }
            | Node::BinaryExpr { line, .. }
            | Node::NotExpr { line, .. }
            | Node::NegateExpr { line, .. }
            | Node::ParenExpr { line, .. }
            | Node::IsNone { line, .. }
            | Node::AwaitExpr { line, .. }
            | Node::ChannelCreate { line, .. }
            | Node::GoSpawn { line, .. }
            | Node::SelectStmt { line, .. }
            | Node::ListCreate { line, .. }
            | Node::PairCreate { line, .. }
            | Node::TupleCreate { line, .. }
            | Node::MapCreate { line, .. }
            | Node::SetCreate { line, .. }
            | Node::DequeCreate { line, .. }
            | Node::StackCreate { line, .. }
            | Node::QueueCreate { line, .. }
            | Node::PriorityQueueCreate { line, .. }
            | Node::VariableDecl { line, .. }
            | Node::Assignment { line, .. }
            | Node::ReturnStmt { line, .. }
            | Node::FailStmt { line, .. }
            | Node::IfStmt { line, .. }
            | Node::WhileStmt { line, .. }
            | Node::ForStmt { line, .. }
            | Node::BreakStmt { line }
            | Node::ContinueStmt { line }
            | Node::WithStmt { line, .. }
            | Node::LambdaExpr { line, .. }
            | Node::OrExpr { line, .. }
            | Node::DefaultExpr { line, .. }
            | Node::StructLiteral { line, .. } => *line,
        }
    }
}

/// A function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: String,
    /// Non-empty iff the function is fallible (`-> T or err`).
    pub error_type: String,
    /// Set when the body syntactically uses await, channels, go or select.
    pub is_async: bool,
    pub visibility: Visibility,
    pub doc_comment: String,
    pub body: Vec<Node>,
    pub line: usize,
}

/// A struct definition: `Name :: struct { field type, ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<StructField>,
    pub visibility: Visibility,
    pub doc_comment: String,
    pub line: usize,
}

/// An error definition: `Name :: err { field type, ... }`. Semantically a
/// struct that extends the runtime error base.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDef {
    pub name: String,
    pub fields: Vec<StructField>,
    pub visibility: Visibility,
    pub doc_comment: String,
    pub line: usize,
}

/// A method definition: `Struct :: name(self, ...) -> T { body }`.
/// Static methods (`@static`) omit `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub struct_name: String,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: String,
    pub error_type: String,
    pub is_static: bool,
    pub is_async: bool,
    pub visibility: Visibility,
    pub doc_comment: String,
    pub body: Vec<Node>,
    pub line: usize,
}

/// An extern function declaration: `@extern("lib") fn name(...) -> T;`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternFunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: String,
    pub library: String,
    pub visibility: Visibility,
    pub doc_comment: String,
    pub line: usize,
}

/// `import path.to.module;`; the alias is the last path segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportStmt {
    pub module_path: String,
    pub alias: String,
    pub line: usize,
}

/// One `module.member` entry of a using statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UsingMember {
    pub module_alias: String,
    pub member_name: String,
}

/// `using module.a, module.b;` or `using module.*;`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsingStmt {
    pub members: Vec<UsingMember>,
    pub is_wildcard: bool,
    pub wildcard_module: String,
    pub line: usize,
}

/// A complete parsed source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub imports: Vec<ImportStmt>,
    pub usings: Vec<UsingStmt>,
    pub structs: Vec<StructDef>,
    pub errors: Vec<ErrorDef>,
    pub functions: Vec<FunctionDef>,
    pub methods: Vec<MethodDef>,
    pub externs: Vec<ExternFunctionDef>,
    /// Module-level const declarations (`Node::VariableDecl` nodes).
    pub constants: Vec<Node>,
}
