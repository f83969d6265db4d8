//! Abstract syntax tree for Rill programs

use super::token::Span;

/// A parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Top-level statements in source order
    pub statements: Vec<Statement>,
    /// Span of the whole program
    pub span: Span,
}

/// Block of statements delimited by braces
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Statements inside the block
    pub statements: Vec<Statement>,
    /// Span from `{` to `}`
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let name = value;`
    Let {
        /// Bound name
        name: String,
        /// Initializer
        value: Expression,
        /// Source span
        span: Span,
    },

    /// `name = value;`
    Assign {
        /// Target name
        name: String,
        /// Assigned value
        value: Expression,
        /// Source span
        span: Span,
    },

    /// `fn name(params) { body }`
    Function(FunctionDecl),

    /// `if cond { } else { }`
    If {
        /// Condition
        condition: Expression,
        /// Taken when the condition is truthy
        then_branch: Block,
        /// `else` block; `else if` is an else block holding a single `if`
        else_branch: Option<Block>,
        /// Source span
        span: Span,
    },

    /// `while cond { }`
    While {
        /// Loop condition
        condition: Expression,
        /// Loop body
        body: Block,
        /// Source span
        span: Span,
    },

    /// `return value?;`
    Return {
        /// Returned value, `nil` when absent
        value: Option<Expression>,
        /// Source span
        span: Span,
    },

    /// `raise value;`
    Raise {
        /// Exception or message
        value: Expression,
        /// Source span
        span: Span,
    },

    /// `try { } catch (name) { }`
    Try {
        /// Protected block
        body: Block,
        /// Name bound to the caught exception
        binding: String,
        /// Handler block
        handler: Block,
        /// Source span
        span: Span,
    },

    /// Expression evaluated for its value or side effects
    Expression {
        /// The expression
        expr: Expression,
        /// Source span
        span: Span,
    },
}

impl Statement {
    /// Source span of the statement
    pub fn span(&self) -> &Span {
        match self {
            Statement::Let { span, .. }
            | Statement::Assign { span, .. }
            | Statement::If { span, .. }
            | Statement::While { span, .. }
            | Statement::Return { span, .. }
            | Statement::Raise { span, .. }
            | Statement::Try { span, .. }
            | Statement::Expression { span, .. } => span,
            Statement::Function(decl) => &decl.span,
        }
    }
}

/// Function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Method name
    pub name: String,
    /// Parameter names
    pub params: Vec<String>,
    /// Body
    pub body: Block,
    /// Source span
    pub span: Span,
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal
    Int(i64, Span),
    /// Float literal
    Float(f64, Span),
    /// String literal
    Str(String, Span),
    /// `true` / `false`
    Bool(bool, Span),
    /// `nil`
    Nil(Span),
    /// `self`
    SelfRef(Span),
    /// Variable reference
    Identifier(String, Span),
    /// `callee(args)`
    Call {
        /// Method name
        callee: String,
        /// Arguments
        args: Vec<Expression>,
        /// Source span
        span: Span,
    },
    /// Prefix operator
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expression>,
        /// Source span
        span: Span,
    },
    /// Infix operator
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Expression>,
        /// Right operand
        right: Box<Expression>,
        /// Source span
        span: Span,
    },
}

impl Expression {
    /// Source span of the expression
    pub fn span(&self) -> &Span {
        match self {
            Expression::Int(_, span)
            | Expression::Float(_, span)
            | Expression::Str(_, span)
            | Expression::Bool(_, span)
            | Expression::Nil(span)
            | Expression::SelfRef(span)
            | Expression::Identifier(_, span) => span,
            Expression::Call { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. } => span,
        }
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Negate,
    /// `!`
    Not,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Short-circuit `&&`
    And,
    /// Short-circuit `||`
    Or,
}
