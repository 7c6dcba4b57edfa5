//! Query expression trees
//!
//! The front-end parser produces a [`QueryTree`]; the planner never parses
//! text. Trees are plain immutable values and deserialize from JSON, e.g.
//!
//! ```json
//! {"binary": {"op": "=", "left": {"property": "title"}, "right": {"parameter": "t"}}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::native::SortDirection;
use crate::value::QueryValue;

/// Dotted property path such as `author.last`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Drops a leading candidate alias (`b.title` with alias `b` is `title`).
    pub fn without_alias(&self, alias: Option<&str>) -> &[String] {
        match (alias, self.0.split_first()) {
            (Some(alias), Some((first, rest))) if first == alias && !rest.is_empty() => rest,
            _ => &self.0,
        }
    }

    /// True if the path is exactly the candidate alias
    pub fn is_alias(&self, alias: Option<&str>) -> bool {
        matches!((alias, self.0.as_slice()), (Some(alias), [only]) if only == alias)
    }
}

impl From<String> for PropertyPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<PropertyPath> for String {
    fn from(p: PropertyPath) -> Self {
        p.0.join(".")
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Reference to a bound parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamRef {
    /// `?1`
    Positional(u32),
    /// `:name`
    Named(String),
}

impl fmt::Display for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamRef::Positional(i) => write!(f, "?{}", i),
            ParamRef::Named(name) => write!(f, ":{}", name),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "||")]
    Concat,
    /// Identity comparison (`instanceof`-style)
    #[serde(rename = "IS")]
    Is,
    #[serde(rename = "IS NOT")]
    IsNot,
}

impl Operator {
    /// Source token
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Concat => "||",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte
        )
    }

    /// The operator with its operands swapped (`a < b` is `b > a`).
    pub fn mirrored(&self) -> Operator {
        match self {
            Operator::Lt => Operator::Gt,
            Operator::Lte => Operator::Gte,
            Operator::Gt => Operator::Lt,
            Operator::Gte => Operator::Lte,
            other => *other,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "NOT")]
    Not,
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "~")]
    Complement,
}

impl UnaryOperator {
    pub fn token(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::Neg => "-",
            UnaryOperator::Complement => "~",
        }
    }
}

/// Boolean combinators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn token(&self) -> &'static str {
        match self {
            BoolOperator::And => "AND",
            BoolOperator::Or => "OR",
        }
    }
}

/// Expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Property(PropertyPath),
    Literal(QueryValue),
    Parameter(ParamRef),
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Bool {
        op: BoolOperator,
        children: Vec<Expr>,
    },
    In {
        operand: Box<Expr>,
        values: Vec<Expr>,
    },
    MemberOf {
        element: Box<Expr>,
        collection: Box<Expr>,
    },
    Like {
        operand: Box<Expr>,
        pattern: Box<Expr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        escape: Option<Box<Expr>>,
    },
    IsNull {
        operand: Box<Expr>,
        #[serde(default)]
        negated: bool,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Function {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn prop(path: &str) -> Expr {
        Expr::Property(PropertyPath::parse(path))
    }

    pub fn lit(value: impl Into<QueryValue>) -> Expr {
        Expr::Literal(value.into())
    }

    /// Named parameter `:name`
    pub fn param(name: &str) -> Expr {
        Expr::Parameter(ParamRef::Named(name.to_string()))
    }

    /// Positional parameter `?n`
    pub fn positional(index: u32) -> Expr {
        Expr::Parameter(ParamRef::Positional(index))
    }

    pub fn binary(op: Operator, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(children: Vec<Expr>) -> Expr {
        Expr::Bool {
            op: BoolOperator::And,
            children,
        }
    }

    pub fn or(children: Vec<Expr>) -> Expr {
        Expr::Bool {
            op: BoolOperator::Or,
            children,
        }
    }

    pub fn not(operand: Expr) -> Expr {
        Expr::Unary {
            op: UnaryOperator::Not,
            operand: Box::new(operand),
        }
    }

    pub fn neg(operand: Expr) -> Expr {
        Expr::Unary {
            op: UnaryOperator::Neg,
            operand: Box::new(operand),
        }
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Expr {
        Expr::Function {
            name: name.to_string(),
            args,
        }
    }

    pub fn eq(self, rhs: Expr) -> Expr {
        Expr::binary(Operator::Eq, self, rhs)
    }

    pub fn ne(self, rhs: Expr) -> Expr {
        Expr::binary(Operator::Ne, self, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Expr {
        Expr::binary(Operator::Lt, self, rhs)
    }

    pub fn lte(self, rhs: Expr) -> Expr {
        Expr::binary(Operator::Lte, self, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Expr {
        Expr::binary(Operator::Gt, self, rhs)
    }

    pub fn gte(self, rhs: Expr) -> Expr {
        Expr::binary(Operator::Gte, self, rhs)
    }

    pub fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            operand: Box::new(self),
            values,
        }
    }

    pub fn member_of(self, collection: Expr) -> Expr {
        Expr::MemberOf {
            element: Box::new(self),
            collection: Box::new(collection),
        }
    }

    pub fn like(self, pattern: Expr) -> Expr {
        Expr::Like {
            operand: Box::new(self),
            pattern: Box::new(pattern),
            escape: None,
        }
    }

    pub fn like_escape(self, pattern: Expr, escape: Expr) -> Expr {
        Expr::Like {
            operand: Box::new(self),
            pattern: Box::new(pattern),
            escape: Some(Box::new(escape)),
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            operand: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNull {
            operand: Box::new(self),
            negated: true,
        }
    }
}

/// One ORDER BY item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExpr {
    pub expr: Expr,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Statement a query tree was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    #[default]
    Select,
    /// Bulk update, never translated
    Update,
    /// Bulk delete, never translated
    Delete,
}

impl StatementKind {
    pub fn token(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }
}

/// A parsed object query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTree {
    /// Source text, carried into diagnostics
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub statement: StatementKind,
    /// Candidate entity name
    pub candidate: String,
    /// Candidate alias (`b` in `SELECT b FROM Book b`)
    #[serde(default)]
    pub alias: Option<String>,
    /// Result clause; empty means whole entities
    #[serde(default)]
    pub result: Vec<Expr>,
    #[serde(default)]
    pub filter: Option<Expr>,
    #[serde(default)]
    pub ordering: Vec<OrderExpr>,
    #[serde(default)]
    pub grouping: Vec<Expr>,
    #[serde(default)]
    pub having: Option<Expr>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl QueryTree {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            statement: StatementKind::Select,
            candidate: candidate.into(),
            alias: None,
            result: Vec::new(),
            filter: None,
            ordering: Vec::new(),
            grouping: Vec::new(),
            having: None,
            offset: None,
            limit: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_statement(mut self, statement: StatementKind) -> Self {
        self.statement = statement;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn select(mut self, expr: Expr) -> Self {
        self.result.push(expr);
        self
    }

    pub fn filter(mut self, expr: Expr) -> Self {
        self.filter = Some(expr);
        self
    }

    pub fn order_by(mut self, expr: Expr, direction: SortDirection) -> Self {
        self.ordering.push(OrderExpr { expr, direction });
        self
    }

    pub fn group_by(mut self, expr: Expr) -> Self {
        self.grouping.push(expr);
        self
    }

    pub fn having(mut self, expr: Expr) -> Self {
        self.having = Some(expr);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}
