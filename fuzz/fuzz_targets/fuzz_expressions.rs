#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use dynsql::{named_params, NamedParams};

/// Comparison operators
#[derive(Debug, Arbitrary)]
enum CompOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

impl CompOp {
    fn sql(&self) -> &'static str {
        match self {
            CompOp::Eq => "==",
            CompOp::Ne => "!=",
            CompOp::Lt => "<",
            CompOp::Le => "<=",
            CompOp::Gt => ">",
            CompOp::Ge => ">=",
            CompOp::In => "in",
            CompOp::NotIn => "not in",
        }
    }
}

/// Arithmetic operators
#[derive(Debug, Arbitrary)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn sql(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

/// Operand forms
#[derive(Debug, Arbitrary)]
enum Operand {
    Int(i64),
    Float(u8),
    Text(u8),
    Null,
    Bool(bool),
    Path(u8),
    List(i16, i16),
    Arith(i16, ArithOp, i16),
}

impl Operand {
    fn sql(&self) -> String {
        match self {
            Operand::Int(n) => n.to_string(),
            Operand::Float(f) => format!("{}.{}", f / 10, f % 10),
            Operand::Text(s) => format!("'s{}'", s),
            Operand::Null => "null".to_string(),
            Operand::Bool(b) => b.to_string(),
            Operand::Path(p) => match p % 5 {
                0 => "id".to_string(),
                1 => "name".to_string(),
                2 => "user.age".to_string(),
                3 => "ids".to_string(),
                _ => "missing.field".to_string(),
            },
            Operand::List(a, b) => format!("({}, {})", a, b),
            Operand::Arith(a, op, b) => format!("{} {} {}", a, op.sql(), b),
        }
    }
}

/// Structured test expressions
#[derive(Debug, Arbitrary)]
enum TestExpr {
    Compare(Operand, CompOp, Operand),
    And(Box<TestExpr>, Box<TestExpr>),
    Or(Box<TestExpr>, Box<TestExpr>),
    Not(Box<TestExpr>),
    Group(Box<TestExpr>),
    Raw(String),
}

impl TestExpr {
    fn sql(&self) -> String {
        match self {
            TestExpr::Compare(l, op, r) => format!("{} {} {}", l.sql(), op.sql(), r.sql()),
            TestExpr::And(l, r) => format!("{} and {}", l.sql(), r.sql()),
            TestExpr::Or(l, r) => format!("{} or {}", l.sql(), r.sql()),
            TestExpr::Not(e) => format!("not {}", e.sql()),
            TestExpr::Group(e) => format!("({})", e.sql()),
            TestExpr::Raw(s) => s.clone(),
        }
    }
}

fn env() -> NamedParams {
    let mut params = named_params! {
        id: 7,
        name: "alice",
        ids: vec![1, 2, 3],
    };
    params.insert("user", dynsql::Value::map([("age", 30i64)]));
    params
}

fuzz_target!(|expr: TestExpr| {
    let text = expr.sql();
    // Parsing and evaluation must never panic, only return Ok or Err
    if let Ok(parsed) = dynsql::parse_expression(&text) {
        let _ = parsed.evaluate(&env());
        let _ = parsed.to_string();
    }
});
