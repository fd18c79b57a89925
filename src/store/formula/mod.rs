//! Selection formulas evaluated row by row against a tree.
//!
//! The grammar is C-like, in the spirit of tree-draw selections:
//! `pt > 50`, `(abs(eta) < 2.4)&&(nJet >= 2)`, `Jet_pt[0] > 30`,
//! `deltaR(Tau_eta[0], Tau_phi[0], Tau_eta[1], Tau_phi[1]) > 0.1`.
//!
//! Parsing produces an [`Expr`]; [`Formula::compile`] then resolves every
//! branch name to its column once, so per-row evaluation does no lookups.

mod lexer;
mod parser;

use std::f64::consts::PI;

pub use parser::{parse, BinaryOp, Expr, UnaryOp};

use super::file::Branch;

/// Errors raised while parsing or binding a formula.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid number '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("unexpected {found} at offset {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("array field '{0}' must be indexed or reduced, e.g. {0}[0] or len({0})")]
    UnindexedArray(String),

    #[error("scalar field '{0}' cannot be indexed")]
    IndexedScalar(String),

    #[error("'{0}' expects an array field as its argument")]
    ExpectedArray(String),

    #[error("expression nests more than {limit} levels deep")]
    TooDeep { limit: usize },

    #[error("expression has more than {limit} binary operators")]
    TooManyOperators { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MathFn {
    Abs,
    Sqrt,
    Exp,
    Log,
    Pow,
    Min,
    Max,
    DeltaPhi,
    DeltaR,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reduction {
    Len,
    Sum,
    Min,
    Max,
}

/// A bound formula node. Field references point straight at column data.
#[derive(Debug)]
enum Node<'t> {
    Const(f64),
    Scalar(&'t [f64]),
    Element {
        values: &'t [Vec<f64>],
        index: Box<Node<'t>>,
    },
    Reduce {
        op: Reduction,
        values: &'t [Vec<f64>],
    },
    Math {
        func: MathFn,
        args: Vec<Node<'t>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node<'t>>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Node<'t>>,
        rhs: Box<Node<'t>>,
    },
}

/// A formula bound to the columns of one tree.
#[derive(Debug)]
pub struct Formula<'t> {
    root: Node<'t>,
}

impl<'t> Formula<'t> {
    /// Parse `source` and resolve its fields through `lookup`.
    ///
    /// A blank source compiles to a formula that accepts every row.
    pub fn compile<F>(source: &str, lookup: F) -> Result<Self, FormulaError>
    where
        F: Fn(&str) -> Option<&'t Branch>,
    {
        if source.trim().is_empty() {
            return Ok(Self {
                root: Node::Const(1.0),
            });
        }
        let expr = parse(source)?;
        let root = bind(&expr, &lookup)?;
        Ok(Self { root })
    }

    /// Numeric value of the formula for `row`.
    pub fn evaluate(&self, row: usize) -> f64 {
        self.root.eval(row)
    }

    /// Whether `row` passes the formula (non-zero and not NaN).
    pub fn matches(&self, row: usize) -> bool {
        truthy(self.evaluate(row))
    }
}

fn bind<'t, F>(expr: &Expr, lookup: &F) -> Result<Node<'t>, FormulaError>
where
    F: Fn(&str) -> Option<&'t Branch>,
{
    match expr {
        Expr::Number(value) => Ok(Node::Const(*value)),
        Expr::Field { name, index } => {
            let branch = lookup(name).ok_or_else(|| FormulaError::UnknownField(name.clone()))?;
            match (branch, index) {
                (Branch::Scalar(values), None) => Ok(Node::Scalar(values.as_slice())),
                (Branch::Scalar(_), Some(_)) => Err(FormulaError::IndexedScalar(name.clone())),
                (Branch::Array(_), None) => Err(FormulaError::UnindexedArray(name.clone())),
                (Branch::Array(values), Some(index)) => Ok(Node::Element {
                    values: values.as_slice(),
                    index: Box::new(bind(index, lookup)?),
                }),
            }
        }
        Expr::Call { name, args } => bind_call(name, args, lookup),
        Expr::Unary { op, operand } => Ok(Node::Unary {
            op: *op,
            operand: Box::new(bind(operand, lookup)?),
        }),
        Expr::Binary { op, lhs, rhs } => Ok(Node::Binary {
            op: *op,
            lhs: Box::new(bind(lhs, lookup)?),
            rhs: Box::new(bind(rhs, lookup)?),
        }),
    }
}

fn bind_call<'t, F>(name: &str, args: &[Expr], lookup: &F) -> Result<Node<'t>, FormulaError>
where
    F: Fn(&str) -> Option<&'t Branch>,
{
    let reduction = match name {
        "len" => Some(Reduction::Len),
        "sum" => Some(Reduction::Sum),
        "min" if args.len() == 1 => Some(Reduction::Min),
        "max" if args.len() == 1 => Some(Reduction::Max),
        _ => None,
    };
    if let Some(op) = reduction {
        check_arity(name, args, "1", 1)?;
        let values = array_argument(name, &args[0], lookup)?;
        return Ok(Node::Reduce { op, values });
    }

    let (func, expected, count) = match name {
        "abs" => (MathFn::Abs, "1", 1),
        "sqrt" => (MathFn::Sqrt, "1", 1),
        "exp" => (MathFn::Exp, "1", 1),
        "log" => (MathFn::Log, "1", 1),
        "pow" => (MathFn::Pow, "2", 2),
        "min" => (MathFn::Min, "1 or 2", 2),
        "max" => (MathFn::Max, "1 or 2", 2),
        "deltaPhi" => (MathFn::DeltaPhi, "2", 2),
        "deltaR" => (MathFn::DeltaR, "4", 4),
        _ => return Err(FormulaError::UnknownFunction(name.to_string())),
    };
    check_arity(name, args, expected, count)?;
    let args = args
        .iter()
        .map(|arg| bind(arg, lookup))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Node::Math { func, args })
}

fn check_arity(
    name: &str,
    args: &[Expr],
    expected: &'static str,
    count: usize,
) -> Result<(), FormulaError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(FormulaError::Arity {
            name: name.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn array_argument<'t, F>(
    function: &str,
    arg: &Expr,
    lookup: &F,
) -> Result<&'t [Vec<f64>], FormulaError>
where
    F: Fn(&str) -> Option<&'t Branch>,
{
    let Expr::Field { name, index: None } = arg else {
        return Err(FormulaError::ExpectedArray(function.to_string()));
    };
    match lookup(name) {
        Some(Branch::Array(values)) => Ok(values.as_slice()),
        Some(Branch::Scalar(_)) => Err(FormulaError::ExpectedArray(function.to_string())),
        None => Err(FormulaError::UnknownField(name.clone())),
    }
}

impl Node<'_> {
    fn eval(&self, row: usize) -> f64 {
        match self {
            Node::Const(value) => *value,
            Node::Scalar(values) => values[row],
            Node::Element { values, index } => {
                let index = index.eval(row);
                if !index.is_finite() || index < 0.0 {
                    return f64::NAN;
                }
                values[row]
                    .get(index.trunc() as usize)
                    .copied()
                    .unwrap_or(f64::NAN)
            }
            Node::Reduce { op, values } => {
                let items = &values[row];
                match op {
                    Reduction::Len => items.len() as f64,
                    Reduction::Sum => items.iter().sum(),
                    Reduction::Min => items.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
                    Reduction::Max => items.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
                }
            }
            Node::Math { func, args } => {
                let arg = |i: usize| args[i].eval(row);
                match func {
                    MathFn::Abs => arg(0).abs(),
                    MathFn::Sqrt => arg(0).sqrt(),
                    MathFn::Exp => arg(0).exp(),
                    MathFn::Log => arg(0).ln(),
                    MathFn::Pow => arg(0).powf(arg(1)),
                    MathFn::Min => arg(0).min(arg(1)),
                    MathFn::Max => arg(0).max(arg(1)),
                    MathFn::DeltaPhi => delta_phi(arg(0), arg(1)),
                    MathFn::DeltaR => delta_r(arg(0), arg(1), arg(2), arg(3)),
                }
            }
            Node::Unary { op, operand } => {
                let value = operand.eval(row);
                match op {
                    UnaryOp::Neg => -value,
                    UnaryOp::Not => flag(!truthy(value)),
                }
            }
            Node::Binary { op, lhs, rhs } => {
                let l = lhs.eval(row);
                match op {
                    BinaryOp::And => flag(truthy(l) && truthy(rhs.eval(row))),
                    BinaryOp::Or => flag(truthy(l) || truthy(rhs.eval(row))),
                    BinaryOp::Eq => flag(l == rhs.eval(row)),
                    BinaryOp::NotEq => {
                        let r = rhs.eval(row);
                        flag(!l.is_nan() && !r.is_nan() && l != r)
                    }
                    BinaryOp::Lt => flag(l < rhs.eval(row)),
                    BinaryOp::Le => flag(l <= rhs.eval(row)),
                    BinaryOp::Gt => flag(l > rhs.eval(row)),
                    BinaryOp::Ge => flag(l >= rhs.eval(row)),
                    BinaryOp::Add => l + rhs.eval(row),
                    BinaryOp::Sub => l - rhs.eval(row),
                    BinaryOp::Mul => l * rhs.eval(row),
                    BinaryOp::Div => l / rhs.eval(row),
                    BinaryOp::Rem => l % rhs.eval(row),
                }
            }
        }
    }
}

fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Azimuthal difference wrapped into [-π, π).
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    (phi1 - phi2 + PI).rem_euclid(2.0 * PI) - PI
}

/// Angular distance in (eta, phi) space.
pub fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    let d_eta = eta1 - eta2;
    let d_phi = delta_phi(phi1, phi2);
    (d_eta * d_eta + d_phi * d_phi).sqrt()
}
