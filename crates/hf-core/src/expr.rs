//! Expression and predicate trees over named real variables.
//!
//! Expressions are plain data: a tree of variable references, constants,
//! literals and operators. Anything that needs to walk a tree (evaluation,
//! printing, collecting variables) implements [`ExprVisitor`]. Numeric
//! evaluation is generic over [`Arithmetic`], so the same model can be
//! evaluated at points (`f64`) or over boxes ([`Interval`]).

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};
use std::collections::BTreeSet;

use crate::error::{HfError, HfResult};
use crate::interval::Interval;
use crate::numeric::Real;
use crate::symbols::{RealConstant, RealVariable};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Cos,
    Sin,
    Sqrt,
}

/// Real-valued expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Variable(RealVariable),
    Constant(RealConstant),
    Literal(Real),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
}

/// Numeric domain an expression can be evaluated in.
pub trait Arithmetic:
    Clone
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    fn from_real(x: Real) -> Self;
    fn cos(&self) -> Self;
    fn sin(&self) -> Self;
    fn sqrt(&self) -> Self;
    /// Decide `lhs op rhs` in this domain.
    fn compare(op: CmpOp, lhs: &Self, rhs: &Self) -> Tribool;
}

impl Arithmetic for Real {
    fn from_real(x: Real) -> Self {
        x
    }

    fn cos(&self) -> Self {
        Real::cos(*self)
    }

    fn sin(&self) -> Self {
        Real::sin(*self)
    }

    fn sqrt(&self) -> Self {
        Real::sqrt(*self)
    }

    fn compare(op: CmpOp, lhs: &Self, rhs: &Self) -> Tribool {
        let holds = match op {
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
        };
        Tribool::from(holds)
    }
}

impl Arithmetic for Interval {
    fn from_real(x: Real) -> Self {
        Interval::point(x)
    }

    fn cos(&self) -> Self {
        Interval::cos(self)
    }

    fn sin(&self) -> Self {
        Interval::sin(self)
    }

    fn sqrt(&self) -> Self {
        Interval::sqrt(self)
    }

    fn compare(op: CmpOp, lhs: &Self, rhs: &Self) -> Tribool {
        // Reduce everything to `a <= b` / `a < b`.
        let (a, b, strict) = match op {
            CmpOp::Le => (lhs, rhs, false),
            CmpOp::Lt => (lhs, rhs, true),
            CmpOp::Ge => (rhs, lhs, false),
            CmpOp::Gt => (rhs, lhs, true),
        };
        let definitely = if strict {
            a.upper() < b.lower()
        } else {
            a.upper() <= b.lower()
        };
        let never = if strict {
            a.lower() >= b.upper()
        } else {
            a.lower() > b.upper()
        };
        if definitely {
            Tribool::True
        } else if never {
            Tribool::False
        } else {
            Tribool::Indeterminate
        }
    }
}

/// Post-order visitor over an expression tree.
pub trait ExprVisitor {
    type Output;

    fn variable(&mut self, variable: &RealVariable) -> Self::Output;
    fn constant(&mut self, constant: &RealConstant) -> Self::Output;
    fn literal(&mut self, value: Real) -> Self::Output;
    fn binary(&mut self, op: BinaryOp, lhs: Self::Output, rhs: Self::Output) -> Self::Output;
    fn unary(&mut self, op: UnaryOp, arg: Self::Output) -> Self::Output;
}

struct Evaluator<'a, T> {
    env: &'a dyn Fn(&str) -> Option<T>,
}

impl<T: Arithmetic> ExprVisitor for Evaluator<'_, T> {
    type Output = HfResult<T>;

    fn variable(&mut self, variable: &RealVariable) -> HfResult<T> {
        (self.env)(variable.name()).ok_or_else(|| HfError::UnknownVariable {
            name: variable.name().to_string(),
        })
    }

    fn constant(&mut self, constant: &RealConstant) -> HfResult<T> {
        Ok(T::from_real(constant.value()))
    }

    fn literal(&mut self, value: Real) -> HfResult<T> {
        Ok(T::from_real(value))
    }

    fn binary(&mut self, op: BinaryOp, lhs: HfResult<T>, rhs: HfResult<T>) -> HfResult<T> {
        let (lhs, rhs) = (lhs?, rhs?);
        Ok(match op {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
        })
    }

    fn unary(&mut self, op: UnaryOp, arg: HfResult<T>) -> HfResult<T> {
        let arg = arg?;
        Ok(match op {
            UnaryOp::Neg => -arg,
            UnaryOp::Cos => arg.cos(),
            UnaryOp::Sin => arg.sin(),
            UnaryOp::Sqrt => arg.sqrt(),
        })
    }
}

#[derive(Default)]
struct VariableCollector {
    names: BTreeSet<String>,
}

impl ExprVisitor for VariableCollector {
    type Output = ();

    fn variable(&mut self, variable: &RealVariable) {
        self.names.insert(variable.name().to_string());
    }

    fn constant(&mut self, _constant: &RealConstant) {}

    fn literal(&mut self, _value: Real) {}

    fn binary(&mut self, _op: BinaryOp, _lhs: (), _rhs: ()) {}

    fn unary(&mut self, _op: UnaryOp, _arg: ()) {}
}

struct Printer;

impl ExprVisitor for Printer {
    type Output = String;

    fn variable(&mut self, variable: &RealVariable) -> String {
        variable.name().to_string()
    }

    fn constant(&mut self, constant: &RealConstant) -> String {
        constant.name().to_string()
    }

    fn literal(&mut self, value: Real) -> String {
        value.to_string()
    }

    fn binary(&mut self, op: BinaryOp, lhs: String, rhs: String) -> String {
        format!("({lhs}{}{rhs})", op.symbol())
    }

    fn unary(&mut self, op: UnaryOp, arg: String) -> String {
        match op {
            UnaryOp::Neg => format!("-{arg}"),
            UnaryOp::Cos => format!("cos({arg})"),
            UnaryOp::Sin => format!("sin({arg})"),
            UnaryOp::Sqrt => format!("sqrt({arg})"),
        }
    }
}

impl Expr {
    /// Walk the tree bottom-up.
    pub fn accept<V: ExprVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Expr::Variable(v) => visitor.variable(v),
            Expr::Constant(c) => visitor.constant(c),
            Expr::Literal(x) => visitor.literal(*x),
            Expr::Binary(op, lhs, rhs) => {
                let l = lhs.accept(visitor);
                let r = rhs.accept(visitor);
                visitor.binary(*op, l, r)
            }
            Expr::Unary(op, arg) => {
                let a = arg.accept(visitor);
                visitor.unary(*op, a)
            }
        }
    }

    /// Evaluate with variable values looked up in `env`.
    pub fn evaluate<T: Arithmetic>(&self, env: &dyn Fn(&str) -> Option<T>) -> HfResult<T> {
        self.accept(&mut Evaluator { env })
    }

    /// Names of all variables the expression reads.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut collector = VariableCollector::default();
        self.accept(&mut collector);
        collector.names
    }

    /// Partial derivative with respect to the variable called `name`.
    ///
    /// Zero and unit literals are folded while differentiating, so the
    /// derivatives of linear dynamics reduce to constants.
    pub fn derivative(&self, name: &str) -> Expr {
        match self {
            Expr::Variable(v) if v.name() == name => lit(1.0),
            Expr::Variable(_) | Expr::Constant(_) | Expr::Literal(_) => lit(0.0),
            Expr::Binary(op, a, b) => {
                let (da, db) = (a.derivative(name), b.derivative(name));
                let (a, b) = (a.as_ref().clone(), b.as_ref().clone());
                match op {
                    BinaryOp::Add => fold_add(da, db),
                    BinaryOp::Sub => fold_sub(da, db),
                    BinaryOp::Mul => fold_add(fold_mul(da, b), fold_mul(a, db)),
                    BinaryOp::Div if is_literal(&db, 0.0) => fold_div(da, b),
                    BinaryOp::Div => fold_div(
                        fold_sub(fold_mul(da, b.clone()), fold_mul(a, db)),
                        fold_mul(b.clone(), b),
                    ),
                }
            }
            Expr::Unary(op, a) => {
                let da = a.derivative(name);
                let a = a.as_ref().clone();
                match op {
                    UnaryOp::Neg => fold_neg(da),
                    UnaryOp::Cos => fold_mul(fold_neg(sin(a)), da),
                    UnaryOp::Sin => fold_mul(cos(a), da),
                    UnaryOp::Sqrt => fold_div(da, fold_mul(lit(2.0), sqrt(a))),
                }
            }
        }
    }

    /// Rate of change of `self` along the vector field `field`, given as
    /// `(variable, rate)` pairs: the sum of `∂self/∂x · ẋ`.
    pub fn lie_derivative(&self, field: &[(String, Expr)]) -> Expr {
        field.iter().fold(lit(0.0), |acc, (name, rate)| {
            fold_add(acc, fold_mul(self.derivative(name), rate.clone()))
        })
    }

    pub fn le(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::Compare(CmpOp::Le, self, rhs.into())
    }

    pub fn ge(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::Compare(CmpOp::Ge, self, rhs.into())
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::Compare(CmpOp::Lt, self, rhs.into())
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Predicate {
        Predicate::Compare(CmpOp::Gt, self, rhs.into())
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    fn unary(op: UnaryOp, arg: Expr) -> Expr {
        Expr::Unary(op, Box::new(arg))
    }
}

fn is_literal(expr: &Expr, value: Real) -> bool {
    matches!(expr, Expr::Literal(x) if *x == value)
}

fn fold_add(a: Expr, b: Expr) -> Expr {
    if is_literal(&a, 0.0) {
        b
    } else if is_literal(&b, 0.0) {
        a
    } else {
        Expr::binary(BinaryOp::Add, a, b)
    }
}

fn fold_sub(a: Expr, b: Expr) -> Expr {
    if is_literal(&b, 0.0) {
        a
    } else if is_literal(&a, 0.0) {
        fold_neg(b)
    } else {
        Expr::binary(BinaryOp::Sub, a, b)
    }
}

fn fold_mul(a: Expr, b: Expr) -> Expr {
    if is_literal(&a, 0.0) || is_literal(&b, 0.0) {
        lit(0.0)
    } else if is_literal(&a, 1.0) {
        b
    } else if is_literal(&b, 1.0) {
        a
    } else {
        Expr::binary(BinaryOp::Mul, a, b)
    }
}

fn fold_div(a: Expr, b: Expr) -> Expr {
    if is_literal(&a, 0.0) {
        lit(0.0)
    } else if is_literal(&b, 1.0) {
        a
    } else {
        Expr::binary(BinaryOp::Div, a, b)
    }
}

fn fold_neg(a: Expr) -> Expr {
    if is_literal(&a, 0.0) {
        a
    } else {
        Expr::unary(UnaryOp::Neg, a)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.accept(&mut Printer))
    }
}

pub fn var(variable: &RealVariable) -> Expr {
    Expr::Variable(variable.clone())
}

pub fn lit(value: Real) -> Expr {
    Expr::Literal(value)
}

pub fn constant(constant: &RealConstant) -> Expr {
    Expr::Constant(constant.clone())
}

pub fn cos(arg: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Cos, arg.into())
}

pub fn sin(arg: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Sin, arg.into())
}

pub fn sqrt(arg: impl Into<Expr>) -> Expr {
    Expr::unary(UnaryOp::Sqrt, arg.into())
}

impl From<&RealVariable> for Expr {
    fn from(v: &RealVariable) -> Self {
        var(v)
    }
}

impl From<&RealConstant> for Expr {
    fn from(c: &RealConstant) -> Self {
        constant(c)
    }
}

impl From<Real> for Expr {
    fn from(x: Real) -> Self {
        lit(x)
    }
}

macro_rules! impl_binary_ops {
    ($($trait:ident::$method:ident => $op:ident),* $(,)?) => {
        $(
            impl<R: Into<Expr>> $trait<R> for Expr {
                type Output = Expr;

                fn $method(self, rhs: R) -> Expr {
                    Expr::binary(BinaryOp::$op, self, rhs.into())
                }
            }

            impl $trait<Expr> for Real {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Expr {
                    Expr::binary(BinaryOp::$op, lit(self), rhs)
                }
            }
        )*
    };
}

impl_binary_ops!(
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Le,
    Ge,
    Lt,
    Gt,
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
        }
    }
}

/// Three-valued truth used when deciding predicates over intervals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tribool {
    True,
    False,
    Indeterminate,
}

impl Tribool {
    pub fn definitely(self) -> bool {
        self == Tribool::True
    }

    pub fn possibly(self) -> bool {
        self != Tribool::False
    }

    pub fn and(self, other: Tribool) -> Tribool {
        match (self, other) {
            (Tribool::False, _) | (_, Tribool::False) => Tribool::False,
            (Tribool::True, Tribool::True) => Tribool::True,
            _ => Tribool::Indeterminate,
        }
    }

    pub fn or(self, other: Tribool) -> Tribool {
        match (self, other) {
            (Tribool::True, _) | (_, Tribool::True) => Tribool::True,
            (Tribool::False, Tribool::False) => Tribool::False,
            _ => Tribool::Indeterminate,
        }
    }

    pub fn not(self) -> Tribool {
        match self {
            Tribool::True => Tribool::False,
            Tribool::False => Tribool::True,
            Tribool::Indeterminate => Tribool::Indeterminate,
        }
    }
}

impl From<bool> for Tribool {
    fn from(b: bool) -> Self {
        if b { Tribool::True } else { Tribool::False }
    }
}

/// Boolean constraint over real expressions (guards, invariants).
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Compare(CmpOp, Expr, Expr),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Decide the predicate in domain `T`.
    pub fn decide<T: Arithmetic>(&self, env: &dyn Fn(&str) -> Option<T>) -> HfResult<Tribool> {
        Ok(match self {
            Predicate::Compare(op, lhs, rhs) => {
                let l = lhs.evaluate(env)?;
                let r = rhs.evaluate(env)?;
                T::compare(*op, &l, &r)
            }
            Predicate::And(a, b) => a.decide(env)?.and(b.decide(env)?),
            Predicate::Or(a, b) => a.decide(env)?.or(b.decide(env)?),
            Predicate::Not(a) => a.decide(env)?.not(),
        })
    }

    /// Point evaluation.
    pub fn holds(&self, env: &dyn Fn(&str) -> Option<Real>) -> HfResult<bool> {
        Ok(self.decide(env)?.definitely())
    }

    /// Signed margin `g` such that the predicate holds iff `g <= 0`, for a
    /// single comparison. Used to locate guard crossings.
    pub fn margin(&self, env: &dyn Fn(&str) -> Option<Real>) -> HfResult<Option<Real>> {
        match self {
            Predicate::Compare(op, lhs, rhs) => {
                let l = lhs.evaluate(env)?;
                let r = rhs.evaluate(env)?;
                Ok(Some(match op {
                    CmpOp::Le | CmpOp::Lt => l - r,
                    CmpOp::Ge | CmpOp::Gt => r - l,
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn variables(&self) -> BTreeSet<String> {
        match self {
            Predicate::Compare(_, lhs, rhs) => {
                let mut names = lhs.variables();
                names.extend(rhs.variables());
                names
            }
            Predicate::And(a, b) | Predicate::Or(a, b) => {
                let mut names = a.variables();
                names.extend(b.variables());
                names
            }
            Predicate::Not(a) => a.variables(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare(op, lhs, rhs) => write!(f, "{lhs}{}{rhs}", op.symbol()),
            Predicate::And(a, b) => write!(f, "({a}&{b})"),
            Predicate::Or(a, b) => write!(f, "({a}|{b})"),
            Predicate::Not(a) => write!(f, "!{a}"),
        }
    }
}

/// `dot(x) = e`: time derivative of `x` in a mode.
#[derive(Clone, Debug, PartialEq)]
pub struct DottedAssignment {
    pub variable: RealVariable,
    pub expr: Expr,
}

/// `next(x) = e`: value of `x` right after a transition.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimedAssignment {
    pub variable: RealVariable,
    pub expr: Expr,
}

pub fn dot(variable: &RealVariable, expr: impl Into<Expr>) -> DottedAssignment {
    DottedAssignment {
        variable: variable.clone(),
        expr: expr.into(),
    }
}

pub fn next(variable: &RealVariable, expr: impl Into<Expr>) -> PrimedAssignment {
    PrimedAssignment {
        variable: variable.clone(),
        expr: expr.into(),
    }
}

impl fmt::Display for DottedAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dot({})={}", self.variable, self.expr)
    }
}

impl fmt::Display for PrimedAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "next({})={}", self.variable, self.expr)
    }
}
