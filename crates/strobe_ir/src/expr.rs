//! Pure expressions computing a rule's output from other signals.
//!
//! [`Expr`] trees carry no types of their own: result widths are derived
//! structurally from operand widths (see [`Expr::width`]), and everything is
//! unsigned two-state arithmetic.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strobe_common::BitVec;

use crate::ids::SignalId;

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Bitwise NOT.
    Not,
    /// Two's-complement negation.
    Neg,
    /// Reduction AND.
    RedAnd,
    /// Reduction OR.
    RedOr,
    /// Reduction XOR (parity).
    RedXor,
    /// Logical NOT: 1 if the operand is zero.
    LogicNot,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    /// Addition; result is one bit wider than the wider operand.
    Add,
    /// Subtraction; result is one bit wider than the wider operand.
    Sub,
    /// Multiplication; result width is the sum of operand widths.
    Mul,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Logical left shift; keeps the left operand's width.
    Shl,
    /// Logical right shift; keeps the left operand's width.
    Shr,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Unsigned less than.
    Lt,
    /// Unsigned less than or equal.
    Le,
    /// Unsigned greater than.
    Gt,
    /// Unsigned greater than or equal.
    Ge,
    /// Logical AND of the operands' truth values.
    LogicAnd,
    /// Logical OR of the operands' truth values.
    LogicOr,
}

impl BinaryOp {
    /// Returns `true` for operators producing a single bit.
    pub fn is_predicate(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::LogicAnd
                | BinaryOp::LogicOr
        )
    }
}

/// A case pattern over a fixed-width subject, written MSB first with
/// `0`, `1` and `-` (don't care), e.g. `"-1-"`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    width: u32,
    /// Bits that must match.
    mask: BitVec,
    /// Required values of the masked bits.
    bits: BitVec,
}

impl Pattern {
    /// Returns the number of positions in the pattern.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns `true` if `subject` matches on every non-wildcard position.
    pub fn matches(&self, subject: &BitVec) -> bool {
        let subject = subject.resize(self.width);
        (&subject & &self.mask) == self.bits
    }
}

/// Error returned when a pattern string contains anything but `0`, `1`, `-`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid case pattern '{0}': expected only '0', '1' and '-'")]
pub struct ParsePatternError(pub String);

impl FromStr for Pattern {
    type Err = ParsePatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<char> = s.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
        let width = digits.len() as u32;
        let mut mask = BitVec::new(width);
        let mut bits = BitVec::new(width);
        for (i, c) in digits.iter().rev().enumerate() {
            let i = i as u32;
            match c {
                '0' => mask.set(i, true),
                '1' => {
                    mask.set(i, true);
                    bits.set(i, true);
                }
                '-' => {}
                _ => return Err(ParsePatternError(s.to_string())),
            }
        }
        Ok(Self { width, mask, bits })
    }
}

impl TryFrom<String> for Pattern {
    type Error = ParsePatternError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> String {
        p.to_string()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            let c = match (self.mask.get(i), self.bits.get(i)) {
                (false, _) => '-',
                (true, true) => '1',
                (true, false) => '0',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}

/// One arm of a [`Expr::Match`]: any matching pattern selects `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    /// Alternatives for this arm.
    pub patterns: Vec<Pattern>,
    /// The arm's result.
    pub value: Expr,
}

/// A pure expression over signal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// A constant, written as a sized literal such as `"4'b0011"` or `"8'hff"`.
    Const(#[serde(with = "literal")] BitVec),
    /// The committed value of a signal.
    Signal(SignalId),
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `cond != 0 ? then : otherwise`.
    Mux {
        /// The selector; any non-zero value selects `then`.
        cond: Box<Expr>,
        /// Value when the selector is non-zero.
        then: Box<Expr>,
        /// Value when the selector is zero.
        otherwise: Box<Expr>,
    },
    /// Bits `high..=low` of `expr`.
    Slice {
        /// The sliced expression.
        expr: Box<Expr>,
        /// High bit index (inclusive).
        high: u32,
        /// Low bit index (inclusive).
        low: u32,
    },
    /// Concatenation; the first element is the most significant.
    Concat(Vec<Expr>),
    /// Priority case: the first arm with a matching pattern wins.
    Match {
        /// The value being matched.
        subject: Box<Expr>,
        /// Arms in priority order.
        arms: Vec<MatchArm>,
        /// Result when no arm matches.
        default: Box<Expr>,
    },
}

impl Expr {
    /// A reference to a signal.
    pub fn signal(id: SignalId) -> Self {
        Expr::Signal(id)
    }

    /// A `width`-bit constant.
    pub fn constant(value: u64, width: u32) -> Self {
        Expr::Const(BitVec::from_u64(value, width))
    }

    /// A unary operation.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// A binary operation.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// A two-way multiplexer.
    pub fn mux(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Mux {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Bits `high..=low` of `expr`.
    pub fn slice(expr: Expr, high: u32, low: u32) -> Self {
        Expr::Slice {
            expr: Box::new(expr),
            high,
            low,
        }
    }

    /// A single bit of `expr`.
    pub fn bit(expr: Expr, index: u32) -> Self {
        Self::slice(expr, index, index)
    }

    /// A priority case over `subject`.
    pub fn matching(subject: Expr, arms: Vec<MatchArm>, default: Expr) -> Self {
        Expr::Match {
            subject: Box::new(subject),
            arms,
            default: Box::new(default),
        }
    }

    /// Computes the result width, given a lookup for signal widths.
    ///
    /// Returns `None` if a referenced signal is unknown to `signal_width`.
    pub fn width(&self, signal_width: &impl Fn(SignalId) -> Option<u32>) -> Option<u32> {
        let operands = self
            .operands()
            .into_iter()
            .map(|e| e.width(signal_width))
            .collect::<Option<Vec<_>>>()?;
        self.node_width(signal_width, &operands)
    }

    /// Direct sub-expressions, in the order [`Expr::node_width`] expects
    /// their widths. A match lists its subject, then each arm's value,
    /// then the default.
    pub fn operands(&self) -> Vec<&Expr> {
        match self {
            Expr::Const(_) | Expr::Signal(_) => Vec::new(),
            Expr::Unary { operand, .. } => vec![&**operand],
            Expr::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            Expr::Mux {
                cond,
                then,
                otherwise,
            } => vec![&**cond, &**then, &**otherwise],
            Expr::Slice { expr, .. } => vec![&**expr],
            Expr::Concat(parts) => parts.iter().collect(),
            Expr::Match {
                subject,
                arms,
                default,
            } => std::iter::once(&**subject)
                .chain(arms.iter().map(|arm| &arm.value))
                .chain(std::iter::once(&**default))
                .collect(),
        }
    }

    /// Mutable counterpart of [`Expr::operands`], in the same order.
    pub fn operands_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Const(_) | Expr::Signal(_) => Vec::new(),
            Expr::Unary { operand, .. } => vec![&mut **operand],
            Expr::Binary { lhs, rhs, .. } => vec![&mut **lhs, &mut **rhs],
            Expr::Mux {
                cond,
                then,
                otherwise,
            } => vec![&mut **cond, &mut **then, &mut **otherwise],
            Expr::Slice { expr, .. } => vec![&mut **expr],
            Expr::Concat(parts) => parts.iter_mut().collect(),
            Expr::Match {
                subject,
                arms,
                default,
            } => std::iter::once(&mut **subject)
                .chain(arms.iter_mut().map(|arm| &mut arm.value))
                .chain(std::iter::once(&mut **default))
                .collect(),
        }
    }

    /// The width of this node alone, given the widths of its
    /// [`operands`](Expr::operands).
    ///
    /// Returns `None` for an unknown signal or if `operands` does not line
    /// up with the node's shape.
    pub fn node_width(
        &self,
        signal_width: &impl Fn(SignalId) -> Option<u32>,
        operands: &[u32],
    ) -> Option<u32> {
        Some(match (self, operands) {
            (Expr::Const(v), []) => v.width(),
            (Expr::Signal(id), []) => signal_width(*id)?,
            (Expr::Unary { op, .. }, &[w]) => match op {
                UnaryOp::Not | UnaryOp::Neg => w,
                UnaryOp::RedAnd | UnaryOp::RedOr | UnaryOp::RedXor | UnaryOp::LogicNot => 1,
            },
            (Expr::Binary { op, .. }, &[l, r]) => match op {
                BinaryOp::Add | BinaryOp::Sub => l.max(r) + 1,
                BinaryOp::Mul => l + r,
                BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => l.max(r),
                BinaryOp::Shl | BinaryOp::Shr => l,
                _ => 1,
            },
            (Expr::Mux { .. }, &[_, then, otherwise]) => then.max(otherwise),
            (Expr::Slice { high, low, .. }, [_]) => high.saturating_sub(*low) + 1,
            (Expr::Concat(parts), widths) if parts.len() == widths.len() => widths.iter().sum(),
            (Expr::Match { arms, .. }, [_, values @ ..]) if values.len() == arms.len() + 1 => {
                values.iter().copied().max()?
            }
            _ => return None,
        })
    }

    /// Calls `f` for every signal reference, in tree order (duplicates included).
    pub fn visit_signals(&self, f: &mut impl FnMut(SignalId)) {
        match self {
            Expr::Const(_) => {}
            Expr::Signal(id) => f(*id),
            Expr::Unary { operand, .. } => operand.visit_signals(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit_signals(f);
                rhs.visit_signals(f);
            }
            Expr::Mux {
                cond,
                then,
                otherwise,
            } => {
                cond.visit_signals(f);
                then.visit_signals(f);
                otherwise.visit_signals(f);
            }
            Expr::Slice { expr, .. } => expr.visit_signals(f),
            Expr::Concat(parts) => {
                for p in parts {
                    p.visit_signals(f);
                }
            }
            Expr::Match {
                subject,
                arms,
                default,
            } => {
                subject.visit_signals(f);
                for arm in arms {
                    arm.value.visit_signals(f);
                }
                default.visit_signals(f);
            }
        }
    }

    /// Returns the sorted, de-duplicated set of signals this expression reads.
    pub fn read_set(&self) -> Vec<SignalId> {
        let mut reads = Vec::new();
        self.visit_signals(&mut |id| reads.push(id));
        reads.sort_unstable();
        reads.dedup();
        reads
    }
}

/// Sized literal strings for constants: `<width>'<b|h|d><digits>`.
mod literal {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use strobe_common::BitVec;

    pub fn serialize<S: Serializer>(value: &BitVec, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{}'b{value}", value.width()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BitVec, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| D::Error::custom(format!("invalid sized literal '{text}'")))
    }

    pub(super) fn parse(text: &str) -> Option<BitVec> {
        let (width, rest) = text.split_once('\'')?;
        let width: u32 = width.trim().parse().ok()?;
        let mut chars = rest.chars();
        let base = chars.next()?;
        let digits = chars.as_str();
        if digits.is_empty() {
            return None;
        }
        let value = match base.to_ascii_lowercase() {
            'b' => BitVec::from_binary_str(digits)?,
            'h' => BitVec::from_hex_str(digits)?,
            'd' => BitVec::from_u64(digits.replace('_', "").parse().ok()?, 64),
            _ => return None,
        };
        value.fits_in(width).then(|| value.resize(width))
    }
}
