//! Expression evaluation against committed signal values.
//!
//! [`eval_expr`] walks an [`Expr`] tree, reading every signal from the
//! committed half of a [`SignalStore`]. Arithmetic is unsigned two-state;
//! result widths follow [`Expr::width`]. Expressions are expected to come
//! from a validated netlist, where every selection branch already has the
//! selection's width.

use strobe_common::BitVec;
use strobe_ir::{BinaryOp, Expr, UnaryOp};

use crate::store::SignalStore;

/// Widest operand accepted by multiplication.
const MAX_MUL_OPERAND_WIDTH: u32 = 64;

/// A fault raised while evaluating a rule's expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// A multiplication operand is wider than 64 bits.
    #[error("multiplication of {lhs}-bit by {rhs}-bit operands is not supported (limit {MAX_MUL_OPERAND_WIDTH} bits)")]
    MulTooWide {
        /// Left operand width.
        lhs: u32,
        /// Right operand width.
        rhs: u32,
    },
}

/// Evaluates `expr` against the committed values in `store`.
pub fn eval_expr(store: &SignalStore, expr: &Expr) -> Result<BitVec, EvalError> {
    match expr {
        Expr::Const(v) => Ok(v.clone()),

        Expr::Signal(id) => Ok(store.get(*id).clone()),

        Expr::Unary { op, operand } => {
            let val = eval_expr(store, operand)?;
            Ok(eval_unary(*op, &val))
        }

        Expr::Binary { op, lhs, rhs } => {
            let l = eval_expr(store, lhs)?;
            let r = eval_expr(store, rhs)?;
            eval_binary(*op, &l, &r)
        }

        Expr::Mux {
            cond,
            then,
            otherwise,
        } => {
            let chosen = if eval_expr(store, cond)?.is_zero() {
                otherwise
            } else {
                then
            };
            eval_expr(store, chosen)
        }

        Expr::Slice { expr, high, low } => {
            let val = eval_expr(store, expr)?;
            Ok(val.slice(*low, high - low + 1))
        }

        Expr::Concat(parts) => {
            let mut evaluated = Vec::with_capacity(parts.len());
            for p in parts {
                evaluated.push(eval_expr(store, p)?);
            }
            Ok(BitVec::concat(&evaluated))
        }

        Expr::Match {
            subject,
            arms,
            default,
        } => {
            let subject_val = eval_expr(store, subject)?;
            let chosen = arms
                .iter()
                .find(|arm| arm.patterns.iter().any(|p| p.matches(&subject_val)))
                .map_or(&**default, |arm| &arm.value);
            eval_expr(store, chosen)
        }
    }
}

fn eval_unary(op: UnaryOp, val: &BitVec) -> BitVec {
    match op {
        UnaryOp::Not => !val,
        UnaryOp::Neg => val.wrapping_neg(),
        UnaryOp::RedAnd => BitVec::from_bool(val.is_all_one()),
        UnaryOp::RedOr => BitVec::from_bool(!val.is_zero()),
        UnaryOp::RedXor => BitVec::from_bool(val.count_ones() % 2 == 1),
        UnaryOp::LogicNot => BitVec::from_bool(val.is_zero()),
    }
}

fn eval_binary(op: BinaryOp, lhs: &BitVec, rhs: &BitVec) -> Result<BitVec, EvalError> {
    let sum_width = lhs.width().max(rhs.width()) + 1;
    Ok(match op {
        BinaryOp::And => lhs & rhs,
        BinaryOp::Or => lhs | rhs,
        BinaryOp::Xor => lhs ^ rhs,

        BinaryOp::Add => lhs.wrapping_add(rhs, sum_width),
        BinaryOp::Sub => lhs.wrapping_sub(rhs, sum_width),
        BinaryOp::Mul => {
            if lhs.width() > MAX_MUL_OPERAND_WIDTH || rhs.width() > MAX_MUL_OPERAND_WIDTH {
                return Err(EvalError::MulTooWide {
                    lhs: lhs.width(),
                    rhs: rhs.width(),
                });
            }
            let product = lhs.low_u64() as u128 * rhs.low_u64() as u128;
            BitVec::from_u128(product, lhs.width() + rhs.width())
        }

        BinaryOp::Shl => lhs.shl(shift_amount(rhs)),
        BinaryOp::Shr => lhs.shr(shift_amount(rhs)),

        BinaryOp::Eq => BitVec::from_bool(lhs.value_eq(rhs)),
        BinaryOp::Ne => BitVec::from_bool(!lhs.value_eq(rhs)),
        BinaryOp::Lt => BitVec::from_bool(lhs.cmp_unsigned(rhs).is_lt()),
        BinaryOp::Le => BitVec::from_bool(lhs.cmp_unsigned(rhs).is_le()),
        BinaryOp::Gt => BitVec::from_bool(lhs.cmp_unsigned(rhs).is_gt()),
        BinaryOp::Ge => BitVec::from_bool(lhs.cmp_unsigned(rhs).is_ge()),

        BinaryOp::LogicAnd => BitVec::from_bool(!lhs.is_zero() && !rhs.is_zero()),
        BinaryOp::LogicOr => BitVec::from_bool(!lhs.is_zero() || !rhs.is_zero()),
    })
}

/// Shift amounts too large for `u64` shift everything out.
fn shift_amount(rhs: &BitVec) -> u64 {
    rhs.to_u64().unwrap_or(u64::MAX)
}
