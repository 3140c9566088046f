//! Incremental construction of [`Circuit`]s from primitive gates and integer gadgets.
//!
//! Every wire handed out by the [`Builder`] is already defined, so gates can only ever reference
//! earlier wires and the resulting circuit is in topological order by construction.
//!
//! Arithmetic wraps around at the width of the operands. Division and remainder are total:
//!
//! | operation          | result                                    |
//! |--------------------|-------------------------------------------|
//! | `x / 0`            | all bits set (`MAX` unsigned, `-1` signed) |
//! | `x % 0`            | `x`                                       |
//! | `MIN / -1` (signed)| `MIN`                                     |
//! | `MIN % -1` (signed)| `0`                                       |

use crate::{
    circuit::{Circuit, Gate, Node, Party, RevealPolicy, WireId},
    types::{EncryptedValue, IntType, Literal, Signedness, TypeError},
};

/// Builds a circuit gate by gate, folding constants along the way.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    nodes: Vec<Node>,
    inputs: Vec<WireId>,
    consts: [Option<WireId>; 2],
    reveal: RevealPolicy,
}

/// Flags of a subtraction `a - b`.
struct SubFlags {
    diff: Vec<WireId>,
    /// Set if `a < b` as unsigned numbers.
    borrow: WireId,
    /// Set if the signed subtraction overflowed.
    overflow: WireId,
}

impl Builder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares which roles learn the output of the finished circuit.
    pub fn reveal_to(&mut self, reveal: RevealPolicy) {
        self.reveal = reveal;
    }

    /// Finishes the circuit with the given output wires.
    pub fn finish(self, outputs: Vec<WireId>) -> Circuit {
        Circuit {
            nodes: self.nodes,
            inputs: self.inputs,
            outputs,
            reveal: self.reveal,
        }
    }

    fn push(&mut self, node: Node) -> WireId {
        let w = WireId(self.nodes.len() as u32);
        self.nodes.push(node);
        w
    }

    fn const_of(&self, w: WireId) -> Option<bool> {
        match self.nodes[w.index()] {
            Node::Const(b) => Some(b),
            _ => None,
        }
    }

    /// Adds a primary input bit owned by `party`.
    pub fn input(&mut self, party: Party) -> WireId {
        let w = self.push(Node::Input(party));
        self.inputs.push(w);
        w
    }

    /// Adds the input bits of a value of type `ty` owned by `party`.
    pub fn input_value(&mut self, ty: IntType, party: Party) -> EncryptedValue {
        let wires = (0..ty.bits()).map(|_| self.input(party)).collect();
        EncryptedValue::new(ty, wires)
    }

    /// Returns the (shared) constant wire for `b`.
    pub fn constant(&mut self, b: bool) -> WireId {
        if let Some(w) = self.consts[b as usize] {
            return w;
        }
        let w = self.push(Node::Const(b));
        self.consts[b as usize] = Some(w);
        w
    }

    /// Injects a literal as constant wires.
    pub fn literal(&mut self, lit: Literal) -> EncryptedValue {
        let wires = lit.to_bits().into_iter().map(|b| self.constant(b)).collect();
        EncryptedValue::new(lit.ty(), wires)
    }

    fn zeros(&mut self, n: usize) -> Vec<WireId> {
        let zero = self.constant(false);
        vec![zero; n]
    }

    // primitive gates:

    /// `x & y`
    pub fn and(&mut self, x: WireId, y: WireId) -> WireId {
        if x == y {
            return x;
        }
        match (self.const_of(x), self.const_of(y)) {
            (Some(false), _) | (_, Some(false)) => self.constant(false),
            (Some(true), _) => y,
            (_, Some(true)) => x,
            _ => self.push(Node::Gate(Gate::And(x, y))),
        }
    }

    /// `x ^ y`
    pub fn xor(&mut self, x: WireId, y: WireId) -> WireId {
        if x == y {
            return self.constant(false);
        }
        match (self.const_of(x), self.const_of(y)) {
            (Some(a), Some(b)) => self.constant(a ^ b),
            (Some(false), _) => y,
            (_, Some(false)) => x,
            (Some(true), _) => self.not(y),
            (_, Some(true)) => self.not(x),
            _ => self.push(Node::Gate(Gate::Xor(x, y))),
        }
    }

    /// `!x`
    pub fn not(&mut self, x: WireId) -> WireId {
        match self.nodes[x.index()] {
            Node::Const(b) => self.constant(!b),
            Node::Gate(Gate::Not(inner)) => inner,
            _ => self.push(Node::Gate(Gate::Not(x))),
        }
    }

    /// `x | y`, as `(x ^ y) ^ (x & y)`.
    pub fn or(&mut self, x: WireId, y: WireId) -> WireId {
        let xor = self.xor(x, y);
        let and = self.and(x, y);
        self.xor(xor, and)
    }

    /// `!(x & y)`
    pub fn nand(&mut self, x: WireId, y: WireId) -> WireId {
        let and = self.and(x, y);
        self.not(and)
    }

    /// `!(x | y)`
    pub fn nor(&mut self, x: WireId, y: WireId) -> WireId {
        let or = self.or(x, y);
        self.not(or)
    }

    /// `!(x ^ y)`
    pub fn xnor(&mut self, x: WireId, y: WireId) -> WireId {
        let xor = self.xor(x, y);
        self.not(xor)
    }

    /// Selects `if_true` if `s` is set, otherwise `if_false`.
    pub fn select(&mut self, s: WireId, if_true: WireId, if_false: WireId) -> WireId {
        let diff = self.xor(if_true, if_false);
        let masked = self.and(s, diff);
        self.xor(if_false, masked)
    }

    /// Set if any of the wires is set.
    pub fn any(&mut self, wires: &[WireId]) -> WireId {
        let mut acc = self.constant(false);
        for w in wires {
            acc = self.or(acc, *w);
        }
        acc
    }

    // bitwise operations on values:

    fn zip_with(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
        f: impl Fn(&mut Self, WireId, WireId) -> WireId,
    ) -> Result<EncryptedValue, TypeError> {
        a.check_same(b)?;
        let wires = a
            .wires()
            .iter()
            .zip(b.wires())
            .map(|(x, y)| f(self, *x, *y))
            .collect();
        Ok(EncryptedValue::new(a.ty(), wires))
    }

    /// Bitwise AND.
    pub fn bitand(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        self.zip_with(a, b, Self::and)
    }

    /// Bitwise OR.
    pub fn bitor(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        self.zip_with(a, b, Self::or)
    }

    /// Bitwise XOR.
    pub fn bitxor(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        self.zip_with(a, b, Self::xor)
    }

    /// Bitwise NOT.
    pub fn bitnot(&mut self, a: &EncryptedValue) -> EncryptedValue {
        let wires = a.wires().iter().map(|w| self.not(*w)).collect();
        EncryptedValue::new(a.ty(), wires)
    }

    /// Selects `if_true` if `s` is set, otherwise `if_false`. Both values must have the same type.
    pub fn mux(
        &mut self,
        s: WireId,
        if_true: &EncryptedValue,
        if_false: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        self.zip_with(if_true, if_false, |b, t, f| b.select(s, t, f))
    }

    // arithmetic:

    /// Ripple-carry addition of equally long bit vectors, returning the sum and the carry out.
    fn add_bits(&mut self, a: &[WireId], b: &[WireId], carry_in: WireId) -> (Vec<WireId>, WireId) {
        let mut carry = carry_in;
        let mut sum = Vec::with_capacity(a.len());
        for (x, y) in a.iter().zip(b) {
            // full adder with a single AND: carry' = c ^ ((x ^ c) & (y ^ c))
            let x_c = self.xor(*x, carry);
            let y_c = self.xor(*y, carry);
            sum.push(self.xor(x_c, *y));
            let t = self.and(x_c, y_c);
            carry = self.xor(carry, t);
        }
        (sum, carry)
    }

    fn sub_bits(&mut self, a: &[WireId], b: &[WireId]) -> SubFlags {
        // a - b = a + !b + 1
        let not_b: Vec<WireId> = b.iter().map(|w| self.not(*w)).collect();
        let one = self.constant(true);
        let (diff, carry) = self.add_bits(a, &not_b, one);
        let borrow = self.not(carry);
        let (a_msb, b_msb, d_msb) = (a[a.len() - 1], b[b.len() - 1], diff[diff.len() - 1]);
        let operands_differ = self.xor(a_msb, b_msb);
        let result_differs = self.xor(a_msb, d_msb);
        let overflow = self.and(operands_differ, result_differs);
        SubFlags {
            diff,
            borrow,
            overflow,
        }
    }

    /// Wrapping addition.
    pub fn add(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        a.check_same(b)?;
        let zero = self.constant(false);
        let (sum, _) = self.add_bits(a.wires(), b.wires(), zero);
        Ok(EncryptedValue::new(a.ty(), sum))
    }

    /// Wrapping subtraction.
    pub fn sub(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        a.check_same(b)?;
        let flags = self.sub_bits(a.wires(), b.wires());
        Ok(EncryptedValue::new(a.ty(), flags.diff))
    }

    /// Wrapping two's complement negation.
    pub fn neg(&mut self, a: &EncryptedValue) -> EncryptedValue {
        let zeros = self.zeros(a.ty().bits());
        let flags = self.sub_bits(&zeros, a.wires());
        EncryptedValue::new(a.ty(), flags.diff)
    }

    /// Wrapping multiplication by shift-and-add, truncated to the operand width.
    pub fn mul(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        a.check_same(b)?;
        let n = a.ty().bits();
        let mut acc = self.zeros(n);
        for (i, b_i) in b.wires().iter().enumerate() {
            let partial: Vec<WireId> = a.wires()[..n - i]
                .iter()
                .map(|a_j| self.and(*a_j, *b_i))
                .collect();
            let zero = self.constant(false);
            let (sum, _) = self.add_bits(&acc[i..], &partial, zero);
            acc.truncate(i);
            acc.extend(sum);
        }
        Ok(EncryptedValue::new(a.ty(), acc))
    }

    /// Restoring division of unsigned bit vectors, returning quotient and remainder.
    ///
    /// A zero divisor yields an all-ones quotient and the dividend as remainder.
    fn udivrem_bits(&mut self, a: &[WireId], b: &[WireId]) -> (Vec<WireId>, Vec<WireId>) {
        let n = a.len();
        let zero = self.constant(false);
        let mut divisor = b.to_vec();
        divisor.push(zero);
        let mut rem = vec![zero; n + 1];
        let mut quotient = vec![zero; n];
        for i in (0..n).rev() {
            // rem < divisor <= 2^n - 1, so the dropped top bit is always 0
            let mut shifted = Vec::with_capacity(n + 1);
            shifted.push(a[i]);
            shifted.extend_from_slice(&rem[..n]);
            let flags = self.sub_bits(&shifted, &divisor);
            let fits = self.not(flags.borrow);
            quotient[i] = fits;
            rem = shifted
                .iter()
                .zip(&flags.diff)
                .map(|(keep, reduced)| self.select(fits, *reduced, *keep))
                .collect();
        }
        rem.truncate(n);
        (quotient, rem)
    }

    /// Quotient and remainder under the total division policy of this module.
    pub fn divrem(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<(EncryptedValue, EncryptedValue), TypeError> {
        a.check_same(b)?;
        let ty = a.ty();
        if !ty.is_signed() {
            let (q, r) = self.udivrem_bits(a.wires(), b.wires());
            return Ok((EncryptedValue::new(ty, q), EncryptedValue::new(ty, r)));
        }
        let (sign_a, sign_b) = (a.msb(), b.msb());
        let neg_a = self.neg(a);
        let neg_b = self.neg(b);
        let abs_a = self.mux(sign_a, &neg_a, a)?;
        let abs_b = self.mux(sign_b, &neg_b, b)?;
        let (uq, ur) = self.udivrem_bits(abs_a.wires(), abs_b.wires());
        let (uq, ur) = (EncryptedValue::new(ty, uq), EncryptedValue::new(ty, ur));

        let signs_differ = self.xor(sign_a, sign_b);
        let neg_uq = self.neg(&uq);
        let q = self.mux(signs_differ, &neg_uq, &uq)?;
        // |b| = 0 would otherwise turn the all-ones quotient into 1 for negative dividends
        let b_nonzero = self.any(b.wires());
        let b_is_zero = self.not(b_nonzero);
        let one = self.constant(true);
        let all_ones = EncryptedValue::new(ty, vec![one; ty.bits()]);
        let q = self.mux(b_is_zero, &all_ones, &q)?;

        let neg_ur = self.neg(&ur);
        let r = self.mux(sign_a, &neg_ur, &ur)?;
        Ok((q, r))
    }

    /// Division, see the module documentation for division by zero.
    pub fn div(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        Ok(self.divrem(a, b)?.0)
    }

    /// Remainder with the sign of the dividend, see the module documentation for zero divisors.
    pub fn rem(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, TypeError> {
        Ok(self.divrem(a, b)?.1)
    }

    // comparisons:

    fn compare_flags(
        &mut self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<SubFlags, TypeError> {
        a.check_same(b)?;
        Ok(self.sub_bits(a.wires(), b.wires()))
    }

    /// `a == b`, the zero flag of `a - b`.
    pub fn eq(&mut self, a: &EncryptedValue, b: &EncryptedValue) -> Result<WireId, TypeError> {
        let flags = self.compare_flags(a, b)?;
        let nonzero = self.any(&flags.diff);
        Ok(self.not(nonzero))
    }

    /// `a != b`
    pub fn ne(&mut self, a: &EncryptedValue, b: &EncryptedValue) -> Result<WireId, TypeError> {
        let flags = self.compare_flags(a, b)?;
        Ok(self.any(&flags.diff))
    }

    /// `a < b`: the borrow flag for unsigned, sign xor overflow for signed operands.
    pub fn lt(&mut self, a: &EncryptedValue, b: &EncryptedValue) -> Result<WireId, TypeError> {
        let flags = self.compare_flags(a, b)?;
        if a.ty().is_signed() {
            let sign = flags.diff[flags.diff.len() - 1];
            Ok(self.xor(sign, flags.overflow))
        } else {
            Ok(flags.borrow)
        }
    }

    /// `a > b`
    pub fn gt(&mut self, a: &EncryptedValue, b: &EncryptedValue) -> Result<WireId, TypeError> {
        self.lt(b, a)
    }

    /// `a <= b`
    pub fn le(&mut self, a: &EncryptedValue, b: &EncryptedValue) -> Result<WireId, TypeError> {
        let gt = self.gt(a, b)?;
        Ok(self.not(gt))
    }

    /// `a >= b`
    pub fn ge(&mut self, a: &EncryptedValue, b: &EncryptedValue) -> Result<WireId, TypeError> {
        let lt = self.lt(a, b)?;
        Ok(self.not(lt))
    }

    // shifts and conversions:

    fn shift_fill(&mut self, a: &EncryptedValue) -> WireId {
        if a.ty().is_signed() {
            a.msb()
        } else {
            self.constant(false)
        }
    }

    /// `a << k`, shifting in zeros.
    pub fn shl_const(&mut self, a: &EncryptedValue, k: usize) -> EncryptedValue {
        let zero = self.constant(false);
        let wires = (0..a.ty().bits())
            .map(|i| if i >= k { a.wires()[i - k] } else { zero })
            .collect();
        EncryptedValue::new(a.ty(), wires)
    }

    /// `a >> k`, arithmetic for signed and logical for unsigned values.
    pub fn shr_const(&mut self, a: &EncryptedValue, k: usize) -> EncryptedValue {
        let fill = self.shift_fill(a);
        let n = a.ty().bits();
        let wires = (0..n)
            .map(|i| match i.checked_add(k) {
                Some(j) if j < n => a.wires()[j],
                _ => fill,
            })
            .collect();
        EncryptedValue::new(a.ty(), wires)
    }

    fn barrel_shift(
        &mut self,
        a: &EncryptedValue,
        amount: &EncryptedValue,
        left: bool,
    ) -> EncryptedValue {
        let n = a.ty().bits();
        let mut shifted = a.clone();
        let mut too_far = Vec::new();
        for (k, bit) in amount.wires().iter().enumerate() {
            match 1_usize.checked_shl(k as u32) {
                Some(step) if step < n => {
                    let by_step = if left {
                        self.shl_const(&shifted, step)
                    } else {
                        self.shr_const(&shifted, step)
                    };
                    let wires = by_step
                        .wires()
                        .iter()
                        .zip(shifted.wires())
                        .map(|(s, keep)| self.select(*bit, *s, *keep))
                        .collect();
                    shifted = EncryptedValue::new(a.ty(), wires);
                }
                _ => too_far.push(*bit),
            }
        }
        let overflow = self.any(&too_far);
        let fill = if left {
            self.shl_const(a, n)
        } else {
            self.shr_const(a, n)
        };
        let wires = fill
            .wires()
            .iter()
            .zip(shifted.wires())
            .map(|(f, keep)| self.select(overflow, *f, *keep))
            .collect();
        EncryptedValue::new(a.ty(), wires)
    }

    /// `a << amount` for a secret amount; amounts of at least the width yield zero.
    pub fn shl(&mut self, a: &EncryptedValue, amount: &EncryptedValue) -> EncryptedValue {
        self.barrel_shift(a, amount, true)
    }

    /// `a >> amount` for a secret amount; amounts of at least the width yield the fill bit.
    pub fn shr(&mut self, a: &EncryptedValue, amount: &EncryptedValue) -> EncryptedValue {
        self.barrel_shift(a, amount, false)
    }

    /// Converts to another type, truncating or extending (with the sign bit for signed sources).
    pub fn cast(&mut self, a: &EncryptedValue, ty: IntType) -> EncryptedValue {
        let mut wires = a.wires().to_vec();
        if ty.bits() <= wires.len() {
            wires.truncate(ty.bits());
        } else {
            let fill = match a.ty().signedness {
                Signedness::Signed => a.msb(),
                Signedness::Unsigned => self.constant(false),
            };
            wires.resize(ty.bits(), fill);
        }
        EncryptedValue::new(ty, wires)
    }
}
