//! Fixed-width integer types for values that only ever exist as circuit wires.
//!
//! A value of type `u8` is represented by exactly 8 wires, a `bool` by a single wire. Wires are
//! always ordered least significant bit first, signed types use two's complement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::circuit::WireId;

/// Errors raised when operand types are incompatible or a literal does not fit its type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// Two operands of the same operation have different bit widths.
    #[error("width mismatch: {left} vs {right}")]
    WidthMismatch {
        /// Type of the left operand.
        left: IntType,
        /// Type of the right operand.
        right: IntType,
    },
    /// A signed and an unsigned operand were combined without an explicit conversion.
    #[error("signedness mismatch: {left} vs {right}")]
    SignednessMismatch {
        /// Type of the left operand.
        left: IntType,
        /// Type of the right operand.
        right: IntType,
    },
    /// The number cannot be represented in the requested type.
    #[error("literal {value} is out of range for type {ty}")]
    LiteralOutOfRange {
        /// Textual form of the rejected number.
        value: String,
        /// Type the literal was meant to have.
        ty: IntType,
    },
    /// A bit sequence did not have the width of its type.
    #[error("expected {expected} bits for type {ty}, found {actual}")]
    BitLength {
        /// The type the bits were decoded as.
        ty: IntType,
        /// Width of the type.
        expected: usize,
        /// Number of bits supplied.
        actual: usize,
    },
}

/// The supported bit widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Width {
    /// 1 bit, used for booleans.
    W1,
    /// 2 bits.
    W2,
    /// 4 bits.
    W4,
    /// 8 bits.
    W8,
    /// 16 bits.
    W16,
    /// 32 bits.
    W32,
    /// 64 bits.
    W64,
    /// 128 bits.
    W128,
}

impl Width {
    /// All widths, from narrowest to widest.
    pub const ALL: [Width; 8] = [
        Width::W1,
        Width::W2,
        Width::W4,
        Width::W8,
        Width::W16,
        Width::W32,
        Width::W64,
        Width::W128,
    ];

    /// Number of bits (and therefore wires) of this width.
    pub const fn bits(self) -> usize {
        match self {
            Width::W1 => 1,
            Width::W2 => 2,
            Width::W4 => 4,
            Width::W8 => 8,
            Width::W16 => 16,
            Width::W32 => 32,
            Width::W64 => 64,
            Width::W128 => 128,
        }
    }

    /// Returns the width with exactly `bits` bits, if it is supported.
    pub fn from_bits(bits: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.bits() == bits)
    }

    /// Mask selecting the low `bits()` bits of a `u128`.
    pub const fn mask(self) -> u128 {
        match self {
            Width::W128 => u128::MAX,
            w => (1 << w.bits()) - 1,
        }
    }
}

/// Whether a value is interpreted as unsigned or as two's complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    /// Plain binary.
    Unsigned,
    /// Two's complement.
    Signed,
}

/// An integer type: signedness plus width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntType {
    /// Signed or unsigned interpretation.
    pub signedness: Signedness,
    /// Number of bits.
    pub width: Width,
}

impl IntType {
    /// The boolean type, a single unsigned bit.
    pub const BOOL: IntType = IntType::unsigned(Width::W1);
    /// `u8`
    pub const U8: IntType = IntType::unsigned(Width::W8);
    /// `u16`
    pub const U16: IntType = IntType::unsigned(Width::W16);
    /// `u32`
    pub const U32: IntType = IntType::unsigned(Width::W32);
    /// `u64`
    pub const U64: IntType = IntType::unsigned(Width::W64);
    /// `u128`
    pub const U128: IntType = IntType::unsigned(Width::W128);
    /// `i8`
    pub const I8: IntType = IntType::signed(Width::W8);
    /// `i16`
    pub const I16: IntType = IntType::signed(Width::W16);
    /// `i32`
    pub const I32: IntType = IntType::signed(Width::W32);
    /// `i64`
    pub const I64: IntType = IntType::signed(Width::W64);
    /// `i128`
    pub const I128: IntType = IntType::signed(Width::W128);

    /// An unsigned type of the given width.
    pub const fn unsigned(width: Width) -> Self {
        Self {
            signedness: Signedness::Unsigned,
            width,
        }
    }

    /// A two's complement type of the given width.
    pub const fn signed(width: Width) -> Self {
        Self {
            signedness: Signedness::Signed,
            width,
        }
    }

    /// Number of bits of the type.
    pub const fn bits(self) -> usize {
        self.width.bits()
    }

    /// `true` for two's complement types.
    pub const fn is_signed(self) -> bool {
        matches!(self.signedness, Signedness::Signed)
    }

    /// `true` only for [`IntType::BOOL`].
    pub fn is_bool(self) -> bool {
        self == Self::BOOL
    }

    /// Checks that two operands can be combined by a binary operation.
    ///
    /// Width is checked before signedness, so `u8` vs `i16` reports a width mismatch.
    pub fn check_same(self, other: IntType) -> Result<(), TypeError> {
        if self.width != other.width {
            Err(TypeError::WidthMismatch {
                left: self,
                right: other,
            })
        } else if self.signedness != other.signedness {
            Err(TypeError::SignednessMismatch {
                left: self,
                right: other,
            })
        } else {
            Ok(())
        }
    }

    /// The largest value of the type as raw bits.
    pub fn max_bits(self) -> u128 {
        if self.is_signed() {
            self.width.mask() >> 1
        } else {
            self.width.mask()
        }
    }
}

impl fmt::Display for IntType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bool() {
            return f.write_str("bool");
        }
        let prefix = if self.is_signed() { 'i' } else { 'u' };
        write!(f, "{prefix}{}", self.bits())
    }
}

/// A plaintext value of a particular type.
///
/// The value is kept as raw two's complement bits, truncated to the width of the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    ty: IntType,
    bits: u128,
}

impl Literal {
    /// Creates a literal from an unsigned number, failing if it does not fit.
    pub fn from_u128(ty: IntType, value: u128) -> Result<Self, TypeError> {
        if value > ty.max_bits() {
            return Err(TypeError::LiteralOutOfRange {
                value: value.to_string(),
                ty,
            });
        }
        Ok(Self { ty, bits: value })
    }

    /// Creates a literal from a signed number, failing if it does not fit.
    pub fn from_i128(ty: IntType, value: i128) -> Result<Self, TypeError> {
        let fits = if ty.is_signed() {
            let shift = 128 - ty.bits();
            // sign-extending the truncated bits must give back the same number
            ((value << shift) >> shift) == value
        } else {
            value >= 0 && (value as u128) <= ty.max_bits()
        };
        if !fits {
            return Err(TypeError::LiteralOutOfRange {
                value: value.to_string(),
                ty,
            });
        }
        Ok(Self {
            ty,
            bits: (value as u128) & ty.width.mask(),
        })
    }

    /// Creates a literal from raw bits, silently truncating to the width of the type.
    pub fn wrapping(ty: IntType, bits: u128) -> Self {
        Self {
            ty,
            bits: bits & ty.width.mask(),
        }
    }

    /// A boolean literal.
    pub fn bool(value: bool) -> Self {
        Self::wrapping(IntType::BOOL, value as u128)
    }

    /// A `u8` literal.
    pub fn u8(value: u8) -> Self {
        Self::wrapping(IntType::U8, value as u128)
    }

    /// A `u16` literal.
    pub fn u16(value: u16) -> Self {
        Self::wrapping(IntType::U16, value as u128)
    }

    /// A `u32` literal.
    pub fn u32(value: u32) -> Self {
        Self::wrapping(IntType::U32, value as u128)
    }

    /// A `u64` literal.
    pub fn u64(value: u64) -> Self {
        Self::wrapping(IntType::U64, value as u128)
    }

    /// An `i8` literal.
    pub fn i8(value: i8) -> Self {
        Self::wrapping(IntType::I8, value as u128)
    }

    /// An `i16` literal.
    pub fn i16(value: i16) -> Self {
        Self::wrapping(IntType::I16, value as u128)
    }

    /// An `i32` literal.
    pub fn i32(value: i32) -> Self {
        Self::wrapping(IntType::I32, value as u128)
    }

    /// An `i64` literal.
    pub fn i64(value: i64) -> Self {
        Self::wrapping(IntType::I64, value as u128)
    }

    /// The type of the literal.
    pub fn ty(&self) -> IntType {
        self.ty
    }

    /// The raw (two's complement, truncated) bits.
    pub fn raw(&self) -> u128 {
        self.bits
    }

    /// The value as an unsigned number (raw bits for signed types).
    pub fn as_u128(&self) -> u128 {
        self.bits
    }

    /// The value as a signed number, sign-extended for signed types.
    pub fn as_i128(&self) -> i128 {
        if self.ty.is_signed() {
            let shift = 128 - self.ty.bits();
            ((self.bits << shift) as i128) >> shift
        } else {
            self.bits as i128
        }
    }

    /// `true` if the lowest bit is set, the natural reading of a `bool` literal.
    pub fn as_bool(&self) -> bool {
        self.bits & 1 == 1
    }

    /// The bits of the value, least significant first.
    pub fn to_bits(&self) -> Vec<bool> {
        (0..self.ty.bits()).map(|i| (self.bits >> i) & 1 == 1).collect()
    }

    /// Decodes a value from bits ordered least significant first.
    pub fn from_bits(ty: IntType, bits: &[bool]) -> Result<Self, TypeError> {
        if bits.len() != ty.bits() {
            return Err(TypeError::BitLength {
                ty,
                expected: ty.bits(),
                actual: bits.len(),
            });
        }
        let mut raw = 0;
        for (i, bit) in bits.iter().enumerate() {
            raw |= (*bit as u128) << i;
        }
        Ok(Self { ty, bits: raw })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ty.is_bool() {
            write!(f, "{}", self.as_bool())
        } else if self.ty.is_signed() {
            write!(f, "{}{}", self.as_i128(), self.ty)
        } else {
            write!(f, "{}{}", self.as_u128(), self.ty)
        }
    }
}

/// A typed value held in circuit wires, least significant bit first.
///
/// Holds exactly `ty.bits()` wires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    ty: IntType,
    wires: Vec<WireId>,
}

impl EncryptedValue {
    /// Wraps wires as a value of the given type.
    ///
    /// # Panics
    /// If the number of wires does not match the width of the type. Builder code constructs
    /// values only from correctly sized wire vectors, so this is an internal invariant.
    pub fn new(ty: IntType, wires: Vec<WireId>) -> Self {
        assert_eq!(
            wires.len(),
            ty.bits(),
            "a value of type {ty} needs exactly {} wires",
            ty.bits()
        );
        Self { ty, wires }
    }

    /// The type of the value.
    pub fn ty(&self) -> IntType {
        self.ty
    }

    /// The wires of the value, least significant first.
    pub fn wires(&self) -> &[WireId] {
        &self.wires
    }

    /// The most significant wire (the sign bit for signed types).
    pub fn msb(&self) -> WireId {
        self.wires[self.wires.len() - 1]
    }

    /// Checks that both operands of a binary operation have the same type.
    pub fn check_same(&self, other: &EncryptedValue) -> Result<(), TypeError> {
        self.ty.check_same(other.ty)
    }

    pub(crate) fn into_wires(self) -> Vec<WireId> {
        self.wires
    }
}
