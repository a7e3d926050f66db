//! Script numeric

use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Script number error type.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum NumError {
    #[error("script number is longer than {0} bytes")]
    Overflow(usize),
    #[error("non-minimally encoded script number")]
    NotMinimallyEncoded,
    #[error("script number arithmetic overflow")]
    ArithmeticOverflow,
}

/// A numeric value read from or written to the stack.
///
/// Stack elements are little-endian sign-magnitude integers: the most
/// significant bit of the last byte is the sign. Zero is the empty element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScriptNum {
    value: i64,
}

impl<T: Into<i64>> From<T> for ScriptNum {
    fn from(value: T) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl fmt::Display for ScriptNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl ScriptNum {
    /// Maximum length of a numeric operand for arithmetic opcodes.
    pub const MAX_NUM_SIZE: usize = 4;

    /// Maximum length of a lock-time operand (good until 2^39-1).
    pub const MAX_LOCKTIME_NUM_SIZE: usize = 5;

    /// Decodes a stack element.
    ///
    /// `max_size` defaults to [`Self::MAX_NUM_SIZE`]. Sizes above 8 bytes
    /// are not representable and are clamped.
    pub fn from_bytes(
        data: &[u8],
        require_minimal: bool,
        max_size: Option<usize>,
    ) -> Result<Self, NumError> {
        let max_size = max_size.unwrap_or(Self::MAX_NUM_SIZE).min(8);

        if data.len() > max_size {
            return Err(NumError::Overflow(max_size));
        }

        if require_minimal && !Self::is_minimally_encoded(data) {
            return Err(NumError::NotMinimallyEncoded);
        }

        let Some((&last, _)) = data.split_last() else {
            return Ok(Self { value: 0 });
        };

        let magnitude = data
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &byte)| acc | (u64::from(byte) << (8 * i)));

        if last & 0x80 == 0 {
            return Ok(Self {
                value: magnitude as i64,
            });
        }

        // Clear the sign bit, the remainder always fits in 63 bits.
        let sign_bit = 0x80u64 << (8 * (data.len() - 1));
        Ok(Self {
            value: -((magnitude & !sign_bit) as i64),
        })
    }

    /// Encodes the number as a minimally encoded stack element.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.value == 0 {
            return Vec::new();
        }

        let negative = self.value < 0;
        let mut abs_value = self.value.unsigned_abs();
        let mut result = Vec::with_capacity(9);

        while abs_value != 0 {
            result.push((abs_value & 0xff) as u8);
            abs_value >>= 8;
        }

        // If the most significant byte already uses the sign bit, an extra
        // byte carries the sign. Otherwise the sign is folded into it.
        match result.last_mut() {
            Some(msb) if *msb & 0x80 != 0 => result.push(if negative { 0x80 } else { 0 }),
            Some(msb) if negative => *msb |= 0x80,
            _ => {}
        }

        result
    }

    /// Returns `true` if `data` has no redundant most significant byte.
    ///
    /// A trailing `0x00`/`0x80` is only allowed when the byte before it has
    /// its high bit set, i.e. when it is needed to carry the sign.
    pub fn is_minimally_encoded(data: &[u8]) -> bool {
        match data {
            [] => true,
            [.., last] if last & 0x7f != 0 => true,
            [.., before, _] => before & 0x80 != 0,
            [_] => false,
        }
    }

    /// Get the underlying value.
    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    pub fn abs(&self) -> Self {
        self.value.saturating_abs().into()
    }
}

impl Add for ScriptNum {
    type Output = Result<Self, NumError>;

    fn add(self, other: Self) -> Result<Self, NumError> {
        self.value
            .checked_add(other.value)
            .map(|value| Self { value })
            .ok_or(NumError::ArithmeticOverflow)
    }
}

impl Sub for ScriptNum {
    type Output = Result<Self, NumError>;

    fn sub(self, other: Self) -> Result<Self, NumError> {
        self.value
            .checked_sub(other.value)
            .map(|value| Self { value })
            .ok_or(NumError::ArithmeticOverflow)
    }
}

impl Neg for ScriptNum {
    type Output = Result<Self, NumError>;

    fn neg(self) -> Result<Self, NumError> {
        self.value
            .checked_neg()
            .map(|value| Self { value })
            .ok_or(NumError::ArithmeticOverflow)
    }
}
