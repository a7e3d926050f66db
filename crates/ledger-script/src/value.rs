use crate::num::{NumError, ScriptNum};
use std::fmt;
use std::ops::Deref;

/// An immutable stack element.
///
/// The boolean and numeric readings are derived from the bytes on demand.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScriptValue(Vec<u8>);

impl ScriptValue {
    /// The canonical `true` and `false` elements.
    pub fn from_bool(value: bool) -> Self {
        if value { Self(vec![1]) } else { Self(Vec::new()) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// False iff empty or zero, where a sign bit on the last byte still
    /// counts as zero.
    pub fn as_bool(&self) -> bool {
        cast_to_bool(&self.0)
    }

    /// Reads the element as a number of at most `max_size` bytes.
    pub fn as_num(
        &self,
        require_minimal: bool,
        max_size: Option<usize>,
    ) -> Result<ScriptNum, NumError> {
        ScriptNum::from_bytes(&self.0, require_minimal, max_size)
    }
}

/// Converts a byte slice to a boolean.
pub fn cast_to_bool(data: &[u8]) -> bool {
    match data.split_last() {
        Some((&last, rest)) => rest.iter().any(|&x| x != 0) || (last != 0 && last != 0x80),
        None => false,
    }
}

impl From<Vec<u8>> for ScriptValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ScriptValue {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<ScriptNum> for ScriptValue {
    fn from(num: ScriptNum) -> Self {
        Self(num.to_bytes())
    }
}

impl AsRef<[u8]> for ScriptValue {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for ScriptValue {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<empty>");
        }
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_interpretation() {
        let cases: &[(&[u8], bool)] = &[
            (&[], false),
            (&[0x00], false),
            (&[0x80], false),
            (&[0x00, 0x00, 0x00], false),
            (&[0x00, 0x00, 0x80], false),
            (&[0x01], true),
            (&[0x81], true),
            (&[0x80, 0x00], true),
            (&[0x00, 0x80, 0x00], true),
            (&[0x00, 0x01], true),
        ];

        for (bytes, expected) in cases {
            assert_eq!(
                ScriptValue::from(bytes.to_vec()).as_bool(),
                *expected,
                "{bytes:02x?}"
            );
        }
    }

    #[test]
    fn test_canonical_booleans() {
        assert_eq!(ScriptValue::from_bool(true).as_bytes(), &[1]);
        assert!(ScriptValue::from_bool(false).is_empty());
        assert!(ScriptValue::from_bool(true).as_bool());
        assert!(!ScriptValue::from_bool(false).as_bool());
    }

    #[test]
    fn test_numeric_values_are_minimal() {
        assert_eq!(ScriptValue::from(ScriptNum::from(0)), ScriptValue::default());
        assert_eq!(
            ScriptValue::from(ScriptNum::from(-128)).as_bytes(),
            &[0x80, 0x80]
        );
        let value = ScriptValue::from(vec![0x05, 0x00]);
        assert_eq!(value.as_num(false, None), Ok(ScriptNum::from(5)));
        assert_eq!(
            value.as_num(true, None),
            Err(NumError::NotMinimallyEncoded)
        );
    }

    #[test]
    fn test_long_values_are_not_numbers() {
        let value = ScriptValue::from(vec![0x01; 5]);
        assert_eq!(value.as_num(false, None), Err(NumError::Overflow(4)));
        assert!(value.as_num(false, Some(5)).is_ok());
        assert!(value.as_bool());
    }
}
