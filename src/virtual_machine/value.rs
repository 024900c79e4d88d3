//! Tagged runtime values for the VM stack.

use crate::virtual_machine::errors::VmError;

/// A runtime-typed stack value.
///
/// The bytecode mixes integers, raw bytes, and packed byte-arrays on one
/// stack, so values carry their tag and typed pops fail with
/// [`VmError::TypeMismatch`] instead of panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Byte(u8),
    Bytes(Vec<u8>),
}

impl Value {
    /// Name of the runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Byte(_) => "byte",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn into_int(self) -> Result<i64, VmError> {
        match self {
            Value::Int(v) => Ok(v),
            other => Err(VmError::TypeMismatch {
                expected: "int",
                actual: other.type_name(),
            }),
        }
    }

    pub fn into_byte(self) -> Result<u8, VmError> {
        match self {
            Value::Byte(v) => Ok(v),
            other => Err(VmError::TypeMismatch {
                expected: "byte",
                actual: other.type_name(),
            }),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, VmError> {
        match self {
            Value::Bytes(v) => Ok(v),
            other => Err(VmError::TypeMismatch {
                expected: "bytes",
                actual: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_extraction() {
        assert_eq!(Value::Int(7).into_int(), Ok(7));
        assert_eq!(Value::Byte(0x41).into_byte(), Ok(0x41));
        assert_eq!(Value::Bytes(vec![1, 2]).into_bytes(), Ok(vec![1, 2]));
    }

    #[test]
    fn mismatches_carry_both_types() {
        assert_eq!(
            Value::Byte(1).into_int(),
            Err(VmError::TypeMismatch {
                expected: "int",
                actual: "byte",
            })
        );
        assert_eq!(
            Value::Int(1).into_bytes(),
            Err(VmError::TypeMismatch {
                expected: "bytes",
                actual: "int",
            })
        );
    }
}
