//! Capability classification of the one-byte opcode space.

use bitcoin::opcodes::Opcode;
use bitcoin::opcodes::all::*;

/// How an opcode may legally appear in a script and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Executes its logic against the stack.
    Normal,
    /// Removed from consensus: its presence anywhere rejects the script.
    Disabled,
    /// Bookkeeping for the parser or the environment, never touches the stack.
    InternalOnly,
    /// Rejected before execution even inside an unexecuted branch.
    AlwaysInvalid,
    /// Parses, but fails the script once control flow reaches it.
    InvalidIfExecuted,
}

/// Classifies a single opcode. Every code point maps to exactly one capability.
pub fn classify(opcode: Opcode) -> Capability {
    match opcode {
        OP_CAT | OP_SUBSTR | OP_LEFT | OP_RIGHT | OP_INVERT | OP_AND | OP_OR | OP_XOR
        | OP_2MUL | OP_2DIV | OP_MUL | OP_DIV | OP_MOD | OP_LSHIFT | OP_RSHIFT => {
            Capability::Disabled
        }
        OP_VERIF | OP_VERNOTIF => Capability::AlwaysInvalid,
        OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_CODESEPARATOR => Capability::InternalOnly,
        OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 | OP_RETURN => {
            Capability::InvalidIfExecuted
        }
        op if op.to_u8() >= OP_CHECKSIGADD.to_u8() => Capability::InvalidIfExecuted,
        _ => Capability::Normal,
    }
}

/// Push opcodes and OP_RESERVED are free; everything above OP_16 counts
/// towards the per-script operation limit.
pub fn counts_towards_op_limit(opcode: Opcode) -> bool {
    opcode.to_u8() > OP_PUSHNUM_16.to_u8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_counts() {
        let mut counts = std::collections::HashMap::new();
        for byte in 0..=u8::MAX {
            *counts.entry(classify(Opcode::from(byte))).or_insert(0usize) += 1;
        }

        assert_eq!(counts[&Capability::Disabled], 15);
        assert_eq!(counts[&Capability::AlwaysInvalid], 2);
        assert_eq!(counts[&Capability::InternalOnly], 5);
        // RESERVED, VER, RESERVED1, RESERVED2, RETURN and 0xba..=0xff.
        assert_eq!(counts[&Capability::InvalidIfExecuted], 5 + 70);
        assert_eq!(counts[&Capability::Normal], 256 - 15 - 2 - 5 - 75);
    }

    #[test]
    fn test_upgradable_nops_and_locktime_are_normal() {
        for op in [OP_NOP, OP_NOP1, OP_CLTV, OP_CSV, OP_NOP4, OP_NOP10] {
            assert_eq!(classify(op), Capability::Normal, "{op}");
        }
        assert_eq!(classify(OP_CHECKSIGADD), Capability::InvalidIfExecuted);
        assert_eq!(classify(OP_INVALIDOPCODE), Capability::InvalidIfExecuted);
    }

    #[test]
    fn test_op_limit_counting() {
        assert!(!counts_towards_op_limit(OP_PUSHBYTES_0));
        assert!(!counts_towards_op_limit(OP_PUSHDATA4));
        assert!(!counts_towards_op_limit(OP_RESERVED));
        assert!(!counts_towards_op_limit(OP_PUSHNUM_16));
        assert!(counts_towards_op_limit(OP_NOP));
        assert!(counts_towards_op_limit(OP_IF));
        assert!(counts_towards_op_limit(OP_CAT));
    }
}
