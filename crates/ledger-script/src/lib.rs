//! # ledger-script
//!
//! A deterministic interpreter for Bitcoin-style legacy scripts.
//!
//! A script is parsed once into a tree of [`ScriptOp`], with
//! `OP_IF`/`OP_NOTIF`/`OP_ELSE`/`OP_ENDIF` folded into [`Conditional`]
//! blocks, and the tree is then executed against a [`ScriptEnvironment`].
//! [`verify_script`] runs an unlocking script followed by a locking script
//! and accepts the input iff the final stack top is true.
//!
//! Signature and lock-time checks are delegated to a [`SignatureChecker`].

mod config;
pub mod constants;
mod environment;
mod error;
mod interpreter;
mod num;
mod opcode;
mod ops;
mod parser;
mod signature_checker;
mod stack;
mod value;
mod verify;


use bitflags::bitflags;

pub use self::config::ScriptLimits;
pub use self::environment::{ScriptEnvironment, TransactionContext};
pub use self::error::{Error, ErrorKind, StructureError};
pub use self::interpreter::{CheckSigError, Interpreter, SignatureEncodingError};
pub use self::num::{NumError, ScriptNum};
pub use self::opcode::{Capability, classify, counts_towards_op_limit};
pub use self::ops::{
    BinaryOp, Conditional, HashOp, ScriptOp, StackOp, UnaryOp, is_minimal_push, serialize,
};
pub use self::parser::{ParsedScript, Parser, parse_script};
pub use self::signature_checker::{
    NoSignatureCheck, SignatureChecker, TransactionSignatureChecker,
};
pub use self::stack::{GenericStack, Stack, StackError};
pub use self::value::{ScriptValue, cast_to_bool};
pub use self::verify::{verify_in, verify_script, verify_script_with_limits};

bitflags! {
    /// Script verification flags.
    ///
    /// https://github.com/bitcoin/bitcoin/blob/6f9db1ebcab4064065ccd787161bf2b87e03cc1f/src/script/interpreter.h#L45
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VerifyFlags: u32 {
        const NONE = 0;
        /// Evaluate P2SH subscripts (BIP16).
        const P2SH = 1 << 0;
        /// Public keys and signature hash types must be strictly encoded.
        const STRICTENC = 1 << 1;
        /// Signatures must be strict DER (BIP66).
        const DERSIG = 1 << 2;
        /// Signatures must use the lower of the two S values (BIP62 rule 5).
        const LOW_S = 1 << 3;
        /// The extra element popped by CHECKMULTISIG must be empty (BIP147).
        const NULLDUMMY = 1 << 4;
        /// The unlocking script may only contain pushes.
        const SIGPUSHONLY = 1 << 5;
        /// Pushes and numeric operands must use their shortest encoding.
        const MINIMALDATA = 1 << 6;
        /// Reject OP_NOP1 and OP_NOP4..=OP_NOP10, reserved for soft forks.
        const DISCOURAGE_UPGRADABLE_NOPS = 1 << 7;
        /// Exactly one element must remain after evaluation.
        const CLEANSTACK = 1 << 8;
        /// BIP65.
        const CHECKLOCKTIMEVERIFY = 1 << 9;
        /// BIP112.
        const CHECKSEQUENCEVERIFY = 1 << 10;
        /// A failed signature check requires an empty signature.
        const NULLFAIL = 1 << 14;
        /// OP_CODESEPARATOR and FindAndDelete fail.
        const CONST_SCRIPTCODE = 1 << 16;
    }
}

impl VerifyFlags {
    /// Flags enforced by consensus for legacy scripts after BIP16, BIP65,
    /// BIP66 and BIP112.
    pub fn consensus() -> Self {
        Self::P2SH | Self::DERSIG | Self::CHECKLOCKTIMEVERIFY | Self::CHECKSEQUENCEVERIFY
    }

    /// Consensus flags plus the relay policy rules that apply to legacy scripts.
    pub fn standard() -> Self {
        Self::consensus()
            | Self::STRICTENC
            | Self::LOW_S
            | Self::NULLDUMMY
            | Self::MINIMALDATA
            | Self::DISCOURAGE_UPGRADABLE_NOPS
            | Self::CLEANSTACK
            | Self::NULLFAIL
            | Self::CONST_SCRIPTCODE
    }
}
