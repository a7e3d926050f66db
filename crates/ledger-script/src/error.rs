use crate::interpreter::CheckSigError;
use crate::num::NumError;
use crate::stack::StackError;
use bitcoin::opcodes::Opcode;

/// Coarse classification of a script failure.
///
/// Callers reject the input for every kind alike; the kind exists for
/// diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed control flow or push data.
    StructuralParse,
    /// A disabled opcode appears anywhere in the script.
    DisabledOperation,
    /// An opcode that is invalid even in an unexecuted branch.
    StaticallyInvalidOperation,
    /// An opcode that is only invalid once it is reached.
    RuntimeInvalidOperation,
    StackUnderflow,
    /// A verify-style check failed or the final stack is not true.
    VerificationFailed,
    /// A consensus size limit or a caller supplied budget was exceeded.
    ResourceExceeded,
    /// An operand has the wrong shape: bad number, bad key count, bad encoding.
    InvalidOperand,
}

/// Errors raised while building the control-flow tree.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum StructureError {
    #[error("OP_ELSE at byte {0} without an open OP_IF/OP_NOTIF")]
    UnexpectedElse(usize),
    #[error("OP_ENDIF at byte {0} without an open OP_IF/OP_NOTIF")]
    UnexpectedEndIf(usize),
    #[error("second OP_ELSE at byte {0} for the same conditional")]
    DuplicateElse(usize),
    #[error("script ended with {open} unterminated conditional(s), innermost opened at byte {opened_at}")]
    UnexpectedEndOfScript { open: usize, opened_at: usize },
    #[error("{opcode} at byte {offset} pushes past the end of the script")]
    TruncatedPush { opcode: Opcode, offset: usize },
}

/// Script error type.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The script evaluated without error but terminated with an empty stack
    /// or a false top stack element.
    #[error("script terminated with a false stack element")]
    EvalFalse,

    // Max sizes.
    #[error("script is {0} bytes, exceeding the size limit")]
    ScriptSize(usize),
    #[error("push of {0} bytes exceeds the element size limit")]
    PushSize(usize),
    #[error("exceeds max operations per script")]
    OpCount,
    // Stack and altstack combined depth is over the limit.
    #[error("exceeds stack size limit")]
    StackSize,
    #[error("conditional nesting exceeds {0} open frames")]
    NestingDepth(usize),
    #[error("execution step budget of {0} exhausted")]
    StepBudget(usize),
    #[error("execution deadline passed")]
    Deadline,

    #[error(transparent)]
    Structure(#[from] StructureError),

    // Classification failures.
    #[error("script contains disabled opcode {0}")]
    DisabledOpcode(Opcode),
    #[error("script contains invalid opcode {0}")]
    StaticallyInvalidOpcode(Opcode),
    #[error("attempt to execute invalid opcode {0}")]
    InvalidOpcodeExecuted(Opcode),
    #[error("{0} executed while upgradable NOPs are discouraged")]
    DiscourageUpgradableNops(Opcode),
    #[error("OP_CODESEPARATOR executed while the script code is constant")]
    CodeSeparator,

    #[error(transparent)]
    Stack(#[from] StackError),
    #[error("OP_FROMALTSTACK on an empty alt stack")]
    InvalidAltStackOperation,

    // Failed verify operations.
    #[error("{0} failed")]
    Verify(Opcode),
    #[error("required lock time has not been reached")]
    UnsatisfiedLocktime,
    #[error("stack holds {0} elements after evaluation, expected exactly one")]
    CleanStack(usize),
    #[error("unlocking script is not push only")]
    SigPushOnly,

    // Operands.
    #[error(transparent)]
    Num(#[from] NumError),
    #[error("lock time operand is negative")]
    NegativeLocktime,
    #[error("stack index {0} out of range")]
    InvalidStackIndex(i64),
    #[error("invalid number of public keys: {0}")]
    PubkeyCount(i64),
    #[error("invalid number of signatures: {0}")]
    SigCount(i64),
    #[error("multisig dummy argument has length {0} instead of 0")]
    NullDummy(usize),
    #[error("{0} is not the minimal push for its data")]
    MinimalData(Opcode),
    #[error(transparent)]
    CheckSig(#[from] CheckSigError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Structure(_) => ErrorKind::StructuralParse,
            Self::DisabledOpcode(_) => ErrorKind::DisabledOperation,
            Self::StaticallyInvalidOpcode(_) => ErrorKind::StaticallyInvalidOperation,
            Self::InvalidOpcodeExecuted(_)
            | Self::DiscourageUpgradableNops(_)
            | Self::CodeSeparator => ErrorKind::RuntimeInvalidOperation,
            Self::Stack(StackError::Underflow) | Self::InvalidAltStackOperation => {
                ErrorKind::StackUnderflow
            }
            Self::Verify(_)
            | Self::EvalFalse
            | Self::UnsatisfiedLocktime
            | Self::CleanStack(_)
            | Self::SigPushOnly => ErrorKind::VerificationFailed,
            Self::ScriptSize(_)
            | Self::PushSize(_)
            | Self::OpCount
            | Self::StackSize
            | Self::NestingDepth(_)
            | Self::StepBudget(_)
            | Self::Deadline => ErrorKind::ResourceExceeded,
            Self::Num(_)
            | Self::Stack(StackError::Num(_))
            | Self::NegativeLocktime
            | Self::InvalidStackIndex(_)
            | Self::PubkeyCount(_)
            | Self::SigCount(_)
            | Self::NullDummy(_)
            | Self::MinimalData(_)
            | Self::CheckSig(_) => ErrorKind::InvalidOperand,
        }
    }
}
