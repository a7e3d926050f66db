//! The closed set of script operations produced by the parser.

use crate::opcode::{Capability, classify};
use crate::value::ScriptValue;
use bitcoin::opcodes::Opcode;
use bitcoin::opcodes::all::*;
use std::fmt;

/// Stack manipulation opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOp {
    ToAltStack,
    FromAltStack,
    Drop2,
    Dup2,
    Dup3,
    Over2,
    Rot2,
    Swap2,
    IfDup,
    Depth,
    Drop,
    Dup,
    Nip,
    Over,
    Pick,
    Roll,
    Rot,
    Swap,
    Tuck,
}

impl StackOp {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::ToAltStack => OP_TOALTSTACK,
            Self::FromAltStack => OP_FROMALTSTACK,
            Self::Drop2 => OP_2DROP,
            Self::Dup2 => OP_2DUP,
            Self::Dup3 => OP_3DUP,
            Self::Over2 => OP_2OVER,
            Self::Rot2 => OP_2ROT,
            Self::Swap2 => OP_2SWAP,
            Self::IfDup => OP_IFDUP,
            Self::Depth => OP_DEPTH,
            Self::Drop => OP_DROP,
            Self::Dup => OP_DUP,
            Self::Nip => OP_NIP,
            Self::Over => OP_OVER,
            Self::Pick => OP_PICK,
            Self::Roll => OP_ROLL,
            Self::Rot => OP_ROT,
            Self::Swap => OP_SWAP,
            Self::Tuck => OP_TUCK,
        }
    }
}

/// Numeric opcodes taking one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Add1,
    Sub1,
    Negate,
    Abs,
    Not,
    NotEqual0,
}

impl UnaryOp {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Add1 => OP_1ADD,
            Self::Sub1 => OP_1SUB,
            Self::Negate => OP_NEGATE,
            Self::Abs => OP_ABS,
            Self::Not => OP_NOT,
            Self::NotEqual0 => OP_0NOTEQUAL,
        }
    }
}

/// Numeric opcodes taking two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    BoolAnd,
    BoolOr,
    NumEqual,
    NumEqualVerify,
    NumNotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Min,
    Max,
}

impl BinaryOp {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Add => OP_ADD,
            Self::Sub => OP_SUB,
            Self::BoolAnd => OP_BOOLAND,
            Self::BoolOr => OP_BOOLOR,
            Self::NumEqual => OP_NUMEQUAL,
            Self::NumEqualVerify => OP_NUMEQUALVERIFY,
            Self::NumNotEqual => OP_NUMNOTEQUAL,
            Self::LessThan => OP_LESSTHAN,
            Self::GreaterThan => OP_GREATERTHAN,
            Self::LessThanOrEqual => OP_LESSTHANOREQUAL,
            Self::GreaterThanOrEqual => OP_GREATERTHANOREQUAL,
            Self::Min => OP_MIN,
            Self::Max => OP_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashOp {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl HashOp {
    pub fn opcode(self) -> Opcode {
        match self {
            Self::Ripemd160 => OP_RIPEMD160,
            Self::Sha1 => OP_SHA1,
            Self::Sha256 => OP_SHA256,
            Self::Hash160 => OP_HASH160,
            Self::Hash256 => OP_HASH256,
        }
    }
}

/// An `OP_IF`/`OP_NOTIF` ... [`OP_ELSE` ...] `OP_ENDIF` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    /// `true` for `OP_NOTIF`.
    pub invert: bool,
    pub then_branch: Vec<ScriptOp>,
    pub else_branch: Option<Vec<ScriptOp>>,
}

/// A single script operation.
///
/// Every opcode belongs to exactly one variant. Direct pushes of 1 to 75
/// bytes are one family, `OP_IF`/`OP_NOTIF` blocks are folded into
/// [`Conditional`] by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOp {
    /// `OP_0`, `OP_PUSHBYTES_N` and `OP_PUSHDATA1/2/4`. The opcode is kept so
    /// non-minimal encodings serialize back unchanged.
    PushData { opcode: Opcode, data: ScriptValue },
    /// `OP_1NEGATE` and `OP_1`..=`OP_16`.
    PushNum(i8),
    Conditional(Conditional),
    /// `OP_NOP` and the upgradable `OP_NOP1`, `OP_NOP4`..=`OP_NOP10`.
    Nop(Opcode),
    Verify,
    Stack(StackOp),
    Size,
    Equal { verify: bool },
    Unary(UnaryOp),
    Binary(BinaryOp),
    Within,
    Hash(HashOp),
    /// Byte offset just past the separator in the script it was parsed from.
    CodeSeparator { offset: usize },
    CheckSig { verify: bool },
    CheckMultiSig { verify: bool },
    CheckLockTimeVerify,
    CheckSequenceVerify,
    Disabled(Opcode),
    AlwaysInvalid(Opcode),
    InvalidIfExecuted(Opcode),
}

impl ScriptOp {
    /// Maps an opcode that carries no operand and opens no block.
    ///
    /// Returns `None` for push data, `OP_IF`/`OP_NOTIF`/`OP_ELSE`/`OP_ENDIF`
    /// and `OP_CODESEPARATOR`, whose operations depend on their position.
    pub fn from_opcode(opcode: Opcode) -> Option<Self> {
        let op = match opcode {
            OP_PUSHNUM_NEG1 | OP_PUSHNUM_1 | OP_PUSHNUM_2 | OP_PUSHNUM_3 | OP_PUSHNUM_4
            | OP_PUSHNUM_5 | OP_PUSHNUM_6 | OP_PUSHNUM_7 | OP_PUSHNUM_8 | OP_PUSHNUM_9
            | OP_PUSHNUM_10 | OP_PUSHNUM_11 | OP_PUSHNUM_12 | OP_PUSHNUM_13 | OP_PUSHNUM_14
            | OP_PUSHNUM_15 | OP_PUSHNUM_16 => {
                Self::PushNum((i16::from(opcode.to_u8()) - i16::from(OP_RESERVED.to_u8())) as i8)
            }
            OP_NOP | OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9
            | OP_NOP10 => Self::Nop(opcode),
            OP_VERIFY => Self::Verify,

            OP_TOALTSTACK => Self::Stack(StackOp::ToAltStack),
            OP_FROMALTSTACK => Self::Stack(StackOp::FromAltStack),
            OP_2DROP => Self::Stack(StackOp::Drop2),
            OP_2DUP => Self::Stack(StackOp::Dup2),
            OP_3DUP => Self::Stack(StackOp::Dup3),
            OP_2OVER => Self::Stack(StackOp::Over2),
            OP_2ROT => Self::Stack(StackOp::Rot2),
            OP_2SWAP => Self::Stack(StackOp::Swap2),
            OP_IFDUP => Self::Stack(StackOp::IfDup),
            OP_DEPTH => Self::Stack(StackOp::Depth),
            OP_DROP => Self::Stack(StackOp::Drop),
            OP_DUP => Self::Stack(StackOp::Dup),
            OP_NIP => Self::Stack(StackOp::Nip),
            OP_OVER => Self::Stack(StackOp::Over),
            OP_PICK => Self::Stack(StackOp::Pick),
            OP_ROLL => Self::Stack(StackOp::Roll),
            OP_ROT => Self::Stack(StackOp::Rot),
            OP_SWAP => Self::Stack(StackOp::Swap),
            OP_TUCK => Self::Stack(StackOp::Tuck),

            OP_SIZE => Self::Size,
            OP_EQUAL => Self::Equal { verify: false },
            OP_EQUALVERIFY => Self::Equal { verify: true },

            OP_1ADD => Self::Unary(UnaryOp::Add1),
            OP_1SUB => Self::Unary(UnaryOp::Sub1),
            OP_NEGATE => Self::Unary(UnaryOp::Negate),
            OP_ABS => Self::Unary(UnaryOp::Abs),
            OP_NOT => Self::Unary(UnaryOp::Not),
            OP_0NOTEQUAL => Self::Unary(UnaryOp::NotEqual0),

            OP_ADD => Self::Binary(BinaryOp::Add),
            OP_SUB => Self::Binary(BinaryOp::Sub),
            OP_BOOLAND => Self::Binary(BinaryOp::BoolAnd),
            OP_BOOLOR => Self::Binary(BinaryOp::BoolOr),
            OP_NUMEQUAL => Self::Binary(BinaryOp::NumEqual),
            OP_NUMEQUALVERIFY => Self::Binary(BinaryOp::NumEqualVerify),
            OP_NUMNOTEQUAL => Self::Binary(BinaryOp::NumNotEqual),
            OP_LESSTHAN => Self::Binary(BinaryOp::LessThan),
            OP_GREATERTHAN => Self::Binary(BinaryOp::GreaterThan),
            OP_LESSTHANOREQUAL => Self::Binary(BinaryOp::LessThanOrEqual),
            OP_GREATERTHANOREQUAL => Self::Binary(BinaryOp::GreaterThanOrEqual),
            OP_MIN => Self::Binary(BinaryOp::Min),
            OP_MAX => Self::Binary(BinaryOp::Max),
            OP_WITHIN => Self::Within,

            OP_RIPEMD160 => Self::Hash(HashOp::Ripemd160),
            OP_SHA1 => Self::Hash(HashOp::Sha1),
            OP_SHA256 => Self::Hash(HashOp::Sha256),
            OP_HASH160 => Self::Hash(HashOp::Hash160),
            OP_HASH256 => Self::Hash(HashOp::Hash256),

            OP_CHECKSIG => Self::CheckSig { verify: false },
            OP_CHECKSIGVERIFY => Self::CheckSig { verify: true },
            OP_CHECKMULTISIG => Self::CheckMultiSig { verify: false },
            OP_CHECKMULTISIGVERIFY => Self::CheckMultiSig { verify: true },
            OP_CLTV => Self::CheckLockTimeVerify,
            OP_CSV => Self::CheckSequenceVerify,

            _ => match classify(opcode) {
                Capability::Disabled => Self::Disabled(opcode),
                Capability::AlwaysInvalid => Self::AlwaysInvalid(opcode),
                Capability::InvalidIfExecuted => Self::InvalidIfExecuted(opcode),
                Capability::Normal | Capability::InternalOnly => return None,
            },
        };

        Some(op)
    }

    /// Shortest push of `data` that does not use the small-integer opcodes.
    pub fn push(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let opcode = match data.len() {
            len @ 0..=75 => Opcode::from(len as u8),
            76..=0xff => OP_PUSHDATA1,
            0x100..=0xffff => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        Self::PushData {
            opcode,
            data: data.into(),
        }
    }

    /// The opcode this operation starts with; `OP_IF`/`OP_NOTIF` for a
    /// conditional block.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::PushData { opcode, .. } => *opcode,
            Self::PushNum(n) => Opcode::from((i16::from(OP_RESERVED.to_u8()) + i16::from(*n)) as u8),
            Self::Conditional(cond) if cond.invert => OP_NOTIF,
            Self::Conditional(_) => OP_IF,
            Self::Nop(opcode)
            | Self::Disabled(opcode)
            | Self::AlwaysInvalid(opcode)
            | Self::InvalidIfExecuted(opcode) => *opcode,
            Self::Verify => OP_VERIFY,
            Self::Stack(op) => op.opcode(),
            Self::Size => OP_SIZE,
            Self::Equal { verify: false } => OP_EQUAL,
            Self::Equal { verify: true } => OP_EQUALVERIFY,
            Self::Unary(op) => op.opcode(),
            Self::Binary(op) => op.opcode(),
            Self::Within => OP_WITHIN,
            Self::Hash(op) => op.opcode(),
            Self::CodeSeparator { .. } => OP_CODESEPARATOR,
            Self::CheckSig { verify: false } => OP_CHECKSIG,
            Self::CheckSig { verify: true } => OP_CHECKSIGVERIFY,
            Self::CheckMultiSig { verify: false } => OP_CHECKMULTISIG,
            Self::CheckMultiSig { verify: true } => OP_CHECKMULTISIGVERIFY,
            Self::CheckLockTimeVerify => OP_CLTV,
            Self::CheckSequenceVerify => OP_CSV,
        }
    }

    /// A conditional block runs its selected branch, so it is `Normal`
    /// even though its markers are parser-internal.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Conditional(_) => Capability::Normal,
            op => classify(op.opcode()),
        }
    }

    /// Appends the exact byte encoding of this operation.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        match self {
            Self::PushData { opcode, data } => {
                out.push(opcode.to_u8());
                let len = data.len();
                match *opcode {
                    OP_PUSHDATA1 => out.push(len as u8),
                    OP_PUSHDATA2 => out.extend_from_slice(&(len as u16).to_le_bytes()),
                    OP_PUSHDATA4 => out.extend_from_slice(&(len as u32).to_le_bytes()),
                    _ => {}
                }
                out.extend_from_slice(data);
            }
            Self::Conditional(cond) => {
                out.push(self.opcode().to_u8());
                cond.then_branch.iter().for_each(|op| op.serialize(out));
                if let Some(else_branch) = &cond.else_branch {
                    out.push(OP_ELSE.to_u8());
                    else_branch.iter().for_each(|op| op.serialize(out));
                }
                out.push(OP_ENDIF.to_u8());
            }
            op => out.push(op.opcode().to_u8()),
        }
    }
}

/// Re-encodes a parsed operation list into script bytes.
pub fn serialize(ops: &[ScriptOp]) -> Vec<u8> {
    let mut out = Vec::new();
    ops.iter().for_each(|op| op.serialize(&mut out));
    out
}

/// Whether `opcode` is the smallest way to push `data`.
pub fn is_minimal_push(opcode: Opcode, data: &[u8]) -> bool {
    match data {
        [] => opcode == OP_PUSHBYTES_0,
        [n @ 1..=16] => opcode.to_u8() == OP_PUSHNUM_1.to_u8() + n - 1,
        [0x81] => opcode == OP_PUSHNUM_NEG1,
        _ if data.len() <= 75 => opcode.to_u8() as usize == data.len(),
        _ if data.len() <= 0xff => opcode == OP_PUSHDATA1,
        _ if data.len() <= 0xffff => opcode == OP_PUSHDATA2,
        _ => true,
    }
}

/// Byte length of the operation starting at `pos`, or `None` at the end of
/// the script or on a truncated push.
pub(crate) fn op_len(script: &[u8], pos: usize) -> Option<usize> {
    let opcode = *script.get(pos)?;
    let (prefix_len, data_len) = match opcode {
        0x00..=0x4b => (0, opcode as usize),
        0x4c => (1, *script.get(pos + 1)? as usize),
        0x4d => {
            let prefix = script.get(pos + 1..pos + 3)?;
            (2, u16::from_le_bytes([prefix[0], prefix[1]]) as usize)
        }
        0x4e => {
            let prefix = script.get(pos + 1..pos + 5)?;
            (
                4,
                u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize,
            )
        }
        _ => (0, 0),
    };
    let len = 1 + prefix_len + data_len;
    (pos + len <= script.len()).then_some(len)
}

/// `script` with every `OP_CODESEPARATOR` removed, which is the form the
/// legacy sighash commits to. Bytes after a truncated push are kept as is.
pub(crate) fn remove_code_separators(script: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(script.len());
    let mut pos = 0;
    while let Some(len) = op_len(script, pos) {
        if script[pos] != OP_CODESEPARATOR.to_u8() {
            out.extend_from_slice(&script[pos..pos + len]);
        }
        pos += len;
    }
    out.extend_from_slice(script.get(pos..).unwrap_or_default());
    out
}

fn fmt_ops(f: &mut fmt::Formatter<'_>, ops: &[ScriptOp]) -> fmt::Result {
    for op in ops {
        write!(f, " {op}")?;
    }
    Ok(())
}

impl fmt::Display for ScriptOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushData { data, .. } if data.is_empty() => write!(f, "0"),
            Self::PushData { data, .. } => write!(f, "<{data}>"),
            Self::PushNum(n) => write!(f, "{n}"),
            Self::Conditional(cond) => {
                write!(f, "{}", self.opcode())?;
                fmt_ops(f, &cond.then_branch)?;
                if let Some(else_branch) = &cond.else_branch {
                    write!(f, " {OP_ELSE}")?;
                    fmt_ops(f, else_branch)?;
                }
                write!(f, " {OP_ENDIF}")
            }
            op => write!(f, "{}", op.opcode()),
        }
    }
}
