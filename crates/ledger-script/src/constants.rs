use num_traits::Num;
use std::sync::LazyLock;

/// Maximum number of bytes pushable to the stack.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum script length in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// The maximum combined height of stack and alt stack during script execution.
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;

/// Maximum number of public keys per multisig.
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;

/// Size of a compressed SEC1 public key.
pub const COMPRESSED_PUBKEY_SIZE: usize = 33;

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Threshold for nLockTime: below this value it is interpreted as block number,
/// otherwise as UNIX timestamp.
pub const LOCKTIME_THRESHOLD: i64 = 500_000_000;

/// Setting nSequence to this value for every input in a transaction disables
/// nLockTime.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Below flags apply in the context of BIP 68
/// If this flag set, CTxIn::nSequence is NOT interpreted as a relative lock-time.
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1u32 << 31;

/// If CTxIn::nSequence encodes a relative lock-time and this flag is set, the
/// relative lock-time has units of 512 seconds, otherwise it specifies blocks.
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1u32 << 22;

/// If CTxIn::nSequence encodes a relative lock-time, this mask is applied to
/// extract that lock-time from the sequence field.
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;

/// Half the order of the secp256k1 curve, the upper bound of a low-S signature.
pub static HALF_ORDER: LazyLock<num_bigint::BigInt> = LazyLock::new(|| {
    const HALF_N: &str = "7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0";
    num_bigint::BigInt::from_str_radix(HALF_N, 16).expect("Static value must be valid")
});
