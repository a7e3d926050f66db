use crate::constants::{
    LOCKTIME_THRESHOLD, SEQUENCE_FINAL, SEQUENCE_LOCKTIME_DISABLE_FLAG, SEQUENCE_LOCKTIME_MASK,
    SEQUENCE_LOCKTIME_TYPE_FLAG,
};
use crate::environment::TransactionContext;
use crate::num::ScriptNum;
use crate::ops::remove_code_separators;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{self, Message, Secp256k1, VerifyOnly};
use bitcoin::sighash::SighashCache;
use bitcoin::{Script, ScriptBuf};
use std::sync::LazyLock;

pub(crate) static SECP: LazyLock<Secp256k1<VerifyOnly>> =
    LazyLock::new(Secp256k1::verification_only);

/// Cryptographic and lock-time checks the interpreter delegates to.
///
/// Implementations are shared by reference, so a single checker can serve
/// validations running on many threads.
pub trait SignatureChecker {
    /// Verifies `signature` (DER plus the trailing sighash type byte) by
    /// `pubkey` over `script_code`.
    fn check_signature(
        &self,
        ctx: &TransactionContext<'_>,
        script_code: &Script,
        signature: &[u8],
        pubkey: &[u8],
    ) -> bool;

    /// BIP65: whether the transaction's lock time satisfies `lock_time`.
    fn check_lock_time(&self, ctx: &TransactionContext<'_>, lock_time: ScriptNum) -> bool;

    /// BIP112: whether the input's relative lock time satisfies `sequence`.
    fn check_sequence(&self, ctx: &TransactionContext<'_>, sequence: ScriptNum) -> bool;
}

/// Accepts every signature and lock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSignatureCheck;

impl SignatureChecker for NoSignatureCheck {
    fn check_signature(
        &self,
        _ctx: &TransactionContext<'_>,
        _script_code: &Script,
        _signature: &[u8],
        _pubkey: &[u8],
    ) -> bool {
        true
    }

    fn check_lock_time(&self, _ctx: &TransactionContext<'_>, _lock_time: ScriptNum) -> bool {
        true
    }

    fn check_sequence(&self, _ctx: &TransactionContext<'_>, _sequence: ScriptNum) -> bool {
        true
    }
}

/// Checks signatures against the legacy sighash of the spending transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionSignatureChecker;

impl TransactionSignatureChecker {
    fn verify_ecdsa(
        ctx: &TransactionContext<'_>,
        script_code: &Script,
        signature: &[u8],
        pubkey: &[u8],
    ) -> Result<(), VerifyError> {
        // Hybrid keys (0x06/0x07) are valid here unless STRICTENC rejected
        // them earlier.
        let pubkey =
            secp256k1::PublicKey::from_slice(pubkey).map_err(|_| VerifyError::PublicKey)?;

        let (&sighash_type, der) = signature.split_last().ok_or(VerifyError::EmptySignature)?;

        let mut sig = secp256k1::ecdsa::Signature::from_der_lax(der)?;
        // libsecp256k1 only accepts low-S signatures, older ones may not be.
        sig.normalize_s();

        let script_code = ScriptBuf::from_bytes(remove_code_separators(script_code.as_bytes()));
        let sighash = SighashCache::new(ctx.transaction)
            .legacy_signature_hash(ctx.input_index, &script_code, u32::from(sighash_type))
            .map_err(|_| VerifyError::InputIndex(ctx.input_index))?;

        let msg = Message::from_digest(sighash.to_byte_array());

        Ok(SECP.verify_ecdsa(&msg, &sig, &pubkey)?)
    }
}

#[derive(Debug, thiserror::Error)]
enum VerifyError {
    #[error("invalid public key encoding")]
    PublicKey,
    #[error("empty signature")]
    EmptySignature,
    #[error("input index {0} out of range")]
    InputIndex(usize),
    #[error(transparent)]
    Secp256k1(#[from] secp256k1::Error),
}

impl SignatureChecker for TransactionSignatureChecker {
    fn check_signature(
        &self,
        ctx: &TransactionContext<'_>,
        script_code: &Script,
        signature: &[u8],
        pubkey: &[u8],
    ) -> bool {
        match Self::verify_ecdsa(ctx, script_code, signature, pubkey) {
            Ok(()) => true,
            Err(err) => {
                tracing::trace!(target: "script", %err, input = ctx.input_index, "Signature check failed");
                false
            }
        }
    }

    fn check_lock_time(&self, ctx: &TransactionContext<'_>, lock_time: ScriptNum) -> bool {
        let tx_lock_time = i64::from(ctx.transaction.lock_time.to_consensus_u32());
        let lock_time = lock_time.value();

        // Block heights and timestamps are not comparable.
        if (tx_lock_time < LOCKTIME_THRESHOLD) != (lock_time < LOCKTIME_THRESHOLD) {
            return false;
        }

        if lock_time > tx_lock_time {
            return false;
        }

        // A final input disables the transaction lock time, which would let
        // the spender bypass the check.
        ctx.transaction
            .input
            .get(ctx.input_index)
            .is_some_and(|input| input.sequence.to_consensus_u32() != SEQUENCE_FINAL)
    }

    fn check_sequence(&self, ctx: &TransactionContext<'_>, sequence: ScriptNum) -> bool {
        let Some(input) = ctx.transaction.input.get(ctx.input_index) else {
            return false;
        };

        let tx_sequence = i64::from(input.sequence.to_consensus_u32());

        // Relative lock times are only enforced from version 2 on. The
        // version is compared unsigned.
        if (ctx.transaction.version.0 as u32) < 2 {
            return false;
        }

        if tx_sequence & i64::from(SEQUENCE_LOCKTIME_DISABLE_FLAG) != 0 {
            return false;
        }

        let mask = i64::from(SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK);
        let type_flag = i64::from(SEQUENCE_LOCKTIME_TYPE_FLAG);
        let tx_masked = tx_sequence & mask;
        let required_masked = sequence.value() & mask;

        if (tx_masked < type_flag) != (required_masked < type_flag) {
            return false;
        }

        required_masked <= tx_masked
    }
}
