//! OP_CHECKSIG and OP_CHECKMULTISIG along with their encoding rules.

use crate::VerifyFlags;
use crate::constants::{
    COMPRESSED_PUBKEY_SIZE, HALF_ORDER, MAX_PUBKEYS_PER_MULTISIG, SIGHASH_ALL,
    SIGHASH_ANYONECANPAY, SIGHASH_SINGLE,
};
use crate::environment::ScriptEnvironment;
use crate::error::Error;
use crate::ops::{ScriptOp, op_len, serialize};
use crate::signature_checker::SignatureChecker;
use crate::value::ScriptValue;
use bitcoin::Script;
use num_bigint::Sign;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureEncodingError {
    #[error("DER encoded signature is too short")]
    TooShort,
    #[error("DER encoded signature is too long")]
    TooLong,
    #[error("signature does not have the expected ASN.1 sequence ID")]
    InvalidSequenceId,
    #[error("signature length")]
    InvalidDataLength,
    #[error("R integer marker")]
    InvalidIntegerIdR,
    #[error("R length is zero")]
    ZeroLengthR,
    #[error("R is negative")]
    NegativeR,
    #[error("R value has too much padding")]
    TooMuchPaddingR,
    #[error("S integer marker")]
    InvalidIntegerIdS,
    #[error("S length is zero")]
    ZeroLengthS,
    #[error("S is negative")]
    NegativeS,
    #[error("S value has too much padding")]
    TooMuchPaddingS,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CheckSigError {
    #[error("signature found in script code while the script code is constant")]
    FindAndDelete,
    #[error("undefined signature hash type")]
    UnsupportedSigHashType,
    #[error("public key is neither compressed nor uncompressed SEC encoding")]
    BadPubKey,
    #[error("failed signature check with a non-empty signature")]
    NullFail,
    #[error("signature violates the low-S requirement")]
    HighS,
    #[error("invalid signature encoding: {0}")]
    Der(#[from] SignatureEncodingError),
}

/// Pops `[sig pubkey]` and checks the signature against the current script code.
pub(super) fn eval_checksig<C: SignatureChecker + ?Sized>(
    env: &mut ScriptEnvironment<'_>,
    checker: &C,
) -> Result<bool, Error> {
    let stack = env.stack_mut();
    let pubkey = stack.pop()?;
    let sig = stack.pop()?;

    let flags = env.flags();
    let mut script_code = env.script_code().to_vec();

    let found = find_and_delete(&mut script_code, &push_encoded(&sig));
    if found > 0 && flags.contains(VerifyFlags::CONST_SCRIPTCODE) {
        return Err(CheckSigError::FindAndDelete.into());
    }

    check_signature_encoding(&sig, flags)?;
    check_pubkey_encoding(&pubkey, flags)?;

    let success = !sig.is_empty()
        && checker.check_signature(
            env.context(),
            Script::from_bytes(&script_code),
            &sig,
            &pubkey,
        );

    if !success && flags.contains(VerifyFlags::NULLFAIL) && !sig.is_empty() {
        return Err(CheckSigError::NullFail.into());
    }

    Ok(success)
}

/// Pops `[dummy sig... m pubkey... n]` and checks that the signatures match
/// a subsequence of the keys, in order.
pub(super) fn eval_checkmultisig<C: SignatureChecker + ?Sized>(
    env: &mut ScriptEnvironment<'_>,
    checker: &C,
) -> Result<bool, Error> {
    let flags = env.flags();

    let keys_count = env.stack_mut().pop_num()?.value();
    if !(0..=MAX_PUBKEYS_PER_MULTISIG).contains(&keys_count) {
        return Err(Error::PubkeyCount(keys_count));
    }
    let keys_count = keys_count as usize;

    env.add_ops(keys_count)?;

    let stack = env.stack_mut();

    let mut keys = Vec::with_capacity(keys_count);
    for _ in 0..keys_count {
        keys.push(stack.pop()?);
    }

    let sigs_count = stack.pop_num()?.value();
    if sigs_count < 0 || sigs_count as usize > keys_count {
        return Err(Error::SigCount(sigs_count));
    }

    let mut sigs = Vec::with_capacity(sigs_count as usize);
    for _ in 0..sigs_count {
        sigs.push(stack.pop()?);
    }

    // One element more than the signatures is consumed. Its value is
    // ignored unless NULLDUMMY is set.
    let dummy = stack.pop()?;
    if flags.contains(VerifyFlags::NULLDUMMY) && !dummy.is_empty() {
        return Err(Error::NullDummy(dummy.len()));
    }

    let mut script_code = env.script_code().to_vec();
    for sig in &sigs {
        let found = find_and_delete(&mut script_code, &push_encoded(sig));
        if found > 0 && flags.contains(VerifyFlags::CONST_SCRIPTCODE) {
            return Err(CheckSigError::FindAndDelete.into());
        }
    }
    let script_code = Script::from_bytes(&script_code);

    let mut success = true;
    let mut checked_keys = 0;
    let mut satisfied_sigs = 0;

    while satisfied_sigs < sigs.len() && success {
        let key = &keys[checked_keys];
        let sig = &sigs[satisfied_sigs];

        check_signature_encoding(sig, flags)?;
        check_pubkey_encoding(key, flags)?;

        if !sig.is_empty() && checker.check_signature(env.context(), script_code, sig, key) {
            satisfied_sigs += 1;
        }

        checked_keys += 1;

        // Fail early once the remaining keys cannot cover the remaining sigs.
        success = keys.len() - checked_keys >= sigs.len() - satisfied_sigs;
    }

    if !success && flags.contains(VerifyFlags::NULLFAIL) && sigs.iter().any(|sig| !sig.is_empty())
    {
        return Err(CheckSigError::NullFail.into());
    }

    Ok(success)
}

/// The push `CScript() << sig` produces, which is what FindAndDelete removes.
fn push_encoded(sig: &ScriptValue) -> Vec<u8> {
    serialize(&[ScriptOp::push(sig.as_bytes())])
}

/// Removes every occurrence of `pattern` that starts on an opcode boundary.
/// Returns the number of occurrences removed.
pub(super) fn find_and_delete(script: &mut Vec<u8>, pattern: &[u8]) -> usize {
    if pattern.is_empty() {
        return 0;
    }

    let mut found = 0;
    let mut result = Vec::with_capacity(script.len());
    let mut pc = 0;
    let mut kept_from = 0;

    loop {
        result.extend_from_slice(&script[kept_from..pc]);
        while script[pc..].starts_with(pattern) {
            pc += pattern.len();
            found += 1;
        }
        kept_from = pc;
        match op_len(script, pc) {
            Some(len) => pc += len,
            None => break,
        }
    }

    if found > 0 {
        result.extend_from_slice(&script[kept_from..]);
        *script = result;
    }

    found
}

pub(super) fn check_signature_encoding(sig: &[u8], flags: VerifyFlags) -> Result<(), CheckSigError> {
    // Empty signature. Not strictly DER encoded, but allowed to provide a
    // compact way to provide an invalid signature for use with CHECK(MULTI)SIG
    if sig.is_empty() {
        return Ok(());
    }

    if flags.intersects(VerifyFlags::DERSIG | VerifyFlags::LOW_S | VerifyFlags::STRICTENC) {
        is_valid_signature_encoding(sig)?;
    }

    if flags.contains(VerifyFlags::LOW_S) {
        is_low_der_signature(sig)?;
    }

    if flags.contains(VerifyFlags::STRICTENC) && !is_defined_hashtype_signature(sig) {
        return Err(CheckSigError::UnsupportedSigHashType);
    }

    Ok(())
}

struct EncodedS {
    offset: usize,
    length: usize,
}

// 0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S] [sighash-type]
//
// https://github.com/bitcoin/bips/blob/master/bip-0062.mediawiki#der-encoding
fn is_valid_signature_encoding(sig: &[u8]) -> Result<EncodedS, SignatureEncodingError> {
    if sig.len() < 9 {
        return Err(SignatureEncodingError::TooShort);
    }

    if sig.len() > 73 {
        return Err(SignatureEncodingError::TooLong);
    }

    if sig[0] != 0x30 {
        return Err(SignatureEncodingError::InvalidSequenceId);
    }

    // The length covers the entire signature except the type, length and
    // sighash bytes.
    if sig[1] as usize != sig.len() - 3 {
        return Err(SignatureEncodingError::InvalidDataLength);
    }

    let len_r = sig[3] as usize;

    if 5 + len_r >= sig.len() {
        return Err(SignatureEncodingError::InvalidDataLength);
    }

    let len_s = sig[5 + len_r] as usize;

    if len_r + len_s + 7 != sig.len() {
        return Err(SignatureEncodingError::InvalidDataLength);
    }

    if sig[2] != 0x02 {
        return Err(SignatureEncodingError::InvalidIntegerIdR);
    }

    if len_r == 0 {
        return Err(SignatureEncodingError::ZeroLengthR);
    }

    if sig[4] & 0x80 != 0 {
        return Err(SignatureEncodingError::NegativeR);
    }

    // A leading null byte is only allowed when R would otherwise be negative.
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return Err(SignatureEncodingError::TooMuchPaddingR);
    }

    if sig[len_r + 4] != 0x02 {
        return Err(SignatureEncodingError::InvalidIntegerIdS);
    }

    if len_s == 0 {
        return Err(SignatureEncodingError::ZeroLengthS);
    }

    if sig[len_r + 6] & 0x80 != 0 {
        return Err(SignatureEncodingError::NegativeS);
    }

    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return Err(SignatureEncodingError::TooMuchPaddingS);
    }

    Ok(EncodedS {
        offset: len_r + 6,
        length: len_s,
    })
}

fn is_low_der_signature(sig: &[u8]) -> Result<(), CheckSigError> {
    let encoded_s = is_valid_signature_encoding(sig)?;
    let s_bytes = &sig[encoded_s.offset..encoded_s.offset + encoded_s.length];
    let s_value = num_bigint::BigInt::from_bytes_be(Sign::Plus, s_bytes);

    if s_value > *HALF_ORDER {
        return Err(CheckSigError::HighS);
    }

    Ok(())
}

fn is_defined_hashtype_signature(sig: &[u8]) -> bool {
    let Some(&last) = sig.last() else {
        return false;
    };

    let hash_type = last & !SIGHASH_ANYONECANPAY;
    (SIGHASH_ALL..=SIGHASH_SINGLE).contains(&hash_type)
}

pub(super) fn check_pubkey_encoding(pubkey: &[u8], flags: VerifyFlags) -> Result<(), CheckSigError> {
    if flags.contains(VerifyFlags::STRICTENC) && !is_public_key(pubkey) {
        return Err(CheckSigError::BadPubKey);
    }
    Ok(())
}

fn is_public_key(v: &[u8]) -> bool {
    match v.len() {
        COMPRESSED_PUBKEY_SIZE => v[0] == 2 || v[0] == 3,
        65 => v[0] == 4,
        _ => false,
    }
}
