use crate::VerifyFlags;
use crate::config::ScriptLimits;
use crate::environment::{ScriptEnvironment, TransactionContext};
use crate::error::Error;
use crate::interpreter::{Interpreter, ensure_true_top};
use crate::signature_checker::SignatureChecker;
use bitcoin::Script;

/// Verifies that `unlocking` satisfies `locking` for the input described by
/// `ctx`, under consensus limits.
///
/// - Ok(()): the input is valid.
/// - Err(err): the input is rejected, `err` says why.
pub fn verify_script(
    unlocking: &Script,
    locking: &Script,
    ctx: TransactionContext<'_>,
    flags: VerifyFlags,
    checker: &impl SignatureChecker,
) -> Result<(), Error> {
    verify_script_with_limits(
        unlocking,
        locking,
        ctx,
        flags,
        checker,
        &ScriptLimits::default(),
    )
}

/// [`verify_script`] under caller supplied limits.
pub fn verify_script_with_limits(
    unlocking: &Script,
    locking: &Script,
    ctx: TransactionContext<'_>,
    flags: VerifyFlags,
    checker: &impl SignatureChecker,
    limits: &ScriptLimits,
) -> Result<(), Error> {
    let mut env = ScriptEnvironment::new(ctx, flags).with_limits(limits.clone());

    verify_in(unlocking, locking, &mut env, checker).inspect_err(|err| {
        tracing::debug!(
            target: "script",
            input = ctx.input_index,
            kind = ?err.kind(),
            "Script rejected: {err}"
        );
    })
}

/// Runs a validation in a prepared environment, which lets callers attach a
/// deadline.
pub fn verify_in(
    unlocking: &Script,
    locking: &Script,
    env: &mut ScriptEnvironment<'_>,
    checker: &impl SignatureChecker,
) -> Result<(), Error> {
    let flags = env.flags();

    if flags.contains(VerifyFlags::SIGPUSHONLY) && !unlocking.is_push_only() {
        return Err(Error::SigPushOnly);
    }

    let interpreter = Interpreter::new(checker);

    let mut stack_copy = None;
    interpreter.execute_with(locking, unlocking, env, |stack| {
        if flags.contains(VerifyFlags::P2SH) {
            stack_copy = Some(stack.clone());
        }
    })?;

    // BIP16: the last element pushed by the unlocking script is a serialized
    // script that must also succeed on the remaining elements.
    if let Some(stack_copy) = stack_copy.filter(|_| locking.is_p2sh()) {
        if !unlocking.is_push_only() {
            return Err(Error::SigPushOnly);
        }

        env.replace_stack(stack_copy);

        // Cannot underflow: the hash comparison in the locking script
        // would have failed on an empty stack.
        let redeem_script = env.stack_mut().pop()?.into_bytes();

        tracing::debug!(
            target: "script",
            len = redeem_script.len(),
            "Evaluating P2SH redeem script"
        );

        interpreter.run(Script::from_bytes(&redeem_script), env)?;
        ensure_true_top(env.stack())?;
    }

    // Checked after P2SH evaluation, since the outer evaluation of a P2SH
    // spend leaves the redeem script inputs behind.
    if flags.contains(VerifyFlags::CLEANSTACK) && env.stack().len() != 1 {
        return Err(Error::CleanStack(env.stack().len()));
    }

    Ok(())
}
