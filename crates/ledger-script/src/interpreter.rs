//! Execution of parsed operations against a [`ScriptEnvironment`].

mod sig;

use crate::VerifyFlags;
use crate::constants::SEQUENCE_LOCKTIME_DISABLE_FLAG;
use crate::environment::ScriptEnvironment;
use crate::error::Error;
use crate::num::ScriptNum;
use crate::ops::{BinaryOp, HashOp, ScriptOp, StackOp, UnaryOp, is_minimal_push};
use crate::parser::Parser;
use crate::signature_checker::SignatureChecker;
use crate::stack::Stack;
use crate::value::ScriptValue;
use bitcoin::Script;
use bitcoin::hashes::{Hash, hash160, ripemd160, sha1, sha256, sha256d};
use bitcoin::opcodes::all::*;

pub use self::sig::{CheckSigError, SignatureEncodingError};

/// Runs scripts, delegating signature and lock-time checks to `checker`.
#[derive(Debug)]
pub struct Interpreter<'c, C: SignatureChecker + ?Sized> {
    checker: &'c C,
}

impl<'c, C: SignatureChecker + ?Sized> Interpreter<'c, C> {
    pub fn new(checker: &'c C) -> Self {
        Self { checker }
    }

    /// Runs `unlocking` then `locking` on the environment's stack and
    /// succeeds iff the resulting top element is true.
    pub fn execute(
        &self,
        locking: &Script,
        unlocking: &Script,
        env: &mut ScriptEnvironment<'_>,
    ) -> Result<(), Error> {
        self.execute_with(locking, unlocking, env, |_| {})
    }

    /// [`Interpreter::execute`], handing the stack left by `unlocking` to
    /// `after_unlocking` before `locking` runs.
    pub(crate) fn execute_with(
        &self,
        locking: &Script,
        unlocking: &Script,
        env: &mut ScriptEnvironment<'_>,
        after_unlocking: impl FnOnce(&Stack),
    ) -> Result<(), Error> {
        // The two scripts run one after the other on the same stack rather
        // than being concatenated (CVE-2010-5141).
        self.run(unlocking, env)?;
        after_unlocking(env.stack());
        self.run(locking, env)?;
        ensure_true_top(env.stack())
    }

    /// Parses `script` and executes it on the current stack.
    pub fn run(&self, script: &Script, env: &mut ScriptEnvironment<'_>) -> Result<(), Error> {
        let parsed = Parser::new(env.limits()).parse(script.as_bytes(), 0)?;

        tracing::trace!(
            target: "script",
            len = script.len(),
            op_count = parsed.op_count,
            "Executing script"
        );

        env.begin_script(script.as_bytes(), parsed.op_count);
        self.execute_ops(&parsed.ops, env)
    }

    /// Executes `ops` in order, stopping at the first error.
    pub fn execute_ops(
        &self,
        ops: &[ScriptOp],
        env: &mut ScriptEnvironment<'_>,
    ) -> Result<(), Error> {
        ops.iter().try_for_each(|op| self.step(op, env))
    }

    fn step(&self, op: &ScriptOp, env: &mut ScriptEnvironment<'_>) -> Result<(), Error> {
        env.charge_step()?;

        tracing::trace!(
            target: "script",
            opcode = %op.opcode(),
            depth = env.stack().len(),
            "Step"
        );

        let flags = env.flags();

        match op {
            ScriptOp::PushData { opcode, data } => {
                if flags.contains(VerifyFlags::MINIMALDATA) && !is_minimal_push(*opcode, data) {
                    return Err(Error::MinimalData(*opcode));
                }
                env.stack_mut().push(data.clone());
            }
            ScriptOp::PushNum(n) => {
                env.stack_mut().push_num(*n);
            }
            ScriptOp::Conditional(cond) => {
                let value = env.stack_mut().pop_bool()? != cond.invert;
                let branch = if value {
                    Some(&cond.then_branch)
                } else {
                    cond.else_branch.as_ref()
                };
                if let Some(branch) = branch {
                    self.execute_ops(branch, env)?;
                }
            }
            ScriptOp::Nop(opcode) => {
                if *opcode != OP_NOP && flags.contains(VerifyFlags::DISCOURAGE_UPGRADABLE_NOPS) {
                    return Err(Error::DiscourageUpgradableNops(*opcode));
                }
            }
            ScriptOp::Verify => {
                if !env.stack_mut().pop_bool()? {
                    return Err(Error::Verify(OP_VERIFY));
                }
            }
            ScriptOp::Stack(op) => eval_stack_op(*op, env)?,
            ScriptOp::Size => {
                let stack = env.stack_mut();
                let size = stack.last()?.len();
                stack.push_num(size as i64);
            }
            ScriptOp::Equal { verify } => {
                let stack = env.stack_mut();
                let equal = stack.pop()? == stack.pop()?;
                if *verify {
                    if !equal {
                        return Err(Error::Verify(OP_EQUALVERIFY));
                    }
                } else {
                    stack.push_bool(equal);
                }
            }
            ScriptOp::Unary(op) => eval_unary_op(*op, env.stack_mut())?,
            ScriptOp::Binary(BinaryOp::NumEqualVerify) => {
                let stack = env.stack_mut();
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                if a != b {
                    return Err(Error::Verify(OP_NUMEQUALVERIFY));
                }
            }
            ScriptOp::Binary(op) => eval_binary_op(*op, env.stack_mut())?,
            ScriptOp::Within => {
                let stack = env.stack_mut();
                let minimal = stack.require_minimal();
                stack.ternary_operation(|x, min, max| {
                    let x = x.as_num(minimal, None)?;
                    let min = min.as_num(minimal, None)?;
                    let max = max.as_num(minimal, None)?;
                    Ok::<_, Error>(ScriptValue::from_bool((min..max).contains(&x)))
                })?;
            }
            ScriptOp::Hash(op) => {
                env.stack_mut()
                    .unary_operation(|v| Ok::<_, Error>(hash(*op, &v)))?;
            }
            ScriptOp::CodeSeparator { offset } => {
                if flags.contains(VerifyFlags::CONST_SCRIPTCODE) {
                    return Err(Error::CodeSeparator);
                }
                env.set_code_separator(*offset);
            }
            ScriptOp::CheckSig { verify } => {
                let success = sig::eval_checksig(env, self.checker)?;
                if *verify {
                    if !success {
                        return Err(Error::Verify(OP_CHECKSIGVERIFY));
                    }
                } else {
                    env.stack_mut().push_bool(success);
                }
            }
            ScriptOp::CheckMultiSig { verify } => {
                let success = sig::eval_checkmultisig(env, self.checker)?;
                if *verify {
                    if !success {
                        return Err(Error::Verify(OP_CHECKMULTISIGVERIFY));
                    }
                } else {
                    env.stack_mut().push_bool(success);
                }
            }
            ScriptOp::CheckLockTimeVerify => {
                // Not enabled, treat as OP_NOP2.
                if flags.contains(VerifyFlags::CHECKLOCKTIMEVERIFY) {
                    // Lock-time operands may use 5 bytes, which is good until 2^39-1,
                    // well beyond the 2^32-1 range of nLockTime itself. The operand
                    // stays on the stack.
                    let lock_time = env.stack().peek_num(ScriptNum::MAX_LOCKTIME_NUM_SIZE)?;

                    if lock_time.is_negative() {
                        return Err(Error::NegativeLocktime);
                    }

                    if !self.checker.check_lock_time(env.context(), lock_time) {
                        return Err(Error::UnsatisfiedLocktime);
                    }
                }
            }
            ScriptOp::CheckSequenceVerify => {
                // Not enabled, treat as OP_NOP3.
                if flags.contains(VerifyFlags::CHECKSEQUENCEVERIFY) {
                    let sequence = env.stack().peek_num(ScriptNum::MAX_LOCKTIME_NUM_SIZE)?;

                    if sequence.is_negative() {
                        return Err(Error::NegativeLocktime);
                    }

                    // With the disable flag set the operand imposes no constraint.
                    if sequence.value() & i64::from(SEQUENCE_LOCKTIME_DISABLE_FLAG) == 0
                        && !self.checker.check_sequence(env.context(), sequence)
                    {
                        return Err(Error::UnsatisfiedLocktime);
                    }
                }
            }
            ScriptOp::Disabled(opcode) => return Err(Error::DisabledOpcode(*opcode)),
            ScriptOp::AlwaysInvalid(opcode) => {
                return Err(Error::StaticallyInvalidOpcode(*opcode));
            }
            ScriptOp::InvalidIfExecuted(opcode) => {
                return Err(Error::InvalidOpcodeExecuted(*opcode));
            }
        }

        env.check_stack_size()
    }
}

/// Fails with [`Error::EvalFalse`] unless the stack is non-empty with a
/// true top element.
pub(crate) fn ensure_true_top(stack: &Stack) -> Result<(), Error> {
    match stack.last() {
        Ok(top) if top.as_bool() => Ok(()),
        _ => Err(Error::EvalFalse),
    }
}

fn eval_stack_op(op: StackOp, env: &mut ScriptEnvironment<'_>) -> Result<(), Error> {
    let (stack, alt_stack) = env.stacks_mut();

    match op {
        StackOp::ToAltStack => {
            alt_stack.push(stack.pop()?);
        }
        StackOp::FromAltStack => {
            let v = alt_stack
                .pop()
                .map_err(|_| Error::InvalidAltStackOperation)?;
            stack.push(v);
        }
        StackOp::Drop2 => stack.drop(2)?,
        StackOp::Dup2 => stack.dup(2)?,
        StackOp::Dup3 => stack.dup(3)?,
        StackOp::Over2 => stack.over(2)?,
        StackOp::Rot2 => stack.rot(2)?,
        StackOp::Swap2 => stack.swap(2)?,
        StackOp::IfDup => {
            if stack.peek_bool()? {
                stack.dup(1)?;
            }
        }
        StackOp::Depth => {
            let depth = stack.len() as i64;
            stack.push_num(depth);
        }
        StackOp::Drop => stack.drop(1)?,
        StackOp::Dup => stack.dup(1)?,
        StackOp::Nip => stack.nip()?,
        StackOp::Over => stack.over(1)?,
        StackOp::Pick | StackOp::Roll => {
            let n = stack.pop_num()?.value();
            if n < 0 || n >= stack.len() as i64 {
                return Err(Error::InvalidStackIndex(n));
            }
            let v = if op == StackOp::Pick {
                stack.top(n as usize)?.clone()
            } else {
                stack.remove(n as usize)?
            };
            stack.push(v);
        }
        StackOp::Rot => stack.rot(1)?,
        StackOp::Swap => stack.swap(1)?,
        StackOp::Tuck => stack.tuck()?,
    }

    Ok(())
}

fn eval_unary_op(op: UnaryOp, stack: &mut Stack) -> Result<(), Error> {
    let minimal = stack.require_minimal();
    stack.unary_operation(|a| {
        let a = a.as_num(minimal, None)?;
        let result = match op {
            UnaryOp::Add1 => (a + 1.into())?,
            UnaryOp::Sub1 => (a - 1.into())?,
            UnaryOp::Negate => (-a)?,
            UnaryOp::Abs => a.abs(),
            UnaryOp::Not => ScriptNum::from(a.is_zero()),
            UnaryOp::NotEqual0 => ScriptNum::from(!a.is_zero()),
        };
        Ok::<_, Error>(result.into())
    })
}

fn eval_binary_op(op: BinaryOp, stack: &mut Stack) -> Result<(), Error> {
    let minimal = stack.require_minimal();
    stack.binary_operation(|a, b| {
        let a = a.as_num(minimal, None)?;
        let b = b.as_num(minimal, None)?;
        let result = match op {
            BinaryOp::Add => (a + b)?,
            BinaryOp::Sub => (a - b)?,
            BinaryOp::BoolAnd => ScriptNum::from(!a.is_zero() && !b.is_zero()),
            BinaryOp::BoolOr => ScriptNum::from(!a.is_zero() || !b.is_zero()),
            BinaryOp::NumEqual | BinaryOp::NumEqualVerify => ScriptNum::from(a == b),
            BinaryOp::NumNotEqual => ScriptNum::from(a != b),
            BinaryOp::LessThan => ScriptNum::from(a < b),
            BinaryOp::GreaterThan => ScriptNum::from(a > b),
            BinaryOp::LessThanOrEqual => ScriptNum::from(a <= b),
            BinaryOp::GreaterThanOrEqual => ScriptNum::from(a >= b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
        };
        Ok::<_, Error>(result.into())
    })
}

fn hash(op: HashOp, data: &[u8]) -> ScriptValue {
    let digest = match op {
        HashOp::Ripemd160 => ripemd160::Hash::hash(data).to_byte_array().to_vec(),
        HashOp::Sha1 => sha1::Hash::hash(data).to_byte_array().to_vec(),
        HashOp::Sha256 => sha256::Hash::hash(data).to_byte_array().to_vec(),
        HashOp::Hash160 => hash160::Hash::hash(data).to_byte_array().to_vec(),
        HashOp::Hash256 => sha256d::Hash::hash(data).to_byte_array().to_vec(),
    };
    digest.into()
}
