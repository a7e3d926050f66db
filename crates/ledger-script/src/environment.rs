use crate::VerifyFlags;
use crate::config::ScriptLimits;
use crate::error::Error;
use crate::stack::Stack;
use bitcoin::Transaction;
use std::time::Instant;

/// The transaction input being validated.
#[derive(Debug, Clone, Copy)]
pub struct TransactionContext<'tx> {
    pub transaction: &'tx Transaction,
    pub input_index: usize,
}

impl<'tx> TransactionContext<'tx> {
    pub fn new(transaction: &'tx Transaction, input_index: usize) -> Self {
        Self {
            transaction,
            input_index,
        }
    }
}

/// Mutable state of one script-pair validation.
///
/// The main stack survives from the unlocking script into the locking
/// script. The alt stack, the script bytes, the code-separator position and
/// the op count belong to the script currently running and are reset by
/// [`ScriptEnvironment::begin_script`]. The step counter and the deadline
/// span the whole validation.
#[derive(Debug)]
pub struct ScriptEnvironment<'tx> {
    stack: Stack,
    alt_stack: Stack,
    script: Vec<u8>,
    code_separator: usize,
    op_count: usize,
    steps: usize,
    deadline: Option<Instant>,
    context: TransactionContext<'tx>,
    flags: VerifyFlags,
    limits: ScriptLimits,
}

impl<'tx> ScriptEnvironment<'tx> {
    pub fn new(context: TransactionContext<'tx>, flags: VerifyFlags) -> Self {
        let require_minimal = flags.contains(VerifyFlags::MINIMALDATA);
        Self {
            stack: Stack::new(require_minimal),
            alt_stack: Stack::new(require_minimal),
            script: Vec::new(),
            code_separator: 0,
            op_count: 0,
            steps: 0,
            deadline: None,
            context,
            flags,
            limits: ScriptLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ScriptLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Fails the validation with [`Error::Deadline`] once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Prepares the environment to run `script` with `op_count` operations
    /// already counted by the parser.
    pub(crate) fn begin_script(&mut self, script: &[u8], op_count: usize) {
        self.script.clear();
        self.script.extend_from_slice(script);
        self.code_separator = 0;
        self.op_count = op_count;
        self.alt_stack = Stack::new(self.stack.require_minimal());
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    pub(crate) fn stacks_mut(&mut self) -> (&mut Stack, &mut Stack) {
        (&mut self.stack, &mut self.alt_stack)
    }

    pub(crate) fn replace_stack(&mut self, stack: Stack) -> Stack {
        std::mem::replace(&mut self.stack, stack)
    }

    pub fn into_stack(self) -> Stack {
        self.stack
    }

    pub fn context(&self) -> &TransactionContext<'tx> {
        &self.context
    }

    pub fn flags(&self) -> VerifyFlags {
        self.flags
    }

    pub fn limits(&self) -> &ScriptLimits {
        &self.limits
    }

    /// The bytes signatures commit to: everything after the last executed
    /// `OP_CODESEPARATOR`.
    pub fn script_code(&self) -> &[u8] {
        self.script.get(self.code_separator..).unwrap_or_default()
    }

    pub(crate) fn set_code_separator(&mut self, offset: usize) {
        self.code_separator = offset;
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Adds operations discovered at execution time (multisig key counts).
    pub(crate) fn add_ops(&mut self, n: usize) -> Result<(), Error> {
        self.op_count += n;
        if self.op_count > self.limits.max_ops_per_script {
            return Err(Error::OpCount);
        }
        Ok(())
    }

    /// Charges one executed operation against the step budget and deadline.
    pub(crate) fn charge_step(&mut self) -> Result<(), Error> {
        self.steps += 1;

        if let Some(max_steps) = self.limits.max_steps {
            if self.steps > max_steps {
                return Err(Error::StepBudget(max_steps));
            }
        }

        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(Error::Deadline);
            }
        }

        Ok(())
    }

    pub(crate) fn check_stack_size(&self) -> Result<(), Error> {
        if self.stack.len() + self.alt_stack.len() > self.limits.max_stack_size {
            return Err(Error::StackSize);
        }
        Ok(())
    }
}
