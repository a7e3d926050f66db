//! Turns raw script bytes into a tree of [`ScriptOp`].
//!
//! Push data is resolved here and `OP_IF`/`OP_NOTIF`/`OP_ELSE`/`OP_ENDIF` are
//! folded into [`Conditional`] nodes using an explicit stack of open frames,
//! so arbitrarily deep nesting never recurses and the depth can be bounded
//! directly. Disabled and always-invalid opcodes are rejected as soon as they
//! are read, executed or not.

use crate::config::ScriptLimits;
use crate::error::{Error, StructureError};
use crate::opcode::{Capability, classify, counts_towards_op_limit};
use crate::ops::{Conditional, ScriptOp};
use bitcoin::opcodes::Opcode;
use bitcoin::opcodes::all::*;

/// Output of a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScript {
    pub ops: Vec<ScriptOp>,
    /// Bytes read, starting from the parse offset.
    pub consumed: usize,
    /// Operations counting towards the per-script limit, executed or not.
    pub op_count: usize,
}

/// A conditional whose `OP_ENDIF` has not been read yet.
struct Frame {
    invert: bool,
    then_branch: Vec<ScriptOp>,
    else_branch: Option<Vec<ScriptOp>>,
    opened_at: usize,
}

impl Frame {
    fn new(invert: bool, opened_at: usize) -> Self {
        Self {
            invert,
            then_branch: Vec::new(),
            else_branch: None,
            opened_at,
        }
    }

    /// The branch currently receiving operations.
    fn branch_mut(&mut self) -> &mut Vec<ScriptOp> {
        match &mut self.else_branch {
            Some(else_branch) => else_branch,
            None => &mut self.then_branch,
        }
    }

    fn into_op(self) -> ScriptOp {
        ScriptOp::Conditional(Conditional {
            invert: self.invert,
            then_branch: self.then_branch,
            else_branch: self.else_branch,
        })
    }
}

/// Where the next parsed operation goes: the innermost open frame, or the
/// top level.
fn sink<'a>(frames: &'a mut [Frame], top_level: &'a mut Vec<ScriptOp>) -> &'a mut Vec<ScriptOp> {
    match frames.last_mut() {
        Some(frame) => frame.branch_mut(),
        None => top_level,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Parser<'a> {
    limits: &'a ScriptLimits,
}

impl<'a> Parser<'a> {
    pub fn new(limits: &'a ScriptLimits) -> Self {
        Self { limits }
    }

    /// Parses `script[offset..]`.
    ///
    /// Offsets recorded in [`ScriptOp::CodeSeparator`] are relative to the
    /// start of `script`, not to `offset`.
    pub fn parse(&self, script: &[u8], offset: usize) -> Result<ParsedScript, Error> {
        if script.len() > self.limits.max_script_size {
            return Err(Error::ScriptSize(script.len()));
        }

        let mut top_level = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut op_count = 0;
        let mut pc = offset;

        while let Some(&byte) = script.get(pc) {
            let start = pc;
            let opcode = Opcode::from(byte);
            pc += 1;

            if counts_towards_op_limit(opcode) {
                op_count += 1;
                if op_count > self.limits.max_ops_per_script {
                    return Err(Error::OpCount);
                }
            }

            match classify(opcode) {
                Capability::Disabled => return Err(Error::DisabledOpcode(opcode)),
                Capability::AlwaysInvalid => return Err(Error::StaticallyInvalidOpcode(opcode)),
                _ => {}
            }

            match opcode {
                OP_IF | OP_NOTIF => {
                    if frames.len() >= self.limits.max_nesting_depth {
                        return Err(Error::NestingDepth(self.limits.max_nesting_depth));
                    }
                    frames.push(Frame::new(opcode == OP_NOTIF, start));
                }
                OP_ELSE => {
                    let frame = frames
                        .last_mut()
                        .ok_or(StructureError::UnexpectedElse(start))?;
                    if frame.else_branch.is_some() {
                        return Err(StructureError::DuplicateElse(start).into());
                    }
                    frame.else_branch = Some(Vec::new());
                }
                OP_ENDIF => {
                    let frame = frames.pop().ok_or(StructureError::UnexpectedEndIf(start))?;
                    let op = frame.into_op();
                    sink(&mut frames, &mut top_level).push(op);
                }
                OP_CODESEPARATOR => {
                    sink(&mut frames, &mut top_level).push(ScriptOp::CodeSeparator { offset: pc });
                }
                _ => {
                    let op = match ScriptOp::from_opcode(opcode) {
                        Some(op) => op,
                        None => self.read_push(script, opcode, start, &mut pc)?,
                    };
                    sink(&mut frames, &mut top_level).push(op);
                }
            }
        }

        if let Some(innermost) = frames.last() {
            return Err(StructureError::UnexpectedEndOfScript {
                open: frames.len(),
                opened_at: innermost.opened_at,
            }
            .into());
        }

        Ok(ParsedScript {
            ops: top_level,
            consumed: pc - offset,
            op_count,
        })
    }

    /// Reads the operand of a push opcode; `pc` points just past the opcode.
    fn read_push(
        &self,
        script: &[u8],
        opcode: Opcode,
        start: usize,
        pc: &mut usize,
    ) -> Result<ScriptOp, Error> {
        let truncated = || StructureError::TruncatedPush {
            opcode,
            offset: start,
        };

        let prefix_len = match opcode {
            OP_PUSHDATA1 => 1,
            OP_PUSHDATA2 => 2,
            OP_PUSHDATA4 => 4,
            _ => 0,
        };

        let len = if prefix_len == 0 {
            opcode.to_u8() as usize
        } else {
            let prefix = script
                .get(*pc..*pc + prefix_len)
                .ok_or_else(truncated)?;
            *pc += prefix_len;
            prefix
                .iter()
                .rev()
                .fold(0usize, |acc, &byte| (acc << 8) | byte as usize)
        };

        let data = pc
            .checked_add(len)
            .and_then(|end| script.get(*pc..end))
            .ok_or_else(truncated)?;

        if data.len() > self.limits.max_element_size {
            return Err(Error::PushSize(data.len()));
        }

        *pc += len;

        Ok(ScriptOp::PushData {
            opcode,
            data: data.into(),
        })
    }
}

/// Parses a whole script under consensus limits.
pub fn parse_script(script: &[u8]) -> Result<ParsedScript, Error> {
    Parser::new(&ScriptLimits::default()).parse(script, 0)
}
