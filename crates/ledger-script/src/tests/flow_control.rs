use super::{run, run_scripts, stack};
use crate::error::{Error, ErrorKind, StructureError};
use crate::num::ScriptNum;
use crate::stack::StackError;
use crate::{NoSignatureCheck, VerifyFlags};
use bitcoin::opcodes::all::*;
use bitcoin::script::{Builder, ScriptBuf};

fn push(value: i64) -> ScriptBuf {
    Builder::default().push_int(value).into_script()
}

fn num(n: i64) -> Vec<u8> {
    ScriptNum::from(n).to_bytes()
}

/// Runs `locking` on a stack prepared by an unlocking script pushing `initial`.
fn run_from(initial: i64, locking: &ScriptBuf) -> (Result<(), Error>, Vec<Vec<u8>>) {
    let unlocking = push(initial);
    let (result, stack) = run_scripts(&[&unlocking, locking], VerifyFlags::P2SH, &NoSignatureCheck);
    let items = stack
        .into_inner()
        .into_iter()
        .map(|v| v.into_bytes())
        .collect();
    (result, items)
}

fn if_push_4(opcode: bitcoin::opcodes::Opcode) -> ScriptBuf {
    Builder::default()
        .push_opcode(opcode)
        .push_int(4)
        .push_opcode(OP_ENDIF)
        .into_script()
}

#[test]
fn test_if_runs_then_branch_on_true() {
    assert_eq!(run_from(1, &if_push_4(OP_IF)), (Ok(()), vec![num(4)]));
}

#[test]
fn test_if_skips_then_branch_on_false() {
    assert_eq!(run_from(0, &if_push_4(OP_IF)), (Ok(()), vec![]));
}

#[test]
fn test_notif_inverts_condition() {
    assert_eq!(run_from(0, &if_push_4(OP_NOTIF)), (Ok(()), vec![num(4)]));
    assert_eq!(run_from(1, &if_push_4(OP_NOTIF)), (Ok(()), vec![]));
}

#[test]
fn test_else_branch() {
    let script = Builder::default()
        .push_opcode(OP_IF)
        .push_int(4)
        .push_opcode(OP_ELSE)
        .push_int(5)
        .push_opcode(OP_ENDIF)
        .into_script();
    assert_eq!(run_from(1, &script), (Ok(()), vec![num(4)]));
    assert_eq!(run_from(0, &script), (Ok(()), vec![num(5)]));
}

#[test]
fn test_nested_frames_resolve_independently() {
    let nested = |inner: i64| {
        Builder::default()
            .push_opcode(OP_IF)
            .push_int(inner)
            .push_opcode(OP_IF)
            .push_int(8)
            .push_opcode(OP_ELSE)
            .push_int(9)
            .push_opcode(OP_ENDIF)
            .push_opcode(OP_ENDIF)
            .into_script()
    };

    assert_eq!(run_from(1, &nested(1)), (Ok(()), vec![num(8)]));
    assert_eq!(run_from(1, &nested(0)), (Ok(()), vec![num(9)]));
    // The outer frame is false, nothing inside runs.
    assert_eq!(run_from(0, &nested(1)), (Ok(()), vec![]));
}

#[test]
fn test_branch_condition_uses_boolean_reading() {
    // Negative zero and multi-byte zero select the false branch.
    for condition in [vec![0x80], vec![0x00, 0x00], vec![0x00, 0x00, 0x80]] {
        let script = Builder::default()
            .push_slice(bitcoin::script::PushBytesBuf::try_from(condition.clone()).unwrap())
            .push_opcode(OP_IF)
            .push_int(4)
            .push_opcode(OP_ELSE)
            .push_int(5)
            .push_opcode(OP_ENDIF)
            .into_script();
        let (result, stack_after) = run(&script, VerifyFlags::P2SH);
        assert_eq!(result, Ok(()), "{condition:02x?}");
        assert_eq!(stack_after[..], stack(vec![num(5)])[..], "{condition:02x?}");
    }
}

#[test]
fn test_if_on_empty_stack_underflows() {
    let (result, _) = run(&if_push_4(OP_IF), VerifyFlags::P2SH);
    assert_eq!(result, Err(StackError::Underflow.into()));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::StackUnderflow);
}

#[test]
fn test_unterminated_conditional() {
    for opcode in [OP_IF, OP_NOTIF] {
        let script = Builder::default()
            .push_int(1)
            .push_opcode(opcode)
            .push_int(4)
            .into_script();
        let (result, _) = run(&script, VerifyFlags::P2SH);
        assert_eq!(
            result,
            Err(StructureError::UnexpectedEndOfScript {
                open: 1,
                opened_at: 1
            }
            .into())
        );
        assert_eq!(result.unwrap_err().kind(), ErrorKind::StructuralParse);
    }
}

#[test]
fn test_unbalanced_markers() {
    let script = Builder::default()
        .push_int(1)
        .push_opcode(OP_ENDIF)
        .into_script();
    let (result, _) = run(&script, VerifyFlags::P2SH);
    assert_eq!(result, Err(StructureError::UnexpectedEndIf(1).into()));

    let script = Builder::default()
        .push_int(1)
        .push_opcode(OP_ELSE)
        .into_script();
    let (result, _) = run(&script, VerifyFlags::P2SH);
    assert_eq!(result, Err(StructureError::UnexpectedElse(1).into()));

    let script = Builder::default()
        .push_int(1)
        .push_opcode(OP_IF)
        .push_opcode(OP_ELSE)
        .push_opcode(OP_ELSE)
        .push_opcode(OP_ENDIF)
        .into_script();
    let (result, _) = run(&script, VerifyFlags::P2SH);
    assert_eq!(result, Err(StructureError::DuplicateElse(3).into()));
}

#[test]
fn test_disabled_opcode_in_untaken_branch() {
    let script = Builder::default()
        .push_int(0)
        .push_opcode(OP_IF)
        .push_opcode(OP_CAT)
        .push_opcode(OP_ENDIF)
        .push_int(1)
        .into_script();
    let (result, stack_after) = run(&script, VerifyFlags::P2SH);
    assert_eq!(result, Err(Error::DisabledOpcode(OP_CAT)));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::DisabledOperation);
    // Rejected before anything ran.
    assert!(stack_after.is_empty());
}

#[test]
fn test_invalid_if_executed_opcode_in_untaken_branch() {
    let script = Builder::default()
        .push_int(0)
        .push_opcode(OP_IF)
        .push_opcode(OP_RETURN)
        .push_opcode(OP_ENDIF)
        .push_int(1)
        .into_script();
    let (result, stack_after) = run(&script, VerifyFlags::P2SH);
    assert_eq!(result, Ok(()));
    assert_eq!(stack_after[..], stack(vec![num(1)])[..]);
}

#[test]
fn test_deep_nesting_executes_without_recursion_limits() {
    let depth = 100;
    let mut bytes = Vec::new();
    for _ in 0..depth {
        bytes.extend([OP_PUSHNUM_1.to_u8(), OP_IF.to_u8()]);
    }
    bytes.push(OP_PUSHNUM_7.to_u8());
    bytes.extend(std::iter::repeat_n(OP_ENDIF.to_u8(), depth));

    let (result, stack_after) = run(&ScriptBuf::from_bytes(bytes), VerifyFlags::P2SH);
    assert_eq!(result, Ok(()));
    assert_eq!(stack_after[..], stack(vec![num(7)])[..]);
}
