//! Benchmarks for parsing and verifying legacy scripts.
//!
//! Run with: cargo bench --package ledger-script --bench verify

use bitcoin::consensus::encode::deserialize;
use bitcoin::opcodes::all::*;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::{PublicKey, ScriptBuf, Transaction};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ledger_script::{
    NoSignatureCheck, TransactionContext, TransactionSignatureChecker, VerifyFlags, parse_script,
    verify_script,
};

const P2PK_SPEND: &str = "010000000173805864da01f15093f7837607ab8be7c3705e29a9d4a12c9116d709f8911e590100000049483045022052ffc1929a2d8bd365c6a2a4e3421711b4b1e1b8781698ca9075807b4227abcb0221009984107ddb9e3813782b095d0d84361ed4c76e5edaf6561d252ae162c2341cfb01ffffffff0200e1f50500000000434104baa9d36653155627c740b3409a734d4eaf5dcca9fb4f736622ee18efcf0aec2b758b2ec40db18fbae708f691edb2d4a2a3775eb413d16e2e3c0f8d4c69119fd1ac009ce4a60000000043410411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3ac00000000";

const P2PK_KEY: &str = "0411db93e1dcdb8a016b49840f8c53bc1eb68a382e97b1482ecad7b148a6909a5cb2e0eaddfb84ccf9744464f82e160bfa9b8b64f9d4c03f999b8643f656b412a3";

/// `depth` nested `1 OP_IF` blocks around a single push.
fn nested_conditionals(depth: usize) -> ScriptBuf {
    let mut bytes = Vec::with_capacity(depth * 3 + 1);
    for _ in 0..depth {
        bytes.extend([OP_PUSHNUM_1.to_u8(), OP_IF.to_u8()]);
    }
    bytes.push(OP_PUSHNUM_1.to_u8());
    bytes.extend(std::iter::repeat_n(OP_ENDIF.to_u8(), depth));
    ScriptBuf::from_bytes(bytes)
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_nested_conditionals");

    for depth in [1, 10, 100] {
        let script = nested_conditionals(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &script, |b, script| {
            b.iter(|| parse_script(black_box(script.as_bytes())))
        });
    }

    group.finish();
}

fn benchmark_verify_p2sh(c: &mut Criterion) {
    let redeem_script = Builder::default()
        .push_opcode(OP_ADD)
        .push_int(5)
        .push_opcode(OP_EQUAL)
        .into_script();
    let unlocking = Builder::default()
        .push_int(2)
        .push_int(3)
        .push_slice(PushBytesBuf::try_from(redeem_script.to_bytes()).expect("Redeem script fits"))
        .into_script();
    let locking = ScriptBuf::new_p2sh(&redeem_script.script_hash());
    let tx = Transaction {
        version: bitcoin::transaction::Version(2),
        lock_time: bitcoin::absolute::LockTime::ZERO,
        input: vec![Default::default()],
        output: vec![],
    };

    c.bench_function("verify_p2sh_arithmetic", |b| {
        b.iter(|| {
            verify_script(
                black_box(&unlocking),
                black_box(&locking),
                TransactionContext::new(&tx, 0),
                VerifyFlags::standard(),
                &NoSignatureCheck,
            )
        })
    });
}

fn benchmark_verify_p2pk(c: &mut Criterion) {
    let tx: Transaction =
        deserialize(&hex::decode(P2PK_SPEND).expect("Valid hex")).expect("Valid transaction");
    let pubkey =
        PublicKey::from_slice(&hex::decode(P2PK_KEY).expect("Valid hex")).expect("Valid key");
    let script_pubkey = ScriptBuf::new_p2pk(&pubkey);

    c.bench_function("verify_p2pk_ecdsa", |b| {
        b.iter(|| {
            verify_script(
                black_box(&tx.input[0].script_sig),
                black_box(&script_pubkey),
                TransactionContext::new(&tx, 0),
                VerifyFlags::consensus(),
                &TransactionSignatureChecker,
            )
        })
    });
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_verify_p2sh,
    benchmark_verify_p2pk
);
criterion_main!(benches);
