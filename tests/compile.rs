use std::sync::LazyLock;

use gatevm::{
    ast::{
        Arm, BinOp, Expr, Param, Pattern, Program, RangePattern, Stmt, block, if_else, lit,
        match_on, var,
    },
    circuit::{Party, RevealPolicy},
    compile,
    compile::{CompileError, CompiledProgram},
    types::{IntType, Literal},
};
use proptest::prelude::*;

const OPERATORS: [BinOp; 16] = [
    BinOp::Add,
    BinOp::Sub,
    BinOp::Mul,
    BinOp::Div,
    BinOp::Rem,
    BinOp::BitAnd,
    BinOp::BitOr,
    BinOp::BitXor,
    BinOp::Shl,
    BinOp::Shr,
    BinOp::Eq,
    BinOp::Ne,
    BinOp::Lt,
    BinOp::Le,
    BinOp::Gt,
    BinOp::Ge,
];

fn binary_program(op: BinOp, ty: IntType) -> CompiledProgram {
    let rhs = match op {
        BinOp::Shl | BinOp::Shr => IntType::U8,
        _ => ty,
    };
    let ret = if op.is_comparison() { IntType::BOOL } else { ty };
    compile(&Program {
        params: vec![
            Param::new("a", ty, Party::Garbler),
            Param::new("b", rhs, Party::Evaluator),
        ],
        ret,
        reveal: RevealPolicy::EvaluatorOnly,
        body: Expr::binary(op, var("a"), var("b")),
    })
    .unwrap()
}

static U8_PROGRAMS: LazyLock<Vec<(BinOp, CompiledProgram)>> = LazyLock::new(|| {
    OPERATORS
        .iter()
        .map(|op| (*op, binary_program(*op, IntType::U8)))
        .collect()
});

static I8_PROGRAMS: LazyLock<Vec<(BinOp, CompiledProgram)>> = LazyLock::new(|| {
    OPERATORS
        .iter()
        .map(|op| (*op, binary_program(*op, IntType::I8)))
        .collect()
});

fn eval(prg: &CompiledProgram, a: Literal, b: Literal) -> Literal {
    let a = prg.encode_inputs(Party::Garbler, &[a]).unwrap();
    let b = prg.encode_inputs(Party::Evaluator, &[b]).unwrap();
    prg.decode_output(&prg.circuit.eval(&a, &b).unwrap()).unwrap()
}

fn native_u8(op: BinOp, a: u8, b: u8) -> Literal {
    let value = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => a.checked_div(b).unwrap_or(u8::MAX),
        BinOp::Rem => a.checked_rem(b).unwrap_or(a),
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl => a.checked_shl(b as u32).unwrap_or(0),
        BinOp::Shr => a.checked_shr(b as u32).unwrap_or(0),
        BinOp::Eq => return Literal::bool(a == b),
        BinOp::Ne => return Literal::bool(a != b),
        BinOp::Lt => return Literal::bool(a < b),
        BinOp::Le => return Literal::bool(a <= b),
        BinOp::Gt => return Literal::bool(a > b),
        BinOp::Ge => return Literal::bool(a >= b),
        BinOp::And | BinOp::Or => unreachable!("only defined on bool"),
    };
    Literal::u8(value)
}

fn native_i8(op: BinOp, a: i8, b: i8) -> Literal {
    let amount = b as u8 as u32;
    let value = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div if b == 0 => -1,
        BinOp::Div => a.wrapping_div(b),
        BinOp::Rem if b == 0 => a,
        BinOp::Rem => a.wrapping_rem(b),
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl => a.checked_shl(amount).unwrap_or(0),
        BinOp::Shr => a.checked_shr(amount).unwrap_or(if a < 0 { -1 } else { 0 }),
        BinOp::Eq => return Literal::bool(a == b),
        BinOp::Ne => return Literal::bool(a != b),
        BinOp::Lt => return Literal::bool(a < b),
        BinOp::Le => return Literal::bool(a <= b),
        BinOp::Gt => return Literal::bool(a > b),
        BinOp::Ge => return Literal::bool(a >= b),
        BinOp::And | BinOp::Or => unreachable!("only defined on bool"),
    };
    Literal::i8(value)
}

proptest! {
    #[test]
    fn u8_operators_match_native(a: u8, b: u8) {
        for (op, prg) in U8_PROGRAMS.iter() {
            let result = eval(prg, Literal::u8(a), Literal::u8(b));
            prop_assert_eq!(result, native_u8(*op, a, b), "{} {} {}", a, op, b);
        }
    }

    #[test]
    fn i8_operators_match_native(a: i8, b: i8) {
        for (op, prg) in I8_PROGRAMS.iter() {
            let rhs = match op {
                BinOp::Shl | BinOp::Shr => Literal::u8(b as u8),
                _ => Literal::i8(b),
            };
            let result = eval(prg, Literal::i8(a), rhs);
            prop_assert_eq!(result, native_i8(*op, a, b), "{} {} {}", a, op, b);
        }
    }
}

#[test]
fn division_edge_cases() {
    let div = binary_program(BinOp::Div, IntType::I8);
    let rem = binary_program(BinOp::Rem, IntType::I8);
    assert_eq!(eval(&div, Literal::i8(i8::MIN), Literal::i8(-1)), Literal::i8(i8::MIN));
    assert_eq!(eval(&rem, Literal::i8(i8::MIN), Literal::i8(-1)), Literal::i8(0));
    assert_eq!(eval(&div, Literal::i8(-7), Literal::i8(0)), Literal::i8(-1));
    assert_eq!(eval(&rem, Literal::i8(-7), Literal::i8(0)), Literal::i8(-7));
    assert_eq!(eval(&rem, Literal::i8(-7), Literal::i8(2)), Literal::i8(-1));

    let div = binary_program(BinOp::Div, IntType::U8);
    assert_eq!(eval(&div, Literal::u8(9), Literal::u8(0)), Literal::u8(u8::MAX));
}

#[test]
fn wrapping_sum() {
    let prg = binary_program(BinOp::Add, IntType::U8);
    assert_eq!(eval(&prg, Literal::u8(200), Literal::u8(100)), Literal::u8(44));
}

#[test]
fn range_test_outside() {
    let prg = compile(&Program {
        params: vec![Param::new("x", IntType::U8, Party::Evaluator)],
        ret: IntType::BOOL,
        reveal: RevealPolicy::EvaluatorOnly,
        body: var("x").in_range(RangePattern::inclusive(Literal::u8(1), Literal::u8(100))),
    })
    .unwrap();
    let x = prg.encode_inputs(Party::Evaluator, &[Literal::u8(150)]).unwrap();
    let output = prg.circuit.eval(&[], &x).unwrap();
    assert_eq!(prg.decode_output(&output).unwrap(), Literal::bool(false));
}

fn classify(arms: Vec<Arm>) -> Program {
    Program {
        params: vec![Param::new("x", IntType::I16, Party::Garbler)],
        ret: IntType::U8,
        reveal: RevealPolicy::Both,
        body: match_on(var("x"), arms),
    }
}

fn range(start: i16, end: i16) -> Pattern {
    Pattern::Range(RangePattern::inclusive(Literal::i16(start), Literal::i16(end)))
}

#[test]
fn match_selects_first_matching_arm() {
    let prg = compile(&classify(vec![
        Arm::new(Pattern::Literal(Literal::i16(0)), lit(Literal::u8(b'A'))),
        Arm::new(range(1, 5), lit(Literal::u8(b'B'))),
        Arm::new(range(6, 9), lit(Literal::u8(b'C'))),
        Arm::new(range(-100, 100), lit(Literal::u8(b'E'))),
        Arm::new(Pattern::Wildcard, lit(Literal::u8(b'D'))),
    ]))
    .unwrap();
    for (x, expected) in [
        (7, b'C'),
        (0, b'A'),
        (3, b'B'),
        (9, b'C'),
        (10, b'E'),
        (-100, b'E'),
        (-101, b'D'),
        (i16::MAX, b'D'),
    ] {
        let input = prg.encode_inputs(Party::Garbler, &[Literal::i16(x)]).unwrap();
        let output = prg.circuit.eval(&input, &[]).unwrap();
        assert_eq!(prg.decode_output(&output).unwrap(), Literal::u8(expected), "{x}");
    }
}

#[test]
fn match_without_default_fails() {
    let result = compile(&classify(vec![
        Arm::new(Pattern::Literal(Literal::i16(0)), lit(Literal::u8(b'A'))),
        Arm::new(range(i16::MIN, i16::MAX), lit(Literal::u8(b'B'))),
    ]));
    assert_eq!(result.unwrap_err(), CompileError::MissingDefaultBranch);
}

#[test]
fn mismatched_widths_fail() {
    let result = compile(&Program {
        params: vec![
            Param::new("a", IntType::U8, Party::Garbler),
            Param::new("b", IntType::U16, Party::Evaluator),
        ],
        ret: IntType::U16,
        reveal: RevealPolicy::EvaluatorOnly,
        body: var("a") + var("b"),
    });
    assert!(matches!(result, Err(CompileError::WidthMismatch { .. })));

    let result = compile(&Program {
        params: vec![
            Param::new("a", IntType::U8, Party::Garbler),
            Param::new("b", IntType::U16, Party::Evaluator),
        ],
        ret: IntType::U16,
        reveal: RevealPolicy::EvaluatorOnly,
        body: var("a").cast(IntType::U16) + var("b"),
    });
    assert!(result.is_ok());
}

#[test]
fn clamped_accumulation() {
    // let mut acc = a; if acc > 100 { acc = 100 }; acc += b; acc
    let prg = compile(&Program {
        params: vec![
            Param::new("a", IntType::I32, Party::Garbler),
            Param::new("b", IntType::I32, Party::Evaluator),
        ],
        ret: IntType::I32,
        reveal: RevealPolicy::Both,
        body: block(
            vec![
                Stmt::Let("acc".into(), var("a")),
                Stmt::Let(
                    "acc".into(),
                    if_else(
                        var("acc").greater_than(lit(Literal::i32(100))),
                        lit(Literal::i32(100)),
                        var("acc"),
                    ),
                ),
                Stmt::CompoundAssign("acc".into(), BinOp::Add, var("b")),
            ],
            var("acc"),
        ),
    })
    .unwrap();
    for (a, b, expected) in [(5, 7, 12), (1000, -1, 99), (-50, 50, 0)] {
        let a = prg.encode_inputs(Party::Garbler, &[Literal::i32(a)]).unwrap();
        let b = prg.encode_inputs(Party::Evaluator, &[Literal::i32(b)]).unwrap();
        let output = prg.circuit.eval(&a, &b).unwrap();
        assert_eq!(prg.decode_output(&output).unwrap(), Literal::i32(expected));
    }
}
