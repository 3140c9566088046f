//! Compiles a [`Program`] into a [`Circuit`].
//!
//! Compilation runs in two passes: a type pass over the whole program, which rejects every
//! ill-typed expression before a single gate is emitted, followed by lowering into gates using the
//! [`Builder`].
//!
//! Conditionals evaluate both branches and pick the result with a multiplexer. Variables that are
//! reassigned inside a branch are merged the same way once the branch ends. Match expressions test
//! the arms in declaration order, so the first matching arm wins.

use std::{collections::HashSet, mem};

use tracing::debug;

use crate::{
    ast::{Arm, BinOp, Expr, Param, Pattern, Program, RangePattern, Stmt, UnaryOp},
    builder::Builder,
    circuit::{Circuit, Party, WireId},
    types::{EncryptedValue, IntType, Literal, TypeError},
};

/// Errors that make a program impossible to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The operands of an operation have different widths.
    #[error("width mismatch: {left} vs {right}")]
    WidthMismatch {
        /// The type of the left operand.
        left: IntType,
        /// The type of the right operand.
        right: IntType,
    },
    /// Signed and unsigned operands were combined without an explicit cast.
    #[error("signedness mismatch: {left} vs {right}")]
    SignednessMismatch {
        /// The type of the left operand.
        left: IntType,
        /// The type of the right operand.
        right: IntType,
    },
    /// The operator is not defined for operands of this type.
    #[error("operator '{op}' is not supported for type {ty}")]
    UnsupportedOperator {
        /// The operator symbol.
        op: String,
        /// The type of the operand.
        ty: IntType,
    },
    /// A match expression has no wildcard arm.
    #[error("match expression without a default (wildcard) arm")]
    MissingDefaultBranch,
    /// A variable was used without being bound.
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    /// A condition is not of type `bool`.
    #[error("conditions must be of type bool, found {0}")]
    NonBooleanCondition(IntType),
    /// Two parameters share a name.
    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),
    /// A literal is invalid for its type.
    #[error(transparent)]
    InvalidLiteral(TypeError),
}

impl From<TypeError> for CompileError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::WidthMismatch { left, right } => Self::WidthMismatch { left, right },
            TypeError::SignednessMismatch { left, right } => {
                Self::SignednessMismatch { left, right }
            }
            e => Self::InvalidLiteral(e),
        }
    }
}

/// Errors raised when encoding arguments for a compiled program.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    /// The party provided the wrong number of arguments.
    #[error("the {party} has {expected} parameters, but {actual} arguments were given")]
    WrongArgumentCount {
        /// The party whose arguments were encoded.
        party: Party,
        /// The number of parameters of the party.
        expected: usize,
        /// The number of arguments given.
        actual: usize,
    },
    /// An argument does not have the type of its parameter.
    #[error("argument type does not match its parameter: {0}")]
    Type(#[from] TypeError),
}

/// A compiled program: the circuit plus what is needed to encode inputs and decode outputs.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    /// The circuit computing the program.
    pub circuit: Circuit,
    /// The parameters, in input order.
    pub params: Vec<Param>,
    /// The type of the output.
    pub ret: IntType,
}

impl CompiledProgram {
    /// Encodes the arguments of `party` (in parameter order) as circuit input bits.
    pub fn encode_inputs(
        &self,
        party: Party,
        args: &[Literal],
    ) -> Result<Vec<bool>, ArgumentError> {
        let params: Vec<&Param> = self.params.iter().filter(|p| p.party == party).collect();
        if params.len() != args.len() {
            return Err(ArgumentError::WrongArgumentCount {
                party,
                expected: params.len(),
                actual: args.len(),
            });
        }
        let mut bits = Vec::new();
        for (param, arg) in params.into_iter().zip(args) {
            param.ty.check_same(arg.ty())?;
            bits.extend(arg.to_bits());
        }
        Ok(bits)
    }

    /// Decodes the output bits of the circuit as a value of the return type.
    pub fn decode_output(&self, bits: &[bool]) -> Result<Literal, TypeError> {
        Literal::from_bits(self.ret, bits)
    }
}

/// Compiles a program into a circuit.
///
/// The primary inputs of the circuit are the parameters in declaration order, each one least
/// significant bit first.
pub fn compile(program: &Program) -> Result<CompiledProgram, CompileError> {
    check(program)?;
    let mut lowering = Lowering::default();
    lowering.builder.reveal_to(program.reveal);
    for param in &program.params {
        let value = lowering.builder.input_value(param.ty, param.party);
        lowering.env.push((param.name.clone(), value));
    }
    let output = lowering.lower(&program.body)?;
    let circuit = lowering.builder.finish(output.into_wires());
    debug!(
        wires = circuit.wires(),
        gates = circuit.gates(),
        and_gates = circuit.and_gates(),
        "compiled program"
    );
    Ok(CompiledProgram {
        circuit,
        params: program.params.clone(),
        ret: program.ret,
    })
}

/// The type pass: checks the whole program without emitting any gates.
pub fn check(program: &Program) -> Result<(), CompileError> {
    let mut seen = HashSet::new();
    let mut checker = TypeChecker::default();
    for param in &program.params {
        if !seen.insert(param.name.as_str()) {
            return Err(CompileError::DuplicateParameter(param.name.clone()));
        }
        checker.env.push((param.name.clone(), param.ty));
    }
    let ty = checker.check(&program.body)?;
    program.ret.check_same(ty)?;
    Ok(())
}

fn unsupported(op: impl ToString, ty: IntType) -> CompileError {
    CompileError::UnsupportedOperator {
        op: op.to_string(),
        ty,
    }
}

fn expect_bool(ty: IntType) -> Result<(), CompileError> {
    if ty.is_bool() {
        Ok(())
    } else {
        Err(CompileError::NonBooleanCondition(ty))
    }
}

fn desugar(stmt: &Stmt) -> (&str, Expr) {
    match stmt {
        Stmt::Let(name, e) | Stmt::Assign(name, e) => (name.as_str(), e.clone()),
        Stmt::CompoundAssign(name, op, e) => (
            name.as_str(),
            Expr::binary(*op, Expr::Var(name.clone()), e.clone()),
        ),
    }
}

#[derive(Default)]
struct TypeChecker {
    env: Vec<(String, IntType)>,
}

impl TypeChecker {
    fn lookup(&self, name: &str) -> Result<IntType, CompileError> {
        self.env
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| CompileError::UnknownVariable(name.to_string()))
    }

    fn check_range(&self, ty: IntType, range: &RangePattern) -> Result<(), CompileError> {
        if ty.is_bool() {
            return Err(unsupported("..", ty));
        }
        ty.check_same(range.start.ty())?;
        ty.check_same(range.end.ty())?;
        Ok(())
    }

    fn check(&mut self, expr: &Expr) -> Result<IntType, CompileError> {
        match expr {
            Expr::Var(name) => self.lookup(name),
            Expr::Lit(lit) => Ok(lit.ty()),
            Expr::Unary(op, x) => {
                let ty = self.check(x)?;
                match op {
                    UnaryOp::Not => Ok(ty),
                    UnaryOp::Neg if ty.is_signed() => Ok(ty),
                    UnaryOp::Neg => Err(unsupported(op, ty)),
                }
            }
            Expr::Binary(op, x, y) => {
                let (tx, ty) = (self.check(x)?, self.check(y)?);
                match op {
                    BinOp::Shl | BinOp::Shr => {
                        if tx.is_bool() {
                            return Err(unsupported(op, tx));
                        }
                        if ty.is_signed() {
                            return Err(unsupported(op, ty));
                        }
                        Ok(tx)
                    }
                    BinOp::And | BinOp::Or => {
                        tx.check_same(ty)?;
                        if !tx.is_bool() {
                            return Err(unsupported(op, tx));
                        }
                        Ok(IntType::BOOL)
                    }
                    BinOp::Eq | BinOp::Ne => {
                        tx.check_same(ty)?;
                        Ok(IntType::BOOL)
                    }
                    BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                        tx.check_same(ty)?;
                        Ok(tx)
                    }
                    _ => {
                        tx.check_same(ty)?;
                        if tx.is_bool() {
                            return Err(unsupported(op, tx));
                        }
                        Ok(if op.is_comparison() { IntType::BOOL } else { tx })
                    }
                }
            }
            Expr::Cast(ty, x) => {
                self.check(x)?;
                Ok(*ty)
            }
            Expr::If(cond, then, otherwise) => {
                expect_bool(self.check(cond)?)?;
                let then_ty = self.check(then)?;
                let else_ty = self.check(otherwise)?;
                then_ty.check_same(else_ty)?;
                Ok(then_ty)
            }
            Expr::InRange(x, range) => {
                let ty = self.check(x)?;
                self.check_range(ty, range)?;
                Ok(IntType::BOOL)
            }
            Expr::Match(scrutinee, arms) => {
                let ty = self.check(scrutinee)?;
                let mut result: Option<IntType> = None;
                let mut has_default = false;
                for Arm { pattern, body } in arms {
                    match pattern {
                        Pattern::Literal(lit) => ty.check_same(lit.ty())?,
                        Pattern::Range(range) => self.check_range(ty, range)?,
                        Pattern::Wildcard => has_default = true,
                    }
                    let body_ty = self.check(body)?;
                    match result {
                        Some(result) => result.check_same(body_ty)?,
                        None => result = Some(body_ty),
                    }
                }
                match result {
                    Some(result) if has_default => Ok(result),
                    _ => Err(CompileError::MissingDefaultBranch),
                }
            }
            Expr::Block(stmts, result) => {
                let scope = self.env.len();
                for stmt in stmts {
                    let (name, value) = desugar(stmt);
                    let value_ty = self.check(&value)?;
                    if let Stmt::Let(..) = stmt {
                        self.env.push((name.to_string(), value_ty));
                    } else {
                        self.lookup(name)?.check_same(value_ty)?;
                    }
                }
                let ty = self.check(result);
                self.env.truncate(scope);
                ty
            }
        }
    }
}

#[derive(Default)]
struct Lowering {
    builder: Builder,
    env: Vec<(String, EncryptedValue)>,
}

impl Lowering {
    fn lookup(&self, name: &str) -> Result<EncryptedValue, CompileError> {
        self.env
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| CompileError::UnknownVariable(name.to_string()))
    }

    fn assign(&mut self, name: &str, value: EncryptedValue) -> Result<(), CompileError> {
        let Some((_, slot)) = self.env.iter_mut().rev().find(|(n, _)| n == name) else {
            return Err(CompileError::UnknownVariable(name.to_string()));
        };
        *slot = value;
        Ok(())
    }

    /// Merges the variables of `branch` into the current environment, keeping the branch value
    /// wherever `selector` is set.
    fn merge_env(
        &mut self,
        selector: WireId,
        branch: &[(String, EncryptedValue)],
    ) -> Result<(), CompileError> {
        for ((_, current), (_, assigned)) in self.env.iter_mut().zip(branch) {
            if current != assigned {
                *current = self.builder.mux(selector, assigned, current)?;
            }
        }
        Ok(())
    }

    fn bool_value(wire: WireId) -> EncryptedValue {
        EncryptedValue::new(IntType::BOOL, vec![wire])
    }

    fn range_test(
        &mut self,
        x: &EncryptedValue,
        range: &RangePattern,
    ) -> Result<WireId, CompileError> {
        let start = self.builder.literal(range.start);
        let end = self.builder.literal(range.end);
        let above_start = self.builder.ge(x, &start)?;
        let below_end = if range.inclusive {
            self.builder.le(x, &end)?
        } else {
            self.builder.lt(x, &end)?
        };
        Ok(self.builder.and(above_start, below_end))
    }

    fn lower(&mut self, expr: &Expr) -> Result<EncryptedValue, CompileError> {
        match expr {
            Expr::Var(name) => self.lookup(name),
            Expr::Lit(lit) => Ok(self.builder.literal(*lit)),
            Expr::Unary(op, x) => {
                let x = self.lower(x)?;
                match op {
                    UnaryOp::Not => Ok(self.builder.bitnot(&x)),
                    UnaryOp::Neg => Ok(self.builder.neg(&x)),
                }
            }
            Expr::Binary(op, x, y) => {
                let x = self.lower(x)?;
                let y = self.lower(y)?;
                self.lower_binary(*op, &x, &y)
            }
            Expr::Cast(ty, x) => {
                let x = self.lower(x)?;
                Ok(self.builder.cast(&x, *ty))
            }
            Expr::If(cond, then, otherwise) => {
                let cond = self.lower(cond)?.wires()[0];
                let saved = self.env.clone();
                let then = self.lower(then)?;
                let then_env = mem::replace(&mut self.env, saved);
                let otherwise = self.lower(otherwise)?;
                self.merge_env(cond, &then_env)?;
                Ok(self.builder.mux(cond, &then, &otherwise)?)
            }
            Expr::InRange(x, range) => {
                let x = self.lower(x)?;
                let wire = self.range_test(&x, range)?;
                Ok(Self::bool_value(wire))
            }
            Expr::Match(scrutinee, arms) => self.lower_match(scrutinee, arms),
            Expr::Block(stmts, result) => {
                let scope = self.env.len();
                for stmt in stmts {
                    let (name, value) = desugar(stmt);
                    let value = self.lower(&value)?;
                    if let Stmt::Let(..) = stmt {
                        self.env.push((name.to_string(), value));
                    } else {
                        self.assign(name, value)?;
                    }
                }
                let value = self.lower(result)?;
                self.env.truncate(scope);
                Ok(value)
            }
        }
    }

    fn lower_match(
        &mut self,
        scrutinee: &Expr,
        arms: &[Arm],
    ) -> Result<EncryptedValue, CompileError> {
        let x = self.lower(scrutinee)?;
        // arms after the first wildcard can never be selected
        let Some(default) = arms.iter().position(|arm| arm.pattern == Pattern::Wildcard) else {
            return Err(CompileError::MissingDefaultBranch);
        };
        let (arms, default) = (&arms[..default], &arms[default]);

        let mut selectors = Vec::with_capacity(arms.len());
        for arm in arms {
            let selector = match &arm.pattern {
                Pattern::Literal(lit) => {
                    let lit = self.builder.literal(*lit);
                    self.builder.eq(&x, &lit)?
                }
                Pattern::Range(range) => self.range_test(&x, range)?,
                Pattern::Wildcard => unreachable!("arms end before the first wildcard"),
            };
            selectors.push(selector);
        }

        let saved = self.env.clone();
        let mut branches = Vec::with_capacity(arms.len());
        for arm in arms {
            let value = self.lower(&arm.body)?;
            let env = mem::replace(&mut self.env, saved.clone());
            branches.push((value, env));
        }
        let mut result = self.lower(&default.body)?;
        for (selector, (value, env)) in selectors.into_iter().zip(branches).rev() {
            self.merge_env(selector, &env)?;
            result = self.builder.mux(selector, &value, &result)?;
        }
        Ok(result)
    }

    fn lower_binary(
        &mut self,
        op: BinOp,
        x: &EncryptedValue,
        y: &EncryptedValue,
    ) -> Result<EncryptedValue, CompileError> {
        let b = &mut self.builder;
        let value = match op {
            BinOp::Add => b.add(x, y)?,
            BinOp::Sub => b.sub(x, y)?,
            BinOp::Mul => b.mul(x, y)?,
            BinOp::Div => b.div(x, y)?,
            BinOp::Rem => b.rem(x, y)?,
            BinOp::BitAnd | BinOp::And => b.bitand(x, y)?,
            BinOp::BitOr | BinOp::Or => b.bitor(x, y)?,
            BinOp::BitXor => b.bitxor(x, y)?,
            BinOp::Shl => b.shl(x, y),
            BinOp::Shr => b.shr(x, y),
            BinOp::Eq => Self::bool_value(b.eq(x, y)?),
            BinOp::Ne => Self::bool_value(b.ne(x, y)?),
            BinOp::Lt => Self::bool_value(b.lt(x, y)?),
            BinOp::Le => Self::bool_value(b.le(x, y)?),
            BinOp::Gt => Self::bool_value(b.gt(x, y)?),
            BinOp::Ge => Self::bool_value(b.ge(x, y)?),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Arm, Stmt, block, if_else, lit, match_on, var},
        circuit::RevealPolicy,
    };

    fn program(params: Vec<Param>, ret: IntType, body: Expr) -> Program {
        Program {
            params,
            ret,
            reveal: RevealPolicy::EvaluatorOnly,
            body,
        }
    }

    fn run(program: &Program, garbler: &[Literal], evaluator: &[Literal]) -> Literal {
        let compiled = compile(program).unwrap();
        let g = compiled.encode_inputs(Party::Garbler, garbler).unwrap();
        let e = compiled.encode_inputs(Party::Evaluator, evaluator).unwrap();
        let out = compiled.circuit.eval(&g, &e).unwrap();
        compiled.decode_output(&out).unwrap()
    }

    fn garbler(name: &str, ty: IntType) -> Param {
        Param::new(name, ty, Party::Garbler)
    }

    fn evaluator(name: &str, ty: IntType) -> Param {
        Param::new(name, ty, Party::Evaluator)
    }

    #[test]
    fn rejects_width_mismatch() {
        let p = program(
            vec![garbler("a", IntType::U8), evaluator("b", IntType::U16)],
            IntType::U8,
            var("a") + var("b"),
        );
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::WidthMismatch {
                left: IntType::U8,
                right: IntType::U16
            }
        );
    }

    #[test]
    fn rejects_signedness_mismatch() {
        let p = program(
            vec![garbler("a", IntType::U8), evaluator("b", IntType::I8)],
            IntType::BOOL,
            var("a").less_than(var("b")),
        );
        assert!(matches!(
            compile(&p),
            Err(CompileError::SignednessMismatch { .. })
        ));
    }

    #[test]
    fn rejects_return_type_mismatch() {
        let p = program(
            vec![garbler("a", IntType::U8)],
            IntType::U16,
            var("a"),
        );
        assert!(matches!(compile(&p), Err(CompileError::WidthMismatch { .. })));
    }

    #[test]
    fn rejects_unsupported_operators() {
        let p = program(vec![garbler("a", IntType::U8)], IntType::U8, -var("a"));
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::UnsupportedOperator {
                op: "-".into(),
                ty: IntType::U8
            }
        );
        let p = program(
            vec![garbler("a", IntType::BOOL), evaluator("b", IntType::BOOL)],
            IntType::BOOL,
            var("a") + var("b"),
        );
        assert!(matches!(
            compile(&p),
            Err(CompileError::UnsupportedOperator { .. })
        ));
        let p = program(
            vec![garbler("a", IntType::U8), evaluator("b", IntType::U8)],
            IntType::BOOL,
            var("a").and(var("b")),
        );
        assert!(matches!(
            compile(&p),
            Err(CompileError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn rejects_unknown_variables_and_duplicates() {
        let p = program(vec![garbler("a", IntType::U8)], IntType::U8, var("c"));
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::UnknownVariable("c".into())
        );
        let p = program(
            vec![garbler("a", IntType::U8), evaluator("a", IntType::U8)],
            IntType::U8,
            var("a"),
        );
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::DuplicateParameter("a".into())
        );
    }

    #[test]
    fn rejects_non_boolean_condition() {
        let p = program(
            vec![garbler("a", IntType::U8)],
            IntType::U8,
            if_else(var("a"), lit(Literal::u8(1)), lit(Literal::u8(2))),
        );
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::NonBooleanCondition(IntType::U8)
        );
    }

    #[test]
    fn rejects_mismatched_branches() {
        let p = program(
            vec![garbler("a", IntType::U8)],
            IntType::U8,
            if_else(
                var("a").equals(lit(Literal::u8(0))),
                lit(Literal::u8(1)),
                lit(Literal::u16(2)),
            ),
        );
        assert!(matches!(compile(&p), Err(CompileError::WidthMismatch { .. })));
    }

    #[test]
    fn requires_a_wildcard_arm() {
        let p = program(
            vec![garbler("x", IntType::U8)],
            IntType::U8,
            match_on(
                var("x"),
                vec![
                    Arm::new(Pattern::Literal(Literal::u8(0)), lit(Literal::u8(1))),
                    Arm::new(
                        Pattern::Range(RangePattern::inclusive(Literal::u8(1), Literal::u8(255))),
                        lit(Literal::u8(2)),
                    ),
                ],
            ),
        );
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::MissingDefaultBranch
        );
    }

    #[test]
    fn conditional_selects_branch() {
        let p = program(
            vec![garbler("a", IntType::I16), evaluator("b", IntType::I16)],
            IntType::I16,
            if_else(
                var("a").greater_than(var("b")),
                var("a") - var("b"),
                var("b") - var("a"),
            ),
        );
        assert_eq!(run(&p, &[Literal::i16(-7)], &[Literal::i16(5)]).as_i128(), 12);
        assert_eq!(run(&p, &[Literal::i16(9)], &[Literal::i16(5)]).as_i128(), 4);
    }

    #[test]
    fn first_matching_arm_wins() {
        let p = program(
            vec![garbler("x", IntType::U8)],
            IntType::U8,
            match_on(
                var("x"),
                vec![
                    Arm::new(
                        Pattern::Range(RangePattern::exclusive(Literal::u8(0), Literal::u8(10))),
                        lit(Literal::u8(1)),
                    ),
                    Arm::new(Pattern::Literal(Literal::u8(5)), lit(Literal::u8(2))),
                    Arm::new(Pattern::Wildcard, lit(Literal::u8(3))),
                    Arm::new(Pattern::Literal(Literal::u8(20)), lit(Literal::u8(4))),
                ],
            ),
        );
        assert_eq!(run(&p, &[Literal::u8(5)], &[]).as_u128(), 1);
        assert_eq!(run(&p, &[Literal::u8(10)], &[]).as_u128(), 3);
        assert_eq!(run(&p, &[Literal::u8(20)], &[]).as_u128(), 3);
    }

    #[test]
    fn compound_assignment_and_branch_merging() {
        // let acc = a; acc += b; if acc > 100 { acc -= 100; } acc
        let body = block(
            vec![
                Stmt::Let("acc".into(), var("a")),
                Stmt::CompoundAssign("acc".into(), BinOp::Add, var("b")),
                Stmt::Let(
                    "unused".into(),
                    if_else(
                        var("acc").greater_than(lit(Literal::u16(100))),
                        block(
                            vec![Stmt::CompoundAssign(
                                "acc".into(),
                                BinOp::Sub,
                                lit(Literal::u16(100)),
                            )],
                            lit(Literal::bool(true)),
                        ),
                        lit(Literal::bool(false)),
                    ),
                ),
            ],
            var("acc"),
        );
        let p = program(
            vec![garbler("a", IntType::U16), evaluator("b", IntType::U16)],
            IntType::U16,
            body,
        );
        assert_eq!(run(&p, &[Literal::u16(70)], &[Literal::u16(50)]).as_u128(), 20);
        assert_eq!(run(&p, &[Literal::u16(30)], &[Literal::u16(50)]).as_u128(), 80);
    }

    #[test]
    fn assignment_must_keep_type() {
        let body = block(
            vec![
                Stmt::Let("x".into(), var("a")),
                Stmt::Assign("x".into(), lit(Literal::u16(1))),
            ],
            var("x"),
        );
        let p = program(vec![garbler("a", IntType::U8)], IntType::U8, body);
        assert!(matches!(compile(&p), Err(CompileError::WidthMismatch { .. })));
    }

    #[test]
    fn let_bindings_are_block_scoped() {
        let body = block(
            vec![Stmt::Let("y".into(), block(vec![Stmt::Let("z".into(), var("a"))], var("z")))],
            var("z"),
        );
        let p = program(vec![garbler("a", IntType::U8)], IntType::U8, body);
        assert_eq!(
            compile(&p).unwrap_err(),
            CompileError::UnknownVariable("z".into())
        );
    }

    #[test]
    fn casts_and_shifts() {
        let p = program(
            vec![garbler("a", IntType::I8), evaluator("k", IntType::U8)],
            IntType::I32,
            var("a").cast(IntType::I32) << var("k").cast(IntType::U32),
        );
        assert_eq!(run(&p, &[Literal::i8(-3)], &[Literal::u8(4)]).as_i128(), -48);
    }

    #[test]
    fn argument_encoding() {
        let p = program(
            vec![garbler("a", IntType::U8), evaluator("b", IntType::U8)],
            IntType::U8,
            var("a") ^ var("b"),
        );
        let compiled = compile(&p).unwrap();
        assert_eq!(
            compiled.encode_inputs(Party::Garbler, &[]),
            Err(ArgumentError::WrongArgumentCount {
                party: Party::Garbler,
                expected: 1,
                actual: 0
            })
        );
        assert!(matches!(
            compiled.encode_inputs(Party::Garbler, &[Literal::i8(1)]),
            Err(ArgumentError::Type(TypeError::SignednessMismatch { .. }))
        ));
    }
}
