//! End-to-end lowering tests: build an AST, resolve it, generate IR, and
//! assert the emitted instruction shapes.

use rill_codegen::Generator;
use rill_ir::{
    BinArithKind, BinaryOp, Code, Comparator, Constant, Decl, DeclKind, ExprArena, ExprId,
    ExprKind, FunctionDecl, IrDecl, IrFunction, IrModule, Label, Module, Name, Pattern, Reg,
    Span, Stmt, StmtKind, StringInterner, SwitchCase, TypeId, UnArithKind, UnaryOp,
};
use rill_resolve::{ModuleRegistry, Resolver};
use rill_types::{NominalTable, Pool};

struct Harness {
    pool: Pool,
    interner: StringInterner,
    nominals: NominalTable,
    registry: ModuleRegistry,
    arena: ExprArena,
}

impl Harness {
    fn new() -> Self {
        Harness {
            pool: Pool::new(),
            interner: StringInterner::new(),
            nominals: NominalTable::new(),
            registry: ModuleRegistry::new(),
            arena: ExprArena::new(),
        }
    }

    fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    fn var(&mut self, s: &str) -> ExprId {
        let n = self.name(s);
        self.arena.alloc(ExprKind::Variable(n), Span::DUMMY)
    }

    fn int(&mut self, v: i64) -> ExprId {
        self.arena
            .alloc(ExprKind::Constant(Constant::Int(v)), Span::DUMMY)
    }

    fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.arena
            .alloc(ExprKind::Binary { op, lhs, rhs }, Span::DUMMY)
    }

    /// Compile a single function with the given parameters, return type
    /// and body, returning the whole lowered module.
    fn compile(
        mut self,
        params: &[(&str, TypeId)],
        ret: TypeId,
        body: Vec<Stmt>,
    ) -> (IrModule, Vec<Name>) {
        let param_names: Vec<Name> = params.iter().map(|(n, _)| self.name(n)).collect();
        let param_types: Vec<TypeId> = params.iter().map(|(_, t)| *t).collect();
        let fty = self.pool.function(ret, TypeId::VOID, &param_types);

        let mut module = Module {
            name: self.name("test"),
            file: self.name("test.rl"),
            decls: vec![Decl {
                kind: DeclKind::Function(FunctionDecl {
                    name: self.name("f"),
                    params: param_names.clone(),
                    ty: fty,
                    ret_pattern: Pattern::Leaf(None),
                    requires: Vec::new(),
                    ensures: Vec::new(),
                    body,
                }),
                span: Span::DUMMY,
            }],
        };

        let mut resolver = Resolver::new(
            &mut self.pool,
            &self.interner,
            &self.nominals,
            &self.registry,
            &module,
        );
        resolver
            .resolve_module(&mut module, &mut self.arena)
            .expect("resolution failed");

        let generator = Generator::new(
            &mut self.pool,
            &self.interner,
            &self.nominals,
            &module,
        );
        let ir = generator
            .generate_module(&module, &mut self.arena)
            .expect("generation failed");
        (ir, param_names)
    }
}

fn body_of(ir: &IrModule) -> &IrFunction {
    match &ir.decls[0] {
        IrDecl::Function(f) => f,
        other => panic!("expected function, found {other:?}"),
    }
}

fn codes(f: &IrFunction) -> Vec<&Code> {
    f.body.iter().map(|e| &e.code).collect()
}

/// Every branch target must exist in the block, every loop-end must close
/// an opened loop, and every register read must follow a write (checked
/// conservatively: reads of registers beyond the parameters must have
/// appeared as a target earlier in the stream).
fn assert_well_formed(f: &IrFunction) {
    use std::collections::HashSet;

    let mut defined: HashSet<Label> = HashSet::new();
    let mut heads: HashSet<Label> = HashSet::new();
    for entry in f.body.iter() {
        if let Some(l) = entry.code.defined_label() {
            assert!(defined.insert(l), "label {l:?} defined twice");
        }
        match entry.code {
            Code::Loop { head } | Code::ForAll { head, .. } => {
                heads.insert(head);
            }
            _ => {}
        }
    }
    for entry in f.body.iter() {
        entry.code.for_each_branch_target(&mut |l: Label| {
            assert!(defined.contains(&l), "branch to undefined label {l:?}");
        });
        if let Code::LoopEnd(l) = entry.code {
            assert!(heads.contains(&l), "loop end without a head: {l:?}");
        }
    }
}

#[test]
fn s1_variable_declaration_with_initializer() {
    // int v = x + 1
    let mut h = Harness::new();
    let x = h.var("x");
    let one = h.int(1);
    let add = h.binary(BinaryOp::Add, x, one);
    let v = h.name("v");

    let body = vec![Stmt::new(
        StmtKind::VarDecl {
            pattern: Pattern::var(v),
            ty: TypeId::INT,
            init: Some(add),
        },
        Span::DUMMY,
    )];

    let (ir, _) = h.compile(&[("x", TypeId::INT)], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    // x@0, v@1; the initializer reads a copy of x.
    let c = codes(f);
    assert!(matches!(
        c[0],
        Code::Assign { target: t, operand: o, .. } if t.raw() == 2 && o.raw() == 0
    ));
    assert!(matches!(c[1], Code::Const { value: Constant::Int(1), .. }));
    assert!(matches!(
        c[2],
        Code::BinArithOp { kind: BinArithKind::Add, target: t, .. } if t.raw() == 4
    ));
    // The result lands in v's register.
    assert!(matches!(
        c[3],
        Code::Assign { target: t, operand: o, .. } if t.raw() == 1 && o.raw() == 4
    ));
    assert!(matches!(c[4], Code::Return { ty: TypeId::VOID, .. }));
}

#[test]
fn s2_index_assignment_lowers_to_update() {
    // xs[i+1] = 1
    let mut h = Harness::new();
    let list_int = h.pool.list(TypeId::INT);
    let i = h.var("i");
    let one = h.int(1);
    let idx = h.binary(BinaryOp::Add, i, one);
    let xs = h.var("xs");
    let lhs = h
        .arena
        .alloc(ExprKind::IndexOf { src: xs, index: idx }, Span::DUMMY);
    let rhs = h.int(1);

    let body = vec![Stmt::new(StmtKind::Assign { lhs, rhs }, Span::DUMMY)];
    let (ir, _) = h.compile(&[("i", TypeId::INT), ("xs", list_int)], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    let c = codes(f);
    // rhs first, then the index expression, then a single deep update on
    // the base variable.
    assert!(matches!(c[0], Code::Const { value: Constant::Int(1), .. }));
    let update = c
        .iter()
        .find_map(|code| match code {
            Code::Update {
                target,
                keys,
                fields,
                ..
            } => Some((*target, keys.clone(), fields.clone())),
            _ => None,
        })
        .expect("an update instruction");
    assert_eq!(update.0.raw(), 1, "updates the base variable xs");
    assert_eq!(update.1.len(), 1, "one pre-computed index register");
    assert!(update.2.is_empty(), "no field path");
}

#[test]
fn s3_short_circuit_disjunction() {
    // if x < y || x == y: x = y else: x = -y
    let mut h = Harness::new();
    let (x1, y1) = (h.var("x"), h.var("y"));
    let lt = h.binary(BinaryOp::Lt, x1, y1);
    let (x2, y2) = (h.var("x"), h.var("y"));
    let eq = h.binary(BinaryOp::Eq, x2, y2);
    let or = h.binary(BinaryOp::Or, lt, eq);

    let then_lhs = h.var("x");
    let then_rhs = h.var("y");
    let else_lhs = h.var("x");
    let else_y = h.var("y");
    let neg = h.arena.alloc(
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand: else_y,
        },
        Span::DUMMY,
    );

    let body = vec![Stmt::new(
        StmtKind::If {
            cond: or,
            then_branch: vec![Stmt::new(
                StmtKind::Assign {
                    lhs: then_lhs,
                    rhs: then_rhs,
                },
                Span::DUMMY,
            )],
            else_branch: vec![Stmt::new(
                StmtKind::Assign {
                    lhs: else_lhs,
                    rhs: neg,
                },
                Span::DUMMY,
            )],
        },
        Span::DUMMY,
    )];

    let (ir, _) = h.compile(
        &[("x", TypeId::INT), ("y", TypeId::INT)],
        TypeId::VOID,
        body,
    );
    let f = body_of(&ir);
    assert_well_formed(f);

    // !(a || b) = !a && !b: two conditional branches, the first flipped
    // back to Lt by the double inversion.
    let branches: Vec<Comparator> = f
        .body
        .iter()
        .filter_map(|e| match &e.code {
            Code::If { op, .. } => Some(*op),
            _ => None,
        })
        .collect();
    assert_eq!(branches, vec![Comparator::Lt, Comparator::Neq]);

    // The else branch negates y.
    assert!(f.body.iter().any(|e| matches!(
        e.code,
        Code::UnArithOp { kind: UnArithKind::Neg, .. }
    )));

    let labels = f
        .body
        .iter()
        .filter(|e| matches!(e.code, Code::Label(_)))
        .count();
    assert_eq!(labels, 3, "and-exit, else, and exit labels");
}

#[test]
fn s4_while_loop_envelope() {
    // while x < 10: x = x + 1
    let mut h = Harness::new();
    let x1 = h.var("x");
    let ten = h.int(10);
    let cond = h.binary(BinaryOp::Lt, x1, ten);
    let x2 = h.var("x");
    let one = h.int(1);
    let add = h.binary(BinaryOp::Add, x2, one);
    let x3 = h.var("x");

    let body = vec![Stmt::new(
        StmtKind::While {
            cond,
            body: vec![Stmt::new(StmtKind::Assign { lhs: x3, rhs: add }, Span::DUMMY)],
        },
        Span::DUMMY,
    )];

    let (ir, _) = h.compile(&[("x", TypeId::INT)], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    let c = codes(f);
    assert!(matches!(c[0], Code::Loop { .. }));
    // The inverted condition branches out of the loop.
    let exit = f
        .body
        .iter()
        .find_map(|e| match &e.code {
            Code::If {
                op: Comparator::GtEq,
                target,
                ..
            } => Some(*target),
            _ => None,
        })
        .expect("inverted loop condition");

    // Envelope: ... Nop; LoopEnd; Label exit; Return.
    let n = c.len();
    assert!(matches!(c[n - 4], Code::Nop));
    assert!(matches!(c[n - 3], Code::LoopEnd(_)));
    assert_eq!(c[n - 2], &Code::Label(exit));
    assert!(matches!(c[n - 1], Code::Return { .. }));
}

#[test]
fn s5_switch_dispatch_inserted_before_first_case() {
    // switch x+1: case 0,1: skip; case 2: skip; default: skip
    let mut h = Harness::new();
    let x = h.var("x");
    let one = h.int(1);
    let scrut = h.binary(BinaryOp::Add, x, one);

    let case01 = SwitchCase {
        constants: vec![Constant::Int(0), Constant::Int(1)],
        body: vec![Stmt::new(StmtKind::Skip, Span::DUMMY)],
        span: Span::DUMMY,
    };
    let case2 = SwitchCase {
        constants: vec![Constant::Int(2)],
        body: vec![Stmt::new(StmtKind::Skip, Span::DUMMY)],
        span: Span::DUMMY,
    };
    let default = SwitchCase {
        constants: vec![],
        body: vec![Stmt::new(StmtKind::Skip, Span::DUMMY)],
        span: Span::DUMMY,
    };

    let body = vec![Stmt::new(
        StmtKind::Switch {
            expr: scrut,
            cases: vec![case01, case2, default],
        },
        Span::DUMMY,
    )];

    let (ir, _) = h.compile(&[("x", TypeId::INT)], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    let c = codes(f);
    let switch_at = c
        .iter()
        .position(|code| matches!(code, Code::Switch { .. }))
        .expect("switch instruction");
    let Code::Switch {
        default, branches, ..
    } = c[switch_at]
    else {
        unreachable!()
    };

    // 0 and 1 share a label; 2 has its own; default points elsewhere.
    assert_eq!(branches.len(), 3);
    assert_eq!(branches[0].1, branches[1].1);
    assert_ne!(branches[0].1, branches[2].1);
    assert_ne!(*default, branches[0].1);
    assert_eq!(branches[0].0, Constant::Int(0));
    assert_eq!(branches[1].0, Constant::Int(1));
    assert_eq!(branches[2].0, Constant::Int(2));

    // The dispatch sits immediately before the first case body's label.
    assert_eq!(c[switch_at + 1], &Code::Label(branches[0].1));
}

#[test]
fn s6_return_uses_declared_type() {
    // function f(int i) => int: return i * 2
    let mut h = Harness::new();
    let i = h.var("i");
    let two = h.int(2);
    let mul = h.binary(BinaryOp::Mul, i, two);

    let body = vec![Stmt::new(StmtKind::Return { expr: Some(mul) }, Span::DUMMY)];
    let (ir, _) = h.compile(&[("i", TypeId::INT)], TypeId::INT, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    let c = codes(f);
    assert!(matches!(c[0], Code::Assign { operand: o, .. } if o.raw() == 0));
    assert!(matches!(c[1], Code::Const { value: Constant::Int(2), .. }));
    assert!(matches!(c[2], Code::BinArithOp { kind: BinArithKind::Mul, .. }));
    // The declared return type governs, forcing the coercion point.
    assert!(matches!(
        c[3],
        Code::Return { ty: TypeId::INT, operand: o } if o.raw() == 3
    ));
    // The implicit trailing return remains as dead code.
    assert!(matches!(c[4], Code::Return { ty: TypeId::VOID, .. }));
}

#[test]
fn xor_condition_branches_on_disagreement() {
    // if a ^^ b: skip
    let mut h = Harness::new();
    let a = h.var("a");
    let b = h.var("b");
    let xor = h.binary(BinaryOp::Xor, a, b);

    let body = vec![Stmt::new(
        StmtKind::If {
            cond: xor,
            then_branch: vec![Stmt::new(StmtKind::Skip, Span::DUMMY)],
            else_branch: vec![],
        },
        Span::DUMMY,
    )];

    let (ir, _) = h.compile(
        &[("a", TypeId::BOOL), ("b", TypeId::BOOL)],
        TypeId::VOID,
        body,
    );
    let f = body_of(&ir);
    assert_well_formed(f);

    // Both operands are materialized and compared for inequality; no
    // short-circuiting is possible for exclusive-or.
    let branches: Vec<(TypeId, Comparator)> = f
        .body
        .iter()
        .filter_map(|e| match &e.code {
            Code::If { ty, op, .. } => Some((*ty, *op)),
            _ => None,
        })
        .collect();
    assert_eq!(branches, vec![(TypeId::BOOL, Comparator::Neq)]);

    // The operand copies precede the branch.
    let copies = f
        .body
        .iter()
        .filter(|e| matches!(e.code, Code::Assign { ty: TypeId::BOOL, .. }))
        .count();
    assert_eq!(copies, 2);
}

#[test]
fn xor_expression_materializes_a_boolean() {
    // x = a ^^ b
    let mut h = Harness::new();
    let a = h.var("a");
    let b = h.var("b");
    let xor = h.binary(BinaryOp::Xor, a, b);
    let x = h.var("x");

    let body = vec![Stmt::new(StmtKind::Assign { lhs: x, rhs: xor }, Span::DUMMY)];
    let (ir, _) = h.compile(
        &[("a", TypeId::BOOL), ("b", TypeId::BOOL), ("x", TypeId::BOOL)],
        TypeId::VOID,
        body,
    );
    let f = body_of(&ir);
    assert_well_formed(f);

    // The disagreement branch feeds the false/true materialization.
    assert!(f.body.iter().any(|e| matches!(
        e.code,
        Code::If { ty: TypeId::BOOL, op: Comparator::Neq, .. }
    )));
    let bools: Vec<bool> = f
        .body
        .iter()
        .filter_map(|e| match &e.code {
            Code::Const {
                value: Constant::Bool(v),
                ..
            } => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(bools, vec![false, true]);

    // The materialized boolean lands in x's register.
    assert!(f.body.iter().any(|e| matches!(
        e.code,
        Code::Assign { target, operand, .. } if target.raw() == 2 && operand.raw() == 5
    )));
}

#[test]
fn rational_assignment_destructures_once() {
    // n / d = r
    let mut h = Harness::new();
    let n = h.var("n");
    let d = h.var("d");
    let lhs = h.binary(BinaryOp::Div, n, d);
    let r = h.var("r");

    let body = vec![Stmt::new(StmtKind::Assign { lhs, rhs: r }, Span::DUMMY)];
    let (ir, _) = h.compile(
        &[("n", TypeId::INT), ("d", TypeId::INT), ("r", TypeId::REAL)],
        TypeId::VOID,
        body,
    );
    let f = body_of(&ir);
    assert_well_formed(f);

    let kinds: Vec<UnArithKind> = f
        .body
        .iter()
        .filter_map(|e| match &e.code {
            Code::UnArithOp { kind, target, .. } => {
                assert!(target.raw() <= 1, "writes the declared variables");
                Some(*kind)
            }
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec![UnArithKind::Numerator, UnArithKind::Denominator]);
}

#[test]
fn break_branches_to_loop_exit() {
    // while true: break
    let mut h = Harness::new();
    let cond = h
        .arena
        .alloc(ExprKind::Constant(Constant::Bool(true)), Span::DUMMY);

    let body = vec![Stmt::new(
        StmtKind::While {
            cond,
            body: vec![Stmt::new(StmtKind::Break, Span::DUMMY)],
        },
        Span::DUMMY,
    )];
    let (ir, _) = h.compile(&[], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    // The break's goto targets the label that follows the loop end.
    let exit = f
        .body
        .iter()
        .rev()
        .find_map(|e| match e.code {
            Code::Label(l) => Some(l),
            _ => None,
        })
        .unwrap();
    assert!(f
        .body
        .iter()
        .any(|e| matches!(&e.code, Code::Goto(l) if *l == exit)));
}

#[test]
fn break_outside_loop_is_rejected() {
    let h = Harness::new();
    let body = vec![Stmt::new(StmtKind::Break, Span::DUMMY)];

    let mut module = Module {
        name: h.name("test"),
        file: h.name("test.rl"),
        decls: Vec::new(),
    };
    let mut h = h;
    let fty = h.pool.function(TypeId::VOID, TypeId::VOID, &[]);
    module.decls.push(Decl {
        kind: DeclKind::Function(FunctionDecl {
            name: h.name("f"),
            params: vec![],
            ty: fty,
            ret_pattern: Pattern::Leaf(None),
            requires: vec![],
            ensures: vec![],
            body,
        }),
        span: Span::DUMMY,
    });

    let mut resolver = Resolver::new(
        &mut h.pool,
        &h.interner,
        &h.nominals,
        &h.registry,
        &module,
    );
    resolver
        .resolve_module(&mut module, &mut h.arena)
        .expect("resolution succeeds");

    let generator = Generator::new(&mut h.pool, &h.interner, &h.nominals, &module);
    let err = generator
        .generate_module(&module, &mut h.arena)
        .expect_err("break outside loop");
    assert_eq!(err.code(), Some(rill_diagnostic::ErrorCode::E3001));
}

#[test]
fn lambda_synthesizes_anonymous_function_with_captures() {
    // function f(int y) => int: (int -> int) g = lambda x -> x + y; return g(1)
    let mut h = Harness::new();
    let fn_ty = h.pool.function(TypeId::INT, TypeId::VOID, &[TypeId::INT]);

    let x_name = h.name("x");
    let lam_x = h.var("x");
    let lam_y = h.var("y");
    let lam_body = h.binary(BinaryOp::Add, lam_x, lam_y);
    let lambda = h.arena.alloc(
        ExprKind::Lambda {
            params: vec![(x_name, TypeId::INT)],
            body: lam_body,
        },
        Span::DUMMY,
    );

    let g = h.name("g");
    let one = h.int(1);
    let call = h.arena.alloc(
        ExprKind::Invoke {
            receiver: None,
            name: g,
            args: vec![one],
        },
        Span::DUMMY,
    );

    let body = vec![
        Stmt::new(
            StmtKind::VarDecl {
                pattern: Pattern::var(g),
                ty: fn_ty,
                init: Some(lambda),
            },
            Span::DUMMY,
        ),
        Stmt::new(StmtKind::Return { expr: Some(call) }, Span::DUMMY),
    ];

    let (ir, _) = h.compile(&[("y", TypeId::INT)], TypeId::INT, body);

    // The module gained a synthesized lambda function at the end.
    assert_eq!(ir.decls.len(), 2);
    let IrDecl::Function(lam) = &ir.decls[1] else {
        panic!("expected the synthesized lambda");
    };
    assert!(lam.synthetic);

    // Its body ends in a typed return.
    assert!(lam
        .body
        .iter()
        .any(|e| matches!(e.code, Code::Return { ty: TypeId::INT, .. })));

    // The construction site carries one call-time slot and one capture.
    let f = body_of(&ir);
    let lambda_instr = f
        .body
        .iter()
        .find_map(|e| match &e.code {
            Code::Lambda { operands, .. } => Some(operands.clone()),
            _ => None,
        })
        .expect("lambda construction");
    assert_eq!(lambda_instr.len(), 2);
    assert!(lambda_instr[0].is_null(), "explicit parameter slot");
    assert_eq!(lambda_instr[1], Reg::from_raw(0), "captured y");

    // The indirect call goes through g's register.
    assert!(f
        .body
        .iter()
        .any(|e| matches!(e.code, Code::IndirectInvoke { .. })));
}

#[test]
fn quantifier_condition_opens_and_closes_loops() {
    // if some { x in xs | x > 0 }: skip
    let mut h = Harness::new();
    let list_int = h.pool.list(TypeId::INT);
    let x_name = h.name("x");
    let xs = h.var("xs");
    let x_use = h.var("x");
    let zero = h.int(0);
    let gt = h.binary(BinaryOp::Gt, x_use, zero);
    let some = h.arena.alloc(
        ExprKind::Comprehension {
            kind: rill_ir::CompKind::Some,
            sources: vec![(x_name, xs)],
            condition: Some(gt),
            value: None,
        },
        Span::DUMMY,
    );

    let body = vec![Stmt::new(
        StmtKind::If {
            cond: some,
            then_branch: vec![Stmt::new(StmtKind::Skip, Span::DUMMY)],
            else_branch: vec![],
        },
        Span::DUMMY,
    )];

    let (ir, _) = h.compile(&[("xs", list_int)], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    let foralls = f
        .body
        .iter()
        .filter(|e| matches!(e.code, Code::ForAll { .. }))
        .count();
    let loop_ends = f
        .body
        .iter()
        .filter(|e| matches!(e.code, Code::LoopEnd(_)))
        .count();
    assert_eq!(foralls, 1);
    assert_eq!(loop_ends, 1);
}

#[test]
fn forall_over_map_destructures_key_value() {
    // for k, v in m: skip
    let mut h = Harness::new();
    let map_ty = h.pool.map(TypeId::STRING, TypeId::INT);
    let m = h.var("m");
    let k = h.name("k");
    let v = h.name("v");

    let body = vec![Stmt::new(
        StmtKind::ForAll {
            vars: vec![k, v],
            source: m,
            body: vec![Stmt::new(StmtKind::Skip, Span::DUMMY)],
        },
        Span::DUMMY,
    )];
    let (ir, _) = h.compile(&[("m", map_ty)], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    // Two tuple loads pull the key and value out of the index register.
    let loads: Vec<u32> = f
        .body
        .iter()
        .filter_map(|e| match &e.code {
            Code::TupleLoad { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(loads, vec![0, 1]);
}

#[test]
fn forall_over_list_rejects_destructuring() {
    let mut h = Harness::new();
    let list_int = h.pool.list(TypeId::INT);
    let xs = h.var("xs");
    let a = h.name("a");
    let b = h.name("b");

    let body = vec![Stmt::new(
        StmtKind::ForAll {
            vars: vec![a, b],
            source: xs,
            body: vec![],
        },
        Span::DUMMY,
    )];

    let mut module = Module {
        name: h.name("test"),
        file: h.name("test.rl"),
        decls: Vec::new(),
    };
    let fty = h.pool.function(TypeId::VOID, TypeId::VOID, &[list_int]);
    module.decls.push(Decl {
        kind: DeclKind::Function(FunctionDecl {
            name: h.name("f"),
            params: vec![h.name("xs")],
            ty: fty,
            ret_pattern: Pattern::Leaf(None),
            requires: vec![],
            ensures: vec![],
            body,
        }),
        span: Span::DUMMY,
    });

    let mut resolver = Resolver::new(
        &mut h.pool,
        &h.interner,
        &h.nominals,
        &h.registry,
        &module,
    );
    let err = resolver
        .resolve_module(&mut module, &mut h.arena)
        .expect_err("list destructuring is unsupported");
    assert_eq!(err.code(), Some(rill_diagnostic::ErrorCode::E2011));
}

#[test]
fn duplicate_case_constant_is_rejected() {
    let mut h = Harness::new();
    let x = h.var("x");

    let body = vec![Stmt::new(
        StmtKind::Switch {
            expr: x,
            cases: vec![
                SwitchCase {
                    constants: vec![Constant::Int(0)],
                    body: vec![],
                    span: Span::DUMMY,
                },
                SwitchCase {
                    constants: vec![Constant::Int(0)],
                    body: vec![],
                    span: Span::DUMMY,
                },
            ],
        },
        Span::DUMMY,
    )];

    let mut module = Module {
        name: h.name("test"),
        file: h.name("test.rl"),
        decls: Vec::new(),
    };
    let fty = h.pool.function(TypeId::VOID, TypeId::VOID, &[TypeId::INT]);
    module.decls.push(Decl {
        kind: DeclKind::Function(FunctionDecl {
            name: h.name("f"),
            params: vec![h.name("x")],
            ty: fty,
            ret_pattern: Pattern::Leaf(None),
            requires: vec![],
            ensures: vec![],
            body,
        }),
        span: Span::DUMMY,
    });

    let mut resolver = Resolver::new(
        &mut h.pool,
        &h.interner,
        &h.nominals,
        &h.registry,
        &module,
    );
    resolver
        .resolve_module(&mut module, &mut h.arena)
        .expect("resolution succeeds");
    let generator = Generator::new(&mut h.pool, &h.interner, &h.nominals, &module);
    let err = generator
        .generate_module(&module, &mut h.arena)
        .expect_err("duplicate case");
    assert_eq!(err.code(), Some(rill_diagnostic::ErrorCode::E3002));
}

#[test]
fn try_catch_reserves_dispatch_and_marks_try_end() {
    // try: f() catch(any e): skip
    let mut h = Harness::new();
    let callee = h.name("callee");
    let sig = h.pool.function(TypeId::VOID, TypeId::VOID, &[]);
    let module_name = h.name("test");
    h.registry.register_function(module_name, callee, sig);

    let call = h.arena.alloc(
        ExprKind::Invoke {
            receiver: None,
            name: callee,
            args: vec![],
        },
        Span::DUMMY,
    );
    let e = h.name("e");

    let body = vec![Stmt::new(
        StmtKind::TryCatch {
            body: vec![Stmt::new(StmtKind::Expr { expr: call }, Span::DUMMY)],
            catches: vec![rill_ir::Catch {
                ty: TypeId::ANY,
                var: e,
                body: vec![Stmt::new(StmtKind::Skip, Span::DUMMY)],
                span: Span::DUMMY,
            }],
        },
        Span::DUMMY,
    )];

    let (ir, _) = h.compile(&[], TypeId::VOID, body);
    let f = body_of(&ir);
    assert_well_formed(f);

    let c = codes(f);
    // Dispatch first, then the protected body.
    let Code::TryCatch { end, catches, .. } = c[0] else {
        panic!("expected try-catch dispatch first, found {:?}", c[0]);
    };
    assert_eq!(catches.len(), 1);
    assert_eq!(catches[0].1, *end, "first handler doubles as the try end");
    assert!(f
        .body
        .iter()
        .any(|e| matches!(&e.code, Code::TryEnd(l) if l == end)));
    // The call in statement position discards its result.
    assert!(f
        .body
        .iter()
        .any(|e| matches!(&e.code, Code::Invoke { target, .. } if target.is_null())));
}
