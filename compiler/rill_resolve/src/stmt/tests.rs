use rill_ir::{
    BinaryOp, Constant, ExprArena, ExprId, ExprKind, Module, Name, Span, StringInterner, TypeId,
};
use rill_types::{NominalTable, Pool, Tag};

use crate::{Environment, ModuleRegistry, Resolver};

struct Fixture {
    pool: Pool,
    interner: StringInterner,
    nominals: NominalTable,
    registry: ModuleRegistry,
    arena: ExprArena,
    module: Module,
}

impl Fixture {
    fn new() -> Self {
        let interner = StringInterner::new();
        let module = Module {
            name: interner.intern("test"),
            file: interner.intern("test.rl"),
            decls: Vec::new(),
        };
        Fixture {
            pool: Pool::new(),
            interner,
            nominals: NominalTable::new(),
            registry: ModuleRegistry::new(),
            arena: ExprArena::new(),
            module,
        }
    }

    fn var(&mut self, name: &str) -> (Name, ExprId) {
        let n = self.interner.intern(name);
        let id = self.arena.alloc(ExprKind::Variable(n), Span::DUMMY);
        (n, id)
    }

    fn int(&mut self, v: i64) -> ExprId {
        self.arena
            .alloc(ExprKind::Constant(Constant::Int(v)), Span::DUMMY)
    }
}

#[test]
fn index_disambiguates_to_list_access() {
    let mut fx = Fixture::new();
    let list_int = fx.pool.list(TypeId::INT);
    let (xs, xs_id) = fx.var("xs");
    let i = fx.int(0);
    let idx = fx
        .arena
        .alloc(ExprKind::IndexOf { src: xs_id, index: i }, Span::DUMMY);

    let mut env = Environment::new();
    env.bind(xs, list_int);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    let ty = resolver.resolve_expr(arena, idx, &env).unwrap();

    assert_eq!(ty, TypeId::INT);
    assert!(matches!(arena[idx].kind, ExprKind::ListAccess { .. }));
    assert_eq!(arena[idx].src_ty, list_int);
}

#[test]
fn index_disambiguates_to_string_and_map_access() {
    let mut fx = Fixture::new();
    let map_ty = fx.pool.map(TypeId::STRING, TypeId::INT);
    let (s, s_id) = fx.var("s");
    let (m, m_id) = fx.var("m");
    let i = fx.int(0);
    let k = fx
        .arena
        .alloc(ExprKind::Constant(Constant::Str(fx.interner.intern("k"))), Span::DUMMY);
    let s_idx = fx
        .arena
        .alloc(ExprKind::IndexOf { src: s_id, index: i }, Span::DUMMY);
    let m_idx = fx
        .arena
        .alloc(ExprKind::IndexOf { src: m_id, index: k }, Span::DUMMY);

    let mut env = Environment::new();
    env.bind(s, TypeId::STRING);
    env.bind(m, map_ty);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);

    assert_eq!(resolver.resolve_expr(arena, s_idx, &env).unwrap(), TypeId::CHAR);
    assert!(matches!(arena[s_idx].kind, ExprKind::StringAccess { .. }));

    assert_eq!(resolver.resolve_expr(arena, m_idx, &env).unwrap(), TypeId::INT);
    assert!(matches!(arena[m_idx].kind, ExprKind::MapAccess { .. }));
}

#[test]
fn add_stays_arithmetic_on_ints() {
    let mut fx = Fixture::new();
    let a = fx.int(1);
    let b = fx.int(2);
    let add = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Add,
            lhs: a,
            rhs: b,
        },
        Span::DUMMY,
    );

    let env = Environment::new();
    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    assert_eq!(resolver.resolve_expr(arena, add, &env).unwrap(), TypeId::INT);
    assert!(matches!(
        arena[add].kind,
        ExprKind::Binary { op: BinaryOp::Add, .. }
    ));
}

#[test]
fn add_becomes_list_append_on_lists() {
    let mut fx = Fixture::new();
    let list_int = fx.pool.list(TypeId::INT);
    let (xs, xs_id) = fx.var("xs");
    let (ys, ys_id) = fx.var("ys");
    let add = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Add,
            lhs: xs_id,
            rhs: ys_id,
        },
        Span::DUMMY,
    );

    let mut env = Environment::new();
    env.bind(xs, list_int);
    env.bind(ys, list_int);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    let ty = resolver.resolve_expr(arena, add, &env).unwrap();
    assert_eq!(ty, list_int);
    assert!(matches!(
        arena[add].kind,
        ExprKind::Binary { op: BinaryOp::ListAppend, .. }
    ));
}

#[test]
fn add_becomes_union_on_sets() {
    let mut fx = Fixture::new();
    let set_int = fx.pool.set(TypeId::INT);
    let (xs, xs_id) = fx.var("xs");
    let (ys, ys_id) = fx.var("ys");
    let add = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Add,
            lhs: xs_id,
            rhs: ys_id,
        },
        Span::DUMMY,
    );

    let mut env = Environment::new();
    env.bind(xs, set_int);
    env.bind(ys, set_int);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    let ty = resolver.resolve_expr(arena, add, &env).unwrap();
    assert_eq!(ty, set_int);
    assert!(matches!(
        arena[add].kind,
        ExprKind::Binary { op: BinaryOp::Union, .. }
    ));
}

#[test]
fn add_becomes_string_append_with_string_operand() {
    let mut fx = Fixture::new();
    let hello = fx.interner.intern("hello");
    let s = fx
        .arena
        .alloc(ExprKind::Constant(Constant::Str(hello)), Span::DUMMY);
    let c = fx
        .arena
        .alloc(ExprKind::Constant(Constant::Char('!')), Span::DUMMY);
    let add = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Add,
            lhs: s,
            rhs: c,
        },
        Span::DUMMY,
    );

    let env = Environment::new();
    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    assert_eq!(
        resolver.resolve_expr(arena, add, &env).unwrap(),
        TypeId::STRING
    );
    assert!(matches!(
        arena[add].kind,
        ExprKind::Binary { op: BinaryOp::StringAppend, .. }
    ));
}

#[test]
fn type_test_refines_local_under_both_signs() {
    let mut fx = Fixture::new();
    let int_or_null = fx.pool.union2(TypeId::INT, TypeId::NULL);
    let (x, x_id) = fx.var("x");
    let tv = fx.arena.alloc(ExprKind::TypeVal(TypeId::INT), Span::DUMMY);
    let cond = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Is,
            lhs: x_id,
            rhs: tv,
        },
        Span::DUMMY,
    );

    let mut env = Environment::new();
    env.bind(x, int_or_null);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);

    let true_env = resolver
        .resolve_condition(arena, cond, true, env.clone())
        .unwrap();
    assert_eq!(true_env.lookup(x), Some(TypeId::INT));

    let false_env = resolver.resolve_condition(arena, cond, false, env).unwrap();
    // int|null minus int leaves null.
    assert_eq!(false_env.lookup(x), Some(TypeId::NULL));
}

#[test]
fn null_comparison_refines_like_a_type_test() {
    let mut fx = Fixture::new();
    let int_or_null = fx.pool.union2(TypeId::INT, TypeId::NULL);
    let (x, x_id) = fx.var("x");
    let null = fx
        .arena
        .alloc(ExprKind::Constant(Constant::Null), Span::DUMMY);
    let cond = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::NotEq,
            lhs: x_id,
            rhs: null,
        },
        Span::DUMMY,
    );

    let mut env = Environment::new();
    env.bind(x, int_or_null);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);

    // x != null: the true branch sees int.
    let true_env = resolver
        .resolve_condition(arena, cond, true, env.clone())
        .unwrap();
    assert_eq!(true_env.lookup(x), Some(TypeId::INT));
    let false_env = resolver.resolve_condition(arena, cond, false, env).unwrap();
    assert_eq!(false_env.lookup(x), Some(TypeId::NULL));
}

#[test]
fn xor_is_a_boolean_leaf_with_no_refinement() {
    // (x is int) ^^ b — both operands type-check as booleans, but the
    // type test's refinement must not leak out in either sign.
    let mut fx = Fixture::new();
    let int_or_null = fx.pool.union2(TypeId::INT, TypeId::NULL);
    let (x, x_id) = fx.var("x");
    let tv = fx.arena.alloc(ExprKind::TypeVal(TypeId::INT), Span::DUMMY);
    let is_int = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Is,
            lhs: x_id,
            rhs: tv,
        },
        Span::DUMMY,
    );
    let (b, b_id) = fx.var("b");
    let xor = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Xor,
            lhs: is_int,
            rhs: b_id,
        },
        Span::DUMMY,
    );

    let mut env = Environment::new();
    env.bind(x, int_or_null);
    env.bind(b, TypeId::BOOL);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);

    let true_env = resolver
        .resolve_condition(arena, xor, true, env.clone())
        .unwrap();
    assert_eq!(true_env.lookup(x), Some(int_or_null));
    assert_eq!(arena[xor].ty, TypeId::BOOL);

    let false_env = resolver.resolve_condition(arena, xor, false, env).unwrap();
    assert_eq!(false_env.lookup(x), Some(int_or_null));
}

#[test]
fn conjunction_threads_refinement_into_second_operand() {
    // x is int && x < 10 — the comparison only type-checks because the
    // first conjunct refined x to int.
    let mut fx = Fixture::new();
    let int_or_null = fx.pool.union2(TypeId::INT, TypeId::NULL);
    let (x, x_id) = fx.var("x");
    let tv = fx.arena.alloc(ExprKind::TypeVal(TypeId::INT), Span::DUMMY);
    let is_int = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Is,
            lhs: x_id,
            rhs: tv,
        },
        Span::DUMMY,
    );
    let (_, x2_id) = fx.var("x");
    let ten = fx.int(10);
    let lt = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::Lt,
            lhs: x2_id,
            rhs: ten,
        },
        Span::DUMMY,
    );
    let and = fx.arena.alloc(
        ExprKind::Binary {
            op: BinaryOp::And,
            lhs: is_int,
            rhs: lt,
        },
        Span::DUMMY,
    );

    let mut env = Environment::new();
    env.bind(x, int_or_null);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    let out = resolver.resolve_condition(arena, and, true, env).unwrap();
    assert_eq!(out.lookup(x), Some(TypeId::INT));
}

#[test]
fn unqualified_call_resolves_to_direct_function_call() {
    let mut fx = Fixture::new();
    let f = fx.interner.intern("f");
    let sig = fx.pool.function(TypeId::INT, TypeId::VOID, &[TypeId::INT]);
    fx.registry.register_function(fx.module.name, f, sig);

    let arg = fx.int(1);
    let call = fx.arena.alloc(
        ExprKind::Invoke {
            receiver: None,
            name: f,
            args: vec![arg],
        },
        Span::DUMMY,
    );

    let env = Environment::new();
    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    let ty = resolver.resolve_expr(arena, call, &env).unwrap();
    assert_eq!(ty, TypeId::INT);
    assert!(matches!(arena[call].kind, ExprKind::FunctionCall { .. }));
    assert_eq!(arena[call].src_ty, sig);
}

#[test]
fn call_through_function_typed_local_becomes_indirect() {
    let mut fx = Fixture::new();
    let sig = fx.pool.function(TypeId::INT, TypeId::VOID, &[TypeId::INT]);
    let g = fx.interner.intern("g");
    let arg = fx.int(1);
    let call = fx.arena.alloc(
        ExprKind::Invoke {
            receiver: None,
            name: g,
            args: vec![arg],
        },
        Span::DUMMY,
    );

    let mut env = Environment::new();
    env.bind(g, sig);

    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    let ty = resolver.resolve_expr(arena, call, &env).unwrap();
    assert_eq!(ty, TypeId::INT);
    assert!(matches!(
        arena[call].kind,
        ExprKind::IndirectFunctionCall { .. }
    ));
}

#[test]
fn unknown_variable_is_a_syntax_error() {
    let mut fx = Fixture::new();
    let (_, x_id) = fx.var("nope");
    let env = Environment::new();
    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    let err = resolver.resolve_expr(arena, x_id, &env).unwrap_err();
    assert_eq!(err.code(), Some(rill_diagnostic::ErrorCode::E2001));
}

#[test]
fn method_signature_resolves_to_method_call() {
    let mut fx = Fixture::new();
    let m = fx.interner.intern("update");
    let sig = fx.pool.method(TypeId::VOID, TypeId::VOID, &[TypeId::INT]);
    assert_eq!(fx.pool.tag(sig), Tag::Method);
    fx.registry.register_function(fx.module.name, m, sig);

    let arg = fx.int(1);
    let call = fx.arena.alloc(
        ExprKind::Invoke {
            receiver: None,
            name: m,
            args: vec![arg],
        },
        Span::DUMMY,
    );

    let env = Environment::new();
    let Fixture {
        ref mut pool,
        ref interner,
        ref nominals,
        ref registry,
        ref mut arena,
        ref module,
    } = fx;
    let mut resolver = Resolver::new(pool, interner, nominals, registry, module);
    resolver.resolve_expr(arena, call, &env).unwrap();
    assert!(matches!(arena[call].kind, ExprKind::MethodCall { .. }));
}
