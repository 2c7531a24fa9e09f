use rill_ir::{
    BinArithKind, Code, CodeBlock, Comparator, Constant, IrDecl, IrFunction, IrModule, Name,
    QName, Reg, SourceAttr, StringInterner, TypeId,
};
use rill_types::{NominalTable, Pool};

use crate::{transform, RuntimeAssertions};

fn attr() -> SourceAttr {
    SourceAttr::SYNTHETIC
}

fn function(name: Name, ty: TypeId, body: CodeBlock) -> IrFunction {
    IrFunction {
        name,
        ty,
        body,
        precondition: None,
        postcondition: None,
        synthetic: false,
    }
}

fn module_of(interner: &StringInterner, decls: Vec<IrDecl>) -> IrModule {
    IrModule {
        name: interner.intern("test"),
        file: interner.intern("test.rl"),
        decls,
    }
}

#[test]
fn list_index_is_bounds_checked() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let nominals = NominalTable::new();

    let list_int = pool.list(TypeId::INT);
    let fty = pool.function(TypeId::INT, TypeId::VOID, &[list_int, TypeId::INT]);

    let mut body = CodeBlock::new(2);
    body.append(
        Code::IndexOf {
            ty: list_int,
            target: Reg::from_raw(2),
            src: Reg::from_raw(0),
            index: Reg::from_raw(1),
        },
        attr(),
    );
    body.append(
        Code::Return {
            ty: TypeId::INT,
            operand: Reg::from_raw(2),
        },
        attr(),
    );

    let module = module_of(
        &interner,
        vec![IrDecl::Function(function(interner.intern("get"), fty, body))],
    );
    let out = transform(&mut pool, &nominals, &module).unwrap();

    let IrDecl::Function(f) = &out.decls[0] else {
        panic!("expected function");
    };
    // Const 0; Assert >= ; LengthOf; Assert < ; IndexOf; Return
    assert_eq!(f.body.len(), 6);
    assert!(matches!(f.body.get(0).code, Code::Const { .. }));
    assert!(matches!(
        &f.body.get(1).code,
        Code::Assert { op: Comparator::GtEq, .. }
    ));
    assert!(matches!(f.body.get(2).code, Code::LengthOf { .. }));
    assert!(matches!(
        &f.body.get(3).code,
        Code::Assert { op: Comparator::Lt, .. }
    ));
    assert!(matches!(f.body.get(4).code, Code::IndexOf { .. }));
}

#[test]
fn map_index_is_not_bounds_checked() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let nominals = NominalTable::new();

    let map_ty = pool.map(TypeId::STRING, TypeId::INT);
    let fty = pool.function(TypeId::INT, TypeId::VOID, &[map_ty, TypeId::STRING]);

    let mut body = CodeBlock::new(2);
    body.append(
        Code::IndexOf {
            ty: map_ty,
            target: Reg::from_raw(2),
            src: Reg::from_raw(0),
            index: Reg::from_raw(1),
        },
        attr(),
    );

    let module = module_of(
        &interner,
        vec![IrDecl::Function(function(interner.intern("lookup"), fty, body))],
    );
    let out = transform(&mut pool, &nominals, &module).unwrap();

    let IrDecl::Function(f) = &out.decls[0] else {
        panic!("expected function");
    };
    assert_eq!(f.body.len(), 1);
}

#[test]
fn division_gets_a_nonzero_check() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let nominals = NominalTable::new();

    let fty = pool.function(TypeId::INT, TypeId::VOID, &[TypeId::INT, TypeId::INT]);
    let mut body = CodeBlock::new(2);
    body.append(
        Code::BinArithOp {
            ty: TypeId::INT,
            kind: BinArithKind::Div,
            target: Reg::from_raw(2),
            lhs: Reg::from_raw(0),
            rhs: Reg::from_raw(1),
        },
        attr(),
    );

    let module = module_of(
        &interner,
        vec![IrDecl::Function(function(interner.intern("div"), fty, body))],
    );
    let out = transform(&mut pool, &nominals, &module).unwrap();

    let IrDecl::Function(f) = &out.decls[0] else {
        panic!("expected function");
    };
    assert_eq!(f.body.len(), 3);
    assert!(
        matches!(&f.body.get(0).code, Code::Const { value: Constant::Int(0), .. })
    );
    match &f.body.get(1).code {
        Code::Assert { op, lhs, msg, .. } => {
            assert_eq!(*op, Comparator::Neq);
            assert_eq!(*lhs, Reg::from_raw(1));
            assert_eq!(msg, "division by zero");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn invoke_splices_callee_precondition_with_renamed_registers() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let nominals = NominalTable::new();

    let callee_ty = pool.function(TypeId::INT, TypeId::VOID, &[TypeId::INT]);
    let caller_ty = pool.function(TypeId::INT, TypeId::VOID, &[TypeId::INT]);

    // Callee precondition: %0 >= 0 asserted via a temp at %1.
    let mut pre = CodeBlock::new(1);
    pre.append(
        Code::Const {
            target: Reg::from_raw(1),
            value: Constant::Int(0),
        },
        attr(),
    );
    pre.append(
        Code::Assert {
            ty: TypeId::INT,
            lhs: Reg::from_raw(0),
            rhs: Reg::from_raw(1),
            op: Comparator::GtEq,
            msg: "precondition not satisfied".to_owned(),
        },
        attr(),
    );

    let callee_name = interner.intern("callee");
    let mut callee = function(callee_name, callee_ty, CodeBlock::new(1));
    callee.precondition = Some(pre);

    // Caller invokes callee with operand %1.
    let mut body = CodeBlock::new(1);
    body.append(
        Code::Assign {
            ty: TypeId::INT,
            target: Reg::from_raw(1),
            operand: Reg::from_raw(0),
        },
        attr(),
    );
    let module_name = interner.intern("test");
    body.append(
        Code::Invoke {
            ty: callee_ty,
            target: Reg::from_raw(2),
            operands: [Reg::from_raw(1)].into_iter().collect(),
            name: QName::new(module_name, callee_name),
        },
        attr(),
    );
    let caller = function(interner.intern("caller"), caller_ty, body);

    let module = module_of(
        &interner,
        vec![IrDecl::Function(callee), IrDecl::Function(caller)],
    );
    let out = transform(&mut pool, &nominals, &module).unwrap();

    let IrDecl::Function(f) = &out.decls[1] else {
        panic!("expected function");
    };
    // Assign; spliced Const + Assert; Invoke.
    assert_eq!(f.body.len(), 4);
    match &f.body.get(2).code {
        Code::Assert { lhs, .. } => {
            // The precondition's formal %0 was bound to operand %1.
            assert_eq!(*lhs, Reg::from_raw(1));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(f.body.get(3).code, Code::Invoke { .. }));
}

#[test]
fn value_return_splices_postcondition_through_shadows() {
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let nominals = NominalTable::new();

    let fty = pool.function(TypeId::INT, TypeId::VOID, &[TypeId::INT]);

    // Postcondition: result (%0) >= parameter (%1), via temp at %2.
    let mut post = CodeBlock::new(2);
    post.append(
        Code::Assert {
            ty: TypeId::INT,
            lhs: Reg::from_raw(0),
            rhs: Reg::from_raw(1),
            op: Comparator::GtEq,
            msg: "postcondition not satisfied".to_owned(),
        },
        attr(),
    );

    // Body: %1 = %0 + %0; return %1. Uses registers 0..2.
    let mut body = CodeBlock::new(1);
    body.append(
        Code::BinArithOp {
            ty: TypeId::INT,
            kind: BinArithKind::Add,
            target: Reg::from_raw(1),
            lhs: Reg::from_raw(0),
            rhs: Reg::from_raw(0),
        },
        attr(),
    );
    body.append(
        Code::Return {
            ty: TypeId::INT,
            operand: Reg::from_raw(1),
        },
        attr(),
    );

    let mut f = function(interner.intern("double"), fty, body);
    f.postcondition = Some(post);
    let module = module_of(&interner, vec![IrDecl::Function(f)]);

    let source = module.clone();
    let out = RuntimeAssertions::new(&mut pool, &nominals, &source)
        .transform_module(&module)
        .unwrap();

    let IrDecl::Function(f) = &out.decls[0] else {
        panic!("expected function");
    };
    // Shadow assign; Add; spliced Assert; Return.
    assert_eq!(f.body.len(), 4);

    // Entry shadow: parameter %0 saved past the frame (at %2).
    match &f.body.get(0).code {
        Code::Assign { target, operand, .. } => {
            assert_eq!(*operand, Reg::from_raw(0));
            assert_eq!(*target, Reg::from_raw(2));
        }
        other => panic!("unexpected {other:?}"),
    }

    // Spliced postcondition: return slot bound to %1, parameter slot to
    // the shadow %2.
    match &f.body.get(2).code {
        Code::Assert { lhs, rhs, .. } => {
            assert_eq!(*lhs, Reg::from_raw(1));
            assert_eq!(*rhs, Reg::from_raw(2));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(f.body.get(3).code, Code::Return { .. }));
}
