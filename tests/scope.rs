use kea_lang::air::{ExprKind, StmtKind};
use test_utils::compile_source;

#[test]
fn shadowing_keeps_both_variables() {
    let compiled = compile_source(
        "fun f() -> int {\n\
           let x = 1;\n\
           if true {\n\
             let x = 2;\n\
             return x;\n\
           }\n\
           return 0;\n\
         }",
    );
    let module = compiled.assert_clean();
    let body = &module.functions[0].body;

    let StmtKind::VarDecl {
        var_id: outer_id, ..
    } = &body[0].kind
    else {
        panic!("expected outer declaration");
    };

    let StmtKind::If { then_branch, .. } = &body[1].kind else {
        panic!("expected if");
    };
    let StmtKind::VarDecl {
        var_id: inner_id, ..
    } = &then_branch[0].kind
    else {
        panic!("expected inner declaration");
    };

    assert_ne!(outer_id, inner_id, "shadowing must not reuse the VarId");

    // both variables exist in the symbol table
    assert!(compiled.compiler.symbols.lookup_variable(*outer_id).is_some());
    assert!(compiled.compiler.symbols.lookup_variable(*inner_id).is_some());

    // the reference inside the nested scope resolves to the inner variable
    let StmtKind::Return { value: Some(value) } = &then_branch[1].kind else {
        panic!("expected return in then-branch");
    };
    let ExprKind::VarRef { var_id, .. } = &value.kind else {
        panic!("expected variable reference");
    };
    assert_eq!(var_id, inner_id);
}

#[test]
fn same_scope_redeclaration_is_an_error() {
    let compiled = compile_source("fun f() -> void { let x = 1; let x = 2; }");

    assert!(compiled.module.is_none());
    let messages = compiled.error_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Duplicate variable declaration in same scope: 'x'"));
}

#[test]
fn sibling_scopes_may_reuse_a_name() {
    let compiled = compile_source(
        "fun f() -> void {\n\
           if true { let x = 1; } else { let x = 2; }\n\
         }",
    );
    compiled.assert_clean();
}

#[test]
fn parameters_share_the_body_scope() {
    let compiled = compile_source("fun f(x: int) -> void { let x = 1; }");

    // the body block is nested inside the parameter scope, so this is
    // shadowing, not a duplicate
    compiled.assert_clean();
}

#[test]
fn parameter_references_resolve_to_parameter_ids() {
    let compiled = compile_source("fun f(a: int, b: int) -> int { return b; }");
    let module = compiled.assert_clean();

    let function = &module.functions[0];
    let StmtKind::Return { value: Some(value) } = &function.body[0].kind else {
        panic!("expected return");
    };
    let ExprKind::VarRef { var_id, .. } = &value.kind else {
        panic!("expected variable reference");
    };
    assert_eq!(*var_id, function.params[1].var_id);
}
