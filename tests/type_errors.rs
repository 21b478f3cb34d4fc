use test_utils::compile_source;

#[test]
fn wrong_initializer_type() {
    let compiled = compile_source("fun f() -> void { let x: int = true; }");

    assert!(compiled.module.is_none());
    let messages = compiled.error_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0],
        "Type mismatch in variable initialization: expected 'int', got 'bool'"
    );
}

#[test]
fn diagnostics_are_rendered_with_location_and_summary() {
    let compiled = compile_source("fun f() -> void {\n  let x: int = true;\n}");

    let rendered = compiled.rendered_diagnostics();
    assert!(
        rendered.contains("main.kea:2:3: error: Type mismatch in variable initialization"),
        "{rendered}"
    );
    assert!(rendered.contains("1 error(s) generated."));
}

#[test]
fn error_type_suppresses_cascading_diagnostics() {
    // one undefined variable flows through an addition, an assignment and a
    // return check without producing further noise
    let compiled = compile_source(
        "fun f() -> int {\n\
           let mut y = missing + 1;\n\
           y = missing2;\n\
           return y;\n\
         }",
    );

    assert!(compiled.module.is_none());
    let messages = compiled.error_messages();
    assert_eq!(messages.len(), 2, "{messages:?}");
    assert!(messages[0].contains("Undefined variable 'missing'"));
    assert!(messages[1].contains("Undefined variable 'missing2'"));
}

#[test]
fn undefined_function_is_reported() {
    let compiled = compile_source("fun f() -> void { missing(); }");

    assert!(compiled.module.is_none());
    assert!(compiled.error_messages()[0].contains("Undefined function 'missing'"));
}

#[test]
fn call_argument_types_are_checked() {
    let compiled = compile_source(
        "fun g(a: int) -> int { return a; }\n\
         fun f() -> int { return g(true); }",
    );

    assert!(compiled.module.is_none());
    assert!(compiled.error_messages()[0]
        .contains("Type mismatch in function argument: expected 'int', got 'bool'"));
}

#[test]
fn assignment_type_is_checked() {
    let compiled = compile_source("fun f() -> void { let mut x = 1; x = 2.5; }");

    assert!(compiled.module.is_none());
    assert!(compiled.error_messages()[0]
        .contains("Type mismatch in assignment: expected 'int', got 'float'"));
}

#[test]
fn unknown_annotation_type_suggests_a_fix() {
    let compiled = compile_source("struct S { v: flaot }");

    assert!(compiled.module.is_none());
    let message = &compiled.error_messages()[0];
    assert!(message.contains("Unknown type 'flaot'"));
    assert!(message.contains("Did you mean 'float'?"));
}

#[test]
fn error_budget_caps_the_flood() {
    // 25 bad statements, each its own diagnostic; the engine stops at 20
    let mut source = String::from("fun f() -> void {\n");
    for index in 0..25 {
        source.push_str(&format!("  let x{index}: int = true;\n"));
    }
    source.push('}');

    let compiled = compile_source(&source);
    assert!(compiled.module.is_none());
    assert_eq!(compiled.error_count(), 20);
}
