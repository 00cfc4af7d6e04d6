use ilopt::{
    dump_ast_json, optimise_source, read_settings, DialectKind, OptimiserError, OptimiserSettings,
    OptimiserStep,
};
use ilopt_core::{parse, print_block, Dialect};
use std::io::Write;

fn canonical(src: &str, dialect: &Dialect) -> String {
    let (block, diags) = parse(src, dialect);
    assert!(diags.is_empty(), "{diags:?}");
    print_block(&block.expect("block"))
}

#[test]
fn default_pipeline_disambiguates_then_inlines() {
    let out = optimise_source(
        "{ function f(a:u256) -> r:u256 { let t:u256 := mul(a, 2:u256) r := add(t, 1:u256) } { let t:u256 := f(3:u256) sstore(0:u256, t) } }",
        &OptimiserSettings::default(),
    )
    .expect("optimise");
    let expected = "{
        function f(a:u256) -> r:u256 { let t:u256 := mul(a, 2:u256) r := add(t, 1:u256) }
        {
            let f_a:u256 := 3:u256
            let t_1:u256 := 0:u256
            { let f_t:u256 := mul(f_a, 2:u256) t_1 := add(f_t, 1:u256) }
            sstore(0:u256, t_1)
        }
    }";
    assert_eq!(out, canonical(expected, &Dialect::typed()));
}

#[test]
fn disambiguate_only() {
    let settings = OptimiserSettings {
        dialect: DialectKind::Loose,
        steps: vec![OptimiserStep::Disambiguate],
        ..OptimiserSettings::default()
    };
    let out = optimise_source(
        "{ function f(a) -> r { r := a } { let a := f(1) } { let a := f(2) } }",
        &settings,
    )
    .expect("optimise");
    assert_eq!(
        out,
        canonical(
            "{ function f(a) -> r { r := a } { let a_1 := f(1) } { let a_2 := f(2) } }",
            &Dialect::loose()
        )
    );
}

#[test]
fn output_is_stable_under_reoptimisation() {
    let settings = OptimiserSettings {
        dialect: DialectKind::Loose,
        ..OptimiserSettings::default()
    };
    let src = "{ function f(a) -> r { r := add(a, 1) } sstore(0, f(f(2))) }";
    let once = optimise_source(src, &settings).expect("first run");
    let twice = optimise_source(&once, &settings).expect("second run");
    // The first run already expanded both calls.
    assert_eq!(once, twice);
}

#[test]
fn invalid_step_order_is_a_config_error() {
    let settings = OptimiserSettings {
        steps: vec![OptimiserStep::FullInline],
        ..OptimiserSettings::default()
    };
    assert!(matches!(
        optimise_source("{ }", &settings),
        Err(OptimiserError::Config(_))
    ));
}

#[test]
fn stack_forms_surface_as_illegal_construct() {
    let settings = OptimiserSettings {
        dialect: DialectKind::Loose,
        ..OptimiserSettings::default()
    };
    let err = optimise_source("{ let x := 1\n  pop }", &settings).expect_err("rejected");
    match err {
        OptimiserError::IllegalConstruct { construct, span } => {
            assert_eq!(construct, "bare instruction");
            assert_eq!((span.start.line, span.start.column), (2, 3));
        }
        other => panic!("expected IllegalConstruct, got {other:?}"),
    }
}

#[test]
fn settings_file_drives_the_pipeline() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "dialect = \"loose\"\nsteps = [\"disambiguate\"]\nexternal_identifiers = [\"host\"]"
    )
    .expect("write");
    let settings = read_settings(file.path()).expect("settings");
    let out = optimise_source("{ { let a := host } { let a := host } }", &settings).expect("optimise");
    assert_eq!(
        out,
        canonical("{ { let a := host } { let a_1 := host } }", &Dialect::loose())
    );
}

#[test]
fn json_dump_names_node_kinds() {
    let (block, _) = parse("{ let a := add(1, 2) }", &Dialect::loose());
    let json = dump_ast_json(&block.expect("block")).expect("json");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let decl = &value["statements"][0];
    assert_eq!(decl["statement"], "VariableDeclaration");
    assert_eq!(decl["variables"][0]["name"], "a");
    assert_eq!(decl["value"]["expression"], "FunctionalInstruction");
    assert_eq!(decl["value"]["instruction"], "add");
}
