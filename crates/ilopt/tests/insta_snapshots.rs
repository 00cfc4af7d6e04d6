#![cfg(feature = "insta")]

use ilopt::{disambiguate, full_inline};
use ilopt_core::{analyze, parse, print_block, Block, Dialect};

fn prepared(src: &str, dialect: &Dialect) -> (Block, ilopt_core::AnalysisInfo) {
    let (block, diags) = parse(src, dialect);
    assert!(diags.is_empty(), "parse errors: {diags:?}");
    let block = block.expect("block");
    let info = analyze(&block, dialect).expect("analysis");
    let block = disambiguate(&block, &info).expect("disambiguate");
    (block, info)
}

#[test]
fn snapshot_inlined_call_inside_builtins() {
    let (mut block, info) = prepared(
        "{ function f(a, b) -> c { c := add(a, b) } sstore(addmod(mload(0), f(mload(1), sload(2)), mload(3)), sload(4)) }",
        &Dialect::loose(),
    );
    full_inline(&mut block, &info).expect("inline");
    insta::assert_snapshot!(print_block(&block), @r"
{
    function f(a, b) -> c {
        c := add(a, b)
    }
    let sstore_arg := sload(4)
    let addmod_arg := mload(3)
    let f_b := sload(2)
    let f_a := mload(1)
    let f_c := 0
    {
        f_c := add(f_a, f_b)
    }
    sstore(addmod(mload(0), f_c, addmod_arg), sstore_arg)
}
");
}

#[test]
fn snapshot_disambiguated_switch() {
    let (block, _) = prepared(
        "{ { let a:u256 } { let a:u256 switch a case 0:u256 { let b:u256 := a } default { let b:u256 := a } } }",
        &Dialect::typed(),
    );
    insta::assert_snapshot!(print_block(&block), @r"
{
    {
        let a:u256
    }
    {
        let a_1:u256
        switch a_1
        case 0:u256 {
            let b:u256 := a_1
        }
        default {
            let b_1:u256 := a_1
        }
    }
}
");
}
