use std::collections::HashMap;

use crate::intern::Name;

/// Signature and effect summary of one built-in instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinInstruction {
    pub name: &'static str,
    pub arguments: usize,
    pub returns: usize,
    /// No side effects and no dependence on state that side effects change.
    pub movable: bool,
}

const fn builtin(
    name: &'static str,
    arguments: usize,
    returns: usize,
    movable: bool,
) -> BuiltinInstruction {
    BuiltinInstruction {
        name,
        arguments,
        returns,
        movable,
    }
}

/// Single source of truth for the instructions of the host machine.
///
/// Reads of memory, storage, balances, code of other accounts, returndata,
/// gas, the program counter and the memory size are not movable: a side
/// effect elsewhere in the same expression can change their result.
pub const BUILTIN_INSTRUCTIONS: &[BuiltinInstruction] = &[
    builtin("stop", 0, 0, false),
    // Arithmetic
    builtin("add", 2, 1, true),
    builtin("mul", 2, 1, true),
    builtin("sub", 2, 1, true),
    builtin("div", 2, 1, true),
    builtin("sdiv", 2, 1, true),
    builtin("mod", 2, 1, true),
    builtin("smod", 2, 1, true),
    builtin("addmod", 3, 1, true),
    builtin("mulmod", 3, 1, true),
    builtin("exp", 2, 1, true),
    builtin("signextend", 2, 1, true),
    // Comparison and bitwise logic
    builtin("lt", 2, 1, true),
    builtin("gt", 2, 1, true),
    builtin("slt", 2, 1, true),
    builtin("sgt", 2, 1, true),
    builtin("eq", 2, 1, true),
    builtin("iszero", 1, 1, true),
    builtin("and", 2, 1, true),
    builtin("or", 2, 1, true),
    builtin("xor", 2, 1, true),
    builtin("not", 1, 1, true),
    builtin("byte", 2, 1, true),
    builtin("shl", 2, 1, true),
    builtin("shr", 2, 1, true),
    builtin("sar", 2, 1, true),
    builtin("keccak256", 2, 1, false),
    // Environment
    builtin("address", 0, 1, true),
    builtin("balance", 1, 1, false),
    builtin("origin", 0, 1, true),
    builtin("caller", 0, 1, true),
    builtin("callvalue", 0, 1, true),
    builtin("calldataload", 1, 1, true),
    builtin("calldatasize", 0, 1, true),
    builtin("calldatacopy", 3, 0, false),
    builtin("codesize", 0, 1, true),
    builtin("codecopy", 3, 0, false),
    builtin("gasprice", 0, 1, true),
    builtin("extcodesize", 1, 1, false),
    builtin("extcodecopy", 4, 0, false),
    builtin("extcodehash", 1, 1, false),
    builtin("returndatasize", 0, 1, false),
    builtin("returndatacopy", 3, 0, false),
    // Block information
    builtin("blockhash", 1, 1, true),
    builtin("coinbase", 0, 1, true),
    builtin("timestamp", 0, 1, true),
    builtin("number", 0, 1, true),
    builtin("difficulty", 0, 1, true),
    builtin("gaslimit", 0, 1, true),
    // Memory, storage and flow
    builtin("pop", 1, 0, false),
    builtin("mload", 1, 1, false),
    builtin("mstore", 2, 0, false),
    builtin("mstore8", 2, 0, false),
    builtin("sload", 1, 1, false),
    builtin("sstore", 2, 0, false),
    builtin("pc", 0, 1, false),
    builtin("msize", 0, 1, false),
    builtin("gas", 0, 1, false),
    // Logging
    builtin("log0", 2, 0, false),
    builtin("log1", 3, 0, false),
    builtin("log2", 4, 0, false),
    builtin("log3", 5, 0, false),
    builtin("log4", 6, 0, false),
    // System
    builtin("create", 3, 1, false),
    builtin("create2", 4, 1, false),
    builtin("call", 7, 1, false),
    builtin("callcode", 7, 1, false),
    builtin("delegatecall", 6, 1, false),
    builtin("staticcall", 6, 1, false),
    builtin("return", 2, 0, false),
    builtin("revert", 2, 0, false),
    builtin("selfdestruct", 1, 0, false),
    builtin("invalid", 0, 0, false),
];

/// Flavour of the language accepted by the parser and understood by the
/// passes.
#[derive(Debug, Clone)]
pub struct Dialect {
    /// Bindings and literals may carry a `:type` annotation.
    pub types: bool,
    /// Labels, stack assignments and bare instructions are parseable.
    pub stack_forms: bool,
    /// Type given to temporaries introduced by the optimiser.
    pub default_type: Option<Name>,
    builtins: HashMap<Name, BuiltinInstruction>,
}

impl Dialect {
    /// Typed dialect: `let a:u256 := 1:u256`, no stack forms.
    pub fn typed() -> Self {
        Self::with_flags(true, false, Some(Name::intern("u256")))
    }

    /// Untyped assembly which still admits the legacy stack forms.
    pub fn loose() -> Self {
        Self::with_flags(false, true, None)
    }

    fn with_flags(types: bool, stack_forms: bool, default_type: Option<Name>) -> Self {
        let builtins = BUILTIN_INSTRUCTIONS
            .iter()
            .map(|instr| (Name::intern(instr.name), *instr))
            .collect();
        Self {
            types,
            stack_forms,
            default_type,
            builtins,
        }
    }

    pub fn builtin(&self, name: Name) -> Option<&BuiltinInstruction> {
        self.builtins.get(&name)
    }

    pub fn is_builtin(&self, name: Name) -> bool {
        self.builtins.contains_key(&name)
    }
}
