#![cfg(feature = "proptest")]

use std::collections::{BTreeMap, HashMap, HashSet};

use ilopt::{
    disambiguate, optimise_source, run_steps, DialectKind, OptimiserSettings, OptimiserStep,
};
use ilopt_core::{
    analyze, parse, print_block, Block, Dialect, Expression, ForLoop, FunctionDefinition, Literal,
    Name, Statement,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Program generator
// ---------------------------------------------------------------------------

/// Byte stream driving the generator; an exhausted stream reads as zeros.
struct Recipe<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Recipe<'_> {
    fn pick(&mut self, n: usize) -> usize {
        let byte = self.bytes.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        usize::from(byte) % n
    }
}

#[derive(Clone)]
struct Callee {
    name: String,
    params: usize,
}

#[derive(Default)]
struct Scope {
    readable: Vec<String>,
    assignable: Vec<String>,
    callees: Vec<Callee>,
}

/// Builds programs that pass analysis: every local gets a fresh name within
/// its function, so nothing shadows, while the same names recur across
/// functions and the main block.
struct Generator<'a> {
    recipe: Recipe<'a>,
    fresh: usize,
}

impl Generator<'_> {
    fn fresh(&mut self, stem: &str) -> String {
        let name = format!("{stem}{}", self.fresh);
        self.fresh += 1;
        name
    }

    fn expression(&mut self, scope: &Scope, depth: usize) -> String {
        let choices = if depth >= 2 { 2 } else { 6 };
        match self.recipe.pick(choices) {
            0 => self.recipe.pick(5).to_string(),
            1 => match scope.readable.len() {
                0 => "7".to_string(),
                n => scope.readable[self.recipe.pick(n)].clone(),
            },
            2 => {
                let lhs = self.expression(scope, depth + 1);
                let rhs = self.expression(scope, depth + 1);
                format!("add({lhs}, {rhs})")
            }
            3 => format!("mload({})", self.recipe.pick(4) * 32),
            4 => format!("sload({})", self.recipe.pick(4)),
            _ => match scope.callees.len() {
                0 => format!("calldataload({})", self.recipe.pick(4)),
                n => {
                    let callee = scope.callees[self.recipe.pick(n)].clone();
                    let args: Vec<String> = (0..callee.params)
                        .map(|_| self.expression(scope, depth + 1))
                        .collect();
                    format!("{}({})", callee.name, args.join(", "))
                }
            },
        }
    }

    fn statements(&mut self, scope: &mut Scope, depth: usize, out: &mut String) {
        for _ in 0..self.recipe.pick(4) {
            self.statement(scope, depth, out);
            out.push(' ');
        }
    }

    fn block(&mut self, scope: &mut Scope, depth: usize, out: &mut String) {
        let readable = scope.readable.len();
        let assignable = scope.assignable.len();
        out.push_str("{ ");
        self.statements(scope, depth, out);
        out.push('}');
        scope.readable.truncate(readable);
        scope.assignable.truncate(assignable);
    }

    fn statement(&mut self, scope: &mut Scope, depth: usize, out: &mut String) {
        let choices = if depth >= 2 { 5 } else { 8 };
        match self.recipe.pick(choices) {
            0 => {
                let value = self.expression(scope, 0);
                let name = self.fresh("t");
                out.push_str(&format!("let {name} := {value}"));
                scope.readable.push(name.clone());
                scope.assignable.push(name);
            }
            1 => {
                let value = self.expression(scope, 0);
                out.push_str(&format!("sstore({}, {value})", self.recipe.pick(4)));
            }
            2 => {
                let value = self.expression(scope, 0);
                out.push_str(&format!("mstore({}, {value})", self.recipe.pick(4) * 32));
            }
            3 if !scope.assignable.is_empty() => {
                let target = scope.assignable[self.recipe.pick(scope.assignable.len())].clone();
                let value = self.expression(scope, 0);
                out.push_str(&format!("{target} := {value}"));
            }
            3 | 4 => {
                let value = self.expression(scope, 0);
                out.push_str(&format!("pop({value})"));
            }
            5 => {
                let condition = self.expression(scope, 0);
                out.push_str(&format!("if {condition} "));
                self.block(scope, depth + 1, out);
            }
            6 => {
                let discriminant = self.expression(scope, 0);
                out.push_str(&format!("switch {discriminant} case 0 "));
                self.block(scope, depth + 1, out);
                out.push_str(" default ");
                self.block(scope, depth + 1, out);
            }
            _ => {
                let counter = self.fresh("i");
                out.push_str(&format!(
                    "for {{ let {counter} := 0 }} lt({counter}, 2) {{ {counter} := add({counter}, 1) }} "
                ));
                // Readable only, so the body cannot keep the loop alive.
                scope.readable.push(counter);
                self.block(scope, depth + 1, out);
                scope.readable.pop();
            }
        }
    }
}

/// Up to three functions followed by a main part. A function either calls
/// earlier functions or itself behind a bounded guard.
fn generate(bytes: &[u8]) -> String {
    let mut generator = Generator {
        recipe: Recipe { bytes, pos: 0 },
        fresh: 0,
    };
    let mut out = String::from("{ ");
    let mut callees = Vec::new();
    for index in 0..generator.recipe.pick(4) {
        generator.fresh = 0;
        let name = format!("f{index}");
        let params = generator.recipe.pick(3);
        let param_names: Vec<String> = ["a", "b"][..params].iter().map(|s| s.to_string()).collect();
        let locals: Vec<String> = param_names.iter().cloned().chain(["r".to_string()]).collect();
        let recursive = params > 0 && generator.recipe.pick(3) == 0;
        let mut scope = Scope {
            readable: locals.clone(),
            assignable: locals,
            // A recursive body calls only itself, so every other call can be
            // expanded away in a bounded number of rounds.
            callees: if recursive { Vec::new() } else { callees.clone() },
        };
        out.push_str(&format!("function {name}({}) -> r {{ ", param_names.join(", ")));
        if recursive {
            let rest = ", 0".repeat(params - 1);
            out.push_str(&format!("if lt(a, 3) {{ r := {name}(add(a, 1){rest}) }} "));
        }
        generator.statements(&mut scope, 0, &mut out);
        out.push_str("} ");
        callees.push(Callee { name, params });
    }
    generator.fresh = 0;
    let mut scope = Scope {
        callees,
        ..Scope::default()
    };
    generator.statements(&mut scope, 0, &mut out);
    out.push('}');
    out
}

fn program_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 0..256).prop_map(|bytes| generate(&bytes))
}

// ---------------------------------------------------------------------------
// Reference interpreter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Effect {
    Sstore(u64, u64),
    Mstore(u64, u64),
    Sload(u64),
    Mload(u64),
}

/// Observable behaviour of a run: effects in order, then the final storage.
type Outcome = (Vec<Effect>, BTreeMap<u64, u64>);

type Frame = Vec<HashMap<Name, u64>>;

/// Evaluates arguments right to left, like the optimiser assumes. Returns
/// `None` once the step budget is spent.
struct Machine<'a> {
    functions: HashMap<Name, &'a FunctionDefinition>,
    storage: BTreeMap<u64, u64>,
    memory: HashMap<u64, u64>,
    trace: Vec<Effect>,
    fuel: usize,
}

fn collect_definitions<'a>(block: &'a Block, out: &mut HashMap<Name, &'a FunctionDefinition>) {
    for statement in &block.statements {
        match statement {
            Statement::FunctionDefinition(def) => {
                out.insert(def.name, def);
                collect_definitions(&def.body, out);
            }
            Statement::If(if_stmt) => collect_definitions(&if_stmt.body, out),
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    collect_definitions(&case.body, out);
                }
            }
            Statement::ForLoop(for_loop) => {
                collect_definitions(&for_loop.pre, out);
                collect_definitions(&for_loop.post, out);
                collect_definitions(&for_loop.body, out);
            }
            Statement::Block(inner) => collect_definitions(inner, out),
            _ => {}
        }
    }
}

fn literal_value(literal: &Literal) -> u64 {
    literal.value.parse().expect("small decimal literal")
}

fn lookup(frame: &Frame, name: Name) -> Option<u64> {
    frame.iter().rev().find_map(|scope| scope.get(&name).copied())
}

fn assign(frame: &mut Frame, name: Name, value: u64) -> Option<()> {
    let scope = frame.iter_mut().rev().find(|scope| scope.contains_key(&name))?;
    scope.insert(name, value);
    Some(())
}

impl<'a> Machine<'a> {
    fn run(root: &'a Block, fuel: usize) -> Option<Outcome> {
        let mut functions = HashMap::new();
        collect_definitions(root, &mut functions);
        let mut machine = Machine {
            functions,
            storage: BTreeMap::new(),
            memory: HashMap::new(),
            trace: Vec::new(),
            fuel,
        };
        machine.block(&mut Vec::new(), root)?;
        Some((machine.trace, machine.storage))
    }

    fn burn(&mut self) -> Option<()> {
        self.fuel = self.fuel.checked_sub(1)?;
        Some(())
    }

    fn block(&mut self, frame: &mut Frame, block: &'a Block) -> Option<()> {
        frame.push(HashMap::new());
        let result = self.statements(frame, &block.statements);
        frame.pop();
        result
    }

    fn statements(&mut self, frame: &mut Frame, statements: &'a [Statement]) -> Option<()> {
        for statement in statements {
            self.statement(frame, statement)?;
        }
        Some(())
    }

    fn statement(&mut self, frame: &mut Frame, statement: &'a Statement) -> Option<()> {
        self.burn()?;
        match statement {
            Statement::Expression(expr) => {
                self.evaluate(frame, expr)?;
            }
            Statement::VariableDeclaration(decl) => {
                let values = match &decl.value {
                    Some(value) => self.evaluate(frame, value)?,
                    None => vec![0; decl.variables.len()],
                };
                let scope = frame.last_mut()?;
                for (variable, value) in decl.variables.iter().zip(values) {
                    scope.insert(variable.name, value);
                }
            }
            Statement::Assignment(assignment) => {
                let values = self.evaluate(frame, &assignment.value)?;
                for (target, value) in assignment.variable_names.iter().zip(values) {
                    assign(frame, target.name, value)?;
                }
            }
            Statement::If(if_stmt) => {
                if self.value(frame, &if_stmt.condition)? != 0 {
                    self.block(frame, &if_stmt.body)?;
                }
            }
            Statement::Switch(switch) => {
                let value = self.value(frame, &switch.expression)?;
                let chosen = switch
                    .cases
                    .iter()
                    .find(|case| case.value.as_ref().is_some_and(|lit| literal_value(lit) == value))
                    .or_else(|| switch.cases.iter().find(|case| case.value.is_none()));
                if let Some(case) = chosen {
                    self.block(frame, &case.body)?;
                }
            }
            Statement::ForLoop(for_loop) => {
                frame.push(HashMap::new());
                let result = self.for_loop(frame, for_loop);
                frame.pop();
                result?;
            }
            Statement::FunctionDefinition(_) => {}
            Statement::Block(block) => self.block(frame, block)?,
            Statement::Label(_) | Statement::StackAssignment(_) | Statement::Instruction(_) => {
                return None
            }
        }
        Some(())
    }

    fn for_loop(&mut self, frame: &mut Frame, for_loop: &'a ForLoop) -> Option<()> {
        self.statements(frame, &for_loop.pre.statements)?;
        while self.value(frame, &for_loop.condition)? != 0 {
            self.block(frame, &for_loop.body)?;
            self.block(frame, &for_loop.post)?;
        }
        Some(())
    }

    fn value(&mut self, frame: &mut Frame, expr: &'a Expression) -> Option<u64> {
        match self.evaluate(frame, expr)?.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    fn arguments(&mut self, frame: &mut Frame, arguments: &'a [Expression]) -> Option<Vec<u64>> {
        let mut values = vec![0; arguments.len()];
        for (index, argument) in arguments.iter().enumerate().rev() {
            values[index] = self.value(frame, argument)?;
        }
        Some(values)
    }

    fn evaluate(&mut self, frame: &mut Frame, expr: &'a Expression) -> Option<Vec<u64>> {
        self.burn()?;
        match expr {
            Expression::Literal(literal) => Some(vec![literal_value(literal)]),
            Expression::Identifier(ident) => Some(vec![lookup(frame, ident.name)?]),
            Expression::FunctionCall(call) => {
                let args = self.arguments(frame, &call.arguments)?;
                let def = *self.functions.get(&call.function_name.name)?;
                let mut scope = HashMap::new();
                for (param, value) in def.parameters.iter().zip(args) {
                    scope.insert(param.name, value);
                }
                for ret in &def.return_variables {
                    scope.insert(ret.name, 0);
                }
                let mut callee_frame = vec![scope];
                self.block(&mut callee_frame, &def.body)?;
                def.return_variables
                    .iter()
                    .map(|ret| lookup(&callee_frame, ret.name))
                    .collect()
            }
            Expression::FunctionalInstruction(instr) => {
                let args = self.arguments(frame, &instr.arguments)?;
                self.builtin(instr.instruction.as_str(), &args)
            }
        }
    }

    fn builtin(&mut self, name: &str, args: &[u64]) -> Option<Vec<u64>> {
        Some(match (name, args) {
            ("add", [a, b]) => vec![a.wrapping_add(*b)],
            ("lt", [a, b]) => vec![u64::from(a < b)],
            ("calldataload", [offset]) => vec![offset.wrapping_mul(7).wrapping_add(3)],
            ("pop", [_]) => Vec::new(),
            ("mload", [key]) => {
                self.trace.push(Effect::Mload(*key));
                vec![self.memory.get(key).copied().unwrap_or(0)]
            }
            ("sload", [key]) => {
                self.trace.push(Effect::Sload(*key));
                vec![self.storage.get(key).copied().unwrap_or(0)]
            }
            ("mstore", [key, value]) => {
                self.trace.push(Effect::Mstore(*key, *value));
                self.memory.insert(*key, *value);
                Vec::new()
            }
            ("sstore", [key, value]) => {
                self.trace.push(Effect::Sstore(*key, *value));
                self.storage.insert(*key, *value);
                Vec::new()
            }
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Tree walkers
// ---------------------------------------------------------------------------

fn binding_names(block: &Block, out: &mut Vec<Name>) {
    for statement in &block.statements {
        match statement {
            Statement::VariableDeclaration(decl) => {
                out.extend(decl.variables.iter().map(|v| v.name))
            }
            Statement::FunctionDefinition(def) => {
                out.push(def.name);
                out.extend(def.parameters.iter().map(|p| p.name));
                out.extend(def.return_variables.iter().map(|r| r.name));
                binding_names(&def.body, out);
            }
            Statement::If(if_stmt) => binding_names(&if_stmt.body, out),
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    binding_names(&case.body, out);
                }
            }
            Statement::ForLoop(for_loop) => {
                binding_names(&for_loop.pre, out);
                binding_names(&for_loop.post, out);
                binding_names(&for_loop.body, out);
            }
            Statement::Block(inner) => binding_names(inner, out),
            _ => {}
        }
    }
}

/// Every user function call, with the functions whose definitions enclose it.
struct CallSites {
    stack: Vec<Name>,
    calls: Vec<(Name, Vec<Name>)>,
}

impl CallSites {
    fn of(block: &Block) -> Vec<(Name, Vec<Name>)> {
        let mut sites = CallSites {
            stack: Vec::new(),
            calls: Vec::new(),
        };
        sites.block(block);
        sites.calls
    }

    fn block(&mut self, block: &Block) {
        for statement in &block.statements {
            self.statement(statement);
        }
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Expression(expr) => self.expression(expr),
            Statement::VariableDeclaration(decl) => {
                if let Some(value) = &decl.value {
                    self.expression(value);
                }
            }
            Statement::Assignment(assignment) => self.expression(&assignment.value),
            Statement::If(if_stmt) => {
                self.expression(&if_stmt.condition);
                self.block(&if_stmt.body);
            }
            Statement::Switch(switch) => {
                self.expression(&switch.expression);
                for case in &switch.cases {
                    self.block(&case.body);
                }
            }
            Statement::ForLoop(for_loop) => {
                self.block(&for_loop.pre);
                self.expression(&for_loop.condition);
                self.block(&for_loop.post);
                self.block(&for_loop.body);
            }
            Statement::FunctionDefinition(def) => {
                self.stack.push(def.name);
                self.block(&def.body);
                self.stack.pop();
            }
            Statement::Block(inner) => self.block(inner),
            _ => {}
        }
    }

    fn expression(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal(_) | Expression::Identifier(_) => {}
            Expression::FunctionCall(call) => {
                self.calls
                    .push((call.function_name.name, self.stack.clone()));
                call.arguments.iter().for_each(|arg| self.expression(arg));
            }
            Expression::FunctionalInstruction(instr) => {
                instr.arguments.iter().for_each(|arg| self.expression(arg));
            }
        }
    }
}

fn parse_ok(src: &str) -> Block {
    let (block, diags) = parse(src, &Dialect::loose());
    assert!(diags.is_empty(), "{src}: {diags:?}");
    block.expect("block")
}

fn disambiguated(src: &str) -> Block {
    let block = parse_ok(src);
    let info = analyze(&block, &Dialect::loose()).expect("analysis");
    disambiguate(&block, &info).expect("disambiguate")
}

/// Disambiguates, then inlines `rounds` times.
fn inlined(src: &str, rounds: usize) -> Block {
    let mut block = parse_ok(src);
    let info = analyze(&block, &Dialect::loose()).expect("analysis");
    let mut steps = vec![OptimiserStep::Disambiguate];
    steps.extend(std::iter::repeat(OptimiserStep::FullInline).take(rounds));
    run_steps(&mut block, &info, &steps).expect("optimise");
    block
}

proptest! {
    #[test]
    fn parser_never_panics_on_arbitrary_text(
        input in prop::collection::vec(any::<char>(), 0..1024)
            .prop_map(|chars| chars.into_iter().collect::<String>())
    ) {
        let _ = parse(&input, &Dialect::typed());
        let _ = parse(&input, &Dialect::loose());
    }

    #[test]
    fn optimiser_never_panics_on_arbitrary_text(
        input in prop::collection::vec(any::<char>(), 0..512)
            .prop_map(|chars| chars.into_iter().collect::<String>())
    ) {
        let settings = OptimiserSettings {
            dialect: DialectKind::Loose,
            ..OptimiserSettings::default()
        };
        let _ = optimise_source(&input, &settings);
    }

    #[test]
    fn generated_programs_are_valid(program in program_strategy()) {
        let block = parse_ok(&program);
        prop_assert!(analyze(&block, &Dialect::loose()).is_ok(), "{}", program);
    }

    #[test]
    fn disambiguation_is_idempotent(program in program_strategy()) {
        let once = print_block(&disambiguated(&program));
        let twice = print_block(&disambiguated(&once));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn disambiguated_bindings_are_unique(program in program_strategy()) {
        let mut before = Vec::new();
        binding_names(&parse_ok(&program), &mut before);

        let result = disambiguated(&program);
        let mut after = Vec::new();
        binding_names(&result, &mut after);

        prop_assert_eq!(before.len(), after.len());
        let distinct: HashSet<&Name> = after.iter().collect();
        prop_assert_eq!(distinct.len(), after.len(), "{}", print_block(&result));
    }

    #[test]
    fn inlining_preserves_effect_order(program in program_strategy()) {
        let original = parse_ok(&program);
        let expected = Machine::run(&original, 20_000);
        prop_assume!(expected.is_some());

        for rounds in 1..=2 {
            let block = inlined(&program, rounds);
            let actual = Machine::run(&block, 2_000_000);
            prop_assert_eq!(&actual, &expected, "{}", print_block(&block));
        }
    }

    #[test]
    fn only_recursive_calls_survive_inlining(program in program_strategy()) {
        let original = parse_ok(&program);
        let recursive: HashSet<Name> = CallSites::of(&original)
            .into_iter()
            .filter(|(callee, stack)| stack.contains(callee))
            .map(|(callee, _)| callee)
            .collect();
        let functions = original
            .statements
            .iter()
            .filter(|s| matches!(s, Statement::FunctionDefinition(_)))
            .count();

        let block = inlined(&program, functions + 1);
        for (callee, stack) in CallSites::of(&block) {
            prop_assert!(
                stack.contains(&callee) || recursive.contains(&callee),
                "call to `{}` left in {}",
                callee,
                print_block(&block)
            );
        }
        if recursive.is_empty() {
            prop_assert!(CallSites::of(&block).is_empty(), "{}", print_block(&block));
        }
    }
}
