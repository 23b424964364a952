mod common;

use common::*;
use jcfa_core::BuildConfig;
use jcfa_error::{error::CompileError, warning::Warning};
use jcfa_ir::{printer, prune_unreachable, NodeKind};
use jcfa_types::{BinaryOperator, Fixity, JType};
use pretty_assertions::assert_eq;

fn helpers() -> Vec<jcfa_ast::MethodDeclaration> {
    vec![
        static_method("f", vec![], JType::int(), vec![ret(Some(int("1")))]),
        static_method("g", vec![], JType::int(), vec![ret(Some(int("2")))]),
    ]
}

fn main_class(mut methods: Vec<jcfa_ast::MethodDeclaration>) -> Vec<jcfa_ast::TypeDeclaration> {
    methods.extend(helpers());
    vec![class("Main", None, methods)]
}

#[test]
fn short_circuit_condition_branches_once_per_operand() {
    // if (a && b) { x = f(); } else { x = g(); }
    let run = static_method(
        "run",
        vec![param("a", JType::boolean()), param("b", JType::boolean())],
        JType::Void,
        vec![
            declare("x", JType::int(), None),
            if_else(
                and(bool_var("a"), bool_var("b")),
                block_stmt(vec![eval(assign(
                    int_var("x"),
                    static_call("Main", "f", JType::int()),
                ))]),
                Some(block_stmt(vec![eval(assign(
                    int_var("x"),
                    static_call("Main", "g", JType::int()),
                ))])),
            ),
        ],
    );
    let compiled = compile_all("Main.run", main_class(vec![run]));
    let program = compiled.program();
    let context = &program.context;
    let run = function(program, "Main.run(boolean,boolean)");

    let assumes = run
        .edges(context)
        .into_iter()
        .filter(|edge| edge.is_assume(context))
        .count();
    assert_eq!(assumes, 4);

    let texts = edge_texts(context, &run);
    for text in ["int x;", "[a]", "[!(a)]", "[b]", "[!(b)]", "x = Main.f();", "x = Main.g();"] {
        assert!(texts.contains(&text.to_string()), "missing `{text}` in {texts:?}");
    }

    // Both failing operands lead to the else branch.
    let else_node = target_of(context, &run, "[!(a)]");
    assert_eq!(target_of(context, &run, "[!(b)]"), else_node);
    assert_eq!(else_node.num_entering_edges(context), 2);

    // The branches meet in a single node which falls through to the exit.
    let exit = run.get_exit(context);
    let [join] = exit.predecessors(context)[..] else {
        panic!("exit should have one predecessor");
    };
    assert_eq!(join.num_entering_edges(context), 2);
}

#[test]
fn for_without_condition_never_branches() {
    let spin = static_method(
        "spin",
        vec![],
        JType::Void,
        vec![for_loop(vec![], None, vec![], block_stmt(vec![]))],
    );
    let compiled = compile_all("Main.spin", main_class(vec![spin]));
    let program = compiled.program();
    let context = &program.context;
    let spin = function(program, "Main.spin()");

    assert!(!spin.edges(context).iter().any(|edge| edge.is_assume(context)));
    assert_eq!(spin.get_exit(context).num_entering_edges(context), 0);

    let head = spin.get_entry(context).successors(context)[0];
    assert!(head.is_loop_start(context));
    let mut texts = edge_texts(context, &spin);
    texts.sort();
    assert_eq!(texts, vec!["", "", "", "for"]);
}

#[test]
fn array_length_is_read_without_a_temporary() {
    let len = static_method(
        "len",
        vec![param("arr", JType::array_of(JType::int()))],
        JType::int(),
        vec![ret(Some(length_of(local("arr", JType::array_of(JType::int())))))],
    );
    let compiled = compile_all("Main.len", main_class(vec![len]));
    let program = compiled.program();
    let len = function(program, "Main.len(int[])");

    let expected = "function Main.len(int[]) {
    N1 (entry):
        -> N2: return arr.length;
    N2 (exit):
}
";
    assert_eq!(printer::function_to_string(&program.context, &len), expected);
}

#[test]
fn switch_cases_fall_through_until_break() {
    // switch (k) { case 1: y = 1; case 2: y = 2; break; default: y = 3; }
    let sw = static_method(
        "sw",
        vec![param("k", JType::int())],
        JType::Void,
        vec![
            declare("y", JType::int(), Some(int("0"))),
            switch(
                int_var("k"),
                vec![
                    (Some(int("1")), vec![eval(assign(int_var("y"), int("1")))]),
                    (
                        Some(int("2")),
                        vec![eval(assign(int_var("y"), int("2"))), break_to(None)],
                    ),
                    (None, vec![eval(assign(int_var("y"), int("3")))]),
                ],
            ),
        ],
    );
    let compiled = compile_all("Main.sw", main_class(vec![sw]));
    let program = compiled.program();
    let context = &program.context;
    let sw = function(program, "Main.sw(int)");

    assert_eq!(
        straight_line(context, &sw),
        vec!["int y = 0;", "int __tmp_0 = k;"]
    );

    let second_case = target_of(context, &sw, "[__tmp_0 == 2]");
    assert_eq!(target_of(context, &sw, "fall through"), second_case);
    assert_eq!(second_case.num_entering_edges(context), 2);

    let default_case = target_of(context, &sw, "default");
    assert_eq!(default_case.num_entering_edges(context), 1);
    assert_eq!(
        default_case.leaving_edges(context)[0]
            .get_kind(context)
            .to_string(),
        "y = 3;"
    );

    let exit = sw.get_exit(context);
    let after_switch = exit.predecessors(context)[0];
    let mut entering = after_switch
        .entering_edges(context)
        .iter()
        .map(|edge| edge.get_kind(context).to_string())
        .collect::<Vec<_>>();
    entering.sort();
    assert_eq!(entering, vec!["", "break"]);
}

#[test]
fn labeled_break_leaves_the_outer_loop() {
    // out: while (c) { while (d) { break out; } }
    let lab = static_method(
        "lab",
        vec![param("c", JType::boolean()), param("d", JType::boolean())],
        JType::Void,
        vec![labeled(
            "out",
            while_loop(
                bool_var("c"),
                block_stmt(vec![while_loop(
                    bool_var("d"),
                    block_stmt(vec![break_to(Some("out"))]),
                )]),
            ),
        )],
    );
    let compiled = compile_all("Main.lab", main_class(vec![lab]));
    let program = compiled.program();
    let context = &program.context;
    let lab = function(program, "Main.lab(boolean,boolean)");

    let labels = nodes_of_kind(context, &lab, &NodeKind::Label("out".to_string()));
    assert_eq!(labels.len(), 1);
    let mut entering = labels[0]
        .entering_edges(context)
        .iter()
        .map(|edge| edge.get_kind(context).to_string())
        .collect::<Vec<_>>();
    entering.sort();
    assert_eq!(entering, vec!["", "break"]);
}

#[test]
fn labeled_continue_runs_the_loop_update() {
    // outer: for (int i = 0; i < n; i++) { while (d) { continue outer; } }
    let cont = static_method(
        "cont",
        vec![param("n", JType::int()), param("d", JType::boolean())],
        JType::Void,
        vec![labeled(
            "outer",
            for_loop(
                vec![declare("i", JType::int(), Some(int("0")))],
                Some(less(int_var("i"), int_var("n"))),
                vec![increment(int_var("i"), Fixity::Postfix)],
                block_stmt(vec![while_loop(
                    bool_var("d"),
                    block_stmt(vec![continue_to(Some("outer"))]),
                )]),
            ),
        )],
    );
    let compiled = compile_all("Main.cont", main_class(vec![cont]));
    let program = compiled.program();
    let context = &program.context;
    let cont = function(program, "Main.cont(int,boolean)");

    let update = target_of(context, &cont, "continue");
    let [edge] = update.leaving_edges(context) else {
        panic!("the update node should not branch");
    };
    assert_eq!(edge.get_kind(context).to_string(), "i = i + 1;");
    assert!(edge_texts(context, &cont).contains(&"[i < n]".to_string()));
}

#[test]
fn misplaced_jumps_are_reported_for_every_function() {
    let methods = vec![
        static_method("m1", vec![], JType::Void, vec![break_to(None)]),
        static_method(
            "m2",
            vec![],
            JType::Void,
            vec![labeled("l", block_stmt(vec![continue_to(Some("l"))]))],
        ),
        static_method(
            "m3",
            vec![param("c", JType::boolean())],
            JType::Void,
            vec![while_loop(
                bool_var("c"),
                block_stmt(vec![break_to(Some("missing"))]),
            )],
        ),
    ];
    let compiled = compile_all("Main.m1", main_class(methods));
    assert!(compiled.result.is_err());

    let causes = compiled.root_causes();
    assert_eq!(causes.len(), 3);
    assert!(matches!(causes[0], CompileError::BreakOutsideLoop { .. }));
    assert!(matches!(
        causes[1],
        CompileError::ContinueToNonLoopLabel { label, .. } if label == "l"
    ));
    assert!(matches!(
        causes[2],
        CompileError::UnknownLabel { label, .. } if label == "missing"
    ));
    // The failing statement is named in the error.
    assert!(matches!(compiled.errors[0], CompileError::InStatement { .. }));
}

#[test]
fn code_after_return_is_dropped_with_a_warning() {
    let dead = static_method(
        "dead",
        vec![],
        JType::Void,
        vec![ret(None), eval(static_call("Main", "f", JType::int()))],
    );
    let compiled = compile_all("Main.dead", main_class(vec![dead]));
    assert!(compiled
        .warnings
        .iter()
        .any(|warning| warning.warning_content == Warning::UnreachableCode));

    let mut program = match compiled.result {
        Ok(program) => program,
        Err(_) => panic!("compilation failed: {:?}", compiled.errors),
    };
    let dead = function(&program, "Main.dead()");
    assert_eq!(edge_texts(&program.context, &dead), vec!["return;"]);

    // Every CFA is already free of unreachable nodes.
    let functions = program.context.functions().collect::<Vec<_>>();
    for function in functions {
        assert_eq!(prune_unreachable(&mut program.context, &function).unwrap(), 0);
    }
}

#[test]
fn asserts_branch_to_a_failure_node() {
    let chk = static_method(
        "chk",
        vec![param("c", JType::boolean())],
        JType::Void,
        vec![assert_that(bool_var("c"))],
    );
    let types = main_class(vec![chk]);

    let compiled = compile_all("Main.chk", types.clone());
    let program = compiled.program();
    let context = &program.context;
    let chk = function(program, "Main.chk(boolean)");
    let failures = nodes_of_kind(context, &chk, &NodeKind::AssertionFailure);
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].entering_edges(context)[0]
            .get_kind(context)
            .to_string(),
        "[!(c)]"
    );
    assert!(failures[0].leaving_edges(context).is_empty());

    let config = BuildConfig::for_entry_function("Main.chk").lower_asserts(false);
    let compiled = compile(&config, types);
    let program = compiled.program();
    let chk = function(program, "Main.chk(boolean)");
    assert_eq!(
        straight_line(&program.context, &chk),
        vec!["default return"]
    );
}

#[test]
fn for_each_over_an_array_walks_the_indices() {
    // int s = 0; for (int v : arr) { s += v; } return s;
    let arr = JType::array_of(JType::int());
    let sum = static_method(
        "sum",
        vec![param("arr", arr.clone())],
        JType::int(),
        vec![
            declare("s", JType::int(), Some(int("0"))),
            for_each(
                "v",
                JType::int(),
                local("arr", arr),
                block_stmt(vec![eval(compound(
                    BinaryOperator::Add,
                    int_var("s"),
                    int_var("v"),
                ))]),
            ),
            ret(Some(int_var("s"))),
        ],
    );
    let compiled = compile_all("Main.sum", main_class(vec![sum]));
    let program = compiled.program();
    let context = &program.context;
    let sum = function(program, "Main.sum(int[])");

    assert_eq!(
        straight_line(context, &sum),
        vec!["int s = 0;", "int[] __tmp_0 = arr;", "int __tmp_1 = 0;", "for"]
    );
    let body = target_of(context, &sum, "[__tmp_1 < __tmp_0.length]");
    assert_eq!(
        straight_line_from(context, body),
        vec![
            "int v = __tmp_0[__tmp_1];",
            "s = s + v;",
            "",
            "__tmp_1 = __tmp_1 + 1;",
            ""
        ]
    );
    let after = target_of(context, &sum, "[!(__tmp_1 < __tmp_0.length)]");
    assert_eq!(straight_line_from(context, after), vec!["return s;"]);
}

#[test]
fn for_each_over_an_iterable_calls_the_iterator() {
    let list = class_type("java.util.List");
    let items = static_method(
        "items",
        vec![param("list", list.clone())],
        JType::Void,
        vec![for_each(
            "o",
            JType::object(),
            local("list", list),
            block_stmt(vec![]),
        )],
    );
    let compiled = compile_all("Main.items", main_class(vec![items]));
    let program = compiled.program();
    let items = function(program, "Main.items(java.util.List)");

    let texts = edge_texts(&program.context, &items);
    for text in [
        "__tmp_0 = list.iterator();",
        "__tmp_1 = __tmp_0.hasNext();",
        "[__tmp_1]",
        "o = __tmp_0.next();",
    ] {
        assert!(texts.contains(&text.to_string()), "missing `{text}` in {texts:?}");
    }
    for name in ["java.util.List", "java.util.Iterator"] {
        assert!(program
            .pending_types
            .iter()
            .any(|pending| pending.as_str() == name));
    }
}

#[test]
fn do_while_runs_the_body_before_the_condition() {
    // int i = 0; do { i = i + 1; if (c) { continue; } n = n - 1; } while (i < n); return i;
    let d = static_method(
        "d",
        vec![param("c", JType::boolean()), param("n", JType::int())],
        JType::int(),
        vec![
            declare("i", JType::int(), Some(int("0"))),
            do_while(
                block_stmt(vec![
                    eval(assign(
                        int_var("i"),
                        binary(BinaryOperator::Add, int_var("i"), int("1"), JType::int()),
                    )),
                    if_else(bool_var("c"), block_stmt(vec![continue_to(None)]), None),
                    eval(assign(
                        int_var("n"),
                        binary(BinaryOperator::Sub, int_var("n"), int("1"), JType::int()),
                    )),
                ]),
                less(int_var("i"), int_var("n")),
            ),
            ret(Some(int_var("i"))),
        ],
    );
    let compiled = compile_all("Main.d", main_class(vec![d]));
    let program = compiled.program();
    let context = &program.context;
    let d = function(program, "Main.d(boolean,int)");

    assert_eq!(straight_line(context, &d), vec!["int i = 0;", "do"]);
    let head = target_of(context, &d, "do");
    assert!(head.is_loop_start(context));
    assert_eq!(head.num_entering_edges(context), 2);
    assert_eq!(target_of(context, &d, "[i < n]"), head);
    assert_eq!(straight_line_from(context, head), vec!["i = i + 1;"]);

    // `continue` skips the rest of the body but still tests the condition.
    let condition = target_of(context, &d, "continue");
    let mut entering = condition
        .entering_edges(context)
        .iter()
        .map(|edge| edge.get_kind(context).to_string())
        .collect::<Vec<_>>();
    entering.sort();
    assert_eq!(entering, vec!["", "continue"]);
    assert_eq!(target_of(context, &d, "n = n - 1;").successors(context), vec![condition]);

    let post = target_of(context, &d, "[!(i < n)]");
    assert_eq!(straight_line_from(context, post), vec!["return i;"]);
}

/// The edge texts from `node` until control branches, joins or ends.
fn straight_line_from(context: &jcfa_ir::Context, node: jcfa_ir::Node) -> Vec<String> {
    let mut texts = vec![];
    let mut node = node;
    while let [edge] = node.leaving_edges(context) {
        texts.push(edge.get_kind(context).to_string());
        node = edge.get_successor(context);
        if node.num_entering_edges(context) > 1 {
            break;
        }
    }
    texts
}
