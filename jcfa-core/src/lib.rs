//! Lowering of a type-resolved Java program into control-flow automata.
//!
//! The entry point is [`compile_program`], which runs the whole pipeline:
//!
//! 1. the declared types are entered into the [`TypeHierarchy`],
//! 2. every field and method is declared in the program [`Scope`],
//! 3. every body is lowered into a CFA by the CFA builder,
//! 4. virtual calls are rewritten into tests on the receiver's run-time type,
//! 5. the program is restricted to what the entry function can reach, and
//! 6. the result is verified.

pub mod build_config;
pub mod call_graph;
pub mod cfa_builder;
pub mod dynamic_dispatch;
pub mod lowering;
pub mod scope;
pub mod type_hierarchy;

pub use build_config::{BuildConfig, EvaluationOrder};
pub use cfa_builder::StaticField;
pub use scope::Scope;
pub use type_hierarchy::TypeHierarchy;

use indexmap::IndexMap;
use itertools::Itertools;
use jcfa_ast::CompilationUnit;
use jcfa_error::{
    error::CompileError,
    handler::{ErrorEmitted, Handler},
};
use jcfa_ir::{printer, Context, Function, IrError, Node};
use jcfa_types::{SourceEngine, Span, TypeName};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cfa_builder::ProgramBuilder;

/// The control-flow automata of a program, as handed to the analysis.
pub struct ProgramCfa {
    pub context: Context,
    /// Qualified name of the entry function.
    pub entry_function: String,
    /// The entry node of every function, by qualified name.
    pub functions: IndexMap<String, Node>,
    /// All nodes of every function, by qualified name.
    pub cfa_nodes: IndexMap<String, Vec<Node>>,
    pub static_fields: Vec<StaticField>,
    /// The source files the program was lowered from.
    pub parsed_files: Vec<PathBuf>,
    /// Types referenced by the program that it does not declare.
    pub pending_types: Vec<TypeName>,
}

impl ProgramCfa {
    pub fn function(&self, name: &str) -> Option<Function> {
        self.context.get_function(name)
    }

    pub fn entry(&self) -> Option<Function> {
        self.function(&self.entry_function)
    }
}

/// Lower `units` into control-flow automata for the entry function configured in `config`.
///
/// Every diagnostic is reported through `handler`. On failure no partial result is returned.
pub fn compile_program(
    handler: &Handler,
    config: &BuildConfig,
    source_engine: &SourceEngine,
    units: &[CompilationUnit],
) -> Result<ProgramCfa, ErrorEmitted> {
    let mut builder = ProgramBuilder::new(handler, config, units);
    builder.register_types()?;
    builder.register_members()?;
    builder.build_functions()?;

    let ProgramBuilder {
        mut context,
        mut hierarchy,
        static_fields,
        ..
    } = builder;

    if config.lower_dynamic_dispatch {
        let rewritten = dynamic_dispatch::lower_dynamic_dispatch(&mut context, &hierarchy)
            .map_err(|err| internal_error(handler, err))?;
        info!(call_sites = rewritten, "lowered dynamic dispatch");
    }

    let entry = resolve_entry_function(&context, config.entry_function())
        .map_err(|err| handler.emit_err(err))?;
    let entry_function = entry.get_name(&context).to_string();

    if config.only_reachable_functions {
        let removed = call_graph::restrict_to_reachable(&mut context, entry)
            .map_err(|err| internal_error(handler, err))?;
        info!(
            entry = %entry_function,
            removed,
            kept = context.num_functions(),
            "restricted program to reachable functions"
        );
    }

    if config.verify_cfa {
        context
            .verify()
            .map_err(|err| internal_error(handler, err))?;
        debug!("verified CFA");
    }

    if config.print_cfa {
        info!("\n{}", printer::to_string(&context));
    }

    let functions = context
        .functions()
        .map(|function| {
            (
                function.get_name(&context).to_string(),
                function.get_entry(&context),
            )
        })
        .collect();
    let cfa_nodes = context
        .functions()
        .map(|function| (function.get_name(&context).to_string(), function.nodes(&context)))
        .collect();
    let parsed_files = units
        .iter()
        .filter_map(|unit| unit.source_id.as_ref())
        .unique()
        .filter_map(|source_id| source_engine.get_path(source_id))
        .collect();

    Ok(ProgramCfa {
        context,
        entry_function,
        functions,
        cfa_nodes,
        static_fields,
        parsed_files,
        pending_types: hierarchy.take_pending_types(),
    })
}

/// Find the entry function by its qualified name, or by the name without the parameter list if
/// that is unique.
pub fn resolve_entry_function(context: &Context, name: &str) -> Result<Function, CompileError> {
    if let Some(function) = context.get_function(name) {
        return Ok(function);
    }
    let prefix = format!("{name}(");
    let candidates = context
        .functions()
        .filter(|function| function.get_name(context).starts_with(&prefix))
        .collect_vec();
    match candidates.as_slice() {
        [function] => Ok(*function),
        [] => Err(CompileError::EntryFunctionNotFound {
            name: name.to_string(),
        }),
        _ => Err(CompileError::AmbiguousEntryFunction {
            name: name.to_string(),
            candidates: candidates
                .iter()
                .map(|function| function.get_name(context).to_string())
                .collect(),
        }),
    }
}

fn internal_error(handler: &Handler, err: IrError) -> ErrorEmitted {
    handler.emit_err(CompileError::InternalOwned(err.to_string(), Span::dummy()))
}
