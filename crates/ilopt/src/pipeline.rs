use std::time::Instant;

use ilopt_core::{parse_and_analyze, print_block, render_diagnostics, AnalysisInfo, Block};

use crate::disambiguator::disambiguate;
use crate::error::{OptimiserError, Result};
use crate::full_inliner::full_inline;
use crate::settings::{validate_steps, OptimiserSettings, OptimiserStep};

macro_rules! timing_step {
    ($trace:expr, $label:expr, $block:expr) => {{
        let _t0 = if $trace { Some(Instant::now()) } else { None };
        let result = $block;
        if let Some(t0) = _t0 {
            tracing::info!(
                step = $label,
                elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
                "optimiser timing"
            );
        }
        result
    }};
}

/// Parses, analyses and optimises `source`, returning the printed result.
pub fn optimise_source(source: &str, settings: &OptimiserSettings) -> Result<String> {
    settings.validate()?;
    let dialect = settings.dialect();
    let trace = settings.trace_timing;

    let (mut block, info) = timing_step!(trace, "parse and analyse", {
        parse_and_analyze(source, &dialect, settings.external_names()).map_err(|diagnostics| {
            OptimiserError::Diagnostics(render_diagnostics("<input>", source, &diagnostics, false))
        })?
    });
    run_steps_traced(&mut block, &info, &settings.steps, trace)?;
    Ok(timing_step!(trace, "print", print_block(&block)))
}

/// Runs `steps` in order on an analysed tree.
pub fn run_steps(block: &mut Block, info: &AnalysisInfo, steps: &[OptimiserStep]) -> Result<()> {
    run_steps_traced(block, info, steps, false)
}

fn run_steps_traced(
    block: &mut Block,
    info: &AnalysisInfo,
    steps: &[OptimiserStep],
    trace: bool,
) -> Result<()> {
    validate_steps(steps)?;
    for step in steps {
        timing_step!(trace, step.label(), {
            match step {
                OptimiserStep::Disambiguate => {
                    *block = disambiguate(block, info)?;
                }
                OptimiserStep::FullInline => {
                    let inlined = full_inline(block, info)?;
                    tracing::debug!(inlined, "inlining step done");
                }
            }
        });
    }
    Ok(())
}

/// JSON rendering of the tree, for inspection tools.
pub fn dump_ast_json(block: &Block) -> Result<String> {
    serde_json::to_string_pretty(block)
        .map_err(|err| OptimiserError::Config(format!("failed to serialise tree: {err}")))
}
