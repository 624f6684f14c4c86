//! `run` and `stage` commands

use anyhow::Result;
use std::time::Instant;

use mlpipe::stages::{run_pipeline, Stage, StageReport};
use mlpipe::ui::{self, colors, format};

use crate::GlobalArgs;

/// Run `stages` in order and print a summary of the completed ones.
pub fn cmd_run(global: &GlobalArgs, stages: &[Stage]) -> Result<()> {
    let manager = super::load_manager(global, true)?;
    let started = Instant::now();

    match run_pipeline(&manager, stages) {
        Ok(reports) => {
            if !ui::is_quiet() {
                print_summary(&reports, started);
            }
            Ok(())
        }
        Err(e) => {
            if !ui::is_quiet() {
                eprintln!(
                    "{} {}",
                    ui::stage_icon(false),
                    colors::error("Pipeline stopped")
                );
            }
            Err(e)
        }
    }
}

fn print_summary(reports: &[StageReport], started: Instant) {
    println!();
    println!("{}", colors::heading("Pipeline summary"));
    println!("{}", format::separator(40));

    for report in reports {
        println!(
            "{} {:<10} {:>8}  {}",
            ui::stage_icon(true),
            colors::identifier(report.stage.key()),
            format::elapsed(report.elapsed),
            colors::secondary(&report.summary)
        );
    }

    println!(
        "{} {} stage(s) completed in {}",
        colors::success("✓"),
        reports.len(),
        format::elapsed(started.elapsed())
    );
}
