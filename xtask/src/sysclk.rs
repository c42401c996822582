//! xtask sysclk — STM32F4 main PLL settings.

use anyhow::Result;
use clocktree::hz;
use clocktree::presets::stm32f4::{exact_system_clock_problem, system_clock_problem};
use colored::Colorize;

use crate::render;

const SHOWN: &[&str] = &["sysclk", "pll48"];

/// Entry point called from main.rs
pub fn run(max: i64, all: bool, exact: Option<i64>) -> Result<()> {
    println!();
    if let Some(target) = exact {
        println!("{}", format!("SYSCLK = {target} Hz, PLL48CK = 48 MHz (exact)").cyan().bold());
        let solution = exact_system_clock_problem(hz(target))?.all()?;
        render::print_candidates(solution.candidates(), SHOWN, solution.stats());
        return Ok(());
    }

    println!("{}", format!("Fastest SYSCLK <= {max} Hz with PLL48CK = 48 MHz").cyan().bold());
    let problem = system_clock_problem(hz(max))?;
    if all {
        let solution = problem.all()?;
        render::print_candidates(solution.candidates(), SHOWN, solution.stats());
    } else {
        let solution = problem.solve(clocktree::Report::Best)?;
        render::print_candidates(solution.candidates(), SHOWN, solution.stats());
    }
    Ok(())
}
