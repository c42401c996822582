//! xtask i2s — STM32F4 PLLI2S settings for a sample rate.

use anyhow::{Context, Result};
use clocktree::parse_rational;
use clocktree::presets::stm32f4::i2s_problem;
use colored::Colorize;

use crate::render;

const SHOWN: &[&str] = &["fs"];

/// Entry point called from main.rs
pub fn run(
    fs: &str,
    chlen: Option<u32>,
    mckoe: Option<bool>,
    tolerance: f64,
    limit: Option<usize>,
) -> Result<()> {
    let target = parse_rational(fs).with_context(|| format!("invalid sample rate '{fs}'"))?;
    println!();
    println!(
        "{}",
        format!("I2S Fs = {fs} Hz within {:.3} %", tolerance * 100.0).cyan().bold()
    );
    let solution = i2s_problem(target, tolerance, chlen, mckoe)?.all()?;
    let shown = solution.candidates().iter().take(limit.unwrap_or(usize::MAX));
    render::print_candidates(shown, SHOWN, solution.stats());
    Ok(())
}
