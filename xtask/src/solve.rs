//! xtask solve / eval — declarative JSON clock trees.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clocktree::{Report, TreeConfig};
use colored::Colorize;
use tracing::debug;

use crate::render;

/// Read and parse a tree config.
pub(crate) fn load_config(path: &Path) -> Result<TreeConfig> {
    debug!(path = %path.display(), "loading tree config");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&text).with_context(|| format!("invalid tree config {}", path.display()))
}

pub(crate) fn parse_config(text: &str) -> Result<TreeConfig> {
    Ok(serde_json::from_str(text)?)
}

/// Split `NAME=VALUE`.
pub(crate) fn parse_assignment(text: &str) -> Result<(&str, u32)> {
    let Some((name, value)) = text.split_once('=') else {
        bail!("expected NAME=VALUE, got '{text}'");
    };
    let value = value
        .trim()
        .parse()
        .with_context(|| format!("stage value in '{text}' is not an unsigned integer"))?;
    Ok((name.trim(), value))
}

/// Entry point called from main.rs
pub fn run(path: &Path, best: bool) -> Result<()> {
    let problem = load_config(path)?.to_problem()?;
    println!();
    println!("{}", format!("Solving {}", path.display()).cyan().bold());
    let report = if best { Report::Best } else { Report::All };
    let solution = problem.solve(report)?;
    render::print_candidates(solution.candidates(), &[], solution.stats());
    Ok(())
}

/// Entry point called from main.rs
pub fn eval(path: &Path, assignments: &[String]) -> Result<()> {
    let config = load_config(path)?;
    let problem = config.to_problem()?;
    let pairs = assignments
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Vec<_>>>()?;
    let candidate = problem.tree().evaluate_named(&pairs)?;
    println!("{}", render::candidate_line(&candidate, &[]));
    if problem.checks().is_empty() {
        return Ok(());
    }
    if problem.is_match(&candidate)? {
        println!("{}", "✓ satisfies every check".green());
    } else {
        for check in problem.checks() {
            let passes = candidate
                .output(&check.output)
                .is_some_and(|v| check.constraint.accepts(v));
            if !passes {
                println!("{}", format!("✗ fails check on {}", check.output).red());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clocktree::hz;
    use clocktree::presets::stm32f4;

    const SYSCLK: &str = include_str!("../configs/stm32f4_sysclk.json");
    const I2S: &str = include_str!("../configs/stm32f4_i2s_44k1.json");
    const USB: &str = include_str!("../configs/usb_fullspeed.json");

    #[test]
    fn sysclk_config_matches_preset() {
        let from_json = parse_config(SYSCLK).unwrap().to_problem().unwrap().best().unwrap();
        let preset = stm32f4::system_clock_problem(hz(180_000_000)).unwrap().best().unwrap();
        assert_eq!(from_json, preset);
        assert_eq!(from_json.unwrap().output("sysclk"), Some(hz(168_000_000)));
    }

    #[test]
    fn i2s_config_ranks_closest_rate_first() {
        let problem = parse_config(I2S).unwrap().to_problem().unwrap();
        let all = problem.all().unwrap();
        let first = all.first().unwrap().output_hz("fs").unwrap();
        assert!(all.candidates().iter().all(|c| {
            let fs = c.output_hz("fs").unwrap();
            (fs - 44_100.0).abs() >= (first - 44_100.0).abs()
        }));
        assert!(all.candidates().iter().any(|c| c.values() == [429, 2, 16, 1, 9, 1]));
    }

    #[test]
    fn usb_config_finds_exact_48mhz() {
        let all = parse_config(USB).unwrap().to_problem().unwrap().all().unwrap();
        assert!(!all.is_empty());
        assert!(all.candidates().iter().all(|c| c.output("usb") == Some(hz(48_000_000))));
        // 25 MHz / 25 x 192 = 192 MHz, / 4 = 48 MHz
        assert!(all.candidates().iter().any(|c| c.values() == [25, 192, 4]));
    }

    #[test]
    fn config_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        std::fs::write(&path, USB).unwrap();
        assert!(load_config(&path).is_ok());
        assert!(load_config(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn assignments_parse_name_and_value() {
        assert_eq!(parse_assignment("M=8").unwrap(), ("M", 8));
        assert_eq!(parse_assignment(" N = 336").unwrap(), ("N", 336));
        assert!(parse_assignment("M").is_err());
        assert!(parse_assignment("M=-1").is_err());
    }
}
