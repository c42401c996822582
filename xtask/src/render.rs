//! Text rendering of solver results.
//!
//! One candidate per line, outputs first then stages:
//! `sysclk=168000000 pll48=48000000 M=8 N=336 P=2 Q=7 AHB=1`.

use clocktree::{Candidate, Rational, SearchStats};
use colored::Colorize;

/// Decimal places kept for non-integer values.
const DECIMALS: u32 = 6;

/// Integers print bare; anything else as a decimal rounded to six places
/// with trailing zeros trimmed.
pub fn format_rational(value: Rational) -> String {
    if value.is_integer() {
        return value.to_integer().to_string();
    }
    let negative = value < Rational::from_integer(0);
    let numer = i128::from(*value.numer()).abs();
    let denom = i128::from(*value.denom()).abs();
    let scale = 10i128.pow(DECIMALS);
    // Round half away from zero.
    let scaled = (numer * scale * 2 + denom) / (denom * 2);
    let int_part = scaled / scale;
    let frac_part = scaled % scale;
    let mut text = format!("{int_part}.{frac_part:0width$}", width = DECIMALS as usize);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    if negative {
        text.insert(0, '-');
    }
    text
}

/// `name=value` pairs for the chosen outputs (all when `outputs` is empty),
/// then every stage.
pub fn candidate_line(candidate: &Candidate, outputs: &[&str]) -> String {
    let shown = candidate
        .outputs()
        .filter(|(name, _)| outputs.is_empty() || outputs.contains(name))
        .map(|(name, value)| format!("{name}={}", format_rational(value)));
    let stages = candidate.stages().map(|(name, value)| format!("{name}={value}"));
    shown.chain(stages).collect::<Vec<_>>().join(" ")
}

/// Print candidates, one per line, then a dimmed stats footer.
pub fn print_candidates<'a>(
    candidates: impl IntoIterator<Item = &'a Candidate>,
    outputs: &[&str],
    stats: SearchStats,
) {
    let mut printed = 0usize;
    for candidate in candidates {
        println!("{}", candidate_line(candidate, outputs));
        printed = printed.saturating_add(1);
    }
    if printed == 0 {
        println!("{}", "No setting satisfies every constraint.".yellow());
    }
    println!("{}", stats_line(stats).dimmed());
}

pub fn stats_line(stats: SearchStats) -> String {
    format!(
        "{} matches, {} leaves, {} nodes, {} sub-trees pruned",
        stats.matches, stats.leaves, stats.nodes, stats.pruned
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clocktree::hz;
    use clocktree::presets::stm32f4::system_clock_tree;

    #[test]
    fn integers_render_without_fraction() {
        assert_eq!(format_rational(hz(180_000_000)), "180000000");
        assert_eq!(format_rational(hz(-3)), "-3");
    }

    #[test]
    fn fractions_render_as_trimmed_decimals() {
        assert_eq!(format_rational(Rational::new(140_625, 4)), "35156.25");
        assert_eq!(format_rational(Rational::new(1, 3)), "0.333333");
        assert_eq!(format_rational(Rational::new(2, 3)), "0.666667");
        assert_eq!(format_rational(Rational::new(-1, 2)), "-0.5");
        assert_eq!(format_rational(Rational::new(214_500_000, 4_864)), "44099.506579");
    }

    #[test]
    fn candidate_line_lists_outputs_then_stages() {
        let c = system_clock_tree().unwrap().evaluate(&[8, 336, 2, 7, 1]).unwrap();
        assert_eq!(
            candidate_line(&c, &["sysclk", "pll48"]),
            "pll48=48000000 sysclk=168000000 M=8 N=336 P=2 Q=7 AHB=1"
        );
        assert!(candidate_line(&c, &[]).starts_with("vco_in=1000000 vco_out=336000000 "));
    }

    #[test]
    fn stats_footer_counts_everything() {
        let stats = SearchStats { nodes: 10, pruned: 2, leaves: 6, matches: 1 };
        assert_eq!(stats_line(stats), "1 matches, 6 leaves, 10 nodes, 2 sub-trees pruned");
    }
}
