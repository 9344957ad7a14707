//! Weighted preflop ranges.
//!
//! A `Range` maps each of the 1326 two-card combos to a weight in [0, 1].
//! Parsing accepts the usual notation: single classes (`AA`, `AKs`, `AKo`),
//! pair runs (`AA-77`), kicker runs (`AKs-ATs`), plus notation (`TT+`,
//! `ATs+`), exact combos (`AsKh`), and an optional `:w` weight per token.
//! Duplicate combos across tokens keep the maximum weight.

use once_cell::sync::Lazy;

use crate::cards::{class_combos, combo_from_id, rank_index, Combo, NUM_COMBOS, RANKS_STR};
use crate::error::{SolverError, SolverResult};

/// The 13 ranks in grid order: A, K, Q, J, T, 9, 8, 7, 6, 5, 4, 3, 2.
const GRID_RANKS: [char; 13] = [
    'A', 'K', 'Q', 'J', 'T', '9', '8', '7', '6', '5', '4', '3', '2',
];

/// All 169 hand classes in 13x13 grid order (pairs on the diagonal,
/// suited above, offsuit below).
pub static HAND_CLASSES: Lazy<Vec<String>> = Lazy::new(|| {
    let mut classes = Vec::with_capacity(169);
    for row in 0..13 {
        for col in 0..13 {
            if row == col {
                classes.push(format!("{}{}", GRID_RANKS[row], GRID_RANKS[col]));
            } else if row < col {
                classes.push(format!("{}{}s", GRID_RANKS[row], GRID_RANKS[col]));
            } else {
                classes.push(format!("{}{}o", GRID_RANKS[col], GRID_RANKS[row]));
            }
        }
    }
    classes
});

/// Number of combos a hand-class notation expands to (6, 4, or 12).
pub fn combo_count(notation: &str) -> u32 {
    let chars: Vec<char> = notation.chars().collect();
    if chars.len() == 2 && chars[0] == chars[1] {
        return 6;
    }
    if chars.len() == 3 {
        if chars[2] == 's' {
            return 4;
        }
        if chars[2] == 'o' {
            return 12;
        }
    }
    0
}

#[derive(Debug, Clone)]
pub struct Range {
    weights: Vec<f64>,
}

impl Default for Range {
    fn default() -> Self {
        Range::new()
    }
}

impl Range {
    pub fn new() -> Range {
        Range {
            weights: vec![0.0; NUM_COMBOS],
        }
    }

    /// Parse a comma-separated range string.
    pub fn parse(range_str: &str) -> SolverResult<Range> {
        let mut range = Range::new();
        let mut offset = 0usize;

        for raw in range_str.split(',') {
            let trimmed = raw.trim();
            let token_pos = offset + (raw.len() - raw.trim_start().len());
            if !trimmed.is_empty() {
                range.add_token(trimmed, token_pos)?;
            }
            offset += raw.len() + 1;
        }

        Ok(range)
    }

    fn add_token(&mut self, token: &str, position: usize) -> SolverResult<()> {
        let (base, weight) = match token.split_once(':') {
            Some((base, w)) => {
                let weight: f64 = w
                    .parse()
                    .map_err(|_| SolverError::parse(token, position))?;
                if !(weight > 0.0 && weight <= 1.0) {
                    return Err(SolverError::parse(token, position));
                }
                (base, weight)
            }
            None => (token, 1.0),
        };

        let combos = expand_token(base).map_err(|_| SolverError::parse(token, position))?;
        for combo in combos {
            let w = &mut self.weights[combo.id() as usize];
            if weight > *w {
                *w = weight;
            }
        }
        Ok(())
    }

    pub fn weight(&self, combo: Combo) -> f64 {
        self.weights[combo.id() as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.weights.iter().all(|&w| w <= 0.0)
    }

    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// All combos with weight > 0.
    pub fn combos(&self) -> impl Iterator<Item = (Combo, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > 0.0)
            .map(|(id, &w)| (combo_from_id(id as u16), w))
    }

    /// Combos that do not intersect any of the dead cards, with weights.
    pub fn feasible(&self, dead: &[u8]) -> Vec<(Combo, f64)> {
        self.combos()
            .filter(|(c, _)| !dead.iter().any(|&d| c.collides_with(d)))
            .collect()
    }

    /// A copy with every combo touching a dead card zeroed out.
    pub fn exclude_cards(&self, dead: &[u8]) -> Range {
        let mut masked = self.clone();
        for (id, w) in masked.weights.iter_mut().enumerate() {
            if *w > 0.0 {
                let combo = combo_from_id(id as u16);
                if dead.iter().any(|&d| combo.collides_with(d)) {
                    *w = 0.0;
                }
            }
        }
        masked
    }

    /// Normalized probability vector over combos feasible against `dead`.
    pub fn normalized(&self, dead: &[u8]) -> Vec<(Combo, f64)> {
        let feasible = self.feasible(dead);
        let total: f64 = feasible.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Vec::new();
        }
        feasible
            .into_iter()
            .map(|(c, w)| (c, w / total))
            .collect()
    }

    /// Hand classes present in the range, in grid order, with the class
    /// weight (the maximum combo weight within the class).
    pub fn classes(&self) -> Vec<(String, f64)> {
        HAND_CLASSES
            .iter()
            .filter_map(|class| {
                let w = class_combos(class)
                    .ok()?
                    .into_iter()
                    .map(|c| self.weight(c))
                    .fold(0.0f64, f64::max);
                (w > 0.0).then(|| (class.clone(), w))
            })
            .collect()
    }

    /// Canonical notation: one token per hand class, `:w` for weights
    /// below 1. Re-parsing yields an equivalent range for any range that
    /// was itself produced by `parse`.
    pub fn to_notation(&self) -> String {
        self.classes()
            .into_iter()
            .map(|(class, w)| {
                if (w - 1.0).abs() < 1e-12 {
                    class
                } else {
                    format!("{}:{}", class, w)
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn expand_token(base: &str) -> SolverResult<Vec<Combo>> {
    if let Some(stripped) = base.strip_suffix('+') {
        let classes = expand_plus(stripped)?;
        return classes_to_combos(&classes);
    }

    if base.len() > 3 {
        if let Some((start, end)) = base.split_once('-') {
            let classes = expand_dash(start, end)?;
            return classes_to_combos(&classes);
        }
    }

    // Bare two-rank shorthand: "AK" means both AKs and AKo.
    let chars: Vec<char> = base.chars().collect();
    if chars.len() == 2 && chars[0] != chars[1] && rank_index(chars[0]).is_some() {
        return classes_to_combos(&[format!("{}s", base), format!("{}o", base)]);
    }

    class_combos(base)
}

fn classes_to_combos(classes: &[String]) -> SolverResult<Vec<Combo>> {
    let mut combos = Vec::new();
    for class in classes {
        combos.extend(class_combos(class)?);
    }
    Ok(combos)
}

fn expand_plus(base: &str) -> SolverResult<Vec<String>> {
    let chars: Vec<char> = base.chars().collect();
    let ranks: Vec<char> = RANKS_STR.chars().collect();

    // Pair: "TT+"
    if chars.len() == 2 && chars[0] == chars[1] {
        let idx = rank_index(chars[0]).ok_or_else(|| SolverError::parse(base, 0))?;
        return Ok((idx..ranks.len())
            .map(|i| format!("{}{}", ranks[i], ranks[i]))
            .collect());
    }

    // Suited/offsuit: "ATs+" runs the kicker up to just below the high card.
    if chars.len() == 3 && (chars[2] == 's' || chars[2] == 'o') {
        let high_idx = rank_index(chars[0]).ok_or_else(|| SolverError::parse(base, 0))?;
        let low_idx = rank_index(chars[1]).ok_or_else(|| SolverError::parse(base, 0))?;
        if low_idx >= high_idx {
            return Err(SolverError::parse(base, 0));
        }
        return Ok((low_idx..high_idx)
            .map(|i| format!("{}{}{}", chars[0], ranks[i], chars[2]))
            .collect());
    }

    Err(SolverError::parse(base, 0))
}

fn expand_dash(start: &str, end: &str) -> SolverResult<Vec<String>> {
    let start_chars: Vec<char> = start.chars().collect();
    let end_chars: Vec<char> = end.chars().collect();
    let ranks: Vec<char> = RANKS_STR.chars().collect();

    // Pair run: "AA-77"
    if start_chars.len() == 2
        && end_chars.len() == 2
        && start_chars[0] == start_chars[1]
        && end_chars[0] == end_chars[1]
    {
        let si = rank_index(start_chars[0]).ok_or_else(|| SolverError::parse(start, 0))?;
        let ei = rank_index(end_chars[0]).ok_or_else(|| SolverError::parse(end, 0))?;
        let (lo, hi) = (si.min(ei), si.max(ei));
        return Ok((lo..=hi)
            .map(|i| format!("{}{}", ranks[i], ranks[i]))
            .collect());
    }

    // Kicker run: "AKs-ATs" (same high card, same suffix)
    if start_chars.len() == 3
        && end_chars.len() == 3
        && start_chars[0] == end_chars[0]
        && start_chars[2] == end_chars[2]
        && (start_chars[2] == 's' || start_chars[2] == 'o')
    {
        let si = rank_index(start_chars[1]).ok_or_else(|| SolverError::parse(start, 0))?;
        let ei = rank_index(end_chars[1]).ok_or_else(|| SolverError::parse(end, 0))?;
        let (lo, hi) = (si.min(ei), si.max(ei));
        return Ok((lo..=hi)
            .map(|i| format!("{}{}{}", start_chars[0], ranks[i], start_chars[2]))
            .collect());
    }

    Err(SolverError::parse(format!("{}-{}", start, end), 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_169_classes_unique() {
        let mut classes = HAND_CLASSES.clone();
        classes.sort();
        classes.dedup();
        assert_eq!(classes.len(), 169);
    }

    #[test]
    fn pair_expands_to_six() {
        let range = Range::parse("AA").unwrap();
        assert_eq!(range.combos().count(), 6);
    }

    #[test]
    fn weighted_token() {
        let range = Range::parse("AA:0.5").unwrap();
        for (_, w) in range.combos() {
            assert!((w - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn duplicate_takes_max_weight() {
        let range = Range::parse("AA:0.3,AA-QQ:0.8").unwrap();
        let aces = class_combos("AA").unwrap();
        for combo in aces {
            assert!((range.weight(combo) - 0.8).abs() < 1e-12);
        }
    }

    #[test]
    fn weight_zero_rejected() {
        assert!(Range::parse("AA:0").is_err());
        assert!(Range::parse("AA:1.5").is_err());
    }

    #[test]
    fn parse_error_carries_position() {
        let err = Range::parse("AA, XYZ").unwrap_err();
        match err {
            SolverError::ParseError { token, position } => {
                assert_eq!(token, "XYZ");
                assert_eq!(position, 4);
            }
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn exclude_cards_zeroes_collisions() {
        let range = Range::parse("AA").unwrap();
        let ace_of_spades = crate::cards::parse_card("As").unwrap().index();
        let masked = range.exclude_cards(&[ace_of_spades]);
        assert_eq!(masked.combos().count(), 3);
    }

    #[test]
    fn normalized_sums_to_one() {
        let range = Range::parse("AA,KK:0.5,72o").unwrap();
        let probs = range.normalized(&[]);
        let total: f64 = probs.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
