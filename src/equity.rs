//! Monte-Carlo equity of a combo against a weighted range.

use std::fmt;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::cards::{remaining_deck, Combo};
use crate::error::{SolverError, SolverResult};
use crate::hand_evaluator::rank7;
use crate::ranges::Range;

/// Default trial count; keeps the standard error of the estimate under 0.01.
pub const DEFAULT_EQUITY_TRIALS: usize = 10_000;

/// Hard upper bound on trials per equity call.
pub const MAX_EQUITY_TRIALS: usize = 200_000;

/// Attempts made to find a non-colliding villain combo before giving up.
pub const RESAMPLE_CAP: usize = 1000;

const CHUNK_TRIALS: usize = 1024;

pub struct EquityResult {
    pub win: f64,
    pub tie: f64,
    pub lose: f64,
    pub trials: usize,
}

impl EquityResult {
    pub fn equity(&self) -> f64 {
        self.win + self.tie / 2.0
    }
}

impl fmt::Display for EquityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Win {:.1}% | Tie {:.1}% | Lose {:.1}% (equity: {:.1}%)",
            self.win * 100.0,
            self.tie * 100.0,
            self.lose * 100.0,
            self.equity() * 100.0,
        )
    }
}

/// Monte-Carlo equity of `hero` against `villain_range` on `board`.
///
/// Each trial samples one villain combo weighted by range probability
/// (combos colliding with hero or the board are excluded up front), deals
/// the remaining board cards uniformly, and scores both seven-card hands.
/// Per-chunk seeded rngs make the result independent of thread count.
pub fn equity_vs_range(
    hero: Combo,
    villain_range: &Range,
    board: &[u8],
    trials: usize,
    seed: u64,
) -> SolverResult<EquityResult> {
    let mut dead = vec![hero.lo, hero.hi];
    dead.extend_from_slice(board);

    let feasible = villain_range.feasible(&dead);
    if feasible.is_empty() {
        return Err(SolverError::NoViableSample {
            attempts: RESAMPLE_CAP,
        });
    }

    let trials = trials.clamp(1, MAX_EQUITY_TRIALS);
    let cards_needed = 5 - board.len();
    let num_chunks = (trials + CHUNK_TRIALS - 1) / CHUNK_TRIALS;

    let counts: Vec<(u64, u64, u64)> = (0..num_chunks)
        .into_par_iter()
        .map(|chunk| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(chunk as u64));
            let dist = WeightedIndex::new(feasible.iter().map(|(_, w)| *w))
                .expect("feasible weights are positive");
            let chunk_trials = CHUNK_TRIALS.min(trials - chunk * CHUNK_TRIALS);

            let mut wins = 0u64;
            let mut ties = 0u64;
            let mut losses = 0u64;

            for _ in 0..chunk_trials {
                let (villain, _) = feasible[dist.sample(&mut rng)];

                let mut trial_dead = dead.clone();
                trial_dead.push(villain.lo);
                trial_dead.push(villain.hi);
                let mut deck = remaining_deck(&trial_dead);

                // Partial Fisher-Yates: only the runout cards are needed.
                for k in 0..cards_needed {
                    let swap = rng.gen_range(k..deck.len());
                    deck.swap(k, swap);
                }

                let mut hero_hand = [0u8; 7];
                let mut villain_hand = [0u8; 7];
                hero_hand[0] = hero.lo;
                hero_hand[1] = hero.hi;
                villain_hand[0] = villain.lo;
                villain_hand[1] = villain.hi;
                for (i, &b) in board.iter().enumerate() {
                    hero_hand[2 + i] = b;
                    villain_hand[2 + i] = b;
                }
                for i in 0..cards_needed {
                    hero_hand[2 + board.len() + i] = deck[i];
                    villain_hand[2 + board.len() + i] = deck[i];
                }

                let hero_score = rank7(&hero_hand);
                let villain_score = rank7(&villain_hand);
                if hero_score > villain_score {
                    wins += 1;
                } else if hero_score == villain_score {
                    ties += 1;
                } else {
                    losses += 1;
                }
            }

            (wins, ties, losses)
        })
        .collect();

    let (wins, ties, losses) = counts
        .iter()
        .fold((0u64, 0u64, 0u64), |acc, &(w, t, l)| {
            (acc.0 + w, acc.1 + t, acc.2 + l)
        });

    let total = (wins + ties + losses) as f64;
    Ok(EquityResult {
        win: wins as f64 / total,
        tie: ties as f64 / total,
        lose: losses as f64 / total,
        trials: total as usize,
    })
}
