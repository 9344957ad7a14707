//! 5-to-7-card hand ranking.
//!
//! `rank7` maps any seven cards to a `u32` that totally orders poker hands:
//! category in the high bits, then up to five kicker ranks packed as
//! nibbles. Higher is stronger. Ace plays high; the wheel (A-2-3-4-5) is
//! the lowest straight.

use std::fmt;

use crate::cards::Card;
use crate::error::{SolverError, SolverResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
}

impl HandCategory {
    fn from_score(score: u32) -> HandCategory {
        match score >> 20 {
            0 => HandCategory::HighCard,
            1 => HandCategory::OnePair,
            2 => HandCategory::TwoPair,
            3 => HandCategory::ThreeOfAKind,
            4 => HandCategory::Straight,
            5 => HandCategory::Flush,
            6 => HandCategory::FullHouse,
            7 => HandCategory::FourOfAKind,
            _ => HandCategory::StraightFlush,
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandCategory::HighCard => write!(f, "High Card"),
            HandCategory::OnePair => write!(f, "One Pair"),
            HandCategory::TwoPair => write!(f, "Two Pair"),
            HandCategory::ThreeOfAKind => write!(f, "Three of a Kind"),
            HandCategory::Straight => write!(f, "Straight"),
            HandCategory::Flush => write!(f, "Flush"),
            HandCategory::FullHouse => write!(f, "Full House"),
            HandCategory::FourOfAKind => write!(f, "Four of a Kind"),
            HandCategory::StraightFlush => write!(f, "Straight Flush"),
        }
    }
}

#[inline]
fn pack(category: u32, kickers: &[u8]) -> u32 {
    let mut score = category << 20;
    for (i, &k) in kickers.iter().take(5).enumerate() {
        score |= (k as u32) << (16 - 4 * i);
    }
    score
}

/// Highest rank of a straight contained in `mask` (bit r set = rank r
/// present), or None. The wheel reports high card 5.
#[inline]
fn straight_high(mask: u16) -> Option<u8> {
    for high in (6..=14u8).rev() {
        let run = 0b11111u16 << (high - 4);
        if mask & run == run {
            return Some(high);
        }
    }
    // Wheel: A-2-3-4-5
    let wheel = (1 << 14) | (1 << 2) | (1 << 3) | (1 << 4) | (1 << 5);
    if mask & wheel == wheel {
        return Some(5);
    }
    None
}

/// Top `n` set ranks of `mask`, descending.
#[inline]
fn top_ranks(mask: u16, n: usize) -> Vec<u8> {
    (2..=14u8)
        .rev()
        .filter(|&r| mask & (1 << r) != 0)
        .take(n)
        .collect()
}

/// Rank a 5-to-7-card hand given as deck indices. Returns a score that
/// totally orders hands; higher is stronger.
pub fn rank_hand(cards: &[u8]) -> u32 {
    debug_assert!((5..=7).contains(&cards.len()));

    let mut counts = [0u8; 15];
    let mut suit_counts = [0u8; 4];
    let mut suit_masks = [0u16; 4];
    let mut all_mask = 0u16;

    for &id in cards {
        let rank = id / 4 + 2;
        let suit = (id % 4) as usize;
        counts[rank as usize] += 1;
        suit_counts[suit] += 1;
        suit_masks[suit] |= 1 << rank;
        all_mask |= 1 << rank;
    }

    // Flush suit, if any (at most one with 7 cards).
    let flush_mask = (0..4)
        .find(|&s| suit_counts[s] >= 5)
        .map(|s| suit_masks[s]);

    if let Some(fm) = flush_mask {
        if let Some(high) = straight_high(fm) {
            return pack(8, &[high]);
        }
    }

    // Rank multiplicities, highest rank first.
    let mut quads = Vec::new();
    let mut trips = Vec::new();
    let mut pairs = Vec::new();
    for r in (2..=14u8).rev() {
        match counts[r as usize] {
            4 => quads.push(r),
            3 => trips.push(r),
            2 => pairs.push(r),
            _ => {}
        }
    }

    if let Some(&q) = quads.first() {
        let kicker = (2..=14u8)
            .rev()
            .find(|&r| r != q && counts[r as usize] > 0)
            .unwrap_or(0);
        return pack(7, &[q, kicker]);
    }

    if !trips.is_empty() {
        let t = trips[0];
        // Second trips acts as the pair of a full house.
        let pair = trips.get(1).copied().or_else(|| pairs.first().copied());
        if let Some(p) = pair {
            return pack(6, &[t, p]);
        }
    }

    if let Some(fm) = flush_mask {
        return pack(5, &top_ranks(fm, 5));
    }

    if let Some(high) = straight_high(all_mask) {
        return pack(4, &[high]);
    }

    if let Some(&t) = trips.first() {
        let mut kickers = vec![t];
        kickers.extend(top_ranks(all_mask & !(1 << t), 2));
        return pack(3, &kickers);
    }

    if pairs.len() >= 2 {
        let (p1, p2) = (pairs[0], pairs[1]);
        let rest = all_mask & !(1 << p1) & !(1 << p2);
        let mut kickers = vec![p1, p2];
        kickers.extend(top_ranks(rest, 1));
        return pack(2, &kickers);
    }

    if let Some(&p) = pairs.first() {
        let mut kickers = vec![p];
        kickers.extend(top_ranks(all_mask & !(1 << p), 3));
        return pack(1, &kickers);
    }

    pack(0, &top_ranks(all_mask, 5))
}

/// Rank exactly seven cards.
#[inline]
pub fn rank7(cards: &[u8; 7]) -> u32 {
    rank_hand(cards)
}

/// Rank hole cards plus board, validating the card count.
pub fn evaluate_hand(hole: &[Card], board: &[Card]) -> SolverResult<u32> {
    let total = hole.len() + board.len();
    if total < 5 {
        return Err(SolverError::NotEnoughCards { need: 5, got: total });
    }
    let ids: Vec<u8> = hole.iter().chain(board.iter()).map(|c| c.index()).collect();
    Ok(rank_hand(&ids))
}

/// Category of a score produced by `rank_hand`.
pub fn category_of(score: u32) -> HandCategory {
    HandCategory::from_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::parse_board;

    fn score(s: &str) -> u32 {
        let ids: Vec<u8> = parse_board(s).unwrap().iter().map(|c| c.index()).collect();
        rank_hand(&ids)
    }

    #[test]
    fn category_ladder() {
        let high = score("AhKd9c5s2h 7d 3c");
        let pair = score("AhAd9c5s2h 7d 3c");
        let two_pair = score("AhAd9c9s2h 7d 3c");
        let trips = score("AhAdAc5s2h 7d 3c");
        let straight = score("4h5d6c7s8h Ad Kc");
        let flush = score("Ah9h5h3h2h Kd Qc");
        let boat = score("AhAdAc5s5h 7d 3c");
        let quads = score("AhAdAcAs2h 7d 3c");
        let sf = score("4h5h6h7h8h Ad Kc");

        let ladder = [high, pair, two_pair, trips, straight, flush, boat, quads, sf];
        for w in ladder.windows(2) {
            assert!(w[0] < w[1], "{:x} should rank below {:x}", w[0], w[1]);
        }
    }

    #[test]
    fn kickers_break_ties() {
        assert!(score("AhAd Kc 5s2h7d3c") > score("AhAd Qc 5s2h7d3c"));
        assert!(score("KhKd9c9s Ah 7d3c") > score("KhKd9c9s Qh 7d3c"));
    }

    #[test]
    fn wheel_is_lowest_straight() {
        let wheel = score("Ah2c3d4h5s 9c Jd");
        let six_high = score("2c3d4h5s6h 9c Jd");
        assert_eq!(category_of(wheel), HandCategory::Straight);
        assert!(wheel < six_high);
    }

    #[test]
    fn straight_flush_beats_quads() {
        let sf = score("AsKsQsJsTs 2c 3d");
        let quads = score("AhAdAcAs Kc 2d3h");
        assert!(sf > quads);
    }

    #[test]
    fn permutation_invariant() {
        let a = score("AhKd9c5s2h7d3c");
        let b = score("3c7d2h5s9cKdAh");
        let c = score("9c Ah 7d Kd 3c 2h 5s");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn board_plays_for_both() {
        // Board makes the best hand for both players: identical scores.
        let board = "AhKhQhJhTh";
        let a = score(&format!("{} 2c 3d", board));
        let b = score(&format!("{} 7s 8s", board));
        assert_eq!(a, b);
    }

    #[test]
    fn second_trips_fills_the_boat() {
        let boat = score("AhAdAc KsKh Kd 2c");
        assert_eq!(category_of(boat), HandCategory::FullHouse);
        // Aces full of kings beats kings full of aces.
        assert!(boat > score("KhKdKc AsAh 2d 3c"));
    }
}
