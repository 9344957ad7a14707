use std::fmt;

use crate::error::{SolverError, SolverResult};

pub const RANKS_STR: &str = "23456789TJQKA";
pub const SUITS_STR: &str = "shdc";

/// Number of distinct two-card combos in a full deck.
pub const NUM_COMBOS: usize = 1326;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
}

impl Rank {
    pub fn from_char(c: char) -> SolverResult<Rank> {
        match c.to_ascii_uppercase() {
            '2' => Ok(Rank::Two),
            '3' => Ok(Rank::Three),
            '4' => Ok(Rank::Four),
            '5' => Ok(Rank::Five),
            '6' => Ok(Rank::Six),
            '7' => Ok(Rank::Seven),
            '8' => Ok(Rank::Eight),
            '9' => Ok(Rank::Nine),
            'T' => Ok(Rank::Ten),
            'J' => Ok(Rank::Jack),
            'Q' => Ok(Rank::Queen),
            'K' => Ok(Rank::King),
            'A' => Ok(Rank::Ace),
            _ => Err(SolverError::InvalidRank(c)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    fn from_value(v: u8) -> Rank {
        match v {
            2 => Rank::Two,
            3 => Rank::Three,
            4 => Rank::Four,
            5 => Rank::Five,
            6 => Rank::Six,
            7 => Rank::Seven,
            8 => Rank::Eight,
            9 => Rank::Nine,
            10 => Rank::Ten,
            11 => Rank::Jack,
            12 => Rank::Queen,
            13 => Rank::King,
            _ => Rank::Ace,
        }
    }
}

pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub fn from_char(c: char) -> SolverResult<Suit> {
        match c.to_ascii_lowercase() {
            's' => Ok(Suit::Spades),
            'h' => Ok(Suit::Hearts),
            'd' => Ok(Suit::Diamonds),
            'c' => Ok(Suit::Clubs),
            _ => Err(SolverError::InvalidSuit(c)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Suit::Spades => 's',
            Suit::Hearts => 'h',
            Suit::Diamonds => 'd',
            Suit::Clubs => 'c',
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "\u{2660}",
            Suit::Hearts => "\u{2665}",
            Suit::Diamonds => "\u{2666}",
            Suit::Clubs => "\u{2663}",
        }
    }

    fn index(self) -> u8 {
        match self {
            Suit::Spades => 0,
            Suit::Hearts => 1,
            Suit::Diamonds => 2,
            Suit::Clubs => 3,
        }
    }

    fn from_index(i: u8) -> Suit {
        match i {
            0 => Suit::Spades,
            1 => Suit::Hearts,
            2 => Suit::Diamonds,
            _ => Suit::Clubs,
        }
    }
}

pub const ALL_SUITS: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    /// Deck index 0..51: rank strides by 4, suit fills the low bits.
    pub fn index(&self) -> u8 {
        (self.rank.value() - 2) * 4 + self.suit.index()
    }

    pub fn from_index(id: u8) -> Card {
        Card {
            rank: Rank::from_value(id / 4 + 2),
            suit: Suit::from_index(id % 4),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

/// All 52 cards in index order.
pub fn full_deck() -> impl Iterator<Item = Card> {
    (0u8..52).map(Card::from_index)
}

/// Deck indices of every card not in `dead`.
pub fn remaining_deck(dead: &[u8]) -> Vec<u8> {
    let mut used = [false; 52];
    for &d in dead {
        used[d as usize] = true;
    }
    (0u8..52).filter(|&c| !used[c as usize]).collect()
}

pub fn parse_card(notation: &str) -> SolverResult<Card> {
    let notation = notation.trim();
    let chars: Vec<char> = notation.chars().collect();
    if chars.len() != 2 {
        return Err(SolverError::parse(notation, 0));
    }
    let rank = Rank::from_char(chars[0])?;
    let suit = Suit::from_char(chars[1])?;
    Ok(Card::new(rank, suit))
}

pub fn parse_board(notation: &str) -> SolverResult<Vec<Card>> {
    let cleaned = notation.trim().replace(' ', "").replace(',', "");
    if cleaned.len() % 2 != 0 {
        return Err(SolverError::parse(notation.trim(), 0));
    }
    let chars: Vec<char> = cleaned.chars().collect();
    let mut cards = Vec::new();
    for i in (0..chars.len()).step_by(2) {
        let s: String = chars[i..i + 2].iter().collect();
        cards.push(parse_card(&s).map_err(|_| SolverError::parse(s.clone(), i))?);
    }
    Ok(cards)
}

// ---------------------------------------------------------------------------
// Combos
// ---------------------------------------------------------------------------

/// An unordered pair of distinct cards, stored as deck indices with lo < hi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combo {
    pub lo: u8,
    pub hi: u8,
}

impl Combo {
    pub fn new(a: u8, b: u8) -> Combo {
        if a < b {
            Combo { lo: a, hi: b }
        } else {
            Combo { lo: b, hi: a }
        }
    }

    pub fn from_cards(c1: Card, c2: Card) -> Combo {
        Combo::new(c1.index(), c2.index())
    }

    /// Canonical combo id in 0..1326.
    pub fn id(&self) -> u16 {
        let hi = self.hi as u16;
        hi * (hi - 1) / 2 + self.lo as u16
    }

    pub fn cards(&self) -> (Card, Card) {
        (Card::from_index(self.hi), Card::from_index(self.lo))
    }

    pub fn collides_with(&self, card: u8) -> bool {
        self.lo == card || self.hi == card
    }

    pub fn overlaps(&self, other: &Combo) -> bool {
        self.collides_with(other.lo) || self.collides_with(other.hi)
    }

    /// Hand-class notation: "AA", "AKs", or "AKo".
    pub fn class(&self) -> String {
        let (c1, c2) = self.cards();
        if c1.rank == c2.rank {
            return format!("{}{}", c1.rank.to_char(), c2.rank.to_char());
        }
        let suffix = if c1.suit == c2.suit { 's' } else { 'o' };
        format!("{}{}{}", c1.rank.to_char(), c2.rank.to_char(), suffix)
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (c1, c2) = self.cards();
        write!(f, "{}{}", c1, c2)
    }
}

/// Combo for a canonical id in 0..1326.
pub fn combo_from_id(id: u16) -> Combo {
    // Invert id = hi*(hi-1)/2 + lo.
    let mut hi = 1u16;
    while (hi + 1) * hi / 2 <= id {
        hi += 1;
    }
    let lo = id - hi * (hi - 1) / 2;
    Combo {
        lo: lo as u8,
        hi: hi as u8,
    }
}

/// All combos for a hand-class notation ("AA", "AKs", "AKo", or exact "AsKh").
pub fn class_combos(notation: &str) -> SolverResult<Vec<Combo>> {
    let notation = notation.trim();
    let chars: Vec<char> = notation.chars().collect();

    // Pair notation: "AA"
    if chars.len() == 2 && chars[0] == chars[1] {
        let rank = Rank::from_char(chars[0])?;
        let mut combos = Vec::with_capacity(6);
        for i in 0..ALL_SUITS.len() {
            for j in (i + 1)..ALL_SUITS.len() {
                combos.push(Combo::from_cards(
                    Card::new(rank, ALL_SUITS[i]),
                    Card::new(rank, ALL_SUITS[j]),
                ));
            }
        }
        return Ok(combos);
    }

    // Suited/offsuit notation: "AKs" or "AKo"
    if chars.len() == 3 {
        let r1 = Rank::from_char(chars[0])?;
        let r2 = Rank::from_char(chars[1])?;
        if r1 == r2 {
            return Err(SolverError::parse(notation, 0));
        }
        match chars[2] {
            's' => {
                return Ok(ALL_SUITS
                    .iter()
                    .map(|&s| Combo::from_cards(Card::new(r1, s), Card::new(r2, s)))
                    .collect());
            }
            'o' => {
                let mut combos = Vec::with_capacity(12);
                for &s1 in &ALL_SUITS {
                    for &s2 in &ALL_SUITS {
                        if s1 != s2 {
                            combos.push(Combo::from_cards(Card::new(r1, s1), Card::new(r2, s2)));
                        }
                    }
                }
                return Ok(combos);
            }
            _ => return Err(SolverError::parse(notation, 0)),
        }
    }

    // Specific cards: "AsKh"
    if chars.len() == 4 {
        let c1 = parse_card(&notation[..2])?;
        let c2 = parse_card(&notation[2..])?;
        if c1 == c2 {
            return Err(SolverError::parse(notation, 0));
        }
        return Ok(vec![Combo::from_cards(c1, c2)]);
    }

    Err(SolverError::parse(notation, 0))
}

/// Returns the index of a rank char in RANKS_STR (0-based: '2'=0, 'A'=12).
pub fn rank_index(c: char) -> Option<usize> {
    RANKS_STR.find(c)
}
