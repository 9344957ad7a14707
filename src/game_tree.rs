//! Betting abstraction and game tree.
//!
//! The tree is an arena of integer-indexed nodes covering every betting
//! line from the root street to the river. Chance nodes mark street
//! transitions but do not branch: the dealt cards are sampled during CFR
//! traversal, so each chance node has exactly one child (the next street's
//! action skeleton, which is the same for every runout).

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cards::Combo;
use crate::error::{SolverError, SolverResult};

const CHIP_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
}

impl Street {
    pub const ALL: [Street; 4] = [Street::Preflop, Street::Flop, Street::Turn, Street::River];

    pub fn index(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 1,
            Street::Turn => 2,
            Street::River => 3,
        }
    }

    pub fn next(self) -> Option<Street> {
        match self {
            Street::Preflop => Some(Street::Flop),
            Street::Flop => Some(Street::Turn),
            Street::Turn => Some(Street::River),
            Street::River => None,
        }
    }

    /// Board cards visible on this street.
    pub fn board_len(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River => 5,
        }
    }

    /// Cards dealt when transitioning into this street.
    pub fn cards_dealt(self) -> usize {
        match self {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn | Street::River => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
        }
    }

    pub fn from_str(s: &str) -> SolverResult<Street> {
        match s.to_ascii_lowercase().as_str() {
            "preflop" => Ok(Street::Preflop),
            "flop" => Ok(Street::Flop),
            "turn" => Ok(Street::Turn),
            "river" => Ok(Street::River),
            _ => Err(SolverError::parse(s, 0)),
        }
    }
}

/// User-facing betting abstraction.
#[derive(Debug, Clone)]
pub struct BettingConfig {
    /// Bet and raise sizes as fractions of the current pot, in order.
    pub bet_sizes: Vec<f64>,
    /// Cap on bets plus raises per street, indexed by `Street::index`.
    pub max_bets_per_street: [u32; 4],
    pub allow_all_in: bool,
    /// Minimum raise increment as a fraction of the current pot.
    pub min_raise_size: f64,
    pub starting_stack: f64,
    pub pot_size: f64,
    /// Pre-build ceiling on the closed-form node estimate.
    pub max_tree_nodes: u64,
}

impl Default for BettingConfig {
    fn default() -> Self {
        BettingConfig {
            bet_sizes: vec![0.5, 1.0],
            max_bets_per_street: [2, 2, 2, 2],
            allow_all_in: true,
            min_raise_size: 0.1,
            starting_stack: 100.0,
            pot_size: 10.0,
            max_tree_nodes: 1_000_000,
        }
    }
}

impl BettingConfig {
    pub fn validate(&self) -> SolverResult<()> {
        if self.bet_sizes.is_empty() {
            return Err(SolverError::InvalidConfig("bet_sizes is empty".to_string()));
        }
        if self.bet_sizes.iter().any(|&b| b <= 0.0 || !b.is_finite()) {
            return Err(SolverError::InvalidConfig(
                "bet_sizes must be positive fractions of pot".to_string(),
            ));
        }
        if self.min_raise_size <= 0.0 {
            return Err(SolverError::InvalidConfig(
                "min_raise_size must be positive".to_string(),
            ));
        }
        if self.starting_stack <= 0.0 {
            return Err(SolverError::InvalidConfig(
                "starting_stack must be positive".to_string(),
            ));
        }
        if self.pot_size <= 0.0 {
            return Err(SolverError::InvalidConfig(
                "pot_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Closed-form estimate of tree size: the product of per-street
    /// branching factors (actions per node raised to the street's bet cap)
    /// from `start` to the river.
    pub fn estimate_nodes(&self, start: Street) -> u64 {
        let branching = self.bet_sizes.len() as u64 + u64::from(self.allow_all_in) + 2;
        let mut total = 1u64;
        let mut street = Some(start);
        while let Some(s) = street {
            let cap = self.max_bets_per_street[s.index()];
            total = total.saturating_mul(branching.saturating_pow(cap));
            street = s.next();
        }
        total
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Fold,
    Check,
    Call,
    /// Chips added when opening the betting.
    Bet(f64),
    /// Chips added on top of the call when facing a bet.
    Raise(f64),
    AllIn,
}

impl Action {
    pub fn label(&self) -> String {
        match self {
            Action::Fold => "fold".to_string(),
            Action::Check => "check".to_string(),
            Action::Call => "call".to_string(),
            Action::Bet(amt) => format!("bet {:.0}", amt),
            Action::Raise(amt) => format!("raise {:.0}", amt),
            Action::AllIn => "allin".to_string(),
        }
    }

    fn history_bytes(&self) -> [u8; 5] {
        let (tag, amount) = match self {
            Action::Fold => (0u8, 0.0),
            Action::Check => (1, 0.0),
            Action::Call => (2, 0.0),
            Action::Bet(amt) => (3, *amt),
            Action::Raise(amt) => (4, *amt),
            Action::AllIn => (5, 0.0),
        };
        let amt = amount.round() as u32;
        let [a, b, c, d] = amt.to_le_bytes();
        [tag, a, b, c, d]
    }
}

/// Public state at an action node.
#[derive(Debug, Clone)]
pub struct GameState {
    pub street: Street,
    pub pot: f64,
    pub committed: [f64; 2],
    pub remaining: [f64; 2],
    pub to_act: usize,
    pub last_aggressor: Option<usize>,
    pub bet_count: u32,
    pub to_call: f64,
    checks_this_street: u8,
}

impl GameState {
    pub fn effective_stack(&self) -> f64 {
        self.remaining[0].min(self.remaining[1])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKind {
    Showdown,
    Fold { winner: usize },
}

pub type NodeId = u32;

#[derive(Debug)]
pub enum TreeNode {
    Action {
        state: GameState,
        actions: Vec<Action>,
        children: Vec<NodeId>,
        /// Canonical byte encoding of the action history at this node.
        history: Vec<u8>,
    },
    Chance {
        /// Street being dealt into.
        street: Street,
        pot: f64,
        committed: [f64; 2],
        remaining: [f64; 2],
        child: NodeId,
    },
    Terminal {
        kind: TerminalKind,
        pot: f64,
        committed: [f64; 2],
    },
}

pub struct GameTree {
    nodes: Vec<TreeNode>,
    root: NodeId,
    root_street: Street,
    config: BettingConfig,
}

impl GameTree {
    /// Build the full tree from `start` street. Fails with `TreeTooLarge`
    /// before allocating anything if the closed-form estimate exceeds the
    /// configured ceiling.
    pub fn build(start: Street, config: &BettingConfig) -> SolverResult<GameTree> {
        config.validate()?;

        let estimated = config.estimate_nodes(start);
        if estimated > config.max_tree_nodes {
            return Err(SolverError::TreeTooLarge {
                estimated,
                ceiling: config.max_tree_nodes,
            });
        }

        let mut builder = TreeBuilder {
            nodes: Vec::new(),
            config: config.clone(),
        };
        let root_state = GameState {
            street: start,
            pot: config.pot_size,
            committed: [0.0, 0.0],
            remaining: [config.starting_stack, config.starting_stack],
            to_act: 0,
            last_aggressor: None,
            bet_count: 0,
            to_call: 0.0,
            checks_this_street: 0,
        };
        let root = builder.build_action(root_state, Vec::new());

        Ok(GameTree {
            nodes: builder.nodes,
            root,
            root_street: start,
            config: config.clone(),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_street(&self) -> Street {
        self.root_street
    }

    pub fn config(&self) -> &BettingConfig {
        &self.config
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id as usize]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_terminal(&self, id: NodeId) -> bool {
        matches!(self.node(id), TreeNode::Terminal { .. })
    }

    pub fn is_chance(&self, id: NodeId) -> bool {
        matches!(self.node(id), TreeNode::Chance { .. })
    }

    pub fn acting_player(&self, id: NodeId) -> Option<usize> {
        match self.node(id) {
            TreeNode::Action { state, .. } => Some(state.to_act),
            _ => None,
        }
    }

    /// Edges out of an action node.
    pub fn edges(&self, id: NodeId) -> impl Iterator<Item = (&Action, NodeId)> {
        let (actions, children): (&[Action], &[NodeId]) = match self.node(id) {
            TreeNode::Action {
                actions, children, ..
            } => (actions, children),
            _ => (&[], &[]),
        };
        actions.iter().zip(children.iter().copied())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (i as NodeId, n))
    }

    /// Payoff for both players at a terminal, net of each player's own
    /// committed chips. Every terminal sums to the initial pot.
    pub fn terminal_payoff(
        &self,
        id: NodeId,
        combos: [Combo; 2],
        board: &[u8],
    ) -> SolverResult<[f64; 2]> {
        let (kind, pot, committed) = match self.node(id) {
            TreeNode::Terminal {
                kind,
                pot,
                committed,
            } => (*kind, *pot, *committed),
            _ => {
                return Err(SolverError::InternalInvariantViolated(
                    "terminal_payoff called on a non-terminal node".to_string(),
                ))
            }
        };

        match kind {
            TerminalKind::Fold { winner } => {
                let mut payoff = [0.0; 2];
                payoff[winner] = pot - committed[winner];
                payoff[1 - winner] = -committed[1 - winner];
                Ok(payoff)
            }
            TerminalKind::Showdown => {
                if board.len() != 5 {
                    return Err(SolverError::InternalInvariantViolated(format!(
                        "showdown with {} board cards",
                        board.len()
                    )));
                }
                let score = |c: Combo| {
                    let hand = [
                        c.lo, c.hi, board[0], board[1], board[2], board[3], board[4],
                    ];
                    crate::hand_evaluator::rank7(&hand)
                };
                let s0 = score(combos[0]);
                let s1 = score(combos[1]);
                let payoff = if s0 > s1 {
                    [pot - committed[0], -committed[1]]
                } else if s0 < s1 {
                    [-committed[0], pot - committed[1]]
                } else {
                    [pot / 2.0 - committed[0], pot / 2.0 - committed[1]]
                };
                Ok(payoff)
            }
        }
    }
}

struct TreeBuilder {
    nodes: Vec<TreeNode>,
    config: BettingConfig,
}

impl TreeBuilder {
    fn push(&mut self, node: TreeNode) -> NodeId {
        self.nodes.push(node);
        (self.nodes.len() - 1) as NodeId
    }

    fn build_action(&mut self, state: GameState, history: Vec<u8>) -> NodeId {
        let mut actions = Vec::new();
        let mut children = Vec::new();

        if state.to_call > CHIP_EPS {
            self.expand_facing_bet(&state, &history, &mut actions, &mut children);
        } else {
            self.expand_open(&state, &history, &mut actions, &mut children);
        }

        self.push(TreeNode::Action {
            state,
            actions,
            children,
            history,
        })
    }

    fn expand_open(
        &mut self,
        state: &GameState,
        history: &[u8],
        actions: &mut Vec<Action>,
        children: &mut Vec<NodeId>,
    ) {
        let i = state.to_act;
        let cap = self.config.max_bets_per_street[state.street.index()];

        // Check: second check of the street closes it.
        actions.push(Action::Check);
        if state.checks_this_street >= 1 {
            children.push(self.close_street(state.street, state.pot, state.committed, state.remaining, history, Action::Check));
        } else {
            let mut next = state.clone();
            next.to_act = 1 - i;
            next.checks_this_street += 1;
            children.push(self.build_action(next, extend_history(history, Action::Check)));
        }

        if state.bet_count >= cap {
            return;
        }

        // Bet sizes: round(fraction * pot), dropping non-positive amounts
        // and anything at or past the remaining stack.
        let candidates: Vec<f64> = self
            .config
            .bet_sizes
            .iter()
            .map(|&frac| (frac * state.pot).round())
            .filter(|&amt| amt > 0.0 && amt < state.remaining[i] - CHIP_EPS)
            .unique_by(|&amt| amt as u64)
            .collect();

        for &amt in &candidates {
            let action = Action::Bet(amt);
            let child = self.apply_aggression(state, amt, 0.0, history, action);
            actions.push(action);
            children.push(child);
        }

        if self.config.allow_all_in && state.remaining[i] > CHIP_EPS {
            let action = Action::AllIn;
            let child = self.apply_aggression(state, state.remaining[i], 0.0, history, action);
            actions.push(action);
            children.push(child);
        }
    }

    fn expand_facing_bet(
        &mut self,
        state: &GameState,
        history: &[u8],
        actions: &mut Vec<Action>,
        children: &mut Vec<NodeId>,
    ) {
        let i = state.to_act;
        let cap = self.config.max_bets_per_street[state.street.index()];

        actions.push(Action::Fold);
        children.push(self.push(TreeNode::Terminal {
            kind: TerminalKind::Fold { winner: 1 - i },
            pot: state.pot,
            committed: state.committed,
        }));

        // Call settles to match and closes the street.
        {
            let pay = state.to_call.min(state.remaining[i]);
            let mut committed = state.committed;
            let mut remaining = state.remaining;
            committed[i] += pay;
            remaining[i] -= pay;
            let pot = state.pot + pay;
            actions.push(Action::Call);
            children.push(self.close_street(state.street, pot, committed, remaining, history, Action::Call));
        }

        if state.bet_count >= cap {
            return;
        }

        // Raise increments: round(fraction * pot), elided when the
        // increment falls short of the minimum raise or would not leave a
        // genuine raise under the stack (the all-in covers that).
        let min_raise = self.config.min_raise_size * state.pot;
        let candidates: Vec<f64> = self
            .config
            .bet_sizes
            .iter()
            .map(|&frac| (frac * state.pot).round())
            .filter(|&amt| {
                amt > 0.0
                    && amt + CHIP_EPS >= min_raise
                    && state.to_call + amt < state.remaining[i] - CHIP_EPS
            })
            .unique_by(|&amt| amt as u64)
            .collect();

        for &amt in &candidates {
            let action = Action::Raise(amt);
            let child = self.apply_aggression(state, amt, state.to_call, history, action);
            actions.push(action);
            children.push(child);
        }

        if self.config.allow_all_in && state.remaining[i] - state.to_call > CHIP_EPS {
            let amt = state.remaining[i] - state.to_call;
            let action = Action::AllIn;
            let child = self.apply_aggression(state, amt, state.to_call, history, action);
            actions.push(action);
            children.push(child);
        }
    }

    /// Apply a bet, raise, or all-in: `increment` chips beyond `call`.
    fn apply_aggression(
        &mut self,
        state: &GameState,
        increment: f64,
        call: f64,
        history: &[u8],
        action: Action,
    ) -> NodeId {
        let i = state.to_act;
        let total = call + increment;

        let mut next = state.clone();
        next.committed[i] += total;
        next.remaining[i] -= total;
        next.pot += total;
        next.to_act = 1 - i;
        next.last_aggressor = Some(i);
        next.bet_count += 1;
        next.to_call = increment;

        self.build_action(next, extend_history(history, action))
    }

    /// Street closure: showdown on the river, otherwise a chance node into
    /// the next street. When both players are all-in the remaining streets
    /// chain through chance nodes straight to showdown.
    fn close_street(
        &mut self,
        street: Street,
        pot: f64,
        committed: [f64; 2],
        remaining: [f64; 2],
        history: &[u8],
        closing_action: Action,
    ) -> NodeId {
        let history = extend_history_marked(history, closing_action);

        let next_street = match street.next() {
            None => {
                return self.push(TreeNode::Terminal {
                    kind: TerminalKind::Showdown,
                    pot,
                    committed,
                })
            }
            Some(s) => s,
        };

        let all_in = remaining[0] < CHIP_EPS || remaining[1] < CHIP_EPS;
        let child = if all_in {
            self.close_street(next_street, pot, committed, remaining, &history, closing_action)
        } else {
            let next_state = GameState {
                street: next_street,
                pot,
                committed,
                remaining,
                to_act: 0,
                last_aggressor: None,
                bet_count: 0,
                to_call: 0.0,
                checks_this_street: 0,
            };
            self.build_action(next_state, history.clone())
        };

        self.push(TreeNode::Chance {
            street: next_street,
            pot,
            committed,
            remaining,
            child,
        })
    }
}

fn extend_history(history: &[u8], action: Action) -> Vec<u8> {
    let mut out = Vec::with_capacity(history.len() + 5);
    out.extend_from_slice(history);
    out.extend_from_slice(&action.history_bytes());
    out
}

/// History extension for a street-closing action, with a boundary marker
/// so encodings stay canonical across streets.
fn extend_history_marked(history: &[u8], action: Action) -> Vec<u8> {
    let mut out = extend_history(history, action);
    out.push(0xFE);
    out
}
