//! Strategy readout: turns trained infoset tables into per-hand-class
//! action frequencies, plus the board-level context (texture, equity vs
//! the opponent range) that accompanies them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::cfr::CfrTrainer;
use crate::equity::equity_vs_range;
use crate::game_tree::{Action, GameTree, NodeId, TreeNode};
use crate::ranges::Range;

/// Aggregated average strategy at one action node: hand class to
/// per-action frequency, weighted by the combo weights of the acting
/// player's range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStrategy {
    pub node: NodeId,
    pub player: usize,
    pub actions: Vec<String>,
    pub classes: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Average strategy per hand class at one public state (a node plus the
/// visible board). Classes never visited during training are omitted.
pub fn class_strategies(
    tree: &GameTree,
    trainer: &CfrTrainer,
    node: NodeId,
    board: &[u8],
    range: &Range,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let labels: Vec<String> = tree.edges(node).map(|(a, _)| a.label()).collect();
    let history = match tree.node(node) {
        TreeNode::Action { history, .. } => history.as_slice(),
        _ => return BTreeMap::new(),
    };

    let mut acc: BTreeMap<String, (f64, Vec<f64>)> = BTreeMap::new();
    for (combo, weight) in range.feasible(board) {
        if let Some(avg) = trainer.average_strategy(history, board, combo.id()) {
            let entry = acc
                .entry(combo.class())
                .or_insert_with(|| (0.0, vec![0.0; labels.len()]));
            entry.0 += weight;
            for (sum, p) in entry.1.iter_mut().zip(avg.iter()) {
                *sum += weight * p;
            }
        }
    }

    acc.into_iter()
        .map(|(class, (total, sums))| {
            let freqs = labels
                .iter()
                .zip(sums.iter())
                .map(|(label, &s)| (label.clone(), if total > 0.0 { s / total } else { 0.0 }))
                .collect();
            (class, freqs)
        })
        .collect()
}

/// The IP player's first decision point: the node reached when OOP opens
/// with a check.
pub fn ip_entry_node(tree: &GameTree) -> Option<NodeId> {
    tree.edges(tree.root())
        .find(|(a, _)| matches!(a, Action::Check))
        .map(|(_, child)| child)
}

/// Aggregated strategies for every action node on the root street (where
/// the visible board is fully determined by the request).
pub fn root_street_strategies(
    tree: &GameTree,
    trainer: &CfrTrainer,
    board: &[u8],
    ranges: [&Range; 2],
) -> Vec<NodeStrategy> {
    let mut out = Vec::new();
    for (id, node) in tree.nodes() {
        let state = match node {
            TreeNode::Action { state, .. } => state,
            _ => continue,
        };
        if state.street != tree.root_street() {
            continue;
        }
        let classes = class_strategies(tree, trainer, id, board, ranges[state.to_act]);
        if classes.is_empty() {
            continue;
        }
        out.push(NodeStrategy {
            node: id,
            player: state.to_act,
            actions: tree.edges(id).map(|(a, _)| a.label()).collect(),
            classes,
        });
    }
    out
}

/// Equity of each hand class in `range` against `opponent` on `board`,
/// estimated from one representative combo per class.
pub fn class_equities(
    range: &Range,
    opponent: &Range,
    board: &[u8],
    trials: usize,
    seed: u64,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (idx, (class, _)) in range.classes().into_iter().enumerate() {
        let rep = crate::cards::class_combos(&class)
            .ok()
            .and_then(|combos| {
                combos
                    .into_iter()
                    .find(|c| !board.iter().any(|&b| c.collides_with(b)))
            });
        let rep = match rep {
            Some(c) => c,
            None => continue,
        };
        let class_seed = seed.wrapping_add(idx as u64 * 7919);
        if let Ok(result) = equity_vs_range(rep, opponent, board, trials, class_seed) {
            out.insert(class, result.equity());
        }
    }
    out
}

/// High-level board texture tag, by inspection of ranks and suits.
pub fn board_texture(board: &[Card]) -> &'static str {
    if board.is_empty() {
        return "preflop";
    }

    let ranks: Vec<u8> = board.iter().map(|c| c.value()).collect();
    let mut unique_ranks = ranks.clone();
    unique_ranks.sort_unstable();
    unique_ranks.dedup();

    if unique_ranks.len() < ranks.len() {
        return "paired";
    }

    let mut suits: Vec<_> = board.iter().map(|c| c.suit).collect();
    suits.sort_unstable();
    suits.dedup();
    if suits.len() == 1 && board.len() >= 3 {
        return "monotone";
    }

    // Three ranks inside a five-rank window leave a straight in range.
    if unique_ranks.windows(3).any(|w| w[2] - w[0] <= 4) {
        return "connected";
    }

    if suits.len() == 2 {
        return "two-tone";
    }

    if ranks.iter().any(|&r| r >= 12) {
        return "high-card";
    }

    "dry"
}
