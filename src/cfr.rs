//! Chance-sampled external-sampling CFR.
//!
//! Each information set tracks cumulative regret per action and cumulative
//! strategy weights; the average strategy over all iterations converges to
//! a Nash equilibrium of the abstracted game. Infosets are keyed by a
//! canonical byte string: the action history encoding, the visible board
//! (fixed five bytes, 0xFF-padded), and the private combo id. The table is
//! a BTreeMap so that checkpoint sums and strategy readouts iterate in a
//! fixed order, keeping seeded single-threaded solves bit-reproducible.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::cards::{remaining_deck, Combo};
use crate::error::{SolverError, SolverResult};
use crate::game_tree::{GameTree, NodeId, TreeNode};
use crate::ranges::Range;

/// Attempts made to draw a non-colliding combo pair before aborting.
pub const COMBO_RESAMPLE_CAP: usize = 1000;

/// Cooperative cancellation flag, checked between iterations.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One information set's accumulated data.
#[derive(Debug, Clone)]
pub struct InfosetData {
    /// Cumulative regret per action; may go negative unless RM+ is on.
    pub regret_sum: Vec<f64>,
    /// Cumulative strategy weight per action.
    pub strategy_sum: Vec<f64>,
    /// Regret snapshot at the last convergence checkpoint.
    last_regret: Vec<f64>,
}

impl InfosetData {
    fn new(num_actions: usize) -> InfosetData {
        InfosetData {
            regret_sum: vec![0.0; num_actions],
            strategy_sum: vec![0.0; num_actions],
            last_regret: vec![0.0; num_actions],
        }
    }

    pub fn num_actions(&self) -> usize {
        self.regret_sum.len()
    }

    /// Current strategy via regret matching: proportional to positive
    /// regrets, uniform if none are positive.
    pub fn current_strategy(&self) -> Vec<f64> {
        let positive_sum: f64 = self.regret_sum.iter().map(|&r| r.max(0.0)).sum();
        if positive_sum > 0.0 {
            self.regret_sum
                .iter()
                .map(|&r| r.max(0.0) / positive_sum)
                .collect()
        } else {
            vec![1.0 / self.num_actions() as f64; self.num_actions()]
        }
    }

    /// Average strategy over all iterations — the equilibrium approximation.
    pub fn average_strategy(&self) -> Vec<f64> {
        let total: f64 = self.strategy_sum.iter().sum();
        if total > 0.0 {
            self.strategy_sum.iter().map(|&s| s / total).collect()
        } else {
            vec![1.0 / self.num_actions() as f64; self.num_actions()]
        }
    }
}

/// Canonical infoset key: history bytes, then the visible board padded to
/// five bytes, then the combo id.
fn infoset_key(history: &[u8], board: &[u8], combo: u16) -> Vec<u8> {
    let mut key = Vec::with_capacity(history.len() + 7);
    key.extend_from_slice(history);
    for i in 0..5 {
        key.push(board.get(i).copied().unwrap_or(0xFF));
    }
    key.extend_from_slice(&combo.to_le_bytes());
    key
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergencePoint {
    pub iteration: usize,
    pub convergence: f64,
    pub nodes_count: usize,
}

pub struct TrainOptions {
    pub iterations: usize,
    pub seed: u64,
    /// Convergence checkpoint interval, in iterations.
    pub check_interval: usize,
    /// Clip negative regrets at update time (regret matching plus).
    pub rm_plus: bool,
    pub time_limit: Option<Duration>,
    pub cancel: CancelToken,
}

impl Default for TrainOptions {
    fn default() -> Self {
        TrainOptions {
            iterations: 10_000,
            seed: 0,
            check_interval: 1000,
            rm_plus: false,
            time_limit: None,
            cancel: CancelToken::new(),
        }
    }
}

pub struct TrainOutcome {
    pub iterations_run: usize,
    pub convergence_history: Vec<ConvergencePoint>,
    pub final_convergence: f64,
    pub cancelled: bool,
}

/// The trainer owns all information set data for one solve.
pub struct CfrTrainer {
    infosets: BTreeMap<Vec<u8>, InfosetData>,
}

impl Default for CfrTrainer {
    fn default() -> Self {
        CfrTrainer::new()
    }
}

impl CfrTrainer {
    pub fn new() -> CfrTrainer {
        CfrTrainer {
            infosets: BTreeMap::new(),
        }
    }

    pub fn nodes_count(&self) -> usize {
        self.infosets.len()
    }

    /// Run the iteration driver: sample a combo per player, alternate the
    /// update player, and traverse. Cancellation and the wall-clock limit
    /// are honored between iterations; partial progress is kept.
    pub fn train(
        &mut self,
        tree: &GameTree,
        root_board: &[u8],
        ranges: [&Range; 2],
        opts: &TrainOptions,
    ) -> SolverResult<TrainOutcome> {
        let feasible = [ranges[0].feasible(root_board), ranges[1].feasible(root_board)];
        if feasible[0].is_empty() || feasible[1].is_empty() {
            return Err(SolverError::NoViableSample {
                attempts: COMBO_RESAMPLE_CAP,
            });
        }
        let dists = [
            WeightedIndex::new(feasible[0].iter().map(|(_, w)| *w))
                .expect("feasible weights are positive"),
            WeightedIndex::new(feasible[1].iter().map(|(_, w)| *w))
                .expect("feasible weights are positive"),
        ];

        let check_interval = opts.check_interval.max(1);
        let mut rng = StdRng::seed_from_u64(opts.seed);
        let started = Instant::now();
        let mut history = Vec::new();
        let mut board = root_board.to_vec();
        let mut cancelled = false;
        let mut iterations_run = 0usize;

        for iter in 0..opts.iterations {
            if opts.cancel.is_cancelled()
                || opts
                    .time_limit
                    .map_or(false, |limit| started.elapsed() >= limit)
            {
                cancelled = true;
                break;
            }

            let combos = sample_combo_pair(&feasible, &dists, &mut rng)?;
            let update_player = iter % 2;

            board.truncate(root_board.len());
            self.cfr(
                tree,
                tree.root(),
                combos,
                &mut board,
                [1.0, 1.0],
                update_player,
                opts.rm_plus,
                &mut rng,
            )?;
            iterations_run = iter + 1;

            if iterations_run % check_interval == 0 {
                let convergence = self.checkpoint();
                history.push(ConvergencePoint {
                    iteration: iterations_run,
                    convergence,
                    nodes_count: self.infosets.len(),
                });
            }
        }

        let final_convergence = history.last().map_or(f64::INFINITY, |p| p.convergence);
        Ok(TrainOutcome {
            iterations_run,
            convergence_history: history,
            final_convergence,
            cancelled,
        })
    }

    /// Exploitability proxy: L2 norm of the per-infoset regret delta since
    /// the previous checkpoint, normalized by infoset count.
    fn checkpoint(&mut self) -> f64 {
        if self.infosets.is_empty() {
            return f64::INFINITY;
        }
        let mut total = 0.0;
        for data in self.infosets.values_mut() {
            for (r, last) in data.regret_sum.iter().zip(data.last_regret.iter_mut()) {
                let delta = r - *last;
                total += delta * delta;
                *last = *r;
            }
        }
        total.sqrt() / self.infosets.len() as f64
    }

    #[allow(clippy::too_many_arguments)]
    fn cfr(
        &mut self,
        tree: &GameTree,
        node_id: NodeId,
        combos: [Combo; 2],
        board: &mut Vec<u8>,
        reach: [f64; 2],
        update_player: usize,
        rm_plus: bool,
        rng: &mut StdRng,
    ) -> SolverResult<[f64; 2]> {
        match tree.node(node_id) {
            TreeNode::Terminal { .. } => tree.terminal_payoff(node_id, combos, board),

            TreeNode::Chance { street, child, .. } => {
                let deal = street.cards_dealt();
                let dead = [
                    combos[0].lo,
                    combos[0].hi,
                    combos[1].lo,
                    combos[1].hi,
                ];
                let mut deck: Vec<u8> = remaining_deck(board)
                    .into_iter()
                    .filter(|c| !dead.contains(c))
                    .collect();
                for k in 0..deal {
                    let swap = rng.gen_range(k..deck.len());
                    deck.swap(k, swap);
                }
                let depth = board.len();
                board.extend_from_slice(&deck[..deal]);
                let utility =
                    self.cfr(tree, *child, combos, board, reach, update_player, rm_plus, rng);
                board.truncate(depth);
                utility
            }

            TreeNode::Action {
                state,
                children,
                history,
                actions,
            } => {
                let i = state.to_act;
                let num_actions = actions.len();
                let key = infoset_key(history, board, combos[i].id());

                let sigma = {
                    let data = self
                        .infosets
                        .entry(key.clone())
                        .or_insert_with(|| InfosetData::new(num_actions));
                    let sigma = data.current_strategy();
                    for (sum, s) in data.strategy_sum.iter_mut().zip(sigma.iter()) {
                        *sum += reach[i] * s;
                    }
                    sigma
                };

                if i == update_player {
                    // Explore every action; regret against the node value.
                    let mut action_utilities = vec![[0.0; 2]; num_actions];
                    let mut utility = [0.0; 2];
                    for a in 0..num_actions {
                        let mut child_reach = reach;
                        child_reach[i] *= sigma[a];
                        let u = self.cfr(
                            tree,
                            children[a],
                            combos,
                            board,
                            child_reach,
                            update_player,
                            rm_plus,
                            rng,
                        )?;
                        action_utilities[a] = u;
                        utility[0] += sigma[a] * u[0];
                        utility[1] += sigma[a] * u[1];
                    }

                    let data = self
                        .infosets
                        .get_mut(&key)
                        .expect("infoset created above");
                    for a in 0..num_actions {
                        let regret = action_utilities[a][i] - utility[i];
                        data.regret_sum[a] += reach[1 - i] * regret;
                        if rm_plus && data.regret_sum[a] < 0.0 {
                            data.regret_sum[a] = 0.0;
                        }
                    }

                    Ok(utility)
                } else {
                    // Sample a single action from the current strategy.
                    let child = children[sample_action(&sigma, rng)];
                    self.cfr(tree, child, combos, board, reach, update_player, rm_plus, rng)
                }
            }
        }
    }

    /// Average strategy for a specific infoset key, if it was ever visited.
    pub fn average_strategy(
        &self,
        history: &[u8],
        board: &[u8],
        combo: u16,
    ) -> Option<Vec<f64>> {
        self.infosets
            .get(&infoset_key(history, board, combo))
            .map(|d| d.average_strategy())
    }
}

fn sample_combo_pair(
    feasible: &[Vec<(Combo, f64)>; 2],
    dists: &[WeightedIndex<f64>; 2],
    rng: &mut StdRng,
) -> SolverResult<[Combo; 2]> {
    for _ in 0..COMBO_RESAMPLE_CAP {
        let c0 = feasible[0][dists[0].sample(rng)].0;
        let c1 = feasible[1][dists[1].sample(rng)].0;
        if !c0.overlaps(&c1) {
            return Ok([c0, c1]);
        }
    }
    Err(SolverError::NoViableSample {
        attempts: COMBO_RESAMPLE_CAP,
    })
}

fn sample_action(sigma: &[f64], rng: &mut StdRng) -> usize {
    let roll: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (a, &p) in sigma.iter().enumerate() {
        cumulative += p;
        if roll < cumulative {
            return a;
        }
    }
    sigma.len() - 1
}
