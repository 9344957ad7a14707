//! Solve orchestration and boundary types.
//!
//! The request/response pair here is the interface the transport layer
//! (whatever it is) encodes; everything in this module runs synchronously
//! on the caller's thread. All validation happens before the first CFR
//! iteration.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cards::{parse_card, Card};
use crate::cfr::{CancelToken, CfrTrainer, ConvergencePoint, TrainOptions};
use crate::error::{SolverError, SolverResult};
use crate::game_tree::{BettingConfig, GameTree, Street};
use crate::ranges::Range;
use crate::strategy;

const DEFAULT_MAX_BETS: u32 = 2;
const DEFAULT_MIN_RAISE: f64 = 0.1;
const DEFAULT_CLASS_EQUITY_TRIALS: usize = 2000;

fn default_bet_sizes() -> Vec<f64> {
    vec![0.5, 1.0]
}

fn default_true() -> bool {
    true
}

fn default_min_raise() -> f64 {
    DEFAULT_MIN_RAISE
}

/// Per-street bet caps as they arrive on the wire. Signed so that negative
/// values can be rejected rather than silently wrapped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreetCaps {
    pub preflop: i64,
    pub flop: i64,
    pub turn: i64,
    pub river: i64,
}

impl StreetCaps {
    fn get(&self, street: Street) -> i64 {
        match street {
            Street::Preflop => self.preflop,
            Street::Flop => self.flop,
            Street::Turn => self.turn,
            Street::River => self.river,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveRequest {
    pub oop_range: String,
    pub ip_range: String,
    pub starting_stack: f64,
    pub pot_size: f64,
    #[serde(default)]
    pub board_cards: Vec<String>,
    pub street: String,
    pub iterations: usize,
    #[serde(default = "default_bet_sizes")]
    pub bet_sizes: Vec<f64>,
    #[serde(default)]
    pub max_bets_per_street: Option<StreetCaps>,
    /// Legacy uniform cap, used for any street not covered above.
    #[serde(default)]
    pub max_bets: Option<i64>,
    #[serde(default = "default_true")]
    pub allow_all_in: bool,
    #[serde(default = "default_min_raise")]
    pub min_raise_size: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub equity_trials: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveResponse {
    pub oop_strategy: BTreeMap<String, BTreeMap<String, f64>>,
    pub ip_strategy: BTreeMap<String, BTreeMap<String, f64>>,
    pub oop_equity: BTreeMap<String, f64>,
    pub ip_equity: BTreeMap<String, f64>,
    pub training_iterations: usize,
    pub computation_time_seconds: f64,
    pub nodes_count: usize,
    pub final_convergence: f64,
    pub convergence_history: Vec<ConvergencePoint>,
    pub board_texture: String,
    pub bet_sizes_used: Vec<f64>,
    pub max_bets_per_street: BTreeMap<String, u32>,
}

/// Runtime knobs that are not part of the request payload.
pub struct SolveControls {
    pub cancel: CancelToken,
    pub time_limit: Option<Duration>,
    pub check_interval: usize,
    pub rm_plus: bool,
    pub max_tree_nodes: u64,
}

impl Default for SolveControls {
    fn default() -> Self {
        SolveControls {
            cancel: CancelToken::new(),
            time_limit: None,
            check_interval: 1000,
            rm_plus: false,
            max_tree_nodes: 1_000_000,
        }
    }
}

/// A request parsed and validated into solver-native types.
struct ParsedRequest {
    oop_range: Range,
    ip_range: Range,
    street: Street,
    board: Vec<Card>,
    board_ids: Vec<u8>,
    config: BettingConfig,
}

fn resolve_caps(request: &SolveRequest) -> SolverResult<[u32; 4]> {
    let fallback = match request.max_bets {
        Some(n) if n < 0 => {
            return Err(SolverError::InvalidConfig(
                "max_bets must be non-negative".to_string(),
            ))
        }
        Some(n) => n as u32,
        None => DEFAULT_MAX_BETS,
    };

    let mut caps = [fallback; 4];
    if let Some(per_street) = &request.max_bets_per_street {
        for street in Street::ALL {
            let cap = per_street.get(street);
            if cap < 0 {
                return Err(SolverError::InvalidConfig(format!(
                    "max_bets_per_street.{} must be non-negative",
                    street.as_str()
                )));
            }
            caps[street.index()] = cap as u32;
        }
    }
    Ok(caps)
}

fn parse_request(request: &SolveRequest, controls: &SolveControls) -> SolverResult<ParsedRequest> {
    let oop_range = Range::parse(&request.oop_range)?;
    let ip_range = Range::parse(&request.ip_range)?;
    if oop_range.is_empty() {
        return Err(SolverError::InvalidConfig("OOP range is empty".to_string()));
    }
    if ip_range.is_empty() {
        return Err(SolverError::InvalidConfig("IP range is empty".to_string()));
    }

    let street = Street::from_str(&request.street)?;
    let board: Vec<Card> = request
        .board_cards
        .iter()
        .map(|s| parse_card(s))
        .collect::<SolverResult<_>>()?;
    if board.len() != street.board_len() {
        return Err(SolverError::InvalidConfig(format!(
            "{} board must have {} cards, got {}",
            street.as_str(),
            street.board_len(),
            board.len()
        )));
    }
    let board_ids: Vec<u8> = board.iter().map(|c| c.index()).collect();
    let mut sorted = board_ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != board_ids.len() {
        return Err(SolverError::InvalidConfig(
            "duplicate board card".to_string(),
        ));
    }

    if request.iterations == 0 {
        return Err(SolverError::InvalidConfig(
            "iterations must be positive".to_string(),
        ));
    }

    let config = BettingConfig {
        bet_sizes: request.bet_sizes.clone(),
        max_bets_per_street: resolve_caps(request)?,
        allow_all_in: request.allow_all_in,
        min_raise_size: request.min_raise_size,
        starting_stack: request.starting_stack,
        pot_size: request.pot_size,
        max_tree_nodes: controls.max_tree_nodes,
    };
    config.validate()?;

    Ok(ParsedRequest {
        oop_range,
        ip_range,
        street,
        board,
        board_ids,
        config,
    })
}

/// Run a full solve. On cancellation or timeout the partial result rides
/// in the `Cancelled` error.
pub fn solve(request: &SolveRequest) -> SolverResult<SolveResponse> {
    solve_with(request, &SolveControls::default())
}

pub fn solve_with(
    request: &SolveRequest,
    controls: &SolveControls,
) -> SolverResult<SolveResponse> {
    let started = Instant::now();
    let parsed = parse_request(request, controls)?;
    let tree = GameTree::build(parsed.street, &parsed.config)?;

    let seed = request.seed.unwrap_or(0);
    let opts = TrainOptions {
        iterations: request.iterations,
        seed,
        check_interval: controls.check_interval,
        rm_plus: controls.rm_plus,
        time_limit: controls.time_limit,
        cancel: controls.cancel.clone(),
    };

    let mut trainer = CfrTrainer::new();
    let outcome = trainer.train(
        &tree,
        &parsed.board_ids,
        [&parsed.oop_range, &parsed.ip_range],
        &opts,
    )?;

    let equity_trials = request
        .equity_trials
        .unwrap_or(DEFAULT_CLASS_EQUITY_TRIALS);

    let oop_strategy = strategy::class_strategies(
        &tree,
        &trainer,
        tree.root(),
        &parsed.board_ids,
        &parsed.oop_range,
    );
    let ip_strategy = match strategy::ip_entry_node(&tree) {
        Some(node) => strategy::class_strategies(
            &tree,
            &trainer,
            node,
            &parsed.board_ids,
            &parsed.ip_range,
        ),
        None => BTreeMap::new(),
    };

    let oop_equity = strategy::class_equities(
        &parsed.oop_range,
        &parsed.ip_range,
        &parsed.board_ids,
        equity_trials,
        seed,
    );
    let ip_equity = strategy::class_equities(
        &parsed.ip_range,
        &parsed.oop_range,
        &parsed.board_ids,
        equity_trials,
        seed.wrapping_add(1),
    );

    let max_bets_per_street = Street::ALL
        .iter()
        .map(|s| {
            (
                s.as_str().to_string(),
                parsed.config.max_bets_per_street[s.index()],
            )
        })
        .collect();

    let response = SolveResponse {
        oop_strategy,
        ip_strategy,
        oop_equity,
        ip_equity,
        training_iterations: outcome.iterations_run,
        computation_time_seconds: started.elapsed().as_secs_f64(),
        nodes_count: trainer.nodes_count(),
        final_convergence: outcome.final_convergence,
        convergence_history: outcome.convergence_history,
        board_texture: strategy::board_texture(&parsed.board).to_string(),
        bet_sizes_used: parsed.config.bet_sizes.clone(),
        max_bets_per_street,
    };

    if outcome.cancelled {
        return Err(SolverError::Cancelled {
            partial: Box::new(response),
        });
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// Config validation call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    #[serde(default = "default_bet_sizes")]
    pub bet_sizes: Vec<f64>,
    #[serde(default)]
    pub max_bets_per_street: Option<StreetCaps>,
    #[serde(default)]
    pub max_bets: Option<i64>,
    #[serde(default = "default_true")]
    pub allow_all_in: bool,
    #[serde(default = "default_min_raise")]
    pub min_raise_size: f64,
    pub starting_stack: f64,
    pub pot_size: f64,
    /// Street the solve would start from; defaults to preflop.
    #[serde(default)]
    pub street: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigReport {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub estimated_nodes: u64,
    pub estimated_training_time_seconds: f64,
    pub recommended_iterations: usize,
}

/// Validate the betting subset of a solve request and estimate the cost of
/// running it. Malformed configs report `is_valid: false` rather than
/// erroring, so the caller can surface every problem at once.
pub fn validate_config(request: &ValidateRequest) -> SolverResult<ConfigReport> {
    let mut warnings = Vec::new();

    let street = match &request.street {
        Some(s) => Street::from_str(s)?,
        None => Street::Preflop,
    };

    let solve_shape = SolveRequest {
        oop_range: String::new(),
        ip_range: String::new(),
        starting_stack: request.starting_stack,
        pot_size: request.pot_size,
        board_cards: Vec::new(),
        street: street.as_str().to_string(),
        iterations: 1,
        bet_sizes: request.bet_sizes.clone(),
        max_bets_per_street: request.max_bets_per_street,
        max_bets: request.max_bets,
        allow_all_in: request.allow_all_in,
        min_raise_size: request.min_raise_size,
        seed: None,
        equity_trials: None,
    };

    let controls = SolveControls::default();
    let caps = match resolve_caps(&solve_shape) {
        Ok(caps) => caps,
        Err(e) => {
            return Ok(ConfigReport {
                is_valid: false,
                warnings: vec![e.to_string()],
                estimated_nodes: 0,
                estimated_training_time_seconds: 0.0,
                recommended_iterations: 0,
            })
        }
    };

    let config = BettingConfig {
        bet_sizes: request.bet_sizes.clone(),
        max_bets_per_street: caps,
        allow_all_in: request.allow_all_in,
        min_raise_size: request.min_raise_size,
        starting_stack: request.starting_stack,
        pot_size: request.pot_size,
        max_tree_nodes: controls.max_tree_nodes,
    };
    if let Err(e) = config.validate() {
        return Ok(ConfigReport {
            is_valid: false,
            warnings: vec![e.to_string()],
            estimated_nodes: 0,
            estimated_training_time_seconds: 0.0,
            recommended_iterations: 0,
        });
    }

    if request.bet_sizes.len() > 10 {
        warnings.push("Too many bet sizes may slow down training".to_string());
    }
    let total_caps: u32 = caps.iter().sum();
    if total_caps > 10 {
        warnings.push("High total max bets may create very large game trees".to_string());
    }

    let estimated_nodes = config.estimate_nodes(street);
    let is_valid = if estimated_nodes > config.max_tree_nodes {
        warnings.push(format!(
            "Estimated {} nodes exceeds the {} node ceiling",
            estimated_nodes, config.max_tree_nodes
        ));
        false
    } else {
        true
    };

    let recommended_iterations = if estimated_nodes > 500_000 {
        500_000
    } else if estimated_nodes > 100_000 {
        200_000
    } else {
        100_000
    };

    Ok(ConfigReport {
        is_valid,
        warnings,
        estimated_nodes,
        estimated_training_time_seconds: estimated_nodes as f64 / 50_000.0,
        recommended_iterations,
    })
}

// ---------------------------------------------------------------------------
// Health call
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

pub fn health() -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
