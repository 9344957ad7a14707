//! End-to-end solver scenarios: known-equilibrium spots, determinism,
//! cancellation, and the pre-solve validation gates.

use std::time::Duration;

use gto_solver::cards::parse_board;
use gto_solver::cfr::{CancelToken, CfrTrainer, TrainOptions};
use gto_solver::game_tree::{Action, BettingConfig, GameTree, Street};
use gto_solver::ranges::Range;
use gto_solver::solver::{
    health, solve, solve_with, validate_config, SolveControls, SolveRequest, ValidateRequest,
};
use gto_solver::strategy;
use gto_solver::SolverError;

fn base_request(oop: &str, ip: &str) -> SolveRequest {
    SolveRequest {
        oop_range: oop.to_string(),
        ip_range: ip.to_string(),
        starting_stack: 100.0,
        pot_size: 10.0,
        board_cards: Vec::new(),
        street: "preflop".to_string(),
        iterations: 20_000,
        bet_sizes: vec![1.0],
        max_bets_per_street: None,
        max_bets: Some(1),
        allow_all_in: true,
        min_raise_size: 0.1,
        seed: Some(7),
        equity_trials: Some(500),
    }
}

fn board_ids(s: &str) -> Vec<u8> {
    parse_board(s).unwrap().iter().map(|c| c.index()).collect()
}

// ---------------------------------------------------------------------------
// Preflop all-in math
// ---------------------------------------------------------------------------

#[test]
fn aa_vs_aa_always_calls_the_shove() {
    let config = BettingConfig {
        bet_sizes: vec![1.0],
        max_bets_per_street: [1, 1, 1, 1],
        allow_all_in: true,
        min_raise_size: 0.1,
        starting_stack: 100.0,
        pot_size: 1.5,
        max_tree_nodes: 1_000_000,
    };
    let tree = GameTree::build(Street::Preflop, &config).unwrap();
    let aa = Range::parse("AA").unwrap();

    let mut trainer = CfrTrainer::new();
    trainer
        .train(
            &tree,
            &[],
            [&aa, &aa],
            &TrainOptions {
                iterations: 20_000,
                seed: 11,
                ..TrainOptions::default()
            },
        )
        .unwrap();

    // IP facing the open shove.
    let shove_node = tree
        .edges(tree.root())
        .find(|(a, _)| matches!(a, Action::AllIn))
        .map(|(_, c)| c)
        .unwrap();
    let ip_strat = strategy::class_strategies(&tree, &trainer, shove_node, &[], &aa);
    let aa_row = &ip_strat["AA"];
    assert!(aa_row["call"] > 0.98, "call freq {:.3}", aa_row["call"]);
    assert!(aa_row["fold"] < 0.02, "fold freq {:.3}", aa_row["fold"]);

    // OOP facing a shove after checking.
    let check_node = strategy::ip_entry_node(&tree).unwrap();
    let shove_after_check = tree
        .edges(check_node)
        .find(|(a, _)| matches!(a, Action::AllIn));
    if let Some((_, oop_facing)) = shove_after_check {
        let oop_strat = strategy::class_strategies(&tree, &trainer, oop_facing, &[], &aa);
        let row = &oop_strat["AA"];
        assert!(row["call"] > 0.98, "call freq {:.3}", row["call"]);
    }
}

// ---------------------------------------------------------------------------
// Trivial fold
// ---------------------------------------------------------------------------

#[test]
fn dominated_hand_folds_to_the_bet() {
    let config = BettingConfig {
        bet_sizes: vec![1.0],
        max_bets_per_street: [1, 1, 1, 1],
        allow_all_in: false,
        min_raise_size: 0.1,
        starting_stack: 100.0,
        pot_size: 10.0,
        max_tree_nodes: 1_000_000,
    };
    let tree = GameTree::build(Street::Preflop, &config).unwrap();
    let oop = Range::parse("72o").unwrap();
    let ip = Range::parse("AA").unwrap();

    let mut trainer = CfrTrainer::new();
    trainer
        .train(
            &tree,
            &[],
            [&oop, &ip],
            &TrainOptions {
                iterations: 20_000,
                seed: 3,
                ..TrainOptions::default()
            },
        )
        .unwrap();

    // IP bets the nuts-heavy range after the check.
    let ip_node = strategy::ip_entry_node(&tree).unwrap();
    let ip_strat = strategy::class_strategies(&tree, &trainer, ip_node, &[], &ip);
    let aa_row = &ip_strat["AA"];
    assert!(aa_row["bet 10"] > 0.9, "bet freq {:.3}", aa_row["bet 10"]);

    // OOP folds 72o when facing that bet.
    let facing = tree
        .edges(ip_node)
        .find(|(a, _)| matches!(a, Action::Bet(_)))
        .map(|(_, c)| c)
        .unwrap();
    let oop_strat = strategy::class_strategies(&tree, &trainer, facing, &[], &oop);
    let row = &oop_strat["72o"];
    assert!(row["fold"] > 0.9, "fold freq {:.3}", row["fold"]);
}

// ---------------------------------------------------------------------------
// River value betting
// ---------------------------------------------------------------------------

#[test]
fn nut_hand_bets_the_river_and_bluff_catchers_fold_to_it() {
    let config = BettingConfig {
        bet_sizes: vec![1.0],
        max_bets_per_street: [1, 1, 1, 1],
        allow_all_in: false,
        min_raise_size: 0.1,
        starting_stack: 100.0,
        pot_size: 10.0,
        max_tree_nodes: 1_000_000,
    };
    let tree = GameTree::build(Street::River, &config).unwrap();
    let board = board_ids("AsKdQc7h2s");
    let oop = Range::parse("KK,QQ,JJ").unwrap();
    let ip = Range::parse("AA").unwrap();

    let mut trainer = CfrTrainer::new();
    trainer
        .train(
            &tree,
            &board,
            [&oop, &ip],
            &TrainOptions {
                iterations: 30_000,
                seed: 5,
                ..TrainOptions::default()
            },
        )
        .unwrap();

    // IP holds top set (the nuts against this range) and bets it.
    let ip_node = strategy::ip_entry_node(&tree).unwrap();
    let ip_strat = strategy::class_strategies(&tree, &trainer, ip_node, &board, &ip);
    let aa_row = &ip_strat["AA"];
    assert!(aa_row["bet 10"] > 0.9, "bet freq {:.3}", aa_row["bet 10"]);

    // Facing a range that is never bluffing, the underpair folds.
    let facing = tree
        .edges(ip_node)
        .find(|(a, _)| matches!(a, Action::Bet(_)))
        .map(|(_, c)| c)
        .unwrap();
    let oop_strat = strategy::class_strategies(&tree, &trainer, facing, &board, &oop);
    let jj_row = &oop_strat["JJ"];
    assert!(jj_row["fold"] > 0.7, "fold freq {:.3}", jj_row["fold"]);
}

#[test]
fn per_node_readout_covers_the_root_street() {
    let config = BettingConfig {
        bet_sizes: vec![1.0],
        max_bets_per_street: [1, 1, 1, 1],
        allow_all_in: false,
        min_raise_size: 0.1,
        starting_stack: 100.0,
        pot_size: 10.0,
        max_tree_nodes: 1_000_000,
    };
    let tree = GameTree::build(Street::River, &config).unwrap();
    let board = board_ids("AsKdQc7h2s");
    let oop = Range::parse("KK,QQ").unwrap();
    let ip = Range::parse("AA,JJ").unwrap();

    let mut trainer = CfrTrainer::new();
    trainer
        .train(
            &tree,
            &board,
            [&oop, &ip],
            &TrainOptions {
                iterations: 5000,
                seed: 1,
                ..TrainOptions::default()
            },
        )
        .unwrap();

    let nodes = strategy::root_street_strategies(&tree, &trainer, &board, [&oop, &ip]);
    assert!(nodes.len() >= 2, "expected several visited action nodes");
    assert!(nodes.iter().any(|n| n.player == 0));
    assert!(nodes.iter().any(|n| n.player == 1));
    for node in &nodes {
        for (class, freqs) in &node.classes {
            assert_eq!(freqs.len(), node.actions.len());
            let total: f64 = freqs.values().sum();
            assert!(
                (total - 1.0).abs() < 1e-9,
                "node {} class {} sums to {}",
                node.node,
                class,
                total
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy validity
// ---------------------------------------------------------------------------

#[test]
fn reported_strategies_are_distributions() {
    let request = base_request("AA,KK,QQ", "AA,KK,QQ");
    let response = solve(&request).unwrap();

    assert!(response.nodes_count > 0);
    assert!(response.training_iterations == request.iterations);

    for (position, strategies) in [
        ("oop", &response.oop_strategy),
        ("ip", &response.ip_strategy),
    ] {
        assert!(!strategies.is_empty(), "{} strategy empty", position);
        for (class, row) in strategies {
            let total: f64 = row.values().sum();
            assert!(
                (total - 1.0).abs() < 1e-9,
                "{} {} sums to {}",
                position,
                class,
                total
            );
            for (action, &p) in row {
                assert!(
                    (0.0..=1.0).contains(&p),
                    "{} {} {} = {}",
                    position,
                    class,
                    action,
                    p
                );
            }
        }
    }
}

#[test]
fn response_carries_board_context() {
    let mut request = base_request("AA", "KK");
    request.street = "flop".to_string();
    request.board_cards = vec!["Ks".to_string(), "9s".to_string(), "2s".to_string()];
    request.iterations = 2000;
    let response = solve(&request).unwrap();

    assert_eq!(response.board_texture, "monotone");
    assert_eq!(response.bet_sizes_used, vec![1.0]);
    assert_eq!(response.max_bets_per_street["flop"], 1);
    assert!(response.oop_equity.contains_key("AA"));
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn identical_seeds_reproduce_the_solve() {
    let request = base_request("AA-QQ", "AA-QQ");
    let a = solve(&request).unwrap();
    let b = solve(&request).unwrap();

    assert_eq!(a.convergence_history.len(), b.convergence_history.len());
    for (pa, pb) in a.convergence_history.iter().zip(&b.convergence_history) {
        assert_eq!(pa.iteration, pb.iteration);
        assert_eq!(pa.convergence.to_bits(), pb.convergence.to_bits());
        assert_eq!(pa.nodes_count, pb.nodes_count);
    }

    let strat_a = serde_json::to_string(&(&a.oop_strategy, &a.ip_strategy)).unwrap();
    let strat_b = serde_json::to_string(&(&b.oop_strategy, &b.ip_strategy)).unwrap();
    assert_eq!(strat_a, strat_b);

    let eq_a = serde_json::to_string(&(&a.oop_equity, &a.ip_equity)).unwrap();
    let eq_b = serde_json::to_string(&(&b.oop_equity, &b.ip_equity)).unwrap();
    assert_eq!(eq_a, eq_b);
}

#[test]
fn different_seeds_explore_differently() {
    let mut request = base_request("AA-TT,AKs,AKo", "AA-TT,AKs,AKo");
    request.iterations = 3000;
    let a = solve(&request).unwrap();
    request.seed = Some(999);
    let b = solve(&request).unwrap();

    // Same spot, different sampling order: histories should differ.
    let differs = a
        .convergence_history
        .iter()
        .zip(&b.convergence_history)
        .any(|(pa, pb)| pa.convergence.to_bits() != pb.convergence.to_bits());
    assert!(differs);
}

// ---------------------------------------------------------------------------
// Cancellation and timeout
// ---------------------------------------------------------------------------

#[test]
fn cancellation_returns_partial_result() {
    let request = base_request("AA", "KK");
    let controls = SolveControls::default();
    controls.cancel.cancel();

    match solve_with(&request, &controls) {
        Err(SolverError::Cancelled { partial }) => {
            assert_eq!(partial.training_iterations, 0);
        }
        other => panic!(
            "expected Cancelled, got {:?}",
            other.map(|r| r.training_iterations)
        ),
    }
}

#[test]
fn zero_timeout_behaves_like_cancellation() {
    let request = base_request("AA", "KK");
    let controls = SolveControls {
        time_limit: Some(Duration::from_secs(0)),
        ..SolveControls::default()
    };
    assert!(matches!(
        solve_with(&request, &controls),
        Err(SolverError::Cancelled { .. })
    ));
}

#[test]
fn cancel_token_is_shared_across_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    token.cancel();
    assert!(clone.is_cancelled());
}

// ---------------------------------------------------------------------------
// Validation gates
// ---------------------------------------------------------------------------

#[test]
fn solve_rejects_board_street_mismatch() {
    let mut request = base_request("AA", "KK");
    request.street = "flop".to_string(); // no board cards supplied
    assert!(matches!(
        solve(&request),
        Err(SolverError::InvalidConfig(_))
    ));
}

#[test]
fn solve_rejects_bad_parameters() {
    let mut request = base_request("AA", "KK");
    request.pot_size = 0.0;
    assert!(matches!(solve(&request), Err(SolverError::InvalidConfig(_))));

    let mut request = base_request("AA", "KK");
    request.bet_sizes = vec![];
    assert!(matches!(solve(&request), Err(SolverError::InvalidConfig(_))));

    let mut request = base_request("AA", "KK");
    request.max_bets = Some(-1);
    assert!(matches!(solve(&request), Err(SolverError::InvalidConfig(_))));

    let mut request = base_request("AA", "KK");
    request.min_raise_size = 0.0;
    assert!(matches!(solve(&request), Err(SolverError::InvalidConfig(_))));

    let mut request = base_request("AA", "KK");
    request.oop_range = "ZZ".to_string();
    assert!(matches!(solve(&request), Err(SolverError::ParseError { .. })));
}

#[test]
fn solve_rejects_oversized_trees_before_iterating() {
    let mut request = base_request("AA", "KK");
    request.bet_sizes = vec![0.25, 0.33, 0.5, 0.67, 0.75, 1.0, 1.5, 2.0];
    request.max_bets = Some(4);
    assert!(matches!(
        solve(&request),
        Err(SolverError::TreeTooLarge { .. })
    ));
}

#[test]
fn fully_blocked_matchup_is_no_viable_sample() {
    let mut request = base_request("AsAh", "AsAh");
    request.iterations = 10;
    assert!(matches!(
        solve(&request),
        Err(SolverError::NoViableSample { .. })
    ));
}

#[test]
fn validate_config_estimates_and_warns() {
    let ok = ValidateRequest {
        bet_sizes: vec![0.5, 1.0],
        max_bets_per_street: None,
        max_bets: Some(2),
        allow_all_in: true,
        min_raise_size: 0.1,
        starting_stack: 100.0,
        pot_size: 10.0,
        street: None,
    };
    let report = validate_config(&ok).unwrap();
    assert!(report.is_valid);
    assert!(report.estimated_nodes > 0);
    assert!(report.recommended_iterations > 0);

    let oversized = ValidateRequest {
        bet_sizes: vec![0.25, 0.33, 0.5, 0.67, 0.75, 1.0, 1.5, 2.0],
        max_bets: Some(4),
        ..ok.clone()
    };
    let report = validate_config(&oversized).unwrap();
    assert!(!report.is_valid);
    assert!(!report.warnings.is_empty());

    let broken = ValidateRequest {
        bet_sizes: vec![],
        ..ok.clone()
    };
    let report = validate_config(&broken).unwrap();
    assert!(!report.is_valid);
}

#[test]
fn health_reports_version() {
    let status = health();
    assert_eq!(status.status, "healthy");
    assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
}
