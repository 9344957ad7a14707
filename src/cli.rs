use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::cards::{parse_board, Combo};
use crate::display::{
    board_display, config_report_table, convergence_summary, equity_table, print_error,
    strategy_table,
};
use crate::equity::{equity_vs_range, DEFAULT_EQUITY_TRIALS};
use crate::error::SolverError;
use crate::ranges::Range;
use crate::solver::{
    self, SolveControls, SolveRequest, SolveResponse, StreetCaps, ValidateRequest,
};

#[derive(Parser)]
#[command(
    name = "gto-solver",
    version,
    about = "Heads-up NLHE GTO solver — CFR over a configurable betting tree."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a heads-up spot and print the averaged strategies
    Solve {
        /// OOP range (e.g., "AA-99,AKs,AKo")
        oop_range: String,
        /// IP range
        ip_range: String,
        /// Board cards (e.g., "AsKd5c"); empty for preflop
        #[arg(short, long, default_value = "")]
        board: String,
        /// Street the solve starts on
        #[arg(short, long, default_value = "preflop")]
        street: String,
        /// Starting stack behind for each player
        #[arg(long, default_value = "100")]
        stack: f64,
        /// Pot at the root
        #[arg(long, default_value = "10")]
        pot: f64,
        /// CFR iterations
        #[arg(short = 'n', long, default_value = "50000")]
        iterations: usize,
        /// Bet sizes as fractions of pot
        #[arg(long, value_delimiter = ',', default_value = "0.5,1.0")]
        bet_sizes: Vec<f64>,
        /// Cap on bets/raises per street (uniform)
        #[arg(long, default_value = "2")]
        max_bets: i64,
        /// Disable the all-in action
        #[arg(long)]
        no_all_in: bool,
        /// Minimum raise as a fraction of pot
        #[arg(long, default_value = "0.1")]
        min_raise: f64,
        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
        /// Wall-clock limit in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Emit the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Monte-Carlo equity of a hand vs a range
    Equity {
        /// Hero hand as two cards (e.g., AhAs)
        hand: String,
        /// Villain range (e.g., "QQ+,AKs")
        range: String,
        /// Board cards
        #[arg(short, long, default_value = "")]
        board: String,
        /// Number of trials
        #[arg(short = 'n', long, default_value_t = DEFAULT_EQUITY_TRIALS)]
        trials: usize,
        /// RNG seed
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Validate a betting config and estimate solve cost
    Validate {
        #[arg(long, value_delimiter = ',', default_value = "0.5,1.0")]
        bet_sizes: Vec<f64>,
        #[arg(long, default_value = "2")]
        max_bets: i64,
        #[arg(long, default_value = "100")]
        stack: f64,
        #[arg(long, default_value = "10")]
        pot: f64,
        #[arg(long, default_value = "preflop")]
        street: String,
        #[arg(long)]
        json: bool,
    },
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli.command) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<(), SolverError> {
    match command {
        Commands::Solve {
            oop_range,
            ip_range,
            board,
            street,
            stack,
            pot,
            iterations,
            bet_sizes,
            max_bets,
            no_all_in,
            min_raise,
            seed,
            timeout,
            json,
        } => {
            let board_cards: Vec<String> = parse_board(&board)?
                .iter()
                .map(|c| c.to_string())
                .collect();
            let request = SolveRequest {
                oop_range,
                ip_range,
                starting_stack: stack,
                pot_size: pot,
                board_cards,
                street,
                iterations,
                bet_sizes,
                max_bets_per_street: None::<StreetCaps>,
                max_bets: Some(max_bets),
                allow_all_in: !no_all_in,
                min_raise_size: min_raise,
                seed,
                equity_trials: None,
            };
            let controls = SolveControls {
                time_limit: timeout.map(Duration::from_secs),
                ..SolveControls::default()
            };
            match solver::solve_with(&request, &controls) {
                Ok(response) => print_solution(&request, &response, false, json)?,
                Err(SolverError::Cancelled { partial }) => {
                    print_solution(&request, &partial, true, json)?
                }
                Err(e) => return Err(e),
            }
            Ok(())
        }

        Commands::Equity {
            hand,
            range,
            board,
            trials,
            seed,
        } => {
            let hero_cards = parse_board(&hand)?;
            if hero_cards.len() != 2 {
                return Err(SolverError::parse(hand, 0));
            }
            let hero = Combo::from_cards(hero_cards[0], hero_cards[1]);
            let villain = Range::parse(&range)?;
            let board_ids: Vec<u8> = parse_board(&board)?.iter().map(|c| c.index()).collect();
            let result = equity_vs_range(hero, &villain, &board_ids, trials, seed)?;
            println!();
            println!(
                "  {} vs {}  |  Board: {}",
                hero.to_string().bold(),
                range.bold(),
                board_display(&parse_board(&board)?),
            );
            println!("  {}", result);
            println!();
            Ok(())
        }

        Commands::Validate {
            bet_sizes,
            max_bets,
            stack,
            pot,
            street,
            json,
        } => {
            let request = ValidateRequest {
                bet_sizes,
                max_bets_per_street: None,
                max_bets: Some(max_bets),
                allow_all_in: true,
                min_raise_size: 0.1,
                starting_stack: stack,
                pot_size: pot,
                street: Some(street),
            };
            let report = solver::validate_config(&request)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", config_report_table(&report));
                for warning in &report.warnings {
                    println!("  {} {}", "warning:".yellow().bold(), warning);
                }
            }
            Ok(())
        }
    }
}

fn print_solution(
    request: &SolveRequest,
    response: &SolveResponse,
    partial: bool,
    json: bool,
) -> Result<(), SolverError> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    let board = parse_board(&request.board_cards.join(""))?;
    println!();
    println!(
        "  {} {}  |  Board: {} ({})  |  Pot: {:.0}  |  Stack: {:.0}",
        "GTO".bold(),
        if partial {
            "Partial Solution (cancelled)".yellow().to_string()
        } else {
            "Solution".to_string()
        },
        board_display(&board),
        response.board_texture,
        request.pot_size,
        request.starting_stack,
    );
    println!(
        "  {} iterations in {:.2}s  |  {} infosets  |  {}",
        response.training_iterations,
        response.computation_time_seconds,
        response.nodes_count,
        convergence_summary(&response.convergence_history),
    );

    println!();
    println!("{}", strategy_table("OOP at first decision", &response.oop_strategy));
    println!();
    println!("{}", strategy_table("IP facing a check", &response.ip_strategy));
    println!();
    println!("{}", equity_table("OOP equity vs IP range", &response.oop_equity));
    println!();
    Ok(())
}
