use std::collections::BTreeMap;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::cards::{Card, Suit};
use crate::cfr::ConvergencePoint;
use crate::solver::ConfigReport;

pub fn board_display(cards: &[Card]) -> String {
    if cards.is_empty() {
        return "(preflop)".dimmed().to_string();
    }
    cards
        .iter()
        .map(|card| {
            let rank = card.rank.to_char();
            let symbol = card.suit.symbol();
            match card.suit {
                Suit::Spades => format!("{}{}", rank, symbol).white().to_string(),
                Suit::Hearts => format!("{}{}", rank, symbol).red().to_string(),
                Suit::Diamonds => format!("{}{}", rank, symbol).blue().to_string(),
                Suit::Clubs => format!("{}{}", rank, symbol).green().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn freq_cell(freq: f64) -> Cell {
    let pct = format!("{:.1}%", freq * 100.0);
    let styled = if freq >= 0.7 {
        pct.green().bold().to_string()
    } else if freq >= 0.3 {
        pct.yellow().to_string()
    } else {
        pct.dimmed().to_string()
    };
    Cell::new(styled).set_alignment(CellAlignment::Right)
}

/// Render a hand-class strategy map as a table: one row per class, one
/// column per action.
pub fn strategy_table(
    title: &str,
    strategy: &BTreeMap<String, BTreeMap<String, f64>>,
) -> String {
    let actions: Vec<String> = match strategy.values().next() {
        Some(row) => row.keys().cloned().collect(),
        None => return format!("  {} (no visited infosets)", title.bold()),
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("Hand")];
    for action in &actions {
        header.push(Cell::new(action).set_alignment(CellAlignment::Right));
    }
    table.set_header(header);

    for (class, freqs) in strategy {
        let mut row = vec![Cell::new(class.bold().to_string())];
        for action in &actions {
            row.push(freq_cell(freqs.get(action).copied().unwrap_or(0.0)));
        }
        table.add_row(row);
    }

    format!("  {}\n{}", title.bold(), table)
}

pub fn equity_table(title: &str, equities: &BTreeMap<String, f64>) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Hand"),
        Cell::new("Equity").set_alignment(CellAlignment::Right),
    ]);
    for (class, eq) in equities {
        table.add_row(vec![
            Cell::new(class.bold().to_string()),
            Cell::new(format!("{:.1}%", eq * 100.0)).set_alignment(CellAlignment::Right),
        ]);
    }
    format!("  {}\n{}", title.bold(), table)
}

pub fn convergence_summary(history: &[ConvergencePoint]) -> String {
    match history.last() {
        Some(last) => format!(
            "{} checkpoints, final convergence {:.6} over {} infosets",
            history.len(),
            last.convergence,
            last.nodes_count,
        ),
        None => "no checkpoints recorded".to_string(),
    }
}

pub fn config_report_table(report: &ConfigReport) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![
        Cell::new("Valid".bold().to_string()),
        Cell::new(if report.is_valid {
            "yes".green().to_string()
        } else {
            "no".red().to_string()
        }),
    ]);
    table.add_row(vec![
        Cell::new("Estimated nodes".bold().to_string()),
        Cell::new(report.estimated_nodes.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Estimated time".bold().to_string()),
        Cell::new(format!("{:.1}s", report.estimated_training_time_seconds)),
    ]);
    table.add_row(vec![
        Cell::new("Recommended iterations".bold().to_string()),
        Cell::new(report.recommended_iterations.to_string()),
    ]);
    table.to_string()
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}
