//! Evaluation table printer

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{Baseline, Evaluation, BASELINE_LABEL};

fn metric_cell(value: f64, baseline: f64) -> Cell {
    let cell = Cell::new(format!("{:.6}", value));
    if value < baseline {
        cell.fg(Color::Green)
    } else {
        cell
    }
}

/// Render the evaluation as a table. RMSE cells that beat the baseline are green.
pub fn evaluation_table(evaluation: &Evaluation) -> Table {
    let baseline = evaluation.get(BASELINE_LABEL);
    let show_test = evaluation.scores.iter().any(|s| s.test_rmse.is_some());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    let mut header = vec![
        Cell::new("Model").add_attribute(Attribute::Bold),
        Cell::new("Train RMSE").add_attribute(Attribute::Bold),
        Cell::new("Validate RMSE").add_attribute(Attribute::Bold),
        Cell::new("Train R²").add_attribute(Attribute::Bold),
        Cell::new("Validate R²").add_attribute(Attribute::Bold),
    ];
    if show_test {
        header.push(Cell::new("Test RMSE").add_attribute(Attribute::Bold));
    }
    table.set_header(header);

    for score in &evaluation.scores {
        let (train_ref, validate_ref) = baseline
            .map(|b| (b.train_rmse, b.validate_rmse))
            .unwrap_or((f64::INFINITY, f64::INFINITY));

        let label = if score.label == BASELINE_LABEL {
            Cell::new(&score.label).add_attribute(Attribute::Italic)
        } else {
            Cell::new(&score.label)
        };

        let mut row = vec![
            label,
            metric_cell(score.train_rmse, train_ref),
            metric_cell(score.validate_rmse, validate_ref),
            Cell::new(format!("{:.4}", score.train_r2)),
            Cell::new(format!("{:.4}", score.validate_r2)),
        ];
        if show_test {
            row.push(match score.test_rmse {
                Some(v) => Cell::new(format!("{:.6}", v)).add_attribute(Attribute::Bold),
                None => Cell::new("-"),
            });
        }
        table.add_row(row);
    }
    table
}

/// Print the evaluation table with a header line
pub fn display_evaluation(evaluation: &Evaluation, baseline: &Baseline) {
    println!();
    println!(
        "    {} {}",
        style("📈").cyan(),
        style("MODEL EVALUATION").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!(
        "      Baseline predicts the train {} ({:.6})",
        style(baseline.kind).yellow(),
        baseline.value
    );
    println!();

    for line in evaluation_table(evaluation).to_string().lines() {
        println!("    {}", line);
    }
}
