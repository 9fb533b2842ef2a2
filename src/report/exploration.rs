//! Tables for the exploration subcommands: null summaries, outlier trimming,
//! the inertia sweep and the threshold t-test

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{ColumnNulls, RowNullGroup, ThresholdTest, TrimStep};

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!();
}

fn print_table(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn bold_header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

/// Per-column null counts; fully populated columns are omitted
pub fn display_column_nulls(summary: &[ColumnNulls]) {
    print_section("🕳️", "MISSING VALUES BY COLUMN");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(bold_header(&["Column", "Rows missing", "% missing"]));
    for entry in summary.iter().filter(|e| e.rows_missing > 0) {
        let pct = Cell::new(format!("{:.1}%", entry.percent_missing * 100.0))
            .set_alignment(CellAlignment::Right);
        table.add_row(vec![
            Cell::new(&entry.column),
            Cell::new(entry.rows_missing).set_alignment(CellAlignment::Right),
            if entry.percent_missing > 0.2 {
                pct.fg(Color::Red)
            } else {
                pct
            },
        ]);
    }
    print_table(&table);
}

/// Rows grouped by how many columns they are missing
pub fn display_row_nulls(summary: &[RowNullGroup]) {
    print_section("🧮", "MISSING VALUES BY ROW");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(bold_header(&["Columns missing", "% of columns", "Rows"]));
    for group in summary {
        table.add_row(vec![
            Cell::new(group.columns_missing),
            Cell::new(format!("{:.1}%", group.percent_missing * 100.0)),
            Cell::new(group.rows),
        ]);
    }
    print_table(&table);
}

/// Bounds and row counts for each trimmed column, in trimming order
pub fn display_trim_steps(steps: &[TrimStep], k: f64) {
    print_section("✂️", &format!("OUTLIER TRIMMING (k = {})", k));

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(bold_header(&["Column", "Q1", "Q3", "Lower", "Upper", "Rows kept"]));
    for step in steps {
        let removed = step.rows_before - step.rows_after;
        table.add_row(vec![
            Cell::new(&step.column),
            Cell::new(format!("{:.4}", step.q1)),
            Cell::new(format!("{:.4}", step.q3)),
            Cell::new(format!("{:.4}", step.lower)),
            Cell::new(format!("{:.4}", step.upper)),
            Cell::new(format!("{} / {}", step.rows_after, step.rows_before)).fg(if removed > 0 {
                Color::Yellow
            } else {
                Color::White
            }),
        ]);
    }
    print_table(&table);
}

/// Inertia for each k with a bar proportional to the largest value
pub fn display_inertia_curve(curve: &[(usize, f64)]) {
    print_section("📉", "K-MEANS INERTIA");

    let max = curve.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(bold_header(&["k", "Inertia", ""]));
    for (k, inertia) in curve {
        let width = if max > 0.0 {
            (inertia / max * 30.0).round() as usize
        } else {
            0
        };
        table.add_row(vec![
            Cell::new(k),
            Cell::new(format!("{:.4}", inertia)),
            Cell::new("█".repeat(width)).fg(Color::Cyan),
        ]);
    }
    print_table(&table);
}

/// Group means and the test verdict
pub fn display_t_test(test: &ThresholdTest) {
    print_section("🧪", "WELCH T-TEST");

    let result = &test.result;
    let mean_header = format!("Mean {}", test.target);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(bold_header(&["Group", "Rows", mean_header.as_str()]));
    table.add_row(vec![
        Cell::new(format!("{} < {}", test.column, test.threshold)),
        Cell::new(result.n_a).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.6}", result.mean_a)),
    ]);
    table.add_row(vec![
        Cell::new(format!("{} >= {}", test.column, test.threshold)),
        Cell::new(result.n_b).set_alignment(CellAlignment::Right),
        Cell::new(format!("{:.6}", result.mean_b)),
    ]);
    print_table(&table);

    println!();
    let verdict = if result.reject_null() {
        style("Reject H0").green().bold()
    } else {
        style("Fail to reject H0").yellow().bold()
    };
    println!(
        "      t = {:.4}, df = {:.2}, p = {:.4} (alpha {})  {}",
        result.statistic, result.degrees_of_freedom, result.p_value, result.alpha, verdict
    );
}
