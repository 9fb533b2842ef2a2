//! Run summary: table shapes per stage and partition sizes

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use polars::prelude::DataFrame;
use serde::Serialize;

use crate::pipeline::{DataSplit, Partition};

/// Shape of the table after one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: String,
    pub rows: usize,
    pub columns: usize,
    pub elapsed_secs: f64,
}

/// Row counts of the three partitions
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PartitionSizes {
    pub train: usize,
    pub validate: usize,
    pub test: usize,
}

/// Summary of one pipeline run
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub stages: Vec<StageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<PartitionSizes>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: &str, df: &DataFrame, elapsed: Duration) {
        self.stages.push(StageRecord {
            stage: stage.to_string(),
            rows: df.height(),
            columns: df.width(),
            elapsed_secs: elapsed.as_secs_f64(),
        });
    }

    pub fn set_partitions(&mut self, split: &DataSplit) {
        let [train, validate, test] = split.sizes();
        self.partitions = Some(PartitionSizes {
            train,
            validate,
            test,
        });
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Stage").add_attribute(Attribute::Bold),
            Cell::new("Rows").add_attribute(Attribute::Bold),
            Cell::new("Columns").add_attribute(Attribute::Bold),
            Cell::new("Time").add_attribute(Attribute::Bold),
        ]);

        let mut previous_rows: Option<usize> = None;
        for record in &self.stages {
            let shrank = previous_rows.is_some_and(|p| record.rows < p);
            table.add_row(vec![
                Cell::new(&record.stage),
                Cell::new(record.rows).fg(if shrank { Color::Yellow } else { Color::White }),
                Cell::new(record.columns),
                Cell::new(format!("{:.2}s", record.elapsed_secs)),
            ]);
            previous_rows = Some(record.rows);
        }

        if let Some(sizes) = self.partitions {
            let total = (sizes.train + sizes.validate + sizes.test).max(1) as f64;
            for (partition, rows) in Partition::ALL
                .iter()
                .zip([sizes.train, sizes.validate, sizes.test])
            {
                table.add_row(vec![
                    Cell::new(format!("  {}", partition)),
                    Cell::new(rows).fg(Color::Cyan),
                    Cell::new(format!("{:.1}%", rows as f64 / total * 100.0)).fg(Color::Cyan),
                    Cell::new(""),
                ]);
            }
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }
    }
}
