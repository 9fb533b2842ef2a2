//! parcelfit: property record modeling CLI
//!
//! Acquires a property table, prepares it, and scores a regression
//! battery against a constant baseline on train-fitted partitions.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;
use polars::prelude::DataFrame;

use parcelfit::cli::{confirm_overwrite, Cli, Commands};
use parcelfit::pipeline::{
    acquire, assign_clusters, baseline_from_frame, evaluate, fit_battery, inertia_curve,
    prepare, save_dataset, scale_data, split_data, summarize_column_nulls, summarize_row_nulls,
    threshold_t_test, trim_outliers, AcquireConfig, DataSplit, Partition, PipelineError,
};
use parcelfit::report::{
    build_run_report, display_column_nulls, display_evaluation, display_inertia_curve,
    display_row_nulls, display_t_test, display_trim_steps, export_run_report, RunArtifacts,
    RunConfig, RunSummary,
};
use parcelfit::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    print_warning, ConfigCard,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let acquire_config = cli.acquire_config().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;

    match &cli.command {
        Some(Commands::Nulls) => run_nulls(&cli, &acquire_config),
        Some(Commands::Outliers { k, columns, output }) => {
            run_outliers(&cli, &acquire_config, *k, columns, output.as_deref())
        }
        Some(Commands::Ttest {
            column,
            threshold,
            alpha,
        }) => run_t_test(&cli, &acquire_config, column, *threshold, *alpha),
        Some(Commands::Inertia { min_k, max_k }) => {
            run_inertia(&cli, &acquire_config, *min_k, *max_k)
        }
        None => run_pipeline(&cli, &acquire_config),
    }
}

/// Acquire behind a spinner, honouring the cache flags
fn acquire_table(cli: &Cli, config: &AcquireConfig) -> Result<DataFrame> {
    let from_cache = !cli.refresh && config.cache_path.exists();
    let spinner = create_spinner("Acquiring source table...");
    let df = acquire(config, !cli.refresh, !cli.no_cache)?;
    let message = format!("Acquired {} rows × {} columns", df.height(), df.width());
    if from_cache {
        finish_with_warning(
            &spinner,
            &format!("{} from cache (--refresh to reload)", message),
        );
    } else {
        finish_with_success(&spinner, &message);
    }
    Ok(df)
}

/// Acquire, prepare, split and scale: the shared front half of every run
fn scaled_partitions(cli: &Cli, config: &AcquireConfig) -> Result<DataSplit> {
    let raw = acquire_table(cli, config)?;
    let prepared = prepare(&raw, &cli.prepare_config())?;
    let split = split_data(&prepared, cli.seed, cli.stratify.as_deref())?;
    let (scaled, _) = scale_data(&split, &cli.scale_columns, cli.scaler)?;
    Ok(scaled)
}

fn run_nulls(cli: &Cli, config: &AcquireConfig) -> Result<()> {
    let df = acquire_table(cli, config)?;
    display_column_nulls(&summarize_column_nulls(&df));
    display_row_nulls(&summarize_row_nulls(&df));
    Ok(())
}

fn run_outliers(
    cli: &Cli,
    config: &AcquireConfig,
    k: f64,
    columns: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let raw = acquire_table(cli, config)?;
    let prepared = prepare(&raw, &cli.prepare_config())?;
    let mut trim = trim_outliers(&prepared, k, columns)?;
    display_trim_steps(&trim.steps, k);
    if trim.frame.height() == 0 {
        print_warning("No rows survive the trim; try a larger --k");
    }

    if let Some(path) = output {
        if cli.no_confirm || confirm_overwrite(path)? {
            save_dataset(&mut trim.frame, path)?;
            print_success(&format!("Saved trimmed table to {}", path.display()));
        }
    }
    Ok(())
}

fn run_t_test(
    cli: &Cli,
    config: &AcquireConfig,
    column: &str,
    threshold: f64,
    alpha: f64,
) -> Result<()> {
    let raw = acquire_table(cli, config)?;
    let prepared = prepare(&raw, &cli.prepare_config())?;
    let test = threshold_t_test(&prepared, column, threshold, &cli.target, alpha)?;
    display_t_test(&test);
    Ok(())
}

fn run_inertia(cli: &Cli, config: &AcquireConfig, min_k: usize, max_k: usize) -> Result<()> {
    if min_k == 0 || min_k > max_k {
        return Err(PipelineError::InvalidConfig(format!(
            "inertia range must satisfy 1 <= min-k <= max-k, got {}..={}",
            min_k, max_k
        ))
        .into());
    }

    let scaled = scaled_partitions(cli, config)?;
    let spinner = create_spinner("Fitting k-means for each k...");
    let curve = inertia_curve(
        &scaled.train,
        &cli.cluster_columns,
        min_k..=max_k,
        &cli.kmeans_config(),
    )?;
    finish_with_success(&spinner, "Inertia sweep complete");
    display_inertia_curve(&curve);
    Ok(())
}

fn run_pipeline(cli: &Cli, acquire_config: &AcquireConfig) -> Result<()> {
    let input = &acquire_config.source;
    let report_path = cli
        .output_path()
        .ok_or_else(|| anyhow::anyhow!("Could not derive the report path"))?;

    if !cli.no_confirm && !confirm_overwrite(&report_path)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    let prepare_config = cli.prepare_config();
    let kmeans_config = cli.kmeans_config();
    let battery_config = cli.battery_config();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input,
        target: &battery_config.target,
        report: &report_path,
        prop_required_column: prepare_config.clean.prop_required_column,
        prop_required_row: prepare_config.clean.prop_required_row,
        scaling: &cli.scaler.to_string(),
        k: kmeans_config.k,
        seed: cli.seed,
    });

    let mut summary = RunSummary::new();

    // Step 1: Acquire
    print_step_header(1, "Acquire");
    let step_start = Instant::now();
    let raw = acquire_table(cli, acquire_config)?;
    summary.record("acquire", &raw, step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 2: Clean and engineer features
    print_step_header(2, "Prepare");
    let step_start = Instant::now();
    let spinner = create_spinner("Cleaning and deriving features...");
    let prepared = prepare(&raw, &prepare_config)?;
    finish_with_success(&spinner, "Prepared table ready");
    print_count(
        "rows kept",
        prepared.height(),
        Some(&format!("of {}", raw.height())),
    );
    summary.record("prepare", &prepared, step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 3: Partition
    print_step_header(3, "Split");
    let step_start = Instant::now();
    let split = split_data(&prepared, cli.seed, cli.stratify.as_deref())?;
    split.require_rows("split")?;
    for partition in Partition::ALL {
        print_count(&format!("{} rows", partition), split.get(partition).height(), None);
    }
    summary.set_partitions(&split);
    print_step_time(step_start.elapsed());

    // Step 4: Scale
    print_step_header(4, "Scale");
    let step_start = Instant::now();
    let (scaled, scaling) = scale_data(&split, &cli.scale_columns, cli.scaler)?;
    print_success(&format!(
        "Fitted {} scaler on {} column(s)",
        scaling.strategy,
        scaling.columns.len()
    ));
    summary.record("scale (train)", &scaled.train, step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 5: Cluster
    print_step_header(5, "Cluster");
    let step_start = Instant::now();
    let spinner = create_spinner(&format!("Fitting k-means (k={})...", kmeans_config.k));
    let (clustered, clusters) = assign_clusters(&scaled, &cli.cluster_columns, &kmeans_config)?;
    finish_with_success(
        &spinner,
        &format!("Clusters fitted (inertia {:.4})", clusters.inertia),
    );
    summary.record("cluster (train)", &clustered.train, step_start.elapsed());
    print_step_time(step_start.elapsed());

    // Step 6: Baseline and model battery
    print_step_header(6, "Model");
    let step_start = Instant::now();
    let baseline = baseline_from_frame(&clustered.train, &battery_config.target)?;
    print_info(&format!(
        "Baseline: train {} = {:.6}",
        baseline.kind, baseline.value
    ));
    let spinner = create_spinner("Fitting regression battery...");
    let models = fit_battery(
        &clustered.train,
        &battery_config,
        &clusters.indicator_columns(),
    )?;
    finish_with_success(&spinner, &format!("Fitted {} models", models.len()));
    print_step_time(step_start.elapsed());

    // Step 7: Evaluate
    print_step_header(7, "Evaluate");
    let step_start = Instant::now();
    let mut evaluation = evaluate(&baseline, &models, &clustered, &battery_config.target)?;
    if let Some(label) = &cli.test_model {
        let test_rmse = evaluation.score_test(
            label,
            &baseline,
            &models,
            &clustered.test,
            &battery_config.target,
        )?;
        println!(
            "      {} test RMSE: {}",
            style(label).cyan(),
            style(format!("{:.6}", test_rmse)).yellow().bold()
        );
    }
    display_evaluation(&evaluation, &baseline);
    print_step_time(step_start.elapsed());

    // Step 8: Save
    print_step_header(8, "Save Results");
    if let Some(dir) = &cli.prepared_dir {
        let mut partitions = clustered.clone();
        for (partition, df) in [
            (Partition::Train, &mut partitions.train),
            (Partition::Validate, &mut partitions.validate),
            (Partition::Test, &mut partitions.test),
        ] {
            let path = dir.join(format!("{}.csv", partition));
            save_dataset(df, &path)?;
        }
        print_success(&format!("Saved prepared partitions to {}", dir.display()));
    }

    let report = build_run_report(
        &input.display().to_string(),
        RunConfig {
            prepare: &prepare_config,
            split_seed: cli.seed,
            stratify: cli.stratify.as_deref(),
            scale_columns: &cli.scale_columns,
            kmeans: &kmeans_config,
            cluster_features: &cli.cluster_columns,
            battery: &battery_config,
        },
        &RunArtifacts {
            summary: &summary,
            baseline: &baseline,
            evaluation: &evaluation,
            scaling: &scaling,
            clusters: &clusters,
            models: &models,
        },
    );
    export_run_report(&report, &report_path)?;
    print_success(&format!("Report saved to {}", report_path.display()));

    summary.display();
    print_completion();

    Ok(())
}
