use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use repipe_config::{Serializable, read_document, write_document};
use repipe_mapper::ClassCoverageMapper;
use repipe_pipeline::{FieldValue, Pipeline, StepData, load_pipeline};
use repipe_transforms::default_registry;
use tracing::{info, info_span};

use repipe_cli::frame::{read_frame, write_features};
use repipe_cli::report::{
    classes_table, components_table, coverage_summary, coverage_table, features_table,
    steps_table,
};

use crate::cli::{ConfigArgs, CoverageArgs, FitArgs, TransformArgs};

fn load_pipeline_document(path: &Path) -> Result<Pipeline> {
    let config = read_document(path).with_context(|| format!("read {}", path.display()))?;
    load_pipeline(&config, default_registry())
        .with_context(|| format!("load pipeline from {}", path.display()))
}

fn features(output: StepData) -> Result<Vec<FieldValue>> {
    output
        .into_features()
        .ok_or_else(|| anyhow!("pipeline does not end with a feature selector"))
}

pub fn run_components() -> Result<()> {
    println!("{}", components_table(default_registry()));
    Ok(())
}

pub fn run_inspect(args: &ConfigArgs) -> Result<()> {
    let pipeline = load_pipeline_document(&args.config)?;
    println!("Pipeline: {}", args.config.display());
    println!("{}", steps_table(&pipeline));
    Ok(())
}

pub fn run_verify(args: &ConfigArgs) -> Result<()> {
    let original = read_document(&args.config)
        .with_context(|| format!("read {}", args.config.display()))?;
    let pipeline = load_pipeline(&original, default_registry())
        .with_context(|| format!("load pipeline from {}", args.config.display()))?;
    if pipeline.to_dict() != original {
        bail!(
            "{} does not serialize back to the same document",
            args.config.display()
        );
    }
    println!(
        "{}: {} steps, round trip ok",
        args.config.display(),
        pipeline.len()
    );
    Ok(())
}

pub fn run_fit(args: &FitArgs) -> Result<()> {
    let span = info_span!("fit", config = %args.config.display());
    let _guard = span.enter();
    let mut pipeline = load_pipeline_document(&args.config)?;
    let df = read_frame(&args.data)?;

    let start = Instant::now();
    let output = pipeline.fit(&df).context("fit pipeline")?;
    info!(
        rows = df.height(),
        duration_ms = start.elapsed().as_millis(),
        "fit complete"
    );

    write_document(&args.output, &pipeline.to_dict())
        .with_context(|| format!("write {}", args.output.display()))?;
    println!("Fitted pipeline: {}", args.output.display());
    if let Some(features) = output.into_features() {
        println!("{}", features_table(&features));
    }
    Ok(())
}

pub fn run_transform(args: &TransformArgs) -> Result<()> {
    let span = info_span!("transform", config = %args.config.display());
    let _guard = span.enter();
    let pipeline = load_pipeline_document(&args.config)?;
    let df = read_frame(&args.data)?;

    let start = Instant::now();
    let features = features(pipeline.transform(&df).context("transform input")?)?;
    info!(
        rows = df.height(),
        duration_ms = start.elapsed().as_millis(),
        "transform complete"
    );

    println!("{}", features_table(&features));
    if let Some(path) = &args.output {
        let rows = write_features(path, &features)?;
        println!("Wrote {rows} rows to {}", path.display());
    }
    Ok(())
}

pub fn run_coverage(args: &CoverageArgs) -> Result<()> {
    let config = read_document(&args.config)
        .with_context(|| format!("read {}", args.config.display()))?;
    let mapper = ClassCoverageMapper::from_config(&config)
        .with_context(|| format!("load mapper from {}", args.config.display()))?;
    if args.json {
        let summary = serde_json::to_string_pretty(&coverage_summary(&mapper))
            .context("render coverage summary")?;
        println!("{summary}");
        return Ok(());
    }
    println!(
        "Target mean F1: {}  Fallback class: {}",
        mapper.mean_f1(),
        mapper.fallback_class()
    );
    println!("{}", coverage_table(&mapper));
    if let Some(head) = &args.head {
        let table =
            classes_table(&mapper, head).ok_or_else(|| anyhow!("unknown output head '{head}'"))?;
        println!("{table}");
    }
    Ok(())
}
