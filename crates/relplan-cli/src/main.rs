//! relplan CLI: validate, explain, and compile YAML pipelines.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use relplan_core::config::{CostOrdering, PlannerConfig};
use relplan_dag::compile_dag;
use relplan_planner::{
    apply_pipeline_config, default_rules, explain, parse_yaml_pipeline, MetadataQuery,
    OptimizedPlan, Optimizer, ParsedPipeline, StatsMetadataQuery,
};
use relplan_stats::{CachingStatisticProvider, DefaultStatisticProvider};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relplan")]
#[command(about = "relplan: cost-based planning of linear pipelines into execution graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Planner settings that override both the environment and the pipeline.
#[derive(clap::Args, Debug, Default, Clone)]
struct Overrides {
    /// Cost ordering: rows_then_cpu, cpu_then_rows or total
    #[arg(long)]
    cost_ordering: Option<String>,

    /// Fuse a project over a filter into one vertex
    #[arg(long)]
    fuse: Option<bool>,

    /// Parallelism hint for every vertex
    #[arg(long)]
    local_parallelism: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a pipeline parses and its containers are scannable
    Validate {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,
    },

    /// Show the logical and chosen physical plan with costs
    Explain {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Compile a pipeline into an execution graph
    Compile {
        /// Path to the pipeline YAML file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Print the graph as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: Overrides,
    },
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { pipeline } => {
            if let Err(e) = validate_pipeline(&pipeline) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Pipeline is valid");
        }
        Commands::Explain {
            pipeline,
            overrides,
        } => {
            if let Err(e) = explain_pipeline(&pipeline, &overrides) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Compile {
            pipeline,
            json,
            overrides,
        } => {
            if let Err(e) = compile_pipeline(&pipeline, json, &overrides) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load(pipeline_path: &Path) -> CliResult<ParsedPipeline> {
    let yaml_content = fs::read_to_string(pipeline_path)?;
    Ok(parse_yaml_pipeline(&yaml_content)?)
}

/// Environment first, then the pipeline's `config:` block, then CLI flags.
fn resolve_config(parsed: &ParsedPipeline, overrides: &Overrides) -> CliResult<PlannerConfig> {
    let mut config = PlannerConfig::from_env();
    apply_pipeline_config(&mut config, &parsed.config);
    apply_cli_overrides(&mut config, overrides)?;
    config.validate()?;
    Ok(config)
}

fn apply_cli_overrides(config: &mut PlannerConfig, overrides: &Overrides) -> CliResult<()> {
    if let Some(ordering) = &overrides.cost_ordering {
        config.cost_ordering = CostOrdering::parse(ordering)?;
    }
    if let Some(fuse) = overrides.fuse {
        config.fuse_operators = fuse;
    }
    if let Some(p) = overrides.local_parallelism {
        config.local_parallelism = Some(p);
    }
    Ok(())
}

fn metadata(parsed: &ParsedPipeline, config: &PlannerConfig) -> CliResult<StatsMetadataQuery> {
    let catalog = Arc::new(parsed.build_catalog()?);
    let provider = CachingStatisticProvider::new(
        DefaultStatisticProvider,
        Duration::from_millis(config.stats_refresh_ms),
    );
    Ok(StatsMetadataQuery::new(
        catalog,
        Arc::new(provider),
        config.clone(),
    ))
}

fn optimize(parsed: &ParsedPipeline, mq: &StatsMetadataQuery) -> CliResult<OptimizedPlan> {
    let optimizer = Optimizer::new(default_rules(), mq);
    Ok(optimizer.optimize(&parsed.plan)?)
}

fn validate_pipeline(pipeline_path: &Path) -> CliResult<()> {
    let parsed = load(pipeline_path)?;
    parsed.build_catalog()?;
    tracing::info!(nodes = parsed.plan.node_count(), "pipeline parsed");
    Ok(())
}

fn explain_pipeline(pipeline_path: &Path, overrides: &Overrides) -> CliResult<()> {
    let parsed = load(pipeline_path)?;
    let config = resolve_config(&parsed, overrides)?;
    let mq = metadata(&parsed, &config)?;
    let optimized = optimize(&parsed, &mq)?;

    println!("Logical Plan");
    println!("============");
    print!("{}", explain(&optimized.logical, None)?);
    println!();
    println!("Physical Plan");
    println!("=============");
    let costing: &dyn MetadataQuery = &mq;
    print!("{}", explain(&optimized.physical, Some(costing))?);
    println!();
    println!("Cumulative Cost: {}", optimized.cost);
    println!("Cost Ordering:   {:?}", config.cost_ordering);
    Ok(())
}

fn compile_pipeline(pipeline_path: &Path, json: bool, overrides: &Overrides) -> CliResult<()> {
    let parsed = load(pipeline_path)?;
    let config = resolve_config(&parsed, overrides)?;
    let mq = metadata(&parsed, &config)?;
    let optimized = optimize(&parsed, &mq)?;
    let dag = compile_dag(&optimized.physical, &config)?;

    if json {
        println!("{}", dag.to_json()?);
    } else {
        print!("{dag}");
        println!("  fingerprint {}", dag.fingerprint()?.short());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_cli_overrides, apply_pipeline_config, Overrides, PlannerConfig};
    use relplan_core::config::CostOrdering;
    use relplan_planner::PipelineConfig;

    #[test]
    fn pipeline_config_overrides_env_defaults() {
        let mut config = PlannerConfig::default();
        let pipeline = PipelineConfig {
            cost_ordering: Some(CostOrdering::Total),
            local_parallelism: Some(2),
            ..Default::default()
        };
        apply_pipeline_config(&mut config, &pipeline);
        assert_eq!(config.cost_ordering, CostOrdering::Total);
        assert_eq!(config.local_parallelism, Some(2));
        assert!(!config.fuse_operators);
    }

    #[test]
    fn cli_overrides_higher_priority_than_config() {
        let mut config = PlannerConfig::default();
        let pipeline = PipelineConfig {
            fuse_operators: Some(false),
            local_parallelism: Some(2),
            ..Default::default()
        };
        apply_pipeline_config(&mut config, &pipeline);

        let flags = Overrides {
            cost_ordering: Some("cpu_then_rows".into()),
            fuse: Some(true),
            local_parallelism: Some(8),
        };
        apply_cli_overrides(&mut config, &flags).unwrap();
        assert_eq!(config.cost_ordering, CostOrdering::CpuThenRows);
        assert!(config.fuse_operators);
        assert_eq!(config.local_parallelism, Some(8));
    }

    #[test]
    fn bad_cost_ordering_flag_is_an_error() {
        let mut config = PlannerConfig::default();
        let flags = Overrides {
            cost_ordering: Some("cheapest".into()),
            ..Default::default()
        };
        assert!(apply_cli_overrides(&mut config, &flags).is_err());
    }
}
