//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::FfprobeAdapter;
use crate::app::{AppContainer, CutRequest, CutSettings, DefaultAppContainer};
use crate::cli::args::{CutArgs, PlanArgs, PlanningArgs, ServeArgs};
use crate::cli::Cli;
use crate::config::AppConfig;
use crate::domain::model::{DeleteRequest, TimeRange};
use crate::events::ConsoleReporter;
use crate::planner::CutPlan;
use crate::ports::ProbePort;
use crate::server::{self, ServerState};
use crate::utils::time::{format_timestamp, parse_timestamp};

/// Resolve configuration: file, then `CUTX_*` environment, then global flags
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::discover(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_env()
        .context("Invalid environment configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.log_json {
        config.logging.json = true;
    }
    Ok(config)
}

/// Delete ranges from `--delete` flags followed by those of `--segments`
pub fn collect_deletes(args: &PlanningArgs) -> Result<DeleteRequest> {
    let mut deletes = args.deletes.clone();
    if let Some(path) = &args.segments {
        deletes.extend(read_segments_file(path)?);
    }
    Ok(deletes)
}

fn read_segments_file(path: &Path) -> Result<Vec<TimeRange>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read segments file {}", path.display()))?;
    let segments: Vec<TimeRange> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid segments file {}", path.display()))?;
    Ok(segments)
}

/// Execute the serve command
pub async fn serve(args: ServeArgs, mut config: AppConfig) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    if let Some(source) = &args.source {
        if !source.is_file() {
            anyhow::bail!("Source file does not exist: {}", source.display());
        }
        info!("Default source: {}", source.display());
    }

    let container = DefaultAppContainer::new(&config)?;
    let state = ServerState::new(container.orchestrator(), args.source.clone());
    server::serve(state, &config.server.addr, config.server.port)
        .await
        .context("Server failed")?;
    Ok(())
}

/// Execute the cut command
pub async fn cut(args: CutArgs, mut config: AppConfig) -> Result<()> {
    args.apply(&mut config);
    let deletes = collect_deletes(&args.planning)?;
    info!(
        input = %args.input.display(),
        deletes = deletes.len(),
        format = %args.format,
        "Starting cut"
    );

    let container = DefaultAppContainer::new(&config)?;
    let orchestrator = container.orchestrator();
    let reporter = ConsoleReporter::new(args.json, args.verbose);
    let subscription = container.hub().subscribe();

    let request = CutRequest::new(&args.input, deletes, args.format);
    let outcome = reporter
        .report_while(subscription, orchestrator.execute(request))
        .await
        .context("Cut failed")?;

    info!(
        output = %outcome.output.display(),
        strategy = %outcome.strategy,
        segments = outcome.segments,
        "Cut finished"
    );
    Ok(())
}

/// Execute the plan command
pub async fn plan(args: PlanArgs, mut config: AppConfig) -> Result<()> {
    args.planning.apply(&mut config);
    config.validate()?;
    let deletes = collect_deletes(&args.planning)?;

    let duration = match (&args.duration, &args.input) {
        (Some(text), _) => parse_timestamp(text).context("Invalid --duration")?,
        (None, Some(input)) => FfprobeAdapter::new(&config.tools.ffprobe)
            .probe_duration(input)
            .await
            .with_context(|| format!("Failed to probe {}", input.display()))?,
        (None, None) => anyhow::bail!("Either --duration or --input is required"),
    };

    let planner = CutSettings::from_config(&config).planner;
    let plan = planner.plan(&deletes, duration)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render_plan(&plan));
    }
    Ok(())
}

/// Human-readable plan summary
pub fn render_plan(plan: &CutPlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("Strategy: {}\n", plan.strategy));
    out.push_str(&format!(
        "Source duration: {}\n",
        format_timestamp(plan.source_duration)
    ));
    out.push_str(&format!(
        "Keep ranges: {} ({} total)\n",
        plan.keep.len(),
        format_timestamp(plan.output_duration())
    ));
    for (i, range) in plan.keep.ranges().iter().enumerate() {
        out.push_str(&format!(
            "  {:>3}. {:.3}-{:.3}  ({})\n",
            i + 1,
            range.start(),
            range.end(),
            range
        ));
    }
    out
}
