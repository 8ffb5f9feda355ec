use std::path::Path;

use anyhow::Context;
use swarm_runner::prelude::*;
use swarm_summary_model::{append_run_summary, RunSummary};

fn main() {
    let cli = init();

    let config = match cli.run_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let orchestrator = Orchestrator::new()
        .with_progress(!cli.no_progress)
        .with_monitor(cli.monitor_target());

    let started_at = chrono::Utc::now().timestamp();
    let result = match orchestrator.run(&config) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Could not start the load test: {e}");
            std::process::exit(e.exit_code());
        }
    };

    if let Some(path) = cli.run_summary_path() {
        let summary = build_summary(&orchestrator, &config, started_at, &result);
        match write_summary(&summary, &path) {
            Ok(()) => log::info!(
                "Appended run summary to '{}' with fingerprint {}",
                path.display(),
                summary.fingerprint()
            ),
            Err(e) => log::warn!("Failed to write the run summary: {e:?}"),
        }
    }

    if result.succeeded {
        log::info!("Load test finished, results are in:");
        for path in &result.artifact_paths {
            log::info!("  {}", path.display());
        }
    } else {
        log::warn!(
            "Load test ran but reported failures (exit code {})",
            result.exit_code
        );
    }

    std::process::exit(result.exit_code);
}

fn build_summary(
    orchestrator: &Orchestrator,
    config: &RunConfig,
    started_at: i64,
    result: &RunResult,
) -> RunSummary {
    let spec = orchestrator.build_invocation(config);

    let mut summary = RunSummary::new(
        config.run_label().to_string(),
        config.target_host().to_string(),
        config.user_count(),
        config.spawn_rate(),
        spec.planned_runtime().as_secs_f64().ceil() as u64,
        started_at,
        config.engine().to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    summary.set_outcome(result.exit_code, result.artifact_paths.clone());
    summary.set_engine_version(
        resolve_engine(config.engine())
            .ok()
            .and_then(|path| engine_version(&path)),
    );
    for (key, value) in spec.env() {
        summary.add_env(key.clone(), value.to_string_lossy().into_owned());
    }

    summary
}

fn write_summary(summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    append_run_summary(summary, path)
        .with_context(|| format!("Could not append to '{}'", path.display()))
}
