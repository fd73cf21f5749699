use anyhow::Context;
use colored::Colorize;
use kvapi_store::{EventType, MemoryStore, StoreConfig};
use kvapi_types::{DynamicObject, Resource, ResourceKind};
use tracing::info;

use crate::cli::*;
use crate::script::{self, RunReport, StepReport};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(args, cli.format).await,
        Command::Config(args) => cmd_config(args, cli.format),
    }
}

/// Store settings from the config file (if any) with flag overrides applied.
pub fn effective_config(args: &StoreArgs) -> anyhow::Result<StoreConfig> {
    let mut config = match &args.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if args.allow_create_on_update {
        config.allow_create_on_update = true;
    }
    if let Some(capacity) = args.watch_capacity {
        config.watch_capacity = capacity;
    }
    config.validate()?;
    Ok(config)
}

fn resource_kind(args: &StoreArgs) -> ResourceKind {
    if args.cluster_scoped {
        ResourceKind::cluster_scoped(args.kind.clone())
    } else {
        ResourceKind::namespaced(args.kind.clone())
    }
}

async fn cmd_run(args: RunArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = effective_config(&args.store)?;
    let operations = script::load(&args.script)?;
    info!(script = %args.script.display(), steps = operations.len(), "replaying script");

    let store: MemoryStore<DynamicObject> =
        MemoryStore::with_config(resource_kind(&args.store), config);
    let report = script::replay(&store, &operations).await?;

    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&report).context("encoding report")?;
            println!("{text}");
        }
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = effective_config(&args.store)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

/// One-line identity summary: `ns/name rv=N`.
fn describe(object: &DynamicObject) -> String {
    match object.meta() {
        Ok(meta) => format!("{meta} rv={}", meta.resource_version),
        Err(e) => format!("<{e}>"),
    }
}

fn print_step(step: &StepReport) {
    let prefix = format!("[{}] {}", step.step, step.op);
    if let Some(error) = &step.error {
        println!("{} {}: {}", "✗".red().bold(), prefix, error.red());
        return;
    }
    match step.objects.as_slice() {
        [one] => {
            let created = if step.created == Some(true) { " (created)" } else { "" };
            println!("{} {} {}{}", "✓".green().bold(), prefix, describe(one).cyan(), created);
        }
        many => {
            println!("{} {} {} object(s)", "✓".green().bold(), prefix, many.len().to_string().bold());
            for object in many {
                println!("    {}", describe(object).cyan());
            }
        }
    }
}

fn print_report(report: &RunReport) {
    for step in &report.steps {
        print_step(step);
    }

    println!("\n{} ({})", "Watch events".bold(), report.events.len());
    for event in &report.events {
        let label = format!("{:<8}", event.event_type.to_string());
        let label = match event.event_type {
            EventType::Added => label.green(),
            EventType::Modified => label.yellow(),
            EventType::Deleted => label.red(),
        };
        println!("  {} {}", label, describe(&event.object));
    }
    if report.dropped_events > 0 {
        println!("  {} {} event(s) dropped", "!".yellow().bold(), report.dropped_events);
    }

    let failures = report.failures();
    if failures == 0 {
        println!("\n{} {} step(s) succeeded", "✓".green().bold(), report.steps.len());
    } else {
        println!(
            "\n{} {} of {} step(s) failed",
            "✗".red().bold(),
            failures,
            report.steps.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    fn store_args() -> StoreArgs {
        StoreArgs {
            config: None,
            kind: "things".into(),
            cluster_scoped: false,
            allow_create_on_update: false,
            watch_capacity: None,
        }
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "watch_capacity = 8").unwrap();

        let mut args = store_args();
        args.config = Some(file.path().to_path_buf());
        let config = effective_config(&args).unwrap();
        assert_eq!(config.watch_capacity, 8);
        assert!(!config.allow_create_on_update);

        args.allow_create_on_update = true;
        args.watch_capacity = Some(3);
        let config = effective_config(&args).unwrap();
        assert_eq!(config.watch_capacity, 3);
        assert!(config.allow_create_on_update);
    }

    #[test]
    fn zero_capacity_flag_is_rejected() {
        let mut args = store_args();
        args.watch_capacity = Some(0);
        assert!(effective_config(&args).is_err());
    }

    #[test]
    fn kind_scope_follows_flag() {
        let mut args = store_args();
        assert!(resource_kind(&args).namespaced);
        args.cluster_scoped = true;
        assert!(!resource_kind(&args).namespaced);
    }

    #[test]
    fn describe_objects() {
        let object = DynamicObject::new(json!({
            "metadata": {"name": "a", "namespace": "ns", "resourceVersion": "4"}
        }));
        assert_eq!(describe(&object), "ns/a rv=4");
        assert!(describe(&DynamicObject::new(json!(7))).starts_with('<'));
    }
}
