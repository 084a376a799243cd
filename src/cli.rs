//! The CLI front end: a thin clap surface translating flags into core calls
//! and rendering records as plain text.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use must_oc::core::Core;
use must_oc::query::{LogHandle, LogVariant, Query, Scope};
use must_oc::redact::Mode;
use must_oc::selector::Selector;
use must_oc::value::Value;

#[derive(Parser, Debug)]
#[command(name = "must-oc", about = "Offline query tool for must-gather archives")]
pub struct Cli {
    /// One or more must-gather archive directories (or a directory containing them).
    #[arg(short = 'a', long = "archive", required = true)]
    pub archives: Vec<PathBuf>,

    /// Directory holding the persisted type registry.
    #[arg(long, env = "MUST_OC_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    #[arg(short, long, default_value = "info")]
    pub verbosity: tracing_subscriber::filter::LevelFilter,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all resources of a kind.
    List {
        kind: String,
        #[arg(short, long)]
        namespace: Option<String>,
        #[arg(long)]
        all_namespaces: bool,
        #[arg(short = 'l', long, default_value = "")]
        selector: String,
        #[arg(long)]
        reveal: bool,
        #[arg(long, default_value = "name")]
        output: OutputFormat,
    },
    /// Get a single named resource.
    Get {
        kind: String,
        name: String,
        #[arg(short, long)]
        namespace: Option<String>,
        #[arg(long)]
        reveal: bool,
        #[arg(long, default_value = "name")]
        output: OutputFormat,
    },
    /// Stream a container's captured log.
    Logs {
        #[arg(short, long)]
        namespace: String,
        pod: String,
        #[arg(short, long)]
        container: Option<String>,
        #[arg(long)]
        previous: bool,
    },
    /// Walk the archives and additively update the type registry.
    UpdateTypes,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Name,
    Yaml,
    Json,
}

impl Cli {
    pub fn init_logging(&self) {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env().add_directive(self.verbosity.into()))
            .init();
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let core = Core::open(&self.archives, self.config_dir.clone()).context("failed to open archives")?;

        match &self.command {
            Commands::List { kind, namespace, all_namespaces, selector, reveal, output } => {
                self.run_list(&core, kind, namespace.as_deref(), *all_namespaces, selector, *reveal, *output)
            }
            Commands::Get { kind, name, namespace, reveal, output } => {
                self.run_get(&core, kind, name, namespace.as_deref(), *reveal, *output)
            }
            Commands::Logs { namespace, pod, container, previous } => {
                self.run_logs(&core, namespace, pod, container.as_deref(), *previous)
            }
            Commands::UpdateTypes => self.run_update_types(&core),
        }
    }

    fn run_list(
        &self,
        core: &Core,
        kind: &str,
        namespace: Option<&str>,
        all_namespaces: bool,
        selector: &str,
        reveal: bool,
        output: OutputFormat,
    ) -> anyhow::Result<()> {
        let (group, plural) = core.resolve_kind(kind)?;
        let scope = resolve_scope(core, &plural, namespace, all_namespaces)?;
        let query = Query::new(group, plural, scope);
        let selector = Selector::parse(selector)?;
        let mode = if reveal { Mode::Raw } else { Mode::Redacted };

        let records = core.list(&query, &selector, mode);
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for record in &records {
            render_record(record, output, &mut out)?;
        }
        Ok(())
    }

    fn run_get(
        &self,
        core: &Core,
        kind: &str,
        name: &str,
        namespace: Option<&str>,
        reveal: bool,
        output: OutputFormat,
    ) -> anyhow::Result<()> {
        let (group, plural) = core.resolve_kind(kind)?;
        let scope = resolve_scope(core, &plural, namespace, false)?;
        let query = Query::new(group, plural, scope).with_name(name);
        let mode = if reveal { Mode::Raw } else { Mode::Redacted };

        let record = core.get(&query, mode)?;
        let stdout = std::io::stdout();
        render_record(&record, output, &mut stdout.lock())?;
        Ok(())
    }

    fn run_logs(
        &self,
        core: &Core,
        namespace: &str,
        pod: &str,
        container: Option<&str>,
        previous: bool,
    ) -> anyhow::Result<()> {
        let root = core.roots().first().ok_or_else(|| anyhow!("no archive root available"))?;
        let handle = LogHandle {
            archive_root: root.path.clone(),
            namespace: namespace.to_string(),
            pod_name: pod.to_string(),
            container_name: container.map(str::to_string),
            variant: if previous { LogVariant::Previous } else { LogVariant::Current },
        };

        let stdout = std::io::stdout();
        core.stream_log(&handle, &mut stdout.lock())?;
        Ok(())
    }

    fn run_update_types(&self, core: &Core) -> anyhow::Result<()> {
        let summary = core.update_types(&self.archives)?;
        tracing::info!(
            kinds_added = summary.kinds_added_count(),
            cluster_scoped_added = summary.cluster_scoped_added_count(),
            "type registry updated"
        );
        println!("kinds added: {}", summary.kinds_added_count());
        for name in &summary.kinds_added {
            println!("  + {name}");
        }
        println!("cluster-scoped added: {}", summary.cluster_scoped_added_count());
        for name in &summary.cluster_scoped_added {
            println!("  + {name}");
        }
        Ok(())
    }
}

fn resolve_scope(core: &Core, plural: &str, namespace: Option<&str>, all_namespaces: bool) -> anyhow::Result<Scope> {
    if core.is_cluster_scoped(plural) {
        return Ok(Scope::Cluster);
    }
    if all_namespaces {
        return Ok(Scope::AllNamespaces);
    }
    match namespace {
        Some(ns) => Ok(Scope::SingleNamespace(ns.to_string())),
        None => Err(anyhow!("--namespace or --all-namespaces is required for namespaced kind {plural:?}")),
    }
}

fn render_record(record: &must_oc::record::ResourceRecord, output: OutputFormat, sink: &mut dyn std::io::Write) -> anyhow::Result<()> {
    match output {
        OutputFormat::Name => {
            writeln!(sink, "{} {} {}", record.namespace(), record.kind(), record.name())?;
        }
        OutputFormat::Yaml => {
            write!(sink, "{}", render_yaml(&record.data, 0))?;
        }
        OutputFormat::Json => {
            writeln!(sink, "{}", serde_json::to_string_pretty(&record.data)?)?;
        }
    }
    Ok(())
}

/// A minimal, dependency-free YAML renderer for display purposes only;
/// unlike `registry.rs`'s emitters this never needs to round-trip.
fn render_yaml(value: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match value {
        Value::Map(entries) => entries
            .iter()
            .map(|(k, v)| match v {
                Value::Map(m) if !m.is_empty() => format!("{pad}{k}:\n{}", render_yaml(v, indent + 1)),
                Value::Seq(s) if !s.is_empty() => format!("{pad}{k}:\n{}", render_yaml(v, indent)),
                _ => format!("{pad}{k}: {}\n", scalar(v)),
            })
            .collect(),
        Value::Seq(items) => items.iter().map(|item| format!("{pad}- {}\n", scalar(item))).collect(),
        other => format!("{pad}{}\n", scalar(other)),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Seq(_) | Value::Map(_) => String::new(),
    }
}
