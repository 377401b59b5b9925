use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;
use wirecore::{Graph, InputContract, NodeSpec, NodeType, RunEvent};
use wirenodes::builtin_registry;
use wireruntime::{connect, RunOutcome, RunStateStore, RunStatus, RuntimeConfig, Snapshot, WireRuntime};

const DEFAULT_HISTORY: &str = "wireflow-history.json";

#[derive(Parser)]
#[command(name = "wire")]
#[command(about = "Wireflow graph runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow from a graph file
    Run {
        /// Path to graph JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Node id to start from (defaults to the first trigger node)
        #[arg(short, long)]
        start: Option<Uuid>,

        /// Run history file
        #[arg(long, default_value = DEFAULT_HISTORY)]
        history: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a graph file (structure, cycles, slot bindings)
    Validate {
        /// Path to graph JSON file
        file: PathBuf,
    },

    /// List available node types and their contracts
    Nodes,

    /// Create a new example graph
    Init {
        /// Output file path
        #[arg(short, long, default_value = "graph.json")]
        output: PathBuf,
    },

    /// Show persisted run history
    History {
        /// Run history file
        #[arg(long, default_value = DEFAULT_HISTORY)]
        history: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            start,
            history,
            verbose,
        } => {
            let level = if verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };
            tracing_subscriber::fmt().with_max_level(level).init();

            run_workflow(file, start, history).await?;
        }

        Commands::Validate { file } => {
            validate_graph(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_graph(output)?;
        }

        Commands::History { history } => {
            show_history(history)?;
        }
    }

    Ok(())
}

fn load_graph(file: &PathBuf) -> Result<Graph> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading graph file {}", file.display()))?;
    let graph: Graph = serde_json::from_str(&raw)?;
    Ok(graph)
}

fn resolve_start(graph: &Graph, start: Option<Uuid>) -> Result<Uuid> {
    if let Some(id) = start {
        if !graph.contains_node(id) {
            return Err(anyhow!("start node {} not found in graph", id));
        }
        return Ok(id);
    }
    graph
        .nodes
        .iter()
        .find(|n| n.node_type == NodeType::Trigger)
        .map(|n| n.id)
        .ok_or_else(|| anyhow!("graph has no trigger node; pass --start"))
}

async fn run_workflow(file: PathBuf, start: Option<Uuid>, history: PathBuf) -> Result<()> {
    println!("🚀 Loading graph from: {}", file.display());

    let graph = load_graph(&file)?;
    let start = resolve_start(&graph, start)?;

    println!("📋 Nodes: {}  Edges: {}", graph.nodes.len(), graph.edges.len());
    println!("   Starting from: {}", start);
    println!();

    let config = RuntimeConfig {
        history_file: Some(history),
        ..RuntimeConfig::default()
    };
    let rt = WireRuntime::new(graph, builtin_registry(), config)?;

    // Stream progress while the run is in flight
    let mut events = rt.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RunEvent::RunStarted { .. } => {
                    println!("▶️  Run started");
                }
                RunEvent::RunRefused { busy_nodes, .. } => {
                    println!("⛔ Run refused: {} node(s) already mid-execution", busy_nodes.len());
                }
                RunEvent::NodeStarted { node_id, node_type, .. } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_type);
                }
                RunEvent::NodeFinished { node_id, duration_ms, .. } => {
                    println!("  ✅ Node {} finished in {}ms", node_id, duration_ms);
                }
                RunEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                RunEvent::RunCompleted { success, duration_ms, .. } => {
                    if success {
                        println!("✨ Run completed successfully in {}ms", duration_ms);
                    } else {
                        println!("💥 Run failed after {}ms", duration_ms);
                    }
                }
            }
        }
    });

    let report = rt.run_workflow(start).await?;

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    println!("📊 Run Summary:");
    println!("   Run ID: {}", report.run_id);
    match &report.outcome {
        RunOutcome::Completed => {
            println!("   Outcome: completed ({} nodes)", report.completed.len());
        }
        RunOutcome::Failed { node, reason } => {
            println!("   Outcome: failed at node {}", node);
            println!("   Reason: {}", reason);
        }
        RunOutcome::Refused { busy_nodes } => {
            println!("   Outcome: refused, busy nodes: {:?}", busy_nodes);
        }
    }

    // Text nodes carry their displayed value in props after a run
    let graph = rt.graph();
    let graph = graph.read().await;
    let shown: Vec<_> = graph
        .nodes
        .iter()
        .filter(|n| n.node_type == NodeType::Text)
        .filter_map(|n| Some((n.id, n.props.get("text")?.as_str()?.to_string())))
        .collect();
    if !shown.is_empty() {
        println!();
        println!("📤 Text nodes:");
        for (id, text) in shown {
            println!("   {}: {}", id, text);
        }
    }

    Ok(())
}

fn validate_graph(file: PathBuf) -> Result<()> {
    println!("🔍 Validating graph: {}", file.display());

    let graph = load_graph(&file)?;
    println!("   Nodes: {}  Edges: {}", graph.nodes.len(), graph.edges.len());

    let mut failures = 0usize;
    for node in graph.nodes.iter().filter(|n| n.node_type == NodeType::Trigger) {
        match Snapshot::build(&graph, node.id) {
            Ok(snapshot) => {
                println!("   ✅ Plan from {}: {} reachable node(s)", node.id, snapshot.len());
            }
            Err(e) => {
                failures += 1;
                println!("   ❌ Plan from {}: {}", node.id, e);
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} invalid execution plan(s)", failures));
    }
    println!("✅ Graph is valid");
    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = builtin_registry();
    for node_type in registry.registered_types() {
        let reg = match registry.lookup(node_type) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let inputs = match &reg.inputs {
            InputContract::Variadic => "input-1, input-2, ... (variadic)".to_string(),
            InputContract::Fixed { slots } if slots.is_empty() => "(none)".to_string(),
            InputContract::Fixed { slots } => slots
                .iter()
                .map(|s| {
                    if s.required {
                        format!("{}: {}", s.name, s.value_type)
                    } else {
                        format!("{}: {} (optional)", s.name, s.value_type)
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
        };
        let output = reg
            .output
            .map_or_else(|| "(none)".to_string(), |t| t.to_string());
        println!("  • {}", node_type);
        println!("    inputs: {}", inputs);
        println!("    output: {}", output);
    }
}

fn create_example_graph(output: PathBuf) -> Result<()> {
    let registry = builtin_registry();
    let mut graph = Graph::new();

    let trigger = graph.add_node(NodeSpec::new(NodeType::Trigger).with_bounds(40.0, 120.0, 100.0, 100.0));
    let prompt = graph.add_node(
        NodeSpec::new(NodeType::Prompt)
            .with_prop("text", "Hello from wireflow")
            .with_bounds(220.0, 120.0, 200.0, 160.0),
    );
    let text = graph.add_node(NodeSpec::new(NodeType::Text).with_bounds(500.0, 120.0, 200.0, 160.0));

    connect(&mut graph, &registry, trigger, prompt)?;
    connect(&mut graph, &registry, prompt, text)?;

    let json = serde_json::to_string_pretty(&graph)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example graph: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  wire run --file {}", output.display());

    Ok(())
}

fn show_history(history: PathBuf) -> Result<()> {
    let store = RunStateStore::with_history_file(&history)?;
    let records = store.history();

    if records.is_empty() {
        println!("No runs recorded in {}", history.display());
        return Ok(());
    }

    println!("📜 Run history ({}):", history.display());
    for record in records {
        match record.status {
            RunStatus::Completed => {
                println!(
                    "  ✅ {}  {}  {} node(s) completed",
                    record.finished_at.format("%Y-%m-%d %H:%M:%S"),
                    record.run_id,
                    record.completed.len()
                );
            }
            RunStatus::Failed { node, reason } => {
                println!(
                    "  ❌ {}  {}  failed at {}: {}",
                    record.finished_at.format("%Y-%m-%d %H:%M:%S"),
                    record.run_id,
                    node,
                    reason
                );
            }
        }
    }
    Ok(())
}
