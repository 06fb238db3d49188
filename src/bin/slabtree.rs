//! slabtree demo binary
//!
//! Exercises the tree end to end and writes Graphviz dumps along the way.
//!
//! # Examples
//!
//! ```bash
//! # Build a small tree from loose nodes and dump each step
//! slabtree demo --dump-dir dumps
//!
//! # Grow far beyond the pool capacity and print allocator statistics
//! slabtree stress --nodes 10000 --pool-capacity 64
//! ```

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use slabtree::{Position, Tree, TreeConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// slabtree - binary trees over slab-allocated nodes
#[derive(Parser, Debug)]
#[command(name = "slabtree")]
#[command(version = slabtree::VERSION)]
#[command(about = "Binary trees over slab-allocated nodes", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SLABTREE_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory path; file logging is off when unset
    #[arg(long, global = true, env = "SLABTREE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a tree from loose nodes, mutate it and dump every step
    Demo(DemoArgs),

    /// Insert many nodes and report allocator statistics
    Stress(StressArgs),

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Directory receiving the dumps (overrides the configuration)
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Do not invoke the Graphviz renderer
    #[arg(long)]
    no_render: bool,
}

#[derive(Args, Debug)]
struct StressArgs {
    /// Number of nodes to insert
    #[arg(short, long, default_value = "10000")]
    nodes: usize,

    /// Blocks per allocator pool (overrides the configuration)
    #[arg(short, long)]
    pool_capacity: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(&cli)?;

    let config = TreeConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Execute command
    match cli.command {
        Commands::Demo(args) => demo_command(config, args),
        Commands::Stress(args) => stress_command(config, args),
        Commands::Version => {
            println!("slabtree {}", slabtree::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with console output and optional rolling files
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let file_layer = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "slabtree.log");
            Some(fmt::layer().with_writer(file_appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(file_layer)
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

fn print_i32(out: &mut dyn Write, value: &i32) -> io::Result<()> {
    write!(out, "{}", value)
}

/// Dump the tree, logging instead of failing
fn dump_step(tree: &Tree<i32>, step: &str) {
    match tree.dump(step) {
        Ok(report) => {
            info!(step, dir = %report.dir.display(), "Dump written");
            if let Some(e) = report.render_error {
                warn!(step, error = %e, "Dump image not rendered");
            }
        }
        Err(e) => warn!(step, error = %e, "Dump failed"),
    }
}

/// Demo command - the classic loose-node walkthrough
fn demo_command(mut config: TreeConfig, args: DemoArgs) -> anyhow::Result<()> {
    if let Some(dir) = args.dump_dir {
        config.dump.base_path = dir;
    }
    if args.no_render {
        config.dump.render_image = false;
    }
    config.pool_capacity = 20;

    let mut tree: Tree<i32> = Tree::new(config)?;
    tree.set_printer(print_i32);

    let node1 = tree.create_loose(1)?;
    let node3 = tree.create_loose(3)?;
    tree.hang_loose_at_left(node1, node3)?;
    let node2 = tree.create_loose(2)?;
    tree.hang_loose_at_right(node2, node3)?;
    dump_step(&tree, "loose subtree under 3");

    tree.delete_right_child(node3)?;
    dump_step(&tree, "deleted right child of 3");

    let node4 = tree.create_loose(4)?;
    let node5 = tree.create_loose(5)?;
    tree.hang_loose_at_right(node5, node4)?;
    let node6 = tree.create_loose(6)?;
    tree.hang_loose_at_left(node6, node5)?;
    tree.hang_loose_as_root(node4)?;
    tree.hang_loose_at_left(node3, node4)?;
    dump_step(&tree, "assembled tree rooted at 4");

    let copy = tree.copy_subtree_within(Position::Right(node6), node3)?;
    dump_step(&tree, "copied subtree 3 below 6");

    tree.migrate_subtree_into_left(node4, copy)?;
    dump_step(&tree, "migrated copy into left of 4");

    let deleted = tree.delete_subtree(node5)?;
    dump_step(&tree, "deleted subtree 5");

    let flags = tree.verify();
    println!("nodes: {}, depth: {}, deleted: {}", tree.len(), tree.depth(), deleted);
    println!("{}", flags);

    let cleared = tree.clear()?;
    println!("cleared {} nodes; all is ok", cleared);
    Ok(())
}

/// Stress command - grow the allocator and report statistics
fn stress_command(mut config: TreeConfig, args: StressArgs) -> anyhow::Result<()> {
    if let Some(capacity) = args.pool_capacity {
        config.pool_capacity = capacity;
    }
    // Per-operation verification makes the loop quadratic
    config.self_check = false;

    let mut tree: Tree<u64> = Tree::new(config)?;
    let Some(first) = (args.nodes > 0).then(|| tree.insert_root(0)).transpose()? else {
        println!("nothing to insert");
        return Ok(());
    };

    // Fill level by level
    let mut frontier = std::collections::VecDeque::from([first]);
    let mut inserted = 1;
    while inserted < args.nodes {
        let Some(parent) = frontier.pop_front() else {
            break;
        };
        for position in [Position::Left(parent), Position::Right(parent)] {
            if inserted == args.nodes {
                break;
            }
            frontier.push_back(tree.insert_at(position, inserted as u64)?);
            inserted += 1;
        }
    }

    let stats = tree.slab_stats();
    info!(
        nodes = tree.len(),
        depth = tree.depth(),
        pools = stats.pools.len(),
        "Stress run finished"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    anyhow::ensure!(tree.verify().is_empty(), "tree failed verification: {}", tree.verify());
    Ok(())
}
