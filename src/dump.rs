//! Graphviz dumps of a tree
//!
//! A dump is a diagnostic artifact only: it reads the enumeration list and
//! the child links, and its failure never touches the tree.
//!
//! # Layout
//!
//! ```text
//! <base_path>/
//!   └─→ 2026-10-18_12-40-07.123456/
//!        ├─→ dump.dot    (Graphviz source)
//!        ├─→ dump.json   (metadata + node records)
//!        └─→ dump.svg    (rendered, if the renderer is available)
//! ```

use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree};
use crate::verify::VerifyFlags;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Write as _};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info, warn};

/// Element printer: writes one element to the dump
pub type PrintFn<T> = fn(&mut dyn Write, &T) -> io::Result<()>;

const COLOR_BG: &str = "#2D4059";
const COLOR_NODE: &str = "#ECC237";
const COLOR_NODE_FILL: &str = "#EA5455";
const COLOR_LABEL: &str = "#EA5455";
const COLOR_LABEL_FILL: &str = "#ECC237";
const COLOR_EDGE_LEFT: &str = "#F07B3F";
const COLOR_EDGE_RIGHT: &str = "#FFD460";

/// Dump configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Dump automatically when a self-check fails
    ///
    /// Off by default so that a library user never gets directories created
    /// as a side effect; the failed check is still logged and returned as
    /// `Error::Verification`. Set `dump.enabled = true` (or
    /// `SLABTREE_DUMP__ENABLED=true`) to pair every failure with a dump.
    pub enabled: bool,
    /// Directory receiving one timestamped folder per dump
    pub base_path: PathBuf,
    /// Run the renderer on the generated Graphviz file
    pub render_image: bool,
    /// Renderer executable
    pub renderer: String,
    /// Output format passed to the renderer as `-T<format>`
    pub image_format: String,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_path: PathBuf::from("dumps"),
            render_image: true,
            renderer: "dot".to_string(),
            image_format: "svg".to_string(),
        }
    }
}

/// Files produced by one dump
#[derive(Debug, Clone)]
pub struct DumpReport {
    pub dir: PathBuf,
    pub dot_path: PathBuf,
    pub json_path: PathBuf,
    /// Rendered image, if rendering was requested and succeeded
    pub image_path: Option<PathBuf>,
    /// Why rendering failed, if it did
    pub render_error: Option<String>,
}

/// Tree metadata written to `dump.json`
#[derive(Debug, Clone, Serialize)]
pub struct DumpMeta {
    pub created_at: DateTime<Local>,
    pub reason: String,
    pub element_size: usize,
    pub node_count: usize,
    pub depth: usize,
    pub root: Option<String>,
    pub head: Option<String>,
    pub verify_bits: u64,
    pub verify_messages: Vec<&'static str>,
    pub nodes: Vec<DumpNode>,
}

/// One enumerated node
#[derive(Debug, Clone, Serialize)]
pub struct DumpNode {
    pub index: usize,
    pub id: String,
    pub level: usize,
    pub element: String,
    pub left: Option<String>,
    pub right: Option<String>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Writes dumps of trees below a configured directory
#[derive(Debug, Clone)]
pub struct TreeDumper {
    config: DumpConfig,
}

impl TreeDumper {
    pub fn new(config: DumpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    /// Dump using the tree's installed printer
    ///
    /// Elements render as `?` when no printer is installed.
    pub fn dump<T>(&self, tree: &Tree<T>, flags: VerifyFlags, reason: &str) -> Result<DumpReport> {
        match tree.printer() {
            Some(printer) => self.dump_with(tree, flags, reason, &printer),
            None => self.dump_with(tree, flags, reason, &|out: &mut dyn Write, _: &T| {
                write!(out, "?")
            }),
        }
    }

    /// Dump rendering elements through `Display`
    pub fn dump_display<T: Display>(
        &self,
        tree: &Tree<T>,
        flags: VerifyFlags,
        reason: &str,
    ) -> Result<DumpReport> {
        self.dump_with(tree, flags, reason, &|out: &mut dyn Write, value: &T| {
            write!(out, "{}", value)
        })
    }

    /// Dump rendering elements through `print`
    pub fn dump_with<T>(
        &self,
        tree: &Tree<T>,
        flags: VerifyFlags,
        reason: &str,
        print: &dyn Fn(&mut dyn Write, &T) -> io::Result<()>,
    ) -> Result<DumpReport> {
        let meta = collect_meta(tree, flags, reason, print)?;
        let dir = self.create_dump_dir()?;

        let dot_path = dir.join("dump.dot");
        fs::write(&dot_path, render_dot(&meta))
            .map_err(|e| Error::Dump(format!("Failed to write {}: {}", dot_path.display(), e)))?;

        let json_path = dir.join("dump.json");
        let json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| Error::Dump(format!("Failed to serialize dump metadata: {}", e)))?;
        fs::write(&json_path, json)
            .map_err(|e| Error::Dump(format!("Failed to write {}: {}", json_path.display(), e)))?;

        let mut report = DumpReport {
            dir,
            dot_path,
            json_path,
            image_path: None,
            render_error: None,
        };

        if self.config.render_image {
            let image_path = report
                .dir
                .join(format!("dump.{}", self.config.image_format));
            match self.render_image(&report.dot_path, &image_path) {
                Ok(()) => report.image_path = Some(image_path),
                Err(e) => {
                    warn!(error = %e, "Tree dump image was not generated");
                    report.render_error = Some(e);
                }
            }
        }

        info!(dir = %report.dir.display(), reason, nodes = meta.node_count, "Tree dump written");
        Ok(report)
    }

    /// Create `<base_path>/<local timestamp>`, suffixed if it already exists
    fn create_dump_dir(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.base_path).map_err(|e| {
            Error::Dump(format!(
                "Failed to create dump directory {}: {}",
                self.config.base_path.display(),
                e
            ))
        })?;

        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S%.6f").to_string();
        let mut dir = self.config.base_path.join(&stamp);
        let mut attempt = 1;
        while dir.exists() {
            dir = self.config.base_path.join(format!("{}-{}", stamp, attempt));
            attempt += 1;
        }

        fs::create_dir(&dir)
            .map_err(|e| Error::Dump(format!("Failed to create {}: {}", dir.display(), e)))?;
        Ok(dir)
    }

    /// Run the renderer; its failure is reported, not raised
    fn render_image(&self, dot_path: &Path, image_path: &Path) -> std::result::Result<(), String> {
        let output = Command::new(&self.config.renderer)
            .arg(dot_path)
            .arg(format!("-T{}", self.config.image_format))
            .arg("-o")
            .arg(image_path)
            .output()
            .map_err(|e| format!("Failed to run '{}': {}", self.config.renderer, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(status = %output.status, "Renderer failed");
            return Err(format!(
                "'{}' exited with {}: {}",
                self.config.renderer,
                output.status,
                stderr.trim()
            ));
        }
        Ok(())
    }
}

impl<T> Tree<T> {
    /// Dump the tree with its current verification result
    pub fn dump(&self, reason: &str) -> Result<DumpReport> {
        TreeDumper::new(self.config.dump.clone()).dump(self, self.verify(), reason)
    }
}

/// Gather metadata and node records from the enumeration list
///
/// The walk stops after `node_count` nodes, so a corrupted list cannot loop.
pub fn collect_meta<T>(
    tree: &Tree<T>,
    flags: VerifyFlags,
    reason: &str,
    print: &dyn Fn(&mut dyn Write, &T) -> io::Result<()>,
) -> Result<DumpMeta> {
    let label = |id: Option<NodeId>| id.map(|id| id.to_string());

    let mut nodes = Vec::with_capacity(tree.len());
    for (index, (id, node)) in tree.iter().enumerate() {
        let mut element = Vec::new();
        print(&mut element, node.value())
            .map_err(|e| Error::Dump(format!("Failed to print element of {}: {}", id, e)))?;

        nodes.push(DumpNode {
            index,
            id: id.to_string(),
            level: node.level(),
            element: String::from_utf8_lossy(&element).into_owned(),
            left: label(node.left()),
            right: label(node.right()),
            prev: label(node.prev()),
            next: label(node.next()),
        });
    }
    if nodes.len() != tree.len() {
        error!(
            listed = nodes.len(),
            count = tree.len(),
            "Enumeration list is shorter than the node count"
        );
    }

    Ok(DumpMeta {
        created_at: Local::now(),
        reason: reason.to_string(),
        element_size: tree.element_size(),
        node_count: tree.len(),
        depth: tree.depth(),
        root: label(tree.root()),
        head: label(tree.head()),
        verify_bits: flags.bits(),
        verify_messages: flags.messages(),
        nodes,
    })
}

/// Render dump metadata as a Graphviz digraph
///
/// Edges are rebuilt by matching child ids against the enumeration order.
pub fn render_dot(meta: &DumpMeta) -> String {
    let mut dot = String::new();
    // Writing into a String cannot fail
    let _ = write_dot(&mut dot, meta);
    dot
}

fn write_dot(dot: &mut String, meta: &DumpMeta) -> std::fmt::Result {
    writeln!(dot, "digraph{{")?;
    writeln!(dot, "splines=ortho;")?;
    writeln!(dot, "bgcolor=\"{}\";\n", COLOR_BG)?;

    writeln!(
        dot,
        "NODE_TEXT[shape=note, fontname=\"verdana\", style=\"bold,filled\", color=\"{}\", fillcolor=\"{}\",",
        COLOR_LABEL, COLOR_LABEL_FILL
    )?;
    write!(dot, "label = \"{}\\n", escape_quoted(&format!("Tree dump ({})", meta.reason)))?;
    write!(
        dot,
        "element_size: {}; nodes_count: {};\\nroot: [{}]; head_of_all_nodes: [{}].\\ndepth: {}\\n",
        meta.element_size,
        meta.node_count,
        meta.root.as_deref().unwrap_or("none"),
        meta.head.as_deref().unwrap_or("none"),
        meta.depth
    )?;
    write!(dot, "Tree verification result: <{}>\\n", meta.verify_bits)?;
    for message in &meta.verify_messages {
        write!(dot, "----> {}\\n", message)?;
    }
    writeln!(dot, "\"]\n")?;

    for node in &meta.nodes {
        writeln!(
            dot,
            "NODE_{}[shape=\"plaintext\", fontname=\"verdana\", style=\"bold,filled\", color=\"{}\", fillcolor=\"{}\",",
            node.index, COLOR_NODE, COLOR_NODE_FILL
        )?;
        writeln!(dot, "label = <<table cellspacing=\"0\">")?;
        writeln!(dot, "<tr><td colspan=\"2\">id: [{}]</td></tr>", node.id)?;
        writeln!(dot, "<tr><td colspan=\"2\">level: {}</td></tr>", node.level)?;
        writeln!(dot, "<tr><td colspan=\"2\">data: {}</td></tr>", escape_html(&node.element))?;
        writeln!(
            dot,
            "<tr><td>left: [{}]</td><td>right: [{}]</td></tr>",
            node.left.as_deref().unwrap_or("none"),
            node.right.as_deref().unwrap_or("none")
        )?;
        writeln!(
            dot,
            "<tr><td>prev: [{}]</td><td>next: [{}]</td></tr></table>>];\n",
            node.prev.as_deref().unwrap_or("none"),
            node.next.as_deref().unwrap_or("none")
        )?;
    }

    let index_of = |id: &Option<String>| {
        id.as_ref()
            .and_then(|id| meta.nodes.iter().position(|n| &n.id == id))
    };
    for node in &meta.nodes {
        let left = index_of(&node.left);
        let right = index_of(&node.right);

        if let Some(left) = left {
            writeln!(
                dot,
                "NODE_{}->NODE_{}[color=\"{}\", penwidth=2];",
                node.index, left, COLOR_EDGE_LEFT
            )?;
        }
        if let Some(right) = right {
            writeln!(
                dot,
                "NODE_{}->NODE_{}[color=\"{}\", penwidth=2];",
                node.index, right, COLOR_EDGE_RIGHT
            )?;
        }
        if let (Some(left), Some(right)) = (left, right) {
            writeln!(dot, "NODE_{}->NODE_{}[style=invis];", left, right)?;
            writeln!(dot, "{{rank=same NODE_{} NODE_{}}}", left, right)?;
        }
    }

    writeln!(dot, "}}")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
