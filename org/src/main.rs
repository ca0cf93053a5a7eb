use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use orgsync::core::{EditConfig, NodeId, OutlineNode};
use orgsync::edits::{EditJournal, EditOperation, EditSession};
use orgsync::format::format_subtree;
use orgsync::identity::{is_outline_path, resolve_outline_path, resolve_stable_id};
use orgsync::parser::parse_node_markup;
use orgsync::store::MemoryStore;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "orgsync",
    about = "Diff and apply outline edits against Org snapshots",
    version
)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    /// JSON file with edit settings; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a node as Org markup.
    Show(ShowArgs),

    /// Print the stable identifier of a node.
    ResolveId(NodeArgs),

    /// Diff a node against a desired state given as Org markup.
    Diff(DiffArgs),

    /// Delete a node, emitting the matching edit.
    Delete(DeleteArgs),

    /// Stage a new node in the capture document.
    Capture(CaptureArgs),
}

#[derive(Debug, Args)]
struct NodeArgs {
    /// Snapshot file holding the outline store.
    snapshot: PathBuf,
    /// Node id or outline path (`olp:doc.org:Parent/Child`).
    node: String,
}

#[derive(Debug, Args)]
struct ShowArgs {
    #[command(flatten)]
    target: NodeArgs,
    /// Include every descendant.
    #[arg(long)]
    subtree: bool,
}

#[derive(Debug, Args)]
struct DiffArgs {
    #[command(flatten)]
    target: NodeArgs,
    /// Org file with the desired headline and body.
    desired: PathBuf,
    /// Refile under this node id.
    #[arg(long)]
    parent: Option<u64>,
    /// Outline path used when the refile parent id has no record.
    #[arg(long, default_value = "")]
    olp: String,
    /// Apply the edits, save the snapshot and print the edits journal.
    #[arg(long)]
    apply: bool,
    /// Emit JSON instead of one line per edit.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    #[command(flatten)]
    target: NodeArgs,
    /// Delete descendants as well, leaves first.
    #[arg(long)]
    subtree: bool,
}

#[derive(Debug, Args)]
struct CaptureArgs {
    /// Snapshot file holding the outline store.
    snapshot: PathBuf,
    /// Org file with the headline and body to capture.
    input: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Show(args) => handle_show(args),
        Commands::ResolveId(args) => handle_resolve_id(args),
        Commands::Diff(args) => handle_diff(args, &config),
        Commands::Delete(args) => handle_delete(args, &config),
        Commands::Capture(args) => handle_capture(args, &config),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EditConfig> {
    let Some(path) = path else {
        return Ok(EditConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("decoding config {:?}", path))
}

fn handle_show(args: ShowArgs) -> Result<()> {
    let store = MemoryStore::load_json(&args.target.snapshot)?;
    let text = show_text(&store, &args.target.node, args.subtree)?;
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn handle_resolve_id(args: NodeArgs) -> Result<()> {
    let store = MemoryStore::load_json(&args.snapshot)?;
    let node = select_node(&store, &args.node)?;
    println!("{}", stable_id_of(&store, &node)?);
    Ok(())
}

fn handle_diff(args: DiffArgs, config: &EditConfig) -> Result<()> {
    let DiffArgs {
        target,
        desired,
        parent,
        olp,
        apply,
        json,
    } = args;

    let mut store = MemoryStore::load_json(&target.snapshot)?;
    let markup =
        fs::read_to_string(&desired).with_context(|| format!("reading {:?}", desired))?;
    let request = DiffRequest {
        selector: &target.node,
        markup: &markup,
        parent: parent.map(NodeId),
        olp: &olp,
        apply,
    };
    let (edits, journal) = diff_node(&mut store, config, &request)?;

    print_edits(&edits, json)?;
    if apply {
        store.save_json(&target.snapshot)?;
        print!("{}", journal.to_text());
    }
    Ok(())
}

fn handle_delete(args: DeleteArgs, config: &EditConfig) -> Result<()> {
    let DeleteArgs { target, subtree } = args;
    let mut store = MemoryStore::load_json(&target.snapshot)?;
    let journal = delete_node(&mut store, config, &target.node, subtree)?;
    store.save_json(&target.snapshot)?;
    print!("{}", journal.to_text());
    Ok(())
}

fn handle_capture(args: CaptureArgs, config: &EditConfig) -> Result<()> {
    let CaptureArgs { snapshot, input } = args;
    let mut store = MemoryStore::load_json(&snapshot)?;
    let markup = fs::read_to_string(&input).with_context(|| format!("reading {:?}", input))?;
    let id = capture_node(&mut store, config, &markup, Local::now().naive_local())?;
    store.save_json(&snapshot)?;
    println!("{id}");
    Ok(())
}

/* ------------------------------ Helpers ------------------------------ */

/// Find a node by numeric id or outline path.
fn select_node(store: &MemoryStore, selector: &str) -> Result<OutlineNode> {
    if is_outline_path(selector) {
        return resolve_outline_path(store, selector)
            .with_context(|| format!("no node at {selector}"));
    }
    let id: u64 = selector
        .parse()
        .with_context(|| format!("{selector:?} is neither a node id nor an outline path"))?;
    Ok(OutlineNode::load(store, NodeId(id))?)
}

fn stable_id_of(store: &MemoryStore, node: &OutlineNode) -> Result<String> {
    let id = resolve_stable_id(node, store);
    if id.is_empty() {
        bail!("node {:?} has a broken ancestor chain", node.name);
    }
    Ok(id)
}

fn show_text(store: &MemoryStore, selector: &str, subtree: bool) -> Result<String> {
    let node = select_node(store, selector)?;
    if subtree {
        Ok(format_subtree(&node, store))
    } else {
        Ok(node.to_markup())
    }
}

struct DiffRequest<'a> {
    selector: &'a str,
    markup: &'a str,
    parent: Option<NodeId>,
    olp: &'a str,
    apply: bool,
}

/// Diff the selected node against `markup`; when applying, the store is updated and the
/// returned journal holds the rewritten entries.
fn diff_node(
    store: &mut MemoryStore,
    config: &EditConfig,
    request: &DiffRequest<'_>,
) -> Result<(Vec<EditOperation>, EditJournal)> {
    let mut existing = select_node(store, request.selector)?;
    let mut desired = parse_node_markup(request.markup, &config.todo_keywords)
        .context("parsing desired node")?;
    desired.parent_id = request.parent.or(existing.parent_id);

    if request.apply && !existing.is_editable(&*store, config) {
        bail!("node {:?} is not editable", existing.name);
    }

    let mut journal = EditJournal::default();
    let mut session = EditSession::new(store, &mut journal, config);
    let edits = if request.apply {
        session.diff_apply_persist(&mut existing, &desired, request.olp)?
    } else {
        session.diff(&mut existing, &desired, request.olp)?
    };
    debug!(count = edits.len(), apply = request.apply, "diff complete");
    Ok((edits, journal))
}

fn delete_node(
    store: &mut MemoryStore,
    config: &EditConfig,
    selector: &str,
    subtree: bool,
) -> Result<EditJournal> {
    let node = select_node(store, selector)?;
    if !node.is_editable(&*store, config) {
        bail!("node {:?} is not editable", node.name);
    }
    let mut journal = EditJournal::default();
    let mut session = EditSession::new(store, &mut journal, config);
    if subtree {
        session.delete_subtree(&node)?;
    } else {
        session.delete(&node)?;
    }
    Ok(journal)
}

fn capture_node(
    store: &mut MemoryStore,
    config: &EditConfig,
    markup: &str,
    now: NaiveDateTime,
) -> Result<NodeId> {
    let mut node = parse_node_markup(markup, &config.todo_keywords).context("parsing capture")?;
    let mut journal = EditJournal::default();
    let mut session = EditSession::new(store, &mut journal, config);
    Ok(session.capture(&mut node, now)?)
}

fn print_edits(edits: &[EditOperation], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(edits)?);
        return Ok(());
    }
    if edits.is_empty() {
        eprintln!("No changes.");
    }
    for edit in edits {
        println!("{:<10} {} {:?}", edit.kind, edit.target.stable_id, edit.value);
    }
    Ok(())
}
