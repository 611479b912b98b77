//! Command-line front end for trellis layout files.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{filter::LevelFilter, fmt};
use trellis::{
    PropertyMap, Rect, Session, SessionConfig,
    deps::DependencyGraph,
    dump::{OutlineRow, dump, outline},
};

/// CLI flags for trellisctl.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity. Repeat for more detail.
    #[clap(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Session settings file (TOML).
    #[clap(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Template files to register before the layout is loaded.
    #[clap(long = "templates", value_name = "PATH", global = true)]
    templates: Vec<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// trellisctl subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Load a layout file and report problems.
    Check(FileArgs),
    /// List the groups of a layout file.
    Groups(FileArgs),
    /// Print templates in refresh order, inner templates first.
    Order(FileArgs),
    /// Show the component tree of every group.
    Show(ShowArgs),
    /// Build one instance of a template and show it.
    Instantiate(InstantiateArgs),
    /// Rewrite a layout file in normalised form.
    Fmt(FmtArgs),
}

/// Arguments naming a layout file.
#[derive(Parser, Debug)]
struct FileArgs {
    /// Layout file.
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

/// Arguments for `show`.
#[derive(Parser, Debug)]
struct ShowArgs {
    /// Layout file.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Only show this group.
    #[arg(long, value_name = "NAME")]
    group: Option<String>,

    /// Print component properties as JSON.
    #[arg(long)]
    json: bool,
}

/// Arguments for `instantiate`.
#[derive(Parser, Debug)]
struct InstantiateArgs {
    /// Layout file.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Template to instantiate.
    #[arg(value_name = "TEMPLATE")]
    template: String,

    /// Top-left corner of the instance.
    #[arg(long, value_name = "X,Y", value_parser = parse_point, default_value = "0,0")]
    at: (i32, i32),

    /// Print the instance outline as JSON.
    #[arg(long)]
    json: bool,
}

/// Arguments for `fmt`.
#[derive(Parser, Debug)]
struct FmtArgs {
    /// Layout file.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Write the result back instead of printing it.
    #[arg(long)]
    write: bool,
}

/// A group and its components, for JSON output.
#[derive(Serialize)]
struct GroupView {
    /// Group name.
    name: String,
    /// Component properties in tree order.
    components: Vec<PropertyMap>,
}

/// Parse an `X,Y` pair.
fn parse_point(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in {s}: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in {s}: {e}"))?;
    Ok((x, y))
}

/// Install a stderr subscriber at the level chosen by `-v` repetitions.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let format = fmt::format()
        .with_level(true)
        .with_target(false)
        .without_time()
        .compact();
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .event_format(format)
        .init();
}

/// Read session settings, falling back to defaults.
fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Build a session, register extra templates and load a layout file.
fn open(args: &Args, file: &Path) -> Result<Session> {
    let config = load_config(args.config.as_deref())?;
    tracing::debug!("session config: {config:?}");
    let mut session = Session::with_config(config);
    for path in &args.templates {
        session
            .load_templates(path)
            .with_context(|| format!("loading templates from {}", path.display()))?;
    }
    session
        .load(file)
        .with_context(|| format!("loading {}", file.display()))?;
    Ok(session)
}

/// Run the `check` subcommand.
fn check(args: &Args, a: &FileArgs) -> Result<()> {
    let mut session = open(args, &a.file)?;
    println!(
        "{}: {} groups, {} components",
        a.file.display(),
        session.groups().len(),
        session.component_names().len()
    );
    Ok(())
}

/// Run the `groups` subcommand.
fn groups(args: &Args, a: &FileArgs) -> Result<()> {
    let mut session = open(args, &a.file)?;
    for name in session.group_names() {
        let count = session.group_components(&name)?.len();
        println!("{name}\t{count}");
    }
    Ok(())
}

/// Run the `order` subcommand.
fn order(args: &Args, a: &FileArgs) -> Result<()> {
    let session = open(args, &a.file)?;
    for name in DependencyGraph::from_factories(session.factories()).order() {
        println!("{name}");
    }
    Ok(())
}

/// Run the `show` subcommand.
fn show(args: &Args, a: &ShowArgs) -> Result<()> {
    let mut session = open(args, &a.file)?;
    let names: Vec<String> = match &a.group {
        Some(g) if session.group(g).is_none() => bail!("no group named {g}"),
        Some(g) => vec![g.clone()],
        None => session.group_names(),
    };

    if a.json {
        let mut views = Vec::new();
        for name in names {
            let components = session
                .group_components(&name)?
                .into_iter()
                .filter_map(|id| session.properties(id))
                .collect();
            views.push(GroupView { name, components });
        }
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    for name in names {
        let root = session
            .group_root(&name)
            .with_context(|| format!("group {name} vanished"))?;
        println!("{}", dump(&mut session, root)?);
    }
    Ok(())
}

/// Run the `instantiate` subcommand.
fn instantiate(args: &Args, a: &InstantiateArgs) -> Result<()> {
    let mut session = open(args, &a.file)?;
    let bounds = session
        .factories()
        .template(&a.template)
        .with_context(|| format!("no template named {}", a.template))?
        .bounds();
    let name = session.unique_name();
    let rect = Rect::new(a.at.0, a.at.1, bounds.w, bounds.h);
    let id = session.create_detached(&a.template, &name, rect, "")?;

    if a.json {
        let rows: Vec<OutlineRow> = outline(&mut session, id)?;
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{}", dump(&mut session, id)?);
    }
    Ok(())
}

/// Run the `fmt` subcommand.
fn format_file(args: &Args, a: &FmtArgs) -> Result<()> {
    let mut session = open(args, &a.file)?;
    let text = session.save_to_string();
    if a.write {
        fs::write(&a.file, text).with_context(|| format!("writing {}", a.file.display()))?;
    } else {
        print!("{text}");
    }
    Ok(())
}

/// Run trellisctl.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    match &args.command {
        Command::Check(a) => check(&args, a),
        Command::Groups(a) => groups(&args, a),
        Command::Order(a) => order(&args, a),
        Command::Show(a) => show(&args, a),
        Command::Instantiate(a) => instantiate(&args, a),
        Command::Fmt(a) => format_file(&args, a),
    }
}
