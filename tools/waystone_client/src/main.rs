use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use uuid::Uuid;
use waystone_core::command_text::{parse_view_command, ViewCommand};
use waystone_core::network::CommandClient;
use waystone_core::{
    load_server_config_from_env, CommandDispatcher, CostPredictor, ListViewModel, PlayerId,
    Requester, RowActions, SelectionContext, SessionHello, SortDirection, WarpMode, WaystoneId,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal waystone list for a running list server", long_about = None)]
struct Args {
    /// Server command address
    #[arg(long, default_value = "127.0.0.1:41100")]
    addr: String,

    /// Player UUID to open the list for
    #[arg(long)]
    player: Uuid,

    /// Waystone the selection starts from
    #[arg(long)]
    origin: Option<Uuid>,

    #[arg(long, value_enum, default_value_t = Mode::Free)]
    mode: Mode,

    /// Pretend viewport height used to size pages
    #[arg(long, default_value_t = 480)]
    height: u32,

    #[arg(long)]
    no_sort: bool,

    #[arg(long)]
    no_delete: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Free,
    WarpStone,
    InventoryItem,
}

impl From<Mode> for WarpMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Free => WarpMode::Free,
            Mode::WarpStone => WarpMode::WarpStone,
            Mode::InventoryItem => WarpMode::InventoryItem,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    // Cost and view settings come from the same config file as the server.
    let (config, _) = load_server_config_from_env();
    let player = PlayerId(args.player);
    let hello = SessionHello {
        player,
        warp_mode: args.mode.into(),
        origin: args.origin.map(WaystoneId),
    };
    let (client, snapshot) = CommandClient::connect(args.addr.as_str(), &hello)
        .with_context(|| format!("Failed to open waystone list at {}", args.addr))?;
    info!(
        target: "waystones::client",
        addr = %args.addr,
        %player,
        entries = snapshot.waystones.len(),
        "Connected to waystone list server"
    );

    let mut actions = RowActions::default();
    if args.no_sort {
        actions.remove(RowActions::SORTABLE);
    }
    if args.no_delete {
        actions.remove(RowActions::DELETABLE);
    }
    let view = ListViewModel::for_viewport(Vec::new(), config.view.clone(), args.height)
        .with_actions(actions);
    let mut dispatcher = CommandDispatcher::new(
        view,
        // The snapshot carries the override capability the server resolved.
        Requester::new(player, false),
        SelectionContext {
            origin: hello.origin,
            warp_mode: hello.warp_mode,
        },
        CostPredictor::new(config.cost.clone()),
        client,
    );
    dispatcher.apply_snapshot(snapshot);

    let mut out = io::stdout().lock();
    render(&dispatcher, &mut out)?;
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read command")?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match parse_view_command(&line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(out, "! {err}")?;
                continue;
            }
        };
        if command == ViewCommand::Quit {
            break;
        }
        if !apply(&mut dispatcher, command) {
            writeln!(out, "! not available")?;
        }
        render(&dispatcher, &mut out)?;
    }
    Ok(())
}

/// Returns false when the command names a slot or action that is not offered.
fn apply(dispatcher: &mut CommandDispatcher<CommandClient>, command: ViewCommand) -> bool {
    let rows = dispatcher.rows();
    let row = |slot: usize| rows.iter().find(|row| row.slot == slot);
    match command {
        ViewCommand::Search(text) => dispatcher.view_mut().set_search_text(text),
        ViewCommand::Page(page) => dispatcher.view_mut().set_page(page),
        ViewCommand::Next { jump } => dispatcher.view_mut().next_page(jump),
        ViewCommand::Prev { jump } => dispatcher.view_mut().previous_page(jump),
        ViewCommand::Up { slot, jump } => {
            return match row(slot) {
                Some(row) if row.sort_up.is_some() => {
                    dispatcher.sort_entry(row.list_index, SortDirection::Up, jump)
                }
                _ => false,
            };
        }
        ViewCommand::Down { slot, jump } => {
            return match row(slot) {
                Some(row) if row.sort_down.is_some() => {
                    dispatcher.sort_entry(row.list_index, SortDirection::Down, jump)
                }
                _ => false,
            };
        }
        ViewCommand::Select { slot } => {
            return match row(slot) {
                Some(row) if row.selectable => dispatcher.select(row.waystone.id),
                _ => false,
            };
        }
        ViewCommand::Remove { slot } => {
            return match row(slot) {
                Some(row) if row.deletable => dispatcher.remove(row.waystone.id),
                _ => false,
            };
        }
        ViewCommand::Edit { slot: None } => return dispatcher.request_origin_edit(),
        ViewCommand::Edit { slot: Some(slot) } => {
            return match row(slot) {
                Some(row) => dispatcher.request_edit(row.waystone.id),
                None => false,
            };
        }
        ViewCommand::Show | ViewCommand::Quit => {}
    }
    true
}

fn render(dispatcher: &CommandDispatcher<CommandClient>, out: &mut impl Write) -> io::Result<()> {
    let view = dispatcher.view();
    writeln!(out)?;
    if let Some(header) = dispatcher.origin_header() {
        let label = header.label.as_deref().unwrap_or("<unnamed waystone>");
        let marker = if header.editable { " (edit)" } else { "" };
        writeln!(out, "Current location: {label}{marker}")?;
    }
    if view.is_empty() {
        writeln!(out, "No waystones activated.")?;
        return Ok(());
    }
    if !view.search_text().is_empty() {
        writeln!(out, "Search: {}", view.search_text())?;
    }
    for row in dispatcher.rows() {
        let mut flags = String::new();
        flags.push(if row.sort_up.is_some() { '^' } else { ' ' });
        flags.push(if row.sort_down.is_some() { 'v' } else { ' ' });
        flags.push(if row.deletable { 'x' } else { ' ' });
        let dimmed = if row.selectable { "" } else { " [here]" };
        let cost = if row.cost > 0 {
            format!(" ({} lvl)", row.cost)
        } else {
            String::new()
        };
        writeln!(out, "{:>2} {flags} {}{cost}{dimmed}", row.slot, row.waystone.name)?;
    }
    let nav = view.navigation_state();
    writeln!(
        out,
        "page {}/{} {}{}",
        view.page_offset() + 1,
        view.page_count().max(1),
        if nav.prev_enabled { "<prev " } else { "" },
        if nav.next_enabled { "next>" } else { "" },
    )
}
