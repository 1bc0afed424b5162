use anyhow::{Context, Result};
use tracing::info;

use waystone_core::network::{start_command_listener, SessionLoop};
use waystone_core::{
    load_server_config_from_env, AuthoritativeListHandler, CostPredictor, EditSessionService,
    JsonFileStore, PlayerId, TeleportRequest, TeleportService, WaystoneRef,
};

/// Stand-in for the world side: records the hand-off in the log.
struct LoggedTeleports;

impl TeleportService for LoggedTeleports {
    fn teleport(&mut self, request: TeleportRequest) {
        info!(
            target: "waystones::server",
            player = %request.player,
            target = %request.target.id,
            name = %request.target.name,
            warp_mode = ?request.selection.warp_mode,
            cost = request.predicted_cost,
            "teleport.requested"
        );
    }
}

struct LoggedEdits;

impl EditSessionService for LoggedEdits {
    fn open_edit(&mut self, player: PlayerId, waystone: WaystoneRef) {
        info!(
            target: "waystones::server",
            %player,
            waystone = %waystone.id,
            name = %waystone.name,
            "edit.requested"
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, metadata) = load_server_config_from_env();
    let store = JsonFileStore::new(&config.data_dir);
    let handler = AuthoritativeListHandler::new(
        store,
        Box::new(config.operators.clone()),
        Box::new(LoggedTeleports),
        Box::new(LoggedEdits),
        CostPredictor::new(config.cost.clone()),
    );

    let (events, local_addr) = start_command_listener(config.bind)
        .with_context(|| format!("command listener bind failed at {}", config.bind))?;

    info!(
        command_bind = %local_addr,
        data_dir = %config.data_dir.display(),
        operators = config.operators.len(),
        config = ?metadata.path(),
        "Waystone list server ready"
    );

    SessionLoop::new(handler).run(&events);
    Ok(())
}
