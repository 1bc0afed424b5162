#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use uuid::Uuid;
use waystone_core::{
    AuthoritativeListHandler, CostPredictor, EditSessionService, PlayerId, PlayerWaystoneList,
    TeleportRequest, TeleportService, WaystoneId, WaystoneRef, WaystoneStore,
};

pub fn player(n: u128) -> PlayerId {
    PlayerId(Uuid::from_u128(n))
}

pub fn waystone_id(n: u128) -> WaystoneId {
    WaystoneId(Uuid::from_u128(0x1000 + n))
}

/// Waystones named after `names`, all owned by `owner`, ids numbered from 1.
pub fn owned_list(owner: PlayerId, names: &[&str]) -> PlayerWaystoneList {
    PlayerWaystoneList::new(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| WaystoneRef::new(waystone_id(i as u128 + 1), *name).owned_by(owner))
            .collect(),
    )
}

pub fn names(list: &[WaystoneRef]) -> Vec<String> {
    list.iter().map(|w| w.name.clone()).collect()
}

/// Collects every hand-off the handler makes to the world side.
#[derive(Clone, Default)]
pub struct Recorder {
    pub teleports: Arc<Mutex<Vec<TeleportRequest>>>,
    pub edits: Arc<Mutex<Vec<(PlayerId, WaystoneId)>>>,
}

impl TeleportService for Recorder {
    fn teleport(&mut self, request: TeleportRequest) {
        self.teleports.lock().expect("teleports poisoned").push(request);
    }
}

impl EditSessionService for Recorder {
    fn open_edit(&mut self, player: PlayerId, waystone: WaystoneRef) {
        self.edits
            .lock()
            .expect("edits poisoned")
            .push((player, waystone.id));
    }
}

pub fn handler_with<S: WaystoneStore>(
    store: S,
    operators: Vec<PlayerId>,
) -> (AuthoritativeListHandler<S>, Recorder) {
    let recorder = Recorder::default();
    let handler = AuthoritativeListHandler::new(
        store,
        Box::new(operators),
        Box::new(recorder.clone()),
        Box::new(recorder.clone()),
        CostPredictor::default(),
    );
    (handler, recorder)
}

pub fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("waystones-{label}-{}", Uuid::new_v4()))
}
