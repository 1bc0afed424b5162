//! Authoritative handling of list commands.
//!
//! The handler is the only place the persisted lists change. Callers feed it
//! one command at a time from a single queue, so commands of one player apply
//! in arrival order. Invalid, stale or forbidden commands are dropped and
//! logged; nothing is reported back to the client.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};
use waystone_proto::{ListSnapshot, PlayerId, SessionHello, WaystoneId, WaystoneRef, WireMessage};

use crate::cost::CostPredictor;
use crate::permissions::{may_edit, may_remove, CapabilityQuery, Requester, SelectionContext};
use crate::store::{StoreError, WaystoneStore};

/// Identifier of one client connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub player: PlayerId,
    pub selection: SelectionContext,
}

/// Everything the teleport collaborator needs to carry out a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TeleportRequest {
    pub player: PlayerId,
    pub target: WaystoneRef,
    pub origin: Option<WaystoneRef>,
    pub selection: SelectionContext,
    pub predicted_cost: u32,
}

pub trait TeleportService {
    fn teleport(&mut self, request: TeleportRequest);
}

pub trait EditSessionService {
    fn open_edit(&mut self, player: PlayerId, waystone: WaystoneRef);
}

/// Why a command had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutOfRange {
        index: usize,
        other_index: usize,
        len: usize,
    },
    NotFound(WaystoneId),
    PermissionDenied(WaystoneId),
    SenderUnavailable(SessionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The list changed and was persisted.
    Applied,
    /// Handed to an external collaborator.
    Forwarded,
    /// Valid but nothing to do.
    Unchanged,
    Rejected(Rejection),
}

pub struct AuthoritativeListHandler<S> {
    store: S,
    sessions: HashMap<SessionId, Session>,
    capabilities: Box<dyn CapabilityQuery + Send>,
    teleports: Box<dyn TeleportService + Send>,
    edits: Box<dyn EditSessionService + Send>,
    costs: CostPredictor,
}

impl<S: WaystoneStore> AuthoritativeListHandler<S> {
    pub fn new(
        store: S,
        capabilities: Box<dyn CapabilityQuery + Send>,
        teleports: Box<dyn TeleportService + Send>,
        edits: Box<dyn EditSessionService + Send>,
        costs: CostPredictor,
    ) -> Self {
        Self {
            store,
            sessions: HashMap::new(),
            capabilities,
            teleports,
            edits,
            costs,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self, session: SessionId) -> Option<&Session> {
        self.sessions.get(&session)
    }

    /// Register a connection and return the snapshot the client starts from.
    pub fn open_session(
        &mut self,
        session: SessionId,
        hello: &SessionHello,
    ) -> Result<ListSnapshot, StoreError> {
        let list = self.store.get(hello.player)?;
        let origin = hello.origin.and_then(|id| list.find(id).cloned());
        let requester = Requester::resolve(hello.player, self.capabilities.as_ref());
        self.sessions.insert(
            session,
            Session {
                player: hello.player,
                selection: SelectionContext {
                    origin: hello.origin,
                    warp_mode: hello.warp_mode,
                },
            },
        );
        info!(
            target: "waystones::server",
            %session,
            player = %hello.player,
            entries = list.len(),
            "session.opened"
        );
        Ok(ListSnapshot {
            player: Some(hello.player),
            waystones: list.into_entries(),
            origin,
            override_capability: requester.override_capability,
        })
    }

    pub fn close_session(&mut self, session: SessionId) {
        if let Some(closed) = self.sessions.remove(&session) {
            info!(
                target: "waystones::server",
                %session,
                player = %closed.player,
                "session.closed"
            );
        }
    }

    pub fn handle(
        &mut self,
        session: SessionId,
        message: WireMessage,
    ) -> Result<HandleOutcome, StoreError> {
        let Some(sender) = self.sessions.get(&session).copied() else {
            debug!(
                target: "waystones::server",
                %session,
                kind = message.kind(),
                "command.dropped=sender_unavailable"
            );
            return Ok(HandleOutcome::Rejected(Rejection::SenderUnavailable(
                session,
            )));
        };
        let requester = Requester::resolve(sender.player, self.capabilities.as_ref());

        let outcome = match message {
            WireMessage::Select { waystone } => self.select(&sender, &requester, waystone)?,
            WireMessage::Sort { index, other_index } => {
                self.sort(sender.player, usize::from(index), usize::from(other_index))?
            }
            WireMessage::Remove { waystone } => self.remove(&requester, waystone)?,
            WireMessage::RequestEdit { waystone } => self.request_edit(&requester, waystone)?,
        };

        match outcome {
            HandleOutcome::Rejected(reason) => warn!(
                target: "waystones::server",
                player = %sender.player,
                kind = message.kind(),
                ?reason,
                "command.rejected"
            ),
            _ => debug!(
                target: "waystones::server",
                player = %sender.player,
                kind = message.kind(),
                ?outcome,
                "command.handled"
            ),
        }
        Ok(outcome)
    }

    fn select(
        &mut self,
        sender: &Session,
        requester: &Requester,
        id: WaystoneId,
    ) -> Result<HandleOutcome, StoreError> {
        let list = self.store.get(sender.player)?;
        let Some(target) = list.find(id).cloned() else {
            return Ok(HandleOutcome::Rejected(Rejection::NotFound(id)));
        };
        let origin = sender.selection.origin.and_then(|origin| list.find(origin).cloned());
        let predicted_cost = self.costs.predict(
            requester,
            &target,
            sender.selection.warp_mode,
            origin.as_ref(),
        );
        self.teleports.teleport(TeleportRequest {
            player: sender.player,
            target,
            origin,
            selection: sender.selection,
            predicted_cost,
        });
        Ok(HandleOutcome::Forwarded)
    }

    fn sort(
        &mut self,
        player: PlayerId,
        index: usize,
        other_index: usize,
    ) -> Result<HandleOutcome, StoreError> {
        let mut list = self.store.get(player)?;
        match list.swap(index, other_index) {
            Err(_) => Ok(HandleOutcome::Rejected(Rejection::OutOfRange {
                index,
                other_index,
                len: list.len(),
            })),
            Ok(false) => Ok(HandleOutcome::Unchanged),
            Ok(true) => {
                self.store.put(player, &list)?;
                Ok(HandleOutcome::Applied)
            }
        }
    }

    fn remove(&mut self, requester: &Requester, id: WaystoneId) -> Result<HandleOutcome, StoreError> {
        let mut list = self.store.get(requester.player)?;
        let Some(target) = list.find(id) else {
            return Ok(HandleOutcome::Rejected(Rejection::NotFound(id)));
        };
        if !may_remove(requester, target).is_allowed() {
            return Ok(HandleOutcome::Rejected(Rejection::PermissionDenied(id)));
        }
        list.remove(id);
        self.store.put(requester.player, &list)?;
        Ok(HandleOutcome::Applied)
    }

    fn request_edit(
        &mut self,
        requester: &Requester,
        id: WaystoneId,
    ) -> Result<HandleOutcome, StoreError> {
        let list = self.store.get(requester.player)?;
        let Some(target) = list.find(id).cloned() else {
            return Ok(HandleOutcome::Rejected(Rejection::NotFound(id)));
        };
        if !may_edit(requester, &target).is_allowed() {
            return Ok(HandleOutcome::Rejected(Rejection::PermissionDenied(id)));
        }
        self.edits.open_edit(requester.player, target);
        Ok(HandleOutcome::Forwarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::PlayerWaystoneList;
    use crate::store::MemoryStore;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;
    use waystone_proto::WarpMode;

    #[derive(Clone, Default)]
    struct Recorder {
        teleports: Arc<Mutex<Vec<TeleportRequest>>>,
        edits: Arc<Mutex<Vec<(PlayerId, WaystoneId)>>>,
    }

    impl TeleportService for Recorder {
        fn teleport(&mut self, request: TeleportRequest) {
            self.teleports.lock().unwrap().push(request);
        }
    }

    impl EditSessionService for Recorder {
        fn open_edit(&mut self, player: PlayerId, waystone: WaystoneRef) {
            self.edits.lock().unwrap().push((player, waystone.id));
        }
    }

    const SESSION: SessionId = SessionId(1);

    fn alice() -> PlayerId {
        PlayerId(Uuid::from_u128(1))
    }

    fn operator() -> PlayerId {
        PlayerId(Uuid::from_u128(2))
    }

    fn id(n: u128) -> WaystoneId {
        WaystoneId(Uuid::from_u128(n))
    }

    fn list_for(player: PlayerId) -> PlayerWaystoneList {
        PlayerWaystoneList::new(vec![
            WaystoneRef::new(id(10), "A").owned_by(player),
            WaystoneRef::new(id(11), "B").owned_by(player),
            WaystoneRef::new(id(12), "C").global(),
        ])
    }

    fn handler_for(player: PlayerId) -> (AuthoritativeListHandler<MemoryStore>, Recorder) {
        let recorder = Recorder::default();
        let store = MemoryStore::new().with_list(player, list_for(player));
        let mut handler = AuthoritativeListHandler::new(
            store,
            Box::new(vec![operator()]),
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
            CostPredictor::default(),
        );
        handler
            .open_session(
                SESSION,
                &SessionHello {
                    player,
                    warp_mode: WarpMode::WarpStone,
                    origin: Some(id(10)),
                },
            )
            .expect("open");
        (handler, recorder)
    }

    fn names(handler: &AuthoritativeListHandler<MemoryStore>, player: PlayerId) -> Vec<String> {
        handler
            .store()
            .get(player)
            .expect("get")
            .entries()
            .iter()
            .map(|w| w.name.clone())
            .collect()
    }

    #[test]
    fn open_session_returns_snapshot_with_origin() {
        let mut handler = handler_for(alice()).0;
        let snapshot = handler
            .open_session(
                SessionId(5),
                &SessionHello {
                    player: alice(),
                    warp_mode: WarpMode::Free,
                    origin: Some(id(11)),
                },
            )
            .expect("open");
        assert_eq!(snapshot.waystones.len(), 3);
        assert_eq!(snapshot.origin.map(|w| w.name), Some("B".to_string()));
        assert!(!snapshot.override_capability);
    }

    #[test]
    fn snapshot_carries_resolved_override() {
        let mut handler = handler_for(alice()).0;
        let snapshot = handler
            .open_session(
                SessionId(6),
                &SessionHello {
                    player: operator(),
                    warp_mode: WarpMode::WarpStone,
                    origin: None,
                },
            )
            .expect("open");
        assert!(snapshot.override_capability);
    }

    #[test]
    fn sort_is_an_involution_and_persists() {
        let (mut handler, _) = handler_for(alice());
        let sort = WireMessage::Sort {
            index: 0,
            other_index: 1,
        };
        assert_eq!(handler.handle(SESSION, sort).expect("handle"), HandleOutcome::Applied);
        assert_eq!(names(&handler, alice()), ["B", "A", "C"]);
        assert_eq!(handler.handle(SESSION, sort).expect("handle"), HandleOutcome::Applied);
        assert_eq!(names(&handler, alice()), ["A", "B", "C"]);
        assert_eq!(handler.store().writes(), 2);
    }

    #[test]
    fn every_valid_sort_pair_undoes_itself() {
        let len = list_for(alice()).len() as u8;
        for index in 0..len {
            for other_index in (0..len).filter(|&other| other != index) {
                let (mut handler, _) = handler_for(alice());
                let sort = WireMessage::Sort { index, other_index };
                assert_eq!(handler.handle(SESSION, sort).expect("handle"), HandleOutcome::Applied);
                assert_ne!(names(&handler, alice()), ["A", "B", "C"], "{index}<->{other_index}");
                assert_eq!(handler.handle(SESSION, sort).expect("handle"), HandleOutcome::Applied);
                assert_eq!(names(&handler, alice()), ["A", "B", "C"], "{index}<->{other_index}");
            }
        }
    }

    #[test]
    fn out_of_range_sort_is_not_persisted() {
        let (mut handler, _) = handler_for(alice());
        let outcome = handler
            .handle(
                SESSION,
                WireMessage::Sort {
                    index: 1,
                    other_index: 3,
                },
            )
            .expect("handle");
        assert_eq!(
            outcome,
            HandleOutcome::Rejected(Rejection::OutOfRange {
                index: 1,
                other_index: 3,
                len: 3,
            })
        );
        assert_eq!(handler.store().writes(), 0);
        assert_eq!(names(&handler, alice()), ["A", "B", "C"]);
    }

    #[test]
    fn remove_absent_id_is_a_noop() {
        let (mut handler, _) = handler_for(alice());
        let outcome = handler
            .handle(SESSION, WireMessage::Remove { waystone: id(99) })
            .expect("handle");
        assert_eq!(outcome, HandleOutcome::Rejected(Rejection::NotFound(id(99))));
        assert_eq!(names(&handler, alice()), ["A", "B", "C"]);
        assert_eq!(handler.store().writes(), 0);
    }

    #[test]
    fn remove_compacts_and_respects_permissions() {
        let (mut handler, _) = handler_for(alice());
        let denied = handler
            .handle(SESSION, WireMessage::Remove { waystone: id(12) })
            .expect("handle");
        assert_eq!(
            denied,
            HandleOutcome::Rejected(Rejection::PermissionDenied(id(12)))
        );

        let applied = handler
            .handle(SESSION, WireMessage::Remove { waystone: id(10) })
            .expect("handle");
        assert_eq!(applied, HandleOutcome::Applied);
        let list = handler.store().get(alice()).expect("get");
        assert_eq!(list.len(), 2);
        assert_eq!(list.entries()[0].sort_index, 0);
        assert_eq!(list.entries()[1].sort_index, 1);
    }

    #[test]
    fn operator_may_remove_global() {
        let (mut handler, _) = handler_for(operator());
        let outcome = handler
            .handle(SESSION, WireMessage::Remove { waystone: id(12) })
            .expect("handle");
        assert_eq!(outcome, HandleOutcome::Applied);
        assert_eq!(names(&handler, operator()), ["A", "B"]);
    }

    #[test]
    fn select_hands_off_with_context() {
        let (mut handler, recorder) = handler_for(alice());
        let outcome = handler
            .handle(SESSION, WireMessage::Select { waystone: id(11) })
            .expect("handle");
        assert_eq!(outcome, HandleOutcome::Forwarded);
        let teleports = recorder.teleports.lock().unwrap();
        assert_eq!(teleports.len(), 1);
        assert_eq!(teleports[0].target.id, id(11));
        assert_eq!(teleports[0].origin.as_ref().map(|w| w.id), Some(id(10)));
        assert_eq!(teleports[0].selection.warp_mode, WarpMode::WarpStone);

        let missing = handler
            .handle(SESSION, WireMessage::Select { waystone: id(77) })
            .expect("handle");
        assert_eq!(missing, HandleOutcome::Rejected(Rejection::NotFound(id(77))));
    }

    #[test]
    fn request_edit_is_forwarded_only_when_allowed() {
        let (mut handler, recorder) = handler_for(alice());
        assert_eq!(
            handler
                .handle(SESSION, WireMessage::RequestEdit { waystone: id(10) })
                .expect("handle"),
            HandleOutcome::Forwarded
        );
        assert_eq!(
            handler
                .handle(SESSION, WireMessage::RequestEdit { waystone: id(12) })
                .expect("handle"),
            HandleOutcome::Rejected(Rejection::PermissionDenied(id(12)))
        );
        assert_eq!(*recorder.edits.lock().unwrap(), vec![(alice(), id(10))]);
    }

    #[test]
    fn closed_session_drops_commands() {
        let (mut handler, _) = handler_for(alice());
        handler.close_session(SESSION);
        let outcome = handler
            .handle(
                SESSION,
                WireMessage::Sort {
                    index: 0,
                    other_index: 1,
                },
            )
            .expect("handle");
        assert_eq!(
            outcome,
            HandleOutcome::Rejected(Rejection::SenderUnavailable(SESSION))
        );
        assert_eq!(handler.store().writes(), 0);
    }
}
