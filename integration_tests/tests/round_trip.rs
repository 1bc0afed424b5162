mod common;

use common::{handler_with, names, owned_list, player, waystone_id};
use waystone_core::{
    AuthoritativeListHandler, CommandDispatcher, CostPredictor, HandleOutcome, ListViewModel,
    MemoryStore, Rejection, Requester, SelectionContext, SessionHello, SessionId, SortDirection,
    ViewConfig, WarpMode, WaystoneRef, WaystoneStore, WireMessage,
};

const SESSION: SessionId = SessionId(1);

/// Open a session on a fresh handler and build a client from its snapshot.
fn connected(
    names: &[&str],
    extra: Vec<WaystoneRef>,
    override_capability: bool,
) -> (
    AuthoritativeListHandler<MemoryStore>,
    CommandDispatcher<Vec<WireMessage>>,
) {
    let alice = player(1);
    let mut entries = owned_list(alice, names).into_entries();
    entries.extend(extra);
    let store = MemoryStore::new().with_list(alice, entries.into());
    let operators = if override_capability {
        vec![alice]
    } else {
        Vec::new()
    };
    let (mut handler, _) = handler_with(store, operators);
    let hello = SessionHello {
        player: alice,
        warp_mode: WarpMode::InventoryItem,
        origin: None,
    };
    let snapshot = handler.open_session(SESSION, &hello).expect("open");
    let mut dispatcher = CommandDispatcher::new(
        ListViewModel::new(Vec::new(), ViewConfig::default(), 4),
        Requester::new(alice, override_capability),
        SelectionContext::default(),
        CostPredictor::default(),
        Vec::new(),
    );
    dispatcher.apply_snapshot(snapshot);
    (handler, dispatcher)
}

/// Push everything the client queued through the codec into the handler.
fn deliver(
    handler: &mut AuthoritativeListHandler<MemoryStore>,
    dispatcher: &mut CommandDispatcher<Vec<WireMessage>>,
) -> Vec<HandleOutcome> {
    let messages = std::mem::take(dispatcher.sink_mut());
    messages
        .into_iter()
        .map(|message| {
            let decoded = WireMessage::decode(&message.encode_to_vec()).expect("decode");
            assert_eq!(decoded, message);
            handler.handle(SESSION, decoded).expect("handle")
        })
        .collect()
}

fn server_names(handler: &AuthoritativeListHandler<MemoryStore>) -> Vec<String> {
    names(handler.store().get(player(1)).expect("get").entries())
}

#[test]
fn optimistic_sort_matches_server_state() {
    let (mut handler, mut client) = connected(&["A", "B", "C"], Vec::new(), false);
    assert!(client.sort(0, 1));
    assert_eq!(names(client.view().waystones()), ["B", "A", "C"]);
    assert_eq!(deliver(&mut handler, &mut client), [HandleOutcome::Applied]);
    assert_eq!(server_names(&handler), ["B", "A", "C"]);

    assert!(client.sort(0, 1));
    deliver(&mut handler, &mut client);
    assert_eq!(server_names(&handler), ["A", "B", "C"]);
    assert_eq!(names(client.view().waystones()), server_names(&handler));
}

#[test]
fn filtered_move_swaps_visible_neighbours_on_both_sides() {
    let (mut handler, mut client) =
        connected(&["Oak", "Birch", "Old Mill", "Dock", "Orchard"], Vec::new(), false);
    client.view_mut().set_search_text("o");
    // Visible: Oak(0), Old Mill(2), Dock(3), Orchard(4); Birch is hidden.
    let rows = client.rows();
    assert_eq!(rows[1].waystone.name, "Old Mill");
    assert!(client.sort_entry(rows[1].list_index, SortDirection::Up, false));
    deliver(&mut handler, &mut client);
    assert_eq!(
        server_names(&handler),
        ["Old Mill", "Birch", "Oak", "Dock", "Orchard"]
    );

    assert!(client.sort_entry(3, SortDirection::Down, true));
    deliver(&mut handler, &mut client);
    assert_eq!(
        server_names(&handler),
        ["Old Mill", "Birch", "Oak", "Orchard", "Dock"]
    );
    assert_eq!(names(client.view().waystones()), server_names(&handler));
}

#[test]
fn removal_round_trip_and_stale_repeat() {
    let (mut handler, mut client) = connected(&["A", "B", "C"], Vec::new(), false);
    assert!(client.remove(waystone_id(2)));
    assert_eq!(deliver(&mut handler, &mut client), [HandleOutcome::Applied]);
    assert_eq!(server_names(&handler), ["A", "C"]);

    // A second client still showing the old list repeats the removal.
    let outcome = handler
        .handle(
            SESSION,
            WireMessage::Remove {
                waystone: waystone_id(2),
            },
        )
        .expect("handle");
    assert_eq!(
        outcome,
        HandleOutcome::Rejected(Rejection::NotFound(waystone_id(2)))
    );
    assert_eq!(server_names(&handler), ["A", "C"]);
}

#[test]
fn forged_global_removal_is_dropped() {
    let spawn = WaystoneRef::new(waystone_id(50), "Spawn").global();
    let (mut handler, mut client) = connected(&["A"], vec![spawn], false);
    assert!(!client.remove(waystone_id(50)), "client hides the action");

    let outcome = handler
        .handle(
            SESSION,
            WireMessage::Remove {
                waystone: waystone_id(50),
            },
        )
        .expect("handle");
    assert_eq!(
        outcome,
        HandleOutcome::Rejected(Rejection::PermissionDenied(waystone_id(50)))
    );
    assert_eq!(server_names(&handler), ["A", "Spawn"]);
}

#[test]
fn operator_removes_global_waystone() {
    let spawn = WaystoneRef::new(waystone_id(50), "Spawn").global();
    let (mut handler, mut client) = connected(&["A"], vec![spawn], true);
    assert!(client.remove(waystone_id(50)));
    assert_eq!(deliver(&mut handler, &mut client), [HandleOutcome::Applied]);
    assert_eq!(server_names(&handler), ["A"]);
}

#[test]
fn select_reaches_teleport_collaborator() {
    let alice = player(1);
    let store = MemoryStore::new().with_list(alice, owned_list(alice, &["Home", "Farm"]));
    let (mut handler, recorder) = handler_with(store, Vec::new());
    handler
        .open_session(
            SESSION,
            &SessionHello {
                player: alice,
                warp_mode: WarpMode::WarpStone,
                origin: Some(waystone_id(1)),
            },
        )
        .expect("open");

    let outcome = handler
        .handle(
            SESSION,
            WireMessage::Select {
                waystone: waystone_id(2),
            },
        )
        .expect("handle");
    assert_eq!(outcome, HandleOutcome::Forwarded);
    let teleports = recorder.teleports.lock().expect("teleports");
    assert_eq!(teleports.len(), 1);
    assert_eq!(teleports[0].player, alice);
    assert_eq!(teleports[0].target.name, "Farm");
    assert_eq!(teleports[0].selection.origin, Some(waystone_id(1)));
}

#[test]
fn paging_scenario_from_five_entries() {
    let (_, mut client) = connected(&["A", "B", "C", "D", "E"], Vec::new(), false);
    let page: Vec<_> = client.view().page_slice().iter().map(|w| w.name.clone()).collect();
    assert_eq!(page, ["A", "B", "C", "D"]);
    let nav = client.view().navigation_state();
    assert!(!nav.prev_enabled && nav.next_enabled);

    client.view_mut().next_page(false);
    let page: Vec<_> = client.view().page_slice().iter().map(|w| w.name.clone()).collect();
    assert_eq!(page, ["E"]);
    let nav = client.view().navigation_state();
    assert!(nav.prev_enabled && !nav.next_enabled);
    assert!(client.sink().is_empty(), "paging sends nothing");
}
