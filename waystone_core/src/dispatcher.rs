//! Client-side command dispatch.
//!
//! Each user action applies an optimistic update to the cached list, emits a
//! single fire-and-forget [`WireMessage`] and rebuilds the view before
//! returning. There is no acknowledgement; a rejected command on the server
//! is only visible after the next snapshot.

use crossbeam_channel::Sender;
use tracing::{debug, warn};
use waystone_proto::{ListSnapshot, WaystoneId, WaystoneRef, WireMessage};

use crate::cost::CostPredictor;
use crate::list::PlayerWaystoneList;
use crate::permissions::{may_edit, may_remove, Requester, SelectionContext};
use crate::view::{ListViewModel, OriginHeader, RowContext, SortDirection, WaystoneRow};

/// Outbound half of the transport.
pub trait CommandSink {
    fn send(&mut self, message: WireMessage);
}

impl CommandSink for Vec<WireMessage> {
    fn send(&mut self, message: WireMessage) {
        self.push(message);
    }
}

impl CommandSink for Sender<WireMessage> {
    fn send(&mut self, message: WireMessage) {
        if let Err(err) = Sender::send(self, message) {
            warn!(target: "waystones::client", "command.dropped=channel_closed: {}", err);
        }
    }
}

pub struct CommandDispatcher<S: CommandSink> {
    view: ListViewModel,
    requester: Requester,
    selection: SelectionContext,
    origin: Option<WaystoneRef>,
    costs: CostPredictor,
    sink: S,
}

impl<S: CommandSink> CommandDispatcher<S> {
    pub fn new(
        view: ListViewModel,
        requester: Requester,
        selection: SelectionContext,
        costs: CostPredictor,
        sink: S,
    ) -> Self {
        let origin = selection
            .origin
            .and_then(|id| view.waystones().iter().find(|w| w.id == id).cloned());
        Self {
            view,
            requester,
            selection,
            origin,
            costs,
            sink,
        }
    }

    /// Replace the cached list with a fresh copy from the server.
    ///
    /// The server's view of the override capability replaces whatever the
    /// dispatcher was built with.
    pub fn apply_snapshot(&mut self, snapshot: ListSnapshot) {
        self.requester.override_capability = snapshot.override_capability;
        if let Some(origin) = snapshot.origin {
            self.selection.origin = Some(origin.id);
            self.origin = Some(origin);
        }
        self.view.replace_list(snapshot.waystones);
    }

    pub fn view(&self) -> &ListViewModel {
        &self.view
    }

    /// Search and paging go straight to the view; they emit nothing.
    pub fn view_mut(&mut self) -> &mut ListViewModel {
        &mut self.view
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    pub fn selection(&self) -> &SelectionContext {
        &self.selection
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn rows(&self) -> Vec<WaystoneRow> {
        self.view.rows(&RowContext {
            requester: &self.requester,
            origin: self.origin.as_ref(),
            warp_mode: self.selection.warp_mode,
            costs: &self.costs,
        })
    }

    pub fn origin_header(&self) -> Option<OriginHeader> {
        self.origin
            .as_ref()
            .map(|origin| OriginHeader::for_origin(&self.requester, origin))
    }

    fn find(&self, id: WaystoneId) -> Option<&WaystoneRef> {
        self.view.waystones().iter().find(|w| w.id == id)
    }

    fn dispatch(&mut self, message: WireMessage) {
        debug!(target: "waystones::client", kind = message.kind(), "command.dispatched");
        self.sink.send(message);
    }

    /// Returns false when the waystone is unknown or is the origin itself.
    pub fn select(&mut self, id: WaystoneId) -> bool {
        if self.find(id).is_none() || self.selection.origin == Some(id) {
            return false;
        }
        self.dispatch(WireMessage::Select { waystone: id });
        true
    }

    /// Swap two full-list positions locally and tell the server.
    pub fn sort(&mut self, index: usize, other_index: usize) -> bool {
        let len = self.view.waystones().len();
        if index >= len || other_index >= len || index == other_index {
            return false;
        }
        let (Ok(wire_index), Ok(wire_other)) = (u8::try_from(index), u8::try_from(other_index))
        else {
            warn!(
                target: "waystones::client",
                index,
                other_index,
                "sort.skipped=unaddressable_index"
            );
            return false;
        };

        let mut list = PlayerWaystoneList::new(self.view.waystones().to_vec());
        if !matches!(list.swap(index, other_index), Ok(true)) {
            return false;
        }
        self.view.replace_list(list.into_entries());
        self.dispatch(WireMessage::Sort {
            index: wire_index,
            other_index: wire_other,
        });
        true
    }

    /// Move an entry one visible step, or to the front/back with `jump`.
    pub fn sort_entry(&mut self, list_index: usize, direction: SortDirection, jump: bool) -> bool {
        match self.view.sort_partner(list_index, direction, jump) {
            Some(partner) => self.sort(list_index, partner),
            None => false,
        }
    }

    pub fn can_remove(&self, waystone: &WaystoneRef) -> bool {
        (!waystone.global || self.requester.override_capability)
            && may_remove(&self.requester, waystone).is_allowed()
    }

    pub fn remove(&mut self, id: WaystoneId) -> bool {
        match self.find(id) {
            Some(waystone) if self.can_remove(waystone) => {}
            _ => return false,
        }
        let mut list = PlayerWaystoneList::new(self.view.waystones().to_vec());
        list.remove(id);
        self.view.replace_list(list.into_entries());
        self.dispatch(WireMessage::Remove { waystone: id });
        true
    }

    pub fn request_edit(&mut self, id: WaystoneId) -> bool {
        let target = self
            .find(id)
            .or_else(|| self.origin.as_ref().filter(|origin| origin.id == id));
        match target {
            Some(waystone) if may_edit(&self.requester, waystone).is_allowed() => {}
            _ => return false,
        }
        self.dispatch(WireMessage::RequestEdit { waystone: id });
        true
    }

    /// Clicking the location header edits the origin waystone.
    pub fn request_origin_edit(&mut self) -> bool {
        match self.origin.as_ref().map(|origin| origin.id) {
            Some(id) => self.request_edit(id),
            None => false,
        }
    }
}
