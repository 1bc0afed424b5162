//! Waystone list view and authoritative list handling.
//!
//! The client side is a [`ListViewModel`] wrapped by a [`CommandDispatcher`]
//! that turns user actions into [`WireMessage`]s. The server side is an
//! [`AuthoritativeListHandler`] that validates those messages and mutates
//! the persisted per-player lists through a [`WaystoneStore`].

pub mod command_text;
pub mod config;
mod cost;
mod dispatcher;
mod handler;
mod list;
pub mod network;
mod permissions;
mod store;
mod view;

pub use waystone_proto::{
    BlockPos, ListSnapshot, PlayerId, SessionHello, WarpMode, WaystoneId, WaystoneRef,
    WireMessage,
};

pub use config::{load_server_config_from_env, CostConfig, ServerConfig, ViewConfig};
pub use cost::CostPredictor;
pub use dispatcher::{CommandDispatcher, CommandSink};
pub use handler::{
    AuthoritativeListHandler, EditSessionService, HandleOutcome, Rejection, Session, SessionId,
    TeleportRequest, TeleportService,
};
pub use list::{ListError, PlayerWaystoneList};
pub use permissions::{
    may_edit, may_remove, CapabilityQuery, PermissionResult, Requester, SelectionContext,
};
pub use store::{JsonFileStore, MemoryStore, StoreError, WaystoneStore};
pub use view::{
    ListViewModel, NavigationState, OriginHeader, RowActions, RowContext, SortDirection,
    WaystoneRow,
};
