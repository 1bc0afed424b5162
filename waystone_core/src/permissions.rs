use waystone_proto::{PlayerId, WarpMode, WaystoneId, WaystoneRef};

/// Whoever issues a command, with their capabilities already resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    pub player: PlayerId,
    /// Elevated privilege, e.g. creative mode or operator status.
    pub override_capability: bool,
}

impl Requester {
    pub fn new(player: PlayerId, override_capability: bool) -> Self {
        Self {
            player,
            override_capability,
        }
    }

    pub fn resolve(player: PlayerId, capabilities: &dyn CapabilityQuery) -> Self {
        Self::new(player, capabilities.has_override(player))
    }
}

/// Source of the override capability.
pub trait CapabilityQuery {
    fn has_override(&self, player: PlayerId) -> bool;
}

impl CapabilityQuery for Vec<PlayerId> {
    fn has_override(&self, player: PlayerId) -> bool {
        self.contains(&player)
    }
}

/// Where a selection comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionContext {
    pub origin: Option<WaystoneId>,
    pub warp_mode: WarpMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionResult {
    Allow,
    Deny,
}

impl PermissionResult {
    pub fn is_allowed(self) -> bool {
        self == PermissionResult::Allow
    }
}

pub fn may_edit(requester: &Requester, waystone: &WaystoneRef) -> PermissionResult {
    if requester.override_capability {
        return PermissionResult::Allow;
    }
    // Global waystones are shared; ownership never grants rights over them.
    if !waystone.global && waystone.owner == Some(requester.player) {
        PermissionResult::Allow
    } else {
        PermissionResult::Deny
    }
}

pub fn may_remove(requester: &Requester, waystone: &WaystoneRef) -> PermissionResult {
    may_edit(requester, waystone)
}
