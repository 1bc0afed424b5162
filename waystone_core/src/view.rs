//! Filtered, paginated view over a player's cached waystone list.
//!
//! Every mutation of the search text, page offset or underlying list rebuilds
//! the filtered index set from scratch. Rows are rebuilt from the current
//! page slice on demand, so the visible row set never outlives a recompute.

use bitflags::bitflags;
use waystone_proto::{WarpMode, WaystoneRef};

use crate::config::ViewConfig;
use crate::cost::CostPredictor;
use crate::permissions::{may_edit, may_remove, Requester};

bitflags! {
    /// Per-row affordances a screen offers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RowActions: u8 {
        const SORTABLE = 1 << 0;
        const DELETABLE = 1 << 1;
    }
}

impl Default for RowActions {
    fn default() -> Self {
        RowActions::SORTABLE | RowActions::DELETABLE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

/// Inputs for row construction that live outside the list itself.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub requester: &'a Requester,
    pub origin: Option<&'a WaystoneRef>,
    pub warp_mode: WarpMode,
    pub costs: &'a CostPredictor,
}

/// One visible entry of the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct WaystoneRow {
    /// Position on the page.
    pub slot: usize,
    /// Position in the full list.
    pub list_index: usize,
    pub waystone: WaystoneRef,
    pub cost: u32,
    /// False for the waystone the selection starts from.
    pub selectable: bool,
    /// Full-list index of the visible neighbour above, when sorting is offered.
    pub sort_up: Option<usize>,
    pub sort_down: Option<usize>,
    pub deletable: bool,
}

/// Header describing the waystone the player is standing at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginHeader {
    pub label: Option<String>,
    /// Clicking the header requests an edit only when this is set.
    pub editable: bool,
}

impl OriginHeader {
    pub fn for_origin(requester: &Requester, origin: &WaystoneRef) -> Self {
        let label = if origin.name.is_empty() {
            None
        } else {
            Some(origin.name.clone())
        };
        Self {
            label,
            editable: may_edit(requester, origin).is_allowed(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListViewModel {
    waystones: Vec<WaystoneRef>,
    filtered: Vec<usize>,
    search_text: String,
    page_offset: usize,
    page_fit: usize,
    page_size: usize,
    actions: RowActions,
    config: ViewConfig,
}

impl ListViewModel {
    /// `page_fit` is how many rows the screen has room for.
    pub fn new(waystones: Vec<WaystoneRef>, config: ViewConfig, page_fit: usize) -> Self {
        let mut view = Self {
            waystones,
            filtered: Vec::new(),
            search_text: String::new(),
            page_offset: 0,
            page_fit,
            page_size: config.min_page_size.max(1),
            actions: RowActions::default(),
            config,
        };
        view.recompute();
        view
    }

    pub fn for_viewport(waystones: Vec<WaystoneRef>, config: ViewConfig, height: u32) -> Self {
        let fit = config.page_fit(height);
        Self::new(waystones, config, fit)
    }

    pub fn with_actions(mut self, actions: RowActions) -> Self {
        self.actions = actions;
        self
    }

    pub fn actions(&self) -> RowActions {
        self.actions
    }

    pub fn waystones(&self) -> &[WaystoneRef] {
        &self.waystones
    }

    /// True when the player has no waystones at all, regardless of filter.
    pub fn is_empty(&self) -> bool {
        self.waystones.is_empty()
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn page_offset(&self) -> usize {
        self.page_offset
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn filtered(&self) -> impl Iterator<Item = &WaystoneRef> + '_ {
        self.filtered.iter().map(move |&index| &self.waystones[index])
    }

    pub fn page_count(&self) -> usize {
        self.filtered.len().div_ceil(self.page_size)
    }

    pub fn last_page(&self) -> usize {
        self.page_count().saturating_sub(1)
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.page_offset = 0;
        self.recompute();
    }

    pub fn set_page(&mut self, offset: usize) {
        self.page_offset = offset;
        self.recompute();
    }

    /// With `jump` set, go straight to the first page.
    pub fn previous_page(&mut self, jump: bool) {
        let target = if jump {
            0
        } else {
            self.page_offset.saturating_sub(1)
        };
        self.set_page(target);
    }

    /// With `jump` set, go straight to the last page.
    pub fn next_page(&mut self, jump: bool) {
        let target = if jump {
            self.last_page()
        } else {
            self.page_offset.saturating_add(1)
        };
        self.set_page(target);
    }

    /// Swap in a new copy of the full list, keeping search text and page.
    pub fn replace_list(&mut self, waystones: Vec<WaystoneRef>) {
        self.waystones = waystones;
        self.recompute();
    }

    pub fn navigation_state(&self) -> NavigationState {
        NavigationState {
            prev_enabled: self.page_offset > 0,
            next_enabled: self.page_offset < self.last_page(),
        }
    }

    pub fn page_slice(&self) -> Vec<&WaystoneRef> {
        self.page_indices()
            .map(|(_, index)| &self.waystones[index])
            .collect()
    }

    /// Rebuild the visible rows for the current page.
    pub fn rows(&self, ctx: &RowContext<'_>) -> Vec<WaystoneRow> {
        let sortable = self.actions.contains(RowActions::SORTABLE);
        let deletion_offered = self.actions.contains(RowActions::DELETABLE);

        self.page_indices()
            .enumerate()
            .map(|(slot, (filtered_pos, list_index))| {
                let waystone = &self.waystones[list_index];
                let cost = ctx
                    .costs
                    .predict(ctx.requester, waystone, ctx.warp_mode, ctx.origin);
                let selectable = ctx.origin.map_or(true, |origin| origin.id != waystone.id);
                let (sort_up, sort_down) = if sortable {
                    (
                        self.neighbour(filtered_pos, SortDirection::Up),
                        self.neighbour(filtered_pos, SortDirection::Down),
                    )
                } else {
                    (None, None)
                };
                let deletable = deletion_offered
                    && (!waystone.global || ctx.requester.override_capability)
                    && may_remove(ctx.requester, waystone).is_allowed();
                WaystoneRow {
                    slot,
                    list_index,
                    waystone: waystone.clone(),
                    cost,
                    selectable,
                    sort_up,
                    sort_down,
                    deletable,
                }
            })
            .collect()
    }

    /// Full-list index an entry swaps with when moved in `direction`.
    ///
    /// Without `jump` the partner is the adjacent visible entry; with `jump`
    /// it is the front or back of the full list. `None` when the entry is
    /// already at that edge or not visible.
    pub fn sort_partner(
        &self,
        list_index: usize,
        direction: SortDirection,
        jump: bool,
    ) -> Option<usize> {
        let filtered_pos = self.filtered.iter().position(|&index| index == list_index)?;
        let partner = if jump {
            match direction {
                SortDirection::Up => 0,
                SortDirection::Down => self.waystones.len() - 1,
            }
        } else {
            self.neighbour(filtered_pos, direction)?
        };
        (partner != list_index).then_some(partner)
    }

    fn neighbour(&self, filtered_pos: usize, direction: SortDirection) -> Option<usize> {
        match direction {
            SortDirection::Up => filtered_pos
                .checked_sub(1)
                .map(|pos| self.filtered[pos]),
            SortDirection::Down => self.filtered.get(filtered_pos + 1).copied(),
        }
    }

    /// `(position in filtered list, position in full list)` for the current page.
    fn page_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let start = self.page_offset * self.page_size;
        self.filtered
            .iter()
            .copied()
            .enumerate()
            .skip(start)
            .take(self.page_size)
    }

    fn recompute(&mut self) {
        let needle = self.search_text.to_lowercase();
        self.filtered = self
            .waystones
            .iter()
            .enumerate()
            .filter(|(_, waystone)| waystone.name.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect();
        self.page_size = self.config.page_size(self.page_fit, self.waystones.len());
        self.page_offset = self.page_offset.min(self.last_page());
    }
}
