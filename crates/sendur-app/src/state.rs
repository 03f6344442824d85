// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

use crate::{Density, Lead, LeadField, Pagination, SelectAllState, Selection, SortState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Network,
}

impl LoadSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "datastore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStamp {
    pub source: LoadSource,
    pub at: OffsetDateTime,
}

/// Everything the lead table renders from. Sort, selection, page and density
/// are independent; the visible rows are derived on demand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    leads: Vec<Lead>,
    sort: SortState,
    selection: Selection,
    pagination: Pagination,
    density: Density,
    loaded: Option<LoadStamp>,
    pub status_line: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    LoadLeads {
        leads: Vec<Lead>,
        source: LoadSource,
        at: OffsetDateTime,
    },
    RequestSort(LeadField),
    SelectAll(bool),
    ToggleLead(Lead),
    SetPage(usize),
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    SetPageSize(usize),
    CyclePageSize,
    ToggleDensity,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    LeadsReplaced { count: usize, source: LoadSource },
    SortChanged(SortState),
    SelectionChanged { selected: usize },
    PageChanged(usize),
    PageSizeChanged(usize),
    DensityChanged(Density),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn new(sort: SortState, page_size: usize, density: Density) -> Self {
        Self {
            sort,
            pagination: Pagination::new(page_size),
            density,
            ..Self::default()
        }
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub const fn sort(&self) -> SortState {
        self.sort
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub const fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub const fn density(&self) -> Density {
        self.density
    }

    pub const fn loaded(&self) -> Option<LoadStamp> {
        self.loaded
    }

    pub fn total(&self) -> usize {
        self.leads.len()
    }

    pub fn is_selected(&self, lead: &Lead) -> bool {
        self.selection.contains(&lead.id)
    }

    pub fn select_all_state(&self) -> SelectAllState {
        self.selection.select_all_state(self.leads.len())
    }

    /// The current page of the sorted collection.
    pub fn visible_rows(&self) -> Vec<&Lead> {
        let sorted = self.sort.sorted(&self.leads);
        let window = self.pagination.window(sorted.len());
        sorted[window].to_vec()
    }

    pub fn padding_rows(&self) -> usize {
        self.pagination.padding_rows(self.leads.len())
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::LoadLeads { leads, source, at } => self.load_leads(leads, source, at),
            AppCommand::RequestSort(field) => {
                self.sort.request(field);
                vec![AppEvent::SortChanged(self.sort)]
            }
            AppCommand::SelectAll(on) => {
                self.selection.select_all(on, &self.leads);
                vec![self.selection_changed()]
            }
            AppCommand::ToggleLead(lead) => {
                if !self.selection.contains(&lead.id)
                    && !self.leads.iter().any(|loaded| loaded.id == lead.id)
                {
                    return Vec::new();
                }
                self.selection.toggle(&lead);
                vec![self.selection_changed()]
            }
            AppCommand::SetPage(page) => {
                let total = self.total();
                self.page_changed(|pagination| pagination.set_page(page, total))
            }
            AppCommand::NextPage => {
                let total = self.total();
                self.page_changed(|pagination| pagination.next_page(total))
            }
            AppCommand::PrevPage => {
                let total = self.total();
                self.page_changed(|pagination| pagination.prev_page(total))
            }
            AppCommand::FirstPage => {
                let total = self.total();
                self.page_changed(|pagination| pagination.set_page(0, total))
            }
            AppCommand::LastPage => {
                let total = self.total();
                self.page_changed(|pagination| {
                    let last = pagination.last_page(total);
                    pagination.set_page(last, total)
                })
            }
            AppCommand::SetPageSize(size) => {
                self.pagination.set_page_size(size);
                self.page_size_changed()
            }
            AppCommand::CyclePageSize => {
                self.pagination.cycle_page_size();
                self.page_size_changed()
            }
            AppCommand::ToggleDensity => {
                self.density = self.density.toggled();
                vec![AppEvent::DensityChanged(self.density)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn load_leads(
        &mut self,
        leads: Vec<Lead>,
        source: LoadSource,
        at: OffsetDateTime,
    ) -> Vec<AppEvent> {
        self.leads = leads;
        self.loaded = Some(LoadStamp { source, at });
        let count = self.leads.len();

        let mut events = vec![AppEvent::LeadsReplaced { count, source }];
        if self.selection.retain_loaded(&self.leads) > 0 {
            events.push(self.selection_changed());
        }
        let page = self.pagination.page();
        if self.pagination.set_page(page, count) != page {
            events.push(AppEvent::PageChanged(self.pagination.page()));
        }
        events
    }

    fn page_changed(&mut self, change: impl FnOnce(&mut Pagination) -> usize) -> Vec<AppEvent> {
        let before = self.pagination.page();
        let after = change(&mut self.pagination);
        if before == after {
            return Vec::new();
        }
        vec![AppEvent::PageChanged(after)]
    }

    fn page_size_changed(&mut self) -> Vec<AppEvent> {
        vec![
            AppEvent::PageSizeChanged(self.pagination.page_size()),
            AppEvent::PageChanged(0),
        ]
    }

    fn selection_changed(&self) -> AppEvent {
        AppEvent::SelectionChanged {
            selected: self.selection.len(),
        }
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
