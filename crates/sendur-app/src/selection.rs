// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashSet;

use crate::ids::LeadId;
use crate::model::Lead;

/// Tri-state of the header checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Leads chosen for the bulk send, kept as copies in insertion order.
/// Membership is decided by identifier only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    leads: Vec<Lead>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn contains(&self, id: &LeadId) -> bool {
        self.position(id).is_some()
    }

    /// `on` replaces the selection with every loaded lead, `off` clears it.
    pub fn select_all(&mut self, on: bool, loaded: &[Lead]) {
        if on {
            self.leads = loaded.to_vec();
        } else {
            self.leads.clear();
        }
    }

    pub fn clear(&mut self) {
        self.leads.clear();
    }

    /// Removes the entry sharing `lead`'s identifier, or appends `lead`.
    /// Returns whether the lead is selected afterwards.
    pub fn toggle(&mut self, lead: &Lead) -> bool {
        match self.position(&lead.id) {
            Some(index) => {
                self.leads.remove(index);
                false
            }
            None => {
                self.leads.push(lead.clone());
                true
            }
        }
    }

    /// Drops entries whose identifier is no longer in `loaded`.
    pub fn retain_loaded(&mut self, loaded: &[Lead]) -> usize {
        let ids: HashSet<&LeadId> = loaded.iter().map(|lead| &lead.id).collect();
        let before = self.leads.len();
        self.leads.retain(|lead| ids.contains(&lead.id));
        before - self.leads.len()
    }

    pub fn select_all_state(&self, row_count: usize) -> SelectAllState {
        let selected = self.leads.len();
        if row_count > 0 && selected == row_count {
            SelectAllState::Checked
        } else if selected > 0 && selected < row_count {
            SelectAllState::Indeterminate
        } else {
            SelectAllState::Unchecked
        }
    }

    fn position(&self, id: &LeadId) -> Option<usize> {
        self.leads.iter().position(|item| &item.id == id)
    }
}
