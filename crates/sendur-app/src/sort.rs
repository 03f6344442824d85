// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::cmp::Ordering;

use crate::model::{Lead, LeadField, SortDirection};

pub const DEFAULT_SORT_FIELD: LeadField = LeadField::City;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub field: LeadField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: DEFAULT_SORT_FIELD,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    pub const fn new(field: LeadField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Header click semantics: the active ascending field flips to
    /// descending, anything else becomes the new ascending field.
    pub fn request(&mut self, field: LeadField) {
        let is_asc = self.field == field && self.direction == SortDirection::Asc;
        self.direction = if is_asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.field = field;
    }

    pub fn compare(&self, a: &Lead, b: &Lead) -> Ordering {
        compare_leads(a, b, self.field, self.direction)
    }

    /// Returns the collection ordered by this state. The sort is stable, so
    /// leads with equal field values keep their collection order.
    pub fn sorted<'a>(&self, leads: &'a [Lead]) -> Vec<&'a Lead> {
        let mut rows: Vec<&Lead> = leads.iter().collect();
        rows.sort_by(|a, b| self.compare(a, b));
        rows
    }
}

/// `Less` when `b`'s value is below `a`'s, `Greater` when above.
pub fn descending_comparator(a: &Lead, b: &Lead, field: LeadField) -> Ordering {
    let left = a.value(field);
    let right = b.value(field);
    if right < left {
        Ordering::Less
    } else if right > left {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

pub fn compare_leads(a: &Lead, b: &Lead, field: LeadField, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Desc => descending_comparator(a, b, field),
        SortDirection::Asc => descending_comparator(a, b, field).reverse(),
    }
}
