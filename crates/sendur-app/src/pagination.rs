// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::ops::Range;

use crate::model::Density;

pub const PAGE_SIZE_OPTIONS: [usize; 3] = [5, 10, 25];
pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// A zero page size is raised to one so the window never collapses.
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn offset(&self) -> usize {
        self.page * self.page_size
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    pub fn last_page(&self, total: usize) -> usize {
        self.page_count(total).saturating_sub(1)
    }

    /// Index range of the visible rows, clamped to `total`.
    pub fn window(&self, total: usize) -> Range<usize> {
        let start = self.offset().min(total);
        let end = self.offset().saturating_add(self.page_size).min(total);
        start..end
    }

    /// Blank rows that keep the final page as tall as a full one. The first
    /// page never pads.
    pub fn padding_rows(&self, total: usize) -> usize {
        if self.page == 0 {
            return 0;
        }
        ((self.page + 1) * self.page_size).saturating_sub(total)
    }

    pub fn padding_height_px(&self, total: usize, density: Density) -> u32 {
        let rows = u32::try_from(self.padding_rows(total)).unwrap_or(u32::MAX);
        rows.saturating_mul(density.row_height_px())
    }

    /// Resets to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 0;
    }

    /// Moves to `page`, clamped to the existing pages. Returns the page
    /// actually selected.
    pub fn set_page(&mut self, page: usize, total: usize) -> usize {
        self.page = page.min(self.last_page(total));
        self.page
    }

    pub fn next_page(&mut self, total: usize) -> usize {
        self.set_page(self.page.saturating_add(1), total)
    }

    pub fn prev_page(&mut self, total: usize) -> usize {
        self.set_page(self.page.saturating_sub(1), total)
    }

    /// Cycles through [`PAGE_SIZE_OPTIONS`], starting over after the largest.
    pub fn cycle_page_size(&mut self) -> usize {
        let next = PAGE_SIZE_OPTIONS
            .iter()
            .copied()
            .find(|size| *size > self.page_size)
            .unwrap_or(PAGE_SIZE_OPTIONS[0]);
        self.set_page_size(next);
        next
    }

    /// Paginator caption, `"26–30 of 30"`.
    pub fn range_label(&self, total: usize) -> String {
        let window = self.window(total);
        if window.is_empty() {
            return format!("0–0 of {total}");
        }
        format!("{}–{} of {}", window.start + 1, window.end, total)
    }
}
