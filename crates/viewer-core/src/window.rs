//! Which pages are materialised and which are mounted for display.

use std::collections::BTreeSet;

/// Page window of one open document.
///
/// `loaded` only ever grows; `mounted` is always a subset of it and every
/// page number lies in `1..=page_count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    page_count: u32,
    loaded: BTreeSet<u32>,
    mounted: BTreeSet<u32>,
    lazy: bool,
}

impl PageWindow {
    /// Mounts `lookahead` pages starting at `start`.
    pub fn incremental(page_count: u32, start: u32, lookahead: u32) -> Self {
        let mut window = Self {
            page_count,
            loaded: BTreeSet::new(),
            mounted: BTreeSet::new(),
            lazy: true,
        };
        window.mount_range(start, lookahead);
        window
    }

    /// Mounts every page at once.
    pub fn eager(page_count: u32) -> Self {
        let mut window = Self::incremental(page_count, 1, 0);
        window.lazy = false;
        window.mount_all();
        window
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_mounted(&self, page: u32) -> bool {
        self.mounted.contains(&page)
    }

    pub fn mounted(&self) -> impl Iterator<Item = u32> + '_ {
        self.mounted.iter().copied()
    }

    pub fn loaded(&self) -> impl Iterator<Item = u32> + '_ {
        self.loaded.iter().copied()
    }

    pub fn last_mounted(&self) -> Option<u32> {
        self.mounted.last().copied()
    }

    /// Whether pages past the last mounted one remain.
    pub fn has_more(&self) -> bool {
        self.last_mounted().is_some_and(|last| last < self.page_count)
    }

    /// Mounts up to `batch` pages after `last`. Returns the newly mounted pages.
    pub fn expand_after(&mut self, last: u32, batch: u32) -> Vec<u32> {
        self.mount_range(last.saturating_add(1), batch)
    }

    /// Mounts the pages within `radius` of `page`.
    pub fn ensure_around(&mut self, page: u32, radius: u32) -> Vec<u32> {
        let start = page.saturating_sub(radius).max(1);
        let len = page.saturating_add(radius).saturating_sub(start).saturating_add(1);
        self.mount_range(start, len)
    }

    /// Switches to eager mode.
    pub fn mount_all(&mut self) -> Vec<u32> {
        self.lazy = false;
        self.mount_range(1, self.page_count)
    }

    /// Switches back to lazy mode with `lookahead` pages from `start` mounted.
    /// Loaded pages stay loaded.
    pub fn shrink_to(&mut self, start: u32, lookahead: u32) {
        self.lazy = true;
        self.mounted.clear();
        self.mount_range(start, lookahead);
    }

    fn mount_range(&mut self, start: u32, len: u32) -> Vec<u32> {
        if self.page_count == 0 || len == 0 {
            return Vec::new();
        }

        let start = start.clamp(1, self.page_count);
        let end = start.saturating_add(len - 1).min(self.page_count);
        let mut added = Vec::new();

        for page in start..=end {
            self.loaded.insert(page);
            if self.mounted.insert(page) {
                added.push(page);
            }
        }

        added
    }
}
