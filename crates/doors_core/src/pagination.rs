/// What the engine saw when it tried to move past the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextControl {
    /// The "next" control carries its disabled marker: this is the last page.
    Disabled,
    /// The control was clicked and a fresh list replaced the stale one.
    Advanced,
    /// A stale reference interrupted reading or advancing.
    Stale,
    /// Any other navigation failure; listing ends at the current page.
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    /// Process the (new) current page.
    Continue,
    /// Process the same page again.
    Retry,
    /// Stop paging.
    Finish,
}

/// Consecutive stale observations tolerated on one page before giving up.
pub const MAX_STALE_RETRIES: u32 = 5;

/// Position of the listing traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page: u32,
    total_pages: Option<u32>,
    more: bool,
    stale_retries: u32,
    list_token: Option<String>,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            page: 1,
            total_pages: None,
            more: true,
            stale_retries: 0,
            list_token: None,
        }
    }

    /// Current page, 1-based.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Known only once the last page has been reached.
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn has_more(&self) -> bool {
        self.more
    }

    pub fn fraction(&self) -> Option<f64> {
        self.total_pages
            .filter(|total| *total > 0)
            .map(|total| f64::from(self.page) / f64::from(total))
    }

    /// Remembers the list container rendered for the current page.
    pub fn set_list_token(&mut self, token: impl Into<String>) {
        self.list_token = Some(token.into());
    }

    pub fn list_token(&self) -> Option<&str> {
        self.list_token.as_deref()
    }

    /// The current page had no rows at all.
    pub fn finish_empty(&mut self) -> PageDecision {
        self.finish()
    }

    pub fn observe(&mut self, next: NextControl) -> PageDecision {
        if !self.more {
            return PageDecision::Finish;
        }
        match next {
            NextControl::Disabled | NextControl::Unavailable(_) => self.finish(),
            NextControl::Advanced => {
                self.page += 1;
                self.stale_retries = 0;
                self.list_token = None;
                PageDecision::Continue
            }
            NextControl::Stale => {
                self.stale_retries += 1;
                if self.stale_retries > MAX_STALE_RETRIES {
                    self.finish()
                } else {
                    PageDecision::Retry
                }
            }
        }
    }

    fn finish(&mut self) -> PageDecision {
        self.total_pages = Some(self.page);
        self.more = false;
        PageDecision::Finish
    }
}
