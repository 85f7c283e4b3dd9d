use doors_core::{NextControl, PageCursor, PageDecision, MAX_STALE_RETRIES};

/// Drives a cursor against `pages` pages and counts loop iterations.
fn traverse(pages: u32) -> (u32, PageCursor) {
    let mut cursor = PageCursor::new();
    let mut iterations = 0;
    loop {
        iterations += 1;
        assert!(iterations <= pages + 1, "pagination did not terminate");
        let signal = if cursor.page() < pages {
            NextControl::Advanced
        } else {
            NextControl::Disabled
        };
        match cursor.observe(signal) {
            PageDecision::Continue | PageDecision::Retry => continue,
            PageDecision::Finish => break,
        }
    }
    (iterations, cursor)
}

#[test]
fn traversal_terminates_within_n_plus_one_iterations() {
    for pages in 1..=12 {
        let (iterations, cursor) = traverse(pages);
        assert!(iterations <= pages + 1);
        assert_eq!(cursor.page(), pages);
        assert_eq!(cursor.total_pages(), Some(pages));
        assert!(!cursor.has_more());
        assert_eq!(cursor.fraction(), Some(1.0));
    }
}

#[test]
fn fraction_unknown_until_last_page() {
    let mut cursor = PageCursor::new();
    assert_eq!(cursor.fraction(), None);
    assert_eq!(cursor.observe(NextControl::Advanced), PageDecision::Continue);
    assert_eq!(cursor.page(), 2);
    assert_eq!(cursor.fraction(), None);
}

#[test]
fn stale_retries_same_page_then_gives_up() {
    let mut cursor = PageCursor::new();
    cursor.set_list_token("table-1");
    for _ in 0..MAX_STALE_RETRIES {
        assert_eq!(cursor.observe(NextControl::Stale), PageDecision::Retry);
        assert_eq!(cursor.page(), 1);
    }
    assert_eq!(cursor.list_token(), Some("table-1"));
    assert_eq!(cursor.observe(NextControl::Stale), PageDecision::Finish);
    assert_eq!(cursor.total_pages(), Some(1));
}

#[test]
fn stale_counter_resets_after_advance() {
    let mut cursor = PageCursor::new();
    for _ in 0..MAX_STALE_RETRIES {
        cursor.observe(NextControl::Stale);
    }
    assert_eq!(cursor.observe(NextControl::Advanced), PageDecision::Continue);
    assert_eq!(cursor.observe(NextControl::Stale), PageDecision::Retry);
}

#[test]
fn navigation_failure_finalizes_at_current_page() {
    let mut cursor = PageCursor::new();
    cursor.observe(NextControl::Advanced);
    cursor.observe(NextControl::Advanced);
    let decision = cursor.observe(NextControl::Unavailable("no next control".into()));
    assert_eq!(decision, PageDecision::Finish);
    assert_eq!(cursor.total_pages(), Some(3));
    // Once finished, nothing restarts it.
    assert_eq!(cursor.observe(NextControl::Advanced), PageDecision::Finish);
}

#[test]
fn empty_first_page_finishes() {
    let mut cursor = PageCursor::new();
    assert_eq!(cursor.finish_empty(), PageDecision::Finish);
    assert_eq!(cursor.total_pages(), Some(1));
}
