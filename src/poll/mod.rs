//! Bounded-retry waiting for eventually-consistent UI and backend effects

pub mod appearance;
pub mod poller;
pub mod reply;

pub use appearance::{
    reload_recovery, wait_for_absence, wait_for_appearance, wait_for_appearance_paged,
    wait_for_change, wait_for_element, wait_for_enabled, wait_for_text, Paginated,
    PaginatedSearch, SearchResult, TablePager,
};
pub use poller::{poll_until, PollOptions, PollOutcome, Recovery, Tick, WaitReport};
pub use reply::{wait_for_async_reply, wait_for_async_reply_with_recovery, ReplyFeed, ReplySnapshot};
