//! i3bar/swaybar status command protocol.
//!
//! Architecture:
//! - Header: one JSON object written first, advertising click events and the
//!   pause/resume signals
//! - Body: an endless JSON array, one element per line, each element the full
//!   list of blocks currently shown
//! - Clicks: the bar writes its own endless JSON array of click objects to our
//!   stdin; the router frames and forwards them to the owning module

mod protocol;
mod router;

#[cfg(test)]
mod tests;

pub use protocol::{
    Align, Block, BlockBatch, ClickEvent, Header, LEFT_CLICK, MIDDLE_CLICK, RIGHT_CLICK,
    SCROLL_DOWN, SCROLL_UP,
};
pub use router::{
    route_click, run_click_router, spawn_stdin_router, ClickRoute, ClickStream, Delivery,
};
