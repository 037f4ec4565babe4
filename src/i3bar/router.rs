use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::io::{self, BufRead};
use std::thread;

use super::protocol::ClickEvent;

/// One routable destination: a module name and its click inbox.
///
/// The receiver half is kept so a stale pending click can be evicted when
/// the module has not picked it up yet.
#[derive(Clone)]
pub struct ClickRoute {
    pub name: String,
    pub inbox: Sender<ClickEvent>,
    pub(crate) drain: Receiver<ClickEvent>,
}

impl ClickRoute {
    pub fn new(
        name: impl Into<String>,
        inbox: Sender<ClickEvent>,
        drain: Receiver<ClickEvent>,
    ) -> Self {
        Self {
            name: name.into(),
            inbox,
            drain,
        }
    }
}

/// What happened to a single parsed click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Queued after evicting an older click the module had not consumed.
    Replaced,
    /// No module by that name, or its inbox is gone.
    Dropped,
}

/// Hand `event` to the first route with a matching name without ever
/// blocking on the module.
pub fn route_click(routes: &[ClickRoute], event: ClickEvent) -> Delivery {
    let Some(route) = routes.iter().find(|route| route.name == event.name) else {
        tracing::debug!(name = %event.name, "click for unknown module dropped");
        return Delivery::Dropped;
    };

    let mut pending = event;
    let mut replaced = false;
    // Capacity is 1: at most one eviction is needed, the retry bound only
    // covers the module consuming concurrently.
    for _ in 0..4 {
        match route.inbox.try_send(pending) {
            Ok(()) => {
                return if replaced {
                    Delivery::Replaced
                } else {
                    Delivery::Queued
                };
            }
            Err(TrySendError::Full(event)) => {
                pending = event;
                if route.drain.try_recv().is_ok() {
                    replaced = true;
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!(name = %route.name, "click inbox disconnected");
                return Delivery::Dropped;
            }
        }
    }
    tracing::debug!(name = %route.name, "click inbox stayed full; click dropped");
    Delivery::Dropped
}

/// Incremental reader for the bar's never-terminated click-event array.
///
/// Each element is a flat JSON object, so framing only needs to find the
/// opening `[`, the `,` between elements and each closing `}`.
pub struct ClickStream<R> {
    reader: R,
    opened: bool,
    first: bool,
    buf: Vec<u8>,
}

impl<R: BufRead> ClickStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            opened: false,
            first: true,
            buf: Vec::with_capacity(256),
        }
    }

    /// Next framed element. `Ok(None)` means the stream ended.
    ///
    /// The inner result is the parse outcome for that element; a parse error
    /// does not end the stream.
    pub fn next_event(&mut self) -> io::Result<Option<Result<ClickEvent, serde_json::Error>>> {
        if !self.opened {
            if !self.read_through(b'[')? {
                return Ok(None);
            }
            self.opened = true;
        }
        if !self.first && !self.read_through(b',')? {
            return Ok(None);
        }
        if !self.read_through(b'}')? {
            return Ok(None);
        }
        self.first = false;
        Ok(Some(serde_json::from_slice::<ClickEvent>(&self.buf)))
    }

    /// Fill `buf` with bytes up to and including `delim`. Returns false on
    /// EOF before the delimiter.
    fn read_through(&mut self, delim: u8) -> io::Result<bool> {
        self.buf.clear();
        let n = self.reader.read_until(delim, &mut self.buf)?;
        Ok(n > 0 && self.buf.last() == Some(&delim))
    }
}

/// Read clicks from `reader` until it ends, routing each one.
///
/// Returns how many events were parsed successfully.
pub fn run_click_router<R: BufRead>(reader: R, routes: &[ClickRoute]) -> usize {
    let mut stream = ClickStream::new(reader);
    let mut parsed = 0usize;
    loop {
        match stream.next_event() {
            Ok(Some(Ok(event))) => {
                parsed += 1;
                route_click(routes, event);
            }
            Ok(Some(Err(err))) => {
                tracing::warn!("failed to parse click event: {err}");
            }
            Ok(None) => {
                tracing::info!("click stream ended; click support disabled");
                break;
            }
            Err(err) => {
                tracing::warn!("click stream read error: {err}; click support disabled");
                break;
            }
        }
    }
    parsed
}

/// Route clicks arriving on the process stdin from a background thread.
pub fn spawn_stdin_router(routes: Vec<ClickRoute>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("click-router".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            run_click_router(stdin.lock(), &routes);
        })
}
