//! Status modules: independent producers of block batches.
//!
//! Every module runs on its own thread with a [`ModuleContext`]. Most modules
//! are periodic and implement [`Poller`], which [`drive`] turns into a loop
//! over a ticker and the click inbox.

mod battery;
mod datetime;
mod memory;
mod network;
mod text;

use crossbeam_channel::{never, select, tick, Receiver, Sender};
use std::time::Duration;

use crate::config::ModuleConfig;
use crate::i3bar::{Block, BlockBatch, ClickEvent};
use crate::theme::Theme;

pub use battery::{read_capacity, scan_batteries, BatteryModule, POWER_SUPPLY_ROOT};
pub use datetime::{DatetimeModule, DEFAULT_FORMAT, ISO_FORMAT};
pub use memory::{parse_meminfo, MemInfo, MemoryModule, MEMINFO_PATH};
pub use network::{
    best_ipv4, best_ipv6, ipv4_score, ipv6_score, parse_if_inet6, AddressSource, Inet6Addr,
    Interface, NetworkModule, SystemAddresses,
};
pub use text::TextModule;

/// Returned by [`ModuleContext::emit`] once the engine is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("engine stopped receiving updates")]
pub struct EngineGone;

/// Everything a running module needs from the outside.
pub struct ModuleContext {
    name: String,
    updates: Sender<BlockBatch>,
    clicks: Receiver<ClickEvent>,
    theme: Theme,
}

impl ModuleContext {
    pub fn new(
        name: impl Into<String>,
        updates: Sender<BlockBatch>,
        clicks: Receiver<ClickEvent>,
        theme: Theme,
    ) -> Self {
        Self {
            name: name.into(),
            updates,
            clicks,
            theme,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn clicks(&self) -> &Receiver<ClickEvent> {
        &self.clicks
    }

    /// Stamp the slot name on every block and hand the batch to the engine,
    /// blocking while the engine is paused.
    pub fn emit(&self, mut blocks: Vec<Block>) -> Result<(), EngineGone> {
        if blocks.is_empty() {
            tracing::debug!(module = %self.name, "not sending empty batch");
            return Ok(());
        }
        for block in &mut blocks {
            block.name.clone_from(&self.name);
        }
        self.updates.send(blocks).map_err(|_| EngineGone)
    }
}

/// A status module. `run` returns only once the engine has gone away.
pub trait Module: Send {
    fn kind(&self) -> &'static str;
    fn run(self: Box<Self>, ctx: ModuleContext);
}

/// Periodic module driven by [`drive`].
pub trait Poller {
    /// Re-read whatever the module displays.
    fn refresh(&mut self);

    fn render(&self, theme: &Theme) -> Vec<Block>;

    /// React to a click; return `true` when the rendering changed.
    fn on_click(&mut self, _click: &ClickEvent) -> bool {
        false
    }
}

/// Refresh and emit once, then again on every tick and on every click the
/// poller accepts.
pub fn drive<P: Poller>(mut poller: P, interval: Duration, ctx: ModuleContext) {
    poller.refresh();
    if ctx.emit(poller.render(ctx.theme())).is_err() {
        return;
    }

    let ticker = tick(interval);
    let mut clicks_open = true;
    loop {
        let closed = if clicks_open {
            None
        } else {
            Some(never::<ClickEvent>())
        };
        let clicks = closed.as_ref().unwrap_or(ctx.clicks());
        let changed = select! {
            recv(ticker) -> _ => {
                poller.refresh();
                true
            }
            recv(clicks) -> click => match click {
                Ok(click) => poller.on_click(&click),
                Err(_) => {
                    tracing::debug!(module = %ctx.name(), "click inbox closed");
                    clicks_open = false;
                    false
                }
            },
        };
        if changed && ctx.emit(poller.render(ctx.theme())).is_err() {
            tracing::debug!(module = %ctx.name(), "engine gone; module exiting");
            return;
        }
    }
}

/// Seconds from config, clamped so a zero interval cannot spin.
pub(crate) fn interval_secs(configured: Option<u64>, default: u64) -> Duration {
    Duration::from_secs(configured.unwrap_or(default).max(1))
}

/// Red block standing in for a module whose data source failed.
pub(crate) fn error_block(theme: &Theme, instance: &str, text: String) -> Block {
    Block::new(instance, text).with_color(theme.red())
}

/// Instantiate the module described by one config entry.
pub fn build_module(config: &ModuleConfig) -> Box<dyn Module> {
    match config {
        ModuleConfig::Battery(cfg) => Box::new(BatteryModule::from_config(cfg)),
        ModuleConfig::Datetime(cfg) => Box::new(DatetimeModule::from_config(cfg)),
        ModuleConfig::Memory(cfg) => Box::new(MemoryModule::from_config(cfg)),
        ModuleConfig::Network(cfg) => Box::new(NetworkModule::from_config(cfg)),
        ModuleConfig::Text(cfg) => Box::new(TextModule::from_config(cfg)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crossbeam_channel::{bounded, Receiver, Sender};

    /// Context wired to channels a test can drive directly.
    pub(crate) struct Wired {
        pub(crate) updates: Receiver<BlockBatch>,
        pub(crate) clicks: Sender<ClickEvent>,
    }

    pub(crate) fn wired_context(name: &str) -> (ModuleContext, Wired) {
        let (update_tx, update_rx) = bounded(0);
        let (click_tx, click_rx) = bounded(1);
        let ctx = ModuleContext::new(name, update_tx, click_rx, Theme::default());
        (
            ctx,
            Wired {
                updates: update_rx,
                clicks: click_tx,
            },
        )
    }

    pub(crate) fn click(instance: &str, button: u32) -> ClickEvent {
        ClickEvent {
            name: String::new(),
            instance: instance.to_string(),
            button,
            ..ClickEvent::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{click, wired_context};
    use super::*;
    use crate::config::{default_modules, TextConfig};
    use crate::i3bar::LEFT_CLICK;
    use std::thread;

    struct Counter {
        refreshes: u32,
    }

    impl Poller for Counter {
        fn refresh(&mut self) {
            self.refreshes += 1;
        }

        fn render(&self, _theme: &Theme) -> Vec<Block> {
            vec![Block::new("count", self.refreshes.to_string())]
        }

        fn on_click(&mut self, click: &ClickEvent) -> bool {
            click.is_button(LEFT_CLICK)
        }
    }

    #[test]
    fn emit_stamps_slot_name() {
        let (ctx, wired) = wired_context("clock");
        let handle = thread::spawn(move || {
            ctx.emit(vec![Block::new("a", "1"), Block::new("b", "2")])
        });
        let batch = wired.updates.recv().expect("batch");
        assert!(batch.iter().all(|block| block.name == "clock"));
        assert_eq!(handle.join().expect("join"), Ok(()));
    }

    #[test]
    fn emit_reports_engine_gone() {
        let (ctx, wired) = wired_context("clock");
        drop(wired.updates);
        assert_eq!(ctx.emit(vec![Block::new("a", "1")]), Err(EngineGone));
        assert_eq!(ctx.emit(Vec::new()), Ok(()));
    }

    #[test]
    fn drive_emits_on_start_and_on_accepted_clicks() {
        let (ctx, wired) = wired_context("counter");
        let handle = thread::spawn(move || {
            drive(Counter { refreshes: 0 }, Duration::from_secs(3600), ctx)
        });
        let first = wired.updates.recv().expect("initial batch");
        assert_eq!(first[0].full_text, "1");

        wired.clicks.send(click("count", LEFT_CLICK)).expect("click");
        let second = wired.updates.recv().expect("click batch");
        assert_eq!(second[0].full_text, "1");
        assert_eq!(second[0].name, "counter");

        drop(wired.updates);
        wired.clicks.send(click("count", LEFT_CLICK)).expect("click");
        handle.join().expect("driver exits once the engine is gone");
    }

    #[test]
    fn drive_refreshes_on_tick() {
        let (ctx, wired) = wired_context("counter");
        let handle = thread::spawn(move || {
            drive(Counter { refreshes: 0 }, Duration::from_millis(10), ctx)
        });
        let _ = wired.updates.recv().expect("initial batch");
        let ticked = wired.updates.recv().expect("tick batch");
        assert_eq!(ticked[0].full_text, "2");
        drop(wired.updates);
        handle.join().expect("join");
    }

    #[test]
    fn interval_is_never_zero() {
        assert_eq!(interval_secs(Some(0), 5), Duration::from_secs(1));
        assert_eq!(interval_secs(None, 5), Duration::from_secs(5));
        assert_eq!(interval_secs(Some(30), 5), Duration::from_secs(30));
    }

    #[test]
    fn build_module_matches_config_kind() {
        for cfg in default_modules() {
            assert_eq!(build_module(&cfg).kind(), cfg.kind());
        }
        let text = ModuleConfig::Text(TextConfig {
            name: Some("hello".to_string()),
            content: "hi".to_string(),
        });
        assert_eq!(build_module(&text).kind(), "text");
    }
}
