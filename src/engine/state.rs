use crossbeam_channel::Sender;
use std::thread::JoinHandle;

use crate::i3bar::{Block, ClickEvent};

/// Engine bookkeeping for one configured module.
pub struct ModuleSlot {
    pub(crate) name: String,
    /// Worker thread running the module; `None` for slots fed by hand.
    pub(crate) handle: Option<JoinHandle<()>>,
    pub(crate) clicks: Sender<ClickEvent>,
    pub(crate) blocks: Vec<Block>,
}

impl ModuleSlot {
    pub fn new(name: impl Into<String>, clicks: Sender<ClickEvent>) -> Self {
        Self {
            name: name.into(),
            handle: None,
            clicks,
            blocks: Vec::new(),
        }
    }

    pub(crate) fn with_handle(mut self, handle: JoinHandle<()>) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn click_sender(&self) -> &Sender<ClickEvent> {
        &self.clicks
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Lifecycle phase derived from the pause/terminate flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
    Terminated,
}

/// State owned exclusively by the engine loop.
pub struct EngineState {
    pub(crate) slots: Vec<ModuleSlot>,
    pub(crate) paused: bool,
    pub(crate) terminating: bool,
}

impl EngineState {
    pub fn new(slots: Vec<ModuleSlot>) -> Self {
        Self {
            slots,
            paused: false,
            terminating: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.terminating {
            Phase::Terminated
        } else if self.paused {
            Phase::Paused
        } else {
            Phase::Running
        }
    }

    pub fn slots(&self) -> &[ModuleSlot] {
        &self.slots
    }

    /// Replace the stored blocks of the slot this batch belongs to.
    ///
    /// Returns false for an empty batch or one no slot claims.
    pub fn apply_batch(&mut self, batch: Vec<Block>) -> bool {
        let Some(name) = batch.first().map(|block| block.name.clone()) else {
            tracing::debug!("ignoring empty block batch");
            return false;
        };
        match self.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => {
                slot.blocks = batch;
                true
            }
            None => {
                tracing::warn!(%name, "batch from unknown module ignored");
                false
            }
        }
    }

    /// All current blocks, slot declaration order first, batch order second.
    pub fn combined(&self) -> Vec<&Block> {
        self.slots
            .iter()
            .flat_map(|slot| slot.blocks.iter())
            .collect()
    }
}
