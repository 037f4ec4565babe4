use anyhow::{Context, Result};
use crossbeam_channel::{never, select, Receiver};
use std::io::Write;

use super::state::{EngineState, Phase};
use crate::i3bar::{Block, BlockBatch, Header};

/// Process-level control events fed to the engine by the signal monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pause,
    Resume,
    Terminate,
}

enum Wakeup {
    Batch(Option<BlockBatch>),
    Control(Option<Control>),
}

/// Write the protocol header line and open the body array.
///
/// Failure here is fatal: without a header the bar never reads the body.
pub fn write_preamble<W: Write>(out: &mut W, header: &Header) -> Result<()> {
    let json = serde_json::to_string(header).context("serialize protocol header")?;
    writeln!(out, "{json}").context("write protocol header")?;
    out.write_all(b"[\n").context("open status array")?;
    out.flush().context("flush protocol header")?;
    Ok(())
}

/// One body line: the compact block array plus either the element separator
/// or, for the last line, the closing bracket.
pub fn render_line(blocks: &[&Block], last: bool) -> serde_json::Result<String> {
    let json = serde_json::to_string(blocks)?;
    if last {
        Ok(format!("{json}\n]\n"))
    } else {
        Ok(format!("{json},\n"))
    }
}

/// The single control loop owning all aggregation state.
pub struct Engine<W> {
    state: EngineState,
    updates: Receiver<BlockBatch>,
    updates_open: bool,
    control: Receiver<Control>,
    out: W,
    lines_written: u64,
    /// Set after a failed write; the stream may end mid-line, so nothing
    /// more is written to it.
    broken: bool,
}

impl<W: Write> Engine<W> {
    pub fn new(
        state: EngineState,
        updates: Receiver<BlockBatch>,
        control: Receiver<Control>,
        out: W,
    ) -> Self {
        Self {
            state,
            updates,
            updates_open: true,
            control,
            out,
            lines_written: 0,
            broken: false,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub fn output_broken(&self) -> bool {
        self.broken
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until a terminate event, then write the closing line and return.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!(modules = self.state.slots.len(), "engine started");
        while self.state.phase() != Phase::Terminated {
            let wakeup = self.wait();
            self.handle(wakeup);
        }
        tracing::info!(lines = self.lines_written, "engine stopped");
        Ok(())
    }

    /// Block until a batch or a control event arrives.
    ///
    /// While paused, or once every module sender is gone, the update arm is
    /// swapped for a receiver that never fires, so blocked modules stay
    /// blocked in their send.
    fn wait(&self) -> Wakeup {
        let parked = if self.state.paused || !self.updates_open {
            Some(never::<BlockBatch>())
        } else {
            None
        };
        let updates = parked.as_ref().unwrap_or(&self.updates);
        select! {
            recv(updates) -> batch => Wakeup::Batch(batch.ok()),
            recv(self.control) -> control => Wakeup::Control(control.ok()),
        }
    }

    fn handle(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::Batch(Some(batch)) => {
                if self.state.apply_batch(batch) {
                    self.emit();
                }
            }
            Wakeup::Batch(None) => {
                tracing::warn!("all modules have stopped sending updates");
                for slot in self.state.slots() {
                    if !slot.is_running() {
                        tracing::debug!(module = %slot.name(), "module thread has exited");
                    }
                }
                self.updates_open = false;
            }
            Wakeup::Control(Some(Control::Pause)) => self.set_paused(true),
            Wakeup::Control(Some(Control::Resume)) => self.set_paused(false),
            Wakeup::Control(Some(Control::Terminate)) => self.terminate(),
            Wakeup::Control(None) => {
                tracing::warn!("control channel closed; shutting down");
                self.terminate();
            }
        }
    }

    fn set_paused(&mut self, paused: bool) {
        if self.state.paused == paused {
            return;
        }
        self.state.paused = paused;
        if paused {
            tracing::info!("paused");
        } else {
            tracing::info!("resumed");
        }
    }

    fn terminate(&mut self) {
        self.state.terminating = true;
        self.emit();
    }

    /// Serialize the combined state and write it as one protocol line.
    fn emit(&mut self) {
        if self.broken {
            return;
        }
        let last = self.state.terminating;
        let line = match render_line(&self.state.combined(), last) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!("failed to serialize blocks, skipping update: {err}");
                return;
            }
        };
        if let Err(err) = self
            .out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
        {
            tracing::warn!("failed to write status line, output disabled: {err}");
            self.broken = true;
            return;
        }
        self.lines_written += 1;
    }
}
