//! Wires configuration, modules, the click router, the signal monitor and
//! the engine into one running bar.

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use std::io::{self, Write};
use std::thread;

use crate::config::{load_bar_config, AppConfig, BarConfig, LoadedFrom, ModuleConfig};
use crate::engine::{write_preamble, Engine, EngineState, ModuleSlot};
use crate::i3bar::{spawn_stdin_router, BlockBatch, ClickEvent, ClickRoute, Header};
use crate::module::{build_module, ModuleContext};
use crate::signals::{install_signal_monitor, CONT_SIGNAL, STOP_SIGNAL};
use crate::theme::Theme;

/// Pending control events before the signal monitor blocks.
const CONTROL_CHANNEL_CAPACITY: usize = 16;

/// Pending clicks per module; a newer click evicts the pending one.
const CLICK_INBOX_CAPACITY: usize = 1;

/// Module layout and palette after config lookup and CLI overrides.
pub struct ResolvedBar {
    pub modules: Vec<ModuleConfig>,
    pub theme: Theme,
    pub source: LoadedFrom,
}

pub fn resolve_bar(config: &AppConfig) -> Result<ResolvedBar> {
    let (bar, source) = load_bar_config(config.config.as_deref())?;
    match &source {
        LoadedFrom::File(path) => tracing::info!(path = %path.display(), "loaded config"),
        LoadedFrom::Defaults => tracing::info!("no config file; using defaults"),
    }
    let modules = bar.modules_checked()?;
    if modules.is_empty() {
        tracing::warn!("no usable modules configured");
    }
    Ok(ResolvedBar {
        modules,
        theme: Theme::new(config.resolve_variant(&bar)),
        source,
    })
}

/// Write the resolved configuration as YAML.
pub fn print_config<W: Write>(config: &AppConfig, out: &mut W) -> Result<()> {
    let resolved = resolve_bar(config)?;
    let modules = resolved
        .modules
        .iter()
        .map(serde_yaml::to_value)
        .collect::<Result<Vec<_>, _>>()
        .context("serialize modules")?;
    let bar = BarConfig {
        color_variant: resolved.theme.variant.as_str().to_string(),
        modules,
    };
    if let LoadedFrom::File(path) = &resolved.source {
        writeln!(out, "# {}", path.display())?;
    }
    out.write_all(serde_yaml::to_string(&bar)?.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Run the bar on stdin/stdout until a terminate signal arrives.
pub fn run_bar(config: &AppConfig) -> Result<()> {
    let resolved = resolve_bar(config)?;

    // The header advertises the stop signal, so its handler must be in place first.
    let (control_tx, control_rx) = bounded(CONTROL_CHANNEL_CAPACITY);
    install_signal_monitor(control_tx)?;

    let mut out = io::stdout().lock();
    write_preamble(&mut out, &Header::new(STOP_SIGNAL, CONT_SIGNAL))?;

    // Rendezvous: a module's send completes only when the engine takes it.
    let (update_tx, update_rx) = bounded::<BlockBatch>(0);
    let mut slots = Vec::with_capacity(resolved.modules.len());
    let mut routes = Vec::with_capacity(resolved.modules.len());
    for module_config in &resolved.modules {
        let name = module_config.slot_name().to_string();
        let (click_tx, click_rx) = bounded::<ClickEvent>(CLICK_INBOX_CAPACITY);
        let module = build_module(module_config);
        let ctx = ModuleContext::new(
            name.clone(),
            update_tx.clone(),
            click_rx.clone(),
            resolved.theme,
        );
        let handle = thread::Builder::new()
            .name(format!("module-{name}"))
            .spawn(move || module.run(ctx))
            .with_context(|| format!("spawn module {name}"))?;
        tracing::debug!(module = %name, kind = module_config.kind(), "module started");
        let slot = ModuleSlot::new(name.clone(), click_tx).with_handle(handle);
        routes.push(ClickRoute::new(name, slot.click_sender().clone(), click_rx));
        slots.push(slot);
    }
    drop(update_tx);

    spawn_stdin_router(routes).context("spawn click router")?;

    let mut engine = Engine::new(EngineState::new(slots), update_rx, control_rx, out);
    engine.run()
}
