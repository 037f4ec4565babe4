use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{drive, error_block, interval_secs, Module, ModuleContext, Poller};
use crate::config::MemoryConfig;
use crate::i3bar::{Block, ClickEvent, LEFT_CLICK, RIGHT_CLICK};
use crate::theme::Theme;

pub const MEMINFO_PATH: &str = "/proc/meminfo";
const DEFAULT_INTERVAL_SECS: u64 = 5;
const INSTANCE: &str = "memory";

/// The `/proc/meminfo` fields we care about, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_available: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

impl MemInfo {
    pub fn mem_used_percent(&self) -> u64 {
        used_percent(self.mem_total, self.mem_available)
    }

    pub fn swap_used_percent(&self) -> u64 {
        used_percent(self.swap_total, self.swap_free)
    }
}

fn used_percent(total: u64, free: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    total.saturating_sub(free) * 100 / total
}

fn digits() -> Option<&'static Regex> {
    static DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new("[0-9]+").ok()).as_ref()
}

/// Parse `/proc/meminfo` text. `MemTotal` and `MemAvailable` are required;
/// missing swap lines count as zero.
pub fn parse_meminfo(text: &str) -> Result<MemInfo> {
    let digits = digits().ok_or_else(|| anyhow!("digit pattern unavailable"))?;
    let mut info = MemInfo::default();
    let mut seen_total = false;
    let mut seen_available = false;
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => {
                seen_total = true;
                &mut info.mem_total
            }
            "MemAvailable" => {
                seen_available = true;
                &mut info.mem_available
            }
            "SwapTotal" => &mut info.swap_total,
            "SwapFree" => &mut info.swap_free,
            _ => continue,
        };
        let number = digits
            .find(value)
            .ok_or_else(|| anyhow!("no value for {}", key.trim()))?;
        *slot = number
            .as_str()
            .parse()
            .with_context(|| format!("bad value for {}", key.trim()))?;
    }
    if !seen_total || !seen_available {
        return Err(anyhow!("missing MemTotal or MemAvailable"));
    }
    if info.mem_total == 0 {
        return Err(anyhow!("MemTotal is zero"));
    }
    Ok(info)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Mem,
    Swap,
}

impl Label {
    fn as_str(self) -> &'static str {
        match self {
            Self::Mem => "MEM",
            Self::Swap => "SWAP",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Self::Mem => Self::Swap,
            Self::Swap => Self::Mem,
        }
    }
}

/// RAM or swap usage; left or right click switches between them.
pub struct MemoryModule {
    path: PathBuf,
    interval: u64,
    label: Label,
    reading: Result<MemInfo, String>,
}

impl MemoryModule {
    pub fn new(path: impl Into<PathBuf>, interval: u64) -> Self {
        Self {
            path: path.into(),
            interval,
            label: Label::Mem,
            reading: Err("not read yet".to_string()),
        }
    }

    pub fn from_config(cfg: &MemoryConfig) -> Self {
        Self::new(
            MEMINFO_PATH,
            cfg.interval.unwrap_or(DEFAULT_INTERVAL_SECS),
        )
    }

    fn read(path: &Path) -> Result<MemInfo> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        parse_meminfo(&text)
    }
}

impl Poller for MemoryModule {
    fn refresh(&mut self) {
        self.reading = Self::read(&self.path).map_err(|err| {
            tracing::warn!("memory: {err:#}");
            format!("{err:#}")
        });
    }

    fn render(&self, theme: &Theme) -> Vec<Block> {
        let info = match &self.reading {
            Ok(info) => info,
            Err(err) => {
                return vec![error_block(theme, INSTANCE, format!("MEM: {err}")).with_urgent(true)]
            }
        };
        let percent = match self.label {
            Label::Mem => info.mem_used_percent(),
            Label::Swap => info.swap_used_percent(),
        };
        let (color, urgent) = if percent > 75 {
            (theme.red(), true)
        } else if percent > 50 {
            (theme.yellow(), false)
        } else {
            (theme.normal(), false)
        };
        let text = format!("{}: {percent}%", self.label.as_str());
        vec![Block::new(INSTANCE, text)
            .with_color(color)
            .with_urgent(urgent)]
    }

    fn on_click(&mut self, click: &ClickEvent) -> bool {
        if click.is_button(LEFT_CLICK) || click.is_button(RIGHT_CLICK) {
            self.label = self.label.toggled();
            return true;
        }
        false
    }
}

impl Module for MemoryModule {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn run(self: Box<Self>, ctx: ModuleContext) {
        let interval = interval_secs(Some(self.interval), DEFAULT_INTERVAL_SECS);
        drive(*self, interval, ctx);
    }
}
