use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::{drive, error_block, interval_secs, Module, ModuleContext, Poller};
use crate::config::BatteryConfig;
use crate::i3bar::Block;
use crate::theme::Theme;

pub const POWER_SUPPLY_ROOT: &str = "/sys/class/power_supply";
const DEFAULT_INTERVAL_SECS: u64 = 5;
const INSTANCE: &str = "battery";

/// Names of the power supplies under `root` that are batteries and report a
/// capacity, sorted.
pub fn scan_batteries(root: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(root).with_context(|| format!("read {}", root.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read {}", root.display()))?;
        let dir = entry.path();
        let Ok(kind) = fs::read_to_string(dir.join("type")) else {
            continue;
        };
        if kind.trim() != "Battery" || !dir.join("capacity").exists() {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

pub fn read_capacity(root: &Path, battery: &str) -> Result<u8> {
    let path = root.join(battery).join("capacity");
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    raw.trim()
        .parse()
        .with_context(|| format!("bad capacity {:?}", raw.trim()))
}

struct Reading {
    name: String,
    capacity: Result<u8, String>,
}

/// Charge level of every battery; clicks are ignored.
pub struct BatteryModule {
    root: PathBuf,
    interval: u64,
    scan: Result<Vec<Reading>, String>,
}

impl BatteryModule {
    pub fn new(root: impl Into<PathBuf>, interval: u64) -> Self {
        Self {
            root: root.into(),
            interval,
            scan: Ok(Vec::new()),
        }
    }

    pub fn from_config(cfg: &BatteryConfig) -> Self {
        Self::new(
            POWER_SUPPLY_ROOT,
            cfg.interval.unwrap_or(DEFAULT_INTERVAL_SECS),
        )
    }

    fn rescan(&mut self) {
        self.scan = scan_batteries(&self.root)
            .map(|names| {
                names
                    .into_iter()
                    .map(|name| Reading {
                        name,
                        capacity: Err("not read yet".to_string()),
                    })
                    .collect()
            })
            .map_err(|err| {
                tracing::warn!("battery scan failed: {err:#}");
                format!("{err:#}")
            });
    }
}

impl Poller for BatteryModule {
    fn refresh(&mut self) {
        // Batteries can be hot-plugged; look again while none are known.
        if !matches!(&self.scan, Ok(readings) if !readings.is_empty()) {
            self.rescan();
        }
        let Ok(readings) = &mut self.scan else {
            return;
        };
        for reading in readings.iter_mut() {
            reading.capacity = read_capacity(&self.root, &reading.name).map_err(|err| {
                tracing::debug!(battery = %reading.name, "capacity read failed: {err:#}");
                format!("{err:#}")
            });
        }
    }

    fn render(&self, theme: &Theme) -> Vec<Block> {
        let readings = match &self.scan {
            Ok(readings) if readings.is_empty() => {
                return vec![error_block(theme, INSTANCE, "BAT: no battery found".to_string())]
            }
            Ok(readings) => readings,
            Err(err) => return vec![error_block(theme, INSTANCE, format!("BAT: {err}"))],
        };
        readings
            .iter()
            .map(|reading| match reading.capacity {
                Ok(capacity) => {
                    let color = if capacity < 10 {
                        theme.red()
                    } else if capacity < 20 {
                        theme.yellow()
                    } else {
                        theme.normal()
                    };
                    let text = format!("{}: {capacity}%", reading.name);
                    Block::new(reading.name.as_str(), text.as_str())
                        .with_color(color)
                        .with_short_text(text.as_str())
                        .with_min_width_of(&text)
                        .with_urgent(capacity < 5)
                }
                Err(ref err) => {
                    error_block(theme, &reading.name, format!("{}: {err}", reading.name))
                }
            })
            .collect()
    }
}

impl Module for BatteryModule {
    fn kind(&self) -> &'static str {
        "battery"
    }

    fn run(self: Box<Self>, ctx: ModuleContext) {
        let interval = interval_secs(Some(self.interval), DEFAULT_INTERVAL_SECS);
        drive(*self, interval, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn fake_sysfs(label: &str, supplies: &[(&str, &str, Option<&str>)]) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("rsbar-power-{label}-{nanos}"));
        for (name, kind, capacity) in supplies {
            let dir = root.join(name);
            fs::create_dir_all(&dir).expect("create supply dir");
            fs::write(dir.join("type"), format!("{kind}\n")).expect("write type");
            if let Some(capacity) = capacity {
                fs::write(dir.join("capacity"), format!("{capacity}\n")).expect("write capacity");
            }
        }
        fs::create_dir_all(&root).expect("create root");
        root
    }

    #[test]
    fn scan_keeps_only_batteries_with_capacity() {
        let root = fake_sysfs(
            "scan",
            &[
                ("BAT1", "Battery", Some("50")),
                ("AC", "Mains", None),
                ("BAT0", "Battery", Some("80")),
                ("hidpp_battery_0", "Battery", None),
            ],
        );
        assert_eq!(scan_batteries(&root).expect("scan"), vec!["BAT0", "BAT1"]);
        assert_eq!(read_capacity(&root, "BAT1").expect("capacity"), 50);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn capacity_thresholds_pick_color_and_urgency() {
        let theme = Theme::default();
        let root = fake_sysfs(
            "levels",
            &[
                ("BAT0", "Battery", Some("3")),
                ("BAT1", "Battery", Some("15")),
                ("BAT2", "Battery", Some("90")),
            ],
        );
        let mut module = BatteryModule::new(&root, 5);
        module.refresh();
        let blocks = module.render(&theme);
        assert_eq!(blocks.len(), 3);

        assert_eq!(blocks[0].full_text, "BAT0: 3%");
        assert_eq!(blocks[0].instance, "BAT0");
        assert_eq!(blocks[0].color.as_deref(), Some(theme.red()));
        assert!(blocks[0].urgent);

        assert_eq!(blocks[1].color.as_deref(), Some(theme.yellow()));
        assert!(!blocks[1].urgent);

        assert_eq!(blocks[2].color.as_deref(), Some(theme.normal()));
        assert_eq!(blocks[2].short_text.as_deref(), Some("BAT2: 90%"));
        assert_eq!(blocks[2].min_width, Some(9));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn no_battery_is_an_error_block() {
        let theme = Theme::default();
        let root = fake_sysfs("none", &[("AC", "Mains", None)]);
        let mut module = BatteryModule::new(&root, 5);
        module.refresh();
        let blocks = module.render(&theme);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].full_text, "BAT: no battery found");
        assert_eq!(blocks[0].color.as_deref(), Some(theme.red()));
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn missing_root_reports_scan_error() {
        let theme = Theme::default();
        let mut module = BatteryModule::new("/nonexistent/power_supply", 5);
        module.refresh();
        let blocks = module.render(&theme);
        assert!(blocks[0].full_text.starts_with("BAT: read /nonexistent"));
    }
}
