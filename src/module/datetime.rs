use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;

use super::{drive, error_block, interval_secs, Module, ModuleContext, Poller};
use crate::config::DatetimeConfig;
use crate::i3bar::{Block, ClickEvent, LEFT_CLICK};
use crate::theme::Theme;

/// RFC 1123 layout, e.g. `Mon, 02 Jan 2006 15:04:05 MST`.
///
/// Named zones print their abbreviation for `%Z`. The `Local` zone only
/// knows its offset, so it prints e.g. `+01:00` there.
pub const DEFAULT_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %Z";
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";
const DEFAULT_INTERVAL_SECS: u64 = 1;
const LOCAL_ZONE: &str = "Local";

enum Zone {
    Local,
    Named(Tz),
    Invalid(String),
}

impl Zone {
    fn resolve(name: &str) -> Self {
        if name == LOCAL_ZONE {
            return Self::Local;
        }
        match name.parse::<Tz>() {
            Ok(tz) => Self::Named(tz),
            Err(err) => Self::Invalid(err.to_string()),
        }
    }
}

fn valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Current time in one or more zones, one block per zone. Left click on a
/// zone flips that zone between the configured format and ISO 8601.
pub struct DatetimeModule {
    format: String,
    zones: Vec<(String, Zone)>,
    interval: u64,
    iso: HashSet<String>,
}

impl DatetimeModule {
    pub fn new(format: impl Into<String>, timezones: &[String], interval: u64) -> Self {
        let names: Vec<String> = if timezones.is_empty() {
            vec![LOCAL_ZONE.to_string()]
        } else {
            timezones.to_vec()
        };
        Self {
            format: format.into(),
            zones: names
                .into_iter()
                .map(|name| {
                    let zone = Zone::resolve(&name);
                    (name, zone)
                })
                .collect(),
            interval,
            iso: HashSet::new(),
        }
    }

    pub fn from_config(cfg: &DatetimeConfig) -> Self {
        Self::new(
            cfg.format.as_deref().unwrap_or(DEFAULT_FORMAT),
            &cfg.timezones,
            cfg.interval.unwrap_or(DEFAULT_INTERVAL_SECS),
        )
    }

    /// Blocks for the instant `now`.
    pub fn render_at(&self, now: DateTime<Utc>, theme: &Theme) -> Vec<Block> {
        let format_ok = valid_format(&self.format);
        self.zones
            .iter()
            .map(|(name, zone)| {
                let format = if self.iso.contains(name) {
                    ISO_FORMAT
                } else if format_ok {
                    self.format.as_str()
                } else {
                    return error_block(
                        theme,
                        name,
                        format!("datetime: invalid format {:?}", self.format),
                    );
                };
                let text = match zone {
                    Zone::Local => now.with_timezone(&Local).format(format).to_string(),
                    Zone::Named(tz) => now.with_timezone(tz).format(format).to_string(),
                    Zone::Invalid(err) => {
                        return error_block(theme, name, format!("datetime: {err}"));
                    }
                };
                Block::new(name.as_str(), text.as_str())
                    .with_color(theme.normal())
                    .with_min_width_of(&text)
            })
            .collect()
    }
}

impl Poller for DatetimeModule {
    fn refresh(&mut self) {}

    fn render(&self, theme: &Theme) -> Vec<Block> {
        self.render_at(Utc::now(), theme)
    }

    fn on_click(&mut self, click: &ClickEvent) -> bool {
        let known = self.zones.iter().any(|(name, _)| *name == click.instance);
        if !click.is_button(LEFT_CLICK) || !known {
            return false;
        }
        if !self.iso.remove(&click.instance) {
            self.iso.insert(click.instance.clone());
        }
        true
    }
}

impl Module for DatetimeModule {
    fn kind(&self) -> &'static str {
        "datetime"
    }

    fn run(self: Box<Self>, ctx: ModuleContext) {
        let interval = interval_secs(Some(self.interval), DEFAULT_INTERVAL_SECS);
        drive(*self, interval, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i3bar::RIGHT_CLICK;
    use crate::module::test_support::click;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 45)
            .single()
            .expect("valid instant")
    }

    fn zones(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn one_block_per_zone_in_config_order() {
        let theme = Theme::default();
        let module = DatetimeModule::new(
            "%H:%M",
            &zones(&["UTC", "Asia/Tokyo", "America/New_York"]),
            1,
        );
        let blocks = module.render_at(instant(), &theme);
        let texts: Vec<_> = blocks.iter().map(|b| b.full_text.as_str()).collect();
        assert_eq!(texts, vec!["12:30", "21:30", "07:30"]);
        assert_eq!(blocks[1].instance, "Asia/Tokyo");
        assert_eq!(blocks[0].min_width, Some(5));
    }

    #[test]
    fn default_format_is_rfc1123_style() {
        let module = DatetimeModule::new(DEFAULT_FORMAT, &zones(&["UTC"]), 1);
        let blocks = module.render_at(instant(), &Theme::default());
        assert_eq!(blocks[0].full_text, "Mon, 15 Jan 2024 12:30:45 UTC");
    }

    #[test]
    fn local_zone_prints_numeric_offset_for_zone_name() {
        let module = DatetimeModule::new(DEFAULT_FORMAT, &zones(&["Local"]), 1);
        let blocks = module.render_at(instant(), &Theme::default());
        let offset = regex::Regex::new(r" [+-]\d{2}:\d{2}$").expect("offset pattern");
        assert!(
            offset.is_match(&blocks[0].full_text),
            "unexpected local rendering: {}",
            blocks[0].full_text
        );
    }

    #[test]
    fn empty_zone_list_means_local() {
        let module = DatetimeModule::new("%Y", &[], 1);
        let blocks = module.render_at(instant(), &Theme::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].instance, "Local");
    }

    #[test]
    fn unknown_zone_is_an_error_block_for_that_instance() {
        let theme = Theme::default();
        let module = DatetimeModule::new("%H", &zones(&["UTC", "Mars/Olympus"]), 1);
        let blocks = module.render_at(instant(), &theme);
        assert_eq!(blocks[0].full_text, "12");
        assert_eq!(blocks[1].instance, "Mars/Olympus");
        assert!(blocks[1].full_text.starts_with("datetime: "));
        assert_eq!(blocks[1].color.as_deref(), Some(theme.red()));
    }

    #[test]
    fn invalid_format_does_not_panic() {
        let module = DatetimeModule::new("%Q broken %", &zones(&["UTC"]), 1);
        let blocks = module.render_at(instant(), &Theme::default());
        assert!(blocks[0].full_text.starts_with("datetime: invalid format"));
    }

    #[test]
    fn left_click_toggles_iso_per_instance() {
        let theme = Theme::default();
        let mut module = DatetimeModule::new("%H:%M", &zones(&["UTC", "Asia/Tokyo"]), 1);

        assert!(!module.on_click(&click("UTC", RIGHT_CLICK)));
        assert!(!module.on_click(&click("Europe/Berlin", LEFT_CLICK)));
        assert!(module.on_click(&click("Asia/Tokyo", LEFT_CLICK)));

        let blocks = module.render_at(instant(), &theme);
        assert_eq!(blocks[0].full_text, "12:30");
        assert_eq!(blocks[1].full_text, "2024-01-15T21:30:45+09:00");

        assert!(module.on_click(&click("Asia/Tokyo", LEFT_CLICK)));
        assert_eq!(module.render_at(instant(), &theme)[1].full_text, "21:30");
    }
}
