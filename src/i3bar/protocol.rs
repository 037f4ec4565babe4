//! Wire types for the i3bar/swaybar status command protocol.
//!
//! Field names follow the protocol exactly; optional fields are omitted from
//! the serialized JSON so the bar applies its own defaults.

use serde::{Deserialize, Deserializer, Serialize};

/// Mouse button numbers reported in click events.
pub const LEFT_CLICK: u32 = 1;
pub const MIDDLE_CLICK: u32 = 2;
pub const RIGHT_CLICK: u32 = 3;
pub const SCROLL_UP: u32 = 4;
pub const SCROLL_DOWN: u32 = 5;

/// First line written to stdout; tells the bar how to talk to us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cont_signal: Option<i32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub click_events: bool,
}

impl Header {
    /// Header advertising click events and the given pause/resume signals.
    pub fn new(stop_signal: i32, cont_signal: i32) -> Self {
        Self {
            version: 1,
            stop_signal: Some(stop_signal),
            cont_signal: Some(cont_signal),
            click_events: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One renderable segment of the status line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Owning module identifier, shared by every block a module emits.
    pub name: String,
    /// Sub-item identifier, unique within one batch.
    pub instance: String,
    pub full_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_top: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_right: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_bottom: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_left: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub urgent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_block_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
}

impl Block {
    pub fn new(instance: impl Into<String>, full_text: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            full_text: full_text.into(),
            ..Self::default()
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    pub fn with_short_text(mut self, text: impl Into<String>) -> Self {
        self.short_text = Some(text.into());
        self
    }

    /// Reserve at least as much width as `text` takes, so the block does not
    /// jitter as its content changes length.
    pub fn with_min_width_of(mut self, text: &str) -> Self {
        self.min_width = Some(text.chars().count() as u32);
        self
    }

    pub fn with_urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }
}

/// Ordered set of blocks a module emits in one update.
pub type BlockBatch = Vec<Block>;

/// A click reported by the bar on one of our blocks.
///
/// Bars differ in which fields they send, so everything defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub instance: String,
    pub button: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub modifiers: Vec<String>,
    pub x: i32,
    pub y: i32,
    pub relative_x: i32,
    pub relative_y: i32,
    pub output_x: i32,
    pub output_y: i32,
    pub width: i32,
    pub height: i32,
}

impl ClickEvent {
    pub fn is_button(&self, button: u32) -> bool {
        self.button == button
    }
}

/// i3 reports `"instance": null` for blocks without one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
