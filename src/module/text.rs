use super::{Module, ModuleContext};
use crate::config::TextConfig;
use crate::i3bar::{Block, ClickEvent};
use crate::theme::Theme;

const INSTANCE: &str = "text";

/// Static text. A click swaps in a summary of that click; the next click
/// puts the configured content back.
pub struct TextModule {
    content: String,
    last_click: Option<ClickEvent>,
}

impl TextModule {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            last_click: None,
        }
    }

    pub fn from_config(cfg: &TextConfig) -> Self {
        Self::new(cfg.content.clone())
    }

    pub fn handle_click(&mut self, click: ClickEvent) {
        self.last_click = match self.last_click {
            Some(_) => None,
            None => Some(click),
        };
    }

    pub fn render(&self, theme: &Theme) -> Block {
        let text = match &self.last_click {
            Some(click) => describe_click(click),
            None => self.content.clone(),
        };
        Block::new(INSTANCE, text).with_color(theme.normal())
    }
}

fn describe_click(click: &ClickEvent) -> String {
    let mut text = format!(
        "button {} at {},{} ({},{} in block)",
        click.button, click.x, click.y, click.relative_x, click.relative_y
    );
    if !click.modifiers.is_empty() {
        text.push_str(" with ");
        text.push_str(&click.modifiers.join("+"));
    }
    text
}

impl Module for TextModule {
    fn kind(&self) -> &'static str {
        "text"
    }

    fn run(mut self: Box<Self>, ctx: ModuleContext) {
        loop {
            if ctx.emit(vec![self.render(ctx.theme())]).is_err() {
                return;
            }
            match ctx.clicks().recv() {
                Ok(click) => self.handle_click(click),
                Err(_) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i3bar::{LEFT_CLICK, RIGHT_CLICK};
    use crate::module::test_support::{click, wired_context};
    use std::thread;

    #[test]
    fn click_toggles_between_summary_and_content() {
        let theme = Theme::default();
        let mut module = TextModule::new("hello");
        assert_eq!(module.render(&theme).full_text, "hello");

        let mut event = click(INSTANCE, RIGHT_CLICK);
        event.x = 40;
        event.y = 7;
        event.modifiers = vec!["Shift".to_string()];
        module.handle_click(event);
        assert_eq!(
            module.render(&theme).full_text,
            "button 3 at 40,7 (0,0 in block) with Shift"
        );

        module.handle_click(click(INSTANCE, LEFT_CLICK));
        assert_eq!(module.render(&theme).full_text, "hello");
    }

    #[test]
    fn run_emits_initial_content_then_click_summary() {
        let (ctx, wired) = wired_context("greeting");
        let handle = thread::spawn(move || Box::new(TextModule::new("hi")).run(ctx));

        let first = wired.updates.recv().expect("initial batch");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, "greeting");
        assert_eq!(first[0].full_text, "hi");
        assert_eq!(first[0].color.as_deref(), Some("#ffffff"));

        wired.clicks.send(click(INSTANCE, LEFT_CLICK)).expect("click");
        let second = wired.updates.recv().expect("click batch");
        assert!(second[0].full_text.starts_with("button 1"));

        drop(wired.clicks);
        handle.join().expect("module exits when its inbox closes");
    }
}
