//! Plain-terminal rendering of transcript entries.

use parley_core::{Button, Message, Theme};

const RESET: &str = "\x1b[0m";

/// ANSI colours for one theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    user: &'static str,
    bot: &'static str,
    muted: &'static str,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                user: "\x1b[34m",
                bot: "\x1b[32m",
                muted: "\x1b[90m",
            },
            Theme::Dark => Self {
                user: "\x1b[96m",
                bot: "\x1b[92m",
                muted: "\x1b[37m",
            },
        }
    }
}

/// Render one message as terminal lines. Buttons are numbered so they can
/// be pressed with `/press N`.
pub fn render_message(message: &Message, palette: Palette) -> String {
    let (label, colour) = if message.is_user {
        ("you", palette.user)
    } else {
        ("bot", palette.bot)
    };
    let time = message.timestamp.format("%H:%M");

    let mut out = String::new();
    for (i, line) in message.text.lines().into_iter().enumerate() {
        if i == 0 {
            out.push_str(&format!(
                "{}{} {}{}>{} {}\n",
                palette.muted, time, colour, label, RESET, line
            ));
        } else {
            out.push_str(&format!("          {}\n", line));
        }
    }
    if let Some(image) = &message.image {
        out.push_str(&format!("{}  [image] {}{}\n", palette.muted, image, RESET));
    }
    for (i, button) in message.buttons.iter().enumerate() {
        out.push_str(&render_button(i + 1, button, palette));
    }
    out
}

fn render_button(number: usize, button: &Button, palette: Palette) -> String {
    match &button.url {
        Some(url) => format!(
            "{}  [{}] {} -> {}{}\n",
            palette.muted, number, button.title, url, RESET
        ),
        None => format!("{}  [{}] {}{}\n", palette.muted, number, button.title, RESET),
    }
}

/// Buttons of the most recent bot message that has any.
pub fn latest_buttons(transcript: &[Message]) -> Vec<Button> {
    transcript
        .iter()
        .rev()
        .find(|m| !m.is_user && !m.buttons.is_empty())
        .map(|m| m.buttons.clone())
        .unwrap_or_default()
}
