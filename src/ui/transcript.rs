use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pulldown_cmark::{Event, Parser, Tag};

use crate::llm::media::InlineImage;
use crate::studio::conversation::{Message, Sender};

/// Flattens markdown to terminal text: list items become bullets, emphasis
/// markers are dropped.
pub fn markdown_to_text(markdown: &str) -> String {
    let mut out = String::new();
    let mut list_depth = 0usize;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(Tag::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                out.push_str(&"  ".repeat(list_depth.saturating_sub(1)));
                out.push_str("• ");
            }
            Event::End(Tag::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::End(Tag::Paragraph) => {
                if list_depth == 0 {
                    out.push_str("\n\n");
                }
            }
            Event::End(Tag::Heading(..)) => out.push_str("\n\n"),
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("────────\n"),
            _ => {}
        }
    }

    out.trim_end().to_string()
}

fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    let channel = |value: &str| u8::from_str_radix(value, 16).ok();
    match digits.len() {
        3 | 4 => {
            let mut chars = digits.chars().map(|c| c.to_string().repeat(2));
            let r = channel(&chars.next()?)?;
            let g = channel(&chars.next()?)?;
            let b = channel(&chars.next()?)?;
            Some((r, g, b))
        }
        6 | 8 => Some((
            channel(digits.get(0..2)?)?,
            channel(digits.get(2..4)?)?,
            channel(digits.get(4..6)?)?,
        )),
        _ => None,
    }
}

pub fn render_swatches(colors: &[String]) -> String {
    colors
        .iter()
        .map(|color| match hex_to_rgb(color) {
            Some((r, g, b)) => format!("\x1b[48;2;{r};{g};{b}m    \x1b[0m {color}"),
            None => color.clone(),
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn render_message(message: &Message, saved_image: Option<&Path>) -> String {
    let who = match message.sender {
        Sender::User => "Tu",
        Sender::Bot => "Studio",
    };
    let mut lines = vec![format!("[#{}] {}:", message.id, who)];

    match message.text() {
        None => lines.push("  … sto lavorando, attendi".to_string()),
        Some(text) => {
            for line in markdown_to_text(text).lines() {
                lines.push(format!("  {line}"));
            }
        }
    }

    if let Some(path) = saved_image {
        lines.push(format!("  Immagine: {}", path.display()));
    } else if message.image_url.is_some() {
        lines.push("  Immagine: allegata".to_string());
    }
    if let Some(prompt) = &message.prompt {
        lines.push(format!("  Prompt: {prompt}"));
    }
    if let Some(colors) = message.color_palette.as_deref().filter(|c| !c.is_empty()) {
        lines.push(format!("  Palette: {}", render_swatches(colors)));
    }
    if let Some(advice) = &message.needle_recommendation {
        lines.push("  Consigli sugli aghi:".to_string());
        for line in markdown_to_text(advice).lines() {
            lines.push(format!("    {line}"));
        }
    }
    if message.sender == Sender::Bot && message.request.is_some() {
        lines.push(format!("  (usa /rigenera {} per un'altra variante)", message.id));
    }

    lines.join("\n")
}

/// Writes a bot image to `render_dir` so it can be opened outside the terminal.
pub async fn save_message_image(render_dir: &Path, message: &Message) -> Result<Option<PathBuf>> {
    if message.sender != Sender::Bot {
        return Ok(None);
    }
    let Some(data_uri) = message.image_url.as_deref() else {
        return Ok(None);
    };

    let image = InlineImage::from_data_uri(data_uri)?;
    let bytes = image
        .decode_bytes()
        .context("Image payload is not valid base64")?;
    tokio::fs::create_dir_all(render_dir)
        .await
        .with_context(|| format!("Failed to create {}", render_dir.display()))?;
    let path = render_dir.join(format!("message-{}.{}", message.id, image.file_extension()));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(path))
}
