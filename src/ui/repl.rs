use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info, warn};

use crate::llm::media::InlineImage;
use crate::llm::GenerativeBackend;
use crate::studio::conversation::{Message, TurnError};
use crate::studio::prompts::{build_user_request_summary, UNCONFIGURED_ERROR};
use crate::studio::request::PartialTattooRequest;
use crate::studio::session::{Session, UploadedImage};
use crate::ui::form::{parse_command, usage, Command};
use crate::ui::transcript::{markdown_to_text, render_message, save_message_image};

const BUSY_NOTICE: &str = "Attendi: una richiesta è già in corso.";

struct Input<R> {
    lines: Lines<R>,
    open: bool,
    rejected: usize,
}

impl<R: AsyncBufRead + Unpin> Input<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            open: true,
            rejected: 0,
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        if !self.open {
            return Ok(None);
        }
        let line = self.lines.next_line().await.context("Failed to read stdin")?;
        if line.is_none() {
            self.open = false;
        }
        Ok(line)
    }
}

fn prompt_marker() {
    print!("> ");
    if let Err(err) = std::io::stdout().flush() {
        debug!("Failed to flush prompt: {}", err);
    }
}

/// Drives a turn to completion while still reading stdin, so submissions made
/// in the meantime are rejected instead of queued.
async fn await_turn<F, R>(turn: F, input: &mut Input<R>) -> F::Output
where
    F: Future,
    R: AsyncBufRead + Unpin,
{
    tokio::pin!(turn);
    loop {
        tokio::select! {
            biased;
            output = &mut turn => return output,
            line = input.lines.next_line(), if input.open => match line {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    info!("Rejected input while busy: {:?}", line);
                    input.rejected += 1;
                    println!("{BUSY_NOTICE}");
                }
                Ok(Some(_)) => {}
                Ok(None) => input.open = false,
                Err(err) => {
                    warn!("Failed to read stdin while busy: {}", err);
                    input.open = false;
                }
            },
        }
    }
}

async fn print_settled<B: GenerativeBackend>(
    session: &Session<B>,
    render_dir: &Path,
    outcome: Result<Message, TurnError>,
) {
    let message = match outcome {
        Ok(message) => message,
        Err(err) => {
            println!("{err}");
            return;
        }
    };

    let saved = match save_message_image(render_dir, &message).await {
        Ok(path) => path,
        Err(err) => {
            warn!("Failed to save image for message {}: {:#}", message.id, err);
            None
        }
    };
    println!("{}", render_message(&message, saved.as_deref()));
    if let Some(banner) = session.banner() {
        println!("\n!! {banner}");
    }
}

async fn load_upload(path: &Path, details: PartialTattooRequest) -> Result<UploadedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Impossibile leggere {}", path.display()))?;
    let image = InlineImage::from_bytes(&bytes)
        .with_context(|| format!("{} non è un'immagine supportata", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedImage {
        file_name,
        image,
        details,
    })
}

fn print_history<B: GenerativeBackend>(session: &Session<B>, render_dir: &Path) {
    for message in session.conversation().messages() {
        let saved: Option<PathBuf> = message.image_url.as_deref().and_then(|uri| {
            let image = InlineImage::from_data_uri(uri).ok()?;
            let path = render_dir.join(format!("message-{}.{}", message.id, image.file_extension()));
            path.exists().then_some(path)
        });
        println!("{}\n", render_message(message, saved.as_deref()));
    }
}

pub async fn run<B: GenerativeBackend>(session: &mut Session<B>, render_dir: &Path) -> Result<()> {
    let mut input = Input::new(BufReader::new(tokio::io::stdin()));

    if let Some(welcome) = session.conversation().messages().first() {
        println!("{}\n", render_message(welcome, None));
    }
    println!("{}\n", usage());

    loop {
        prompt_marker();
        let Some(line) = input.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };

        match command {
            Command::Generate(request) => {
                println!("{}", markdown_to_text(&build_user_request_summary(&request)));
                println!("… sto lavorando, attendi");
                let outcome = await_turn(session.submit_request(request), &mut input)
                    .await
                    .map(Message::clone);
                print_settled(session, render_dir, outcome).await;
            }
            Command::Analyze { path, details } => {
                let upload = match load_upload(&path, details).await {
                    Ok(upload) => upload,
                    Err(err) => {
                        println!("{err:#}");
                        continue;
                    }
                };
                println!("… analizzo {}, attendi", upload.file_name);
                let outcome = await_turn(session.analyze_upload(upload), &mut input)
                    .await
                    .map(Message::clone);
                print_settled(session, render_dir, outcome).await;
            }
            Command::Regenerate(id) => {
                println!("… rigenero il messaggio #{id}, attendi");
                let outcome = await_turn(session.regenerate(id), &mut input)
                    .await
                    .map(Message::clone);
                print_settled(session, render_dir, outcome).await;
            }
            Command::Palette(style) => match session.suggest_palettes(&style).await {
                Ok(suggestions) if suggestions.is_empty() => {
                    println!("Nessun suggerimento (indica uno stile di almeno 3 caratteri).")
                }
                Ok(suggestions) => {
                    let chips: Vec<String> = suggestions
                        .iter()
                        .map(|suggestion| format!("[{suggestion}]"))
                        .collect();
                    println!("Palette suggerite: {}", chips.join(" "));
                }
                Err(_) => println!("{UNCONFIGURED_ERROR}"),
            },
            Command::History => print_history(session, render_dir),
            Command::Help => println!("{}", usage()),
            Command::Quit => break,
        }
    }

    info!(
        "Studio session closed after {} messages ({} submissions rejected while busy)",
        session.conversation().len(),
        input.rejected
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn slow_turn(polls: usize) -> &'static str {
        for _ in 0..polls {
            tokio::task::yield_now().await;
        }
        "settled"
    }

    #[tokio::test]
    async fn input_during_a_turn_is_rejected_not_queued() {
        let mut input = Input::new(&b"/genera --subject lupo\n\n/palette Tribale\n"[..]);

        let output = await_turn(slow_turn(10), &mut input).await;

        assert_eq!(output, "settled");
        assert_eq!(input.rejected, 2);
        assert_eq!(input.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn lines_after_a_finished_turn_stay_unread() {
        let mut input = Input::new(&b"/cronologia\n"[..]);

        let output = await_turn(async { 7 }, &mut input).await;

        assert_eq!(output, 7);
        assert_eq!(input.rejected, 0);
        assert_eq!(
            input.next_line().await.unwrap().as_deref(),
            Some("/cronologia")
        );
    }
}
