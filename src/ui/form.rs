use std::path::PathBuf;

use crate::studio::request::{PartialTattooRequest, TattooRequest, TattooSize, UnknownChoice};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Generate(TattooRequest),
    Analyze {
        path: PathBuf,
        details: PartialTattooRequest,
    },
    Regenerate(u64),
    Palette(String),
    History,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Virgolette non chiuse")]
    UnterminatedQuote,
    #[error("Comando sconosciuto: {0}. Usa /aiuto.")]
    UnknownCommand(String),
    #[error("Manca il valore per {0}")]
    MissingValue(String),
    #[error("Campo obbligatorio mancante: --{0}")]
    MissingField(&'static str),
    #[error("Argomento sconosciuto: {0}")]
    UnknownArgument(String),
    #[error("Valore non valido: {0}")]
    InvalidChoice(#[from] UnknownChoice),
    #[error("Identificativo di messaggio non valido: {0}")]
    InvalidMessageId(String),
    #[error("Indica il percorso dell'immagine da analizzare")]
    MissingPath,
}

pub fn usage() -> &'static str {
    "Comandi disponibili:
  /genera --subject <soggetto> --style <stile> [--size piccolo|medio|grande]
          [--color <colori>] --placement <posizione> [--elements <elementi>]
          --complexity semplice|moderata|intricata
          (predefiniti: dimensione Medio, colori Bianco e nero)
  /analizza <percorso-immagine> [--style ...] [--size ...] [--complexity ...]
                                  consigli sugli aghi e palette di un'immagine
  /rigenera <id>                  rigenera il tatuaggio del messaggio <id>
  /palette <stile>                suggerimenti di palette per uno stile
  /cronologia                     mostra la conversazione
  /aiuto                          mostra questo aiuto
  /esci                           chiude lo studio
Usa le virgolette per valori con spazi, es. --color \"Bianco e nero\"."
}

/// Splits on whitespace; double quotes group words.
pub fn split_args(line: &str) -> Result<Vec<String>, FormError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(FormError::UnterminatedQuote);
    }
    if has_token {
        args.push(current);
    }
    Ok(args)
}

pub const DEFAULT_SIZE: TattooSize = TattooSize::Medium;
pub const DEFAULT_COLOR: &str = "Bianco e nero";

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

/// Reads `--flag value` pairs into whatever fields were given. Anything that
/// is not a flag is returned as a positional word.
fn parse_request_flags(args: &[String]) -> Result<(PartialTattooRequest, Vec<String>), FormError> {
    let mut fields = PartialTattooRequest::default();
    let mut positional = Vec::new();

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        if !flag.starts_with("--") {
            positional.push(args[index].clone());
            index += 1;
            continue;
        }
        let value = || {
            args.get(index + 1)
                .cloned()
                .ok_or_else(|| FormError::MissingValue(flag.to_string()))
        };
        match flag {
            "--subject" | "--soggetto" => fields.subject = non_blank(value()?),
            "--style" | "--stile" => fields.style = non_blank(value()?),
            "--size" | "--dimensione" => fields.size = Some(value()?.parse()?),
            "--color" | "--colori" => fields.color = non_blank(value()?),
            "--placement" | "--posizione" => fields.placement = non_blank(value()?),
            "--elements" | "--elementi" => fields.elements = non_blank(value()?),
            "--complexity" | "--complessita" => fields.complexity = Some(value()?.parse()?),
            other => return Err(FormError::UnknownArgument(other.to_string())),
        }
        index += 2;
    }

    Ok((fields, positional))
}

fn parse_generate_args(args: &[String]) -> Result<TattooRequest, FormError> {
    let (fields, positional) = parse_request_flags(args)?;
    if let Some(extra) = positional.into_iter().next() {
        return Err(FormError::UnknownArgument(extra));
    }

    Ok(TattooRequest {
        subject: fields.subject.ok_or(FormError::MissingField("subject"))?,
        style: fields.style.ok_or(FormError::MissingField("style"))?,
        size: fields.size.unwrap_or(DEFAULT_SIZE),
        color: fields.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        placement: fields.placement.ok_or(FormError::MissingField("placement"))?,
        elements: fields.elements.unwrap_or_default(),
        complexity: fields
            .complexity
            .ok_or(FormError::MissingField("complexity"))?,
    })
}

fn parse_analyze_args(args: &[String]) -> Result<Command, FormError> {
    let (details, positional) = parse_request_flags(args)?;
    if positional.is_empty() {
        return Err(FormError::MissingPath);
    }
    Ok(Command::Analyze {
        path: PathBuf::from(positional.join(" ")),
        details,
    })
}

/// `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<Command>, FormError> {
    let args = split_args(line)?;
    let Some((name, rest)) = args.split_first() else {
        return Ok(None);
    };

    let command = match name.as_str() {
        "/genera" | "/generate" => Command::Generate(parse_generate_args(rest)?),
        "/analizza" | "/analyze" => parse_analyze_args(rest)?,
        "/rigenera" | "/regenerate" => {
            let raw = rest.first().ok_or_else(|| FormError::MissingValue(name.clone()))?;
            let id = raw
                .trim_start_matches('#')
                .parse::<u64>()
                .map_err(|_| FormError::InvalidMessageId(raw.clone()))?;
            Command::Regenerate(id)
        }
        "/palette" => Command::Palette(rest.join(" ")),
        "/cronologia" | "/history" => Command::History,
        "/aiuto" | "/help" => Command::Help,
        "/esci" | "/quit" | "/exit" => Command::Quit,
        other => return Err(FormError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}
