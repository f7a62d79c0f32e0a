use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, ValueHint};

mod batch;
mod codec;
mod prompt;
mod results;
mod runlog;

use batch::preview;
use codec::{EncodeOptions, ErrorLevel, QrCodec};

#[derive(Debug, Parser)]
#[command(name = "qrbatch", version, about = "Batch QR code encoder and decoder")]
struct Cli {
    /// Action to perform: encode (e) or decode (d).
    #[arg(value_name = "ACTION")]
    action: Option<String>,
    /// Texts to encode, or image paths to decode. Prompted for when absent.
    #[arg(value_name = "ITEM")]
    items: Vec<String>,
    #[arg(long = "out-dir", value_name = "DIR", default_value = "Results", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,
    /// Rendered image width and height in pixels.
    #[arg(long, value_name = "PIXELS", default_value_t = 400)]
    size: u32,
    /// Error-correction level for encoding.
    #[arg(long, value_enum, default_value = "low")]
    level: ErrorLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ActionType {
    Encode,
    Decode,
    Unknown,
}

impl ActionType {
    fn parse(token: &str) -> Self {
        match token.to_lowercase().as_str() {
            "d" | "decode" => ActionType::Decode,
            "e" | "encode" => ActionType::Encode,
            _ => ActionType::Unknown,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ActionType::Encode => "encode",
            ActionType::Decode => "decode",
            ActionType::Unknown => "unknown",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli, &mut io::stdin().lock())
}

fn run(cli: Cli, input: &mut impl BufRead) -> Result<()> {
    let (action, mut items) =
        resolve_invocation(cli.action, cli.items, |item| Path::new(item).exists())?;
    let action = match action {
        Some(action) => action,
        None => prompt_action(input)?,
    };
    if items.is_empty() {
        let wanted = match action {
            ActionType::Decode => "image paths to decode",
            _ => "texts to encode",
        };
        println!("Enter {wanted}, one per line; a blank line starts the batch.");
        items = prompt::read_items(input)?;
    }
    if items.is_empty() {
        bail!("nothing to do: no work items given");
    }

    results::prepare_output_dir(&cli.out_dir, input)?;

    let options = EncodeOptions {
        size: cli.size,
        margin: 0,
        level: cli.level,
    };
    print_run_summary(action, &items, &cli.out_dir, &options);

    let codec = QrCodec;
    let stats = match action {
        ActionType::Encode => batch::run_encode_batch(&codec, &items, &cli.out_dir, &options),
        ActionType::Decode => batch::run_decode_batch(&codec, &items, &cli.out_dir),
        ActionType::Unknown => bail!("unrecognized action"),
    };
    stats.print(action.label());
    Ok(())
}

/// Applies the argument precedence once, before the batch: two or more
/// positionals mean action plus items; a single recognized token is an action
/// with items prompted later; a single unrecognized token is the work item
/// itself, with the mode inferred from whether it names an existing file.
fn resolve_invocation(
    action: Option<String>,
    items: Vec<String>,
    path_exists: impl Fn(&str) -> bool,
) -> Result<(Option<ActionType>, Vec<String>)> {
    let Some(token) = action else {
        return Ok((None, items));
    };
    let parsed = ActionType::parse(&token);
    if parsed != ActionType::Unknown {
        return Ok((Some(parsed), items));
    }
    if items.is_empty() {
        let inferred = if path_exists(&token) {
            ActionType::Decode
        } else {
            ActionType::Encode
        };
        return Ok((Some(inferred), vec![token]));
    }
    bail!("unrecognized action '{token}'; expected encode, decode, e, or d");
}

fn prompt_action(input: &mut impl BufRead) -> Result<ActionType> {
    prompt::print_prompt("Action (encode/decode): ")?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let token = line.trim();
    let action = ActionType::parse(token);
    if action == ActionType::Unknown {
        bail!("unrecognized action '{token}'; expected encode, decode, e, or d");
    }
    Ok(action)
}

fn print_run_summary(
    action: ActionType,
    items: &[String],
    out_dir: &Path,
    options: &EncodeOptions,
) {
    println!("action: {}", action.label());
    println!("output dir: {}", out_dir.display());
    if action == ActionType::Encode {
        println!("image size: {}px, level: {:?}", options.size, options.level);
    }
    println!("items ({}):", items.len());
    for item in items.iter().take(10) {
        println!("  - {}", preview(item));
    }
    if items.len() > 10 {
        println!("  ...");
    }
    println!("---");
}

#[cfg(test)]
mod action_parser_tests {
    use super::ActionType;

    #[test]
    fn decode_tokens() {
        for token in ["d", "decode", "Decode", "DECODE"] {
            assert_eq!(ActionType::parse(token), ActionType::Decode);
        }
    }

    #[test]
    fn encode_tokens() {
        for token in ["e", "encode", "Encode", "ENCODE"] {
            assert_eq!(ActionType::parse(token), ActionType::Encode);
        }
    }

    #[test]
    fn everything_else_is_unknown() {
        for token in ["", "enc", "x", "decodee", "encode "] {
            assert_eq!(ActionType::parse(token), ActionType::Unknown);
        }
    }
}
