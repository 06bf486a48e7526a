use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
    time::{Duration, Instant},
};
use tokhost_abi::{ChatTemplateRequest, TokenId};
use tokhost_core::{InstanceSource, PoolConfig, Tokenizer};
use tracing::{debug, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Tokenize,
    Detokenize,
    Chat,
}

/// Tokenize, detokenize and chat-template text with a sandboxed tokenizer module.
#[derive(Debug, Parser)]
#[command(name = "tokhost", version)]
struct Cli {
    /// Path to the tokenizer module (.wasm). Defaults to $TOKHOST_WASM, then the per-user data dir.
    #[arg(long, value_name = "PATH")]
    wasm: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::Tokenize)]
    mode: Mode,

    /// Include special tokens
    #[arg(long)]
    special: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Show timing information on stderr
    #[arg(long)]
    benchmark: bool,

    /// JSON file with the chat request (chat mode)
    #[arg(long, value_name = "PATH")]
    chat_file: Option<PathBuf>,

    /// Serve calls from an instance pool instead of a single instance
    #[arg(long)]
    pooled: bool,

    /// Cap on pooled instances
    #[arg(long, value_name = "N", requires = "pooled")]
    max_instances: Option<usize>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Text (tokenize), token IDs (detokenize) or chat JSON (chat)
    input: Vec<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn parse_tokens(input: &str) -> Result<Vec<TokenId>> {
    input
        .split_whitespace()
        .map(|s| {
            s.parse::<TokenId>()
                .with_context(|| format!("parsing token '{s}'"))
        })
        .collect()
}

fn read_chat_request(cli: &Cli) -> Result<ChatTemplateRequest> {
    if let Some(path) = &cli.chat_file {
        let data =
            fs::read(path).with_context(|| format!("reading chat file {}", path.display()))?;
        return serde_json::from_slice(&data)
            .with_context(|| format!("parsing chat file {}", path.display()));
    }
    if !cli.input.is_empty() {
        return serde_json::from_str(&cli.input.join(" ")).context("parsing chat JSON");
    }
    bail!("chat mode requires either --chat-file or JSON input as argument")
}

fn write_tokens(out: &mut impl Write, tokens: &[TokenId], json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, tokens)?;
        writeln!(out)?;
    } else {
        let line = tokens
            .iter()
            .map(TokenId::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn write_text(out: &mut impl Write, text: &str, json: bool, newline: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, text)?;
        writeln!(out)?;
    } else if newline {
        writeln!(out, "{text}")?;
    } else {
        write!(out, "{text}")?;
    }
    Ok(())
}

fn run<S: InstanceSource>(cli: &Cli, tok: &Tokenizer<S>, load: Duration) -> Result<()> {
    if cli.benchmark {
        eprintln!("Load time: {load:?}");
    }
    let input = cli.input.join(" ");
    let mut out = io::stdout().lock();

    match cli.mode {
        Mode::Tokenize => {
            let start = Instant::now();
            let tokens = tok.tokenize(&input, cli.special).context("tokenizing")?;
            let first = start.elapsed();

            if cli.benchmark {
                eprintln!("Tokenize time (1st): {first:?}");
                // second call shows the warm path
                let start = Instant::now();
                tok.tokenize(&input, cli.special)
                    .context("tokenizing (2nd)")?;
                let second = start.elapsed();
                eprintln!("Tokenize time (2nd): {second:?}");
                eprintln!("Total time: {:?}", load + first + second);
            }

            write_tokens(&mut out, &tokens, cli.json)?;
        }

        Mode::Detokenize => {
            let start = Instant::now();
            let tokens = parse_tokens(&input)?;
            let parse = start.elapsed();

            let start = Instant::now();
            let text = tok
                .detokenize(&tokens, cli.special)
                .context("detokenizing")?;
            let op = start.elapsed();

            if cli.benchmark {
                eprintln!("Parse time: {parse:?}");
                eprintln!("Detokenize time: {op:?}");
                eprintln!("Total time: {:?}", load + parse + op);
            }

            write_text(&mut out, &text, cli.json, true)?;
        }

        Mode::Chat => {
            let request = read_chat_request(cli)?;

            let start = Instant::now();
            let text = tok
                .chat_template(&request)
                .context("applying chat template")?;
            let op = start.elapsed();

            if cli.benchmark {
                eprintln!("Chat template time: {op:?}");
                eprintln!("Total time: {:?}", load + op);
            }

            write_text(&mut out, &text, cli.json, false)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.mode != Mode::Chat && cli.input.is_empty() {
        bail!("input is required");
    }

    let wasm = tokhost_extism::locate_module(cli.wasm.as_deref())?;
    let start = Instant::now();

    if cli.pooled {
        let config = match cli.max_instances {
            Some(n) => PoolConfig::new().with_max_instances(n),
            None => PoolConfig::default(),
        };
        let tok = tokhost_extism::open_pooled(&wasm, config)
            .with_context(|| format!("creating tokenizer from {}", wasm.display()))?;
        let load = start.elapsed();
        let res = run(&cli, &tok, load);
        debug!(stats = ?tok.pool_stats(), "pool state at exit");
        tok.close();
        res
    } else {
        let tok = tokhost_extism::open(&wasm)
            .with_context(|| format!("creating tokenizer from {}", wasm.display()))?;
        let load = start.elapsed();
        let res = run(&cli, &tok, load);
        tok.close();
        res
    }
}
