use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokenfit_common::{logger, AppConfig};
use tokenfit_segment::{
    trim, Budget, CharTokenizer, ConversationMessage, HeuristicTokenizer, Segmenter, Tokenizer,
    TrimConfig, WordTokenizer,
};

/// Separator printed between plain-text segments
const SEGMENT_SEPARATOR: &str = "\n---\n";

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        // Fallback to default dotenv behavior
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "tokenfit")]
#[command(about = "tokenfit - token-budgeted text chunking and conversation trimming", long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split text into token-bounded chunks, optionally windowed
    Split {
        /// Input text file (stdin when omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Token ceiling per chunk
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Chunks per window
        #[arg(long)]
        window_size: Option<usize>,

        /// Chunks between window starts
        #[arg(long)]
        stride: Option<usize>,

        #[arg(long, value_enum, default_value_t = TokenizerKind::Heuristic)]
        tokenizer: TokenizerKind,

        /// Print a JSON array instead of separated text
        #[arg(long)]
        json: bool,
    },

    /// Trim a JSON conversation to its most recent turns
    Trim {
        /// JSON array of {"role", "content"} messages (stdin when omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Messages to keep, prefix excluded
        #[arg(long)]
        max_steps: Option<usize>,

        /// Token budget, prefix included
        #[arg(long)]
        max_tokens: Option<usize>,

        /// System message always kept first
        #[arg(long)]
        prefix: Option<String>,

        #[arg(long, value_enum, default_value_t = TokenizerKind::Heuristic)]
        tokenizer: TokenizerKind,
    },
}

/// Token counting scheme selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TokenizerKind {
    /// Characters per token from configuration
    Heuristic,
    /// One token per character
    Chars,
    /// One token per whitespace-separated word
    Words,
}

enum CliTokenizer {
    Heuristic(HeuristicTokenizer),
    Chars(CharTokenizer),
    Words(WordTokenizer),
}

impl CliTokenizer {
    fn new(kind: TokenizerKind, config: &AppConfig) -> Self {
        match kind {
            TokenizerKind::Heuristic => Self::Heuristic(HeuristicTokenizer::from_config(config)),
            TokenizerKind::Chars => Self::Chars(CharTokenizer),
            TokenizerKind::Words => Self::Words(WordTokenizer),
        }
    }
}

impl Tokenizer for CliTokenizer {
    fn count(&self, text: &str) -> tokenfit_common::Result<usize> {
        match self {
            Self::Heuristic(tok) => tok.count(text),
            Self::Chars(tok) => tok.count(text),
            Self::Words(tok) => tok.count(text),
        }
    }

    fn count_message(&self, message: &ConversationMessage) -> tokenfit_common::Result<usize> {
        match self {
            Self::Heuristic(tok) => tok.count_message(message),
            Self::Chars(tok) => tok.count_message(message),
            Self::Words(tok) => tok.count_message(message),
        }
    }
}

/// Read a file, or stdin when no path is given
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn render_segments(segments: &[String], json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(segments)?);
    }
    Ok(segments.join(SEGMENT_SEPARATOR))
}

fn run_split(
    config: &AppConfig,
    input: Option<&Path>,
    budget: Budget,
    tokenizer: TokenizerKind,
    json: bool,
) -> Result<()> {
    let text = read_input(input)?;
    let segmenter = Segmenter::new(budget, CliTokenizer::new(tokenizer, config));
    let segments = segmenter.windows(&text)?;

    println!("{}", render_segments(&segments, json)?);
    Ok(())
}

fn run_trim(
    config: &AppConfig,
    input: Option<&Path>,
    trim_config: TrimConfig,
    tokenizer: TokenizerKind,
) -> Result<()> {
    let raw = read_input(input)?;
    let history: Vec<ConversationMessage> =
        serde_json::from_str(&raw).context("Conversation must be a JSON array of messages")?;

    let outcome = trim(&history, &trim_config, &CliTokenizer::new(tokenizer, config))?;
    tracing::info!(
        "Kept {} messages ({} dropped, {} tokens)",
        outcome.messages.len(),
        outcome.dropped,
        outcome.total_tokens
    );

    println!("{}", serde_json::to_string_pretty(&outcome.messages)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env at project root
    // Note: AppConfig::load() also loads .env from the working directory
    load_dotenv_from_project_root();

    let config = AppConfig::load(cli.config.as_deref())?;

    // Setup logging
    match &cli.log_dir {
        Some(dir) => logger::setup_logging(dir, &config.log_level)?,
        None => logger::setup_console_logging(&config.log_level)?,
    }

    // Handle commands
    match cli.command {
        Commands::Split {
            input,
            chunk_size,
            window_size,
            stride,
            tokenizer,
            json,
        } => {
            // Override with CLI arguments
            let budget = Budget::new(
                chunk_size.unwrap_or(config.chunk_size),
                window_size.unwrap_or(config.window_size),
                stride.unwrap_or(config.stride),
            )?;
            run_split(&config, input.as_deref(), budget, tokenizer, json)?;
        }
        Commands::Trim {
            input,
            max_steps,
            max_tokens,
            prefix,
            tokenizer,
        } => {
            let mut trim_config = TrimConfig::new(
                max_steps.unwrap_or(config.max_steps),
                max_tokens.unwrap_or(config.max_tokens),
            )?;
            if let Some(prefix) = prefix {
                trim_config = trim_config.with_prefix(ConversationMessage::system(prefix));
            }
            run_trim(&config, input.as_deref(), trim_config, tokenizer)?;
        }
    }

    Ok(())
}
