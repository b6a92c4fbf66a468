mod display;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use lexblocks_assembly::resolver::clamp_depth;
use lexblocks_assembly::{Assembler, DEFAULT_DEPTH, RelationshipResolver, RuleEngine};
use lexblocks_core::{ActionState, Context, Value, rules};
use lexblocks_store::MemoryStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "lexblocks",
    version,
    about = "Assemble legal documents from reusable text blocks",
    arg_required_else_help = true
)]
struct Cli {
    /// JSON catalog with blocks, rules and templates.
    #[arg(long, global = true, env = "LEXBLOCKS_CATALOG", value_name = "PATH")]
    catalog: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = Format::Card)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Card,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble a document from a template and context variables.
    Assemble {
        template_id: String,
        /// Document title (default: "Document from <template name>").
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        vars: ContextArgs,
    },

    /// Blocks related to a block through the relationship graph.
    Related {
        block_id: String,
        /// Hops to follow, 1 to 5.
        #[arg(long, default_value_t = DEFAULT_DEPTH)]
        depth: u32,
    },

    /// Evaluate every rule against context variables.
    Evaluate {
        #[command(flatten)]
        vars: ContextArgs,
    },

    /// List catalog blocks in citation order.
    Blocks,

    /// Split statute text into paragraph and Absatz blocks.
    ///
    /// Without `--catalog` the blocks go into an empty store.
    ImportText {
        file: PathBuf,
        /// Law name, e.g. "SGB IX". Detected from the text when omitted.
        #[arg(long)]
        law: Option<String>,
        /// Write the resulting catalog (existing catalog plus new blocks) here.
        #[arg(long, short, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default)]
struct ContextArgs {
    /// Context variable, e.g. `--set disability_degree=60`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, Value)>,

    /// Context as a JSON object. `--set` entries override its keys.
    #[arg(long, value_name = "JSON")]
    context: Option<String>,
}

impl ContextArgs {
    fn into_context(self) -> anyhow::Result<Context> {
        let mut context: Context = match self.context {
            Some(raw) => serde_json::from_str(&raw).context("--context must be a JSON object")?,
            None => Context::new(),
        };
        context.extend(self.set);
        Ok(context)
    }
}

/// Parse `key=value`; the value goes through [`Value::parse_literal`].
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.to_string(), Value::parse_literal(value.trim())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = Arc::new(match &cli.catalog {
        Some(path) => MemoryStore::from_catalog_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None if matches!(cli.command, Command::ImportText { .. }) => MemoryStore::new(),
        None => anyhow::bail!("no catalog given: pass --catalog or set LEXBLOCKS_CATALOG"),
    });
    tracing::debug!("lexblocks v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Assemble {
            template_id,
            title,
            vars,
        } => {
            let context = vars.into_context()?;
            let result = Assembler::from_store(store)
                .assemble(&template_id, context, title)
                .await
                .with_context(|| format!("assembling {template_id}"))?;
            match cli.format {
                Format::Card => print!("{}", display::document_card(&result)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            }
        }
        Command::Related { block_id, depth } => {
            let depth = clamp_depth(depth);
            match cli.format {
                Format::Card => {
                    let distances = store.hop_distances(&block_id, depth)?;
                    print!("{}", display::related_card(&block_id, depth, &distances));
                }
                Format::Json => {
                    let related = RelationshipResolver::new(store)
                        .find_related(&block_id, depth)
                        .await?;
                    let out = serde_json::json!({
                        "block_id": block_id,
                        "depth": depth,
                        "related": related,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
            }
        }
        Command::Evaluate { vars } => {
            let context = vars.into_context()?;
            let engine = RuleEngine::new(store);
            let evaluations = engine.evaluate_all_rules(&context).await?;
            let state = engine.apply_actions(
                &rules::matched_actions(&evaluations),
                &ActionState::from_context(&context),
            );
            match cli.format {
                Format::Card => print!("{}", display::evaluation_card(&evaluations, &state)),
                Format::Json => {
                    let out = serde_json::json!({
                        "evaluations": evaluations,
                        "state": state,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
            }
        }
        Command::Blocks => {
            let blocks = store.list_blocks()?;
            match cli.format {
                Format::Card => print!("{}", display::block_table(&blocks)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&blocks)?),
            }
        }
        Command::ImportText { file, law, output } => {
            let blocks = lexblocks_store::parse_file(&file, law.as_deref())
                .with_context(|| format!("reading statute text {}", file.display()))?;
            let parsed = blocks.clone();
            let summary = store.ingest_blocks(blocks)?;
            if let Some(output) = output {
                store
                    .export()?
                    .write(&output)
                    .with_context(|| format!("writing catalog {}", output.display()))?;
                tracing::info!(path = %output.display(), "catalog written");
            }
            match cli.format {
                Format::Card => {
                    print!("{}", display::block_table(&parsed));
                    println!("{} blocks imported, {} skipped", summary.blocks, summary.skipped);
                }
                Format::Json => println!("{}", serde_json::to_string_pretty(&parsed)?),
            }
        }
    }

    Ok(())
}
