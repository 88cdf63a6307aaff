//! lslib-export - LSLib metadata tool
//!
//! Imports and exports the LSLib metadata profile of Collada (.dae) and
//! glTF (.gltf/.glb) documents, and converts them to and from GR2.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lslib_profile::GameId;
use std::path::PathBuf;

use lslib_export::{DEFAULT_CONFIG, ToolConfig, pipeline};

#[derive(Parser)]
#[command(name = "lslib-export")]
#[command(about = "LSLib metadata tool for Collada and glTF model exports")]
#[command(version)]
struct Cli {
    /// Path to lslib.toml (defaults are used when it does not exist)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read document metadata into a scene file
    Import {
        /// Input document (.dae, .gltf, .glb, or .gr2)
        document: PathBuf,

        /// Scene JSON file (created from the document when missing)
        #[arg(short, long)]
        scene: PathBuf,

        /// Output scene file (overrides --scene)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write scene metadata into a document
    Export {
        /// Document to annotate (.dae, .gltf, or .glb)
        document: PathBuf,

        /// Scene JSON file
        #[arg(short, long)]
        scene: PathBuf,

        /// Output document, or a .gr2 file to convert to (default: in place)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target game (overrides the scene)
        #[arg(short, long)]
        game: Option<GameId>,
    },

    /// Print the metadata of a document as a scene
    Inspect {
        /// Input document (.dae, .gltf, .glb, or .gr2)
        document: PathBuf,
    },

    /// Convert between GR2 and Collada/glTF using Divine
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file
        output: PathBuf,

        /// Target game for GR2 output (e.g., dos2de, bg3)
        #[arg(short, long)]
        game: Option<GameId>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ToolConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Import {
            document,
            scene,
            output,
        } => {
            tracing::info!("Importing metadata {:?} -> {:?}", document, scene);
            let diags = pipeline::import(&document, &scene, output.as_deref(), &config)?;
            pipeline::summarize(&diags);
            tracing::info!("Done!");
        }

        Commands::Export {
            document,
            scene,
            output,
            game,
        } => {
            let target = output.clone().unwrap_or_else(|| document.clone());
            tracing::info!("Exporting metadata {:?} -> {:?}", scene, target);
            let diags = pipeline::export(&document, &scene, output.as_deref(), game, &config)?;
            pipeline::summarize(&diags);
            tracing::info!("Done!");
        }

        Commands::Inspect { document } => {
            let (scene, diags) = pipeline::inspect(&document, &config)?;
            pipeline::summarize(&diags);
            let json = scene.to_json().context("Failed to serialize scene")?;
            println!("{}", json);
        }

        Commands::Convert {
            input,
            output,
            game,
        } => {
            tracing::info!("Converting {:?} -> {:?}", input, output);
            pipeline::convert(&input, &output, game, &config)?;
            tracing::info!("Done!");
        }
    }

    Ok(())
}
