use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mailverify_lib::VerifyOptions;

#[derive(Parser)]
#[command(name = "mailverify-cli", version, about = "Vérifie format, MX et poignée de main SMTP")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human", global = true)]
    pub format: String,

    /// write report to file (écriture atomique)
    #[arg(long, global = true)]
    pub out: Option<String>,

    /// fichier JSON d'options (les flags explicites priment)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// port SMTP sondé
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// timeout connexion + accueil SMTP (ms)
    #[arg(long = "timeout-ms", global = true)]
    pub timeout_ms: Option<u64>,

    /// timeout de la requête MX (ms)
    #[arg(long = "resolve-timeout-ms", global = true)]
    pub resolve_timeout_ms: Option<u64>,

    /// lignes par lot (rapport de progression)
    #[arg(long = "chunk-size", global = true)]
    pub chunk_size: Option<usize>,

    /// vérifications simultanées max
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// colonne contenant l'adresse
    #[arg(long, global = true)]
    pub field: Option<String>,

    /// logs en debug
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// vérifie une seule adresse
    Verify { email: String },
    /// vérifie une liste (une adresse par ligne, ou CSV)
    Batch {
        /// lit les adresses depuis stdin
        #[arg(long)]
        stdin: bool,
        /// lit les adresses depuis un fichier
        #[arg(long)]
        input: Option<PathBuf>,
        /// l'entrée est un CSV avec en-tête (colonne contenant "email")
        #[cfg(feature = "with-csv")]
        #[arg(long)]
        csv: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Options from `--config` (or defaults), then overridden by flags.
    pub fn verify_options(&self) -> Result<VerifyOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parse config {}", path.display()))?
            }
            None => VerifyOptions::default(),
        };
        self.apply_overrides(&mut options);
        Ok(options)
    }

    fn apply_overrides(&self, options: &mut VerifyOptions) {
        if let Some(port) = self.port {
            options.probe.port = port;
        }
        if let Some(ms) = self.timeout_ms {
            options.probe.connect_timeout_ms = ms;
            options.probe.greeting_timeout_ms = ms;
        }
        if let Some(ms) = self.resolve_timeout_ms {
            options.resolve_timeout_ms = ms;
        }
        if let Some(size) = self.chunk_size {
            options.batch.chunk_size = size;
        }
        if let Some(limit) = self.concurrency {
            options.batch.concurrency = limit;
        }
        if let Some(field) = &self.field {
            options.batch.address_field = field.clone();
        }
    }
}
