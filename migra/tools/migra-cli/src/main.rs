// FICHIER : migra/tools/migra-cli/src/main.rs

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;

// Module local des commandes
mod commands;

use migra::{
    user_error,
    utils::{init_logging, prelude::*},
};

#[derive(Parser)]
#[command(name = "migra-cli")]
#[command(about = "Applique et inspecte les migrations de schémas de collections", long_about = None)]
#[command(version)]
struct Cli {
    /// Fichier de configuration JSON (défaut : ./migra.json s'il existe)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Racine du magasin de schémas
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Dossier des fichiers de migration
    #[arg(long, global = true)]
    migrations: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Applique les migrations en attente
    Up,

    /// Annule les dernières migrations appliquées
    Down {
        /// Nombre de migrations à annuler
        #[arg(long, short = 'n', default_value_t = 1)]
        count: usize,

        /// Annule toutes les migrations connues
        #[arg(long, conflicts_with = "count")]
        all: bool,
    },

    /// État de chaque migration (appliquée, en attente, modifiée)
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Vérifie que chaque `down` défait son `up`
    Verify,

    /// Retire du registre les migrations dont le fichier a disparu
    HistorySync,

    /// Crée un fichier de migration vide
    Create { name: String },

    /// Liste les collections du magasin
    Collections,

    /// Affiche le descripteur d'une collection (id ou nom)
    Show { key: String },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();

    // 1. Configuration (CRITIQUE)
    if let Err(e) = AppConfig::init(cli.config.as_deref()) {
        eprintln!("❌ CRITICAL ERROR: Impossible d'initialiser la configuration.");
        eprintln!("   Détails : {}", e);
        std::process::exit(1);
    }

    // 2. Logger
    init_logging(AppConfig::get());

    let ctx = commands::Context::resolve(AppConfig::get(), cli.root, cli.migrations);
    debug!(root = ?ctx.data_root, migrations = ?ctx.migrations_dir, "Contexte résolu");

    if let Err(e) = execute_command(cli.command, &ctx).await {
        user_error!("CMD_FAIL", "{:#}", e);
        std::process::exit(1);
    }
}

async fn execute_command(cmd: Commands, ctx: &commands::Context) -> anyhow::Result<()> {
    match cmd {
        Commands::Up => commands::migrate::up(ctx).await,
        Commands::Down { count, all } => commands::migrate::down(ctx, count, all).await,
        Commands::Status { json } => commands::migrate::status(ctx, json).await,
        Commands::Verify => commands::migrate::verify(ctx).await,
        Commands::HistorySync => commands::migrate::history_sync(ctx).await,
        Commands::Create { name } => commands::migrate::create(ctx, &name).await,
        Commands::Collections => commands::collections::list(ctx).await,
        Commands::Show { key } => commands::collections::show(ctx, &key).await,
    }
}
