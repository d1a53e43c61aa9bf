// FICHIER : migra/tools/migra-cli/src/commands/migrate.rs

use super::Context;
use anyhow::{anyhow, Result};
use migra::json_db::migrations::{inverse, loader, Direction, MigrationState};
use migra::{user_info, user_success};
use tracing::info;

pub async fn up(ctx: &Context) -> Result<()> {
    let records = loader::load_dir(&ctx.migrations_dir).await?;
    let migrator = ctx.open_migrator().await?;

    let done = migrator.run(&records, Direction::Up).await?;
    if done.is_empty() {
        user_info!("MIGRATE_UP_NOOP", "Aucune migration en attente");
    }
    for id in &done {
        user_success!("MIGRATE_APPLIED", "{}", id);
    }
    Ok(())
}

pub async fn down(ctx: &Context, count: usize, all: bool) -> Result<()> {
    let records = loader::load_dir(&ctx.migrations_dir).await?;
    let migrator = ctx.open_migrator().await?;

    let done = if all {
        migrator.run(&records, Direction::Down).await?
    } else {
        migrator.rollback(&records, count).await?
    };
    if done.is_empty() {
        user_info!("MIGRATE_DOWN_NOOP", "Aucune migration à annuler");
    }
    for id in &done {
        user_success!("MIGRATE_REVERTED", "{}", id);
    }
    Ok(())
}

pub async fn status(ctx: &Context, as_json: bool) -> Result<()> {
    let records = loader::load_dir(&ctx.migrations_dir).await?;
    let migrator = ctx.open_migrator().await?;
    let report = migrator.status(&records).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (id, state) in &report.entries {
        match state {
            MigrationState::Pending => println!("  [ ] {}", id),
            MigrationState::Applied { applied_at } => println!("  [x] {}  ({})", id, applied_at),
            MigrationState::Modified { applied_at } => {
                println!("  [!] {}  ({}, modifiée depuis)", id, applied_at)
            }
        }
    }
    for id in &report.orphans {
        println!("  [?] {}  (fichier absent)", id);
    }
    Ok(())
}

/// Vérification statique puis aller-retour de chaque migration, ses
/// prédécesseurs rejoués.
pub async fn verify(ctx: &Context) -> Result<()> {
    let records = loader::load_dir(&ctx.migrations_dir).await?;
    let migrator = ctx.open_migrator().await?;
    let roundtrips = inverse::check_sequence(&migrator, &records).await?;

    let mut anomalies = 0;
    for (record, (_, found)) in records.iter().zip(roundtrips) {
        let mut issues = inverse::check_structural(record);
        issues.extend(found);

        if issues.is_empty() {
            user_success!("VERIFY_OK", "{}", record.id);
        } else {
            for issue in &issues {
                println!("  ⚠️  {} : {}", record.id, issue);
            }
            anomalies += issues.len();
        }
    }

    info!(records = records.len(), anomalies, "Vérification terminée");
    if anomalies > 0 {
        return Err(anyhow!("{} anomalie(s) détectée(s)", anomalies));
    }
    Ok(())
}

pub async fn history_sync(ctx: &Context) -> Result<()> {
    let records = loader::load_dir(&ctx.migrations_dir).await?;
    let migrator = ctx.open_migrator().await?;

    let removed = migrator.history_sync(&records).await?;
    if removed.is_empty() {
        user_info!("HISTORY_SYNC_NOOP", "Registre déjà synchronisé");
    }
    for id in &removed {
        user_success!("HISTORY_SYNC_REMOVED", "{}", id);
    }
    Ok(())
}

pub async fn create(ctx: &Context, name: &str) -> Result<()> {
    let path = loader::create_file(&ctx.migrations_dir, name).await?;
    user_success!("MIGRATION_CREATED", "{}", path.display());
    Ok(())
}
