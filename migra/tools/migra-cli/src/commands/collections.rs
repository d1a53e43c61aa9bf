// FICHIER : migra/tools/migra-cli/src/commands/collections.rs

use super::Context;
use anyhow::Result;
use migra::json_db::collections::RuleKind;
use migra::user_info;

pub async fn list(ctx: &Context) -> Result<()> {
    let migrator = ctx.open_migrator().await?;
    let tx = migrator.tx_manager().begin();
    let collections = migrator.collections().list_collections(&tx).await?;

    if collections.is_empty() {
        user_info!("COLLECTIONS_EMPTY", "Aucune collection");
        return Ok(());
    }
    for col in &collections {
        let rules = RuleKind::ALL
            .iter()
            .filter(|k| col.rule(**k).is_some())
            .count();
        println!(
            "  {:<20} {}  {:<5} {} champ(s), {} règle(s)",
            col.name,
            col.id,
            format!("{:?}", col.kind).to_lowercase(),
            col.schema.len(),
            rules
        );
    }
    Ok(())
}

pub async fn show(ctx: &Context, key: &str) -> Result<()> {
    let migrator = ctx.open_migrator().await?;
    let tx = migrator.tx_manager().begin();
    let col = migrator
        .collections()
        .find_collection_by_name_or_id(&tx, key)
        .await?;
    println!("{}", serde_json::to_string_pretty(&col)?);
    Ok(())
}
