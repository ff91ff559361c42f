use crate::utils::Context;
use colored::Colorize;
use vagrantflow_core::{CancellationToken, VagrantConfig};

pub async fn handle(
    ctx: &Context,
    resource: Option<&str>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let lock = ctx.state.acquire_lock().await?;
    let mut state = ctx.state.load().await?;

    // stored config first, declared config for resources never applied
    let targets: Vec<(String, VagrantConfig)> = match resource {
        Some(key) => {
            let config = state
                .get_resource(key)
                .map(|stored| stored.config.clone())
                .or_else(|| ctx.project.get(key).cloned())
                .ok_or_else(|| anyhow::anyhow!("リソース '{}' が見つかりません", key))?;
            vec![(key.to_string(), config)]
        }
        None => state
            .resources
            .iter()
            .map(|(key, stored)| (key.clone(), stored.config.clone()))
            .collect(),
    };

    if targets.is_empty() {
        println!("{}", "削除対象のリソースはありません".dimmed());
        lock.release().await?;
        return Ok(());
    }

    let mut failed = 0;
    for (key, config) in &targets {
        println!("{}", format!("■ {} を削除中...", key).yellow().bold());
        match ctx.engine.delete(config, cancel).await {
            Ok(()) => {
                state.remove_resource(key);
                ctx.state.save(&mut state).await?;
                println!("  {} 削除完了", "✓".green());
            }
            Err(e) => {
                println!("  {} {}", "✗".red(), e);
                failed += 1;
                if cancel.is_cancelled() {
                    break;
                }
            }
        }
    }

    lock.release().await?;

    println!();
    if failed > 0 {
        anyhow::bail!("{}個のリソースの削除に失敗しました", failed);
    }
    println!("{}", "✓ すべてのリソースを削除しました！".green().bold());
    Ok(())
}
