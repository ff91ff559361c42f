use crate::utils::{self, Context};
use colored::Colorize;
use vagrantflow_core::CancellationToken;

pub async fn handle(ctx: &Context, cancel: &CancellationToken) -> anyhow::Result<()> {
    utils::print_loaded_config_file(&ctx.config_file);

    let lock = ctx.state.acquire_lock().await?;
    let mut state = ctx.state.load().await?;

    println!("{}", "状態を更新中...".blue());
    utils::refresh_state(ctx, &mut state, cancel).await?;
    ctx.state.save(&mut state).await?;
    lock.release().await?;

    println!();
    println!(
        "{}",
        format!("✓ {}個のリソースを更新しました", state.resources.len())
            .green()
            .bold()
    );
    for (key, resource) in &state.resources {
        println!("  • {} ({})", key.cyan(), resource.id());
    }

    Ok(())
}
