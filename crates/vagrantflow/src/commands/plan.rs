use crate::utils::{self, Context};
use colored::Colorize;
use vagrantflow_core::{CancellationToken, Plan};

pub async fn handle(ctx: &Context, cancel: &CancellationToken) -> anyhow::Result<()> {
    utils::print_loaded_config_file(&ctx.config_file);

    let lock = ctx.state.acquire_lock().await?;
    let mut state = ctx.state.load().await?;

    println!("{}", "状態を更新中...".blue());
    utils::refresh_state(ctx, &mut state, cancel).await?;
    lock.release().await?;

    let plan = vagrantflow_core::plan(&ctx.project, &state);
    print_plan(&plan);

    Ok(())
}

/// 実行計画を表示
pub fn print_plan(plan: &Plan) {
    println!();
    if !plan.has_changes() {
        println!("{}", "✓ 変更はありません".green());
    } else {
        println!("{}", "実行計画:".bold());
        for action in &plan.actions {
            println!(
                "  {} {}",
                utils::action_symbol(action.action_type),
                action.description
            );
        }
    }
    println!();
    println!("Plan: {}", plan.summary());
}
