use crate::commands::plan::print_plan;
use crate::utils::{self, Context};
use colored::Colorize;
use std::time::Instant;
use vagrantflow_core::{
    Action, ActionType, ApplyResult, CancellationToken, GlobalState, ResourceSnapshot,
    ResourceState, VagrantConfig, VagrantError,
};

pub async fn handle(ctx: &Context, cancel: &CancellationToken) -> anyhow::Result<()> {
    utils::print_loaded_config_file(&ctx.config_file);

    let lock = ctx.state.acquire_lock().await?;
    let mut state = ctx.state.load().await?;

    println!("{}", "状態を更新中...".blue());
    utils::refresh_state(ctx, &mut state, cancel).await?;
    ctx.state.save(&mut state).await?;

    let plan = vagrantflow_core::plan(&ctx.project, &state);
    print_plan(&plan);

    if !plan.has_changes() {
        lock.release().await?;
        return Ok(());
    }

    let started = Instant::now();
    let mut result = ApplyResult::new();

    for action in plan.changes() {
        if cancel.is_cancelled() {
            result.record(action, Err("中断されました".to_string()));
            continue;
        }

        println!();
        println!(
            "{}",
            format!("■ {} ({})", action.resource, action.action_type)
                .yellow()
                .bold()
        );

        match execute(ctx, &mut state, action, cancel).await {
            Ok(message) => {
                println!("  {} {}", "✓".green(), message);
                result.record(action, Ok(message));
            }
            Err(e) => {
                println!("  {} {}", "✗".red(), e);
                result.record(action, Err(e.to_string()));
            }
        }

        // saved per resource
        ctx.state.save(&mut state).await?;
    }

    result.duration_ms = started.elapsed().as_millis() as u64;
    lock.release().await?;

    print_result(&result);
    if !result.is_success() {
        anyhow::bail!("{}個のリソースの適用に失敗しました", result.failed().count());
    }
    Ok(())
}

/// 1リソース分のアクションを実行し、状態に反映する
async fn execute(
    ctx: &Context,
    state: &mut GlobalState,
    action: &Action,
    cancel: &CancellationToken,
) -> vagrantflow_core::Result<String> {
    let key = action.resource.as_str();
    let engine = &ctx.engine;

    match action.action_type {
        ActionType::Create => {
            let config = declared(ctx, key)?;
            let id = create(ctx, state, key, config, cancel).await?;
            Ok(format!("作成しました ({})", id))
        }
        ActionType::Update => {
            let config = declared(ctx, key)?;
            let Some(stored) = state.get_resource(key).cloned() else {
                return Err(missing(key));
            };
            let snapshot = engine.update(config, stored.id(), cancel).await?;
            state.set_resource(key, stored.refreshed(config.clone(), snapshot));
            Ok("リロードしました".to_string())
        }
        ActionType::Replace => {
            let config = declared(ctx, key)?;
            let Some(stored) = state.get_resource(key).cloned() else {
                return Err(missing(key));
            };
            engine.delete(&stored.config, cancel).await?;
            state.remove_resource(key);

            let id = create(ctx, state, key, config, cancel).await?;
            Ok(format!("再作成しました ({})", id))
        }
        ActionType::Delete => {
            let Some(stored) = state.get_resource(key).cloned() else {
                return Err(missing(key));
            };
            engine.delete(&stored.config, cancel).await?;
            state.remove_resource(key);
            Ok("削除しました".to_string())
        }
        ActionType::NoOp => Ok("変更なし".to_string()),
    }
}

/// 作成して状態に記録する。起動後の読み取りに失敗した場合も id だけは残す
async fn create(
    ctx: &Context,
    state: &mut GlobalState,
    key: &str,
    config: &VagrantConfig,
    cancel: &CancellationToken,
) -> vagrantflow_core::Result<String> {
    match ctx.engine.create(config, cancel).await {
        Ok(snapshot) => {
            let id = snapshot.id.clone();
            state.set_resource(key, ResourceState::new(config.clone(), snapshot));
            Ok(id)
        }
        Err(e) => {
            if let Some(id) = e.created_id() {
                let snapshot = ResourceSnapshot {
                    id: id.to_string(),
                    ..Default::default()
                };
                state.set_resource(key, ResourceState::new(config.clone(), snapshot));
            }
            Err(e)
        }
    }
}

fn declared<'a>(ctx: &'a Context, key: &str) -> vagrantflow_core::Result<&'a VagrantConfig> {
    ctx.project.get(key).ok_or_else(|| missing(key))
}

fn missing(key: &str) -> VagrantError {
    VagrantError::StateError(format!("resource '{}' disappeared during apply", key))
}

fn print_result(result: &ApplyResult) {
    println!();
    if result.is_success() {
        println!(
            "{}",
            format!(
                "✓ 適用完了: {}個成功 ({}ms)",
                result.succeeded().count(),
                result.duration_ms
            )
            .green()
            .bold()
        );
    } else {
        eprintln!(
            "{}",
            format!(
                "✗ 適用失敗: {}個成功, {}個失敗",
                result.succeeded().count(),
                result.failed().count()
            )
            .red()
            .bold()
        );
        for failure in result.failed() {
            if let Err(error) = &failure.result {
                eprintln!("  • {} ({}): {}", failure.resource.cyan(), failure.action_type, error);
            }
        }
    }
}
