use anyhow::Context as _;
use colored::Colorize;
use std::path::{Path, PathBuf};
use vagrantflow_core::{
    ActionType, CancellationToken, Engine, GlobalState, Project, ReadOutcome, StateManager,
};
use vagrantflow_vagrant::Vagrant;

/// Everything a command needs once the configuration is loaded
pub struct Context {
    pub config_file: PathBuf,
    pub project: Project,
    pub engine: Engine<Vagrant>,
    pub state: StateManager,
}

/// 設定ファイルを検出してロードする
pub fn load_context(config: Option<PathBuf>, vagrant_bin: &Path) -> anyhow::Result<Context> {
    let cwd = std::env::current_dir()?;
    let config_file = vagrantflow_core::find_config_file(&cwd, config)?;
    let project = vagrantflow_core::parse_kdl_file(&config_file)
        .with_context(|| format!("{} の読み込みに失敗しました", config_file.display()))?;
    let root = vagrantflow_core::project_root(&config_file);

    tracing::debug!(
        "Loaded {} resources from {}",
        project.resources.len(),
        config_file.display()
    );

    Ok(Context {
        config_file,
        project,
        engine: Engine::new(Vagrant::with_binary(vagrant_bin)),
        state: StateManager::new(root),
    })
}

/// 読み込んだ設定ファイルを表示
pub fn print_loaded_config_file(path: &Path) {
    println!("📄 設定ファイル: {}", path.display().to_string().cyan());
}

/// 保存済みの各リソースを読み直し、消えたものを状態から外す
pub async fn refresh_state(
    ctx: &Context,
    state: &mut GlobalState,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let keys: Vec<String> = state.resources.keys().cloned().collect();

    for key in keys {
        let Some(stored) = state.get_resource(&key).cloned() else {
            continue;
        };
        let outcome = ctx
            .engine
            .read(&stored.config, stored.id(), cancel)
            .await
            .with_context(|| format!("{} の状態取得に失敗しました", key))?;

        match outcome {
            ReadOutcome::Present(snapshot) => {
                let config = stored.config.clone();
                state.set_resource(key, stored.refreshed(config, snapshot));
            }
            ReadOutcome::Gone => {
                state.remove_resource(&key);
                println!(
                    "  {} {} は稼働していないため状態から外しました",
                    "!".yellow(),
                    key.cyan()
                );
            }
        }
    }

    Ok(())
}

/// Plan symbol in the terraform manner
pub fn action_symbol(action_type: ActionType) -> colored::ColoredString {
    match action_type {
        ActionType::Create => "+".green(),
        ActionType::Update => "~".yellow(),
        ActionType::Replace => "-/+".yellow(),
        ActionType::Delete => "-".red(),
        ActionType::NoOp => "=".dimmed(),
    }
}
