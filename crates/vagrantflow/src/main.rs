mod commands;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vagrantflow_core::CancellationToken;

#[derive(Parser)]
#[command(name = "vflow")]
#[command(version)]
#[command(about = "書けば、立ち上がる。Vagrant環境をKDLで宣言する。", long_about = None)]
struct Cli {
    /// 設定ファイルのパス（省略時は vagrantflow.kdl を自動検出）
    #[arg(short, long, global = true, env = "VFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// vagrant 実行ファイル
    #[arg(
        long,
        global = true,
        env = "VFLOW_VAGRANT_BIN",
        default_value = vagrantflow_vagrant::VAGRANT_BIN
    )]
    vagrant_bin: PathBuf,

    /// 詳細なログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 設定を検証
    Validate,
    /// vm リソースの属性一覧を表示
    Schema,
    /// 実行計画を表示（変更は行わない）
    Plan,
    /// 実行計画を適用
    Apply,
    /// 保存済みの状態を vagrant から読み直す
    Refresh,
    /// 保存済みの状態を表示
    Show {
        /// リソース名（省略時は全リソース）
        resource: Option<String>,
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// リソースを削除（vagrant destroy）
    Destroy {
        /// リソース名（省略時は管理中の全リソース）
        resource: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // 設定ファイル不要のコマンド
    match &cli.command {
        Commands::Schema => {
            commands::schema::handle();
            return Ok(());
        }
        Commands::Validate => return commands::validate::handle(cli.config, &cli.vagrant_bin),
        _ => {}
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let ctx = utils::load_context(cli.config, &cli.vagrant_bin)?;

    match cli.command {
        Commands::Plan => commands::plan::handle(&ctx, &cancel).await,
        Commands::Apply => commands::apply::handle(&ctx, &cancel).await,
        Commands::Refresh => commands::refresh::handle(&ctx, &cancel).await,
        Commands::Show { resource, json } => {
            commands::show::handle(&ctx, resource.as_deref(), json).await
        }
        Commands::Destroy { resource } => {
            commands::destroy::handle(&ctx, resource.as_deref(), &cancel).await
        }
        Commands::Schema | Commands::Validate => Ok(()),
    }
}

/// ログはstderrへ。`-v` でdebug、それ以外は RUST_LOG（既定 warn）
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Ctrl-C で実行中の vagrant を止める
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            eprintln!("{}", "中断しています... vagrant を停止します".yellow());
            cancel.cancel();
        }
    });
}
