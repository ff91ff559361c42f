use crate::utils;
use colored::Colorize;
use std::path::PathBuf;

pub fn handle(config: Option<PathBuf>, vagrant_bin: &std::path::Path) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());

    let ctx = match utils::load_context(config, vagrant_bin) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {:#}", e);
            std::process::exit(1);
        }
    };
    utils::print_loaded_config_file(&ctx.config_file);

    let mut errors = 0;
    println!();
    println!("リソース: {}個", ctx.project.resources.len());
    for (key, vm) in &ctx.project.resources {
        println!(
            "  - {} (name: {}, dir: {})",
            key.cyan(),
            vm.name,
            vm.vagrantfile_dir.display()
        );
        if let Err(e) = vm.validate() {
            println!("    {} {}", "✗".red(), e);
            errors += 1;
        }
    }

    println!();
    if errors > 0 {
        eprintln!(
            "{}",
            format!("✗ {}個のリソースに問題があります", errors)
                .red()
                .bold()
        );
        std::process::exit(1);
    }

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    Ok(())
}
