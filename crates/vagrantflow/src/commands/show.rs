use crate::utils::Context;
use colored::Colorize;
use vagrantflow_core::ResourceState;

pub async fn handle(ctx: &Context, resource: Option<&str>, json: bool) -> anyhow::Result<()> {
    let state = ctx.state.load().await?;

    let resources: Vec<(&String, &ResourceState)> = state
        .resources
        .iter()
        .filter(|(key, _)| resource.is_none_or(|r| r == key.as_str()))
        .collect();

    if let Some(name) = resource
        && resources.is_empty()
    {
        anyhow::bail!("リソース '{}' は状態に存在しません", name);
    }

    if json {
        let map: std::collections::BTreeMap<_, _> = resources.into_iter().collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if resources.is_empty() {
        println!("{}", "管理中のリソースはありません".dimmed());
        return Ok(());
    }

    for (key, stored) in resources {
        print_resource(key, stored);
    }

    Ok(())
}

fn print_resource(key: &str, stored: &ResourceState) {
    let snapshot = &stored.snapshot;

    println!("{} {}", "■".cyan(), key.bold());
    println!("  id:              {}", snapshot.id);
    println!("  name:            {}", stored.config.name);
    println!(
        "  vagrantfile_dir: {}",
        stored.config.vagrantfile_dir.display()
    );
    println!(
        "  updated_at:      {}",
        stored.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    for name in &snapshot.machine_names {
        let Some((ssh, ports)) = snapshot.machine(name) else {
            continue;
        };
        println!(
            "  • {} {}@{}:{}",
            name.cyan(),
            ssh.user,
            ssh.host,
            ssh.port
        );
        for port in ports {
            println!("      {} -> {}", port.guest, port.host);
        }
    }

    if let Some(info) = &snapshot.connection_info {
        println!(
            "  connection:      {}://{}@{}:{}",
            info.connection_type, info.user, info.host, info.port
        );
    }
    println!();
}
