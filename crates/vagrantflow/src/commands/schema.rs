use colored::Colorize;
use vagrantflow_core::schema::{RESOURCE_ATTRIBUTES, describe};

pub fn handle() {
    println!("{}", "vm リソースの属性:".bold());
    println!();

    for attribute in RESOURCE_ATTRIBUTES {
        let mut flags = Vec::new();
        if attribute.computed {
            flags.push("computed");
        }
        if attribute.force_new {
            flags.push("force new");
        }

        if flags.is_empty() {
            println!("  {}", attribute.name.cyan());
        } else {
            println!(
                "  {} {}",
                attribute.name.cyan(),
                format!("({})", flags.join(", ")).dimmed()
            );
        }
        println!("      {}", describe(attribute));
    }
}
