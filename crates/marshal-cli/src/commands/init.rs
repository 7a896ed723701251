//! Initialize marshal in a contracts project

use std::path::Path;

use clap::Args;
use color_eyre::eyre::{eyre, Result};
use console::style;
use marshal_core::MarshalDir;
use marshal_db::Database;

use crate::config::{MarshalConfig, CONFIG_TEMPLATE, MARSHAL_CONFIG};

/// Initialize marshal in a contracts project
#[derive(Args)]
pub struct InitCommand;

impl InitCommand {
    pub async fn run(self) -> Result<()> {
        if Database::exists() {
            return Err(eyre!(
                "Marshal is already initialized in this project ({} exists)",
                MarshalDir::NAME
            ));
        }

        let dir = MarshalDir::new();
        dir.create()?;
        println!("{} Created {}/", style("✓").green(), MarshalDir::NAME);

        let db = Database::connect().await?;
        db.init_schema().await?;
        println!("{} Initialized ledger", style("✓").green());

        if !MarshalConfig::exists() {
            std::fs::write(MARSHAL_CONFIG, CONFIG_TEMPLATE)?;
            println!("{} Wrote {}", style("✓").green(), MARSHAL_CONFIG);
        }

        add_to_gitignore(Path::new(".gitignore"))?;

        println!();
        println!(
            "{} Marshal initialized successfully!",
            style("✓").green().bold()
        );
        println!();
        println!("Next steps:");
        println!(
            "  1. Configure networks in {} under {}",
            MARSHAL_CONFIG,
            style("[networks.<name>]").cyan()
        );
        println!(
            "  2. Declare steps in {}",
            style("migrations.toml").cyan()
        );
        println!(
            "  3. Run {} to deploy",
            style("marshal run --network <name>").cyan()
        );

        Ok(())
    }
}

fn add_to_gitignore(gitignore_path: &Path) -> Result<()> {
    let entry = MarshalDir::NAME;

    if gitignore_path.exists() {
        let content = std::fs::read_to_string(gitignore_path)?;
        // Check for both `.marshal` and `.marshal/` patterns
        let has_entry = content
            .lines()
            .any(|line| line.trim() == entry || line.trim() == format!("{}/", entry));
        if !has_entry {
            let mut new_content = content;
            if !new_content.is_empty() && !new_content.ends_with('\n') {
                new_content.push('\n');
            }
            new_content.push_str(entry);
            new_content.push('\n');
            std::fs::write(gitignore_path, new_content)?;
            println!("{} Added {} to .gitignore", style("✓").green(), entry);
        }
    }

    Ok(())
}
