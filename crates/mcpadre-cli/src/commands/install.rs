//! `mcpadre install`

use colored::Colorize;
use mcpadre_config::WorkspaceContext;
use mcpadre_env::DriftAction;
use mcpadre_run::install_all;

use crate::error::Result;

const UPGRADE_HINT: &str =
    "Use --force to override or set installImplicitlyUpgradesChangedPackages=true in config";

/// Materialize every configured server. Skipped upgrades are reported but
/// do not fail the command.
pub async fn run_install(ctx: &WorkspaceContext, force: bool, skip_gitignore: bool) -> Result<i32> {
    let reports = install_all(ctx, force).await?;

    for report in &reports {
        match report.action {
            DriftAction::Create => {
                println!("{} {}", "installed".green().bold(), report.server);
            }
            DriftAction::Sync => {
                println!("{} {}", "up to date".green(), report.server);
            }
            DriftAction::Upgrade => {
                println!("{} {}", "upgraded".yellow().bold(), report.server);
                for change in &report.changes {
                    println!("  {change}");
                }
            }
            DriftAction::Skip => {
                println!("{} {}", "skipped".yellow(), report.server);
                for change in &report.changes {
                    println!("  {change}");
                }
                println!("  {}", UPGRADE_HINT.dimmed());
            }
        }
    }

    if !skip_gitignore {
        ensure_gitignore(ctx)?;
    }
    Ok(0)
}

/// Keep the managed state directory out of version control.
fn ensure_gitignore(ctx: &WorkspaceContext) -> Result<()> {
    let gitignore = ctx.root().join(".gitignore");
    let entry = ".mcpadre/servers/";

    let existing = if gitignore.is_file() {
        std::fs::read_to_string(gitignore.to_native())?
    } else {
        String::new()
    };
    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }

    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(entry);
    updated.push('\n');
    std::fs::write(gitignore.to_native(), updated)?;
    tracing::debug!("added {entry} to .gitignore");
    Ok(())
}
