use colored::Colorize;
use reaper_config::{ConfigError, ReaperFile};
use std::path::{Path, PathBuf};

fn locate(config: Option<&Path>) -> reaper_config::Result<(PathBuf, ReaperFile)> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => reaper_config::find_config_file()?,
    };
    let file = reaper_config::load_config(&path)?;
    Ok((path, file))
}

pub fn handle(config: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "Validating configuration...".blue());

    let (path, file) = match locate(config) {
        Ok(found) => found,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ Could not load configuration".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    println!("File: {}", path.display().to_string().cyan());

    if let Err(e) = file.validate() {
        eprintln!();
        eprintln!("{}", "✗ Configuration error".red().bold());
        match e {
            ConfigError::Invalid(problems) => {
                for problem in problems {
                    eprintln!("  - {}", problem);
                }
            }
            other => eprintln!("  {}", other),
        }
        std::process::exit(1);
    }

    println!("{}", "✓ Configuration is valid".green().bold());
    println!();
    println!("Reapers: {}", file.reapers.len());
    for reaper in &file.reapers {
        println!(
            "  - {} (project {}, schedule {})",
            reaper.label().cyan(),
            reaper.project_id.as_deref().unwrap_or("-"),
            reaper.schedule.as_deref().unwrap_or("-")
        );
        for resource in &reaper.resources {
            let mut filters = Vec::new();
            if !resource.name_filter.is_empty() {
                filters.push(format!("name ~ {:?}", resource.name_filter));
            }
            if !resource.skip_filter.is_empty() {
                filters.push(format!("skip ~ {:?}", resource.skip_filter));
            }
            println!(
                "      {} in {} ttl {:?}{}",
                resource.resource_type,
                resource.zones.join(", "),
                resource.ttl,
                if filters.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", filters.join(", "))
                }
            );
        }
    }

    Ok(())
}
