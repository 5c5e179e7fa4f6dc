//! `dealflow init`.

use anyhow::Result;
use std::path::Path;

pub fn cmd_init(project_dir: &Path, api_url: Option<&str>) -> Result<()> {
    use dealflow::init::init_project;

    let result = init_project(project_dir, api_url)?;

    if result.created {
        println!(
            "Initialized dealflow project at {}",
            result.dealflow_dir.display()
        );
        println!();
        println!("Created:");
        println!("  .dealflow/");
        println!("  ├── dealflow.toml   # API URL and timeouts");
        println!("  └── .gitignore      # keeps session.json out of git");
        println!();
        println!("Next steps:");
        println!("  1. Check the API URL with `dealflow config show`");
        println!("  2. Run `dealflow login` to sign in");
        println!("  3. Run `dealflow board` to see the pipeline");
    } else if result.config_written {
        println!(
            "Wrote default dealflow.toml in {}",
            result.dealflow_dir.display()
        );
    } else {
        println!(
            "dealflow project already initialized at {}",
            result.dealflow_dir.display()
        );
    }

    Ok(())
}
