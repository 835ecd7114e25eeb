use std::path::Path;

use clap::Args;

use builds::config::BuildsConfig;
use builds::error::Result;

#[derive(Args)]
pub struct AddArgs {
    /// File(s) to add to the active project
    pub files: Vec<String>,
}

pub fn add(args: AddArgs) -> Result<i32> {
    let mut config = BuildsConfig::load()?;
    let project = config.resolve_project_mut(None)?;

    let mut added = 0;
    for file in &args.files {
        let file = file.strip_prefix("./").unwrap_or(file);
        if !Path::new(file).is_file() {
            continue;
        }
        if project.files.iter().any(|f| f == file) {
            println!("# {} already in project", file);
            continue;
        }
        project.files.push(file.to_string());
        println!("+ {}", file);
        added += 1;
    }

    println!("Added {} files", added);
    config.save()?;
    Ok(0)
}

#[derive(Args)]
pub struct RemoveArgs {
    /// File(s) to remove from the active project
    pub files: Vec<String>,
}

pub fn remove(args: RemoveArgs) -> Result<i32> {
    let mut config = BuildsConfig::load()?;
    let project = config.resolve_project_mut(None)?;

    let mut removed = 0;
    for file in &args.files {
        match project.files.iter().position(|f| f == file) {
            Some(index) => {
                project.files.remove(index);
                println!("- {}", file);
                removed += 1;
            }
            None => println!("# {} not in project", file),
        }
    }

    println!("Removed {} files", removed);
    config.save()?;
    Ok(0)
}

#[derive(Args)]
pub struct AddIncludeArgs {
    /// Include path(s) to add to the active project
    pub paths: Vec<String>,
}

pub fn add_include(args: AddIncludeArgs) -> Result<i32> {
    let mut config = BuildsConfig::load()?;
    let project = config.resolve_project_mut(None)?;

    for path in &args.paths {
        if !Path::new(path).is_dir() {
            continue;
        }
        let include_paths = &mut project.build_settings.include_paths;
        if include_paths.iter().any(|p| p == path) {
            println!("# path {} already configured", path);
        } else {
            include_paths.push(path.clone());
            println!("+ path {}", path);
        }
    }

    config.save()?;
    Ok(0)
}

#[derive(Args)]
pub struct AddLibraryArgs {
    /// Libraries to link (passed as -l flags)
    pub libraries: Vec<String>,

    /// Add a library path along with the libraries
    #[arg(short = 'p', long = "path")]
    pub path: Option<String>,
}

pub fn add_library(args: AddLibraryArgs) -> Result<i32> {
    let mut config = BuildsConfig::load()?;
    let project = config.resolve_project_mut(None)?;

    if let Some(path) = args.path.as_deref().filter(|p| Path::new(p).is_dir()) {
        let library_paths = &mut project.build_settings.library_paths;
        if library_paths.iter().any(|p| p == path) {
            println!("# path {} already configured", path);
        } else {
            library_paths.push(path.to_string());
            println!("+ path {}", path);
        }
    }

    for library in &args.libraries {
        let libraries = &mut project.build_settings.libraries;
        if libraries.iter().any(|l| l == library) {
            println!("# {} already configured", library);
        } else {
            libraries.push(library.clone());
            println!("+ {}", library);
        }
    }

    config.save()?;
    Ok(0)
}
