//! archetype CLI - Generate projects from archetypes

use anyhow::{Context, Result};
use archetype_core::archetype::{build_jar, ArchetypeSource};
use archetype_core::creator::{create_from_project, CreateRequest};
use archetype_core::fileset::ClassifyOptions;
use archetype_core::tui::GenerateArgs;
use archetype_core::{
    generate_archetype, ArchetypeCoordinates, ArchetypeFetcher, ArchetypeGenerator,
    GenerationRequest, ProductConfig,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use url::Url;

/// archetype product configuration
#[derive(Clone)]
pub struct ArchetypeConfig;

impl ProductConfig for ArchetypeConfig {
    fn name(&self) -> &'static str {
        "archetype"
    }

    fn display_name(&self) -> &'static str {
        "archetype"
    }

    fn default_repository_url(&self) -> &'static str {
        "https://repo.maven.apache.org/maven2"
    }

    fn repository_url_env(&self) -> &'static str {
        "ARCHETYPE_REPOSITORY_URL"
    }

    fn cli_description(&self) -> &'static str {
        "CLI for generating projects from archetypes"
    }

    fn next_steps(&self, dir: &Path) -> Vec<String> {
        let mut steps = Vec::new();
        let current = std::env::current_dir().ok();

        // Step 1: cd to directory if not current
        if current.as_deref() != Some(dir) {
            steps.push(format!("cd {}", dir.display()));
        }

        // Step 2: Build it
        steps.push("mvn package".to_string());

        steps
    }
}

#[derive(Parser, Debug)]
#[command(name = "archetype")]
#[command(about = "CLI for generating projects from archetypes")]
#[command(version)]
pub struct Args {
    /// Log engine decisions at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a project from an archetype
    Generate(GenerateCliArgs),
    /// Package an exploded archetype directory into a jar
    Package(PackageArgs),
    /// Create an archetype from an existing project
    CreateFromProject(CreateFromProjectArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateCliArgs {
    /// Archetype coordinates as groupId:artifactId[:version]
    #[arg(short, long)]
    pub archetype: String,

    /// Remote repository to fetch the archetype from
    #[arg(long, conflicts_with = "archetype_dir")]
    pub repository: Option<Url>,

    /// Local repository, jar or exploded archetype directory (for development use)
    #[arg(long = "archetype-dir")]
    pub archetype_dir: Option<PathBuf>,

    #[arg(long = "group-id")]
    pub group_id: Option<String>,

    #[arg(long = "artifact-id")]
    pub artifact_id: Option<String>,

    #[arg(long)]
    pub version: Option<String>,

    #[arg(long)]
    pub package: Option<String>,

    /// Additional property as key=value (repeatable)
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = parse_define)]
    pub define: Vec<(String, String)>,

    /// YAML file with a flat map of properties
    #[arg(long = "properties-file")]
    pub properties_file: Option<PathBuf>,

    /// Directory the project is generated into
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Prompt for missing properties and confirm before generating
    #[arg(short, long)]
    pub interactive: bool,

    /// Auto-confirm the property summary in interactive mode
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Debug)]
pub struct PackageArgs {
    /// Exploded archetype directory
    pub archetype_dir: PathBuf,

    /// Jar file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CreateFromProjectArgs {
    /// Project to turn into an archetype
    pub project_dir: PathBuf,

    #[arg(long = "group-id")]
    pub group_id: String,

    #[arg(long = "artifact-id")]
    pub artifact_id: String,

    #[arg(long)]
    pub version: String,

    #[arg(long)]
    pub package: String,

    /// Archetype directory to write (defaults to target/generated-sources/archetype)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_define(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Properties from `--properties-file`, overridden by `-D` flags
fn collect_properties(
    properties_file: Option<&Path>,
    defines: &[(String, String)],
) -> Result<BTreeMap<String, String>> {
    let mut properties = match properties_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_properties(&content)
                .with_context(|| format!("Invalid properties file {}", path.display()))?
        }
        None => BTreeMap::new(),
    };
    properties.extend(defines.iter().cloned());
    Ok(properties)
}

/// Flat YAML map; scalar values are taken as their string form
fn parse_properties(content: &str) -> Result<BTreeMap<String, String>> {
    let raw: BTreeMap<String, serde_yaml::Value> = serde_yaml::from_str(content)?;
    raw.into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Null => String::new(),
                _ => anyhow::bail!("Property '{}' is not a scalar", key),
            };
            Ok((key, value))
        })
        .collect()
}

fn build_request(args: &GenerateCliArgs) -> Result<GenerationRequest> {
    let archetype: ArchetypeCoordinates = args.archetype.parse()?;
    let mut request = GenerationRequest::new(archetype, &args.output);
    request.group_id = args.group_id.clone();
    request.artifact_id = args.artifact_id.clone();
    request.version = args.version.clone();
    request.package = args.package.clone();
    request.properties = collect_properties(args.properties_file.as_deref(), &args.define)?;
    request.interactive = args.interactive;
    Ok(request)
}

/// Source named on the command line, if any
fn requested_source(args: &GenerateCliArgs) -> Option<ArchetypeSource> {
    match (&args.archetype_dir, &args.repository) {
        (Some(path), _) => Some(ArchetypeSource::local(path.clone())),
        (None, Some(url)) => Some(ArchetypeSource::Remote(url.clone())),
        (None, None) => None,
    }
}

fn setup_fetcher<C: ProductConfig>(config: &C, args: &GenerateCliArgs) -> Result<ArchetypeFetcher> {
    let fetcher = match requested_source(args) {
        Some(source) => ArchetypeFetcher::new(source, config.user_agent()),
        None => ArchetypeFetcher::from_config(config)?,
    };
    Ok(fetcher)
}

async fn generate<C: ProductConfig>(config: &C, args: GenerateCliArgs) -> Result<()> {
    let mut request = build_request(&args)?;
    let generator = ArchetypeGenerator::new();

    if args.interactive {
        let result = archetype_core::run(
            config,
            &generator,
            GenerateArgs {
                source: requested_source(&args),
                request,
                yes: args.yes,
            },
        )
        .await;

        // Ensure cursor is visible on normal exit
        let _ = console::Term::stderr().show_cursor();

        return result.map(|_| ());
    }

    let fetcher = setup_fetcher(config, &args)?;
    let result = generate_archetype(&fetcher, &generator, &mut request).await;
    let project = result.into_result()?;

    println!(
        "  {} Created {} files in {}",
        "✓".green(),
        project.written.len(),
        project.project_dir.display()
    );
    for skipped in &project.skipped {
        println!("  {} Kept existing {}", "!".yellow(), skipped.display());
    }
    print_next_steps(config, &project.project_dir);
    Ok(())
}

fn create(args: CreateFromProjectArgs) -> Result<()> {
    let archetype_dir = args.output.clone().unwrap_or_else(|| {
        args.project_dir
            .join("target")
            .join("generated-sources")
            .join("archetype")
    });
    let request = CreateRequest {
        project_dir: args.project_dir,
        archetype_dir,
        group_id: args.group_id,
        artifact_id: args.artifact_id,
        version: args.version,
        package: args.package,
        options: ClassifyOptions::default(),
    };

    let created = create_from_project(&request)?;
    println!(
        "  {} Archetype {} written to {} ({} files)",
        "✓".green(),
        created.descriptor.name.bold(),
        created.archetype_dir.display(),
        created.written.len()
    );
    for excluded in &created.excluded {
        println!("  {} Not claimed by any fileset: {}", "!".yellow(), excluded);
    }
    Ok(())
}

fn print_next_steps<C: ProductConfig>(config: &C, project_dir: &Path) {
    println!();
    println!("  {}", "Next steps".bold());
    println!();
    for (i, step) in config.next_steps(project_dir).iter().enumerate() {
        println!("  {}.  {}", i + 1, step.cyan());
    }
}

#[tokio::main]
async fn main() {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = ArchetypeConfig;
    let result = match args.command {
        Command::Generate(generate_args) => generate(&config, generate_args).await,
        Command::Package(package_args) => {
            build_jar(&package_args.archetype_dir, package_args.output).map(|jar| {
                println!("  {} {}", "Wrote".green(), jar.display());
            })
        }
        Command::CreateFromProject(create_args) => create(create_args),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), format!("{:#}", e).red());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("flavour=vanilla").unwrap(),
            ("flavour".to_string(), "vanilla".to_string())
        );
        assert_eq!(
            parse_define("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert_eq!(parse_define("a=b=c").unwrap().1, "b=c");
        assert!(parse_define("novalue").is_err());
        assert!(parse_define("=x").is_err());
    }

    #[test]
    fn test_defines_override_properties_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("props.yaml");
        std::fs::write(&file, "flavour: vanilla\nport: 8080\nenabled: true\n").unwrap();

        let defines = vec![("flavour".to_string(), "mint".to_string())];
        let properties = collect_properties(Some(&file), &defines).unwrap();
        assert_eq!(properties["flavour"], "mint");
        assert_eq!(properties["port"], "8080");
        assert_eq!(properties["enabled"], "true");
    }

    #[test]
    fn test_nested_property_is_rejected() {
        assert!(parse_properties("nested:\n  key: value\n").is_err());
    }

    #[test]
    fn test_build_request() {
        let args = Args::parse_from([
            "archetype",
            "generate",
            "--archetype",
            "com.acme:quickstart:1.0",
            "--group-id",
            "com.x",
            "--artifact-id",
            "proj",
            "-D",
            "flavour=mint",
            "--output",
            "out",
        ]);
        let Command::Generate(generate_args) = args.command else {
            panic!("expected generate");
        };
        let request = build_request(&generate_args).unwrap();
        assert_eq!(request.archetype.to_string(), "com.acme:quickstart:1.0");
        assert_eq!(request.group_id.as_deref(), Some("com.x"));
        assert_eq!(request.properties["flavour"], "mint");
        assert_eq!(request.output_directory, PathBuf::from("out"));
        assert!(!request.interactive);
    }
}
