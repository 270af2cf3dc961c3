//! Charm-style CLI prompts using cliclack

use crate::archetype::{
    ArchetypeFetcher, ArchetypeKind, ArchetypePackage, ArchetypeSource, RequiredProperty,
};
use crate::context::PropertyContext;
use crate::generator::{required_properties, ArchetypeGenerator, GeneratedProject, GenerationRequest};
use crate::product::ProductConfig;
use crate::render;
use anyhow::Result;
use regex::Regex;
use std::path::Path;

/// CLI arguments for the generate command
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    /// Where to look for the archetype, the configured repository if unset
    pub source: Option<ArchetypeSource>,

    /// Project coordinates and properties collected from the command line
    pub request: GenerationRequest,

    /// Auto-confirm all prompts
    pub yes: bool,
}

/// Run the generate flow with interactive prompts
pub async fn run<C: ProductConfig>(
    config: &C,
    generator: &ArchetypeGenerator,
    args: GenerateArgs,
) -> Result<GeneratedProject> {
    cliclack::intro(config.display_name())?;

    let GenerateArgs {
        source,
        mut request,
        yes,
    } = args;

    // Step 1: Setup archetype fetcher
    let fetcher = setup_fetcher(config, source)?;

    // Step 2: Resolve the archetype package
    let package = resolve_archetype(&fetcher, &request).await?;
    let kind = package.inspect()?;

    // Step 3: Ask for whatever the request does not already answer
    prompt_properties(&kind, &mut request)?;

    // Step 4: Confirm
    if request.interactive && !yes {
        confirm_properties(&kind, &request)?;
    }

    // Step 5: Generate
    let project = generate_project(generator, &mut request, &package)?;

    // Step 6: Show next steps
    print_next_steps(config, &project.project_dir)?;

    Ok(project)
}

fn setup_fetcher<C: ProductConfig>(
    config: &C,
    source: Option<ArchetypeSource>,
) -> Result<ArchetypeFetcher> {
    let fetcher = match source {
        Some(ArchetypeSource::Local(path)) => {
            cliclack::log::info(format!("Using local archetypes from {}", path.display()))?;
            ArchetypeFetcher::from_local(path, config.user_agent())
        }
        Some(ArchetypeSource::Remote(url)) => {
            cliclack::log::info(format!("Using archetype repository {}", url))?;
            ArchetypeFetcher::new(ArchetypeSource::Remote(url), config.user_agent())
        }
        None => {
            cliclack::log::info("Using remote archetype repository")?;
            ArchetypeFetcher::from_config(config)?
        }
    };

    Ok(fetcher)
}

async fn resolve_archetype(
    fetcher: &ArchetypeFetcher,
    request: &GenerationRequest,
) -> Result<ArchetypePackage> {
    let spinner = cliclack::spinner();
    spinner.start(format!("Resolving {}...", request.archetype));

    match fetcher.fetch(&request.archetype).await {
        Ok(package) => {
            spinner.stop(format!("Archetype: {}", package.label()));
            Ok(package)
        }
        Err(e) => {
            spinner.stop("Failed to resolve archetype");
            Err(e.into())
        }
    }
}

/// Prompt for required properties the request leaves open
///
/// Interactive requests are asked about every unset property, with its
/// default pre-filled. Otherwise only properties without a default are asked
/// for. Answers land in `request.properties`.
pub fn prompt_properties(kind: &ArchetypeKind, request: &mut GenerationRequest) -> Result<()> {
    for property in required_properties(kind) {
        let context = request.initial_context();
        if context.get_non_blank(&property.key).is_some() {
            continue;
        }
        if property.default_value.is_some() && !request.interactive {
            continue;
        }

        let value = ask(&property, &context)?;
        request.properties.insert(property.key.clone(), value);
    }
    Ok(())
}

fn ask(property: &RequiredProperty, context: &PropertyContext) -> Result<String> {
    let mut input = cliclack::input(format!("Define value for property '{}'", property.key));

    if let Some(default) = property.default_value.as_deref() {
        let default = default_hint(default, context);
        input = input.placeholder(&default).default_input(&default);
    } else {
        input = input.required(true);
    }

    if let Some(pattern) = property.validation_regex.as_deref() {
        match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(re) => {
                let pattern = pattern.to_string();
                input = input.validate(move |value: &String| {
                    if re.is_match(value) {
                        Ok(())
                    } else {
                        Err(format!("Value does not match '{}'", pattern))
                    }
                });
            }
            Err(e) => {
                tracing::warn!(key = %property.key, error = %e, "ignoring invalid validation pattern");
            }
        }
    }

    Ok(input.interact()?)
}

/// Default with references to already-known properties filled in
fn default_hint(default: &str, context: &PropertyContext) -> String {
    render::render(default, context).unwrap_or_else(|_| default.to_string())
}

fn confirm_properties(kind: &ArchetypeKind, request: &GenerationRequest) -> Result<()> {
    let context = request.initial_context();
    let summary: Vec<String> = required_properties(kind)
        .iter()
        .map(|p| {
            let value = context
                .get_non_blank(&p.key)
                .map(str::to_string)
                .or_else(|| p.default_value.as_deref().map(|d| default_hint(d, &context)))
                .unwrap_or_default();
            format!("{}: {}", p.key, value)
        })
        .collect();
    cliclack::note("Confirm properties configuration", summary.join("\n"))?;

    let confirm: bool = cliclack::confirm("Generate project?")
        .initial_value(true)
        .interact()?;

    if !confirm {
        anyhow::bail!("Generation cancelled.");
    }
    Ok(())
}

fn generate_project(
    generator: &ArchetypeGenerator,
    request: &mut GenerationRequest,
    package: &ArchetypePackage,
) -> Result<GeneratedProject> {
    let spinner = cliclack::spinner();
    spinner.start("Generating project...");

    match generator.generate(request, package).into_result() {
        Ok(project) => {
            spinner.stop(format!(
                "Created {} files in {}",
                project.written.len(),
                project.project_dir.display()
            ));
            for skipped in &project.skipped {
                cliclack::log::warning(format!("Kept existing file {}", skipped.display()))?;
            }
            Ok(project)
        }
        Err(e) => {
            spinner.stop("Generation failed");
            Err(e.into())
        }
    }
}

fn print_next_steps<C: ProductConfig>(config: &C, project_dir: &Path) -> Result<()> {
    let steps = config.next_steps(project_dir);

    println!();
    println!("  Next steps");
    println!();

    for (i, step) in steps.iter().enumerate() {
        println!("  {}.  {}", i + 1, step);
    }

    cliclack::outro("Happy building!")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::{ArchetypeCoordinates, ArchetypeDescriptor};

    fn request() -> GenerationRequest {
        GenerationRequest::new(ArchetypeCoordinates::new("g", "a", None), ".")
            .with_coordinates("com.acme", "shop", "1.0")
            .with_package("com.acme.shop")
    }

    #[test]
    fn test_default_hint_renders_known_references() {
        let ctx = PropertyContext::from_properties([("groupId", "com.acme")]);
        assert_eq!(default_hint("${groupId}.app", &ctx), "com.acme.app");
        assert_eq!(default_hint("${unknown}", &ctx), "${unknown}");
    }

    #[test]
    fn test_answered_request_prompts_nothing() {
        let kind = ArchetypeKind::FileSet(ArchetypeDescriptor {
            required_properties: vec![RequiredProperty {
                key: "flavour".to_string(),
                default_value: Some("vanilla".to_string()),
                validation_regex: None,
            }],
            ..Default::default()
        });
        let mut request = request();
        prompt_properties(&kind, &mut request).unwrap();
        assert!(request.properties.is_empty());
    }
}
