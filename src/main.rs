mod cli;

use apigen::config::Config;
use apigen::plugin::builtins;
use apigen::plugin::{
    AutoInstaller, DylibImporter, GenerateRequest, InstallOptions, NodeModulesResolver,
    PackageManager, PackageResolver, PluginLoader, RuntimeEnvironment, SystemEnvironment,
    TokioCommandRunner,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Logs go to stderr so generator output and prompts stay usable on stdout.
///
/// Log level can be controlled with RUST_LOG env var (default: info).
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Wire up the loader with the real environment, resolver, importer and
/// runner. Constructed once per invocation and passed down.
fn build_loader(root: &Path, config: &Config, auto_install: bool) -> PluginLoader {
    let env: Arc<dyn RuntimeEnvironment> = Arc::new(SystemEnvironment);
    let resolver: Arc<dyn PackageResolver> = Arc::new(NodeModulesResolver);
    let importer = Box::new(DylibImporter::new(resolver.clone()));
    let installer = AutoInstaller::new(
        root.to_path_buf(),
        env.clone(),
        resolver,
        Arc::new(TokioCommandRunner),
    )
    .with_auto_install(auto_install || config.auto_install);

    PluginLoader::new(root.to_path_buf(), env, importer, installer)
        .with_install_options(config.install_options())
}

fn workspace_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    match cli_root {
        Some(root) => root
            .canonicalize()
            .with_context(|| format!("Workspace root does not exist: {}", root.display())),
        None => std::env::current_dir().context("Could not determine current directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let root = workspace_root(cli.root)?;
    let config = Config::load(&root)?;

    match cli.command {
        Commands::List => {
            handle_list(&root, &config);
        }
        Commands::Resolve { name, install } => {
            handle_resolve(&root, &config, &name, install).await?;
        }
        Commands::Install {
            package,
            no_dev,
            force,
            yes,
            package_manager,
        } => {
            handle_install(&root, &config, &package, no_dev, force, yes, package_manager).await?;
        }
        Commands::Generate {
            generator,
            spec,
            out,
            options,
            install,
        } => {
            handle_generate(&root, &config, &generator, spec, out, options, install).await?;
        }
    }

    Ok(())
}

fn handle_list(root: &Path, config: &Config) {
    let loader = build_loader(root, config, false);

    println!("Builtin generators:");
    for name in builtins::builtin_names() {
        println!("  {} ({})", name, builtins::resolve_identifier(name));
    }

    let registered = loader.registered();
    if !registered.is_empty() {
        println!("Registered generators:");
        for name in registered {
            println!("  {}", name);
        }
    }
}

async fn handle_resolve(root: &Path, config: &Config, name: &str, install: bool) -> Result<()> {
    let loader = build_loader(root, config, install);
    let result = loader.discover(name).await?;

    let version = result.version.as_deref().unwrap_or("unknown");
    match result.path {
        Some(path) => println!(
            "{} {} ({}) at {}",
            result.descriptor.name(),
            version,
            result.source,
            path.display()
        ),
        None => println!("{} {} ({})", result.descriptor.name(), version, result.source),
    }

    Ok(())
}

async fn handle_install(
    root: &Path,
    config: &Config,
    package: &str,
    no_dev: bool,
    force: bool,
    yes: bool,
    package_manager: Option<String>,
) -> Result<()> {
    let manager = match package_manager {
        Some(name) => Some(
            PackageManager::from_name(&name)
                .ok_or_else(|| anyhow!("Unknown package manager '{}'", name))?,
        ),
        None => config.package_manager(),
    };

    let env: Arc<dyn RuntimeEnvironment> = Arc::new(SystemEnvironment);
    let resolver: Arc<dyn PackageResolver> = Arc::new(NodeModulesResolver);
    let mut installer = AutoInstaller::new(
        root.to_path_buf(),
        env,
        resolver,
        Arc::new(TokioCommandRunner),
    );
    if yes {
        installer = installer.without_prompt();
    }

    // An explicit install command maps builtin short names the same way
    // the loader does.
    let identifier = builtins::resolve_identifier(package);

    let options = InstallOptions {
        dev: !no_dev,
        package_manager: manager,
        timeout: config.install_timeout(),
        force,
    };

    let outcome = installer
        .install(identifier, &options)
        .await
        .with_context(|| format!("Failed to install '{}'", identifier))?;

    match outcome {
        apigen::plugin::InstallOutcome::Installed => println!("Installed {}", identifier),
        apigen::plugin::InstallOutcome::AlreadyInstalled => {
            println!("{} is already installed", identifier)
        }
    }

    Ok(())
}

async fn handle_generate(
    root: &Path,
    config: &Config,
    generator: &str,
    spec: PathBuf,
    out: PathBuf,
    options: Option<String>,
    install: bool,
) -> Result<()> {
    let loader = build_loader(root, config, install);
    let descriptor = loader.load(generator).await?;

    let mut request = GenerateRequest::new(spec, out);
    if let Some(raw) = options {
        request.options = serde_json::from_str(&raw)
            .with_context(|| format!("--options is not valid JSON: {}", raw))?;
        descriptor.validate_options(&request.options)?;
    }

    let output = descriptor.clone().generate(request).await?;

    for warning in &output.warnings {
        tracing::warn!(generator, "{}", warning);
    }
    println!(
        "{} wrote {} file(s)",
        descriptor.name(),
        output.written_files.len()
    );
    for file in &output.written_files {
        println!("  {}", file.display());
    }

    Ok(())
}
