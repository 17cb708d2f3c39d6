use anyhow::Context;
use clap::Parser;
use runfetch::cli::{Cli, Commands};
use runfetch::config::Config;
use runfetch::dataset::DatasetFetcher;
use runfetch::model::{self, ArtifactLocator, LoadedModel, ModelLoader};

fn print_model(model: &LoadedModel) {
    println!("✓ Loaded model: {}", model.locator);
    if let Some(name) = &model.run.run_name {
        println!("  Run: {} ({})", name, model.run.run_id);
    } else {
        println!("  Run: {}", model.run.run_id);
    }
    if let Some(status) = &model.run.status {
        println!("  Status: {}", status);
    }
    if let Some(created) = &model.logged.utc_time_created {
        println!("  Logged: {} UTC", created);
    }
    println!("  Flavors: {}", model.logged.flavor_names().join(", "));

    match model.predict_capability() {
        Some(capability) => {
            print!("  Predict: {}.{}", capability.loader_module, capability.predict_fn);
            if let Some(version) = &capability.python_version {
                print!(" (python {})", version);
            }
            println!();
        }
        None => println!("  Predict: not available (no python_function flavor)"),
    }

    if let Some(signature) = &model.logged.signature {
        if let Some(inputs) = &signature.inputs {
            println!("  Inputs: {}", inputs);
        }
        if let Some(outputs) = &signature.outputs {
            println!("  Outputs: {}", outputs);
        }
    }

    println!("  Path: {:?}", model.local_dir);
    for file in &model.files {
        println!("    {}", file.display());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            url,
            output,
            preview,
        } => {
            let fetcher = DatasetFetcher::new()?;
            let table = fetcher
                .fetch(&url)
                .await
                .with_context(|| format!("Failed to fetch dataset from {}", url))?;

            if preview > 0 {
                println!("Dataset loaded. Here's a preview:");
                print!("{}", table.preview(preview));
            }

            table
                .save(&output)
                .with_context(|| format!("Failed to write {:?}", output))?;

            println!(
                "✓ Saved {} rows x {} columns to {:?}",
                table.len(),
                table.headers().len(),
                output
            );
        }

        Commands::Load {
            run_id,
            artifact_path,
        } => {
            let config = Config::from_env()?;
            let locator = ArtifactLocator::new(&run_id, &artifact_path)?;

            let mut loader = ModelLoader::new(config)?;
            let model = loader
                .load(&locator)
                .await
                .with_context(|| format!("Failed to load model {}", locator))?;

            print_model(&model);
        }

        Commands::List => {
            let config = Config::from_env()?;
            let registry = model::ModelRegistry::load(&config)?;
            let models = registry.list_models();

            if models.is_empty() {
                println!("No models loaded.");
                println!("Use 'runfetch load --run-id <run-id>' to load a model.");
            } else {
                println!("Loaded models:\n");
                for model in models {
                    println!("  {}", model.locator);
                    if let Some(name) = &model.run_name {
                        println!("    Run name: {}", name);
                    }
                    println!("    Path: {:?}", model.model_path);
                    println!("    Flavors: {}", model.flavors.join(", "));
                    println!("    Loaded: {}", model.loaded_at);
                    println!();
                }
            }
        }
    }

    Ok(())
}
