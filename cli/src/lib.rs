mod args;

pub use args::{Args, Commands, GenerateKeyArgs};
use clap::Parser;
use rand::Rng;
use rand::distr::Alphanumeric;

/// Runs the CLI command parser and executes the selected command.
/// Returns true if a CLI command was handled, false otherwise.
pub async fn run_cli() -> bool {
    let args = Args::parse();
    match &args.command {
        Some(Commands::GenerateKey(key_args)) => {
            match generate_key(&key_args.name, &key_args.env_file).await {
                Ok(key) => println!(
                    "Key successfully generated and saved to {}!\n {}={}",
                    key_args.env_file, key_args.name, key
                ),
                Err(e) => eprintln!("Failed to generate key: {e}"),
            }
            true
        }
        None => false,
    }
}

async fn generate_key(name: &str, env_file: &str) -> anyhow::Result<String> {
    let key: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect();
    common::save_to_env(name, &key, env_file).await?;
    Ok(key)
}
