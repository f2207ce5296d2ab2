use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "PayBridge CLI - manage service credentials")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a random bearer key and append it to the env file
    ///
    /// Run once per credential before first start, e.g.
    /// `paybridge generate-key --name CLIENT_API_KEY` and
    /// `paybridge generate-key --name SERVICE_KEY`.
    GenerateKey(GenerateKeyArgs),
}

#[derive(ClapArgs, Debug)]
pub struct GenerateKeyArgs {
    /// Environment variable name to write, e.g. CLIENT_API_KEY
    #[arg(short, long, help = "Environment variable name for the key")]
    pub name: String,

    /// Env file the key is appended to
    #[arg(short, long, default_value = ".env", help = "Path to the env file")]
    pub env_file: String,
}
