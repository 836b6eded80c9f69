use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "soiree-server", about = "Self-hosted event planning server", version)]
pub struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "soiree.toml")]
    pub config: String,

    /// Override the configured bind address (host:port).
    #[arg(long)]
    pub bind: Option<String>,
}
