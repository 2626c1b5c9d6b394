use clap::{Parser, Subcommand};

/// BugRelay — bug report intake proxy
#[derive(Parser)]
#[command(name = "bugrelay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the intake server (the default when no subcommand is given)
    Serve {
        /// Port to bind, overriding BUGRELAY_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
}
