use clap::{Parser, Subcommand};

/// `slawarden` - SLA evaluation engine.
#[derive(Parser, Debug)]
#[command(name = "slawarden")]
#[command(author = "theonlyhennygod")]
#[command(version = "0.1.0")]
#[command(
    about = "Polls health sources, evaluates SLA checks and publishes the results.",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gateway and the evaluation timer until Ctrl-C
    Daemon {
        /// Port to listen on (defaults to [gateway] port; 0 picks a free port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to [gateway] host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Run one evaluation cycle and print the report as JSON
    Evaluate,

    /// Print the rows held by the durable state store
    State,
}
