use super::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Send one request through the session pipeline
    Request {
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request body, sent as-is
        #[arg(long)]
        body: Option<String>,
        url: String,
    },
    /// Refresh the session now
    Refresh,
    /// Print whether a session exists and who it belongs to
    Status,
    /// Sign out and clear local tokens
    SignOut,
}
