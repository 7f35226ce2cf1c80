use crate::demo::{run_demo, run_explain, DemoArgs, ExplainArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_bre::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Recommendation Engine",
    about = "Score education-loan leads against lender rules and recommend the best lender",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score the seeded demo leads and print each lender ranking
    Demo(DemoArgs),
    /// Render the plain-language insight for a lender score
    Explain(ExplainArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Explain(args) => run_explain(args),
    }
}
