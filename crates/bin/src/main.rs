mod backend;
mod cli;
mod commands;
mod output;
mod player;

use clap::Parser;
use tracing_subscriber::{EnvFilter, filter::Directive};

use backend::Session;
use cli::{Cli, Commands};
use commands::{mutate, regen, show};
use output::{OutputFormat, print_changes};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("docfields=info".parse::<Directive>()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let mut session = Session::open(&cli)?;
    match &cli.command {
        Commands::Show => return show::run(&session, format),
        Commands::Regen(args) => return regen::run(&mut session, args, format).await,
        Commands::Damage(args) => mutate::damage(&session, args)?,
        Commands::Heal(args) => mutate::heal(&session, args)?,
        Commands::Grant(args) => mutate::grant(&session, args)?,
        Commands::Drop(args) => mutate::drop_item(&session, args)?,
        Commands::Spend(args) => mutate::spend(&session, args)?,
        Commands::Badge(args) => mutate::badge(&session, args)?,
    }

    let changes = session.commit()?;
    print_changes(&changes, format)?;
    Ok(())
}
