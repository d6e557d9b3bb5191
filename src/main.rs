use clap::Parser;
use dirsort::cli::{Cli, run_cli};
use dirsort::logging::{init_tracing, level_from_flags};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(level_from_flags(cli.verbose, cli.quiet))?;
    run_cli(cli)
}
