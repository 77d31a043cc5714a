use clap::Parser;
use colored::Colorize;
use netpol_synth::cli::Cli;
use std::process;

fn main() {
    let cli = Cli::parse();
    cli.init_logging();

    if let Err(e) = netpol_synth::run_command(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}
