use clap::Parser;
use lanes::cli::commands::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = lanes::tui::run(cli.launch_options()) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
