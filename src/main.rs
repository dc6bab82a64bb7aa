//! `scc` command line.

fn main() {
    if let Err(e) = scc::cli::run() {
        eprintln!("{} {:#}", console::style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
