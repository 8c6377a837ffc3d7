use colored::Colorize;

fn main() {
    if let Err(e) = embalagem::app::run_cli() {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(1);
    }
}
