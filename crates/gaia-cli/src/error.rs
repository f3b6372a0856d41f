use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("api key not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Export your key, or add it to the [api_keys] section of the config file:");
        eprintln!("  {} export OPENAI_API_KEY=<value>", "$".dimmed());
        eprintln!("  Or try the pipeline without a model:");
        eprintln!("  {} gaia --dry-run benchmark --no-submit --limit 1", "$".dimmed());
    }

    if msg.contains("username") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Pass your Hugging Face username with --username, or skip submission:");
        eprintln!("  {} gaia benchmark --no-submit", "$".dimmed());
    }

    if msg.contains("connection refused") || msg.contains("network") || msg.contains("http error") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
