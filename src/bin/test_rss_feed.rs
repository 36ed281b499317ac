use anyhow::Result;
use colored::Colorize;
use riskfeed::logging;
use riskfeed::rss::{self, RssFeedStatus};
use std::env;
use std::process;

const PREVIEW_ENTRIES: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::configure_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        return Ok(());
    }
    let url = &args[1];
    let json = args.iter().any(|arg| arg == "--json");

    let result = rss::probe_feed(url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\n{}", "═".repeat(100).bright_blue());
        println!("{}  {}", "FEED DIAGNOSTICS".bright_blue(), url.bright_yellow());
        println!("{}", "═".repeat(100).bright_blue());

        let status_str = format!("{:?}", result.status);
        let colored_status = match result.status {
            RssFeedStatus::Success => status_str.bright_green(),
            RssFeedStatus::RequestFailed | RssFeedStatus::RequestTimeout => status_str.bright_red(),
            _ => status_str.bright_yellow(),
        };
        println!("{}: {}", "Status".bright_blue(), colored_status);

        match result.http_status {
            Some(code) => println!("{}: {}", "HTTP Status".bright_blue(), code),
            None => println!("{}: {}", "HTTP Status".bright_blue(), "None".dimmed()),
        }
        match result.content_type {
            Some(ref content_type) => println!("{}: {}", "Content-Type".bright_blue(), content_type),
            None => println!("{}: {}", "Content-Type".bright_blue(), "None".dimmed()),
        }
        println!("{}: {}", "Entries Found".bright_blue(), result.entries_found);

        if !result.warnings.is_empty() {
            println!("\n{}", "Warnings".bright_yellow());
            println!("{}", "─".repeat(80).dimmed());
            for (i, warning) in result.warnings.iter().enumerate() {
                println!("{}. {}", i + 1, warning);
            }
        }

        if !result.errors.is_empty() {
            println!("\n{}", "Errors".bright_red());
            println!("{}", "─".repeat(80).dimmed());
            for (i, error) in result.errors.iter().enumerate() {
                println!("{}. {}", i + 1, error.bright_red());
            }
        }

        if !result.entries.is_empty() {
            println!("\n{}", "Feed Entries".bright_green());
            println!("{}", "─".repeat(80).dimmed());

            for (i, entry) in result.entries.iter().take(PREVIEW_ENTRIES).enumerate() {
                let title = entry.title.as_deref().unwrap_or("[No Title]");
                let link = entry.link.as_deref().unwrap_or("[No URL]");
                let date = entry
                    .published
                    .as_deref()
                    .or(entry.updated.as_deref())
                    .unwrap_or("[No Date]");

                println!(
                    "{}. {} ({})\n   {}",
                    i + 1,
                    title.bright_white(),
                    date.dimmed(),
                    link.bright_cyan()
                );
            }

            if result.entries.len() > PREVIEW_ENTRIES {
                println!("... and {} more entries", result.entries.len() - PREVIEW_ENTRIES);
            }
        }

        println!("\n{}", "═".repeat(100).bright_blue());
    }

    if result.status == RssFeedStatus::Success {
        println!("Feed test completed successfully with {} entries found", result.entries_found);
        process::exit(0);
    }
    eprintln!("Feed test completed with errors: {:?}", result.status);
    process::exit(1);
}

fn print_usage(program_name: &str) {
    println!("Usage: {} <feed_url> [--json]", program_name);
    println!("\nOptions:");
    println!("  --json    Print the diagnostics as JSON");
    println!("\nExamples:");
    println!("  {} https://www.insurancejournal.com/feed/", program_name);
    println!("  {} https://www.nature.com/nclimate.rss --json", program_name);
}
