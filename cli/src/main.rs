//! weaveindex CLI — operator tooling for the two-tier chain index.

use std::env;
use std::process::ExitCode;

use weaveindex_core::IndexConfig;

/// Command table; `usage()` renders itself from this.
const COMMANDS: &[(&str, &str)] = &[
    ("info", "Show the shipped configuration defaults"),
    ("version", "Print the version"),
    ("help", "Print this help"),
];

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(command) = args.next() else {
        usage();
        return ExitCode::FAILURE;
    };

    // accept `version`, `--version`, and `-V` alike
    match command.trim_start_matches('-') {
        "info" => info(),
        "version" | "V" => println!("weaveindex {}", env!("CARGO_PKG_VERSION")),
        "help" | "h" => usage(),
        unknown => {
            eprintln!("weaveindex: unrecognized command {unknown:?}\n");
            usage();
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn usage() {
    println!(
        "weaveindex {} — two-tier index for content-addressed chains",
        env!("CARGO_PKG_VERSION")
    );
    println!("\nUsage: weaveindex <command>\n");
    for (name, blurb) in COMMANDS {
        println!("  {name:<10}{blurb}");
    }
}

fn info() {
    let config = IndexConfig::default();
    println!("weaveindex v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Stabilization flush interval: every {} blocks",
        config.stable_flush_interval
    );
    println!("  Fork depth margin: {} blocks", config.max_fork_depth);
    println!(
        "  Unmined transaction retention: {} seconds",
        config.new_tx_cleanup_wait_secs
    );
    println!("  SQLite page size: {} bytes", config.page_size);
    println!(
        "  Listing page size: {} default, {} max",
        config.default_page_size, config.max_page_size
    );
}
