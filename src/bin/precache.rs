use std::env;

fn print_usage() {
    eprintln!("Usage: precache [OPTIONS] <COMMAND>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  warm                Precache the configured URL list into the store");
    eprintln!("  get <URL>           Resolve one request through the cache policy");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <FILE>     Read configuration from FILE (TOML)");
    eprintln!("  --list <FILE>       Read the URL list from FILE (one entry per line)");
    eprintln!("  --origin <URL>      Origin for root-relative entries");
    eprintln!("  --store-dir <DIR>   Root directory for on-disk stores");
    eprintln!("  --memory            Use an in-memory store (dry runs)");
    eprintln!("  --policy <POLICY>   cache-first (default) or network-first");
    eprintln!("  --offline <URL>     Offline fallback resource (default: /offline)");
    eprintln!("  -o, --output <FILE> Write the fetched body to FILE instead of stdout");
    eprintln!("  -h, --help          Show this help");
}

#[tokio::main]
async fn main() -> precache::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage();
        return Ok(());
    }

    #[cfg(feature = "cli")]
    {
        precache::cli::run().await
    }
    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI support not compiled in");
        std::process::exit(1);
    }
}
