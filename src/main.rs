use std::env;
use std::path::Path;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        let catalog = match bonds::api::resolve_catalog(raw_args.get(3).map(Path::new)) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("Catalog error: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = bonds::api::run_http_server(port, catalog).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    if let Err(e) = bonds::api::run_cli() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
