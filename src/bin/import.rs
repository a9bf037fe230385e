//! Bulk import of a `{ "<collection>": [items...] }` document (e.g. a json-server
//! `db.json`) through the collection service.

use clap::Parser;
use patita_store::infra::startup::{build_service, init_tracing};
use patita_store::{Config, MutationRequest};
use serde_json::{json, Value as JsonValue};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "import", about = "Upsert every item of a JSON export into its collection")]
struct Args {
    /// Path to the JSON document.
    #[arg(long, short)]
    file: PathBuf,

    /// Run the migrations before importing.
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = Config::load()?;
    init_tracing(&cfg);

    let raw = std::fs::read_to_string(&args.file)?;
    let doc: JsonValue = serde_json::from_str(raw.trim_start_matches('\u{feff}'))?;
    let JsonValue::Object(collections) = doc else {
        anyhow::bail!("{} must hold a JSON object of arrays", args.file.display());
    };

    let service = build_service(&cfg).await?;
    if args.migrate {
        service.migrate().await?;
    } else {
        service.sync_layouts().await?;
    }

    let mut total = 0usize;
    for (name, value) in collections {
        let JsonValue::Array(items) = value else {
            continue;
        };
        if service.resolve(&name).await.is_none() {
            warn!(collection = %name, "not an allowed collection; skipped");
            continue;
        }

        let mut imported = 0usize;
        for item in items {
            let request: MutationRequest = serde_json::from_value(json!({
                "action": "create",
                "collection": name,
                "item": item,
            }))?;
            match service.mutate(request).await {
                Ok(_) => imported += 1,
                Err(e) if e.status().is_client_error() => {
                    warn!(collection = %name, error = %e, "item skipped");
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(collection = %name, imported, "collection imported");
        total += imported;
    }

    info!(total, "import complete");
    Ok(())
}
