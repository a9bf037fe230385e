use patita_store::infra::config::mask_url;
use patita_store::infra::startup::build_service;
use patita_store::Config;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Reads the same configuration as api_server (patita.toml + PATITA_* env),\n\
         with the database URL taken from PATITA_DATABASE_URL or\n\
           NETLIFY_DATABASE_URL_UNPOOLED, NETLIFY_DATABASE_URL, DATABASE_URL\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    let cfg = Config::load()?;

    println!("> Preflight:");
    println!("  bind_addr={}", cfg.bind_addr);
    println!("  storage={:?}", cfg.storage);
    println!("  max_connections={}", cfg.max_connections);
    println!("  run_migrations={}", cfg.run_migrations);
    println!("  migrations_dir={}", cfg.migrations_dir.display());
    println!("  column_layout={:?}", cfg.column_layout);
    match cfg.resolve_database_url() {
        Some(url) => println!("  database_url={}", mask_url(&url)),
        None => println!("  database_url=<unset>"),
    }

    let service = build_service(&cfg).await?;
    service.ping().await?;
    println!("  {} store reachable.", service.store().backend());

    service.sync_layouts().await?;
    let mut mismatches = 0;
    for r in service.schema_report().await? {
        if r.matches_layout {
            println!("  [ok]   {} -> {} ({})", r.collection, r.table, r.layout);
        } else {
            mismatches += 1;
            println!(
                "  [FAIL] {} -> {} ({}): {}",
                r.collection,
                r.table,
                r.layout,
                r.detail.unwrap_or_default()
            );
        }
    }

    if mismatches > 0 {
        anyhow::bail!(
            "{} collection table(s) do not match their layout; run the migrations (POST /bootstrap/migrate)",
            mismatches
        );
    }
    println!("> Preflight OK.");
    Ok(())
}
