use sea_orm::Database;

use migration::{SkuRules, SKU_MAX_LEN};
use serials_backend::config::{self, AppConfig};
use serials_backend::services::sku_report;

/// Lists the SKU the `sku` migration would derive for every authorized part
/// and exits non-zero if any of them would not fit the column.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    config::init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    let report = sku_report::preview(&db, &SkuRules::default()).await?;

    println!("{:<8} {:<50} {:<60} {}", "ID", "PART NUMBER", "DERIVED SKU", "STATUS");
    for row in &report.rows {
        let status = if row.fits {
            "ok".to_string()
        } else {
            format!("TOO LONG ({} > {})", row.derived_sku.chars().count(), SKU_MAX_LEN)
        };
        println!("{:<8} {:<50} {:<60} {}", row.id, row.part_number, row.derived_sku, status);
    }

    let overflows = report.overflow_count();
    println!();
    println!("{} part(s), {} overflow(s)", report.rows.len(), overflows);

    if overflows > 0 {
        tracing::warn!(
            overflows,
            "Fix these part numbers or widen the sku column before migrating"
        );
        std::process::exit(1);
    }

    Ok(())
}
