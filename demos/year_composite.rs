//! Builds a whole-year maximum temperature composite and saves it as a GeoTIFF.

use hcdp::{Aggregation, ClimateQuery, Hcdp, HcdpError, ProductType};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), HcdpError> {
    env_logger::init();

    let client = Hcdp::builder()
        .timeout(Duration::from_secs(120))
        .composite_concurrency(6)
        .build()?;

    let query = ClimateQuery::builder()
        .product_type(ProductType::Temperature)
        .year(2019)
        .aggregation(Aggregation::Max)
        .build();

    let composite = client.get_data(&query).await?;
    let bytes = composite.to_geotiff()?;
    let path = std::env::temp_dir().join("temperature_max_2019.tif");
    if let Err(e) = std::fs::write(&path, &bytes) {
        eprintln!("Could not write {:?}: {}", path, e);
        return Ok(());
    }
    println!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}
