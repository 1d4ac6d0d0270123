//! Turns a language model's answer into a map raster.

use hcdp::{Hcdp, HcdpError};

#[tokio::main]
async fn main() -> Result<(), HcdpError> {
    // Set RUST_LOG=info (or debug) to follow the requests
    env_logger::init();

    let client = Hcdp::builder().build()?;
    let model_output = "Here is the request:\n\
        {'island':'Kauai','product_type':'rainfall', 'year':[2020,2020], 'month':[01,07], 'aggregation':'mean'}";

    let (request, raster) = client.get_data_from_text(model_output).await?;
    println!("Query: {}", request.query);
    if let Some(island) = request.island {
        println!("Island: {} (centre {:?})", island, island.center());
    }
    for period in &request.dropped_periods {
        println!("Not queried: {}", period);
    }

    println!("Size: {}x{} ({})", raster.width(), raster.height(), raster.crs());
    println!("Overlay bounds: {:?}", raster.bounds().to_overlay_corners());
    if let Some((min, max)) = raster.valid_range() {
        println!("Values: {:.2} to {:.2}", min, max);
    }
    Ok(())
}
