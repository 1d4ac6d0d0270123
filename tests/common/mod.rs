//! A minimal HTTP file server for exercising the client without the real portal.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use futures_util::stream;
use hcdp::{Aggregation, Crs, GeoTransform, ProductType, RasterDataset, ResourceLocator};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const NODATA: f64 = -9999.0;
pub const WIDTH: usize = 6;
pub const HEIGHT: usize = 4;

#[derive(Debug, Clone)]
enum Reply {
    Full { status: u16, body: Vec<u8> },
    /// Sends `head` with a 200 status, then drops the connection mid-body.
    CutOff { head: Vec<u8> },
}

/// Responses by request path. Paths not listed are answered with 404.
#[derive(Debug, Default, Clone)]
pub struct Routes(HashMap<String, Reply>);

impl Routes {
    pub fn ok(mut self, path: impl Into<String>, body: Vec<u8>) -> Self {
        self.0.insert(path.into(), Reply::Full { status: 200, body });
        self
    }

    pub fn status(mut self, path: impl Into<String>, status: u16) -> Self {
        self.0.insert(
            path.into(),
            Reply::Full {
                status,
                body: Vec::new(),
            },
        );
        self
    }

    pub fn cut_off(mut self, path: impl Into<String>, head: Vec<u8>) -> Self {
        self.0.insert(path.into(), Reply::CutOff { head });
        self
    }
}

/// Starts serving `routes` on a local port and returns the base URL.
pub async fn serve(routes: Routes) -> std::io::Result<String> {
    let app = Router::new().fallback(respond).with_state(Arc::new(routes));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{}/", addr))
}

async fn respond(State(routes): State<Arc<Routes>>, uri: Uri) -> Response {
    match routes.0.get(uri.path()) {
        Some(Reply::Full { status, body }) => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, body.clone()).into_response()
        }
        Some(Reply::CutOff { head }) => {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from(head.clone())),
                Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "cut off")),
            ];
            Body::from_stream(stream::iter(chunks)).into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// Request path of a monthly data map, as the client will ask for it.
pub fn month_path(product_type: ProductType, year: i32, month: u32, aggregation: Aggregation) -> String {
    let locator = ResourceLocator::builder()
        .product_type(product_type)
        .year(year)
        .month(month)
        .aggregation(aggregation)
        .build()
        .unwrap();
    format!("/{}", locator.relative_path())
}

/// A small statewide-looking raster with every pixel set to `value`.
pub fn uniform_raster(value: f32) -> RasterDataset {
    RasterDataset::new(
        WIDTH,
        HEIGHT,
        vec![value; WIDTH * HEIGHT],
        GeoTransform::north_up(-160.0, 22.5, 1.0, 0.75),
        Crs::WGS84,
    )
    .unwrap()
    .with_nodata(Some(NODATA))
}

pub fn geotiff(raster: &RasterDataset) -> Vec<u8> {
    raster.to_geotiff().unwrap()
}

/// Routes serving all twelve months of `year`, month `m` filled with `m`.
pub fn year_of_months(product_type: ProductType, year: i32, aggregation: Aggregation) -> Routes {
    (1..=12u32).fold(Routes::default(), |routes, month| {
        routes.ok(
            month_path(product_type, year, month, aggregation),
            geotiff(&uniform_raster(month as f32)),
        )
    })
}
