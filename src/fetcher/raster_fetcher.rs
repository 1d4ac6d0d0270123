use crate::fetcher::error::FetchError;
use crate::raster::dataset::RasterDataset;
use bytes::Bytes;
use futures_util::TryStreamExt;
use log::{info, warn};
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::task;
use tokio_util::io::StreamReader;

/// Retrieves files from the portal. Every call is a fresh request; nothing is cached and
/// nothing is retried.
#[derive(Debug, Clone)]
pub struct RasterFetcher {
    client: Client,
}

impl RasterFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Sends a GET and turns any non-success status into [`FetchError::HttpStatus`].
    async fn get(&self, url: &str) -> Result<Response, FetchError> {
        info!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.to_string(), e))?;

        match response.error_for_status() {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                Err(match e.status() {
                    Some(status) => FetchError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    },
                    None => FetchError::NetworkRequest(url.to_string(), e),
                })
            }
        }
    }

    /// Raw response body of a successful GET.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| FetchError::Body(url.to_string(), e))?;
        info!("Received {} bytes from {}", bytes.len(), url);
        Ok(bytes)
    }

    /// Downloads `url` and decodes it as a GeoTIFF.
    ///
    /// Decoding runs on the blocking pool.
    pub async fn fetch(&self, url: &str) -> Result<RasterDataset, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        let url_owned = url.to_string();
        task::spawn_blocking(move || {
            RasterDataset::from_geotiff(&bytes).map_err(|source| FetchError::Decode {
                url: url_owned,
                source,
            })
        })
        .await?
    }

    /// Streams the body of `url` into a file at `path`, returning the number of bytes written.
    ///
    /// Works for every file type the portal serves, not only rasters. The body is written to
    /// `<path>.part` and moved into place once complete, so a failed download never leaves a
    /// truncated file at `path`.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let response = self.get(url).await?;
        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let reader = StreamReader::new(stream);
        tokio::pin!(reader);

        let partial = partial_path(path);
        let written = match write_all(&mut reader, &partial).await {
            Ok(written) => written,
            Err(e) => {
                warn!("Download of {} failed, removing {:?}", url, partial);
                if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Could not remove {:?}: {}", partial, remove_err);
                    }
                }
                return Err(FetchError::Download(path.to_path_buf(), e));
            }
        };
        tokio::fs::rename(&partial, path)
            .await
            .map_err(|e| FetchError::Download(path.to_path_buf(), e))?;

        info!("Saved {} bytes from {} to {:?}", written, url, path);
        Ok(written)
    }
}

async fn write_all<R>(reader: &mut R, path: &Path) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = tokio::fs::File::create(path).await?;
    let written = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    Ok(written)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/tmp/rainfall_2012_03.tif")),
            PathBuf::from("/tmp/rainfall_2012_03.tif.part")
        );
    }
}
