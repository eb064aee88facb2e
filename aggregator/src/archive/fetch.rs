//! Image download for archive assembly

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;

use crate::error::ImageFetchError;

/// Raw image bytes with the content type declared by the host
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Retrieves image bytes by URL
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageFetchError>;
}

/// Fetches over HTTP; `data:` URLs are decoded in place
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageFetchError> {
        if url.starts_with("data:") {
            return decode_data_url(url);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?.to_vec();

        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// Decode a base64 `data:<mime>;base64,<payload>` URL
pub fn decode_data_url(url: &str) -> Result<FetchedImage, ImageFetchError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| ImageFetchError::InvalidDataUrl("missing data: prefix".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ImageFetchError::InvalidDataUrl("missing payload".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| ImageFetchError::InvalidDataUrl("only base64 payloads are supported".into()))?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| ImageFetchError::InvalidDataUrl(e.to_string()))?;

    Ok(FetchedImage {
        bytes,
        content_type: (!mime.is_empty()).then(|| mime.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_data_url() {
        let image = decode_data_url("data:image/png;base64,iVBORw0K").unwrap();
        assert_eq!(image.content_type.as_deref(), Some("image/png"));
        assert_eq!(&image.bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_decode_data_url_rejects_bad_input() {
        assert!(matches!(
            decode_data_url("data:image/png,plain"),
            Err(ImageFetchError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(ImageFetchError::InvalidDataUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_http_fetcher_decodes_inline_images_without_network() {
        let fetcher = HttpImageFetcher::new(Client::new());
        let image = fetcher.fetch("data:image/jpeg;base64,QUJD").await.unwrap();
        assert_eq!(image.bytes, b"ABC");
        assert_eq!(image.content_type.as_deref(), Some("image/jpeg"));
    }
}
