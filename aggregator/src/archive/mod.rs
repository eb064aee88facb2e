//! Archive assembly
//!
//! Downloads a term's images one after another, falling back to the
//! thumbnail when the full image cannot be fetched, and compresses whatever
//! succeeded into a single ZIP. Individual download failures are counted,
//! never raised.

use std::io::{Cursor, Write};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::ArchiveError;
use crate::pacing::Pacer;
use crate::types::{ImageRecord, SearchTerm};

pub mod fetch;
pub mod naming;

pub use fetch::{FetchedImage, HttpImageFetcher, ImageFetcher};

/// The compressed archive produced for a term
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveBundle {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Entry names in archive order
    pub entries: Vec<String>,
}

/// Counts of an archive run and the bundle, if anything succeeded
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveReport {
    pub succeeded: usize,
    pub failed: usize,
    pub bundle: Option<ArchiveBundle>,
}

impl ArchiveReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Builds ZIP archives from image records
pub struct ArchiveAssembler {
    fetcher: Arc<dyn ImageFetcher>,
    pacer: Arc<dyn Pacer>,
    compression_level: i64,
}

impl ArchiveAssembler {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, pacer: Arc<dyn Pacer>, compression_level: i64) -> Self {
        Self {
            fetcher,
            pacer,
            compression_level,
        }
    }

    /// Fetch every image of `term` and compress the successes
    #[instrument(skip(self, images), fields(term = %term, images = images.len()))]
    pub async fn build_archive(
        &self,
        term: &SearchTerm,
        images: &[ImageRecord],
    ) -> Result<ArchiveReport, ArchiveError> {
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
        let mut failed = 0;

        for (i, image) in images.iter().enumerate() {
            if i > 0 {
                self.pacer.pause().await;
            }

            match self.fetch_with_fallback(image).await {
                Some(fetched) => {
                    let name = naming::entry_name(
                        i + 1,
                        image.title.as_deref(),
                        fetched.content_type.as_deref(),
                    );
                    debug!(%name, bytes = fetched.bytes.len(), "fetched image");
                    entries.push((name, fetched.bytes));
                }
                None => failed += 1,
            }
        }

        let succeeded = entries.len();
        if succeeded == 0 {
            warn!("No images could be downloaded");
            return Ok(ArchiveReport {
                succeeded,
                failed,
                bundle: None,
            });
        }

        let file_name = naming::archive_file_name(term, succeeded, images.len());
        let bytes = self.compress(&entries)?;
        info!("Built {} ({} of {} images)", file_name, succeeded, images.len());

        Ok(ArchiveReport {
            succeeded,
            failed,
            bundle: Some(ArchiveBundle {
                file_name,
                bytes,
                entries: entries.into_iter().map(|(name, _)| name).collect(),
            }),
        })
    }

    async fn fetch_with_fallback(&self, image: &ImageRecord) -> Option<FetchedImage> {
        let err = match self.fetcher.fetch(&image.image_url).await {
            Ok(fetched) => return Some(fetched),
            Err(e) => e,
        };

        let Some(thumbnail) = image.thumbnail_url.as_deref() else {
            warn!(id = %image.id, error = %err, "image download failed");
            return None;
        };

        debug!(id = %image.id, error = %err, "falling back to thumbnail");
        match self.fetcher.fetch(thumbnail).await {
            Ok(fetched) => Some(fetched),
            Err(e) => {
                warn!(id = %image.id, error = %e, "image and thumbnail download failed");
                None
            }
        }
    }

    fn compress(&self, entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ArchiveError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));

        for (name, bytes) in entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        Ok(zip.finish()?.into_inner())
    }
}
