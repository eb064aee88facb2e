//! Case image aggregation
//!
//! Searches many subjects at once against a paginated image source,
//! remembers how far each subject has been paged so "load more" resumes
//! where it stopped, merges every batch into cumulative per-subject results
//! and packs a subject's images into a ZIP archive.
//!
//! The image source is pluggable: a paginated image search API or a
//! generation API that synthesizes images from generated descriptions.

pub mod archive;
pub mod config;
pub mod error;
pub mod merger;
pub mod orchestrator;
pub mod pacing;
pub mod paginator;
pub mod providers;
pub mod session;
pub mod types;

pub use archive::{ArchiveAssembler, ArchiveBundle, ArchiveReport};
pub use config::Config;
pub use error::{ProviderError, SessionError, SessionResult, ValidationError};
pub use merger::{merge, FailedTerm, MergeOutput};
pub use orchestrator::{SearchBatch, SearchOrchestrator};
pub use paginator::{PageLimits, Paginator, TermPage};
pub use providers::ImageSourceProvider;
pub use session::{ArchiveSummary, SearchReport, SearchRequest, SearchSession, SessionSettings};
pub use types::{
    CaseResult, ImageRecord, Language, OffsetTable, PageResult, SearchFilters, SearchTerm,
    TermOutcome, TermResult,
};
