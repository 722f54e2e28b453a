use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrollError {
    #[error("scroll acknowledged with no outstanding remote scroll request")]
    UnexpectedAck,
    #[error("remote content is already attached")]
    AlreadyRemote,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewportError {
    #[error("no pages are loaded")]
    NoPages,
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("no saved zoom state exists")]
    NoSavedZoomState,
    #[error("zoom factor list must not be empty")]
    EmptyZoomFactors,
    #[error("invalid zoom factors: {0}")]
    InvalidZoomFactors(&'static str),
    #[error(transparent)]
    Scroll(#[from] ScrollError),
}

pub type Result<T> = std::result::Result<T, ViewportError>;
