use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("metrics registration error: {0}")]
    Registration(#[from] prometheus::Error),

    #[error("tracing init error: {0}")]
    TracingInit(String),
}

pub type Result<T> = std::result::Result<T, Error>;
