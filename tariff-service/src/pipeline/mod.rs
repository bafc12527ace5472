use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};
use tariff_domain::AggregateError;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    /// 1-based data row number within the upload.
    pub row: usize,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T, row: usize) -> Self {
        Self {
            payload,
            row,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TariffError {
    #[error("missing required column '{0}'")]
    Schema(String),
    #[error("row {row}: {message}")]
    Parse { row: usize, message: String },
    #[error("row {row}: {message}")]
    Coercion { row: usize, message: String },
    #[error("no valid readings in upload")]
    EmptyResult,
    #[error("unknown CSV layout '{0}'")]
    UnknownLayout(String),
    #[error("invalid layout '{layout}': {message}")]
    Layout { layout: String, message: String },
    #[error("source error: {0}")]
    Source(String),
    #[error("chart rendering failed: {0}")]
    Chart(String),
    #[error("chart '{0}' not found")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TariffError {
    /// Row-level errors drop a single row; everything else aborts the upload.
    pub fn is_row_level(&self) -> bool {
        matches!(self, TariffError::Parse { .. } | TariffError::Coercion { .. })
    }
}

impl From<AggregateError> for TariffError {
    fn from(e: AggregateError) -> Self {
        match e {
            AggregateError::EmptyResult => TariffError::EmptyResult,
        }
    }
}

pub type ReadingStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, TariffError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> ReadingStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, TariffError>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    type Output: Send;

    async fn run<S>(&self, input: S) -> Result<Self::Output, TariffError>
    where
        S: Stream<Item = Result<Envelope<T>, TariffError>> + Send + Unpin + 'static;
}

pub struct Pipeline<S, T, K> {
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>, // same-type transforms chain
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<K::Output, TariffError> {
        let mut stream = self.source.stream().await;

        // Apply transforms in sequence (if any).
        for t in self.transforms {
            let t_arc = t.clone();
            stream = Box::pin(stream.then(move |item| {
                let t_inner = t_arc.clone();
                async move {
                    match item {
                        Ok(env) => t_inner.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        self.sink.run(stream).await
    }
}
