//! Streaming scans.

use std::sync::Arc;

use common::{Record, RecordIterator};
use futures::Stream;

use crate::codec::decode;
use crate::error::{Error, Result};
use crate::model::Document;
use crate::registry::ModelDefinition;

/// Adapts a store iterator into a stream of records.
///
/// The stream ends after the first error.
pub(crate) fn record_stream(
    iter: Box<dyn RecordIterator + Send + 'static>,
) -> impl Stream<Item = Result<Record>> + Send + 'static {
    futures::stream::try_unfold(iter, |mut iter| async move {
        match iter.next().await {
            Ok(Some(record)) => Ok(Some((record, iter))),
            Ok(None) => Ok(None),
            Err(e) => Err(Error::from(e)),
        }
    })
}

/// Iterator over the documents matched by a scan.
///
/// Records are decoded one at a time. Dropping the iterator abandons the scan.
pub struct DocumentIterator {
    inner: Option<Box<dyn RecordIterator + Send + 'static>>,
    model: Arc<ModelDefinition>,
}

impl DocumentIterator {
    pub(crate) fn new(
        inner: Box<dyn RecordIterator + Send + 'static>,
        model: Arc<ModelDefinition>,
    ) -> Self {
        Self {
            inner: Some(inner),
            model,
        }
    }

    /// Returns the next document, or None once the scan is complete.
    ///
    /// After an error the iterator is exhausted.
    pub async fn next(&mut self) -> Result<Option<Document>> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(None);
        };
        match inner.next().await {
            Ok(Some(record)) => Ok(Some(decode(&self.model, record.bins, &record.key))),
            Ok(None) => {
                self.inner = None;
                Ok(None)
            }
            Err(e) => {
                self.inner = None;
                Err(e.into())
            }
        }
    }

    /// Drains the remaining documents.
    pub async fn collect(mut self) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        while let Some(doc) = self.next().await? {
            docs.push(doc);
        }
        Ok(docs)
    }
}
