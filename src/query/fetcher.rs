//! Paginated download of a finished query's results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::athena::{QueryBackend, QueryHandle};
use crate::csv::CsvWriter;
use crate::error::{Result, WaflogsError};

/// Rows requested per page.
pub const DEFAULT_PAGE_SIZE: i32 = 1000;

/// Rows echoed to the preview sink per query.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// What a completed fetch wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchSummary {
    pub pages: usize,
    pub rows_written: usize,
    pub rows_previewed: usize,
}

/// Streams every result page of a query into a CSV file.
pub struct ResultFetcher<'a> {
    backend: &'a dyn QueryBackend,
    page_size: i32,
    preview_rows: usize,
}

impl<'a> ResultFetcher<'a> {
    pub fn new(backend: &'a dyn QueryBackend) -> Self {
        Self {
            backend,
            page_size: DEFAULT_PAGE_SIZE,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_preview_rows(mut self, preview_rows: usize) -> Self {
        self.preview_rows = preview_rows;
        self
    }

    /// Writes all result rows of `handle` to `destination`, truncating it.
    ///
    /// The first `preview_rows` rows also go to `preview`, which is flushed
    /// after each page. A failed page aborts the fetch and leaves the rows
    /// written so far in place.
    pub async fn fetch(
        &self,
        handle: &QueryHandle,
        destination: &Path,
        preview: &mut (dyn Write + Send),
    ) -> Result<FetchSummary> {
        let file = File::create(destination)
            .map_err(|e| WaflogsError::io("opening destination file", destination, e))?;
        let mut out = CsvWriter::new(BufWriter::new(file));
        let mut preview = CsvWriter::new(preview);

        let mut summary = FetchSummary::default();
        let mut token: Option<String> = None;

        loop {
            let page_index = summary.pages;
            let page = self
                .backend
                .result_page(handle, token.as_deref(), self.page_size)
                .await
                .map_err(|e| match e {
                    WaflogsError::PageFetch { message, .. } => WaflogsError::PageFetch {
                        page: page_index,
                        message,
                    },
                    other => WaflogsError::PageFetch {
                        page: page_index,
                        message: other.to_string(),
                    },
                })?;
            summary.pages += 1;

            for row in &page.rows {
                if summary.rows_previewed < self.preview_rows {
                    summary.rows_previewed += 1;
                    preview
                        .write_row(row)
                        .map_err(|e| WaflogsError::io("writing preview of", destination, e))?;
                }

                out.write_row(row)
                    .map_err(|e| WaflogsError::io("writing", destination, e))?;
                summary.rows_written += 1;
            }

            preview
                .flush()
                .map_err(|e| WaflogsError::io("flushing preview of", destination, e))?;

            debug!(
                query_id = %handle,
                page = page_index,
                rows = page.rows.len(),
                "Result page written"
            );

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        out.flush()
            .map_err(|e| WaflogsError::io("flushing", destination, e))?;

        Ok(summary)
    }
}
