//! Sequential pagination over a job's result set.

use futures_util::stream::{self, Stream, TryStreamExt};

use crate::error::OcrError;
use crate::model::{JobId, ResultPage};
use crate::ocr::OcrService;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Lazily fetches every result page of `job_id`, in service order.
///
/// Each request carries the previous page's continuation token. The stream
/// ends only when a page has no (or an empty) token; an empty page with a
/// token is not the end. Asking for more than `max_pages` pages fails with
/// [`OcrError::PageLimitExceeded`].
pub fn result_pages<'a>(
    ocr: &'a dyn OcrService,
    job_id: &'a JobId,
    max_pages: usize,
) -> impl Stream<Item = Result<ResultPage, OcrError>> + Send + 'a {
    stream::try_unfold((Cursor::Start, 0usize), move |(cursor, fetched)| async move {
        let token = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
        };

        if fetched >= max_pages {
            return Err(OcrError::PageLimitExceeded {
                job_id: job_id.clone(),
                limit: max_pages,
            });
        }

        let page = ocr.get_result_page(job_id, token.as_deref()).await?;
        let next = match page.continuation() {
            Some(token) => Cursor::Next(token.to_string()),
            None => Cursor::Done,
        };
        Ok(Some((page, (next, fetched + 1))))
    })
}

/// Text assembled from a complete result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledText {
    pub text: String,
    pub lines: usize,
    pub pages: usize,
}

/// Joins the line blocks of every page with `\n`. Any page error aborts.
pub async fn assemble_text<S>(pages: S) -> Result<AssembledText, OcrError>
where
    S: Stream<Item = Result<ResultPage, OcrError>>,
{
    futures_util::pin_mut!(pages);

    let mut lines: Vec<String> = Vec::new();
    let mut page_count = 0;
    while let Some(page) = pages.try_next().await? {
        page_count += 1;
        lines.extend(page.lines().map(str::to_string));
    }

    Ok(AssembledText {
        lines: lines.len(),
        text: lines.join("\n"),
        pages: page_count,
    })
}
