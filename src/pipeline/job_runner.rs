// ジョブ単位: ページを順番に処理し、進捗と状態を記録・永続化する

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::InkScrubError;
use crate::pdf::writer::build_document;
use crate::pipeline::page_processor::process_page;
use crate::render::encode::{OutputFormat, decode_png, encode_page, encode_png};
use crate::render::rasterizer::Rasterizer;
use crate::render::{PageSource, PixelBuffer};
use crate::session::snapshot::JobSnapshot;
use crate::session::{SessionStore, file_key, page_key, state_key};
use crate::tuning::resolver::TuningResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// Outcome for one page. A failed page never keeps a partial raster.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub index: u32,
    pub raster: Option<PixelBuffer>,
    pub status: PageStatus,
    pub error: Option<String>,
    pub removed_pixels: usize,
}

impl PageResult {
    pub fn pending(index: u32) -> Self {
        Self {
            index,
            raster: None,
            status: PageStatus::Pending,
            error: None,
            removed_pixels: 0,
        }
    }
}

/// One document's batch state.
#[derive(Debug, Clone)]
pub struct DocumentJob {
    pub id: String,
    pub name: String,
    pub pages: Vec<PageResult>,
    pub completed: usize,
    pub total: usize,
    pub status: JobStatus,
    pub error: Option<String>,
    pub cancelled: bool,
}

impl DocumentJob {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            pages: Vec::new(),
            completed: 0,
            total: 0,
            status: JobStatus::Pending,
            error: None,
            cancelled: false,
        }
    }

    /// Job keyed by the source's identity.
    pub fn for_source(source: &dyn PageSource, name: impl Into<String>) -> Self {
        Self::new(source.identity(), name)
    }

    /// ページと進捗を初期化し、処理中状態にする。
    pub fn start(&mut self, total: usize) {
        self.pages = (0..total as u32).map(PageResult::pending).collect();
        self.completed = 0;
        self.total = total;
        self.status = JobStatus::Processing;
        self.error = None;
        self.cancelled = false;
    }

    /// Back to a fresh pending job with no pages.
    pub fn reset(&mut self) {
        self.pages.clear();
        self.completed = 0;
        self.total = 0;
        self.status = JobStatus::Pending;
        self.error = None;
        self.cancelled = false;
    }

    pub fn progress(&self) -> (usize, usize) {
        (self.completed, self.total)
    }

    /// Index of the first page that is not done.
    pub fn first_unfinished(&self) -> Option<usize> {
        self.pages.iter().position(|p| p.status != PageStatus::Done)
    }

    /// Cleaned rasters in page order. `None` unless every page is done.
    pub fn cleaned_pages(&self) -> Option<Vec<&PixelBuffer>> {
        self.pages
            .iter()
            .map(|p| match p.status {
                PageStatus::Done => p.raster.as_ref(),
                _ => None,
            })
            .collect()
    }

    fn fail_page(&mut self, position: usize, message: String) {
        if let Some(page) = self.pages.get_mut(position) {
            page.status = PageStatus::Failed;
            page.raster = None;
            page.error = Some(message.clone());
        }
        self.status = JobStatus::Failed;
        self.error = Some(message);
    }

    fn mark_cancelled(&mut self) {
        self.cancelled = true;
        self.status = JobStatus::Cancelled;
    }
}

/// Drives every page of one document through [`process_page`].
///
/// The runner borrows the batch's rasterizer, resolver and optional store, and
/// uses one working scale for all pages.
pub struct JobRunner<'a> {
    pub rasterizer: &'a mut Rasterizer,
    pub resolver: &'a TuningResolver,
    pub store: Option<&'a dyn SessionStore>,
    pub scale: f32,
}

impl JobRunner<'_> {
    /// Process every page from the first.
    ///
    /// Page failures never escape: they end the job in `failed` with the
    /// error message, keeping the pages completed before them.
    pub fn run(&mut self, job: &mut DocumentJob, source: &dyn PageSource, token: &CancellationToken) {
        let total = match source.page_count() {
            Ok(n) => n as usize,
            Err(e) => {
                job.start(0);
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
                self.persist_snapshot(job);
                return;
            }
        };

        job.start(total);
        if let Some(bytes) = source.source_bytes() {
            self.persist(&file_key(&job.id), bytes);
        }
        self.persist_snapshot(job);
        self.run_from(job, source, 0, token);
    }

    /// Continue a restored job from its first non-done page.
    ///
    /// Falls back to [`run`](Self::run) when the job's page layout no longer
    /// matches the source.
    pub fn resume(
        &mut self,
        job: &mut DocumentJob,
        source: &dyn PageSource,
        token: &CancellationToken,
    ) {
        let matches_source = source
            .page_count()
            .is_ok_and(|n| n as usize == job.total && job.pages.len() == job.total);
        if !matches_source || job.total == 0 {
            self.run(job, source, token);
            return;
        }

        let Some(start) = job.first_unfinished() else {
            job.status = JobStatus::Done;
            job.error = None;
            self.persist_snapshot(job);
            return;
        };

        for page in &mut job.pages[start..] {
            *page = PageResult::pending(page.index);
        }
        job.completed = start;
        job.status = JobStatus::Processing;
        job.error = None;
        job.cancelled = false;
        debug!(job = %job.name, from_page = start, "resuming job");
        self.run_from(job, source, start, token);
    }

    fn run_from(
        &mut self,
        job: &mut DocumentJob,
        source: &dyn PageSource,
        start: usize,
        token: &CancellationToken,
    ) {
        for position in start..job.total {
            if token.is_cancelled() {
                job.mark_cancelled();
                self.persist_snapshot(job);
                return;
            }

            let index = job.pages[position].index;
            job.pages[position].status = PageStatus::Processing;

            let result = process_page(self.rasterizer, source, self.resolver, index, self.scale);

            // キャンセル後の結果は破棄する
            if token.is_cancelled() {
                job.pages[position].status = PageStatus::Pending;
                job.mark_cancelled();
                self.persist_snapshot(job);
                return;
            }

            match result {
                Ok(page) => {
                    debug!(
                        job = %job.name,
                        page = index,
                        removed_pixels = page.removed_pixels,
                        "page cleaned"
                    );
                    self.persist_page(&job.id, index, &page.raster);
                    let slot = &mut job.pages[position];
                    slot.status = PageStatus::Done;
                    slot.removed_pixels = page.removed_pixels;
                    slot.error = None;
                    slot.raster = Some(page.raster);
                    job.completed += 1;
                    self.persist_snapshot(job);
                }
                Err(e) => {
                    warn!(job = %job.name, page = index, error = %e, "page failed");
                    job.fail_page(position, e.to_string());
                    self.persist_snapshot(job);
                    return;
                }
            }
        }

        job.status = JobStatus::Done;
        info!(job = %job.name, pages = job.total, "job done");
        self.persist_snapshot(job);
    }

    fn persist_snapshot(&self, job: &DocumentJob) {
        if self.store.is_none() {
            return;
        }
        match JobSnapshot::of(job).to_json() {
            Ok(json) => self.persist(&state_key(&job.id), &json),
            Err(e) => warn!(job = %job.name, error = %e, "failed to serialize job snapshot"),
        }
    }

    fn persist_page(&self, id: &str, index: u32, raster: &PixelBuffer) {
        if self.store.is_none() {
            return;
        }
        match encode_png(raster) {
            Ok(png) => self.persist(&page_key(id, index), &png),
            Err(e) => warn!(page = index, error = %e, "failed to encode page for the session store"),
        }
    }

    /// 永続化の失敗はログに残して無視する。
    fn persist(&self, key: &str, value: &[u8]) {
        if let Some(store) = self.store
            && let Err(e) = store.set(key, value)
        {
            warn!(key, error = %e, "session store write failed");
        }
    }
}

/// Restore a job from the store.
///
/// Done pages get their cleaned rasters back from `file-<id>.p<index>`; a
/// done page whose raster is missing or unreadable is demoted to pending.
pub fn restore_job(
    store: &dyn SessionStore,
    id: &str,
    scale: f32,
) -> crate::error::Result<Option<DocumentJob>> {
    let Some(bytes) = store.get(&state_key(id))? else {
        return Ok(None);
    };
    let mut job = JobSnapshot::from_json(&bytes)?.into_job();

    for page in &mut job.pages {
        if page.status != PageStatus::Done {
            page.raster = None;
            continue;
        }
        let raster = store
            .get(&page_key(id, page.index))
            .ok()
            .flatten()
            .and_then(|png| decode_png(&png, scale).ok());
        match raster {
            Some(raster) => page.raster = Some(raster),
            None => {
                debug!(page = page.index, "stored page raster missing, page will be redone");
                *page = PageResult::pending(page.index);
            }
        }
    }
    job.completed = job
        .pages
        .iter()
        .filter(|p| p.status == PageStatus::Done)
        .count();
    if job.status == JobStatus::Done && job.completed != job.total {
        job.status = JobStatus::Pending;
    }
    Ok(Some(job))
}

/// Document bytes saved under `file-<id>` for the job named `name`.
///
/// Lets a resumed session continue when the input file is no longer at its
/// original path. Unreadable snapshots are skipped.
pub fn stored_document(
    store: &dyn SessionStore,
    name: &str,
) -> crate::error::Result<Option<Vec<u8>>> {
    for id in store.list_ids()? {
        let Some(bytes) = store.get(&state_key(&id))? else {
            continue;
        };
        match JobSnapshot::from_json(&bytes) {
            Ok(snapshot) if snapshot.name == name => return store.get(&file_key(&id)),
            Ok(_) => {}
            Err(e) => debug!(id = %id, error = %e, "skipping unreadable job snapshot"),
        }
    }
    Ok(None)
}

/// Build the output PDF from a done job's cleaned pages.
///
/// # Errors
/// Returns `InkScrubError::BatchError` unless the job is done with every
/// page raster present, and propagates encode and PDF write errors.
pub fn assemble(
    job: &DocumentJob,
    format: OutputFormat,
    jpeg_quality: u8,
) -> crate::error::Result<Vec<u8>> {
    if job.status != JobStatus::Done {
        return Err(InkScrubError::batch(format!(
            "job '{}' is {:?}, only done jobs can be assembled",
            job.name, job.status
        )));
    }
    let pages = job.cleaned_pages().ok_or_else(|| {
        InkScrubError::batch(format!("job '{}' is missing cleaned pages", job.name))
    })?;

    let encoded = pages
        .into_iter()
        .map(|raster| encode_page(raster, format, jpeg_quality))
        .collect::<crate::error::Result<Vec<_>>>()?;
    build_document(&encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_resets_pages_and_counters() {
        let mut job = DocumentJob::new("abc", "doc.pdf");
        job.error = Some("old".into());
        job.start(3);
        assert_eq!(job.pages.len(), 3);
        assert!(job.pages.iter().all(|p| p.status == PageStatus::Pending));
        assert_eq!(job.progress(), (0, 3));
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.error.is_none());
    }

    #[test]
    fn test_cleaned_pages_requires_every_page_done() {
        let mut job = DocumentJob::new("abc", "doc.pdf");
        job.start(2);
        job.pages[0].status = PageStatus::Done;
        job.pages[0].raster = Some(PixelBuffer::filled(1, 1, [0, 0, 0, 255], 1.0));
        assert!(job.cleaned_pages().is_none());
    }

    #[test]
    fn test_assemble_rejects_unfinished_job() {
        let job = DocumentJob::new("abc", "doc.pdf");
        assert!(matches!(
            assemble(&job, OutputFormat::Png, 85),
            Err(InkScrubError::BatchError(_))
        ));
    }
}
