// ジョブ状態のJSONスナップショット（ラスタは含まない）

use serde::{Deserialize, Serialize};

use crate::pipeline::job_runner::{DocumentJob, JobStatus, PageResult, PageStatus};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a [`DocumentJob`] without rasters.
///
/// Cleaned rasters are stored separately as PNG under `file-<id>.p<index>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub version: u32,
    pub id: String,
    pub name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub pages: Vec<PageSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub index: u32,
    pub status: PageStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub removed_pixels: usize,
}

impl JobSnapshot {
    pub fn of(job: &DocumentJob) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: job.id.clone(),
            name: job.name.clone(),
            status: job.status,
            error: job.error.clone(),
            completed: job.completed,
            total: job.total,
            pages: job
                .pages
                .iter()
                .map(|p| PageSnapshot {
                    index: p.index,
                    status: p.status,
                    error: p.error.clone(),
                    removed_pixels: p.removed_pixels,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> crate::error::Result<Self> {
        let snapshot: Self = serde_json::from_slice(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(crate::error::InkScrubError::persistence(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Rebuild a job shell. Rasters of done pages must be restored by the
    /// caller; a page that was mid-processing goes back to pending.
    pub fn into_job(self) -> DocumentJob {
        let pages = self
            .pages
            .into_iter()
            .map(|p| PageResult {
                index: p.index,
                raster: None,
                status: match p.status {
                    PageStatus::Processing => PageStatus::Pending,
                    other => other,
                },
                error: p.error,
                removed_pixels: p.removed_pixels,
            })
            .collect();
        DocumentJob {
            id: self.id,
            name: self.name,
            pages,
            completed: self.completed,
            total: self.total,
            status: match self.status {
                JobStatus::Processing => JobStatus::Pending,
                other => other,
            },
            error: self.error,
            cancelled: false,
        }
    }
}
