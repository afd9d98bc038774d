use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::app::ports::{Artifact, ArtifactOutputPort, ArtifactTarget};
use crate::error::Result;

/// File-based implementation of ArtifactOutputPort.
///
/// Publishing runs in two phases. Every artifact is first written to a hidden
/// temporary sibling; if any write fails, the temporaries are removed and no
/// published file changes. Only then is each temporary renamed into place, in
/// input order, so the manifest (last) is replaced last. A rename failure in
/// the second phase can still leave earlier files from the new run next to
/// later files from the previous one; the manifest's run id then names the
/// last complete run.
pub struct FsArtifactOutputAdapter {
    curated_dir: PathBuf,
    analytics_dir: PathBuf,
    dictionaries_dir: PathBuf,
}

impl FsArtifactOutputAdapter {
    pub fn new(
        curated_dir: impl Into<PathBuf>,
        analytics_dir: impl Into<PathBuf>,
        dictionaries_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            curated_dir: curated_dir.into(),
            analytics_dir: analytics_dir.into(),
            dictionaries_dir: dictionaries_dir.into(),
        }
    }

    pub fn dir_for(&self, target: ArtifactTarget) -> &Path {
        match target {
            ArtifactTarget::Curated => &self.curated_dir,
            ArtifactTarget::Analytics => &self.analytics_dir,
            ArtifactTarget::Dictionaries => &self.dictionaries_dir,
        }
    }
}

impl FsArtifactOutputAdapter {
    /// Write one artifact to its temporary path. Returns (temporary, final).
    async fn stage(&self, artifact: &Artifact) -> Result<(PathBuf, PathBuf)> {
        let dir = self.dir_for(artifact.target);
        tokio::fs::create_dir_all(dir).await?;

        let final_path = dir.join(artifact.file_name);
        let tmp_path = dir.join(format!(".{}.tmp", artifact.file_name));
        tokio::fs::write(&tmp_path, &artifact.bytes).await?;
        debug!("Staged {} bytes for {}", artifact.bytes.len(), final_path.display());
        Ok((tmp_path, final_path))
    }
}

#[async_trait]
impl ArtifactOutputPort for FsArtifactOutputAdapter {
    async fn publish(&self, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            match self.stage(artifact).await {
                Ok(paths) => staged.push(paths),
                Err(e) => {
                    warn!(
                        "Staging {} failed, discarding {} staged files",
                        artifact.file_name,
                        staged.len()
                    );
                    for (tmp_path, _) in &staged {
                        let _ = tokio::fs::remove_file(tmp_path).await;
                    }
                    return Err(e);
                }
            }
        }

        let mut published = Vec::with_capacity(staged.len());
        for (tmp_path, final_path) in staged {
            tokio::fs::rename(&tmp_path, &final_path).await?;
            published.push(final_path);
        }
        info!("Published {} artifacts", published.len());
        Ok(published)
    }
}
