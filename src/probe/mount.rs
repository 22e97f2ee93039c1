use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use tokio::fs;

use crate::types::MonitorError;

use super::MountState;

/// A directory is a mount point when it sits on a different device than its
/// parent, or when it is its own parent (`/`). Only a real directory can be
/// a mount point; a missing path is reported as not mounted.
pub(super) async fn mount_state(path: &Path) -> Result<MountState, MonitorError> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(MountState::NotMounted),
        Err(err) => {
            return Err(MonitorError::MountCheckFailed(format!(
                "{}: {err}",
                path.display()
            )))
        }
    };
    if !meta.is_dir() {
        return Ok(MountState::NotMounted);
    }

    let parent = fs::symlink_metadata(path.join(".."))
        .await
        .map_err(|err| MonitorError::MountCheckFailed(format!("{}/..: {err}", path.display())))?;

    if meta.dev() != parent.dev() || meta.ino() == parent.ino() {
        Ok(MountState::Mounted)
    } else {
        Ok(MountState::NotMounted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_is_a_mount_point() {
        assert_eq!(mount_state(Path::new("/")).await.unwrap(), MountState::Mounted);
    }

    #[tokio::test]
    async fn plain_directory_is_not_mounted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("disk");
        std::fs::create_dir(&nested).unwrap();
        assert_eq!(mount_state(&nested).await.unwrap(), MountState::NotMounted);
    }

    #[tokio::test]
    async fn regular_file_is_not_mounted() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(mount_state(file.path()).await.unwrap(), MountState::NotMounted);
    }

    #[tokio::test]
    async fn missing_path_is_not_mounted() {
        let state = mount_state(Path::new("/definitely/not/mounted")).await.unwrap();
        assert_eq!(state, MountState::NotMounted);
    }
}
