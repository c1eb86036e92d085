//! Maps (bucket id, object id) to on-disk locations and vets stored paths.
//!
//! Layout: `<data_root>/buckets/<bucket_id>/objects/<object_id>`. The filename
//! is the store-assigned object id and never depends on the object key.

use std::path::{Component, Path, PathBuf};

#[derive(Clone, Debug)]
pub struct PathResolver {
    data_root: PathBuf,
}

impl PathResolver {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// `<data_root>/buckets/<bucket_id>`
    pub fn bucket_dir(&self, bucket_id: i64) -> PathBuf {
        let mut path = self.data_root.join("buckets");
        path.push(bucket_id.to_string());
        path
    }

    /// `<data_root>/buckets/<bucket_id>/objects`
    pub fn objects_dir(&self, bucket_id: i64) -> PathBuf {
        self.bucket_dir(bucket_id).join("objects")
    }

    /// Canonical content path for an object.
    pub fn object_path(&self, bucket_id: i64, object_id: i64) -> PathBuf {
        self.objects_dir(bucket_id).join(object_id.to_string())
    }

    /// Check that `stored` names a file inside the bucket's objects directory.
    ///
    /// Both sides are normalized lexically, so `..` segments cannot climb out
    /// and no filesystem access happens. Returns the normalized path on success.
    pub fn validate(&self, stored: &str, bucket_id: i64) -> Option<PathBuf> {
        if stored.is_empty() {
            return None;
        }
        let prefix = normalize_lexically(&self.objects_dir(bucket_id));
        let candidate = normalize_lexically(Path::new(stored));
        (candidate.starts_with(&prefix) && candidate != prefix).then_some(candidate)
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
