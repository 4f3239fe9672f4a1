// Copyright 2016 LambdaStack All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! File-system utilities for `fGet`/`fPut`. [`FileSystem`] is that interface; [`StdFileSystem`] is
//! the default, backed directly by `std::fs`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub trait FileSystem: Send + Sync {
    fn create_parent_dirs(&self, path: &Path) -> io::Result<()>;
    fn open_read(&self, path: &Path) -> io::Result<File>;
    /// Opens `path` for append, creating it if absent; used for `fGet`
    /// resume.
    fn open_append(&self, path: &Path) -> io::Result<File>;
    fn file_len(&self, path: &Path) -> io::Result<u64>;
    fn exists(&self, path: &Path) -> bool;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn create_parent_dirs(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn open_read(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    fn open_append(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn file_len(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// The resume-artifact path `{filePath}.{etag}.part`.
pub fn part_file_path(file_path: &Path, etag: &str) -> PathBuf {
    let mut name = file_path.as_os_str().to_os_string();
    name.push(format!(".{}.part", etag));
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_file_path_appends_etag_suffix() {
        let p = part_file_path(Path::new("/tmp/out.bin"), "abc123");
        assert_eq!(p, PathBuf::from("/tmp/out.bin.abc123.part"));
    }

    #[test]
    fn std_file_system_round_trips_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("file.txt");
        let fs_impl = StdFileSystem;
        fs_impl.create_parent_dirs(&path).unwrap();
        {
            use std::io::Write;
            let mut f = fs_impl.open_append(&path).unwrap();
            f.write_all(b"hello").unwrap();
        }
        assert_eq!(fs_impl.file_len(&path).unwrap(), 5);
        assert!(fs_impl.exists(&path));
    }
}
