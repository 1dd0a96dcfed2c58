// Copyright (c) The RoleVault QA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scratch files for upload scenarios.

use crate::{
    errors::{DisplayErrorChain, TestDataError},
    paths::ReportPaths,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    fs::{self, File},
    io::{self, Read},
};
use tracing::{debug, warn};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Characters appended to the base name by
/// [`TestDataFiles::create_file_with_special_chars_name`].
pub const SPECIAL_CHARS: &str = "@#$%^&()";

/// A file created by [`TestDataFiles::create_file_with_special_chars_name`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpecialCharsFile {
    /// The full path.
    pub path: Utf8PathBuf,

    /// The file name.
    pub file_name: String,
}

/// Creates and removes files in the test files directory.
#[derive(Clone, Debug)]
pub struct TestDataFiles {
    dir: Utf8PathBuf,
}

impl TestDataFiles {
    /// Creates a handle over `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a handle over the test files directory under `paths`' root.
    pub fn from_paths(paths: &ReportPaths) -> Self {
        Self::new(paths.test_files_dir())
    }

    /// The test files directory.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Creates a file of `size_mb` megabytes filled with `A`.
    pub fn create_file_with_size(
        &self,
        file_name: &str,
        size_mb: u64,
    ) -> Result<Utf8PathBuf, TestDataError> {
        let path = self.prepare(file_name)?;
        let write = || -> io::Result<()> {
            let mut file = File::create(&path)?;
            io::copy(
                &mut io::repeat(b'A').take(size_mb * BYTES_PER_MB),
                &mut file,
            )?;
            file.sync_all()
        };
        write().map_err(|error| TestDataError::Write {
            path: path.clone(),
            error,
        })?;
        debug!("created {size_mb} MB test file `{path}`");
        Ok(path)
    }

    /// Creates a file with the given contents.
    pub fn create_text_file(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<Utf8PathBuf, TestDataError> {
        let path = self.prepare(file_name)?;
        fs::write(&path, content).map_err(|error| TestDataError::Write {
            path: path.clone(),
            error,
        })?;
        Ok(path)
    }

    /// Creates a zero-byte file.
    pub fn create_empty_file(&self, file_name: &str) -> Result<Utf8PathBuf, TestDataError> {
        self.create_text_file(file_name, "")
    }

    /// Creates `<base><SPECIAL_CHARS>.<extension>` with some sample content.
    pub fn create_file_with_special_chars_name(
        &self,
        base_name: &str,
        extension: &str,
    ) -> Result<SpecialCharsFile, TestDataError> {
        let file_name = format!("{base_name}{SPECIAL_CHARS}.{extension}");
        let path = self.create_text_file(&file_name, "Sample content")?;
        Ok(SpecialCharsFile { path, file_name })
    }

    /// Removes every file in the directory.
    ///
    /// Best effort: files that cannot be removed are logged and skipped, and
    /// files removed concurrently by another worker are ignored. Returns the
    /// number of files removed.
    pub fn cleanup(&self) -> usize {
        let entries = match self.dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return 0,
            Err(error) => {
                warn!("could not list test files in `{}`: {error}", self.dir);
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => {
                    let error = TestDataError::Remove {
                        path: path.to_owned(),
                        error,
                    };
                    warn!(
                        "could not delete test file: {}",
                        DisplayErrorChain::new(&error)
                    );
                }
            }
        }
        removed
    }

    /// The path a test file with this name would have.
    pub fn path(&self, file_name: &str) -> Utf8PathBuf {
        self.dir.join(file_name)
    }

    /// Returns true if a test file with this name exists.
    pub fn exists(&self, file_name: &str) -> bool {
        self.path(file_name).exists()
    }

    fn prepare(&self, file_name: &str) -> Result<Utf8PathBuf, TestDataError> {
        fs::create_dir_all(&self.dir).map_err(|error| TestDataError::CreateDir {
            dir: self.dir.clone(),
            error,
        })?;
        Ok(self.path(file_name))
    }
}
