//! Utilities pertaining to filesystem and other os-level settings
//!

use camino::Utf8Path;
use simple_error::{SimpleResult, try_with};

/// Create a novel directory path if it does not exist already
///
/// If the directory already exists no operations are performed
///
/// * `label` - used to describe the directory in an error message
///
pub fn create_dir_all(dir: &Utf8Path, label: &str) -> SimpleResult<()> {
    if !dir.is_dir() {
        try_with!(
            std::fs::create_dir_all(dir),
            "Can't create new {label} directory at '{dir}'"
        );
    }
    Ok(())
}

/// Attempt to increase open file limit to the system's hard limit on *nix-like systems
///
/// Every confirmation task holds three indexed alignment readers and two fasta index readers open
/// at once. This is an optional increase so continue through all failure cases without error.
///
pub fn attempt_max_open_file_limit() {
    use rlimit::Resource;

    let (soft, hard) = match Resource::NOFILE.get() {
        Ok(x) => x,
        Err(_) => return,
    };

    if soft < hard {
        rlimit::setrlimit(Resource::NOFILE, hard, hard).unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dir_all() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = camino::Utf8PathBuf::from_path_buf(tmp.path().join("a").join("b")).unwrap();
        create_dir_all(&dir, "test").unwrap();
        assert!(dir.is_dir());

        // Repeat call on an existing directory is a no-op
        create_dir_all(&dir, "test").unwrap();
    }
}
