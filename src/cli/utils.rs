use camino::Utf8Path;
use simple_error::{SimpleResult, bail};

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &Utf8Path, label: &str) -> SimpleResult<()> {
    if filename.as_str().is_empty() {
        bail!("Must specify {label} file");
    }
    if !filename.exists() {
        bail!("Can't find specified {label} file: '{filename}'");
    }
    if !filename.is_file() {
        bail!("Specified {label} file path does not appear to be a file: '{filename}'");
    }
    Ok(())
}

/// Check an optional input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_optional_filename(filename_opt: Option<&Utf8Path>, label: &str) -> SimpleResult<()> {
    if let Some(filename) = filename_opt {
        if !filename.exists() {
            bail!("Can't find specified {label} file: '{filename}'");
        }
        if !filename.is_file() {
            bail!("Specified {label} file path does not appear to be a file: '{filename}'");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_required_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8Path::from_path(tmp.path()).unwrap();
        let filename = dir.join("reads.fa");

        assert!(check_required_filename(&filename, "reads").is_err());
        std::fs::write(&filename, ">r1\nACGT\n").unwrap();
        assert!(check_required_filename(&filename, "reads").is_ok());

        // A directory is not accepted as a file:
        assert!(check_required_filename(dir, "reads").is_err());

        assert!(check_optional_filename(None, "config").is_ok());
        assert!(check_optional_filename(Some(&dir.join("nope.json")), "config").is_err());
    }
}
