use crate::MAX_FILENAME_LEN;
use crate::error::WireError;

/// Validates that `name` is a bare filename that cannot leave the
/// destination directory.
///
/// Rejects:
/// - Empty names, `.` and `..`
/// - Any path separator (`/` or `\`)
/// - NUL bytes
/// - Drive prefixes and alternate data streams (`:`)
/// - Names longer than [`MAX_FILENAME_LEN`] bytes
pub fn validate_filename(name: &str) -> Result<(), WireError> {
    if name.is_empty() {
        return Err(WireError::InvalidFilename("empty filename".into()));
    }

    if name.len() > MAX_FILENAME_LEN {
        return Err(WireError::InvalidFilename(format!(
            "filename too long: {} bytes",
            name.len()
        )));
    }

    if name == "." || name == ".." {
        return Err(WireError::InvalidFilename(format!(
            "directory reference not allowed: {name}"
        )));
    }

    if name.contains(['/', '\\']) {
        return Err(WireError::InvalidFilename(format!(
            "path separators not allowed: {name}"
        )));
    }

    if name.contains('\0') {
        return Err(WireError::InvalidFilename("NUL byte in filename".into()));
    }

    if name.contains(':') {
        return Err(WireError::InvalidFilename(format!(
            "drive prefix or stream name not allowed: {name}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn rejects_directory_references() {
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("..").is_err());
    }

    #[test]
    fn rejects_parent_traversal() {
        assert!(validate_filename("../../../etc/passwd").is_err());
        assert!(validate_filename("..\\secret").is_err());
    }

    #[test]
    fn rejects_absolute_paths() {
        assert!(validate_filename("/etc/passwd").is_err());
        assert!(validate_filename("C:\\Windows\\evil").is_err());
    }

    #[test]
    fn rejects_subdirectories() {
        assert!(validate_filename("sub/file.txt").is_err());
    }

    #[test]
    fn rejects_drive_prefix() {
        assert!(validate_filename("C:evil").is_err());
    }

    #[test]
    fn rejects_nul() {
        assert!(validate_filename("a\0b").is_err());
    }

    #[test]
    fn rejects_overlong_name() {
        assert!(validate_filename(&"a".repeat(MAX_FILENAME_LEN + 1)).is_err());
    }

    #[test]
    fn accepts_plain_names() {
        assert!(validate_filename("archive.tar.gz").is_ok());
        assert!(validate_filename(".hidden").is_ok());
        assert!(validate_filename("..dots..").is_ok());
        assert!(validate_filename("résumé.pdf").is_ok());
    }
}
