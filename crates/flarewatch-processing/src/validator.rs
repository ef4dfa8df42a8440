/// Upload validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid file extension: '{extension}' (allowed: {allowed:?})")]
    InvalidFileType {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },
}

/// Extension of the last path element, starting at its last `.`.
///
/// `"sample.lc"` gives `".lc"`, `".lc"` gives `".lc"`, `"archive.tar.gz"` gives
/// `".gz"` and a name without a dot gives `""`.
pub fn file_extension(filename: &str) -> &str {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    name.rfind('.').map_or("", |index| &name[index..])
}

/// Name an accepted upload is stored under in the working directory
pub fn canonical_filename(extension: &str) -> String {
    format!("file{}", extension)
}

/// Checks uploads against the extension allow-list and size limit
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_extensions,
        }
    }

    /// Validate the extension (exact, case-sensitive match)
    pub fn validate_extension<'a>(&self, filename: &'a str) -> Result<&'a str, ValidationError> {
        let extension = file_extension(filename);

        if !self.allowed_extensions.iter().any(|allowed| allowed == extension) {
            return Err(ValidationError::InvalidFileType {
                extension: extension.to_string(),
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Run all checks and return the accepted extension
    pub fn validate<'a>(&self, filename: &'a str, size: usize) -> Result<&'a str, ValidationError> {
        let extension = self.validate_extension(filename)?;
        self.validate_file_size(size)?;
        Ok(extension)
    }
}
