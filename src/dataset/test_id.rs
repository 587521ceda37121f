use regex::Regex;
use std::path::Path;

use crate::error::DatasetError;

/// A user-supplied regular expression whose single capture group holds the
/// integer test id embedded in a file name.
#[derive(Debug, Clone)]
pub struct TestIdPattern {
    re: Regex,
}

impl TestIdPattern {
    pub fn new(pattern: &str) -> Result<Self, DatasetError> {
        let re = Regex::new(pattern).map_err(|source| DatasetError::Regex {
            pattern: pattern.to_string(),
            source,
        })?;
        // captures_len counts the implicit whole-match group
        let groups = re.captures_len() - 1;
        if groups != 1 {
            return Err(DatasetError::InvalidPattern {
                pattern: pattern.to_string(),
                groups,
            });
        }
        Ok(Self { re })
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }

    /// Extract the test id from the file name part of `path`.
    ///
    /// The pattern must match exactly once and capture a non-negative integer.
    pub fn extract(&self, path: &Path) -> Result<u32, DatasetError> {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut values: Vec<String> = self
            .re
            .captures_iter(&file)
            .map(|c| c.get(1).map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        let value = match values.len() {
            0 => {
                return Err(DatasetError::TestIdNotFound {
                    file,
                    pattern: self.as_str().to_string(),
                })
            }
            1 => values.remove(0),
            matches => {
                return Err(DatasetError::AmbiguousTestId {
                    file,
                    pattern: self.as_str().to_string(),
                    matches,
                })
            }
        };

        value
            .parse::<u32>()
            .map_err(|_| DatasetError::InvalidTestId { file, value })
    }
}
