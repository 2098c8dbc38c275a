use super::error::LoadError;
use std::fmt;

const MIN_SEGMENTS: usize = 4;
const ENTRY_SYMBOL: &str = "StartApp";

/// Validated module path such as `github.com/org/repo/pkg`. The final segment names the
/// binding the module is imported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePath {
    raw: String,
    binding: String,
}

impl ModulePath {
    /// Validates `path` as given. Surrounding whitespace is part of the path, so a padded
    /// path names a different module than its trimmed form.
    pub fn parse(path: &str) -> Result<Self, LoadError> {
        let segments: Vec<&str> = path.split('/').collect();

        let binding = match segments.last() {
            Some(last) if segments.len() >= MIN_SEGMENTS && !last.is_empty() => *last,
            _ => {
                return Err(LoadError::InvalidPath {
                    path: path.to_string(),
                })
            }
        };

        Ok(Self {
            raw: path.to_string(),
            binding: binding.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// `<binding>.StartApp`
    pub fn entry_point(&self) -> String {
        format!("{}.{ENTRY_SYMBOL}", self.binding)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
