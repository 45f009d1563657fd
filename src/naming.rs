use once_cell::sync::Lazy;
use regex::Regex;

/// Extension reserved for encrypted record files. Everything else in the
/// sync directory belongs to other tools and is ignored.
pub const ENCRYPTED_EXT: &str = "enc";

const SEPARATOR: char = '_';

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

pub fn is_valid_date(date: &str) -> bool {
    DATE_PATTERN.is_match(date)
}

/// The (date, user) pair encoded in a stored file's name.
///
/// Format: `YYYY-MM-DD_<username>.enc`. The first separator is the boundary;
/// usernames may themselves contain the separator and are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileKey {
    pub date: String,
    pub user: String,
}

impl FileKey {
    pub fn new(date: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            user: user.into(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}{}{}.{}", self.date, SEPARATOR, self.user, ENCRYPTED_EXT)
    }

    /// Parses a directory entry name back into a key. Returns `None` for
    /// names that do not follow the convention; callers skip those entries
    /// silently rather than reporting them.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(&format!(".{ENCRYPTED_EXT}"))?;
        let (date, user) = stem.split_once(SEPARATOR)?;
        if user.is_empty() || !is_valid_date(date) {
            return None;
        }
        Some(Self::new(date, user))
    }
}
