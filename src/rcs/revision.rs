// Revision metadata: trunk revision numbers, RCS date stamps, states.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

/// Format of RCS `date` fields (`YYYY.MM.DD.HH.MM.SS`, UTC).
pub const DATE_FORMAT: &str = "%Y.%m.%d.%H.%M.%S";

// ---------------------------------------------------------------------------
// Revision numbers
// ---------------------------------------------------------------------------

/// A trunk revision number `1.N`.
///
/// Only two-component numbers are produced; branches are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevisionNumber {
    pub major: u32,
    pub minor: u32,
}

impl RevisionNumber {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Revision assigned to the snapshot at `index` (0 = oldest) of a chain.
    pub fn trunk(index: usize) -> Self {
        Self::new(1, index as u32 + 1)
    }
}

impl fmt::Display for RevisionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid trunk revision number '{0}'")]
pub struct InvalidRevision(pub String);

impl FromStr for RevisionNumber {
    type Err = InvalidRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidRevision(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// A revision timestamp, always rendered in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RcsDate(pub DateTime<Utc>);

impl From<SystemTime> for RcsDate {
    fn from(t: SystemTime) -> Self {
        Self(DateTime::<Utc>::from(t))
    }
}

impl fmt::Display for RcsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Exp,
    Dead,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exp => "Exp",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Revision record
// ---------------------------------------------------------------------------

/// Metadata of one revision in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRecord {
    pub number: RevisionNumber,
    pub date: RcsDate,
    pub author: String,
    pub log: String,
    pub state: State,
    pub branches: Vec<RevisionNumber>,
    /// Next older revision on the trunk.
    pub next: Option<RevisionNumber>,
    pub is_head: bool,
}

/// Rewrite characters that cannot appear in an RCS author id.
///
/// Returns the input unchanged (borrowed) in the common case.
pub fn sanitize_author(author: &str) -> std::borrow::Cow<'_, str> {
    let bad = |c: char| c.is_whitespace() || c.is_control() || "$,:;@".contains(c);
    if author.contains(bad) {
        std::borrow::Cow::Owned(author.replace(bad, "_"))
    } else {
        std::borrow::Cow::Borrowed(author)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[test]
    fn trunk_numbers_start_at_one_one() {
        assert_eq!(RevisionNumber::trunk(0).to_string(), "1.1");
        assert_eq!(RevisionNumber::trunk(11).to_string(), "1.12");
    }

    #[test]
    fn revision_numbers_order_by_minor() {
        assert!(RevisionNumber::trunk(1) > RevisionNumber::trunk(0));
        assert!(RevisionNumber::new(1, 10) > RevisionNumber::new(1, 9));
    }

    #[test]
    fn parse_revision_number() {
        assert_eq!("1.7".parse::<RevisionNumber>().unwrap(), RevisionNumber::new(1, 7));
        assert!("1".parse::<RevisionNumber>().is_err());
        assert!("1.x".parse::<RevisionNumber>().is_err());
        assert!("1.2.3".parse::<RevisionNumber>().is_err());
    }

    #[test]
    fn date_is_zero_padded_utc() {
        let t = Utc.with_ymd_and_hms(2003, 4, 5, 6, 7, 8).unwrap();
        assert_eq!(RcsDate(t).to_string(), "2003.04.05.06.07.08");
    }

    #[test]
    fn date_from_system_time() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(86_400 + 61);
        assert_eq!(RcsDate::from(t).to_string(), "1970.01.02.00.01.01");
    }

    #[test]
    fn state_keywords() {
        assert_eq!(State::default().to_string(), "Exp");
        assert_eq!(State::Dead.to_string(), "dead");
    }

    #[test]
    fn authors_are_sanitized() {
        assert_eq!(sanitize_author("alice"), "alice");
        assert_eq!(sanitize_author("john.doe"), "john.doe");
        assert_eq!(sanitize_author("Jane Doe"), "Jane_Doe");
        assert_eq!(sanitize_author("a@b;c:d"), "a_b_c_d");
        assert_eq!(sanitize_author(""), "");
    }
}
