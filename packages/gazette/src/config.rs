//! Site locations, month names and default year ranges.

use chrono::{Datelike, Local};

use crate::error::{GazetteError, Result};

/// Root of the BGBl Xaver application.
pub const BGBL_BASE_URL: &str = "http://www.bgbl.de/Xaver/";

/// Servlet of the Bundesanzeiger publication search.
pub const BANZ_BASE_URL: &str = "https://www.bundesanzeiger.de/ebanzwww/wexsservlet";

/// Article search of the Verkehrsblatt.
pub const VKBL_BASE_URL: &str = "http://www.verkehr-data.com/docs/artikelsuche.php";

/// First year covered by the Verkehrsblatt archive.
pub const VKBL_FIRST_YEAR: i32 = 1947;

/// Default dump files, relative to the data directory.
pub const BGBL_DUMP: &str = "bgbl.json";
pub const BANZ_DUMP: &str = "banz.json";
pub const VKBL_DUMP: &str = "vkbl.json";

/// German month names, January first.
pub const MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// Inclusive range of publication years to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    /// Every year.
    pub const ALL: Self = Self {
        min: 0,
        max: 10_000,
    };

    /// Create a range, rejecting `min > max`.
    pub fn new(min: i32, max: i32) -> Result<Self> {
        if min > max {
            return Err(GazetteError::InvalidYearRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Build a range from optional command-line bounds.
    pub fn from_bounds(min: Option<i32>, max: Option<i32>, default: Self) -> Result<Self> {
        Self::new(min.unwrap_or(default.min), max.unwrap_or(default.max))
    }

    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

/// Current calendar year in local time.
#[must_use]
pub fn current_year() -> i32 {
    Local::now().year()
}

/// Month number (1-based) of a German month name.
///
/// # Examples
/// ```
/// use gesetze_gazette::config::month_number;
///
/// assert_eq!(month_number("März"), Some(3));
/// assert_eq!(month_number("dezember"), Some(12));
/// assert_eq!(month_number("Brumaire"), None);
/// ```
#[must_use]
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .position(|month| month.to_lowercase() == name)
        .and_then(|index| u32::try_from(index + 1).ok())
}
