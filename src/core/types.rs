//! Enumerations shared between the engine seam and the public API.

use std::fmt;
use std::str::FromStr;

use super::error::DjvuError;

/// Status of an engine decode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    NotStarted,
    Started,
    Ok,
    Failed,
    Stopped,
    /// A value outside the documented set
    Unexpected(u32),
}

impl JobStatus {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => JobStatus::NotStarted,
            1 => JobStatus::Started,
            2 => JobStatus::Ok,
            3 => JobStatus::Failed,
            4 => JobStatus::Stopped,
            other => JobStatus::Unexpected(other),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            JobStatus::NotStarted => 0,
            JobStatus::Started => 1,
            JobStatus::Ok => 2,
            JobStatus::Failed => 3,
            JobStatus::Stopped => 4,
            JobStatus::Unexpected(raw) => raw,
        }
    }

    /// Whether the job will not change status anymore.
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::NotStarted | JobStatus::Started)
    }
}

/// Container layout of a DjVu document.
///
/// May be `Unknown` until the engine has posted its document-info message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DocumentType {
    #[default]
    Unknown,
    SinglePage,
    Bundled,
    Indirect,
    OldBundled,
    OldIndexed,
}

impl DocumentType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => DocumentType::SinglePage,
            2 => DocumentType::Bundled,
            3 => DocumentType::Indirect,
            4 => DocumentType::OldBundled,
            5 => DocumentType::OldIndexed,
            _ => DocumentType::Unknown,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            DocumentType::Unknown => 0,
            DocumentType::SinglePage => 1,
            DocumentType::Bundled => 2,
            DocumentType::Indirect => 3,
            DocumentType::OldBundled => 4,
            DocumentType::OldIndexed => 5,
        }
    }
}

/// Kind of image data on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageType {
    #[default]
    Unknown,
    Bitonal,
    Photo,
    Compound,
}

impl PageType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => PageType::Bitonal,
            2 => PageType::Photo,
            3 => PageType::Compound,
            _ => PageType::Unknown,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            PageType::Unknown => 0,
            PageType::Bitonal => 1,
            PageType::Photo => 2,
            PageType::Compound => 3,
        }
    }
}

/// Counter-clockwise rotation of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageRotation {
    #[default]
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl PageRotation {
    /// Only the low two bits are significant, as in the C API.
    pub fn from_raw(raw: u32) -> Self {
        match raw & 3 {
            0 => PageRotation::Rotate0,
            1 => PageRotation::Rotate90,
            2 => PageRotation::Rotate180,
            _ => PageRotation::Rotate270,
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            PageRotation::Rotate0 => 0,
            PageRotation::Rotate90 => 1,
            PageRotation::Rotate180 => 2,
            PageRotation::Rotate270 => 3,
        }
    }

    pub fn degrees(self) -> u32 {
        self.as_raw() * 90
    }
}

/// Finest zone granularity requested from a page-text query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum TextDetail {
    #[default]
    Page,
    Column,
    Region,
    Para,
    Line,
    Word,
    Char,
}

impl TextDetail {
    /// Every level, coarsest first.
    pub const ALL: [TextDetail; 7] = [
        TextDetail::Page,
        TextDetail::Column,
        TextDetail::Region,
        TextDetail::Para,
        TextDetail::Line,
        TextDetail::Word,
        TextDetail::Char,
    ];

    /// The keyword the engine expects for `maxdetail`.
    pub fn as_str(self) -> &'static str {
        match self {
            TextDetail::Page => "page",
            TextDetail::Column => "column",
            TextDetail::Region => "region",
            TextDetail::Para => "para",
            TextDetail::Line => "line",
            TextDetail::Word => "word",
            TextDetail::Char => "char",
        }
    }
}

impl fmt::Display for TextDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextDetail {
    type Err = DjvuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextDetail::ALL
            .into_iter()
            .find(|detail| detail.as_str() == s)
            .ok_or_else(|| DjvuError::Generic(format!("unknown text detail: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::NotStarted.is_terminal());
        assert!(!JobStatus::Started.is_terminal());
        assert!(JobStatus::Ok.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(JobStatus::from_raw(17).is_terminal());
        assert_eq!(JobStatus::from_raw(17), JobStatus::Unexpected(17));
    }

    #[test]
    fn test_rotation_masks_raw_value() {
        assert_eq!(PageRotation::from_raw(5), PageRotation::Rotate90);
        assert_eq!(PageRotation::Rotate270.degrees(), 270);
    }

    #[test]
    fn test_text_detail_keywords() {
        for detail in TextDetail::ALL {
            assert_eq!(detail.as_str().parse::<TextDetail>().unwrap(), detail);
            // Passed to the engine as a C string
            assert!(!detail.as_str().is_empty() && !detail.as_str().contains('\0'));
        }
        assert!("paragraph".parse::<TextDetail>().is_err());
    }
}
