//! Site content pages.

/// Editable content pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageName {
    About,
    Contact,
}

impl PageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageName::About => "about",
            PageName::Contact => "contact",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "about" => Some(PageName::About),
            "contact" => Some(PageName::Contact),
            _ => None,
        }
    }
}
