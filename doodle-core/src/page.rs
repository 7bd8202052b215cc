//! Page types: how far a level extends and how its wallpaper tiles.

/// Stored as its integer id in level headers.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum PageType {
    /// Infinite in every direction.
    Unbounded,
    /// Nothing left of or above the origin.
    #[default]
    NoNegativeSpace,
    /// Origin to a maximum width and height.
    Bounded,
    /// Bounded, with the wallpaper framing all four edges.
    Bordered,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PageTypeParseError {
    #[error("unknown page type {0:?}")]
    Name(String),
    #[error("unknown page type id {0}")]
    Id(u8),
}

impl PageType {
    pub const ALL: [Self; 4] = [
        Self::Unbounded,
        Self::NoNegativeSpace,
        Self::Bounded,
        Self::Bordered,
    ];
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unbounded => "Unbounded",
            Self::NoNegativeSpace => "NoNegativeSpace",
            Self::Bounded => "Bounded",
            Self::Bordered => "Bordered",
        }
    }
    /// Whether the top-left is pinned to the origin.
    #[must_use]
    pub fn has_origin(self) -> bool {
        self >= Self::NoNegativeSpace
    }
    /// Whether there's a maximum width and height.
    #[must_use]
    pub fn is_bounded(self) -> bool {
        self >= Self::Bounded
    }
}
impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
impl std::str::FromStr for PageType {
    type Err = PageTypeParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| PageTypeParseError::Name(s.to_owned()))
    }
}
impl From<PageType> for u8 {
    fn from(value: PageType) -> Self {
        value as u8
    }
}
impl TryFrom<u8> for PageType {
    type Error = PageTypeParseError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(PageTypeParseError::Id(value))
    }
}

#[cfg(test)]
mod test {
    use super::PageType;

    #[test]
    fn names_and_ids() {
        assert_eq!("Bounded".parse::<PageType>(), Ok(PageType::Bounded));
        assert!("bounded".parse::<PageType>().is_err());
        assert_eq!(PageType::Bordered.to_string(), "Bordered");
        assert_eq!(serde_json::to_string(&PageType::Bounded).unwrap(), "2");
        assert_eq!(serde_json::from_str::<PageType>("0").unwrap(), PageType::Unbounded);
        assert!(serde_json::from_str::<PageType>("7").is_err());
    }
    #[test]
    fn ordering() {
        assert!(!PageType::Unbounded.has_origin());
        assert!(PageType::NoNegativeSpace.has_origin());
        assert!(!PageType::NoNegativeSpace.is_bounded());
        assert!(PageType::Bordered.is_bounded());
    }
}
