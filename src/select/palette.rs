//! Fixed four-color tag palette for presented candidates.

use crate::util::{GraspError, GraspResult};
use std::fmt;
use std::str::FromStr;

/// Visual tag assigned to a presented candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Black,
    Blue,
    Red,
    Green,
}

impl Tag {
    /// Tags in slot order: rank 0 is black, rank 3 is green.
    pub const ALL: [Tag; 4] = [Tag::Black, Tag::Blue, Tag::Red, Tag::Green];

    /// Lower-case name typed by the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Black => "black",
            Tag::Blue => "blue",
            Tag::Red => "red",
            Tag::Green => "green",
        }
    }

    /// Render color.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Tag::Black => [0, 0, 0],
            Tag::Blue => [0, 0, 255],
            Tag::Red => [255, 0, 0],
            Tag::Green => [0, 255, 0],
        }
    }

    /// Parses a typed tag. Surrounding whitespace is ignored; case is not.
    pub fn parse(text: &str) -> GraspResult<Tag> {
        let text = text.trim();
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == text)
            .ok_or_else(|| GraspError::UnknownSelectionTag(text.to_string()))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tag {
    type Err = GraspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::parse(s)
    }
}
