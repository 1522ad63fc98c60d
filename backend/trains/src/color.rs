use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, EnumString};

/// Colors of rail connections, and of the cards used to acquire them.
///
/// Variants are declared in lexicographic order, so the derived ordering
/// matches the ordering of their names.
///
/// # JSON
/// Colors are serialized in lowercase.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumCountMacro,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RailColor {
    Blue,
    Green,
    Red,
    White,
}

impl RailColor {
    /// Position of the color in a [`crate::card::CardHand`].
    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn rail_color_count() {
        assert_eq!(RailColor::COUNT, 4);
    }

    #[test]
    fn rail_color_to_string() {
        assert_eq!(RailColor::White.to_string(), "white");
        assert_eq!(RailColor::Green.to_string(), "green");
    }

    #[test]
    fn rail_color_order_is_lexicographic() {
        let names: Vec<String> = RailColor::iter().map(|color| color.to_string()).collect();
        let mut sorted = names.clone();
        sorted.sort();

        assert_eq!(names, sorted);
    }

    #[test]
    fn rail_color_to_json() -> serde_json::Result<()> {
        assert_eq!(serde_json::to_string(&RailColor::Blue)?, r#""blue""#);
        assert_eq!(serde_json::to_string(&RailColor::Red)?, r#""red""#);
        Ok(())
    }

    #[test]
    fn json_to_rail_color() -> serde_json::Result<()> {
        assert_eq!(
            serde_json::from_str::<RailColor>(r#""white""#)?,
            RailColor::White
        );
        assert_eq!(
            serde_json::from_str::<RailColor>(r#""green""#)?,
            RailColor::Green
        );

        Ok(())
    }

    #[test]
    fn invalid_json_to_rail_color() {
        assert!(serde_json::from_str::<RailColor>(r#""wild""#).is_err());
        assert!(serde_json::from_str::<RailColor>(r#""Blue""#).is_err());
    }
}
