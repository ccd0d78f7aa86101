//! Small value objects attached to feature properties.

use serde::{Deserialize, Serialize};

/// Trim `value`, treating blank strings as absent.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Link {
    /// Build a link, or `None` when `href` is blank.
    pub fn new(href: &str, text: Option<&str>, mime_type: Option<&str>) -> Option<Self> {
        Some(Self {
            href: non_blank(Some(href))?,
            text: non_blank(text),
            mime_type: non_blank(mime_type),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub street_address: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.street_address.iter().all(|s| s.trim().is_empty())
            && [&self.city, &self.state, &self.country, &self.postal_code]
                .iter()
                .all(|f| f.as_deref().is_none_or(|s| s.trim().is_empty()))
    }

    /// Copy with blank fields dropped, or `None` when nothing remains.
    pub fn cleaned(&self) -> Option<Self> {
        let cleaned = Self {
            street_address: self
                .street_address
                .iter()
                .filter_map(|s| non_blank(Some(s)))
                .collect(),
            city: non_blank(self.city.as_deref()),
            state: non_blank(self.state.as_deref()),
            country: non_blank(self.country.as_deref()),
            postal_code: non_blank(self.postal_code.as_deref()),
        };
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl PhoneNumber {
    pub fn new(number: &str, category: Option<&str>) -> Option<Self> {
        Some(Self {
            number: non_blank(Some(number))?,
            category: non_blank(category),
        })
    }
}

/// Keep only phone numbers with a non-blank number.
pub fn clean_phone_numbers(numbers: &[PhoneNumber]) -> Vec<PhoneNumber> {
    numbers
        .iter()
        .filter_map(|p| PhoneNumber::new(&p.number, p.category.as_deref()))
        .collect()
}

/// Keep only links with a non-blank href.
pub fn clean_links(links: &[Link]) -> Vec<Link> {
    links
        .iter()
        .filter_map(|l| Link::new(&l.href, l.text.as_deref(), l.mime_type.as_deref()))
        .collect()
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            /// A token outside the known vocabulary, kept verbatim.
            Other(String),
        }

        impl $name {
            pub fn as_wire(&self) -> &str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Other(s) => s,
                }
            }

            /// Parse a wire token case-insensitively; `None` for blank input.
            pub fn from_wire(token: &str) -> Option<Self> {
                let token = token.trim();
                if token.is_empty() {
                    return None;
                }
                $(if token.eq_ignore_ascii_case($wire) {
                    return Some(Self::$variant);
                })+
                Some(Self::Other(token.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_wire(&s).unwrap_or(Self::Other(s))
            }
        }

        impl From<$name> for String {
            fn from(v: $name) -> Self {
                v.as_wire().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_wire())
            }
        }
    };
}

wire_enum! {
    /// How a navigation device recomputes the leg leading to a via point.
    CalculationMode {
        FasterTime => "FasterTime",
        ShorterDistance => "ShorterDistance",
        Direct => "Direct",
        Curvy => "Curvy",
    }
}

wire_enum! {
    ElevationMode {
        Standard => "Standard",
        Flat => "Flat",
    }
}

wire_enum! {
    TransportationMode {
        Automotive => "Automotive",
        Motorcycling => "Motorcycling",
        Walking => "Walking",
        Hiking => "Hiking",
        Cycling => "Cycling",
        MountainBiking => "MountainBiking",
        Truck => "Truck",
        OffRoad => "OffRoad",
    }
}

impl CalculationMode {
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_values_are_absent() {
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some(" x ")), Some("x".to_string()));
        assert!(Link::new("  ", Some("text"), None).is_none());
        assert!(PhoneNumber::new("", Some("Mobile")).is_none());
    }

    #[test]
    fn test_address_cleaned() {
        let empty = Address {
            street_address: vec![" ".to_string()],
            city: Some(String::new()),
            ..Default::default()
        };
        assert!(empty.is_empty());
        assert!(empty.cleaned().is_none());

        let partial = Address {
            street_address: vec!["".to_string(), "1 Main St".to_string()],
            city: Some("Springfield ".to_string()),
            ..Default::default()
        };
        let cleaned = partial.cleaned().unwrap();
        assert_eq!(cleaned.street_address, vec!["1 Main St".to_string()]);
        assert_eq!(cleaned.city.as_deref(), Some("Springfield"));
    }

    #[test]
    fn test_wire_enum_parsing() {
        assert_eq!(CalculationMode::from_wire("direct"), Some(CalculationMode::Direct));
        assert!(CalculationMode::from_wire("Direct").unwrap().is_direct());
        assert_eq!(
            TransportationMode::from_wire("Boat"),
            Some(TransportationMode::Other("Boat".to_string()))
        );
        assert_eq!(ElevationMode::from_wire(" "), None);
        assert_eq!(TransportationMode::Automotive.to_string(), "Automotive");
    }

    #[test]
    fn test_wire_enum_serde() {
        let json = serde_json::to_string(&CalculationMode::ShorterDistance).unwrap();
        assert_eq!(json, "\"ShorterDistance\"");
        let back: CalculationMode = serde_json::from_str("\"curvy\"").unwrap();
        assert_eq!(back, CalculationMode::Curvy);
    }
}
