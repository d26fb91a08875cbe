use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Book quality rating a seller picks for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::LikeNew => "LIKE_NEW",
            Condition::Good => "GOOD",
            Condition::Fair => "FAIR",
            Condition::Poor => "POOR",
        }
    }
}

impl FromStr for Condition {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE_NEW" => Ok(Condition::LikeNew),
            "GOOD" => Ok(Condition::Good),
            "FAIR" => Ok(Condition::Fair),
            "POOR" => Ok(Condition::Poor),
            other => Err(UnknownValue::new("condition", other)),
        }
    }
}

/// Subject area of a listing. Stored and sent using the catalog's keys,
/// which are not uniformly cased ("STEM", "Business & Econs", ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "STEM")]
    Stem,
    #[serde(rename = "Business & Econs")]
    BusinessEcons,
    #[serde(rename = "Humanities")]
    Humanities,
    #[serde(rename = "Art")]
    Art,
    #[default]
    #[serde(rename = "General")]
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stem => "STEM",
            Category::BusinessEcons => "Business & Econs",
            Category::Humanities => "Humanities",
            Category::Art => "Art",
            Category::General => "General",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STEM" => Ok(Category::Stem),
            "Business & Econs" => Ok(Category::BusinessEcons),
            "Humanities" => Ok(Category::Humanities),
            "Art" => Ok(Category::Art),
            "General" => Ok(Category::General),
            other => Err(UnknownValue::new("category", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownValue {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// -- Price --

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("invalid price '{0}'")]
    Invalid(String),
    #[error("price cannot be negative")]
    Negative,
    #[error("price allows at most two decimal places")]
    TooPrecise,
    #[error("price must be below 10000.00")]
    OutOfRange,
}

/// Fixed-point price with two decimal places, held as whole cents.
///
/// Six significant digits at most, so the largest price is 9999.99.
/// Serialized as a decimal string (`"12.50"`); deserializes from either a
/// string or a JSON number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const MAX_CENTS: i64 = 999_999;

    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative);
        }
        if cents > Self::MAX_CENTS {
            return Err(PriceError::OutOfRange);
        }
        Ok(Self(cents))
    }

    pub fn cents(self) -> i64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(PriceError::Negative);
        }

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(PriceError::Invalid(s.to_string()));
        }
        if frac.len() > 2 {
            return Err(PriceError::TooPrecise);
        }

        // Digit-only strings only fail to parse on overflow.
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| PriceError::OutOfRange)?
        };
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| PriceError::Invalid(s.to_string()))? * 10,
            _ => frac.parse().map_err(|_| PriceError::Invalid(s.to_string()))?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac_cents))
            .ok_or(PriceError::OutOfRange)?;
        Price::from_cents(cents)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PriceVisitor;

        impl de::Visitor<'_> for PriceVisitor {
            type Value = Price;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a price such as \"12.50\" or 12.5")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
                let cents = i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(100))
                    .ok_or_else(|| E::custom(PriceError::OutOfRange))?;
                Price::from_cents(cents).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
                if v < 0 {
                    return Err(E::custom(PriceError::Negative));
                }
                self.visit_u64(v as u64)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
                if !v.is_finite() {
                    return Err(E::custom(PriceError::Invalid(v.to_string())));
                }
                // Shortest round-trip formatting, so 12.5 reads back as "12.5".
                v.to_string().parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PriceVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_parses_one_and_two_decimals() {
        assert_eq!("12.5".parse::<Price>().unwrap().cents(), 1250);
        assert_eq!("12.50".parse::<Price>().unwrap().cents(), 1250);
        assert_eq!("7".parse::<Price>().unwrap().cents(), 700);
        assert_eq!("0.99".parse::<Price>().unwrap().cents(), 99);
    }

    #[test]
    fn price_rejects_bad_input() {
        assert_eq!("1.234".parse::<Price>(), Err(PriceError::TooPrecise));
        assert_eq!("-3".parse::<Price>(), Err(PriceError::Negative));
        assert_eq!("10000".parse::<Price>(), Err(PriceError::OutOfRange));
        assert!(matches!("abc".parse::<Price>(), Err(PriceError::Invalid(_))));
        assert!(matches!(".".parse::<Price>(), Err(PriceError::Invalid(_))));
    }

    #[test]
    fn price_accepts_json_strings_and_numbers() {
        let from_str: Price = serde_json::from_str("\"12.5\"").unwrap();
        let from_float: Price = serde_json::from_str("12.5").unwrap();
        let from_int: Price = serde_json::from_str("12").unwrap();
        assert_eq!(from_str.cents(), 1250);
        assert_eq!(from_float.cents(), 1250);
        assert_eq!(from_int.cents(), 1200);

        assert!(serde_json::from_str::<Price>("9999.999").is_err());
        assert!(serde_json::from_str::<Price>("-1").is_err());
    }

    #[test]
    fn price_serializes_with_two_decimals() {
        let price = Price::from_cents(1205).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "\"12.05\"");
        assert_eq!(Price::from_cents(0).unwrap().to_string(), "0.00");
    }

    #[test]
    fn category_defaults_to_general_and_keeps_catalog_keys() {
        assert_eq!(Category::default(), Category::General);
        let parsed: Category = serde_json::from_str("\"Business & Econs\"").unwrap();
        assert_eq!(parsed, Category::BusinessEcons);
        assert_eq!("STEM".parse::<Category>().unwrap(), Category::Stem);
        assert!("GEN".parse::<Category>().is_err());
    }

    #[test]
    fn condition_round_trips_through_storage_key() {
        for c in [Condition::LikeNew, Condition::Good, Condition::Fair, Condition::Poor] {
            assert_eq!(c.as_str().parse::<Condition>().unwrap(), c);
        }
        let parsed: Condition = serde_json::from_str("\"LIKE_NEW\"").unwrap();
        assert_eq!(parsed, Condition::LikeNew);
    }
}
