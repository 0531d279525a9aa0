use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The five currencies the ledger accepts. All conversion routes through
/// RMB, the trip's base currency; GBP and AED are the travelers' home
/// currencies, USD and EUR are kept for reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Rmb,
    Gbp,
    Aed,
    Usd,
    Eur,
}

/// The base currency every conversion routes through.
pub const BASE_CURRENCY: Currency = Currency::Rmb;

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Rmb,
        Currency::Gbp,
        Currency::Aed,
        Currency::Usd,
        Currency::Eur,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Rmb => "RMB",
            Currency::Gbp => "GBP",
            Currency::Aed => "AED",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "RMB" | "CNY" => Some(Currency::Rmb),
            "GBP" => Some(Currency::Gbp),
            "AED" => Some(Currency::Aed),
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            _ => None,
        }
    }

    pub fn is_base(&self) -> bool {
        *self == BASE_CURRENCY
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expense categories, fixed for the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Official Stuff")]
    OfficialStuff,
    Transportation,
    Accommodation,
    Food,
    Activities,
    Shopping,
    Connectivity,
    Miscellaneous,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::OfficialStuff,
        Category::Transportation,
        Category::Accommodation,
        Category::Food,
        Category::Activities,
        Category::Shopping,
        Category::Connectivity,
        Category::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::OfficialStuff => "Official Stuff",
            Category::Transportation => "Transportation",
            Category::Accommodation => "Accommodation",
            Category::Food => "Food",
            Category::Activities => "Activities",
            Category::Shopping => "Shopping",
            Category::Connectivity => "Connectivity",
            Category::Miscellaneous => "Miscellaneous",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The cities on the trip itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum City {
    #[serde(rename = "Abu Dhabi")]
    AbuDhabi,
    Beijing,
    Shanghai,
    Guilin,
    Chengdu,
    Chongqing,
    London,
    Yangshuo,
}

impl City {
    pub const ALL: [City; 8] = [
        City::AbuDhabi,
        City::Beijing,
        City::Shanghai,
        City::Guilin,
        City::Chengdu,
        City::Chongqing,
        City::London,
        City::Yangshuo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            City::AbuDhabi => "Abu Dhabi",
            City::Beijing => "Beijing",
            City::Shanghai => "Shanghai",
            City::Guilin => "Guilin",
            City::Chengdu => "Chengdu",
            City::Chongqing => "Chongqing",
            City::London => "London",
            City::Yangshuo => "Yangshuo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for City {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who paid for an expense. "Couple" means the cost is split 50/50
/// between the two travelers when aggregating per-person spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Payer {
    Sunil,
    Shirin,
    Couple,
}

impl Payer {
    pub const ALL: [Payer; 3] = [Payer::Sunil, Payer::Shirin, Payer::Couple];

    pub fn as_str(&self) -> &'static str {
        match self {
            Payer::Sunil => "Sunil",
            Payer::Shirin => "Shirin",
            Payer::Couple => "Couple",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Fraction of the expense attributed to the first traveler (Sunil).
    pub fn share_a(&self) -> Decimal {
        match self {
            Payer::Sunil => Decimal::ONE,
            Payer::Shirin => Decimal::ZERO,
            Payer::Couple => Decimal::new(5, 1),
        }
    }

    /// Fraction of the expense attributed to the second traveler (Shirin).
    pub fn share_b(&self) -> Decimal {
        Decimal::ONE - self.share_a()
    }
}

impl std::fmt::Display for Payer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_roundtrip() {
        for c in Currency::ALL {
            assert_eq!(Currency::from_str(c.as_str()), Some(c));
        }
    }

    #[test]
    fn test_currency_accepts_cny_alias() {
        assert_eq!(Currency::from_str("cny"), Some(Currency::Rmb));
    }

    #[test]
    fn test_currency_rejects_unknown() {
        assert_eq!(Currency::from_str("JPY"), None);
        assert_eq!(Currency::from_str(""), None);
    }

    #[test]
    fn test_category_roundtrip() {
        for c in Category::ALL {
            assert_eq!(Category::from_str(c.as_str()), Some(c));
        }
        assert_eq!(
            Category::from_str("official stuff"),
            Some(Category::OfficialStuff)
        );
        assert_eq!(Category::from_str("Groceries"), None);
    }

    #[test]
    fn test_city_roundtrip() {
        for c in City::ALL {
            assert_eq!(City::from_str(c.as_str()), Some(c));
        }
        assert_eq!(City::from_str("abu dhabi"), Some(City::AbuDhabi));
        assert_eq!(City::from_str("Paris"), None);
    }

    #[test]
    fn test_payer_shares_sum_to_one() {
        for p in Payer::ALL {
            assert_eq!(p.share_a() + p.share_b(), Decimal::ONE);
        }
        assert_eq!(Payer::Couple.share_a(), Decimal::new(5, 1));
        assert_eq!(Payer::Sunil.share_b(), Decimal::ZERO);
    }

    #[test]
    fn test_serde_as_display_strings() {
        // Persisted JSON must use the same names validation accepts
        assert_eq!(
            serde_json::to_string(&Category::OfficialStuff).unwrap(),
            "\"Official Stuff\""
        );
        assert_eq!(serde_json::to_string(&City::AbuDhabi).unwrap(), "\"Abu Dhabi\"");
        assert_eq!(serde_json::to_string(&Currency::Rmb).unwrap(), "\"RMB\"");
        assert_eq!(serde_json::to_string(&Payer::Couple).unwrap(), "\"Couple\"");
    }
}
