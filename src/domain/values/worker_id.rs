use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerId {
    MarketScanner,
    Social,
    Research,
}

impl WorkerId {
    pub const ALL: [WorkerId; 3] = [WorkerId::MarketScanner, WorkerId::Social, WorkerId::Research];
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerId::MarketScanner => write!(f, "market_scanner"),
            WorkerId::Social => write!(f, "social"),
            WorkerId::Research => write!(f, "research"),
        }
    }
}

impl FromStr for WorkerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "market_scanner" | "scanner" | "market" => Ok(WorkerId::MarketScanner),
            "social" => Ok(WorkerId::Social),
            "research" | "researcher" => Ok(WorkerId::Research),
            _ => Err(format!("Unknown worker: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("scanner".parse::<WorkerId>(), Ok(WorkerId::MarketScanner));
        assert_eq!("Market-Scanner".parse::<WorkerId>(), Ok(WorkerId::MarketScanner));
        assert_eq!("research".parse::<WorkerId>(), Ok(WorkerId::Research));
        assert!("mailer".parse::<WorkerId>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for id in WorkerId::ALL {
            assert_eq!(id.to_string().parse::<WorkerId>(), Ok(id));
        }
    }
}
