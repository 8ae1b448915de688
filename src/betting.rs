//! Bet suggestion: win-rate threshold plus optional bookmaker price.

use serde::Serialize;
use std::fmt;

use crate::aggregate::win_rate;
use crate::config::BettingConfig;
use crate::types::{GameRecord, OddsSnapshot};

/// Moneyline price quoted by a bookmaker
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoneylinePrice {
    /// American odds (e.g. -150, +130)
    pub american: f64,
    pub decimal: f64,
    pub implied_probability: f64,
}

impl MoneylinePrice {
    pub fn from_american(american: f64) -> Self {
        Self {
            american,
            decimal: decimal_odds(american),
            implied_probability: implied_probability(american),
        }
    }
}

/// Outcome of the win-rate heuristic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BetSuggestion {
    /// No games with a known outcome
    NoData,
    Neutral {
        win_rate: f64,
    },
    Favor {
        side: String,
        win_rate: f64,
        bookmaker: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        price: Option<MoneylinePrice>,
    },
}

impl BetSuggestion {
    /// Attach the configured bookmaker's moneyline for the favored side
    pub fn with_price(self, snapshots: &[OddsSnapshot]) -> Self {
        match self {
            BetSuggestion::Favor {
                side,
                win_rate,
                bookmaker,
                ..
            } => {
                let price = find_moneyline(snapshots, &side, &bookmaker);
                BetSuggestion::Favor {
                    side,
                    win_rate,
                    bookmaker,
                    price,
                }
            }
            other => other,
        }
    }

    pub fn is_favor(&self) -> bool {
        matches!(self, BetSuggestion::Favor { .. })
    }
}

impl fmt::Display for BetSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSuggestion::NoData => write!(f, "No data for suggestion."),
            BetSuggestion::Neutral { .. } => {
                write!(f, "No strong suggestion - teams are evenly matched.")
            }
            BetSuggestion::Favor {
                side,
                win_rate,
                bookmaker,
                price,
            } => {
                write!(
                    f,
                    "Suggest betting on {} to win (high win rate: {:.0}%). Check {} odds.",
                    side,
                    win_rate * 100.0,
                    bookmaker_title(bookmaker)
                )?;
                if let Some(price) = price {
                    write!(
                        f,
                        " Current price {:+.0} (implied {:.1}%).",
                        price.american,
                        price.implied_probability * 100.0
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Suggest a side from its recent outcomes.
///
/// # Arguments
/// * `records` - Games from `side`'s point of view
/// * `side` - Name shown in the suggestion
/// * `config` - Threshold and bookmaker
///
/// # Returns
/// `Favor` only when the win rate is strictly above the threshold
pub fn suggest_bet(records: &[GameRecord], side: &str, config: &BettingConfig) -> BetSuggestion {
    match win_rate(records) {
        None => BetSuggestion::NoData,
        Some(rate) if rate > config.win_rate_threshold => BetSuggestion::Favor {
            side: side.to_string(),
            win_rate: rate,
            bookmaker: config.bookmaker.clone(),
            price: None,
        },
        Some(rate) => BetSuggestion::Neutral { win_rate: rate },
    }
}

/// Implied probability of American odds.
///
/// -150 -> 0.6, +150 -> 0.4
pub fn implied_probability(american: f64) -> f64 {
    if american < 0.0 {
        -american / (-american + 100.0)
    } else {
        100.0 / (american + 100.0)
    }
}

/// Decimal payout per unit staked
pub fn decimal_odds(american: f64) -> f64 {
    if american < 0.0 {
        1.0 + 100.0 / -american
    } else {
        1.0 + american / 100.0
    }
}

/// First moneyline for `team` quoted by `bookmaker`
pub fn find_moneyline(
    snapshots: &[OddsSnapshot],
    team: &str,
    bookmaker: &str,
) -> Option<MoneylinePrice> {
    snapshots
        .iter()
        .filter(|s| s.bookmaker.eq_ignore_ascii_case(bookmaker))
        .filter(|s| s.involves(team))
        .find_map(|s| s.moneyline(team))
        .map(MoneylinePrice::from_american)
}

fn bookmaker_title(key: &str) -> String {
    match key {
        "fanduel" => "FanDuel".to_string(),
        "draftkings" => "DraftKings".to_string(),
        other => other.to_string(),
    }
}
