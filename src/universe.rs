use crate::models::Bar;
use chrono::NaiveDate;
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("bars for {symbol} are not in ascending date order at {date}")]
    Unsorted { symbol: String, date: NaiveDate },
    #[error("duplicate date {date} in bars for {symbol}")]
    DuplicateDate { symbol: String, date: NaiveDate },
}

/// A validated multi-symbol collection of indicator bar series.
///
/// Dates entering the core must already be normalized to a timezone-free
/// calendar-day representation; `NaiveDate` makes anything else
/// unrepresentable. Construction fails fast on unsorted or duplicated dates
/// instead of re-normalizing. Symbols with no bars are dropped with a warning.
#[derive(Debug, Clone, Default)]
pub struct Universe {
    series: BTreeMap<String, Vec<Bar>>,
}

impl Universe {
    pub fn new(series: BTreeMap<String, Vec<Bar>>) -> Result<Self, UniverseError> {
        let mut validated = BTreeMap::new();
        for (symbol, bars) in series {
            if bars.is_empty() {
                warn!("Dropping symbol {} with no bars", symbol);
                continue;
            }
            for pair in bars.windows(2) {
                if pair[1].date < pair[0].date {
                    return Err(UniverseError::Unsorted {
                        symbol,
                        date: pair[1].date,
                    });
                }
                if pair[1].date == pair[0].date {
                    return Err(UniverseError::DuplicateDate {
                        symbol,
                        date: pair[1].date,
                    });
                }
            }
            validated.insert(symbol, bars);
        }
        Ok(Self { series: validated })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn bars(&self, symbol: &str) -> Option<&[Bar]> {
        self.series.get(symbol).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bar])> {
        self.series
            .iter()
            .map(|(symbol, bars)| (symbol.as_str(), bars.as_slice()))
    }

    /// Every distinct date appearing in any symbol's series, ascending.
    pub fn all_dates(&self) -> Vec<NaiveDate> {
        let mut dates = BTreeSet::new();
        for bars in self.series.values() {
            for bar in bars {
                dates.insert(bar.date);
            }
        }
        dates.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(date: NaiveDate) -> Bar {
        Bar {
            date,
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 1_000,
            sma_10: 10.0,
            sma_50: 10.0,
            sma_150: 10.0,
            sma_200: 10.0,
            volume_sma_50: 1_000.0,
            pct_from_52w_high: 0.0,
            pct_from_52w_low: 0.0,
            atr: 1.0,
            rs: 0.0,
        }
    }

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    #[test]
    fn accepts_sorted_series_and_merges_dates() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), vec![bar(day(0)), bar(day(1))]);
        series.insert("BBB".to_string(), vec![bar(day(1)), bar(day(2))]);
        let universe = Universe::new(series).unwrap();

        assert_eq!(universe.len(), 2);
        assert_eq!(universe.all_dates(), vec![day(0), day(1), day(2)]);
        assert_eq!(universe.bars("AAA").unwrap().len(), 2);
        assert!(universe.bars("CCC").is_none());
    }

    #[test]
    fn rejects_duplicate_dates() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), vec![bar(day(0)), bar(day(0))]);
        assert!(matches!(
            Universe::new(series),
            Err(UniverseError::DuplicateDate { .. })
        ));
    }

    #[test]
    fn rejects_unsorted_dates() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), vec![bar(day(3)), bar(day(1))]);
        assert!(matches!(
            Universe::new(series),
            Err(UniverseError::Unsorted { .. })
        ));
    }

    #[test]
    fn drops_empty_series() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), Vec::new());
        series.insert("BBB".to_string(), vec![bar(day(0))]);
        let universe = Universe::new(series).unwrap();
        assert_eq!(universe.symbols().collect::<Vec<_>>(), vec!["BBB"]);
    }
}
