//! Named ticker folders.
//!
//! Three on-disk shapes have been written over time and all of them load:
//!
//! ```text
//! ["2330", "TSLA"]                                  flat list
//! {"Tech": ["2330", "TSLA"]}                        folder -> tickers
//! {"Tech": {"2330": {"cost": 600, "shares": 1000}}} folder -> ticker -> holding
//! ```

use dashboard_core::DashboardError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Folder name given to a flat ticker list.
pub const DEFAULT_FOLDER: &str = "Watchlist";

/// Optional position metadata for a ticker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<f64>,
}

impl Holding {
    pub fn is_empty(&self) -> bool {
        self.cost.is_none() && self.shares.is_none()
    }
}

/// Tickers in one folder. Membership is a set; order is first insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    tickers: Vec<String>,
    holdings: HashMap<String, Holding>,
}

impl Watchlist {
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.tickers.iter().any(|t| t == ticker)
    }

    pub fn holding(&self, ticker: &str) -> Option<&Holding> {
        self.holdings.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    fn insert(&mut self, ticker: String) -> bool {
        if self.contains(&ticker) {
            return false;
        }
        self.tickers.push(ticker);
        true
    }

    fn remove(&mut self, ticker: &str) -> bool {
        self.holdings.remove(ticker);
        let before = self.tickers.len();
        self.tickers.retain(|t| t != ticker);
        before != self.tickers.len()
    }

    fn has_holdings(&self) -> bool {
        self.holdings.values().any(|h| !h.is_empty())
    }
}

/// Every folder, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WatchlistsRepr", into = "BTreeMap<String, FolderRepr>")]
pub struct Watchlists {
    folders: BTreeMap<String, Watchlist>,
}

fn clean_name(name: &str) -> Result<String, DashboardError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DashboardError::UserInput("Folder name is empty".to_string()));
    }
    Ok(name.to_string())
}

fn clean_ticker(ticker: &str) -> Result<String, DashboardError> {
    let ticker = ticker.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(DashboardError::UserInput("Ticker is empty".to_string()));
    }
    Ok(ticker)
}

impl Watchlists {
    /// Folders used when no saved state exists.
    pub fn seeded() -> Self {
        let mut lists = Self::default();
        let folder = lists.folders.entry("Blue Chips".to_string()).or_default();
        folder.insert("2330".to_string());
        folder.insert("TSLA".to_string());
        lists
    }

    pub fn get(&self, folder: &str) -> Option<&Watchlist> {
        self.folders.get(folder.trim())
    }

    pub fn contains(&self, folder: &str) -> bool {
        self.folders.contains_key(folder.trim())
    }

    pub fn folders(&self) -> impl Iterator<Item = (&str, &Watchlist)> {
        self.folders.iter().map(|(name, list)| (name.as_str(), list))
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Returns `false` when the folder already existed.
    pub fn create_folder(&mut self, name: &str) -> Result<bool, DashboardError> {
        let name = clean_name(name)?;
        if self.folders.contains_key(&name) {
            return Ok(false);
        }
        self.folders.insert(name, Watchlist::default());
        Ok(true)
    }

    pub fn delete_folder(&mut self, name: &str) -> bool {
        self.folders.remove(name.trim()).is_some()
    }

    fn folder_mut(&mut self, folder: &str) -> Result<&mut Watchlist, DashboardError> {
        self.folders
            .get_mut(folder.trim())
            .ok_or_else(|| DashboardError::UserInput(format!("Folder '{}' does not exist", folder.trim())))
    }

    /// Returns `false` when the ticker was already a member.
    pub fn add_ticker(&mut self, folder: &str, ticker: &str) -> Result<bool, DashboardError> {
        let ticker = clean_ticker(ticker)?;
        Ok(self.folder_mut(folder)?.insert(ticker))
    }

    /// Returns `false` when the ticker was not a member.
    pub fn remove_ticker(&mut self, folder: &str, ticker: &str) -> Result<bool, DashboardError> {
        let ticker = clean_ticker(ticker)?;
        Ok(self.folder_mut(folder)?.remove(&ticker))
    }

    /// Record cost/shares for a ticker, adding it to the folder if needed.
    pub fn set_holding(&mut self, folder: &str, ticker: &str, holding: Holding) -> Result<(), DashboardError> {
        let ticker = clean_ticker(ticker)?;
        let list = self.folder_mut(folder)?;
        list.insert(ticker.clone());
        if holding.is_empty() {
            list.holdings.remove(&ticker);
        } else {
            list.holdings.insert(ticker, holding);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WatchlistsRepr {
    Flat(Vec<String>),
    Folders(BTreeMap<String, FolderRepr>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FolderRepr {
    Tickers(Vec<String>),
    Holdings(OrderedHoldings),
}

/// Ticker -> holding map that keeps the file's entry order.
#[derive(Debug, Clone, Default)]
struct OrderedHoldings(Vec<(String, Holding)>);

impl Serialize for OrderedHoldings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (ticker, holding) in &self.0 {
            map.serialize_entry(ticker, holding)?;
        }
        map.end()
    }
}

struct OrderedHoldingsVisitor;

impl<'de> Visitor<'de> for OrderedHoldingsVisitor {
    type Value = OrderedHoldings;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("map of ticker to holding")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((ticker, holding)) = map.next_entry::<String, Holding>()? {
            entries.push((ticker, holding));
        }
        Ok(OrderedHoldings(entries))
    }
}

impl<'de> Deserialize<'de> for OrderedHoldings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedHoldingsVisitor)
    }
}

impl From<FolderRepr> for Watchlist {
    fn from(repr: FolderRepr) -> Self {
        let mut list = Watchlist::default();
        let entries: Vec<(String, Holding)> = match repr {
            FolderRepr::Tickers(tickers) => tickers.into_iter().map(|t| (t, Holding::default())).collect(),
            FolderRepr::Holdings(OrderedHoldings(entries)) => entries,
        };

        for (ticker, holding) in entries {
            let Ok(ticker) = clean_ticker(&ticker) else {
                continue;
            };
            list.insert(ticker.clone());
            if !holding.is_empty() {
                list.holdings.insert(ticker, holding);
            }
        }
        list
    }
}

impl From<WatchlistsRepr> for Watchlists {
    fn from(repr: WatchlistsRepr) -> Self {
        let folders = match repr {
            WatchlistsRepr::Flat(tickers) => {
                BTreeMap::from([(DEFAULT_FOLDER.to_string(), FolderRepr::Tickers(tickers).into())])
            }
            WatchlistsRepr::Folders(map) => map
                .into_iter()
                .filter_map(|(name, folder)| Some((clean_name(&name).ok()?, folder.into())))
                .collect(),
        };
        Watchlists { folders }
    }
}

impl From<Watchlists> for BTreeMap<String, FolderRepr> {
    fn from(lists: Watchlists) -> Self {
        lists
            .folders
            .into_iter()
            .map(|(name, list)| {
                let repr = if list.has_holdings() {
                    FolderRepr::Holdings(OrderedHoldings(
                        list.tickers
                            .iter()
                            .map(|t| (t.clone(), list.holdings.get(t).copied().unwrap_or_default()))
                            .collect(),
                    ))
                } else {
                    FolderRepr::Tickers(list.tickers)
                };
                (name, repr)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_is_a_set() {
        let mut lists = Watchlists::default();
        assert!(lists.create_folder("Tech").unwrap());
        assert!(!lists.create_folder(" Tech ").unwrap());

        assert!(lists.add_ticker("Tech", " tsla ").unwrap());
        assert!(!lists.add_ticker("Tech", "TSLA").unwrap());
        assert_eq!(lists.get("Tech").unwrap().tickers(), &["TSLA"]);

        assert!(lists.remove_ticker("Tech", "tsla").unwrap());
        assert!(!lists.remove_ticker("Tech", "TSLA").unwrap());
        assert!(lists.get("Tech").unwrap().is_empty());
    }

    #[test]
    fn test_missing_folder_is_user_input_error() {
        let mut lists = Watchlists::default();
        let err = lists.add_ticker("Nope", "AAPL").unwrap_err();
        assert!(matches!(err, DashboardError::UserInput(_)));
        assert!(matches!(lists.create_folder("  "), Err(DashboardError::UserInput(_))));
        assert!(lists.is_empty());
    }

    #[test]
    fn test_loads_flat_list() {
        let lists: Watchlists = serde_json::from_str(r#"["2330", "tsla", "2330"]"#).unwrap();
        assert_eq!(lists.get(DEFAULT_FOLDER).unwrap().tickers(), &["2330", "TSLA"]);
    }

    #[test]
    fn test_loads_folder_lists() {
        let lists: Watchlists =
            serde_json::from_str(r#"{"Blue Chips": ["2330", "TSLA"], "Empty": []}"#).unwrap();
        assert_eq!(lists.len(), 2);
        assert_eq!(lists.get("Blue Chips").unwrap().tickers(), &["2330", "TSLA"]);
    }

    #[test]
    fn test_loads_holdings_and_writes_them_back() {
        let json = r#"{"Core": {"2330": {"cost": 600.0, "shares": 1000.0}, "AAPL": {}}}"#;
        let lists: Watchlists = serde_json::from_str(json).unwrap();

        let core = lists.get("Core").unwrap();
        assert_eq!(core.len(), 2);
        assert_eq!(core.holding("2330").unwrap().shares, Some(1000.0));
        assert_eq!(core.holding("AAPL"), None);

        let back = serde_json::to_value(&lists).unwrap();
        assert_eq!(back["Core"]["2330"]["cost"], 600.0);
        assert!(back["Core"]["AAPL"].is_object());
    }

    #[test]
    fn test_holdings_keep_insertion_order() {
        let mut lists = Watchlists::default();
        lists.create_folder("Semis").unwrap();
        lists.add_ticker("Semis", "NVDA").unwrap();
        lists
            .set_holding("Semis", "2330", Holding { cost: Some(600.0), shares: Some(1000.0) })
            .unwrap();
        assert_eq!(lists.get("Semis").unwrap().tickers(), &["NVDA", "2330"]);

        let json = serde_json::to_string(&lists).unwrap();
        assert!(json.find("NVDA").unwrap() < json.find("2330").unwrap());

        let back: Watchlists = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("Semis").unwrap().tickers(), &["NVDA", "2330"]);
        assert_eq!(back, lists);
    }

    #[test]
    fn test_plain_folders_serialize_as_lists() {
        let lists = Watchlists::seeded();
        let json = serde_json::to_string(&lists).unwrap();
        assert_eq!(json, r#"{"Blue Chips":["2330","TSLA"]}"#);
    }

    #[test]
    fn test_set_holding_adds_ticker() {
        let mut lists = Watchlists::seeded();
        lists
            .set_holding("Blue Chips", "aapl", Holding { cost: Some(150.0), shares: Some(10.0) })
            .unwrap();
        let folder = lists.get("Blue Chips").unwrap();
        assert!(folder.contains("AAPL"));
        assert_eq!(folder.holding("AAPL").unwrap().cost, Some(150.0));
    }
}
