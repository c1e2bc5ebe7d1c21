// src/chinamoney/models.rs
#![allow(non_snake_case)]
use serde::{Deserialize, Serialize};

/// Envelope returned by the BondMarketInfoListEN endpoint.
/// Only the parts we read are modelled; everything is optional because the
/// API returns `null` for empty pages as readily as it omits keys.
#[derive(Debug, Default, Deserialize)]
pub struct BondListResponse {
    #[serde(default)]
    pub data: Option<BondListData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BondListData {
    #[serde(default)]
    pub resultList: Option<Vec<BondItem>>,
}

impl BondListResponse {
    pub fn into_items(self) -> Vec<BondItem> {
        self.data
            .and_then(|data| data.resultList)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BondItem {
    #[serde(default)]
    pub isin: Option<String>,
    #[serde(default)]
    pub bondCode: Option<String>,
    #[serde(default)]
    pub entyFullName: Option<String>,
    #[serde(default)]
    pub issueStartDate: Option<String>,
    #[serde(default)]
    pub debtRtng: Option<String>,
}

/// One output row of the bond CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BondRow {
    #[serde(rename = "ISIN")]
    pub isin: String,
    #[serde(rename = "Bond Code")]
    pub bond_code: String,
    #[serde(rename = "Issuer")]
    pub issuer: String,
    #[serde(rename = "Bond Type")]
    pub bond_type: String,
    #[serde(rename = "Issue Date")]
    pub issue_date: String,
    #[serde(rename = "Latest Rating")]
    pub latest_rating: String,
}

impl BondRow {
    /// Missing and `null` fields both become empty cells.
    pub fn from_item(item: BondItem, bond_type: &str) -> Self {
        Self {
            isin: item.isin.unwrap_or_default(),
            bond_code: item.bondCode.unwrap_or_default(),
            issuer: item.entyFullName.unwrap_or_default(),
            bond_type: bond_type.to_string(),
            issue_date: item.issueStartDate.unwrap_or_default(),
            latest_rating: item.debtRtng.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_parsing() {
        let json = r#"{
            "data": {
                "resultList": [
                    {"isin": "CND10005XYZ1", "bondCode": "230001", "entyFullName": "Ministry of Finance",
                     "issueStartDate": "2023-01-12", "debtRtng": null, "bondType": "Treasury"}
                ],
                "total": 1
            },
            "head": {"rep_code": "200"}
        }"#;
        let items: Vec<BondItem> = serde_json::from_str::<BondListResponse>(json).unwrap().into_items();
        assert_eq!(items.len(), 1);

        let row = BondRow::from_item(items[0].clone(), "Treasury Bond");
        assert_eq!(row.isin, "CND10005XYZ1");
        assert_eq!(row.bond_code, "230001");
        assert_eq!(row.issuer, "Ministry of Finance");
        assert_eq!(row.bond_type, "Treasury Bond");
        assert_eq!(row.issue_date, "2023-01-12");
        assert_eq!(row.latest_rating, "");
    }

    #[test]
    fn test_empty_and_null_pages() {
        for json in [r#"{}"#, r#"{"data": null}"#, r#"{"data": {}}"#, r#"{"data": {"resultList": null}}"#, r#"{"data": {"resultList": []}}"#] {
            let items = serde_json::from_str::<BondListResponse>(json).unwrap().into_items();
            assert!(items.is_empty(), "Expected no items for {}", json);
        }
    }
}
