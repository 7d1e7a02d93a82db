//! Google Sheets v4 access over plain REST.

pub mod auth;
pub mod cell;
pub mod column;

use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::CogError;
pub use auth::{Credentials, SheetsClient};
pub use column::Column;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/";

/// Rows of cells, or columns of cells when the dimension says so.
pub type Grid = Vec<Vec<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dim {
    Rows,
    Columns,
}

impl Dim {
    fn as_str(self) -> &'static str {
        match self {
            Self::Rows => "ROWS",
            Self::Columns => "COLUMNS",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Grid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchValues {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: &'a str,
    major_dimension: Dim,
    values: &'a Grid,
}

/// One page (tab) of one spreadsheet.
#[derive(Clone)]
pub struct GSheet {
    client: Arc<SheetsClient>,
    pub sheet_id: String,
    pub page: String,
}

impl std::fmt::Debug for GSheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GSheet")
            .field("sheet_id", &self.sheet_id)
            .field("page", &self.page)
            .finish()
    }
}

/// Prefix ranges beginning with `!` with the quoted page name.
pub fn full_range(page: &str, range: &str) -> String {
    if range.starts_with('!') {
        format!("'{}'{range}", page.replace('\'', "''"))
    } else {
        range.to_owned()
    }
}

impl GSheet {
    pub fn new(
        client: Arc<SheetsClient>,
        sheet_id: impl Into<String>,
        page: impl Into<String>,
    ) -> Self {
        Self {
            client,
            sheet_id: sheet_id.into(),
            page: page.into(),
        }
    }

    /// Same spreadsheet, different page.
    pub fn with_page(&self, page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            ..self.clone()
        }
    }

    fn url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = Url::parse(SHEETS_API)?;
        url.path_segments_mut()
            .map_err(|_| eyre!("sheets api url cannot be a base"))?
            .pop_if_empty()
            .extend(["spreadsheets", self.sheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let token = self.client.access_token().await?;
        Ok(self.client.http.request(method, url).bearer_auth(token))
    }

    async fn execute(req: RequestBuilder) -> Result<Value> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CogError::Remote {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }
            .into());
        }
        Ok(resp.json().await?)
    }

    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn get(&self, range: &str, dim: Dim) -> Result<Grid> {
        let range = full_range(&self.page, range);
        let url = self.url(&["values", &range])?;
        let req = self.request(Method::GET, url).await?.query(&[
            ("majorDimension", dim.as_str()),
            ("valueRenderOption", "UNFORMATTED_VALUE"),
        ]);
        let body: ValueRange = serde_json::from_value(Self::execute(req).await?)?;
        Ok(body.values)
    }

    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn batch_get(&self, ranges: &[&str], dim: Dim) -> Result<Vec<Grid>> {
        let url = self.url(&["values:batchGet"])?;
        let mut query = vec![
            ("majorDimension", dim.as_str().to_owned()),
            ("valueRenderOption", "UNFORMATTED_VALUE".to_owned()),
        ];
        query.extend(ranges.iter().map(|r| ("ranges", full_range(&self.page, r))));

        let req = self.request(Method::GET, url).await?.query(&query);
        let body: BatchValues = serde_json::from_value(Self::execute(req).await?)?;
        Ok(body.value_ranges.into_iter().map(|v| v.values).collect())
    }

    #[instrument(skip(self, values), fields(page = %self.page))]
    pub async fn update(&self, range: &str, values: Grid, dim: Dim) -> Result<()> {
        let range = full_range(&self.page, range);
        let url = self.url(&["values", &range])?;
        let body = ValueRangeBody {
            range: &range,
            major_dimension: dim,
            values: &values,
        };
        let req = self
            .request(Method::PUT, url)
            .await?
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        Self::execute(req).await?;
        debug!("Updated {range}");
        Ok(())
    }

    #[instrument(skip(self, values), fields(page = %self.page))]
    pub async fn batch_update(&self, ranges: &[&str], values: Vec<Grid>, dim: Dim) -> Result<()> {
        let ranges: Vec<String> = ranges.iter().map(|r| full_range(&self.page, r)).collect();
        let data: Vec<ValueRangeBody<'_>> = ranges
            .iter()
            .zip(values.iter())
            .map(|(range, values)| ValueRangeBody {
                range,
                major_dimension: dim,
                values,
            })
            .collect();

        let url = self.url(&["values:batchUpdate"])?;
        let req = self
            .request(Method::POST, url)
            .await?
            .json(&json!({ "valueInputOption": "RAW", "data": data }));
        Self::execute(req).await?;
        debug!("Updated {}", ranges.join(", "));
        Ok(())
    }

    #[instrument(skip(self, values), fields(page = %self.page))]
    pub async fn append(&self, range: &str, values: Grid) -> Result<()> {
        let range = full_range(&self.page, range);
        let url = self.url(&["values", &format!("{range}:append")])?;
        let req = self
            .request(Method::POST, url)
            .await?
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": values }));
        Self::execute(req).await?;
        Ok(())
    }

    /// Every value on the page, column major.
    pub async fn whole_sheet(&self) -> Result<Grid> {
        self.get("!A:ZZ", Dim::Columns).await
    }

    /// The raw spreadsheet document for `range`, including effective formats.
    #[instrument(skip(self), fields(page = %self.page))]
    pub async fn get_with_formatting(&self, range: &str) -> Result<Value> {
        let url = self.url(&[])?;
        let req = self.request(Method::GET, url).await?.query(&[
            ("ranges", full_range(&self.page, range).as_str()),
            ("includeGridData", "true"),
            (
                "fields",
                "sheets(data(rowData(values(effectiveFormat(backgroundColor),effectiveValue))))",
            ),
        ]);
        Self::execute(req).await
    }

    /// Titles of all pages in the spreadsheet.
    pub async fn page_titles(&self) -> Result<Vec<String>> {
        let url = self.url(&[])?;
        let req = self
            .request(Method::GET, url)
            .await?
            .query(&[("fields", "sheets.properties.title")]);
        let body = Self::execute(req).await?;

        Ok(body["sheets"]
            .as_array()
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s["properties"]["title"].as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Bump the last number in a page name, `Cycle 159` becomes `Cycle 160`.
pub fn number_increment(text: &str) -> Result<String, CogError> {
    lazy_static::lazy_static! {
        #[allow(clippy::expect_used)]
        static ref LAST_NUMBER: regex::Regex =
            regex::Regex::new(r"(\d+)(\D*)$").expect("valid regex");
    }

    let caps = LAST_NUMBER
        .captures(text)
        .ok_or_else(|| CogError::invalid_args(format!("No number to increment in `{text}`.")))?;
    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let number: u64 = caps[1]
        .parse()
        .map_err(|_| CogError::invalid_args(format!("Number too large in `{text}`.")))?;

    Ok(format!("{}{}{}", &text[..whole.start], number + 1, &caps[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_get_page_prefix() {
        assert_eq!(full_range("Cycle 160", "!A1:B2"), "'Cycle 160'!A1:B2");
        assert_eq!(full_range("Bob's", "!A1"), "'Bob''s'!A1");
        assert_eq!(full_range("Cycle 160", "Other!A1"), "Other!A1");
    }

    #[test]
    fn page_increment() {
        assert_eq!(number_increment("Cycle 159").unwrap(), "Cycle 160");
        assert_eq!(number_increment("Cycle 99 - Hudson").unwrap(), "Cycle 100 - Hudson");
        assert_eq!(number_increment("UM 2 of 7").unwrap(), "UM 2 of 8");
        assert!(number_increment("Cycle").is_err());
    }

    #[test]
    fn dims_serialize_upper() {
        assert_eq!(serde_json::to_value(Dim::Columns).unwrap(), json!("COLUMNS"));
    }
}
