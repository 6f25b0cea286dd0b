//! Common API types and utilities

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 200;

mod string_or_number {
    use serde::{de, Deserialize, Deserializer};

    pub fn deserialize_u32_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNum {
            Num(u32),
            Str(String),
        }

        match Option::<StringOrNum>::deserialize(deserializer)? {
            Some(StringOrNum::Num(n)) => Ok(Some(n)),
            Some(StringOrNum::Str(s)) if s.is_empty() => Ok(None),
            Some(StringOrNum::Str(s)) => s.parse().map(Some).map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

pub(crate) use string_or_number::deserialize_u32_opt;

/// Pagination parameters (`pageNo` is 1-based)
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageParam {
    #[serde(default, deserialize_with = "string_or_number::deserialize_u32_opt")]
    page_no: Option<u32>,
    #[serde(default, deserialize_with = "string_or_number::deserialize_u32_opt")]
    page_size: Option<u32>,
}

impl PageParam {
    pub fn new(page_no: u32, page_size: u32) -> Self {
        Self {
            page_no: Some(page_no),
            page_size: Some(page_size),
        }
    }

    pub fn page_no(&self) -> u32 {
        self.page_no.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page_no() as i64 - 1) * self.page_size() as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size() as i64
    }
}

impl Default for PageParam {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Query parameter carrying a single numeric id
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_param_defaults_and_offset() {
        let param: PageParam = serde_json::from_str("{}").unwrap();
        assert_eq!(param.page_no(), 1);
        assert_eq!(param.page_size(), 10);
        assert_eq!(param.offset(), 0);

        let param: PageParam = serde_json::from_str(r#"{"pageNo":"3","pageSize":20}"#).unwrap();
        assert_eq!(param.offset(), 40);
        assert_eq!(param.limit(), 20);
    }

    #[test]
    fn test_page_param_clamps() {
        let param = PageParam::new(0, 10_000);
        assert_eq!(param.page_no(), 1);
        assert_eq!(param.page_size(), MAX_PAGE_SIZE);
    }
}
