use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Query parameters understood by the `data` and `export` endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    DataInicio,
    DataFim,
    Status,
    Remessa,
    Loja,
    Codigo,
}

impl FilterKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::DataInicio => "data_inicio",
            FilterKey::DataFim => "data_fim",
            FilterKey::Status => "status",
            FilterKey::Remessa => "remessa",
            FilterKey::Loja => "loja",
            FilterKey::Codigo => "codigo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "data_inicio" | "inicio" | "from" => Some(FilterKey::DataInicio),
            "data_fim" | "fim" | "to" => Some(FilterKey::DataFim),
            "status" => Some(FilterKey::Status),
            "remessa" => Some(FilterKey::Remessa),
            "loja" => Some(FilterKey::Loja),
            "codigo" | "código" => Some(FilterKey::Codigo),
            _ => None,
        }
    }

    pub fn is_date(self) -> bool {
        matches!(self, FilterKey::DataInicio | FilterKey::DataFim)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    values: BTreeMap<FilterKey, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter set from raw form values. Unknown names and empty
    /// values are dropped; everything else is kept verbatim.
    pub fn from_raw<I, K, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = FilterSet::new();
        for (name, value) in raw {
            match FilterKey::parse(name.as_ref()) {
                Some(key) => set.set(key, value.as_ref()),
                None => tracing::debug!(name = name.as_ref(), "ignoring unknown filter"),
            }
        }
        set
    }

    /// Sets `key`, or removes it when `value` is empty.
    pub fn set(&mut self, key: FilterKey, value: &str) {
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value.to_string());
        }
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect()
    }

    pub fn validate_dates(&self) -> Result<(), String> {
        for (key, value) in self.iter().filter(|(k, _)| k.is_date()) {
            crate::utils::parse_iso_date(value).map_err(|e| format!("invalid {key}: {e}"))?;
        }
        Ok(())
    }

    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(
            self.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}
