use serde::{Deserialize, Serialize};

/// One market as returned by Gamma `/markets`. Only the fields discovery reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    #[serde(default)]
    pub id: Option<StringOrNumber>,
    #[serde(default)]
    pub question: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub end_date: Option<String>,
    /// Usually a JSON-encoded string (`"[\"Yes\", \"No\"]"`), sometimes a list
    pub outcomes: Option<EncodedList>,
    pub outcome_prices: Option<EncodedList>,
    /// Strike label on grouped markets (`"↑ 120,000"`)
    pub group_item_title: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub closed: Option<bool>,
}

impl GammaMarket {
    pub fn id_string(&self) -> String {
        match &self.id {
            Some(StringOrNumber::Str(s)) => s.clone(),
            Some(StringOrNumber::Num(n)) => n.to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    Str(String),
    Num(f64),
}

impl StringOrNumber {
    /// Strict numeric read: a JSON number or a string holding only a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Str(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// Gamma double-encodes list fields. Accept either shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncodedList {
    Encoded(String),
    List(Vec<StringOrNumber>),
}

impl EncodedList {
    /// Decodes into entries. The encoded form must itself be a JSON array;
    /// anything else is rejected, never interpreted.
    pub fn entries(&self) -> Option<Vec<StringOrNumber>> {
        match self {
            Self::List(items) => Some(items.clone()),
            Self::Encoded(s) => serde_json::from_str::<Vec<StringOrNumber>>(s).ok(),
        }
    }
}
