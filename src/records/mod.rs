use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::utils;

pub const DESCRIPTION_DISPLAY_CHARS: usize = 30;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    #[default]
    Pendente,
    EmSeparacao,
    Finalizado,
    Faturado,
    Other(String),
}

impl RecordStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::Pendente => "Pendente",
            RecordStatus::EmSeparacao => "em_separacao",
            RecordStatus::Finalizado => "Finalizado",
            RecordStatus::Faturado => "Faturado",
            RecordStatus::Other(raw) => raw.as_str(),
        }
    }

    pub fn css_class(&self) -> String {
        utils::css_token(self.as_str())
    }
}

impl From<String> for RecordStatus {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pendente" => RecordStatus::Pendente,
            "em_separacao" | "em separacao" | "em separação" => RecordStatus::EmSeparacao,
            "finalizado" => RecordStatus::Finalizado,
            "faturado" => RecordStatus::Faturado,
            _ => RecordStatus::Other(value),
        }
    }
}

impl From<RecordStatus> for String {
    fn from(value: RecordStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Int(v)) => v.to_string(),
        Some(NumberOrString::Float(v)) => utils::format_quantity(v),
        Some(NumberOrString::Text(v)) => v,
        None => String::new(),
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_string(deserializer)?;
    Ok(if value.trim().is_empty() {
        None
    } else {
        Some(value)
    })
}

// missing, null or blank status is a pending record
fn status_or_pending<'de, D>(deserializer: D) -> Result<RecordStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => RecordStatus::from(raw),
        _ => RecordStatus::Pendente,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        Some(NumberOrString::Int(v)) => Ok(v as f64),
        Some(NumberOrString::Float(v)) => Ok(v),
        Some(NumberOrString::Text(v)) if v.trim().is_empty() => Ok(0.0),
        Some(NumberOrString::Text(v)) => v
            .trim()
            .parse::<f64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid quantity '{v}': {e}"))),
        None => Ok(0.0),
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Record {
    pub id: i64,
    #[serde(rename = "Loja", default, deserialize_with = "lenient_string")]
    pub store: String,
    #[serde(rename = "Remessa", default, deserialize_with = "lenient_string")]
    pub shipment_id: String,
    #[serde(rename = "Codigo", default, deserialize_with = "lenient_string")]
    pub product_code: String,
    #[serde(rename = "Descricao_Produto", default, deserialize_with = "lenient_string")]
    pub product_description: String,
    #[serde(rename = "Qtde_Emb", default, deserialize_with = "lenient_f64")]
    pub packaging_qty: f64,
    #[serde(rename = "Status", default, deserialize_with = "status_or_pending")]
    pub status: RecordStatus,
    #[serde(
        rename = "Data_Registro_Formatted",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub registered_at_formatted: Option<String>,
}

impl Record {
    pub fn short_description(&self) -> String {
        utils::truncate_chars(&self.product_description, DESCRIPTION_DISPLAY_CHARS)
    }

    pub fn registered_at_display(&self) -> &str {
        utils::or_na(self.registered_at_formatted.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: Record,
    #[serde(rename = "Local", default, deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(rename = "Ordem", default, deserialize_with = "lenient_string")]
    pub order: String,
    #[serde(rename = "Posicao_Deposito", default, deserialize_with = "lenient_string")]
    pub warehouse_position: String,
    #[serde(rename = "UM", default, deserialize_with = "lenient_string")]
    pub unit: String,
    #[serde(rename = "EAN", default, deserialize_with = "lenient_opt_string")]
    pub ean: Option<String>,
    #[serde(rename = "Qtde_CX", default, deserialize_with = "lenient_f64")]
    pub box_qty: f64,
    #[serde(rename = "Qtde_UM", default, deserialize_with = "lenient_f64")]
    pub unit_qty: f64,
    #[serde(rename = "Estoque", default, deserialize_with = "lenient_f64")]
    pub stock: f64,
    #[serde(rename = "Usuario", default, deserialize_with = "lenient_opt_string")]
    pub user: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardStats {
    pub total_remessas: u64,
    pub pendentes: u64,
    pub em_separacao: u64,
    pub finalizados: u64,
    pub faturados: u64,
    pub percentual_corte: f64,
    pub total_itens: u64,
    pub itens_com_corte: u64,
}

impl DashboardStats {
    pub fn cut_percentage_display(&self) -> String {
        format!("{}%", utils::format_quantity(self.percentual_corte))
    }
}
