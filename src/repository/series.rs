//! Encoded series names.
//!
//! A series is keyed by `tenant?region&name&dim1=v1&dim2=v2`, every component
//! URL-encoded and dimensions sorted case-insensitively by name, then value.
//! Names that do not have this shape were written by something else and are
//! skipped on read.

use std::cmp::Ordering;

use crate::models::Dimensions;
use crate::{MonitorError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesName {
    pub tenant_id: String,
    pub region: String,
    pub name: String,
    pub dimensions: Dimensions,
}

pub fn encode(tenant_id: &str, region: &str, name: &str, dimensions: &Dimensions) -> String {
    let mut encoded = format!(
        "{}?{}&{}",
        urlencoding::encode(tenant_id),
        urlencoding::encode(region),
        urlencoding::encode(name)
    );
    for (dim_name, dim_value) in sorted_dimensions(dimensions) {
        encoded.push('&');
        encoded.push_str(&urlencoding::encode(dim_name));
        encoded.push('=');
        encoded.push_str(&urlencoding::encode(dim_value));
    }
    encoded
}

fn sorted_dimensions(dimensions: &Dimensions) -> Vec<(&String, &String)> {
    let mut sorted: Vec<_> = dimensions.iter().collect();
    sorted.sort_by(|a, b| match case_insensitive(a.0, b.0) {
        Ordering::Equal => case_insensitive(a.1, b.1),
        other => other,
    });
    sorted
}

fn case_insensitive(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn decode_component(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|e| MonitorError::SeriesDecode(format!("{}: {}", raw, e)))
}

/// Whether `series` has the `tenant?region&name(&dim=value)*` shape.
pub fn is_series_name(series: &str) -> bool {
    let Some((tenant, rest)) = series.split_once('?') else {
        return false;
    };
    let mut parts = rest.split('&');
    let region = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    if tenant.is_empty() || region.is_empty() || name.is_empty() {
        return false;
    }
    parts.all(|pair| match pair.split_once('=') {
        Some((dim_name, dim_value)) => !dim_name.is_empty() && !dim_value.is_empty(),
        None => false,
    })
}

impl SeriesName {
    pub fn decode(series: &str) -> Result<Self> {
        if !is_series_name(series) {
            return Err(MonitorError::SeriesDecode(series.to_string()));
        }

        let (tenant, rest) = series
            .split_once('?')
            .ok_or_else(|| MonitorError::SeriesDecode(series.to_string()))?;
        let mut parts = rest.split('&');
        let region = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();

        let mut dimensions = Dimensions::new();
        for pair in parts {
            if let Some((dim_name, dim_value)) = pair.split_once('=') {
                dimensions.insert(decode_component(dim_name)?, decode_component(dim_value)?);
            }
        }

        Ok(Self {
            tenant_id: decode_component(tenant)?,
            region: decode_component(region)?,
            name: decode_component(name)?,
            dimensions,
        })
    }

    pub fn encode(&self) -> String {
        encode(&self.tenant_id, &self.region, &self.name, &self.dimensions)
    }

    /// Name equality (when a name is given) and dimension superset.
    pub fn matches(&self, name: Option<&str>, dimensions: Option<&Dimensions>) -> bool {
        if let Some(name) = name {
            if self.name != name {
                return false;
            }
        }
        dimensions.map_or(true, |wanted| {
            wanted
                .iter()
                .all(|(k, v)| self.dimensions.get(k).map_or(false, |have| have == v))
        })
    }
}
