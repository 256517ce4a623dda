// Query builder for the equipment listing and export endpoints.
//
// Pure translation from filter/sort intent to an ordered list of query
// parameters. Unset or empty fields are omitted entirely, never sent as
// empty strings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use url::Url;

/// Parameter keys understood by the listing endpoint, in emission order.
pub const PARAM_SEARCH: &str = "search";
pub const PARAM_MIN_PRESSURE: &str = "pressure__gte";
pub const PARAM_MIN_TEMPERATURE: &str = "temperature__gte";
pub const PARAM_MATERIAL: &str = "material";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_DATASET: &str = "dataset";
pub const PARAM_ORDERING: &str = "ordering";

/// Columns the server accepts in `ordering`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    Type,
    Material,
    Pressure,
    Temperature,
    Flowrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// The active sort: one column plus a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    /// Value of the `ordering` parameter: `-field` when descending.
    pub fn to_param(self) -> String {
        match self.direction {
            SortDirection::Ascending => self.field.to_string(),
            SortDirection::Descending => format!("-{}", self.field),
        }
    }
}

/// Filter, sort, and search intent for the equipment listing.
///
/// Owned by whoever drives the listing; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Name substring search. Blank means no search.
    #[serde(default)]
    pub search: String,
    pub min_pressure: Option<f64>,
    pub min_temperature: Option<f64>,
    pub material: Option<String>,
    pub equipment_type: Option<String>,
    pub dataset: Option<u64>,
    pub sort: Option<SortOrder>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle sorting on `field`.
    ///
    /// Same field as the current sort flips the direction; any other
    /// field (or no current sort) starts ascending on the new field.
    pub fn toggle_sort(&mut self, field: SortField) {
        self.sort = Some(match self.sort {
            Some(current) if current.field == field => SortOrder {
                field,
                direction: current.direction.flipped(),
            },
            _ => SortOrder::ascending(field),
        });
    }

    /// Drop the sort entirely (server default ordering).
    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// True when no parameter would be emitted.
    pub fn is_empty(&self) -> bool {
        self.to_params().is_empty()
    }

    /// Canonical, ordered `(key, value)` pairs for this query.
    ///
    /// Values are raw; percent-encoding happens when they are written
    /// into a URL (see [`ListQuery::apply_to`]).
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        if let Some(search) = non_blank(Some(self.search.as_str())) {
            params.push((PARAM_SEARCH, search));
        }
        if let Some(p) = finite(self.min_pressure) {
            params.push((PARAM_MIN_PRESSURE, p.to_string()));
        }
        if let Some(t) = finite(self.min_temperature) {
            params.push((PARAM_MIN_TEMPERATURE, t.to_string()));
        }
        if let Some(material) = non_blank(self.material.as_deref()) {
            params.push((PARAM_MATERIAL, material));
        }
        if let Some(kind) = non_blank(self.equipment_type.as_deref()) {
            params.push((PARAM_TYPE, kind));
        }
        if let Some(dataset) = self.dataset {
            params.push((PARAM_DATASET, dataset.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push((PARAM_ORDERING, sort.to_param()));
        }

        params
    }

    /// Percent-encoded query string (no leading `?`). Empty when no
    /// parameter is set.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.to_params() {
            serializer.append_pair(key, &value);
        }
        serializer.finish()
    }

    /// Replace `url`'s query with this query's parameters.
    ///
    /// Leaves no dangling `?` when the query is empty.
    pub fn apply_to(&self, url: &mut Url) {
        let params = self.to_params();
        if params.is_empty() {
            url.set_query(None);
            return;
        }
        url.query_pairs_mut()
            .clear()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn default_query_emits_nothing() {
        let q = ListQuery::default();
        assert!(q.to_params().is_empty());
        assert_eq!(q.to_query_string(), "");
    }

    #[test]
    fn blank_text_fields_are_omitted() {
        let q = ListQuery {
            search: "   ".into(),
            material: Some(String::new()),
            equipment_type: Some(" ".into()),
            ..ListQuery::default()
        };
        assert!(q.is_empty());
    }

    #[test]
    fn full_query_is_ordered_canonically() {
        let q = ListQuery {
            search: "pump".into(),
            min_pressure: Some(10.0),
            min_temperature: Some(95.5),
            material: Some("Steel".into()),
            equipment_type: Some("Pump".into()),
            dataset: Some(3),
            sort: Some(SortOrder::descending(SortField::Pressure)),
        };
        assert_eq!(
            q.to_params(),
            vec![
                ("search", "pump".to_string()),
                ("pressure__gte", "10".to_string()),
                ("temperature__gte", "95.5".to_string()),
                ("material", "Steel".to_string()),
                ("type", "Pump".to_string()),
                ("dataset", "3".to_string()),
                ("ordering", "-pressure".to_string()),
            ]
        );
    }

    #[test]
    fn zero_threshold_is_still_a_filter() {
        let q = ListQuery {
            min_pressure: Some(0.0),
            ..ListQuery::default()
        };
        assert_eq!(q.to_params(), vec![("pressure__gte", "0".to_string())]);
    }

    #[test]
    fn non_finite_thresholds_are_dropped() {
        let q = ListQuery {
            min_pressure: Some(f64::NAN),
            min_temperature: Some(f64::INFINITY),
            ..ListQuery::default()
        };
        assert!(q.is_empty());
    }

    #[test]
    fn reserved_characters_are_percent_encoded() {
        let q = ListQuery {
            search: "a&b=c/d".into(),
            material: Some("Stainless #316".into()),
            ..ListQuery::default()
        };
        let qs = q.to_query_string();
        assert_eq!(qs, "search=a%26b%3Dc%2Fd&material=Stainless+%23316");
    }

    #[test]
    fn apply_to_replaces_existing_query() {
        let mut url = Url::parse("http://localhost/api/equipment/?page=4").unwrap();
        let q = ListQuery {
            search: "valve".into(),
            ..ListQuery::default()
        };
        q.apply_to(&mut url);
        assert_eq!(url.as_str(), "http://localhost/api/equipment/?search=valve");

        ListQuery::default().apply_to(&mut url);
        assert_eq!(url.as_str(), "http://localhost/api/equipment/");
    }

    #[test]
    fn ordering_prefix_follows_direction() {
        assert_eq!(SortOrder::ascending(SortField::Name).to_param(), "name");
        assert_eq!(SortOrder::descending(SortField::Flowrate).to_param(), "-flowrate");
    }

    #[test]
    fn toggling_same_field_twice_returns_to_ascending() {
        let mut q = ListQuery::default();
        q.toggle_sort(SortField::Name);
        assert_eq!(q.sort, Some(SortOrder::ascending(SortField::Name)));
        q.toggle_sort(SortField::Name);
        assert_eq!(q.sort, Some(SortOrder::descending(SortField::Name)));
        q.toggle_sort(SortField::Name);
        assert_eq!(q.sort, Some(SortOrder::ascending(SortField::Name)));
    }

    #[test]
    fn switching_field_resets_to_ascending() {
        let mut q = ListQuery::default();
        q.toggle_sort(SortField::Pressure);
        q.toggle_sort(SortField::Pressure);
        assert_eq!(q.sort, Some(SortOrder::descending(SortField::Pressure)));

        q.toggle_sort(SortField::Temperature);
        assert_eq!(q.sort, Some(SortOrder::ascending(SortField::Temperature)));
    }

    #[test]
    fn sort_field_parses_case_insensitively() {
        assert_eq!(SortField::from_str("Pressure").unwrap(), SortField::Pressure);
        assert_eq!(SortField::from_str("type").unwrap(), SortField::Type);
        assert!(SortField::from_str("id").is_err());
    }
}
