//! Recognized equality filters for the objects collection

/// A filterable column. Declaration order is the clause precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Date,
    MealTime,
    LineType,
}

impl FilterKey {
    /// All keys in clause precedence order
    pub const ALL: [FilterKey; 3] = [Self::Date, Self::MealTime, Self::LineType];

    /// Query parameter name, which is also the column name
    pub fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::MealTime => "meal_time",
            Self::LineType => "line_type",
        }
    }

    /// Key for a query parameter name, if recognized
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

/// Filter values supplied on a request.
///
/// Unknown parameters are ignored and an empty value counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    date: Option<String>,
    meal_time: Option<String>,
    line_type: Option<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded query pairs. A repeated key keeps its first value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filters = Self::new();
        for (name, value) in pairs {
            if let Some(key) = FilterKey::from_name(name.as_ref()) {
                let slot = filters.slot_mut(key);
                if slot.is_none() {
                    *slot = Some(value.into());
                }
            }
        }
        filters
    }

    /// Builder-style setter
    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        *self.slot_mut(key) = Some(value.into());
        self
    }

    /// Value for `key`, treating empty strings as absent
    pub fn get(&self, key: FilterKey) -> Option<&str> {
        let value = match key {
            FilterKey::Date => self.date.as_deref(),
            FilterKey::MealTime => self.meal_time.as_deref(),
            FilterKey::LineType => self.line_type.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Present filters in precedence order
    pub fn present(&self) -> impl Iterator<Item = (FilterKey, &str)> + '_ {
        FilterKey::ALL
            .into_iter()
            .filter_map(move |key| self.get(key).map(|value| (key, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }

    fn slot_mut(&mut self, key: FilterKey) -> &mut Option<String> {
        match key {
            FilterKey::Date => &mut self.date,
            FilterKey::MealTime => &mut self.meal_time,
            FilterKey::LineType => &mut self.line_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_follows_precedence() {
        let filters = FilterSet::new()
            .with(FilterKey::LineType, "grill")
            .with(FilterKey::Date, "2024-01-01");

        let present: Vec<_> = filters.present().collect();
        assert_eq!(
            present,
            vec![(FilterKey::Date, "2024-01-01"), (FilterKey::LineType, "grill")]
        );
    }

    #[test]
    fn empty_value_is_absent() {
        let filters = FilterSet::new().with(FilterKey::MealTime, "");
        assert_eq!(filters.get(FilterKey::MealTime), None);
        assert!(filters.is_empty());
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let filters = FilterSet::from_pairs([
            ("date", "2024-01-01"),
            ("api_key", "k"),
            ("limit", "10"),
        ]);

        assert_eq!(filters.get(FilterKey::Date), Some("2024-01-01"));
        assert_eq!(filters.present().count(), 1);
    }

    #[test]
    fn repeated_key_keeps_first_value() {
        let filters = FilterSet::from_pairs([
            ("date", "2024-01-01"),
            ("meal_time", "lunch"),
            ("date", "2024-01-02"),
        ]);

        assert_eq!(filters.get(FilterKey::Date), Some("2024-01-01"));
        assert_eq!(filters.get(FilterKey::MealTime), Some("lunch"));
    }

    #[test]
    fn empty_first_value_still_wins() {
        let filters = FilterSet::from_pairs([("line_type", ""), ("line_type", "grill")]);
        assert_eq!(filters.get(FilterKey::LineType), None);
    }

    #[test]
    fn from_name_accepts_exact_names_only() {
        for key in FilterKey::ALL {
            assert_eq!(FilterKey::from_name(key.name()), Some(key));
        }
        assert_eq!(FilterKey::from_name("Date"), None);
    }
}
