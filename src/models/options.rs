use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Attribute categories that drive variation generation.
///
/// Declaration order is the product axis order: when expanding an
/// [`OptionSet`], the first-declared category varies slowest. Downstream
/// consumers rely on this for reproducible enumeration, so the order is a
/// contract, not a convenience.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Gender,
    Age,
    BodyType,
    Attire,
    Pose,
    Background,
    Style,
}

impl Category {
    /// Categories describing the subject of the image, as opposed to the
    /// scene around them or the rendering style.
    pub fn is_subject(self) -> bool {
        matches!(
            self,
            Category::Gender
                | Category::Age
                | Category::BodyType
                | Category::Attire
                | Category::Pose
        )
    }
}

/// Values that mean "leave this attribute alone". They are valid standalone
/// selections (so a user can request "no override" as one arm of a
/// multi-value category) and still occupy a slot in the Cartesian product,
/// but they never appear in an emitted [`Combination`].
const RESERVED_MARKERS: &[&str] = &["original", "as-is", "none", "default"];

/// Whether a selected value is a reserved "no constraint" marker.
pub fn is_reserved(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    RESERVED_MARKERS.contains(&normalized.as_str())
}

/// Per-category selection. `Permuted` contributes one product factor per
/// value; `Combined` joins all values into a single compound value and
/// contributes exactly one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "values", rename_all = "snake_case")]
pub enum Selection {
    Permuted(Vec<String>),
    Combined(Vec<String>),
}

impl Selection {
    pub fn values(&self) -> &[String] {
        match self {
            Selection::Permuted(values) | Selection::Combined(values) => values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// How many slots this selection contributes to the Cartesian product.
    pub fn product_factor(&self) -> usize {
        match self {
            Selection::Permuted(values) => values.len().max(1),
            Selection::Combined(_) => 1,
        }
    }
}

/// Scalar settings that travel with every job snapshot. Not combinatorial
/// inputs; they govern the scheduler and retry accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum number of simultaneously in-flight generation calls (1-10).
    pub concurrency: usize,
    /// Retry ceiling for transient failures (1-10).
    pub transient_retry_limit: u32,
    /// Retry ceiling for policy rejections (0-5). Normally much lower than
    /// the transient ceiling: repeating an unmodified request against a
    /// moderation filter rarely succeeds.
    pub policy_retry_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: 2,
            transient_retry_limit: 3,
            policy_retry_limit: 1,
        }
    }
}

impl EngineSettings {
    /// Clamp every scalar to its documented bounds. Out-of-range input is
    /// corrected, never rejected.
    pub fn clamped(self) -> Self {
        Self {
            concurrency: self.concurrency.clamp(1, 10),
            transient_retry_limit: self.transient_retry_limit.clamp(1, 10),
            policy_retry_limit: self.policy_retry_limit.min(5),
        }
    }
}

/// The full user selection: which values are active per category, which
/// categories are combined rather than permuted, the two mutually exclusive
/// operating modes, and the scalar engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionSet {
    #[serde(default)]
    pub selections: BTreeMap<Category, Selection>,
    /// Omit every subject category and instruct removal of all subjects.
    #[serde(default)]
    pub remove_subject: bool,
    /// Instruct discarding the original background in favor of the
    /// background-category content.
    #[serde(default)]
    pub replace_background: bool,
    #[serde(default)]
    pub settings: EngineSettings,
}

impl OptionSet {
    pub fn selection(&self, category: Category) -> Option<&Selection> {
        self.selections.get(&category)
    }

    /// Select values for a category in permuted mode. Duplicates are dropped,
    /// first occurrence wins; order is preserved for display.
    pub fn select(&mut self, category: Category, values: impl IntoIterator<Item = String>) {
        self.selections
            .insert(category, Selection::Permuted(dedup(values)));
    }

    /// Select values for a category in combined mode: all values are joined
    /// into a single compound value at expansion time.
    pub fn combine(&mut self, category: Category, values: impl IntoIterator<Item = String>) {
        self.selections
            .insert(category, Selection::Combined(dedup(values)));
    }

    /// The number of combinations [`expand`](crate::services::permutation::expand)
    /// will produce: the product of `max(1, |selection|)` over permuted
    /// categories, with combined and empty categories contributing 1.
    pub fn expected_count(&self) -> usize {
        self.selections
            .values()
            .map(Selection::product_factor)
            .product::<usize>()
            .max(1)
    }
}

fn dedup(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// One fully-resolved assignment of values across the option categories.
/// Absent categories carry no constraint. The two mode booleans are copied
/// through from the [`OptionSet`], not produced by the product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Combination {
    pub values: BTreeMap<Category, String>,
    #[serde(default)]
    pub remove_subject: bool,
    #[serde(default)]
    pub replace_background: bool,
}

impl Combination {
    pub fn get(&self, category: Category) -> Option<&str> {
        self.values.get(&category).map(String::as_str)
    }

    /// True when no subject-group category carries a value.
    pub fn subject_is_untouched(&self) -> bool {
        !self.values.keys().any(|c| c.is_subject())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_markers_match_case_insensitively() {
        assert!(is_reserved("Original"));
        assert!(is_reserved("AS-IS"));
        assert!(is_reserved(" none "));
        assert!(is_reserved("default"));
        assert!(!is_reserved("originally"));
        assert!(!is_reserved("red dress"));
    }

    #[test]
    fn settings_clamp_to_documented_bounds() {
        let settings = EngineSettings {
            concurrency: 0,
            transient_retry_limit: 99,
            policy_retry_limit: 12,
        }
        .clamped();
        assert_eq!(settings.concurrency, 1);
        assert_eq!(settings.transient_retry_limit, 10);
        assert_eq!(settings.policy_retry_limit, 5);

        let in_range = EngineSettings::default().clamped();
        assert_eq!(in_range, EngineSettings::default());
    }

    #[test]
    fn select_drops_duplicates_preserving_order() {
        let mut options = OptionSet::default();
        options.select(
            Category::Style,
            ["noir", "pastel", "noir"].map(String::from),
        );
        assert_eq!(
            options.selection(Category::Style).unwrap().values(),
            &["noir".to_string(), "pastel".to_string()]
        );
    }

    #[test]
    fn expected_count_multiplies_permuted_factors_only() {
        let mut options = OptionSet::default();
        options.select(Category::Gender, ["female", "male"].map(String::from));
        options.select(Category::Style, ["noir", "pastel", "oil"].map(String::from));
        options.combine(Category::Attire, ["boots", "anklets"].map(String::from));
        options.select(Category::Pose, Vec::<String>::new());
        assert_eq!(options.expected_count(), 6);
    }

    #[test]
    fn empty_option_set_expects_one_combination() {
        assert_eq!(OptionSet::default().expected_count(), 1);
    }
}
