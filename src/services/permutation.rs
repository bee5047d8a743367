use strum::IntoEnumIterator;

use crate::models::options::{is_reserved, Category, Combination, OptionSet, Selection};

/// Expand an option set into the full ordered list of combinations.
///
/// Deterministic and side-effect-free: the same input always yields the same
/// sequence in the same order. Each category is one axis of a Cartesian
/// product, enumerated in [`Category`] declaration order with the first
/// category varying slowest.
///
/// Axis construction:
/// - absent or empty selection: a single "unset" entry, so the category
///   contributes a factor of 1 and is simply missing from the output;
/// - combined selection: a single entry joining all non-reserved values
///   with `" + "`;
/// - permuted selection: one entry per value, verbatim.
///
/// Reserved marker values ("Original", "As-Is", ...) keep their slot in the
/// product but render as unset, so they never leak into generated
/// instructions while still letting a user select "no override" as one arm
/// of a multi-value category.
pub fn expand(options: &OptionSet) -> Vec<Combination> {
    let axes: Vec<(Category, Vec<Option<String>>)> = Category::iter()
        .map(|category| (category, axis_for(options.selection(category))))
        .collect();

    let mut combinations = vec![Combination {
        remove_subject: options.remove_subject,
        replace_background: options.replace_background,
        ..Combination::default()
    }];

    for (category, axis) in axes {
        let mut next = Vec::with_capacity(combinations.len() * axis.len());
        for combination in &combinations {
            for entry in &axis {
                let mut expanded = combination.clone();
                if let Some(value) = entry {
                    expanded.values.insert(category, value.clone());
                }
                next.push(expanded);
            }
        }
        combinations = next;
    }

    combinations
}

fn axis_for(selection: Option<&Selection>) -> Vec<Option<String>> {
    match selection {
        None => vec![None],
        Some(selection) if selection.is_empty() => vec![None],
        Some(Selection::Combined(values)) => {
            let parts: Vec<&str> = values
                .iter()
                .filter(|value| !is_reserved(value))
                .map(String::as_str)
                .collect();
            if parts.is_empty() {
                vec![None]
            } else {
                vec![Some(parts.join(" + "))]
            }
        }
        Some(Selection::Permuted(values)) => values
            .iter()
            .map(|value| {
                if is_reserved(value) {
                    None
                } else {
                    Some(value.clone())
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings<const N: usize>(values: [&str; N]) -> [String; N] {
        values.map(String::from)
    }

    #[test]
    fn empty_option_set_yields_single_default_combination() {
        let combinations = expand(&OptionSet::default());
        assert_eq!(combinations.len(), 1);
        assert!(combinations[0].values.is_empty());
    }

    #[test]
    fn two_by_two_product_in_declaration_order() {
        let mut options = OptionSet::default();
        options.select(Category::Gender, strings(["female", "male"]));
        options.select(Category::Style, strings(["noir", "pastel"]));

        let combinations = expand(&options);
        assert_eq!(combinations.len(), 4);

        // Gender is declared before Style, so it varies slowest.
        let pairs: Vec<(&str, &str)> = combinations
            .iter()
            .map(|c| {
                (
                    c.get(Category::Gender).unwrap(),
                    c.get(Category::Style).unwrap(),
                )
            })
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("female", "noir"),
                ("female", "pastel"),
                ("male", "noir"),
                ("male", "pastel"),
            ]
        );
    }

    #[test]
    fn combined_category_contributes_single_joined_value() {
        let mut options = OptionSet::default();
        options.combine(Category::Attire, strings(["Boots", "Anklets"]));

        let combinations = expand(&options);
        assert_eq!(combinations.len(), 1);
        assert_eq!(combinations[0].get(Category::Attire), Some("Boots + Anklets"));
    }

    #[test]
    fn combined_category_does_not_multiply_the_product() {
        let mut options = OptionSet::default();
        options.select(Category::Gender, strings(["female", "male"]));
        options.combine(Category::Attire, strings(["boots", "anklets", "gloves"]));

        assert_eq!(expand(&options).len(), 2);
    }

    #[test]
    fn reserved_marker_keeps_product_slot_but_is_omitted_from_content() {
        let mut options = OptionSet::default();
        options.select(Category::Attire, strings(["Original", "red dress"]));

        let combinations = expand(&options);
        assert_eq!(combinations.len(), 2);
        assert_eq!(combinations[0].get(Category::Attire), None);
        assert_eq!(combinations[1].get(Category::Attire), Some("red dress"));
    }

    #[test]
    fn reserved_values_are_dropped_from_combined_join() {
        let mut options = OptionSet::default();
        options.combine(Category::Attire, strings(["boots", "None", "scarf"]));

        let combinations = expand(&options);
        assert_eq!(combinations.len(), 1);
        assert_eq!(combinations[0].get(Category::Attire), Some("boots + scarf"));
    }

    #[test]
    fn empty_selection_behaves_like_absent_category() {
        let mut options = OptionSet::default();
        options.select(Category::Gender, strings(["female"]));
        options.select(Category::Pose, Vec::<String>::new());

        let combinations = expand(&options);
        assert_eq!(combinations.len(), 1);
        assert_eq!(combinations[0].get(Category::Pose), None);
    }

    #[test]
    fn mode_flags_are_copied_onto_every_combination() {
        let mut options = OptionSet::default();
        options.replace_background = true;
        options.select(Category::Background, strings(["beach", "forest"]));

        let combinations = expand(&options);
        assert_eq!(combinations.len(), 2);
        assert!(combinations.iter().all(|c| c.replace_background));
        assert!(combinations.iter().all(|c| !c.remove_subject));
    }

    #[test]
    fn count_matches_expected_count_for_mixed_selection() {
        let mut options = OptionSet::default();
        options.select(Category::Gender, strings(["a", "b"]));
        options.select(Category::Age, strings(["x", "y", "z"]));
        options.combine(Category::Attire, strings(["p", "q"]));
        options.select(Category::Style, strings(["s"]));

        assert_eq!(expand(&options).len(), options.expected_count());
        assert_eq!(expand(&options).len(), 6);
    }
}
