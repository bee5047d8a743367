use crate::models::options::{Category, Combination};

/// Attire substrings that imply partial or absent clothing. Any match forces
/// the coverage clause into the instruction text. Plain substring match,
/// case-insensitive; this is deliberately not a model call.
const COVERAGE_TRIGGERS: &[&str] = &[
    "swimsuit",
    "swimwear",
    "bikini",
    "lingerie",
    "underwear",
    "towel",
    "undress",
];

/// Mandatory clause injected whenever the attire value implies reduced
/// coverage.
const COVERAGE_CLAUSE: &str = "Keep the subject fully and modestly covered at all times; \
     never depict nudity or sexually suggestive content.";

/// Fallback line used when no subject category carries a value, so the
/// instructions always say something about the subject.
const SUBJECT_UNCHANGED_LINE: &str =
    "Keep the subject exactly as they appear in the source image.";

/// Composed generation instructions for one combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrompt {
    /// Natural-language instructions for the generation service.
    pub instruction: String,
    /// Short human-readable summary for queue display and result records.
    pub summary: String,
    /// Whether the coverage clause was injected.
    pub safety_cover: bool,
}

/// Assemble generation instructions from the present categories of a
/// combination. Absent categories are omitted entirely; no placeholders.
///
/// The two operating modes are mutually exclusive. Subject removal wins if
/// both flags are somehow set: a frame with no subjects has nothing to place
/// in front of a new background.
pub fn compose(combination: &Combination) -> ComposedPrompt {
    let mut lines: Vec<String> = Vec::new();
    let mut safety_cover = false;

    if combination.remove_subject {
        lines.push(
            "Remove every person from the image. Reconstruct the areas they occupied \
             so the scene looks natural and untouched."
                .to_string(),
        );
    } else {
        for category in [
            Category::Gender,
            Category::Age,
            Category::BodyType,
            Category::Attire,
            Category::Pose,
        ] {
            let Some(value) = combination.get(category) else {
                continue;
            };
            lines.push(subject_line(category, value));
            if category == Category::Attire && implies_reduced_coverage(value) {
                safety_cover = true;
            }
        }
        if combination.subject_is_untouched() {
            lines.push(SUBJECT_UNCHANGED_LINE.to_string());
        }
    }

    match combination.get(Category::Background) {
        Some(background) if combination.replace_background && !combination.remove_subject => {
            lines.push(format!(
                "Discard the original background entirely and place the subject in: {background}."
            ));
        }
        Some(background) => {
            lines.push(format!("Change the background to {background}."));
        }
        None if combination.replace_background && !combination.remove_subject => {
            // Replacement requested with no environment selected: keep the
            // subject but let the service invent a neutral setting.
            lines.push(
                "Discard the original background entirely and place the subject in a plain, \
                 neutral studio setting."
                    .to_string(),
            );
        }
        None => {}
    }

    if let Some(style) = combination.get(Category::Style) {
        lines.push(format!("Render the final image in {style} style."));
    }

    if safety_cover {
        lines.push(COVERAGE_CLAUSE.to_string());
    }

    ComposedPrompt {
        instruction: lines.join(" "),
        summary: summarize(combination),
        safety_cover,
    }
}

fn subject_line(category: Category, value: &str) -> String {
    match category {
        Category::Gender => format!("Change the subject's gender presentation to {value}."),
        Category::Age => format!("Make the subject appear {value}."),
        Category::BodyType => format!("Give the subject a {value} body type."),
        Category::Attire => format!("Dress the subject in {value}."),
        Category::Pose => format!("Pose the subject {value}."),
        // Non-subject categories are handled by the caller.
        Category::Background | Category::Style => unreachable!("not a subject category"),
    }
}

fn implies_reduced_coverage(attire: &str) -> bool {
    let attire = attire.to_lowercase();
    COVERAGE_TRIGGERS
        .iter()
        .any(|trigger| attire.contains(trigger))
}

fn summarize(combination: &Combination) -> String {
    let mut parts: Vec<String> = combination
        .values
        .iter()
        .filter(|(category, _)| !(combination.remove_subject && category.is_subject()))
        .map(|(category, value)| format!("{category}: {value}"))
        .collect();

    if combination.remove_subject {
        parts.push("[no subjects]".to_string());
    } else if combination.replace_background {
        parts.push("[new background]".to_string());
    }

    if parts.is_empty() {
        "(defaults)".to_string()
    } else {
        parts.join(", ")
    }
}
