//! Intent classification by ordered keyword patterns.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AddItem,
    RemoveItem,
    ShowColors,
    ShowMaterials,
    ShowFurniture,
    ChangeItem,
    Help,
    ViewItems,
    ViewMemory,
    GenerateImage,
    Unknown,
}

/// Patterns over normalized text, in priority order. First match wins.
static RULES: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    [
        (Intent::AddItem, r"اضف"),
        (Intent::RemoveItem, r"مسح|حذف|ازاله|الغاء"),
        (Intent::ShowColors, r"الوان|لون"),
        (Intent::ShowMaterials, r"مواد|ماده|خامه"),
        (Intent::ShowFurniture, r"اثاث|موديلات|قطع"),
        (Intent::ChangeItem, r"غير|تغير|تغيير|بدل|تعديل|عدل"),
        (Intent::Help, r"مساعده|help|دعم|شرح"),
        (Intent::ViewItems, r"عرض|شوف|ارني"),
        (Intent::ViewMemory, r"ضفت|اضفنا|مسحنا|حذفنا"),
        (Intent::GenerateImage, r"صور|اريني|اعمل|/generated|image"),
    ]
    .into_iter()
    .map(|(intent, pattern)| (intent, Regex::new(pattern).expect("valid intent pattern")))
    .collect()
});

/// Classify already-normalized text.
pub fn classify(normalized_text: &str) -> Intent {
    if normalized_text.is_empty() {
        return Intent::Unknown;
    }
    RULES
        .iter()
        .find(|(_, regex)| regex.is_match(normalized_text))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Unknown)
}

/// Whether the text names the material slot ("مادة", "خامات", ...).
pub fn mentions_material(normalized_text: &str) -> bool {
    RULES
        .iter()
        .any(|(intent, regex)| *intent == Intent::ShowMaterials && regex.is_match(normalized_text))
}

/// Whether the text names the colour slot ("لون", "ألوان", ...).
pub fn mentions_color(normalized_text: &str) -> bool {
    RULES
        .iter()
        .any(|(intent, regex)| *intent == Intent::ShowColors && regex.is_match(normalized_text))
}
