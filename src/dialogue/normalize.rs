//! Arabic text normalization.
//!
//! Folds spelling variants so keyword lookups see one canonical form:
//! lowercase, trimmed, hamza-seated alefs folded to bare alef, taa marbuta
//! to haa, harakat stripped, then the colloquial synonym table applied until
//! nothing changes.

/// Colloquial variants → canonical keyword. Keys are already character-folded.
/// Longer keys come before their prefixes.
const SYNONYMS: &[(&str, &str)] = &[
    ("ضيفلي", "اضف"),
    ("ضيفي", "اضف"),
    ("نضيف", "اضف"),
    ("ضيف", "اضف"),
    ("الالوان", "الوان"),
    ("الخامات", "مواد"),
    ("خامات", "مواد"),
    ("المواد", "مواد"),
    ("الاثاث", "اثاث"),
    ("الموديلات", "موديلات"),
    ("عايزين", "عايز"),
    ("عايزه", "عايز"),
    ("عاوز", "عايز"),
    ("ابغى", "عايز"),
    ("ابغي", "عايز"),
    ("اريد", "عايز"),
    ("نبي", "عايز"),
    ("احذفي", "امسح"),
    ("احذف", "امسح"),
    ("شيلي", "امسح"),
    ("شيل", "امسح"),
    ("ازيل", "امسح"),
];

const MAX_PASSES: usize = 8;

fn fold_char(c: char) -> Option<char> {
    match c {
        'أ' | 'إ' | 'آ' => Some('ا'),
        'ة' => Some('ه'),
        // tanwin, fatha, damma, kasra, shadda, sukun
        '\u{064B}'..='\u{0652}' => None,
        _ => Some(c),
    }
}

/// Normalize `text`. Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let mut out: String = text.to_lowercase().chars().filter_map(fold_char).collect();

    // A replacement can complete another key ("عاوزه" → "عايزه" → "عايز").
    for _ in 0..MAX_PASSES {
        let next = SYNONYMS
            .iter()
            .fold(out.clone(), |acc, (from, to)| acc.replace(from, to));
        if next == out {
            break;
        }
        out = next;
    }
    // Stripped harakat can expose edge whitespace
    out.trim().to_string()
}
