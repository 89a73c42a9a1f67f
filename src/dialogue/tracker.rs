//! Dialogue tracker: one conversation's state machine.
//!
//! Each turn is normalized, scanned for a furniture category, colour and
//! material, classified into an [`Intent`], then handled in a fixed order:
//! help, memory, add, remove, the pending slot, catalog listings, the user's
//! items, image generation, change, and finally the fallbacks.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::catalog::Catalog;
use super::intent::{self, Intent};
use super::memory::{AddedItem, Memory, Role};
use super::normalize::normalize;

const EMPTY_INPUT: &str = "🤔 لم أتلقى أي رسالة. هل يمكنك إعادة الكتابة؟";

const HELP_TEXT: &str = "🛟 كيف أساعدك؟\n\n\
• إضافة أثاث: 'أضف كنبة' أو 'عايز أضيف كرسي'\n\
• حذف أثاث: 'امسح الكنبة' أو 'احذف الكرسي'\n\
• عرض الألوان: 'الألوان المتاحة للكنبة'\n\
• عرض المواد: 'الخامات المتاحة للكرسي'\n\
• رؤية كل الأثاث: 'عرض الأثاث' أو 'الموديلات'\n\
• رؤية اللى ضفتو: 'عرض اللى ضفت' أو 'شوف اللى مسحنا'\n\
• تغيير مواصفات: 'غير الكنبة'";

const UNKNOWN_TEXT: &str = "🤔 لم أفهم طلبك. جرب:\n\
• 'أضف كنبة' - لإضافة أثاث\n\
• 'امسح كرسي' - لحذف أثاث\n\
• 'الألوان' - لرؤية الألوان\n\
• 'المواد' - لرؤية الخامات\n\
• 'عرض اللى ضفت' - لرؤية القطع المضافة\n\
• 'المساعدة' - للحصول على دليل الاستخدام";

/// Raw-text image keywords followed by the thing to draw.
static IMAGE_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(صورة|اريني|اعمل|صور)\s+(.+)").expect("valid image pattern"));

const IMAGE_WORDS: &[&str] = &["صورة", "اريني", "اعمل", "صور"];

/// Which slot the tracker is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingAction {
    #[default]
    None,
    AwaitingColor,
    AwaitingMaterial,
    AwaitingChange,
}

/// An open slot and the furniture category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Color(String),
    Material(String),
    Change(String),
}

/// Work the caller must do after a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    GenerateImage { description: String },
}

/// The tracker's answer to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub response: String,
    pub action: Option<TurnAction>,
}

impl Turn {
    fn reply(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            action: None,
        }
    }
}

pub struct DialogueTracker {
    data_dir: Option<PathBuf>,
    catalog: Catalog,
    memory: Memory,
    pending: Option<Pending>,
}

impl DialogueTracker {
    /// A tracker over a fixed catalog. `clear` keeps the catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            data_dir: None,
            catalog,
            memory: Memory::new(),
            pending: None,
        }
    }

    /// A tracker whose catalog is loaded (and reloaded on `clear`) from `dir`.
    pub fn load(dir: &Path) -> Self {
        Self {
            data_dir: Some(dir.to_path_buf()),
            ..Self::new(Catalog::load(dir))
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn pending_action(&self) -> PendingAction {
        match self.pending {
            None => PendingAction::None,
            Some(Pending::Color(_)) => PendingAction::AwaitingColor,
            Some(Pending::Material(_)) => PendingAction::AwaitingMaterial,
            Some(Pending::Change(_)) => PendingAction::AwaitingChange,
        }
    }

    pub fn pending_item(&self) -> Option<&str> {
        match &self.pending {
            None => None,
            Some(Pending::Color(item) | Pending::Material(item) | Pending::Change(item)) => {
                Some(item.as_str())
            }
        }
    }

    /// Reset history, items and pending state; reload the catalog.
    pub fn clear(&mut self) {
        if let Some(dir) = &self.data_dir {
            self.catalog = Catalog::load(dir);
        }
        self.memory = Memory::new();
        self.pending = None;
    }

    /// Text for a named quick action: the commands table first, then the
    /// built-in buttons, else the action text itself.
    pub fn quick_action_text<'a>(&'a self, action: &'a str) -> &'a str {
        if let Some(text) = self.catalog.command(action) {
            return text;
        }
        match action {
            "show_furniture" => "عرض الأثاث",
            "my_items" => "عرض اللى ضفت",
            "colors" => "الألوان",
            "materials" => "المواد",
            "help" => "المساعدة",
            other => other,
        }
    }

    /// Record the outcome of an image turn and return the message for the user.
    pub fn finish_image(&mut self, description: &str, succeeded: bool) -> String {
        let response = if succeeded {
            format!("Successfully generated an image for '{description}'!")
        } else {
            "Failed to generate the image. Please try a different description.".to_string()
        };
        self.memory.record(Role::Assistant, response.clone());
        response
    }

    /// Handle one user message.
    pub fn respond(&mut self, input: &str) -> Turn {
        let text = input.trim();
        if text.is_empty() {
            return Turn::reply(EMPTY_INPUT);
        }
        self.memory.record(Role::User, text);

        let turn = self.handle(text);
        self.memory.record(Role::Assistant, turn.response.clone());
        turn
    }

    fn handle(&mut self, text: &str) -> Turn {
        let normalized = normalize(text);
        let intent = intent::classify(&normalized);
        // Owned so the handlers below can mutate the tracker.
        let item = self.catalog.detect_furniture(&normalized).map(str::to_string);
        let color = self.catalog.detect_color(&normalized).map(str::to_string);
        let material = self.catalog.detect_material(&normalized).map(str::to_string);
        debug!(
            intent = ?intent,
            item = ?item,
            color = ?color,
            material = ?material,
            pending = ?self.pending_action(),
            "Parsed message"
        );
        let (item, color, material) = (item.as_deref(), color.as_deref(), material.as_deref());

        if intent == Intent::Help {
            return Turn::reply(HELP_TEXT);
        }
        if intent == Intent::ViewMemory {
            return Turn::reply(self.list_items("🪑 القطع اللى ضفتها:", "🪑 مفيش قطع أثاث مضيفة حالياً."));
        }
        let wants_item = normalized.contains("اضف") || normalized.contains("عايز");
        if intent == Intent::AddItem || (item.is_some() && self.pending.is_none() && wants_item) {
            return Turn::reply(self.start_add(item));
        }
        if intent == Intent::RemoveItem {
            return Turn::reply(self.remove(item));
        }
        if let Some(pending) = self.pending.clone() {
            return Turn::reply(self.fill_slot(pending, &normalized, color, material));
        }

        match intent {
            Intent::ShowColors => Turn::reply(self.show_colors(item)),
            Intent::ShowMaterials => Turn::reply(self.show_materials(item)),
            Intent::ShowFurniture => Turn::reply(self.show_furniture()),
            Intent::ViewItems => Turn::reply(self.list_items(
                "🪑 القطع اللى عندك:",
                "🪑 مفيش قطع أثاث مضيفة حالياً. تقدر تضيف قطع باستخدام 'أضف كنبة' أو 'عايز أضيف كرسي'",
            )),
            Intent::GenerateImage => Turn {
                response: "Generating image...".to_string(),
                action: Some(TurnAction::GenerateImage {
                    description: image_description(text, &normalized, item, color, material),
                }),
            },
            Intent::ChangeItem => Turn::reply(self.change(item, color, material, &normalized)),
            _ => match item {
                Some(item) => Turn::reply(format!(
                    "🪑 تم التعرف على {item}. ماذا تريد أن تفعل؟\n\
                     • 'أضف {item}' - لإضافته\n\
                     • 'الألوان لـ {item}' - لرؤية الألوان\n\
                     • 'المواد لـ {item}' - لرؤية الخامات\n\
                     • 'امسح {item}' - لحذفه"
                )),
                None => Turn::reply(UNKNOWN_TEXT),
            },
        }
    }

    fn start_add(&mut self, item: Option<&str>) -> String {
        let Some(item) = item else {
            return "🪑 عايز تضيف إيه؟ (مثل: كنبة، كرسي، ترابيزة)".to_string();
        };
        self.pending = Some(Pending::Color(item.to_string()));
        let colors = self.catalog.available_colors(item);
        if colors.is_empty() {
            format!("🪑 تم اختيار {item}، لكن لا توجد ألوان محددة له.")
        } else {
            format!(
                "🪑 ممتاز! عايز تضيف {item} بإيه لون؟\n🎨 الألوان المتاحة: {}",
                colors.join(", ")
            )
        }
    }

    fn remove(&mut self, item: Option<&str>) -> String {
        match item {
            Some(item) => match self.memory.remove_first(item) {
                Some(_) => format!("✅ تم مسح {item} من القائمة."),
                None => format!("❌ مفيش {item} في القائمة علشان امسحو."),
            },
            None => "🪑 عايز تمسح إيه؟ (مثل: امسح الكنبة أو احذف الكرسي)".to_string(),
        }
    }

    fn fill_slot(
        &mut self,
        pending: Pending,
        normalized: &str,
        color: Option<&str>,
        material: Option<&str>,
    ) -> String {
        match pending {
            Pending::Color(item) => match color {
                Some(color) if self.catalog.is_color_available(&item, color) => {
                    self.memory.add_item(&item, Some(color), material);
                    self.pending = None;
                    format!("✅ تمت الإضافة بنجاح!\n🪑 {item} باللون {color} تمت إضافته.")
                }
                Some(color) => self.color_unavailable(&item, color),
                None => format!(
                    "🪑 ما زلت أنتظر اختيار اللون لـ {item}.\n🎨 الألوان المتاحة: {}",
                    self.colors_of(&item)
                ),
            },
            Pending::Material(item) => match material {
                Some(material) if self.catalog.is_material_available(&item, material) => {
                    self.pending = None;
                    self.apply_change(&item, None, Some(material))
                }
                Some(material) => self.material_unavailable(&item, material),
                None => format!(
                    "🛠️ ما زلت أنتظر اختيار المادة لـ {item}.\n🛠️ المواد المتاحة: {}",
                    self.materials_of(&item)
                ),
            },
            Pending::Change(item) => {
                if let Some(color) = color {
                    if !self.catalog.is_color_available(&item, color) {
                        return self.color_unavailable(&item, color);
                    }
                    let material =
                        material.filter(|m| self.catalog.is_material_available(&item, m));
                    self.pending = None;
                    return self.apply_change(&item, Some(color), material);
                }
                if let Some(material) = material {
                    if !self.catalog.is_material_available(&item, material) {
                        return self.material_unavailable(&item, material);
                    }
                    self.pending = None;
                    return self.apply_change(&item, None, Some(material));
                }
                if intent::mentions_material(normalized) {
                    let prompt = self.ask_material(&item);
                    self.pending = Some(Pending::Material(item));
                    return prompt;
                }
                if intent::mentions_color(normalized) {
                    return format!(
                        "🎨 اختار اللون الجديد لـ {item}:\n{}",
                        self.colors_of(&item)
                    );
                }
                format!("🪑 ما زلت أنتظر التغيير المطلوب لـ {item}. (اللون، المادة)")
            }
        }
    }

    fn change(
        &mut self,
        item: Option<&str>,
        color: Option<&str>,
        material: Option<&str>,
        normalized: &str,
    ) -> String {
        let Some(item) = item else {
            return "🪑 عايز تغير إيه؟ حدد العنصر أولاً.".to_string();
        };
        match (color, material) {
            (Some(color), _) if !self.catalog.is_color_available(item, color) => {
                self.color_unavailable(item, color)
            }
            (Some(color), material) => {
                let material = material.filter(|m| self.catalog.is_material_available(item, m));
                self.apply_change(item, Some(color), material)
            }
            (None, Some(material)) if !self.catalog.is_material_available(item, material) => {
                self.material_unavailable(item, material)
            }
            (None, Some(material)) => self.apply_change(item, None, Some(material)),
            (None, None) if intent::mentions_material(normalized) => {
                self.pending = Some(Pending::Material(item.to_string()));
                self.ask_material(item)
            }
            (None, None) => {
                self.pending = Some(Pending::Change(item.to_string()));
                format!("🪑 عايز تغير إيه في {item}؟ (اللون، المادة، إلخ)")
            }
        }
    }

    fn apply_change(&mut self, item: &str, color: Option<&str>, material: Option<&str>) -> String {
        if self.memory.update_items(item, color, material) == 0 {
            return format!("❌ مفيش {item} في القائمة علشان اغيره.");
        }
        match (color, material) {
            (Some(color), _) => format!("✅ تم تغيير {item} إلى اللون {color}."),
            (None, Some(material)) => format!("✅ تم تغيير {item} إلى المادة {material}."),
            (None, None) => format!("✅ تم تحديث {item}."),
        }
    }

    fn show_colors(&self, item: Option<&str>) -> String {
        match item {
            Some(item) => {
                let colors = self.catalog.available_colors(item);
                if colors.is_empty() {
                    format!("❌ لا توجد ألوان محددة لـ {item}.")
                } else {
                    format!("🎨 الألوان المتاحة لـ {item}:\n{}", colors.join(", "))
                }
            }
            None => "🎨 يرجى تحديد نوع الأثاث لمعرفة الألوان المتاحة.\nمثال: 'الألوان للكنبة' أو 'ألوان الكرسي'".to_string(),
        }
    }

    fn show_materials(&self, item: Option<&str>) -> String {
        match item {
            Some(item) => {
                let materials = self.catalog.available_materials(item);
                if materials.is_empty() {
                    format!("❌ لا توجد مواد محددة لـ {item}.")
                } else {
                    format!("🛠️ المواد المتاحة لـ {item}:\n{}", materials.join(", "))
                }
            }
            None => "🛠️ يرجى تحديد نوع الأثاث لمعرفة المواد المتاحة.\nمثال: 'المواد للكرسي' أو 'خامات الكنبة'".to_string(),
        }
    }

    fn show_furniture(&self) -> String {
        if self.catalog.is_empty() {
            return "❌ لا توجد بيانات للأثاث متاحة حالياً.".to_string();
        }
        let lines: Vec<String> = self
            .catalog
            .furniture_listing()
            .into_iter()
            .map(|(name, models)| format!("• {name} - الموديلات: {}", models.join(", ")))
            .collect();
        format!("🪑 الأثاث المتاح:\n{}", lines.join("\n"))
    }

    fn list_items(&self, heading: &str, empty: &str) -> String {
        let items = self.memory.added_items();
        if items.is_empty() {
            return empty.to_string();
        }
        let lines: Vec<String> = items
            .iter()
            .enumerate()
            .map(|(i, entry)| describe_item(i + 1, entry))
            .collect();
        format!("{heading}\n{}", lines.join("\n"))
    }

    fn ask_material(&self, item: &str) -> String {
        format!(
            "🛠️ عايز تغير {item} لأي مادة؟\n🛠️ المواد المتاحة: {}",
            self.materials_of(item)
        )
    }

    fn color_unavailable(&self, item: &str, color: &str) -> String {
        format!(
            "❌ اللون {color} غير متاح لـ {item}.\n🎨 الألوان المتاحة: {}",
            self.colors_of(item)
        )
    }

    fn material_unavailable(&self, item: &str, material: &str) -> String {
        format!(
            "❌ المادة {material} غير متاحة لـ {item}.\n🛠️ المواد المتاحة: {}",
            self.materials_of(item)
        )
    }

    fn colors_of(&self, item: &str) -> String {
        self.catalog.available_colors(item).join(", ")
    }

    fn materials_of(&self, item: &str) -> String {
        self.catalog.available_materials(item).join(", ")
    }
}

fn describe_item(index: usize, entry: &AddedItem) -> String {
    let mut line = format!("{index}. {}", entry.item);
    if let Some(color) = &entry.color {
        line.push_str(&format!(" - اللون: {color}"));
    }
    if let Some(material) = &entry.material {
        line.push_str(&format!(" - المادة: {material}"));
    }
    line
}

/// What to draw for an image request: the recognized piece with its colour
/// and material, or whatever follows the image keyword.
fn image_description(
    text: &str,
    normalized: &str,
    item: Option<&str>,
    color: Option<&str>,
    material: Option<&str>,
) -> String {
    if let Some(item) = item {
        let mut description = item.to_string();
        for part in [color, material].into_iter().flatten() {
            description.push(' ');
            description.push_str(part);
        }
        description.push_str(" furniture piece");
        return description;
    }

    let mentions_image = IMAGE_WORDS
        .iter()
        .any(|w| normalized.contains(normalize(w).as_str()));
    if !mentions_image {
        return text.to_string();
    }
    if let Some(subject) = IMAGE_SUBJECT.captures(text).and_then(|c| c.get(2)) {
        return subject.as_str().trim().to_string();
    }
    let stripped = IMAGE_WORDS
        .iter()
        .fold(text.to_string(), |acc, w| acc.replace(w, ""));
    let stripped = stripped.trim();
    if stripped.is_empty() {
        text.to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::catalog::FurnitureModel;

    fn sofa_catalog() -> Catalog {
        let pair = |s: &str| (s.to_string(), s.to_string());
        Catalog::new(
            vec![(
                "sofa".to_string(),
                vec![FurnitureModel::new("lounge", &["red", "blue"], &["wool"])],
            )],
            vec![pair("red"), pair("blue"), pair("green")],
            vec![pair("wool"), pair("steel")],
        )
    }

    #[test]
    fn empty_input_is_not_recorded() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        let turn = tracker.respond("   ");
        assert_eq!(turn.response, EMPTY_INPUT);
        assert!(tracker.memory().history().is_empty());
    }

    #[test]
    fn awaiting_color_resolves_with_listed_color() {
        let mut tracker = DialogueTracker::new(sofa_catalog());
        tracker.respond("اضف sofa");
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingColor);
        assert_eq!(tracker.pending_item(), Some("sofa"));

        let turn = tracker.respond("blue");
        assert!(turn.response.starts_with("✅"));
        assert_eq!(tracker.pending_action(), PendingAction::None);
        let items = tracker.memory().added_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item, "sofa");
        assert_eq!(items[0].color.as_deref(), Some("blue"));
    }

    #[test]
    fn awaiting_color_reprompts_on_unlisted_color() {
        let mut tracker = DialogueTracker::new(sofa_catalog());
        tracker.respond("اضف sofa");

        let turn = tracker.respond("green");
        assert!(turn.response.contains("غير متاح"));
        assert!(turn.response.contains("red, blue"));
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingColor);
        assert!(tracker.memory().added_items().is_empty());

        let turn = tracker.respond("hmm");
        assert!(turn.response.contains("ما زلت أنتظر"));
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingColor);
    }

    #[test]
    fn arabic_add_flow_with_material() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        let turn = tracker.respond("أضف كنبة");
        assert!(turn.response.contains("أحمر, أزرق, رمادي, أسود"));

        tracker.respond("زرقاء جلد");
        let items = tracker.memory().added_items();
        assert_eq!(items[0].color.as_deref(), Some("أزرق"));
        assert_eq!(items[0].material.as_deref(), Some("جِلْد"));
        assert_eq!(tracker.pending_action(), PendingAction::None);
    }

    #[test]
    fn item_with_want_word_starts_add() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        tracker.respond("عاوز كرسي");
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingColor);
        assert_eq!(tracker.pending_item(), Some("كرسي"));
    }

    #[test]
    fn add_without_item_asks_what() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        let turn = tracker.respond("أضف");
        assert!(turn.response.contains("عايز تضيف إيه"));
        assert_eq!(tracker.pending_action(), PendingAction::None);
    }

    #[test]
    fn remove_deletes_first_match_and_logs_it() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        tracker.respond("أضف كرسي");
        tracker.respond("أسود");
        tracker.respond("أضف كرسي");
        tracker.respond("بني");

        let turn = tracker.respond("امسح الكرسي");
        assert!(turn.response.starts_with("✅"));
        let items = tracker.memory().added_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].color.as_deref(), Some("بني"));
        assert_eq!(tracker.memory().removed_items().len(), 1);

        let turn = tracker.respond("احذف الترابيزة");
        assert!(turn.response.starts_with("❌"));
    }

    #[test]
    fn change_with_item_and_color_updates_directly() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        tracker.respond("أضف كنبة");
        tracker.respond("أحمر");

        let turn = tracker.respond("بدل الكنبة رمادي");
        assert!(turn.response.contains("إلى اللون رمادي"));
        assert_eq!(
            tracker.memory().added_items()[0].color.as_deref(),
            Some("رمادي")
        );
        assert_eq!(tracker.pending_action(), PendingAction::None);
    }

    #[test]
    fn change_slot_then_material_slot() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        tracker.respond("أضف كنبة");
        tracker.respond("أسود");

        tracker.respond("بدل الكنبة");
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingChange);

        let turn = tracker.respond("المادة");
        assert!(turn.response.contains("قُماش, جِلْد"));
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingMaterial);

        let turn = tracker.respond("خشب");
        assert!(turn.response.contains("غير متاحة"));
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingMaterial);

        let turn = tracker.respond("جلد");
        assert!(turn.response.starts_with("✅"));
        assert_eq!(tracker.pending_action(), PendingAction::None);
        assert_eq!(
            tracker.memory().added_items()[0].material.as_deref(),
            Some("جِلْد")
        );
    }

    #[test]
    fn change_slot_accepts_color() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        tracker.respond("أضف ترابيزة");
        tracker.respond("بني");
        tracker.respond("عدل الترابيزة");
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingChange);

        tracker.respond("أبيض");
        assert_eq!(tracker.pending_action(), PendingAction::None);
        assert_eq!(
            tracker.memory().added_items()[0].color.as_deref(),
            Some("أبيض")
        );
    }

    #[test]
    fn listings() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        let turn = tracker.respond("الموديلات");
        assert!(turn.response.contains("• كنبة - الموديلات: كنبة مودرن 3 أفراد, كنبة كلاسيك منجدة"));

        let turn = tracker.respond("الخامات المتاحة للكرسي");
        assert!(turn.response.contains("بلاستيك, معدن, خشب"));

        let turn = tracker.respond("الألوان");
        assert!(turn.response.contains("يرجى تحديد"));

        let turn = tracker.respond("عرض");
        assert!(turn.response.contains("مفيش قطع"));
    }

    #[test]
    fn image_turn_carries_description() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        let turn = tracker.respond("اعمل صورة كنبة حمراء");
        assert_eq!(
            turn.action,
            Some(TurnAction::GenerateImage {
                description: "كنبة أحمر furniture piece".to_string()
            })
        );

        let turn = tracker.respond("اعمل غرفة نوم هادئة");
        assert_eq!(
            turn.action,
            Some(TurnAction::GenerateImage {
                description: "غرفة نوم هادئة".to_string()
            })
        );

        let message = tracker.finish_image("غرفة نوم هادئة", true);
        assert!(message.contains("Successfully generated"));
        assert_eq!(tracker.memory().history().back().unwrap().content, message);
    }

    #[test]
    fn recognized_item_without_intent_offers_options() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        let turn = tracker.respond("كنبة");
        assert!(turn.response.contains("تم التعرف على كنبة"));

        let turn = tracker.respond("مرحبا");
        assert_eq!(turn.response, UNKNOWN_TEXT);
    }

    #[test]
    fn help_wins_over_pending_slot() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        tracker.respond("أضف كنبة");
        let turn = tracker.respond("مساعدة");
        assert_eq!(turn.response, HELP_TEXT);
        assert_eq!(tracker.pending_action(), PendingAction::AwaitingColor);
    }

    #[test]
    fn clear_resets_everything() {
        let mut tracker = DialogueTracker::new(Catalog::builtin());
        tracker.respond("أضف كنبة");
        tracker.respond("أحمر");
        tracker.respond("أضف كرسي");
        tracker.clear();
        assert_eq!(tracker.pending_action(), PendingAction::None);
        assert!(tracker.memory().added_items().is_empty());
        assert!(tracker.memory().history().is_empty());
    }

    #[test]
    fn quick_actions_map_to_messages() {
        let tracker = DialogueTracker::new(Catalog::builtin());
        assert_eq!(tracker.quick_action_text("colors"), "الألوان");
        assert_eq!(tracker.quick_action_text("عرض الأثاث"), "عرض الأثاث");
    }
}
