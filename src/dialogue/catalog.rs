//! Furniture, colour and material tables.
//!
//! Loaded from JSON files in the data directory. A table that is missing,
//! unreadable, empty or malformed falls back to the built-in defaults; the
//! commands table is optional and simply stays empty.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::normalize::normalize;
use crate::error::CatalogError;

pub const FURNITURE_FILE: &str = "Furniture.txt";
pub const COLOURS_FILE: &str = "Colours.txt";
pub const MATERIALS_FILE: &str = "matrials.txt";
pub const COMMANDS_FILE: &str = "Commands.txt";

/// Spelling variants of the built-in furniture categories.
const FURNITURE_SYNONYMS: &[(&str, &str)] = &[
    ("كنبه", "كنبة"),
    ("كنب", "كنبة"),
    ("أريكة", "كنبة"),
    ("سوفا", "كنبة"),
    ("أريكه", "كنبة"),
    ("كنبيه", "كنبة"),
    ("كراسي", "كرسي"),
    ("مقعد", "كرسي"),
    ("مقاعد", "كرسي"),
    ("كورسي", "كرسي"),
    ("كرسى", "كرسي"),
    ("منضده", "ترابيزة"),
    ("طاوله", "ترابيزة"),
    ("طاولة", "ترابيزة"),
    ("تافله", "ترابيزة"),
    ("منضدة", "ترابيزة"),
    ("تابوره", "ترابيزة"),
    ("ترابيزه", "ترابيزة"),
    ("تربيزه", "ترابيزة"),
];

/// Feminine and dialect spellings of the built-in colours.
const COLOUR_SYNONYMS: &[(&str, &str)] = &[
    ("احمر", "أحمر"),
    ("حمرا", "أحمر"),
    ("حمراء", "أحمر"),
    ("ازرق", "أزرق"),
    ("زرقا", "أزرق"),
    ("زرقاء", "أزرق"),
    ("اخضر", "أخضر"),
    ("خضرا", "أخضر"),
    ("خضراء", "أخضر"),
    ("اصفر", "أصفر"),
    ("صفرا", "أصفر"),
    ("صفراء", "أصفر"),
    ("اسود", "أسود"),
    ("سودا", "أسود"),
    ("سوداء", "أسود"),
    ("ابيض", "أبيض"),
    ("بيضا", "أبيض"),
    ("بيضاء", "أبيض"),
    ("رماديه", "رمادي"),
    ("رمادى", "رمادي"),
    ("بنيه", "بني"),
    ("بنى", "بني"),
    ("دهبي", "ذهبي"),
    ("ذهبى", "ذهبي"),
    ("فضيه", "فضي"),
    ("فضى", "فضي"),
];

/// One purchasable model of a furniture category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnitureModel {
    pub name: String,
    #[serde(default)]
    pub available_colors: Vec<String>,
    #[serde(default)]
    pub materials: Vec<String>,
}

impl FurnitureModel {
    pub fn new(name: &str, colors: &[&str], materials: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            available_colors: colors.iter().map(|s| s.to_string()).collect(),
            materials: materials.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CategoryFile {
    #[serde(default)]
    models: Vec<FurnitureModel>,
}

#[derive(Debug, Clone)]
struct Category {
    name: String,
    key: String,
    models: Vec<FurnitureModel>,
}

/// A catalog term: display name, plus the normalized forms it is matched by.
#[derive(Debug, Clone)]
struct Term {
    name: String,
    keys: Vec<String>,
}

impl Term {
    fn new(name: &str, value: &str) -> Self {
        let mut keys = vec![normalize(name)];
        let value = normalize(value);
        if !value.is_empty() && !keys.contains(&value) {
            keys.push(value);
        }
        Self {
            name: name.to_string(),
            keys,
        }
    }

    fn matches(&self, normalized_text: &str) -> bool {
        self.keys
            .iter()
            .any(|k| !k.is_empty() && normalized_text.contains(k.as_str()))
    }
}

/// Everything the assistant knows about furniture.
#[derive(Debug, Clone)]
pub struct Catalog {
    furniture: Vec<Category>,
    colours: Vec<Term>,
    materials: Vec<Term>,
    commands: Vec<(String, String)>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// Build from explicit tables. Colour and material pairs are
    /// `(name, alias)`; pass the name twice when there is no alias.
    pub fn new(
        furniture: Vec<(String, Vec<FurnitureModel>)>,
        colours: Vec<(String, String)>,
        materials: Vec<(String, String)>,
    ) -> Self {
        Self {
            furniture: furniture
                .into_iter()
                .map(|(name, models)| Category {
                    key: normalize(&name),
                    name,
                    models,
                })
                .collect(),
            colours: colours.iter().map(|(n, v)| Term::new(n, v)).collect(),
            materials: materials.iter().map(|(n, v)| Term::new(n, v)).collect(),
            commands: Vec::new(),
        }
    }

    /// The built-in sofa / chair / table catalog.
    pub fn builtin() -> Self {
        let furniture = vec![
            (
                "كنبة".to_string(),
                vec![
                    FurnitureModel::new(
                        "كنبة مودرن 3 أفراد",
                        &["أحمر", "أزرق", "رمادي", "أسود"],
                        &["قُماش", "جِلْد"],
                    ),
                    FurnitureModel::new(
                        "كنبة كلاسيك منجدة",
                        &["بني", "ذهبي", "أخضر", "أبيض"],
                        &["قُماش", "جِلْد"],
                    ),
                ],
            ),
            (
                "كرسي".to_string(),
                vec![
                    FurnitureModel::new(
                        "كرسي مكتب دوار",
                        &["أسود", "رمادي", "أزرق"],
                        &["بلاستيك", "معدن"],
                    ),
                    FurnitureModel::new("كرسي سفرة خشب", &["بني", "أبيض", "أصفر"], &["خشب"]),
                ],
            ),
            (
                "ترابيزة".to_string(),
                vec![
                    FurnitureModel::new("ترابيزة سفرة خشب", &["بني", "أبيض"], &["خشب"]),
                    FurnitureModel::new(
                        "ترابيزة قهوة مودرن",
                        &["أسود", "أبيض", "ذهبي"],
                        &["زجاج", "معدن"],
                    ),
                ],
            ),
        ];
        let colours = [
            "أحمر", "أزرق", "أخضر", "أصفر", "أسود", "أبيض", "رمادي", "بني", "ذهبي", "فضي",
        ];
        let materials = ["خشب", "معدن", "زجاج", "قُماش", "جِلْد", "بلاستيك"];
        Self::new(
            furniture,
            colours.iter().map(|c| (c.to_string(), c.to_string())).collect(),
            materials.iter().map(|m| (m.to_string(), m.to_string())).collect(),
        )
    }

    /// Load every table from `dir`, falling back to defaults table by table.
    pub fn load(dir: &Path) -> Self {
        let defaults = Self::builtin();

        let furniture = match load_furniture(&dir.join(FURNITURE_FILE)) {
            Ok(furniture) => {
                info!(file = FURNITURE_FILE, "Loaded furniture table");
                furniture
            }
            Err(e) => {
                warn!(error = %e, "Using default furniture data");
                defaults.furniture
            }
        };
        let colours = match load_terms(&dir.join(COLOURS_FILE)) {
            Ok(colours) => colours,
            Err(e) => {
                warn!(error = %e, "Using default colour data");
                defaults.colours
            }
        };
        let materials = match load_terms(&dir.join(MATERIALS_FILE)) {
            Ok(materials) => materials,
            Err(e) => {
                warn!(error = %e, "Using default material data");
                defaults.materials
            }
        };
        let commands = match load_table(&dir.join(COMMANDS_FILE)) {
            Ok(table) => table
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect(),
            Err(e) => {
                debug!(error = %e, "No commands table");
                Vec::new()
            }
        };

        info!(
            furniture = furniture.len(),
            colours = colours.len(),
            materials = materials.len(),
            commands = commands.len(),
            "Catalog loaded"
        );
        Self {
            furniture,
            colours,
            materials,
            commands,
        }
    }

    /// First furniture category mentioned in `normalized_text`.
    pub fn detect_furniture(&self, normalized_text: &str) -> Option<&str> {
        if let Some(category) = self
            .furniture
            .iter()
            .find(|c| !c.key.is_empty() && normalized_text.contains(c.key.as_str()))
        {
            return Some(category.name.as_str());
        }
        FURNITURE_SYNONYMS
            .iter()
            .find(|(synonym, _)| normalized_text.contains(normalize(synonym).as_str()))
            .and_then(|(_, actual)| self.category(actual))
            .map(|c| c.name.as_str())
    }

    /// First colour mentioned in `normalized_text`.
    pub fn detect_color(&self, normalized_text: &str) -> Option<&str> {
        if let Some(term) = self.colours.iter().find(|t| t.matches(normalized_text)) {
            return Some(term.name.as_str());
        }
        COLOUR_SYNONYMS
            .iter()
            .find(|(synonym, _)| normalized_text.contains(normalize(synonym).as_str()))
            .and_then(|(_, actual)| {
                let key = normalize(actual);
                self.colours.iter().find(|t| t.keys.contains(&key))
            })
            .map(|t| t.name.as_str())
    }

    /// First material mentioned in `normalized_text`.
    pub fn detect_material(&self, normalized_text: &str) -> Option<&str> {
        self.materials
            .iter()
            .find(|t| t.matches(normalized_text))
            .map(|t| t.name.as_str())
    }

    /// Colours offered by any model of `item`, first-seen order, no duplicates.
    pub fn available_colors(&self, item: &str) -> Vec<&str> {
        self.collect_from_models(item, |m| &m.available_colors)
    }

    /// Materials offered by any model of `item`, first-seen order, no duplicates.
    pub fn available_materials(&self, item: &str) -> Vec<&str> {
        self.collect_from_models(item, |m| &m.materials)
    }

    pub fn is_color_available(&self, item: &str, color: &str) -> bool {
        let color = normalize(color);
        self.available_colors(item)
            .iter()
            .any(|c| normalize(c) == color)
    }

    pub fn is_material_available(&self, item: &str, material: &str) -> bool {
        let material = normalize(material);
        self.available_materials(item)
            .iter()
            .any(|m| normalize(m) == material)
    }

    /// `(category, model names)` for every category, in table order.
    pub fn furniture_listing(&self) -> Vec<(&str, Vec<&str>)> {
        self.furniture
            .iter()
            .map(|c| {
                (
                    c.name.as_str(),
                    c.models.iter().map(|m| m.name.as_str()).collect(),
                )
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.furniture.is_empty()
    }

    /// Text bound to a named command in the commands table.
    pub fn command(&self, name: &str) -> Option<&str> {
        self.commands
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn category(&self, name: &str) -> Option<&Category> {
        let key = normalize(name);
        self.furniture.iter().find(|c| c.key == key)
    }

    fn collect_from_models<'a>(
        &'a self,
        item: &str,
        field: impl Fn(&'a FurnitureModel) -> &'a Vec<String>,
    ) -> Vec<&'a str> {
        let mut out: Vec<&str> = Vec::new();
        if let Some(category) = self.category(item) {
            for value in category.models.iter().flat_map(|m| field(m).iter()) {
                if !out.contains(&value.as_str()) {
                    out.push(value);
                }
            }
        }
        out
    }
}

fn load_table(path: &Path) -> Result<Map<String, Value>, CatalogError> {
    let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table: Map<String, Value> =
        serde_json::from_str(&text).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if table.is_empty() {
        return Err(CatalogError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(table)
}

fn load_furniture(path: &Path) -> Result<Vec<Category>, CatalogError> {
    load_table(path)?
        .into_iter()
        .map(|(name, value)| {
            let file: CategoryFile =
                serde_json::from_value(value).map_err(|source| CatalogError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(Category {
                key: normalize(&name),
                name,
                models: file.models,
            })
        })
        .collect()
}

fn load_terms(path: &Path) -> Result<Vec<Term>, CatalogError> {
    Ok(load_table(path)?
        .iter()
        .map(|(name, value)| Term::new(name, value.as_str().unwrap_or(name)))
        .collect())
}
