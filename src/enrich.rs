// 🏷️ Field Enricher - calendar derivation + product categorization
// Pure per-row derivation; cleaned input guarantees every date is valid

use crate::cleaner::CleanRecord;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PRODUCT CATEGORY
// ============================================================================

/// Product families the distributor sells, plus a catch-all.
/// Every item maps to exactly one category.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Category {
    WaterBag,
    Ice,
    LargeBottle,
    SmallBottle,
    Tax,
    Other,
}

impl Category {
    /// Display label, as the source system names them
    pub fn name(&self) -> &'static str {
        match self {
            Category::WaterBag => "Agua en Bolsa",
            Category::Ice => "Hielo",
            Category::LargeBottle => "Botellones",
            Category::SmallBottle => "Botecitos",
            Category::Tax => "Impuestos",
            Category::Other => "Otros",
        }
    }

    pub const ALL: [Category; 6] = [
        Category::WaterBag,
        Category::Ice,
        Category::LargeBottle,
        Category::SmallBottle,
        Category::Tax,
        Category::Other,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "agua en bolsa" | "waterbag" | "agua" => Ok(Category::WaterBag),
            "hielo" | "ice" => Ok(Category::Ice),
            "botellones" | "botellon" | "largebottle" => Ok(Category::LargeBottle),
            "botecitos" | "botecito" | "smallbottle" => Ok(Category::SmallBottle),
            "impuestos" | "impuesto" | "tax" => Ok(Category::Tax),
            "otros" | "other" => Ok(Category::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

// ============================================================================
// CATEGORY RULES
// ============================================================================

/// One keyword rule: any keyword hit assigns the category.
struct CategoryRule {
    keywords: &'static [&'static str],
    category: Category,
}

/// Ordered rule table, first match wins.
///
/// El orden es semántico: un ítem "Agua Hielo 500ml" cae en WaterBag porque
/// la regla de agua se evalúa antes que la de hielo.
const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        keywords: &["agua", "bolsa"],
        category: Category::WaterBag,
    },
    CategoryRule {
        keywords: &["hielo"],
        category: Category::Ice,
    },
    CategoryRule {
        keywords: &["botellon"],
        category: Category::LargeBottle,
    },
    CategoryRule {
        keywords: &["botecito", "bote"],
        category: Category::SmallBottle,
    },
    CategoryRule {
        keywords: &["impuesto", "isv"],
        category: Category::Tax,
    },
];

/// Assign the product category for an item description.
pub fn categorize_item(item: &str) -> Category {
    let item_lower = item.to_lowercase();
    for rule in CATEGORY_RULES {
        if rule.keywords.iter().any(|k| item_lower.contains(k)) {
            return rule.category;
        }
    }
    Category::Other
}

// ============================================================================
// CALENDAR FIELDS
// ============================================================================

/// Full English weekday names, Monday-start order
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Full English name for the weekday of a date.
pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

// ============================================================================
// SALES RECORD
// ============================================================================

/// Fully enriched transaction row, the unit the metrics engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub tx_type: String,
    pub name: String,
    pub item: String,
    pub date: NaiveDate,
    pub qty: Option<f64>,
    pub sales_price: Option<f64>,
    pub amount: f64,
    pub balance: Option<f64>,

    // Derived calendar fields
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: String,
    pub iso_week: u32,

    // Derived product category
    pub category: Category,
}

/// Derive calendar fields and category for one cleaned record.
pub fn enrich_record(record: CleanRecord) -> SalesRecord {
    let date = record.date;
    let category = categorize_item(&record.item);

    SalesRecord {
        tx_type: record.tx_type,
        name: record.name,
        item: record.item,
        date,
        qty: record.qty,
        sales_price: record.sales_price,
        amount: record.amount,
        balance: record.balance,
        year: date.year(),
        month: date.month(),
        day: date.day(),
        weekday: weekday_name(date).to_string(),
        iso_week: date.iso_week().week(),
        category,
    }
}

/// Enrich a whole cleaned table.
pub fn enrich(records: Vec<CleanRecord>) -> Vec<SalesRecord> {
    records.into_iter().map(enrich_record).collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(item: &str, date: NaiveDate) -> CleanRecord {
        CleanRecord {
            tx_type: "Sales Receipt".to_string(),
            name: "CLIENTE".to_string(),
            item: item.to_string(),
            date,
            qty: Some(1.0),
            sales_price: Some(5.0),
            amount: 5.0,
            balance: None,
        }
    }

    #[test]
    fn test_each_keyword_maps_to_its_category() {
        assert_eq!(categorize_item("Agua purificada 500ml"), Category::WaterBag);
        assert_eq!(categorize_item("BOLSA 1 LITRO"), Category::WaterBag);
        assert_eq!(categorize_item("Hielo en cubos"), Category::Ice);
        assert_eq!(categorize_item("Botellon 5 galones"), Category::LargeBottle);
        assert_eq!(categorize_item("Botecito 250ml"), Category::SmallBottle);
        assert_eq!(categorize_item("Bote chico"), Category::SmallBottle);
        assert_eq!(categorize_item("Impuesto sobre venta"), Category::Tax);
        assert_eq!(categorize_item("ISV 15%"), Category::Tax);
        assert_eq!(categorize_item("Flete local"), Category::Other);
    }

    #[test]
    fn test_rule_order_is_first_match_wins() {
        // "agua" rule runs before "hielo"
        assert_eq!(categorize_item("Agua Hielo 500ml"), Category::WaterBag);
        // "botellon" rule runs before the "bote" keyword can claim it
        assert_eq!(categorize_item("Botellon retornable"), Category::LargeBottle);
    }

    #[test]
    fn test_categorization_is_case_insensitive() {
        assert_eq!(categorize_item("AGUA EN BOLSA"), Category::WaterBag);
        assert_eq!(categorize_item("hIeLo"), Category::Ice);
    }

    #[test]
    fn test_every_item_gets_exactly_one_category() {
        for item in ["Agua", "Hielo", "Botellon", "Bote", "ISV", "Otra cosa", ""] {
            let category = categorize_item(item);
            assert!(Category::ALL.contains(&category));
        }
    }

    #[test]
    fn test_calendar_derivation() {
        // 2025-03-25 is a Tuesday in ISO week 13
        let date = NaiveDate::from_ymd_opt(2025, 3, 25).unwrap();
        let record = enrich_record(clean("Agua en bolsa", date));

        assert_eq!(record.year, 2025);
        assert_eq!(record.month, 3);
        assert_eq!(record.day, 25);
        assert_eq!(record.weekday, "Tuesday");
        assert_eq!(record.iso_week, 13);
        assert_eq!(record.category, Category::WaterBag);
    }

    #[test]
    fn test_iso_week_of_early_january() {
        // 2027-01-01 is a Friday, ISO week 53 of 2026
        let date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        let record = enrich_record(clean("Hielo", date));

        assert_eq!(record.weekday, "Friday");
        assert_eq!(record.iso_week, 53);
    }

    #[test]
    fn test_category_labels_round_trip_from_str() {
        for category in Category::ALL {
            assert_eq!(category.name().parse::<Category>().unwrap(), category);
        }
    }
}
