use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer};

use crate::db::Expense;

/// Calendar month bucket, ordered chronologically and shown as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u8,
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

/// One pie wedge: positive category total and its share of all positive totals.
#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub category: String,
    pub total: f64,
    pub percent: f64,
}

impl PieSlice {
    /// Percentage label with one decimal place.
    pub fn label(&self) -> String {
        format!("{:.1}%", self.percent)
    }
}

/// Per-user aggregates behind the summary page. The same maps feed the
/// charts and the JSON payloads.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub category_totals: BTreeMap<String, f64>,
    pub monthly_totals: BTreeMap<YearMonth, f64>,
    pub has_expenses: bool,
}

impl Summary {
    pub fn from_expenses(expenses: &[Expense]) -> Self {
        Self {
            category_totals: category_totals(expenses),
            monthly_totals: monthly_totals(expenses),
            has_expenses: !expenses.is_empty(),
        }
    }

    pub fn pie_slices(&self) -> Vec<PieSlice> {
        pie_slices(&self.category_totals)
    }

    pub fn category_totals_json(&self) -> String {
        serde_json::to_string(&self.category_totals).unwrap_or_else(|_| "{}".into())
    }

    pub fn monthly_totals_json(&self) -> String {
        serde_json::to_string(&self.monthly_totals).unwrap_or_else(|_| "{}".into())
    }
}

pub fn category_totals(expenses: &[Expense]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for e in expenses {
        *totals.entry(e.category.clone()).or_insert(0.0) += e.amount;
    }
    totals
}

pub fn monthly_totals(expenses: &[Expense]) -> BTreeMap<YearMonth, f64> {
    let mut totals = BTreeMap::new();
    for e in expenses {
        let key = YearMonth {
            year: e.date.year(),
            month: u8::from(e.date.month()),
        };
        *totals.entry(key).or_insert(0.0) += e.amount;
    }
    totals
}

/// Non-positive totals cannot be drawn as wedges and are left out.
pub fn pie_slices(totals: &BTreeMap<String, f64>) -> Vec<PieSlice> {
    let positive: f64 = totals.values().copied().filter(|v| *v > 0.0).sum();
    if positive <= 0.0 {
        return Vec::new();
    }
    totals
        .iter()
        .filter(|(_, v)| **v > 0.0)
        .map(|(category, total)| PieSlice {
            category: category.clone(),
            total: *total,
            percent: total / positive * 100.0,
        })
        .collect()
}
