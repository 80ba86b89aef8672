// 📊 Metrics Engine - filter composition + aggregates over the clean table
// Every query is a side-effect-free read producing its own filtered copy

use crate::cleaner::canonical_name;
use crate::enrich::{Category, SalesRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Transaction type the source system uses for cash sales
pub const CASH_TYPE: &str = "Sales Receipt";
/// Transaction type the source system uses for invoiced (credit) sales
pub const CREDIT_TYPE: &str = "Invoice";

// ============================================================================
// FILTER SPECIFICATION
// ============================================================================

/// Per-query filter. All predicates combine with logical AND.
///
/// Empty sets mean "no restriction"; absent bounds leave the range open.
/// Supplied per query, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Inclusive lower date bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub end_date: Option<NaiveDate>,
    /// Customer names; matched after canonicalization, empty = all
    pub customers: BTreeSet<String>,
    /// Product categories, empty = all
    pub categories: BTreeSet<Category>,
    /// Exact transaction type, None = all
    pub tx_type: Option<String>,
}

impl FilterSpec {
    /// Restrict to an inclusive date range.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        FilterSpec {
            start_date: Some(start),
            end_date: Some(end),
            ..FilterSpec::default()
        }
    }
}

fn record_matches(
    record: &SalesRecord,
    filter: &FilterSpec,
    canonical_customers: &BTreeSet<String>,
) -> bool {
    if let Some(start) = filter.start_date {
        if record.date < start {
            return false;
        }
    }
    if let Some(end) = filter.end_date {
        if record.date > end {
            return false;
        }
    }
    if let Some(tx_type) = filter.tx_type.as_deref() {
        if record.tx_type != tx_type {
            return false;
        }
    }
    if !canonical_customers.is_empty() && !canonical_customers.contains(&record.name) {
        return false;
    }
    if !filter.categories.is_empty() && !filter.categories.contains(&record.category) {
        return false;
    }
    true
}

// ============================================================================
// SCALAR METRICS
// ============================================================================

/// Sales and count for one transaction type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTotals {
    pub total_sales: f64,
    pub transaction_count: usize,
}

/// Scalar aggregates over a filtered record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesMetrics {
    pub total_sales: f64,
    pub transaction_count: usize,
    /// 0 when the filtered set is empty, never NaN
    pub average_ticket: f64,
    pub unique_customers: usize,
    pub unique_items: usize,
    pub distinct_sales_days: usize,
    /// Split by transaction type; only computed when the type filter is unset.
    /// The known cash and credit types are always present, zero-valued when
    /// absent from the filtered set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_type: Option<BTreeMap<String, TypeTotals>>,
}

/// Filtered record set plus its scalar metrics.
///
/// The records travel with the metrics so callers can run grouped
/// breakdowns on demand without re-filtering.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub records: Vec<SalesRecord>,
    pub metrics: SalesMetrics,
}

/// Filter the table and compute its scalar metrics.
///
/// Never fails for well-formed input; an empty match degrades to
/// zero-valued metrics and an empty record set.
pub fn query(records: &[SalesRecord], filter: &FilterSpec) -> QueryResult {
    let canonical_customers: BTreeSet<String> =
        filter.customers.iter().map(|n| canonical_name(n)).collect();

    let filtered: Vec<SalesRecord> = records
        .iter()
        .filter(|r| record_matches(r, filter, &canonical_customers))
        .cloned()
        .collect();

    let total_sales: f64 = filtered.iter().map(|r| r.amount).sum();
    let transaction_count = filtered.len();
    let average_ticket = if transaction_count == 0 {
        0.0
    } else {
        total_sales / transaction_count as f64
    };

    let unique_customers = filtered
        .iter()
        .map(|r| r.name.as_str())
        .collect::<HashSet<_>>()
        .len();
    let unique_items = filtered
        .iter()
        .map(|r| r.item.as_str())
        .collect::<HashSet<_>>()
        .len();
    let distinct_sales_days = filtered
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .len();

    let by_type = filter.tx_type.is_none().then(|| {
        let mut split: BTreeMap<String, TypeTotals> = BTreeMap::new();
        split.insert(CASH_TYPE.to_string(), TypeTotals::default());
        split.insert(CREDIT_TYPE.to_string(), TypeTotals::default());
        for record in &filtered {
            let slot = split.entry(record.tx_type.clone()).or_default();
            slot.total_sales += record.amount;
            slot.transaction_count += 1;
        }
        split
    });

    QueryResult {
        records: filtered,
        metrics: SalesMetrics {
            total_sales,
            transaction_count,
            average_ticket,
            unique_customers,
            unique_items,
            distinct_sales_days,
            by_type,
        },
    }
}

// ============================================================================
// GROUPED BREAKDOWNS
// ============================================================================

/// Dimension a breakdown groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupDimension {
    Item,
    Customer,
    Category,
    Weekday,
    Date,
}

/// Aggregate that orders a breakdown (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupSort {
    TotalAmount,
    MeanAmount,
    Count,
    TotalQty,
}

/// One group of a breakdown with its aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    pub key: String,
    pub total_amount: f64,
    pub mean_amount: f64,
    pub count: usize,
    pub total_qty: f64,
}

impl GroupRow {
    fn sort_value(&self, sort: GroupSort) -> f64 {
        match sort {
            GroupSort::TotalAmount => self.total_amount,
            GroupSort::MeanAmount => self.mean_amount,
            GroupSort::Count => self.count as f64,
            GroupSort::TotalQty => self.total_qty,
        }
    }
}

fn group_key(record: &SalesRecord, dimension: GroupDimension) -> String {
    match dimension {
        GroupDimension::Item => record.item.clone(),
        GroupDimension::Customer => record.name.clone(),
        GroupDimension::Category => record.category.name().to_string(),
        GroupDimension::Weekday => record.weekday.clone(),
        GroupDimension::Date => record.date.format("%Y-%m-%d").to_string(),
    }
}

/// Group records by a dimension and aggregate Amount (sum, mean, count) and
/// Qty (sum, blanks counting as zero).
///
/// Groups come back ordered by the chosen aggregate descending; ties keep
/// ascending key order, so the cut at top_n is reproducible. A top_n larger
/// than the number of distinct keys returns every group.
pub fn group_by(
    records: &[SalesRecord],
    dimension: GroupDimension,
    sort: GroupSort,
    top_n: Option<usize>,
) -> Vec<GroupRow> {
    #[derive(Default)]
    struct Acc {
        amount_sum: f64,
        qty_sum: f64,
        count: usize,
    }

    // BTreeMap gives key-ascending iteration, which the stable sort below
    // preserves for equal aggregates
    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for record in records {
        let acc = groups.entry(group_key(record, dimension)).or_default();
        acc.amount_sum += record.amount;
        acc.qty_sum += record.qty.unwrap_or(0.0);
        acc.count += 1;
    }

    let mut rows: Vec<GroupRow> = groups
        .into_iter()
        .map(|(key, acc)| GroupRow {
            key,
            total_amount: acc.amount_sum,
            mean_amount: acc.amount_sum / acc.count as f64,
            count: acc.count,
            total_qty: acc.qty_sum,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.sort_value(sort)
            .partial_cmp(&a.sort_value(sort))
            .unwrap_or(Ordering::Equal)
    });

    if let Some(n) = top_n {
        rows.truncate(n);
    }
    rows
}

// ============================================================================
// HIGHLIGHTS
// ============================================================================

/// Leaders across the main dimensions, for report summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Highlights {
    pub best_weekday: Option<String>,
    pub top_item: Option<String>,
    pub top_customer: Option<String>,
    pub top_category: Option<String>,
}

/// Best performer of each dimension by total sales.
pub fn highlights(records: &[SalesRecord]) -> Highlights {
    let leader = |dimension| {
        group_by(records, dimension, GroupSort::TotalAmount, Some(1))
            .into_iter()
            .next()
            .map(|row| row.key)
    };
    Highlights {
        best_weekday: leader(GroupDimension::Weekday),
        top_item: leader(GroupDimension::Item),
        top_customer: leader(GroupDimension::Customer),
        top_category: leader(GroupDimension::Category),
    }
}

// ============================================================================
// TESTS
// ============================================================================
