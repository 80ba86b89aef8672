// Ventas Analytics - CLI report
// Loads a sales export, runs one filtered query, prints the metrics report
// (or JSON for an external dashboard)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ventas_analytics::{
    group_by, highlights, load_dataset, Category, FilterSpec, GroupDimension, GroupRow, GroupSort,
    Highlights, QueryResult, SalesMetrics, WEEKDAY_NAMES,
};

#[derive(Parser, Debug)]
#[command(
    name = "ventas-analytics",
    version,
    about = "Métricas de ventas sobre un export CSV del punto de venta"
)]
struct Args {
    /// Path to the sales export (CSV)
    file: PathBuf,

    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Restrict to a customer, repeatable (case-insensitive)
    #[arg(long = "customer")]
    customers: Vec<String>,

    /// Restrict to a product category, repeatable (e.g. "Agua en Bolsa")
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Restrict to one transaction type (e.g. "Sales Receipt")
    #[arg(long = "type")]
    tx_type: Option<String>,

    /// Rows per breakdown table
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Emit the query result as JSON instead of the report
    #[arg(long)]
    json: bool,
}

/// JSON payload for an external presentation layer
#[derive(Serialize)]
struct Report<'a> {
    metrics: &'a SalesMetrics,
    by_item: &'a [GroupRow],
    by_customer: &'a [GroupRow],
    by_category: &'a [GroupRow],
    by_weekday: &'a [GroupRow],
    by_date: Vec<GroupRow>,
    highlights: &'a Highlights,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut categories = BTreeSet::new();
    for raw in &args.categories {
        let category: Category = raw
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("invalid --category value")?;
        categories.insert(category);
    }

    let dataset = load_dataset(&args.file)
        .with_context(|| format!("failed to load sales export {}", args.file.display()))?;

    let filter = FilterSpec {
        start_date: args.from,
        end_date: args.to,
        customers: args.customers.iter().cloned().collect(),
        categories,
        tx_type: args.tx_type.clone(),
    };
    let result = dataset.query(&filter);

    let by_item = group_by(&result.records, GroupDimension::Item, GroupSort::TotalAmount, Some(args.top));
    let by_customer = group_by(&result.records, GroupDimension::Customer, GroupSort::TotalAmount, Some(args.top));
    let by_category = group_by(&result.records, GroupDimension::Category, GroupSort::TotalAmount, None);
    let mut by_weekday = group_by(&result.records, GroupDimension::Weekday, GroupSort::TotalAmount, None);
    // Monday-start display order, not aggregate order
    by_weekday.sort_by_key(|row| {
        WEEKDAY_NAMES
            .iter()
            .position(|name| *name == row.key)
            .unwrap_or(WEEKDAY_NAMES.len())
    });
    let leaders = highlights(&result.records);

    if args.json {
        let report = Report {
            metrics: &result.metrics,
            by_item: &by_item,
            by_customer: &by_customer,
            by_category: &by_category,
            by_weekday: &by_weekday,
            by_date: group_by(&result.records, GroupDimension::Date, GroupSort::TotalAmount, None),
            highlights: &leaders,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&args, &dataset.date_span(), &result, &by_item, &by_customer, &by_category, &by_weekday, &leaders);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn print_report(
    args: &Args,
    span: &Option<(NaiveDate, NaiveDate)>,
    result: &QueryResult,
    by_item: &[GroupRow],
    by_customer: &[GroupRow],
    by_category: &[GroupRow],
    by_weekday: &[GroupRow],
    leaders: &Highlights,
) {
    let m = &result.metrics;

    println!("📊 Dashboard de Ventas - {}", args.file.display());
    if let Some((min, max)) = span {
        println!("   Datos del {} al {}", min, max);
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("💰 Ventas totales:   {}", money(m.total_sales));
    println!("🛒 Transacciones:    {}", m.transaction_count);
    println!("🎯 Ticket promedio:  {}", money(m.average_ticket));
    println!("👥 Clientes únicos:  {}", m.unique_customers);
    println!("📦 Productos únicos: {}", m.unique_items);
    println!("📆 Días con ventas:  {}", m.distinct_sales_days);

    if let Some(split) = &m.by_type {
        println!("\n   Por tipo de transacción:");
        for (tx_type, totals) in split {
            println!(
                "   · {:<14} {} ({} transacciones)",
                tx_type,
                money(totals.total_sales),
                totals.transaction_count
            );
        }
    }

    print_breakdown(&format!("🏆 Top {} productos por ingresos", args.top), by_item);
    print_breakdown(&format!("👑 Top {} clientes", args.top), by_customer);
    print_breakdown("📊 Ventas por categoría", by_category);
    print_breakdown("📅 Ventas por día de la semana", by_weekday);

    println!("\n💡 Insights");
    if let Some(day) = &leaders.best_weekday {
        println!("   Mejor día de ventas: {}", day);
    }
    if let Some(item) = &leaders.top_item {
        println!("   Producto top:        {}", item);
    }
    if let Some(customer) = &leaders.top_customer {
        println!("   Cliente top:         {}", customer);
    }
    if let Some(category) = &leaders.top_category {
        println!("   Categoría líder:     {}", category);
    }
    if result.records.is_empty() {
        println!("   (sin transacciones para los filtros elegidos)");
    }
}

fn print_breakdown(title: &str, rows: &[GroupRow]) {
    println!("\n{title}");
    if rows.is_empty() {
        println!("   (sin datos)");
        return;
    }
    for (i, row) in rows.iter().enumerate() {
        println!(
            "   {:>2}. {:<40} {:>14}  ({} ventas, {} uds)",
            i + 1,
            row.key,
            money(row.total_amount),
            row.count,
            row.total_qty
        );
    }
}

/// "L 1,234.56" in the local currency format
fn money(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, dec_part) = match formatted.split_once('.') {
        Some(parts) => parts,
        None => (formatted.as_str(), "00"),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}L {grouped}.{dec_part}")
}
