//! Display and formatting utilities for craftprofit.
//!
//! This module renders a [`Session`] as a text report, one table per
//! "used-in" context, and exports the shopping list as CSV.

use std::io::Write;

use crate::error::Result;
use crate::models::ActionKind;
use crate::session::{ItemView, Session};

/// Formats a duration in seconds to a human-readable string.
///
/// # Arguments
///
/// * `seconds` - Duration in seconds
///
/// # Returns
///
/// A formatted string like "1h 30m 45s", "15m 30s", or "45s"
///
/// # Example
///
/// ```
/// use craftprofit::display::format_time;
///
/// assert_eq!(format_time(3665.0), "1h 1m 5s");
/// assert_eq!(format_time(125.0), "2m 5s");
/// assert_eq!(format_time(45.0), "45s");
/// ```
pub fn format_time(seconds: f64) -> String {
    let total_secs = seconds.max(0.0).round() as u64;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Renders the whole active tree of a session.
pub fn render_session(session: &Session) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "Crafting {} x {} (recipe {})\n",
        session.craft_count(),
        session.root_item(),
        session.active_recipe_id(session.root_item()).unwrap_or("-"),
    ));
    output.push_str("================================================================\n");

    for view in session.item_views() {
        output.push_str(&render_item(&view));
    }
    output
}

/// Renders one table per context in which `view` is used.
pub fn render_item(view: &ItemView) -> String {
    let mut output = String::new();

    for line in &view.shopping_cart {
        let entry = &line.entry;
        output.push('\n');
        output.push_str(&format!("{} (x{})", view.name, entry.expected_count));
        if let Some(ref parent) = entry.for_parent {
            output.push_str(&format!(" for {}", parent));
        }
        output.push('\n');
        output.push_str("----------------------------------------------------------------\n");

        match entry.action {
            ActionKind::Buy => output.push_str("  Buy from the market\n"),
            ActionKind::Craft => {
                output.push_str(&format!(
                    "  Craft with recipe {} ({} crafts)\n",
                    view.active_recipe_id.as_deref().unwrap_or("-"),
                    entry.craft_count
                ));
                output.push_str(&format!(
                    "  {:<30} {:>15} {:>15}\n",
                    "Ingredient", "Per Craft", "Total Needed"
                ));
                for row in &view.ingredients {
                    output.push_str(&format!(
                        "  {:<30} {:>15} {:>15}\n",
                        row.item_name, row.amount_per_craft, row.total_needed
                    ));
                }
            }
        }

        let profit = &line.profit;
        let rate = profit
            .profit_per_second
            .map(|r| format!("{:.0}/s", r))
            .unwrap_or_else(|| "N/A".to_string());
        output.push_str(&format!("  Market Price:     {:.0}\n", view.market_price));
        output.push_str(&format!(
            "  Profit:           {:.0} per item, {:.0} total, {}\n",
            profit.profit.floor(),
            profit.total_profit.floor(),
            rate
        ));
        output.push_str(&format!(
            "  Spent:            {:.0} per item, {:.0} total\n",
            entry.individual_price.floor(),
            profit.total_spent.floor()
        ));
        output.push_str(&format!(
            "  Time:             {:.2}s per item, {} total\n",
            entry.cumulative_time_spent,
            format_time(profit.total_time)
        ));
    }
    output
}

/// Writes every cart entry with its total price as CSV.
pub fn write_shopping_list_csv<W: Write>(session: &Session, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["item", "for", "action", "expected_count", "individual_price", "total_price"])?;

    for (name, entries) in session.cart().iter() {
        for entry in entries {
            wtr.write_record([
                name.to_string(),
                entry.for_parent.clone().unwrap_or_default(),
                entry.action.as_str().to_string(),
                entry.expected_count.to_string(),
                format!("{:.2}", entry.individual_price),
                format!("{:.2}", entry.individual_price * entry.expected_count as f64),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}
