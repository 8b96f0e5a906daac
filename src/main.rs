//! craftprofit - Command Line Interface
//!
//! Loads recipe records, optimizes the requested item and prints the active
//! crafting tree. Run with `--help` to see all available options.

use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use craftprofit::{
    calculator::{ProfitConfig, DEFAULT_TAX_PERCENTAGE},
    cart::DEFAULT_CRAFT_COUNT,
    data::load_records,
    display::{render_session, write_shopping_list_csv},
    graph::ItemGraph,
    session::Session,
};

/// Command-line arguments for craftprofit.
#[derive(Parser, Debug)]
#[command(name = "craftprofit")]
#[command(author, version, about = "Decide what to buy and what to craft for the most profit", long_about = None)]
struct Args {
    /// JSON file holding the recipe records
    #[arg(short, long)]
    records: PathBuf,

    /// Item to craft
    #[arg(short, long)]
    item: String,

    /// Number of items to craft
    #[arg(short, long, default_value_t = DEFAULT_CRAFT_COUNT)]
    craft_count: u32,

    /// Share of the market price kept after tax (0 to 1)
    #[arg(short, long, default_value_t = DEFAULT_TAX_PERCENTAGE)]
    tax: f64,

    /// Apply the value pack selling bonus
    #[arg(long, default_value = "false")]
    value_pack: bool,

    /// Manual choice applied after optimizing, as ITEM=RECIPE_ID or ITEM=buy
    #[arg(long = "choose", value_name = "ITEM=RECIPE")]
    choices: Vec<String>,

    /// Also write the shopping list to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("craftprofit={level}", level = args.log_level))
        .with_writer(std::io::stderr)
        .init();

    let config = ProfitConfig {
        tax_percentage: args.tax,
        value_pack_enabled: args.value_pack,
    };

    println!("craftprofit - Recipe Profit Optimizer");
    println!("================================================================");
    println!();
    println!("Configuration:");
    println!("  Item:            {}", args.item);
    println!("  Craft Count:     {}", args.craft_count);
    println!("  Tax:             {}", args.tax);
    println!("  Value Pack:      {}", if args.value_pack { "enabled" } else { "disabled" });

    let records = load_records(&args.records)?;
    let graph = ItemGraph::from_records(&records)?;
    println!();
    println!("Loaded {} records describing {} items.", records.len(), graph.len());

    let mut session = Session::new(graph, &args.item, config, args.craft_count)?;

    for choice in &args.choices {
        let (item, recipe) = choice
            .split_once('=')
            .ok_or_else(|| format!("choice `{}` is not ITEM=RECIPE", choice))?;
        if recipe.eq_ignore_ascii_case("buy") {
            session.select_buy(item.trim())?;
        } else {
            session.select_recipe(item.trim(), recipe.trim())?;
        }
    }

    println!();
    print!("{}", render_session(&session));

    if let Some(path) = args.csv {
        write_shopping_list_csv(&session, File::create(&path)?)?;
        println!();
        println!("Shopping list written to {}", path.display());
    }

    Ok(())
}
