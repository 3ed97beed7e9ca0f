//! Utility to print a recipe's label text
//!
//! Usage: print_label <recipe title> [batch] [label set]

use chrono::Local;

use larder::config::AppConfig;
use larder::tools::labels::{calculate_label, LabelRequest, LabelSource};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(title) = args.next() else {
        eprintln!("Usage: print_label <recipe title> [batch] [label set]");
        std::process::exit(2);
    };
    let batch: u32 = match args.next() {
        Some(value) => value.parse()?,
        None => 1,
    };
    let label_set = args.next();

    let config = AppConfig::from_env();
    let database = larder::db::Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        larder::db::migrations::run_migrations(conn)?;
        Ok(())
    })?;

    let request = LabelRequest {
        source: LabelSource::Recipe { title, batch },
        units: None,
        label_set,
        expiry_days: None,
    };
    let label = calculate_label(&database, &config, &request, Local::now().date_naive())?;

    let text = &label.plain_text;
    for block in [&text.heading, &text.subheading, &text.contents, &text.nutrition, &text.footer] {
        if !block.is_empty() {
            println!("{}", block);
        }
    }
    println!("{}", text.expiry);

    for warning in label.warnings.iter().chain(label.missing_nutrients.iter()) {
        eprintln!("warning: {}", warning);
    }
    if let Some(unit) = &label.unit {
        eprintln!(
            "{} unit(s) of {} g, cost per unit {:.2}",
            unit.units,
            unit.weight_grams,
            unit.total_cost.value()
        );
    }

    Ok(())
}
