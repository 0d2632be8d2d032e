use std::path::Path;

use anyhow::{Context, Result};

use data_sweeper::data::export::{self, ExportFormat};
use data_sweeper::data::model::{Column, Table, Value};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Sales-like table with a few repeated rows and gaps in the numeric columns.
fn sample_table(rng: &mut SimpleRng, rows: usize) -> Result<Table> {
    let regions = ["North", "South", "East", "West"];
    let products = ["Widget", "Gadget", "Gizmo"];

    let mut ids = Vec::new();
    let mut region = Vec::new();
    let mut product = Vec::new();
    let mut units = Vec::new();
    let mut price = Vec::new();

    for i in 0..rows {
        ids.push(Value::Integer(i as i64 + 1));
        region.push(Value::String(rng.pick(&regions).to_string()));
        product.push(Value::String(rng.pick(&products).to_string()));
        // Roughly one cell in ten is left empty.
        units.push(if rng.next_f64() < 0.1 {
            Value::Null
        } else {
            Value::Integer((rng.next_f64() * 50.0) as i64 + 1)
        });
        price.push(if rng.next_f64() < 0.1 {
            Value::Null
        } else {
            Value::Float((rng.next_f64() * 10_000.0).round() / 100.0)
        });
    }

    // Every seventh row appears twice.
    let mut columns = vec![ids, region, product, units, price];
    for column in &mut columns {
        let repeated: Vec<Value> = column.iter().step_by(7).cloned().collect();
        column.extend(repeated);
    }

    let names = ["order_id", "region", "product", "units", "unit_price"];
    let columns = names
        .iter()
        .zip(columns)
        .map(|(name, values)| Column::new(*name, values))
        .collect();
    Ok(Table::new(columns)?)
}

fn write(table: &Table, format: ExportFormat, name: &str) -> Result<()> {
    let result = export::export(table, format, name)?;
    std::fs::write(Path::new(&result.file_name), &result.buffer)
        .with_context(|| format!("writing {}", result.file_name))?;
    println!(
        "Wrote {} rows x {} columns to {}",
        table.n_rows(),
        table.n_columns(),
        result.file_name
    );
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let table = sample_table(&mut rng, 60)?;
    write(&table, ExportFormat::Csv, "sample_sales.csv")?;
    write(&table, ExportFormat::Excel, "sample_sales.xlsx")?;
    Ok(())
}
