use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

const TOTAL_CLIENTS: u32 = 20_000;
const TOTAL_PRODUCTS: u32 = 200_000;
const TOTAL_SALES: u32 = 1_000_000;

fn client_code(i: u32) -> String {
    format!("C{:05}", i)
}

fn product_code(i: u32) -> String {
    format!("P{:06}", i)
}

fn write_codes(path: &Path, total: u32, code: fn(u32) -> String) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for i in 0..total {
        writeln!(writer, "{}", code(i))?;
    }
    writer.flush()
}

// fields of the i-th valid sale in `type;client;product;month;price;branch;quantity` order
fn sale_fields(i: u32) -> [String; 7] {
    // a cheap deterministic scramble so neighbouring lines hit different keys
    let x = i.wrapping_mul(2_654_435_761);
    [
        (if x % 2 == 0 { "N" } else { "P" }).to_string(),
        client_code(x % TOTAL_CLIENTS),
        product_code((x / 7) % TOTAL_PRODUCTS),
        (x % 12 + 1).to_string(),
        format!("{:.2}", f64::from(x % 100_000) / 100.0),
        (x % 3 + 1).to_string(),
        (x % 200 + 1).to_string(),
    ]
}

fn create_big_sales_file(path: &Path) {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(b';')
        .from_path(path)
        .unwrap();
    let product = product_code(1);
    let product = product.as_str();
    let client = client_code(1);
    let client = client.as_str();
    for i in 0..TOTAL_SALES {
        match i % 50 {
            // unknown client
            17 => writer
                .write_record(["N", "X0000", product, "1", "1.00", "1", "1"])
                .unwrap(),
            // month out of range
            31 => writer
                .write_record(["N", client, product, "13", "1.00", "1", "1"])
                .unwrap(),
            // every 49th sale repeats the previous key
            49 => writer.write_record(&sale_fields(i - 1)).unwrap(),
            _ => writer.write_record(&sale_fields(i)).unwrap(),
        }
    }
    writer.flush().unwrap();
}

fn main() {
    let dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let dir = Path::new(&dir);
    write_codes(&dir.join("clients.txt"), TOTAL_CLIENTS, client_code).unwrap();
    write_codes(&dir.join("products.txt"), TOTAL_PRODUCTS, product_code).unwrap();
    create_big_sales_file(&dir.join("sales.txt"));
}
