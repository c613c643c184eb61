//! Fixture datasets shaped like a dbgen export

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub fn date_line(key: u32) -> String {
    format!("{}|January 1, 1992|Thursday|January|1992|199201|Jan1992|5|1|1|1|1|Winter|0|0|1|1|", 19920100 + key)
}

pub fn part_line(key: u32) -> String {
    format!("{key}|lace spring|MFGR#1|MFGR#11|MFGR#1121|goldenrod|PROMO BURNISHED COPPER|7|JUMBO PKG|")
}

pub fn supplier_line(key: u32) -> String {
    format!("{key}|Supplier#{key:09}|sdrGnXCDRcfriBvY0KL,i|PERU     0|PERU|AMERICA|27-989-741-2988|")
}

pub fn customer_line(key: u32) -> String {
    format!("{key}|Customer#{key:09}|j5JsirBM9P|MOROCCO  0|MOROCCO|AFRICA|25-989-741-2988|BUILDING|")
}

pub fn lineorder_line(key: u32) -> String {
    format!("{key}|1|7381|155190|828|19960102|5-LOW|0|17|2116823|17366547|4|2032150|74711|2|19960212|TRUCK|")
}

/// Lines `1..=rows` for `table`
pub fn lines(table: &str, rows: u32) -> Vec<String> {
    let line: fn(u32) -> String = match table {
        "date" => date_line,
        "part" => part_line,
        "supplier" => supplier_line,
        "customer" => customer_line,
        "lineorder" => lineorder_line,
        other => panic!("no fixture for table {other}"),
    };
    (1..=rows).map(line).collect()
}

pub fn write_table(dataset: &Path, table: &str, lines: &[String]) -> PathBuf {
    fs::create_dir_all(dataset).unwrap();
    let path = dataset.join(format!("{table}.tbl"));
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(&path, text).unwrap();
    path
}

/// `<root>/ssb-sf1.0/` holding every table with `rows` lines each
pub fn write_dataset(root: &Path, rows: u32) -> PathBuf {
    let dataset = root.join("ssb-sf1.0");
    for table in ["date", "part", "supplier", "customer", "lineorder"] {
        write_table(&dataset, table, &lines(table, rows));
    }
    dataset
}
