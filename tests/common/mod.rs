use std::path::Path;

use laptop_lab::config::{ENCODED_DATASET, MAPPINGS, METADATA, ORIGINAL_DATASET};

/// Twelve laptops with a text column and four numeric ones
pub fn write_original(dir: &Path) {
    let rows = [
        ("Dell", 15.6, 8, 2.2, 700.0),
        ("Dell", 15.6, 4, 2.1, 480.0),
        ("Dell", 14.0, 8, 1.6, 950.0),
        ("Apple", 13.3, 8, 1.3, 1300.0),
        ("Apple", 13.3, 16, 1.4, 1800.0),
        ("Apple", 15.4, 16, 1.8, 2400.0),
        ("MSI", 17.3, 32, 3.5, 2500.0),
        ("MSI", 17.3, 16, 3.4, 2100.0),
        ("MSI", 15.6, 16, 2.5, 1500.0),
        ("HP", 15.6, 8, 2.0, 650.0),
        ("HP", 14.0, 4, 1.5, 420.0),
        ("HP", 13.3, 8, 1.2, 1100.0),
    ];
    let mut csv = String::from("Company,Inches,Ram,Weight,Price_euros\n");
    for (company, inches, ram, weight, price) in rows {
        csv.push_str(&format!("{company},{inches},{ram},{weight},{price}\n"));
    }
    std::fs::write(dir.join(ORIGINAL_DATASET), csv).unwrap();
}

/// Encoded dataset plus metadata and mappings, as `prepare` leaves them
#[allow(dead_code)]
pub fn write_prepared(dir: &Path) {
    std::fs::write(
        dir.join(ENCODED_DATASET),
        "Company,RAM,Price\n1,8,833.0\n0,16,2142.0\n1,4,571.2\n",
    )
    .unwrap();
    std::fs::write(
        dir.join(METADATA),
        r#"{"categorical": ["Company"], "numerical": ["RAM", "Price"]}"#,
    )
    .unwrap();
    std::fs::write(dir.join(MAPPINGS), r#"{"Company": {"0": "Apple", "1": "Dell"}}"#).unwrap();
}
