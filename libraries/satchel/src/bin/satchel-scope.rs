use std::path::PathBuf;

use satchel::scope::inspect_file;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <path-to-satchel-file>", args[0]);
        eprintln!("\nExample: {} ./cache.satchel", args[0]);
        std::process::exit(1);
    }

    let file_path = PathBuf::from(&args[1]);

    let report = match inspect_file(&file_path) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file_path.display(), e);
            std::process::exit(1);
        }
    };

    println!("SatchelScope - stored value inspector");
    println!("=====================================");
    println!("File: {}", file_path.display());
    print!("{}", report.render(chrono::Utc::now()));

    if report.header.is_err() || !report.checksum_ok {
        std::process::exit(2);
    }
}
