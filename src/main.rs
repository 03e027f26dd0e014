fn main() {
    if let Err(err) = csv_sections_lib::run() {
        eprintln!("csv-sections: {}", err);
        std::process::exit(1);
    }
}
