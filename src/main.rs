use std::env;

use sheetdb::app;
use sheetdb::store::SheetStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // Data directory and bind address: positional args, then environment,
    // then defaults.
    let data_dir = args
        .get(1)
        .cloned()
        .or_else(|| env::var("SHEETDB_DATA_DIR").ok())
        .unwrap_or_else(|| "data".to_string());
    let addr = args
        .get(2)
        .cloned()
        .or_else(|| env::var("SHEETDB_ADDR").ok())
        .unwrap_or_else(|| "127.0.0.1:3000".to_string());

    let store = SheetStore::new(&data_dir)?;
    app::run(store, &addr).await
}
