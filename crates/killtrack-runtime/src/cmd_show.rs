//! `killtrack show`: print stored records as a table.

use std::path::Path;

use killtrack_core::export::render_table;
use killtrack_core::{AggregateStore, JsonFileStore};

pub fn cmd_show(store_path: &Path) {
    let store = AggregateStore::new(JsonFileStore::new(store_path));
    print!("{}", render_table(&store.records()));
}
