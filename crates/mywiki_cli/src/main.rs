//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mywiki_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use mywiki_core::db::open_db_in_memory;
use mywiki_core::{NoAttachments, WikiService};

fn main() {
    println!("mywiki_core version={}", mywiki_core::core_version());

    let conn = match open_db_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("db bootstrap failed: {err}");
            std::process::exit(1);
        }
    };

    let service = WikiService::new(&conn, NoAttachments);
    match service.get_tree() {
        Ok(tree) => println!(
            "mywiki_core tree version={} top_level_nodes={}",
            tree.version,
            tree.tree.len()
        ),
        Err(err) => {
            eprintln!("tree load failed: {err}");
            std::process::exit(1);
        }
    }
}
