//! Build script for mirror-storage.
//!
//! This script ensures the crate is rebuilt when the ledger schema changes.

fn main() {
    // Trigger rebuild when migrations change
    println!("cargo:rerun-if-changed=migrations");
}
