//! The `list` command.

use txlab_scenarios::catalog;

/// Prints the catalog entries with their summaries.
pub fn run() {
    for scenario in catalog() {
        println!("{:40} {}", scenario.name, scenario.summary);
    }
}
