// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-part backends` command: list what each registered backend accepts.

use backend_registry::global;

pub fn execute() -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            graph-part · Backend Registry            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let registries = global::snapshot();
    let backends = registries.backends();
    if backends.is_empty() {
        println!("  No backends registered.");
        return Ok(());
    }

    for backend in &backends {
        println!("  {backend}");

        // ── Operators ──────────────────────────────────────────
        let ops = registries.capabilities.ops_for(backend);
        if ops.is_empty() {
            println!("    operators: none");
        } else {
            println!("    operators:");
            for op in ops {
                // Only FT publishes kernel names.
                let kernel = if backend == &backend_ft::backend_id() {
                    backend_ft::kernel_symbol(op).unwrap_or("-")
                } else {
                    "-"
                };
                println!("      {:<20} {kernel}", op.as_str());
            }
        }

        // ── Patterns ───────────────────────────────────────────
        let table = registries.get_table(backend).unwrap_or(&[]);
        if table.is_empty() {
            println!("    patterns: none");
        } else {
            println!("    patterns (priority order):");
            for template in table {
                let predicate = if template.has_predicate() {
                    " [checked]"
                } else {
                    ""
                };
                println!("      {:<20} {template}{predicate}", template.name());
            }
        }
        println!();
    }
    Ok(())
}
