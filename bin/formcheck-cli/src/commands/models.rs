// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `formcheck models` command: list selectable estimator ids.

use pipeline::PipelineConfig;

pub fn execute(config: &PipelineConfig) -> anyhow::Result<()> {
    super::banner("formcheck · Estimators");

    let registry = config.create_registry();
    let mut ids = registry.ids();
    ids.sort_unstable();

    for id in ids {
        let marker = if id == config.model { "*" } else { " " };
        println!("  {marker} {id}");
    }
    println!();
    println!("  * = configured start model");
    if !registry.contains(&config.model) {
        println!(
            "  WARNING: configured model '{}' is not registered; `run` will fail",
            config.model,
        );
    }
    println!();
    Ok(())
}
