// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `formcheck inspect` command: display the resolved configuration.
//!
//! Prints the pipeline tuning, the exercise's angle definitions with joint
//! names, and each rule's trigger in readable form.

use form_rules::{Condition, TrendDirection};
use pipeline::PipelineConfig;
use pose_model::{coco, KeypointId};

pub fn execute(config: &PipelineConfig) -> anyhow::Result<()> {
    super::banner("formcheck · Configuration");

    // ── Pipeline ───────────────────────────────────────────────
    println!("  Pipeline");
    println!("   Model:             {}", config.model);
    println!("   Queue capacity:    {}", config.queue_capacity);
    println!("   Inference budget:  {:?}", config.inference_timeout());
    println!("   Warm-up budget:    {:?}", config.warmup_timeout());
    println!("   Feedback history:  {}", config.feedback_history);
    if let Some(path) = &config.replay_path {
        println!("   Replay file:       {}", path.display());
    }
    println!(
        "   Stabilizer:        window {}, min confidence {:.2}, {} low frames, gap {:?}",
        config.stabilizer.window,
        config.stabilizer.min_confidence,
        config.stabilizer.max_low_confidence_frames,
        config.stabilizer.max_gap(),
    );
    let s = &config.scoring;
    println!(
        "   Scoring:           window {}, bronze {:.2} / silver {:.2} / gold {:.2}, hysteresis {}",
        s.window, s.bronze, s.silver, s.gold, s.hysteresis_cycles,
    );
    println!();

    // ── Exercise ───────────────────────────────────────────────
    let exercise = &config.exercise;
    println!("  Exercise '{}' (history {} cycles)", exercise.name, exercise.history);
    println!();
    println!("  {:<16} {:<44}", "Angle", "Joints (a, vertex, c)");
    println!("  {}", "-".repeat(60));
    for def in &exercise.angles {
        let joints: Vec<String> = def.joints.iter().map(|&id| joint_name(id)).collect();
        println!("  {:<16} {}", def.label, joints.join(", "));
    }
    println!();

    println!("  {:<18} {:<6} {}", "Rule", "Kind", "Trigger");
    println!("  {}", "-".repeat(60));
    for rule in &exercise.rules {
        println!("  {:<18} {:<6} {}", rule.id, rule.kind.as_str(), describe(&rule.condition));
        println!("  {:<18} {:<6} \"{}\"", "", "", rule.text);
    }
    println!();

    match config.validate() {
        Ok(()) => println!("  Configuration is valid."),
        Err(e) => {
            println!("  INVALID: {e}");
            return Err(e.into());
        }
    }
    println!();
    Ok(())
}

fn joint_name(id: KeypointId) -> String {
    coco::name(id).map_or_else(|| format!("#{}", id.0), str::to_string)
}

fn describe(condition: &Condition) -> String {
    match condition {
        Condition::CrossesBelow { label, threshold } => format!("{label} drops below {threshold}°"),
        Condition::CrossesAbove { label, threshold } => format!("{label} rises above {threshold}°"),
        Condition::Within { label, min, max } => format!("{label} in [{min}°, {max}°]"),
        Condition::Outside { label, min, max } => format!("{label} outside [{min}°, {max}°]"),
        Condition::Trend {
            label,
            direction,
            samples,
            min_change,
        } => {
            let dir = match direction {
                TrendDirection::Increasing => "rising",
                TrendDirection::Decreasing => "falling",
            };
            format!("{label} {dir} over {samples} cycles by ≥ {min_change}°")
        }
        Condition::Asymmetry {
            left,
            right,
            max_difference,
        } => format!("|{left} - {right}| exceeds {max_difference}°"),
    }
}
