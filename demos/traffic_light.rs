//! Traffic Light State Machine
//!
//! This example demonstrates delayed transitions and parallel regions.
//!
//! Key concepts:
//! - `after` timers scheduled from entry actions
//! - Timers cancelled automatically when a state exits
//! - A parallel pedestrian region living next to the light cycle
//! - Capturing a checkpoint of the running machine
//!
//! Run with: cargo run --example traffic_light

use canopy::builder::StateConfig;
use canopy::core::DynEvent;
use canopy::effects::{Machine, Reaction};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Intersection {
    cycles: u32,
}

fn timed(id: &str, millis: u64, next: &'static str) -> StateConfig<Intersection, DynEvent> {
    StateConfig::new(id).entry_fn(move |p| {
        p.after_goto(Duration::from_millis(millis), next);
        Ok(Reaction::Stay)
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Traffic Light State Machine ===\n");

    let machine = Machine::new(
        StateConfig::new("intersection")
            .context(Intersection::default())
            .parallel()
            .state(
                StateConfig::new("light")
                    .state(timed("green", 300, "yellow").initial())
                    .state(timed("yellow", 100, "red"))
                    .state(
                        timed("red", 200, "green").exit_fn(|p| {
                            p.update_context(|c| Intersection {
                                cycles: c.cycles + 1,
                            });
                            Ok(())
                        }),
                    ),
            )
            .state(
                StateConfig::new("pedestrian")
                    .state(StateConfig::new("dont_walk").on_goto("BUTTON", "walk"))
                    .state(timed("walk", 250, "dont_walk")),
            ),
    )?;

    let _subscription = machine.subscribe(|state, ctx| {
        println!("  {state}  cycles={}", ctx.cycles);
    });

    machine.start().await?;

    tokio::time::sleep(Duration::from_millis(450)).await;
    println!("\nPedestrian presses the button");
    machine.send("BUTTON".into()).await?;

    tokio::time::sleep(Duration::from_millis(1000)).await;

    let checkpoint = machine.checkpoint().await;
    println!("\nCheckpoint:\n{}", checkpoint.to_json()?);

    machine.stop().await?;
    println!("\nTimers left after stop: {}", machine.pending_timers().await);
    println!("\n=== Example Complete ===");
    Ok(())
}
