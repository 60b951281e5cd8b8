//! Toggle
//!
//! This example drives a two-state switch from standard input.
//!
//! Key concepts:
//! - Declaring a state tree with `StateConfig`
//! - Sending events built with `event_enum!`
//! - Counting flips in context from an entry action
//! - Observing settled transitions with `subscribe`
//!
//! Run with: cargo run --example toggle
//! Type `t` to toggle, `q` to quit.

use canopy::builder::StateConfig;
use canopy::effects::{Machine, Reaction};
use canopy::event_enum;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};

event_enum! {
    enum SwitchEvent {
        Toggle,
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Switch {
    flips: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let machine: Machine<Switch, SwitchEvent> = Machine::new(
        StateConfig::new("switch")
            .context(Switch::default())
            .state(StateConfig::new("off").on_goto("Toggle", "on"))
            .state(
                StateConfig::new("on")
                    .entry_fn(|p| {
                        p.update_context(|c: &Switch| Switch { flips: c.flips + 1 });
                        Ok(Reaction::Stay)
                    })
                    .on_goto("Toggle", "off"),
            ),
    )?;

    let _subscription = machine.subscribe(|state, ctx| {
        println!("state: {state} (flips: {})", ctx.flips);
    });

    machine.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "t" => machine.send(SwitchEvent::Toggle).await?,
            "q" => break,
            other => println!("unknown command '{other}', use t or q"),
        }
    }

    machine.stop().await?;
    println!("switched on {} times", machine.context().flips);
    Ok(())
}
