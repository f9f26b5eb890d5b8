//! Drag and Release Demo
//!
//! A card springs to its resting place. Halfway there the user grabs it: the
//! springs freeze, the card follows the finger, and on release it springs
//! back home from wherever it was dropped.
//!
//! Run with: RUST_LOG=debug cargo run -p recoil_spring --example drag_release

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use recoil_core::{GestureRecognizer, GestureState, SpringProperty};
use recoil_spring::{
    ConfigureSpring, ManualClock, MotionRuntime, PausesSpring, SpringSystem, SpringTo,
    SystemConfig,
};

const CONFIG: &str = r#"
max_delta = 0.05

[default_spring]
tension = 300.0
friction = 22.0
"#;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
struct Card {
    x: f32,
    y: f32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let x = SpringProperty::new("x", |c: &Card| c.x, |c: &mut Card, v| c.x = v);
    let y = SpringProperty::new("y", |c: &Card| c.y, |c: &mut Card, v| c.y = v);

    let clock = ManualClock::new();
    let system = SpringSystem::with_config(SystemConfig::from_toml_str(CONFIG)?, clock.clone())?;
    let mut runtime = MotionRuntime::new().with_spring_system(system);
    runtime.add_state_listener(|state| tracing::info!(?state, "runtime state"));

    let card = Rc::new(RefCell::new(Card::default()));
    let drag = GestureRecognizer::new();

    runtime.add_plan(&PausesSpring::new(x.clone(), drag.clone()), &card)?;
    runtime.add_plan(&PausesSpring::new(y.clone(), drag.clone()), &card)?;
    runtime.add_plan(&ConfigureSpring::new(y.clone()).friction(14.0), &card)?;
    runtime.add_plan(&SpringTo::new(x, 200.0), &card)?;
    runtime.add_plan(&SpringTo::new(y, 80.0), &card)?;

    run_frames(&runtime, &clock, 8)?;
    tracing::info!(card = ?card.borrow(), "grabbed");

    drag.set_state(GestureState::Began);
    // Paused springs report rest on the next frame
    run_frames(&runtime, &clock, 1)?;
    for step in 1..=5 {
        drag.set_state(GestureState::Changed);
        let mut c = card.borrow_mut();
        c.x -= 10.0 * step as f32;
        c.y += 6.0 * step as f32;
    }
    run_frames(&runtime, &clock, 5)?;
    tracing::info!(card = ?card.borrow(), "dragged");

    // Releasing resumes both springs from where the card was dropped
    drag.set_state(GestureState::Recognized);
    run_frames(&runtime, &clock, 500)?;

    tracing::info!(card = ?card.borrow(), state = ?runtime.state(), "released");
    Ok(())
}

fn run_frames(runtime: &MotionRuntime, clock: &ManualClock, count: usize) -> Result<()> {
    for _ in 0..count {
        clock.advance(FRAME);
        if !runtime.tick()? {
            break;
        }
    }
    Ok(())
}
