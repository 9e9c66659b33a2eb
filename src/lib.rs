//! # Analog alarm clock
//! Control core of a physical analog clock with an alarm function. A fixed
//! set of embassy tasks polls the inputs, follows wall-clock time with the
//! hand stepper and drives the outputs. The orchestrator task is the single
//! owner of the shared state; every mutation flows through it as an event and
//! every change is written back to disk by the persistence task.

pub mod event;
pub mod hal;
pub mod hand;
pub mod render;
pub mod state;
pub mod task;
