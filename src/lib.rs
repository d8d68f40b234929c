//! Touch gesture classification and stacked-card navigation.

pub mod carousel;
pub mod config;
pub mod engine;
pub mod gestures;
pub mod haptics;
pub mod input;
pub mod layout;
pub mod pipeline;
pub mod replay;
pub mod router;
pub mod session;
pub mod stack;
pub mod tracker;

pub use engine::{CardStackEngine, ContactEvent, ContactPhase, StackListener};
pub use gestures::{Gesture, GestureClassifier};
pub use stack::SlotId;
