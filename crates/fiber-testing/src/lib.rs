//! Testing utilities and harness for fiber-core

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use fiber_core::{h, text, ComponentRef, EffectTag, Element, Props, RenderContext};
}
