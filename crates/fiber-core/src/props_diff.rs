//! Attribute, style and listener diffing between two property bags.

use crate::applier::Applier;
use crate::element::{EventHandler, PropValue, Props, StyleMap, STYLE};
use crate::error::NodeError;
use crate::NodeId;

const EVENT_PREFIX: &str = "on";

/// `onClick` with a handler value is the `click` listener.
fn event_name<'a>(key: &str, value: &'a PropValue) -> Option<(String, &'a EventHandler)> {
    let name = key.strip_prefix(EVENT_PREFIX)?;
    let handler = value.as_handler()?;
    Some((name.to_lowercase(), handler))
}

fn is_attribute(key: &str, value: &PropValue) -> bool {
    key != STYLE && event_name(key, value).is_none()
}

/// Bring `node` from `prev` to `next`.
///
/// Stale listeners are removed before any attribute write; new listeners are
/// attached last.
pub fn update_properties<A: Applier + ?Sized>(
    applier: &mut A,
    node: NodeId,
    prev: &Props,
    next: &Props,
) -> Result<(), NodeError> {
    for (key, value) in prev.attrs() {
        let Some((event, handler)) = event_name(key, value) else {
            continue;
        };
        if next.get(key) != Some(value) {
            applier.remove_event_handler(node, &event, handler)?;
        }
    }

    for (key, value) in prev.attrs() {
        if is_attribute(key, value) && next.get(key).map_or(true, |next| !is_attribute(key, next)) {
            applier.remove_property(node, key)?;
        }
    }

    for (key, value) in next.attrs() {
        if is_attribute(key, value) && prev.get(key) != Some(value) {
            applier.set_property(node, key, value)?;
        }
    }

    update_style(applier, node, prev.style(), next.style())?;

    for (key, value) in next.attrs() {
        let Some((event, handler)) = event_name(key, value) else {
            continue;
        };
        if prev.get(key) != Some(value) {
            applier.set_event_handler(node, &event, handler)?;
        }
    }
    Ok(())
}

fn update_style<A: Applier + ?Sized>(
    applier: &mut A,
    node: NodeId,
    prev: Option<&StyleMap>,
    next: Option<&StyleMap>,
) -> Result<(), NodeError> {
    if let Some(prev) = prev {
        for key in prev.keys() {
            if next.map_or(true, |next| !next.contains_key(key)) {
                applier.remove_style(node, key)?;
            }
        }
    }
    if let Some(next) = next {
        for (key, value) in next {
            if prev.and_then(|prev| prev.get(key)) != Some(value) {
                applier.set_style(node, key, value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/props_diff_tests.rs"]
mod tests;
