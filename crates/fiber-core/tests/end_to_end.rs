use std::cell::Cell;

use fiber_core::{h, EffectTag, Element, HostOp, Props, RenderContext};
use fiber_macros::component;
use fiber_testing::TestRenderer;
use proptest::prelude::*;

thread_local! {
    static GREETING_CALLS: Cell<usize> = Cell::new(0);
}

#[component]
fn Toggle(_props: &Props, cx: &mut RenderContext<'_>) -> Element {
    let (on, set_on) = cx.use_state(false);
    let tag = if on { "b" } else { "a" };
    h(tag, Props::new().on("onClick", move |_| set_on.set(!on)), ())
}

#[component]
fn Counter(props: &Props, cx: &mut RenderContext<'_>) -> Element {
    let (count, set_count) = cx.use_state(0i64);
    let (clicks, set_clicks) = cx.use_state(0u32);
    let step = match props.get("step") {
        Some(fiber_core::PropValue::Int(step)) => *step,
        _ => 1,
    };
    h(
        "button",
        Props::new().on("onClick", move |_| {
            set_count.update(|current| current.unwrap_or(0) + step);
            set_clicks.update(|current| current.unwrap_or(0) + 1);
        }),
        format!("{count}/{clicks}"),
    )
}

#[component]
fn Greeting(props: &Props, _cx: &mut RenderContext<'_>) -> Element {
    GREETING_CALLS.with(|calls| calls.set(calls.get() + 1));
    let name = props.get_str("name").unwrap_or("stranger");
    h("p", Props::new(), format!("hello {name}"))
}

#[component(fallible)]
fn Strict(props: &Props, _cx: &mut RenderContext<'_>) -> Result<Element, fiber_core::ComponentError> {
    match props.get_str("value") {
        Some(value) => Ok(h("span", Props::new(), value.to_owned())),
        None => Err(fiber_core::ComponentError::Malformed("missing value".into())),
    }
}

#[test]
fn text_change_is_a_single_text_update() {
    let mut renderer = TestRenderer::new();
    renderer.mount(h("div", Props::new(), "A")).expect("mount");
    let div = renderer.find_by_tag("div")[0];

    renderer.mount(h("div", Props::new(), "B")).expect("update");

    let commit = renderer.last_commit().expect("commit");
    assert_eq!(commit.count_labelled(EffectTag::Update, "#text"), 1);
    assert_eq!(commit.count(EffectTag::Place), 0);
    assert_eq!(commit.count(EffectTag::Delete), 0);
    assert_eq!(renderer.find_by_tag("div"), vec![div]);
    assert_eq!(renderer.text(), "B");
}

#[test]
fn toggling_component_swaps_host_element() {
    let mut renderer = TestRenderer::new();
    renderer.mount(h(Toggle(), Props::new(), ())).expect("mount");
    assert_eq!(renderer.html(), "<a></a>");

    assert_eq!(renderer.dispatch_on_tag("a", "click").expect("click"), 1);

    let commit = renderer.last_commit().expect("commit");
    assert_eq!(commit.count(EffectTag::Delete), 1);
    assert_eq!(commit.count_labelled(EffectTag::Delete, "a"), 1);
    assert_eq!(commit.count(EffectTag::Place), 1);
    assert_eq!(commit.count_labelled(EffectTag::Place, "b"), 1);
    assert_eq!(renderer.html(), "<b></b>");

    renderer.dispatch_on_tag("b", "click").expect("click back");
    assert_eq!(renderer.html(), "<a></a>");
}

#[test]
fn state_survives_rerenders_and_keeps_slot_order() {
    let mut renderer = TestRenderer::new();
    let counter = Counter();
    renderer
        .mount(h(&counter, Props::new().with("step", 5), ()))
        .expect("mount");
    assert_eq!(renderer.text(), "0/0");

    renderer.dispatch_on_tag("button", "click").expect("first click");
    renderer.dispatch_on_tag("button", "click").expect("second click");
    assert_eq!(renderer.text(), "10/2");

    // New props from the parent keep the stored state.
    renderer
        .mount(h(&counter, Props::new().with("step", 1), ()))
        .expect("new props");
    assert_eq!(renderer.text(), "10/2");
    renderer.dispatch_on_tag("button", "click").expect("third click");
    assert_eq!(renderer.text(), "11/3");
}

#[test]
fn rendering_the_same_element_again_is_a_no_op() {
    GREETING_CALLS.with(|calls| calls.set(0));
    let mut renderer = TestRenderer::new();
    let element = h(Greeting(), Props::new().with("name", "Ada"), ());

    renderer.mount(element.clone()).expect("mount");
    renderer.applier_mut().take_ops();
    renderer.mount(element).expect("again");

    assert_eq!(GREETING_CALLS.with(Cell::get), 1);
    assert!(renderer.applier().ops().is_empty());
    assert_eq!(renderer.text(), "hello Ada");
}

#[test]
fn queued_renders_commit_in_arrival_order() {
    let mut renderer = TestRenderer::new();
    renderer.render(h("p", Props::new(), "first"));
    renderer.render(h("p", Props::new(), "second"));
    renderer.render(h("p", Props::new(), "third"));

    assert!(renderer.step_with_budget(usize::MAX).expect("step"));
    assert_eq!(renderer.text(), "first");
    assert!(renderer.step_with_budget(usize::MAX).expect("step"));
    assert_eq!(renderer.text(), "second");
    assert!(!renderer.step_with_budget(usize::MAX).expect("step"));
    assert_eq!(renderer.text(), "third");
    assert_eq!(renderer.commits().len(), 3);
}

#[test]
fn state_update_queued_mid_walk_waits_for_the_commit() {
    let mut renderer = TestRenderer::new();
    let toggle = Toggle();
    renderer
        .mount(h("section", Props::new(), h(&toggle, Props::new(), ())))
        .expect("mount");
    renderer.take_commits();

    renderer.render(h(
        "section",
        Props::new().with("class", "x"),
        h(&toggle, Props::new(), ()),
    ));
    assert!(renderer.step_with_budget(1).expect("partial"));
    let a = renderer.find_by_tag("a")[0];
    renderer.applier().dispatch(a, "click").expect("click");
    assert!(renderer.runtime_handle().has_pending_updates());

    renderer.pump_until_idle().expect("finish");
    assert_eq!(renderer.take_commits().len(), 2);
    assert_eq!(renderer.html(), "<section class=\"x\"><b></b></section>");
}

#[test]
fn fallible_component_error_leaves_tree_intact() {
    let mut renderer = TestRenderer::new();
    let strict = Strict();
    renderer
        .mount(h(&strict, Props::new().with("value", "ok"), ()))
        .expect("mount");

    let err = renderer
        .mount(h(&strict, Props::new(), ()))
        .expect_err("missing value");
    assert!(err.to_string().contains("Strict"));
    assert_eq!(renderer.html(), "<span>ok</span>");

    renderer
        .mount(h(&strict, Props::new().with("value", "fine"), ()))
        .expect("recover");
    assert_eq!(renderer.html(), "<span>fine</span>");
}

#[test]
fn every_placement_appends_to_the_host_parent() {
    let mut renderer = TestRenderer::new();
    renderer
        .mount(h("ul", Props::new(), vec![h("li", Props::new(), ())]))
        .expect("mount");
    let ul = renderer.find_by_tag("ul")[0];
    renderer.applier_mut().take_ops();

    renderer
        .mount(h(
            "ul",
            Props::new(),
            vec![h("li", Props::new(), ()), h("li", Props::new(), ())],
        ))
        .expect("grow");
    let inserts: Vec<_> = renderer
        .applier()
        .ops()
        .iter()
        .filter(|op| matches!(op, HostOp::Insert { parent, .. } if *parent == ul))
        .collect();
    assert_eq!(inserts.len(), 1);
    assert_eq!(renderer.find_by_tag("li").len(), 2);
}

fn list(tags: &[&'static str]) -> Element {
    h(
        "ul",
        Props::new(),
        tags.iter()
            .map(|tag| h(*tag, Props::new(), *tag))
            .collect::<Vec<_>>(),
    )
}

fn child_tags(renderer: &TestRenderer) -> Vec<String> {
    let ul = renderer.find_by_tag("ul")[0];
    let mut tags: Vec<String> = renderer
        .applier()
        .children(ul)
        .iter()
        .filter_map(|&id| renderer.applier().node(id)?.tag().map(str::to_owned))
        .collect();
    tags.sort();
    tags
}

proptest! {
    #[test]
    fn host_children_follow_the_latest_render(
        first in prop::collection::vec(prop::sample::select(vec!["li", "em", "hr"]), 0..6),
        second in prop::collection::vec(prop::sample::select(vec!["li", "em", "hr"]), 0..6),
    ) {
        let mut renderer = TestRenderer::new();
        renderer.mount(list(&first)).expect("first");
        let before = renderer.applier().len();
        renderer.mount(list(&second)).expect("second");

        let mut expected: Vec<String> = second.iter().map(|tag| tag.to_string()).collect();
        expected.sort();
        prop_assert_eq!(child_tags(&renderer), expected);

        // Every element child owns one text node; both plus the ul and the container.
        prop_assert_eq!(renderer.applier().len(), 2 + 2 * second.len());
        prop_assert_eq!(before, 2 + 2 * first.len());

        let commit = renderer.last_commit().expect("commit");
        let changed = first
            .iter()
            .zip(&second)
            .filter(|(old, new)| old != new)
            .count();
        let deletes = changed + first.len().saturating_sub(second.len());
        let places = changed + second.len().saturating_sub(first.len());
        prop_assert_eq!(commit.count(EffectTag::Delete), deletes);
        // Placed elements bring a placed text child each.
        prop_assert_eq!(commit.count(EffectTag::Place), 2 * places);
    }
}
