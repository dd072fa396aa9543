use super::*;
use crate::applier::MemoryApplier;
use crate::element::{h, ComponentRef};
use crate::error::ComponentError;
use crate::hooks::StateSetter;
use crate::platform::UnitBudget;
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};

fn setup() -> (Reconciler<MemoryApplier>, NodeId) {
    let mut applier = MemoryApplier::new();
    let container = applier.create_container();
    (Reconciler::new(applier), container)
}

fn div(children: impl crate::IntoChildren) -> Element {
    h("div", Props::new(), children)
}

#[test]
fn first_render_places_host_nodes() {
    let (mut reconciler, container) = setup();
    reconciler.render(div(vec![h("span", Props::new(), "a"), h("b", Props::new(), ())]), container);

    let commits = reconciler.flush().expect("flush");
    assert_eq!(commits.len(), 1);
    let report = &commits[0];
    assert_eq!(report.container, container);
    assert_eq!(report.count(EffectTag::Place), 4);
    assert_eq!(report.count(EffectTag::Delete), 0);
    assert_eq!(
        reconciler.applier().to_markup(container),
        "<div><span>a</span><b></b></div>"
    );
    assert!(reconciler.is_idle());
    assert!(!reconciler.runtime().needs_work());
}

#[test]
fn text_change_updates_in_place() {
    let (mut reconciler, container) = setup();
    reconciler.render(div("A"), container);
    reconciler.flush().expect("first");
    let div_node = reconciler.applier().children(container)[0];
    let text_node = reconciler.applier().children(div_node)[0];

    reconciler.render(div("B"), container);
    let commits = reconciler.flush().expect("second");

    let report = &commits[0];
    assert_eq!(report.count(EffectTag::Place), 0);
    assert_eq!(report.count(EffectTag::Delete), 0);
    assert_eq!(report.count_labelled(EffectTag::Update, "#text"), 1);
    assert_eq!(reconciler.applier().children(container), &[div_node]);
    assert_eq!(reconciler.applier().children(div_node), &[text_node]);
    assert_eq!(reconciler.applier().text_content(container), "B");
}

#[test]
fn walk_suspends_when_the_budget_runs_out() {
    let (mut reconciler, container) = setup();
    reconciler.render(
        div(vec![h("span", Props::new(), ()), h("span", Props::new(), ())]),
        container,
    );

    for _ in 0..3 {
        let outcome = reconciler.step(&UnitBudget::new(1)).expect("step");
        assert!(outcome.more_work);
        assert!(outcome.commit.is_none());
        assert!(reconciler.applier().children(container).is_empty());
        assert!(reconciler.work_in_progress().is_some());
    }
    let outcome = reconciler.step(&UnitBudget::new(1)).expect("final step");
    assert!(!outcome.more_work);
    assert_eq!(outcome.commit.map(|report| report.count(EffectTag::Place)), Some(3));
    assert_eq!(reconciler.applier().find_by_tag(container, "span").len(), 2);
}

#[test]
fn exhausted_budget_performs_no_work() {
    let (mut reconciler, container) = setup();
    reconciler.render(div(()), container);
    let outcome = reconciler.step(&UnitBudget::new(0)).expect("step");
    assert!(outcome.more_work);
    assert_eq!(reconciler.applier().len(), 1);
}

#[test]
fn unchanged_component_is_not_evaluated_again() {
    let (mut reconciler, container) = setup();
    let app_calls = Rc::new(Cell::new(0));
    let counter_calls = Rc::new(Cell::new(0));
    let setter: Rc<RefCell<Option<StateSetter<i32>>>> = Rc::default();

    let counter = {
        let calls = Rc::clone(&counter_calls);
        let setter = Rc::clone(&setter);
        ComponentRef::new("Counter", move |_: &Props, cx: &mut RenderContext<'_>| {
            calls.set(calls.get() + 1);
            let (count, set_count) = cx.use_state(0);
            *setter.borrow_mut() = Some(set_count);
            h("span", Props::new(), count.to_string())
        })
    };
    let app = {
        let calls = Rc::clone(&app_calls);
        ComponentRef::new("App", move |_: &Props, _: &mut RenderContext<'_>| {
            calls.set(calls.get() + 1);
            h(&counter, Props::new(), ())
        })
    };

    reconciler.render(h(&app, Props::new(), ()), container);
    reconciler.flush().expect("mount");
    assert_eq!((app_calls.get(), counter_calls.get()), (1, 1));

    setter.borrow().as_ref().expect("setter").set(4);
    let commits = reconciler.flush().expect("state update");

    assert_eq!((app_calls.get(), counter_calls.get()), (1, 2));
    assert_eq!(commits[0].count(EffectTag::Place), 0);
    assert_eq!(reconciler.applier().text_content(container), "4");
}

#[test]
fn failing_component_abandons_the_pass() {
    let (mut reconciler, container) = setup();
    let fail = Rc::new(Cell::new(false));
    let flaky = {
        let fail = Rc::clone(&fail);
        ComponentRef::fallible("Flaky", move |props: &Props, _: &mut RenderContext<'_>| {
            if fail.get() {
                return Err(ComponentError::Failed("boom".into()));
            }
            Ok(h("p", Props::new(), props.get_str("label").unwrap_or_default().to_owned()))
        })
    };
    let page = |label: &str| div(vec![h("i", Props::new(), ()), h(&flaky, Props::new().with("label", label), ())]);

    reconciler.render(page("one"), container);
    reconciler.flush().expect("mount");
    let fibers = reconciler.arena().len();
    let markup = reconciler.applier().to_markup(container);

    fail.set(true);
    reconciler.render(page("two"), container);
    let err = reconciler.flush().expect_err("component failure");
    assert!(matches!(err, ReconcileError::Component { name: "Flaky", .. }));
    assert_eq!(reconciler.arena().len(), fibers);
    assert_eq!(reconciler.applier().to_markup(container), markup);
    assert!(reconciler.work_in_progress().is_none());
    let root = reconciler.current_root(container).expect("root");
    for id in reconciler.arena().descendants(root) {
        assert_eq!(reconciler.arena()[id].effect_tag(), None);
    }

    fail.set(false);
    reconciler.render(page("three"), container);
    reconciler.flush().expect("recover");
    assert_eq!(reconciler.applier().text_content(container), "three");
}

fn broken() -> ComponentRef {
    ComponentRef::fallible("Broken", |_: &Props, _: &mut RenderContext<'_>| {
        Err::<(), _>(ComponentError::Failed("broken".into()))
    })
}

#[test]
fn abandoned_pass_disposes_the_host_nodes_it_created() {
    let (mut reconciler, container) = setup();
    let broken = broken();

    for _ in 0..3 {
        reconciler.render(
            div(vec![h("p", Props::new(), "x"), h(&broken, Props::new(), ())]),
            container,
        );
        reconciler.flush().expect_err("broken component");
        assert_eq!(reconciler.applier().len(), 1);
        assert!(reconciler.applier().to_markup(container).is_empty());
    }
}

#[derive(Default)]
struct CountingScheduler {
    requests: AtomicUsize,
}

impl RuntimeScheduler for CountingScheduler {
    fn schedule_work(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn failed_step_still_requests_work_for_queued_updates() {
    let scheduler = Arc::new(CountingScheduler::default());
    let mut applier = MemoryApplier::new();
    let container = applier.create_container();
    let mut reconciler =
        Reconciler::with_scheduler(applier, Arc::clone(&scheduler) as Arc<dyn RuntimeScheduler>);
    let broken = broken();

    reconciler.render(h(&broken, Props::new(), ()), container);
    reconciler.render(h("p", Props::new(), "ok"), container);
    scheduler.requests.store(0, Ordering::SeqCst);

    assert!(reconciler.step(&Unbounded).is_err());
    assert_eq!(scheduler.requests.load(Ordering::SeqCst), 1);
    assert!(reconciler.runtime().needs_work());
    assert_eq!(reconciler.runtime().pending_updates(), 1);

    let outcome = reconciler.step(&Unbounded).expect("queued update");
    assert!(!outcome.more_work);
    assert!(outcome.commit.is_some());
    assert_eq!(reconciler.applier().to_markup(container), "<p>ok</p>");
    assert!(!reconciler.runtime().needs_work());
}

#[test]
fn failed_last_update_clears_the_work_flag() {
    let (mut reconciler, container) = setup();
    reconciler.render(h(&broken(), Props::new(), ()), container);

    assert!(reconciler.step(&Unbounded).is_err());
    assert!(!reconciler.runtime().needs_work());
    assert!(reconciler.is_idle());
}

#[test]
fn deleting_a_component_removes_all_its_host_nodes() {
    let (mut reconciler, container) = setup();
    let pair = ComponentRef::new("Pair", |_: &Props, _: &mut RenderContext<'_>| {
        vec![h("span", Props::new(), "1"), h("span", Props::new(), "2")]
    });
    let empty = ComponentRef::new("Empty", |_: &Props, _: &mut RenderContext<'_>| ());

    reconciler.render(div(vec![h(&pair, Props::new(), ()), h(&empty, Props::new(), ())]), container);
    reconciler.flush().expect("mount");
    assert_eq!(reconciler.applier().find_by_tag(container, "span").len(), 2);
    let nodes = reconciler.applier().len();

    reconciler.render(div(()), container);
    let commits = reconciler.flush().expect("unmount");

    assert_eq!(commits[0].count(EffectTag::Delete), 2);
    assert!(reconciler.applier().find_by_tag(container, "span").is_empty());
    assert_eq!(reconciler.applier().len(), nodes - 4);
}

#[test]
fn previous_tree_is_released_after_commit() {
    let (mut reconciler, container) = setup();
    reconciler.render(div(vec!["a", "b"]), container);
    reconciler.flush().expect("first");
    let live = reconciler.arena().len();
    assert_eq!(live, 4);

    for label in ["c", "d", "e"] {
        reconciler.render(div(vec![label, "b"]), container);
        reconciler.flush().expect("rerender");
        assert_eq!(reconciler.arena().len(), live);
    }
    let root = reconciler.current_root(container).expect("root");
    assert!(reconciler
        .arena()
        .descendants(root)
        .iter()
        .all(|&id| reconciler.arena()[id].alternate().is_none()));
}

#[test]
fn state_update_for_unmounted_component_is_dropped() {
    let (mut reconciler, container) = setup();
    let setter: Rc<RefCell<Option<StateSetter<&'static str>>>> = Rc::default();
    let item = {
        let setter = Rc::clone(&setter);
        ComponentRef::new("Item", move |_: &Props, cx: &mut RenderContext<'_>| {
            let (value, set_value) = cx.use_state("x");
            *setter.borrow_mut() = Some(set_value);
            value
        })
    };
    reconciler.render(div(h(&item, Props::new(), ())), container);
    reconciler.flush().expect("mount");
    reconciler.render(div(()), container);
    reconciler.flush().expect("unmount");

    setter.borrow().as_ref().expect("setter").set("y");
    let commits = reconciler.flush().expect("stale update");
    assert!(commits.is_empty());
    assert!(reconciler.is_idle());
}

#[test]
fn separate_containers_keep_separate_trees() {
    let (mut reconciler, first) = setup();
    let second = reconciler.applier_mut().create_container();
    reconciler.render(div("one"), first);
    reconciler.render(div("two"), second);
    let commits = reconciler.flush().expect("flush");

    assert_eq!(commits.iter().map(|c| c.container).collect::<Vec<_>>(), [first, second]);
    assert_ne!(reconciler.current_root(first), reconciler.current_root(second));
    assert_eq!(reconciler.applier().text_content(first), "one");
    assert_eq!(reconciler.applier().text_content(second), "two");
}
