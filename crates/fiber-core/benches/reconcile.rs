use fiber_core::{h, ComponentRef, Element, MemoryApplier, NodeId, Props, Reconciler, RenderContext};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const ROW_SAMPLES: &[usize] = &[16, 64, 256];

fn row() -> ComponentRef {
    ComponentRef::new("Row", |props: &Props, _: &mut RenderContext<'_>| {
        let label = props.get_str("label").unwrap_or_default().to_owned();
        h(
            "li",
            Props::new().with("class", "row"),
            vec![h("span", Props::new(), label), h("em", Props::new(), "detail")],
        )
    })
}

fn list_content(row: &ComponentRef, rows: usize, generation: usize) -> Element {
    let items: Vec<Element> = (0..rows)
        .map(|index| h(row, Props::new().with("label", format!("Item {index}-{generation}")), ()))
        .collect();
    h("ul", Props::new(), items)
}

struct ListFixture {
    reconciler: Reconciler<MemoryApplier>,
    container: NodeId,
    row: ComponentRef,
    rows: usize,
    generation: usize,
}

impl ListFixture {
    fn new(rows: usize) -> Self {
        let mut applier = MemoryApplier::new();
        let container = applier.create_container();
        Self {
            reconciler: Reconciler::new(applier),
            container,
            row: row(),
            rows,
            generation: 0,
        }
    }

    fn render(&mut self) {
        self.generation += 1;
        let content = list_content(&self.row, self.rows, self.generation);
        self.reconciler.render(content, self.container);
        self.reconciler.flush().expect("flush");
        self.reconciler.applier_mut().take_ops();
    }
}

fn bench_mount(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_mount");
    for &rows in ROW_SAMPLES {
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            b.iter(|| {
                let mut fixture = ListFixture::new(rows);
                fixture.render();
                black_box(fixture.reconciler.applier().len());
            });
        });
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_update");
    for &rows in ROW_SAMPLES {
        group.bench_with_input(BenchmarkId::new("rows", rows), &rows, |b, &rows| {
            let mut fixture = ListFixture::new(rows);
            // Mount once so every iteration measures a steady-state update.
            fixture.render();

            b.iter(|| {
                fixture.render();
            });
        });
    }
    group.finish();
}

fn bench_bail_out(c: &mut Criterion) {
    let mut fixture = ListFixture::new(64);
    let content = list_content(&fixture.row, fixture.rows, 0);
    fixture.reconciler.render(content.clone(), fixture.container);
    fixture.reconciler.flush().expect("mount");

    c.bench_function("reconcile_bail_out", |b| {
        b.iter(|| {
            fixture.reconciler.render(content.clone(), fixture.container);
            let commits = fixture.reconciler.flush().expect("flush");
            black_box(commits);
        });
    });
}

criterion_group!(reconcile, bench_mount, bench_update, bench_bail_out);
criterion_main!(reconcile);
