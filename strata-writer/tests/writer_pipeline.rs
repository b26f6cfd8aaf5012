//! Writer pools end to end against recording doubles.

use std::sync::Arc;
use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};

use geo::{Coord, Rect};
use strata_core::test_support::{RecordingDiagnostics, RecordingSink};
use strata_core::{
    AreaLimiter, ClipError, Clipper, DiagnosticEvent, ExpiredTiles, GeoBuilderFactory, Geometry, GeometryBuilder,
    GeometryFactory, MappingConfig, Matchers, Member, Node, Relation, Way,
};
use strata_writer::{ProcessElement, WriterContext, WriterError, WriterPool};

const MAPPING: &str = r#"{"tables":[
    {"name":"shop","geometry":"point","mapping":{"shop":["__any__"]}},
    {"name":"amenity","geometry":"point","mapping":{"amenity":["cafe"]}},
    {"name":"roads","geometry":"linestring","mapping":{"highway":["__any__"]}},
    {"name":"buildings","geometry":"polygon","mapping":{"building":["__any__"]}},
    {"name":"landuse","geometry":"polygon","mapping":{"landuse":["__any__"]}}
]}"#;

struct Harness {
    matchers: Matchers,
    sink: Arc<RecordingSink>,
    diagnostics: Arc<RecordingDiagnostics>,
    context: WriterContext,
}

fn harness() -> Harness {
    let matchers = MappingConfig::from_json(MAPPING)
        .and_then(|config| config.matchers())
        .expect("valid mapping");
    let sink = Arc::new(RecordingSink::new());
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let context = WriterContext::new(sink.clone(), diagnostics.clone());
    Harness {
        matchers,
        sink,
        diagnostics,
        context,
    }
}

fn hydrated_way(id: i64, coords: &[(f64, f64)]) -> Way {
    let refs = (1..=coords.len()).map(|n| n as i64).collect();
    let mut way = Way::new(id, refs);
    way.coords = coords.iter().map(|&(x, y)| Coord { x, y }).collect();
    way
}

fn closed_square(id: i64) -> Way {
    let mut way = hydrated_way(
        id,
        &[(13.40, 52.50), (13.41, 52.50), (13.41, 52.51), (13.40, 52.51), (13.40, 52.50)],
    );
    way.refs = vec![1, 2, 3, 4, 1];
    way
}

async fn write_nodes(harness: &Harness, nodes: Vec<Node>) {
    let pool = WriterPool::nodes(
        Arc::clone(&harness.matchers.points),
        harness.context.clone(),
        4,
    );
    for node in nodes {
        pool.send(node).await.expect("queue open");
    }
    pool.finish().await.expect("workers finish");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn matching_node_inserts_one_point_row() {
    let harness = harness();
    let node = Node::new(7, Coord { x: 13.4, y: 52.5 }).with_tags([("shop", "bakery")]);
    write_nodes(&harness, vec![node]).await;

    let rows = harness.sink.inserts();
    assert_eq!(rows.len(), 1);
    let (table, id, geometry) = rows.first().expect("one row");
    assert_eq!((table.as_str(), *id), ("shop", 7));
    assert!(matches!(geometry, Geometry::Point(p) if p.x() > 1_000_000.0), "projected");
    assert_eq!(harness.context.progress().snapshot().nodes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unmatched_and_untagged_nodes_never_insert() {
    let harness = harness();
    let nodes = vec![
        Node::new(1, Coord { x: 0.0, y: 0.0 }).with_tags([("amenity", "bench")]),
        Node::new(2, Coord { x: 0.0, y: 0.0 }),
        Node::new(3, Coord { x: 0.0, y: 0.0 }).with_tags(Vec::<(String, String)>::new()),
    ];
    write_nodes(&harness, nodes).await;

    assert!(harness.sink.inserts().is_empty());
    assert_eq!(harness.context.progress().snapshot().nodes, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_matched_table_gets_a_row() {
    let harness = harness();
    let node = Node::new(5, Coord { x: 1.0, y: 1.0 })
        .with_tags([("shop", "coffee"), ("amenity", "cafe")]);
    write_nodes(&harness, vec![node]).await;

    assert_eq!(
        harness.sink.inserted_keys(),
        vec![("amenity".to_owned(), 5), ("shop".to_owned(), 5)]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_nodes_are_all_processed() {
    let harness = harness();
    let nodes = (0..500)
        .map(|id| Node::new(id, Coord { x: 0.01 * id as f64, y: 10.0 }).with_tags([("shop", "kiosk")]))
        .collect();
    write_nodes(&harness, nodes).await;

    assert_eq!(harness.sink.inserts().len(), 500);
    assert_eq!(harness.context.progress().snapshot().nodes, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clipping_outside_coverage_inserts_nothing() {
    let mut harness = harness();
    let limiter = AreaLimiter::from_wgs84_bbox(Rect::new(
        Coord { x: 0.0, y: 0.0 },
        Coord { x: 1.0, y: 1.0 },
    ));
    harness.context = harness.context.clone().with_limiter(Arc::new(limiter));
    let inside = Node::new(1, Coord { x: 0.5, y: 0.5 }).with_tags([("shop", "bakery")]);
    let outside = Node::new(2, Coord { x: 5.0, y: 5.0 }).with_tags([("shop", "bakery")]);
    write_nodes(&harness, vec![inside, outside]).await;

    assert_eq!(harness.sink.inserted_keys(), vec![("shop".to_owned(), 1)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tiles_expire_before_geometry_is_built() {
    let mut harness = harness();
    let tiles = Arc::new(ExpiredTiles::new(10));
    harness.context = harness.context.clone().with_expired_tiles(Arc::clone(&tiles));
    let pool = WriterPool::ways(&harness.matchers, harness.context.clone(), 2);
    let mut broken = hydrated_way(9, &[(13.4, 52.5)]);
    broken.tags = Some([("highway".to_owned(), "service".to_owned())].into());
    pool.send(broken).await.expect("queue open");
    pool.finish().await.expect("workers finish");

    assert!(harness.sink.inserts().is_empty());
    assert!(harness.diagnostics.is_empty(), "severity 0 is silent");
    assert!(!tiles.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn closed_ways_write_lines_and_areas() {
    let harness = harness();
    let pool = WriterPool::ways(&harness.matchers, harness.context.clone(), 2);
    let square = closed_square(11).with_tags([("building", "yes"), ("highway", "footway")]);
    let mut open = hydrated_way(12, &[(13.40, 52.50), (13.41, 52.50)]);
    open.tags = Some([("building".to_owned(), "yes".to_owned())].into());
    pool.send(square).await.expect("queue open");
    pool.send(open).await.expect("queue open");
    pool.finish().await.expect("workers finish");

    let rows = harness.sink.inserts();
    assert_eq!(rows.len(), 2);
    assert!(matches!(rows.first(), Some((t, 11, Geometry::Polygon(_))) if t == "buildings"));
    assert!(matches!(rows.get(1), Some((t, 11, Geometry::LineString(_))) if t == "roads"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn relations_materialise_members_and_suppress_ways() {
    let harness = harness();
    let mut outer = closed_square(10);
    outer.tags = None;
    let mut member = Member::way(10, "outer");
    member.way = Some(outer.clone());
    let relation = Relation::new(100, vec![member]).with_tags([("landuse", "forest")]);

    let relations = WriterPool::relations(
        Arc::clone(&harness.matchers.polygons),
        harness.context.clone(),
        2,
    );
    relations.send(relation).await.expect("queue open");
    relations.finish().await.expect("workers finish");
    assert!(harness.context.materialized().contains(10));

    let ways = WriterPool::ways(&harness.matchers, harness.context.clone(), 2);
    ways.send(outer.with_tags([("landuse", "forest")])).await.expect("queue open");
    ways.finish().await.expect("workers finish");

    assert_eq!(harness.sink.inserted_keys(), vec![("landuse".to_owned(), 100)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broken_relations_are_reported() {
    let harness = harness();
    let relation = Relation::new(100, vec![Member::way(10, "outer")])
        .with_tags([("landuse", "forest")]);
    let pool = WriterPool::relations(
        Arc::clone(&harness.matchers.polygons),
        harness.context.clone(),
        1,
    );
    pool.send(relation).await.expect("queue open");
    pool.finish().await.expect("workers finish");

    assert!(harness.sink.inserts().is_empty());
    assert!(matches!(
        harness.diagnostics.events().as_slice(),
        [DiagnosticEvent::GeometryFailed { id: 100, .. }]
    ));
}

/// Rejects every point west of the prime meridian.
struct WesternPointsUnsupported;

impl Clipper for WesternPointsUnsupported {
    fn clip(&self, geometry: &Geometry) -> Result<Vec<Geometry>, ClipError> {
        match geometry {
            Geometry::Point(point) if point.x() < 0.0 => {
                Err(ClipError::Unsupported { geometry: "Point" })
            }
            other => Ok(vec![other.clone()]),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clip_failures_are_reported_and_the_pool_continues() {
    let mut harness = harness();
    harness.context = harness
        .context
        .clone()
        .with_limiter(Arc::new(WesternPointsUnsupported));
    let west = Node::new(1, Coord { x: -10.0, y: 50.0 }).with_tags([("shop", "bakery")]);
    let east = Node::new(2, Coord { x: 10.0, y: 50.0 }).with_tags([("shop", "bakery")]);
    let pool = WriterPool::nodes(
        Arc::clone(&harness.matchers.points),
        harness.context.clone(),
        1,
    );
    pool.send(west).await.expect("queue open");
    pool.send(east).await.expect("queue open");
    pool.finish().await.expect("workers finish");

    assert_eq!(harness.sink.inserted_keys(), vec![("shop".to_owned(), 2)]);
    assert!(matches!(
        harness.diagnostics.events().as_slice(),
        [DiagnosticEvent::ClipFailed { id: 1, error: ClipError::Unsupported { .. }, .. }]
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_inserts_are_reported_per_table() {
    let harness = harness();
    let sink = Arc::new(RecordingSink::new().failing_on("amenity"));
    let context = WriterContext::new(sink.clone(), harness.diagnostics.clone());
    let pool = WriterPool::nodes(Arc::clone(&harness.matchers.points), context, 2);
    let node = Node::new(5, Coord { x: 1.0, y: 1.0 })
        .with_tags([("shop", "coffee"), ("amenity", "cafe")]);
    pool.send(node).await.expect("queue open");
    pool.finish().await.expect("workers finish");

    assert_eq!(sink.inserted_keys(), vec![("shop".to_owned(), 5)]);
    assert!(matches!(
        harness.diagnostics.events().as_slice(),
        [DiagnosticEvent::SinkFailed { table, id: 5, .. }] if table == "amenity"
    ));
}

/// Waits until every worker holds an element at once.
struct Rendezvous(Barrier);

impl ProcessElement for Rendezvous {
    type Element = i64;

    fn process(&self, _builder: &mut dyn GeometryBuilder, _element: i64) {
        self.0.wait();
    }
}

#[tokio::test(flavor = "current_thread")]
async fn blocking_workers_do_not_stall_the_runtime() {
    let factory: Arc<dyn GeometryFactory> = Arc::new(GeoBuilderFactory);
    let pool = WriterPool::spawn(Rendezvous(Barrier::new(3)), &factory, 3, 4);
    for element in 0..3 {
        pool.send(element).await.expect("queue open");
    }
    pool.finish().await.expect("workers finish");
}

#[derive(Default)]
struct CountingFactory {
    created: AtomicUsize,
}

impl GeometryFactory for CountingFactory {
    fn new_builder(&self) -> Box<dyn GeometryBuilder> {
        self.created.fetch_add(1, Ordering::SeqCst);
        GeoBuilderFactory.new_builder()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_worker_owns_one_builder() {
    let harness = harness();
    let factory = Arc::new(CountingFactory::default());
    let context = harness.context.clone().with_factory(factory.clone());
    let pool = WriterPool::nodes(Arc::clone(&harness.matchers.points), context, 3);
    for id in 0..50 {
        let node = Node::new(id, Coord { x: 0.0, y: 0.0 }).with_tags([("shop", "kiosk")]);
        pool.send(node).await.expect("queue open");
    }
    pool.finish().await.expect("workers finish");

    assert_eq!(factory.created.load(Ordering::SeqCst), 3);
}

struct Explodes;

impl ProcessElement for Explodes {
    type Element = i64;

    fn process(&self, _builder: &mut dyn GeometryBuilder, element: i64) {
        assert!(element != 13, "unlucky element");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_worker_surfaces_at_join() {
    let factory: Arc<dyn GeometryFactory> = Arc::new(GeoBuilderFactory);
    let pool = WriterPool::spawn(Explodes, &factory, 1, 4);
    pool.send(13).await.expect("queue open");
    let result = pool.finish().await;

    assert!(matches!(result, Err(WriterError::WorkerFailed(_))));
}
