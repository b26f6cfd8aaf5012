use geo::Coord;
use rstest::{fixture, rstest};
use strata_core::test_support::{FaultyCache, RecordingDiagnostics, RecordingSink};
use strata_core::{
    ChangeRecord, DependencyCache, DiagnosticEvent, ElementCache, ElementKind, ExpiredTiles,
    MappingConfig, Matchers, MemoryElementCache, Member, Node, Relation, Way,
};

use super::Deleter;

const MAPPING: &str = r#"{"tables":[
    {"name":"shop","geometry":"point","mapping":{"shop":["__any__"]}},
    {"name":"roads","geometry":"linestring","mapping":{"highway":["__any__"]}},
    {"name":"buildings","geometry":"polygon","mapping":{"building":["__any__"]}},
    {"name":"landuse","geometry":"polygon","mapping":{"landuse":["__any__"]}}
]}"#;

struct World {
    cache: MemoryElementCache,
    deps: DependencyCache,
    sink: RecordingSink,
    diagnostics: RecordingDiagnostics,
    matchers: Matchers,
    tiles: ExpiredTiles,
}

impl World {
    fn run(&mut self, record: &ChangeRecord) {
        Deleter::new(
            &self.cache,
            &mut self.deps,
            &self.sink,
            &self.matchers,
            &self.diagnostics,
        )
        .with_expired_tiles(&self.tiles)
        .delete(record);
    }

    fn deleted(&self) -> Vec<(String, i64)> {
        self.sink.deletes()
    }
}

fn node(id: i64, x: f64, y: f64) -> Node {
    Node::new(id, Coord { x, y })
}

/// Nodes 1-4 around Berlin, road way 10 over nodes 1 and 2, closed building
/// way 11 and landuse relation 100 with way 10 as its outer member.
#[fixture]
fn world() -> World {
    let matchers = MappingConfig::from_json(MAPPING)
        .and_then(|config| config.matchers())
        .expect("valid mapping");
    let mut cache = MemoryElementCache::new();
    cache.put_node(node(1, 13.40, 52.50));
    cache.put_node(node(2, 13.41, 52.50));
    cache.put_node(node(3, 13.41, 52.51));
    cache.put_node(node(4, 13.40, 52.51).with_tags([("shop", "bakery")]));
    let road = Way::new(10, vec![1, 2]).with_tags([("highway", "primary")]);
    let building = Way::new(11, vec![1, 2, 3, 1]).with_tags([("building", "yes")]);
    let landuse = Relation::new(100, vec![Member::way(10, "outer")])
        .with_tags([("landuse", "forest")]);

    let mut deps = DependencyCache::default();
    deps.add_from_way(&road);
    deps.add_from_way(&building);
    deps.add_from_relation(&landuse);
    cache.put_way(road);
    cache.put_way(building);
    cache.put_relation(landuse);
    cache.materialized().insert(10);

    World {
        cache,
        deps,
        sink: RecordingSink::new(),
        diagnostics: RecordingDiagnostics::default(),
        matchers,
        tiles: ExpiredTiles::new(14),
    }
}

#[rstest]
#[should_panic(expected = "without the delete flag")]
fn records_without_delete_flag_abort(mut world: World) {
    world.run(&ChangeRecord::create(node(4, 0.0, 0.0).into()));
}

#[rstest]
fn relation_delete_removes_row_edges_and_materialised_members(mut world: World) {
    let relation = Relation::new(100, vec![Member::way(10, "outer")]);
    world.run(&ChangeRecord::delete(relation.into()));

    assert_eq!(world.deleted(), vec![("landuse".to_owned(), 100)]);
    assert!(!world.cache.materialized().contains(10));
    assert!(!world.deps.ways.contains(10, 100));
    assert!(!world.tiles.is_empty(), "member way tiles expire");
}

#[rstest]
fn untagged_node_has_no_effect(mut world: World) {
    world.cache.put_node(node(5, 13.42, 52.52));
    let before = world.deps.clone();
    world.run(&ChangeRecord::delete(node(5, 13.42, 52.52).into()));

    assert!(world.deleted().is_empty());
    assert!(world.tiles.is_empty());
    assert_eq!(world.deps, before);
    assert!(world.diagnostics.is_empty());
}

#[rstest]
fn untagged_way_has_no_effect(mut world: World) {
    world.cache.put_way(Way::new(12, vec![2, 3]));
    world.deps.add_from_way(&Way::new(12, vec![2, 3]));
    let before = world.deps.clone();

    world.run(&ChangeRecord::delete(Way::new(12, vec![2, 3]).into()));

    assert!(world.deleted().is_empty());
    assert_eq!(world.deps, before);
    assert!(world.tiles.is_empty());
}

#[rstest]
fn node_modify_cascades_to_ways_and_relations(mut world: World) {
    world.run(&ChangeRecord::modify(node(1, 13.40, 52.50).into()));

    assert_eq!(
        world.deleted(),
        vec![
            ("roads".to_owned(), 10),
            ("landuse".to_owned(), 100),
            ("buildings".to_owned(), 11),
        ]
    );
    assert!(world.deps.coords.contains(1, 10), "cascaded way keeps its edges");
    assert!(world.deps.coords.contains(2, 10));
    assert!(world.deps.coords.contains(1, 11));
    assert!(world.deps.ways.contains(10, 100), "cascaded relation keeps its edges");
}

#[rstest]
fn pure_node_delete_purges_its_dependency_entry(mut world: World) {
    world.run(&ChangeRecord::delete(node(1, 13.40, 52.50).into()));

    assert!(world.deps.coords.dependents(1).is_empty());
    assert_eq!(world.deps.coords.dependents(2), vec![10, 11]);
}

#[rstest]
fn way_delete_clears_all_matched_tables_and_back_refs(mut world: World) {
    let tagged = Way::new(11, vec![1, 2, 3, 1]).with_tags([("building", "yes"), ("highway", "path")]);
    world.cache.put_way(tagged);
    world.run(&ChangeRecord::delete(Way::new(11, vec![1, 2, 3, 1]).into()));

    assert_eq!(
        world.deleted(),
        vec![("buildings".to_owned(), 11), ("roads".to_owned(), 11)]
    );
    assert_eq!(world.deps.coords.dependents(1), vec![10]);
    assert_eq!(world.deps.coords.dependents(3), Vec::<i64>::new());
    assert!(!world.tiles.is_empty());
}

#[rstest]
#[case(false, vec![("roads".to_owned(), 10)])]
#[case(true, vec![("roads".to_owned(), 10), ("landuse".to_owned(), 100)])]
fn way_modify_reaches_dependent_relations(
    mut world: World,
    #[case] modify: bool,
    #[case] expected: Vec<(String, i64)>,
) {
    let mut record = ChangeRecord::delete(Way::new(10, vec![1, 2]).into());
    record.modify = modify;
    world.run(&record);

    assert_eq!(world.deleted(), expected);
    assert!(!world.deps.coords.contains(1, 10));
    assert!(world.deps.ways.contains(10, 100));
}

#[rstest]
fn missing_elements_are_ignored(mut world: World) {
    world.run(&ChangeRecord::delete(Relation::new(999, Vec::new()).into()));
    world.run(&ChangeRecord::delete(Way::new(999, Vec::new()).into()));

    assert!(world.deleted().is_empty());
    assert!(world.diagnostics.is_empty());
}

#[rstest]
fn lookup_failures_are_reported(world: World) {
    let World {
        cache,
        mut deps,
        sink,
        diagnostics,
        matchers,
        ..
    } = world;
    let cache = FaultyCache::new(cache).breaking(ElementKind::Way, 10);

    Deleter::new(&cache, &mut deps, &sink, &matchers, &diagnostics)
        .delete(&ChangeRecord::delete(Way::new(10, vec![1, 2]).into()));

    assert!(sink.deletes().is_empty());
    assert!(matches!(
        diagnostics.events().as_slice(),
        [DiagnosticEvent::LookupFailed { kind: ElementKind::Way, id: 10, .. }]
    ));
    assert!(deps.coords.contains(1, 10));
}

#[rstest]
fn hydration_failure_skips_tiles_but_keeps_delete(mut world: World) {
    world.cache.remove_node(2);
    world.run(&ChangeRecord::delete(Way::new(10, vec![1, 2]).into()));

    assert_eq!(world.deleted(), vec![("roads".to_owned(), 10)]);
    assert!(world.tiles.is_empty());
    assert!(matches!(
        world.diagnostics.events().as_slice(),
        [DiagnosticEvent::HydrationFailed { id: 10, .. }]
    ));
}

#[rstest]
fn sink_failures_are_reported_and_count_as_deleted(mut world: World) {
    world.sink = RecordingSink::new().failing_on("roads");
    world.run(&ChangeRecord::delete(Way::new(10, vec![1, 2]).into()));

    assert!(!world.deps.coords.contains(1, 10));
    assert!(matches!(
        world.diagnostics.events().as_slice(),
        [DiagnosticEvent::SinkFailed { id: 10, .. }]
    ));
}

#[rstest]
fn tagged_node_expires_its_tile(mut world: World) {
    world.run(&ChangeRecord::delete(node(4, 13.40, 52.51).into()));

    assert_eq!(world.deleted(), vec![("shop".to_owned(), 4)]);
    assert!(!world.tiles.drain().is_empty());
}
