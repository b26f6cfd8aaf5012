//! Behavioural tests for recording and removing dependency edges.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use strata_core::{DependencyCache, Member, Relation, Way};

#[fixture]
fn deps() -> RefCell<DependencyCache> {
    RefCell::new(DependencyCache::default())
}

#[given("an empty dependency cache")]
fn given_empty_cache(#[from(deps)] deps: &RefCell<DependencyCache>) {
    *deps.borrow_mut() = DependencyCache::default();
}

#[when("way 10 with nodes 1, 2 and 3 is cached")]
fn when_way_10_cached(#[from(deps)] deps: &RefCell<DependencyCache>) {
    deps.borrow_mut().add_from_way(&Way::new(10, vec![1, 2, 3]));
}

#[when("way 11 with nodes 3 and 4 is cached")]
fn when_way_11_cached(#[from(deps)] deps: &RefCell<DependencyCache>) {
    deps.borrow_mut().add_from_way(&Way::new(11, vec![3, 4]));
}

#[when("relation 100 with member ways 10 and 11 is cached")]
fn when_relation_cached(#[from(deps)] deps: &RefCell<DependencyCache>) {
    let relation = Relation::new(
        100,
        vec![
            Member::way(10, "outer"),
            Member::node(5, "label"),
            Member::way(11, "inner"),
        ],
    );
    deps.borrow_mut().add_from_relation(&relation);
}

#[when("every edge of node 3 is removed")]
fn when_node_purged(#[from(deps)] deps: &RefCell<DependencyCache>) {
    deps.borrow_mut().coords.remove_all(3);
}

#[then("node 3 is used by ways 10 and 11")]
fn then_node_3_shared(#[from(deps)] deps: &RefCell<DependencyCache>) {
    assert_eq!(deps.borrow().coords.dependents(3), vec![10, 11]);
}

#[then("node 1 is used by way 10 only")]
fn then_node_1_single(#[from(deps)] deps: &RefCell<DependencyCache>) {
    assert_eq!(deps.borrow().coords.dependents(1), vec![10]);
}

#[then("way 11 is used by relation 100")]
fn then_way_in_relation(#[from(deps)] deps: &RefCell<DependencyCache>) {
    let deps = deps.borrow();
    assert_eq!(deps.ways.dependents(11), vec![100]);
    assert!(deps.ways.dependents(5).is_empty(), "node members add no edges");
}

#[then("node 3 is used by no ways")]
fn then_node_3_unused(#[from(deps)] deps: &RefCell<DependencyCache>) {
    assert!(deps.borrow().coords.dependents(3).is_empty());
}

#[scenario(path = "tests/features/dependency_cache.feature", index = 0)]
fn scenario_ways_register_nodes(deps: RefCell<DependencyCache>) {
    let _ = deps;
}

#[scenario(path = "tests/features/dependency_cache.feature", index = 1)]
fn scenario_relations_register_ways(deps: RefCell<DependencyCache>) {
    let _ = deps;
}

#[scenario(path = "tests/features/dependency_cache.feature", index = 2)]
fn scenario_remove_node_edges(deps: RefCell<DependencyCache>) {
    let _ = deps;
}
