//! Behavioural tests for tag classification using rstest-bdd.

use std::cell::RefCell;

use osmpoi_core::{Classification, ElementKind, PoiLevel, Tags, classify, name_from_tags};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Debug)]
struct ClassifierWorld {
    kind: RefCell<ElementKind>,
    tags: RefCell<Tags>,
    outcome: RefCell<Option<Classification>>,
}

impl ClassifierWorld {
    fn outcome(&self) -> Classification {
        self.outcome
            .borrow()
            .clone()
            .expect("the element should be classified first")
    }
}

#[fixture]
fn world() -> ClassifierWorld {
    ClassifierWorld {
        kind: RefCell::new(ElementKind::Node),
        tags: RefCell::new(Tags::new()),
        outcome: RefCell::new(None),
    }
}

#[given("a {kind} with tag {key} set to {value}")]
fn given_element(world: &ClassifierWorld, kind: String, key: String, value: String) {
    let kind = kind.parse().expect("known element kind");
    world.kind.replace(kind);
    world.tags.borrow_mut().insert(key, value);
}

#[given("the element also has tag {key} set to {value}")]
fn given_extra_tag(world: &ClassifierWorld, key: String, value: String) {
    world.tags.borrow_mut().insert(key, value);
}

#[given("the element is named {name}")]
fn given_name(world: &ClassifierWorld, name: String) {
    world.tags.borrow_mut().insert("name".into(), name);
}

#[when("the element is classified")]
fn when_classified(world: &ClassifierWorld) {
    let outcome = classify(&world.tags.borrow(), *world.kind.borrow());
    world.outcome.replace(Some(outcome));
}

#[then("the level is {level}")]
fn then_level(world: &ClassifierWorld, level: String) {
    let expected = match level.as_str() {
        "none" => PoiLevel::None,
        "ordinary" => PoiLevel::Ordinary,
        "notable" => PoiLevel::Notable,
        "admin" => PoiLevel::Admin,
        other => panic!("unknown level {other}"),
    };
    assert_eq!(world.outcome().level, expected);
}

#[then("the element is retained")]
fn then_retained(world: &ClassifierWorld) {
    let tags = world.tags.borrow();
    assert!(world.outcome().retains(name_from_tags(&tags)));
}

#[then("the element is not retained")]
fn then_not_retained(world: &ClassifierWorld) {
    let tags = world.tags.borrow();
    assert!(!world.outcome().retains(name_from_tags(&tags)));
}

#[then("the retained tags are {keys}")]
fn then_retained_keys(world: &ClassifierWorld, keys: String) {
    let outcome = world.outcome();
    let actual: Vec<&str> = outcome.tags.keys().map(String::as_str).collect();
    let expected: Vec<&str> = keys.split(',').map(str::trim).collect();
    assert_eq!(actual, expected);
}

#[scenario(path = "tests/features/classifier.feature", index = 0)]
fn museum_way(world: ClassifierWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/classifier.feature", index = 1)]
fn fountain_node(world: ClassifierWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/classifier.feature", index = 2)]
fn restaurant(world: ClassifierWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/classifier.feature", index = 3)]
fn ordinary_artwork(world: ClassifierWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/classifier.feature", index = 4)]
fn notable_statue(world: ClassifierWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/classifier.feature", index = 5)]
fn unnamed_museum(world: ClassifierWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/classifier.feature", index = 6)]
fn names_stripped(world: ClassifierWorld) {
    let _ = world;
}
