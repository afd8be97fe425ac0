//! Behavior of the intersecting, enumerating, and key normalizers.
//!
//! The interesting cases are always the ones where the same type shows up
//! alone at one call site and in company at another: without global
//! equivalence classes the two sites would produce two different compounds.

use conflux_core::{
    unify_one, CompoundSort, NormalizerKind, SourceTypeId, UnifyConfig, EXPANSION_PROPERTY,
};
use conflux_test_fixtures::{FirstWins, Universe};
use pretty_assertions::assert_eq;

#[test]
fn intersecting_expands_solo_call_sites_to_their_class() {
    let mut universe = Universe::new();
    let str_one = universe.scalar("Str1");
    let str_two = universe.scalar("Str2");
    let first = universe.branch("First");
    universe
        .define(first)
        .property("p", str_one)
        .property("q", str_one);
    let second = universe.branch("Second");
    universe.define(second).property("p", str_two);

    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger)
        .with_normalizers(vec![NormalizerKind::Intersecting]);
    let result = unify_one(&config, &[first, second]).unwrap();

    let root = result.compound(result.root());
    let properties = root.properties().unwrap();
    // `q` only ever sees Str1, but Str1 co-occurred with Str2 under `p`;
    // both sites must resolve to the identical node.
    assert_eq!(
        properties["p"].description,
        properties["q"].description
    );
    let value = result.compound(properties["p"].description);
    assert_eq!(value.singulars().len(), 2);
}

#[test]
fn without_intersecting_the_call_sites_stay_apart() {
    let mut universe = Universe::new();
    let str_one = universe.scalar("Str1");
    let str_two = universe.scalar("Str2");
    let first = universe.branch("First");
    universe
        .define(first)
        .property("p", str_one)
        .property("q", str_one);
    let second = universe.branch("Second");
    universe.define(second).property("p", str_two);

    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger);
    let result = unify_one(&config, &[first, second]).unwrap();

    let properties = result.compound(result.root()).properties().unwrap().clone();
    assert_ne!(properties["p"].description, properties["q"].description);
}

#[test]
fn intersecting_keeps_leaf_lists_free_of_branches() {
    let mut universe = Universe::new();
    let plain = universe.scalar("Plain");
    let detail = universe.scalar("Detail");
    let rich = universe.branch("Rich");
    universe.define(rich).property("detail", detail);
    let first = universe.branch("First");
    universe
        .define(first)
        .property("p", plain)
        .property("q", plain);
    let second = universe.branch("Second");
    universe.define(second).property("p", rich);

    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger)
        .with_normalizers(vec![NormalizerKind::Intersecting]);
    let result = unify_one(&config, &[first, second]).unwrap();

    let root = result.compound(result.root());
    let properties = root.properties().unwrap();

    // `p` saw both the scalar and the branch: a branch compound with the
    // scalar tucked into the expansion slot.
    let p_value = result.compound(properties["p"].description);
    assert_eq!(p_value.sort(), CompoundSort::Branch);
    assert!(p_value
        .properties()
        .unwrap()
        .contains_key(EXPANSION_PROPERTY));

    // `q` saw only the scalar. Its class would drag the branch in, but a
    // list of leaves merges with leaves only.
    let q_value = result.compound(properties["q"].description);
    assert_eq!(q_value.sort(), CompoundSort::TypedLeaf);
    assert_eq!(q_value.singulars().len(), 1);
}

#[test]
fn enumerating_unifies_comparable_enums_across_call_sites() {
    let mut universe = Universe::new();
    let color = universe.enumeration("Color", &["RED", "GREEN"]);
    let hue = universe.enumeration("Hue", &["RED", "GREEN", "BLUE"]);
    let foo = universe.branch("Foo");
    universe
        .define(foo)
        .property("color", color)
        .property("shade", hue);

    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger)
        .with_normalizers(vec![NormalizerKind::Enumerating]);
    let result = unify_one(&config, &[foo]).unwrap();

    let properties = result.compound(result.root()).properties().unwrap().clone();
    assert_eq!(
        properties["color"].description,
        properties["shade"].description
    );

    let merged = result.compound(properties["color"].description);
    assert_eq!(merged.sort(), CompoundSort::EnumeratedLeaf);
    let constants = merged.constants().unwrap();
    let names: Vec<&str> = constants.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["RED", "GREEN", "BLUE"]);
    assert_eq!(constants["BLUE"].len(), 1);
    assert_eq!(constants["BLUE"][0].source, hue);
}

#[test]
fn enumerating_ignores_incomparable_constant_sets() {
    let mut universe = Universe::new();
    let yes_no = universe.enumeration("YesNo", &["YES", "NO"]);
    let color = universe.enumeration("Color", &["RED", "GREEN"]);
    let foo = universe.branch("Foo");
    universe
        .define(foo)
        .property("answer", yes_no)
        .property("shade", color);

    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger)
        .with_normalizers(vec![NormalizerKind::Enumerating]);
    let result = unify_one(&config, &[foo]).unwrap();

    let properties = result.compound(result.root()).properties().unwrap().clone();
    assert_ne!(
        properties["answer"].description,
        properties["shade"].description
    );
}

#[test]
fn identical_constant_sets_collapse_to_one_node() {
    let mut universe = Universe::new();
    let color_a = universe.enumeration("ColorA", &["RED", "GREEN"]);
    let color_b = universe.enumeration("ColorB", &["RED", "GREEN"]);
    let foo = universe.branch("Foo");
    universe
        .define(foo)
        .property("fill", color_a)
        .property("stroke", color_b);

    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger)
        .with_normalizers(vec![NormalizerKind::Enumerating]);
    let result = unify_one(&config, &[foo]).unwrap();

    let properties = result.compound(result.root()).properties().unwrap().clone();
    assert_eq!(
        properties["fill"].description,
        properties["stroke"].description
    );
    let merged = result.compound(properties["fill"].description);
    assert_eq!(merged.constants().unwrap()["RED"].len(), 2);
}

#[test]
fn key_normalizer_groups_by_resolved_key() {
    let mut universe = Universe::new();
    let int = universe.primitive("int");
    let point_v1 = universe.branch("PointV1");
    universe
        .define(point_v1)
        .property("x", int)
        .property("y", int);
    let point_v2 = universe.branch("PointV2");
    universe
        .define(point_v2)
        .property("x", int)
        .property("y", int)
        .property("z", int);
    let first = universe.branch("First");
    universe.define(first).property("location", point_v1);
    let second = universe.branch("Second");
    universe.define(second).property("position", point_v2);

    let resolver = move |ty: SourceTypeId| {
        (ty == point_v1 || ty == point_v2).then(|| "Point".to_string())
    };
    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger)
        .with_normalizers(vec![NormalizerKind::Key(Box::new(resolver))]);
    let result = unify_one(&config, &[first, second]).unwrap();

    let properties = result.compound(result.root()).properties().unwrap().clone();
    assert_eq!(
        properties["location"].description,
        properties["position"].description
    );

    let point = result.compound(properties["location"].description);
    assert_eq!(point.singulars().len(), 2);
    let point_properties = point.properties().unwrap();
    assert_eq!(
        point_properties["x"].cardinality,
        conflux_core::Cardinality::Single
    );
    // Only one version carries `z`; the other may omit it.
    assert_eq!(
        point_properties["z"].cardinality,
        conflux_core::Cardinality::Optional
    );
}

#[test]
fn the_empty_chain_is_the_identity() {
    let mut universe = Universe::new();
    let string = universe.scalar("String");
    let foo = universe.branch("Foo");
    universe.define(foo).property("name", string);

    let merger = FirstWins;
    let config = UnifyConfig::new(&universe, &merger).with_normalizers(Vec::new());
    let result = unify_one(&config, &[foo, foo]).unwrap();

    // Contributor identity still deduplicates.
    assert_eq!(result.compound(result.root()).singulars().len(), 1);
}
