use crate::error::AccessError;
use crate::query::*;

fn q() -> QueryBuilder {
    Query::builder()
}

#[test]
fn collections_and_fulltext_example() {
    let b = q().collection_ids(["c1"]).fulltext("foo").build().unwrap();
    let a = q()
        .collection_ids(["c1", "c2"])
        .fulltext("foobar")
        .build()
        .unwrap();

    assert!(is_more_specific_than(&a, &b));
    assert!(!is_more_specific_than(&b, &a));
}

#[test]
fn fulltext_direction() {
    let food = q().fulltext("food").build().unwrap();
    let foo = q().fulltext("foo").build().unwrap();

    assert!(food.is_more_specific_than(&foo));
    assert!(!foo.is_more_specific_than(&food));
}

#[test]
fn fulltext_is_case_sensitive() {
    let upper = q().fulltext("Food").build().unwrap();
    let lower = q().fulltext("foo").build().unwrap();
    assert!(!upper.is_more_specific_than(&lower));
}

#[test]
fn fulltext_required_when_other_has_one() {
    let none = q().collection_ids(["c1"]).build().unwrap();
    let some = q().collection_ids(["c1"]).fulltext("x").build().unwrap();
    assert!(!none.is_more_specific_than(&some));
    assert!(some.is_more_specific_than(&none));
}

#[test]
fn unconstrained_query_is_least_specific() {
    let all = Query::all();
    let narrow = q()
        .collection_ids(["c1"])
        .document_ids(["d1"])
        .link_type_ids(["l1"])
        .filters(["c1:a1:=1"])
        .fulltext("x")
        .build()
        .unwrap();

    assert!(narrow.is_more_specific_than(&all));
    assert!(!all.is_more_specific_than(&narrow));
    assert!(all.is_more_specific_than(&all));
}

#[test]
fn empty_sets_constrain_nothing() {
    let empty = q().collection_ids(Vec::<String>::new()).build().unwrap();
    let all = Query::all();
    assert!(all.is_more_specific_than(&empty));
    assert!(empty.is_more_specific_than(&all));

    let narrow = q().collection_ids(["c1"]).build().unwrap();
    assert!(!empty.is_more_specific_than(&narrow));
}

#[test]
fn each_set_field_uses_superset_rule() {
    let cases: Vec<(Query, Query)> = vec![
        (
            q().document_ids(["d1", "d2"]).build().unwrap(),
            q().document_ids(["d1"]).build().unwrap(),
        ),
        (
            q().link_type_ids(["l1", "l2"]).build().unwrap(),
            q().link_type_ids(["l2"]).build().unwrap(),
        ),
        (
            q().filters(["a=1", "b=2"]).build().unwrap(),
            q().filters(["b=2"]).build().unwrap(),
        ),
    ];

    for (wide_set, narrow_set) in cases {
        assert!(wide_set.is_more_specific_than(&narrow_set));
        assert!(!narrow_set.is_more_specific_than(&wide_set));
    }
}

#[test]
fn filters_compare_by_exact_string() {
    let a = q().filters(["a = 1"]).build().unwrap();
    let b = q().filters(["a=1"]).build().unwrap();
    assert!(!a.is_more_specific_than(&b));
    assert!(!b.is_more_specific_than(&a));
}

#[test]
fn pagination_is_ignored() {
    let paged = q().collection_ids(["c1"]).page(3, 20).build().unwrap();
    let unpaged = q().collection_ids(["c1"]).build().unwrap();
    assert!(paged.is_more_specific_than(&unpaged));
    assert!(unpaged.is_more_specific_than(&paged));
}

#[test]
fn one_failing_field_fails_relation() {
    let a = q()
        .collection_ids(["c1", "c2"])
        .document_ids(["d9"])
        .build()
        .unwrap();
    let b = q()
        .collection_ids(["c1"])
        .document_ids(["d1"])
        .build()
        .unwrap();
    assert!(!a.is_more_specific_than(&b));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn empty_ids_are_malformed() {
    let err = q().collection_ids(["c1", ""]).build().unwrap_err();
    assert!(matches!(err, AccessError::MalformedQuery(_)));
    assert!(q().filters([""]).build().is_err());
    assert!(q().document_ids([""]).build().is_err());
    assert!(q().link_type_ids([""]).build().is_err());
}

#[test]
fn pagination_is_carried_without_checks() {
    let query: Query = serde_json::from_str(r#"{"collectionIds":["c1"],"page":2}"#).unwrap();
    assert_eq!(query.page(), Some(2));
    assert_eq!(query.page_size(), None);

    let zero: Query = serde_json::from_str(r#"{"page":0,"pageSize":0}"#).unwrap();
    assert_eq!(zero.page_size(), Some(0));
    assert!(q().page(0, 0).build().is_ok());
    assert!(q().page_size(0).build().is_ok());

    let unpaged = q().collection_ids(["c1"]).build().unwrap();
    assert!(query.is_more_specific_than(&unpaged));
    assert!(unpaged.is_more_specific_than(&query));
}

#[test]
fn decode_camel_case() {
    let json = r#"{
        "collectionIds":["c1","c2"],
        "documentIds":[],
        "fulltext":"foo",
        "page":1,
        "pageSize":50
    }"#;
    let query: Query = serde_json::from_str(json).unwrap();
    assert_eq!(query.collection_ids().map(|s| s.len()), Some(2));
    assert_eq!(query.document_ids().map(|s| s.len()), Some(0));
    assert!(query.filters().is_none());
    assert_eq!(query.fulltext(), Some("foo"));
    assert_eq!(query.page(), Some(1));
    assert_eq!(query.page_size(), Some(50));
}

#[test]
fn decode_rejects_malformed() {
    let err = serde_json::from_str::<Query>(r#"{"filters":[""]}"#).unwrap_err();
    assert!(err.to_string().contains("filters contains an empty value"));
    assert!(serde_json::from_str::<Query>(r#"{"documentIds":["d1",""]}"#).is_err());
}

#[test]
fn encode_omits_absent_fields() {
    let query = q().collection_ids(["c1"]).build().unwrap();
    let value = serde_json::to_value(&query).unwrap();
    assert_eq!(value, serde_json::json!({"collectionIds": ["c1"]}));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn id_set() -> impl Strategy<Value = Option<Vec<String>>> {
        prop::option::of(prop::collection::vec("[a-c][0-3]", 0..4))
    }

    fn query() -> impl Strategy<Value = Query> {
        (
            id_set(),
            id_set(),
            id_set(),
            id_set(),
            prop::option::of("[a-c]{0,4}"),
            prop::option::of((0..5u32, 1..50u32)),
        )
            .prop_map(|(filters, collections, documents, link_types, fulltext, page)| {
                let mut b = Query::builder();
                if let Some(f) = filters {
                    b = b.filters(f);
                }
                if let Some(c) = collections {
                    b = b.collection_ids(c);
                }
                if let Some(d) = documents {
                    b = b.document_ids(d);
                }
                if let Some(l) = link_types {
                    b = b.link_type_ids(l);
                }
                if let Some(t) = fulltext {
                    b = b.fulltext(t);
                }
                if let Some((page, size)) = page {
                    b = b.page(page, size);
                }
                b.build().unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_reflexive(a in query()) {
            prop_assert!(a.is_more_specific_than(&a));
        }

        #[test]
        fn prop_transitive(a in query(), b in query(), c in query()) {
            if a.is_more_specific_than(&b) && b.is_more_specific_than(&c) {
                prop_assert!(a.is_more_specific_than(&c));
            }
        }

        #[test]
        fn prop_everything_narrows_all(a in query()) {
            prop_assert!(a.is_more_specific_than(&Query::all()));
        }
    }
}
