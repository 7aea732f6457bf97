//! Query builder tests
//!
//! Builder, join and serializer behaviour.

#[cfg(test)]
mod tests {
    use crate::errors::ErrorKind;
    use crate::query_builder::{
        FilterCondition, Literal, MatchOptions, Pagination, Pattern, Query, QueryOperator, SortOrder,
        SubQuery,
    };
    use serde_json::{json, Value};

    // ========================================
    // Literal conditions
    // ========================================

    #[test]
    fn test_equal_to_keeps_falsy_values() {
        let falsy = vec![json!(0), json!(""), json!(false), Value::Null, json!({}), json!([])];

        for value in falsy {
            let query = Query::new().equal_to("field", value.clone());
            assert_eq!(query.filter_value(), json!({ "field": value }));
        }

        let query = Query::new().equal_to("field", f64::NAN);
        assert_eq!(query.filter().condition("field"), Some(&FilterCondition::NotANumber));
        assert_eq!(query.filter_value(), json!({ "field": null }));
    }

    #[test]
    fn test_nan_operands() {
        assert!(Literal::from(f64::NAN).is_nan());
        assert!(Literal::from(f32::NAN).is_nan());
        assert_eq!(Literal::from(2.5).into_value(), json!(2.5));
        assert_eq!(Literal::NotANumber.into_value(), Value::Null);

        let query = Query::new().equal_to("score", 3);
        query.not_equal_to("score", f64::NAN);
        assert_eq!(query.filter_value(), json!({ "score": 3 }));

        let err = query.greater_than("score", f64::NAN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.debug(), "NaN");

        query.equal_to("score", f64::NAN);
        query.less_than("score", 10).unwrap();
        assert_eq!(query.filter_value(), json!({ "score": { "$lt": 10 } }));
    }

    #[test]
    fn test_equal_to_replaces_operator_map() {
        let query = Query::new();
        query.greater_than("age", 10).unwrap();
        query.exists("age");
        query.equal_to("age", 12);

        assert_eq!(query.filter_value(), json!({ "age": 12 }));
    }

    #[test]
    fn test_operator_replaces_literal() {
        let query = Query::new().equal_to("age", 12);
        query.less_than("age", 20).unwrap();

        assert_eq!(query.filter_value(), json!({ "age": { "$lt": 20 } }));
    }

    #[test]
    fn test_operators_merge_on_same_field() {
        let query = Query::new();
        query
            .greater_than_or_equal_to("age", 18)
            .unwrap()
            .less_than_or_equal_to("age", 65)
            .unwrap()
            .not_equal_to("age", 30);

        assert_eq!(
            query.filter_value(),
            json!({ "age": { "$gte": 18, "$lte": 65, "$ne": 30 } })
        );
        assert!(matches!(
            query.filter().condition("age"),
            Some(FilterCondition::Operators(ops)) if ops.len() == 3
        ));
    }

    #[test]
    fn test_repeated_operator_overwrites_operand() {
        let query = Query::new();
        query.greater_than("age", 1).unwrap();
        query.greater_than("age", 5).unwrap();

        assert_eq!(query.filter_value(), json!({ "age": { "$gt": 5 } }));
    }

    // ========================================
    // Operator validation
    // ========================================

    #[test]
    fn test_relational_operators_accept_numbers_and_strings() {
        let query = Query::new();
        assert!(query.greater_than("a", 1).is_ok());
        assert!(query.greater_than("b", 1.5).is_ok());
        assert!(query.less_than("c", "m").is_ok());
    }

    #[test]
    fn test_relational_operators_reject_other_operands() {
        let query = Query::new();
        let rejected = vec![json!({}), json!([1]), json!(true), Value::Null];

        for operand in rejected {
            for result in [
                query.greater_than("f", operand.clone()),
                query.greater_than_or_equal_to("f", operand.clone()),
                query.less_than("f", operand.clone()),
                query.less_than_or_equal_to("f", operand.clone()),
            ] {
                let err = result.unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidArgument);
                assert_eq!(err.kind().as_str(), "invalid-argument");
            }
        }
        assert!(query.filter().is_empty());
    }

    #[test]
    fn test_membership_operands_are_normalized_to_arrays() {
        let query = Query::new()
            .contains("tags", "red")
            .contains_all("sizes", json!(["s", "m"]))
            .not_contained_in("status", 3);

        assert_eq!(
            query.filter_value(),
            json!({
                "tags": { "$in": ["red"] },
                "sizes": { "$all": ["s", "m"] },
                "status": { "$nin": [3] }
            })
        );
    }

    #[test]
    fn test_exists_defaults_to_true() {
        let query = Query::new().exists("a").exists_with("b", false);
        assert_eq!(
            query.filter_value(),
            json!({ "a": { "$exists": true }, "b": { "$exists": false } })
        );
    }

    #[test]
    fn test_modulo_coerces_numeric_strings() {
        let query = Query::new();
        query.modulo("n", "4", 0).unwrap();
        assert_eq!(query.filter_value(), json!({ "n": { "$mod": [4.0, 0] } }));

        query.modulo("n", 3, " 1 ").unwrap();
        assert_eq!(query.filter_value(), json!({ "n": { "$mod": [3, 1.0] } }));
    }

    #[test]
    fn test_modulo_by_defaults_remainder_to_zero() {
        let query = Query::new();
        query.modulo_by("n", 5).unwrap();
        assert_eq!(query.filter_value(), json!({ "n": { "$mod": [5, 0] } }));

        let err = query.modulo_by("n", "five").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_modulo_rejects_non_numeric() {
        let query = Query::new();
        assert_eq!(
            query.modulo("n", "four", 0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            query.modulo("n", 4, json!([1])).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_size_requires_number() {
        let query = Query::new();
        query.size("tags", 2).unwrap();
        assert_eq!(query.filter_value(), json!({ "tags": { "$size": 2 } }));

        let err = query.size("tags", "2").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    // ========================================
    // Regular expressions
    // ========================================

    #[test]
    fn test_matches_with_multiline_option() {
        let query = Query::new();
        query
            .matches("f", "^abc", MatchOptions::new().multiline(true))
            .unwrap();

        assert_eq!(
            query.filter_value(),
            json!({ "f": { "$regex": "^abc", "$options": "m" } })
        );
    }

    #[test]
    fn test_matches_without_flags_has_no_options() {
        let query = Query::new();
        query.matches("f", "^abc", MatchOptions::new()).unwrap();
        assert_eq!(query.filter_value(), json!({ "f": { "$regex": "^abc" } }));
    }

    #[test]
    fn test_matches_rejects_case_insensitive() {
        let query = Query::new();

        let err = query
            .matches("f", Pattern::regex("^abc", "i"), MatchOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = query
            .matches("f", "^abc", MatchOptions::new().ignore_case(true))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(query.filter().is_empty());
    }

    #[test]
    fn test_matches_rejects_unanchored_pattern() {
        let query = Query::new();
        let err = query.matches("f", "abc", MatchOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.debug(), "abc");
    }

    #[test]
    fn test_matches_flag_order_and_overrides() {
        let query = Query::new();
        query
            .matches(
                "f",
                Pattern::regex("^a.b", "sm"),
                MatchOptions::new().extended(true),
            )
            .unwrap();
        assert_eq!(
            query.filter_value(),
            json!({ "f": { "$regex": "^a.b", "$options": "mxs" } })
        );

        query
            .matches(
                "f",
                Pattern::regex("^a.b", "sm"),
                MatchOptions::new().multiline(false).dot_matches_all(false),
            )
            .unwrap();
        assert_eq!(query.filter_value(), json!({ "f": { "$regex": "^a.b" } }));
    }

    // ========================================
    // Geo helpers
    // ========================================

    #[test]
    fn test_near_with_max_distance() {
        let query = Query::new();
        query.near("loc", json!([-71.1, 42.3]), Some(0.5)).unwrap();

        assert_eq!(
            query.filter_value(),
            json!({ "loc": { "$nearSphere": [-71.1, 42.3], "$maxDistance": 0.5 } })
        );
    }

    #[test]
    fn test_near_rejects_bad_coordinates() {
        let query = Query::new();
        for coord in [json!([1]), json!(["1", 2]), json!({"lng": 1, "lat": 2}), json!([1, 2, 3])] {
            let err = query.near("loc", coord, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_within_box_coerces_to_floats() {
        let query = Query::new();
        query
            .within_box("loc", json!([1, 2]), json!([3, 4]))
            .unwrap();

        assert_eq!(
            query.filter_value(),
            json!({ "loc": { "$within": { "$box": [[1.0, 2.0], [3.0, 4.0]] } } })
        );
        assert!(query.within_box("loc", json!([1, 2]), json!([3])).is_err());
    }

    #[test]
    fn test_within_polygon_point_count() {
        let query = Query::new();
        query
            .within_polygon("loc", json!([[0, 0], [0, 5], [5, 0]]))
            .unwrap();
        assert_eq!(
            query.filter_value(),
            json!({ "loc": { "$within": { "$polygon": [[0.0, 0.0], [0.0, 5.0], [5.0, 0.0]] } } })
        );

        assert!(query.within_polygon("loc", json!([])).is_err());
        assert!(query
            .within_polygon("loc", json!([[0, 0], [0, 1], [1, 1], [1, 0]]))
            .is_err());
        assert!(query.within_polygon("loc", json!([[0, "x"]])).is_err());
    }

    // ========================================
    // Property setters
    // ========================================

    #[test]
    fn test_sort_keys_keep_insertion_order() {
        let query = Query::new().ascending("b").descending("a").ascending("b");
        let keys: Vec<(String, SortOrder)> = query.sort().iter().cloned().collect();

        assert_eq!(
            keys,
            vec![("b".to_string(), SortOrder::Asc), ("a".to_string(), SortOrder::Desc)]
        );
        assert_eq!(query.to_query_string()["sort"], r#"{"b":1,"a":-1}"#);
    }

    #[test]
    fn test_dynamic_setters_validate_types() {
        let query = Query::new();

        let err = query.set_fields_value(&json!({ "name": 1 })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        let err = query.set_sort_value(&json!(["name"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        let err = query.set_limit_value(&json!("ten")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        let err = query.set_skip_value(&json!(-1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);

        query.set_limit_value(&json!("10")).unwrap();
        query.set_skip_value(&json!("5")).unwrap();
        assert_eq!(query.limit(), Some(10));
        assert_eq!(query.skip(), 5);

        query.set_limit_value(&Value::Null).unwrap();
        query.set_skip_value(&Value::Null).unwrap();
        assert_eq!(query.limit(), None);
        assert_eq!(query.skip(), 0);
    }

    #[test]
    fn test_limit_must_be_positive() {
        let query = Query::new();
        assert_eq!(
            query.set_limit(Some(0)).unwrap_err().kind(),
            ErrorKind::InvalidType
        );
        assert!(query.set_limit(Some(1)).is_ok());
        assert!(query.set_limit(None).is_ok());
    }

    #[test]
    fn test_pagination_window() {
        let rows: Vec<u32> = (0..10).collect();

        assert_eq!(Pagination::new().with_skip(8).apply(rows.clone()), vec![8, 9]);
        assert_eq!(
            Pagination::new().with_skip(2).with_limit(3).apply(rows.clone()),
            vec![2, 3, 4]
        );
        assert!(Pagination::new().with_skip(20).apply(rows).is_empty());
    }

    #[test]
    fn test_child_writes_forward_to_root() {
        let root = Query::new().exists("a");
        let child = root.and().exists("b");

        child.set_fields(["name"]);
        child.set_limit(Some(5)).unwrap();
        child.set_skip(2);
        child.descending("name");

        assert_eq!(root.fields(), vec!["name"]);
        assert_eq!(root.limit(), Some(5));
        assert_eq!(root.skip(), 2);
        assert_eq!(root.sort().get("name"), Some(SortOrder::Desc));
        assert_eq!(child.fields(), vec!["name"]);
        assert_eq!(child.filter_value(), json!({ "b": { "$exists": true } }));
    }

    #[test]
    fn test_from_plain_object() {
        let query = Query::from_plain_object(&json!({
            "fields": ["name"],
            "filter": { "age": { "$gt": 3 }, "name": "x" },
            "sort": { "age": -1 },
            "limit": 10,
            "skip": "2"
        }))
        .unwrap();

        assert_eq!(query.fields(), vec!["name"]);
        assert_eq!(query.limit(), Some(10));
        assert_eq!(query.skip(), 2);
        assert!(matches!(
            query.filter().condition("name"),
            Some(FilterCondition::Literal(value)) if value == &json!("x")
        ));
        assert!(matches!(
            query.filter().condition("age"),
            Some(FilterCondition::Operators(ops)) if ops.get(QueryOperator::Gt) == Some(&json!(3))
        ));
    }

    #[test]
    fn test_from_plain_object_rejects_bad_shapes() {
        let err = Query::from_plain_object(&json!("filter")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);

        let err = Query::from_plain_object(&json!({ "fields": "name" })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);

        let err = Query::from_plain_object(&json!({ "filter": { "a": { "$where": 1 } } }))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    // ========================================
    // Joins
    // ========================================

    #[test]
    fn test_and_then_nor_binds_and_first() {
        let query = Query::new();
        query.exists("A").and().exists("B").nor().exists("C");

        assert_eq!(
            query.filter_value(),
            json!({ "$nor": [
                { "$and": [ { "A": { "$exists": true } }, { "B": { "$exists": true } } ] },
                { "C": { "$exists": true } }
            ] })
        );
    }

    #[test]
    fn test_and_then_or_binds_and_first() {
        let query = Query::new();
        query.exists("A").and().exists("B").or().exists("C");

        assert_eq!(
            query.filter_value(),
            json!({ "$or": [
                { "$and": [ { "A": { "$exists": true } }, { "B": { "$exists": true } } ] },
                { "C": { "$exists": true } }
            ] })
        );
    }

    #[test]
    fn test_nor_then_or_binds_nor_first() {
        let query = Query::new();
        query.exists("A").nor().exists("B").or().exists("C");

        assert_eq!(
            query.filter_value(),
            json!({ "$or": [
                { "$nor": [ { "A": { "$exists": true } }, { "B": { "$exists": true } } ] },
                { "C": { "$exists": true } }
            ] })
        );
    }

    #[test]
    fn test_and_nor_and_groups_both_sides() {
        let query = Query::new();
        query
            .exists("A")
            .and()
            .exists("B")
            .nor()
            .exists("C")
            .and()
            .exists("D");

        assert_eq!(
            query.filter_value(),
            json!({ "$nor": [
                { "$and": [ { "A": { "$exists": true } }, { "B": { "$exists": true } } ] },
                { "$and": [ { "C": { "$exists": true } }, { "D": { "$exists": true } } ] }
            ] })
        );
    }

    #[test]
    fn test_or_then_and_binds_and_first() {
        let query = Query::new();
        query.exists("A").or().exists("B").and().exists("C");

        assert_eq!(
            query.filter_value(),
            json!({ "$or": [
                { "A": { "$exists": true } },
                { "$and": [ { "B": { "$exists": true } }, { "C": { "$exists": true } } ] }
            ] })
        );
    }

    #[test]
    fn test_or_retargets_to_outermost_query() {
        let query = Query::new();
        query
            .exists("A")
            .and()
            .exists("B")
            .and()
            .exists("C")
            .or()
            .exists("D");

        assert_eq!(
            query.filter_value(),
            json!({ "$or": [
                { "$and": [
                    { "A": { "$exists": true } },
                    { "$and": [ { "B": { "$exists": true } }, { "C": { "$exists": true } } ] }
                ] },
                { "D": { "$exists": true } }
            ] })
        );
    }

    #[test]
    fn test_join_without_arguments_returns_linked_child() {
        let root = Query::new().equal_to("a", 1);
        let child = root.and();

        assert!(!child.ptr_eq(&root));
        assert!(child.parent().is_some_and(|parent| parent.ptr_eq(&root)));
        assert!(child.root().ptr_eq(&root));
        assert!(!root.has_parent());
    }

    #[test]
    fn test_join_with_arguments_returns_same_query() {
        let query = Query::new().equal_to("a", 1);
        let other = Query::new().equal_to("b", 2);

        let joined = query
            .or_with([SubQuery::from(&other), json!({ "c": 3 }).into()])
            .unwrap();

        assert!(joined.ptr_eq(&query));
        assert_eq!(
            query.filter_value(),
            json!({ "$or": [ { "a": 1 }, { "b": 2 }, { "c": 3 } ] })
        );

        // The operand is a snapshot; later edits to `other` do not leak in.
        other.equal_to("b", 99);
        assert_eq!(query.filter_value()["$or"][1], json!({ "b": 2 }));
    }

    #[test]
    fn test_join_with_own_query_does_not_cycle() {
        let query = Query::new().equal_to("a", 1);
        query.and_with([&query]).unwrap();

        assert_eq!(
            query.filter_value(),
            json!({ "$and": [ { "a": 1 }, { "a": 1 } ] })
        );
    }

    #[test]
    fn test_join_rejects_non_object_arguments() {
        let query = Query::new();
        for arg in [json!(1), json!("a"), json!([{ "a": 1 }]), Value::Null] {
            let err = query.and_with([arg]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert!(query.filter().is_empty());
    }

    #[test]
    fn test_join_with_empty_arguments_opens_child() {
        let query = Query::new().equal_to("a", 1);
        let child = query.nor_with(Vec::<Value>::new()).unwrap();

        assert!(child.parent().is_some());
        child.equal_to("b", 2);
        assert_eq!(
            query.filter_value(),
            json!({ "$nor": [ { "a": 1 }, { "b": 2 } ] })
        );
    }

    #[test]
    fn test_chain_on_temporary_root_keeps_only_child_filter() {
        let query = Query::new().exists("A").and().exists("B");
        assert!(!query.has_parent());
        assert_eq!(query.to_plain_object().filter, json!({ "B": { "$exists": true } }));

        let root = Query::new();
        root.exists("A").and().exists("B");
        assert_eq!(
            root.filter_value(),
            json!({ "$and": [ { "A": { "$exists": true } }, { "B": { "$exists": true } } ] })
        );
    }

    #[test]
    fn test_dropped_root_leaves_child_standalone() {
        let child = Query::new().equal_to("a", 1).and();
        assert!(child.parent().is_none());

        child.equal_to("b", 2).ascending("b");
        assert_eq!(child.to_plain_object().filter, json!({ "b": 2 }));
        assert_eq!(child.sort().get("b"), Some(SortOrder::Asc));
    }

    // ========================================
    // Serialization
    // ========================================

    #[test]
    fn test_plain_object_reads_root() {
        let root = Query::new().equal_to("a", 1);
        let child = root.or().equal_to("b", 2);
        child.set_limit(Some(3)).unwrap();

        let from_child = child.to_plain_object();
        let from_root = root.to_plain_object();

        assert_eq!(from_child, from_root);
        assert_eq!(from_root.filter, json!({ "$or": [ { "a": 1 }, { "b": 2 } ] }));
        assert_eq!(from_root.limit, Some(3));
        assert_eq!(from_root.skip, 0);
    }

    #[test]
    fn test_plain_object_is_repeatable() {
        let query = Query::new().equal_to("a", 1).ascending("a");
        query.set_skip(4);

        let first = query.to_plain_object();
        let second = query.to_plain_object();
        assert_eq!(first, second);
        assert_eq!(query.filter_value(), json!({ "a": 1 }));
    }

    #[test]
    fn test_empty_query_string() {
        let params = Query::new().to_query_string();
        assert!(params.is_empty());
        assert_eq!(Query::new().to_string(), "{}");
    }

    #[test]
    fn test_query_string_includes_set_parts() {
        let query = Query::new().equal_to("name", "x").descending("age");
        query.set_fields(["name", "age"]);
        query.set_limit(Some(10)).unwrap();

        let params = query.to_query_string();
        assert_eq!(params["query"], r#"{"name":"x"}"#);
        assert_eq!(params["fields"], "name,age");
        assert_eq!(params["limit"], "10");
        assert_eq!(params["sort"], r#"{"age":-1}"#);
        assert!(!params.contains_key("skip"));

        query.set_skip(20);
        assert_eq!(query.to_query_string()["skip"], "20");
    }

    #[test]
    fn test_display_encodes_query_string() {
        let query = Query::new().equal_to("a", 1);
        query.set_skip(1);

        let encoded: Value = serde_json::from_str(&query.to_string()).unwrap();
        assert_eq!(encoded, json!({ "query": "{\"a\":1}", "skip": "1" }));
    }

    #[test]
    fn test_plain_object_round_trips_through_from_plain_object() {
        let query = Query::new();
        query
            .greater_than("age", 3)
            .unwrap()
            .or()
            .contains("tag", json!(["a", "b"]))
            .descending("age");
        query.set_fields(["age"]);

        let plain = serde_json::to_value(query.to_plain_object()).unwrap();
        let rebuilt = Query::from_plain_object(&plain).unwrap();

        assert_eq!(rebuilt.to_plain_object(), query.to_plain_object());
        assert_eq!(rebuilt.to_query_string(), query.to_query_string());
    }

}
