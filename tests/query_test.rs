//! Integration tests for query factories, combinators and ranking

mod common;

use chrono::NaiveDate;
use common::*;
use ftsgate::{
    highlight, Document, HighlightOptions, Index, Query, QueryKind, Schema, SearchError,
    SmartQueryOptions,
};

fn index_with(documents: &[Document]) -> Index {
    memory_index(all_fields_schema(), documents)
}

fn search(index: &Index, query: &Query) -> Vec<String> {
    sorted(index.search(query, 100).unwrap())
}

fn first(index: &Index, query: &Query) -> String {
    index.search(query, 100).unwrap().remove(0)
}

fn smart(index: &Index, text: &str, options: &SmartQueryOptions) -> Vec<String> {
    let query = index
        .smart_query(&index.schema().text_fields(), text, options)
        .unwrap();
    search(index, &query)
}

#[test]
fn test_all_and_empty_queries() {
    let index = index_with(&[Document::new("1"), Document::new("2")]);

    assert_eq!(search(&index, &Query::all()), ids(&["1", "2"]));
    assert!(search(&index, &Query::empty()).is_empty());
}

#[test]
fn test_term_query_over_text_and_string_fields() {
    let index = index_with(&[
        doc(1, "string", "hi"),
        doc(2, "text", "hi"),
        doc(3, "text", "kek"),
    ]);

    let query = index.term_query(&["string", "text"], "hi").unwrap();
    assert_eq!(search(&index, &query), ids(&["1", "2"]));

    let boosted = index.term_query(&["text"], "kek").unwrap().boost(2.0);
    let plain = index.term_query(&["text"], "hi").unwrap();
    assert_eq!(first(&index, &(plain | boosted)), "3");
}

#[test]
fn test_fuzzy_term_query() {
    let index = index_with(&[
        doc(1, "string", "hello"),
        doc(2, "text", "hellp"),
        doc(3, "text", "kek"),
    ]);

    let query = index.fuzzy_term_query(&["string", "text"], "helll", 1).unwrap();
    assert_eq!(search(&index, &query), ids(&["1", "2"]));

    let exact = index.fuzzy_term_query(&["string", "text"], "helll", 0).unwrap();
    assert!(search(&index, &exact).is_empty());
}

#[test]
fn test_phrase_query_uses_field_tokenizer() {
    let index = index_with(&[
        doc(1, "en_text", "one two three"),
        doc(2, "en_text", "three two one"),
    ]);

    let query = index.phrase_query(&["en_text"], "ones two").unwrap();
    assert_eq!(search(&index, &query), ids(&["1"]));

    let single = index.phrase_query(&["en_text"], "threes").unwrap();
    assert_eq!(search(&index, &single), ids(&["1", "2"]));

    let nothing = index.phrase_query(&["en_text"], "...").unwrap();
    assert!(search(&index, &nothing).is_empty());
}

#[test]
fn test_regex_query() {
    let index = index_with(&[
        doc(1, "string", "hello"),
        doc(2, "text", "holla"),
        doc(3, "text", "help"),
    ]);

    let query = index.regex_query(&["string", "text"], "h[eo]ll[oa]").unwrap();
    assert_eq!(search(&index, &query), ids(&["1", "2"]));
}

#[test]
fn test_prefix_query_escapes_pattern() {
    let index = index_with(&[
        doc(1, "string", "hello"),
        doc(2, "text", "hell"),
        doc(3, "string", "he.*"),
    ]);

    let query = index.prefix_query(&["string", "text"], "hell").unwrap();
    assert_eq!(search(&index, &query), ids(&["1", "2"]));

    let query = index.prefix_query(&["string", "text"], "he.").unwrap();
    assert_eq!(search(&index, &query), ids(&["3"]));
}

#[test]
fn test_range_queries() {
    let date = |year| NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let index = index_with(&[
        Document::new("1").with("integer", 42),
        Document::new("2").with("integer", 100),
        Document::new("3").with("double", 42.0),
        Document::new("4").with("double", 100.0),
        Document::new("5").with("date", date(1995)),
        Document::new("6").with("date", date(2022)),
    ]);

    let integers = index.range_query(&["integer"], 0..=50).unwrap();
    assert_eq!(search(&index, &integers), ids(&["1"]));

    let doubles = index.range_query(&["double"], 0.0..=50.0).unwrap();
    assert_eq!(search(&index, &doubles), ids(&["3"]));

    let dates = index.range_query(&["date"], date(1900)..=date(2000)).unwrap();
    assert_eq!(search(&index, &dates), ids(&["5"]));

    let boosted = index.range_query(&["integer"], 90..=110).unwrap().boost(2.0);
    assert_eq!(first(&index, &(integers | boosted)), "2");
}

#[test]
fn test_unsupported_range() {
    let index = index_with(&[]);

    let err = index.range_query(&["integer"], "a"..="z").unwrap_err();
    assert!(matches!(err, SearchError::UnsupportedRange(name) if name == "text"));
}

#[test]
fn test_facet_query_matches_hierarchy() {
    let index = index_with(&[
        doc(1, "facet", "/animals/birds"),
        doc(2, "facet", "/animals/fish"),
        doc(3, "facet", "/humans"),
    ]);

    let animals = index.facet_query("facet", "/animals").unwrap();
    assert_eq!(search(&index, &animals), ids(&["1", "2"]));

    let humans = index.facet_query("facet", "/humans").unwrap().boost(2.0);
    assert_eq!(first(&index, &(animals | humans)), "3");
}

#[test]
fn test_unsupported_field_for_integer_field() {
    let index = index_with(&[]);
    let kinds = [
        QueryKind::Term("hi".into()),
        QueryKind::FuzzyTerm {
            term: "hi".into(),
            distance: 1,
        },
        QueryKind::Phrase("hi there".into()),
        QueryKind::Regex("h.*".into()),
        QueryKind::Prefix("h".into()),
        QueryKind::Facet("/h".into()),
        QueryKind::Smart {
            text: "hi".into(),
            fuzzy_distance: None,
        },
    ];

    for kind in &kinds {
        let err = index.query(&["integer"], kind).unwrap_err();
        assert!(
            matches!(&err, SearchError::UnsupportedField(field) if field == "integer"),
            "{kind:?} gave {err:?}"
        );
    }

    let err = index.range_query(&["text"], 0..=50).unwrap_err();
    assert!(matches!(err, SearchError::UnsupportedField(field) if field == "text"));

    let err = index.facet_query("string", "/animals").unwrap_err();
    assert!(matches!(err, SearchError::UnsupportedField(field) if field == "string"));
}

#[test]
fn test_smart_query() {
    let index = index_with(&[
        doc(1, "text", "one two three"),
        doc(2, "en_text", "one two three"),
        doc(3, "text", "ready steady go"),
    ]);
    let options = SmartQueryOptions::default();

    assert_eq!(smart(&index, "one three", &options), ids(&["1", "2"]));
    assert_eq!(smart(&index, "three two one", &options), ids(&["1", "2"]));
    assert_eq!(smart(&index, "ones two threes", &options), ids(&["2"]));
    assert_eq!(
        smart(&index, "reaby steaby bo", &SmartQueryOptions::fuzzy(1)),
        ids(&["3"])
    );
}

#[test]
fn test_smart_query_prefix_only_on_last_token() {
    let index = index_with(&[
        doc(1, "text", "one two three"),
        doc(2, "en_text", "one two three"),
    ]);
    let options = SmartQueryOptions::default();

    assert_eq!(smart(&index, "one two thr", &options), ids(&["1", "2"]));
    assert!(smart(&index, "one tw three", &options).is_empty());
}

#[test]
fn test_empty_smart_query_matches_nothing() {
    let index = index_with(&[doc(1, "text", "one two three")]);

    assert!(smart(&index, "", &SmartQueryOptions::default()).is_empty());
    assert!(smart(&index, "?! ...", &SmartQueryOptions::default()).is_empty());
}

#[test]
fn test_smart_query_field_boost_ranking() {
    let schema = Schema::builder()
        .text("title")
        .text("description")
        .build()
        .unwrap();
    let index = memory_index(
        schema,
        &[
            doc("title-only", "title", "laptop"),
            doc("description-only", "description", "laptop"),
            Document::new("both")
                .with("title", "laptop")
                .with("description", "laptop"),
        ],
    );
    let options = SmartQueryOptions::default();

    let both_fields = index
        .smart_query(&["title", "description"], "laptop", &options)
        .unwrap();
    assert_eq!(
        search(&index, &both_fields),
        ids(&["both", "description-only", "title-only"])
    );

    let title = index
        .smart_query(&["title"], "laptop", &options.with_boost(3.0))
        .unwrap();
    let description = index.smart_query(&["description"], "laptop", &options).unwrap();
    let ranked = index
        .search(&Query::disjunction([title, description]), 10)
        .unwrap();

    assert_eq!(ranked.len(), 3);
    assert_eq!(ranked.last().map(String::as_str), Some("description-only"));
}

#[test]
fn test_boost_of_one_changes_nothing() {
    let index = index_with(&[
        doc(1, "text", "hello hello"),
        doc(2, "text", "hello world"),
        doc(3, "string", "hello"),
    ]);

    let query = index.term_query(&["string", "text"], "hello").unwrap();
    let boosted = query.boost(1.0);

    assert!(boosted.ptr_eq(&query));
    assert_eq!(
        index.search(&query, 10).unwrap(),
        index.search(&boosted, 10).unwrap()
    );
}

#[test]
fn test_boost_reorders_results() {
    let index = index_with(&[
        doc(1, "string", "hello"),
        doc(2, "text", "hello hello"),
        doc(3, "string", "world"),
    ]);

    let hello = index.term_query(&["string", "text"], "hello").unwrap();
    let world = index.term_query(&["string"], "world").unwrap().boost(100.0);

    assert_eq!(first(&index, &(hello | world)), "3");
}

#[test]
fn test_operators() {
    let index = index_with(&[
        doc(1, "text", "hello world"),
        doc(2, "text", "hello world war"),
        doc(3, "text", "world war"),
    ]);

    let hello = index.term_query(&["text"], "hello").unwrap();
    assert_eq!(search(&index, &hello), ids(&["1", "2"]));
    assert_eq!(search(&index, &!&hello), ids(&["3"]));

    let hello_world = index.phrase_query(&["text"], "hello world").unwrap();
    let world_war = index.phrase_query(&["text"], "world war").unwrap();

    assert_eq!(search(&index, &(&hello_world & &world_war)), ids(&["2"]));
    assert_eq!(search(&index, &(&hello_world | &world_war)), ids(&["1", "2", "3"]));
}

#[test]
fn test_combinators_collapse_and_default() {
    let index = index_with(&[doc(1, "text", "hello")]);
    let query = index.term_query(&["text"], "hello").unwrap();

    assert!(Query::conjunction([query.clone()]).ptr_eq(&query));
    assert!(Query::disjunction([query.clone()]).ptr_eq(&query));
    assert!(search(&index, &Query::conjunction([])).is_empty());
    assert!(search(&index, &Query::disjunction([])).is_empty());
}

#[test]
fn test_zero_fields_match_nothing() {
    let index = index_with(&[doc(1, "text", "hello")]);
    let fields: [&str; 0] = [];

    let query = index.term_query(&fields, "hello").unwrap();
    assert!(search(&index, &query).is_empty());
}

#[test]
fn test_highlight() {
    assert_eq!(
        highlight(
            "HELLO world. you are welcome.",
            "hello you",
            &HighlightOptions::default()
        ),
        "<b>HELLO</b> world. <b>you</b> are welcome."
    );
    assert_eq!(
        highlight(
            "hellow world. you are welcome.",
            "hello you",
            &HighlightOptions::fuzzy(1)
        ),
        "<b>hellow</b> world. <b>you</b> are welcome."
    );
}
