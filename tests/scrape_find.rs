// tests/scrape_find.rs
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use instr_scrape::{Request, Response, ScrapeError, Scraped, Scraper, ScraperOptions};

fn scrape(instruction: Value, request: Request) -> Scraped {
    Scraper::new(ScraperOptions::default())
        .scrape(&instruction, request)
        .unwrap()
}

fn one(scraped: Scraped) -> Response {
    match scraped {
        Scraped::One(r) => r,
        other => panic!("expected a single response, got {other:?}"),
    }
}

fn flat(instruction: Value, request: Request) -> Value {
    one(scrape(instruction, request)).flattened_values().unwrap()
}

#[test]
fn simple_find() {
    let resp = one(scrape(json!({"find": "foobar"}), Request::new().input("foobar baz boo")));
    assert_eq!(resp.status(), "found");
    assert_eq!(resp.results().len(), 1);
    assert_eq!(resp.results()[0].value, "foobar");
    assert!(resp.results()[0].children.is_empty());
    assert_eq!(resp.results()[0].as_dict(), json!({"value": "foobar"}));
}

#[test]
fn multi_match_flattens_to_list() {
    let v = flat(json!({"find": r"\w+", "name": "flowers"}), Request::new().input("roses violets"));
    assert_eq!(v, json!([{"flowers": "roses"}, {"flowers": "violets"}]));
}

#[test]
fn object_extends() {
    let resp = one(scrape(
        json!({"extends": {"find": r"foo\w+"}, "match": 1}),
        Request::new().input("foobar foobaz"),
    ));
    let dicts: Vec<Value> = resp.results().iter().map(|r| r.as_dict()).collect();
    assert_eq!(dicts, vec![json!({"value": "foobaz"})]);
}

#[test]
fn array_extends() {
    let resp = one(scrape(
        json!({"extends": [{"find": r"foo\w+"}, {"match": 1}]}),
        Request::new().input("foobar foobaz"),
    ));
    assert_eq!(resp.status(), "found");
    assert_eq!(resp.results()[0].value, "foobaz");
    assert_eq!(resp.results().len(), 1);
}

#[test]
fn flattened_all_one_to_one() {
    let v = flat(
        json!({
            "find": "^.*$", "name": "everything", "match": 0,
            "then": [{"name": "roses", "find": "red"}, {"name": "violets", "find": "blue"}]
        }),
        Request::new().input("red blue"),
    );
    assert_eq!(v, json!({"everything": "red blue", "roses": "red", "violets": "blue"}));
}

#[test]
fn flattened_with_one_to_many() {
    let v = flat(
        json!({
            "find": "^.*$", "name": "everything", "match": 0,
            "then": [{"name": "roses", "find": "red"}, {"name": "violets", "find": "blue"}]
        }),
        Request::new().input("red blue blue"),
    );
    assert_eq!(
        v,
        json!({
            "everything": "red blue blue",
            "roses": "red",
            "violets": [{"violets": "blue"}, {"violets": "blue"}]
        })
    );
}

#[test]
fn nested_flattened_values() {
    let v = flat(
        json!({
            "find": "^.*$", "name": "everything", "match": 0,
            "then": {
                "name": "sentences",
                "find": r"\s?([^.]+)\.",
                "replace": "$1",
                "then": [
                    {"name": "first word", "find": r"^\w+"},
                    {"name": "last word", "find": r"\w+$"}
                ]
            }
        }),
        Request::new().input("roses are red. violets are blue."),
    );
    assert_eq!(
        v,
        json!({
            "everything": "roses are red. violets are blue.",
            "sentences": [
                {"sentences": "roses are red", "first word": "roses", "last word": "red"},
                {"sentences": "violets are blue", "first word": "violets", "last word": "blue"}
            ]
        })
    );
}

#[test]
fn deeper_name_overwrites() {
    let v = flat(
        json!({
            "find": "^.*$", "name": "roses", "match": 0,
            "then": {"name": "roses", "find": "^(.*)$", "replace": "$1 foobar"}
        }),
        Request::new().input("red"),
    );
    assert_eq!(v, json!({"roses": "red foobar"}));
}

#[test]
fn single_match_siblings_see_each_other() {
    let instruction = json!({
        "find": r"\w+ \w+ \w+",
        "name": "three words",
        "then": [
            {"find": r"\w+", "match": 0, "name": "first"},
            {"find": r"\w+", "match": 1, "name": "second"},
            {"find": r"\w+", "match": 2, "name": "third"},
            {"find": ".*", "name": "backwards", "match": 0, "replace": "{{third}} {{second}} {{first}}"}
        ]
    });
    let expected = json!([
        {"three words": "the quick brown", "first": "the", "second": "quick", "third": "brown", "backwards": "brown quick the"},
        {"three words": "fox jumped over", "first": "fox", "second": "jumped", "third": "over", "backwards": "over jumped fox"},
        {"three words": "the lazy dog", "first": "the", "second": "lazy", "third": "dog", "backwards": "dog lazy the"}
    ]);
    let input = "the quick brown fox jumped over the lazy dog";

    assert_eq!(flat(instruction.clone(), Request::new().input(input)), expected);

    // same tree, no helper threads
    let sequential = Scraper::new(ScraperOptions::sequential())
        .scrape(&instruction, Request::new().input(input))
        .unwrap();
    assert_eq!(sequential.flattened_values().unwrap(), expected);
}

#[test]
fn forks_do_not_leak_between_matches() {
    // multi-match names stay in each branch's own scope
    let resp = one(scrape(
        json!({"find": r"\w+", "name": "word", "then": {"find": ".+", "input": "{{{word}}}!"}}),
        Request::new().input("a b"),
    ));
    let children: Vec<&str> = resp
        .results()
        .iter()
        .map(|r| r.children[0].results()[0].value.as_str())
        .collect();
    assert_eq!(children, vec!["a!", "b!"]);
    assert!(!resp.tags.contains_key("word"));
}

#[test]
fn input_in_instruction() {
    let v = flat(
        json!({"find": "(roses|violets)", "name": "flower", "input": "roses are red"}),
        Request::new().input("violets are blue"),
    );
    assert_eq!(v, json!({"flower": "roses"}));
}

#[test]
fn input_in_instruction_is_a_template() {
    let v = flat(
        json!({"find": "(roses|violets)", "name": "flower", "input": "{{flowers}} are red"}),
        Request::new().input("violets are blue").tag("flowers", "roses"),
    );
    assert_eq!(v, json!({"flower": "roses"}));
}

#[test]
fn match_is_a_template() {
    let v = flat(
        json!({"find": r"\w+", "name": "president", "match": "{{which}}"}),
        Request::new().input("washington adams jefferson").tag("which", "2"),
    );
    assert_eq!(v, json!({"president": "jefferson"}));
}

#[test]
fn min_and_max_are_templates() {
    let v = flat(
        json!({"find": r"\w+", "name": "president", "min_match": "{{begin}}", "max_match": "{{end}}"}),
        Request::new()
            .input("washington adams jefferson")
            .tags([("begin", "1"), ("end", "2")]),
    );
    assert_eq!(v, json!([{"president": "adams"}, {"president": "jefferson"}]));
}

#[test]
fn negative_bounds_count_from_the_end() {
    let v = flat(
        json!({"find": r"\w+", "name": "w", "min_match": -2}),
        Request::new().input("a b c d"),
    );
    assert_eq!(v, json!([{"w": "c"}, {"w": "d"}]));

    let v = flat(
        json!({"find": r"\w+", "name": "w", "max_match": -2}),
        Request::new().input("a b c d"),
    );
    assert_eq!(v, json!([{"w": "a"}, {"w": "b"}, {"w": "c"}]));
}

#[test]
fn tags_in_instruction() {
    let v = flat(
        json!({"find": "{{{flower}}}", "name": "flower", "tags": {"flower": "petunias"}}),
        Request::new().input("violets roses petunias"),
    );
    assert_eq!(v, json!({"flower": "petunias"}));
}

#[test]
fn tag_match_in_replace() {
    let v = flat(
        json!({"find": r"(\w+)", "name": "president", "tag_match": "which", "replace": "$1 was {{which}}"}),
        Request::new().input("washington adams jefferson"),
    );
    assert_eq!(
        v,
        json!([
            {"president": "washington was 0"},
            {"president": "adams was 1"},
            {"president": "jefferson was 2"}
        ])
    );
}

#[test]
fn tag_match_reaches_children() {
    let instruction = json!({
        "find": r"\w+",
        "tag_match": "which",
        "name": "president",
        "then": {
            "find": r"(\w+)",
            "name": "sentence",
            "input": "first second third",
            "match": "{{which}}",
            "replace": "{{{president}}} was $1"
        }
    });
    let resp = one(scrape(instruction, Request::new().input("washington adams jefferson")));
    assert_eq!(
        resp.flattened_values().unwrap(),
        json!([
            {"president": "washington", "sentence": "washington was first"},
            {"president": "adams", "sentence": "adams was second"},
            {"president": "jefferson", "sentence": "jefferson was third"}
        ])
    );
    for (i, result) in resp.results().iter().enumerate() {
        assert_eq!(result.children[0].tags["which"], i.to_string());
    }
}

#[test]
fn replace_with_inline_tag() {
    let v = flat(
        json!({"find": r"(\w+)", "name": "flower", "replace": "$1 are {{{adjective}}}", "tags": {"adjective": "beautiful"}}),
        Request::new().input("roses"),
    );
    assert_eq!(v, json!({"flower": "roses are beautiful"}));
}

#[test]
fn replace_self() {
    let v = flat(
        json!({"find": r"\w+", "name": "flower", "then": [{"find": "^", "name": "flower", "replace": "{{{flower}}} forever"}]}),
        Request::new().input("roses violets"),
    );
    assert_eq!(v, json!([{"flower": "roses forever"}, {"flower": "violets forever"}]));
}

#[test]
fn utf8_words() {
    let v = flat(
        json!({"find": r"\S+", "name": "first name", "match": 0}),
        Request::new().input("josé alejandro"),
    );
    assert_eq!(v, json!({"first name": "josé"}));
}

#[test]
fn join_collapses_matches() {
    let v = flat(
        json!({"find": r"\w+", "name": "joined", "join": ", and "}),
        Request::new().input("peter paul mary"),
    );
    assert_eq!(v, json!({"joined": "peter, and paul, and mary"}));
}

#[test]
fn join_with_no_matches_is_empty() {
    let resp = one(scrape(
        json!({"find": r"\d+", "name": "j", "join": ","}),
        Request::new().input("abc"),
    ));
    assert_eq!(resp.status(), "found");
    assert_eq!(resp.results().len(), 1);
    assert_eq!(resp.results()[0].value, "");
    assert_eq!(resp.flattened_values().unwrap(), json!({"j": ""}));
}

#[test]
fn unresolved_tags_in_replacement() {
    let resp = one(scrape(
        json!({"find": r"\w+", "replace": "$0 are {{color}}"}),
        Request::new().input("roses violets"),
    ));
    assert_eq!(resp.status(), "missing");
    assert_eq!(resp.missing_tags(), ["color"]);

    let v = flat(
        json!({"find": r"\w+", "name": "f", "replace": "$0 are {{color}}"}),
        Request::new().input("roses").tag("color", "red"),
    );
    assert_eq!(v, json!({"f": "roses are red"}));
}

#[test]
fn else_runs_on_no_match() {
    let v = flat(
        json!({"find": r"\d+", "name": "numbers", "else": {"name": "words", "find": r"\w+"}}),
        Request::new().input("peter paul mary"),
    );
    assert_eq!(v, json!([{"words": "peter"}, {"words": "paul"}, {"words": "mary"}]));
}

#[test]
fn no_match_fails_with_reason() {
    let resp = one(scrape(
        json!({"find": "{{{what}}}\\d"}),
        Request::new().input("abc").tag("what", "x"),
    ));
    assert_eq!(resp.status(), "failed");
    assert_eq!(resp.reason(), Some(r"No matches for '{{{what}}}\d', evaluated to 'x\d'"));
}

#[test]
fn missing_tags_short_circuit() {
    let resp = one(scrape(json!({"find": "{{flower}} {{{color}}}"}), Request::new().input("x")));
    assert_eq!(resp.status(), "missing");
    assert_eq!(resp.missing_tags(), ["color", "flower"]);
    assert!(resp.results().is_empty());
}

#[test]
fn bad_regex_fails_branch_only() {
    let resp = one(scrape(json!({"find": "("}), Request::new().input("x")));
    assert_eq!(resp.status(), "failed");
    assert!(resp.reason().unwrap().starts_with("'(' failed because of"));

    let resp = one(scrape(json!({"find": "x", "replace": "$3"}), Request::new().input("x")));
    assert_eq!(resp.status(), "failed");
}

#[test]
fn bad_bounds_fail_branch() {
    let resp = one(scrape(json!({"find": "x", "min_match": "abc"}), Request::new().input("x")));
    assert_eq!(resp.status(), "failed");
    assert!(resp
        .reason()
        .unwrap()
        .starts_with("Min_match 'abc' or max_match '-1' is not an int"));
}

#[test]
fn extreme_bounds_do_not_overflow() {
    let v = flat(
        json!({"find": r"\w+", "name": "w", "max_match": "9223372036854775807"}),
        Request::new().input("a b"),
    );
    assert_eq!(v, json!([{"w": "a"}, {"w": "b"}]));

    let v = flat(
        json!({"find": r"\w+", "name": "w", "min_match": i64::MIN}),
        Request::new().input("a b"),
    );
    assert_eq!(v, json!([{"w": "a"}, {"w": "b"}]));

    let resp = one(scrape(json!({"find": r"\w+", "match": i64::MAX}), Request::new().input("a b")));
    assert_eq!(resp.status(), "failed");
}

#[test]
fn boolean_bounds_fail_branch() {
    let resp = one(scrape(json!({"find": r"\w+", "match": true}), Request::new().input("a b")));
    assert_eq!(resp.status(), "failed");
    assert!(resp
        .reason()
        .unwrap()
        .starts_with("Min_match 'true' or max_match 'true' is not an int"));
}

#[test]
fn child_failure_stays_local() {
    let resp = one(scrape(
        json!({"find": r"\w+", "then": {"find": r"\d"}}),
        Request::new().input("a1 bb"),
    ));
    assert_eq!(resp.status(), "found");
    assert_eq!(resp.results()[0].children[0].status(), "found");
    assert_eq!(resp.results()[1].children[0].status(), "failed");
}

#[test]
fn structural_errors_propagate() {
    let scraper = Scraper::new(ScraperOptions::default());
    let err = scraper.scrape(&json!({"name": "nothing to do"}), Request::new()).unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidInstruction(_)));

    let err = scraper.scrape(&json!(42), Request::new()).unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidInstruction(_)));

    let err = scraper
        .scrape(&json!({"find": "x", "extends": [7]}), Request::new())
        .unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidInstruction(_)));

    // deep inside a then, still fatal
    let err = scraper
        .scrape(&json!({"find": "x", "then": {"find": "x", "load": "y"}}), Request::new().input("x"))
        .unwrap_err();
    assert!(matches!(err, ScrapeError::InvalidInstruction(_)));
}

#[test]
fn list_instruction_returns_many() {
    let scraped = scrape(
        json!([{"find": "a", "name": "a"}, [{"find": "b", "name": "b"}]]),
        Request::new().input("ab"),
    );
    let Scraped::Many(responses) = &scraped else { panic!("expected a list") };
    assert_eq!(responses.len(), 2);
    assert_eq!(scraped.flattened_values().unwrap(), json!([{"a": "a"}, {"b": "b"}]));
}

#[test]
fn ids_are_shared_across_the_tree() {
    let resp = one(scrape(
        json!({"find": r"\w+", "then": {"find": "."}}),
        Request::new().input("ab cd").id("req-1"),
    ));
    assert_eq!(resp.id, "req-1");
    assert!(resp.results().iter().all(|r| r.children[0].id == "req-1"));

    let resp = one(scrape(json!({"find": "x"}), Request::new().input("x")));
    assert_eq!(resp.id.len(), 36);
}

#[test]
fn jsonpath_single() {
    let v = flat(
        json!({"name": "foo_value", "jsonpath": "$.foo"}),
        Request::new().input(r#"{"foo": "bar"}"#),
    );
    assert_eq!(v, json!({"foo_value": "bar"}));
}

#[test]
fn jsonpath_multiple_ranged() {
    let input = json!({"foo": [{"baz": 1}, {"baz": 2}, {"baz": 3}, {"baz": 4}]}).to_string();
    let v = flat(
        json!({"name": "bar_value", "jsonpath": "foo[*].baz", "min_match": 1, "max_match": 2}),
        Request::new().input(input.clone()),
    );
    assert_eq!(v, json!([{"bar_value": "2"}, {"bar_value": "3"}]));

    let v = flat(json!({"name": "bar_value", "jsonpath": "foo[*].baz"}), Request::new().input(input));
    assert_eq!(v.as_array().map(Vec::len), Some(4));
}

#[test]
fn jsonpath_failures() {
    let bad_expr = "??dklskdjglks<<CVJ";
    let resp = one(scrape(
        json!({"name": "foo_value", "jsonpath": bad_expr}),
        Request::new().input(r#"{"foo": "bar"}"#),
    ));
    assert_eq!(resp.status(), "failed");
    assert_eq!(
        resp.reason().unwrap(),
        format!("'{bad_expr}' failed because it is not a valid jsonpath expression")
    );

    let bad_input = "[[gidjs kj AINT JSON";
    let resp = one(scrape(json!({"name": "foo_value", "jsonpath": "$.foo"}), Request::new().input(bad_input)));
    assert_eq!(
        resp.reason().unwrap(),
        format!("'$.foo' failed because its input '{bad_input}' was not JSON")
    );
}

#[test]
fn jsonpath_recursive_descent() {
    let input = json!({"a": {"id": 1}, "b": {"c": {"id": 2}}}).to_string();
    let v = flat(json!({"name": "id", "jsonpath": "$..id"}), Request::new().input(input));
    let mut ids: Vec<String> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn xpath_single() {
    let v = flat(
        json!({"name": "second verse", "xpath": "//p[2]"}),
        Request::new().input("<p>first verse</p><p>same as the first</p>"),
    );
    assert_eq!(v, json!({"second verse": "same as the first"}));
}

#[test]
fn xpath_multiple_and_ranged() {
    let v = flat(
        json!({"name": "bullet", "xpath": "//ul/li"}),
        Request::new().input("<ul><li>first<li>second<li>third</ul>"),
    );
    assert_eq!(v, json!([{"bullet": "first"}, {"bullet": "second"}, {"bullet": "third"}]));

    let v = flat(
        json!({"name": "bullet", "xpath": "//ul/li", "min_match": 1, "max_match": 2}),
        Request::new().input("<ul><li>first<li>second<li>third<li>fourth</ul>"),
    );
    assert_eq!(v, json!([{"bullet": "second"}, {"bullet": "third"}]));
}

#[test]
fn xpath_nested() {
    let v = flat(
        json!({
            "name": "bullet",
            "xpath": "//ul/li",
            "then": {"find": r"^\w", "match": 0, "name": "first letter"}
        }),
        Request::new().input("<ul><li>first<li>second<li>third</ul>"),
    );
    assert_eq!(
        v,
        json!([
            {"first letter": "f", "bullet": "first"},
            {"first letter": "s", "bullet": "second"},
            {"first letter": "t", "bullet": "third"}
        ])
    );
}

#[test]
fn xpath_failures() {
    let html = "<p>first verse</p><p>same as the first</p>";
    let resp = one(scrape(json!({"name": "v", "xpath": "*sd8g88**"}), Request::new().input(html)));
    assert_eq!(resp.status(), "failed");
    assert_eq!(resp.reason(), Some("'*sd8g88**' failed because of Invalid expression"));

    let resp = one(scrape(json!({"name": "v", "xpath": "//p[3]"}), Request::new().input(html)));
    assert_eq!(resp.status(), "failed");
    assert_eq!(resp.reason(), Some("No matches for '//p[3]', evaluated to '//p[3]'"));
}

#[test]
fn dict_carries_status_and_scope() {
    let resp = one(scrape(
        json!({"find": "a", "name": "letter", "description": "first letter", "match": 0}),
        Request::new().input("abc").uri("/base/"),
    ));
    let d = resp.as_dict();
    assert_eq!(d["status"], json!("found"));
    assert_eq!(d["uri"], json!("/base/"));
    assert_eq!(d["description"], json!("first letter"));
    assert_eq!(d["tags"], json!({"letter": "a"}));
    assert_eq!(d["results"], json!([{"value": "a"}]));
}
