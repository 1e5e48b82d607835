//! End-to-end smoke tests over the public crate API, one per worked
//! scenario: each grammar lexes, parses, and folds into an AST exactly the
//! way a caller assembling this toolkit from scratch would exercise it.

use frontend_toolkit::grammars::{arithmetic, jack, json, regex};
use frontend_toolkit::nfa::NfaArena;

#[test]
fn arithmetic_scenario_folds_and_evaluates() {
    let mut out = arithmetic::parse("1 + 2 + 4");
    assert!(out.is_ok(), "{}", out.errors);
    let ast = arithmetic::to_ast(&mut out.root);
    assert_eq!(ast.value, arithmetic::Ast::Plus);
    assert_eq!(ast.children.len(), 3);
    assert_eq!(arithmetic::eval(&ast), 7);
}

#[test]
fn regex_simple_literal_scenario() {
    let mut out = regex::parse("abc");
    assert!(out.is_ok(), "{}", out.errors);
    let ast = regex::to_ast(&mut out.root);
    assert_eq!(ast.value, regex::Ast::Concat);
    assert_eq!(ast.children.len(), 3);
}

#[test]
fn regex_alternation_class_and_star_scenario() {
    let mut out = regex::parse("abc|[d-f]*");
    assert!(out.is_ok(), "{}", out.errors);
    let ast = regex::to_ast(&mut out.root);
    let mut arena = NfaArena::new();
    assert!(regex::to_nfa(&mut arena, &ast).is_ok());
}

#[test]
fn regex_invalid_range_scenario_is_a_semantic_error_not_a_parse_error() {
    let mut out = regex::parse("[z-a]");
    assert!(out.is_ok(), "{}", out.errors);
    let ast = regex::to_ast(&mut out.root);
    let mut arena = NfaArena::new();
    assert!(regex::to_nfa(&mut arena, &ast).is_err());
}

#[test]
fn json_scenario_nests_object_and_array() {
    let mut out = json::parse(r#"{"k":[1,2,3]}"#);
    assert!(out.is_ok(), "{}", out.errors);
    let ast = json::to_ast(&mut out.root);
    assert_eq!(ast.value, json::Ast::Object);
    assert_eq!(ast.children.len(), 1);
    assert_eq!(ast.children[0].value, json::Ast::Pair("k".to_string()));
    assert_eq!(ast.children[0].children[0].value, json::Ast::Array);
    assert_eq!(ast.children[0].children[0].children.len(), 3);
}

#[test]
fn jack_scenario_parses_minimal_class() {
    let mut out = jack::parse("class Foo { function void main() { return; } }");
    assert!(out.is_ok(), "{}", out.errors);
    let ast = jack::to_ast(&mut out.root);
    assert_eq!(ast.value, jack::Ast::Class("Foo".to_string()));
    assert_eq!(ast.children.len(), 1);
}
