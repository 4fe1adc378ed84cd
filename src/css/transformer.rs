//! CSS to XPath translation
//!
//! Lowers a parsed [`SelectorList`] into the XPath AST the XPath parser
//! produces for the equivalent hand-written expression, so both backends
//! run CSS queries unchanged.
//!
//! | CSS                 | XPath                                                  |
//! |---------------------|--------------------------------------------------------|
//! | `a b`               | `a/descendant-or-self::*/b`                            |
//! | `a > b`             | `a/b`                                                  |
//! | `.c`, `#i`          | `*[@class = "c"]`, `*[@id = "i"]`                      |
//! | `:first-child`      | `*[count(preceding-sibling::*) = 0]`                   |
//! | `:nth-child(an+b)`  | arithmetic over `count(preceding-sibling::*) + 1`      |
//! | `a, b`              | `a \| b`                                               |

use std::sync::Arc;

use super::parser::{
    AttributeOperator, AttributeSelector, Combinator, ComplexSelector, CompoundSelector, NamePart,
    Nth, PseudoClass, SelectorList, SimpleSelector, TypeSelector,
};
use crate::xpath::ast::{Axis, BinaryOp, Expr, NodeTest};

/// Translate a selector group into one XPath expression
pub fn transform(list: &SelectorList) -> Expr {
    let mut selectors = list.0.iter().map(transform_complex);
    let first = selectors.next().unwrap_or_else(|| Expr::RelativePath(Vec::new()));
    selectors.fold(first, |left, right| Expr::Union(Arc::new(left), Arc::new(right)))
}

fn transform_complex(selector: &ComplexSelector) -> Expr {
    let mut parts = vec![Arc::new(transform_compound(Axis::Child, &selector.head))];
    for (combinator, compound) in &selector.tail {
        if *combinator == Combinator::Descendant {
            parts.push(Arc::new(Expr::step(Axis::DescendantOrSelf, NodeTest::Any)));
        }
        parts.push(Arc::new(transform_compound(Axis::Child, compound)));
    }
    Expr::RelativePath(parts)
}

/// One location step on `axis` carrying every filter of the compound as a predicate
fn transform_compound(axis: Axis, compound: &CompoundSelector) -> Expr {
    let test = element_test(compound.element.as_ref());
    compound
        .filters
        .iter()
        .map(|filter| transform_filter(filter, &test))
        .fold(Expr::step(axis, test.clone()), |step, predicate| {
            step.push_child(Arc::new(predicate))
        })
}

fn element_test(element: Option<&TypeSelector>) -> NodeTest {
    match element {
        None => NodeTest::Any,
        Some(TypeSelector { namespace, name }) => name_test(namespace.as_ref(), name),
    }
}

fn name_test(namespace: Option<&NamePart>, name: &NamePart) -> NodeTest {
    match (namespace, name) {
        (None | Some(NamePart::Any), NamePart::Any) => NodeTest::Any,
        (None, NamePart::Name(local)) => NodeTest::Name(local.clone()),
        (Some(NamePart::Any), NamePart::Name(local)) => NodeTest::LocalWildcard(local.clone()),
        (Some(NamePart::Name(prefix)), NamePart::Any) => NodeTest::NamespaceWildcard(prefix.clone()),
        (Some(NamePart::Name(prefix)), NamePart::Name(local)) => {
            NodeTest::QName(prefix.clone(), local.clone())
        }
    }
}

/// Predicate for one simple selector. `element` is the compound's own
/// node test, used by the `*-of-type` pseudo-classes.
fn transform_filter(filter: &SimpleSelector, element: &NodeTest) -> Expr {
    match filter {
        SimpleSelector::Class(name) => attribute_equals("class", name),
        SimpleSelector::Id(id) => attribute_equals("id", id),
        SimpleSelector::Attribute(attr) => transform_attribute(attr),
        SimpleSelector::PseudoClass(pseudo) => transform_pseudo_class(pseudo, element),
    }
}

fn path(axis: Axis, test: NodeTest) -> Expr {
    Expr::RelativePath(vec![Arc::new(Expr::step(axis, test))])
}

fn string(value: &str) -> Expr {
    Expr::String(value.to_string())
}

fn number(value: i64) -> Expr {
    Expr::Number(value as f64)
}

fn attribute_equals(name: &str, value: &str) -> Expr {
    Expr::binary(
        BinaryOp::Eq,
        path(Axis::Attribute, NodeTest::Name(name.to_string())),
        string(value),
    )
}

fn transform_attribute(attr: &AttributeSelector) -> Expr {
    let test = name_test(attr.namespace.as_ref(), &NamePart::Name(attr.name.clone()));
    let attribute = || path(Axis::Attribute, test.clone());

    let Some((op, value)) = &attr.matcher else {
        return attribute();
    };

    match op {
        AttributeOperator::Equals => Expr::binary(BinaryOp::Eq, attribute(), string(value)),
        AttributeOperator::Includes => Expr::call(
            "contains",
            vec![
                Expr::call("concat", vec![string(" "), attribute(), string(" ")]),
                Expr::call("concat", vec![string(" "), string(value), string(" ")]),
            ],
        ),
        AttributeOperator::DashMatch => Expr::binary(
            BinaryOp::Or,
            Expr::binary(BinaryOp::Eq, attribute(), string(value)),
            Expr::call(
                "starts-with",
                vec![attribute(), Expr::call("concat", vec![string(value), string("-")])],
            ),
        ),
        AttributeOperator::Prefix => Expr::call("starts-with", vec![attribute(), string(value)]),
        AttributeOperator::Suffix => {
            // substring(@a, string-length(@a) - string-length("v") + 1) = "v"
            let start = Expr::binary(
                BinaryOp::Add,
                Expr::binary(
                    BinaryOp::Sub,
                    Expr::call("string-length", vec![attribute()]),
                    Expr::call("string-length", vec![string(value)]),
                ),
                number(1),
            );
            Expr::binary(
                BinaryOp::Eq,
                Expr::call("substring", vec![attribute(), start]),
                string(value),
            )
        }
        AttributeOperator::Substring => Expr::call("contains", vec![attribute(), string(value)]),
    }
}

fn no_siblings(axis: Axis, test: &NodeTest) -> Expr {
    Expr::binary(
        BinaryOp::Eq,
        Expr::call("count", vec![path(axis, test.clone())]),
        number(0),
    )
}

fn transform_pseudo_class(pseudo: &PseudoClass, element: &NodeTest) -> Expr {
    let any = NodeTest::Any;
    match pseudo {
        PseudoClass::Root => Expr::call("not", vec![path(Axis::Parent, NodeTest::Any)]),
        PseudoClass::Empty => Expr::call("not", vec![path(Axis::Child, NodeTest::Node)]),
        PseudoClass::FirstChild => no_siblings(Axis::PrecedingSibling, &any),
        PseudoClass::LastChild => no_siblings(Axis::FollowingSibling, &any),
        PseudoClass::OnlyChild => Expr::binary(
            BinaryOp::And,
            no_siblings(Axis::PrecedingSibling, &any),
            no_siblings(Axis::FollowingSibling, &any),
        ),
        PseudoClass::FirstOfType => no_siblings(Axis::PrecedingSibling, element),
        PseudoClass::LastOfType => no_siblings(Axis::FollowingSibling, element),
        PseudoClass::OnlyOfType => Expr::binary(
            BinaryOp::And,
            no_siblings(Axis::PrecedingSibling, element),
            no_siblings(Axis::FollowingSibling, element),
        ),
        PseudoClass::NthChild(nth) => nth_predicate(*nth, Axis::PrecedingSibling, &any),
        PseudoClass::NthLastChild(nth) => nth_predicate(*nth, Axis::FollowingSibling, &any),
        PseudoClass::NthOfType(nth) => nth_predicate(*nth, Axis::PrecedingSibling, element),
        PseudoClass::NthLastOfType(nth) => nth_predicate(*nth, Axis::FollowingSibling, element),
        PseudoClass::Not(inner) => {
            let step = transform_compound(Axis::Self_, inner);
            Expr::call("not", vec![Expr::RelativePath(vec![Arc::new(step)])])
        }
    }
}

/// `an+b` over the 1-based sibling position `p = count(<axis>::<test>) + 1`.
///
/// - `a = 0`: `p = b`
/// - `a > 0`: `p >= b and (p - b) mod a = 0`
/// - `a < 0`: `p <= b and (p - b) mod -a = 0`
fn nth_predicate(nth: Nth, axis: Axis, test: &NodeTest) -> Expr {
    let position = || {
        Expr::binary(
            BinaryOp::Add,
            Expr::call("count", vec![path(axis, test.clone())]),
            number(1),
        )
    };

    if nth.a == 0 {
        return Expr::binary(BinaryOp::Eq, position(), number(nth.b));
    }

    let bound = if nth.a > 0 { BinaryOp::GtEq } else { BinaryOp::LtEq };
    let offset = if nth.b < 0 {
        Expr::binary(BinaryOp::Add, position(), number(-nth.b))
    } else {
        Expr::binary(BinaryOp::Sub, position(), number(nth.b))
    };
    let step = Expr::binary(
        BinaryOp::Eq,
        Expr::binary(BinaryOp::Mod, offset, number(nth.a.abs())),
        number(0),
    );

    Expr::binary(
        BinaryOp::And,
        Expr::binary(bound, position(), number(nth.b)),
        step,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parser::parse;
    use crate::dom::fixture;
    use crate::dom::{DocumentAccess, NodeId, XmlDocument};
    use crate::error::QueryError;
    use crate::options::QueryOptions;
    use crate::xpath::{parser as xpath, Evaluator};

    fn to_xpath(css: &str) -> Expr {
        transform(&parse(css).unwrap())
    }

    fn select_from(doc: &XmlDocument, context: NodeId, css: &str, options: &QueryOptions) -> Vec<String> {
        Evaluator::new(doc, options)
            .evaluate(&to_xpath(css), context)
            .unwrap()
            .into_nodeset()
            .unwrap()
            .into_iter()
            .map(|n| doc.get_attribute(n, "id").unwrap_or("?").to_string())
            .collect()
    }

    fn select_with(doc: &XmlDocument, css: &str, options: &QueryOptions) -> Vec<String> {
        select_from(doc, doc.root_element_id().unwrap_or(0), css, options)
    }

    fn select(doc: &XmlDocument, css: &str) -> Vec<String> {
        select_with(doc, css, &QueryOptions::default())
    }

    fn four_siblings() -> XmlDocument {
        fixture::parse(r#"<r><a id="a1"/><a id="a2"/><a id="a3"/><a id="a4"/></r>"#)
    }

    #[test]
    fn test_same_shape_as_xpath() {
        let cases = [
            ("div", "div"),
            ("div > p", "div/p"),
            ("div p", "div/descendant-or-self::*/p"),
            (".x", r#"*[@class = "x"]"#),
            ("p#main", r#"p[@id = "main"]"#),
            ("a[href]", "a[@href]"),
            ("a, b", "a | b"),
            ("li:first-child", "li[count(preceding-sibling::*) = 0]"),
            ("ns|x", "ns:x"),
            ("*|x", "*:x"),
            ("ns|*", "ns:*"),
            ("p:not(.x)", r#"p[not(self::*[@class = "x"])]"#),
        ];
        for (css, expected) in cases {
            assert_eq!(to_xpath(css), xpath::parse(expected).unwrap(), "{}", css);
        }
    }

    #[test]
    fn test_class_is_whole_value_equality() {
        let doc = fixture::parse(r#"<r><x id="1" class="y"/><x id="2" class="a y"/></r>"#);
        assert_eq!(select(&doc, ".y"), ["1"]);
        assert_eq!(select(&doc, "x.y"), ["1"]);
    }

    #[test]
    fn test_nth_last_child() {
        let doc = four_siblings();
        assert_eq!(select(&doc, "a:nth-last-child(2n+2)"), ["a1", "a3"]);
        assert_eq!(select(&doc, "a:nth-last-child(odd)"), ["a2", "a4"]);
        assert_eq!(select(&doc, "a:nth-last-child(-n+2)"), ["a3", "a4"]);
    }

    #[test]
    fn test_nth_child() {
        let doc = four_siblings();
        assert_eq!(select(&doc, ":nth-child(2)"), ["a2"]);
        assert_eq!(select(&doc, ":nth-child(even)"), ["a2", "a4"]);
        assert_eq!(select(&doc, ":nth-child(n)"), ["a1", "a2", "a3", "a4"]);
        assert_eq!(select(&doc, ":nth-child(2n-1)"), ["a1", "a3"]);
        assert_eq!(select(&doc, ":nth-child(-n+3)"), ["a1", "a2", "a3"]);
        assert_eq!(select(&doc, ":nth-child(3n+5)"), Vec::<String>::new());
    }

    #[test]
    fn test_nth_extreme_coefficients() {
        let doc = four_siblings();
        assert_eq!(select(&doc, ":nth-child(-2147483648n+3)"), ["a3"]);
        assert_eq!(select(&doc, ":nth-child(2147483647n+1)"), ["a1"]);
        assert_eq!(select(&doc, ":nth-child(2147483647n-2147483648)"), Vec::<String>::new());
        assert_eq!(select(&doc, ":nth-last-child(-2147483648)"), Vec::<String>::new());
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let doc = fixture::parse(concat!(
            r#"<r><p id="p1"/><q id="q1"><z id="z1"/></q><p id="p2"/>"#,
            r#"<s id="s1"><t id="t1">text</t></s></r>"#
        ));
        assert_eq!(select(&doc, ":first-child"), ["p1"]);
        assert_eq!(select(&doc, "*:last-child"), ["s1"]);
        assert_eq!(select(&doc, "* :only-child"), ["z1", "t1"]);
        assert_eq!(select(&doc, "p:first-of-type"), ["p1"]);
        assert_eq!(select(&doc, "p:last-of-type"), ["p2"]);
        assert_eq!(select(&doc, "q:only-of-type"), ["q1"]);
        assert_eq!(select(&doc, "p:nth-of-type(2)"), ["p2"]);
        assert_eq!(select(&doc, "p:nth-last-of-type(2)"), ["p1"]);
        assert_eq!(select(&doc, ":empty"), ["p1", "p2"]);
    }

    #[test]
    fn test_root() {
        let doc = fixture::parse(r#"<r id="r"><a id="a"/></r>"#);
        let root = Evaluator::new(&doc, &QueryOptions::default())
            .evaluate(&to_xpath(":root"), doc.document_node_id())
            .unwrap();
        assert_eq!(root.into_nodeset().unwrap(), vec![doc.root_element_id().unwrap()]);
        assert!(select(&doc, ":root").is_empty());
    }

    #[test]
    fn test_attribute_operators() {
        let doc = fixture::parse(concat!(
            "<r>",
            r#"<e id="1" lang="en-US" rel="nofollow external"/>"#,
            r#"<e id="2" lang="en" rel="external"/>"#,
            r#"<e id="3" lang="english" rel="externals" title="x.png"/>"#,
            "</r>"
        ));
        assert_eq!(select(&doc, "[title]"), ["3"]);
        assert_eq!(select(&doc, "[lang=en]"), ["2"]);
        assert_eq!(select(&doc, "[lang|='en']"), ["1", "2"]);
        assert_eq!(select(&doc, "[rel~=external]"), ["1", "2"]);
        assert_eq!(select(&doc, "[lang^=en]"), ["1", "2", "3"]);
        assert_eq!(select(&doc, "[title$='.png']"), ["3"]);
        assert_eq!(select(&doc, "[rel$=nal]"), ["1", "2"]);
        assert_eq!(select(&doc, "[rel*=low]"), ["1"]);
    }

    #[test]
    fn test_combinators() {
        let doc = fixture::parse(concat!(
            r#"<r><div id="d"><p id="p1"/><span id="s"><p id="p2"/></span></div>"#,
            r#"<p id="p3"/></r>"#
        ));
        assert_eq!(select(&doc, "div p"), ["p1", "p2"]);
        assert_eq!(select(&doc, "div > p"), ["p1"]);
        assert_eq!(select(&doc, "div span > p"), ["p2"]);
        assert_eq!(select(&doc, "p, div > p"), ["p1", "p3"]);
    }

    #[test]
    fn test_leading_child_combinator() {
        let doc = fixture::parse(r#"<root id="r"><a id="a1"><a id="a2"/></a></root>"#);
        let options = QueryOptions::default();
        assert_eq!(to_xpath("> a"), to_xpath("a"));

        let a1 = doc.root_element_id().and_then(|r| doc.first_child_of(r)).unwrap();
        assert_eq!(select_from(&doc, a1, "> a", &options), ["a2"]);

        let document = doc.document_node_id();
        assert_eq!(select_from(&doc, document, "> root", &options), ["r"]);
        assert!(select_from(&doc, document, "> a", &options).is_empty());
    }

    #[test]
    fn test_not() {
        let doc = four_siblings();
        assert_eq!(select(&doc, "a:not(#a2):not(:last-child)"), ["a1", "a3"]);
        assert_eq!(select(&doc, ":not(a)"), Vec::<String>::new());
    }

    #[test]
    fn test_namespaced_selectors() {
        let doc = fixture::parse(concat!(
            r#"<r xmlns:s="urn:s"><s:a id="1"/><a id="2"/>"#,
            r#"<b id="3" s:k="v"/></r>"#
        ));
        let options = QueryOptions::new().with_namespace("n", "urn:s");
        assert_eq!(select_with(&doc, "n|a", &options), ["1"]);
        assert_eq!(select_with(&doc, "*|a", &options), ["1", "2"]);
        assert_eq!(select_with(&doc, "n|*", &options), ["1"]);
        assert_eq!(select_with(&doc, "[n|k=v]", &options), ["3"]);
    }

    #[test]
    fn test_unsupported_combinators() {
        assert!(matches!(parse("a + b"), Err(QueryError::UnsupportedFeature { .. })));
        assert!(matches!(parse("a ~ b"), Err(QueryError::UnsupportedFeature { .. })));
    }
}
