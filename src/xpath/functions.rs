//! XPath 1.0 Functions
//!
//! Implements the 27 XPath 1.0 core functions:
//!
//! Node Set Functions:
//! - last(), position(), count(), id(), local-name(), namespace-uri(), name()
//!
//! String Functions:
//! - string(), concat(), starts-with(), contains(), substring(),
//!   substring-before(), substring-after(), string-length(),
//!   normalize-space(), translate()
//!
//! Boolean Functions:
//! - boolean(), not(), true(), false(), lang()
//!
//! Number Functions:
//! - number(), sum(), floor(), ceiling(), round()

use super::conversion::{parse_number, to_boolean, to_float, to_string};
use super::eval::EvalContext;
use super::value::XPathValue;
use crate::dom::{self, DocumentAccess, NodeId, NodeKind};
use crate::error::{QueryError, Result};
use memchr::memmem;

/// A built-in function, resolved from its name once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    Substring,
    SubstringBefore,
    SubstringAfter,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "last" => Function::Last,
            "position" => Function::Position,
            "count" => Function::Count,
            "id" => Function::Id,
            "local-name" => Function::LocalName,
            "namespace-uri" => Function::NamespaceUri,
            "name" => Function::Name,
            "string" => Function::String,
            "concat" => Function::Concat,
            "starts-with" => Function::StartsWith,
            "contains" => Function::Contains,
            "substring" => Function::Substring,
            "substring-before" => Function::SubstringBefore,
            "substring-after" => Function::SubstringAfter,
            "string-length" => Function::StringLength,
            "normalize-space" => Function::NormalizeSpace,
            "translate" => Function::Translate,
            "boolean" => Function::Boolean,
            "not" => Function::Not,
            "true" => Function::True,
            "false" => Function::False,
            "lang" => Function::Lang,
            "number" => Function::Number,
            "sum" => Function::Sum,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            "round" => Function::Round,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Last => "last",
            Function::Position => "position",
            Function::Count => "count",
            Function::Id => "id",
            Function::LocalName => "local-name",
            Function::NamespaceUri => "namespace-uri",
            Function::Name => "name",
            Function::String => "string",
            Function::Concat => "concat",
            Function::StartsWith => "starts-with",
            Function::Contains => "contains",
            Function::Substring => "substring",
            Function::SubstringBefore => "substring-before",
            Function::SubstringAfter => "substring-after",
            Function::StringLength => "string-length",
            Function::NormalizeSpace => "normalize-space",
            Function::Translate => "translate",
            Function::Boolean => "boolean",
            Function::Not => "not",
            Function::True => "true",
            Function::False => "false",
            Function::Lang => "lang",
            Function::Number => "number",
            Function::Sum => "sum",
            Function::Floor => "floor",
            Function::Ceiling => "ceiling",
            Function::Round => "round",
        }
    }

    /// Accepted argument counts, `None` meaning unlimited
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Function::Last | Function::Position | Function::True | Function::False => (0, Some(0)),
            Function::LocalName
            | Function::NamespaceUri
            | Function::Name
            | Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number => (0, Some(1)),
            Function::Count
            | Function::Id
            | Function::Boolean
            | Function::Not
            | Function::Lang
            | Function::Sum
            | Function::Floor
            | Function::Ceiling
            | Function::Round => (1, Some(1)),
            Function::StartsWith
            | Function::Contains
            | Function::SubstringBefore
            | Function::SubstringAfter => (2, Some(2)),
            Function::Substring => (2, Some(3)),
            Function::Translate => (3, Some(3)),
            Function::Concat => (2, None),
        }
    }

    fn check_arity(self, given: usize) -> Result<()> {
        let (min, max) = self.arity();
        if given >= min && max.is_none_or(|max| given <= max) {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min => format!("exactly {}", min),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        Err(QueryError::arguments(
            self.name(),
            format!("expected {} argument(s), got {}", expected, given),
        ))
    }

    /// Evaluate with already-evaluated arguments
    pub fn call<D: DocumentAccess + ?Sized>(
        self,
        args: Vec<XPathValue>,
        ctx: &EvalContext<'_, D>,
    ) -> Result<XPathValue> {
        self.check_arity(args.len())?;
        let doc = ctx.doc;

        let value = match self {
            // Node Set Functions
            Function::Last => XPathValue::Number(ctx.context_size as f64),
            Function::Position => XPathValue::Number(ctx.context_position as f64),
            Function::Count => XPathValue::Number(nodeset_arg(args, 0)?.len() as f64),
            Function::Id => XPathValue::NodeSet(fn_id(doc, &args[0])),
            Function::LocalName => {
                let name = match target_node(self, args, ctx)? {
                    Some(node) => doc.node_local_name(node).unwrap_or("").to_string(),
                    None => String::new(),
                };
                XPathValue::String(name)
            }
            Function::NamespaceUri => {
                let uri = match target_node(self, args, ctx)? {
                    Some(node) => doc.node_namespace_uri(node).unwrap_or("").to_string(),
                    None => String::new(),
                };
                XPathValue::String(uri)
            }
            Function::Name => {
                let name = match target_node(self, args, ctx)? {
                    Some(node) => doc.node_name(node).map(|n| n.into_owned()).unwrap_or_default(),
                    None => String::new(),
                };
                XPathValue::String(name)
            }

            // String Functions
            Function::String => XPathValue::String(string_arg_or_context(&args, ctx)),
            Function::Concat => {
                XPathValue::String(args.iter().map(|a| to_string(doc, a)).collect())
            }
            Function::StartsWith => {
                let (s, prefix) = string_pair(doc, &args);
                XPathValue::Boolean(s.starts_with(&prefix))
            }
            Function::Contains => {
                let (s, pattern) = string_pair(doc, &args);
                XPathValue::Boolean(memmem::find(s.as_bytes(), pattern.as_bytes()).is_some())
            }
            Function::Substring => XPathValue::String(fn_substring(doc, &args)),
            Function::SubstringBefore => {
                let (s, pattern) = string_pair(doc, &args);
                let result = match memmem::find(s.as_bytes(), pattern.as_bytes()) {
                    Some(pos) => s[..pos].to_string(),
                    None => String::new(),
                };
                XPathValue::String(result)
            }
            Function::SubstringAfter => {
                let (s, pattern) = string_pair(doc, &args);
                let result = match memmem::find(s.as_bytes(), pattern.as_bytes()) {
                    Some(pos) => s[pos + pattern.len()..].to_string(),
                    None => String::new(),
                };
                XPathValue::String(result)
            }
            Function::StringLength => {
                XPathValue::Number(string_arg_or_context(&args, ctx).chars().count() as f64)
            }
            Function::NormalizeSpace => {
                let s = string_arg_or_context(&args, ctx);
                XPathValue::String(s.split_ascii_whitespace().collect::<Vec<_>>().join(" "))
            }
            Function::Translate => XPathValue::String(fn_translate(doc, &args)),

            // Boolean Functions
            Function::Boolean => XPathValue::Boolean(to_boolean(&args[0])),
            Function::Not => XPathValue::Boolean(!to_boolean(&args[0])),
            Function::True => XPathValue::Boolean(true),
            Function::False => XPathValue::Boolean(false),
            Function::Lang => XPathValue::Boolean(fn_lang(doc, &to_string(doc, &args[0]), ctx.context_node)),

            // Number Functions
            Function::Number => match args.first() {
                Some(arg) => XPathValue::Number(to_float(doc, arg)),
                None => XPathValue::Number(parse_number(&dom::node_string_value(doc, ctx.context_node))),
            },
            Function::Sum => {
                let total = nodeset_arg(args, 0)?
                    .into_iter()
                    .map(|node| parse_number(&dom::node_string_value(doc, node)))
                    .sum();
                XPathValue::Number(total)
            }
            Function::Floor => XPathValue::Number(to_float(doc, &args[0]).floor()),
            Function::Ceiling => XPathValue::Number(to_float(doc, &args[0]).ceil()),
            Function::Round => XPathValue::Number(xpath_round(to_float(doc, &args[0]))),
        };
        Ok(value)
    }
}

/// XPath `round()`: halves go towards positive infinity
pub fn xpath_round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

fn nodeset_arg(args: Vec<XPathValue>, index: usize) -> Result<Vec<NodeId>> {
    args.into_iter().nth(index).unwrap_or_default().into_nodeset()
}

/// First node of the optional node-set argument, else the context node
fn target_node<D: DocumentAccess + ?Sized>(
    function: Function,
    args: Vec<XPathValue>,
    ctx: &EvalContext<'_, D>,
) -> Result<Option<NodeId>> {
    match args.into_iter().next() {
        None => Ok(Some(ctx.context_node)),
        Some(XPathValue::NodeSet(nodes)) => Ok(nodes.first().copied()),
        Some(other) => {
            log::debug!("{}() given a {}", function.name(), other.type_name());
            Err(QueryError::TypeCoercion {
                expected: "node-set",
                found: other.type_name(),
            })
        }
    }
}

fn string_arg_or_context<D: DocumentAccess + ?Sized>(args: &[XPathValue], ctx: &EvalContext<'_, D>) -> String {
    match args.first() {
        Some(arg) => to_string(ctx.doc, arg),
        None => dom::node_string_value(ctx.doc, ctx.context_node),
    }
}

fn string_pair<D: DocumentAccess + ?Sized>(doc: &D, args: &[XPathValue]) -> (String, String) {
    (to_string(doc, &args[0]), to_string(doc, &args[1]))
}

/// Elements whose `id` attribute equals one of the whitespace-separated tokens
fn fn_id<D: DocumentAccess + ?Sized>(doc: &D, arg: &XPathValue) -> Vec<NodeId> {
    let text = match arg {
        XPathValue::NodeSet(nodes) => nodes
            .iter()
            .map(|&n| dom::node_string_value(doc, n))
            .collect::<Vec<_>>()
            .join(" "),
        other => to_string(doc, other),
    };
    let tokens: Vec<&str> = text.split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    doc.descendants_vec(doc.document_node_id())
        .into_iter()
        .filter(|&node| doc.node_kind_of(node) == NodeKind::Element)
        .filter(|&node| doc.get_attribute(node, "id").is_some_and(|id| tokens.contains(&id)))
        .collect()
}

/// Characters at positions p with round(start) <= p < round(start) + round(len)
fn fn_substring<D: DocumentAccess + ?Sized>(doc: &D, args: &[XPathValue]) -> String {
    let s = to_string(doc, &args[0]);
    let start = xpath_round(to_float(doc, &args[1]));
    let end = match args.get(2) {
        Some(len) => start + xpath_round(to_float(doc, len)),
        None => f64::INFINITY,
    };

    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let position = (i + 1) as f64;
            position >= start && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn fn_translate<D: DocumentAccess + ?Sized>(doc: &D, args: &[XPathValue]) -> String {
    let s = to_string(doc, &args[0]);
    let from: Vec<char> = to_string(doc, &args[1]).chars().collect();
    let to: Vec<char> = to_string(doc, &args[2]).chars().collect();

    s.chars()
        .filter_map(|c| match from.iter().position(|&fc| fc == c) {
            Some(pos) => to.get(pos).copied(),
            None => Some(c),
        })
        .collect()
}

/// Nearest `xml:lang` on the node or its ancestors, matched case-insensitively
/// either exactly or as a subtag prefix (`en` matches `en-US`)
fn fn_lang<D: DocumentAccess + ?Sized>(doc: &D, target: &str, context: NodeId) -> bool {
    let target_lang = target.to_lowercase();

    let mut node = Some(context);
    while let Some(current) = node {
        if let Some(lang_val) = doc.get_attribute(current, "xml:lang") {
            let lang_lower = lang_val.to_lowercase();
            return lang_lower == target_lang
                || (lang_lower.starts_with(&target_lang)
                    && lang_lower.as_bytes().get(target_lang.len()) == Some(&b'-'));
        }
        node = doc.parent_of(current);
    }
    false
}
