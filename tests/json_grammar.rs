// tests/json_grammar.rs
//
// A JSON grammar built entirely from the public API, checked against
// serde_json as an oracle. This is the engine used the way a downstream
// grammar author would use it: separator helpers composed in client code,
// namespaces per composite rule, transforms shaping records into values.

use serde_json::Value as JsonValue;
use trellis::value::{Record, Value};
use trellis::{
    alternation, capture, literal, namespace, one_or_more, pattern, recursive, sequence,
    zero_or_more, EngineError, Grammar, Parser, Status,
};

fn pat(expr: &str) -> Grammar {
    pattern(expr).expect("pattern should compile")
}

fn second_of_pair(value: Value) -> Value {
    match value.into_pair() {
        Some((_, second)) => second,
        None => Value::Nil,
    }
}

fn take_label(value: Value, label: &str) -> Result<Value, EngineError> {
    let mut record = value
        .into_record()
        .ok_or_else(|| EngineError::transform("expected a record"))?;
    record.take(label)
}

// ---
// Separator helpers, composed client-side
// ---

fn sep_by1(content: Grammar, separator: Grammar) -> Grammar {
    let single = content.clone().map(|item| Value::List(vec![item]));
    let another = sequence(separator, content.clone()).map(second_of_pair);
    let multi = sequence(content, one_or_more(another)).map(|value| match value.into_pair() {
        Some((head, rest)) => {
            let mut items = vec![head];
            if let Some(tail) = rest.into_list() {
                items.extend(tail);
            }
            Value::List(items)
        }
        None => Value::Nil,
    });
    alternation([multi, single])
}

fn sep_by(content: Grammar, separator: Grammar) -> Grammar {
    alternation([
        sep_by1(content, separator),
        literal("").map(|_| Value::List(vec![])),
    ])
}

// ---
// JSON rules
// ---

fn json_ws() -> Grammar {
    pat(r"[ \n\r\t]*")
}

fn json_sep() -> Grammar {
    json_ws().then(literal(",")).then(json_ws())
}

fn escape(text: &'static str, replacement: &'static str) -> Grammar {
    literal(text).map(move |_| Value::String(replacement.to_string()))
}

fn json_char() -> Grammar {
    let unicode = sequence(literal("\\u"), pat("[a-zA-Z0-9]{4}")).try_map(|value| {
        let (_, hex) = value
            .into_pair()
            .ok_or_else(|| EngineError::transform("expected a pair"))?;
        let hex = hex
            .into_string()
            .ok_or_else(|| EngineError::transform("expected text"))?;
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| EngineError::transform("invalid unicode escape"))?;
        let ch = char::from_u32(code)
            .ok_or_else(|| EngineError::transform("invalid unicode escape"))?;
        Ok(Value::String(ch.to_string()))
    });

    let escaped = alternation([
        escape("\\\"", "\""),
        escape("\\\\", "\\"),
        escape("\\/", "/"),
        escape("\\b", "\u{0008}"),
        escape("\\n", "\n"),
        escape("\\r", "\r"),
        escape("\\t", "\t"),
        unicode,
    ]);
    let unescaped = pat(r#"[^"\\]+"#);
    alternation([escaped, unescaped])
}

fn json_string() -> Grammar {
    namespace(
        literal("\"")
            .then(capture("value", zero_or_more(json_char())))
            .then(literal("\"")),
    )
    .try_map(|value| {
        let chunks = take_label(value, "value")?
            .into_list()
            .ok_or_else(|| EngineError::transform("expected a list of chunks"))?;
        let mut text = String::new();
        for chunk in chunks {
            match chunk.as_str() {
                Some(piece) => text.push_str(piece),
                None => return Err(EngineError::transform("expected text chunks")),
            }
        }
        Ok(Value::String(text))
    })
}

fn json_number() -> Grammar {
    // JSON forbids a leading zero, so the integer part starts at [1-9].
    namespace(
        capture("int", pat("[1-9][0-9]*"))
            .then(capture("frac", pat(r"(\.[0-9]+)?")))
            .then(capture("exp", pat("([eE][+-]?[0-9]+)?"))),
    )
    .try_map(|value| {
        let record = value
            .into_record()
            .ok_or_else(|| EngineError::transform("expected a record"))?;
        let mut text = String::new();
        for label in ["int", "frac", "exp"] {
            match record.require(label)?.as_str() {
                Some(chunk) => text.push_str(chunk),
                None => return Err(EngineError::transform("expected captured text")),
            }
        }
        let number: f64 = text
            .parse()
            .map_err(|_| EngineError::transform("invalid number"))?;
        Ok(Value::Number(number))
    })
}

fn json_value() -> Grammar {
    recursive(|value| {
        let array = namespace(
            literal("[")
                .then(json_ws())
                .then(capture("items", sep_by(value.clone(), json_sep())))
                .then(json_ws())
                .then(literal("]")),
        )
        .try_map(|v| take_label(v, "items"));

        let pair = namespace(
            capture("key", json_string())
                .then(json_ws())
                .then(literal(":"))
                .then(json_ws())
                .then(capture("value", value.clone())),
        )
        .try_map(|v| {
            let mut record = v
                .into_record()
                .ok_or_else(|| EngineError::transform("expected a record"))?;
            let key = record.take("key")?;
            let val = record.take("value")?;
            Ok(Value::Pair(Box::new((key, val))))
        });

        let pairs = sep_by(pair, json_sep()).try_map(|v| {
            let entries = v
                .into_list()
                .ok_or_else(|| EngineError::transform("expected a list of pairs"))?;
            let mut object = Record::new();
            for entry in entries {
                let (key, val) = entry
                    .into_pair()
                    .ok_or_else(|| EngineError::transform("expected a pair"))?;
                let key = key
                    .into_string()
                    .ok_or_else(|| EngineError::transform("expected a text key"))?;
                object.insert(key, val);
            }
            Ok(Value::Record(object))
        });

        let object = namespace(
            literal("{")
                .then(json_ws())
                .then(capture("object", pairs))
                .then(json_ws())
                .then(literal("}")),
        )
        .try_map(|v| take_label(v, "object"));

        let json_true = literal("true").map(|_| Value::Bool(true));
        let json_false = literal("false").map(|_| Value::Bool(false));
        let json_null = literal("null").map(|_| Value::Nil);

        let core = alternation([
            json_true,
            json_false,
            json_null,
            json_number(),
            json_string(),
            array,
            object,
        ]);

        namespace(json_ws().then(capture("value", core)).then(json_ws()))
            .try_map(|v| take_label(v, "value"))
    })
}

// ---
// Oracle comparison
// ---

fn assert_matches_serde(ours: &Value, expected: &JsonValue, input: &str) {
    match (ours, expected) {
        (Value::Nil, JsonValue::Null) => {}
        (Value::Bool(a), JsonValue::Bool(b)) => assert_eq!(a, b, "input: {input}"),
        (Value::Number(a), JsonValue::Number(b)) => {
            let b = b.as_f64().expect("oracle number should fit in f64");
            assert_eq!(*a, b, "input: {input}");
        }
        (Value::String(a), JsonValue::String(b)) => assert_eq!(a, b, "input: {input}"),
        (Value::List(items), JsonValue::Array(expected_items)) => {
            assert_eq!(items.len(), expected_items.len(), "input: {input}");
            for (item, expected_item) in items.iter().zip(expected_items) {
                assert_matches_serde(item, expected_item, input);
            }
        }
        (Value::Record(record), JsonValue::Object(map)) => {
            assert_eq!(record.len(), map.len(), "input: {input}");
            for (label, item) in record.iter() {
                let expected_item = map
                    .get(label)
                    .unwrap_or_else(|| panic!("unexpected key '{label}' for input: {input}"));
                assert_matches_serde(item, expected_item, input);
            }
        }
        (ours, expected) => panic!("value mismatch for {input}: {ours:?} vs {expected:?}"),
    }
}

// ---
// Tests
// ---

#[test]
fn test_json_documents_match_the_oracle() {
    let documents = vec![
        r#""hi""#,
        "true",
        "false",
        "null",
        "  \r\t true     \n",
        "2",
        "3.1",
        "4",
        "102.5e-3",
        "3.0140E-1",
        r#"[[1,["a"]],2]"#,
        "[ ]",
        "[[], []]",
        "{}",
        r#"{"a":1,"b":[{},{}]}"#,
    ];

    let grammar = json_value();
    let parser = Parser::new();

    for document in documents {
        let outcome = parser
            .parse(&grammar, document)
            .expect("parse should not be fatal");
        assert_eq!(outcome.status, Status::Success, "input: {document}");
        assert_eq!(outcome.index, document.len(), "input: {document}");

        let expected: JsonValue =
            serde_json::from_str(document).expect("oracle should accept the document");
        assert_matches_serde(&outcome.into_value(), &expected, document);
    }
}

#[test]
fn test_json_composite_document() {
    let document = r#"{ "name": "trellis", "tags": ["parser", "combinator"], "nested": { "depth": 2, "ok": true, "none": null }, "scores": [1, 2.5, 3.0140E-1] }"#;

    let outcome = Parser::new()
        .parse(&json_value(), document)
        .expect("parse should not be fatal");
    assert_eq!(outcome.status, Status::Success);
    assert_eq!(outcome.index, document.len());

    let expected: JsonValue = serde_json::from_str(document).expect("oracle should accept");
    assert_matches_serde(&outcome.into_value(), &expected, document);
}

#[test]
fn test_json_string_escapes() {
    let document = r#""a\"b\\c\/d\be\nf\rg\th""#;
    let outcome = Parser::new()
        .parse(&json_string(), document)
        .expect("parse should not be fatal");
    assert_eq!(outcome.index, document.len());
    assert_eq!(
        outcome.value,
        Some(Value::String("a\"b\\c/d\u{0008}e\nf\rg\th".to_string()))
    );
}

#[test]
fn test_json_unicode_escapes() {
    let document = r#""Aé!""#;
    let outcome = Parser::new()
        .parse(&json_string(), document)
        .expect("parse should not be fatal");
    assert_eq!(outcome.index, document.len());
    assert_eq!(outcome.value, Some(Value::String("Aé!".to_string())));
}

#[test]
fn test_json_rejects_leading_zero() {
    // Numbers may not start with 0, a guard JSON inherits against octal.
    let outcome = Parser::new()
        .parse(&json_value(), "03.14")
        .expect("parse should not be fatal");
    assert_eq!(outcome.status, Status::Failure);
}

#[test]
fn test_json_grammar_is_reusable_across_documents() {
    let grammar = json_value();
    let parser = Parser::new();

    let first = parser
        .parse(&grammar, r#"{"a":1}"#)
        .expect("parse should not be fatal");
    let second = parser
        .parse(&grammar, "[true]")
        .expect("parse should not be fatal");

    let record = first
        .into_value()
        .into_record()
        .expect("object should yield a record");
    assert_eq!(record.len(), 1);
    assert_eq!(record.get("a"), Some(&Value::Number(1.0)));

    assert_eq!(
        second.into_value(),
        Value::List(vec![Value::Bool(true)])
    );
}
