// Integration tests for message entities
// Tests cover: views, header sync, push/pop, JSON ordering, decode failures

use std::io::Read;

use bytes::Bytes;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use serde::Deserialize;
use trunkrs::{BodyError, BufferFactory, Charset, EntityState, Message, ReaderSource};

// ============================================================================
// Byte, String and JSON Views
// ============================================================================

#[test]
fn test_set_bytes_get_bytes() {
    let mut message = Message::new();
    let data = Bytes::from_static(b"\x00\x01binary\xff");
    message.entity_mut().set_bytes(data.clone()).unwrap();

    assert_eq!(message.entity().get_bytes().unwrap(), data);
    assert_eq!(message.headers().content_length(), Some(data.len() as u64));
    let raw_length = message
        .headers()
        .borrow()
        .get("content-length")
        .map(|v| v.to_str().unwrap().to_owned());
    assert_eq!(raw_length.as_deref(), Some("9"));
}

#[test]
fn test_json_keeps_insertion_order() {
    let mut message = Message::new();
    message
        .entity_mut()
        .set_bytes(&br#"{"a":1,"b":2}"#[..])
        .unwrap();

    let json = message.entity().get_json().unwrap().unwrap();
    let entries: Vec<(String, i64)> = json
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), v.as_i64().unwrap()))
        .collect();
    assert_eq!(entries, vec![("a".to_owned(), 1), ("b".to_owned(), 2)]);

    let reordered = r#"{"z":0,"a":1}"#;
    message.entity_mut().set_string(reordered).unwrap();
    let json = message.entity().get_json().unwrap().unwrap();
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["z", "a"]);
}

#[test]
fn test_invalid_json_leaves_content_readable() {
    let mut message = Message::new();
    message.entity_mut().set_string("{not json").unwrap();

    let err = message.entity().get_json().unwrap_err();
    assert!(matches!(err, BodyError::Decode(_)));
    assert_eq!(message.entity().get_string().unwrap(), "{not json");
}

#[test]
fn test_typed_json() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Token {
        sub: String,
        exp: u64,
    }

    let mut message = Message::new();
    message
        .entity_mut()
        .set_json(&serde_json::json!({"sub": "alice", "exp": 60}))
        .unwrap();

    let token: Token = message.entity().get_json_as().unwrap().unwrap();
    assert_eq!(
        token,
        Token {
            sub: "alice".into(),
            exp: 60
        }
    );
    assert!(message.entity().get_json_as::<Vec<u8>>().unwrap_err().is_decode());
}

#[test]
fn test_unsupported_charset_is_decode_error() {
    let mut message = Message::new();
    message.entity_mut().set_bytes(&b"text"[..]).unwrap();
    message
        .headers()
        .borrow_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=koi8-r"));

    assert!(message.entity().get_string().unwrap_err().is_decode());
    // bytes are still there, and an explicit charset still works
    assert_eq!(message.entity().get_bytes().unwrap().as_ref(), b"text");
    let mut reader = message
        .entity()
        .new_decoded_content_reader(Some(Charset::UsAscii))
        .unwrap();
    assert_eq!(reader.read_to_string().unwrap(), "text");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_pristine_and_set_json_empty_object() {
    let mut message = Message::new();
    assert_eq!(message.entity().state(), EntityState::Pristine);
    assert!(!message.entity().may_contain_data());
    assert!(message.entity().get_bytes().unwrap().is_empty());
    assert_eq!(message.entity().get_json().unwrap(), None);

    message
        .entity_mut()
        .set_json(&serde_json::Map::new())
        .unwrap();
    assert!(message.entity().may_contain_data());
    assert_eq!(message.entity().state(), EntityState::Set);
    assert_eq!(message.headers().content_length(), Some(2));
    assert_eq!(
        message
            .headers()
            .borrow()
            .get(CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap(),
        "application/json; charset=UTF-8"
    );
}

#[test]
fn test_set_empty() {
    let mut message = Message::new();
    message.entity_mut().set_empty().unwrap();
    assert!(message.entity().may_contain_data());
    assert_eq!(message.headers().content_length(), Some(0));
    assert_eq!(message.entity().get_json().unwrap(), None);
}

#[test]
fn test_unknown_length_stream() {
    let mut message = Message::new();
    message.entity_mut().set_bytes(&b"12345"[..]).unwrap();
    message
        .entity_mut()
        .set_stream(ReaderSource::new(std::io::repeat(b'z').take(3)), None)
        .unwrap();

    assert_eq!(message.headers().content_length(), None);
    assert_eq!(message.entity().get_string().unwrap(), "zzz");
}

// ============================================================================
// Push / Pop
// ============================================================================

#[test]
fn test_push_pop_restores_body() {
    let mut message = Message::new();
    message.entity_mut().set_string("original body").unwrap();

    let entity = message.entity_mut();
    entity.push().unwrap();
    assert_eq!(entity.state(), EntityState::Pushed(1));

    // consume the pushed branch entirely
    let mut consumed = String::new();
    entity
        .raw_content_stream_mut()
        .read_to_string(&mut consumed)
        .unwrap();
    assert_eq!(consumed, "original body");

    entity.pop().unwrap();
    assert_eq!(entity.state(), EntityState::Set);
    assert_eq!(entity.get_string().unwrap(), "original body");
}

#[test]
fn test_push_pop_identity_after_partial_read() {
    let mut message = Message::new();
    let entity = message.entity_mut();
    entity.set_bytes(&b"0123456789"[..]).unwrap();

    let mut head = [0u8; 3];
    entity.raw_content_stream_mut().read_exact(&mut head).unwrap();
    let before = entity.get_bytes().unwrap();

    entity.push().unwrap();
    entity.pop().unwrap();

    assert_eq!(entity.get_bytes().unwrap(), before);
    assert_eq!(before.as_ref(), b"3456789");
}

#[test]
fn test_nested_push_with_replacement() {
    let mut message = Message::new();
    message.entity_mut().set_string("outer").unwrap();

    let entity = message.entity_mut();
    entity.push().unwrap();
    entity.set_string("middle").unwrap();
    entity.push().unwrap();
    assert_eq!(entity.state(), EntityState::Pushed(2));
    entity.set_string("inner").unwrap();
    assert_eq!(entity.state(), EntityState::Set);
    assert_eq!(entity.depth(), 2);
    assert_eq!(entity.get_string().unwrap(), "inner");

    entity.pop().unwrap();
    assert_eq!(entity.get_string().unwrap(), "middle");
    entity.pop().unwrap();
    assert_eq!(entity.get_string().unwrap(), "outer");
    assert!(matches!(entity.pop(), Err(BodyError::IllegalPushPop)));
}

// ============================================================================
// Branch Ownership
// ============================================================================

#[test]
fn test_decoded_stream_is_independent() {
    let mut message = Message::new();
    message.entity_mut().set_string("log and forward").unwrap();

    let mut log = message.entity().new_decoded_content_stream().unwrap();
    let mut logged = String::new();
    log.read_to_string(&mut logged).unwrap();
    drop(log);

    let mut forwarded = String::new();
    message
        .entity_mut()
        .raw_content_stream_mut()
        .read_to_string(&mut forwarded)
        .unwrap();
    assert_eq!(logged, forwarded);
}

#[test]
fn test_replacement_closes_old_branches() {
    let mut message = Message::new();
    message.entity_mut().set_string("first").unwrap();
    let stale = message.entity().new_decoded_content_stream().unwrap();

    message.entity_mut().set_string("second").unwrap();
    assert!(stale.is_closed());
    assert_eq!(message.entity().get_string().unwrap(), "second");
}

#[test]
fn test_large_body_spills_and_replays() {
    let dir = tempfile::tempdir().unwrap();
    let factory = BufferFactory::new(1024, 4096, 1024 * 1024)
        .unwrap()
        .with_directory(dir.path());
    let mut message = Message::with_factory(factory);
    let body: Vec<u8> = (0..200_000).map(|i| (i % 253) as u8).collect();
    message
        .entity_mut()
        .set_stream(ReaderSource::new(std::io::Cursor::new(body.clone())), None)
        .unwrap();

    assert_eq!(message.entity().get_bytes().unwrap().as_ref(), body.as_slice());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(message.entity().get_bytes().unwrap().as_ref(), body.as_slice());

    message.entity_mut().close().unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_overflow_surfaces_from_views() {
    let factory = BufferFactory::new(16, 32, 64).unwrap();
    let mut message = Message::with_factory(factory);
    message.entity_mut().set_bytes(vec![1u8; 100]).unwrap();

    let err = message.entity().get_bytes().unwrap_err();
    assert!(err.is_fatal());
}
