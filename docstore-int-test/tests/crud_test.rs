use docstore::collection::Document;
use docstore::common::Value;
use docstore::errors::ErrorKind;
use docstore::service::Status;
use docstore_int_test::test_util::{
    cleanup, create_positional_test_context, create_test_context, run_test,
};

#[ctor::ctor]
fn init() {
    colog::init();
}

fn body(json: &str) -> Vec<u8> {
    json.as_bytes().to_vec()
}

#[test]
fn test_read_back_equals_inserted_plus_id_token() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            let created = service.create("books", &body(r#"{"name":"book1","pages":320}"#))?;

            let id = created.id().expect("created document has an id").to_string();
            assert_eq!(id.len(), 11);

            let mut expected = Document::from_json_slice(br#"{"name":"book1","pages":320}"#)?;
            expected.set_id(&id);
            assert_eq!(created, expected);
            assert_eq!(service.read_one("books", &id)?, expected);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_back_equals_inserted_plus_id_positional() {
    run_test(
        create_positional_test_context,
        |ctx| {
            let service = ctx.service();
            let first = service.create("books", &body(r#"{"name":"book1"}"#))?;
            let second = service.create("books", &body(r#"{"name":"book2","id":"client"}"#))?;

            assert_eq!(first.id(), Some("1"));
            assert_eq!(second.id(), Some("2"));
            assert_eq!(service.read_one("books", "1")?, first);
            assert_eq!(service.read_one("books", "2")?, second);
            assert_eq!(service.read_one("books", "002")?, second);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_token_ids_are_unique() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            let mut ids = std::collections::HashSet::new();
            for i in 0..200 {
                let created = service.create("books", &body(&format!(r#"{{"n":{}}}"#, i)))?;
                assert!(ids.insert(created.id().unwrap_or_default().to_string()));
            }
            assert_eq!(service.read_all("books")?.len(), 200);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_create_read_update_read_round_trip() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            let created = service.create("books", &body(r#"{"name":"book1","tags":["a","b"]}"#))?;
            let id = created.id().unwrap_or_default().to_string();

            let updated = service.update(
                "books",
                &id,
                &body(r#"{"name":"renamed","meta":{"isbn":"978"},"id":"forged"}"#),
            )?;
            assert_eq!(updated.id(), Some(id.as_str()));
            assert_eq!(updated.get("tags"), None);
            assert_eq!(updated.get_path("meta.isbn"), Some(&Value::from("978")));

            let read = service.read_one("books", &id)?;
            assert_eq!(read, updated);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_update_unknown_id_is_not_found() {
    run_test(
        create_positional_test_context,
        |ctx| {
            let service = ctx.service();
            service.create("books", &body(r#"{"name":"book1"}"#))?;

            let err = service
                .update("books", "99", &body(r#"{"name":"x"}"#))
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotFound);
            assert_eq!(Status::classify(&err).code(), 422);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_then_read_is_not_found() {
    run_test(
        create_test_context,
        |ctx| {
            let service = ctx.service();
            let created = service.create("books", &body(r#"{"name":"book1"}"#))?;
            let id = created.id().unwrap_or_default().to_string();

            assert_eq!(service.delete("books", &id)?, id);

            let err = service.read_one("books", &id).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotFound);
            assert_eq!(Status::classify(&err).code(), 422);
            assert!(service.read_all("books")?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_repeated_delete_of_unknown_id_is_consistent() {
    run_test(
        create_positional_test_context,
        |ctx| {
            let service = ctx.service();
            service.create("books", &body(r#"{"name":"book1"}"#))?;

            let first = service.delete("books", "42").unwrap_err();
            let second = service.delete("books", "42").unwrap_err();
            assert_eq!(first.kind(), second.kind());
            assert_eq!(first.message(), second.message());
            assert_eq!(first.kind(), &ErrorKind::NotFound);

            service.delete("books", "1")?;
            let gone = service.delete("books", "1").unwrap_err();
            assert_eq!(gone.kind(), &ErrorKind::NotFound);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_malformed_input_is_invalid() {
    run_test(
        create_positional_test_context,
        |ctx| {
            let service = ctx.service();

            let err = service.create("books", b"{not json").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidInput);
            let err = service.create("books", b"\"just a string\"").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidInput);

            service.create("books", &body(r#"{"name":"book1"}"#))?;
            let err = service.read_one("books", "one").unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidId);
            assert_eq!(Status::classify(&err).code(), 400);

            let err = service
                .update("books", "1", b"[1,2,3]")
                .unwrap_err();
            assert_eq!(Status::classify(&err).code(), 400);
            assert_eq!(service.read_one("books", "1")?.get("name"), Some(&Value::from("book1")));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_read_all_lists_every_document() {
    run_test(
        create_positional_test_context,
        |ctx| {
            let service = ctx.service();
            for name in ["a", "b", "c"] {
                service.create("books", &body(&format!(r#"{{"name":"{}"}}"#, name)))?;
            }
            service.delete("books", "2")?;

            let ids: Vec<String> = service
                .read_all("books")?
                .iter()
                .filter_map(|doc| doc.id().map(str::to_string))
                .collect();
            assert_eq!(ids, vec!["1", "3"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_search_is_not_implemented() {
    run_test(
        create_test_context,
        |ctx| {
            let err = ctx
                .service()
                .search("books", br#"{"attribute":"name","value":"x"}"#)
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotImplemented);
            assert_eq!(Status::classify(&err).code(), 501);
            Ok(())
        },
        cleanup,
    )
}
