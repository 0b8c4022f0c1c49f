//! Object CRUD, checksum and copy/compose integration tests.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use gcstack_storage_core::StorageError;
    use gcstack_storage_core::checksums::{compute_crc32c, compute_md5};
    use gcstack_storage_core::state::ObjectPatch;

    use crate::{create_test_bucket, for_each_backend};

    #[test]
    fn test_should_round_trip_object() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "rt");
            let content = b"hello world";
            let created = t
                .engine
                .upload_object(&bucket, "dir/hello.txt", content, Some("text/plain"), None)
                .expect("upload");

            let resource = t.engine.get_object(&bucket, "dir/hello.txt").expect("get");
            let bytes = t.engine.read_object(&bucket, "dir/hello.txt").expect("read");
            assert_eq!(resource, created, "{backend:?}");
            assert_eq!(bytes.as_ref(), content);
            assert_eq!(resource.size, content.len() as u64);
            assert_eq!(resource.metageneration, "1");
            assert_eq!(resource.crc32c.as_deref(), Some("yZRlqg=="));
            assert_eq!(resource.md5_hash.as_deref(), Some("XrY7u+Ae7tCTyyK7j1rNww=="));
        });
    }

    #[test]
    fn test_should_serialize_resource_in_api_shape() {
        for_each_backend(|_, t| {
            let bucket = create_test_bucket(&t.engine, "json");
            let resource = t
                .engine
                .upload_object(&bucket, "k", b"abcdef", None, None)
                .expect("upload");
            let json = serde_json::to_value(&resource).expect("serialize");
            assert_eq!(json["kind"], "storage#object");
            assert_eq!(json["size"], "6");
            assert_eq!(json["metageneration"], "1");
            assert_eq!(json["md5Hash"], "6AtQFwmJUPxYqtg8jBSXjg==");
            assert_eq!(json["crc32c"], "U7zv8Q==");
            assert!(json["mediaLink"].as_str().is_some_and(|l| l.contains("alt=media")));
        });
    }

    #[test]
    fn test_should_overwrite_object_at_same_key() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "ow");
            t.engine
                .upload_object(&bucket, "k", b"first version", None, None)
                .expect("first upload");
            t.engine
                .upload_object(&bucket, "k", b"second", None, None)
                .expect("second upload");
            assert_eq!(
                t.engine.read_object(&bucket, "k").expect("read").as_ref(),
                b"second",
                "{backend:?}"
            );
            assert_eq!(t.engine.get_object(&bucket, "k").expect("get").size, 6);
            let listed = t.engine.list_objects(&bucket, None, None).expect("list");
            assert_eq!(listed.objects.len(), 1);
        });
    }

    #[test]
    fn test_should_reject_mismatched_checksums_without_writing() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "cs");

            let bad_crc = ObjectPatch {
                crc32c: Some(compute_crc32c(b"other")),
                ..ObjectPatch::default()
            };
            let err = t
                .engine
                .upload_object(&bucket, "k", b"payload", None, Some(&bad_crc))
                .expect_err("crc mismatch");
            assert!(
                matches!(err, StorageError::Crc32cMismatch { .. }),
                "{backend:?}: {err}"
            );
            assert!(err.to_string().starts_with("Provided CRC32C"));

            let bad_md5 = ObjectPatch {
                md5_hash: Some(compute_md5(b"other")),
                ..ObjectPatch::default()
            };
            let err = t
                .engine
                .upload_object(&bucket, "k", b"payload", None, Some(&bad_md5))
                .expect_err("md5 mismatch");
            assert!(matches!(err, StorageError::Md5Mismatch { .. }));
            assert_eq!(err.status_code(), 400);

            assert!(t.engine.get_object(&bucket, "k").is_err_and(|e| e.is_not_found()));
            assert!(t.engine.read_object(&bucket, "k").is_err());
            assert!(
                t.engine
                    .list_objects(&bucket, None, None)
                    .expect("list")
                    .objects
                    .is_empty()
            );
        });
    }

    #[test]
    fn test_should_patch_metadata_and_keep_custom_time_monotonic() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "patch");
            t.engine
                .upload_object(&bucket, "k", b"x", Some("text/plain"), None)
                .expect("upload");

            let first = ObjectPatch {
                custom_time: Some("2024-06-01T00:00:00Z".to_owned()),
                metadata: Some(BTreeMap::from([("a".to_owned(), "1".to_owned())])),
                ..ObjectPatch::default()
            };
            let patched = t.engine.patch_object(&bucket, "k", &first).expect("patch 1");
            assert_eq!(patched.metageneration, "2", "{backend:?}");

            let older = ObjectPatch {
                custom_time: Some("2023-01-01T00:00:00Z".to_owned()),
                content_type: Some("application/json".to_owned()),
                ..ObjectPatch::default()
            };
            let patched = t.engine.patch_object(&bucket, "k", &older).expect("patch 2");
            assert_eq!(patched.metageneration, "3");
            assert_eq!(patched.custom_time.as_deref(), Some("2024-06-01T00:00:00Z"));
            assert_eq!(patched.content_type.as_deref(), Some("application/json"));
            assert_eq!(
                patched.metadata.as_ref().and_then(|m| m.get("a")).map(String::as_str),
                Some("1")
            );

            let stored = t.engine.get_object(&bucket, "k").expect("get");
            assert_eq!(stored, patched);
        });
    }

    #[test]
    fn test_should_return_not_found_for_missing_objects() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "nf");
            let patch = ObjectPatch {
                cache_control: Some("no-cache".to_owned()),
                ..ObjectPatch::default()
            };
            for err in [
                t.engine.get_object(&bucket, "nope").expect_err("get"),
                t.engine.read_object(&bucket, "nope").expect_err("read"),
                t.engine.patch_object(&bucket, "nope", &patch).expect_err("patch"),
                t.engine.delete_object(&bucket, "nope").expect_err("delete"),
            ] {
                assert!(
                    matches!(err, StorageError::NoSuchObject { .. }),
                    "{backend:?}: {err}"
                );
            }
        });
    }

    #[test]
    fn test_should_serve_ranges_and_hash_header() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "range");
            let resource = t
                .engine
                .upload_object(&bucket, "digits", b"0123456789", None, None)
                .expect("upload");

            let range = t
                .engine
                .read_object_range(&bucket, "digits", "bytes=3-6")
                .expect("range");
            assert_eq!(range.data.as_ref(), b"3456", "{backend:?}");
            assert_eq!(range.content_range(), "bytes 3-6/10");

            assert_eq!(
                t.engine.hash_header(&resource),
                "crc32c=KAwGng==,md5=eB5eJF1ptWaXm4bijSPyxw=="
            );
        });
    }

    #[test]
    fn test_should_copy_rewrite_and_compose() {
        for_each_backend(|backend, t| {
            let src = create_test_bucket(&t.engine, "src");
            let dst = create_test_bucket(&t.engine, "dst");
            let metadata = ObjectPatch {
                metadata: Some(BTreeMap::from([("origin".to_owned(), "src".to_owned())])),
                ..ObjectPatch::default()
            };
            t.engine
                .upload_object(&src, "part-a", b"abc", Some("text/plain"), Some(&metadata))
                .expect("upload a");
            t.engine
                .upload_object(&src, "part-b", b"def", Some("text/csv"), None)
                .expect("upload b");

            let copied = t
                .engine
                .copy_object(&src, "part-a", &dst, "copy")
                .expect("copy");
            assert_eq!(copied.bucket, dst, "{backend:?}");
            assert_eq!(
                copied.metadata.as_ref().and_then(|m| m.get("origin")).map(String::as_str),
                Some("src")
            );
            assert_eq!(t.engine.read_object(&dst, "copy").expect("read").as_ref(), b"abc");

            let rewritten = t
                .engine
                .rewrite_object(&src, "part-b", &dst, "rewritten")
                .expect("rewrite");
            assert!(rewritten.done);
            assert_eq!(rewritten.object_size, 3);

            let composed = t
                .engine
                .compose_objects(&src, &["part-a", "part-b"], "whole", None)
                .expect("compose");
            assert_eq!(composed.content_type.as_deref(), Some("text/plain"));
            assert_eq!(composed.crc32c.as_deref(), Some("U7zv8Q=="));
            assert_eq!(
                t.engine.read_object(&src, "whole").expect("read").as_ref(),
                b"abcdef"
            );
        });
    }

    #[test]
    fn test_should_wipe_everything() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "wipe");
            t.engine
                .upload_object(&bucket, "k", b"x", None, None)
                .expect("upload");
            t.engine
                .start_multipart(&bucket, "m", None, None)
                .expect("start multipart");

            t.engine.wipe(true).expect("wipe keeping buckets");
            assert!(t.engine.get_bucket(&bucket).is_ok(), "{backend:?}");
            assert!(t.engine.get_object(&bucket, "k").is_err());
            assert!(t.engine.catalog().snapshot().multipart.is_empty());

            t.engine.wipe(false).expect("wipe all");
            assert!(t.engine.list_buckets().is_empty());
        });
    }
}
