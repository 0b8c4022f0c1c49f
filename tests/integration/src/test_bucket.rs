//! Bucket lifecycle integration tests.

#[cfg(test)]
mod tests {
    use gcstack_storage_core::StorageError;
    use gcstack_storage_core::state::BucketResource;

    use crate::{create_test_bucket, for_each_backend};

    #[test]
    fn test_should_create_get_and_list_buckets() {
        for_each_backend(|backend, t| {
            let a = create_test_bucket(&t.engine, "list");
            let b = create_test_bucket(&t.engine, "list");

            let fetched = t.engine.get_bucket(&a).expect("get bucket");
            assert_eq!(fetched.name, a, "{backend:?}");
            assert_eq!(fetched.kind, "storage#bucket");

            let names: Vec<_> = t.engine.list_buckets().into_iter().map(|b| b.name).collect();
            let mut expected = vec![a, b];
            expected.sort();
            assert_eq!(names, expected, "{backend:?}");
        });
    }

    #[test]
    fn test_should_replace_bucket_with_same_name() {
        for_each_backend(|backend, t| {
            let name = create_test_bucket(&t.engine, "reuse");
            t.engine
                .create_bucket(&name, Some("EUROPE-WEST1"))
                .expect("recreate bucket");
            assert_eq!(t.engine.list_buckets().len(), 1, "{backend:?}");
            assert_eq!(
                t.engine.get_bucket(&name).expect("get").location,
                "EUROPE-WEST1"
            );
        });
    }

    #[test]
    fn test_should_keep_opaque_bucket_fields() {
        for_each_backend(|backend, t| {
            let mut resource = BucketResource::new("opaque-fields", None, "STANDARD");
            resource
                .extra
                .insert("labels".to_owned(), serde_json::json!({"team": "storage"}));
            t.engine.put_bucket(resource).expect("put bucket");

            let fetched = t.engine.get_bucket("opaque-fields").expect("get");
            assert_eq!(
                fetched.extra.get("labels"),
                Some(&serde_json::json!({"team": "storage"})),
                "{backend:?}"
            );
        });
    }

    #[test]
    fn test_should_refuse_deleting_non_empty_bucket() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "full");
            t.engine
                .upload_object(&bucket, "k", b"x", None, None)
                .expect("upload");

            let err = t.engine.delete_bucket(&bucket).expect_err("should conflict");
            assert!(
                matches!(err, StorageError::BucketNotEmpty { .. }),
                "{backend:?}: {err}"
            );
            assert_eq!(err.status_code(), 400);

            t.engine.delete_object(&bucket, "k").expect("delete object");
            t.engine.delete_bucket(&bucket).expect("delete bucket");
            assert!(t.engine.get_bucket(&bucket).is_err_and(|e| e.is_not_found()));
        });
    }

    #[test]
    fn test_should_refuse_deleting_bucket_with_pending_resumable() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "pending");
            let upload_id = t
                .engine
                .start_resumable(&bucket, "big", None, Some(4), None)
                .expect("start resumable");

            let err = t.engine.delete_bucket(&bucket).expect_err("should conflict");
            assert!(
                matches!(err, StorageError::BucketHasPendingUploads { .. }),
                "{backend:?}: {err}"
            );

            t.engine
                .upload_chunk(&upload_id, Some("bytes 0-3/4"), b"done")
                .expect("complete");
            t.engine.delete_object(&bucket, "big").expect("delete object");
            t.engine.delete_bucket(&bucket).expect("delete bucket");
        });
    }

    #[test]
    fn test_should_return_not_found_for_missing_bucket() {
        for_each_backend(|backend, t| {
            for err in [
                t.engine.get_bucket("missing-bucket").expect_err("get"),
                t.engine.delete_bucket("missing-bucket").expect_err("delete"),
                t.engine
                    .upload_object("missing-bucket", "k", b"x", None, None)
                    .expect_err("upload"),
            ] {
                assert!(
                    matches!(err, StorageError::NoSuchBucket { .. }),
                    "{backend:?}: {err}"
                );
                assert_eq!(err.status_code(), 404);
            }
        });
    }
}
