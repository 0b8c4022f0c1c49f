//! Listing integration tests.

#[cfg(test)]
mod tests {
    use gcstack_storage_core::StorageError;
    use gcstack_storage_core::listing::ListResult;

    use crate::{create_test_bucket, for_each_backend};

    const KEYS: [&str; 6] = [
        "a/1.txt",
        "a/b/2.txt",
        "a/b/3.txt",
        "a/c/4.txt",
        "ab.txt",
        "z.txt",
    ];

    fn names(result: &ListResult) -> Vec<&str> {
        result.objects.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn test_should_list_with_prefix_and_delimiter() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "ls");
            for key in KEYS {
                t.engine
                    .upload_object(&bucket, key, key.as_bytes(), None, None)
                    .unwrap_or_else(|e| panic!("upload {key}: {e}"));
            }

            let folder = t
                .engine
                .list_objects(&bucket, Some("a/"), Some("/"))
                .expect("list folder");
            assert_eq!(names(&folder), vec!["a/1.txt"], "{backend:?}");
            assert_eq!(folder.prefixes, vec!["a/b/", "a/c/"]);

            let subtree = t
                .engine
                .list_objects(&bucket, Some("a/"), None)
                .expect("list subtree");
            assert_eq!(
                names(&subtree),
                vec!["a/1.txt", "a/b/2.txt", "a/b/3.txt", "a/c/4.txt"]
            );
            assert!(subtree.prefixes.is_empty());

            let root = t
                .engine
                .list_objects(&bucket, None, Some("/"))
                .expect("list root");
            assert_eq!(names(&root), vec!["ab.txt", "z.txt"]);
            assert_eq!(root.prefixes, vec!["a/"]);

            let all = t.engine.list_objects(&bucket, None, None).expect("list all");
            assert_eq!(all.objects.len(), KEYS.len());
        });
    }

    #[test]
    fn test_should_not_list_deleted_objects() {
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "del");
            for key in ["x/1", "x/2"] {
                t.engine
                    .upload_object(&bucket, key, b"x", None, None)
                    .expect("upload");
            }
            t.engine.delete_object(&bucket, "x/1").expect("delete");
            let listed = t
                .engine
                .list_objects(&bucket, Some("x/"), None)
                .expect("list");
            assert_eq!(names(&listed), vec!["x/2"], "{backend:?}");
        });
    }

    #[test]
    fn test_should_fail_listing_missing_bucket() {
        for_each_backend(|backend, t| {
            let err = t
                .engine
                .list_objects("no-such-bucket", None, None)
                .expect_err("missing bucket");
            assert!(
                matches!(err, StorageError::NoSuchBucket { .. }),
                "{backend:?}: {err}"
            );
        });
    }

    #[test]
    fn test_should_store_keys_that_look_like_paths() {
        const ODD_KEYS: [&str; 6] = ["a", "a/b", "a//b", "a/./b", "folder/", "./x"];
        for_each_backend(|backend, t| {
            let bucket = create_test_bucket(&t.engine, "odd");
            for key in ODD_KEYS {
                t.engine
                    .upload_object(&bucket, key, key.as_bytes(), None, None)
                    .unwrap_or_else(|e| panic!("{backend:?}: upload {key}: {e}"));
            }
            for key in ODD_KEYS {
                let data = t
                    .engine
                    .read_object(&bucket, key)
                    .unwrap_or_else(|e| panic!("{backend:?}: read {key}: {e}"));
                assert_eq!(data.as_ref(), key.as_bytes(), "{backend:?}: {key}");
            }

            let root = t
                .engine
                .list_objects(&bucket, None, Some("/"))
                .expect("list root");
            assert_eq!(names(&root), vec!["a"], "{backend:?}");
            assert_eq!(root.prefixes, vec!["./", "a/", "folder/"]);

            let folder = t
                .engine
                .list_objects(&bucket, Some("folder/"), Some("/"))
                .expect("list folder");
            assert_eq!(names(&folder), vec!["folder/"], "{backend:?}");

            t.engine.delete_object(&bucket, "a").expect("delete leaf");
            assert_eq!(
                t.engine.read_object(&bucket, "a/b").expect("read sibling").as_ref(),
                b"a/b"
            );
        });
    }
}
