//! Snapshot persistence and restart integration tests.

#[cfg(test)]
mod tests {
    use gcstack_storage_core::ChunkOutcome;
    use gcstack_storage_core::state::ObjectPatch;

    use crate::{Backend, create_test_bucket, engine};

    #[test]
    fn test_should_restore_catalog_after_restart() {
        let t = engine(Backend::Disk);
        let bucket = create_test_bucket(&t.engine, "restart");
        let created = t
            .engine
            .upload_object(&bucket, "docs/readme.md", b"# hi", Some("text/markdown"), None)
            .expect("upload");
        let patch = ObjectPatch {
            cache_control: Some("public, max-age=60".to_owned()),
            ..ObjectPatch::default()
        };
        t.engine
            .patch_object(&bucket, "docs/readme.md", &patch)
            .expect("patch");
        let before = t.engine.catalog().snapshot();

        let reopened = t.reopen();
        assert_eq!(reopened.catalog().snapshot(), before);
        let resource = reopened
            .get_object(&bucket, "docs/readme.md")
            .expect("get after restart");
        assert_eq!(resource.generation, created.generation);
        assert_eq!(resource.metageneration, "2");
        assert_eq!(
            reopened
                .read_object(&bucket, "docs/readme.md")
                .expect("read after restart")
                .as_ref(),
            b"# hi"
        );
    }

    #[test]
    fn test_should_resume_sessions_after_restart() {
        let t = engine(Backend::Disk);
        let bucket = create_test_bucket(&t.engine, "sessions");

        let resumable = t
            .engine
            .start_resumable(&bucket, "chunked", None, Some(6), None)
            .expect("start resumable");
        t.engine
            .upload_chunk(&resumable, Some("bytes 0-2/6"), b"abc")
            .expect("chunk 1");
        let multipart = t
            .engine
            .start_multipart(&bucket, "assembled", None, None)
            .expect("start multipart");
        t.engine.upload_part(&multipart, 1, b"ab").expect("part 1");

        let reopened = t.reopen();
        let session = reopened
            .resumable_session(&resumable)
            .expect("resumable survives restart");
        assert_eq!(session.received, 3);

        let outcome = reopened
            .upload_chunk(&resumable, Some("bytes 3-5/6"), b"def")
            .expect("chunk 2");
        assert!(matches!(outcome, ChunkOutcome::Complete(_)));
        assert_eq!(
            reopened.read_object(&bucket, "chunked").expect("read").as_ref(),
            b"abcdef"
        );

        reopened.upload_part(&multipart, 2, b"cd").expect("part 2");
        reopened
            .complete_multipart(&multipart)
            .expect("complete multipart");
        assert_eq!(
            reopened
                .read_object(&bucket, "assembled")
                .expect("read")
                .as_ref(),
            b"abcd"
        );
    }

    #[test]
    fn test_should_start_empty_without_snapshot() {
        let t = engine(Backend::Disk);
        let snapshot = t.engine.catalog().snapshot();
        assert!(snapshot.buckets.is_empty());
        assert!(snapshot.objects.is_empty());
        let dir = t.dir.as_ref().expect("disk backend has a directory");
        assert!(!dir.path().join(".cloudstorage").join(".meta").exists());
    }

    #[test]
    fn test_should_write_snapshot_after_every_mutation() {
        let t = engine(Backend::Disk);
        let dir = t.dir.as_ref().expect("disk backend has a directory");
        let meta = dir.path().join(".cloudstorage").join(".meta");

        let bucket = create_test_bucket(&t.engine, "snap");
        let read_snapshot = || -> serde_json::Value {
            let raw = std::fs::read(&meta).expect("read snapshot");
            serde_json::from_slice(&raw).expect("parse snapshot")
        };
        assert!(read_snapshot()["buckets"].get(&bucket).is_some());

        t.engine
            .upload_object(&bucket, "k", b"x", None, None)
            .expect("upload");
        assert!(read_snapshot()["objects"][&bucket].get("k").is_some());

        t.engine.delete_object(&bucket, "k").expect("delete");
        assert!(read_snapshot()["objects"][&bucket].get("k").is_none());
    }
}
