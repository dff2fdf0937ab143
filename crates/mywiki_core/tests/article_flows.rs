use mywiki_core::db::open_db_in_memory;
use mywiki_core::{
    Article, ArticlePatch, ArticleRepository, ArticleStatus, AttachmentError, AttachmentInfo,
    AttachmentResult, AttachmentStore, CreateArticleRequest, NoAttachments,
    SqliteArticleRepository, StoredAttachment, TreeError, WikiError, WikiService, ROOT_NODE_ID,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Records which article prefixes were wiped, for cascade assertions.
#[derive(Clone, Default)]
struct RecordingAttachments {
    deleted: Rc<RefCell<Vec<String>>>,
}

impl AttachmentStore for RecordingAttachments {
    fn list_files(&self, _article_id: &str) -> AttachmentResult<Vec<AttachmentInfo>> {
        Ok(Vec::new())
    }

    fn upload_file(
        &self,
        article_id: &str,
        _bytes: &[u8],
        file_name: &str,
        _mime_type: Option<&str>,
    ) -> AttachmentResult<StoredAttachment> {
        Ok(StoredAttachment {
            url: format!("https://files.test/{article_id}/{file_name}"),
            path: format!("{article_id}/{file_name}"),
        })
    }

    fn delete_file(&self, _article_id: &str, _file_name: &str) -> AttachmentResult<()> {
        Ok(())
    }

    fn delete_article_files(&self, article_id: &str) -> AttachmentResult<()> {
        self.deleted.borrow_mut().push(article_id.to_string());
        Ok(())
    }
}

/// Fails the delete cascade to exercise rollback.
struct BrokenAttachments;

impl AttachmentStore for BrokenAttachments {
    fn list_files(&self, _article_id: &str) -> AttachmentResult<Vec<AttachmentInfo>> {
        Ok(Vec::new())
    }

    fn upload_file(
        &self,
        _article_id: &str,
        _bytes: &[u8],
        _file_name: &str,
        _mime_type: Option<&str>,
    ) -> AttachmentResult<StoredAttachment> {
        Err(AttachmentError::Backend("unavailable".to_string()))
    }

    fn delete_file(&self, _article_id: &str, _file_name: &str) -> AttachmentResult<()> {
        Err(AttachmentError::Backend("unavailable".to_string()))
    }

    fn delete_article_files(&self, _article_id: &str) -> AttachmentResult<()> {
        Err(AttachmentError::Backend("unavailable".to_string()))
    }
}

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_article_writes_row_and_tree_node_atomically() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let article = service
        .create_article(&CreateArticleRequest::page("Page 1", None))
        .unwrap();

    let loaded = service.get_article(&article.id).unwrap().unwrap();
    assert_eq!(loaded.title, "Page 1");
    assert_eq!(loaded.status, ArticleStatus::Published);

    let tree = service.get_tree().unwrap();
    assert_eq!(tree.version, 1);
    assert_eq!(tree.tree.len(), 2);
    assert_eq!(tree.tree[1].id, article.id);
    assert_eq!(tree.tree[1].title, "Page 1");
}

#[test]
fn create_article_under_parent_nests_node() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let parent = service
        .create_article(&CreateArticleRequest::page("Parent", None))
        .unwrap();
    let child = service
        .create_article(&CreateArticleRequest::page(
            "Child",
            Some(parent.id.clone()),
        ))
        .unwrap();

    let tree = service.get_tree().unwrap();
    assert_eq!(tree.version, 2);
    assert_eq!(tree.subtree_ids(&parent.id), [parent.id.clone(), child.id]);
}

#[test]
fn create_article_trims_title_and_rejects_blank() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let article = service
        .create_article(&CreateArticleRequest::page("  Padded  ", None))
        .unwrap();
    assert_eq!(article.title, "Padded");

    let err = service
        .create_article(&CreateArticleRequest::page("   ", None))
        .unwrap_err();
    assert!(matches!(err, WikiError::InvalidTitle));
}

#[test]
fn create_with_missing_parent_rolls_back_article_row() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let err = service
        .create_article(&CreateArticleRequest::page(
            "Orphan",
            Some("ghost".to_string()),
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        WikiError::Tree(TreeError::ParentNotFound(ref id)) if id == "ghost"
    ));

    assert!(service.list_articles(None).unwrap().is_empty());
    assert_eq!(service.get_tree().unwrap().version, 0);
}

#[test]
fn rename_syncs_denormalized_tree_title() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let article = service
        .create_article(&CreateArticleRequest::page("Old title", None))
        .unwrap();

    let patch = ArticlePatch {
        title: Some("New title".to_string()),
        ..ArticlePatch::default()
    };
    let updated = service.update_article(&article.id, &patch).unwrap();
    assert_eq!(updated.title, "New title");

    let tree = service.get_tree().unwrap();
    assert_eq!(tree.version, 2);
    assert_eq!(tree.tree[1].title, "New title");
}

#[test]
fn content_only_update_leaves_tree_untouched() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let article = service
        .create_article(&CreateArticleRequest::page("Stable", None))
        .unwrap();

    let patch = ArticlePatch {
        content: Some("# body".to_string()),
        ..ArticlePatch::default()
    };
    let updated = service.update_article(&article.id, &patch).unwrap();
    assert_eq!(updated.content, "# body");
    assert_eq!(updated.title, "Stable");

    assert_eq!(service.get_tree().unwrap().version, 1);
}

#[test]
fn update_of_missing_article_fails() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let patch = ArticlePatch {
        content: Some("x".to_string()),
        ..ArticlePatch::default()
    };
    let err = service.update_article("ghost", &patch).unwrap_err();
    assert!(matches!(err, WikiError::ArticleNotFound(ref id) if id == "ghost"));
}

#[test]
fn delete_cascades_rows_tree_nodes_and_attachments() {
    let conn = setup();
    let attachments = RecordingAttachments::default();
    let service = WikiService::new(&conn, attachments.clone());

    let a = service
        .create_article(&CreateArticleRequest::page("A", None))
        .unwrap();
    let b = service
        .create_article(&CreateArticleRequest::page("B", Some(a.id.clone())))
        .unwrap();
    let c = service
        .create_article(&CreateArticleRequest::page("C", None))
        .unwrap();

    let deleted = service.delete_article(&a.id).unwrap();
    assert_eq!(deleted, [a.id.clone(), b.id.clone()]);

    assert!(service.get_article(&a.id).unwrap().is_none());
    assert!(service.get_article(&b.id).unwrap().is_none());
    assert!(service.get_article(&c.id).unwrap().is_some());

    let tree = service.get_tree().unwrap();
    assert!(!tree.contains(&a.id));
    assert!(!tree.contains(&b.id));
    assert!(tree.contains(&c.id));
    assert_eq!(tree.version, 4);

    assert_eq!(*attachments.deleted.borrow(), [a.id, b.id]);
}

#[test]
fn delete_of_root_is_rejected() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let err = service.delete_article(ROOT_NODE_ID).unwrap_err();
    assert!(matches!(err, WikiError::CannotDeleteRoot));
}

#[test]
fn delete_of_article_without_tree_entry_removes_row_only() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    // Row created outside the coordinator, so it has no tree node.
    let stray = Article::new("Stray", "");
    SqliteArticleRepository::new(&conn)
        .create_article(&stray)
        .unwrap();

    let deleted = service.delete_article(&stray.id).unwrap();
    assert_eq!(deleted, [stray.id.clone()]);
    assert!(service.get_article(&stray.id).unwrap().is_none());
    assert_eq!(service.get_tree().unwrap().version, 0);
}

#[test]
fn failing_attachment_cleanup_rolls_back_the_whole_delete() {
    let conn = setup();

    let id = {
        let service = WikiService::new(&conn, NoAttachments);
        service
            .create_article(&CreateArticleRequest::page("Keep me", None))
            .unwrap()
            .id
    };

    let service = WikiService::new(&conn, BrokenAttachments);
    let err = service.delete_article(&id).unwrap_err();
    assert!(matches!(err, WikiError::Attachment(_)));

    assert!(service.get_article(&id).unwrap().is_some());
    assert!(service.get_tree().unwrap().contains(&id));
}

#[test]
fn move_article_repositions_subtree() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let a = service
        .create_article(&CreateArticleRequest::page("A", None))
        .unwrap();
    let b = service
        .create_article(&CreateArticleRequest::page("B", None))
        .unwrap();

    let tree = service
        .move_article(&b.id, Some(a.id.as_str()), Some(0))
        .unwrap();
    assert_eq!(tree.version, 3);
    assert_eq!(tree.subtree_ids(&a.id), [a.id.clone(), b.id.clone()]);

    // Article rows are untouched by a move.
    assert_eq!(service.get_article(&b.id).unwrap().unwrap().title, "B");

    let tree = service.move_article(&b.id, None, Some(1)).unwrap();
    let top_ids: Vec<&str> = tree.tree.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(top_ids, [ROOT_NODE_ID, b.id.as_str(), a.id.as_str()]);
}

#[test]
fn move_of_root_is_rejected() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let err = service.move_article(ROOT_NODE_ID, None, None).unwrap_err();
    assert!(matches!(err, WikiError::CannotMoveRoot));
}

#[test]
fn cyclic_move_is_rejected_and_tree_unchanged() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let a = service
        .create_article(&CreateArticleRequest::page("A", None))
        .unwrap();
    let b = service
        .create_article(&CreateArticleRequest::page("B", Some(a.id.clone())))
        .unwrap();

    let before = service.get_tree().unwrap();
    let err = service
        .move_article(&a.id, Some(b.id.as_str()), None)
        .unwrap_err();
    assert!(matches!(
        err,
        WikiError::Tree(TreeError::CyclicMoveRejected { .. })
    ));
    assert_eq!(service.get_tree().unwrap(), before);
}

#[test]
fn fresh_database_serves_initial_tree_without_persisting_it() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    let tree = service.get_tree().unwrap();
    assert_eq!(tree.version, 0);
    assert_eq!(tree.tree[0].id, ROOT_NODE_ID);

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM tree_documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn list_articles_returns_newest_first_and_caps_limit() {
    let conn = setup();
    let service = WikiService::new(&conn, NoAttachments);

    for index in 0..3 {
        let mut request = CreateArticleRequest::page(format!("Page {index}"), None);
        request.tags = vec!["wiki".to_string()];
        service.create_article(&request).unwrap();
    }

    let listed = service.list_articles(Some(2)).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].created_at >= listed[1].created_at);
    assert_eq!(listed[0].tags, ["wiki"]);
}
