use chrono::{Duration, Utc};
use notewell::db::Database;
use notewell::models::*;
use notewell::remote::SortOrder;
use speculate2::speculate;

fn create_test_note(db: &Database, user_id: &str, title: &str) -> RemoteNoteRecord {
    db.create_note(RemoteNoteInsert {
        title: title.to_string(),
        content: Some(format!("{} content", title)),
        summary: None,
        user_id: user_id.to_string(),
    })
    .expect("Failed to create note")
}

fn patch_for(record: &RemoteNoteRecord, title: &str) -> RemoteNotePatch {
    RemoteNotePatch {
        title: title.to_string(),
        content: record.content.clone(),
        summary: record.summary.clone(),
        user_id: record.user_id.clone(),
        updated_at: Utc::now(),
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let alice = db.create_user("alice@example.com").expect("Failed to create user");
        let alice_id = alice.user.id.clone();
    }

    describe "migrations" {
        it "can run twice without error" {
            db.migrate().expect("Second migration failed");
        }
    }

    describe "users" {
        describe "create_user" {
            it "issues a distinct token per user" {
                let bob = db.create_user("bob@example.com").expect("Failed to create user");
                assert_ne!(alice.token, bob.token);
                assert_ne!(alice.user.id, bob.user.id);
            }

            it "rejects a duplicate email" {
                let result = db.create_user("alice@example.com");
                assert!(result.is_err());
            }
        }

        describe "get_user_by_token" {
            it "resolves a known token" {
                let user = db
                    .get_user_by_token(&alice.token)
                    .expect("Query failed")
                    .expect("User not found");
                assert_eq!(user.id, alice_id);
                assert_eq!(user.email, "alice@example.com");
            }

            it "returns None for an unknown token" {
                let user = db.get_user_by_token("not-a-token").expect("Query failed");
                assert!(user.is_none());
            }
        }
    }

    describe "notes" {
        describe "create_note" {
            it "assigns id and timestamps" {
                let note = create_test_note(&db, &alice_id, "Meeting");

                assert!(!note.id.is_empty());
                assert_eq!(note.title, "Meeting");
                assert_eq!(note.content.as_deref(), Some("Meeting content"));
                assert!(note.summary.is_none());
                assert_eq!(note.created_at, note.updated_at);
                assert_eq!(note.user_id, alice_id);
            }

            it "round-trips through get_note unchanged" {
                let created = create_test_note(&db, &alice_id, "Stored");
                let found = db.get_note(&created.id).expect("Query failed").expect("Not found");
                assert_eq!(found, created);
            }

            it "keeps a null content as null" {
                let note = db.create_note(RemoteNoteInsert {
                    title: "Empty".to_string(),
                    content: None,
                    summary: None,
                    user_id: alice_id.clone(),
                }).expect("Failed to create note");

                let found = db.get_note(&note.id).expect("Query failed").expect("Not found");
                assert!(found.content.is_none());
            }
        }

        describe "get_note" {
            it "returns None for an unknown id" {
                let result = db.get_note("missing").expect("Query failed");
                assert!(result.is_none());
            }
        }

        describe "get_notes_by_user" {
            it "returns empty list when the user has no notes" {
                let notes = db
                    .get_notes_by_user(&alice_id, SortOrder::NewestFirst)
                    .expect("Query failed");
                assert!(notes.is_empty());
            }

            it "returns newest first by default" {
                let first = create_test_note(&db, &alice_id, "First");
                std::thread::sleep(std::time::Duration::from_millis(2));
                let second = create_test_note(&db, &alice_id, "Second");

                let notes = db
                    .get_notes_by_user(&alice_id, SortOrder::default())
                    .expect("Query failed");
                let ids: Vec<_> = notes.iter().map(|n| n.id.clone()).collect();
                assert_eq!(ids, vec![second.id, first.id]);
            }

            it "returns oldest first when asked" {
                let first = create_test_note(&db, &alice_id, "First");
                std::thread::sleep(std::time::Duration::from_millis(2));
                create_test_note(&db, &alice_id, "Second");

                let notes = db
                    .get_notes_by_user(&alice_id, SortOrder::OldestFirst)
                    .expect("Query failed");
                assert_eq!(notes[0].id, first.id);
            }

            it "only returns the owner's notes" {
                let bob = db.create_user("bob@example.com").expect("Failed to create user");
                create_test_note(&db, &alice_id, "Alice's");
                create_test_note(&db, &bob.user.id, "Bob's");

                let notes = db
                    .get_notes_by_user(&bob.user.id, SortOrder::NewestFirst)
                    .expect("Query failed");
                assert_eq!(notes.len(), 1);
                assert_eq!(notes[0].title, "Bob's");
            }
        }

        describe "update_note" {
            it "overwrites the editable fields" {
                let note = create_test_note(&db, &alice_id, "Draft");
                let mut patch = patch_for(&note, "Final");
                patch.summary = Some("Short".to_string());

                let updated = db
                    .update_note(&note.id, patch)
                    .expect("Update failed")
                    .expect("Not found");

                assert_eq!(updated.title, "Final");
                assert_eq!(updated.summary.as_deref(), Some("Short"));
                assert_eq!(updated.created_at, note.created_at);

                let stored = db.get_note(&note.id).expect("Query failed").expect("Not found");
                assert_eq!(stored, updated);
            }

            it "stores the patch timestamp" {
                let note = create_test_note(&db, &alice_id, "Draft");
                let mut patch = patch_for(&note, "Later");
                patch.updated_at = note.updated_at + Duration::hours(1);

                let updated = db
                    .update_note(&note.id, patch)
                    .expect("Update failed")
                    .expect("Not found");
                assert_eq!(updated.updated_at, note.updated_at + Duration::hours(1));
            }

            it "never moves updated_at before created_at" {
                let note = create_test_note(&db, &alice_id, "Draft");
                let mut patch = patch_for(&note, "Past");
                patch.updated_at = note.created_at - Duration::days(1);

                let updated = db
                    .update_note(&note.id, patch)
                    .expect("Update failed")
                    .expect("Not found");
                assert_eq!(updated.updated_at, note.created_at);
            }

            it "returns None for an unknown id" {
                let note = create_test_note(&db, &alice_id, "Draft");
                let result = db.update_note("missing", patch_for(&note, "x")).expect("Update failed");
                assert!(result.is_none());
            }

            it "returns None once the note is deleted" {
                let note = create_test_note(&db, &alice_id, "Gone");
                assert!(db.delete_note(&note.id).expect("Delete failed"));

                let result = db.update_note(&note.id, patch_for(&note, "Back")).expect("Update failed");
                assert!(result.is_none());
                assert!(db.get_note(&note.id).expect("Query failed").is_none());
            }
        }

        describe "delete_note" {
            it "removes the note" {
                let note = create_test_note(&db, &alice_id, "Doomed");
                assert!(db.delete_note(&note.id).expect("Delete failed"));
                assert!(db.get_note(&note.id).expect("Query failed").is_none());
            }

            it "returns false for an unknown id" {
                assert!(!db.delete_note("missing").expect("Delete failed"));
            }
        }
    }
}
