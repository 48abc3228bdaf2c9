//! Resources served by the demo server.
//!
//! Articles are filed under categories. A category referenced by any
//! article keeps its name and status until the articles move elsewhere.

use record_lifecycle_core::error::FieldErrors;
use record_lifecycle_core::messages::{MessageKey, Translator};
use record_lifecycle_core::resource::{Dependency, FieldSpec, Resource, Scenario};
use record_lifecycle_core::{Status, TransitionTable};
use serde::{Deserialize, Serialize};

const MAX_TITLE_CHARS: usize = 200;

/// A published piece of writing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Article {
    /// Headline.
    pub title: String,
    /// Body text.
    pub body: Option<String>,
    /// Owning category.
    pub category_id: Option<i64>,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Publication slug, fixed once the article exists.
    pub slug: Option<String>,
}

impl Resource for Article {
    const TABLE: &'static str = "article";
    const LABEL: &'static str = "Article";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("title").required().not_null(),
        FieldSpec::string("body"),
        FieldSpec::integer("categoryId"),
        FieldSpec::array("tags").not_null(),
        FieldSpec::string("slug").on(&[Scenario::Create, Scenario::View]),
    ];

    fn validate(&self, translator: &dyn Translator, errors: &mut FieldErrors) {
        if self.title.chars().count() > MAX_TITLE_CHARS {
            errors.push(
                "title",
                translator.translate(
                    MessageKey::FieldType,
                    &[("field", "title"), ("value", "string of at most 200 characters")],
                ),
            );
        }
    }
}

/// A grouping of articles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Category {
    /// Display name.
    pub name: String,
    /// Shown on the category page.
    pub description: Option<String>,
}

impl Resource for Category {
    const TABLE: &'static str = "category";
    const LABEL: &'static str = "Category";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::string("name").required().not_null(),
        FieldSpec::string("description"),
    ];
    const PROTECTED_FIELDS: &'static [&'static str] = &["status", "name"];
    const DEPENDENTS: &'static [Dependency] = &[Dependency::new("article", "categoryId")];

    /// Approving a category is reserved to superadmins.
    fn transitions() -> TransitionTable {
        TransitionTable::standard().superadmin_only(Status::Approved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use record_lifecycle_core::{ActorContext, LifecycleError};
    use record_lifecycle_testing::fixtures::params;
    use record_lifecycle_testing::{Harness, InMemoryRecordStore};
    use serde_json::json;

    fn editor() -> ActorContext {
        ActorContext::new("7", ["editor"])
    }

    #[tokio::test]
    async fn long_titles_are_rejected() {
        let harness = Harness::<Article>::new();
        let err = harness
            .controller
            .create(&editor(), params(json!({ "title": "x".repeat(201) })))
            .await
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, "title");
    }

    #[tokio::test]
    async fn slug_is_fixed_after_create() {
        let harness = Harness::<Article>::new();
        harness
            .controller
            .create(&editor(), params(json!({"title": "A", "slug": "a"})))
            .await
            .unwrap();

        let err = harness
            .controller
            .update(&editor(), params(json!({"id": 1, "lockVersion": 1, "slug": "b"})))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.field_errors()[0].field, "slug");
    }

    #[tokio::test]
    async fn referenced_category_cannot_be_deleted() {
        let store = InMemoryRecordStore::new();
        let categories = Harness::<Category>::with_store(store.clone());
        let articles = Harness::<Article>::with_store(store);

        categories
            .controller
            .create(&editor(), params(json!({"name": "News"})))
            .await
            .unwrap();
        articles
            .controller
            .create(&editor(), params(json!({"title": "A", "categoryId": 1})))
            .await
            .unwrap();

        let err = categories
            .controller
            .delete(&editor(), params(json!({"id": 1, "lockVersion": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::UpdatePermission { .. }));
    }
}
